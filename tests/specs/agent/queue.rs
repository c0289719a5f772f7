//! Agent queue connection specs

use crate::prelude::*;

/// Address with nothing listening on it
fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

#[test]
fn unreachable_queue_stops_workers_and_exits() {
    let workspace = tempfile::tempdir().unwrap();
    agent()
        .args(&["--server", &dead_address(), "--retry-limit", "1", "--max-procs", "2"])
        .env("BUILDHAND_WORKSPACE", workspace.path())
        .passes()
        .stderr_has("build runner encountered error: exiting")
        .stderr_has("all workers exited");
}

#[test]
fn secret_never_appears_in_logs() {
    let workspace = tempfile::tempdir().unwrap();
    agent()
        .args(&["--server", &dead_address(), "--retry-limit", "1", "--debug"])
        .env("BUILDHAND_SECRET", "hunter2")
        .env("BUILDHAND_WORKSPACE", workspace.path())
        .passes()
        .stderr_lacks("hunter2");
}

#[test]
fn log_file_receives_agent_logs() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("logs/agent.log");
    agent()
        .args(&["--server", &dead_address(), "--retry-limit", "1"])
        .env("BUILDHAND_WORKSPACE", dir.path().join("work"))
        .env("BUILDHAND_LOG_FILE", &log_file)
        .passes()
        .stderr_lacks("build runner encountered error");

    let logs = std::fs::read_to_string(&log_file).unwrap();
    assert!(logs.contains("build runner encountered error: exiting"));
}
