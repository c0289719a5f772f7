//! Agent help and version specs

use crate::prelude::*;

#[test]
fn help_shows_usage_and_flags() {
    agent()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("--server")
        .stdout_has("--max-procs")
        .stdout_has("BUILDHAND_SERVER");
}

#[test]
fn help_hides_secret_value() {
    agent()
        .args(&["--help"])
        .env("BUILDHAND_SECRET", "hunter2")
        .passes()
        .stdout_has("--secret")
        .stdout_lacks("hunter2");
}

#[test]
fn version_shows_version() {
    agent().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn unknown_flag_fails() {
    agent()
        .args(&["--no-such-flag"])
        .fails()
        .stderr_has("unexpected argument");
}
