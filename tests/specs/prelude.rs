//! Helpers for running the bh-agent binary from specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

/// Any single agent run in a spec is killed after this long.
const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// Locate the built agent binary next to this test executable
/// (`target/<profile>/deps/specs-<hash>` → `target/<profile>/bh-agent`),
/// preferring a coverage build when one exists.
fn agent_binary() -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let beside_tests = std::env::current_exe()
        .ok()
        .and_then(|exe| Some(exe.parent()?.parent()?.join("bh-agent")));

    [
        Some(root.join("target/llvm-cov-target/debug/bh-agent")),
        beside_tests,
        Some(root.join("target/debug/bh-agent")),
    ]
    .into_iter()
    .flatten()
    .find(|path| path.exists())
    .unwrap_or_else(|| root.join("target/debug/bh-agent"))
}

/// Start describing an agent invocation.
pub fn agent() -> Invocation {
    let mut cmd = assert_cmd::Command::new(agent_binary());
    cmd.timeout(RUN_TIMEOUT);
    // Settings from the developer's shell must not leak into specs
    for (key, _) in std::env::vars_os() {
        let name = key.to_string_lossy();
        if name.starts_with("BUILDHAND_") || name == "RUST_LOG" {
            cmd.env_remove(&key);
        }
    }
    Invocation { cmd }
}

pub struct Invocation {
    cmd: assert_cmd::Command,
}

impl Invocation {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run, requiring exit code 0.
    pub fn passes(self) -> Outcome {
        self.finish(true)
    }

    /// Run, requiring a non-zero exit.
    pub fn fails(self) -> Outcome {
        self.finish(false)
    }

    fn finish(mut self, want_success: bool) -> Outcome {
        let output = self.cmd.output().expect("agent should start");
        let outcome = Outcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if output.status.success() != want_success {
            panic!(
                "agent exited with {:?}, wanted {}\n{outcome}",
                outcome.code,
                if want_success { "success" } else { "failure" },
            );
        }
        outcome
    }
}

/// Captured result of one agent run.
pub struct Outcome {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--- stdout ---\n{}\n--- stderr ---\n{}", self.stdout, self.stderr)
    }
}

impl Outcome {
    pub fn stdout_has(self, needle: &str) -> Self {
        self.check("stdout", &self.stdout, needle, true);
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        self.check("stdout", &self.stdout, needle, false);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        self.check("stderr", &self.stderr, needle, true);
        self
    }

    pub fn stderr_lacks(self, needle: &str) -> Self {
        self.check("stderr", &self.stderr, needle, false);
        self
    }

    fn check(&self, stream: &str, text: &str, needle: &str, present: bool) {
        if text.contains(needle) != present {
            let verb = if present { "missing" } else { "unexpectedly contains" };
            panic!("{stream} {verb} {needle:?}\n{self}");
        }
    }
}
