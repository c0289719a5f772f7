// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status records reported back to the queue.

use serde::{Deserialize, Serialize};

/// Exit code reported for a job cancelled by the queue (SIGKILL convention).
pub const EXIT_CODE_KILLED: i32 = 137;

/// Status of a job (empty `proc`) or of one of its steps.
///
/// Built up incrementally and sent at each lifecycle transition: init,
/// per-step updates, done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    /// Step name; empty for job-level reports.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proc: String,
    /// Epoch seconds.
    #[serde(default)]
    pub started: i64,
    /// Epoch seconds.
    #[serde(default)]
    pub finished: i64,
    #[serde(default)]
    pub exited: bool,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepStatus {
    /// Job-level status stamped with its start time.
    pub fn started_at(started: i64) -> Self {
        Self {
            started,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.exited && self.exit_code == 0 && self.error.is_none()
    }
}
