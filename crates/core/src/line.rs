// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured log lines.

use serde::{Deserialize, Serialize};

/// Stream a log line was captured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Also used for merged output; the local backend joins stderr into
    /// stdout.
    #[default]
    Stdout,
    /// Only produced by backends that keep the two streams apart. Queue
    /// consumers must accept it either way.
    Stderr,
}

/// One line of step output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Name of the producing step.
    pub proc: String,
    /// Seconds since the step's log stream started.
    pub time: i64,
    #[serde(rename = "type")]
    pub kind: LineKind,
    /// Zero-based index within the step's log.
    pub pos: usize,
    pub out: String,
}

#[cfg(test)]
#[path = "line_tests.rs"]
mod tests;
