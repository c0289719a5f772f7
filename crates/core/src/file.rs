// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Files uploaded to the queue: step logs and step artifacts.

use serde::{Deserialize, Serialize};

/// MIME marker identifying a serialized step log.
pub const LOGS_MIME: &str = "application/json+logs";

/// File name given to serialized step logs.
pub const LOGS_FILE_NAME: &str = "logs.json";

/// Named blob produced by a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub mime: String,
    /// Name of the producing step.
    pub proc: String,
    pub name: String,
    pub data: Vec<u8>,
    pub size: usize,
    /// Epoch seconds.
    pub time: i64,
}

impl ArtifactFile {
    pub fn new(
        mime: impl Into<String>,
        proc: impl Into<String>,
        name: impl Into<String>,
        data: Vec<u8>,
        time: i64,
    ) -> Self {
        Self {
            mime: mime.into(),
            proc: proc.into(),
            name: name.into(),
            size: data.len(),
            data,
            time,
        }
    }

    /// Wrap a serialized log payload for upload.
    pub fn logs(proc: impl Into<String>, data: Vec<u8>, time: i64) -> Self {
        Self::new(LOGS_MIME, proc, LOGS_FILE_NAME, data, time)
    }

    pub fn is_logs(&self) -> bool {
        self.mime == LOGS_MIME
    }
}
