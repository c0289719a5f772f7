// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition as handed out by the queue.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub use crate::id::JobId;

/// MIME type used for artifacts whose step did not declare one.
pub const DEFAULT_ARTIFACT_MIME: &str = "application/octet-stream";

/// A dequeued unit of work. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub config: PipelineConfig,
    /// Requested timeout in minutes; 0 means the agent default.
    #[serde(default)]
    pub timeout: u64,
}

impl Job {
    /// Execution budget for this job, falling back to `default` when the
    /// job did not request one.
    pub fn timeout(&self, default: Duration) -> Duration {
        match self.timeout {
            0 => default,
            minutes => Duration::from_secs(minutes.saturating_mul(60)),
        }
    }
}

/// Step graph plus the secrets the steps may use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub secrets: Vec<Secret>,
}

impl PipelineConfig {
    /// Values of every secret flagged for masking. Empty values are skipped
    /// since they would match everywhere.
    pub fn masked_values(&self) -> Vec<String> {
        self.secrets
            .iter()
            .filter(|s| s.mask && !s.value.is_empty())
            .map(|s| s.value.clone())
            .collect()
    }
}

/// One step of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// File the step produces, uploaded after its log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactSpec>,
    /// Run this step even after an earlier step failed.
    #[serde(default)]
    pub on_failure: bool,
}

/// Declared output file of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Path relative to the step's working directory.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl ArtifactSpec {
    pub fn mime(&self) -> &str {
        self.mime.as_deref().unwrap_or(DEFAULT_ARTIFACT_MIME)
    }

    /// Final path component, used as the uploaded file name.
    pub fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }
}

/// Named secret available to the steps of a job.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: String,
    /// Redact the value from uploaded logs.
    #[serde(default)]
    pub mask: bool,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("value", &"********")
            .field("mask", &self.mask)
            .finish()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
