// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution backends: isolated runtimes in which steps run

mod local;

pub use local::LocalBackend;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, FakeBackend, FakeStep};

use async_trait::async_trait;
use bh_core::{JobId, PipelineConfig, Secret, Step};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Errors from backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("failed to start step {step}: {message}")]
    Start { step: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Combined stdout/stderr of a running step, or the bytes of an artifact.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// How a step process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitState {
    pub exit_code: i32,
    /// Process was killed because its job scope was cancelled.
    pub killed: bool,
}

/// A started step process.
#[async_trait]
pub trait StepProcess: Send {
    /// Wait for the process to exit, killing it if `cancel` fires first.
    async fn wait(&mut self, cancel: &CancellationToken) -> Result<ExitState, BackendError>;
}

/// Output and process of a started step.
pub struct StepHandle {
    pub output: OutputStream,
    pub process: Box<dyn StepProcess>,
}

/// Adapter for the isolated runtime steps execute in
#[async_trait]
pub trait Backend: Clone + Send + Sync + 'static {
    /// Prepare the job's runtime (workspace, networks, ...).
    async fn setup(&self, job: &JobId, config: &PipelineConfig) -> Result<(), BackendError>;

    /// Start one step.
    async fn exec(
        &self,
        job: &JobId,
        step: &Step,
        secrets: &[Secret],
    ) -> Result<StepHandle, BackendError>;

    /// Open a file a step produced. `Ok(None)` when it does not exist.
    async fn open_artifact(
        &self,
        job: &JobId,
        path: &str,
    ) -> Result<Option<OutputStream>, BackendError>;

    /// Tear down the job's runtime.
    async fn destroy(&self, job: &JobId) -> Result<(), BackendError>;
}
