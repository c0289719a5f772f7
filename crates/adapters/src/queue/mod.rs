// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue client adapters

mod protocol;
mod rpc;
pub mod wire;

pub use protocol::{Envelope, Request, Response};
pub use rpc::{RpcQueueClient, RpcQueueConfig};
pub use wire::ProtocolError;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeQueueClient, QueueCall};

use async_trait::async_trait;
use bh_core::{ArtifactFile, Filter, Job, JobId, LogLine, StepStatus};
use thiserror::Error;

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),
    #[error("queue rejected request: {0}")]
    Server(String),
    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse {
        request: &'static str,
        response: String,
    },
}

/// Client side of the remote job queue.
///
/// Every call except `next` is keyed by the id of a job previously handed
/// out by `next`.
#[async_trait]
pub trait QueueClient: Clone + Send + Sync + 'static {
    /// Block until a job matching `filter` is available.
    ///
    /// `Ok(None)` means no work right now; the caller should ask again.
    async fn next(&self, filter: &Filter) -> Result<Option<Job>, QueueError>;

    /// Renew the lease so the queue does not reassign the job.
    async fn extend(&self, id: &JobId) -> Result<(), QueueError>;

    /// Resolve once the queue cancels the job.
    ///
    /// Callers race this against their own job scope; a job that finishes
    /// normally simply drops the pending wait.
    async fn wait(&self, id: &JobId) -> Result<(), QueueError>;

    /// Report that execution of the job has begun.
    async fn init(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError>;

    /// Report a step-level transition.
    async fn update(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError>;

    /// Upload a step log or artifact.
    async fn upload(&self, id: &JobId, file: &ArtifactFile) -> Result<(), QueueError>;

    /// Stream one live log line.
    async fn log(&self, id: &JobId, line: &LogLine) -> Result<(), QueueError>;

    /// Report the terminal state of the job.
    async fn done(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError>;
}
