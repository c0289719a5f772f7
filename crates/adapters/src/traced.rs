// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::queue::{QueueClient, QueueError};
use async_trait::async_trait;
use bh_core::{ArtifactFile, Filter, Job, JobId, LogLine, StepStatus};
use std::future::Future;
use tracing::Instrument;

/// Wrapper that adds tracing to any QueueClient
#[derive(Clone)]
pub struct TracedQueue<Q> {
    inner: Q,
}

impl<Q> TracedQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }
}

/// Run a queue call, logging its duration and any failure.
async fn timed<T, F>(fut: F) -> Result<T, QueueError>
where
    F: Future<Output = Result<T, QueueError>>,
{
    let start = std::time::Instant::now();
    let result = fut.await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::debug!(elapsed_ms, "ok"),
        Err(e) => tracing::warn!(elapsed_ms, error = %e, "failed"),
    }
    result
}

#[async_trait]
impl<Q: QueueClient> QueueClient for TracedQueue<Q> {
    async fn next(&self, filter: &Filter) -> Result<Option<Job>, QueueError> {
        async {
            tracing::info!("request next execution");
            let result = timed(self.inner.next(filter)).await;
            if let Ok(Some(job)) = &result {
                tracing::info!(job_id = %job.id, steps = job.config.steps.len(), "received execution");
            }
            result
        }
        .instrument(tracing::info_span!("queue.next", labels = ?filter.labels))
        .await
    }

    async fn extend(&self, id: &JobId) -> Result<(), QueueError> {
        timed(self.inner.extend(id))
            .instrument(tracing::debug_span!("queue.extend", job_id = %id))
            .await
    }

    async fn wait(&self, id: &JobId) -> Result<(), QueueError> {
        timed(self.inner.wait(id))
            .instrument(tracing::debug_span!("queue.wait", job_id = %id))
            .await
    }

    async fn init(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        timed(self.inner.init(id, state))
            .instrument(tracing::info_span!("queue.init", job_id = %id))
            .await
    }

    async fn update(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        timed(self.inner.update(id, state))
            .instrument(tracing::debug_span!(
                "queue.update",
                job_id = %id,
                step = state.proc.as_str(),
                exited = state.exited
            ))
            .await
    }

    async fn upload(&self, id: &JobId, file: &ArtifactFile) -> Result<(), QueueError> {
        timed(self.inner.upload(id, file))
            .instrument(tracing::info_span!(
                "queue.upload",
                job_id = %id,
                step = file.proc.as_str(),
                mime = file.mime.as_str(),
                size = file.size
            ))
            .await
    }

    async fn log(&self, id: &JobId, line: &LogLine) -> Result<(), QueueError> {
        // Per-line calls are too chatty for span-level logging
        let result = self.inner.log(id, line).await;
        if let Err(ref e) = result {
            tracing::trace!(job_id = %id, step = line.proc.as_str(), error = %e, "log line failed");
        }
        result
    }

    async fn done(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        timed(self.inner.done(id, state))
            .instrument(tracing::info_span!(
                "queue.done",
                job_id = %id,
                exit_code = state.exit_code
            ))
            .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
