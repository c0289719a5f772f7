// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job supervisor: drives one dequeued job to its terminal report.
//!
//! Per job the supervisor runs three activities next to the orchestrator:
//! a deadline timer, a listener for queue-side cancellation and a lease
//! renewal ticker. All of them share one [`CancellationToken`] scope.
//! Only a queue-side cancellation marks the job as killed (exit 137).

use bh_adapters::{QueueClient, QueueError};
use bh_core::{Clock, Filter, Job, JobId, StepStatus, SystemClock, EXIT_CODE_KILLED};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::pipeline::Orchestrator;
use crate::reporter::StatusReporter;
use crate::uploader::{UploadLimits, Uploader};
use crate::PipelineError;

/// Tunables for job supervision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Budget for jobs that do not request a timeout.
    pub default_timeout: Duration,
    /// How often the lease on a running job is renewed.
    pub lease_interval: Duration,
    pub limits: UploadLimits,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60 * 60),
            lease_interval: Duration::from_secs(60),
            limits: UploadLimits::default(),
        }
    }
}

/// Dequeues jobs and supervises their execution.
#[derive(Clone)]
pub struct Supervisor<Q, O, C = SystemClock> {
    queue: Q,
    orchestrator: O,
    clock: C,
    config: SupervisorConfig,
}

impl<Q: QueueClient, O: Orchestrator> Supervisor<Q, O> {
    pub fn new(queue: Q, orchestrator: O, config: SupervisorConfig) -> Self {
        Self::with_clock(queue, orchestrator, SystemClock, config)
    }
}

impl<Q: QueueClient, O: Orchestrator, C: Clock> Supervisor<Q, O, C> {
    pub fn with_clock(queue: Q, orchestrator: O, clock: C, config: SupervisorConfig) -> Self {
        Self {
            queue,
            orchestrator,
            clock,
            config,
        }
    }

    /// Ask the queue for the next job matching `filter`.
    ///
    /// `Ok(None)` means no work right now. Errors are for the caller to
    /// act on; nothing else in supervision propagates errors.
    pub async fn next(&self, filter: &Filter) -> Result<Option<Job>, QueueError> {
        self.queue.next(filter).await
    }

    /// Run `job` to completion and send its single done report.
    ///
    /// The job scope is a child of `parent`. Report failures are logged and
    /// absorbed. Returns the state that was reported.
    pub async fn supervise(&self, job: &Job, parent: &CancellationToken) -> StepStatus {
        let scope = parent.child_token();
        let cancelled = Arc::new(AtomicBool::new(false));
        let timeout = job.timeout(self.config.default_timeout);

        let mut listeners = JoinSet::new();
        listeners.spawn(enforce_deadline(job.id.clone(), scope.clone(), timeout));
        listeners.spawn(listen_for_cancel(
            self.queue.clone(),
            job.id.clone(),
            scope.clone(),
            Arc::clone(&cancelled),
        ));
        listeners.spawn(renew_lease(
            self.queue.clone(),
            job.id.clone(),
            scope.clone(),
            self.config.lease_interval,
        ));

        let mut state = StepStatus::started_at(self.clock.epoch_secs());
        if let Err(e) = self.queue.init(&job.id, &state).await {
            tracing::warn!(job_id = %job.id, error = %e, "cannot send init report");
        }

        let uploader = Uploader::new(
            self.queue.clone(),
            self.clock.clone(),
            job,
            self.config.limits,
        );
        let reporter = StatusReporter::new(self.queue.clone(), self.clock.clone(), job.id.clone());

        tracing::info!(job_id = %job.id, timeout_secs = timeout.as_secs(), "executing job");
        let result = self
            .orchestrator
            .run(job, &scope, &uploader, &reporter)
            .await;

        state.finished = self.clock.epoch_secs();
        state.exited = true;
        apply_result(&mut state, result, cancelled.load(Ordering::SeqCst));

        uploader.wait().await;

        scope.cancel();
        while listeners.join_next().await.is_some() {}

        tracing::info!(
            job_id = %job.id,
            exit_code = state.exit_code,
            error = state.error.as_deref(),
            "job finished"
        );
        if let Err(e) = self.queue.done(&job.id, &state).await {
            tracing::warn!(job_id = %job.id, error = %e, "cannot send done report");
        }
        state
    }
}

/// Fold the orchestrator outcome into the terminal state.
///
/// An explicit exit code is kept, any other error becomes exit 1 with its
/// message, and queue-side cancellation always wins with exit 137.
pub fn apply_result(state: &mut StepStatus, result: Result<(), PipelineError>, cancelled: bool) {
    match result {
        Ok(()) => {}
        Err(PipelineError::Exit { code }) => state.exit_code = code,
        Err(e) => {
            state.exit_code = 1;
            state.error = Some(e.to_string());
        }
    }
    if cancelled {
        state.exit_code = EXIT_CODE_KILLED;
    }
}

async fn enforce_deadline(job_id: JobId, scope: CancellationToken, timeout: Duration) {
    tokio::select! {
        _ = scope.cancelled() => {}
        _ = tokio::time::sleep(timeout) => {
            tracing::warn!(job_id = %job_id, timeout_secs = timeout.as_secs(), "job exceeded its deadline");
            scope.cancel();
        }
    }
}

async fn listen_for_cancel<Q: QueueClient>(
    queue: Q,
    job_id: JobId,
    scope: CancellationToken,
    cancelled: Arc<AtomicBool>,
) {
    tokio::select! {
        biased;
        _ = scope.cancelled() => {}
        result = queue.wait(&job_id) => match result {
            Ok(()) => {
                tracing::info!(job_id = %job_id, "received cancellation");
                cancelled.store(true, Ordering::SeqCst);
                scope.cancel();
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "cannot listen for cancellation");
            }
        },
    }
}

async fn renew_lease<Q: QueueClient>(
    queue: Q,
    job_id: JobId,
    scope: CancellationToken,
    every: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = scope.cancelled() => return,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            biased;
            _ = scope.cancelled() => return,
            result = queue.extend(&job_id) => {
                if let Err(e) = result {
                    tracing::warn!(job_id = %job_id, error = %e, "cannot extend lease");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
