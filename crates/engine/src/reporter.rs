// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status reporter: relays step transitions to the queue.

use async_trait::async_trait;
use bh_adapters::QueueClient;
use bh_core::{Clock, JobId, StepStatus};
use std::collections::HashMap;

use crate::pipeline::{TraceState, Tracer};

/// Prefixes under which status variables are exported to steps. `CI_` is
/// kept for pipelines written against the legacy names.
pub const STATUS_ENV_PREFIXES: [&str; 2] = ["CI", "BUILDHAND"];

const SUCCESS: &str = "success";
const FAILURE: &str = "failure";

/// [`Tracer`] for one job that reports every step transition.
///
/// Before a step runs, its environment gains the build and job status
/// variables under each of [`STATUS_ENV_PREFIXES`].
pub struct StatusReporter<Q, C> {
    queue: Q,
    clock: C,
    job_id: JobId,
}

impl<Q: QueueClient, C: Clock> StatusReporter<Q, C> {
    pub fn new(queue: Q, clock: C, job_id: JobId) -> Self {
        Self {
            queue,
            clock,
            job_id,
        }
    }
}

/// Write the status variables for a step about to run.
///
/// Status is `failure` once any earlier step failed, else `success`.
pub fn apply_status_env(
    env: &mut HashMap<String, String>,
    failed: bool,
    started: i64,
    now: i64,
) {
    let status = if failed { FAILURE } else { SUCCESS };
    for prefix in STATUS_ENV_PREFIXES {
        for scope in ["BUILD", "JOB"] {
            env.insert(format!("{prefix}_{scope}_STATUS"), status.to_string());
            env.insert(format!("{prefix}_{scope}_STARTED"), started.to_string());
            env.insert(format!("{prefix}_{scope}_FINISHED"), now.to_string());
        }
    }
}

#[async_trait]
impl<Q: QueueClient, C: Clock> Tracer for StatusReporter<Q, C> {
    async fn trace(&self, state: &mut TraceState) {
        let now = self.clock.epoch_secs();
        // Every update carries both stamps
        let status = StepStatus {
            proc: state.pipeline.step.name.clone(),
            started: now,
            finished: now,
            exited: state.process.exited,
            exit_code: state.process.exit_code,
            ..StepStatus::default()
        };

        if !state.process.exited {
            apply_status_env(
                &mut state.pipeline.step.environment,
                state.pipeline.error.is_some(),
                state.pipeline.started,
                now,
            );
        }

        if let Err(e) = self.queue.update(&self.job_id, &status).await {
            tracing::warn!(
                job_id = %self.job_id,
                step = status.proc.as_str(),
                error = %e,
                "cannot update step status"
            );
        }
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
