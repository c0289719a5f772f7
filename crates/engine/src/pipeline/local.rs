// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential orchestrator running steps in declaration order.

use async_trait::async_trait;
use bh_adapters::{Backend, ExitState, StepHandle};
use bh_core::{Clock, Job, Step, SystemClock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::{Logger, Orchestrator, PipelineState, ProcessState, StepParts, TraceState, Tracer};
use crate::PipelineError;

/// How long output is still read after the job was cancelled.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs a job's steps one after another on a [`Backend`].
///
/// After a step fails, remaining steps are skipped unless they are marked
/// `on_failure`. The first failing exit code is the job's result.
#[derive(Clone)]
pub struct LocalPipeline<B, C = SystemClock> {
    backend: B,
    clock: C,
}

impl<B: Backend> LocalPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<B: Backend, C: Clock> LocalPipeline<B, C> {
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self { backend, clock }
    }

    async fn run_steps(
        &self,
        job: &Job,
        cancel: &CancellationToken,
        logger: &dyn Logger,
        tracer: &dyn Tracer,
    ) -> Result<(), PipelineError> {
        let started = self.clock.epoch_secs();
        let mut failure: Option<PipelineError> = None;

        for step in &job.config.steps {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if failure.is_some() && !step.on_failure {
                tracing::debug!(job_id = %job.id, step = step.name.as_str(), "skipping step after failure");
                continue;
            }

            let mut state = TraceState {
                pipeline: PipelineState {
                    started,
                    error: failure.as_ref().map(|e| e.to_string()),
                    step: step.clone(),
                },
                process: ProcessState::default(),
            };
            tracer.trace(&mut state).await;

            let exit = self
                .exec_step(job, &state.pipeline.step, cancel, logger)
                .await?;

            state.process = ProcessState {
                exited: true,
                exit_code: exit.exit_code,
            };
            tracer.trace(&mut state).await;

            if exit.killed {
                return Err(PipelineError::Cancelled);
            }
            if exit.exit_code != 0 && failure.is_none() {
                tracing::info!(job_id = %job.id, step = step.name.as_str(), exit_code = exit.exit_code, "step failed");
                failure = Some(PipelineError::Exit {
                    code: exit.exit_code,
                });
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Start a step, feed its output to the logger and wait for it to exit.
    async fn exec_step(
        &self,
        job: &Job,
        step: &Step,
        cancel: &CancellationToken,
        logger: &dyn Logger,
    ) -> Result<ExitState, PipelineError> {
        let StepHandle {
            output,
            mut process,
        } = self
            .backend
            .exec(&job.id, step, &job.config.secrets)
            .await?;

        let (exited_tx, exited_rx) = oneshot::channel();
        let mut parts = StepParts::new(
            self.backend.clone(),
            job.id.clone(),
            output,
            step.artifact.clone(),
            exited_rx,
        );

        let wait = async {
            let exit = process.wait(cancel).await;
            let _ = exited_tx.send(());
            exit
        };
        // A process that left the step's group can hold the output open after
        // a kill; stop reading once the grace period runs out.
        let log = async {
            tokio::select! {
                biased;
                logged = logger.log(step, &mut parts) => logged,
                _ = async {
                    cancel.cancelled().await;
                    tokio::time::sleep(DRAIN_GRACE).await;
                } => Err(PipelineError::Cancelled),
            }
        };
        let (logged, exit) = tokio::join!(log, wait);

        if let Err(e) = logged {
            tracing::warn!(job_id = %job.id, step = step.name.as_str(), error = %e, "step output not fully captured");
        }
        Ok(exit?)
    }
}

#[async_trait]
impl<B: Backend, C: Clock> Orchestrator for LocalPipeline<B, C> {
    async fn run(
        &self,
        job: &Job,
        cancel: &CancellationToken,
        logger: &dyn Logger,
        tracer: &dyn Tracer,
    ) -> Result<(), PipelineError> {
        self.backend.setup(&job.id, &job.config).await?;
        let result = self.run_steps(job, cancel, logger, tracer).await;
        if let Err(e) = self.backend.destroy(&job.id).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to tear down job runtime");
        }
        result
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
