// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step orchestration seam.
//!
//! An [`Orchestrator`] runs a job's steps and calls back into a [`Logger`]
//! with each step's output and into a [`Tracer`] at each step transition.

mod local;
mod multipart;

pub use local::LocalPipeline;
pub use multipart::{MultipartReader, Part, StepParts, LOG_CONTENT_TYPE};

use async_trait::async_trait;
use bh_core::{Job, Step};
use tokio_util::sync::CancellationToken;

use crate::PipelineError;

/// Pipeline-level view handed to the tracer.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    /// Epoch seconds at which the pipeline started.
    pub started: i64,
    /// Set once an earlier step has failed.
    pub error: Option<String>,
    /// Step about to run or just finished. Tracers may edit its
    /// environment before it runs.
    pub step: Step,
}

/// Process-level view handed to the tracer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessState {
    pub exited: bool,
    pub exit_code: i32,
}

/// State passed to [`Tracer::trace`] at each step transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceState {
    pub pipeline: PipelineState,
    pub process: ProcessState,
}

/// Receives the output of each step.
#[async_trait]
pub trait Logger: Send + Sync {
    /// Consume the step's output parts.
    async fn log(&self, step: &Step, parts: &mut dyn MultipartReader)
        -> Result<(), PipelineError>;
}

/// Observes step transitions. Cannot fail the pipeline.
#[async_trait]
pub trait Tracer: Send + Sync {
    async fn trace(&self, state: &mut TraceState);
}

/// Runs all steps of a job.
#[async_trait]
pub trait Orchestrator: Clone + Send + Sync + 'static {
    /// Run the job to completion or until `cancel` fires.
    ///
    /// A step exiting non-zero surfaces as [`PipelineError::Exit`].
    async fn run(
        &self,
        job: &Job,
        cancel: &CancellationToken,
        logger: &dyn Logger,
        tracer: &dyn Tracer,
    ) -> Result<(), PipelineError>;
}
