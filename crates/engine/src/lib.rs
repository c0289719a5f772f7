// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Buildhand execution engine: job supervision, uploads and status reporting

mod error;
pub mod line_writer;
pub mod pipeline;
mod reporter;
mod supervisor;
mod uploader;
mod worker;

pub use error::PipelineError;
pub use line_writer::LineWriter;
pub use pipeline::{LocalPipeline, Logger, MultipartReader, Orchestrator, TraceState, Tracer};
pub use reporter::{apply_status_env, StatusReporter, STATUS_ENV_PREFIXES};
pub use supervisor::{apply_result, Supervisor, SupervisorConfig};
pub use uploader::{UploadLimits, Uploader};
pub use worker::WorkerPool;
