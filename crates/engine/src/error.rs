// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pipeline execution

use bh_adapters::BackendError;
use thiserror::Error;

/// Errors returned by a step orchestrator
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step exited non-zero; the job reports this code.
    #[error("exit code {code}")]
    Exit { code: i32 },
    #[error("execution cancelled")]
    Cancelled,
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("log stream error: {0}")]
    Io(#[from] std::io::Error),
}
