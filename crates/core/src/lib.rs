// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bh-core: data model shared by the buildhand agent crates

pub mod clock;
pub mod file;
pub mod filter;
pub mod id;
pub mod job;
pub mod line;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use file::{ArtifactFile, LOGS_FILE_NAME, LOGS_MIME};
pub use filter::{Filter, FilterError, PLATFORM_LABEL};
pub use job::{ArtifactSpec, Job, JobId, PipelineConfig, Secret, Step, DEFAULT_ARTIFACT_MIME};
pub use line::{LineKind, LogLine};
pub use status::{StepStatus, EXIT_CODE_KILLED};
