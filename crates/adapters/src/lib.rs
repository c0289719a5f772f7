// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the job queue and the execution backend

pub mod backend;
pub mod queue;
pub mod traced;

pub use backend::{
    Backend, BackendError, ExitState, LocalBackend, OutputStream, StepHandle, StepProcess,
};
pub use queue::{ProtocolError, QueueClient, QueueError, RpcQueueClient, RpcQueueConfig};
pub use traced::TracedQueue;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use backend::{BackendCall, FakeBackend, FakeStep};
#[cfg(any(test, feature = "test-support"))]
pub use queue::{FakeQueueClient, QueueCall};
