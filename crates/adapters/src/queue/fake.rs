// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake queue client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{QueueClient, QueueError};
use async_trait::async_trait;
use bh_core::{ArtifactFile, Filter, Job, JobId, LogLine, StepStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Recorded queue call, in completion order
#[derive(Debug, Clone, PartialEq)]
pub enum QueueCall {
    Next(Filter),
    Extend(JobId),
    Init(JobId, StepStatus),
    Update(JobId, StepStatus),
    Upload(JobId, ArtifactFile),
    Log(JobId, LogLine),
    Done(JobId, StepStatus),
}

#[derive(Default)]
struct FakeQueueState {
    calls: Vec<QueueCall>,
    jobs: VecDeque<Option<Job>>,
    fail_init: bool,
    fail_update: bool,
    fail_upload: bool,
    fail_log: bool,
    fail_done: bool,
    hold_when_empty: bool,
    upload_delay: Option<Duration>,
    log_delay: Option<Duration>,
}

/// Fake queue client for testing.
///
/// `next` hands out scripted jobs and fails once the script is exhausted.
/// `wait` resolves after [`FakeQueueClient::cancel_jobs`] is called.
#[derive(Clone)]
pub struct FakeQueueClient {
    inner: Arc<Mutex<FakeQueueState>>,
    cancel: CancellationToken,
}

impl Default for FakeQueueClient {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeQueueState::default())),
            cancel: CancellationToken::new(),
        }
    }
}

impl FakeQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job for a later `next` call.
    pub fn push_job(&self, job: Job) {
        self.inner.lock().jobs.push_back(Some(job));
    }

    /// Make a later `next` call report that no work is available.
    pub fn push_empty(&self) {
        self.inner.lock().jobs.push_back(None);
    }

    /// Make `next` block forever once the script is exhausted, like a
    /// long-poll on an idle queue.
    pub fn hold_when_empty(&self) {
        self.inner.lock().hold_when_empty = true;
    }

    /// Signal cancellation to every pending and future `wait`.
    pub fn cancel_jobs(&self) {
        self.cancel.cancel();
    }

    pub fn fail_init(&self) {
        self.inner.lock().fail_init = true;
    }

    pub fn fail_update(&self) {
        self.inner.lock().fail_update = true;
    }

    pub fn fail_upload(&self) {
        self.inner.lock().fail_upload = true;
    }

    pub fn fail_log(&self) {
        self.inner.lock().fail_log = true;
    }

    pub fn fail_done(&self) {
        self.inner.lock().fail_done = true;
    }

    /// Delay every upload before it is recorded.
    pub fn set_upload_delay(&self, delay: Duration) {
        self.inner.lock().upload_delay = Some(delay);
    }

    pub fn set_log_delay(&self, delay: Duration) {
        self.inner.lock().log_delay = Some(delay);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<QueueCall> {
        self.inner.lock().calls.clone()
    }

    pub fn uploads(&self) -> Vec<ArtifactFile> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                QueueCall::Upload(_, file) => Some(file),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<StepStatus> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                QueueCall::Update(_, state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn done_reports(&self) -> Vec<StepStatus> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                QueueCall::Done(_, state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn log_lines(&self) -> Vec<LogLine> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                QueueCall::Log(_, line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn extend_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, QueueCall::Extend(_)))
            .count()
    }

    fn record(&self, call: QueueCall, fail: bool) -> Result<(), QueueError> {
        self.inner.lock().calls.push(call);
        if fail {
            return Err(QueueError::Server("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueClient for FakeQueueClient {
    async fn next(&self, filter: &Filter) -> Result<Option<Job>, QueueError> {
        let (next, hold) = {
            let mut inner = self.inner.lock();
            inner.calls.push(QueueCall::Next(filter.clone()));
            (inner.jobs.pop_front(), inner.hold_when_empty)
        };
        match next {
            Some(job) => Ok(job),
            None if hold => std::future::pending().await,
            None => Err(QueueError::Server("queue closed".to_string())),
        }
    }

    async fn extend(&self, id: &JobId) -> Result<(), QueueError> {
        self.record(QueueCall::Extend(id.clone()), false)
    }

    async fn wait(&self, _id: &JobId) -> Result<(), QueueError> {
        self.cancel.cancelled().await;
        Ok(())
    }

    async fn init(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        let fail = self.inner.lock().fail_init;
        self.record(QueueCall::Init(id.clone(), state.clone()), fail)
    }

    async fn update(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        let fail = self.inner.lock().fail_update;
        self.record(QueueCall::Update(id.clone(), state.clone()), fail)
    }

    async fn upload(&self, id: &JobId, file: &ArtifactFile) -> Result<(), QueueError> {
        let (delay, fail) = {
            let inner = self.inner.lock();
            (inner.upload_delay, inner.fail_upload)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(QueueCall::Upload(id.clone(), file.clone()), fail)
    }

    async fn log(&self, id: &JobId, line: &LogLine) -> Result<(), QueueError> {
        let (delay, fail) = {
            let inner = self.inner.lock();
            (inner.log_delay, inner.fail_log)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(QueueCall::Log(id.clone(), line.clone()), fail)
    }

    async fn done(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        let fail = self.inner.lock().fail_done;
        self.record(QueueCall::Done(id.clone(), state.clone()), fail)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
