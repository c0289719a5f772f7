// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Backend, BackendError, ExitState, OutputStream, StepHandle, StepProcess};
use async_trait::async_trait;
use bh_core::{JobId, PipelineConfig, Secret, Step, EXIT_CODE_KILLED};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;

/// Scripted behavior of one step
#[derive(Debug, Clone, Default)]
pub struct FakeStep {
    pub output: Vec<u8>,
    pub exit_code: i32,
    /// Keep running until the job scope is cancelled.
    pub hang: bool,
    /// Never close the output, like a daemon that outlives the step.
    pub hold_output: bool,
}

impl FakeStep {
    pub fn output(output: &str) -> Self {
        Self {
            output: output.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    pub fn failing(output: &str, exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::output(output)
        }
    }

    pub fn hanging(output: &str) -> Self {
        Self {
            hang: true,
            ..Self::output(output)
        }
    }

    /// Hangs, and its output stays open even after the step is killed.
    pub fn holding_output(output: &str) -> Self {
        Self {
            hold_output: true,
            ..Self::hanging(output)
        }
    }
}

/// Output that never reaches end of stream.
struct OpenEnded;

impl AsyncRead for OpenEnded {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }
}

/// Recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Setup(JobId),
    /// Step as handed to the backend, including its synthesized environment
    Exec(JobId, Step),
    Destroy(JobId),
}

#[derive(Default)]
struct FakeBackendState {
    calls: Vec<BackendCall>,
    steps: HashMap<String, FakeStep>,
    artifacts: HashMap<String, Vec<u8>>,
    fail_setup: bool,
}

/// Fake backend for testing. Unscripted steps succeed with no output.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeBackendState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_step(&self, name: &str, step: FakeStep) {
        self.inner.lock().steps.insert(name.to_string(), step);
    }

    pub fn add_artifact(&self, path: &str, data: &[u8]) {
        self.inner
            .lock()
            .artifacts
            .insert(path.to_string(), data.to_vec());
    }

    pub fn fail_setup(&self) {
        self.inner.lock().fail_setup = true;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().calls.clone()
    }

    /// Steps handed to `exec`, in order
    pub fn executed(&self) -> Vec<Step> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::Exec(_, step) => Some(step),
                _ => None,
            })
            .collect()
    }
}

struct FakeProcess {
    exit_code: i32,
    hang: bool,
}

#[async_trait]
impl StepProcess for FakeProcess {
    async fn wait(&mut self, cancel: &CancellationToken) -> Result<ExitState, BackendError> {
        if self.hang || cancel.is_cancelled() {
            cancel.cancelled().await;
            return Ok(ExitState {
                exit_code: EXIT_CODE_KILLED,
                killed: true,
            });
        }
        Ok(ExitState {
            exit_code: self.exit_code,
            killed: false,
        })
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn setup(&self, job: &JobId, _config: &PipelineConfig) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Setup(job.clone()));
        if inner.fail_setup {
            return Err(BackendError::Setup("injected failure".to_string()));
        }
        Ok(())
    }

    async fn exec(
        &self,
        job: &JobId,
        step: &Step,
        _secrets: &[Secret],
    ) -> Result<StepHandle, BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Exec(job.clone(), step.clone()));
        let script = inner.steps.get(&step.name).cloned().unwrap_or_default();
        let output: OutputStream = if script.hold_output {
            Box::new(Cursor::new(script.output).chain(OpenEnded))
        } else {
            Box::new(Cursor::new(script.output))
        };
        Ok(StepHandle {
            output,
            process: Box::new(FakeProcess {
                exit_code: script.exit_code,
                hang: script.hang,
            }),
        })
    }

    async fn open_artifact(
        &self,
        _job: &JobId,
        path: &str,
    ) -> Result<Option<OutputStream>, BackendError> {
        let data = self.inner.lock().artifacts.get(path).cloned();
        Ok(data.map(|d| Box::new(Cursor::new(d)) as OutputStream))
    }

    async fn destroy(&self, job: &JobId) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::Destroy(job.clone()));
        Ok(())
    }
}
