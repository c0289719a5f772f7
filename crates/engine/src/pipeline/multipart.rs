// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-part step output: the log stream, then an optional artifact.

use async_trait::async_trait;
use bh_adapters::{Backend, BackendError, OutputStream};
use bh_core::{ArtifactSpec, JobId};
use std::io;
use tokio::sync::oneshot;

/// Content type of the log part.
pub const LOG_CONTENT_TYPE: &str = "text/plain";

/// One part of a step's output.
pub struct Part {
    content_type: String,
    file_name: String,
    body: OutputStream,
}

impl Part {
    pub fn new(
        content_type: impl Into<String>,
        file_name: impl Into<String>,
        body: OutputStream,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            file_name: file_name.into(),
            body,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn into_body(self) -> OutputStream {
        self.body
    }
}

/// Sequential reader over the parts of one step's output.
#[async_trait]
pub trait MultipartReader: Send {
    /// Next part, or `None` once all parts were handed out.
    async fn next_part(&mut self) -> io::Result<Option<Part>>;
}

/// Parts of a step run on a [`Backend`].
///
/// The first part is the live output stream. The second part, present only
/// when the step declares an artifact that exists, is opened once the step
/// process has exited.
pub struct StepParts<B> {
    backend: B,
    job: JobId,
    output: Option<OutputStream>,
    artifact: Option<ArtifactSpec>,
    exited: Option<oneshot::Receiver<()>>,
}

impl<B: Backend> StepParts<B> {
    pub fn new(
        backend: B,
        job: JobId,
        output: OutputStream,
        artifact: Option<ArtifactSpec>,
        exited: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            backend,
            job,
            output: Some(output),
            artifact,
            exited: Some(exited),
        }
    }
}

#[async_trait]
impl<B: Backend> MultipartReader for StepParts<B> {
    async fn next_part(&mut self) -> io::Result<Option<Part>> {
        if let Some(output) = self.output.take() {
            return Ok(Some(Part::new(LOG_CONTENT_TYPE, "", output)));
        }
        let Some(spec) = self.artifact.take() else {
            return Ok(None);
        };
        if let Some(exited) = self.exited.take() {
            // Sender dropped means the wait failed; the process is gone either way
            let _ = exited.await;
        }
        match self.backend.open_artifact(&self.job, &spec.path).await {
            Ok(Some(body)) => Ok(Some(Part::new(spec.mime(), spec.file_name(), body))),
            Ok(None) => {
                tracing::debug!(job_id = %self.job, path = spec.path.as_str(), "declared artifact not produced");
                Ok(None)
            }
            Err(BackendError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}
