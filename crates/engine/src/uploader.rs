// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upload coordinator: turns step output into uploaded log and artifact files.
//!
//! Uploads run as tasks on a per-job [`TaskTracker`] so steps never wait on
//! the network. The supervisor calls [`Uploader::wait`] before reporting the
//! job done, which makes the tracker the job's upload barrier.

use async_trait::async_trait;
use bh_adapters::QueueClient;
use bh_core::{ArtifactFile, Clock, Job, JobId, LogLine, Step};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::line_writer::LineWriter;
use crate::pipeline::{Logger, MultipartReader};
use crate::PipelineError;

/// How long [`Uploader::wait`] lets live lines drain before dropping them.
pub const LIVE_FLUSH_GRACE: Duration = Duration::from_secs(5);

/// Per-file size caps in bytes. Input beyond a cap is read and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_logs: u64,
    pub max_file: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_logs: 5_000_000,
            max_file: 5_000_000,
        }
    }
}

/// [`Logger`] for one job that uploads each step's log and artifact.
pub struct Uploader<Q, C> {
    queue: Q,
    clock: C,
    job_id: JobId,
    secrets: Vec<String>,
    limits: UploadLimits,
    tracker: TaskTracker,
    live_stop: CancellationToken,
}

impl<Q: QueueClient, C: Clock> Uploader<Q, C> {
    pub fn new(queue: Q, clock: C, job: &Job, limits: UploadLimits) -> Self {
        Self {
            queue,
            clock,
            job_id: job.id.clone(),
            secrets: job.config.masked_values(),
            limits,
            tracker: TaskTracker::new(),
            live_stop: CancellationToken::new(),
        }
    }

    /// Wait for every upload started so far, including ones started while
    /// waiting. No further uploads may be started afterwards.
    ///
    /// Live lines are best effort: forwarders still busy after
    /// [`LIVE_FLUSH_GRACE`] are stopped, file uploads are always awaited.
    pub async fn wait(&self) {
        self.tracker.close();
        if tokio::time::timeout(LIVE_FLUSH_GRACE, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::debug!(job_id = %self.job_id, "abandoning unsent live log lines");
            self.live_stop.cancel();
            self.tracker.wait().await;
        }
    }

    fn spawn_upload(&self, file: ArtifactFile) {
        let queue = self.queue.clone();
        let job_id = self.job_id.clone();
        self.tracker.spawn(async move {
            if let Err(e) = queue.upload(&job_id, &file).await {
                tracing::warn!(
                    job_id = %job_id,
                    step = file.proc.as_str(),
                    file = file.name.as_str(),
                    error = %e,
                    "cannot upload file"
                );
            }
            tracing::info!(
                job_id = %job_id,
                step = file.proc.as_str(),
                file = file.name.as_str(),
                size = file.size,
                "finish uploading"
            );
        });
    }

    /// Forward live lines of one step until its writer is dropped.
    fn spawn_live(&self) -> mpsc::UnboundedSender<LogLine> {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogLine>();
        let queue = self.queue.clone();
        let job_id = self.job_id.clone();
        let stop = self.live_stop.clone();
        self.tracker.spawn(async move {
            while let Some(line) = rx.recv().await {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => return,
                    result = queue.log(&job_id, &line) => {
                        if let Err(e) = result {
                            tracing::debug!(job_id = %job_id, step = line.proc.as_str(), error = %e, "cannot stream log line");
                        }
                    }
                }
            }
        });
        tx
    }

    async fn upload_log(
        &self,
        step: &Step,
        body: bh_adapters::OutputStream,
    ) -> Result<(), PipelineError> {
        let mut writer = LineWriter::new(&step.name, &self.secrets).with_live(self.spawn_live());
        let mut limited = body.take(self.limits.max_logs);
        let copied = writer.copy_from(&mut limited).await;
        let lines = writer.into_lines();

        match serde_json::to_vec(&lines) {
            Ok(data) => self.spawn_upload(ArtifactFile::logs(
                step.name.as_str(),
                data,
                self.clock.epoch_secs(),
            )),
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, step = step.name.as_str(), error = %e, "cannot encode step log");
            }
        }
        copied?;
        discard_excess(limited.into_inner(), step, "log").await?;
        Ok(())
    }

    async fn upload_artifact(
        &self,
        step: &Step,
        content_type: String,
        file_name: String,
        body: bh_adapters::OutputStream,
    ) -> Result<(), PipelineError> {
        let mut limited = body.take(self.limits.max_file);
        let mut data = Vec::new();
        limited.read_to_end(&mut data).await?;
        discard_excess(limited.into_inner(), step, "artifact").await?;

        self.spawn_upload(ArtifactFile::new(
            content_type,
            step.name.as_str(),
            file_name,
            data,
            self.clock.epoch_secs(),
        ));
        Ok(())
    }
}

/// Drain what is left past the cap so the producer is never blocked.
async fn discard_excess(
    mut rest: bh_adapters::OutputStream,
    step: &Step,
    what: &'static str,
) -> std::io::Result<()> {
    let dropped = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;
    if dropped > 0 {
        tracing::warn!(step = step.name.as_str(), dropped, "{what} exceeds upload limit, truncated");
    }
    Ok(())
}

#[async_trait]
impl<Q: QueueClient, C: Clock> Logger for Uploader<Q, C> {
    async fn log(
        &self,
        step: &Step,
        parts: &mut dyn MultipartReader,
    ) -> Result<(), PipelineError> {
        // Keep the barrier from completing while this step is still read
        let _reading = self.tracker.token();

        let Some(log) = parts.next_part().await? else {
            return Ok(());
        };
        self.upload_log(step, log.into_body()).await?;

        let Some(artifact) = parts.next_part().await? else {
            return Ok(());
        };
        let content_type = artifact.content_type().to_string();
        let file_name = artifact.file_name().to_string();
        self.upload_artifact(step, content_type, file_name, artifact.into_body())
            .await
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
