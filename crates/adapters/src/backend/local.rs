// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend running steps as local shell processes.

use super::{Backend, BackendError, ExitState, OutputStream, StepHandle, StepProcess};
use async_trait::async_trait;
use bh_core::{JobId, PipelineConfig, Secret, Step, EXIT_CODE_KILLED};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Runs each step with `sh -c` inside a per-job directory under `root`.
///
/// Steps of one job share the directory, so later steps see files written
/// by earlier ones.
#[derive(Clone, Debug)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn workspace(&self, job: &JobId) -> PathBuf {
        self.root.join(job.dir_name())
    }
}

/// Shell script for a step: stderr merged into stdout, stop at first failure.
fn script(step: &Step) -> String {
    let mut script = String::from("exec 2>&1\nset -e\n");
    for command in &step.commands {
        script.push_str(command);
        script.push('\n');
    }
    script
}

/// Reject artifact paths escaping the job workspace.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[async_trait]
impl Backend for LocalBackend {
    async fn setup(&self, job: &JobId, _config: &PipelineConfig) -> Result<(), BackendError> {
        let dir = self.workspace(job);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BackendError::Setup(format!("{}: {}", dir.display(), e)))?;
        tracing::debug!(job_id = %job, workspace = %dir.display(), "workspace ready");
        Ok(())
    }

    async fn exec(
        &self,
        job: &JobId,
        step: &Step,
        secrets: &[Secret],
    ) -> Result<StepHandle, BackendError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script(step))
            .current_dir(self.workspace(job))
            .envs(&step.environment)
            .envs(secrets.iter().map(|s| (s.name.as_str(), s.value.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| BackendError::Start {
            step: step.name.clone(),
            message: e.to_string(),
        })?;
        let output = child.stdout.take().ok_or_else(|| BackendError::Start {
            step: step.name.clone(),
            message: "stdout not captured".to_string(),
        })?;
        let group = child.id();
        tracing::debug!(job_id = %job, step = step.name.as_str(), pid = ?group, "step started");

        Ok(StepHandle {
            output: Box::new(output),
            process: Box::new(LocalProcess { child, group }),
        })
    }

    async fn open_artifact(
        &self,
        job: &JobId,
        path: &str,
    ) -> Result<Option<OutputStream>, BackendError> {
        let relative = Path::new(path);
        if !is_contained(relative) {
            tracing::warn!(job_id = %job, path, "artifact path escapes workspace, skipping");
            return Ok(None);
        }
        match tokio::fs::File::open(self.workspace(job).join(relative)).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn destroy(&self, job: &JobId) -> Result<(), BackendError> {
        match tokio::fs::remove_dir_all(self.workspace(job)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A running step. The shell leads its own process group, so `group` is
/// both its pid and the pgid of everything it forked.
struct LocalProcess {
    child: Child,
    group: Option<u32>,
}

/// SIGKILL a whole process group. Children holding the output pipe die with
/// the shell, which lets the log reader see end of stream.
async fn kill_group(group: u32) {
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("kill -9 -{group}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => {}
        Ok(s) => tracing::debug!(group, code = ?s.code(), "process group already gone"),
        Err(e) => tracing::warn!(group, error = %e, "cannot kill step process group"),
    }
}

#[async_trait]
impl StepProcess for LocalProcess {
    async fn wait(&mut self, cancel: &CancellationToken) -> Result<ExitState, BackendError> {
        tokio::select! {
            status = self.child.wait() => {
                let status = status?;
                return Ok(ExitState {
                    // No code means the process died from a signal
                    exit_code: status.code().unwrap_or(EXIT_CODE_KILLED),
                    killed: false,
                });
            }
            _ = cancel.cancelled() => {}
        }
        if let Some(group) = self.group {
            kill_group(group).await;
        }
        self.child.kill().await?;
        Ok(ExitState {
            exit_code: EXIT_CODE_KILLED,
            killed: true,
        })
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
