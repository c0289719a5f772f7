// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ArtifactSpec, Job, JobId, PipelineConfig, Secret, Step};

pub fn step(name: &str, commands: &[&str]) -> Step {
    Step {
        name: name.to_string(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        ..Step::default()
    }
}

pub fn step_with_artifact(name: &str, commands: &[&str], path: &str, mime: &str) -> Step {
    Step {
        artifact: Some(ArtifactSpec {
            path: path.to_string(),
            mime: Some(mime.to_string()),
        }),
        ..step(name, commands)
    }
}

pub fn masked_secret(name: &str, value: &str) -> Secret {
    Secret {
        name: name.to_string(),
        value: value.to_string(),
        mask: true,
    }
}

pub fn job(id: &str, steps: Vec<Step>) -> Job {
    Job {
        id: JobId::new(id),
        config: PipelineConfig {
            steps,
            secrets: Vec::new(),
        },
        timeout: 0,
    }
}

pub fn job_with_secrets(id: &str, steps: Vec<Step>, secrets: Vec<Secret>) -> Job {
    let mut job = job(id, steps);
    job.config.secrets = secrets;
    job
}
