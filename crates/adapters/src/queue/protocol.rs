// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response messages exchanged with the queue server.

use bh_core::{ArtifactFile, Filter, Job, JobId, LogLine, StepStatus};
use serde::{Deserialize, Serialize};

/// Authenticated wrapper around every request.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub token: &'a str,
    /// Agent version, lets the server refuse incompatible agents.
    pub version: &'a str,
    pub request: Request<'a>,
}

/// Requests from agent to queue
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request<'a> {
    Next { filter: &'a Filter },
    Extend { id: &'a JobId },
    Wait { id: &'a JobId },
    Init { id: &'a JobId, state: &'a StepStatus },
    Update { id: &'a JobId, state: &'a StepStatus },
    Upload { id: &'a JobId, file: &'a ArtifactFile },
    Log { id: &'a JobId, line: &'a LogLine },
    Done { id: &'a JobId, state: &'a StepStatus },
}

impl Request<'_> {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Next { .. } => "next",
            Request::Extend { .. } => "extend",
            Request::Wait { .. } => "wait",
            Request::Init { .. } => "init",
            Request::Update { .. } => "update",
            Request::Upload { .. } => "upload",
            Request::Log { .. } => "log",
            Request::Done { .. } => "done",
        }
    }

    /// Live log lines are dropped rather than retried.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Request::Log { .. })
    }

    /// Long-poll requests block server-side until something happens.
    pub fn is_long_poll(&self) -> bool {
        matches!(self, Request::Next { .. } | Request::Wait { .. })
    }
}

/// Responses from queue to agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Job {
        #[serde(default)]
        job: Option<Job>,
    },
    Cancelled,
    Error {
        message: String,
    },
}
