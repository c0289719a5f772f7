// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue client speaking length-prefixed JSON over TCP.
//!
//! Each call opens its own connection so long-polls (`next`, `wait`) never
//! hold up status reports or uploads issued concurrently for the same job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bh_core::{ArtifactFile, Filter, Job, JobId, LogLine, StepStatus};
use tokio::net::TcpStream;

use super::protocol::{Envelope, Request, Response};
use super::wire::{Frame, ProtocolError};
use super::{QueueClient, QueueError};

/// Timeout for non-blocking calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`RpcQueueClient`].
#[derive(Debug, Clone)]
pub struct RpcQueueConfig {
    /// Server address as `host:port`.
    pub addr: String,
    /// Shared secret sent with every request.
    pub token: String,
    /// Maximum attempts per call for transport failures (at least one).
    pub retry_limit: u32,
    /// Pause between attempts.
    pub backoff: Duration,
    /// Read timeout for calls that are not long-polls.
    pub call_timeout: Duration,
    pub version: String,
}

impl RpcQueueConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token: String::new(),
            retry_limit: u32::MAX,
            backoff: Duration::from_secs(15),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Clone)]
pub struct RpcQueueClient {
    config: Arc<RpcQueueConfig>,
}

impl RpcQueueClient {
    pub fn new(config: RpcQueueConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    async fn call(&self, request: Request<'_>) -> Result<Response, QueueError> {
        let name = request.name();
        let long_poll = request.is_long_poll();
        let attempts = if request.is_best_effort() {
            1
        } else {
            self.config.retry_limit.max(1)
        };
        let frame = Frame::encode(&Envelope {
            token: &self.config.token,
            version: &self.config.version,
            request,
        })?;

        let mut attempt = 1;
        loop {
            match self.round_trip(&frame, long_poll).await {
                Ok(Response::Error { message }) => return Err(QueueError::Server(message)),
                Ok(response) => return Ok(response),
                Err(e) if is_retryable(&e) && attempt < attempts => {
                    tracing::warn!(
                        request = name,
                        attempt,
                        error = %e,
                        backoff_ms = self.config.backoff.as_millis() as u64,
                        "queue call failed, retrying"
                    );
                    tokio::time::sleep(self.config.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn round_trip(&self, frame: &Frame, long_poll: bool) -> Result<Response, ProtocolError> {
        let mut stream = TcpStream::connect(&self.config.addr).await?;
        frame.write_to(&mut stream).await?;
        let reply = if long_poll {
            Frame::read_from(&mut stream).await?
        } else {
            tokio::time::timeout(self.config.call_timeout, Frame::read_from(&mut stream))
                .await
                .map_err(|_| ProtocolError::Timeout)??
        };
        reply.decode()
    }

    async fn call_ok(&self, request: Request<'_>) -> Result<(), QueueError> {
        let name = request.name();
        match self.call(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }
}

fn is_retryable(e: &ProtocolError) -> bool {
    matches!(
        e,
        ProtocolError::Io(_) | ProtocolError::ConnectionClosed | ProtocolError::Timeout
    )
}

fn unexpected(request: &'static str, response: &Response) -> QueueError {
    QueueError::UnexpectedResponse {
        request,
        response: format!("{:?}", response),
    }
}

#[async_trait]
impl QueueClient for RpcQueueClient {
    async fn next(&self, filter: &Filter) -> Result<Option<Job>, QueueError> {
        match self.call(Request::Next { filter }).await? {
            Response::Job { job } => Ok(job),
            other => Err(unexpected("next", &other)),
        }
    }

    async fn extend(&self, id: &JobId) -> Result<(), QueueError> {
        self.call_ok(Request::Extend { id }).await
    }

    async fn wait(&self, id: &JobId) -> Result<(), QueueError> {
        match self.call(Request::Wait { id }).await? {
            Response::Cancelled => Ok(()),
            other => Err(unexpected("wait", &other)),
        }
    }

    async fn init(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        self.call_ok(Request::Init { id, state }).await
    }

    async fn update(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        self.call_ok(Request::Update { id, state }).await
    }

    async fn upload(&self, id: &JobId, file: &ArtifactFile) -> Result<(), QueueError> {
        self.call_ok(Request::Upload { id, file }).await
    }

    async fn log(&self, id: &JobId, line: &LogLine) -> Result<(), QueueError> {
        self.call_ok(Request::Log { id, line }).await
    }

    async fn done(&self, id: &JobId, state: &StepStatus) -> Result<(), QueueError> {
        self.call_ok(Request::Done { id, state }).await
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
