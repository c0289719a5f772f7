// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration from flags and `BUILDHAND_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use bh_adapters::RpcQueueConfig;
use bh_core::{Filter, FilterError};
use clap::Parser;
use thiserror::Error;

/// Errors in otherwise well-formed configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max procs must be at least 1")]
    NoWorkers,
    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bh-agent",
    version,
    about = "Buildhand agent - pulls pipeline jobs from a queue and runs them"
)]
pub struct Config {
    /// Queue server address (host:port)
    #[arg(long, env = "BUILDHAND_SERVER", default_value = "localhost:8000")]
    pub server: String,

    /// Shared secret used to authenticate with the queue
    #[arg(long, env = "BUILDHAND_SECRET", default_value = "", hide_env_values = true)]
    pub secret: String,

    /// Seconds to wait between retries of a failed queue call
    #[arg(long, env = "BUILDHAND_BACKOFF", default_value_t = 15)]
    pub backoff: u64,

    /// Attempts per queue call before giving up
    #[arg(long, env = "BUILDHAND_RETRY_LIMIT", default_value_t = u32::MAX)]
    pub retry_limit: u32,

    /// Enable debug logging
    #[arg(long, env = "BUILDHAND_DEBUG")]
    pub debug: bool,

    /// Extra job labels to match, as comma separated key=value pairs
    #[arg(long, env = "BUILDHAND_FILTER", default_value = "")]
    pub filter: String,

    /// Number of jobs to run concurrently
    #[arg(long, env = "BUILDHAND_MAX_PROCS", default_value_t = 1)]
    pub max_procs: usize,

    /// Platform label advertised to the queue
    #[arg(long, env = "BUILDHAND_PLATFORM", default_value = "linux/amd64")]
    pub platform: String,

    /// Root directory for job workspaces
    #[arg(long, env = "BUILDHAND_WORKSPACE", default_value = "/tmp/buildhand")]
    pub workspace: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "BUILDHAND_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Reject configurations no worker could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_procs == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.job_filter()?;
        Ok(())
    }

    /// Dequeue filter: the platform label plus any `--filter` labels.
    pub fn job_filter(&self) -> Result<Filter, ConfigError> {
        Ok(Filter::for_platform(self.platform.as_str()).with_labels_str(&self.filter)?)
    }

    pub fn queue_config(&self) -> RpcQueueConfig {
        RpcQueueConfig {
            token: self.secret.clone(),
            retry_limit: self.retry_limit,
            backoff: Duration::from_secs(self.backoff),
            ..RpcQueueConfig::new(self.server.as_str())
        }
    }

    /// Default log directive, overridden by `RUST_LOG`.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
