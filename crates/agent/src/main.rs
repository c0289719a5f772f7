// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buildhand agent (bh-agent)
//!
//! Long-running worker that pulls pipeline jobs from the queue, runs them
//! on the local machine and reports logs, artifacts and status back.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;

use anyhow::{Context, Result};
use bh_adapters::{LocalBackend, RpcQueueClient, TracedQueue};
use bh_engine::{LocalPipeline, Supervisor, SupervisorConfig, WorkerPool};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;
    let filter = config.job_filter()?;

    let _log_guard = setup_logging(&config)?;

    std::fs::create_dir_all(&config.workspace).with_context(|| {
        format!(
            "cannot create workspace directory {}",
            config.workspace.display()
        )
    })?;

    let queue = TracedQueue::new(RpcQueueClient::new(config.queue_config()));
    let pipeline = LocalPipeline::new(LocalBackend::new(config.workspace.clone()));
    let supervisor = Supervisor::new(queue, pipeline, SupervisorConfig::default());
    let pool = WorkerPool::new(supervisor, filter, config.max_procs);

    let shutdown = CancellationToken::new();
    let abort = CancellationToken::new();
    spawn_signal_handler(shutdown.clone(), abort.clone())?;

    info!(
        server = config.server.as_str(),
        platform = config.platform.as_str(),
        workers = config.max_procs,
        "agent started"
    );
    pool.run(shutdown, abort).await;
    info!("agent stopped");
    Ok(())
}

/// First SIGINT/SIGTERM stops dequeuing; a second one also ends running jobs.
fn spawn_signal_handler(shutdown: CancellationToken, abort: CancellationToken) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        let mut received = 0;
        loop {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = sigint.recv() => {}
            }
            received += 1;
            if received == 1 {
                println!("ctrl+c received, terminating process");
                shutdown.cancel();
            } else {
                info!("second signal received, cancelling running jobs");
                abort.cancel();
                return;
            }
        }
    });
    Ok(())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("invalid log file path {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(config.log_file.is_none()))
        .init();

    Ok(guard)
}
