// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: N concurrent dequeue/supervise loops.

use bh_adapters::QueueClient;
use bh_core::{Clock, Filter, SystemClock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::pipeline::Orchestrator;
use crate::supervisor::Supervisor;

/// Runs `parallelism` workers against one queue.
pub struct WorkerPool<Q, O, C = SystemClock> {
    supervisor: Supervisor<Q, O, C>,
    filter: Filter,
    parallelism: usize,
}

impl<Q: QueueClient, O: Orchestrator, C: Clock> WorkerPool<Q, O, C> {
    pub fn new(supervisor: Supervisor<Q, O, C>, filter: Filter, parallelism: usize) -> Self {
        Self {
            supervisor,
            filter,
            parallelism: parallelism.max(1),
        }
    }

    /// Run all workers until each has exited.
    ///
    /// `shutdown` stops workers from taking new jobs and abandons pending
    /// dequeues; jobs already running finish normally. `abort` is the parent
    /// of every job scope and ends running jobs too.
    pub async fn run(&self, shutdown: CancellationToken, abort: CancellationToken) {
        let mut workers = JoinSet::new();
        for worker in 0..self.parallelism {
            workers.spawn(work(
                worker,
                self.supervisor.clone(),
                self.filter.clone(),
                shutdown.clone(),
                abort.clone(),
            ));
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "worker task failed");
            }
        }
        tracing::info!("all workers exited");
    }
}

async fn work<Q: QueueClient, O: Orchestrator, C: Clock>(
    worker: usize,
    supervisor: Supervisor<Q, O, C>,
    filter: Filter,
    shutdown: CancellationToken,
    abort: CancellationToken,
) {
    tracing::debug!(worker, "worker started");
    loop {
        if shutdown.is_cancelled() {
            tracing::debug!(worker, "worker stopping");
            return;
        }
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => continue,
            next = supervisor.next(&filter) => next,
        };
        match next {
            Ok(Some(job)) => {
                supervisor.supervise(&job, &abort).await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(worker, error = %e, "build runner encountered error: exiting");
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
