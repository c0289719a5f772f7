// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bh_core::test_support;

#[tokio::test]
async fn fake_queue_hands_out_scripted_jobs_then_fails() {
    let queue = FakeQueueClient::new();
    queue.push_empty();
    queue.push_job(test_support::job("job-1", vec![]));

    let filter = Filter::for_platform("linux/amd64");
    assert_eq!(queue.next(&filter).await.unwrap(), None);
    assert_eq!(queue.next(&filter).await.unwrap().unwrap().id, "job-1");
    assert!(queue.next(&filter).await.is_err());
    assert_eq!(queue.calls().len(), 3);
}

#[tokio::test]
async fn fake_queue_records_injected_failures() {
    let queue = FakeQueueClient::new();
    queue.fail_done();

    let id = JobId::new("job-1");
    assert!(queue.done(&id, &StepStatus::default()).await.is_err());
    assert_eq!(queue.done_reports().len(), 1);
}

#[tokio::test]
async fn fake_queue_wait_resolves_after_cancel() {
    let queue = FakeQueueClient::new();
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.wait(&JobId::new("job-1")).await })
    };
    queue.cancel_jobs();
    waiter.await.unwrap().unwrap();
}
