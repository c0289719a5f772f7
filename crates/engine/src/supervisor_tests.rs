// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pipeline::{LocalPipeline, Logger, Tracer};
use async_trait::async_trait;
use bh_adapters::{FakeBackend, FakeQueueClient, FakeStep, QueueCall};
use bh_core::{test_support, FakeClock, LOGS_MIME};

/// Orchestrator that skips real steps and ends the way it is told to
#[derive(Clone)]
enum Scripted {
    Succeed,
    Exit(i32),
    Fail(&'static str),
    /// Run for the given time, then succeed
    Busy(Duration),
    /// Block until the job scope ends, then return the result
    UntilCancelled(fn() -> Result<(), PipelineError>),
}

#[async_trait]
impl Orchestrator for Scripted {
    async fn run(
        &self,
        _job: &Job,
        cancel: &CancellationToken,
        _logger: &dyn Logger,
        _tracer: &dyn Tracer,
    ) -> Result<(), PipelineError> {
        match self {
            Scripted::Succeed => Ok(()),
            Scripted::Exit(code) => Err(PipelineError::Exit { code: *code }),
            Scripted::Fail(message) => Err(PipelineError::Io(std::io::Error::other(*message))),
            Scripted::Busy(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
            Scripted::UntilCancelled(result) => {
                cancel.cancelled().await;
                result()
            }
        }
    }
}

fn supervisor<O: Orchestrator>(
    queue: &FakeQueueClient,
    orchestrator: O,
) -> Supervisor<FakeQueueClient, O, FakeClock> {
    Supervisor::with_clock(
        queue.clone(),
        orchestrator,
        FakeClock::new(1_000),
        SupervisorConfig::default(),
    )
}

fn local(backend: &FakeBackend) -> LocalPipeline<FakeBackend, FakeClock> {
    LocalPipeline::with_clock(backend.clone(), FakeClock::new(1_000))
}

fn one_step_job() -> Job {
    test_support::job("job-1", vec![test_support::step("build", &["make"])])
}

/// Trip the queue-side cancellation after `delay`
fn cancel_after(queue: &FakeQueueClient, delay: Duration) {
    let queue = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        queue.cancel_jobs();
    });
}

fn is_done(call: &QueueCall) -> bool {
    matches!(call, QueueCall::Done(..))
}

#[yare::parameterized(
    success = { Ok(()), false, 0, None },
    exit_code = { Err(PipelineError::Exit { code: 3 }), false, 3, None },
    other_error = { Err(PipelineError::Io(std::io::Error::other("disk full"))), false, 1, Some("log stream error: disk full") },
    cancelled_success = { Ok(()), true, 137, None },
    cancelled_exit_code = { Err(PipelineError::Exit { code: 2 }), true, 137, None },
    cancelled_error = { Err(PipelineError::Cancelled), true, 137, Some("execution cancelled") },
)]
fn apply_result_rules(
    result: Result<(), PipelineError>,
    cancelled: bool,
    exit_code: i32,
    error: Option<&str>,
) {
    let mut state = StepStatus::default();
    apply_result(&mut state, result, cancelled);
    assert_eq!(state.exit_code, exit_code);
    assert_eq!(state.error.as_deref(), error);
}

#[tokio::test(start_paused = true)]
async fn log_only_step_reports_success_with_one_logs_upload() {
    let queue = FakeQueueClient::new();
    let backend = FakeBackend::new();
    backend.script_step("build", FakeStep::output("ok\n"));

    let state = supervisor(&queue, local(&backend))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, 0);
    assert!(state.is_success());
    let uploads = queue.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].mime, LOGS_MIME);
    assert_eq!(queue.done_reports(), vec![state]);
}

#[tokio::test(start_paused = true)]
async fn init_is_first_and_done_is_last() {
    let queue = FakeQueueClient::new();
    let backend = FakeBackend::new();

    supervisor(&queue, local(&backend))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    let calls = queue.calls();
    match calls.first() {
        Some(QueueCall::Init(id, state)) => {
            assert_eq!(id.as_str(), "job-1");
            assert_eq!(state.started, 1_000);
            assert!(!state.exited);
        }
        other => panic!("expected init first, got {other:?}"),
    }
    assert!(calls.last().is_some_and(is_done));
    assert_eq!(calls.iter().filter(|c| is_done(c)).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn done_waits_for_slow_uploads() {
    let queue = FakeQueueClient::new();
    queue.set_upload_delay(Duration::from_secs(90));
    let backend = FakeBackend::new();
    backend.script_step("clone", FakeStep::output("cloning\n"));
    backend.script_step("build", FakeStep::output("building\n"));
    let job = test_support::job(
        "job-1",
        vec![
            test_support::step("clone", &["git clone"]),
            test_support::step("build", &["make"]),
        ],
    );

    supervisor(&queue, local(&backend))
        .supervise(&job, &CancellationToken::new())
        .await;

    let calls = queue.calls();
    let done_at = calls.iter().position(is_done).unwrap();
    let last_upload = calls
        .iter()
        .rposition(|c| matches!(c, QueueCall::Upload(..)))
        .unwrap();
    assert!(last_upload < done_at);
    assert_eq!(queue.uploads().len(), 2);
    assert_eq!(queue.done_reports().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn structured_exit_code_is_reported() {
    let queue = FakeQueueClient::new();

    let state = supervisor(&queue, Scripted::Exit(3))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, 3);
    assert_eq!(state.error, None);
    assert!(state.exited);
}

#[tokio::test(start_paused = true)]
async fn unstructured_error_reports_exit_one_with_message() {
    let queue = FakeQueueClient::new();

    let state = supervisor(&queue, Scripted::Fail("disk full"))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, 1);
    assert_eq!(state.error.as_deref(), Some("log stream error: disk full"));
}

#[tokio::test(start_paused = true)]
async fn queue_cancellation_forces_exit_137() {
    let queue = FakeQueueClient::new();
    cancel_after(&queue, Duration::from_secs(5));

    let state = supervisor(
        &queue,
        Scripted::UntilCancelled(|| Err(PipelineError::Exit { code: 2 })),
    )
    .supervise(&one_step_job(), &CancellationToken::new())
    .await;

    assert_eq!(state.exit_code, EXIT_CODE_KILLED);
    assert_eq!(queue.done_reports().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_wins_even_when_orchestrator_succeeds() {
    let queue = FakeQueueClient::new();
    cancel_after(&queue, Duration::from_secs(5));

    let state = supervisor(&queue, Scripted::UntilCancelled(|| Ok(())))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, EXIT_CODE_KILLED);
}

#[tokio::test(start_paused = true)]
async fn cancellation_kills_running_step() {
    let queue = FakeQueueClient::new();
    let backend = FakeBackend::new();
    backend.script_step("serve", FakeStep::hanging("listening\n"));
    let job = test_support::job("job-1", vec![test_support::step("serve", &["./serve"])]);
    cancel_after(&queue, Duration::from_secs(5));

    let state = supervisor(&queue, local(&backend))
        .supervise(&job, &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, EXIT_CODE_KILLED);
    assert_eq!(queue.uploads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_ends_job_without_cancel_marker() {
    let queue = FakeQueueClient::new();
    let mut job = one_step_job();
    job.timeout = 2;

    let started = Instant::now();
    let state = supervisor(
        &queue,
        Scripted::UntilCancelled(|| Err(PipelineError::Cancelled)),
    )
    .supervise(&job, &CancellationToken::new())
    .await;

    assert_eq!(started.elapsed(), Duration::from_secs(120));
    assert_eq!(state.exit_code, 1);
    assert_eq!(state.error.as_deref(), Some("execution cancelled"));
}

#[tokio::test(start_paused = true)]
async fn default_timeout_applies_when_job_has_none() {
    let queue = FakeQueueClient::new();

    let started = Instant::now();
    supervisor(&queue, Scripted::UntilCancelled(|| Ok(())))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert_eq!(started.elapsed(), Duration::from_secs(60 * 60));
}

#[tokio::test(start_paused = true)]
async fn parent_cancellation_ends_job_without_cancel_marker() {
    let queue = FakeQueueClient::new();
    let parent = CancellationToken::new();
    parent.cancel();

    let state = supervisor(&queue, Scripted::UntilCancelled(|| Ok(())))
        .supervise(&one_step_job(), &parent)
        .await;

    assert_eq!(state.exit_code, 0);
    assert_eq!(queue.done_reports().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn lease_is_renewed_while_job_runs() {
    let queue = FakeQueueClient::new();

    supervisor(&queue, Scripted::Busy(Duration::from_secs(150)))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;
    assert_eq!(queue.extend_count(), 2);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(queue.extend_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn lease_ticker_stops_once_scope_is_cancelled() {
    let queue = FakeQueueClient::new();
    cancel_after(&queue, Duration::from_secs(30));

    supervisor(&queue, Scripted::UntilCancelled(|| Ok(())))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(queue.extend_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn renew_lease_never_extends_a_cancelled_scope() {
    let queue = FakeQueueClient::new();
    let scope = CancellationToken::new();
    scope.cancel();

    renew_lease(
        queue.clone(),
        JobId::new("job-1"),
        scope,
        Duration::from_secs(1),
    )
    .await;

    assert_eq!(queue.extend_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn report_failures_are_absorbed() {
    let queue = FakeQueueClient::new();
    queue.fail_init();
    queue.fail_update();
    queue.fail_upload();
    queue.fail_done();
    let backend = FakeBackend::new();
    backend.script_step("build", FakeStep::output("ok\n"));

    let state = supervisor(&queue, local(&backend))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, 0);
    assert_eq!(queue.uploads().len(), 1);
    assert_eq!(queue.done_reports().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn masked_secret_is_absent_from_everything_uploaded() {
    let queue = FakeQueueClient::new();
    let backend = FakeBackend::new();
    backend.script_step("deploy", FakeStep::output("token is hunter2\n"));
    let job = test_support::job_with_secrets(
        "job-1",
        vec![test_support::step("deploy", &["./deploy"])],
        vec![test_support::masked_secret("TOKEN", "hunter2")],
    );

    supervisor(&queue, local(&backend))
        .supervise(&job, &CancellationToken::new())
        .await;

    let uploads = queue.uploads();
    assert_eq!(uploads.len(), 1);
    let payload = String::from_utf8_lossy(&uploads[0].data);
    assert!(!payload.contains("hunter2"));
    assert!(queue.log_lines().iter().all(|l| !l.out.contains("hunter2")));
}

#[tokio::test(start_paused = true)]
async fn failing_step_exit_code_reaches_done_report() {
    let queue = FakeQueueClient::new();
    let backend = FakeBackend::new();
    backend.script_step("test", FakeStep::failing("FAIL\n", 4));
    let job = test_support::job("job-1", vec![test_support::step("test", &["make test"])]);

    let state = supervisor(&queue, local(&backend))
        .supervise(&job, &CancellationToken::new())
        .await;

    assert_eq!(state.exit_code, 4);
    assert_eq!(queue.done_reports()[0].exit_code, 4);
    let exited = queue
        .updates()
        .into_iter()
        .find(|u| u.exited)
        .unwrap();
    assert_eq!(exited.exit_code, 4);
}

#[tokio::test(start_paused = true)]
async fn slow_live_log_does_not_hold_back_done() {
    let queue = FakeQueueClient::new();
    queue.set_log_delay(Duration::from_secs(30));
    let backend = FakeBackend::new();
    backend.script_step("build", FakeStep::output("one\ntwo\nthree\n"));
    let started = Instant::now();

    let state = supervisor(&queue, local(&backend))
        .supervise(&one_step_job(), &CancellationToken::new())
        .await;

    assert!(state.is_success());
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(queue.uploads().len(), 1);
    assert!(queue.calls().last().is_some_and(is_done));
}

#[tokio::test]
async fn next_passes_through_the_queue() {
    let queue = FakeQueueClient::new();
    queue.push_empty();
    queue.push_job(one_step_job());
    let supervisor = supervisor(&queue, Scripted::Succeed);
    let filter = Filter::for_platform("linux/amd64");

    assert_eq!(supervisor.next(&filter).await.unwrap(), None);
    assert_eq!(supervisor.next(&filter).await.unwrap(), Some(one_step_job()));
    assert!(supervisor.next(&filter).await.is_err());
}
