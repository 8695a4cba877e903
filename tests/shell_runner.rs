#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::Span;

use prox::errors::{ProxError, RunError};
use prox::exec::{RunStatus, ShellRunner, Supervisor};
use prox::output::Output;
use prox_test_utils::builders::ProcessBuilder;
use prox_test_utils::{SharedBuffer, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor(kill_timeout: Duration) -> (Supervisor, SharedBuffer) {
    let buf = SharedBuffer::new();
    let sup = Supervisor::new(
        Arc::new(ShellRunner::new(kill_timeout)),
        Output::new(buf.clone(), false),
        Span::current(),
    );
    (sup, buf)
}

#[tokio::test]
async fn test_failing_shell_process_interrupts_sleeping_siblings() -> TestResult {
    init_tracing();

    let (sup, _) = supervisor(Duration::from_secs(2));
    let pp = vec![
        ProcessBuilder::new("a", "sleep 30").build(),
        ProcessBuilder::new("b", "exit 1").build(),
        ProcessBuilder::new("c", "sleep 30").build(),
    ];

    let started = Instant::now();
    let report = with_timeout(sup.run_with_report(&CancellationToken::new(), &pp)).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.status_of("a"), Some(RunStatus::Interrupted));
    assert_eq!(report.status_of("c"), Some(RunStatus::Interrupted));

    match report.into_result() {
        Err(ProxError::ProcessFailed { name, source }) => {
            assert_eq!(name, "b");
            assert!(matches!(source, RunError::Exited { code: 1 }));
        }
        other => panic!("expected ProcessFailed for b, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_stdout_and_stderr_reach_the_console() -> TestResult {
    init_tracing();

    let (sup, buf) = supervisor(Duration::from_secs(2));
    let pp = vec![
        ProcessBuilder::new("greeter", "echo \"$GREETING\"; echo oops >&2")
            .env("GREETING", "hello from prox")
            .build(),
    ];

    with_timeout(sup.run(&CancellationToken::new(), &pp)).await?;

    let lines = buf.lines();
    assert!(lines.contains(&"greeter │ hello from prox".to_string()), "{lines:?}");
    assert!(lines.contains(&"greeter │ oops".to_string()), "{lines:?}");
    Ok(())
}

#[tokio::test]
async fn test_process_ignoring_sigint_is_killed_after_timeout() -> TestResult {
    init_tracing();

    let (sup, _) = supervisor(Duration::from_millis(300));
    let pp = vec![
        ProcessBuilder::new("stubborn", "trap '' INT; sleep 30").build(),
        ProcessBuilder::new("failing", "sleep 0.1; exit 3").build(),
    ];

    let started = Instant::now();
    let report = with_timeout(sup.run_with_report(&CancellationToken::new(), &pp)).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.status_of("stubborn"), Some(RunStatus::Interrupted));
    assert!(matches!(
        report.first_failure().and_then(|c| c.error.as_ref()),
        Some(RunError::Exited { code: 3 })
    ));
    Ok(())
}

#[tokio::test]
async fn test_successful_shell_processes() -> TestResult {
    init_tracing();

    let (sup, _) = supervisor(Duration::from_secs(2));
    let pp = vec![
        ProcessBuilder::new("one", "true").build(),
        ProcessBuilder::new("two", "exit 0").build(),
    ];

    let report = with_timeout(sup.run_with_report(&CancellationToken::new(), &pp)).await;
    assert_eq!(report.count(RunStatus::Success), 2);
    Ok(())
}

#[tokio::test]
async fn test_background_child_does_not_stall_fail_fast() -> TestResult {
    init_tracing();

    let (sup, _) = supervisor(Duration::from_secs(1));
    let pp = vec![
        ProcessBuilder::new("a", "sleep 20").build(),
        ProcessBuilder::new("b", "sleep 20 & exit 1").build(),
    ];

    let started = Instant::now();
    let report = with_timeout(sup.run_with_report(&CancellationToken::new(), &pp)).await;

    assert!(started.elapsed() < Duration::from_secs(4), "{:?}", started.elapsed());
    assert_eq!(report.status_of("a"), Some(RunStatus::Interrupted));
    assert_eq!(report.status_of("b"), Some(RunStatus::Error));
    Ok(())
}

#[tokio::test]
async fn test_background_child_does_not_delay_completion_or_lose_output() -> TestResult {
    init_tracing();

    let (sup, buf) = supervisor(Duration::from_secs(1));
    let pp = vec![ProcessBuilder::new("spawner", "sleep 20 & echo started; exit 0").build()];

    let started = Instant::now();
    let report = with_timeout(sup.run_with_report(&CancellationToken::new(), &pp)).await;

    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    assert_eq!(report.status_of("spawner"), Some(RunStatus::Success));
    assert!(buf.lines().contains(&"spawner │ started".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_caller_cancel_interrupts_process_with_background_child() -> TestResult {
    init_tracing();

    let (sup, _) = supervisor(Duration::from_secs(1));
    let pp = vec![ProcessBuilder::new("daemonish", "sleep 20 & sleep 20").build()];

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let report = with_timeout(sup.run_with_report(&cancel, &pp)).await;

    assert!(started.elapsed() < Duration::from_secs(4), "{:?}", started.elapsed());
    assert!(report.caller_cancelled);
    assert_eq!(report.status_of("daemonish"), Some(RunStatus::Interrupted));
    report.into_result()?;
    Ok(())
}
