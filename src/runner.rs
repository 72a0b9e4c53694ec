//! The suspension-aware invoker.
//!
//! Drives one decorated test to completion on its case's event loop. The
//! body runs as a cancellable task raced against a timer for the effective
//! timeout; if the timer wins, the suspension chain is snapshotted first and
//! the task is aborted, so cancellation lands at the body's current
//! suspension point and the resulting report still shows where it hung.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{debug, trace};

use crate::case::{DecoratedTest, SyncReturn, SynchronousBody, SuspendableBody, TestBody};
use crate::errors::HarnessError;
use crate::lifecycle::CaseLoop;
use crate::report::Outcome;
use crate::timeout;
use crate::trace::TestCx;

/// Runs one invocation and reports exactly one outcome.
pub fn invoke(case_loop: &CaseLoop, test: &DecoratedTest) -> Outcome {
    match try_invoke(case_loop, test) {
        Ok(()) => Outcome::passed(test.name()),
        Err(err) => Outcome::from_error(test.name(), err),
    }
}

fn try_invoke(case_loop: &CaseLoop, test: &DecoratedTest) -> Result<(), HarnessError> {
    // Resolved fresh every invocation; the decorated test never caches it.
    let seconds = timeout::effective_timeout(test.options().timeout)?;
    trace!(test = test.name(), seconds, "resolved effective timeout");

    match test.body() {
        TestBody::Synchronous(body) => run_synchronous(test, body),
        TestBody::Suspendable(body) => run_suspendable(case_loop, test, body, seconds),
    }
}

fn run_synchronous(test: &DecoratedTest, body: &SynchronousBody) -> Result<(), HarnessError> {
    let cx = TestCx::for_test(test.name());
    match catch_unwind(AssertUnwindSafe(|| body(&cx))) {
        Ok(Ok(SyncReturn::Unit)) => Ok(()),
        Ok(Ok(SyncReturn::Value(value))) => Err(HarnessError::ignored_return(value)),
        Ok(Ok(SyncReturn::Suspended(suspended))) => {
            // Never polled: running it here would hide the wiring mistake.
            drop(suspended);
            Err(HarnessError::usage(format!(
                "{} is suspendable and should be decorated with DecoratedTest::suspendable",
                test.name()
            )))
        }
        Ok(Err(err)) => Err(err.with_trace_if_missing(cx.snapshot())),
        Err(payload) => Err(HarnessError::unexpected(panic_message(&*payload))
            .with_trace_if_missing(cx.snapshot())),
    }
}

fn run_suspendable(
    case_loop: &CaseLoop,
    test: &DecoratedTest,
    body: &SuspendableBody,
    seconds: f64,
) -> Result<(), HarnessError> {
    let cx = TestCx::for_test(test.name());
    let chain = cx.clone();
    let runtime = case_loop.runtime()?;

    let mut task = runtime.spawn(body(cx));
    runtime.block_on(async {
        tokio::select! {
            joined = &mut task => settle(joined, &chain),
            _ = tokio::time::sleep(Duration::from_secs_f64(seconds)) => {
                // Snapshot before aborting: the abort drops the body and
                // with it the frames it still had open.
                let snapshot = chain.snapshot();
                debug!(test = test.name(), seconds, "timeout elapsed, cancelling suspended body");
                task.abort();
                let _ = (&mut task).await;
                Err(HarnessError::Timeout {
                    seconds,
                    trace: Some(snapshot),
                })
            }
        }
    })
}

fn settle(
    joined: Result<Result<(), HarnessError>, JoinError>,
    chain: &TestCx,
) -> Result<(), HarnessError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.with_trace_if_missing(chain.snapshot())),
        Err(join_err) if join_err.is_panic() => {
            // The unwind skipped every scope pop, so the chain still shows
            // where the body was when it blew up.
            let payload = join_err.into_panic();
            Err(HarnessError::unexpected(panic_message(&*payload))
                .with_trace_if_missing(chain.snapshot()))
        }
        Err(_) => Err(HarnessError::unexpected(
            "test task was cancelled outside the timeout path",
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test body panicked".to_string()
    }
}
