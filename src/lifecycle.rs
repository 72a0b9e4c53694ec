//! Event-loop ownership per test-case instance.
//!
//! Each instance gets a freshly built single-threaded loop before setup,
//! keeps exclusive use of it through the body and teardown, and has it fully
//! disposed afterwards on every exit path. Setup and teardown hooks that
//! contain suspension points drive them to completion themselves through
//! [`CaseLoop::block_on`]; only test bodies get automatic scheduling and
//! timeout enforcement.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::case::DecoratedTest;
use crate::errors::HarnessError;
use crate::report::Outcome;
use crate::runner;

/// The event loop owned by one test-case instance.
///
/// Wraps a current-thread Tokio runtime with timers enabled. Dropping the
/// handle disposes the loop; an explicitly disposed loop refuses further use
/// instead of being resurrected.
pub struct CaseLoop {
    runtime: Option<Runtime>,
}

impl CaseLoop {
    pub fn new() -> Result<Self, HarnessError> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|err| {
                HarnessError::unexpected(format!("failed to build event loop: {err}"))
            })?;
        debug!("created event loop for test case");
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Drives a future to completion on this loop. Setup and teardown hooks
    /// use this to run their own suspendable work explicitly.
    pub fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, HarnessError> {
        Ok(self.runtime()?.block_on(fut))
    }

    pub fn is_disposed(&self) -> bool {
        self.runtime.is_none()
    }

    /// Shuts the loop down. Idempotent; later use reports a usage error.
    pub fn dispose(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            drop(runtime);
            debug!("disposed event loop");
        }
    }

    pub(crate) fn runtime(&self) -> Result<&Runtime, HarnessError> {
        self.runtime.as_ref().ok_or_else(|| {
            HarnessError::usage("event loop already disposed; a disposed loop must not be reused")
        })
    }
}

impl Drop for CaseLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Lifecycle hooks consumed from the test-case instance. Both hooks receive
/// the instance's loop and may call [`CaseLoop::block_on`] directly; neither
/// is auto-wrapped.
pub trait SuspendableCase {
    fn set_up(&mut self, case_loop: &CaseLoop) -> Result<(), HarnessError> {
        let _ = case_loop;
        Ok(())
    }

    fn tear_down(&mut self, case_loop: &CaseLoop) -> Result<(), HarnessError> {
        let _ = case_loop;
        Ok(())
    }
}

/// Runs one test against one case instance: loop creation, setup, body,
/// teardown, disposal, in that order, with teardown and disposal guaranteed
/// even when the body or setup faulted.
pub fn run_case<C: SuspendableCase>(case: &mut C, test: &DecoratedTest) -> Outcome {
    let mut case_loop = match CaseLoop::new() {
        Ok(case_loop) => case_loop,
        Err(err) => return Outcome::from_error(test.name(), err),
    };

    let outcome = match case.set_up(&case_loop) {
        Ok(()) => runner::invoke(&case_loop, test),
        Err(err) => Outcome::from_error(test.name(), err),
    };

    let outcome = match case.tear_down(&case_loop) {
        Ok(()) => outcome,
        Err(err) if outcome.is_passed() => Outcome::from_error(test.name(), err),
        Err(err) => {
            // The body's fault is the report; the teardown fault must not
            // mask it.
            warn!(test = test.name(), error = %err, "tear_down failed after a non-passing body");
            outcome
        }
    };

    case_loop.dispose();
    outcome
}

/// Runs a test with no setup or teardown of its own.
pub fn run_test(test: &DecoratedTest) -> Outcome {
    struct Bare;
    impl SuspendableCase for Bare {}
    run_case(&mut Bare, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn disposed_loop_refuses_further_work() {
        let mut case_loop = CaseLoop::new().unwrap();
        assert!(!case_loop.is_disposed());
        case_loop.dispose();
        assert!(case_loop.is_disposed());

        let err = case_loop.block_on(async { 1 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut case_loop = CaseLoop::new().unwrap();
        case_loop.dispose();
        case_loop.dispose();
        assert!(case_loop.is_disposed());
    }

    #[test]
    fn loop_drives_suspendable_work_for_hooks() {
        let case_loop = CaseLoop::new().unwrap();
        let value = case_loop
            .block_on(async {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                41 + 1
            })
            .unwrap();
        assert_eq!(value, 42);
    }
}
