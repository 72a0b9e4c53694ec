//! Strand: an asynchronous test-execution harness.
//!
//! Test bodies are written as suspendable futures and driven to completion
//! on a dedicated event loop per test-case instance, under a timeout policy
//! with a strict override precedence (environment override, then per-test
//! value, then a 5-second default). When a body fails, panics, or is
//! cancelled by the timeout, the report preserves the full chain of
//! suspended calls: the outer test routine and every routine it was
//! suspended inside of, down to the fault site.
//!
//! ```no_run
//! use strand::{run_test, DecoratedTest, TestOptions};
//!
//! let test = DecoratedTest::suspendable_with(
//!     "test_replication_lag",
//!     TestOptions::with_timeout(0.5).unwrap(),
//!     |cx| {
//!         Box::pin(async move {
//!             cx.scope("wait_for_secondary", async {
//!                 tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!                 Ok(())
//!             })
//!             .await
//!         })
//!     },
//! );
//! let outcome = run_test(&test);
//! assert!(outcome.is_passed());
//! ```

pub use crate::case::{
    BodyResult, DecoratedTest, DecoratorArg, SyncReturn, TestKind, TestOptions,
};
pub use crate::errors::{ErrorKind, HarnessError};
pub use crate::lifecycle::{run_case, run_test, CaseLoop, SuspendableCase};
pub use crate::report::{print_outcome, summarize, Outcome, ReportStyle, TestReport};
pub use crate::trace::{Frame, SuspensionTrace, TestCx};

pub mod case;
pub mod errors;
pub mod lifecycle;
pub mod report;
pub mod runner;
pub mod timeout;
pub mod trace;

/// Convenient imports for writing harness-driven tests.
pub mod prelude {
    pub use crate::case::{BodyResult, DecoratedTest, DecoratorArg, SyncReturn, TestOptions};
    pub use crate::errors::{ErrorKind, HarnessError};
    pub use crate::lifecycle::{run_case, run_test, CaseLoop, SuspendableCase};
    pub use crate::report::{summarize, Outcome};
    pub use crate::runner::invoke;
    pub use crate::timeout::{ScopedOverride, DEFAULT_TIMEOUT_SECS, TIMEOUT_ENV_VAR};
    pub use crate::trace::TestCx;
    pub use crate::{ensure, fail};
}
