//! Test decoration and shape validation.
//!
//! A [`DecoratedTest`] binds a named body to optional configuration and a
//! [`TestKind`] capability tag. The tag is decided once, here, at decoration
//! time; nothing downstream re-derives the body's shape reflectively.
//!
//! Configuration accepts only the named `timeout` key. A positional argument
//! is the classic typo where a duration is passed bare and would be silently
//! ignored, so it is rejected immediately at decoration time.

use std::fmt;

use futures::future::BoxFuture;

use crate::errors::HarnessError;
use crate::trace::TestCx;

/// What a test body produces: nothing on success, or a classified fault.
pub type BodyResult = Result<(), HarnessError>;

/// A suspendable body: invoked with the per-test context, yields a future the
/// invoker schedules on the case's event loop.
pub type SuspendableBody = Box<dyn Fn(TestCx) -> BoxFuture<'static, BodyResult> + Send + Sync>;

/// A synchronous body. Runs to completion on the calling thread and reports
/// what it returned so the invoker can police the contract.
pub type SynchronousBody =
    Box<dyn Fn(&TestCx) -> Result<SyncReturn, HarnessError> + Send + Sync>;

/// Decided once at decoration time and carried as metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Synchronous,
    Suspendable,
}

/// What a synchronous body handed back to the harness.
pub enum SyncReturn {
    /// No return value; the only shape a healthy synchronous test has.
    Unit,
    /// A rendered return value. Test methods produce no meaningful return
    /// value, so this is surfaced as an error rather than dropped.
    Value(String),
    /// A not-yet-run suspension object: the body is coroutine-shaped but was
    /// registered without the suspendable decoration. Surfaced as a usage
    /// error; the future is never polled.
    Suspended(BoxFuture<'static, BodyResult>),
}

impl fmt::Debug for SyncReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncReturn::Unit => f.write_str("SyncReturn::Unit"),
            SyncReturn::Value(value) => write!(f, "SyncReturn::Value({value:?})"),
            SyncReturn::Suspended(_) => f.write_str("SyncReturn::Suspended(..)"),
        }
    }
}

/// Decoration-time configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TestOptions {
    /// Per-test timeout in seconds. Subject to the override precedence in
    /// [`crate::timeout`]; never mutated after decoration.
    pub timeout: Option<f64>,
}

/// One argument of a decoration call, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecoratorArg {
    /// A bare value in configuration position.
    Positional(f64),
    /// The named `timeout` key, in seconds.
    Timeout(f64),
}

impl TestOptions {
    /// Validates a decoration argument list. Only the named `timeout` key is
    /// accepted; anything positional fails here, before any test runs.
    pub fn from_args(args: &[DecoratorArg]) -> Result<Self, HarnessError> {
        let mut options = TestOptions::default();
        for arg in args {
            match *arg {
                DecoratorArg::Positional(value) => {
                    return Err(HarnessError::configuration(format!(
                        "positional argument {value} is not accepted; \
                         pass the timeout by name as timeout=<seconds>"
                    )));
                }
                DecoratorArg::Timeout(seconds) => {
                    if seconds <= 0.0 || !seconds.is_finite() {
                        return Err(HarnessError::configuration(format!(
                            "timeout must be a positive number of seconds, got {seconds}"
                        )));
                    }
                    options.timeout = Some(seconds);
                }
            }
        }
        Ok(options)
    }

    /// Shorthand for the common `timeout=<seconds>` decoration.
    pub fn with_timeout(seconds: f64) -> Result<Self, HarnessError> {
        Self::from_args(&[DecoratorArg::Timeout(seconds)])
    }
}

pub(crate) enum TestBody {
    Synchronous(SynchronousBody),
    Suspendable(SuspendableBody),
}

/// A test method bound to its configuration and capability tag.
pub struct DecoratedTest {
    name: String,
    kind: TestKind,
    options: TestOptions,
    body: TestBody,
}

impl DecoratedTest {
    /// Bare decoration of a suspendable body: no configuration.
    pub fn suspendable<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestCx) -> BoxFuture<'static, BodyResult> + Send + Sync + 'static,
    {
        Self::suspendable_with(name, TestOptions::default(), body)
    }

    /// Decoration of a suspendable body with validated options.
    pub fn suspendable_with<F>(name: impl Into<String>, options: TestOptions, body: F) -> Self
    where
        F: Fn(TestCx) -> BoxFuture<'static, BodyResult> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: TestKind::Suspendable,
            options,
            body: TestBody::Suspendable(Box::new(body)),
        }
    }

    /// Registration of a plain synchronous body.
    pub fn synchronous<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&TestCx) -> Result<SyncReturn, HarnessError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: TestKind::Synchronous,
            options: TestOptions::default(),
            body: TestBody::Synchronous(Box::new(body)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn options(&self) -> TestOptions {
        self.options
    }

    pub(crate) fn body(&self) -> &TestBody {
        &self.body
    }
}

impl fmt::Debug for DecoratedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratedTest")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn positional_configuration_is_rejected_at_decoration_time() {
        let err = TestOptions::from_args(&[DecoratorArg::Positional(10.0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("timeout=<seconds>"));
    }

    #[test]
    fn named_timeout_is_accepted() {
        let options = TestOptions::from_args(&[DecoratorArg::Timeout(0.01)]).unwrap();
        assert_eq!(options.timeout, Some(0.01));
    }

    #[test]
    fn empty_argument_list_means_defaults() {
        assert_eq!(TestOptions::from_args(&[]).unwrap(), TestOptions::default());
    }

    #[test]
    fn non_positive_timeout_is_rejected() {
        assert!(TestOptions::with_timeout(0.0).is_err());
        assert!(TestOptions::with_timeout(-0.5).is_err());
        assert!(TestOptions::with_timeout(f64::NAN).is_err());
    }

    #[test]
    fn decoration_tags_the_capability_once() {
        let suspendable =
            DecoratedTest::suspendable("test_tagged", |_cx| Box::pin(async { Ok(()) }));
        assert_eq!(suspendable.kind(), TestKind::Suspendable);

        let synchronous = DecoratedTest::synchronous("test_plain", |_cx| Ok(SyncReturn::Unit));
        assert_eq!(synchronous.kind(), TestKind::Synchronous);
    }
}
