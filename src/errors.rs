//! Unified error handling for the harness.
//!
//! Every fault a test invocation can produce is a [`HarnessError`]. The
//! variants map one-to-one onto the outcome taxonomy: `Assertion` becomes a
//! Failed outcome, everything else becomes Errored. Variants raised inside a
//! running body carry the [`SuspensionTrace`] captured at the fault site.
//!
//! Test bodies raise assertion faults with the [`fail!`] and [`ensure!`]
//! macros rather than panicking, so the harness can classify them.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::trace::SuspensionTrace;

/// Type-safe fault classification, mirroring the [`HarnessError`] variants.
/// Test assertions match on this instead of on message substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Invalid decoration or an unusable timeout override.
    Configuration,
    /// The harness was driven wrongly: an undecorated suspendable body, or a
    /// disposed loop pressed back into service.
    Usage,
    /// An assertion raised by test body logic.
    Assertion,
    /// The effective timeout elapsed and the body was cancelled.
    Timeout,
    /// A synchronous body returned a value the harness has no use for.
    IgnoredReturn,
    /// Anything else, including panics out of the body.
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Configuration",
            ErrorKind::Usage => "Usage",
            ErrorKind::Assertion => "Assertion",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::IgnoredReturn => "IgnoredReturn",
            ErrorKind::Unexpected => "Unexpected",
        }
    }

    const fn code_suffix(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Usage => "usage",
            ErrorKind::Assertion => "assertion",
            ErrorKind::Timeout => "timeout",
            ErrorKind::IgnoredReturn => "ignored_return",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for every harness failure mode.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid test configuration: {message}")]
    Configuration { message: String },

    #[error("{message}")]
    Usage { message: String },

    #[error("{message}")]
    Assertion {
        message: String,
        trace: Option<SuspensionTrace>,
    },

    #[error("timed out after {seconds} seconds")]
    Timeout {
        seconds: f64,
        trace: Option<SuspensionTrace>,
    },

    #[error("Return value from test method ignored: {value}")]
    IgnoredReturn { value: String },

    #[error("{message}")]
    Unexpected {
        message: String,
        trace: Option<SuspensionTrace>,
    },
}

impl HarnessError {
    pub fn configuration(message: impl Into<String>) -> Self {
        HarnessError::Configuration {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        HarnessError::Usage {
            message: message.into(),
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        HarnessError::Assertion {
            message: message.into(),
            trace: None,
        }
    }

    pub fn timeout(seconds: f64) -> Self {
        HarnessError::Timeout {
            seconds,
            trace: None,
        }
    }

    pub fn ignored_return(value: impl Into<String>) -> Self {
        HarnessError::IgnoredReturn {
            value: value.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        HarnessError::Unexpected {
            message: message.into(),
            trace: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Configuration { .. } => ErrorKind::Configuration,
            HarnessError::Usage { .. } => ErrorKind::Usage,
            HarnessError::Assertion { .. } => ErrorKind::Assertion,
            HarnessError::Timeout { .. } => ErrorKind::Timeout,
            HarnessError::IgnoredReturn { .. } => ErrorKind::IgnoredReturn,
            HarnessError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// The suspension chain captured when this fault surfaced, if any.
    pub fn trace(&self) -> Option<&SuspensionTrace> {
        match self {
            HarnessError::Assertion { trace, .. }
            | HarnessError::Timeout { trace, .. }
            | HarnessError::Unexpected { trace, .. } => trace.as_ref(),
            _ => None,
        }
    }

    /// Stamps `snapshot` onto the error unless it already carries a chain.
    /// The innermost suspension boundary wins; outer boundaries are no-ops.
    pub fn with_trace_if_missing(mut self, snapshot: SuspensionTrace) -> Self {
        if let HarnessError::Assertion { trace, .. }
        | HarnessError::Timeout { trace, .. }
        | HarnessError::Unexpected { trace, .. } = &mut self
        {
            if trace.is_none() {
                *trace = Some(snapshot);
            }
        }
        self
    }

    /// Assertion faults report as Failed; every other kind reports as
    /// Errored.
    pub fn is_failure(&self) -> bool {
        matches!(self, HarnessError::Assertion { .. })
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("strand::{}", self.kind().code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help: &str = match self {
            HarnessError::Configuration { .. } => {
                "pass the timeout by name: TestOptions::from_args(&[DecoratorArg::Timeout(..)])"
            }
            HarnessError::Usage { .. } => {
                "register suspendable bodies with DecoratedTest::suspendable so the \
                 harness schedules them on the event loop"
            }
            HarnessError::IgnoredReturn { .. } => {
                "test bodies produce no meaningful return value; a returned value \
                 usually signals a wiring mistake"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Raises an assertion fault from a test body.
///
/// Expands to an early `return Err(..)`, so the enclosing body must return
/// `Result<_, HarnessError>`.
#[macro_export]
macro_rules! fail {
    ($($arg:tt)*) => {
        return Err($crate::errors::HarnessError::assertion(format!($($arg)*)))
    };
}

/// Raises an assertion fault unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr) => {
        if !$cond {
            $crate::fail!("condition failed: {}", stringify!($cond));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::fail!($($arg)*);
        }
    };
}
