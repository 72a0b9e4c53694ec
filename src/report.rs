//! The outcome boundary.
//!
//! Each invocation hands exactly one [`Outcome`] to the caller: passed,
//! failed on an assertion, or errored on anything else. Failed and errored
//! outcomes carry a [`TestReport`] whose trace text names every routine on
//! the suspension chain at the fault, outermost first. Aggregation beyond
//! [`summarize`] is the caller's concern.

use serde::Serialize;

use crate::errors::{ErrorKind, HarnessError};

/// Diagnostic payload for a non-passing outcome.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test: String,
    pub kind: ErrorKind,
    pub message: String,
    /// Rendered suspension chain; empty when the fault never entered the
    /// body (configuration errors, ignored returns).
    pub trace: String,
}

impl TestReport {
    fn render(test: &str, error: &HarnessError) -> Self {
        Self {
            test: test.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            trace: error
                .trace()
                .map(|chain| chain.to_string())
                .unwrap_or_default(),
        }
    }

    /// Full diagnostic text: message, then the chain.
    pub fn text(&self) -> String {
        if self.trace.is_empty() {
            self.message.clone()
        } else {
            format!("{}\n{}", self.message, self.trace)
        }
    }
}

/// Exactly one of these is produced per invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed { test: String },
    Failed(TestReport),
    Errored(TestReport),
}

impl Outcome {
    pub fn passed(test: &str) -> Self {
        Outcome::Passed {
            test: test.to_string(),
        }
    }

    pub fn from_error(test: &str, error: HarnessError) -> Self {
        let report = TestReport::render(test, &error);
        if error.is_failure() {
            Outcome::Failed(report)
        } else {
            Outcome::Errored(report)
        }
    }

    pub fn test(&self) -> &str {
        match self {
            Outcome::Passed { test } => test,
            Outcome::Failed(report) | Outcome::Errored(report) => &report.test,
        }
    }

    pub fn report(&self) -> Option<&TestReport> {
        match self {
            Outcome::Passed { .. } => None,
            Outcome::Failed(report) | Outcome::Errored(report) => Some(report),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored(_))
    }
}

// Color constants for terminal output
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";

/// Rendering configuration for per-test report lines.
pub struct ReportStyle {
    pub use_colors: bool,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl ReportStyle {
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

/// Prints one per-test line, with the diagnostic text for non-passing
/// outcomes.
pub fn print_outcome(outcome: &Outcome, style: &ReportStyle) {
    match outcome {
        Outcome::Passed { test } => {
            println!("{}: {}", style.colorize("PASS", GREEN), test);
        }
        Outcome::Failed(report) => {
            eprintln!("{}: {}", style.colorize("FAIL", RED), report.test);
            eprintln!("  {}", report.text().replace('\n', "\n  "));
        }
        Outcome::Errored(report) => {
            eprintln!(
                "{}: {} [{}]",
                style.colorize("ERROR", RED),
                report.test,
                report.kind
            );
            eprintln!("  {}", report.text().replace('\n', "\n  "));
        }
    }
}

/// Partitions outcomes into (passed, failed, errored) counts.
pub fn summarize(outcomes: &[Outcome]) -> (usize, usize, usize) {
    let passed = outcomes.iter().filter(|o| o.is_passed()).count();
    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    let errored = outcomes.iter().filter(|o| o.is_errored()).count();
    (passed, failed, errored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_faults_report_as_failed() {
        let outcome = Outcome::from_error("test_x", HarnessError::assertion("expected error"));
        assert!(outcome.is_failed());
        assert!(outcome.report().unwrap().message.contains("expected error"));
    }

    #[test]
    fn timeouts_report_as_errored_with_the_timeout_kind() {
        let outcome = Outcome::from_error("test_x", HarnessError::timeout(0.01));
        assert!(outcome.is_errored());
        let report = outcome.report().unwrap();
        assert_eq!(report.kind, ErrorKind::Timeout);
        assert!(report.message.contains("timed out after 0.01 seconds"));
    }

    #[test]
    fn summarize_partitions_by_outcome() {
        let outcomes = vec![
            Outcome::passed("a"),
            Outcome::from_error("b", HarnessError::assertion("boom")),
            Outcome::from_error("c", HarnessError::timeout(1.0)),
        ];
        assert_eq!(summarize(&outcomes), (1, 1, 1));
    }
}
