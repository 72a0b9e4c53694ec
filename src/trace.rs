//! Suspension-chain capture and rendering.
//!
//! Every suspendable test body receives a [`TestCx`]. Entering a nested
//! routine through [`TestCx::scope`] records a frame on a shared stack before
//! the inner future is polled and removes it on orderly completion. When a
//! fault surfaces (an `Err`, a panic, or a timeout-triggered cancellation),
//! whatever is on the stack at that moment is snapshotted into a
//! [`SuspensionTrace`]: the outer test routine and every intermediate routine
//! it was suspended inside of, down to the fault site. The invoker holds a
//! clone of the stack so it can take this snapshot even while the body is
//! parked several await-levels deep.

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::HarnessError;

/// One recorded call-site descriptor on the suspension chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    routine: String,
    location: Option<CallSite>,
}

/// Source position of the `scope` call that opened a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl Frame {
    /// Entry frame for a test body; carries no call site of its own.
    pub fn entry(routine: impl Into<String>) -> Self {
        Self {
            routine: routine.into(),
            location: None,
        }
    }

    pub fn at(routine: impl Into<String>, location: &'static Location<'static>) -> Self {
        Self {
            routine: routine.into(),
            location: Some(CallSite {
                file: location.file(),
                line: location.line(),
            }),
        }
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(site) => write!(f, "{} ({}:{})", self.routine, site.file, site.line),
            None => write!(f, "{}", self.routine),
        }
    }
}

/// The live frame stack for one test invocation, shared between the body and
/// the invoker. Pushes and pops happen only on the loop's single thread; the
/// lock exists so the invoker can snapshot the chain from outside the task.
#[derive(Debug, Clone, Default)]
pub struct TraceStack {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl TraceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: Frame) {
        self.lock().push(frame);
    }

    pub fn pop(&self) {
        self.lock().pop();
    }

    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    /// Materializes the chain as it stands right now, outermost first.
    pub fn snapshot(&self) -> SuspensionTrace {
        SuspensionTrace {
            frames: self.lock().clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An immutable snapshot of the suspension chain at the moment of a fault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuspensionTrace {
    frames: Vec<Frame>,
}

impl SuspensionTrace {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True when a routine with this name appears anywhere on the chain.
    pub fn contains(&self, routine: &str) -> bool {
        self.frames.iter().any(|frame| frame.routine == routine)
    }
}

impl fmt::Display for SuspensionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "suspension chain (outermost first):")?;
        for frame in &self.frames {
            writeln!(f, "  {}", frame)?;
        }
        Ok(())
    }
}

/// Per-invocation context handed to every suspendable test body.
///
/// Cloning is cheap; clones share the same frame stack.
#[derive(Debug, Clone)]
pub struct TestCx {
    name: Arc<str>,
    stack: TraceStack,
}

impl TestCx {
    /// Creates the context for one invocation, with the test routine itself
    /// already recorded as the outermost frame.
    pub fn for_test(name: &str) -> Self {
        let stack = TraceStack::new();
        stack.push(Frame::entry(name));
        Self {
            name: Arc::from(name),
            stack,
        }
    }

    pub fn test_name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the chain as currently recorded.
    pub fn snapshot(&self) -> SuspensionTrace {
        self.stack.snapshot()
    }

    /// Number of frames currently open.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Runs `fut` as a named sub-routine of this test.
    ///
    /// The frame is recorded before the inner future is first polled, so a
    /// cancellation delivered while `fut` is suspended still sees the full
    /// chain. An `Err` surfacing here is stamped with the chain down to the
    /// innermost open frame; outer scopes leave an existing stamp alone.
    #[track_caller]
    pub fn scope<T, F>(
        &self,
        routine: impl Into<String>,
        fut: F,
    ) -> impl Future<Output = Result<T, HarnessError>> + Send
    where
        T: Send,
        F: Future<Output = Result<T, HarnessError>> + Send,
    {
        let frame = Frame::at(routine, Location::caller());
        let stack = self.stack.clone();
        async move {
            stack.push(frame);
            match fut.await {
                Ok(value) => {
                    stack.pop();
                    Ok(value)
                }
                Err(err) => {
                    // A panic unwinds straight through `fut.await` and skips
                    // both arms, leaving the frame in place for the post-join
                    // snapshot.
                    let err = err.with_trace_if_missing(stack.snapshot());
                    stack.pop();
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_frame_is_recorded_for_the_test_routine() {
        let cx = TestCx::for_test("test_example");
        let trace = cx.snapshot();
        assert_eq!(trace.frames().len(), 1);
        assert!(trace.contains("test_example"));
    }

    #[test]
    fn scope_pops_its_frame_on_success() {
        let cx = TestCx::for_test("outer");
        let result = futures::executor::block_on(cx.scope("middle", async { Ok(7) }));
        assert_eq!(result.unwrap(), 7);
        assert_eq!(cx.depth(), 1);
    }

    #[test]
    fn innermost_scope_stamps_the_error_with_the_full_chain() {
        let cx = TestCx::for_test("test_outer");
        let nested = cx.clone();
        let result: Result<(), HarnessError> = futures::executor::block_on(cx.scope(
            "middle",
            async move {
                nested
                    .scope("inner", async {
                        Err(HarnessError::assertion("expected error"))
                    })
                    .await
            },
        ));
        let err = result.unwrap_err();
        let trace = err.trace().expect("fault should carry a trace");
        let names: Vec<_> = trace.frames().iter().map(Frame::routine).collect();
        assert_eq!(names, ["test_outer", "middle", "inner"]);
    }

    #[test]
    fn rendered_chain_lists_routines_outermost_first() {
        let stack = TraceStack::new();
        stack.push(Frame::entry("test_a"));
        stack.push(Frame::at("b", Location::caller()));
        let rendered = stack.snapshot().to_string();
        let a = rendered.find("test_a").unwrap();
        let b = rendered.find("\n  b").unwrap();
        assert!(a < b);
        assert!(rendered.contains("suspension chain"));
    }
}
