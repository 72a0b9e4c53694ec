//! Lifecycle tests: loop-per-case ownership, hook ordering, guaranteed
//! teardown and disposal on every exit path.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use strand::prelude::*;

#[derive(Default)]
struct RecordingCase {
    events: Arc<Mutex<Vec<&'static str>>>,
    fail_set_up: bool,
    fail_tear_down: bool,
}

impl SuspendableCase for RecordingCase {
    fn set_up(&mut self, case_loop: &CaseLoop) -> Result<(), HarnessError> {
        // Hooks drive their own suspendable work; nothing is auto-wrapped.
        case_loop.block_on(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
        })?;
        self.events.lock().unwrap().push("set_up");
        if self.fail_set_up {
            return Err(HarnessError::unexpected("fixture database unavailable"));
        }
        Ok(())
    }

    fn tear_down(&mut self, case_loop: &CaseLoop) -> Result<(), HarnessError> {
        case_loop.block_on(async {})?;
        self.events.lock().unwrap().push("tear_down");
        if self.fail_tear_down {
            return Err(HarnessError::unexpected("fixture teardown failed"));
        }
        Ok(())
    }
}

fn recording_test(
    events: Arc<Mutex<Vec<&'static str>>>,
    result: fn() -> BodyResult,
) -> DecoratedTest {
    DecoratedTest::suspendable("test_recorded", move |_cx| {
        let events = events.clone();
        Box::pin(async move {
            events.lock().unwrap().push("body");
            result()
        })
    })
}

#[test]
fn hooks_bracket_the_body() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let mut case = RecordingCase::default();
    let events = case.events.clone();
    let test = recording_test(events.clone(), || Ok(()));

    let outcome = run_case(&mut case, &test);
    assert!(outcome.is_passed());
    assert_eq!(*events.lock().unwrap(), ["set_up", "body", "tear_down"]);
}

#[test]
fn tear_down_runs_when_the_body_fails() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let mut case = RecordingCase::default();
    let events = case.events.clone();
    let test = recording_test(events.clone(), || {
        Err(HarnessError::assertion("expected error"))
    });

    let outcome = run_case(&mut case, &test);
    assert!(outcome.is_failed());
    assert_eq!(*events.lock().unwrap(), ["set_up", "body", "tear_down"]);
}

#[test]
fn set_up_fault_is_the_outcome_and_tear_down_still_runs() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let mut case = RecordingCase {
        fail_set_up: true,
        ..RecordingCase::default()
    };
    let events = case.events.clone();
    let test = recording_test(events.clone(), || Ok(()));

    let outcome = run_case(&mut case, &test);
    assert!(outcome.is_errored());
    assert!(outcome
        .report()
        .unwrap()
        .message
        .contains("fixture database unavailable"));
    // The body never ran; teardown still did.
    assert_eq!(*events.lock().unwrap(), ["set_up", "tear_down"]);
}

#[test]
fn tear_down_fault_after_a_pass_is_the_outcome() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let mut case = RecordingCase {
        fail_tear_down: true,
        ..RecordingCase::default()
    };
    let events = case.events.clone();
    let test = recording_test(events.clone(), || Ok(()));

    let outcome = run_case(&mut case, &test);
    assert!(outcome.is_errored());
    assert!(outcome
        .report()
        .unwrap()
        .message
        .contains("fixture teardown failed"));
}

#[test]
fn body_fault_is_not_masked_by_a_tear_down_fault() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let mut case = RecordingCase {
        fail_tear_down: true,
        ..RecordingCase::default()
    };
    let events = case.events.clone();
    let test = recording_test(events.clone(), || {
        Err(HarnessError::assertion("expected error"))
    });

    let outcome = run_case(&mut case, &test);
    assert!(outcome.is_failed());
    assert!(outcome.report().unwrap().message.contains("expected error"));
}

#[test]
fn invoking_on_a_disposed_loop_is_a_usage_error() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let mut case_loop = CaseLoop::new().unwrap();
    case_loop.dispose();

    let test = DecoratedTest::suspendable("test_after_dispose", |_cx| Box::pin(async { Ok(()) }));
    let outcome = invoke(&case_loop, &test);
    assert!(outcome.is_errored());

    let report = outcome.report().unwrap();
    assert_eq!(report.kind, ErrorKind::Usage);
    assert!(report.message.contains("disposed"));
}

#[test]
fn each_case_instance_gets_a_fresh_loop() {
    let _env = common::serialized();
    let _clear = ScopedOverride::clear();

    let events = Arc::new(Mutex::new(Vec::new()));
    let test = recording_test(events.clone(), || Ok(()));

    // The first run's loop is disposed with its instance; the second run
    // builds its own and is unaffected.
    let mut first = RecordingCase::default();
    assert!(run_case(&mut first, &test).is_passed());
    let mut second = RecordingCase::default();
    assert!(run_case(&mut second, &test).is_passed());
}
