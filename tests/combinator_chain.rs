//! End-to-end chain scenarios: a request pipeline built from `then`,
//! `catch`, `finally` and `copy_result_to`.

#![allow(missing_docs)]

mod common;

use common::{HitCounter, NotImplemented, TestError, init_test_logging};
use parking_lot::Mutex;
use std::sync::Arc;
use taskchain::{
    CancelSource, CompletionSource, Fault, Outcome, Task, TaskStatus, UsageError,
    assert_outcome_cancelled, assert_outcome_faulted, assert_outcome_ok, assert_with_log,
    test_complete, test_phase, test_section, when_all,
};

#[test]
fn not_implemented_short_circuits_rest_of_chain() {
    init_test_logging();
    test_phase!("not_implemented_short_circuits_rest_of_chain");
    let later = HitCounter::new();
    let stage = later.clone();

    let result = Task::completed()
        .then(|()| Err::<(), _>(NotImplemented))
        .then(move |()| stage.hit());

    let fault = result.fault().expect("chain faulted");
    assert_with_log!(fault.len() == 1, "single error", 1, fault.len());
    assert!(fault.is::<NotImplemented>());
    assert_eq!(later.hits(), 0);
    test_complete!("not_implemented_short_circuits_rest_of_chain");
}

/// bind -> invoke -> filters -> serialize, with telemetry in `finally`.
fn pipeline(
    request: Task<String>,
    telemetry: Arc<Mutex<Vec<&'static str>>>,
) -> Task<String> {
    request
        .then(|body| {
            body.parse::<u32>()
                .map_err(|err| TestError::new(format!("bind: {err}")))
        })
        .then(|id| {
            if id == 0 {
                Err(NotImplemented.into())
            } else {
                Ok::<_, Fault>(format!("action-{id}"))
            }
        })
        .then(|result| Task::from_result(result.to_uppercase()))
        .catch(|fault| {
            if fault.is::<NotImplemented>() {
                Task::from_result("501".to_string())
            } else {
                Task::<String>::faulted(fault)
            }
        })
        .then(|payload| Ok::<_, Fault>(format!("{{\"body\":\"{payload}\"}}")))
        .finally(move || telemetry.lock().push("telemetry"))
}

#[test]
fn pipeline_happy_path() {
    init_test_logging();
    test_phase!("pipeline_happy_path");
    let telemetry = Arc::new(Mutex::new(Vec::new()));
    let request = CompletionSource::new();
    let response = pipeline(request.task(), Arc::clone(&telemetry));

    test_section!("request pending");
    assert_eq!(response.status(), TaskStatus::Pending);
    assert!(telemetry.lock().is_empty());

    test_section!("request arrives");
    request.try_set_result("42".to_string());
    assert_outcome_ok!(response.wait(), "{\"body\":\"ACTION-42\"}".to_string());
    assert_eq!(*telemetry.lock(), vec!["telemetry"]);
}

#[test]
fn pipeline_recovers_from_not_implemented() {
    init_test_logging();
    let telemetry = Arc::new(Mutex::new(Vec::new()));
    let response = pipeline(Task::from_result("0".to_string()), Arc::clone(&telemetry));
    assert_eq!(
        response.try_get_result().as_deref(),
        Some("{\"body\":\"501\"}")
    );
    assert_eq!(telemetry.lock().len(), 1);
}

#[test]
fn pipeline_rethrows_other_faults_and_still_runs_telemetry() {
    init_test_logging();
    let telemetry = Arc::new(Mutex::new(Vec::new()));
    let response = pipeline(Task::from_result("abc".to_string()), Arc::clone(&telemetry));
    assert_outcome_faulted!(response.wait(), TestError);
    assert_eq!(telemetry.lock().len(), 1);
}

#[test]
fn pipeline_cancelled_request_skips_everything_but_finally() {
    init_test_logging();
    let telemetry = Arc::new(Mutex::new(Vec::new()));
    let response = pipeline(Task::cancelled(), Arc::clone(&telemetry));
    assert_outcome_cancelled!(response.wait());
    assert_eq!(telemetry.lock().len(), 1);
}

#[test]
fn manual_cancellation_stops_later_stages() {
    init_test_logging();
    let later = HitCounter::new();
    let stage = later.clone();
    let result = Task::completed()
        .then(|()| Task::<()>::cancelled())
        .then(move |()| stage.hit());
    assert!(result.is_cancelled());
    assert_eq!(later.hits(), 0);
}

#[test]
fn token_cancellation_between_stages() {
    init_test_logging();
    let cancel = CancelSource::new();
    let token = cancel.token();
    let later = HitCounter::new();
    let stage = later.clone();

    let result = Task::from_result(1)
        .then(move |v| {
            cancel.cancel();
            Ok::<_, Fault>(v)
        })
        .then_with_token(move |_| stage.hit(), &token);

    assert!(result.is_cancelled());
    assert_eq!(later.hits(), 0);
}

#[test]
fn catch_returning_none_is_prohibited() {
    init_test_logging();
    let result = Task::<()>::faulted(NotImplemented).catch(|_| None::<Task<()>>);
    assert_outcome_faulted!(result.wait(), UsageError);
}

#[test]
fn catch_can_rethrow_the_same_fault() {
    init_test_logging();
    let original = Fault::new(NotImplemented);
    let result = Task::<u8>::faulted(original.clone()).catch(Task::<u8>::faulted);
    let fault = result.fault().expect("faulted");
    assert!(fault.ptr_eq(&original));
}

#[test]
fn when_all_fault_is_flattened_for_catch() {
    init_test_logging();
    test_phase!("when_all_fault_is_flattened_for_catch");
    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);

    let joined = when_all([
        Task::from_result(1),
        Task::faulted(NotImplemented),
        Task::faulted(TestError::new("second")),
    ]);
    let recovered = joined.catch(move |fault| {
        *slot.lock() = Some(fault);
        Task::from_result(Vec::<i32>::new())
    });

    assert_eq!(recovered.try_get_result(), Some(Vec::new()));
    let fault = seen.lock().take().expect("handler ran");
    assert_eq!(fault.len(), 1);
    assert!(fault.is::<NotImplemented>());
}

#[test]
fn copy_result_hands_outcome_to_outside_caller() {
    init_test_logging();
    let handed_out = CompletionSource::<String>::new();
    let caller_view = handed_out.task();

    let request = CompletionSource::<u32>::new();
    let done = request
        .task()
        .then(|v| Ok::<_, Fault>(format!("value {v}")))
        .copy_result_to(&handed_out);
    assert!(!done.is_completed());

    request.try_set_result(9);
    assert!(done.is_ok());
    assert_eq!(caller_view.try_get_result().as_deref(), Some("value 9"));
}

#[test]
fn copy_completion_signals_void_chain() {
    init_test_logging();
    let signal = CompletionSource::<&'static str>::new();
    let done = Task::completed()
        .finally(|| ())
        .copy_completion_to(&signal, "flushed");
    assert!(done.is_ok());
    assert_eq!(signal.task().try_get_result(), Some("flushed"));
}

#[test]
fn try_get_result_reports_only_success() {
    init_test_logging();
    assert_eq!(Task::from_result(5).try_get_result(), Some(5));
    assert_eq!(Task::<u8>::cancelled().try_get_result(), None);
    let faulted = Task::<u8>::faulted(NotImplemented);
    assert_eq!(faulted.try_get_result(), None);
    assert!(!faulted.is_fault_observed());
    assert_eq!(CompletionSource::<u8>::new().task().try_get_result(), None);
}

#[test]
fn tasks_are_futures() {
    init_test_logging();
    let source = CompletionSource::<u32>::new();
    let chained = source.task().then(|v| Ok::<_, Fault>(v + 1));
    let producer = std::thread::spawn(move || {
        source.try_set_result(1);
    });
    let outcome = futures_lite::future::block_on(async { chained.await });
    producer.join().expect("producer panicked");
    assert!(matches!(outcome, Outcome::Ok(2)));
}

#[test]
fn deep_pending_chain_completes() {
    init_test_logging();
    test_phase!("deep_pending_chain_completes");
    let request = CompletionSource::<u64>::new();
    let mut chain = request.task();
    for _ in 0..20_000 {
        chain = chain.then(|v| Ok::<_, Fault>(v + 1));
    }
    let finished = HitCounter::new();
    let cleanup = finished.clone();
    let response = chain
        .catch(Task::<u64>::faulted)
        .finally(move || cleanup.hit());

    assert!(!response.is_completed());
    request.try_set_result(0);
    assert_eq!(response.try_get_result(), Some(20_000));
    assert_eq!(finished.hits(), 1);
}

#[test]
fn deep_pending_chain_forwards_early_fault() {
    init_test_logging();
    let request = CompletionSource::<u64>::new();
    let mut chain = request.task();
    for _ in 0..20_000 {
        chain = chain.then(|v| Ok::<_, Fault>(v + 1));
    }
    let original = Fault::new(NotImplemented);
    request.try_set_fault(original.clone());
    let fault = chain.fault().expect("faulted");
    assert!(fault.ptr_eq(&original));
}
