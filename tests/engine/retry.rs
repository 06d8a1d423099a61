//! Result wrapper and retry tracking against the in-memory target

use crate::common::*;
use fsmload::{retry_until_ok, Outcome, RetryConfig, RetryTracker};
use std::time::Duration;

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(2))
}

#[test]
fn evaluate_captures_raise_and_return() {
    let target = MemoryTarget::new();
    target.inject("ping", FaultPlan::Once(Fault::new(6, "host unreachable")));
    let ping = cmd(json!({"ping": 1}));

    let raised = Outcome::evaluate(|| target.run_command("admin", &ping, None));
    assert!(raised.is_fault());
    assert!(!raised.is_ok());

    let returned = Outcome::evaluate(|| target.run_command("admin", &ping, None));
    assert!(returned.is_ok());
    assert!(returned.into_result().unwrap().is_success());
}

#[test]
fn returned_failure_is_not_ok() {
    let target = MemoryTarget::new();
    let outcome = Outcome::evaluate(|| target.run_command("test", &cmd(json!({"drop": "nope"})), None));
    assert!(!outcome.is_fault());
    assert!(!outcome.is_ok());
    let summary = outcome.dispatch(
        |reply| format!("returned {:?}", reply.status()),
        |fault| format!("raised {}", fault.code),
    );
    assert_eq!(summary, "returned Failed");
}

#[test]
fn retry_survives_transient_faults() {
    let target = MemoryTarget::new();
    target.inject("insert", FaultPlan::Once(Fault::new(91, "shutdown in progress")));
    target.inject("insert", FaultPlan::Once(Fault::new(189, "primary stepped down")));
    let insert = cmd(json!({"insert": "c", "documents": [{"x": 1}]}));

    let outcome = retry_until_ok(&fast_retry(5), |_| {
        Outcome::evaluate(|| target.run_command("test", &insert, None))
    })
    .unwrap();
    assert!(outcome.is_ok());
    assert_eq!(target.command_count(), 3);
}

#[test]
fn retry_gives_up_after_max_attempts() {
    let target = MemoryTarget::new();
    target.inject("ping", FaultPlan::Always(Fault::new(6, "host unreachable")));
    let ping = cmd(json!({"ping": 1}));

    let mut seen = Vec::new();
    let outcome = retry_until_ok(&fast_retry(4), |attempt| {
        seen.push(attempt.remaining_attempts);
        Outcome::evaluate(|| target.run_command("admin", &ping, None))
    })
    .unwrap();

    assert!(outcome.fault().unwrap().has_code(6));
    assert_eq!(seen, vec![3, 2, 1, 0]);
    assert_eq!(target.command_count(), 4);
}

#[test]
fn tracker_stops_at_deadline() {
    let target = MemoryTarget::new();
    target.inject("ping", FaultPlan::Stall(Duration::from_millis(30)));
    let ping = cmd(json!({"ping": 1}));

    let mut attempts = 0;
    for _ in RetryTracker::new(100, Duration::from_millis(10)) {
        attempts += 1;
        let _ = target.run_command("admin", &ping, None);
    }
    assert_eq!(attempts, 1);
}

#[test]
fn action_retries_through_context() {
    let target = MemoryTarget::new();
    target.inject("create", FaultPlan::Once(Fault::new(91, "shutdown in progress")));

    let workload = Workload::builder()
        .state("create", |ctx| {
            ctx.retry_command("test", &cmd(json!({"create": ctx.target_name()})))
                .map(|_| ())
        })
        .uniform_transitions()
        .thread_count(1)
        .iterations(1)
        .retry(fast_retry(3))
        .build()
        .unwrap();

    let report = workload.run(&target).unwrap();
    assert_success(&report);
    assert_eq!(target.collection_names("test"), vec!["fsmload_0".to_string()]);
}
