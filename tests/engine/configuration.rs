//! Construction-time validation and settings files

use crate::common::*;
use fsmload::{Error, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn unregistered_start_state_is_configuration_error() {
    let err = Workload::builder()
        .state("A", noop)
        .uniform_transitions()
        .start_state("Z")
        .build()
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn reachable_state_without_distribution_is_rejected() {
    let transitions = Transitions::new()
        .with_state("A", Distribution::new().weight("A", 1.0).weight("B", 1.0));
    let err = Workload::builder()
        .state("A", noop)
        .state("B", noop)
        .transitions(transitions)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("'B'"));
}

#[test]
fn unreachable_state_needs_no_distribution() {
    let transitions = Transitions::new().with_state("A", Distribution::new().weight("A", 1.0));
    let workload = Workload::builder()
        .state("A", noop)
        .state("unused", noop)
        .transitions(transitions)
        .build()
        .unwrap();
    assert!(workload.transition_probabilities("unused").is_none());
}

#[test]
fn zero_weight_total_is_rejected() {
    let transitions = Transitions::new()
        .with_state("A", Distribution::new().weight("A", 0.0).weight("B", 0.0))
        .with_state("B", Distribution::new().weight("A", 1.0));
    let err = Workload::builder()
        .state("A", noop)
        .state("B", noop)
        .transitions(transitions)
        .build()
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn non_positive_counts_are_rejected() {
    let zero_threads = Workload::builder()
        .state("A", noop)
        .uniform_transitions()
        .thread_count(0)
        .build();
    assert!(zero_threads.unwrap_err().is_configuration());

    let zero_iterations = Workload::builder()
        .state("A", noop)
        .uniform_transitions()
        .iterations(0)
        .build();
    assert!(zero_iterations.unwrap_err().is_configuration());
}

#[test]
fn reachable_distributions_are_normalized() {
    let transitions = Transitions::new()
        .with_state("A", Distribution::new().weight("B", 3.0).weight("C", 1.0))
        .with_state("B", Distribution::new().weight("A", 0.5).weight("C", 0.5))
        .with_state("C", Distribution::new().weight("A", 10.0));
    let workload = Workload::builder()
        .state("A", noop)
        .state("B", noop)
        .state("C", noop)
        .transitions(transitions)
        .build()
        .unwrap();

    for state in ["A", "B", "C"] {
        let probabilities = workload.transition_probabilities(state).unwrap();
        let sum: f64 = probabilities.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-12, "state {state} sums to {sum}");
    }
    let a = workload.transition_probabilities("A").unwrap();
    assert_eq!(a, vec![("B", 0.75), ("C", 0.25)]);
}

#[test]
fn uniform_transitions_include_self() {
    let workload = ab_workload(1, 1);
    let a = workload.transition_probabilities("A").unwrap();
    assert_eq!(a, vec![("A", 0.5), ("B", 0.5)]);
}

#[test]
fn settings_file_drives_the_builder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "thread_count = 3\niterations = 7\nseed = 11\n\n[retry]\nmax_attempts = 1\n",
    )
    .unwrap();

    let settings = WorkloadSettings::from_file(&path).unwrap();
    let workload = Workload::builder()
        .state("A", noop)
        .uniform_transitions()
        .settings(&settings)
        .build()
        .unwrap();

    assert_eq!(workload.thread_count(), 3);
    assert_eq!(workload.iterations(), 7);
    assert_eq!(workload.seed(), Some(11));
    assert_eq!(workload.retry_config().max_attempts, 1);

    let report = workload.run(&MemoryTarget::new()).unwrap();
    assert_eq!(report.total_invocations(), 21);
    assert_eq!(report.seed, 11);
}

#[test]
fn invalid_settings_file_never_reaches_a_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "thread_count = 0\n").unwrap();
    assert!(WorkloadSettings::from_file(&path).unwrap_err().is_configuration());
}
