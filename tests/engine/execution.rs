//! Successful runs: invocation counts, targets, hooks, threads

use crate::common::*;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

#[test]
fn self_loop_runs_k_times_and_stays_put() {
    init_tracing();
    let transitions = Transitions::new()
        .with_state("A", Distribution::new().weight("A", 1.0))
        .with_state("B", Distribution::new().weight("A", 1.0));
    let workload = Workload::builder()
        .state("A", noop)
        .state("B", noop)
        .transitions(transitions)
        .start_state("A")
        .thread_count(1)
        .iterations(37)
        .build()
        .unwrap();

    let report = workload.run(&MemoryTarget::new()).unwrap();
    assert_success(&report);
    assert_eq!(report.invocations_of("A"), 37);
    assert_eq!(report.invocations_of("B"), 0);
    assert_eq!(report.workers.len(), 1);
    assert_eq!(report.workers[0].final_state, "A");
    assert_eq!(report.workers[0].exit, WorkerExit::Completed);
}

#[test]
fn four_workers_times_hundred_iterations() {
    init_tracing();
    let report = ab_workload(4, 100).run(&MemoryTarget::new()).unwrap();

    assert_success(&report);
    assert_eq!(report.total_invocations(), 400);
    assert_eq!(report.invocations_of("A") + report.invocations_of("B"), 400);
    assert_eq!(report.total_tolerated(), 0);
    assert_eq!(report.workers.len(), 4);
    for worker in &report.workers {
        assert_eq!(worker.iterations_completed, 100);
        assert_eq!(worker.exit, WorkerExit::Completed);
    }
    assert!(report.into_result().is_ok());
}

#[test]
fn shared_data_counts_every_invocation() {
    init_tracing();
    let workload = Workload::builder_with_data(AtomicU64::new(0))
        .state("A", |ctx| {
            ctx.data().fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .state("B", |ctx| {
            ctx.data().fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .uniform_transitions()
        .thread_count(8)
        .iterations(250)
        .build()
        .unwrap();

    let report = workload.run(&MemoryTarget::new()).unwrap();
    assert_success(&report);
    assert_eq!(workload.data().load(Ordering::Relaxed), 2000);
    assert_eq!(report.total_invocations(), 2000);
}

#[test]
fn per_worker_targets_are_disjoint() {
    let target = MemoryTarget::new();
    let workload = Workload::builder()
        .state("insert", |ctx| {
            run_checked(
                ctx,
                "test",
                cmd(json!({"insert": ctx.target_name(), "documents": [{"w": ctx.worker_id()}]})),
            )
            .map(|_| ())
        })
        .uniform_transitions()
        .targeting(Targeting::PerWorker {
            prefix: "coll_".to_string(),
        })
        .thread_count(3)
        .iterations(10)
        .build()
        .unwrap();

    let report = workload.run(&target).unwrap();
    assert_success(&report);
    assert_eq!(
        target.collection_names("test"),
        vec!["coll_0".to_string(), "coll_1".to_string(), "coll_2".to_string()]
    );
    let targets: Vec<&str> = report.workers.iter().map(|w| w.target.as_str()).collect();
    assert_eq!(targets, vec!["coll_0", "coll_1", "coll_2"]);
}

#[test]
fn shared_target_overlaps() {
    let target = MemoryTarget::new();
    let workload = Workload::builder()
        .state("insert", |ctx| {
            run_checked(ctx, "test", cmd(json!({"insert": ctx.target_name(), "documents": [{}]})))
                .map(|_| ())
        })
        .uniform_transitions()
        .targeting(Targeting::Shared {
            name: "hot".to_string(),
        })
        .thread_count(4)
        .iterations(25)
        .build()
        .unwrap();

    assert_success(&workload.run(&target).unwrap());
    assert_eq!(target.collection_names("test"), vec!["hot".to_string()]);
    let count = target.run_command("test", &cmd(json!({"count": "hot"})), None).unwrap();
    assert_eq!(count.get("n"), Some(&json!(100)));
}

#[test]
fn workers_run_on_named_threads() {
    let workload = Workload::builder_with_data(Mutex::new(BTreeSet::<String>::new()))
        .state("A", |ctx| {
            let name = std::thread::current().name().unwrap_or_default().to_string();
            ctx.data().lock().insert(name);
            Ok(())
        })
        .uniform_transitions()
        .thread_count(3)
        .iterations(2)
        .build()
        .unwrap();

    assert_success(&workload.run(&MemoryTarget::new()).unwrap());
    let names: Vec<String> = workload.data().lock().iter().cloned().collect();
    assert_eq!(
        names,
        vec!["fsmload-worker-0", "fsmload-worker-1", "fsmload-worker-2"]
    );
}

#[test]
fn setup_and_teardown_bracket_the_run() {
    let target = MemoryTarget::new();
    let workload = Workload::builder()
        .setup(|target, _| {
            target
                .run_command("test", &cmd(json!({"create": "events"})), None)?
                .into_checked()
                .map(|_| ())
        })
        .state("insert", |ctx| {
            run_checked(ctx, "test", cmd(json!({"insert": "events", "documents": [{"x": 1}]})))?;
            let count = run_checked(ctx, "test", cmd(json!({"count": "events"})))?;
            assert!(count.get("n").and_then(|n| n.as_u64()).unwrap_or(0) >= 1);
            Ok(())
        })
        .teardown(|target, _| {
            target
                .run_command("test", &cmd(json!({"drop": "events"})), None)?
                .into_checked()
                .map(|_| ())
        })
        .uniform_transitions()
        .thread_count(2)
        .iterations(5)
        .build()
        .unwrap();

    let report = workload.run(&target).unwrap();
    assert_success(&report);
    assert!(target.collection_names("test").is_empty());
}

#[test]
fn workload_can_run_twice() {
    let workload = ab_workload(2, 10);
    let target = MemoryTarget::new();
    let first = workload.run(&target).unwrap();
    let second = workload.run(&target).unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.total_invocations(), second.total_invocations());
}

#[test]
fn report_renders_for_humans_and_machines() {
    let report = ab_workload(2, 5).run(&MemoryTarget::new()).unwrap();
    let text = report.to_string();
    assert!(text.contains("=== Workload Report ==="));
    assert!(text.contains("Outcome: SUCCESS"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["thread_count"], 2);
    assert_eq!(json["workers"].as_array().unwrap().len(), 2);
}
