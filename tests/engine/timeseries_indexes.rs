//! Index builds racing drop-and-recreate of timeseries collections
//!
//! Every worker aims at the same two collections and randomly creates them
//! (plain or timeseries), inserts, drops, builds indexes and lists them. The
//! tolerated codes are the races a correct server is allowed to report.

use crate::common::*;
use rand::Rng;

const DB: &str = "timeseries_create_indexes";
const COLL_COUNT: usize = 2;
const TIME_FIELD: &str = "time";
const META_FIELD: &str = "meta";

fn random_collection(ctx: &mut ActionContext<'_, ()>) -> String {
    format!("{}{}", ctx.target_name(), ctx.rng().gen_range(0..COLL_COUNT))
}

fn create_normal(ctx: &mut ActionContext<'_, ()>) -> Result<(), Fault> {
    let coll = random_collection(ctx);
    run_checked(ctx, DB, cmd(json!({"create": coll}))).map(|_| ())
}

fn create_timeseries(ctx: &mut ActionContext<'_, ()>) -> Result<(), Fault> {
    let coll = random_collection(ctx);
    run_checked(
        ctx,
        DB,
        cmd(json!({
            "create": coll,
            "timeseries": {"timeField": TIME_FIELD, "metaField": META_FIELD},
        })),
    )
    .map(|_| ())
}

fn insert(ctx: &mut ActionContext<'_, ()>) -> Result<(), Fault> {
    let coll = random_collection(ctx);
    let time = ctx.iteration();
    run_checked(
        ctx,
        DB,
        cmd(json!({
            "insert": coll,
            "documents": [{"measurement": "measurement", TIME_FIELD: time}],
        })),
    )
    .map(|_| ())
}

fn drop_collection(ctx: &mut ActionContext<'_, ()>) -> Result<(), Fault> {
    let coll = random_collection(ctx);
    run_checked(ctx, DB, cmd(json!({"drop": coll}))).map(|_| ())
}

fn create_index(ctx: &mut ActionContext<'_, ()>) -> Result<(), Fault> {
    const FIELDS: [&str; 4] = [META_FIELD, TIME_FIELD, "measurement", "other"];
    let coll = random_collection(ctx);
    let field = FIELDS[ctx.rng().gen_range(0..FIELDS.len())];
    run_checked(
        ctx,
        DB,
        cmd(json!({
            "createIndexes": coll,
            "indexes": [{"key": {field: 1}, "name": format!("{field}_1")}],
        })),
    )
    .map(|_| ())
}

fn check_indexes(ctx: &mut ActionContext<'_, ()>) -> Result<(), Fault> {
    let coll = random_collection(ctx);
    let reply = run_checked(ctx, DB, cmd(json!({"listIndexes": coll})))?;
    let batch = reply
        .get("cursor")
        .and_then(|c| c.get("firstBatch"))
        .and_then(|b| b.as_array())
        .cloned()
        .unwrap_or_default();

    for index in batch {
        let keys = index.get("key").and_then(|k| k.as_object());
        if let Some(key) = keys.and_then(|k| k.keys().find(|k| k.starts_with("control."))) {
            return Err(Fault::new(
                ErrorCode::UNKNOWN,
                format!("found buckets index key '{key}' on timeseries collection {coll}"),
            ));
        }
    }
    Ok(())
}

fn timeseries_create_indexes(thread_count: usize, iterations: u64) -> Workload {
    Workload::builder()
        .state_tolerating("createNormalColl", [codes::NAMESPACE_EXISTS], create_normal)
        .state_tolerating("createTimeseriesColl", [codes::NAMESPACE_EXISTS], create_timeseries)
        .state_tolerating(
            "insert",
            [codes::NAMESPACE_EXISTS, codes::NAMESPACE_NOT_FOUND],
            insert,
        )
        .state_tolerating("drop", [codes::NAMESPACE_NOT_FOUND], drop_collection)
        .state_tolerating(
            "createIndex",
            [
                codes::NAMESPACE_EXISTS,
                codes::NAMESPACE_NOT_FOUND,
                codes::INDEX_KEY_SPECS_CONFLICT,
            ],
            create_index,
        )
        .state_tolerating("checkIndexes", [codes::NAMESPACE_NOT_FOUND], check_indexes)
        .uniform_transitions()
        .start_state("createTimeseriesColl")
        .targeting(Targeting::Shared {
            name: "coll_".to_string(),
        })
        .thread_count(thread_count)
        .iterations(iterations)
        .build()
        .unwrap()
}

#[test]
fn concurrent_ddl_and_index_builds_succeed() {
    init_tracing();
    let target = MemoryTarget::new();
    // Inserts racing a drop-and-recreate.
    target.inject(
        "insert",
        FaultPlan::Once(Fault::new(codes::NAMESPACE_EXISTS, "collection already exists")),
    );
    target.inject(
        "insert",
        FaultPlan::Once(Fault::new(codes::NAMESPACE_NOT_FOUND, "collection dropped during insert")),
    );
    let workload = timeseries_create_indexes(12, 100);

    let report = workload.run(&target).unwrap();
    assert_success(&report);
    assert_eq!(report.total_invocations(), 1200);
    assert!(report.invocations_of("createTimeseriesColl") >= 12);
    assert!(report.total_tolerated() > 0);
    assert!(target.collection_names(DB).len() <= COLL_COUNT);

    let inserts = &report.states["insert"].tolerated_by_code;
    assert!(inserts[&ErrorCode(codes::NAMESPACE_EXISTS)] >= 1);
    assert!(inserts[&ErrorCode(codes::NAMESPACE_NOT_FOUND)] >= 1);
}

#[test]
fn insert_outside_its_tolerated_codes_is_fatal() {
    let target = MemoryTarget::new();
    target.inject(
        "insert",
        FaultPlan::Once(Fault::new(codes::BAD_VALUE, "unexpected document shape")),
    );

    let workload = Workload::builder()
        .state_tolerating(
            "insert",
            [codes::NAMESPACE_EXISTS, codes::NAMESPACE_NOT_FOUND],
            insert,
        )
        .uniform_transitions()
        .targeting(Targeting::Shared {
            name: "coll_".to_string(),
        })
        .thread_count(1)
        .iterations(3)
        .build()
        .unwrap();

    let report = workload.run(&target).unwrap();
    assert!(report.fatal.unwrap().fault.has_code(codes::BAD_VALUE));
}

#[test]
fn buckets_index_is_caught() {
    let target = MemoryTarget::new();
    target.inject(
        "listIndexes",
        FaultPlan::Reply(Reply::ok().with(
            "cursor",
            json!({"id": 0, "firstBatch": [{"v": 2, "key": {"control.min.time": 1}, "name": "bad"}]}),
        )),
    );

    let workload = Workload::builder()
        .state("checkIndexes", check_indexes)
        .uniform_transitions()
        .targeting(Targeting::Shared {
            name: "coll_".to_string(),
        })
        .thread_count(1)
        .iterations(1)
        .build()
        .unwrap();

    let report = workload.run(&target).unwrap();
    let fatal = report.fatal.unwrap();
    assert!(fatal.fault.message.contains("control.min.time"));
}
