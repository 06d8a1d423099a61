//! In-memory command target
//!
//! A small namespace catalog that answers a handful of database commands the
//! way a real server would, including the error replies concurrent DDL
//! produces (creating an existing namespace, dropping a missing one). It lets
//! the engine be exercised end-to-end without a running server, and supports
//! scripted fault injection per command name.
//!
//! Supported commands: `ping`, `create`, `drop`, `insert`, `createIndexes`,
//! `listIndexes`, `count`.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::Fault;
use crate::reply::{Document, Reply};
use crate::traits::{command_name, CommandTarget};
use crate::types::Concern;

/// Error codes produced by [`MemoryTarget`].
pub mod codes {
    /// Malformed command argument
    pub const BAD_VALUE: i32 = 2;
    /// Collection does not exist
    pub const NAMESPACE_NOT_FOUND: i32 = 26;
    /// Collection already exists
    pub const NAMESPACE_EXISTS: i32 = 48;
    /// Command name not recognised
    pub const COMMAND_NOT_FOUND: i32 = 59;
    /// Index name reused with a different key
    pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
}

/// Scripted behaviour for the next call(s) of a command.
#[derive(Debug, Clone)]
pub enum FaultPlan {
    /// Raise the fault on the next call only
    Once(Fault),
    /// Raise the fault on every call until [`MemoryTarget::clear_faults`]
    Always(Fault),
    /// Return this reply verbatim on the next call only
    Reply(Reply),
    /// Sleep, then execute the next call normally
    Stall(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionKind {
    Normal,
    Timeseries,
}

#[derive(Debug)]
struct Collection {
    kind: CollectionKind,
    time_field: Option<String>,
    documents: Vec<Document>,
    indexes: Vec<(String, Value)>,
}

impl Collection {
    fn new(kind: CollectionKind, time_field: Option<String>) -> Self {
        let indexes = match kind {
            // Timeseries collections are clustered by time and have no _id index.
            CollectionKind::Timeseries => Vec::new(),
            CollectionKind::Normal => vec![("_id_".to_string(), json!({"_id": 1}))],
        };
        Collection {
            kind,
            time_field,
            documents: Vec::new(),
            indexes,
        }
    }
}

/// Thread-safe in-memory command target.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    /// (db, collection) -> collection
    catalog: Mutex<BTreeMap<(String, String), Collection>>,
    /// command name -> pending fault plans
    faults: Mutex<HashMap<String, VecDeque<FaultPlan>>>,
    commands: AtomicU64,
}

impl MemoryTarget {
    /// Create an empty target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a fault plan for `command`. Plans are consumed in FIFO order.
    pub fn inject(&self, command: &str, plan: FaultPlan) {
        self.faults
            .lock()
            .entry(command.to_string())
            .or_default()
            .push_back(plan);
    }

    /// Drop all pending fault plans.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Total commands received, including injected failures.
    pub fn command_count(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    /// Names of the collections in `db`, sorted.
    pub fn collection_names(&self, db: &str) -> Vec<String> {
        self.catalog
            .lock()
            .keys()
            .filter(|(d, _)| d == db)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Index names of `db.coll`, or `None` if it does not exist.
    pub fn index_names(&self, db: &str, coll: &str) -> Option<Vec<String>> {
        let catalog = self.catalog.lock();
        catalog
            .get(&(db.to_string(), coll.to_string()))
            .map(|c| c.indexes.iter().map(|(name, _)| name.clone()).collect())
    }

    /// True if `db.coll` exists and is a timeseries collection.
    pub fn is_timeseries(&self, db: &str, coll: &str) -> bool {
        self.catalog
            .lock()
            .get(&(db.to_string(), coll.to_string()))
            .map(|c| c.kind == CollectionKind::Timeseries)
            .unwrap_or(false)
    }

    fn next_plan(&self, command: &str) -> Option<FaultPlan> {
        let mut faults = self.faults.lock();
        let queue = faults.get_mut(command)?;
        match queue.front() {
            Some(FaultPlan::Always(fault)) => Some(FaultPlan::Always(fault.clone())),
            Some(_) => queue.pop_front(),
            None => None,
        }
    }

    fn execute(&self, db: &str, name: &str, command: &Document) -> Reply {
        let coll = command.get(name).and_then(Value::as_str).map(str::to_string);
        match (name, coll) {
            ("ping", _) => Reply::ok(),
            ("create", Some(coll)) => self.create(db, &coll, command),
            ("drop", Some(coll)) => self.drop_collection(db, &coll),
            ("insert", Some(coll)) => self.insert(db, &coll, command),
            ("createIndexes", Some(coll)) => self.create_indexes(db, &coll, command),
            ("listIndexes", Some(coll)) => self.list_indexes(db, &coll),
            ("count", Some(coll)) => self.count(db, &coll),
            ("create" | "drop" | "insert" | "createIndexes" | "listIndexes" | "count", None) => {
                Reply::failed(
                    codes::BAD_VALUE,
                    "BadValue",
                    &format!("{name} requires a collection name"),
                )
            }
            _ => Reply::failed(
                codes::COMMAND_NOT_FOUND,
                "CommandNotFound",
                &format!("no such command: '{name}'"),
            ),
        }
    }

    fn create(&self, db: &str, coll: &str, command: &Document) -> Reply {
        let mut catalog = self.catalog.lock();
        let key = (db.to_string(), coll.to_string());
        if catalog.contains_key(&key) {
            return Reply::failed(
                codes::NAMESPACE_EXISTS,
                "NamespaceExists",
                &format!("Collection {db}.{coll} already exists."),
            );
        }

        let collection = match command.get("timeseries").and_then(Value::as_object) {
            Some(options) => {
                let Some(time_field) = options.get("timeField").and_then(Value::as_str) else {
                    return Reply::failed(
                        codes::BAD_VALUE,
                        "BadValue",
                        "timeseries options require a timeField",
                    );
                };
                Collection::new(CollectionKind::Timeseries, Some(time_field.to_string()))
            }
            None => Collection::new(CollectionKind::Normal, None),
        };
        catalog.insert(key, collection);
        Reply::ok()
    }

    fn drop_collection(&self, db: &str, coll: &str) -> Reply {
        let mut catalog = self.catalog.lock();
        match catalog.remove(&(db.to_string(), coll.to_string())) {
            Some(_) => Reply::ok().with("ns", format!("{db}.{coll}")),
            None => Reply::failed(codes::NAMESPACE_NOT_FOUND, "NamespaceNotFound", "ns not found"),
        }
    }

    fn insert(&self, db: &str, coll: &str, command: &Document) -> Reply {
        let Some(documents) = command.get("documents").and_then(Value::as_array) else {
            return Reply::failed(codes::BAD_VALUE, "BadValue", "insert requires documents");
        };

        let mut catalog = self.catalog.lock();
        let collection = catalog
            .entry((db.to_string(), coll.to_string()))
            .or_insert_with(|| Collection::new(CollectionKind::Normal, None));

        let mut inserted = 0u64;
        let mut write_errors = Vec::new();
        for (index, doc) in documents.iter().enumerate() {
            let Some(doc) = doc.as_object() else {
                write_errors.push(json!({
                    "index": index,
                    "code": codes::BAD_VALUE,
                    "errmsg": "document must be an object",
                }));
                continue;
            };
            if let Some(time_field) = &collection.time_field {
                if !doc.contains_key(time_field) {
                    write_errors.push(json!({
                        "index": index,
                        "code": codes::BAD_VALUE,
                        "errmsg": format!("'{time_field}' must be present"),
                    }));
                    continue;
                }
            }
            collection.documents.push(doc.clone());
            inserted += 1;
        }

        let reply = Reply::ok().with("n", inserted);
        if write_errors.is_empty() {
            reply
        } else {
            reply.with("writeErrors", write_errors)
        }
    }

    fn create_indexes(&self, db: &str, coll: &str, command: &Document) -> Reply {
        let Some(specs) = command.get("indexes").and_then(Value::as_array) else {
            return Reply::failed(codes::BAD_VALUE, "BadValue", "createIndexes requires indexes");
        };

        let mut catalog = self.catalog.lock();
        let collection = catalog
            .entry((db.to_string(), coll.to_string()))
            .or_insert_with(|| Collection::new(CollectionKind::Normal, None));
        let before = collection.indexes.len();

        for spec in specs {
            let (Some(key), Some(name)) = (
                spec.get("key").filter(|k| k.is_object()),
                spec.get("name").and_then(Value::as_str),
            ) else {
                return Reply::failed(codes::BAD_VALUE, "BadValue", "index spec requires key and name");
            };
            match collection.indexes.iter().find(|(n, _)| n == name) {
                Some((_, existing)) if existing != key => {
                    return Reply::failed(
                        codes::INDEX_KEY_SPECS_CONFLICT,
                        "IndexKeySpecsConflict",
                        &format!("An existing index has the same name '{name}' but a different key"),
                    );
                }
                Some(_) => {}
                None => collection.indexes.push((name.to_string(), key.clone())),
            }
        }

        Reply::ok()
            .with("numIndexesBefore", before)
            .with("numIndexesAfter", collection.indexes.len())
    }

    fn list_indexes(&self, db: &str, coll: &str) -> Reply {
        let catalog = self.catalog.lock();
        let Some(collection) = catalog.get(&(db.to_string(), coll.to_string())) else {
            return Reply::failed(
                codes::NAMESPACE_NOT_FOUND,
                "NamespaceNotFound",
                &format!("ns does not exist: {db}.{coll}"),
            );
        };
        let batch: Vec<Value> = collection
            .indexes
            .iter()
            .map(|(name, key)| json!({"v": 2, "key": key, "name": name}))
            .collect();
        Reply::ok().with(
            "cursor",
            json!({"id": 0, "ns": format!("{db}.{coll}"), "firstBatch": batch}),
        )
    }

    fn count(&self, db: &str, coll: &str) -> Reply {
        let catalog = self.catalog.lock();
        let n = catalog
            .get(&(db.to_string(), coll.to_string()))
            .map(|c| c.documents.len())
            .unwrap_or(0);
        Reply::ok().with("n", n)
    }
}

impl CommandTarget for MemoryTarget {
    fn run_command(
        &self,
        db: &str,
        command: &Document,
        _concern: Option<&Concern>,
    ) -> Result<Reply, Fault> {
        self.commands.fetch_add(1, Ordering::Relaxed);
        let Some(name) = command_name(command) else {
            return Ok(Reply::failed(codes::BAD_VALUE, "BadValue", "empty command document"));
        };

        match self.next_plan(name) {
            Some(FaultPlan::Once(fault)) | Some(FaultPlan::Always(fault)) => return Err(fault),
            Some(FaultPlan::Reply(reply)) => return Ok(reply),
            Some(FaultPlan::Stall(delay)) => std::thread::sleep(delay),
            None => {}
        }

        Ok(self.execute(db, name, command))
    }
}
