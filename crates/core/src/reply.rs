//! Command replies and the success predicate
//!
//! A [`Reply`] is the structured document a command returns. Returning a reply
//! only means the call did not raise; whether the command actually succeeded is
//! decided by the success predicate:
//!
//! - `ok` must be present and equal to 1
//! - `writeErrors`, when present, must be empty
//! - `nErrors`, when present, must be zero
//! - `writeConcernError` must be absent
//!
//! The last rule is reported separately ([`ReplyStatus::WriteConcernError`]) so
//! callers can tell a replication-level problem from a hard command failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCode, Fault};

/// A structured request or response document.
pub type Document = Map<String, Value>;

/// Classification of a reply under the success predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    /// `ok: 1`, no write errors, no write concern error
    Success,
    /// The command applied but the write concern was not satisfied
    WriteConcernError,
    /// The command failed
    Failed,
}

/// Success predicate over a wrapped value.
///
/// [`Outcome::is_ok`](crate::Outcome::is_ok) consults this to decide whether a
/// value that was returned (rather than raised) also counts as a success.
pub trait Acknowledged {
    /// True if the value represents a clean success.
    fn is_acknowledged(&self) -> bool;
}

impl Acknowledged for () {
    fn is_acknowledged(&self) -> bool {
        true
    }
}

impl Acknowledged for bool {
    fn is_acknowledged(&self) -> bool {
        *self
    }
}

impl<T: Acknowledged> Acknowledged for &T {
    fn is_acknowledged(&self) -> bool {
        (**self).is_acknowledged()
    }
}

/// Response document returned by a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply {
    doc: Document,
}

impl Reply {
    /// Wrap a response document.
    pub fn new(doc: Document) -> Self {
        Reply { doc }
    }

    /// `{ok: 1}`
    pub fn ok() -> Self {
        let mut doc = Document::new();
        doc.insert("ok".to_string(), Value::from(1));
        Reply { doc }
    }

    /// Build a reply from a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(doc) => Some(Reply { doc }),
            _ => None,
        }
    }

    /// `{ok: 0, code, codeName, errmsg}`
    pub fn failed(code: impl Into<ErrorCode>, code_name: &str, errmsg: &str) -> Self {
        let mut doc = Document::new();
        doc.insert("ok".to_string(), Value::from(0));
        doc.insert("code".to_string(), Value::from(code.into().as_i32()));
        doc.insert("codeName".to_string(), Value::from(code_name));
        doc.insert("errmsg".to_string(), Value::from(errmsg));
        Reply { doc }
    }

    /// Add or replace a field, builder style.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.doc.insert(key.to_string(), value.into());
        self
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Consume the reply, returning the document.
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// True if `ok` is missing or not 1, write errors are present, or
    /// `nErrors` is non-zero.
    pub fn has_error(&self) -> bool {
        let ok = self.doc.get("ok").map(is_one).unwrap_or(false);
        if !ok {
            return true;
        }
        if let Some(errors) = self.doc.get("writeErrors") {
            if !is_empty_collection(errors) {
                return true;
            }
        }
        match self.doc.get("nErrors") {
            Some(n) => !is_zero(n),
            None => false,
        }
    }

    /// True if the reply carries a `writeConcernError` field.
    pub fn has_write_concern_error(&self) -> bool {
        self.doc.contains_key("writeConcernError")
    }

    /// True if neither [`has_error`](Self::has_error) nor
    /// [`has_write_concern_error`](Self::has_write_concern_error) hold.
    pub fn is_success(&self) -> bool {
        !(self.has_error() || self.has_write_concern_error())
    }

    /// Classify the reply. Hard failures win over write concern errors.
    pub fn status(&self) -> ReplyStatus {
        if self.has_error() {
            ReplyStatus::Failed
        } else if self.has_write_concern_error() {
            ReplyStatus::WriteConcernError
        } else {
            ReplyStatus::Success
        }
    }

    /// The fault describing a non-successful reply, `None` on success.
    ///
    /// Looks at the top-level `code`/`codeName`/`errmsg` first, then the first
    /// entry of `writeErrors`, then `writeConcernError`.
    pub fn to_fault(&self) -> Option<Fault> {
        if self.is_success() {
            return None;
        }

        if let Some(fault) = fault_from_fields(&self.doc) {
            return Some(fault);
        }

        let first_write_error = self
            .doc
            .get("writeErrors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(Value::as_object);
        if let Some(fault) = first_write_error.and_then(fault_from_fields) {
            return Some(fault);
        }

        let write_concern = self.doc.get("writeConcernError").and_then(Value::as_object);
        if let Some(fault) = write_concern.and_then(fault_from_fields) {
            return Some(fault);
        }

        let message = self
            .doc
            .get("errmsg")
            .and_then(Value::as_str)
            .unwrap_or("command failed without an error code");
        Some(Fault::new(ErrorCode::UNKNOWN, message))
    }

    /// Turn a non-successful reply into a raised fault.
    pub fn into_checked(self) -> Result<Reply, Fault> {
        match self.to_fault() {
            Some(fault) => Err(fault),
            None => Ok(self),
        }
    }
}

impl Acknowledged for Reply {
    fn is_acknowledged(&self) -> bool {
        self.is_success()
    }
}

impl From<Document> for Reply {
    fn from(doc: Document) -> Self {
        Reply::new(doc)
    }
}

fn fault_from_fields(doc: &Document) -> Option<Fault> {
    let code = doc.get("code").and_then(Value::as_i64)?;
    let code = i32::try_from(code).unwrap_or(ErrorCode::UNKNOWN.as_i32());
    let message = doc
        .get("errmsg")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut fault = Fault::new(code, message);
    if let Some(name) = doc.get("codeName").and_then(Value::as_str) {
        fault = fault.with_code_name(name);
    }
    Some(fault)
}

// Servers are loose about numeric types: `ok` may be 1, 1.0 or true.
fn is_one(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !*b,
        Value::Null => true,
        _ => false,
    }
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Null => true,
        _ => false,
    }
}
