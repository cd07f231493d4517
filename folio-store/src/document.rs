use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store-assigned document identifier. Never chosen by clients.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a single document: collection name plus document key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocPath {
    pub collection: String,
    pub doc: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            doc: doc.into(),
        }
    }

    pub fn project(id: &DocId) -> Self {
        Self::new(crate::PROJECTS_COLLECTION, id.as_str())
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.doc)
    }
}

/// Address of the singleton profile document.
pub fn profile_path() -> DocPath {
    DocPath::new(crate::PROFILE_COLLECTION, crate::PROFILE_DOC)
}

/// A complete point-in-time copy of one stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub fields: Map<String, Value>,
}

/// One field of a write payload. `ServerTimestamp` is resolved by the
/// store at apply time, never by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    ServerTimestamp,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Json(Value::String(value.into()))
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

pub type WritePayload = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A collection read, optionally pre-ordered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: Vec<OrderBy>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: Vec::new(),
        }
    }

    pub fn order_by(
        mut self,
        field: impl Into<String>,
        direction: Direction,
    ) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Milliseconds since the Unix epoch from the system clock.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Deterministic ordering over JSON values for `order_by` clauses:
/// null < bool < number < string < everything else. Missing fields are
/// passed in as `None` and sort after any present value.
pub(crate) fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    type_rank(a).cmp(&type_rank(b)).then_with(|| match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    })
}
