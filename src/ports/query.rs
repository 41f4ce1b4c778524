//! Filter, update and sort descriptions passed to a [`DocumentStore`].
//!
//! These types carry their own evaluation semantics (`Filter::matches`,
//! `Update::apply`, `compare_values`) so every adapter agrees on what a query
//! means. Field paths are dotted (`"sender.participant_id"`). Equality is the
//! loose structural equality from [`crate::domain::foundation::values_equal`].
//!
//! [`DocumentStore`]: super::DocumentStore

use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::StorageError;
use crate::domain::foundation::values_equal;

/// One `path == value` requirement on an array element.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: String,
    pub value: Value,
}

impl Condition {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    fn matches(&self, element: &Value) -> bool {
        values_equal(lookup(element, &self.path).unwrap_or(&Value::Null), &self.value)
    }
}

/// Document selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document.
    All,
    /// Field equals value. A missing field compares as `null`.
    Eq { path: String, value: Value },
    /// Field is strictly less than value (strings or numbers).
    Lt { path: String, value: Value },
    /// Some element of the array satisfies every condition.
    ElemMatch { array: String, conditions: Vec<Condition> },
    /// The array has exactly this many elements.
    ArraySize { array: String, size: usize },
    /// Every inner filter matches.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Matches the document whose `_id` is `id`.
    pub fn id(id: impl ToString) -> Self {
        Filter::eq("_id", id.to_string())
    }

    pub fn elem_match(array: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Filter::ElemMatch {
            array: array.into(),
            conditions,
        }
    }

    pub fn array_size(array: impl Into<String>, size: usize) -> Self {
        Filter::ArraySize {
            array: array.into(),
            size,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Evaluates the filter against one document.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { path, value } => values_equal(lookup(doc, path).unwrap_or(&Value::Null), value),
            Filter::Lt { path, value } => lookup(doc, path)
                .and_then(|actual| compare_scalars(actual, value))
                .is_some_and(|ord| ord == Ordering::Less),
            Filter::ElemMatch { array, conditions } => lookup(doc, array)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| conditions.iter().all(|c| c.matches(item)))),
            Filter::ArraySize { array, size } => lookup(doc, array)
                .and_then(Value::as_array)
                .is_some_and(|items| items.len() == *size),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

/// One modification inside an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Replace (or create) the field.
    Set { path: String, value: Value },
    /// Append to the array, creating it when absent.
    Push { array: String, value: Value },
    /// Set `field` on every array element satisfying all `conditions`.
    SetWhere {
        array: String,
        conditions: Vec<Condition>,
        field: String,
        value: Value,
    },
}

/// An ordered list of modifications applied to a single document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn push(mut self, array: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push {
            array: array.into(),
            value: value.into(),
        });
        self
    }

    pub fn set_where(
        mut self,
        array: impl Into<String>,
        conditions: Vec<Condition>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.ops.push(UpdateOp::SetWhere {
            array: array.into(),
            conditions,
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Applies every operation in order. `_id` cannot be modified.
    pub fn apply(&self, doc: &mut Value) -> Result<(), StorageError> {
        for op in &self.ops {
            match op {
                UpdateOp::Set { path, value } => {
                    guard_id(path)?;
                    *slot(doc, path)? = value.clone();
                }
                UpdateOp::Push { array, value } => {
                    guard_id(array)?;
                    let target = slot(doc, array)?;
                    if target.is_null() {
                        *target = Value::Array(Vec::new());
                    }
                    match target {
                        Value::Array(items) => items.push(value.clone()),
                        _ => return Err(StorageError::Query(format!("'{array}' is not an array"))),
                    }
                }
                UpdateOp::SetWhere {
                    array,
                    conditions,
                    field,
                    value,
                } => {
                    guard_id(array)?;
                    let Some(Value::Array(items)) = lookup_mut(doc, array) else {
                        continue;
                    };
                    for item in items.iter_mut() {
                        if item.is_object() && conditions.iter().all(|c| c.matches(&*item)) {
                            *slot(item, field)? = value.clone();
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One sort key; earlier keys take precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub path: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Desc,
        }
    }
}

/// Options for `find_many`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted_by(sort: Vec<SortKey>) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Total order used when sorting documents: missing or null first, then
/// booleans, numbers, strings; anything else compares equal.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => compare_scalars(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        _ => None,
    }
}

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, key| current.as_object()?.get(key))
}

fn lookup_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(doc, |current, key| current.as_object_mut()?.get_mut(key))
}

/// Resolves a dotted path for writing, creating intermediate objects.
fn slot<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value, StorageError> {
    let mut current = doc;
    for key in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
            _ => {
                return Err(StorageError::Query(format!(
                    "cannot set '{path}': '{key}' has a non-object parent"
                )))
            }
        };
    }
    Ok(current)
}

fn guard_id(path: &str) -> Result<(), StorageError> {
    if path == "_id" || path.starts_with("_id.") {
        return Err(StorageError::Query("the _id field is immutable".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conversation() -> Value {
        json!({
            "_id": "c1",
            "participants": [
                {"participant_id": "p1", "metadata": {"business_id": "b1"}},
                {"participant_id": "p2", "metadata": {}},
            ],
            "updated_at": "2025-01-01T00:00:00.000000Z"
        })
    }

    #[test]
    fn eq_matches_nested_paths() {
        let doc = json!({"sender": {"participant_id": "p1"}});
        assert!(Filter::eq("sender.participant_id", "p1").matches(&doc));
        assert!(!Filter::eq("sender.participant_id", "p2").matches(&doc));
    }

    #[test]
    fn eq_treats_missing_as_null() {
        let doc = json!({"a": 1});
        assert!(Filter::eq("b", Value::Null).matches(&doc));
        assert!(Filter::eq("b", json!({})).matches(&doc));
    }

    #[test]
    fn elem_match_requires_all_conditions_on_one_element() {
        let doc = conversation();
        let hit = Filter::elem_match(
            "participants",
            vec![Condition::eq("participant_id", "p1"), Condition::eq("metadata", json!({"business_id": "b1"}))],
        );
        let split = Filter::elem_match(
            "participants",
            vec![Condition::eq("participant_id", "p2"), Condition::eq("metadata", json!({"business_id": "b1"}))],
        );
        assert!(hit.matches(&doc));
        assert!(!split.matches(&doc));
    }

    #[test]
    fn elem_match_on_empty_metadata_matches_absent_metadata() {
        let doc = json!({"participants": [{"participant_id": "p1"}]});
        let filter = Filter::elem_match(
            "participants",
            vec![Condition::eq("participant_id", "p1"), Condition::eq("metadata", json!({}))],
        );
        assert!(filter.matches(&doc));
    }

    #[test]
    fn array_size_is_exact() {
        let doc = conversation();
        assert!(Filter::array_size("participants", 2).matches(&doc));
        assert!(!Filter::array_size("participants", 3).matches(&doc));
        assert!(!Filter::array_size("missing", 0).matches(&doc));
    }

    #[test]
    fn lt_compares_strings_lexicographically() {
        let doc = json!({"_id": "0001"});
        assert!(Filter::lt("_id", "0002").matches(&doc));
        assert!(!Filter::lt("_id", "0001").matches(&doc));
        assert!(!Filter::lt("_id", 5).matches(&doc));
    }

    #[test]
    fn set_where_marks_only_matching_elements() {
        let mut doc = conversation();
        Update::new()
            .set_where(
                "participants",
                vec![Condition::eq("participant_id", "p2"), Condition::eq("metadata", json!({}))],
                "deleted_at",
                "2025-01-02T00:00:00.000000Z",
            )
            .set("updated_at", "2025-01-02T00:00:00.000000Z")
            .apply(&mut doc)
            .unwrap();

        assert!(doc["participants"][0].get("deleted_at").is_none());
        assert_eq!(doc["participants"][1]["deleted_at"], json!("2025-01-02T00:00:00.000000Z"));
        assert_eq!(doc["updated_at"], json!("2025-01-02T00:00:00.000000Z"));
    }

    #[test]
    fn push_appends_and_creates_missing_arrays() {
        let mut doc = json!({"_id": "m1"});
        Update::new().push("reactions", json!({"emoji": "👍"})).apply(&mut doc).unwrap();
        Update::new().push("reactions", json!({"emoji": "🎉"})).apply(&mut doc).unwrap();
        assert_eq!(doc["reactions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = json!({"_id": "c1"});
        Update::new().set("last_message.content", "hi").apply(&mut doc).unwrap();
        assert_eq!(doc["last_message"]["content"], json!("hi"));
    }

    #[test]
    fn id_cannot_be_updated() {
        let mut doc = json!({"_id": "c1"});
        assert!(Update::new().set("_id", "c2").apply(&mut doc).is_err());
    }

    #[test]
    fn compare_values_puts_missing_first() {
        assert_eq!(compare_values(None, Some(&json!("a"))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
    }
}
