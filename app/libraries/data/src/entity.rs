use chrono::{DateTime, Utc};
use sqlx::{FromRow, postgres::PgRow};
use std::cmp::Ordering;

/// A column value as seen by filters, tracking snapshots and statement
/// arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Orders two values of the same kind; mixed kinds and nulls do not compare.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A row type stored in one table with a storage-assigned `i64` key.
///
/// `columns()` lists every persisted column except the key, in the same order
/// as `values()`.
pub trait Entity: Clone + Send + Sync + Unpin + 'static + for<'r> FromRow<'r, PgRow> {
    fn table_name() -> &'static str;

    fn id_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str];

    /// Columns written on insert and never again.
    fn immutable_columns() -> &'static [&'static str] {
        &[]
    }

    /// Columns whose non-null values must not repeat across rows.
    fn unique_columns() -> &'static [&'static str] {
        &[]
    }

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    fn values(&self) -> Vec<Value>;

    /// Value of a single column (the key included); `None` for unknown names.
    fn value(&self, column: &str) -> Option<Value> {
        if column == Self::id_column() {
            return Some(Value::Int(self.id()));
        }
        let index = Self::columns().iter().position(|c| *c == column)?;
        self.values().into_iter().nth(index)
    }
}

/// A reduced, read-only shape of `T`.
///
/// SQL sessions select only `columns()` and decode the row directly; the
/// in-memory session calls `project`.
pub trait Projection<T: Entity>: Sized + Send + Unpin + 'static + for<'r> FromRow<'r, PgRow> {
    fn columns() -> &'static [&'static str];

    fn project(entity: &T) -> Self;
}
