use crate::{
    entity::{Entity, Value},
    error::DataError,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to a fetched entity.
///
/// A tracked handle stays registered with the session that produced it, so
/// edits made through [`Record::update`] are written by the next `save()`.
#[derive(Debug)]
pub struct Record<T>(Arc<Mutex<T>>);

impl<T> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone> Record<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Copy of the current value.
    pub fn get(&self) -> T {
        self.0.lock().clone()
    }

    pub fn update<R>(&self, edit: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.0.lock();
        edit(&mut guard)
    }

    pub fn into_inner(self) -> T {
        match Arc::try_unwrap(self.0) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().clone(),
        }
    }
}

/// Pending write for one tracked row: the changed columns in declaration
/// order plus the full current value.
#[derive(Debug, Clone)]
pub(crate) struct Change<T> {
    pub id: i64,
    pub columns: Vec<(&'static str, Value)>,
    pub current: T,
}

struct Tracked<T> {
    record: Record<T>,
    snapshot: T,
}

/// Snapshot bookkeeping behind tracked reads.
pub(crate) struct Tracker<T> {
    entries: Vec<Tracked<T>>,
}

impl<T> Default for Tracker<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Entity> Tracker<T> {
    pub fn track(&mut self, record: &Record<T>) {
        self.entries.push(Tracked {
            record: record.clone(),
            snapshot: record.get(),
        });
    }

    pub fn forget(&mut self, id: i64) {
        self.entries.retain(|entry| entry.snapshot.id() != id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Diffs every tracked record against its snapshot.
    ///
    /// Edits to the key or to an immutable column are rejected before any
    /// write happens.
    pub fn pending(&self) -> Result<Vec<Change<T>>, DataError> {
        let mut changes = Vec::new();
        for entry in &self.entries {
            let current = entry.record.get();
            if current.id() != entry.snapshot.id() {
                return Err(DataError::Constraint(format!(
                    "{}.{} is immutable",
                    T::table_name(),
                    T::id_column()
                )));
            }
            let columns: Vec<(&'static str, Value)> = T::columns()
                .iter()
                .zip(current.values().into_iter().zip(entry.snapshot.values()))
                .filter(|(_, (now, before))| now != before)
                .map(|(column, (now, _))| (*column, now))
                .collect();
            if let Some((column, _)) = columns
                .iter()
                .find(|(column, _)| T::immutable_columns().contains(column))
            {
                return Err(DataError::Constraint(format!(
                    "{}.{column} is immutable",
                    T::table_name()
                )));
            }
            if !columns.is_empty() {
                changes.push(Change {
                    id: current.id(),
                    columns,
                    current,
                });
            }
        }
        Ok(changes)
    }

    /// Re-baselines snapshots after a successful flush.
    pub fn mark_saved(&mut self) {
        for entry in &mut self.entries {
            entry.snapshot = entry.record.get();
        }
    }
}
