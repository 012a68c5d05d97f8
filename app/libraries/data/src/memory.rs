use crate::{
    entity::{Entity, Projection, Value},
    error::DataError,
    filter::Filter,
    query::Query,
    record::{Record, Tracker},
    repository::{Repository, Storage},
};
use futures::stream::{self, BoxStream, StreamExt};
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::*;

#[derive(Clone)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Entity> Table<T> {
    fn select(&self, filter: Option<&Filter>) -> Vec<T> {
        self.rows
            .values()
            .filter(|row| filter.is_none_or(|f| f.matches(*row)))
            .cloned()
            .collect()
    }

    fn check_unique(&self, candidate: &T) -> Result<(), DataError> {
        for column in T::unique_columns() {
            let value = match candidate.value(column) {
                Some(Value::Null) | None => continue,
                Some(value) => value,
            };
            let taken = self.rows.values().any(|row| {
                row.id() != candidate.id() && row.value(column).as_ref() == Some(&value)
            });
            if taken {
                return Err(DataError::Constraint(format!(
                    "duplicate key value violates unique constraint on {}.{column}",
                    T::table_name()
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut entity: T) -> Result<T, DataError> {
        entity.set_id(self.next_id + 1);
        self.check_unique(&entity)?;
        self.next_id += 1;
        self.rows.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    fn replace(&mut self, entity: T) -> Result<(), DataError> {
        if !self.rows.contains_key(&entity.id()) {
            return Err(not_found::<T>(entity.id()));
        }
        self.check_unique(&entity)?;
        self.rows.insert(entity.id(), entity);
        Ok(())
    }
}

fn not_found<T: Entity>(id: i64) -> DataError {
    DataError::NotFound(format!(
        "{} with {} = {id}",
        T::table_name(),
        T::id_column()
    ))
}

/// In-process storage with the same observable contract as [`crate::PgStore`].
///
/// Unique columns are enforced on every write. A transaction holds the
/// table's write lock until it ends, so transactions are serialized.
pub struct MemoryStore<T> {
    table: Arc<RwLock<Table<T>>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: 0,
            })),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Entity> Storage<T> for MemoryStore<T> {
    type Session = MemorySession<T>;

    fn session(&self) -> MemorySession<T> {
        MemorySession {
            table: self.table.clone(),
            tx: None,
            tracker: Tracker::default(),
        }
    }
}

struct MemoryTransaction<T> {
    guard: OwnedRwLockWriteGuard<Table<T>>,
    backup: Option<Table<T>>,
}

impl<T> Drop for MemoryTransaction<T> {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            *self.guard = backup;
        }
    }
}

pub struct MemorySession<T> {
    table: Arc<RwLock<Table<T>>>,
    tx: Option<MemoryTransaction<T>>,
    tracker: Tracker<T>,
}

impl<T: Entity> MemorySession<T> {
    async fn read<R>(&self, f: impl FnOnce(&Table<T>) -> R + Send) -> R {
        match &self.tx {
            Some(tx) => f(&tx.guard),
            None => f(&*self.table.read().await),
        }
    }

    async fn write<R>(&mut self, f: impl FnOnce(&mut Table<T>) -> R + Send) -> R {
        match &mut self.tx {
            Some(tx) => f(&mut tx.guard),
            None => f(&mut *self.table.write().await),
        }
    }
}

impl<T: Entity> Repository<T> for MemorySession<T> {
    async fn create(&mut self, entity: T) -> Result<T, DataError> {
        let created = self.write(|table| table.insert(entity)).await?;
        debug!("created {} #{}", T::table_name(), created.id());
        Ok(created)
    }

    async fn get_one(&mut self, filter: Option<Filter>, tracked: bool) -> Result<Option<Record<T>>, DataError> {
        let found = self
            .read(|table| table.select(filter.as_ref()).into_iter().next())
            .await
            .map(Record::new);
        if tracked {
            if let Some(record) = &found {
                self.tracker.track(record);
            }
        }
        Ok(found)
    }

    async fn get_all(&mut self, filter: Option<Filter>) -> Result<Vec<T>, DataError> {
        Ok(self.read(|table| table.select(filter.as_ref())).await)
    }

    async fn remove(&mut self, entity: &T) -> Result<(), DataError> {
        let id = entity.id();
        self.write(|table| table.rows.remove(&id))
            .await
            .ok_or_else(|| not_found::<T>(id))?;
        self.tracker.forget(id);
        Ok(())
    }

    async fn save(&mut self) -> Result<u64, DataError> {
        let changes = self.tracker.pending()?;
        let written = changes.len() as u64;
        self.write(|table| {
            changes
                .into_iter()
                .try_for_each(|change| table.replace(change.current))
        })
        .await?;
        self.tracker.mark_saved();
        Ok(written)
    }

    async fn begin_transaction(&mut self) -> Result<(), DataError> {
        if self.tx.is_none() {
            let guard = self.table.clone().write_owned().await;
            let backup = Some((*guard).clone());
            self.tx = Some(MemoryTransaction { guard, backup });
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DataError> {
        if self.tx.is_none() {
            return Err(DataError::InvalidState("commit without an open transaction"));
        }
        self.save().await?;
        if let Some(mut tx) = self.tx.take() {
            tx.backup = None;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DataError> {
        let tx = self
            .tx
            .take()
            .ok_or(DataError::InvalidState("rollback without an open transaction"))?;
        self.tracker.clear();
        drop(tx);
        Ok(())
    }

    async fn get_projected<P: Projection<T>>(&mut self, filter: Filter) -> Result<Option<P>, DataError> {
        Ok(self
            .read(|table| table.select(Some(&filter)).first().map(P::project))
            .await)
    }

    async fn get_all_projected<P: Projection<T>>(&mut self, filter: Option<Filter>) -> Result<Vec<P>, DataError> {
        Ok(self
            .read(|table| table.select(filter.as_ref()).iter().map(P::project).collect())
            .await)
    }

    async fn fetch(&mut self, query: Query<T>) -> Result<Vec<Record<T>>, DataError> {
        let records: Vec<Record<T>> = self
            .read(|table| query.apply(table.rows.values().cloned()))
            .await
            .into_iter()
            .map(Record::new)
            .collect();
        if query.is_tracked() {
            records.iter().for_each(|record| self.tracker.track(record));
        }
        Ok(records)
    }

    fn stream(&mut self, filter: Option<Filter>) -> BoxStream<'_, Result<T, DataError>> {
        Box::pin(async_stream::stream! {
            let rows = self.read(|table| table.select(filter.as_ref())).await;
            let mut rows = stream::iter(rows);
            while let Some(row) = rows.next().await {
                let item: Result<T, DataError> = Ok(row);
                yield item;
            }
        })
    }

    async fn exists(&mut self, filter: Filter) -> Result<bool, DataError> {
        Ok(self
            .read(|table| table.rows.values().any(|row| filter.matches(row)))
            .await)
    }

    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fixtures::{Gadget, GadgetLabel, gadget},
        query::Order,
    };
    use chrono::Duration;
    use futures::TryStreamExt;

    async fn seeded() -> MemoryStore<Gadget> {
        let store = MemoryStore::new();
        let mut session = store.session();
        for (name, serial) in [("lamp", "S-1"), ("drill", "S-2"), ("bulb", "S-3")] {
            session.create(gadget(name, serial)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn create_assigns_increasing_keys() {
        let store = seeded().await;
        let ids: Vec<i64> = store
            .session()
            .get_all(None)
            .await
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn unique_columns_are_enforced() {
        let store = seeded().await;
        let mut session = store.session();
        let duplicate = session.create(gadget("other", "S-1")).await;
        assert!(matches!(duplicate, Err(DataError::Constraint(_))));
        assert_eq!(store.len().await, 3);

        let record = session
            .get_one(Some(Filter::eq("serial", "S-2")), true)
            .await
            .unwrap()
            .unwrap();
        record.update(|g| g.serial = "S-3".into());
        assert!(matches!(session.save().await, Err(DataError::Constraint(_))));
    }

    #[tokio::test]
    async fn tracked_edits_are_saved() {
        let store = seeded().await;
        let mut session = store.session();
        let record = session
            .get_one(Some(Filter::eq("name", "drill")), true)
            .await
            .unwrap()
            .unwrap();
        record.update(|g| g.note = Some("cordless".into()));
        assert_eq!(session.save().await.unwrap(), 1);
        assert_eq!(session.save().await.unwrap(), 0);

        let stored = store
            .session()
            .get_one(Some(Filter::eq("id", 2)), false)
            .await
            .unwrap()
            .unwrap()
            .into_inner();
        assert_eq!(stored.note.as_deref(), Some("cordless"));
    }

    #[tokio::test]
    async fn untracked_edits_are_ignored() {
        let store = seeded().await;
        let mut session = store.session();
        let record = session
            .get_one(Some(Filter::eq("id", 1)), false)
            .await
            .unwrap()
            .unwrap();
        record.update(|g| g.name = "changed".into());
        assert_eq!(session.save().await.unwrap(), 0);
        let names: Vec<String> = session
            .get_all(Some(Filter::eq("name", "changed")))
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn immutable_columns_cannot_be_saved() {
        let store = seeded().await;
        let mut session = store.session();
        let record = session.get_one(None, true).await.unwrap().unwrap();
        let original = record.get().created_at;
        record.update(|g| g.created_at += Duration::days(3));
        assert!(matches!(session.save().await, Err(DataError::Constraint(_))));

        let stored = store.session().get_one(None, false).await.unwrap().unwrap();
        assert_eq!(stored.get().created_at, original);
    }

    #[tokio::test]
    async fn commit_and_rollback_need_a_transaction() {
        let store = seeded().await;
        let mut session = store.session();
        assert!(session.commit().await.unwrap_err().is_invalid_state());
        assert!(session.rollback().await.unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn nested_begin_is_a_no_op() {
        let store = seeded().await;
        let mut session = store.session();
        session.begin_transaction().await.unwrap();
        session.create(gadget("saw", "S-4")).await.unwrap();
        session.begin_transaction().await.unwrap();
        assert!(session.in_transaction());
        session.commit().await.unwrap();
        assert!(!session.in_transaction());
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn rollback_restores_rows_and_discards_edits() {
        let store = seeded().await;
        let mut session = store.session();
        session.begin_transaction().await.unwrap();
        session.create(gadget("saw", "S-4")).await.unwrap();
        let record = session.get_one(None, true).await.unwrap().unwrap();
        record.update(|g| g.name = "renamed".into());
        session.rollback().await.unwrap();

        assert_eq!(session.save().await.unwrap(), 0);
        assert_eq!(store.len().await, 3);
        assert!(
            !session
                .exists(Filter::eq("name", "renamed"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn commit_flushes_tracked_edits() {
        let store = seeded().await;
        let mut session = store.session();
        session.begin_transaction().await.unwrap();
        let record = session
            .get_one(Some(Filter::eq("serial", "S-3")), true)
            .await
            .unwrap()
            .unwrap();
        record.update(|g| g.active = false);
        session.commit().await.unwrap();

        let mut reader = store.session();
        assert!(reader.exists(Filter::eq("active", false)).await.unwrap());
    }

    #[tokio::test]
    async fn dropping_a_session_rolls_back() {
        let store = seeded().await;
        {
            let mut session = store.session();
            session.begin_transaction().await.unwrap();
            session.create(gadget("saw", "S-4")).await.unwrap();
        }
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn remove_missing_row_is_not_found() {
        let store = seeded().await;
        let mut session = store.session();
        let first = session.get_one(None, false).await.unwrap().unwrap().get();
        session.remove(&first).await.unwrap();
        assert!(matches!(
            session.remove(&first).await,
            Err(DataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn projections_are_read_only_views() {
        let store = seeded().await;
        let mut session = store.session();
        let label: GadgetLabel = session
            .get_projected(Filter::eq("serial", "S-2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            label,
            GadgetLabel {
                id: 2,
                name: "drill".into()
            }
        );
        let labels: Vec<GadgetLabel> = session.get_all_projected(None).await.unwrap();
        assert_eq!(labels.len(), 3);
    }

    #[tokio::test]
    async fn query_handle_orders_and_tracks() {
        let store = seeded().await;
        let mut session = store.session();
        let query = session.query(true).order_by("name", Order::Asc).limit(2);
        let records = session.fetch(query).await.unwrap();
        let names: Vec<String> = records.iter().map(|r| r.get().name).collect();
        assert_eq!(names, vec!["bulb", "drill"]);

        records[0].update(|g| g.note = Some("warm".into()));
        assert_eq!(session.save().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stream_yields_matching_rows() {
        let store = seeded().await;
        let mut session = store.session();
        let names: Vec<String> = session
            .stream(Some(Filter::contains("name", "l")))
            .map_ok(|g| g.name)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names, vec!["lamp", "drill", "bulb"]);
    }

    #[tokio::test]
    async fn writers_outside_a_transaction_wait_for_it() {
        let store = seeded().await;
        let mut first = store.session();
        first.begin_transaction().await.unwrap();
        first.create(gadget("saw", "S-4")).await.unwrap();

        let other = store.clone();
        let waiter = tokio::spawn(async move {
            let mut second = other.session();
            second.create(gadget("saw", "S-4")).await
        });
        tokio::task::yield_now().await;
        first.commit().await.unwrap();

        let outcome = waiter.await.unwrap();
        assert!(matches!(outcome, Err(DataError::Constraint(_))));
        assert_eq!(store.len().await, 4);
    }
}
