use crate::{
    entity::{Entity, Projection, Value},
    error::DataError,
    filter::Filter,
    query::Query,
    record::{Record, Tracker},
    repository::{Repository, Storage},
    sql,
};
use futures::{StreamExt, stream::BoxStream};
use sqlx::{
    Arguments, FromRow, PgPool, Postgres, Transaction,
    postgres::{PgArguments, PgRow},
};
use tracing::*;

/// PostgreSQL storage backed by a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl<T: Entity> Storage<T> for PgStore {
    type Session = PgSession<T>;

    fn session(&self) -> PgSession<T> {
        PgSession::new(self.pool.clone())
    }
}

/// Per-request session; statements run on the open transaction when there is
/// one, on the pool otherwise. Dropping an open transaction rolls it back.
pub struct PgSession<T: Entity> {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    tracker: Tracker<T>,
}

impl<T: Entity> PgSession<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            tracker: Tracker::default(),
        }
    }

    async fn fetch_rows<O>(&mut self, statement: &str, params: Vec<Value>) -> Result<Vec<O>, DataError>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        debug!("{statement}");
        let query = sqlx::query_as_with::<Postgres, O, _>(statement, arguments(params)?);
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };
        Ok(rows)
    }

    async fn fetch_first<O>(&mut self, statement: &str, params: Vec<Value>) -> Result<Option<O>, DataError>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        debug!("{statement}");
        let query = sqlx::query_as_with::<Postgres, O, _>(statement, arguments(params)?);
        let row = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await?,
            None => query.fetch_optional(&self.pool).await?,
        };
        Ok(row)
    }

    async fn execute(&mut self, statement: &str, params: Vec<Value>) -> Result<u64, DataError> {
        debug!("{statement}");
        let query = sqlx::query_with::<Postgres, _>(statement, arguments(params)?);
        let done = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(&self.pool).await?,
        };
        Ok(done.rows_affected())
    }
}

fn arguments(params: Vec<Value>) -> Result<PgArguments, DataError> {
    let mut args = PgArguments::default();
    for value in params {
        match value {
            Value::Null => args.add(None::<String>),
            Value::Bool(value) => args.add(value),
            Value::Int(value) => args.add(value),
            Value::Text(value) => args.add(value),
            Value::Timestamp(value) => args.add(value),
        }
        .map_err(|e| DataError::Encode(e.to_string()))?;
    }
    Ok(args)
}

impl<T: Entity> Repository<T> for PgSession<T> {
    async fn create(&mut self, mut entity: T) -> Result<T, DataError> {
        let statement = sql::insert::<T>();
        debug!("{statement}");
        let query = sqlx::query_scalar_with::<Postgres, i64, _>(&statement, arguments(entity.values())?);
        let id = match self.tx.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await?,
            None => query.fetch_one(&self.pool).await?,
        };
        entity.set_id(id);
        Ok(entity)
    }

    async fn get_one(&mut self, filter: Option<Filter>, tracked: bool) -> Result<Option<Record<T>>, DataError> {
        let mut params = Vec::new();
        let statement = format!(
            "{} LIMIT 1",
            sql::select::<T>(&sql::entity_columns::<T>(), filter.as_ref(), &mut params)
        );
        let found = self.fetch_first::<T>(&statement, params).await?.map(Record::new);
        if tracked {
            if let Some(record) = &found {
                self.tracker.track(record);
            }
        }
        Ok(found)
    }

    async fn get_all(&mut self, filter: Option<Filter>) -> Result<Vec<T>, DataError> {
        let mut params = Vec::new();
        let statement = sql::select::<T>(&sql::entity_columns::<T>(), filter.as_ref(), &mut params);
        self.fetch_rows::<T>(&statement, params).await
    }

    async fn remove(&mut self, entity: &T) -> Result<(), DataError> {
        let affected = self
            .execute(&sql::delete::<T>(), vec![Value::Int(entity.id())])
            .await?;
        if affected == 0 {
            return Err(DataError::NotFound(format!(
                "{} with {} = {}",
                T::table_name(),
                T::id_column(),
                entity.id()
            )));
        }
        self.tracker.forget(entity.id());
        Ok(())
    }

    async fn save(&mut self) -> Result<u64, DataError> {
        let mut written = 0;
        for change in self.tracker.pending()? {
            let mut params = Vec::new();
            let statement = sql::update::<T>(&change, &mut params);
            let affected = self.execute(&statement, params).await?;
            if affected == 0 {
                return Err(DataError::NotFound(format!(
                    "{} with {} = {}",
                    T::table_name(),
                    T::id_column(),
                    change.id
                )));
            }
            written += affected;
        }
        self.tracker.mark_saved();
        Ok(written)
    }

    async fn begin_transaction(&mut self) -> Result<(), DataError> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DataError> {
        if self.tx.is_none() {
            return Err(DataError::InvalidState("commit without an open transaction"));
        }
        self.save().await?;
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DataError> {
        let tx = self
            .tx
            .take()
            .ok_or(DataError::InvalidState("rollback without an open transaction"))?;
        self.tracker.clear();
        tx.rollback().await?;
        Ok(())
    }

    async fn get_projected<P: Projection<T>>(&mut self, filter: Filter) -> Result<Option<P>, DataError> {
        let mut params = Vec::new();
        let statement = format!(
            "{} LIMIT 1",
            sql::select::<T>(&P::columns().join(", "), Some(&filter), &mut params)
        );
        self.fetch_first::<P>(&statement, params).await
    }

    async fn get_all_projected<P: Projection<T>>(&mut self, filter: Option<Filter>) -> Result<Vec<P>, DataError> {
        let mut params = Vec::new();
        let statement = sql::select::<T>(&P::columns().join(", "), filter.as_ref(), &mut params);
        self.fetch_rows::<P>(&statement, params).await
    }

    async fn fetch(&mut self, query: Query<T>) -> Result<Vec<Record<T>>, DataError> {
        let mut params = Vec::new();
        let statement = query.to_sql(&mut params);
        let records: Vec<Record<T>> = self
            .fetch_rows::<T>(&statement, params)
            .await?
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
            let mut params = Vec::new();
            let statement = sql::select::<T>(&sql::entity_columns::<T>(), filter.as_ref(), &mut params);
            debug!("{statement}");
            let args = match arguments(params) {
                Ok(args) => args,
                Err(e) => {
                    let failed: Result<T, DataError> = Err(e);
                    yield failed;
                    return;
                }
            };
            let query = sqlx::query_as_with::<Postgres, T, _>(&statement, args);
            let mut rows = match self.tx.as_mut() {
                Some(tx) => query.fetch(&mut **tx),
                None => query.fetch(&self.pool),
            };
            while let Some(row) = rows.next().await {
                let item: Result<T, DataError> = row.map_err(DataError::from);
                yield item;
            }
        })
    }

    async fn exists(&mut self, filter: Filter) -> Result<bool, DataError> {
        let mut params = Vec::new();
        let statement = sql::exists::<T>(&filter, &mut params);
        debug!("{statement}");
        let query = sqlx::query_scalar_with::<Postgres, bool, _>(&statement, arguments(params)?);
        let found = match self.tx.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await?,
            None => query.fetch_one(&self.pool).await?,
        };
        Ok(found)
    }

    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}
