use crate::{
    entity::{Entity, Value},
    filter::Filter,
    sql,
};
use std::{cmp::Ordering, marker::PhantomData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Composable read over `T`, executed by `Repository::fetch`.
#[derive(Debug, Clone)]
pub struct Query<T> {
    filters: Vec<Filter>,
    order: Vec<(&'static str, Order)>,
    limit: Option<usize>,
    offset: usize,
    tracked: bool,
    entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Query<T> {
    pub fn new(tracked: bool) -> Self {
        Self {
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: 0,
            tracked,
            entity: PhantomData,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order.push((column, order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Conjunction of every filter added so far.
    pub fn predicate(&self) -> Option<Filter> {
        match self.filters.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(Filter::All(many.to_vec())),
        }
    }

    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let mut statement = sql::select::<T>(
            &sql::entity_columns::<T>(),
            self.predicate().as_ref(),
            params,
        );
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, order)| match order {
                    Order::Asc => format!("{column} ASC"),
                    Order::Desc => format!("{column} DESC"),
                })
                .collect::<Vec<String>>()
                .join(", ");
            statement.push_str(&format!(" ORDER BY {order}"));
        }
        if let Some(limit) = self.limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }
        if self.offset > 0 {
            statement.push_str(&format!(" OFFSET {}", self.offset));
        }
        statement
    }

    /// In-memory evaluation; nulls sort after every other value, as in
    /// PostgreSQL's ascending default.
    pub fn apply(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let predicate = self.predicate();
        let mut rows: Vec<T> = rows
            .into_iter()
            .filter(|row| predicate.as_ref().is_none_or(|p| p.matches(row)))
            .collect();
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|(column, order)| {
                        let ordering = compare(a.value(column), b.value(column));
                        match order {
                            Order::Asc => ordering,
                            Order::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        rows.into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

fn compare(a: Option<Value>, b: Option<Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Greater,
        (_, Some(Value::Null) | None) => Ordering::Less,
        (Some(a), Some(b)) => a.compare(&b).unwrap_or(Ordering::Equal),
    }
}
