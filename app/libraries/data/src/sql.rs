//! Statement builders for the PostgreSQL session.
//!
//! Identifiers come from [`Entity`]/[`Projection`] metadata; every value is a
//! `$n` placeholder whose argument is pushed onto `params`.
use crate::{
    entity::{Entity, Value},
    filter::Filter,
    record::Change,
};

pub(crate) fn entity_columns<T: Entity>() -> String {
    std::iter::once(T::id_column())
        .chain(T::columns().iter().copied())
        .collect::<Vec<&str>>()
        .join(", ")
}

pub(crate) fn where_clause(filter: Option<&Filter>, params: &mut Vec<Value>) -> String {
    match filter {
        Some(filter) => format!(" WHERE {}", filter.to_sql(params)),
        None => String::new(),
    }
}

pub(crate) fn select<T: Entity>(
    columns: &str,
    filter: Option<&Filter>,
    params: &mut Vec<Value>,
) -> String {
    format!(
        "SELECT {columns} FROM {}{}",
        T::table_name(),
        where_clause(filter, params)
    )
}

pub(crate) fn insert<T: Entity>() -> String {
    let placeholders = (1..=T::columns().len())
        .map(|n| format!("${n}"))
        .collect::<Vec<String>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING {}",
        T::table_name(),
        T::columns().join(", "),
        T::id_column()
    )
}

pub(crate) fn update<T: Entity>(change: &Change<T>, params: &mut Vec<Value>) -> String {
    let assignments = change
        .columns
        .iter()
        .map(|(column, value)| {
            params.push(value.clone());
            format!("{column} = ${}", params.len())
        })
        .collect::<Vec<String>>()
        .join(", ");
    params.push(Value::Int(change.id));
    format!(
        "UPDATE {} SET {assignments} WHERE {} = ${}",
        T::table_name(),
        T::id_column(),
        params.len()
    )
}

pub(crate) fn delete<T: Entity>() -> String {
    format!(
        "DELETE FROM {} WHERE {} = $1",
        T::table_name(),
        T::id_column()
    )
}

pub(crate) fn exists<T: Entity>(filter: &Filter, params: &mut Vec<Value>) -> String {
    format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE {})",
        T::table_name(),
        filter.to_sql(params)
    )
}
