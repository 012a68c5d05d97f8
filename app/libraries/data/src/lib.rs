//! Generic data access: the [`Repository`] session contract, its predicate
//! and query types, and two storage engines (PostgreSQL and in-memory).
mod entity;
mod error;
mod filter;
mod memory;
mod postgres;
mod query;
mod record;
mod repository;
mod sql;

#[cfg(test)]
mod fixtures;

pub use entity::{Entity, Projection, Value};
pub use error::DataError;
pub use filter::Filter;
pub use memory::{MemorySession, MemoryStore};
pub use postgres::{PgSession, PgStore};
pub use query::{Order, Query};
pub use record::Record;
pub use repository::{Repository, Storage};
