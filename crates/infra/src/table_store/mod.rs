//! Key-value table storage.
//!
//! Rows are addressed by `(table, partition_key, row_key)` and carry a flat
//! JSON object of properties. Every operation is atomic at single-row
//! granularity; there are no cross-row transactions.

pub mod in_memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use in_memory::InMemoryTableStore;
pub use postgres::PostgresTableStore;
pub use query::{KeyFilter, TableQuery};

/// A stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub partition_key: String,
    pub row_key: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("row already exists")]
    Conflict,

    #[error("row mapping failed: {0}")]
    Mapping(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Make sure `table` can be used. Cheap after the first call.
    async fn ensure_table(&self, table: &str) -> Result<(), StoreError>;

    async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Row>, StoreError>;

    /// Rows matching `query`, ordered by (partition_key, row_key).
    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<Row>, StoreError>;

    /// Insert a new row; `Conflict` if the key is taken.
    async fn create(&self, table: &str, row: Row) -> Result<(), StoreError>;

    /// Replace an existing row; `NotFound` if absent.
    async fn update(&self, table: &str, row: Row) -> Result<(), StoreError>;

    /// Delete an existing row; `NotFound` if absent.
    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), StoreError>;
}
