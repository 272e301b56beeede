use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Row, StoreError, TableQuery, TableStore};

type Table = BTreeMap<(String, String), Row>;

/// In-memory table store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("in-memory table lock poisoned".to_string())
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Row>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get(table)
            .and_then(|t| t.get(&(partition_key.to_string(), row_key.to_string())))
            .cloned())
    }

    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get(table)
            .map(|t| t.values().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let t = tables.entry(table.to_string()).or_default();
        let key = (row.partition_key.clone(), row.row_key.clone());
        if t.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        t.insert(key, row);
        Ok(())
    }

    async fn update(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let slot = tables
            .get_mut(table)
            .and_then(|t| t.get_mut(&(row.partition_key.clone(), row.row_key.clone())))
            .ok_or(StoreError::NotFound)?;
        *slot = row;
        Ok(())
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables
            .get_mut(table)
            .and_then(|t| t.remove(&(partition_key.to_string(), row_key.to_string())))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::table_store::KeyFilter;

    fn row(pk: &str, rk: &str) -> Row {
        Row {
            partition_key: pk.into(),
            row_key: rk.into(),
            properties: json!({"name": rk}).as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let store = InMemoryTableStore::new();
        store.create("t", row("p", "r")).await.unwrap();
        assert_eq!(store.get("t", "p", "r").await.unwrap(), Some(row("p", "r")));

        let mut changed = row("p", "r");
        changed.properties.insert("name".into(), json!("renamed"));
        store.update("t", changed.clone()).await.unwrap();
        assert_eq!(store.get("t", "p", "r").await.unwrap(), Some(changed));

        store.delete("t", "p", "r").await.unwrap();
        assert_eq!(store.get("t", "p", "r").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_and_missing_rows_are_not_found() {
        let store = InMemoryTableStore::new();
        store.create("t", row("p", "r")).await.unwrap();
        assert_eq!(store.create("t", row("p", "r")).await, Err(StoreError::Conflict));
        assert_eq!(store.update("t", row("p", "x")).await, Err(StoreError::NotFound));
        assert_eq!(store.delete("t", "p", "x").await, Err(StoreError::NotFound));
        assert_eq!(store.delete("other", "p", "r").await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn tables_are_isolated_and_queries_ordered() {
        let store = InMemoryTableStore::new();
        store.create("a", row("p2", "r1")).await.unwrap();
        store.create("a", row("p1", "r2")).await.unwrap();
        store.create("a", row("p1", "r1")).await.unwrap();
        store.create("b", row("p1", "r1")).await.unwrap();

        let rows = store.query("a", &TableQuery::all()).await.unwrap();
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.partition_key.as_str(), r.row_key.as_str()))
            .collect();
        assert_eq!(keys, [("p1", "r1"), ("p1", "r2"), ("p2", "r1")]);

        let by_row = store
            .query("a", &TableQuery::all().with_row_key(KeyFilter::Eq("r1".into())))
            .await
            .unwrap();
        assert_eq!(by_row.len(), 2);

        assert!(store.query("missing", &TableQuery::all()).await.unwrap().is_empty());
    }
}
