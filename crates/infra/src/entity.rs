//! Entity ↔ row mapping.
//!
//! Entities serialize to a flat JSON object that becomes the row's
//! properties; the keys are derived from entity fields.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use brigade_domain::{Brigade, Invitation, Member, Route, Station, Verification};

use crate::table_store::{Row, StoreError, TableQuery, TableStore};

/// Partition holding every brigade row.
pub const BRIGADE_PARTITION: &str = "brigade";

/// Row key of a brigade's (single) verification request.
pub const VERIFICATION_ROW: &str = "current";

pub trait TableEntity: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: &'static str;

    fn partition_key(&self) -> String;
    fn row_key(&self) -> String;

    fn to_row(&self) -> Result<Row, StoreError> {
        match serde_json::to_value(self).map_err(|e| StoreError::Mapping(e.to_string()))? {
            Value::Object(properties) => Ok(Row {
                partition_key: self.partition_key(),
                row_key: self.row_key(),
                properties,
            }),
            other => Err(StoreError::Mapping(format!(
                "{} entity did not serialize to an object: {other}",
                Self::TABLE
            ))),
        }
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(row.properties)).map_err(|e| {
            StoreError::Mapping(format!(
                "{} row {}/{}: {e}",
                Self::TABLE,
                row.partition_key,
                row.row_key
            ))
        })
    }
}

impl TableEntity for Brigade {
    const TABLE: &'static str = "brigades";

    fn partition_key(&self) -> String {
        BRIGADE_PARTITION.to_string()
    }

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

impl TableEntity for Member {
    const TABLE: &'static str = "members";

    fn partition_key(&self) -> String {
        self.brigade_id.to_string()
    }

    fn row_key(&self) -> String {
        self.user_id.to_string()
    }
}

impl TableEntity for Route {
    const TABLE: &'static str = "routes";

    fn partition_key(&self) -> String {
        self.brigade_id.to_string()
    }

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

impl TableEntity for Invitation {
    const TABLE: &'static str = "invitations";

    fn partition_key(&self) -> String {
        self.brigade_id.to_string()
    }

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

impl TableEntity for Verification {
    const TABLE: &'static str = "verifications";

    fn partition_key(&self) -> String {
        self.brigade_id.to_string()
    }

    fn row_key(&self) -> String {
        VERIFICATION_ROW.to_string()
    }
}

impl TableEntity for Station {
    const TABLE: &'static str = "stations";

    fn partition_key(&self) -> String {
        self.brigade_id.to_string()
    }

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

/// Typed access to one entity table.
pub struct Repository<E> {
    store: Arc<dyn TableStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: TableEntity> Repository<E> {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        self.store.ensure_table(E::TABLE).await
    }

    pub async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<E>, StoreError> {
        self.store
            .get(E::TABLE, partition_key, row_key)
            .await?
            .map(E::from_row)
            .transpose()
    }

    pub async fn list(&self, query: &TableQuery) -> Result<Vec<E>, StoreError> {
        self.store
            .query(E::TABLE, query)
            .await?
            .into_iter()
            .map(E::from_row)
            .collect()
    }

    pub async fn list_partition(&self, partition_key: &str) -> Result<Vec<E>, StoreError> {
        self.list(&TableQuery::partition(partition_key)).await
    }

    pub async fn create(&self, entity: &E) -> Result<(), StoreError> {
        self.store.create(E::TABLE, entity.to_row()?).await
    }

    pub async fn update(&self, entity: &E) -> Result<(), StoreError> {
        self.store.update(E::TABLE, entity.to_row()?).await
    }

    pub async fn delete(&self, partition_key: &str, row_key: &str) -> Result<(), StoreError> {
        self.store.delete(E::TABLE, partition_key, row_key).await
    }
}
