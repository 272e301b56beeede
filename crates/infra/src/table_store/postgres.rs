//! Postgres-backed table store.
//!
//! All logical tables share one physical table keyed by
//! `(table_name, partition_key, row_key)` with the properties in a JSONB
//! column.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | zero rows affected on update/delete | N/A | `NotFound` |
//! | anything else | Any | `Backend` |
//!
//! ## Schema lifecycle
//!
//! The schema is created on first use and remembered for the life of the
//! process (`schema_ready`). It is never re-checked.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};
use tokio::sync::OnceCell;
use tracing::instrument;

use super::{KeyFilter, Row, StoreError, TableQuery, TableStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS table_rows (
    table_name    TEXT        NOT NULL,
    partition_key TEXT        NOT NULL,
    row_key       TEXT        NOT NULL,
    properties    JSONB       NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (table_name, partition_key, row_key)
)
"#;

#[derive(Debug, Clone)]
pub struct PostgresTableStore {
    pool: Arc<PgPool>,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(SCHEMA)
                    .execute(&*self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
                tracing::info!("table store schema ready");
                Ok::<(), StoreError>(())
            })
            .await
            .map(|_| ())
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Conflict,
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(err.to_string()),
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Row, StoreError> {
    let partition_key: String = row.try_get("partition_key").map_err(map_sqlx_error)?;
    let row_key: String = row.try_get("row_key").map_err(map_sqlx_error)?;
    let Json(properties): Json<Value> = row.try_get("properties").map_err(map_sqlx_error)?;
    match properties {
        Value::Object(properties) => Ok(Row {
            partition_key,
            row_key,
            properties,
        }),
        other => Err(StoreError::Mapping(format!(
            "properties of {partition_key}/{row_key} is not an object: {other}"
        ))),
    }
}

fn push_key_filter(qb: &mut QueryBuilder<'_, Postgres>, column: &str, filter: &KeyFilter) {
    match filter {
        KeyFilter::Eq(v) => {
            qb.push(format!(" AND {column} = ")).push_bind(v.clone());
        }
        KeyFilter::Prefix(p) => {
            qb.push(format!(" AND starts_with({column}, "))
                .push_bind(p.clone())
                .push(")");
        }
    }
}

#[async_trait]
impl TableStore for PostgresTableStore {
    async fn ensure_table(&self, _table: &str) -> Result<(), StoreError> {
        self.ensure_schema().await
    }

    #[instrument(skip(self), err)]
    async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Row>, StoreError> {
        self.ensure_schema().await?;
        let row = sqlx::query(
            r#"
            SELECT partition_key, row_key, properties
            FROM table_rows
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
            "#,
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(decode_row).transpose()
    }

    #[instrument(skip(self, query), err)]
    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<Row>, StoreError> {
        self.ensure_schema().await?;

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT partition_key, row_key, properties FROM table_rows WHERE table_name = ");
        qb.push_bind(table.to_string());

        if let Some(f) = &query.partition_key {
            push_key_filter(&mut qb, "partition_key", f);
        }
        if let Some(f) = &query.row_key {
            push_key_filter(&mut qb, "row_key", f);
        }
        for (name, value) in &query.properties {
            qb.push(" AND properties -> ")
                .push_bind(name.clone())
                .push(" = ")
                .push_bind(Json(value.clone()));
        }
        qb.push(" ORDER BY partition_key, row_key");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(decode_row).collect()
    }

    #[instrument(skip(self, row), fields(pk = %row.partition_key, rk = %row.row_key), err)]
    async fn create(&self, table: &str, row: Row) -> Result<(), StoreError> {
        self.ensure_schema().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO table_rows (table_name, partition_key, row_key, properties)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (table_name, partition_key, row_key) DO NOTHING
            "#,
        )
        .bind(table)
        .bind(&row.partition_key)
        .bind(&row.row_key)
        .bind(Json(Value::Object(row.properties)))
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    #[instrument(skip(self, row), fields(pk = %row.partition_key, rk = %row.row_key), err)]
    async fn update(&self, table: &str, row: Row) -> Result<(), StoreError> {
        self.ensure_schema().await?;
        let result = sqlx::query(
            r#"
            UPDATE table_rows
            SET properties = $4, updated_at = now()
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
            "#,
        )
        .bind(table)
        .bind(&row.partition_key)
        .bind(&row.row_key)
        .bind(Json(Value::Object(row.properties)))
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), StoreError> {
        self.ensure_schema().await?;
        let result = sqlx::query(
            "DELETE FROM table_rows WHERE table_name = $1 AND partition_key = $2 AND row_key = $3",
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
