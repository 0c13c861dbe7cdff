use async_trait::async_trait;
use orgportal_data::{
    BackendKind, BoundQuery, DataError, DriverOutput, EntityRecord, EntityType, FieldValue, QueryContext,
    StorageDriver,
};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};

use crate::compile::{self, SqlOutput, SqlParam, SqlStatement};
use crate::error::{SqlxErrorExt, SqlxResult};

/// Relational-document driver: every entity lives in a row of
/// `(entitytype, entityid, metadata jsonb)`.
#[derive(Clone)]
pub struct PostgresDriver {
    pool: PgPool,
    table: String,
}

impl PostgresDriver {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Open a pool of at most `connections` connections.
    pub async fn connect(url: &str, connections: u32, table: impl Into<String>) -> SqlxResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(connections)
            .connect(url)
            .await
            .map_err(|e| e.into_data_error())?;
        let table = table.into();
        tracing::info!(table = %table, connections, "postgres storage connected");
        Ok(Self::new(pool, table))
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn prepare(statement: &SqlStatement) -> Query<'_, Postgres, PgArguments> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = match param {
                SqlParam::Text(text) => query.bind(text.as_str()),
                SqlParam::Json(doc) => query.bind(Json(doc)),
            };
        }
        query
    }

    async fn rows_affected(&self, statement: &SqlStatement) -> Result<u64, sqlx::Error> {
        let result = Self::prepare(statement).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn record_from_row(entity_type: EntityType, row: &PgRow) -> SqlxResult<EntityRecord> {
    let id: String = row.try_get("entityid").map_err(|e| e.into_data_error())?;
    let Json(metadata): Json<serde_json::Value> = row.try_get("metadata").map_err(|e| e.into_data_error())?;
    Ok(EntityRecord::from_document(entity_type, id, &metadata))
}

#[async_trait]
impl StorageDriver for PostgresDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn default_table(&self, _entity_type: EntityType) -> String {
        self.table.clone()
    }

    async fn get(&self, ctx: &QueryContext<'_>, id: &str) -> Result<Option<EntityRecord>, DataError> {
        let statement = compile::select_by_id(ctx, id)?;
        let row = Self::prepare(&statement)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        row.map(|row| record_from_row(ctx.entity_type, &row)).transpose()
    }

    async fn insert(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        let statement = compile::insert(ctx, record)?;
        self.rows_affected(&statement)
            .await
            .map_err(|e| e.into_write_error(ctx.entity_type, &record.entity_id))?;
        Ok(())
    }

    async fn replace(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        let statement = compile::replace(ctx, record)?;
        let affected = self
            .rows_affected(&statement)
            .await
            .map_err(|e| e.into_data_error())?;
        if affected == 0 {
            return Err(DataError::not_found(ctx.entity_type, &record.entity_id));
        }
        Ok(())
    }

    async fn remove(&self, ctx: &QueryContext<'_>, id: &str) -> Result<(), DataError> {
        let statement = compile::delete_by_id(ctx, id)?;
        let affected = self
            .rows_affected(&statement)
            .await
            .map_err(|e| e.into_data_error())?;
        if affected == 0 {
            return Err(DataError::not_found(ctx.entity_type, id));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &QueryContext<'_>, query: &BoundQuery) -> Result<DriverOutput, DataError> {
        let statement = compile::compile(ctx, query)?;
        tracing::debug!(entity_type = %ctx.entity_type, sql = %statement.sql, "postgres query");
        match statement.output {
            SqlOutput::Affected => {
                let affected = self
                    .rows_affected(&statement)
                    .await
                    .map_err(|e| e.into_data_error())?;
                Ok(DriverOutput::Affected(affected))
            }
            SqlOutput::Scalars => {
                let rows = Self::prepare(&statement)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| e.into_data_error())?;
                let values = rows
                    .iter()
                    .map(|row| {
                        row.try_get::<Option<String>, _>("value")
                            .map(|value| value.map(FieldValue::String).unwrap_or(FieldValue::Null))
                            .map_err(|e| e.into_data_error())
                    })
                    .collect::<SqlxResult<Vec<_>>>()?;
                Ok(DriverOutput::Values(values))
            }
            SqlOutput::Rows => {
                let rows = Self::prepare(&statement)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| e.into_data_error())?;
                let records = rows
                    .iter()
                    .map(|row| record_from_row(ctx.entity_type, row))
                    .collect::<SqlxResult<Vec<_>>>()?;
                Ok(DriverOutput::Records(records))
            }
        }
    }
}
