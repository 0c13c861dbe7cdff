use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use orgportal_data::{
    BackendKind, BoundQuery, DataError, DriverOutput, EntityRecord, EntityType, QueryAction, QueryContext,
    QueryKind, StorageDriver,
};

use crate::client::{HttpTableClient, TableClient, TableError};
use crate::codec;
use crate::compile;
use crate::filter::TableFilter;

/// Partitioned-table driver. One table per entity type, partition key per
/// entity type, row key = entity id.
#[derive(Clone)]
pub struct TableDriver {
    client: Arc<dyn TableClient>,
    prefix: String,
    /// Queries already reported as partly evaluated client-side.
    fallbacks: Arc<DashSet<(EntityType, QueryKind)>>,
}

fn into_data_error(err: TableError, entity_type: EntityType, id: &str) -> DataError {
    match err {
        TableError::NotFound => DataError::not_found(entity_type, id),
        TableError::Conflict => DataError::conflict(entity_type, id),
        other => DataError::backend(other),
    }
}

/// Table names must be alphanumeric and start with a letter.
pub fn is_valid_table_name(name: &str) -> bool {
    BackendKind::Table.accepts_table_name(name)
}

impl TableDriver {
    pub fn new(client: Arc<dyn TableClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            fallbacks: Arc::new(DashSet::new()),
        }
    }

    /// Driver over the REST API of the given endpoint.
    pub fn connect(endpoint: &str, sas: &str, prefix: impl Into<String>) -> Result<Self, DataError> {
        let client = HttpTableClient::new(endpoint, sas).map_err(DataError::backend)?;
        tracing::info!(endpoint, "table storage client ready");
        Ok(Self::new(Arc::new(client), prefix))
    }

    /// True the first time a query of this entity type falls back to
    /// client-side evaluation; shared between clones.
    fn first_fallback(&self, entity_type: EntityType, kind: QueryKind) -> bool {
        self.fallbacks.insert((entity_type, kind))
    }

    fn table<'a>(ctx: &QueryContext<'a>) -> Result<&'a str, DataError> {
        if is_valid_table_name(ctx.table) {
            Ok(ctx.table)
        } else {
            Err(DataError::Configuration(format!(
                "{}: '{}' is not a valid table name",
                ctx.entity_type, ctx.table
            )))
        }
    }

    async fn fetch(&self, ctx: &QueryContext<'_>, filter: &TableFilter) -> Result<Vec<EntityRecord>, DataError> {
        let table = Self::table(ctx)?;
        let entities = self
            .client
            .query_entities(table, filter)
            .await
            .map_err(DataError::backend)?;
        Ok(entities.iter().map(|e| codec::from_entity(ctx, e)).collect())
    }
}

#[async_trait]
impl StorageDriver for TableDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Table
    }

    fn default_table(&self, entity_type: EntityType) -> String {
        format!("{}{}", self.prefix, entity_type.name())
    }

    async fn get(&self, ctx: &QueryContext<'_>, id: &str) -> Result<Option<EntityRecord>, DataError> {
        let table = Self::table(ctx)?;
        let entity = self
            .client
            .get_entity(table, ctx.partition_key, id)
            .await
            .map_err(|e| into_data_error(e, ctx.entity_type, id))?;
        Ok(entity.map(|e| codec::from_entity(ctx, &e)))
    }

    async fn insert(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        let table = Self::table(ctx)?;
        self.client
            .insert_entity(table, codec::to_entity(ctx, record))
            .await
            .map_err(|e| into_data_error(e, ctx.entity_type, &record.entity_id))
    }

    async fn replace(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        let table = Self::table(ctx)?;
        self.client
            .update_entity(table, codec::to_entity(ctx, record))
            .await
            .map_err(|e| into_data_error(e, ctx.entity_type, &record.entity_id))
    }

    async fn remove(&self, ctx: &QueryContext<'_>, id: &str) -> Result<(), DataError> {
        let table = Self::table(ctx)?;
        self.client
            .delete_entity(table, ctx.partition_key, id)
            .await
            .map_err(|e| into_data_error(e, ctx.entity_type, id))
    }

    async fn execute(&self, ctx: &QueryContext<'_>, query: &BoundQuery) -> Result<DriverOutput, DataError> {
        let plan = compile::compile(ctx, query);
        tracing::debug!(
            entity_type = %ctx.entity_type,
            filter = %plan.filter.render().unwrap_or_default(),
            "table query"
        );
        if plan.needs_client_side() && self.first_fallback(ctx.entity_type, query.kind) {
            tracing::warn!(
                entity_type = %ctx.entity_type,
                query = %query.kind,
                "evaluating part of the query client-side"
            );
        }

        let records = self.fetch(ctx, &plan.filter).await?;
        match plan.action {
            QueryAction::Delete => {
                let table = Self::table(ctx)?;
                let mut removed = 0u64;
                for record in records.iter().filter(|r| plan.keep(r)) {
                    match self
                        .client
                        .delete_entity(table, ctx.partition_key, &record.entity_id)
                        .await
                    {
                        Ok(()) => removed += 1,
                        // already gone
                        Err(TableError::NotFound) => {}
                        Err(err) => return Err(DataError::backend(err)),
                    }
                }
                Ok(DriverOutput::Affected(removed))
            }
            _ => Ok(plan.finish(records)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert!(is_valid_table_name("portalTeamSnapshot"));
        assert!(!is_valid_table_name("team_snapshot"));
        assert!(!is_valid_table_name("1team"));
        assert!(!is_valid_table_name("ab"));
    }

    #[test]
    fn default_table_uses_prefix() {
        let driver = TableDriver::new(Arc::new(crate::MemoryTableClient::new()), "portal");
        assert_eq!(
            driver.default_table(EntityType::new("AuditRecord")),
            "portalAuditRecord"
        );
    }

    #[test]
    fn client_side_fallback_reported_once_per_query() {
        let driver = TableDriver::new(Arc::new(crate::MemoryTableClient::new()), "portal");
        let team = EntityType::new("TeamSnapshot");
        assert!(driver.first_fallback(team, QueryKind::ByOrganizationId));
        assert!(!driver.first_fallback(team, QueryKind::ByOrganizationId));
        assert!(!driver.clone().first_fallback(team, QueryKind::ByOrganizationId));
        assert!(driver.first_fallback(team, QueryKind::All));
        assert!(driver.first_fallback(EntityType::new("AuditRecord"), QueryKind::ByOrganizationId));
    }
}
