#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use orgportal_data::{
    BackendKind, BoundQuery, DataError, DriverOutput, EntityRecord, EntityType, MappingRegistry,
    MemoryDriver, QueryContext, RegistryBuilder, StorageDriver,
};
use orgportal_data_table::{MemoryTableClient, TableDriver};
use orgportal_entities::register_entities;

pub fn registry() -> Arc<MappingRegistry> {
    let mut builder = RegistryBuilder::new();
    register_entities(&mut builder).unwrap();
    builder.seal().unwrap()
}

/// Stores records the way the relational backend does: as a JSON document
/// in a shared table, read back without type information.
#[derive(Clone, Default)]
pub struct DocumentDriver {
    inner: MemoryDriver,
}

fn through_document(record: &EntityRecord) -> EntityRecord {
    EntityRecord::from_document(record.entity_type, record.entity_id.clone(), &record.to_document())
}

#[async_trait]
impl StorageDriver for DocumentDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn default_table(&self, _entity_type: EntityType) -> String {
        "entitymetadata".to_string()
    }

    async fn get(&self, ctx: &QueryContext<'_>, id: &str) -> Result<Option<EntityRecord>, DataError> {
        self.inner.get(ctx, id).await
    }

    async fn insert(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        self.inner.insert(ctx, &through_document(record)).await
    }

    async fn replace(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        self.inner.replace(ctx, &through_document(record)).await
    }

    async fn remove(&self, ctx: &QueryContext<'_>, id: &str) -> Result<(), DataError> {
        self.inner.remove(ctx, id).await
    }

    async fn execute(&self, ctx: &QueryContext<'_>, query: &BoundQuery) -> Result<DriverOutput, DataError> {
        self.inner.execute(ctx, query).await
    }
}

/// One driver per backend mapping.
pub fn drivers() -> Vec<(&'static str, Arc<dyn StorageDriver>)> {
    vec![
        ("memory", Arc::new(MemoryDriver::new()) as Arc<dyn StorageDriver>),
        (
            "table",
            Arc::new(TableDriver::new(Arc::new(MemoryTableClient::new()), "portal")) as Arc<dyn StorageDriver>,
        ),
        ("document", Arc::new(DocumentDriver::default()) as Arc<dyn StorageDriver>),
    ]
}
