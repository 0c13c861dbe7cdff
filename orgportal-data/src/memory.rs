use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::driver::{Capabilities, StorageDriver};
use crate::entity::EntityType;
use crate::error::DataError;
use crate::mapping::BackendKind;
use crate::query::{distinct_values, sort_records, BoundQuery, DriverOutput, QueryAction, QueryContext};
use crate::record::EntityRecord;

type Bucket = BTreeMap<String, EntityRecord>;

/// In-process driver backed by `DashMap`, one bucket per table and entity
/// type. Data is lost when the driver is dropped.
#[derive(Clone)]
pub struct MemoryDriver {
    buckets: Arc<DashMap<(String, EntityType), Bucket>>,
    capabilities: Capabilities,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::FULL)
    }

    /// A driver advertising a reduced feature set; requests outside it fail
    /// with `Unsupported`.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            capabilities,
        }
    }

    /// Number of records stored for an entity type across all tables.
    pub fn count(&self, entity_type: EntityType) -> usize {
        self.buckets
            .iter()
            .filter(|entry| entry.key().1 == entity_type)
            .map(|entry| entry.value().len())
            .sum()
    }

    pub fn clear(&self) {
        self.buckets.clear();
    }

    fn key(ctx: &QueryContext<'_>) -> (String, EntityType) {
        (ctx.table.to_string(), ctx.entity_type)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn default_table(&self, entity_type: EntityType) -> String {
        entity_type.name().to_string()
    }

    async fn get(&self, ctx: &QueryContext<'_>, id: &str) -> Result<Option<EntityRecord>, DataError> {
        if !self.capabilities.point_lookup {
            return Err(DataError::unsupported("get_by_id", ctx.entity_type, BackendKind::Memory));
        }
        Ok(self
            .buckets
            .get(&Self::key(ctx))
            .and_then(|bucket| bucket.get(id).cloned()))
    }

    async fn insert(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        let mut bucket = self.buckets.entry(Self::key(ctx)).or_default();
        if bucket.contains_key(&record.entity_id) {
            return Err(DataError::conflict(ctx.entity_type, &record.entity_id));
        }
        bucket.insert(record.entity_id.clone(), record.clone());
        Ok(())
    }

    async fn replace(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError> {
        let mut bucket = self
            .buckets
            .get_mut(&Self::key(ctx))
            .ok_or_else(|| DataError::not_found(ctx.entity_type, &record.entity_id))?;
        match bucket.get_mut(&record.entity_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(DataError::not_found(ctx.entity_type, &record.entity_id)),
        }
    }

    async fn remove(&self, ctx: &QueryContext<'_>, id: &str) -> Result<(), DataError> {
        let removed = self
            .buckets
            .get_mut(&Self::key(ctx))
            .and_then(|mut bucket| bucket.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(DataError::not_found(ctx.entity_type, id)),
        }
    }

    async fn execute(&self, ctx: &QueryContext<'_>, query: &BoundQuery) -> Result<DriverOutput, DataError> {
        let key = Self::key(ctx);
        match &query.action {
            QueryAction::Delete => {
                let Some(mut bucket) = self.buckets.get_mut(&key) else {
                    return Ok(DriverOutput::Affected(0));
                };
                let before = bucket.len();
                bucket.retain(|_, record| !query.matches(record));
                Ok(DriverOutput::Affected((before - bucket.len()) as u64))
            }
            QueryAction::Distinct(field) => {
                let values = match self.buckets.get(&key) {
                    Some(bucket) => distinct_values(bucket.values().filter(|r| query.matches(r)), field),
                    None => Vec::new(),
                };
                Ok(DriverOutput::Values(values))
            }
            QueryAction::Select => {
                let mut records: Vec<EntityRecord> = match self.buckets.get(&key) {
                    Some(bucket) => bucket.values().filter(|r| query.matches(r)).cloned().collect(),
                    None => Vec::new(),
                };
                if let Some((field, direction)) = &query.order_by {
                    sort_records(&mut records, field, *direction);
                }
                Ok(DriverOutput::Records(records))
            }
        }
    }
}
