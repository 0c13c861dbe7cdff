use async_trait::async_trait;

use crate::entity::EntityType;
use crate::error::DataError;
use crate::mapping::BackendKind;
use crate::query::{BoundQuery, DriverOutput, QueryAction, QueryContext, QueryTemplate};
use crate::record::EntityRecord;

/// Operations a backend can perform natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub point_lookup: bool,
    pub delete_by_query: bool,
    pub distinct: bool,
    pub ordering: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        point_lookup: true,
        delete_by_query: true,
        distinct: true,
        ordering: true,
    };

    /// A backend that can only enumerate and filter.
    pub const SCAN_ONLY: Capabilities = Capabilities {
        point_lookup: false,
        delete_by_query: true,
        distinct: true,
        ordering: true,
    };

    pub fn supports(&self, template: &QueryTemplate) -> bool {
        let action = match template.action {
            QueryAction::Select => true,
            QueryAction::Delete => self.delete_by_query,
            QueryAction::Distinct(_) => self.distinct,
        };
        action && (template.order_by.is_none() || self.ordering)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::FULL
    }
}

/// Translates generic record operations into one physical store.
///
/// Drivers own their connection pooling and are shared by every provider
/// behind an `Arc<dyn StorageDriver>`.
#[async_trait]
pub trait StorageDriver: Send + Sync + 'static {
    fn backend(&self) -> BackendKind;

    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    /// Table used for `entity_type` when neither configuration nor the
    /// registration names one.
    fn default_table(&self, entity_type: EntityType) -> String;

    /// Reject a resolved table name the backend cannot use. Called once per
    /// entity type when its store is initialized.
    fn validate_table(&self, entity_type: EntityType, table: &str) -> Result<(), DataError> {
        let backend = self.backend();
        if backend.accepts_table_name(table) {
            Ok(())
        } else {
            Err(DataError::Configuration(format!(
                "{entity_type}: '{table}' is not a valid {backend} table name"
            )))
        }
    }

    async fn get(&self, ctx: &QueryContext<'_>, id: &str) -> Result<Option<EntityRecord>, DataError>;

    /// Store a new record. Fails with `Conflict` if the id is taken.
    async fn insert(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError>;

    /// Overwrite an existing record. Fails with `NotFound` if absent.
    async fn replace(&self, ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<(), DataError>;

    /// Fails with `NotFound` if absent.
    async fn remove(&self, ctx: &QueryContext<'_>, id: &str) -> Result<(), DataError>;

    async fn execute(&self, ctx: &QueryContext<'_>, query: &BoundQuery) -> Result<DriverOutput, DataError>;
}
