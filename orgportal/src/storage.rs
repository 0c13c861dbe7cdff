use std::sync::Arc;

use orgportal_core::{validate_section, PortalConfig};
use orgportal_data::{BackendKind, DataError, Entity, MappingRegistry, MemoryDriver, RegistryBuilder, StorageDriver};
use orgportal_entities::prelude::*;

use crate::settings::StorageSettings;

/// Every portal provider, wired to one backend.
///
/// Built once at startup and shared; providers are cheap to clone.
#[derive(Debug, Clone)]
pub struct Storage {
    backend: BackendKind,
    registry: Arc<MappingRegistry>,
    pub teams: TeamSnapshotProvider,
    pub repositories: RepositorySnapshotProvider,
    pub collaborators: CollaboratorSnapshotProvider,
    pub team_permissions: TeamPermissionSnapshotProvider,
    pub annotations: AnnotationProvider,
    pub audit: AuditRecordProvider,
    pub user_settings: UserSettingsProvider,
}

fn config_error(err: impl std::fmt::Display) -> DataError {
    DataError::Configuration(err.to_string())
}

fn init<P: EntityProvider>(
    registry: &MappingRegistry,
    driver: &Arc<dyn StorageDriver>,
    settings: &StorageSettings,
) -> Result<P, DataError> {
    let table = settings.table_for(<P::Entity as Entity>::ENTITY_TYPE);
    P::initialize(registry, driver.clone(), table)
}

impl Storage {
    /// Read the `app.storage` section, open the configured backend and
    /// initialize every provider.
    pub async fn connect(config: &PortalConfig) -> Result<Self, DataError> {
        let settings: StorageSettings = validate_section(config).map_err(config_error)?;
        let driver = open_driver(&settings).await?;
        Self::with_driver(driver, &settings)
    }

    /// In-memory storage with default tables.
    pub fn in_memory() -> Result<Self, DataError> {
        Self::with_driver(Arc::new(MemoryDriver::new()), &StorageSettings::memory())
    }

    /// Seal the entity registry and initialize every provider on `driver`.
    /// Table overrides are taken from `settings`.
    pub fn with_driver(driver: Arc<dyn StorageDriver>, settings: &StorageSettings) -> Result<Self, DataError> {
        let mut builder = RegistryBuilder::new();
        register_entities(&mut builder)?;
        let registry = builder.seal()?;

        let storage = Self {
            backend: driver.backend(),
            teams: init(&registry, &driver, settings)?,
            repositories: init(&registry, &driver, settings)?,
            collaborators: init(&registry, &driver, settings)?,
            team_permissions: init(&registry, &driver, settings)?,
            annotations: init(&registry, &driver, settings)?,
            audit: init(&registry, &driver, settings)?,
            user_settings: init(&registry, &driver, settings)?,
            registry,
        };
        tracing::info!(
            backend = %storage.backend,
            entity_types = storage.registry.len(),
            "entity storage ready"
        );
        Ok(storage)
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }
}

/// Build the driver selected by `settings.backend`.
pub async fn open_driver(settings: &StorageSettings) -> Result<Arc<dyn StorageDriver>, DataError> {
    match settings.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryDriver::new())),
        BackendKind::Postgres => open_postgres(settings).await,
        BackendKind::Table => open_table(settings),
    }
}

fn missing_section(backend: BackendKind) -> DataError {
    DataError::Configuration(format!("app.storage.{backend} is not configured"))
}

#[cfg(feature = "postgres")]
async fn open_postgres(settings: &StorageSettings) -> Result<Arc<dyn StorageDriver>, DataError> {
    let postgres = settings
        .postgres
        .as_ref()
        .ok_or_else(|| missing_section(BackendKind::Postgres))?;
    let driver = orgportal_data_sqlx::PostgresDriver::connect(&postgres.url, postgres.connections, &postgres.table).await?;
    Ok(Arc::new(driver))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_settings: &StorageSettings) -> Result<Arc<dyn StorageDriver>, DataError> {
    Err(DataError::Configuration(
        "the postgres backend requires the `postgres` feature".into(),
    ))
}

#[cfg(feature = "table")]
fn open_table(settings: &StorageSettings) -> Result<Arc<dyn StorageDriver>, DataError> {
    let table = settings
        .table
        .as_ref()
        .ok_or_else(|| missing_section(BackendKind::Table))?;
    let driver = orgportal_data_table::TableDriver::connect(&table.endpoint, &table.sas, table.prefix.clone())?;
    Ok(Arc::new(driver))
}

#[cfg(not(feature = "table"))]
fn open_table(_settings: &StorageSettings) -> Result<Arc<dyn StorageDriver>, DataError> {
    Err(DataError::Configuration(
        "the table backend requires the `table` feature".into(),
    ))
}
