use std::collections::HashMap;
use std::str::FromStr;

use orgportal_core::{ConfigError, ConfigProperties, PortalConfig, PropertyMeta};
use orgportal_data::{BackendKind, EntityType};

const PREFIX: &str = "app.storage";
const TABLES: &str = "app.storage.tables";

pub const DEFAULT_CONNECTIONS: u32 = 10;
pub const DEFAULT_METADATA_TABLE: &str = "entitymetadata";

#[derive(Debug, Clone, PartialEq)]
pub struct PostgresSettings {
    pub url: String,
    pub connections: u32,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSettings {
    pub endpoint: String,
    pub sas: String,
    pub prefix: String,
}

/// The `app.storage` section: which backend to use and how to reach it.
///
/// ```yaml
/// app:
///   storage:
///     backend: postgres
///     postgres:
///       url: ${DATABASE_URL}
///     tables:
///       auditrecord: auditlog
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub backend: BackendKind,
    pub postgres: Option<PostgresSettings>,
    pub table: Option<TableSettings>,
    /// Per-entity table overrides keyed by lowercase entity type name.
    pub tables: HashMap<String, String>,
}

impl StorageSettings {
    /// Settings for the in-memory backend, without overrides.
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            postgres: None,
            table: None,
            tables: HashMap::new(),
        }
    }

    /// The configured table override for `entity_type`, if any.
    pub fn table_for(&self, entity_type: EntityType) -> Option<&str> {
        self.tables
            .get(&entity_type.name().to_lowercase())
            .map(String::as_str)
    }

    fn key(name: &str) -> String {
        format!("{PREFIX}.{name}")
    }

    fn postgres_from(config: &PortalConfig) -> Result<PostgresSettings, ConfigError> {
        Ok(PostgresSettings {
            url: config.get(&Self::key("postgres.url"))?,
            connections: config
                .get_opt(&Self::key("postgres.connections"))?
                .unwrap_or(DEFAULT_CONNECTIONS),
            table: config
                .get_opt(&Self::key("postgres.table"))?
                .unwrap_or_else(|| DEFAULT_METADATA_TABLE.to_string()),
        })
    }

    fn table_from(config: &PortalConfig) -> Result<TableSettings, ConfigError> {
        let endpoint = match config.get_opt::<String>(&Self::key("table.endpoint"))? {
            Some(endpoint) => endpoint,
            None => {
                let account: String = config.get(&Self::key("table.account"))?;
                format!("https://{account}.table.core.windows.net")
            }
        };
        Ok(TableSettings {
            endpoint,
            sas: config.get(&Self::key("table.sas"))?,
            prefix: config.get_opt(&Self::key("table.prefix"))?.unwrap_or_default(),
        })
    }
}

impl ConfigProperties for StorageSettings {
    fn prefix() -> &'static str {
        PREFIX
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::required(Self::key("backend"), "String", "postgres, table or memory"),
            PropertyMeta::optional(Self::key("postgres.url"), "String", "connection string (postgres backend)"),
            PropertyMeta::optional(Self::key("postgres.connections"), "u32", "max pool connections")
                .with_default(DEFAULT_CONNECTIONS),
            PropertyMeta::optional(Self::key("postgres.table"), "String", "shared metadata table")
                .with_default(DEFAULT_METADATA_TABLE),
            PropertyMeta::optional(Self::key("table.endpoint"), "String", "table service base URL"),
            PropertyMeta::optional(Self::key("table.account"), "String", "storage account (table backend)"),
            PropertyMeta::optional(Self::key("table.sas"), "String", "shared access signature (table backend)"),
            PropertyMeta::optional(Self::key("table.prefix"), "String", "table name prefix").with_default(""),
        ]
    }

    fn from_config(config: &PortalConfig) -> Result<Self, ConfigError> {
        let key = Self::key("backend");
        let name: String = config.get(&key)?;
        let backend = BackendKind::from_str(&name).map_err(|e| ConfigError::Invalid {
            key: key.clone(),
            message: e.to_string(),
        })?;

        let (postgres, table) = match backend {
            BackendKind::Postgres => (Some(Self::postgres_from(config)?), None),
            BackendKind::Table => (None, Some(Self::table_from(config)?)),
            BackendKind::Memory => (None, None),
        };

        let tables = config
            .entries::<String>(TABLES)?
            .into_iter()
            .map(|(entity, table)| (entity.to_lowercase(), table))
            .collect();

        Ok(Self {
            backend,
            postgres,
            table,
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_derives_endpoint() {
        let config = PortalConfig::from_yaml_str(
            "app:\n  storage:\n    backend: table\n    table:\n      account: portaldata\n      sas: sv=1\n",
            "test",
        )
        .unwrap();
        let settings = StorageSettings::from_config(&config).unwrap();
        let table = settings.table.unwrap();
        assert_eq!(table.endpoint, "https://portaldata.table.core.windows.net");
        assert_eq!(table.prefix, "");
    }

    #[test]
    fn overrides_match_case_insensitively() {
        let mut settings = StorageSettings::memory();
        settings.tables.insert("auditrecord".into(), "auditlog".into());
        assert_eq!(settings.table_for(EntityType::new("AuditRecord")), Some("auditlog"));
        assert_eq!(settings.table_for(EntityType::new("Annotation")), None);
    }

    #[test]
    fn table_overrides_come_from_direct_children() {
        let config = PortalConfig::from_yaml_str(
            "app:\n  storage:\n    backend: memory\n    tables:\n      AuditRecord: auditlog\n      team:\n        name: ignored\n",
            "test",
        )
        .unwrap();
        let settings = StorageSettings::from_config(&config).unwrap();
        assert_eq!(settings.tables.len(), 1);
        assert_eq!(settings.table_for(EntityType::new("AuditRecord")), Some("auditlog"));
    }
}
