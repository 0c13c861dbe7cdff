use super::{ConfigError, PortalConfig};

/// Metadata about a single configuration property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Absolute key (e.g., `"app.storage.backend"`).
    pub key: String,
    /// Rust type name (e.g., `"String"`).
    pub type_name: &'static str,
    /// Whether the property must be present.
    pub required: bool,
    /// Default value as a string, if any.
    pub default_value: Option<String>,
    pub description: &'static str,
}

impl PropertyMeta {
    pub fn required(key: impl Into<String>, type_name: &'static str, description: &'static str) -> Self {
        Self {
            key: key.into(),
            type_name,
            required: true,
            default_value: None,
            description,
        }
    }

    pub fn optional(key: impl Into<String>, type_name: &'static str, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(key, type_name, description)
        }
    }

    pub fn with_default(mut self, default: impl ToString) -> Self {
        self.required = false;
        self.default_value = Some(default.to_string());
        self
    }

    /// Environment variable that overrides this key.
    pub fn env_var(&self) -> String {
        self.key.to_uppercase().replace('.', "_")
    }
}

/// A strongly-typed configuration section.
///
/// ```ignore
/// impl ConfigProperties for PoolSettings {
///     fn prefix() -> &'static str { "app.pool" }
///     fn properties_metadata() -> Vec<PropertyMeta> {
///         vec![PropertyMeta::optional("app.pool.size", "u32", "pool size").with_default(10)]
///     }
///     fn from_config(config: &PortalConfig) -> Result<Self, ConfigError> {
///         Ok(Self { size: config.get_opt("app.pool.size")?.unwrap_or(10) })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"app.storage"`).
    fn prefix() -> &'static str;

    /// Metadata about all expected properties.
    fn properties_metadata() -> Vec<PropertyMeta>;

    /// Construct from a raw config.
    fn from_config(config: &PortalConfig) -> Result<Self, ConfigError>;
}
