mod error;
mod loader;
pub mod secrets;
pub mod typed;
pub mod validation;
pub mod value;

use std::collections::BTreeMap;
use std::path::Path;

pub use error::ConfigError;
pub use secrets::{DefaultSecretResolver, SecretResolver};
pub use typed::{ConfigProperties, PropertyMeta};
pub use validation::{validate_section, ConfigValidationError, MissingKeyError};
pub use value::{ConfigValue, FromConfigValue};

/// Environment variable that selects the active profile.
pub const PROFILE_ENV: &str = "PORTAL_PROFILE";

/// Flattened `dotted.key -> value` map. Ordered so that a prefix scan is a
/// range query.
pub(crate) type ConfigMap = BTreeMap<String, ConfigValue>;

/// Layered configuration. Later layers win:
///
/// 1. `application.yaml`
/// 2. `application-{profile}.yaml`
/// 3. process environment, after `.env` and `.env.{profile}` are loaded into
///    it without overwriting variables that are already set
///    (`APP_STORAGE_BACKEND` becomes `app.storage.backend`)
///
/// `${...}` placeholders in YAML strings are resolved through a
/// [`SecretResolver`]. The profile comes from `PORTAL_PROFILE` when set.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    values: ConfigMap,
    profile: String,
}

impl PortalConfig {
    /// Load `profile` from the working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile, &DefaultSecretResolver)
    }

    pub fn load_from(dir: &Path, profile: &str, resolver: &dyn SecretResolver) -> Result<Self, ConfigError> {
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = ConfigMap::new();
        for file in ["application.yaml".to_string(), format!("application-{profile}.yaml")] {
            loader::merge_yaml_file(&dir.join(file), &mut values)?;
        }
        for file in [".env".to_string(), format!(".env.{profile}")] {
            let path = dir.join(file);
            if path.exists() {
                dotenvy::from_path(&path).map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
            }
        }

        for value in values.values_mut() {
            if let ConfigValue::String(text) = value {
                if text.contains("${") {
                    *text = secrets::resolve_placeholders(text, resolver)?;
                }
            }
        }
        overlay_env(&mut values);

        tracing::debug!(profile = %profile, keys = values.len(), "configuration loaded");
        Ok(Self { values, profile })
    }

    /// Configuration from a YAML document alone, without files or environment.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = ConfigMap::new();
        loader::merge_yaml_str(yaml, &mut values)?;
        Ok(Self {
            values,
            profile: profile.to_string(),
        })
    }

    /// Read `key` as `V`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the key is absent, `TypeMismatch` when it cannot be
    /// read as `V`.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        self.get_opt(key)?
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }

    /// Like [`get`](Self::get), but an absent key is `Ok(None)`.
    pub fn get_opt<V: FromConfigValue>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        self.values
            .get(key)
            .map(|value| V::from_config_value(value, key))
            .transpose()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The scalar keys directly below `prefix`, read as `V`, in key order.
    ///
    /// On `app.storage.tables.teamsnapshot: teamcache`,
    /// `entries::<String>("app.storage.tables")` yields
    /// `("teamsnapshot", "teamcache")`.
    pub fn entries<V: FromConfigValue>(&self, prefix: &str) -> Result<Vec<(String, V)>, ConfigError> {
        let dotted = format!("{prefix}.");
        self.values
            .range(dotted.clone()..)
            .map_while(|(key, value)| Some((key.strip_prefix(&dotted)?, key, value)))
            .filter(|(name, _, _)| !name.contains('.'))
            .map(|(name, key, value)| V::from_config_value(value, key).map(|v| (name.to_string(), v)))
            .collect()
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

fn overlay_env(values: &mut ConfigMap) {
    for (name, value) in std::env::vars() {
        values.insert(name.to_lowercase().replace('_', "."), ConfigValue::String(value));
    }
}
