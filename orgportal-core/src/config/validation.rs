use super::typed::ConfigProperties;
use super::{ConfigError, PortalConfig};

/// A single missing or unusable config key.
#[derive(Debug)]
pub struct MissingKeyError {
    /// Section or component that requires this key.
    pub source: String,
    pub key: String,
    pub expected_type: String,
    /// Environment variable that would supply the key.
    pub env_hint: String,
    pub description: Option<String>,
}

impl std::fmt::Display for MissingKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "  - `{}`: key '{}' ({}), set env var `{}`",
            self.source, self.key, self.expected_type, self.env_hint
        )?;
        if let Some(desc) = &self.description {
            write!(f, " -- {desc}")?;
        }
        Ok(())
    }
}

/// Aggregated config validation error.
#[derive(Debug)]
pub struct ConfigValidationError {
    pub errors: Vec<MissingKeyError>,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Invalid configuration:")?;
        for err in &self.errors {
            writeln!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

fn env_hint(key: &str) -> String {
    key.to_uppercase().replace('.', "_")
}

/// Validate a [`ConfigProperties`] section.
///
/// Reports every missing required key. When nothing is missing, the section
/// is constructed once so that type mismatches and invalid values surface too.
pub fn validate_section<C: ConfigProperties>(config: &PortalConfig) -> Result<C, ConfigValidationError> {
    let prefix = C::prefix();
    let errors: Vec<MissingKeyError> = C::properties_metadata()
        .into_iter()
        .filter(|prop| prop.required && !config.contains_key(&prop.key))
        .map(|prop| MissingKeyError {
            source: prefix.to_string(),
            env_hint: prop.env_var(),
            expected_type: prop.type_name.to_string(),
            description: Some(prop.description.to_string()),
            key: prop.key,
        })
        .collect();

    if !errors.is_empty() {
        return Err(ConfigValidationError { errors });
    }

    C::from_config(config).map_err(|e| {
        let (key, expected_type, description) = match e {
            ConfigError::TypeMismatch { key, expected } => {
                (key, expected.to_string(), format!("type mismatch: expected {expected}"))
            }
            ConfigError::Invalid { key, message } => (key, "valid value".to_string(), message),
            ConfigError::NotFound(key) => (key, "unknown".to_string(), "missing".to_string()),
            ConfigError::Load(message) => (prefix.to_string(), "loadable".to_string(), message),
        };
        ConfigValidationError {
            errors: vec![MissingKeyError {
                source: prefix.to_string(),
                env_hint: env_hint(&key),
                key,
                expected_type,
                description: Some(description),
            }],
        }
    })
}
