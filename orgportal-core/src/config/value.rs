use std::borrow::Cow;
use std::fmt;

use super::ConfigError;

/// A flattened configuration leaf. Maps never appear here: the loader turns
/// them into dotted keys.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub(crate) fn from_yaml(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::String(n.to_string())),
            Value::String(s) => Self::String(s.clone()),
            Value::Sequence(items) => Self::List(items.iter().map(Self::from_yaml).collect()),
            Value::Mapping(_) | Value::Tagged(_) => Self::String(format!("{value:?}")),
        }
    }

    /// Text form of a scalar. Environment variables always arrive as text, so
    /// conversions parse from here when the value is not already typed.
    fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s.trim())),
            Self::Integer(i) => Some(Cow::Owned(i.to_string())),
            Self::Float(x) => Some(Cow::Owned(x.to_string())),
            Self::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Self::Null | Self::List(_) => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            scalar => f.write_str(&scalar.text().unwrap_or_default()),
        }
    }
}

/// Types a configuration value can be read as.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be read from configuration",
    label = "not a config value type",
    note = "supported: String, bool, the integer types, Option<T> and Vec<T>"
)]
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::String(s) => Ok(s.clone()),
            other => other.text().map(Cow::into_owned).ok_or_else(|| mismatch(key, "string")),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        let text = value.text().ok_or_else(|| mismatch(key, "bool"))?;
        match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(mismatch(key, "bool")),
        }
    }
}

/// Integers parse from text, so `"5"` from the environment and `5` from YAML
/// read the same; out-of-range values are mismatches.
macro_rules! integer_config_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromConfigValue for $ty {
                fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
                    let parsed = match value {
                        ConfigValue::Integer(i) => <$ty>::try_from(*i).ok(),
                        other => other.text().and_then(|t| t.parse().ok()),
                    };
                    parsed.ok_or_else(|| mismatch(key, stringify!($ty)))
                }
            }
        )+
    };
}

integer_config_value!(i32, i64, u16, u32, u64, usize);

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        if *value == ConfigValue::Null {
            Ok(None)
        } else {
            T::from_config_value(value, key).map(Some)
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        let items: Vec<ConfigValue> = match value {
            ConfigValue::List(items) => items.clone(),
            // "a, b,,c" from an environment variable
            ConfigValue::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| ConfigValue::String(part.to_string()))
                .collect(),
            other => vec![other.clone()],
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_config_value(item, &format!("{key}.{i}")))
            .collect()
    }
}
