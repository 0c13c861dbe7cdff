use std::fmt;

/// Failure to read or interpret a configuration key.
#[derive(Debug)]
pub enum ConfigError {
    /// No value under this key.
    NotFound(String),
    /// A value exists but has the wrong shape.
    TypeMismatch { key: String, expected: &'static str },
    /// A YAML file, `.env` file or secret could not be read.
    Load(String),
    /// The value has the right shape but is not an accepted choice.
    Invalid { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "missing configuration key '{key}'"),
            Self::TypeMismatch { key, expected } => write!(f, "'{key}' is not a valid {expected}"),
            Self::Load(reason) => write!(f, "cannot load configuration: {reason}"),
            Self::Invalid { key, message } => write!(f, "'{key}': {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}
