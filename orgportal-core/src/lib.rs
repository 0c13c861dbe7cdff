//! Ambient runtime pieces shared by every orgportal crate: layered
//! configuration and tracing setup.

pub mod config;
pub mod logging;

pub use config::{
    validate_section, ConfigError, ConfigProperties, ConfigValidationError,
    ConfigValue, DefaultSecretResolver, FromConfigValue, MissingKeyError, PortalConfig,
    PropertyMeta, SecretResolver,
};
pub use logging::init_tracing;
