//! # orgportal — entity-metadata storage for the governance portal
//!
//! One generic entity contract persisted to an interchangeable backend,
//! chosen by configuration:
//!
//! | `app.storage.backend` | Feature | Driver |
//! |-----------------------|---------|--------|
//! | `postgres` | `postgres` (default) | `orgportal-data-sqlx` |
//! | `table` | `table` (default) | `orgportal-data-table` |
//! | `memory` | – | `orgportal_data::MemoryDriver` |
//!
//! ```ignore
//! use orgportal::prelude::*;
//!
//! orgportal::init_tracing();
//! let config = PortalConfig::load("dev")?;
//! let storage = Storage::connect(&config).await?;
//! let teams = storage.teams.for_organization("acme").await?;
//! ```

pub mod settings;
pub mod storage;

pub use orgportal_core as core;
pub use orgportal_core::{init_tracing, PortalConfig};
pub use orgportal_data as data;
#[cfg(feature = "postgres")]
pub use orgportal_data_sqlx as data_sqlx;
#[cfg(feature = "table")]
pub use orgportal_data_table as data_table;
pub use orgportal_entities as entities;

pub use settings::{PostgresSettings, StorageSettings, TableSettings};
pub use storage::{open_driver, Storage};

pub mod prelude {
    //! Re-exports of the most commonly used types.
    pub use crate::settings::StorageSettings;
    pub use crate::storage::Storage;
    pub use orgportal_core::{ConfigProperties, PortalConfig};
    pub use orgportal_data::prelude::*;
    pub use orgportal_entities::prelude::*;
}
