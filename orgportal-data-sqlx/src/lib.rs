//! # orgportal-data-sqlx — PostgreSQL backend for orgportal
//!
//! Stores every entity type in one document table:
//!
//! ```sql
//! CREATE TABLE entitymetadata (
//!     entitytype text  NOT NULL,
//!     entityid   text  NOT NULL,
//!     metadata   jsonb NOT NULL,
//!     PRIMARY KEY (entitytype, entityid)
//! );
//! ```
//!
//! Fixed queries compile to `metadata->>'field' = $n` predicates; see
//! [`compile`]. The table itself is not created here.
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead.

pub mod compile;
pub mod driver;
pub mod error;

pub use compile::{SqlOutput, SqlParam, SqlStatement, DEFAULT_TABLE};
pub use driver::PostgresDriver;
pub use error::{SqlxErrorExt, SqlxResult};
