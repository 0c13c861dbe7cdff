//! # orgportal-data-table — partitioned table backend for orgportal
//!
//! Persists each entity type to its own table of an Azure Table Storage
//! account, keyed by `(PartitionKey, RowKey)`:
//!
//! | Concept | Stored as |
//! |---------|-----------|
//! | entity type | table `{prefix}{TypeName}` and, by default, the partition key |
//! | entity id | `RowKey` |
//! | property | one entity property per non-null field |
//!
//! Equality predicates are sent to the service as an OData `$filter`;
//! null checks, ordering and distinct projections run on the returned
//! entities. [`MemoryTableClient`] stands in for the service in tests.

pub mod client;
pub mod codec;
pub mod compile;
pub mod driver;
pub mod filter;

pub use client::{HttpTableClient, MemoryTableClient, TableClient, TableError};
pub use compile::TableQuery;
pub use driver::{is_valid_table_name, TableDriver};
pub use filter::TableFilter;
