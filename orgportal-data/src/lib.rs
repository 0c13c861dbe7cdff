pub mod driver;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod memory;
pub mod query;
pub mod record;
pub mod registry;
pub mod store;
pub mod value;

pub use driver::{Capabilities, StorageDriver};
pub use entity::{Entity, EntityType};
pub use error::DataError;
pub use mapping::{is_valid_identifier, BackendKind, FieldMapping, FieldTransform, UnknownBackend};
pub use memory::MemoryDriver;
pub use query::{
    BoundQuery, Direction, DriverOutput, FixedQuery, Param, Predicate, QueryAction, QueryContext,
    QueryKind, QueryTemplate,
};
pub use record::EntityRecord;
pub use registry::{
    validate_mapping, EntityRegistration, MappingProblem, MappingRegistry, RegistryBuilder,
    RegistryError,
};
pub use store::{EntityStore, QueryOutcome};
pub use value::{format_date, FieldError, FieldValue, FromFieldValue, IntoFieldValue};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        entity_fields, BackendKind, DataError, Direction, Entity, EntityStore, EntityType,
        FieldValue, FixedQuery, Param, QueryKind, QueryTemplate, RegistryBuilder, StorageDriver,
    };
}
