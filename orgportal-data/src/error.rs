use crate::entity::EntityType;
use crate::mapping::BackendKind;

/// Errors surfaced by stores and drivers.
#[derive(Debug)]
pub enum DataError {
    /// No record with this id exists.
    NotFound { entity_type: EntityType, id: String },
    /// A record with this id already exists.
    Conflict { entity_type: EntityType, id: String },
    /// The operation is not implemented for this entity type on this backend.
    Unsupported {
        operation: String,
        entity_type: EntityType,
        backend: BackendKind,
    },
    /// Incomplete or inconsistent setup; only expected during startup.
    Configuration(String),
    /// A stored value could not be converted into the domain type.
    Serialization {
        entity_type: EntityType,
        property: String,
        message: String,
    },
    /// Connectivity, timeout or driver failure, passed through unchanged.
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// Wrap a driver-specific error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Backend(Box::new(err))
    }

    pub fn not_found(entity_type: EntityType, id: impl Into<String>) -> Self {
        DataError::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn conflict(entity_type: EntityType, id: impl Into<String>) -> Self {
        DataError::Conflict {
            entity_type,
            id: id.into(),
        }
    }

    pub fn unsupported(
        operation: impl Into<String>,
        entity_type: EntityType,
        backend: BackendKind,
    ) -> Self {
        DataError::Unsupported {
            operation: operation.into(),
            entity_type,
            backend,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DataError::Conflict { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, DataError::Unsupported { .. })
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound { entity_type, id } => {
                write!(f, "{entity_type} '{id}' not found")
            }
            DataError::Conflict { entity_type, id } => {
                write!(f, "{entity_type} '{id}' already exists")
            }
            DataError::Unsupported {
                operation,
                entity_type,
                backend,
            } => write!(
                f,
                "operation '{operation}' is not supported for {entity_type} on the {backend} backend"
            ),
            DataError::Configuration(msg) => write!(f, "Storage configuration error: {msg}"),
            DataError::Serialization {
                entity_type,
                property,
                message,
            } => write!(f, "Cannot map {entity_type}.{property}: {message}"),
            DataError::Backend(err) => write!(f, "Storage backend error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
