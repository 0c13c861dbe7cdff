use orgportal_data::{DataError, EntityType};

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Use `.into_data_error()`, or `.into_write_error(..)` on inserts
/// so a primary-key clash surfaces as `Conflict`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;

    fn into_write_error(self, entity_type: EntityType, id: &str) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        DataError::backend(self)
    }

    fn into_write_error(self, entity_type: EntityType, id: &str) -> DataError {
        match &self {
            sqlx::Error::Database(db) if db.is_unique_violation() => DataError::conflict(entity_type, id),
            _ => DataError::backend(self),
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;
