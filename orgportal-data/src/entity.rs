use std::fmt;

use crate::value::{FieldError, FieldValue};

/// Identity token for one kind of persisted entity.
///
/// Declared once per entity kind as an associated constant and compared by
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(&'static str);

impl EntityType {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A domain object persisted through the entity-metadata engine.
///
/// The field list is declared statically; the store copies exactly these
/// properties through the active backend mapping. `Default` is the
/// instantiation factory used on reads.
///
/// Implement the field accessors with [`entity_fields!`](crate::entity_fields):
///
/// ```ignore
/// impl Entity for TeamSnapshot {
///     const ENTITY_TYPE: EntityType = EntityType::new("TeamSnapshot");
///
///     entity_fields! {
///         id: "teamId" => team_id;
///         "organizationId" => organization_id,
///         "name" => name,
///     }
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;
    /// Property holding the entity id. Not part of [`FIELDS`](Self::FIELDS).
    const ID_PROPERTY: &'static str;
    const FIELDS: &'static [&'static str];

    /// The id, or `None` while it has not been assigned yet.
    fn entity_id(&self) -> Option<&str>;
    fn set_entity_id(&mut self, id: String);

    /// Current value of a declared property; `None` for undeclared names.
    fn field(&self, property: &str) -> Option<FieldValue>;
    fn set_field(&mut self, property: &str, value: &FieldValue) -> Result<(), FieldError>;
}

/// Generates the [`Entity`] field list and accessors from a
/// `"property" => struct_field` table.
///
/// The id field must be a `String`; an empty string means "not assigned".
/// Every other field needs `IntoFieldValue + FromFieldValue`.
#[macro_export]
macro_rules! entity_fields {
    (
        id: $id_prop:literal => $id_field:ident;
        $( $prop:literal => $field:ident ),+ $(,)?
    ) => {
        const ID_PROPERTY: &'static str = $id_prop;
        const FIELDS: &'static [&'static str] = &[$($prop),+];

        fn entity_id(&self) -> ::std::option::Option<&str> {
            if self.$id_field.is_empty() {
                None
            } else {
                Some(self.$id_field.as_str())
            }
        }

        fn set_entity_id(&mut self, id: ::std::string::String) {
            self.$id_field = id;
        }

        fn field(&self, property: &str) -> ::std::option::Option<$crate::FieldValue> {
            match property {
                $( $prop => Some($crate::IntoFieldValue::to_field_value(&self.$field)), )+
                _ => None,
            }
        }

        fn set_field(
            &mut self,
            property: &str,
            value: &$crate::FieldValue,
        ) -> ::std::result::Result<(), $crate::FieldError> {
            match property {
                $(
                    $prop => {
                        self.$field = $crate::FromFieldValue::from_field_value(value)?;
                        Ok(())
                    }
                )+
                other => Err($crate::FieldError::UnknownProperty(other.to_string())),
            }
        }
    };
}
