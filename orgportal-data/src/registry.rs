use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::entity::{Entity, EntityType};
use crate::error::DataError;
use crate::mapping::{is_valid_identifier, BackendKind, FieldMapping, FieldTransform};
use crate::query::{QueryKind, QueryTemplate};

/// Instantiation factory stored per entity type.
pub type Factory = fn() -> Box<dyn Any + Send>;

fn instantiate<T: Entity>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}

// ── Problems & errors ───────────────────────────────────────────────────────

/// One thing wrong with a registration, found while sealing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingProblem {
    /// A declared property (or the id property) has no backend field.
    MissingField {
        entity_type: EntityType,
        backend: BackendKind,
        property: String,
    },
    /// Two properties map to the same backend field.
    DuplicateField {
        entity_type: EntityType,
        backend: BackendKind,
        field: String,
        properties: (String, String),
    },
    /// A property maps onto a field the backend keeps for itself.
    ReservedField {
        entity_type: EntityType,
        backend: BackendKind,
        field: String,
    },
    /// A field or table name that cannot be embedded in query text.
    InvalidIdentifier {
        entity_type: EntityType,
        backend: BackendKind,
        name: String,
    },
    /// A mapping override or query template names a property the entity
    /// does not declare.
    UnknownProperty {
        entity_type: EntityType,
        context: String,
        property: String,
    },
}

impl fmt::Display for MappingProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingProblem::MissingField {
                entity_type,
                backend,
                property,
            } => write!(f, "{entity_type}: property '{property}' has no {backend} field"),
            MappingProblem::DuplicateField {
                entity_type,
                backend,
                field,
                properties,
            } => write!(
                f,
                "{entity_type}: properties '{}' and '{}' both map to {backend} field '{field}'",
                properties.0, properties.1
            ),
            MappingProblem::ReservedField {
                entity_type,
                backend,
                field,
            } => write!(f, "{entity_type}: field '{field}' is reserved by the {backend} backend"),
            MappingProblem::InvalidIdentifier {
                entity_type,
                backend,
                name,
            } => write!(f, "{entity_type}: '{name}' is not a valid {backend} identifier"),
            MappingProblem::UnknownProperty {
                entity_type,
                context,
                property,
            } => write!(f, "{entity_type}: {context} references undeclared property '{property}'"),
        }
    }
}

/// Errors raised while building or reading the mapping registry.
#[derive(Debug)]
pub enum RegistryError {
    /// The same entity type name was registered twice.
    DuplicateEntityType(EntityType),
    /// No registration exists for this entity type.
    UnknownEntityType(EntityType),
    /// The registration belongs to a different Rust type.
    TypeMismatch {
        entity_type: EntityType,
        registered: &'static str,
        requested: &'static str,
    },
    /// Sealing found one or more mapping problems.
    Invalid(Vec<MappingProblem>),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateEntityType(entity_type) => {
                write!(f, "Entity type '{entity_type}' registered twice")
            }
            RegistryError::UnknownEntityType(entity_type) => {
                write!(f, "Entity type '{entity_type}' is not registered")
            }
            RegistryError::TypeMismatch {
                entity_type,
                registered,
                requested,
            } => write!(
                f,
                "Entity type '{entity_type}' is registered for `{registered}`, not `{requested}`"
            ),
            RegistryError::Invalid(problems) => {
                writeln!(f, "Invalid entity mappings ({} problem(s)):", problems.len())?;
                for problem in problems {
                    writeln!(f, "  - {problem}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<RegistryError> for DataError {
    fn from(err: RegistryError) -> Self {
        DataError::Configuration(err.to_string())
    }
}

// ── Registration ────────────────────────────────────────────────────────────

/// Everything known about one entity type: identity, factory, per-backend
/// mappings and tables, and its closed set of fixed queries.
#[derive(Clone)]
pub struct EntityRegistration {
    entity_type: EntityType,
    type_id: TypeId,
    type_name: &'static str,
    id_property: &'static str,
    fields: &'static [&'static str],
    factory: Factory,
    mappings: HashMap<BackendKind, FieldMapping>,
    tables: HashMap<BackendKind, String>,
    partition_key: Option<String>,
    type_value: Option<String>,
    queries: BTreeMap<QueryKind, QueryTemplate>,
}

impl fmt::Debug for EntityRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistration")
            .field("entity_type", &self.entity_type)
            .field("type_name", &self.type_name)
            .field("id_property", &self.id_property)
            .field("fields", &self.fields)
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EntityRegistration {
    fn new<T: Entity>() -> Self {
        let properties = || std::iter::once(T::ID_PROPERTY).chain(T::FIELDS.iter().copied());
        let mappings = BackendKind::ALL
            .iter()
            .map(|backend| (*backend, FieldMapping::derive(properties(), FieldTransform::Lowercase)))
            .collect();
        Self {
            entity_type: T::ENTITY_TYPE,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            id_property: T::ID_PROPERTY,
            fields: T::FIELDS,
            factory: instantiate::<T>,
            mappings,
            tables: HashMap::new(),
            partition_key: None,
            type_value: None,
            queries: BTreeMap::new(),
        }
    }

    /// Re-derive the whole mapping for `backend`, dropping earlier overrides.
    pub fn backend_mapping(&mut self, backend: BackendKind, transform: FieldTransform) -> &mut Self {
        let properties = std::iter::once(self.id_property).chain(self.fields.iter().copied());
        self.mappings
            .insert(backend, FieldMapping::derive(properties, transform));
        self
    }

    pub fn override_field(
        &mut self,
        backend: BackendKind,
        property: &str,
        field: impl Into<String>,
    ) -> &mut Self {
        self.mappings
            .entry(backend)
            .or_default()
            .set(property, field);
        self
    }

    /// Default table (or container) for this entity type on `backend`.
    pub fn table(&mut self, backend: BackendKind, name: impl Into<String>) -> &mut Self {
        self.tables.insert(backend, name.into());
        self
    }

    pub fn partition_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn type_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.type_value = Some(value.into());
        self
    }

    /// Declare support for a fixed query.
    pub fn query(&mut self, kind: QueryKind, template: QueryTemplate) -> &mut Self {
        self.queries.insert(kind, template);
        self
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn id_property(&self) -> &'static str {
        self.id_property
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn factory(&self) -> Factory {
        self.factory
    }

    pub fn is_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn mapping(&self, backend: BackendKind) -> Option<&FieldMapping> {
        self.mappings.get(&backend)
    }

    pub fn table_for(&self, backend: BackendKind) -> Option<&str> {
        self.tables.get(&backend).map(String::as_str)
    }

    /// Partition key on the table backend; the entity type name by default.
    pub fn partition_key_value(&self) -> &str {
        self.partition_key
            .as_deref()
            .unwrap_or(self.entity_type.name())
    }

    /// Relational type discriminator; the entity type name by default.
    pub fn type_discriminator(&self) -> &str {
        self.type_value.as_deref().unwrap_or(self.entity_type.name())
    }

    pub fn queries(&self) -> &BTreeMap<QueryKind, QueryTemplate> {
        &self.queries
    }

    pub fn query_template(&self, kind: QueryKind) -> Option<&QueryTemplate> {
        self.queries.get(&kind)
    }

    fn problems(&self) -> Vec<MappingProblem> {
        let mut problems = Vec::new();
        for backend in BackendKind::ALL {
            match self.mappings.get(&backend) {
                Some(mapping) => problems.extend(validate_mapping(
                    self.entity_type,
                    backend,
                    mapping,
                    self.fields,
                    self.id_property,
                )),
                None => problems.push(MappingProblem::MissingField {
                    entity_type: self.entity_type,
                    backend,
                    property: self.id_property.to_string(),
                }),
            }
            if let Some(table) = self.tables.get(&backend) {
                if !backend.accepts_table_name(table) {
                    problems.push(MappingProblem::InvalidIdentifier {
                        entity_type: self.entity_type,
                        backend,
                        name: table.clone(),
                    });
                }
            }
        }

        for (kind, template) in &self.queries {
            for property in template.properties() {
                if property != self.id_property && !self.fields.contains(&property) {
                    problems.push(MappingProblem::UnknownProperty {
                        entity_type: self.entity_type,
                        context: format!("query {kind}"),
                        property: property.to_string(),
                    });
                }
            }
        }
        problems
    }
}

/// Check one entity's mapping for one backend.
///
/// Returns every problem found; an empty list means the mapping is
/// complete and usable.
pub fn validate_mapping(
    entity_type: EntityType,
    backend: BackendKind,
    mapping: &FieldMapping,
    fields: &[&str],
    id_property: &str,
) -> Vec<MappingProblem> {
    let mut problems = Vec::new();
    let declared = || std::iter::once(id_property).chain(fields.iter().copied());

    for property in declared() {
        if mapping.field(property).is_none() {
            problems.push(MappingProblem::MissingField {
                entity_type,
                backend,
                property: property.to_string(),
            });
        }
    }

    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (property, field) in mapping.iter() {
        if !declared().any(|p| p == property) {
            problems.push(MappingProblem::UnknownProperty {
                entity_type,
                context: format!("{backend} mapping"),
                property: property.to_string(),
            });
        }
        if let Some(previous) = seen.insert(field, property) {
            problems.push(MappingProblem::DuplicateField {
                entity_type,
                backend,
                field: field.to_string(),
                properties: (previous.to_string(), property.to_string()),
            });
        }
        if backend
            .reserved_fields()
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(field))
        {
            problems.push(MappingProblem::ReservedField {
                entity_type,
                backend,
                field: field.to_string(),
            });
        }
        if backend.requires_identifiers() && !is_valid_identifier(field) {
            problems.push(MappingProblem::InvalidIdentifier {
                entity_type,
                backend,
                name: field.to_string(),
            });
        }
    }
    problems
}

// ── Builder & sealed registry ───────────────────────────────────────────────

/// Collects entity registrations during startup.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<EntityRegistration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`, deriving lowercase mappings for every backend.
    pub fn register<T: Entity>(&mut self) -> Result<&mut EntityRegistration, RegistryError> {
        if self.entries.iter().any(|e| e.entity_type == T::ENTITY_TYPE) {
            return Err(RegistryError::DuplicateEntityType(T::ENTITY_TYPE));
        }
        self.entries.push(EntityRegistration::new::<T>());
        let index = self.entries.len() - 1;
        Ok(&mut self.entries[index])
    }

    /// Registration already added for `entity_type`, for further tweaks.
    pub fn registration_mut(&mut self, entity_type: EntityType) -> Option<&mut EntityRegistration> {
        self.entries.iter_mut().find(|e| e.entity_type == entity_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate everything and freeze the registry.
    pub fn seal(self) -> Result<Arc<MappingRegistry>, RegistryError> {
        let registry = MappingRegistry {
            entries: self
                .entries
                .into_iter()
                .map(|e| (e.entity_type, e))
                .collect(),
        };
        registry.validate_mappings()?;
        tracing::debug!(entity_types = registry.entries.len(), "mapping registry sealed");
        Ok(Arc::new(registry))
    }
}

/// Immutable registry shared by every provider.
#[derive(Debug)]
pub struct MappingRegistry {
    entries: HashMap<EntityType, EntityRegistration>,
}

impl MappingRegistry {
    pub fn get(&self, entity_type: EntityType) -> Result<&EntityRegistration, RegistryError> {
        self.entries
            .get(&entity_type)
            .ok_or(RegistryError::UnknownEntityType(entity_type))
    }

    /// The registration for `T`, checking it was made for this very type.
    pub fn lookup<T: Entity>(&self) -> Result<&EntityRegistration, RegistryError> {
        let registration = self.get(T::ENTITY_TYPE)?;
        if !registration.is_type::<T>() {
            return Err(RegistryError::TypeMismatch {
                entity_type: T::ENTITY_TYPE,
                registered: registration.type_name,
                requested: type_name::<T>(),
            });
        }
        Ok(registration)
    }

    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.entries.contains_key(&entity_type)
    }

    /// Registered entity types, sorted by name.
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self.entries.keys().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every registration against every backend, aggregating all
    /// problems into one error.
    pub fn validate_mappings(&self) -> Result<(), RegistryError> {
        let mut registrations: Vec<&EntityRegistration> = self.entries.values().collect();
        registrations.sort_by_key(|e| e.entity_type);
        let problems: Vec<MappingProblem> =
            registrations.iter().flat_map(|e| e.problems()).collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Invalid(problems))
        }
    }
}
