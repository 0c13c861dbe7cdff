use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::driver::{Capabilities, StorageDriver};
use crate::entity::{Entity, EntityType};
use crate::error::DataError;
use crate::mapping::{BackendKind, FieldMapping};
use crate::query::{DriverOutput, FixedQuery, QueryAction, QueryContext, QueryKind, QueryTemplate};
use crate::record::EntityRecord;
use crate::registry::{validate_mapping, Factory, MappingRegistry, RegistryError};
use crate::value::FieldValue;

/// Result of a fixed query, shaped by what the query does.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    Entities(Vec<T>),
    Values(Vec<FieldValue>),
    Affected(u64),
}

/// Generic provider for one entity type on the active backend.
///
/// Holds a snapshot of the sealed registration (mapping, table, queries)
/// and the shared driver. Cheap to clone.
pub struct EntityStore<T: Entity> {
    driver: Arc<dyn StorageDriver>,
    entity_type: EntityType,
    backend: BackendKind,
    capabilities: Capabilities,
    mapping: Arc<FieldMapping>,
    id_field: Arc<str>,
    table: Arc<str>,
    type_value: Arc<str>,
    partition_key: Arc<str>,
    queries: Arc<BTreeMap<QueryKind, QueryTemplate>>,
    factory: Factory,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            entity_type: self.entity_type,
            backend: self.backend,
            capabilities: self.capabilities,
            mapping: self.mapping.clone(),
            id_field: self.id_field.clone(),
            table: self.table.clone(),
            type_value: self.type_value.clone(),
            partition_key: self.partition_key.clone(),
            queries: self.queries.clone(),
            factory: self.factory,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity_type", &self.entity_type)
            .field("backend", &self.backend)
            .field("table", &self.table)
            .finish()
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn initialize(registry: &MappingRegistry, driver: Arc<dyn StorageDriver>) -> Result<Self, DataError> {
        Self::initialize_with_table(registry, driver, None)
    }

    /// Build the provider, validating the registration against the driver.
    ///
    /// `table` overrides both the registration default and the driver
    /// default.
    pub fn initialize_with_table(
        registry: &MappingRegistry,
        driver: Arc<dyn StorageDriver>,
        table: Option<&str>,
    ) -> Result<Self, DataError> {
        let registration = registry.lookup::<T>()?;
        let entity_type = T::ENTITY_TYPE;
        let backend = driver.backend();

        let mapping = registration.mapping(backend).ok_or_else(|| {
            DataError::Configuration(format!("{entity_type}: no {backend} mapping registered"))
        })?;
        let problems = validate_mapping(entity_type, backend, mapping, T::FIELDS, T::ID_PROPERTY);
        if !problems.is_empty() {
            return Err(RegistryError::Invalid(problems).into());
        }
        let id_field = mapping.field(T::ID_PROPERTY).ok_or_else(|| {
            DataError::Configuration(format!("{entity_type}: id property has no {backend} field"))
        })?;

        let capabilities = driver.capabilities();
        for (kind, template) in registration.queries() {
            if !capabilities.supports(template) {
                tracing::warn!(
                    entity_type = %entity_type,
                    backend = %backend,
                    query = %kind,
                    "fixed query is not supported by this backend and will be rejected"
                );
            }
        }

        let table = table
            .map(str::to_string)
            .or_else(|| registration.table_for(backend).map(str::to_string))
            .unwrap_or_else(|| driver.default_table(entity_type));
        driver.validate_table(entity_type, &table)?;

        tracing::debug!(
            entity_type = %entity_type,
            backend = %backend,
            table = %table,
            queries = registration.queries().len(),
            "entity store initialized"
        );

        Ok(Self {
            entity_type,
            backend,
            capabilities,
            mapping: Arc::new(mapping.clone()),
            id_field: Arc::from(id_field),
            table: Arc::from(table),
            type_value: Arc::from(registration.type_discriminator()),
            partition_key: Arc::from(registration.partition_key_value()),
            queries: Arc::new(registration.queries().clone()),
            factory: registration.factory(),
            driver,
            _entity: PhantomData,
        })
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Whether `kind` is declared for this entity type and runnable here.
    pub fn supports(&self, kind: QueryKind) -> bool {
        self.queries
            .get(&kind)
            .is_some_and(|template| self.capabilities.supports(template))
    }

    fn context(&self) -> QueryContext<'_> {
        QueryContext {
            entity_type: self.entity_type,
            backend: self.backend,
            table: &self.table,
            type_value: &self.type_value,
            partition_key: &self.partition_key,
            id_field: &self.id_field,
        }
    }

    fn field_of(&self, property: &str) -> Result<&str, DataError> {
        self.mapping.field(property).ok_or_else(|| {
            DataError::Configuration(format!(
                "{}: property '{property}' has no {} field",
                self.entity_type, self.backend
            ))
        })
    }

    /// Copy the declared properties into a record keyed by backend field.
    pub fn serialize(&self, entity: &T) -> Result<EntityRecord, DataError> {
        let id = entity.entity_id().unwrap_or_default();
        let mut record = EntityRecord::new(self.entity_type, id);
        if !id.is_empty() {
            record.insert(self.id_field.to_string(), FieldValue::String(id.to_string()));
        }
        for property in T::FIELDS {
            let value = entity.field(property).ok_or_else(|| DataError::Serialization {
                entity_type: self.entity_type,
                property: property.to_string(),
                message: "declared property has no accessor".into(),
            })?;
            record.insert(self.field_of(property)?, value);
        }
        Ok(record)
    }

    /// Rebuild a domain object from a record produced by the driver.
    pub fn deserialize(&self, record: EntityRecord) -> Result<T, DataError> {
        let mut entity = (self.factory)()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                DataError::Configuration(format!(
                    "{}: factory does not produce `{}`",
                    self.entity_type,
                    std::any::type_name::<T>()
                ))
            })?;

        let id = if record.entity_id.is_empty() {
            record.get(&self.id_field).as_text().unwrap_or_default()
        } else {
            record.entity_id.clone()
        };
        if !id.is_empty() {
            entity.set_entity_id(id);
        }

        for property in T::FIELDS {
            let value = record.get(self.field_of(property)?);
            entity
                .set_field(property, value)
                .map_err(|err| DataError::Serialization {
                    entity_type: self.entity_type,
                    property: property.to_string(),
                    message: err.to_string(),
                })?;
        }
        Ok(entity)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>, DataError> {
        if !self.capabilities.point_lookup {
            return Err(DataError::unsupported("get_by_id", self.entity_type, self.backend));
        }
        tracing::debug!(entity_type = %self.entity_type, backend = %self.backend, id, "get by id");
        match self.driver.get(&self.context(), id).await? {
            Some(record) => self.deserialize(record).map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<T, DataError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DataError::not_found(self.entity_type, id))
    }

    /// Insert a new entity and return its id. A UUID is generated when the
    /// entity has none; an id that already exists is a `Conflict`.
    pub async fn create(&self, entity: &T) -> Result<String, DataError> {
        let mut record = self.serialize(entity)?;
        if record.entity_id.is_empty() {
            record.entity_id = uuid::Uuid::new_v4().to_string();
            record.insert(
                self.id_field.to_string(),
                FieldValue::String(record.entity_id.clone()),
            );
        }
        tracing::debug!(
            entity_type = %self.entity_type,
            backend = %self.backend,
            id = %record.entity_id,
            "create"
        );
        self.driver.insert(&self.context(), &record).await?;
        Ok(record.entity_id)
    }

    pub async fn update(&self, entity: &T) -> Result<(), DataError> {
        let record = self.serialize(entity)?;
        if record.entity_id.is_empty() {
            return Err(DataError::not_found(self.entity_type, ""));
        }
        tracing::debug!(
            entity_type = %self.entity_type,
            backend = %self.backend,
            id = %record.entity_id,
            "update"
        );
        self.driver.replace(&self.context(), &record).await
    }

    pub async fn delete(&self, entity: &T) -> Result<(), DataError> {
        self.delete_by_id(entity.entity_id().unwrap_or_default()).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), DataError> {
        if id.is_empty() {
            return Err(DataError::not_found(self.entity_type, id));
        }
        tracing::debug!(entity_type = %self.entity_type, backend = %self.backend, id, "delete");
        self.driver.remove(&self.context(), id).await
    }

    fn template(&self, query: &FixedQuery) -> Result<&QueryTemplate, DataError> {
        let kind = query.kind();
        let template = self
            .queries
            .get(&kind)
            .ok_or_else(|| DataError::unsupported(kind.to_string(), self.entity_type, self.backend))?;
        if !self.capabilities.supports(template) {
            return Err(DataError::unsupported(kind.to_string(), self.entity_type, self.backend));
        }
        Ok(template)
    }

    /// Run a fixed query, mapping rows back into entities only when the
    /// query returns rows.
    pub async fn execute_fixed_query(&self, query: &FixedQuery) -> Result<QueryOutcome<T>, DataError> {
        let kind = query.kind();
        let bound = self
            .template(query)?
            .bind(query, &self.mapping, self.entity_type, self.backend)?;

        tracing::debug!(
            entity_type = %self.entity_type,
            backend = %self.backend,
            query = %kind,
            "fixed query"
        );

        match self.driver.execute(&self.context(), &bound).await? {
            DriverOutput::Records(records) => records
                .into_iter()
                .map(|record| self.deserialize(record))
                .collect::<Result<Vec<_>, _>>()
                .map(QueryOutcome::Entities),
            DriverOutput::Values(values) => Ok(QueryOutcome::Values(values)),
            DriverOutput::Affected(count) => Ok(QueryOutcome::Affected(count)),
        }
    }

    /// Reject a query whose action does not produce the requested shape,
    /// before anything runs.
    fn expect_shape(&self, query: &FixedQuery, shape: Shape) -> Result<(), DataError> {
        let actual = match self.template(query)?.action {
            QueryAction::Select => Shape::Rows,
            QueryAction::Delete => Shape::Affected,
            QueryAction::Distinct(_) => Shape::Values,
        };
        if actual == shape {
            Ok(())
        } else {
            Err(DataError::unsupported(
                format!("{} (does not return {})", query.kind(), shape.describe()),
                self.entity_type,
                self.backend,
            ))
        }
    }

    /// Run a row-returning fixed query.
    pub async fn query(&self, query: &FixedQuery) -> Result<Vec<T>, DataError> {
        self.expect_shape(query, Shape::Rows)?;
        match self.execute_fixed_query(query).await? {
            QueryOutcome::Entities(entities) => Ok(entities),
            _ => Ok(Vec::new()),
        }
    }

    /// Run a scalar projection such as `DistinctOrganizationIds`.
    pub async fn query_values(&self, query: &FixedQuery) -> Result<Vec<FieldValue>, DataError> {
        self.expect_shape(query, Shape::Values)?;
        match self.execute_fixed_query(query).await? {
            QueryOutcome::Values(values) => Ok(values),
            _ => Ok(Vec::new()),
        }
    }

    /// Run a delete query and return the number of removed records.
    pub async fn execute(&self, query: &FixedQuery) -> Result<u64, DataError> {
        self.expect_shape(query, Shape::Affected)?;
        match self.execute_fixed_query(query).await? {
            QueryOutcome::Affected(count) => Ok(count),
            _ => Ok(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Rows,
    Values,
    Affected,
}

impl Shape {
    fn describe(self) -> &'static str {
        match self {
            Shape::Rows => "rows",
            Shape::Values => "values",
            Shape::Affected => "an affected count",
        }
    }
}
