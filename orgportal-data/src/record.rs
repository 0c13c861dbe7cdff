use std::collections::BTreeMap;

use crate::entity::EntityType;
use crate::value::FieldValue;

/// Backend-neutral carrier between the store and a driver.
///
/// `properties` is keyed by backend field name: the active mapping has
/// already been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub properties: BTreeMap<String, FieldValue>,
}

static NULL: FieldValue = FieldValue::Null;

impl EntityRecord {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
            properties: BTreeMap::new(),
        }
    }

    /// Value of a backend field; absent fields read as `Null`.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.properties.get(field).unwrap_or(&NULL)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.properties.insert(field.into(), value);
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value.into());
        self
    }

    /// The properties as a JSON document, as stored in a document column.
    pub fn to_document(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(field, value)| (field.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Rebuild a record from a JSON document. Non-object documents yield
    /// a record without properties.
    pub fn from_document(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        document: &serde_json::Value,
    ) -> Self {
        let mut record = Self::new(entity_type, entity_id);
        if let serde_json::Value::Object(map) = document {
            for (field, value) in map {
                record.insert(field.clone(), FieldValue::from_json(value));
            }
        }
        record
    }
}
