//! Conversion between generic records and table-service entities.
//!
//! Entities are JSON objects carrying `PartitionKey`, `RowKey` and one
//! property per non-null field. Integers and dates are written with an
//! `@odata.type` annotation so the service stores them typed.

use chrono::{DateTime, Utc};
use orgportal_data::{format_date, EntityRecord, FieldValue, QueryContext};
use serde_json::{Map, Value};

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
pub const TIMESTAMP: &str = "Timestamp";

const TYPE_SUFFIX: &str = "@odata.type";

pub type TableEntity = Map<String, Value>;

pub fn to_entity(ctx: &QueryContext<'_>, record: &EntityRecord) -> TableEntity {
    let mut entity = Map::new();
    entity.insert(PARTITION_KEY.into(), Value::String(ctx.partition_key.to_string()));
    entity.insert(ROW_KEY.into(), Value::String(record.entity_id.clone()));

    for (field, value) in &record.properties {
        match value {
            FieldValue::Null => {}
            FieldValue::Integer(i) => {
                entity.insert(format!("{field}{TYPE_SUFFIX}"), "Edm.Int64".into());
                entity.insert(field.clone(), Value::String(i.to_string()));
            }
            FieldValue::Date(d) => {
                entity.insert(format!("{field}{TYPE_SUFFIX}"), "Edm.DateTime".into());
                entity.insert(field.clone(), Value::String(format_date(d)));
            }
            other => {
                entity.insert(field.clone(), other.to_json());
            }
        }
    }
    entity
}

/// Read one property, honouring its type annotation. Absent properties
/// read as `Null`.
pub fn read_property(entity: &TableEntity, field: &str) -> FieldValue {
    let Some(raw) = entity.get(field) else {
        return FieldValue::Null;
    };
    let annotation = entity
        .get(&format!("{field}{TYPE_SUFFIX}"))
        .and_then(Value::as_str);
    match (annotation, raw) {
        (Some("Edm.Int64"), Value::String(s)) => s
            .parse()
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::String(s.clone())),
        (Some("Edm.DateTime"), Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| FieldValue::Date(d.with_timezone(&Utc)))
            .unwrap_or_else(|_| FieldValue::String(s.clone())),
        _ => FieldValue::from_json(raw),
    }
}

fn is_system_key(key: &str) -> bool {
    key == PARTITION_KEY
        || key == ROW_KEY
        || key == TIMESTAMP
        || key.starts_with("odata.")
        || key.contains('@')
}

pub fn from_entity(ctx: &QueryContext<'_>, entity: &TableEntity) -> EntityRecord {
    let id = entity
        .get(ROW_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default();
    let mut record = EntityRecord::new(ctx.entity_type, id);
    for key in entity.keys().filter(|k| !is_system_key(k)) {
        record.insert(key.clone(), read_property(entity, key));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use orgportal_data::{BackendKind, EntityType};

    fn ctx() -> QueryContext<'static> {
        QueryContext {
            entity_type: EntityType::new("RepositorySnapshot"),
            backend: BackendKind::Table,
            table: "RepositorySnapshot",
            type_value: "RepositorySnapshot",
            partition_key: "RepositorySnapshot",
            id_field: "repositoryid",
        }
    }

    #[test]
    fn nulls_are_omitted_and_types_annotated() {
        let pushed = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = EntityRecord::new(ctx().entity_type, "42")
            .with("name", "api")
            .with("stars", FieldValue::Integer(9))
            .with("pushedat", FieldValue::Date(pushed))
            .with("description", FieldValue::Null);

        let entity = to_entity(&ctx(), &record);
        assert_eq!(entity["PartitionKey"], "RepositorySnapshot");
        assert_eq!(entity["RowKey"], "42");
        assert_eq!(entity["stars"], "9");
        assert_eq!(entity["stars@odata.type"], "Edm.Int64");
        assert_eq!(entity["pushedat@odata.type"], "Edm.DateTime");
        assert!(!entity.contains_key("description"));

        let back = from_entity(&ctx(), &entity);
        assert_eq!(back.get("stars"), &FieldValue::Integer(9));
        assert_eq!(back.get("pushedat"), &FieldValue::Date(pushed));
        assert!(back.get("description").is_null());
        assert_eq!(back.entity_id, "42");
    }

    #[test]
    fn service_metadata_is_skipped() {
        let entity: TableEntity = serde_json::from_value(serde_json::json!({
            "odata.etag": "W/\"x\"",
            "PartitionKey": "p",
            "RowKey": "r",
            "Timestamp": "2024-01-01T00:00:00Z",
            "name": "n"
        }))
        .unwrap();
        let record = from_entity(&ctx(), &entity);
        assert_eq!(record.properties.len(), 1);
    }
}
