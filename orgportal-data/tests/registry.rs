mod common;

use common::{register_team, Team};
use orgportal_data::prelude::*;
use orgportal_data::{
    validate_mapping, FieldMapping, FieldTransform, MappingProblem, MemoryDriver, RegistryError,
};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Note {
    note_id: String,
    body: String,
}

impl Entity for Note {
    const ENTITY_TYPE: EntityType = EntityType::new("Note");

    entity_fields! {
        id: "noteId" => note_id;
        "body" => body,
    }
}

/// Same entity type name as `Team`, different Rust type.
#[derive(Debug, Clone, Default, PartialEq)]
struct Impostor {
    id: String,
    name: String,
}

impl Entity for Impostor {
    const ENTITY_TYPE: EntityType = EntityType::new("TeamSnapshot");

    entity_fields! {
        id: "teamId" => id;
        "name" => name,
    }
}

fn problems(err: RegistryError) -> Vec<MappingProblem> {
    match err {
        RegistryError::Invalid(problems) => problems,
        other => panic!("expected Invalid, got {other}"),
    }
}

#[test]
fn test_seal_derives_lowercase_mappings() {
    let mut builder = RegistryBuilder::new();
    register_team(&mut builder);
    let registry = builder.seal().unwrap();

    let registration = registry.get(Team::ENTITY_TYPE).unwrap();
    for backend in BackendKind::ALL {
        let mapping = registration.mapping(backend).unwrap();
        assert_eq!(mapping.field("teamId"), Some("teamid"));
        assert_eq!(mapping.field("organizationId"), Some("organizationid"));
        assert_eq!(mapping.len(), Team::FIELDS.len() + 1);
    }
    assert_eq!(registration.partition_key_value(), "TeamSnapshot");
    assert_eq!(registration.type_discriminator(), "TeamSnapshot");
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut builder = RegistryBuilder::new();
    register_team(&mut builder);
    let err = builder.register::<Team>().unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateEntityType(t) if t == Team::ENTITY_TYPE));
}

#[test]
fn test_same_name_different_type_is_a_duplicate() {
    let mut builder = RegistryBuilder::new();
    register_team(&mut builder);
    assert!(builder.register::<Impostor>().is_err());
}

#[test]
fn test_lookup_checks_rust_type() {
    let mut builder = RegistryBuilder::new();
    builder.register::<Impostor>().unwrap();
    let registry = builder.seal().unwrap();
    let err = registry.lookup::<Team>().unwrap_err();
    assert!(matches!(err, RegistryError::TypeMismatch { .. }));
}

#[test]
fn test_unknown_entity_type() {
    let registry = RegistryBuilder::new().seal().unwrap();
    assert!(registry.is_empty());
    let err = registry.get(Note::ENTITY_TYPE).unwrap_err();
    assert_eq!(err.to_string(), "Entity type 'Note' is not registered");
}

#[test]
fn test_removing_a_mapping_entry_fails_validation() {
    let mut mapping = FieldMapping::derive(
        std::iter::once(Team::ID_PROPERTY).chain(Team::FIELDS.iter().copied()),
        FieldTransform::Lowercase,
    );
    assert!(validate_mapping(
        Team::ENTITY_TYPE,
        BackendKind::Postgres,
        &mapping,
        Team::FIELDS,
        Team::ID_PROPERTY
    )
    .is_empty());

    mapping.remove("slug");
    let found = validate_mapping(
        Team::ENTITY_TYPE,
        BackendKind::Postgres,
        &mapping,
        Team::FIELDS,
        Team::ID_PROPERTY,
    );
    assert_eq!(
        found,
        vec![MappingProblem::MissingField {
            entity_type: Team::ENTITY_TYPE,
            backend: BackendKind::Postgres,
            property: "slug".into(),
        }]
    );
}

#[test]
fn test_problems_are_aggregated() {
    let mut builder = RegistryBuilder::new();
    builder
        .register::<Team>()
        .unwrap()
        .override_field(BackendKind::Postgres, "name", "slug")
        .override_field(BackendKind::Postgres, "teamId", "entityid")
        .override_field(BackendKind::Table, "members", "member count")
        .query(
            QueryKind::ByUserId,
            QueryTemplate::select().filter("userId", Param::UserId),
        );
    builder
        .register::<Note>()
        .unwrap()
        .override_field(BackendKind::Memory, "title", "title");

    let found = problems(builder.seal().unwrap_err());

    assert!(found.iter().any(|p| matches!(p,
        MappingProblem::DuplicateField { backend: BackendKind::Postgres, field, .. } if field == "slug")));
    assert!(found.iter().any(|p| matches!(p,
        MappingProblem::ReservedField { backend: BackendKind::Postgres, field, .. } if field == "entityid")));
    assert!(found.iter().any(|p| matches!(p,
        MappingProblem::InvalidIdentifier { backend: BackendKind::Table, name, .. } if name == "member count")));
    assert!(found.iter().any(|p| matches!(p,
        MappingProblem::UnknownProperty { property, .. } if property == "userId")));
    assert!(found.iter().any(|p| matches!(p,
        MappingProblem::UnknownProperty { entity_type, property, .. }
            if *entity_type == Note::ENTITY_TYPE && property == "title")));
}

#[test]
fn test_invalid_error_lists_every_problem() {
    let mut builder = RegistryBuilder::new();
    builder
        .register::<Note>()
        .unwrap()
        .override_field(BackendKind::Postgres, "body", "bo-dy")
        .override_field(BackendKind::Table, "body", "RowKey");
    let message = builder.seal().unwrap_err().to_string();
    assert!(message.contains("2 problem(s)"), "{message}");
    assert!(message.contains("'bo-dy'"));
    assert!(message.contains("'RowKey' is reserved"));
}

#[test]
fn test_invalid_table_name_is_rejected() {
    let mut builder = RegistryBuilder::new();
    builder
        .register::<Note>()
        .unwrap()
        .table(BackendKind::Postgres, "notes; drop table x");
    let found = problems(builder.seal().unwrap_err());
    assert_eq!(found.len(), 1);
}

#[test]
fn test_table_service_names_are_checked_at_seal() {
    let mut builder = RegistryBuilder::new();
    builder
        .register::<Note>()
        .unwrap()
        .table(BackendKind::Postgres, "audit_log")
        .table(BackendKind::Table, "audit_log");
    let found = problems(builder.seal().unwrap_err());
    assert_eq!(
        found,
        vec![MappingProblem::InvalidIdentifier {
            entity_type: Note::ENTITY_TYPE,
            backend: BackendKind::Table,
            name: "audit_log".into(),
        }]
    );
}

#[test]
fn test_identity_mapping_keeps_case() {
    let mut builder = RegistryBuilder::new();
    register_team(&mut builder);
    builder
        .registration_mut(Team::ENTITY_TYPE)
        .unwrap()
        .backend_mapping(BackendKind::Table, FieldTransform::Identity);
    let registry = builder.seal().unwrap();
    let mapping = registry
        .get(Team::ENTITY_TYPE)
        .unwrap()
        .mapping(BackendKind::Table)
        .unwrap();
    assert_eq!(mapping.field("organizationId"), Some("organizationId"));
}

#[test]
fn test_registry_error_becomes_configuration_error() {
    let err: DataError = RegistryError::DuplicateEntityType(Note::ENTITY_TYPE).into();
    assert!(matches!(err, DataError::Configuration(_)));
}

#[test]
fn test_store_initialization_requires_registration() {
    let registry = RegistryBuilder::new().seal().unwrap();
    let driver: Arc<dyn StorageDriver> = Arc::new(MemoryDriver::new());
    let err = EntityStore::<Note>::initialize(&registry, driver).unwrap_err();
    assert!(matches!(err, DataError::Configuration(_)));
    assert!(err.to_string().contains("Note"));
}
