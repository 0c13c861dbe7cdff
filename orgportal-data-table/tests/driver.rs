use std::sync::Arc;

use orgportal_data::prelude::*;
use orgportal_data::{MemoryDriver, QueryContext, RegistryBuilder};
use orgportal_data_table::{MemoryTableClient, TableDriver, TableFilter, TableQuery};

#[derive(Debug, Clone, Default, PartialEq)]
struct Collaborator {
    unique_id: String,
    organization_id: String,
    repository_id: String,
    login: String,
    permission: Option<String>,
    contributions: Option<i64>,
}

impl Entity for Collaborator {
    const ENTITY_TYPE: EntityType = EntityType::new("CollaboratorSnapshot");

    entity_fields! {
        id: "uniqueId" => unique_id;
        "organizationId" => organization_id,
        "repositoryId" => repository_id,
        "login" => login,
        "permission" => permission,
        "contributions" => contributions,
    }
}

fn collaborator(repo: &str, login: &str, org: &str) -> Collaborator {
    Collaborator {
        unique_id: format!("{repo}:{login}"),
        organization_id: org.into(),
        repository_id: repo.into(),
        login: login.into(),
        permission: Some("push".into()),
        contributions: Some(3),
    }
}

fn store(client: &MemoryTableClient) -> EntityStore<Collaborator> {
    let mut builder = RegistryBuilder::new();
    builder
        .register::<Collaborator>()
        .unwrap()
        .query(
            QueryKind::ByOrganizationId,
            QueryTemplate::select()
                .filter("organizationId", Param::OrganizationId)
                .order_by("login", Direction::Descending),
        )
        .query(
            QueryKind::DeleteByRepositoryId,
            QueryTemplate::delete().filter("repositoryId", Param::RepositoryId),
        )
        .query(
            QueryKind::DistinctOrganizationIds,
            QueryTemplate::distinct("organizationId"),
        );
    let registry = builder.seal().unwrap();
    let driver: Arc<dyn StorageDriver> = Arc::new(TableDriver::new(Arc::new(client.clone()), "portal"));
    EntityStore::initialize(&registry, driver).unwrap()
}

#[tokio::test]
async fn test_entities_land_in_prefixed_table_with_keys() {
    let client = MemoryTableClient::new();
    let store = store(&client);
    assert_eq!(store.table(), "portalCollaboratorSnapshot");

    store.create(&collaborator("r1", "alice", "acme")).await.unwrap();

    let stored = client.entities("portalCollaboratorSnapshot");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["PartitionKey"], "CollaboratorSnapshot");
    assert_eq!(stored[0]["RowKey"], "r1:alice");
    assert_eq!(stored[0]["contributions@odata.type"], "Edm.Int64");
}

#[tokio::test]
async fn test_round_trip_and_null_omission() {
    let client = MemoryTableClient::new();
    let store = store(&client);
    let mut c = collaborator("r1", "bob", "acme");
    c.permission = None;
    store.create(&c).await.unwrap();

    assert!(!client.entities("portalCollaboratorSnapshot")[0].contains_key("permission"));
    assert_eq!(store.get_by_id("r1:bob").await.unwrap(), c);
}

#[tokio::test]
async fn test_duplicate_insert_conflicts_and_missing_update_is_not_found() {
    let client = MemoryTableClient::new();
    let store = store(&client);
    store.create(&collaborator("r1", "alice", "acme")).await.unwrap();
    assert!(store
        .create(&collaborator("r1", "alice", "acme"))
        .await
        .unwrap_err()
        .is_conflict());
    assert!(store
        .update(&collaborator("r9", "zed", "acme"))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(store.delete_by_id("r9:zed").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_queries_filter_order_and_delete() {
    let client = MemoryTableClient::new();
    let store = store(&client);
    for (repo, login, org) in [
        ("r1", "alice", "acme"),
        ("r1", "carol", "acme"),
        ("r2", "bob", "acme"),
        ("r3", "dave", "globex"),
        ("r4", "erin", "initech"),
    ] {
        store.create(&collaborator(repo, login, org)).await.unwrap();
    }

    let acme = store.query(&FixedQuery::ByOrganizationId("acme".into())).await.unwrap();
    let logins: Vec<&str> = acme.iter().map(|c| c.login.as_str()).collect();
    assert_eq!(logins, ["carol", "bob", "alice"]);
    assert!(store
        .query(&FixedQuery::ByOrganizationId("umbrella".into()))
        .await
        .unwrap()
        .is_empty());

    let orgs = store.query_values(&FixedQuery::DistinctOrganizationIds).await.unwrap();
    assert_eq!(orgs, vec!["acme".into(), "globex".into(), "initech".into()]);

    let removed = store.execute(&FixedQuery::DeleteByRepositoryId("r1".into())).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        store.query(&FixedQuery::ByOrganizationId("acme".into())).await.unwrap().len(),
        1
    );
}

#[test]
fn test_compile_splits_null_predicates() {
    let ctx = QueryContext {
        entity_type: Collaborator::ENTITY_TYPE,
        backend: BackendKind::Table,
        table: "portalCollaboratorSnapshot",
        type_value: "CollaboratorSnapshot",
        partition_key: "CollaboratorSnapshot",
        id_field: "uniqueid",
    };
    let query = orgportal_data::BoundQuery {
        kind: QueryKind::ByRepositoryId,
        action: orgportal_data::QueryAction::Select,
        predicates: vec![
            orgportal_data::Predicate {
                field: "repositoryid".into(),
                value: "it's".into(),
            },
            orgportal_data::Predicate {
                field: "permission".into(),
                value: FieldValue::Null,
            },
        ],
        order_by: None,
    };
    let plan: TableQuery = orgportal_data_table::compile::compile(&ctx, &query);
    assert_eq!(
        plan.filter.render().unwrap(),
        "PartitionKey eq 'CollaboratorSnapshot' and repositoryid eq 'it''s'"
    );
    assert_eq!(plan.post_filter.len(), 1);
    assert!(plan.needs_client_side());
    assert_eq!(
        plan.filter,
        TableFilter::eq("PartitionKey", "CollaboratorSnapshot").and(TableFilter::eq("repositoryid", "it's"))
    );
}

#[tokio::test]
async fn test_same_entities_behave_like_memory_backend() {
    let client = MemoryTableClient::new();
    let table_store = store(&client);

    let mut builder = RegistryBuilder::new();
    builder
        .register::<Collaborator>()
        .unwrap()
        .query(
            QueryKind::ByOrganizationId,
            QueryTemplate::select()
                .filter("organizationId", Param::OrganizationId)
                .order_by("login", Direction::Descending),
        );
    let registry = builder.seal().unwrap();
    let memory_store: EntityStore<Collaborator> =
        EntityStore::initialize(&registry, Arc::new(MemoryDriver::new())).unwrap();

    for c in [collaborator("r1", "a", "x"), collaborator("r2", "b", "x"), collaborator("r3", "c", "y")] {
        table_store.create(&c).await.unwrap();
        memory_store.create(&c).await.unwrap();
    }
    let q = FixedQuery::ByOrganizationId("x".into());
    assert_eq!(table_store.query(&q).await.unwrap(), memory_store.query(&q).await.unwrap());
}

#[test]
fn test_unusable_table_names_fail_initialization() {
    let mut builder = RegistryBuilder::new();
    builder.register::<Collaborator>().unwrap();
    let registry = builder.seal().unwrap();

    let driver: Arc<dyn StorageDriver> = Arc::new(TableDriver::new(Arc::new(MemoryTableClient::new()), "portal"));
    let err = EntityStore::<Collaborator>::initialize_with_table(&registry, driver.clone(), Some("audit_log"))
        .unwrap_err();
    assert!(matches!(err, DataError::Configuration(ref m) if m.contains("'audit_log'")), "{err}");
    assert!(EntityStore::<Collaborator>::initialize_with_table(&registry, driver, Some("auditlog")).is_ok());

    let prefixed: Arc<dyn StorageDriver> = Arc::new(TableDriver::new(Arc::new(MemoryTableClient::new()), "org-"));
    assert!(EntityStore::<Collaborator>::initialize(&registry, prefixed).is_err());
}
