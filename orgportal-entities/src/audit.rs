use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::provider;

/// One entry of the governance audit log. Append-only in practice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditRecord {
    pub record_id: String,
    pub organization_id: String,
    pub repository_id: Option<String>,
    pub team_id: Option<String>,
    pub actor_id: Option<String>,
    pub actor_login: Option<String>,
    pub user_id: Option<String>,
    pub user_login: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

impl Entity for AuditRecord {
    const ENTITY_TYPE: EntityType = EntityType::new("AuditRecord");

    entity_fields! {
        id: "recordId" => record_id;
        "organizationId" => organization_id,
        "repositoryId" => repository_id,
        "teamId" => team_id,
        "actorId" => actor_id,
        "actorLogin" => actor_login,
        "userId" => user_id,
        "userLogin" => user_login,
        "action" => action,
        "details" => details,
        "created" => created,
    }
}

impl AuditRecord {
    pub fn new(organization_id: impl Into<String>, action: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            organization_id: organization_id.into(),
            action: action.into(),
            created: Some(created),
            ..Default::default()
        }
    }
}

fn newest_first(template: QueryTemplate) -> QueryTemplate {
    template.order_by("created", Direction::Descending)
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<AuditRecord>()?
        .query(
            QueryKind::ByRepositoryId,
            newest_first(QueryTemplate::select().filter("repositoryId", Param::RepositoryId)),
        )
        .query(
            QueryKind::ByActorId,
            newest_first(QueryTemplate::select().filter("actorId", Param::ActorId)),
        )
        .query(
            QueryKind::ByUserId,
            newest_first(QueryTemplate::select().filter("userId", Param::UserId)),
        )
        .query(
            QueryKind::ByOrganizationId,
            newest_first(QueryTemplate::select().filter("organizationId", Param::OrganizationId)),
        );
    Ok(())
}

provider!(AuditRecordProvider, AuditRecord);

/// All listings are newest first.
impl AuditRecordProvider {
    pub async fn for_repository(&self, repository_id: &str) -> Result<Vec<AuditRecord>, DataError> {
        self.store
            .query(&FixedQuery::ByRepositoryId(repository_id.to_string()))
            .await
    }

    pub async fn for_actor(&self, actor_id: &str) -> Result<Vec<AuditRecord>, DataError> {
        self.store.query(&FixedQuery::ByActorId(actor_id.to_string())).await
    }

    pub async fn for_user(&self, user_id: &str) -> Result<Vec<AuditRecord>, DataError> {
        self.store.query(&FixedQuery::ByUserId(user_id.to_string())).await
    }

    pub async fn for_organization(&self, organization_id: &str) -> Result<Vec<AuditRecord>, DataError> {
        self.store
            .query(&FixedQuery::ByOrganizationId(organization_id.to_string()))
            .await
    }
}
