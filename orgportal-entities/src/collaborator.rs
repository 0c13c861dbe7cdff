use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::provider;

/// A user's access to one repository, as last synchronized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollaboratorSnapshot {
    /// `{repositoryId}:{userId}`
    pub unique_id: String,
    pub organization_id: String,
    pub repository_id: String,
    pub user_id: String,
    pub login: String,
    pub permission: String,
    /// `direct` or `outside`.
    pub collaborator_type: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for CollaboratorSnapshot {
    const ENTITY_TYPE: EntityType = EntityType::new("CollaboratorSnapshot");

    entity_fields! {
        id: "uniqueId" => unique_id;
        "organizationId" => organization_id,
        "repositoryId" => repository_id,
        "userId" => user_id,
        "login" => login,
        "permission" => permission,
        "collaboratorType" => collaborator_type,
        "lastUpdated" => last_updated,
    }
}

impl CollaboratorSnapshot {
    pub fn new(
        organization_id: impl Into<String>,
        repository_id: impl Into<String>,
        user_id: impl Into<String>,
        login: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        let repository_id = repository_id.into();
        let user_id = user_id.into();
        Self {
            unique_id: Self::unique_id_for(&repository_id, &user_id),
            organization_id: organization_id.into(),
            repository_id,
            user_id,
            login: login.into(),
            permission: permission.into(),
            ..Default::default()
        }
    }

    pub fn unique_id_for(repository_id: &str, user_id: &str) -> String {
        format!("{repository_id}:{user_id}")
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<CollaboratorSnapshot>()?
        .query(
            QueryKind::ByOrganizationId,
            QueryTemplate::select().filter("organizationId", Param::OrganizationId),
        )
        .query(
            QueryKind::ByRepositoryId,
            QueryTemplate::select()
                .filter("repositoryId", Param::RepositoryId)
                .order_by("login", Direction::Ascending),
        )
        .query(
            QueryKind::ByUserId,
            QueryTemplate::select().filter("userId", Param::UserId),
        )
        .query(
            QueryKind::DeleteByOrganizationId,
            QueryTemplate::delete().filter("organizationId", Param::OrganizationId),
        )
        .query(
            QueryKind::DeleteByRepositoryId,
            QueryTemplate::delete().filter("repositoryId", Param::RepositoryId),
        );
    Ok(())
}

provider!(CollaboratorSnapshotProvider, CollaboratorSnapshot);

impl CollaboratorSnapshotProvider {
    pub async fn for_organization(&self, organization_id: &str) -> Result<Vec<CollaboratorSnapshot>, DataError> {
        self.store
            .query(&FixedQuery::ByOrganizationId(organization_id.to_string()))
            .await
    }

    pub async fn for_repository(&self, repository_id: &str) -> Result<Vec<CollaboratorSnapshot>, DataError> {
        self.store
            .query(&FixedQuery::ByRepositoryId(repository_id.to_string()))
            .await
    }

    pub async fn for_user(&self, user_id: &str) -> Result<Vec<CollaboratorSnapshot>, DataError> {
        self.store.query(&FixedQuery::ByUserId(user_id.to_string())).await
    }

    pub async fn delete_for_organization(&self, organization_id: &str) -> Result<u64, DataError> {
        self.store
            .execute(&FixedQuery::DeleteByOrganizationId(organization_id.to_string()))
            .await
    }

    pub async fn delete_for_repository(&self, repository_id: &str) -> Result<u64, DataError> {
        self.store
            .execute(&FixedQuery::DeleteByRepositoryId(repository_id.to_string()))
            .await
    }
}
