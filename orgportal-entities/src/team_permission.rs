use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::provider;

/// A team's permission on one repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamPermissionSnapshot {
    /// `{repositoryId}:{teamId}`
    pub unique_id: String,
    pub organization_id: String,
    pub repository_id: String,
    pub team_id: String,
    pub permission: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for TeamPermissionSnapshot {
    const ENTITY_TYPE: EntityType = EntityType::new("TeamPermissionSnapshot");

    entity_fields! {
        id: "uniqueId" => unique_id;
        "organizationId" => organization_id,
        "repositoryId" => repository_id,
        "teamId" => team_id,
        "permission" => permission,
        "lastUpdated" => last_updated,
    }
}

impl TeamPermissionSnapshot {
    pub fn new(
        organization_id: impl Into<String>,
        repository_id: impl Into<String>,
        team_id: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        let repository_id = repository_id.into();
        let team_id = team_id.into();
        Self {
            unique_id: format!("{repository_id}:{team_id}"),
            organization_id: organization_id.into(),
            repository_id,
            team_id,
            permission: permission.into(),
            last_updated: None,
        }
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<TeamPermissionSnapshot>()?
        .query(
            QueryKind::ByOrganizationId,
            QueryTemplate::select().filter("organizationId", Param::OrganizationId),
        )
        .query(
            QueryKind::ByRepositoryId,
            QueryTemplate::select().filter("repositoryId", Param::RepositoryId),
        )
        .query(
            QueryKind::ByTeamId,
            QueryTemplate::select().filter("teamId", Param::TeamId),
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

provider!(TeamPermissionSnapshotProvider, TeamPermissionSnapshot);

impl TeamPermissionSnapshotProvider {
    pub async fn for_organization(&self, organization_id: &str) -> Result<Vec<TeamPermissionSnapshot>, DataError> {
        self.store
            .query(&FixedQuery::ByOrganizationId(organization_id.to_string()))
            .await
    }

    pub async fn for_repository(&self, repository_id: &str) -> Result<Vec<TeamPermissionSnapshot>, DataError> {
        self.store
            .query(&FixedQuery::ByRepositoryId(repository_id.to_string()))
            .await
    }

    pub async fn for_team(&self, team_id: &str) -> Result<Vec<TeamPermissionSnapshot>, DataError> {
        self.store.query(&FixedQuery::ByTeamId(team_id.to_string())).await
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
