use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::{provider, strings};

/// Point-in-time copy of a GitHub repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositorySnapshot {
    pub repository_id: String,
    pub organization_id: String,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub archived: bool,
    pub default_branch: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for RepositorySnapshot {
    const ENTITY_TYPE: EntityType = EntityType::new("RepositorySnapshot");

    entity_fields! {
        id: "repositoryId" => repository_id;
        "organizationId" => organization_id,
        "name" => name,
        "fullName" => full_name,
        "description" => description,
        "private" => private,
        "archived" => archived,
        "defaultBranch" => default_branch,
        "createdAt" => created_at,
        "pushedAt" => pushed_at,
        "lastUpdated" => last_updated,
    }
}

impl RepositorySnapshot {
    pub fn new(repository_id: impl Into<String>, organization_id: impl Into<String>, name: impl Into<String>) -> Self {
        let organization_id = organization_id.into();
        let name = name.into();
        Self {
            repository_id: repository_id.into(),
            full_name: format!("{organization_id}/{name}"),
            organization_id,
            name,
            ..Default::default()
        }
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<RepositorySnapshot>()?
        .query(QueryKind::All, QueryTemplate::select().order_by("fullName", Direction::Ascending))
        .query(
            QueryKind::ByOrganizationId,
            QueryTemplate::select()
                .filter("organizationId", Param::OrganizationId)
                .order_by("name", Direction::Ascending),
        )
        .query(
            QueryKind::DeleteByOrganizationId,
            QueryTemplate::delete().filter("organizationId", Param::OrganizationId),
        )
        .query(
            QueryKind::DistinctOrganizationIds,
            QueryTemplate::distinct("organizationId"),
        );
    Ok(())
}

provider!(RepositorySnapshotProvider, RepositorySnapshot);

impl RepositorySnapshotProvider {
    pub async fn all(&self) -> Result<Vec<RepositorySnapshot>, DataError> {
        self.store.query(&FixedQuery::All).await
    }

    pub async fn for_organization(&self, organization_id: &str) -> Result<Vec<RepositorySnapshot>, DataError> {
        self.store
            .query(&FixedQuery::ByOrganizationId(organization_id.to_string()))
            .await
    }

    pub async fn delete_for_organization(&self, organization_id: &str) -> Result<u64, DataError> {
        self.store
            .execute(&FixedQuery::DeleteByOrganizationId(organization_id.to_string()))
            .await
    }

    pub async fn organization_ids(&self) -> Result<Vec<String>, DataError> {
        self.store
            .query_values(&FixedQuery::DistinctOrganizationIds)
            .await
            .map(strings)
    }
}
