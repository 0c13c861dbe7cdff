use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::{provider, strings};

/// Point-in-time copy of a GitHub team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamSnapshot {
    pub team_id: String,
    pub organization_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub privacy: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for TeamSnapshot {
    const ENTITY_TYPE: EntityType = EntityType::new("TeamSnapshot");

    entity_fields! {
        id: "teamId" => team_id;
        "organizationId" => organization_id,
        "name" => name,
        "slug" => slug,
        "description" => description,
        "privacy" => privacy,
        "lastUpdated" => last_updated,
    }
}

impl TeamSnapshot {
    pub fn new(team_id: impl Into<String>, organization_id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            organization_id: organization_id.into(),
            name: name.into(),
            slug: slug.into(),
            ..Default::default()
        }
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<TeamSnapshot>()?
        .query(QueryKind::All, QueryTemplate::select().order_by("name", Direction::Ascending))
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

provider!(TeamSnapshotProvider, TeamSnapshot);

impl TeamSnapshotProvider {
    pub async fn all(&self) -> Result<Vec<TeamSnapshot>, DataError> {
        self.store.query(&FixedQuery::All).await
    }

    pub async fn for_organization(&self, organization_id: &str) -> Result<Vec<TeamSnapshot>, DataError> {
        self.store
            .query(&FixedQuery::ByOrganizationId(organization_id.to_string()))
            .await
    }

    /// Returns the number of removed snapshots.
    pub async fn delete_for_organization(&self, organization_id: &str) -> Result<u64, DataError> {
        self.store
            .execute(&FixedQuery::DeleteByOrganizationId(organization_id.to_string()))
            .await
    }

    /// Organizations with at least one stored team.
    pub async fn organization_ids(&self) -> Result<Vec<String>, DataError> {
        self.store
            .query_values(&FixedQuery::DistinctOrganizationIds)
            .await
            .map(strings)
    }
}
