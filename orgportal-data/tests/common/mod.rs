#![allow(dead_code)]

use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::{Capabilities, MemoryDriver, RegistryBuilder};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Team {
    pub team_id: String,
    pub organization_id: String,
    pub name: String,
    pub slug: String,
    pub members: Option<i64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for Team {
    const ENTITY_TYPE: EntityType = EntityType::new("TeamSnapshot");

    entity_fields! {
        id: "teamId" => team_id;
        "organizationId" => organization_id,
        "name" => name,
        "slug" => slug,
        "members" => members,
        "lastUpdated" => last_updated,
    }
}

impl Team {
    pub fn new(id: &str, org: &str, name: &str) -> Self {
        Team {
            team_id: id.to_string(),
            organization_id: org.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            ..Default::default()
        }
    }
}

pub fn register_team(builder: &mut RegistryBuilder) {
    builder
        .register::<Team>()
        .unwrap()
        .query(QueryKind::All, QueryTemplate::select())
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
}

pub fn team_store_with(capabilities: Capabilities) -> EntityStore<Team> {
    let mut builder = RegistryBuilder::new();
    register_team(&mut builder);
    let registry = builder.seal().unwrap();
    let driver: Arc<dyn StorageDriver> = Arc::new(MemoryDriver::with_capabilities(capabilities));
    EntityStore::initialize(&registry, driver).unwrap()
}

pub fn team_store() -> EntityStore<Team> {
    team_store_with(Capabilities::FULL)
}
