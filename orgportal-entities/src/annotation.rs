use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::provider;

/// Free-form name/value metadata attached by portal users to a repository,
/// team or organization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub annotation_id: String,
    pub organization_id: String,
    /// `repository`, `team` or `organization`.
    pub subject_type: String,
    pub subject_id: String,
    pub name: String,
    pub value: Option<String>,
    pub created_by: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl Entity for Annotation {
    const ENTITY_TYPE: EntityType = EntityType::new("Annotation");

    entity_fields! {
        id: "annotationId" => annotation_id;
        "organizationId" => organization_id,
        "subjectType" => subject_type,
        "subjectId" => subject_id,
        "name" => name,
        "value" => value,
        "createdBy" => created_by,
        "created" => created,
        "updated" => updated,
    }
}

impl Annotation {
    /// New annotation without an id; one is assigned on create.
    pub fn new(
        organization_id: impl Into<String>,
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
            name: name.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<Annotation>()?
        .query(
            QueryKind::ByOrganizationId,
            QueryTemplate::select()
                .filter("organizationId", Param::OrganizationId)
                .order_by("name", Direction::Ascending),
        )
        .query(
            QueryKind::BySubject,
            QueryTemplate::select()
                .filter("subjectType", Param::SubjectType)
                .filter("subjectId", Param::SubjectId)
                .order_by("name", Direction::Ascending),
        );
    Ok(())
}

provider!(AnnotationProvider, Annotation);

impl AnnotationProvider {
    pub async fn for_organization(&self, organization_id: &str) -> Result<Vec<Annotation>, DataError> {
        self.store
            .query(&FixedQuery::ByOrganizationId(organization_id.to_string()))
            .await
    }

    pub async fn for_subject(&self, subject_type: &str, subject_id: &str) -> Result<Vec<Annotation>, DataError> {
        self.store
            .query(&FixedQuery::BySubject {
                subject_type: subject_type.to_string(),
                subject_id: subject_id.to_string(),
            })
            .await
    }
}
