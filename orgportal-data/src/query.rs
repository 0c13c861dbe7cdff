use std::fmt;

use crate::entity::EntityType;
use crate::error::DataError;
use crate::mapping::{BackendKind, FieldMapping};
use crate::record::EntityRecord;
use crate::value::FieldValue;

/// Tag identifying one of the closed set of fixed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    All,
    ByOrganizationId,
    DeleteByOrganizationId,
    DistinctOrganizationIds,
    ByRepositoryId,
    DeleteByRepositoryId,
    ByTeamId,
    ByUserId,
    ByActorId,
    BySubject,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A named parameter slot referenced by a [`QueryTemplate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    OrganizationId,
    RepositoryId,
    TeamId,
    UserId,
    ActorId,
    SubjectType,
    SubjectId,
}

/// A fixed query request: the kind plus its parameters.
///
/// No raw query text ever crosses the store boundary; each entity type
/// supports only the kinds it registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedQuery {
    All,
    ByOrganizationId(String),
    DeleteByOrganizationId(String),
    DistinctOrganizationIds,
    ByRepositoryId(String),
    DeleteByRepositoryId(String),
    ByTeamId(String),
    ByUserId(String),
    ByActorId(String),
    BySubject { subject_type: String, subject_id: String },
}

impl FixedQuery {
    pub fn kind(&self) -> QueryKind {
        match self {
            FixedQuery::All => QueryKind::All,
            FixedQuery::ByOrganizationId(_) => QueryKind::ByOrganizationId,
            FixedQuery::DeleteByOrganizationId(_) => QueryKind::DeleteByOrganizationId,
            FixedQuery::DistinctOrganizationIds => QueryKind::DistinctOrganizationIds,
            FixedQuery::ByRepositoryId(_) => QueryKind::ByRepositoryId,
            FixedQuery::DeleteByRepositoryId(_) => QueryKind::DeleteByRepositoryId,
            FixedQuery::ByTeamId(_) => QueryKind::ByTeamId,
            FixedQuery::ByUserId(_) => QueryKind::ByUserId,
            FixedQuery::ByActorId(_) => QueryKind::ByActorId,
            FixedQuery::BySubject { .. } => QueryKind::BySubject,
        }
    }

    /// The value supplied for `param`, if this query carries one.
    pub fn argument(&self, param: Param) -> Option<&str> {
        match (self, param) {
            (
                FixedQuery::ByOrganizationId(id) | FixedQuery::DeleteByOrganizationId(id),
                Param::OrganizationId,
            )
            | (
                FixedQuery::ByRepositoryId(id) | FixedQuery::DeleteByRepositoryId(id),
                Param::RepositoryId,
            )
            | (FixedQuery::ByTeamId(id), Param::TeamId)
            | (FixedQuery::ByUserId(id), Param::UserId)
            | (FixedQuery::ByActorId(id), Param::ActorId) => Some(id),
            (FixedQuery::BySubject { subject_type, .. }, Param::SubjectType) => Some(subject_type),
            (FixedQuery::BySubject { subject_id, .. }, Param::SubjectId) => Some(subject_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// What a query does with the rows it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAction<F> {
    Select,
    Delete,
    /// Project the distinct non-null values of one field.
    Distinct(F),
}

/// Backend-neutral shape of a fixed query, declared per entity type at
/// registration and written in terms of property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    pub action: QueryAction<&'static str>,
    pub filters: Vec<(&'static str, Param)>,
    pub order_by: Option<(&'static str, Direction)>,
}

impl QueryTemplate {
    pub fn select() -> Self {
        Self {
            action: QueryAction::Select,
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn delete() -> Self {
        Self {
            action: QueryAction::Delete,
            ..Self::select()
        }
    }

    pub fn distinct(property: &'static str) -> Self {
        Self {
            action: QueryAction::Distinct(property),
            ..Self::select()
        }
    }

    /// Require `property` to equal the query's `param` argument.
    pub fn filter(mut self, property: &'static str, param: Param) -> Self {
        self.filters.push((property, param));
        self
    }

    pub fn order_by(mut self, property: &'static str, direction: Direction) -> Self {
        self.order_by = Some((property, direction));
        self
    }

    /// Every property the template refers to.
    pub fn properties(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self.filters.iter().map(|(p, _)| *p).collect();
        if let QueryAction::Distinct(p) = &self.action {
            out.push(p);
        }
        if let Some((p, _)) = &self.order_by {
            out.push(p);
        }
        out
    }

    /// Substitute arguments and translate property names into backend fields.
    pub fn bind(
        &self,
        query: &FixedQuery,
        mapping: &FieldMapping,
        entity_type: EntityType,
        backend: BackendKind,
    ) -> Result<BoundQuery, DataError> {
        let kind = query.kind();
        let field = |property: &str| {
            mapping.field(property).map(str::to_string).ok_or_else(|| {
                DataError::Configuration(format!(
                    "{entity_type}: query {kind} uses unmapped property '{property}' on {backend}"
                ))
            })
        };

        let mut predicates = Vec::with_capacity(self.filters.len());
        for (property, param) in &self.filters {
            let value = query
                .argument(*param)
                .ok_or_else(|| DataError::unsupported(format!("{kind} (missing {param:?})"), entity_type, backend))?;
            predicates.push(Predicate {
                field: field(property)?,
                value: FieldValue::String(value.to_string()),
            });
        }

        let action = match &self.action {
            QueryAction::Select => QueryAction::Select,
            QueryAction::Delete => QueryAction::Delete,
            QueryAction::Distinct(property) => QueryAction::Distinct(field(property)?),
        };

        let order_by = match &self.order_by {
            Some((property, direction)) => Some((field(property)?, *direction)),
            None => None,
        };

        Ok(BoundQuery {
            kind,
            action,
            predicates,
            order_by,
        })
    }
}

/// `field = value` over backend field names.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: FieldValue,
}

impl Predicate {
    pub fn matches(&self, record: &EntityRecord) -> bool {
        record.get(&self.field).matches(&self.value)
    }
}

/// A template with its arguments substituted and its properties mapped:
/// the input every backend compiler works from.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub kind: QueryKind,
    pub action: QueryAction<String>,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<(String, Direction)>,
}

impl BoundQuery {
    pub fn matches(&self, record: &EntityRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Whether the result is rows that must be mapped back into entities.
    pub fn returns_entities(&self) -> bool {
        matches!(self.action, QueryAction::Select)
    }
}

/// Per-entity-type storage coordinates handed to a driver.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub entity_type: EntityType,
    pub backend: BackendKind,
    /// Table or container name.
    pub table: &'a str,
    /// Value of the relational type discriminator column.
    pub type_value: &'a str,
    pub partition_key: &'a str,
    /// Backend field holding the id inside the stored properties.
    pub id_field: &'a str,
}

/// Raw result of executing a bound query.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutput {
    Records(Vec<EntityRecord>),
    Values(Vec<FieldValue>),
    Affected(u64),
}

/// Sort records in place by a field, ties broken by id.
pub fn sort_records(records: &mut [EntityRecord], field: &str, direction: Direction) {
    records.sort_by(|a, b| {
        let ord = a
            .get(field)
            .compare(b.get(field))
            .then_with(|| a.entity_id.cmp(&b.entity_id));
        match direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });
}

/// Distinct non-null values of `field`, sorted.
pub fn distinct_values<'r>(records: impl IntoIterator<Item = &'r EntityRecord>, field: &str) -> Vec<FieldValue> {
    let mut values: Vec<FieldValue> = Vec::new();
    for record in records {
        let value = record.get(field);
        if value.is_null() || values.iter().any(|seen| seen.matches(value)) {
            continue;
        }
        values.push(value.clone());
    }
    values.sort_by(|a, b| a.compare(b));
    values
}
