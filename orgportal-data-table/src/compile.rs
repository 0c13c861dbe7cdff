use orgportal_data::{BoundQuery, Direction, DriverOutput, EntityRecord, Predicate, QueryAction, QueryContext};

use crate::codec::PARTITION_KEY;
use crate::filter::TableFilter;

/// A fixed query split into the part the service evaluates and the part
/// applied to the returned entities.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub filter: TableFilter,
    /// Predicates the service cannot express (null checks on absent
    /// properties).
    pub post_filter: Vec<Predicate>,
    pub order_by: Option<(String, Direction)>,
    pub action: QueryAction<String>,
}

pub fn compile(ctx: &QueryContext<'_>, query: &BoundQuery) -> TableQuery {
    let mut filter = TableFilter::eq(PARTITION_KEY, ctx.partition_key);
    let mut post_filter = Vec::new();
    for predicate in &query.predicates {
        if predicate.value.is_null() {
            post_filter.push(predicate.clone());
        } else {
            filter = filter.and(TableFilter::Eq(predicate.field.clone(), predicate.value.clone()));
        }
    }
    TableQuery {
        filter,
        post_filter,
        order_by: query.order_by.clone(),
        action: query.action.clone(),
    }
}

impl TableQuery {
    /// Whether any work happens client-side after the service responds.
    pub fn needs_client_side(&self) -> bool {
        !self.post_filter.is_empty() || self.order_by.is_some() || matches!(self.action, QueryAction::Distinct(_))
    }

    pub fn keep(&self, record: &EntityRecord) -> bool {
        self.post_filter.iter().all(|p| p.matches(record))
    }

    /// Shape the fetched records for a select or distinct query.
    pub fn finish(&self, records: Vec<EntityRecord>) -> DriverOutput {
        let mut records: Vec<EntityRecord> = records.into_iter().filter(|r| self.keep(r)).collect();
        match &self.action {
            QueryAction::Distinct(field) => {
                DriverOutput::Values(orgportal_data::query::distinct_values(&records, field))
            }
            _ => {
                if let Some((field, direction)) = &self.order_by {
                    orgportal_data::query::sort_records(&mut records, field, *direction);
                }
                DriverOutput::Records(records)
            }
        }
    }
}
