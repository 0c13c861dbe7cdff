//! Server-side filter expressions for the table service, rendered as OData
//! `$filter` text.

use orgportal_data::{format_date, FieldValue};

use crate::codec;

/// A conjunction of equality conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFilter {
    /// Matches every entity.
    All,
    Eq(String, FieldValue),
    And(Vec<TableFilter>),
}

impl TableFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        TableFilter::Eq(field.into(), value.into())
    }

    /// Combine two filters, flattening nested conjunctions.
    pub fn and(self, other: TableFilter) -> Self {
        match (self, other) {
            (TableFilter::All, f) | (f, TableFilter::All) => f,
            (TableFilter::And(mut left), TableFilter::And(right)) => {
                left.extend(right);
                TableFilter::And(left)
            }
            (TableFilter::And(mut left), f) => {
                left.push(f);
                TableFilter::And(left)
            }
            (f, TableFilter::And(mut right)) => {
                right.insert(0, f);
                TableFilter::And(right)
            }
            (a, b) => TableFilter::And(vec![a, b]),
        }
    }

    /// OData text, or `None` when the filter matches everything.
    pub fn render(&self) -> Option<String> {
        match self {
            TableFilter::All => None,
            TableFilter::Eq(field, value) => Some(format!("{field} eq {}", literal(value))),
            TableFilter::And(parts) => {
                let rendered: Vec<String> = parts.iter().filter_map(TableFilter::render).collect();
                if rendered.is_empty() {
                    None
                } else {
                    Some(rendered.join(" and "))
                }
            }
        }
    }

    /// Evaluate against a stored entity, as the service would.
    pub fn matches(&self, entity: &serde_json::Map<String, serde_json::Value>) -> bool {
        match self {
            TableFilter::All => true,
            TableFilter::Eq(field, value) => codec::read_property(entity, field).matches(value),
            TableFilter::And(parts) => parts.iter().all(|part| part.matches(entity)),
        }
    }
}

/// Render a value as an OData literal. String quotes are doubled.
pub fn literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        FieldValue::Integer(i) => format!("{i}L"),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Date(d) => format!("datetime'{}'", format_date(d)),
    }
}
