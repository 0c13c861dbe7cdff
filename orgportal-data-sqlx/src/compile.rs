//! Translation of bound fixed queries and point operations into
//! PostgreSQL statements over the shared `(entitytype, entityid, metadata)`
//! document table.

use orgportal_data::{is_valid_identifier, BoundQuery, DataError, Direction, EntityRecord, QueryAction, QueryContext};

/// Table shared by every entity type unless configured otherwise.
pub const DEFAULT_TABLE: &str = "entitymetadata";

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Json(serde_json::Value),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

/// What executing a statement yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOutput {
    /// `entityid, metadata` rows to be mapped back into entities.
    Rows,
    /// A single `value` column.
    Scalars,
    /// Only the number of affected rows.
    Affected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub output: SqlOutput,
}

fn checked_table<'a>(ctx: &QueryContext<'a>) -> Result<&'a str, DataError> {
    if is_valid_identifier(ctx.table) {
        Ok(ctx.table)
    } else {
        Err(DataError::Configuration(format!(
            "{}: '{}' is not a valid table name",
            ctx.entity_type, ctx.table
        )))
    }
}

fn document_field(ctx: &QueryContext<'_>, field: &str) -> Result<String, DataError> {
    if is_valid_identifier(field) {
        Ok(format!("metadata->>'{field}'"))
    } else {
        Err(DataError::Configuration(format!(
            "{}: '{field}' is not a valid document field",
            ctx.entity_type
        )))
    }
}

/// Compile a bound fixed query.
///
/// Argument values are always bound, never interpolated; a `Null`
/// argument compiles to `IS NULL`.
pub fn compile(ctx: &QueryContext<'_>, query: &BoundQuery) -> Result<SqlStatement, DataError> {
    let table = checked_table(ctx)?;
    let mut params = vec![SqlParam::from(ctx.type_value)];

    let (mut sql, output) = match &query.action {
        QueryAction::Select => (
            format!("SELECT entityid, metadata FROM {table} WHERE entitytype = $1"),
            SqlOutput::Rows,
        ),
        QueryAction::Delete => (
            format!("DELETE FROM {table} WHERE entitytype = $1"),
            SqlOutput::Affected,
        ),
        QueryAction::Distinct(field) => {
            let column = document_field(ctx, field)?;
            (
                format!(
                    "SELECT DISTINCT {column} COLLATE \"C\" AS value FROM {table} WHERE entitytype = $1 AND {column} IS NOT NULL"
                ),
                SqlOutput::Scalars,
            )
        }
    };

    for predicate in &query.predicates {
        let column = document_field(ctx, &predicate.field)?;
        match predicate.value.as_text() {
            Some(text) => {
                params.push(SqlParam::Text(text));
                sql.push_str(&format!(" AND {column} = ${}", params.len()));
            }
            None => sql.push_str(&format!(" AND {column} IS NULL")),
        }
    }

    match (&query.action, &query.order_by) {
        (QueryAction::Select, Some((field, direction))) => {
            let column = document_field(ctx, field)?;
            let direction = match direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            // Byte-wise collation, matching the ordering of the other backends.
            sql.push_str(&format!(" ORDER BY {column} COLLATE \"C\" {direction}"));
        }
        (QueryAction::Distinct(_), _) => sql.push_str(" ORDER BY value"),
        _ => {}
    }

    Ok(SqlStatement { sql, params, output })
}

pub fn select_by_id(ctx: &QueryContext<'_>, id: &str) -> Result<SqlStatement, DataError> {
    let table = checked_table(ctx)?;
    Ok(SqlStatement {
        sql: format!("SELECT entityid, metadata FROM {table} WHERE entitytype = $1 AND entityid = $2"),
        params: vec![ctx.type_value.into(), id.into()],
        output: SqlOutput::Rows,
    })
}

pub fn insert(ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<SqlStatement, DataError> {
    let table = checked_table(ctx)?;
    Ok(SqlStatement {
        sql: format!("INSERT INTO {table} (entitytype, entityid, metadata) VALUES ($1, $2, $3)"),
        params: vec![
            ctx.type_value.into(),
            record.entity_id.as_str().into(),
            SqlParam::Json(record.to_document()),
        ],
        output: SqlOutput::Affected,
    })
}

pub fn replace(ctx: &QueryContext<'_>, record: &EntityRecord) -> Result<SqlStatement, DataError> {
    let table = checked_table(ctx)?;
    Ok(SqlStatement {
        sql: format!("UPDATE {table} SET metadata = $3 WHERE entitytype = $1 AND entityid = $2"),
        params: vec![
            ctx.type_value.into(),
            record.entity_id.as_str().into(),
            SqlParam::Json(record.to_document()),
        ],
        output: SqlOutput::Affected,
    })
}

pub fn delete_by_id(ctx: &QueryContext<'_>, id: &str) -> Result<SqlStatement, DataError> {
    let table = checked_table(ctx)?;
    Ok(SqlStatement {
        sql: format!("DELETE FROM {table} WHERE entitytype = $1 AND entityid = $2"),
        params: vec![ctx.type_value.into(), id.into()],
        output: SqlOutput::Affected,
    })
}
