use orgportal_data::{
    BackendKind, BoundQuery, Direction, EntityRecord, EntityType, FieldValue, Predicate, QueryAction,
    QueryContext, QueryKind,
};
use orgportal_data_sqlx::compile::{self, SqlOutput, SqlParam};

const TEAM: EntityType = EntityType::new("TeamSnapshot");

fn ctx(table: &str) -> QueryContext<'_> {
    QueryContext {
        entity_type: TEAM,
        backend: BackendKind::Postgres,
        table,
        type_value: "TeamSnapshot",
        partition_key: "TeamSnapshot",
        id_field: "teamid",
    }
}

fn by_org(kind: QueryKind, action: QueryAction<String>, org: &str) -> BoundQuery {
    BoundQuery {
        kind,
        action,
        predicates: vec![Predicate {
            field: "organizationid".into(),
            value: org.into(),
        }],
        order_by: None,
    }
}

fn text(s: &str) -> SqlParam {
    SqlParam::Text(s.to_string())
}

#[test]
fn test_select_all() {
    let query = BoundQuery {
        kind: QueryKind::All,
        action: QueryAction::Select,
        predicates: vec![],
        order_by: None,
    };
    let stmt = compile::compile(&ctx("entitymetadata"), &query).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT entityid, metadata FROM entitymetadata WHERE entitytype = $1"
    );
    assert_eq!(stmt.params, vec![text("TeamSnapshot")]);
    assert_eq!(stmt.output, SqlOutput::Rows);
}

#[test]
fn test_select_by_property_binds_value() {
    let query = by_org(QueryKind::ByOrganizationId, QueryAction::Select, "A' OR '1'='1");
    let stmt = compile::compile(&ctx("entitymetadata"), &query).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT entityid, metadata FROM entitymetadata WHERE entitytype = $1 AND metadata->>'organizationid' = $2"
    );
    assert_eq!(stmt.params, vec![text("TeamSnapshot"), text("A' OR '1'='1")]);
}

#[test]
fn test_ordering() {
    let mut query = by_org(QueryKind::ByOrganizationId, QueryAction::Select, "A");
    query.order_by = Some(("created".into(), Direction::Descending));
    let stmt = compile::compile(&ctx("audit"), &query).unwrap();
    assert!(stmt
        .sql
        .ends_with("AND metadata->>'organizationid' = $2 ORDER BY metadata->>'created' COLLATE \"C\" DESC"));
}

#[test]
fn test_delete_by_property() {
    let query = by_org(QueryKind::DeleteByOrganizationId, QueryAction::Delete, "A");
    let stmt = compile::compile(&ctx("entitymetadata"), &query).unwrap();
    assert_eq!(
        stmt.sql,
        "DELETE FROM entitymetadata WHERE entitytype = $1 AND metadata->>'organizationid' = $2"
    );
    assert_eq!(stmt.output, SqlOutput::Affected);
}

#[test]
fn test_distinct_projection() {
    let query = BoundQuery {
        kind: QueryKind::DistinctOrganizationIds,
        action: QueryAction::Distinct("organizationid".into()),
        predicates: vec![],
        order_by: None,
    };
    let stmt = compile::compile(&ctx("entitymetadata"), &query).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT DISTINCT metadata->>'organizationid' COLLATE \"C\" AS value FROM entitymetadata \
         WHERE entitytype = $1 AND metadata->>'organizationid' IS NOT NULL ORDER BY value"
    );
    assert_eq!(stmt.output, SqlOutput::Scalars);
}

#[test]
fn test_null_predicate_has_no_parameter() {
    let query = BoundQuery {
        kind: QueryKind::ByTeamId,
        action: QueryAction::Select,
        predicates: vec![
            Predicate {
                field: "teamid".into(),
                value: FieldValue::Null,
            },
            Predicate {
                field: "repositoryid".into(),
                value: FieldValue::Integer(7),
            },
        ],
        order_by: None,
    };
    let stmt = compile::compile(&ctx("entitymetadata"), &query).unwrap();
    assert!(stmt
        .sql
        .ends_with("AND metadata->>'teamid' IS NULL AND metadata->>'repositoryid' = $2"));
    assert_eq!(stmt.params, vec![text("TeamSnapshot"), text("7")]);
}

#[test]
fn test_rejects_unsafe_identifiers() {
    let query = by_org(QueryKind::ByOrganizationId, QueryAction::Select, "A");
    assert!(compile::compile(&ctx("metadata; drop table x"), &query).is_err());

    let mut query = query;
    query.predicates[0].field = "org'id".into();
    let err = compile::compile(&ctx("entitymetadata"), &query).unwrap_err();
    assert!(err.to_string().contains("org'id"));
}

#[test]
fn test_point_statements() {
    let record = EntityRecord::new(TEAM, "t-1").with("teamid", "t-1").with("name", "Core");
    let c = ctx("entitymetadata");

    let insert = compile::insert(&c, &record).unwrap();
    assert_eq!(
        insert.sql,
        "INSERT INTO entitymetadata (entitytype, entityid, metadata) VALUES ($1, $2, $3)"
    );
    assert_eq!(
        insert.params[2],
        SqlParam::Json(serde_json::json!({"teamid": "t-1", "name": "Core"}))
    );

    let get = compile::select_by_id(&c, "t-1").unwrap();
    assert!(get.sql.ends_with("WHERE entitytype = $1 AND entityid = $2"));
    assert_eq!(get.params, vec![text("TeamSnapshot"), text("t-1")]);

    let update = compile::replace(&c, &record).unwrap();
    assert!(update.sql.starts_with("UPDATE entitymetadata SET metadata = $3"));

    let delete = compile::delete_by_id(&c, "t-1").unwrap();
    assert_eq!(
        delete.sql,
        "DELETE FROM entitymetadata WHERE entitytype = $1 AND entityid = $2"
    );
}
