use orgportal_core::config::{
    validate_section, ConfigError, ConfigProperties, PortalConfig, PropertyMeta,
};
use serial_test::serial;

fn yaml(text: &str) -> PortalConfig {
    PortalConfig::from_yaml_str(text, "test").unwrap()
}

#[test]
fn test_missing_key() {
    let config = yaml("app: {}");
    assert!(matches!(
        config.get::<String>("nonexistent"),
        Err(ConfigError::NotFound(_))
    ));
    assert_eq!(config.get_opt::<String>("nonexistent").unwrap(), None);
}

#[test]
fn test_type_conversions() {
    let config = yaml(
        r#"
int_val: 42
str_int: "17"
bool_str: "yes"
null_val: ~
"#,
    );
    assert_eq!(config.get::<i64>("int_val").unwrap(), 42);
    assert_eq!(config.get::<u32>("str_int").unwrap(), 17);
    assert!(config.get::<bool>("bool_str").unwrap());
    assert_eq!(config.get::<String>("int_val").unwrap(), "42");
    assert!(config.get::<Option<String>>("null_val").unwrap().is_none());
}

#[test]
fn test_integer_out_of_range() {
    let config = yaml("port: 70000");
    assert!(matches!(
        config.get::<u16>("port"),
        Err(ConfigError::TypeMismatch { .. })
    ));
}

#[test]
fn test_comma_separated_list() {
    let config = yaml(r#"orgs: "alpha, beta,,gamma""#);
    let orgs: Vec<String> = config.get("orgs").unwrap();
    assert_eq!(orgs, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
app:
  storage:
    backend: postgres
    postgres:
      url: "postgres://localhost/portal"
      connections: 5
    tables:
      TeamSnapshot: teamcache
      RepositorySnapshot: repocache
"#;
    let config = PortalConfig::from_yaml_str(yaml, "test").unwrap();

    assert_eq!(config.get::<String>("app.storage.backend").unwrap(), "postgres");
    assert_eq!(config.get::<u32>("app.storage.postgres.connections").unwrap(), 5);

    let tables: Vec<(String, String)> = config.entries("app.storage.tables").unwrap();
    assert_eq!(
        tables,
        vec![
            ("RepositorySnapshot".to_string(), "repocache".to_string()),
            ("TeamSnapshot".to_string(), "teamcache".to_string()),
        ]
    );
    // direct children only
    let postgres: Vec<(String, String)> = config.entries("app.storage").unwrap();
    assert_eq!(postgres, vec![("backend".to_string(), "postgres".to_string())]);
}

#[test]
fn test_list_indexed_access() {
    let yaml = r#"
app:
  organizations:
    - "contoso"
    - "fabrikam"
"#;
    let config = PortalConfig::from_yaml_str(yaml, "test").unwrap();
    let orgs: Vec<String> = config.get("app.organizations").unwrap();
    assert_eq!(orgs, vec!["contoso", "fabrikam"]);
    assert_eq!(config.get::<String>("app.organizations.1").unwrap(), "fabrikam");
}

#[test]
fn test_invalid_yaml_is_a_load_error() {
    let err = PortalConfig::from_yaml_str("app: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_entries_report_type_mismatch_with_full_key() {
    let config = yaml("app:\n  limits:\n    teams: 10\n    repos: many\n");
    let err = config.entries::<u32>("app.limits").unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch { ref key, .. } if key == "app.limits.repos"));
}

#[derive(Debug)]
struct PoolSettings {
    url: String,
    connections: u32,
}

impl ConfigProperties for PoolSettings {
    fn prefix() -> &'static str {
        "app.pool"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::required("app.pool.url", "String", "connection string"),
            PropertyMeta::optional("app.pool.connections", "u32", "pool size").with_default(10),
        ]
    }

    fn from_config(config: &PortalConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            url: config.get("app.pool.url")?,
            connections: config.get_opt("app.pool.connections")?.unwrap_or(10),
        })
    }
}

#[test]
fn test_section_with_default() {
    let config = yaml("app:\n  pool:\n    url: \"postgres://db\"\n");
    let pool = validate_section::<PoolSettings>(&config).unwrap();
    assert_eq!(pool.url, "postgres://db");
    assert_eq!(pool.connections, 10);
}

#[test]
fn test_validate_section_missing_required() {
    let err = validate_section::<PoolSettings>(&yaml("app: {}")).unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].key, "app.pool.url");
    assert!(err.to_string().contains("APP_POOL_URL"));
}

#[test]
fn test_validate_section_type_mismatch() {
    let yaml = r#"
app:
  pool:
    url: "postgres://db"
    connections: "many"
"#;
    let config = PortalConfig::from_yaml_str(yaml, "test").unwrap();
    let err = validate_section::<PoolSettings>(&config).unwrap_err();
    assert_eq!(err.errors[0].key, "app.pool.connections");
}

#[test]
#[serial]
fn test_load_from_directory_with_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("application.yaml"),
        "app:\n  storage:\n    backend: memory\n    postgres:\n      table: base\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("application-prod.yaml"),
        "app:\n  storage:\n    postgres:\n      table: prod\n      url: \"${PORTAL_TEST_DB_URL}\"\n",
    )
    .unwrap();

    std::env::set_var("PORTAL_TEST_DB_URL", "postgres://prod-db/portal");
    std::env::set_var("APP_STORAGE_BACKEND", "postgres");
    std::env::remove_var("PORTAL_PROFILE");

    let config = PortalConfig::load_from(
        dir.path(),
        "prod",
        &orgportal_core::DefaultSecretResolver,
    )
    .unwrap();

    std::env::remove_var("PORTAL_TEST_DB_URL");
    std::env::remove_var("APP_STORAGE_BACKEND");

    assert_eq!(config.profile(), "prod");
    assert_eq!(config.get::<String>("app.storage.backend").unwrap(), "postgres");
    assert_eq!(config.get::<String>("app.storage.postgres.table").unwrap(), "prod");
    assert_eq!(
        config.get::<String>("app.storage.postgres.url").unwrap(),
        "postgres://prod-db/portal"
    );
}
