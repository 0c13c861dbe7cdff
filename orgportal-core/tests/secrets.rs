use orgportal_core::config::secrets::{resolve_placeholders, DefaultSecretResolver};
use serial_test::serial;

#[test]
#[serial]
fn test_env_var_resolution() {
    std::env::set_var("PORTAL_TEST_SAS", "sv=2019&sig=abc");
    let result = resolve_placeholders("${PORTAL_TEST_SAS}", &DefaultSecretResolver).unwrap();
    assert_eq!(result, "sv=2019&sig=abc");
    std::env::remove_var("PORTAL_TEST_SAS");
}

#[test]
#[serial]
fn test_explicit_env_resolution_inside_text() {
    std::env::set_var("PORTAL_TEST_ACCOUNT", "contoso");
    let result = resolve_placeholders(
        "https://${env:PORTAL_TEST_ACCOUNT}.table.core.windows.net",
        &DefaultSecretResolver,
    )
    .unwrap();
    assert_eq!(result, "https://contoso.table.core.windows.net");
    std::env::remove_var("PORTAL_TEST_ACCOUNT");
}

#[test]
fn test_missing_env_var() {
    let result = resolve_placeholders("${PORTAL_TEST_DEFINITELY_UNSET}", &DefaultSecretResolver);
    assert!(result.is_err());
}

#[test]
fn test_file_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let secret_file = dir.path().join("sas.txt");
    std::fs::write(&secret_file, "sv=2019&sig=xyz\n").unwrap();

    let reference = format!("${{file:{}}}", secret_file.display());
    let result = resolve_placeholders(&reference, &DefaultSecretResolver).unwrap();
    assert_eq!(result, "sv=2019&sig=xyz");
}
