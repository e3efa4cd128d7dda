//! Integration tests for environment variable fallback.
//!
//! Tests that modify the process environment are marked with `#[serial]` so
//! they never observe each other's variables. Tests that pass an explicit
//! map run in parallel.

mod common;

use common::{env, EnvGuard};
use hocon::{ConfigBuilder, Environment};
use serial_test::serial;

#[test]
#[serial]
fn test_system_env_resolves_missing_reference() {
    let _guard = EnvGuard::set("HOCON_IT_DB_HOST", "db.internal");
    let config = ConfigBuilder::new()
        .with_system_env()
        .parse_str("database.host = ${HOCON_IT_DB_HOST}")
        .unwrap();
    assert_eq!(config.get_string("database.host").unwrap(), "db.internal");
}

#[test]
#[serial]
fn test_system_env_is_not_consulted_by_default() {
    let _guard = EnvGuard::set("HOCON_IT_SECRET", "s3cret");
    let err = ConfigBuilder::new()
        .parse_str("secret = ${HOCON_IT_SECRET}")
        .unwrap_err();
    assert!(err.is_substitution_error());
}

#[test]
#[serial]
fn test_optional_reference_to_unset_variable() {
    let _guard = EnvGuard::remove("HOCON_IT_PORT");
    let config = ConfigBuilder::new()
        .with_system_env()
        .parse_str("port = 8080\nport = ${?HOCON_IT_PORT}")
        .unwrap();
    assert_eq!(config.get_int("port").unwrap(), 8080);
}

#[test]
#[serial]
fn test_prefixed_environment_layer_overrides_document() {
    let _port = EnvGuard::set("HOCON_IT_APP_SERVER_PORT", "9443");
    let _name = EnvGuard::set("HOCON_IT_APP_NAME", "from-env");

    let layer = Environment::capture().prefixed_layer("HOCON_IT_APP_", "_");
    let config = ConfigBuilder::new()
        .with_override(layer)
        .parse_str("name = doc\nserver { host = localhost, port = 80 }")
        .unwrap();

    assert_eq!(config.get_string("name").unwrap(), "from-env");
    assert_eq!(config.get_int("server.port").unwrap(), 9443);
    assert_eq!(config.get_string("server.host").unwrap(), "localhost");
}

#[test]
fn test_explicit_map_uses_last_path_segment() {
    let config = ConfigBuilder::new()
        .with_env(env(&[("USER", "alice")]))
        .parse_str("owner = ${build.USER}\ngreeting = hi ${USER}")
        .unwrap();
    assert_eq!(config.get_string("owner").unwrap(), "alice");
    assert_eq!(config.get_string("greeting").unwrap(), "hi alice");
}

#[test]
fn test_document_value_wins_over_environment() {
    let config = ConfigBuilder::new()
        .with_env(env(&[("USER", "env-user")]))
        .parse_str("USER = doc-user\nowner = ${USER}")
        .unwrap();
    assert_eq!(config.get_string("owner").unwrap(), "doc-user");
}

#[test]
fn test_environment_flat_layer_as_fallback() {
    let vars = Environment::from_map([("LANG", "C.UTF-8")]);
    let config = ConfigBuilder::new()
        .with_fallback(vars.as_layer())
        .parse_str("locale = ${LANG}")
        .unwrap();
    assert_eq!(config.get_string("locale").unwrap(), "C.UTF-8");
    assert_eq!(config.get_string("LANG").unwrap(), "C.UTF-8");
}
