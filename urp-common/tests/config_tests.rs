//! Configuration loading tests
//!
//! Covers:
//! - explicit config file loading and error reporting
//! - graceful fallback to compiled defaults when no file exists
//! - default location lookup under the user config directory
//!
//! Note: tests that change XDG_CONFIG_HOME are marked #[serial] so they do
//! not race each other.

use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use urp_common::config::{load_config, DEFAULT_BIND};
use urp_common::Error;

const SAMPLE: &str = r#"
routes_file = "/etc/urp/routes.toml"

[database]
url = "postgres://urp@db.internal/rats"
connect_timeout_ms = 250

[server]
bind = "0.0.0.0:8080"

[logging]
level = "debug"
"#;

#[test]
fn test_explicit_file_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, SAMPLE).unwrap();

    let config = load_config(Some(&path)).unwrap();

    assert_eq!(config.database.url.as_deref(), Some("postgres://urp@db.internal/rats"));
    assert_eq!(config.database.connect_timeout_ms, 250);
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.routes_file.as_deref(),
        Some(std::path::Path::new("/etc/urp/routes.toml"))
    );
}

#[test]
fn test_explicit_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    let result = load_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("not found")));
}

#[test]
fn test_explicit_malformed_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server\nbind = 1").unwrap();

    let result = load_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_default_location_used_when_present() {
    let dir = TempDir::new().unwrap();
    let urp_dir = dir.path().join("urp");
    fs::create_dir_all(&urp_dir).unwrap();
    fs::write(urp_dir.join("config.toml"), "[server]\nbind = \"127.0.0.1:9999\"\n").unwrap();

    env::set_var("XDG_CONFIG_HOME", dir.path());
    let config = load_config(None);
    env::remove_var("XDG_CONFIG_HOME");

    let config = config.unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:9999");
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_no_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();

    env::set_var("XDG_CONFIG_HOME", dir.path());
    let config = load_config(None);
    env::remove_var("XDG_CONFIG_HOME");

    // /etc/urp/config.toml may exist on a developer machine
    if std::path::Path::new("/etc/urp/config.toml").exists() {
        return;
    }
    let config = config.unwrap();
    assert_eq!(config.server.bind, DEFAULT_BIND);
    assert_eq!(config.database.connect_timeout_ms, 1000);
}
