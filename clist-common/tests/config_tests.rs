//! Tests for configuration and graceful degradation
//!
//! Uses serial_test to prevent environment variable races.
//! Tests that manipulate CLIST_ROOT_FOLDER or CLIST_ROOT are marked #[serial].

use clist_common::config::{
    load_toml_config, CompiledDefaults, LoggingConfig, RootFolderInitializer, RootFolderResolver,
    TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn clear_root_env() {
    env::remove_var("CLIST_ROOT_FOLDER");
    env::remove_var("CLIST_ROOT");
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults
        .root_folder
        .to_string_lossy()
        .contains("courtneys-list"));
    assert_eq!(defaults.host, "127.0.0.1");
    assert_eq!(defaults.port, 5830);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    clear_root_env();
    env::set_var("CLIST_ROOT_FOLDER", "/tmp/clist-test-env-folder");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/clist-test-env-folder"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_takes_precedence_over_alias() {
    clear_root_env();
    env::set_var("CLIST_ROOT_FOLDER", "/tmp/clist-priority-1");
    env::set_var("CLIST_ROOT", "/tmp/clist-priority-2");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/clist-priority-1"));

    clear_root_env();
}

#[test]
#[serial]
fn test_cli_arg_beats_environment() {
    clear_root_env();
    env::set_var("CLIST_ROOT_FOLDER", "/tmp/clist-env");

    let root_folder = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/clist-cli")))
        .resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/clist-cli"));

    clear_root_env();
}

#[test]
#[serial]
fn test_explicit_config_file_supplies_root_folder() {
    clear_root_env();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("clist-match.toml");
    std::fs::write(
        &config_path,
        r#"
        root_folder = "/srv/courtneys-list"
        port = 6100

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let resolver = RootFolderResolver::new("test-module").with_config_file(Some(config_path));
    assert_eq!(resolver.resolve(), PathBuf::from("/srv/courtneys-list"));

    let config = resolver.load_config();
    assert_eq!(config.port, Some(6100));
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_malformed_config_file_falls_back_to_default() {
    clear_root_env();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("broken.toml");
    std::fs::write(&config_path, "root_folder = [unterminated").unwrap();

    let resolver = RootFolderResolver::new("test-module").with_config_file(Some(config_path));

    // Should not panic - should return compiled default
    let root_folder = resolver.resolve();
    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
fn test_missing_config_file_is_an_error_only_when_loaded_directly() {
    let err = load_toml_config(&PathBuf::from("/nonexistent/clist/config.toml"));
    assert!(err.is_err());
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/clist-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("clist.db"));
    assert!(!initializer.database_exists());
}

#[test]
fn test_initializer_nested_directory_creation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(initializer.ensure_directory_exists().is_ok());

    assert!(root.is_dir(), "Nested directory was not created");
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/clist")),
        host: Some("0.0.0.0".to_string()),
        port: None,
        logging: LoggingConfig::default(),
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed, config);
}
