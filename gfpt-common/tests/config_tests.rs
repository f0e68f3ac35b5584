//! Tests for configuration loading and root folder resolution
//!
//! Tests cover:
//! - Missing or invalid TOML never stops startup (defaults + warning)
//! - Root folder priority: CLI, environment, TOML, platform default
//! - Root folder creation and database path
//!
//! Tests touching GFPT_ROOT_FOLDER are #[serial] to avoid env races.

use gfpt_common::config::{
    default_root_folder, load_toml_config, RootFolderInitializer, RootFolderResolver,
    TomlConfig, DATABASE_FILE, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = TomlConfig::default();

    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.server.bind_host, "127.0.0.1");
    assert_eq!(config.server.port, 5780);
    assert_eq!(config.servicing.poll_interval_secs, 3600);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/gfpt"

        [servicing]
        poll_interval_secs = 600
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/gfpt")));
    assert_eq!(config.servicing.poll_interval_secs, 600);
    assert_eq!(config.server.port, 5780);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_zero_poll_interval_rejected() {
    let result = TomlConfig::from_toml_str("[servicing]\npoll_interval_secs = 0\n");
    assert!(result.is_err());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_toml_config(Some(&dir.path().join("absent.toml")));

    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let config = load_toml_config(Some(&path));

    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = 6000\n\n[logging]\nlevel = \"debug\"\n").unwrap();

    let config = load_toml_config(Some(&path));

    assert_eq!(config.server.port, 6000);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/gfpt-from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gfpt-from-toml")),
        ..TomlConfig::default()
    };

    let resolved =
        RootFolderResolver::new(Some(PathBuf::from("/tmp/gfpt-from-cli")), &toml).resolve();

    assert_eq!(resolved, PathBuf::from("/tmp/gfpt-from-cli"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/gfpt-from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gfpt-from-toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new(None, &toml).resolve();

    assert_eq!(resolved, PathBuf::from("/tmp/gfpt-from-env"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gfpt-from-toml")),
        ..TomlConfig::default()
    };

    assert_eq!(
        RootFolderResolver::new(None, &toml).resolve(),
        PathBuf::from("/tmp/gfpt-from-toml")
    );
    assert_eq!(
        RootFolderResolver::new(None, &TomlConfig::default()).resolve(),
        default_root_folder()
    );
}

#[test]
#[serial]
fn test_custom_env_var_name() {
    env::set_var("GFPT_TEST_ROOT", "/tmp/gfpt-custom-env");

    let resolved = RootFolderResolver::new(None, &TomlConfig::default())
        .with_env_var("GFPT_TEST_ROOT")
        .resolve();

    assert_eq!(resolved, PathBuf::from("/tmp/gfpt-custom-env"));
    env::remove_var("GFPT_TEST_ROOT");
}

#[test]
fn test_initializer_creates_folder() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("gfpt");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE));
    assert_eq!(initializer.root_folder(), root.as_path());
}
