//! Integration tests for Settings loading with layered precedence.
//!
//! These tests only use temp directories as the local layer; a global config
//! on the test machine would sit below them.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use pyebwa::application::ApplicationError;
use pyebwa::config::{local_config_path, Settings};
use pyebwa::domain::ViewMode;

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        r#"
data_file = "/srv/family/members.json"
default_view = "hourglass"
max_depth = 6
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(
        settings.data_file,
        Some(PathBuf::from("/srv/family/members.json"))
    );
    assert_eq!(settings.view_mode().unwrap(), ViewMode::Hourglass);
    assert_eq!(settings.max_depth, Some(6));
}

#[test]
fn given_empty_directory_when_load_then_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert!(settings.validate().is_ok());
    assert!(settings.data_file.is_none());
}

#[test]
fn given_invalid_view_in_local_config_when_load_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "default_view = \"sideways\"\n").unwrap();

    // Act
    let result = Settings::load(Some(dir.path()));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_unparsable_local_config_when_load_then_config_error_names_file() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = local_config_path(dir.path());
    fs::write(&path, "max_depth = [not toml").unwrap();

    // Act
    let result = Settings::load(Some(dir.path()));

    // Assert
    match result {
        Err(ApplicationError::Config { message }) => {
            assert!(message.contains(".pyebwa.toml"), "{message}")
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_env_override_when_load_then_env_wins_over_local_config() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "generation_span_years = 30\n").unwrap();
    std::env::set_var("PYEBWA_GENERATION_SPAN_YEARS", "20");

    // Act
    let result = Settings::load(Some(dir.path()));
    std::env::remove_var("PYEBWA_GENERATION_SPAN_YEARS");

    // Assert
    assert_eq!(result.unwrap().generation_span_years, 20);
}

#[test]
fn given_template_when_parsed_then_valid_toml_with_defaults() {
    // Act
    let settings: Settings = toml::from_str(&Settings::template()).unwrap();

    // Assert
    assert_eq!(settings, Settings::default());
}
