//! Configuration resolution against the real process environment and TOML files

use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use vettrack_common::config::{ConfigOverrides, ServiceConfig, TomlConfig};
use vettrack_common::Error;

const ENV_VARS: [&str; 6] = [
    "VETTRACK_ROOT",
    "VETTRACK_PORT",
    "VETTRACK_BIND",
    "GEMINI_API_KEY",
    "MURF_API_KEY",
    "VETTRACK_VIDEO_URL",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_explicit_config_file_is_loaded() {
    clear_env();
    let file = write_toml(
        r#"
        root_folder = "/srv/vettrack"
        port = 8088
        gemini_api_key = "toml-gemini"
        video_base_url = "https://video.example.org"
        "#,
    );

    let overrides = ConfigOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(&overrides).unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/srv/vettrack"));
    assert_eq!(config.port, 8088);
    assert_eq!(config.gemini.api_key.as_deref(), Some("toml-gemini"));
    assert_eq!(config.video_base_url, "https://video.example.org");
}

#[test]
#[serial]
fn test_environment_overrides_config_file() {
    clear_env();
    let file = write_toml("port = 8088\nmurf_api_key = \"toml-murf\"\n");
    std::env::set_var("VETTRACK_PORT", "9099");
    std::env::set_var("MURF_API_KEY", "env-murf");

    let overrides = ConfigOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(&overrides).unwrap();
    clear_env();

    assert_eq!(config.port, 9099);
    assert_eq!(config.murf.api_key.as_deref(), Some("env-murf"));
}

#[test]
#[serial]
fn test_malformed_config_file_is_an_error() {
    clear_env();
    let file = write_toml("port = \"not a number\"\n[[[");

    let overrides = ConfigOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let result = ServiceConfig::resolve(&overrides);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let result = TomlConfig::load(&PathBuf::from("/nonexistent/vettrack/config.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_derived_paths() {
    let config = ServiceConfig::with_root("/data/vt");
    assert_eq!(config.database_path(), PathBuf::from("/data/vt/vettrack.db"));
    assert_eq!(config.uploads_dir(), PathBuf::from("/data/vt/uploads"));
}

#[test]
fn test_ensure_directories_creates_uploads() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = ServiceConfig::with_root(dir.path().join("root"));
    config.ensure_directories().unwrap();
    assert!(config.uploads_dir().is_dir());
}
