//! Tests for configuration loading.

use std::path::PathBuf;

use warden::config::{config_path_with, WardenConfig, CONFIG_PATH_ENV};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config =
        WardenConfig::load_from_file(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(config.auth.replay_window_secs, 300);
    assert!(!config.auth.inclusive_boundary);
    assert!(config.runtime.state_db.ends_with("state.db"));
}

#[test]
fn file_sections_are_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("warden.toml");
    std::fs::write(
        &path,
        "[auth]\nreplay_window_secs = 90\ninclusive_boundary = true\n\n[runtime]\nstate_db = \"/tmp/w/state.db\"\n",
    )
    .expect("write config");

    let config = WardenConfig::load_from_file(&path).expect("load");
    assert_eq!(config.auth.replay_window_secs, 90);
    let window = config.auth.replay_window();
    assert_eq!(window.max_skew_secs, 90);
    assert!(window.inclusive);
    assert_eq!(config.runtime.state_db, PathBuf::from("/tmp/w/state.db"));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("warden.toml");
    std::fs::write(&path, "[auth\nreplay_window_secs = ").expect("write config");
    assert!(WardenConfig::load_from_file(&path).is_err());
}

#[test]
fn non_positive_window_fails_validation() {
    let config =
        WardenConfig::from_toml("[auth]\nreplay_window_secs = 0\n").expect("parse");
    assert!(config.validate().is_err());
}

#[test]
fn path_overrides_are_applied() {
    let mut config = WardenConfig::default();
    config.apply_overrides(|key| match key {
        "WARDEN_STATE_DB" => Some("/var/lib/warden/state.db".to_owned()),
        "WARDEN_LOGS_DIR" => Some("/var/log/warden".to_owned()),
        _ => None,
    });
    assert_eq!(
        config.runtime.state_db,
        PathBuf::from("/var/lib/warden/state.db")
    );
    assert_eq!(config.logging.logs_dir, PathBuf::from("/var/log/warden"));
}

#[test]
fn explicit_config_path_wins() {
    let path = config_path_with(|key| (key == CONFIG_PATH_ENV).then(|| "/etc/warden.toml".to_owned()))
        .expect("path");
    assert_eq!(path, PathBuf::from("/etc/warden.toml"));
}
