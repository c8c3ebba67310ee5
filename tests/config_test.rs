use participants::config::*;
use participants::errors::ParticipantsError;
use tempfile::TempDir;

#[test]
fn test_default_config_matches_identity_file_format() {
    let config = ParticipantsConfig::default();
    assert_eq!(config.id_prefix, "PID:");
    assert_eq!(config.id_width, 6);
    assert_eq!(config.tombstone_type, "replaced_by");
    assert_eq!(config.indent, 3);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, ParticipantsConfig::default());
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILENAME);
    let config = ParticipantsConfig {
        id_prefix: "P-".to_string(),
        id_width: 8,
        ..ParticipantsConfig::default()
    };
    save_config(&path, &config).unwrap();
    assert_eq!(load_config(&path).unwrap(), config);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"indent": 2}"#).unwrap();
    let config = load_config(&path).unwrap();
    assert_eq!(config.indent, 2);
    assert_eq!(config.id_prefix, "PID:");
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"id_width": 0}"#).unwrap();
    assert!(matches!(
        load_config(&path),
        Err(ParticipantsError::Config { .. })
    ));

    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        load_config(&path),
        Err(ParticipantsError::Config { .. })
    ));
}

#[test]
fn test_default_config_path_is_namespaced() {
    if let Some(path) = default_config_path() {
        assert!(path.ends_with("participants/config.json"));
    }
}

#[test]
fn test_save_config_leaves_sibling_tmp_file_intact() {
    let dir = TempDir::new().unwrap();
    let sibling = dir.path().join("config.tmp");
    std::fs::write(&sibling, "keep me").unwrap();

    let path = dir.path().join("config.json");
    save_config(&path, &ParticipantsConfig::default()).unwrap();

    assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "keep me");
    assert_eq!(load_config(&path).unwrap(), ParticipantsConfig::default());
}
