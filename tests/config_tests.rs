use lesson_engine::{BonusConfig, ConfigError, EngineConfig};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn partial_config_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "bonus": {{ "first_time_coins": 4, "streak": {{ "threshold": 5 }} }}, "log_level": "debug" }}"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = EngineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.bonus.first_time_coins, 4);
    assert_eq!(config.bonus.streak.threshold, 5);
    assert_eq!(config.bonus.streak.min_score, 80.0);
    assert_eq!(
        config.bonus.milestone_coins,
        BonusConfig::default().milestone_coins
    );
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.http_addr, "0.0.0.0:3000");
    assert!(config.database_path.is_none());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn malformed_file_is_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    file.flush().unwrap();

    let err = EngineConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
