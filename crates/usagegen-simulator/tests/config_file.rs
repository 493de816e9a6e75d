//! Loading the generator configuration from YAML files.

use std::io::Write;
use tempfile::NamedTempFile;
use usagegen_simulator::{ConfigError, GeneratorConfig, SinkKind};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
start: "2023-03-01T00:00:00Z"
end: "2023-03-08T00:00:00Z"
step: "1m"
workspace_count: 10
branch_count: 100
seed: 42
walk:
  baseline: 200
  max_delta: 10
  decrease_one_in: 4
sink:
  kind: http
  server_url: "http://tsdb:8086"
  timeout_secs: 5
table:
  name: usage
  ttl: 2d
  bucket: 30m
  rollup: max
logging:
  level: debug
"#,
    );

    let config = GeneratorConfig::load(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.workspace_count, 10);
    assert_eq!(config.branch_count, 100);
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.walk.baseline, 200);
    assert_eq!(config.walk.decrease_one_in, 4);
    assert_eq!(config.sink.kind, SinkKind::Http);
    assert_eq!(config.sink.timeout_secs, 5);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.time_window().unwrap().len(), 7 * 24 * 60);

    let schema = config.table_schema().unwrap();
    assert_eq!(schema.name, "usage");
    assert_eq!(schema.bucket, 30 * 60 * 1_000_000_000);
}

#[test]
fn test_load_or_default_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = GeneratorConfig::load_or_default(&dir.path().join("usagegen.yml")).unwrap();
    assert_eq!(config, GeneratorConfig::default());
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = GeneratorConfig::load(&dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_load_malformed_yaml() {
    let file = write_config("workspace_count: [not, a, number]\n");
    let err = GeneratorConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }));

    let file = write_config("sink:\n  kind: kafka\n");
    assert!(matches!(
        GeneratorConfig::load(file.path()),
        Err(ConfigError::Yaml { .. })
    ));
}
