//! 配置模块的集成测试

use sqldump_parser::config::{Config, DEFAULT_BATCH_SIZE, DEFAULT_MAX_LINE_BYTES};
use sqldump_parser::dump::OutputFormat;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.log.level, "info");
    assert!(config.log.log_dir.is_none());
    assert_eq!(config.parser.worker_count, 0);
    assert_eq!(config.parser.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(config.parser.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    assert!(config.parser.preserve_order);
    assert_eq!(config.output.format, OutputFormat::Text);
    assert!(!config.output.split_tables);
}

#[test]
fn test_full_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[log]
level = "debug"
log_dir = "logs"

[parser]
worker_count = 6
batch_size = 500
chunk_threshold_bytes = 4096
max_line_bytes = 1048576
preserve_order = false
pool_capacity = 0
errors_out = "errors.jsonl"

[output]
format = "jsonl"
path = "out"
split_tables = true
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.log_dir.as_deref(), Some("logs"));
    assert_eq!(config.parser.effective_workers(), 6);
    assert_eq!(config.parser.queue_capacity(), 12);
    assert_eq!(config.parser.batch_size, 500);
    assert_eq!(config.parser.chunk_threshold_bytes, 4096);
    assert!(!config.parser.preserve_order);
    assert_eq!(config.parser.errors_out.as_deref(), Some("errors.jsonl"));
    assert_eq!(config.output.format, OutputFormat::Jsonl);
    assert!(config.output.split_tables);
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.toml");

    let mut config = Config::default();
    config.parser.batch_size = 42;
    config.output.format = OutputFormat::Csv;
    config.save_to_file(&path).unwrap();

    let reloaded = Config::from_file(&path).unwrap();
    assert_eq!(reloaded.parser.batch_size, 42);
    assert_eq!(reloaded.output.format, OutputFormat::Csv);
}

#[test]
fn test_invalid_values_rejected() {
    assert!(Config::from_str("[parser]\nbatch_size = 0\n").unwrap_err().is_config_error());
    assert!(Config::from_str("[log]\nlevel = \"loud\"\n").is_err());
    assert!(Config::from_str("[output]\nformat = \"xlsx\"\n").is_err());
    assert!(Config::from_file("/no/such/config.toml").unwrap_err().is_io_error());
}

#[test]
fn test_effective_workers_auto() {
    let config = Config::default();
    assert!(config.parser.effective_workers() >= 1);
    assert_eq!(config.parser.queue_capacity(), config.parser.effective_workers() * 2);
}
