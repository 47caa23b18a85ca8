//! Loading `medusa.toml` from disk.

use std::path::Path;

use medusa::config::load_config;
use medusa::types::Answer;

#[test]
fn load_config_from_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("medusa.toml");
    std::fs::write(
        &path,
        "[logging]\nlevel = \"warn\"\n\n[audit]\npath = \"/tmp/audit.jsonl\"\n",
    )
    .expect("write config");

    let config = load_config(&path).expect("should load");

    assert_eq!(config.logging.level, "warn");
    assert_eq!(
        config.audit.path.as_deref(),
        Some(Path::new("/tmp/audit.jsonl"))
    );
    assert_eq!(config.authority.default_answer, Answer::Deny);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = load_config(&dir.path().join("absent.toml")).expect_err("missing");
    assert!(err.to_string().contains("failed to read config"));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("medusa.toml");
    std::fs::write(&path, "[logging\nlevel = 3").expect("write config");

    let err = load_config(&path).expect_err("malformed");
    assert!(err.to_string().contains("failed to parse config"));
}
