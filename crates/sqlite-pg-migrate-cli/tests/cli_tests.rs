//! CLI integration tests for sqlite-pg-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that occur before any database
//! connection is needed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the sqlite-pg-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("sqlite-pg-migrate").unwrap()
}

/// Write a config file whose source path does not exist.
fn config_file(extra: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  path: /nonexistent/sqlite-pg-migrate/db.sqlite").unwrap();
    writeln!(file, "target:").unwrap();
    writeln!(file, "  database: movies_database").unwrap();
    writeln!(file, "  user: app").unwrap();
    writeln!(file, "  password: secret").unwrap();
    write!(file, "{}", extra).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("health-check"))
        .stdout(predicate::str::contains("tables"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--table"))
        .stdout(predicate::str::contains("--batch-size"))
        .stdout(predicate::str::contains("--workers"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sqlite-pg-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--env"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Tables Command
// =============================================================================

#[test]
fn test_tables_lists_registry_without_config() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "tables"])
        .assert()
        .success()
        .stdout(predicate::str::contains("genre"))
        .stdout(predicate::str::contains("film_work"))
        .stdout(predicate::str::contains("person"))
        .stdout(predicate::str::contains("conflict: (film_work_id, genre_id)"))
        .stdout(predicate::str::contains("conflict: (film_work_id, person_id)"));
}

#[test]
fn test_tables_json_output() {
    let output = cmd()
        .args(["--output-json", "tables"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let tables: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let tables = tables.as_array().unwrap();
    assert_eq!(tables.len(), 5);
    assert_eq!(tables[0]["name"], "genre");
    assert_eq!(tables[0]["conflict_key"][0], "id");
    assert_eq!(tables[1]["fields"][3]["type"], "date");
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  path: db.sqlite").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_unsupported_ssl_mode_exits_with_code_1() {
    let file = config_file("  ssl_mode: require\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ssl_mode"));
}

#[test]
fn test_unknown_table_exits_with_code_6() {
    let file = config_file("");

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "run",
            "--table",
            "movies",
        ])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Unknown table: movies"));
}

#[test]
fn test_zero_batch_size_exits_with_code_1() {
    let file = config_file("");

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "run",
            "--batch-size",
            "0",
        ])
        .assert()
        .code(1);
}

#[test]
fn test_missing_source_file_exits_with_code_3() {
    let file = config_file("");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run", "--dry-run"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not exist"));
}
