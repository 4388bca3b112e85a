//! CLI integration tests for schemaforge.
//!
//! These tests verify argument parsing, help output, exit codes, and the
//! inspect / drop-generated / health-check commands against the in-memory
//! catalog provider.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

const SHOP_FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemaforge/tests/fixtures/postgres_shop.yaml"
);

/// Get a command for the schemaforge binary.
fn cmd() -> Command {
    Command::cargo_bin("schemaforge").unwrap()
}

/// Write a memory-provider config pointing at `catalog`.
fn memory_config(catalog: &Path) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
database:
  provider: memory
  catalog_file: {}
generation:
  excluded_schemas: [audit]
"#,
        catalog.display()
    )
    .unwrap();
    file
}

fn shop_config() -> NamedTempFile {
    memory_config(Path::new(SHOP_FIXTURE))
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
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("drop-generated"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_inspect_subcommand_help() {
    cmd()
        .args(["inspect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--type-filter"));
}

#[test]
fn test_drop_generated_requires_previous() {
    cmd()
        .args(["drop-generated"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--previous"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schemaforge"));
}

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: schemaforge.yaml]"));
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[test]
fn test_missing_config_file() {
    cmd()
        .args(["--config", "/nonexistent/schemaforge.yaml", "inspect"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_config_exit_code() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "database:\n  provider: memory").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "inspect"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("catalog_file"));
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_inspect_prints_domain() {
    let config = shop_config();
    cmd()
        .args(["--config", config.path().to_str().unwrap(), "inspect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Types: 2"))
        .stdout(predicate::str::contains("public.product_category"))
        .stdout(predicate::str::contains("-> public.product_category.id"));
}

#[test]
fn test_inspect_json_output() {
    let config = shop_config();
    let output = cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--output-json",
            "--verbosity",
            "error",
            "inspect",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let domain: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(domain["provider"], "postgres");
    assert_eq!(domain["types"].as_array().unwrap().len(), 2);
}

#[test]
fn test_unknown_type_filter_fails() {
    let config = shop_config();
    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "inspect",
            "--type-filter",
            "warehouse",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("warehouse"));
}

#[test]
fn test_inspect_writes_snapshot() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("domain.json");
    let config = shop_config();

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "inspect", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert!(json["config_hash"].as_str().is_some_and(|h| h.len() == 64));
    assert_eq!(json["domain"]["operations"].as_array().unwrap().len(), 7);
}

#[test]
fn test_drop_generated_after_routine_removed() {
    let dir = TempDir::new().unwrap();
    let catalog: PathBuf = dir.path().join("catalog.yaml");
    let previous = dir.path().join("previous.json");

    std::fs::write(
        &catalog,
        r#"
provider: postgres
routines:
  - schema: public
    name: foo_insert
    kind: function
    return_type: integer
    description: '{"generated": true}'
    parameters:
      - { name: name, native_type: text }
  - schema: public
    name: foo_report
    kind: function
    return_type: bigint
"#,
    )
    .unwrap();
    let config = memory_config(&catalog);
    let config_path = config.path().to_str().unwrap();

    cmd()
        .args(["--config", config_path, "inspect", "--snapshot"])
        .arg(&previous)
        .assert()
        .success();

    std::fs::write(
        &catalog,
        r#"
provider: postgres
routines:
  - schema: public
    name: foo_report
    kind: function
    return_type: bigint
"#,
    )
    .unwrap();

    cmd()
        .args(["--config", config_path, "drop-generated", "--previous"])
        .arg(&previous)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"DROP FUNCTION IF EXISTS "public"."foo_insert"(text);"#,
        ))
        .stdout(predicate::str::contains("foo_report").not())
        .stdout(predicate::str::contains("not executed"));
}

#[test]
fn test_health_check_memory_provider() {
    let config = shop_config();
    cmd()
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database (postgres): OK"));
}
