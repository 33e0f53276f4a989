//! End-to-end tests for the rowdump binary
//!
//! These tests run the real binary against a mock json-server style API:
//! - Paged export to a file and to stdout
//! - Total discovery through X-Total-Count
//! - Page failure policies (skip and abort)
//! - Single-request export, streaming download and count
//! - Argument validation

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::ops::Range;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

const ROWDUMP_VARS: &[&str] = &[
    "ROWDUMP_SOURCE_URL",
    "ROWDUMP_TOTAL",
    "ROWDUMP_PAGE_SIZE",
    "ROWDUMP_CONCURRENCY",
    "ROWDUMP_ON_PAGE_FAILURE",
    "ROWDUMP_PAGE_TIMEOUT_SECS",
    "ROWDUMP_OUTPUT_DIR",
    "ROWDUMP_API_TIMEOUT_SECS",
];

/// Helper to build a command isolated from the caller's environment
fn rowdump(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rowdump").unwrap();
    cmd.current_dir(dir);
    for var in ROWDUMP_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper to create user rows with ids in `ids`
fn users(ids: Range<u64>) -> Value {
    Value::Array(
        ids.map(|id| json!({"id": id, "name": format!("User {}", id)}))
            .collect(),
    )
}

/// Helper to mount one mock per page of `0..total`
async fn mount_pages(server: &MockServer, total: u64, page_size: u64) {
    let mut offset = 0;
    while offset < total {
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("_start", offset.to_string()))
            .and(query_param("_limit", page_size.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(users(offset..(offset + page_size).min(total))),
            )
            .expect(1)
            .mount(server)
            .await;
        offset += page_size;
    }
}

fn expected_csv(ids: Range<u64>) -> String {
    let mut lines = vec!["id,name".to_string()];
    lines.extend(ids.map(|id| format!("{},User {}", id, id)));
    lines.join("\n")
}

// ============================================================================
// Paged Export Tests
// ============================================================================

#[tokio::test]
async fn test_export_writes_ordered_file() {
    let server = MockServer::start().await;
    mount_pages(&server, 25, 4).await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .arg("--total")
        .arg("25")
        .arg("--page-size")
        .arg("4")
        .arg("--concurrency")
        .arg("3")
        .arg("--output")
        .arg(temp.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 25 records (7 pages)"));

    let written = std::fs::read_to_string(temp.path().join("out/exported_data.csv")).unwrap();
    assert_eq!(written, expected_csv(0..25));
}

#[tokio::test]
async fn test_export_to_stdout() {
    let server = MockServer::start().await;
    mount_pages(&server, 5, 2).await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .arg("--total")
        .arg("5")
        .arg("--page-size")
        .arg("2")
        .arg("--stdout")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(expected_csv(0..5)))
        .stderr(predicate::str::contains("Exported 5 records"));

    assert!(!temp.path().join("exported_data.csv").exists());
}

#[tokio::test]
async fn test_export_probes_total_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("_start", "0"))
        .and(query_param("_limit", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "6")
                .set_body_json(users(0..1)),
        )
        .mount(&server)
        .await;
    mount_pages(&server, 6, 3).await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .arg("--page-size")
        .arg("3")
        .arg("--output")
        .arg(temp.path())
        .arg("--name")
        .arg("users.csv")
        .assert()
        .success();

    let written = std::fs::read_to_string(temp.path().join("users.csv")).unwrap();
    assert_eq!(written, expected_csv(0..6));
}

#[tokio::test]
async fn test_export_without_total_or_header_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users(0..1)))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Pass --total"));
}

// ============================================================================
// Failure Policy Tests
// ============================================================================

#[tokio::test]
async fn test_skipped_page_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("_start", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("_start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users(0..2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("_start", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users(4..6)))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .arg("--total")
        .arg("6")
        .arg("--page-size")
        .arg("2")
        .arg("--output")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 3 pages failed (pages 1)"));

    let written = std::fs::read_to_string(temp.path().join("exported_data.csv")).unwrap();
    assert_eq!(written, "id,name\n0,User 0\n1,User 1\n4,User 4\n5,User 5");
}

#[tokio::test]
async fn test_abort_policy_fails_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("_start", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users(0..2)))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .arg("--total")
        .arg("6")
        .arg("--page-size")
        .arg("2")
        .arg("--concurrency")
        .arg("1")
        .arg("--on-page-failure")
        .arg("abort")
        .arg("--output")
        .arg(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Page 1 could not be fetched"));

    assert!(!temp.path().join("exported_data.csv").exists());
}

#[tokio::test]
async fn test_zero_page_size_is_rejected() {
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export")
        .arg("--url")
        .arg("http://127.0.0.1:9/users")
        .arg("--total")
        .arg("10")
        .arg("--page-size")
        .arg("0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid argument"));
}

// ============================================================================
// Other Modes
// ============================================================================

#[tokio::test]
async fn test_export_all_uses_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param_is_missing("_start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users(0..3)))
        .expect(1)
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("export-all")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .arg("--output")
        .arg(temp.path())
        .assert()
        .success();

    let written = std::fs::read_to_string(temp.path().join("all_data.csv")).unwrap();
    assert_eq!(written, expected_csv(0..3));
}

#[tokio::test]
async fn test_stream_saves_body_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id;name\n1;\"Doe, Jane\"\n"))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("stream")
        .arg("--url")
        .arg(format!("{}/export.csv", server.uri()))
        .arg("--output")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved"));

    let written = std::fs::read_to_string(temp.path().join("stream_export.csv")).unwrap();
    assert_eq!(written, "id;name\n1;\"Doe, Jane\"\n");
}

#[tokio::test]
async fn test_stream_failure_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("stream")
        .arg("--url")
        .arg(format!("{}/missing.csv", server.uri()))
        .arg("--output")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network request failed"));

    assert!(!temp.path().join("stream_export.csv").exists());
}

#[tokio::test]
async fn test_count_prints_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("_limit", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "1000")
                .set_body_json(users(0..1)),
        )
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("count")
        .arg("--url")
        .arg(format!("{}/users", server.uri()))
        .assert()
        .success()
        .stdout("1000\n");
}

#[tokio::test]
async fn test_source_url_from_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "42")
                .set_body_json(users(0..1)),
        )
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .arg("count")
        .env("ROWDUMP_SOURCE_URL", format!("{}/users", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn test_no_arguments_requires_subcommand() {
    let temp = TempDir::new().unwrap();

    rowdump(temp.path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("A subcommand is required"));
}
