//! CLI regression tests for the `waymark` binary.
//!
//! These run the binary as a subprocess to pin flag names, exit codes and
//! output formats.
//!
//! Run with: `cargo test -p waymark-test`
//! Requires the `waymark` binary to be built first (`cargo build -p waymark`).

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn waymark() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("waymark")
        .expect("waymark binary not found; run `cargo build -p waymark` first")
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("command runs");
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

// ---------------------------------------------------------------------------
// waymark validate
// ---------------------------------------------------------------------------

#[test]
fn validate_valid_manifest_exits_zero() {
    waymark()
        .args(["validate", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .success()
        .stderr(contains("is valid (6 route(s))"));
}

#[test]
fn validate_lists_prefixed_group_routes() {
    waymark()
        .args(["validate", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .success()
        .stderr(contains("/api/admin/stats"));
}

#[test]
fn validate_invalid_token_exits_one() {
    waymark()
        .args(["validate", "--routes"])
        .arg(fixtures().join("invalid-token.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Parameter token values MUST be null or non-empty string"));
}

#[test]
fn validate_invalid_yaml_exits_one() {
    waymark()
        .args(["validate", "--routes"])
        .arg(fixtures().join("invalid-yaml.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid manifest"));
}

#[test]
fn validate_unknown_handler_exits_one() {
    waymark()
        .args(["validate", "--routes"])
        .arg(fixtures().join("unknown-handler.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("does-not-exist"));
}

#[test]
fn validate_missing_file_exits_one() {
    waymark()
        .args(["validate", "--routes", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to read"));
}

#[test]
fn validate_json_format_outputs_route_table() {
    let mut cmd = waymark();
    cmd.args(["validate", "--format", "json", "--routes"])
        .arg(fixtures().join("blog.yaml"));
    let v = stdout_json(&mut cmd);

    assert_eq!(v["valid"], true);
    assert_eq!(v["routes_count"], 6);
    assert_eq!(v["routes"][0]["name"], "home");
    assert_eq!(v["routes"][4]["pattern"], "/api/users/{id}");
    assert_eq!(v["routes"][5]["methods"], serde_json::json!([]));
}

#[test]
fn validate_json_format_invalid_manifest() {
    let mut cmd = waymark();
    cmd.args(["validate", "--format", "json", "--routes"])
        .arg(fixtures().join("invalid-token.yaml"));
    let v = stdout_json(&mut cmd);

    assert_eq!(v["valid"], false);
    assert!(v["error"].as_str().is_some_and(|e| e.contains("boolean")));
}

// ---------------------------------------------------------------------------
// waymark match
// ---------------------------------------------------------------------------

#[test]
fn match_found_exits_zero_with_params() {
    let mut cmd = waymark();
    cmd.args(["match", "--path", "/blog/first-post/2", "--routes"])
        .arg(fixtures().join("blog.yaml"));
    let v = stdout_json(&mut cmd);

    assert_eq!(v["result"], "found");
    assert_eq!(v["route"], "blog.view");
    assert_eq!(v["params"], serde_json::json!({"slug": "first-post", "page": "2"}));

    waymark()
        .args(["match", "--path", "/blog/first-post/2", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .success();
}

#[test]
fn match_earlier_route_wins() {
    let mut cmd = waymark();
    cmd.args(["match", "--path", "/blog/page/3", "--routes"])
        .arg(fixtures().join("blog.yaml"));
    let v = stdout_json(&mut cmd);

    assert_eq!(v["route"], "blog.list");
    assert_eq!(v["params"]["page"], "3");
}

#[test]
fn match_method_not_allowed_exits_one() {
    waymark()
        .args(["match", "--method", "delete", "--path", "/blog", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .failure()
        .code(1)
        .stdout(contains("\"result\":\"method_not_allowed\""))
        .stdout(contains("\"allowed\":[\"POST\"]"));
}

#[test]
fn match_not_found_exits_one() {
    waymark()
        .args(["match", "--path", "/nowhere", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .failure()
        .code(1)
        .stdout(contains("not_found"));
}

#[test]
fn match_uses_host() {
    let mut cmd = waymark();
    cmd.args(["match", "--path", "/", "--host", "SHOP.example.com", "--routes"])
        .arg(fixtures().join("hosts.yaml"));
    assert_eq!(stdout_json(&mut cmd)["route"], "shop.home");

    let mut cmd = waymark();
    cmd.args(["match", "--path", "/", "--routes"])
        .arg(fixtures().join("hosts.yaml"));
    assert_eq!(stdout_json(&mut cmd)["route"], "fallback");
}

// ---------------------------------------------------------------------------
// waymark url
// ---------------------------------------------------------------------------

#[test]
fn url_generates_path() {
    waymark()
        .args(["url", "--name", "blog.view", "--param", "slug=intro", "--param", "page=2", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .success()
        .stdout("/blog/intro/2\n");
}

#[test]
fn url_applies_defaults() {
    waymark()
        .args(["url", "--name", "blog.list", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .success()
        .stdout("/blog/page/1\n");
}

#[test]
fn url_with_host_and_scheme() {
    waymark()
        .args(["url", "--name", "api.user", "-P", "id=7", "--host", "api.example.com", "--scheme", "https", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .success()
        .stdout("https://api.example.com/api/users/7\n");
}

#[test]
fn url_uses_literal_route_host() {
    waymark()
        .args(["url", "--name", "docs.page", "-P", "topic=routing", "--routes"])
        .arg(fixtures().join("hosts.yaml"))
        .assert()
        .success()
        .stdout("//docs.example.com/docs/routing\n");
}

#[test]
fn url_invalid_parameter_exits_one() {
    waymark()
        .args(["url", "--name", "api.user", "-P", "id=abc", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("id"));
}

#[test]
fn url_unknown_route_exits_one() {
    waymark()
        .args(["url", "--name", "missing", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("The route \"missing\" was not found."));
}

#[test]
fn url_rejects_malformed_param() {
    waymark()
        .args(["url", "--name", "home", "--param", "novalue", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("expected name=value"));
}

// ---------------------------------------------------------------------------
// waymark serve
// ---------------------------------------------------------------------------

#[test]
fn serve_invalid_listen_address_exits_one() {
    waymark()
        .args(["serve", "--listen", "not-an-address", "--log-level", "error", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .env_remove("RUST_LOG")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid listen address"));
}

#[test]
fn serve_invalid_manifest_exits_one() {
    waymark()
        .args(["serve", "--log-level", "error", "--routes"])
        .arg(fixtures().join("invalid-token.yaml"))
        .env_remove("RUST_LOG")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn serve_rejects_unknown_log_format() {
    waymark()
        .args(["serve", "--log-format", "xml", "--routes"])
        .arg(fixtures().join("blog.yaml"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unknown log format"));
}
