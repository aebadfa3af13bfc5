//! Binary-level behaviour that needs no network access.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

/// The binary with no inherited `INPUT_*` / `GITHUB_*` configuration.
fn filesync() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_filesync"));
    cmd.env_clear().env("RUST_LOG", "warn");
    cmd
}

#[test]
fn sync_without_source_repo_fails() {
    filesync()
        .args(["sync", "--destination-repos", "org/a"])
        .assert()
        .failure()
        .stderr(contains("missing required configuration: source repository"));
}

#[test]
fn sync_without_destinations_fails() {
    filesync()
        .args(["sync", "--source-repo", "org/template", "--files", "ci.yml"])
        .assert()
        .failure()
        .stderr(contains("no destination repositories configured"));
}

#[test]
fn resolve_prints_sorted_destinations_minus_excludes() {
    filesync()
        .args([
            "resolve",
            "--destination-repos",
            "org/b\norg/a\n\norg/c\norg/a",
            "--destination-repos-exclude",
            "org/c",
        ])
        .assert()
        .success()
        .stdout("org/a\norg/b\n");
}

#[test]
fn resolve_reads_action_environment() {
    filesync()
        .arg("resolve")
        .env("INPUT_DESTINATION_REPOS", "  org/svc  \n")
        .assert()
        .success()
        .stdout("org/svc\n");
}

#[test]
fn resolve_falls_back_to_current_repository() {
    filesync()
        .arg("resolve")
        .env("GITHUB_REPOSITORY", "org/self")
        .assert()
        .success()
        .stdout("org/self\n");
}

#[test]
fn resolve_json_output() {
    let assert = filesync()
        .args(["resolve", "--json", "--destination-repos", "org/z\norg/y"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let names: Vec<String> = serde_json::from_str(&stdout).expect("json array");
    assert_eq!(names, ["org/y", "org/z"]);
}

#[test]
fn malformed_pattern_is_a_configuration_error() {
    filesync()
        .args(["resolve", "--destination-repos-regex", "no-slash"])
        .assert()
        .failure()
        .stderr(contains("invalid repository pattern 'no-slash'"));
}

#[test]
fn malformed_repository_identifier_is_rejected() {
    filesync()
        .args(["resolve", "--destination-repos", "just-a-name"])
        .assert()
        .failure()
        .stderr(contains("expected org/name"));
}

#[test]
fn unknown_log_format_is_a_usage_error() {
    filesync()
        .args(["--log-format", "xml", "resolve", "--destination-repos", "org/a"])
        .assert()
        .code(2)
        .stderr(contains("unknown log format").and(contains("xml")));
}
