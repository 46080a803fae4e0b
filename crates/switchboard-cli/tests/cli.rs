//! End-to-end tests of the switchboard binary against a temporary data dir

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn switchboard(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("switchboard").unwrap();
    cmd.env_remove("SWITCHBOARD_SEARCH_BACKEND")
        .env_remove("SWITCHBOARD_NAMESPACE")
        .env_remove("SWITCHBOARD_CLUSTER_URL")
        .env_remove("RUST_LOG")
        .env("SWITCHBOARD_DATA_DIR", home.path().join("data"))
        .env("SWITCHBOARD_CONFIG", home.path().join("config.toml"));
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.arg("--format").arg("json").output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn add_weather(home: &TempDir) {
    switchboard(home)
        .args(["entity", "add", "server", "/weather", "Weather Service"])
        .args(["--description", "Forecasts and alerts", "--tag", "weather"])
        .args(["--tool", "get_forecast:Forecast for a city"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered server /weather"));
}

#[test]
fn add_then_search_finds_entity() {
    let home = tempdir().unwrap();
    add_weather(&home);
    switchboard(&home)
        .args(["entity", "add", "agent", "travel/", "Travel Planner", "--skill", "booking:Book flights"])
        .assert()
        .success();

    let results = json_output(switchboard(&home).args(["search", "weather forecast"]));
    assert_eq!(results["servers"][0]["path"], "/weather");

    let results = json_output(switchboard(&home).args(["search", "weather", "--type", "agent"]));
    assert_eq!(results["servers"].as_array().unwrap().len(), 0);

    switchboard(&home)
        .args(["entity", "get", "agent", "/travel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("booking: Book flights"));
}

#[test]
fn disabled_entities_are_hidden_from_enabled_only_search() {
    let home = tempdir().unwrap();
    add_weather(&home);

    switchboard(&home)
        .args(["entity", "disable", "server", "/weather"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Disabled server /weather"));

    let hidden = json_output(switchboard(&home).args(["search", "weather", "--enabled-only"]));
    assert!(hidden["servers"].as_array().unwrap().is_empty());

    let all = json_output(switchboard(&home).args(["search", "weather"]));
    assert_eq!(all["servers"][0]["is_enabled"], false);

    switchboard(&home)
        .args(["entity", "enable", "server", "/weather"])
        .assert()
        .success();
    let visible = json_output(switchboard(&home).args(["search", "weather", "--enabled-only"]));
    assert_eq!(visible["servers"].as_array().unwrap().len(), 1);
}

#[test]
fn update_and_delete_keep_index_in_step() {
    let home = tempdir().unwrap();
    add_weather(&home);

    switchboard(&home)
        .args(["entity", "update", "server", "/weather", "--tag", "climate", "--meta", "owner=ops"])
        .assert()
        .success();
    let entity = json_output(switchboard(&home).args(["entity", "get", "server", "/weather"]));
    assert_eq!(entity["tags"], serde_json::json!(["climate"]));
    assert_eq!(entity["metadata"]["owner"], "ops");

    switchboard(&home)
        .args(["entity", "delete", "server", "/weather"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted server /weather"));

    let status = json_output(switchboard(&home).args(["index", "status"]));
    assert_eq!(status["documents"], 0);
    assert_eq!(status["entities"], 0);
}

#[test]
fn duplicate_and_invalid_entities_fail() {
    let home = tempdir().unwrap();
    add_weather(&home);

    switchboard(&home)
        .args(["entity", "add", "server", "/weather/", "Again"])
        .assert()
        .failure();
    switchboard(&home)
        .args(["entity", "add", "gadget", "/x", "X"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gadget"));
    switchboard(&home)
        .args(["entity", "add", "skill", "/pdf", "PDF", "--tool", "read"])
        .assert()
        .failure();
}

#[test]
fn rebuild_reports_every_entity() {
    let home = tempdir().unwrap();
    add_weather(&home);
    switchboard(&home)
        .args(["entity", "add", "skill", "/pdf", "PDF Reader", "--allowed-tool", "read_file", "--disabled"])
        .assert()
        .success();

    let report = json_output(switchboard(&home).args(["index", "rebuild"]));
    assert_eq!(report["indexed"], 2);
    assert_eq!(report["failed"], 0);

    let status = json_output(switchboard(&home).args(["index", "status"]));
    assert_eq!(status["backend"], "embedded");
    assert_eq!(status["documents"], 2);
}

#[test]
fn namespaces_partition_index_names() {
    let home = tempdir().unwrap();
    switchboard(&home)
        .args(["index", "names", "--namespace", "staging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("switchboard-servers-staging"))
        .stdout(predicate::str::contains("switchboard-scopes-staging"));

    switchboard(&home)
        .args(["index", "names", "--namespace", "Bad Name"])
        .assert()
        .failure();
}

#[test]
fn unreachable_cluster_search_fails_open() {
    let home = tempdir().unwrap();
    let results = json_output(switchboard(&home).args([
        "search",
        "weather",
        "--backend",
        "clustered",
        "--cluster-url",
        "http://127.0.0.1:1",
    ]));
    assert!(results["servers"].as_array().unwrap().is_empty());
    assert!(results["agents"].as_array().unwrap().is_empty());
}

fn write_groups(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("groups.json");
    let groups = serde_json::json!([
        {
            "name": "admins",
            "group_mappings": ["idp-admins"],
            "server_access": [{"server": "/weather", "methods": ["tools/call"], "tools": ["*"]}]
        },
        {
            "name": "readers",
            "ui_permissions": {"list_service": ["all"]}
        }
    ]);
    std::fs::write(&path, groups.to_string()).unwrap();
    path
}

#[test]
fn groups_import_list_get_delete() {
    let home = tempdir().unwrap();
    let file = write_groups(home.path());

    let report = json_output(switchboard(&home).args(["group", "import"]).arg(&file));
    assert_eq!(report["imported"], 2);

    switchboard(&home)
        .args(["group", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("admins <- idp-admins"))
        .stdout(predicate::str::contains("readers"));

    let readers = json_output(switchboard(&home).args(["group", "get", "readers"]));
    assert_eq!(readers["ui_permissions"]["list_service"][0], "all");

    switchboard(&home)
        .args(["group", "delete", "admins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted group admins"));
    switchboard(&home).args(["group", "get", "admins"]).assert().failure();
}

#[test]
fn config_init_set_and_get() {
    let home = tempdir().unwrap();

    switchboard(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    switchboard(&home).args(["config", "init"]).assert().success();
    switchboard(&home).args(["config", "init"]).assert().failure();

    switchboard(&home)
        .args(["config", "set", "search.namespace", "qa"])
        .assert()
        .success();
    switchboard(&home)
        .args(["config", "get", "search.namespace"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("qa"));

    switchboard(&home)
        .args(["index", "names"])
        .assert()
        .success()
        .stdout(predicate::str::contains("switchboard-agents-qa"));

    switchboard(&home)
        .args(["config", "set", "search.colour", "blue"])
        .assert()
        .failure();
}

#[test]
fn completions_are_generated() {
    let home = tempdir().unwrap();
    switchboard(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("switchboard"));
}
