#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    db: PathBuf,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("graph.json");
        let config = dir.path().join("config.toml");
        fs::write(&config, "log_level = \"warn\"\n").expect("write config");
        Self { dir, db, config }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("classgraph");
        cmd.env_remove("CLASSGRAPH_DB")
            .arg("--db")
            .arg(&self.db)
            .arg("--config")
            .arg(&self.config)
            .args(["--theme", "plain"]);
        cmd
    }

    fn run(&self, args: &[&str]) -> String {
        let output = self
            .cmd()
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(output).expect("utf8 stdout")
    }

    fn json(&self, args: &[&str]) -> Value {
        let mut full = vec!["--format", "json"];
        full.extend_from_slice(args);
        serde_json::from_str(&self.run(&full)).expect("json output")
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn class_lifecycle_persists_between_invocations() {
    let ws = Workspace::new();
    let created = ws.json(&["class", "create", "City", "--strict", "-p", "name", "-p", "pop"]);
    assert_eq!(created["name"], "City");
    assert!(ws.db.exists());

    ws.run(&["class", "create", "State", "-p", "name"]);
    ws.run(&["class", "link", "City", "State", "IS_IN"]);

    let shown = ws.json(&["class", "show", "City"]);
    assert_eq!(shown["name"], "City");
    assert_eq!(shown["strict"], true);
    assert_eq!(shown["uri"], "schema-1");
    assert_eq!(shown["properties"], serde_json::json!(["name", "pop"]));
    assert_eq!(shown["relationships"][0]["name"], "IS_IN");
    assert_eq!(shown["relationships"][0]["target_name"], "State");

    let listed = ws.run(&["class", "list"]);
    assert!(listed.contains("City (strict)"));
    assert!(listed.contains("State (lax)"));

    ws.run(&["class", "rename", "State", "Province"]);
    let listed = ws.json(&["class", "list"]);
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["City", "Province"]);
}

#[test]
fn duplicate_class_fails_with_code() {
    let ws = Workspace::new();
    ws.run(&["class", "create", "City"]);
    let output = ws
        .cmd()
        .args(["class", "create", "City"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("IntegrityConflict"), "{stderr}");
}

#[test]
fn namespace_next_prints_uris() {
    let ws = Workspace::new();
    ws.run(&["namespace", "create", "orders", "--prefix", "ord-"]);
    assert_eq!(ws.run(&["namespace", "next", "orders"]).trim(), "ord-1");
    assert_eq!(
        ws.run(&["namespace", "next", "orders", "--prefix", "X"]).trim(),
        "X2"
    );
    let listed = ws.json(&["namespace", "list"]);
    let orders = listed
        .as_array()
        .unwrap()
        .iter()
        .find(|ns| ns["name"] == "orders")
        .unwrap();
    assert_eq!(orders["next_count"], 3);
}

#[test]
fn csv_import_with_duplicates_and_links() {
    let ws = Workspace::new();
    ws.run(&["class", "create", "Motor Vehicle", "--strict", "-p", "VID", "-p", "make", "-p", "year"]);
    ws.run(&["class", "create", "Owner", "--strict", "-p", "name"]);
    ws.run(&["class", "link", "Owner", "Motor Vehicle", "OWNS"]);

    let vehicles = ws.file(
        "vehicles.csv",
        "VID,make,year\nc1,Toyota,2013\nc2,Honda,2019\nc2,Honda,2020\n",
    );
    let report = ws.json(&[
        "import",
        "nodes",
        "Motor Vehicle",
        path_arg(&vehicles),
        "--primary-key",
        "VID",
        "--duplicates",
        "skip",
        "--batch-size",
        "2",
    ]);
    assert_eq!(report["created"], 2);
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["batches"], 2);

    let owners = ws.file("owners.csv", "owner_name\nAda\n");
    ws.run(&[
        "import",
        "nodes",
        "Owner",
        path_arg(&owners),
        "--rename",
        "owner_name=name",
    ]);

    let links = ws.file("owns.csv", "owner,vehicle\nAda,c1\nAda,c2\n");
    let report = ws.json(&[
        "import",
        "links",
        path_arg(&links),
        "--from-class",
        "Owner",
        "--from-column",
        "owner",
        "--from-key",
        "name",
        "--to-class",
        "Motor Vehicle",
        "--to-column",
        "vehicle",
        "--to-key",
        "VID",
        "--relationship",
        "OWNS",
    ]);
    assert_eq!(report["created"], 2);

    let shown = ws.json(&["class", "show", "Motor Vehicle"]);
    assert_eq!(shown["data_nodes"], 2);
}

#[test]
fn json_import_and_node_lookup() {
    let ws = Workspace::new();
    ws.run(&["class", "create", "Root"]);
    ws.run(&["class", "create", "Child"]);
    ws.run(&["class", "link", "Root", "Child", "b"]);
    let doc = ws.file("doc.json", r#"{"a": 1, "b": {"c": 2}}"#);

    let out = ws.json(&["import", "json", "Root", path_arg(&doc)]);
    let root = out["roots"][0].as_u64().unwrap();

    let node = ws.json(&["node", "get", root.to_string().as_str()]);
    assert_eq!(node["class"], "Root");
    assert_eq!(node["props"]["a"], 1);
    assert_eq!(node["props"]["_CLASS"], "Root");
}

#[test]
fn failed_json_import_leaves_no_partial_nodes() {
    let ws = Workspace::new();
    ws.run(&["class", "create", "Root"]);
    ws.run(&["class", "create", "Child"]);
    ws.run(&["class", "create", "Leaf", "--strict", "-p", "ok"]);
    ws.run(&["class", "link", "Root", "Child", "b"]);
    ws.run(&["class", "link", "Root", "Leaf", "leaf"]);
    let doc = ws.file("bad.json", r#"{"b": {"c": 1}, "leaf": {"bad": 1}}"#);

    ws.cmd()
        .args(["import", "json", "Root"])
        .arg(&doc)
        .assert()
        .failure();
    let shown = ws.json(&["class", "show", "Child"]);
    assert_eq!(shown["data_nodes"], 0);
}

#[test]
fn delete_requires_force_when_in_use() {
    let ws = Workspace::new();
    ws.run(&["class", "create", "Tag", "-p", "label"]);
    let tags = ws.file("tags.csv", "label\nred\n");
    ws.run(&["import", "nodes", "Tag", path_arg(&tags)]);

    ws.cmd().args(["class", "delete", "Tag"]).assert().failure();
    let out = ws.json(&["class", "delete", "Tag", "--force"]);
    assert_eq!(out["orphans"], 1);
    let listed = ws.json(&["class", "list"]);
    assert!(listed.as_array().unwrap().is_empty());
}

#[test]
fn missing_database_is_reported() {
    let ws = Workspace::new();
    let mut cmd = cargo_bin_cmd!("classgraph");
    cmd.env_remove("CLASSGRAPH_DB")
        .arg("--config")
        .arg(&ws.config)
        .args(["class", "list"])
        .assert()
        .failure();
}
