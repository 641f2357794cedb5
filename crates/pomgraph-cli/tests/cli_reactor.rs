use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[allow(deprecated)]
fn pomgraph_cmd() -> Command {
    Command::cargo_bin("pomgraph").unwrap()
}

fn write_module(root: &Path, artifact: &str, deps: &[&str]) {
    let dir = root.join(artifact);
    fs::create_dir_all(&dir).unwrap();
    let deps: String = deps
        .iter()
        .map(|d| {
            format!(
                "<dependency><groupId>com.app</groupId><artifactId>{d}</artifactId>\
                 <version>1.0</version></dependency>"
            )
        })
        .collect();
    fs::write(
        dir.join("pom.xml"),
        format!(
            "<project><parent><groupId>com.app</groupId><artifactId>root</artifactId>\
             <version>1.0</version></parent><artifactId>{artifact}</artifactId>\
             <dependencies>{deps}</dependencies></project>"
        ),
    )
    .unwrap();
}

fn write_root(root: &Path, modules: &[&str]) {
    let modules: String = modules
        .iter()
        .map(|m| format!("<module>{m}</module>"))
        .collect();
    fs::write(
        root.join("pom.xml"),
        format!(
            "<project><groupId>com.app</groupId><artifactId>root</artifactId>\
             <version>1.0</version><packaging>pom</packaging><modules>{modules}</modules></project>"
        ),
    )
    .unwrap();
}

#[test]
fn test_reactor_prints_build_order() {
    let tmp = TempDir::new().unwrap();
    write_root(tmp.path(), &["web", "service", "model"]);
    write_module(tmp.path(), "web", &["service"]);
    write_module(tmp.path(), "service", &["model"]);
    write_module(tmp.path(), "model", &[]);

    pomgraph_cmd()
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .arg("reactor")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Reactor build order:\n  1. com.app:root:1.0 (pom)\n  2. com.app:model:1.0 (jar)\n  \
             3. com.app:service:1.0 (jar)\n  4. com.app:web:1.0 (jar)\n",
        ));
}

#[test]
fn test_reactor_cycle_fails() {
    let tmp = TempDir::new().unwrap();
    write_root(tmp.path(), &["a", "b"]);
    write_module(tmp.path(), "a", &["b"]);
    write_module(tmp.path(), "b", &["a"]);

    pomgraph_cmd()
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .arg("reactor")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Reactor cycle"));
}

#[test]
fn test_reactor_missing_module_fails() {
    let tmp = TempDir::new().unwrap();
    write_root(tmp.path(), &["absent"]);

    pomgraph_cmd()
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .arg("reactor")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Module POM"));
}
