//! End-to-end tests for the `tfeval` CLI against real fixture directories.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[test]
fn eval_prints_resolved_json_and_exits_zero() {
    let fixture = write_fixture(&[(
        "main.tf",
        "variable \"region\" {\n  default = \"us-east-1\"\n}\n\nlocals {\n  name = \"svc-${var.region}\"\n}\n",
    )]);

    Command::cargo_bin("tfeval")
        .unwrap()
        .arg("eval")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("svc-us-east-1"));
}

#[test]
fn eval_exits_nonzero_when_a_file_fails_to_parse() {
    let fixture = write_fixture(&[("broken.tf", "resource \"a\" {\n")]);

    Command::cargo_bin("tfeval")
        .unwrap()
        .arg("eval")
        .arg(fixture.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken.tf"));
}

#[test]
fn eval_layers_env_vars_below_tfvars_files() {
    let fixture = write_fixture(&[
        (
            "main.tf",
            "variable \"dummy\" {\n  default = \"dummy\"\n}\n\nlocals {\n  out = var.dummy\n}\n",
        ),
        ("terraform.tfvars", "dummy = \"from_tfvars\"\n"),
    ]);

    Command::cargo_bin("tfeval")
        .unwrap()
        .env("TF_VAR_dummy", "from_env")
        .arg("eval")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("from_tfvars"));
}
