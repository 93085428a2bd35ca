//! CLI surface tests: argument parsing and fast-failing validation.
//!
//! Nothing here touches the network; every case fails (or prints help)
//! before the first request would go out.

use predicates::prelude::*;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("wikirag-harvester")
}

#[test]
fn help_lists_both_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("harvest"));
}

#[test]
fn version_flag_works() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wikirag-harvester"));
}

#[test]
fn harvest_requires_an_input_argument() {
    cmd()
        .arg("harvest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("INPUT"));
}

#[test]
fn harvest_fails_on_a_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["harvest", "no-such-file.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn harvest_fails_on_a_headerless_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pages.csv");
    std::fs::write(&input, "12,Badab War,https://w/wiki/Badab_War\n").unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["harvest", "pages.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page_id"));
}

#[test]
fn harvest_rejects_a_zero_rate() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pages.csv");
    std::fs::write(&input, "page_id,title,url\n1,T,u\n").unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["harvest", "pages.csv", "--rate", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requests per second"));
}

#[test]
fn list_rejects_an_oversized_batch() {
    cmd()
        .args(["list", "--batch-size", "9999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch size"));
}
