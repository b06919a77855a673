use assert_cmd::Command;
use predicates::prelude::*;

fn hearth() -> Command {
    Command::cargo_bin("hearth").unwrap()
}

#[test]
fn help_lists_subcommands() {
    hearth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("budget"))
        .stdout(predicate::str::contains("insights"));
}

#[test]
fn import_requires_account() {
    hearth()
        .args(["import", "statement.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--account"));
}

#[test]
fn tx_bulk_requires_ids() {
    hearth()
        .args(["tx", "bulk", "--category", "Groceries"])
        .assert()
        .failure();
}

#[test]
fn budget_set_requires_all_args() {
    hearth().args(["budget", "set", "2026-01"]).assert().failure();
}

#[test]
fn unknown_subcommand_fails() {
    hearth()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized"));
}
