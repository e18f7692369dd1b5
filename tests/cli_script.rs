mod common;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

const BIN_NAME: &str = "expense_ledger_cli";

fn script_command(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin(BIN_NAME).expect("binary exists");
    cmd.env("EXPENSE_LEDGER_CLI_SCRIPT", "1")
        .env("EXPENSE_LEDGER_HOME", home)
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn script_mode_runs_basic_flow() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("add \"Iced coffee\" 4.50\nadd Bagel 3\ntotal\nexit\n")
        .assert()
        .success()
        .stdout(contains("Submitted Iced coffee ($4.50)"))
        .stdout(contains("Total: $7.50"));

    let json = std::fs::read_to_string(home.join("store").join("expenses.json")).unwrap();
    assert!(json.contains("\"Iced coffee\""));
    assert!(json.contains("\"Bagel\""));
}

#[test]
fn expenses_survive_between_runs() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("add Rent 900\nexit\n")
        .assert()
        .success();

    script_command(&home)
        .write_stdin("home\nexit\n")
        .assert()
        .success()
        .stdout(contains("Your Expenses"))
        .stdout(contains("Rent"))
        .stdout(contains("Total: $900.00"))
        .stdout(contains("Spend per day"));
}

#[test]
fn home_on_an_empty_ledger_says_so() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("home\n")
        .assert()
        .success()
        .stdout(contains("No expenses yet"));
}

#[test]
fn edit_and_delete_by_position() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("add Coffe 3\nadd Bus 2\nedit 1 Coffee 3.25\ndelete 2\nlist\ntotal\n")
        .assert()
        .success()
        .stdout(contains("Updated Coffee ($3.25)"))
        .stdout(contains("Deleted Bus"))
        .stdout(contains("Total: $3.25"));
}

#[test]
fn empty_fields_are_rejected_without_saving() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("add \"\" 3\nadd Coffee \"  \"\nlist\n")
        .assert()
        .success()
        .stdout(contains("item must not be empty"))
        .stdout(contains("cost must not be empty"))
        .stdout(contains("No expenses yet"));
}

#[test]
fn non_numeric_cost_is_listed_but_not_summed() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("add Lunch 10\nadd Gift \"a lot\"\ntotal\n")
        .assert()
        .success()
        .stdout(contains("Total: $10.00"))
        .stdout(contains("non-numeric"));
}

#[test]
fn config_changes_currency_display() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("config set currency_symbol EUR \nconfig set chart_width 0\nadd Tea 2\ntotal\n")
        .assert()
        .success()
        .stdout(contains("currency_symbol set to `EUR`"))
        .stdout(contains("Invalid value for `chart_width`"))
        .stdout(contains("Total: EUR2.00"));

    let config = std::fs::read_to_string(home.join("config").join("config.json")).unwrap();
    assert!(config.contains("EUR"));
}

#[test]
fn backup_restore_rolls_back_the_last_save() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("add Coffee 3\nadd Bagel 2\nbackup list\nbackup restore 1\nlist\n")
        .assert()
        .success()
        .stdout(contains("Backups"))
        .stdout(contains("Restored"))
        .stdout(contains("(1 expense(s))"));
}

#[test]
fn unknown_command_suggests_a_close_match() {
    let home = common::temp_base();
    script_command(&home)
        .write_stdin("totl\n")
        .assert()
        .success()
        .stdout(contains("Unknown command `totl`").and(contains("Did you mean `total`?")));
}

#[test]
fn hand_edited_time_only_label_pattern_does_not_break_startup() {
    let home = common::temp_base();
    std::fs::create_dir_all(home.join("config")).unwrap();
    std::fs::write(
        home.join("config").join("config.json"),
        r#"{"chart_label_format":"%H:%M"}"#,
    )
    .unwrap();

    script_command(&home)
        .write_stdin("add Coffee 3\nchart\n")
        .assert()
        .success()
        .stdout(contains("Spend per day").and(contains("$3.00")));
}
