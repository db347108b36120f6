use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn todo_help_works() {
    Command::cargo_bin("todo")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("local task list"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "add", "edit", "toggle", "rm", "list", "show", "stats", "clear", "admin", "export",
        "import", "reset",
    ];

    for cmd in subcommands {
        Command::cargo_bin("todo")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("todo")
        .expect("binary")
        .arg("frobnicate")
        .assert()
        .failure();
}
