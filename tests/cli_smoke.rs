// End-to-end checks of the binary's non-interactive surfaces. The drill
// itself needs a TTY and is covered by the pseudo-terminal test.

use assert_cmd::Command;

fn typedrill() -> Command {
    Command::cargo_bin("typedrill").unwrap()
}

#[test]
fn list_prints_the_builtin_problems() {
    let output = typedrill().arg("--list").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("climbing_stairs"));
    assert!(stdout.contains("coin_change"));
    assert!(stdout.contains("number_of_islands"));
}

#[test]
fn status_reports_a_fresh_quota() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("attempts.db");

    let output = typedrill()
        .args(["--status", "-u", "alice", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("alice"));
    assert!(stdout.contains("0/3"));
    assert!(stdout.contains("3 remaining"));
}

#[test]
fn status_without_a_user_is_an_error() {
    let output = typedrill().arg("--status").output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--status needs --user"));
}

#[test]
fn drill_refuses_to_run_without_a_tty() {
    let output = typedrill().output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("stdin must be a tty"));
}

#[test]
fn inadmissible_seconds_are_rejected() {
    let output = typedrill().args(["-s", "90"]).output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("must be 60 or 120"));
}

#[test]
fn unknown_problem_ids_are_rejected() {
    let output = typedrill().args(["-p", "no_such_drill"]).output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown problem"));
}
