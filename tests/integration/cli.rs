//! The `quicktext` binary end to end.

use predicates::prelude::*;
use serde_json::Value;

use crate::common::TestWorkspace;

#[test]
fn test_tokenize_lists_top_level_directives() {
    let ws = TestWorkspace::new().unwrap();
    let template = ws
        .write("reply.txt", "Hi [[TO=firstname]], see [[URL=http://x|[[TO=email]]]] [[URL=open")
        .unwrap();

    ws.command()
        .arg("tokenize")
        .arg(&template)
        .arg("--raw")
        .assert()
        .success()
        .stdout("[[TO=firstname]]\n[[URL=http://x|[[TO=email]]]]\n");

    ws.command()
        .arg("tokenize")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"["http://x", "[[TO=email]]"]"#))
        .stdout(predicate::str::contains("URL"));
}

#[test]
fn test_tokenize_reads_stdin() {
    let ws = TestWorkspace::new().unwrap();
    ws.command()
        .args(["tokenize", "--raw"])
        .write_stdin("[[DATE]] and [[DATE]] and [[TIME=seconds]]")
        .assert()
        .success()
        .stdout("[[DATE]]\n[[TIME=seconds]]\n");
}

#[test]
fn test_expand_template_file() {
    let ws = TestWorkspace::new().unwrap();
    let template = ws
        .write("reply.txt", "Hello [[TO=firstname| and ]], re: [[SUBJECT]] #[[COUNTER]] [[URL=open")
        .unwrap();

    for expected in ["#1", "#2"] {
        ws.command()
            .arg("expand")
            .arg(&template)
            .arg("--context")
            .arg(ws.path("compose.toml"))
            .arg("--non-interactive")
            .assert()
            .success()
            .stdout(format!("Hello Ada and Charles, re: Analytical engine {expected} [[URL=open\n"));
    }

    let store: Value = serde_json::from_str(&ws.read("store.json").unwrap()).unwrap();
    assert_eq!(store["counter"], 2);
}

#[test]
fn test_expand_stdin_with_report() {
    let ws = TestWorkspace::new().unwrap();
    ws.command()
        .arg("expand")
        .arg("--context")
        .arg(ws.path("compose.toml"))
        .arg("--report")
        .write_stdin("[[TEXT=Replies|signature]] / [[INPUT=Name|text|Guest]]")
        .assert()
        .success()
        .stdout("-- Grace Hopper / Guest\n")
        .stderr(predicate::str::contains("3 pass(es)"));
}

#[test]
fn test_expand_without_context_uses_empty_compose_window() {
    let ws = TestWorkspace::new().unwrap();
    ws.command()
        .args(["expand", "-", "--plain"])
        .write_stdin("To: [[TO=email]]. [[CLIPBOARD]]Done.")
        .assert()
        .success()
        .stdout("To: . Done.\n");
}

#[test]
fn test_text_command_expands_library_template() {
    let ws = TestWorkspace::new().unwrap();
    ws.command()
        .args(["text", "Replies", "thanks", "--context"])
        .arg(ws.path("compose.toml"))
        .assert()
        .success()
        .stdout("Thanks for Analytical engine, Ada and Charles.\n");
}

#[test]
fn test_text_command_reports_missing_template() {
    let ws = TestWorkspace::new().unwrap();
    ws.command()
        .args(["text", "Replies", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template 'nope' not found in group 'Replies'"));
}

#[test]
fn test_explicit_template_library_must_exist() {
    let ws = TestWorkspace::new().unwrap();
    ws.command()
        .args(["expand", "--templates"])
        .arg(ws.path("missing.toml"))
        .write_stdin("[[SUBJECT]]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_counter_reset_and_show() {
    let ws = TestWorkspace::new().unwrap();

    ws.command().arg("counter").assert().success().stdout("0\n");
    ws.command().args(["counter", "reset", "41"]).assert().success();
    ws.command().args(["counter", "show"]).assert().success().stdout("41\n");

    ws.command()
        .arg("expand")
        .write_stdin("No. [[COUNTER]]")
        .assert()
        .success()
        .stdout("No. 42\n");
    ws.command().arg("counter").assert().success().stdout("42\n");
}

#[test]
fn test_config_init_show_and_path() {
    let ws = TestWorkspace::new().unwrap();
    let fresh = ws.path("nested/config.toml");

    ws.command_with_config(&fresh)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nested"));

    ws.command_with_config(&fresh).args(["config", "init"]).assert().success();
    assert!(fresh.exists());

    ws.command_with_config(&fresh)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    ws.command_with_config(&fresh).args(["config", "init", "--force"]).assert().success();

    ws.command()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[date_formats]"))
        .stdout(predicate::str::contains("store.json"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let ws = TestWorkspace::new().unwrap();
    ws.command().args(["-v", "-q", "tokenize"]).assert().failure();
}
