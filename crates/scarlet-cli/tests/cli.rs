//! End-to-end tests for the scarlet binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use rhizome_scarlet_syntax_symbolic::{ScriptScope, call};

fn scarlet(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scarlet"))
        .args(args)
        .output()
        .expect("failed to run scarlet")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_script(dir: &Path) -> String {
    let mut scope = ScriptScope::new();
    let key = scope.add_key("name").unwrap();
    let items = scope.add_arg("items").unwrap();
    let count = scope.add_local(0).unwrap();
    let (body, ix, _) = scope.for_(&items);
    scope.seq(body).assign(&count, &ix).unwrap();
    scope.add(call("redis.log", &[&"notice", &key]));
    scope.set_return_value(Some(&count));

    let path = dir.join("script.json");
    let json = serde_json::to_string_pretty(&scope.compile()).unwrap();
    std::fs::write(&path, json).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());

    let output = scarlet(&["check", &path]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "ok: 6 commands, 1 args, 1 keys");
}

#[test]
fn test_check_rejects_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"kind": "script", "argv": [], "keyv": [],
            "cmds": [{"kind": "return", "value": {"kind": "arg", "index": 0}}]}"#,
    )
    .unwrap();

    let output = scarlet(&["check", &path.to_string_lossy()]);
    assert!(!output.status.success());
}

#[test]
fn test_emit_to_file_and_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());

    let output = scarlet(&["emit", &path]);
    assert!(output.status.success());
    let lua = std::fs::read_to_string(dir.path().join("script.lua")).unwrap();
    assert!(lua.starts_with("local key_0 = KEYS[1]\n"));
    assert!(lua.contains("for ix_0, val_0 in ipairs(arg_0) do\n"));

    let output = scarlet(&["emit", &path, "--stdout"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), lua);
}

#[test]
fn test_exec_backends() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());

    for backend in ["memory", "lua"] {
        let output = scarlet(&[
            "exec", &path, "--key", "user:1", "--arg", "[1, 2, 3]", "--backend", backend,
        ]);
        assert!(output.status.success(), "{backend} failed");
        let out = stdout(&output);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("notice: user:1"), "{backend}");
        assert_eq!(lines.next(), Some("2"), "{backend}");
    }
}

#[test]
fn test_exec_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());
    let script = std::fs::read_to_string(&path).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_scarlet"))
        .args(["exec", "-", "-k", "k", "-a", "[]"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(stdout(&output), "notice: k\n0\n");
}

#[test]
fn test_exec_wrong_input_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());

    let output = scarlet(&["exec", &path, "--arg", "[]"]);
    assert!(!output.status.success());
}
