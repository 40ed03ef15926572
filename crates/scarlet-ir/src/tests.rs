//! Tests for scarlet-ir.

use crate::{Command, ExprObj, ScriptObj, SeqObj};
use serde_json::json;

#[test]
fn test_script_shape() {
    let script = ScriptObj {
        cmds: vec![
            Command::Declare {
                assign: ExprObj::var("arg_0"),
                value: ExprObj::Arg { index: 0 },
            },
            Command::Return { value: None },
        ],
        argv: vec!["name".into()],
        keyv: vec![],
    };

    assert_eq!(
        serde_json::to_value(&script).unwrap(),
        json!({
            "kind": "script",
            "cmds": [
                {
                    "kind": "declare",
                    "assign": {"kind": "var", "name": "arg_0"},
                    "value": {"kind": "arg", "index": 0},
                },
                {"kind": "return", "value": null},
            ],
            "argv": ["name"],
            "keyv": [],
        })
    );
}

#[test]
fn test_branch_shape_keeps_empty_else() {
    let branch = Command::Branch {
        condition: ExprObj::val(true),
        then: SeqObj::new(vec![Command::Stmt {
            expr: ExprObj::val(1),
        }]),
        otherwise: SeqObj::default(),
    };

    assert_eq!(
        serde_json::to_value(&branch).unwrap(),
        json!({
            "kind": "branch",
            "condition": {"kind": "val", "value": true},
            "then": {"kind": "seq", "cmds": [
                {"kind": "stmt", "expr": {"kind": "val", "value": 1}},
            ]},
            "else": {"kind": "seq", "cmds": []},
        })
    );
}

#[test]
fn test_parse_for_loop() {
    let json = r#"{
        "kind": "for",
        "array": {"kind": "val", "value": [1, 2, 3]},
        "index": {"kind": "index", "name": "ix_0"},
        "value": {"kind": "var", "name": "val_0"},
        "body": {"kind": "seq", "cmds": []}
    }"#;
    let cmd: Command = serde_json::from_str(json).unwrap();

    assert_eq!(cmd.kind(), "for");
    let Command::For { index, value, body, .. } = cmd else {
        panic!("expected for loop");
    };
    assert_eq!(index.ref_name(), Some("ix_0"));
    assert_eq!(value.ref_name(), Some("val_0"));
    assert!(body.is_empty());
}

#[test]
fn test_parse_call() {
    let json = r#"{"kind": "call", "name": "string.find",
        "args": [{"kind": "val", "value": "hello"}, {"kind": "val", "value": "l"}]}"#;
    let expr: ExprObj = serde_json::from_str(json).unwrap();

    assert_eq!(
        expr,
        ExprObj::call("string.find", vec![ExprObj::val("hello"), ExprObj::val("l")])
    );
    assert_eq!(expr.ref_name(), None);
}

#[test]
fn test_parse_rejects_unknown_kind() {
    let json = r#"{"kind": "goto", "label": "top"}"#;
    assert!(serde_json::from_str::<Command>(json).is_err());
}
