//! Script IR types and validation for Scarlet.
//!
//! This crate defines the intermediate representation shared by the symbolic
//! builder frontend and both execution targets (the Lua emitter and the
//! in-memory interpreter).
//!
//! # IR format
//!
//! The IR is a plain JSON tree. Every node carries a `kind` tag:
//!
//! ```json
//! {"kind": "script", "argv": ["name"], "keyv": ["out"], "cmds": [
//!   {"kind": "declare", "assign": {"kind": "var", "name": "arg_0"},
//!    "value": {"kind": "arg", "index": 0}},
//!   {"kind": "return", "value": {"kind": "var", "name": "arg_0"}}
//! ]}
//! ```

mod command;
mod expr;
mod validation;

pub use command::{Command, ScriptObj, SeqObj};
pub use expr::ExprObj;
pub use validation::{ValidationError, validate};

#[cfg(test)]
mod tests;
