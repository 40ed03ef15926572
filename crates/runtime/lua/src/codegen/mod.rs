//! Script to Lua code generation.
//!
//! The generated chunk follows the server's calling convention: keys come
//! from `KEYS`, JSON encoded arguments from `ARGV`, and the return value is
//! JSON encoded with `cjson.encode`.

mod functions;

use std::collections::BTreeSet;

use rhizome_scarlet_ir::{Command, ExprObj, ScriptObj, SeqObj};
use rhizome_scarlet_runtime_memory::{Argc, normalize};
use serde_json::Value;
use thiserror::Error;

use functions::Helper;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid argument count for {name}: expected {expected}, got {got}")]
    InvalidArgCount {
        name: String,
        expected: Argc,
        got: usize,
    },

    #[error("invalid function name: {0}")]
    InvalidFunctionName(String),

    #[error("{command} target must be a variable reference")]
    InvalidTarget { command: &'static str },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

const INDENT: &str = "    ";

/// Compile a script to a Lua chunk.
pub fn emit(script: &ScriptObj) -> Result<String, CompileError> {
    let mut emitter = Emitter::default();
    let mut body = String::new();
    emitter.block(&script.cmds, 0, &mut body)?;

    let mut out = String::new();
    for helper in &emitter.helpers {
        out.push_str(helper.source());
        out.push('\n');
    }
    out.push_str(&body);
    Ok(out)
}

/// Compile one expression. Helper functions it needs are not included.
pub fn emit_expr(expr: &ExprObj) -> Result<String, CompileError> {
    Emitter::default().expr(expr)
}

#[derive(Default)]
struct Emitter {
    helpers: BTreeSet<Helper>,
}

impl Emitter {
    fn block(&mut self, cmds: &[Command], depth: usize, out: &mut String) -> Result<(), CompileError> {
        for cmd in cmds {
            self.command(cmd, depth, out)?;
        }
        Ok(())
    }

    fn seq(&mut self, seq: &SeqObj, depth: usize, out: &mut String) -> Result<(), CompileError> {
        self.block(&seq.cmds, depth, out)
    }

    fn command(&mut self, cmd: &Command, depth: usize, out: &mut String) -> Result<(), CompileError> {
        let pad = INDENT.repeat(depth);
        match cmd {
            Command::Declare { assign, value } => {
                let name = target(assign, cmd)?;
                let value = self.expr(value)?;
                out.push_str(&format!("{pad}local {name} = {value}\n"));
            }
            Command::Assign { assign, value } => {
                let name = target(assign, cmd)?;
                let value = self.expr(value)?;
                out.push_str(&format!("{pad}{name} = {value}\n"));
            }
            Command::Stmt { expr } => {
                let code = self.expr(expr)?;
                // Only calls are statements in Lua.
                if matches!(expr, ExprObj::Call { .. }) {
                    out.push_str(&format!("{pad}{code}\n"));
                } else {
                    out.push_str(&format!("{pad}local _ = {code}\n"));
                }
            }
            Command::Branch {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.expr(condition)?;
                out.push_str(&format!("{pad}if {condition} then\n"));
                self.seq(then, depth + 1, out)?;
                if !otherwise.is_empty() {
                    out.push_str(&format!("{pad}else\n"));
                    self.seq(otherwise, depth + 1, out)?;
                }
                out.push_str(&format!("{pad}end\n"));
            }
            Command::For {
                array,
                index,
                value,
                body,
            } => {
                let index = target(index, cmd)?;
                let value = target(value, cmd)?;
                let array = self.expr(array)?;
                out.push_str(&format!(
                    "{pad}for {index}, {value} in ipairs({array}) do\n"
                ));
                self.seq(body, depth + 1, out)?;
                out.push_str(&format!("{pad}end\n"));
            }
            Command::While { condition, body } => {
                let condition = self.expr(condition)?;
                out.push_str(&format!("{pad}while {condition} do\n"));
                self.seq(body, depth + 1, out)?;
                out.push_str(&format!("{pad}end\n"));
            }
            // Wrapped in do/end so a return may appear mid-block.
            Command::Return { value: Some(value) } => {
                let value = self.expr(value)?;
                out.push_str(&format!("{pad}do return cjson.encode({value}) end\n"));
            }
            Command::Return { value: None } => {
                out.push_str(&format!("{pad}do return end\n"));
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &ExprObj) -> Result<String, CompileError> {
        match expr {
            ExprObj::Val { value } => Ok(lua_value(value)),
            ExprObj::Arg { index } => Ok(format!("cjson.decode(ARGV[{}])", index + 1)),
            ExprObj::Key { index } => Ok(format!("KEYS[{}]", index + 1)),
            ExprObj::Var { name } => identifier(name),
            // ipairs counts from 1, scripts count from 0.
            ExprObj::Index { name } => Ok(format!("({} - 1)", identifier(name)?)),
            ExprObj::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::compile_call(name, args, &mut self.helpers)
            }
        }
    }
}

fn target(expr: &ExprObj, cmd: &Command) -> Result<String, CompileError> {
    let name = expr.ref_name().ok_or(CompileError::InvalidTarget {
        command: cmd.kind(),
    })?;
    identifier(name)
}

/// Lua reserved keywords.
const LUA_KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LUA_KEYWORDS.contains(&name)
}

fn identifier(name: &str) -> Result<String, CompileError> {
    if is_identifier(name) {
        Ok(name.to_string())
    } else {
        Err(CompileError::InvalidIdentifier(name.to_string()))
    }
}

/// A Lua literal for a JSON value. Null becomes `nil`. Tables are built from
/// the normalized value, so arrays end at their first null and null object
/// entries are left out.
pub(crate) fn lua_value(value: &Value) -> String {
    lua_literal(&normalize(value.clone()))
}

fn lua_literal(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => lua_string_literal(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(lua_literal).collect();
            format!("{{ {} }}", items.join(", "))
        }
        Value::Object(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let pairs: Vec<String> = map
                .iter()
                .map(|(key, value)| {
                    format!("[{}] = {}", lua_string_literal(key), lua_literal(value))
                })
                .collect();
            format!("{{ {} }}", pairs.join(", "))
        }
    }
}

pub(crate) fn lua_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
