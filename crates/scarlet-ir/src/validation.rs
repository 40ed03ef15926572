//! Script validation.

use std::collections::HashSet;

use thiserror::Error;

use crate::{Command, ExprObj, ScriptObj, SeqObj};

/// Errors that can occur during validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid {command} target: expected a var reference")]
    InvalidTarget { command: &'static str },

    #[error("invalid loop variable: expected {expected} reference")]
    InvalidLoopVariable { expected: &'static str },

    #[error("argument position {index} out of range ({count} declared)")]
    ArgOutOfRange { index: usize, count: usize },

    #[error("key position {index} out of range ({count} declared)")]
    KeyOutOfRange { index: usize, count: usize },

    #[error("undeclared variable: {0}")]
    Undeclared(String),

    #[error("variable declared twice: {0}")]
    Redeclared(String),

    #[error("call without function name")]
    EmptyCall,
}

/// Validate a script for structural correctness.
///
/// This checks that:
/// - declaration and assignment targets are `var` references
/// - positional `arg`/`key` loads fall inside `argv`/`keyv`
/// - every referenced variable is declared before use, and loop variables
///   are only referenced inside their own loop body
/// - no variable is declared twice
///
/// Note: This does NOT check function names or arity. That requires the
/// builtin catalog and is done by the executing backend.
pub fn validate(script: &ScriptObj) -> Result<(), ValidationError> {
    let mut scopes = Scopes {
        argc: script.argv.len(),
        keyc: script.keyv.len(),
        frames: vec![HashSet::new()],
    };
    scopes.commands(&script.cmds)
}

struct Scopes {
    argc: usize,
    keyc: usize,
    frames: Vec<HashSet<String>>,
}

impl Scopes {
    fn is_declared(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains(name))
    }

    fn declare(&mut self, name: &str) -> Result<(), ValidationError> {
        if self.is_declared(name) {
            return Err(ValidationError::Redeclared(name.to_string()));
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string());
        }
        Ok(())
    }

    fn block(&mut self, seq: &SeqObj, bound: &[&str]) -> Result<(), ValidationError> {
        self.frames.push(HashSet::new());
        let result = bound
            .iter()
            .try_for_each(|name| self.declare(name))
            .and_then(|_| self.commands(&seq.cmds));
        self.frames.pop();
        result
    }

    fn commands(&mut self, cmds: &[Command]) -> Result<(), ValidationError> {
        cmds.iter().try_for_each(|cmd| self.command(cmd))
    }

    fn command(&mut self, cmd: &Command) -> Result<(), ValidationError> {
        match cmd {
            Command::Declare { assign, value } => {
                self.expr(value)?;
                match assign {
                    ExprObj::Var { name } => self.declare(name),
                    _ => Err(ValidationError::InvalidTarget { command: "declare" }),
                }
            }
            Command::Assign { assign, value } => {
                self.expr(value)?;
                match assign {
                    ExprObj::Var { .. } => self.expr(assign),
                    _ => Err(ValidationError::InvalidTarget { command: "assign" }),
                }
            }
            Command::Stmt { expr } => self.expr(expr),
            Command::Branch {
                condition,
                then,
                otherwise,
            } => {
                self.expr(condition)?;
                self.block(then, &[])?;
                self.block(otherwise, &[])
            }
            Command::For {
                array,
                index,
                value,
                body,
            } => {
                self.expr(array)?;
                let ExprObj::Index { name: ix } = index else {
                    return Err(ValidationError::InvalidLoopVariable { expected: "an index" });
                };
                let ExprObj::Var { name: val } = value else {
                    return Err(ValidationError::InvalidLoopVariable { expected: "a var" });
                };
                self.block(body, &[ix.as_str(), val.as_str()])
            }
            Command::While { condition, body } => {
                self.expr(condition)?;
                self.block(body, &[])
            }
            Command::Return { value } => match value {
                Some(value) => self.expr(value),
                None => Ok(()),
            },
        }
    }

    fn expr(&self, expr: &ExprObj) -> Result<(), ValidationError> {
        match expr {
            ExprObj::Val { .. } => Ok(()),
            ExprObj::Arg { index } if *index >= self.argc => Err(ValidationError::ArgOutOfRange {
                index: *index,
                count: self.argc,
            }),
            ExprObj::Key { index } if *index >= self.keyc => Err(ValidationError::KeyOutOfRange {
                index: *index,
                count: self.keyc,
            }),
            ExprObj::Arg { .. } | ExprObj::Key { .. } => Ok(()),
            ExprObj::Var { name } | ExprObj::Index { name } => {
                if self.is_declared(name) {
                    Ok(())
                } else {
                    Err(ValidationError::Undeclared(name.clone()))
                }
            }
            ExprObj::Call { name, args } => {
                if name.is_empty() {
                    return Err(ValidationError::EmptyCall);
                }
                args.iter().try_for_each(|arg| self.expr(arg))
            }
        }
    }
}
