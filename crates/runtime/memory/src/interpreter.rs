//! Script interpreter.

use std::collections::HashMap;
use std::sync::Arc;

use rhizome_scarlet_ir::{Command, ExprObj, ScriptObj, ValidationError, validate};
use serde_json::Value;
use tracing::debug;

use crate::{Builtins, ExecutionError, LogSink, StdoutSink, normalize, type_name};

/// Runtime limits.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Upper bound on iterations of a single while loop. `None` disables
    /// the bound.
    pub max_iterations: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(1_000_000),
        }
    }
}

/// Executes compiled scripts in memory.
#[derive(Clone)]
pub struct MemoryRuntime {
    builtins: Builtins,
    config: MemoryConfig,
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryRuntime {
    /// Create a runtime that logs to stdout.
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    pub fn with_sink(config: MemoryConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            builtins: Builtins::new(sink),
            config,
        }
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Run `script` with the given key names and JSON arguments.
    ///
    /// Returns the value of the first return command that runs, or null if
    /// the script ends without one. Arguments, literals and results are
    /// [`normalize`]d, as the server's engine would see them.
    pub fn execute(
        &self,
        script: &ScriptObj,
        keys: &[String],
        args: &[Value],
    ) -> Result<Value, ExecutionError> {
        validate(script)?;
        if keys.len() != script.keyv.len() {
            return Err(ExecutionError::InputCount {
                what: "keys",
                expected: script.keyv.len(),
                got: keys.len(),
            });
        }
        if args.len() != script.argv.len() {
            return Err(ExecutionError::InputCount {
                what: "args",
                expected: script.argv.len(),
                got: args.len(),
            });
        }

        debug!(keys = keys.len(), args = args.len(), "executing script");
        let mut frame = Frame {
            runtime: self,
            keys,
            args: args.iter().cloned().map(normalize).collect(),
            vars: HashMap::new(),
        };
        match frame.run(&script.cmds)? {
            Flow::Return(value) => Ok(normalize(value)),
            Flow::Next => Ok(Value::Null),
        }
    }
}

enum Flow {
    Next,
    Return(Value),
}

struct Frame<'a> {
    runtime: &'a MemoryRuntime,
    keys: &'a [String],
    args: Vec<Value>,
    vars: HashMap<String, Value>,
}

fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

impl Frame<'_> {
    fn run(&mut self, cmds: &[Command]) -> Result<Flow, ExecutionError> {
        for cmd in cmds {
            if let Flow::Return(value) = self.command(cmd)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn command(&mut self, cmd: &Command) -> Result<Flow, ExecutionError> {
        match cmd {
            Command::Declare { assign, value } | Command::Assign { assign, value } => {
                let value = self.eval(value)?;
                let name = assign.ref_name().ok_or(ValidationError::InvalidTarget {
                    command: cmd.kind(),
                })?;
                self.vars.insert(name.to_string(), value);
                Ok(Flow::Next)
            }
            Command::Stmt { expr } => {
                self.eval(expr)?;
                Ok(Flow::Next)
            }
            Command::Branch {
                condition,
                then,
                otherwise,
            } => {
                if truthy(&self.eval(condition)?) {
                    self.run(&then.cmds)
                } else {
                    self.run(&otherwise.cmds)
                }
            }
            Command::For {
                array,
                index,
                value,
                body,
            } => {
                let items = match self.eval(array)? {
                    // Iteration ends at the first null, like ipairs at a nil.
                    Value::Array(items) => items
                        .into_iter()
                        .take_while(|item| !item.is_null())
                        .collect(),
                    // Only the array part of a table is iterated.
                    Value::Object(_) => Vec::new(),
                    other => return Err(ExecutionError::NotIterable(type_name(&other))),
                };
                let (Some(ix), Some(val)) = (index.ref_name(), value.ref_name()) else {
                    return Err(ValidationError::InvalidLoopVariable {
                        expected: "a reference",
                    }
                    .into());
                };
                for (pos, item) in items.into_iter().enumerate() {
                    self.vars.insert(ix.to_string(), Value::from(pos));
                    self.vars.insert(val.to_string(), item);
                    if let Flow::Return(value) = self.run(&body.cmds)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Next)
            }
            Command::While { condition, body } => {
                let mut iterations = 0u64;
                while truthy(&self.eval(condition)?) {
                    if let Some(max) = self.runtime.config.max_iterations {
                        if iterations >= max {
                            return Err(ExecutionError::IterationLimit(max));
                        }
                    }
                    iterations += 1;
                    if let Flow::Return(value) = self.run(&body.cmds)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Next)
            }
            Command::Return { value } => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn eval(&self, expr: &ExprObj) -> Result<Value, ExecutionError> {
        match expr {
            ExprObj::Val { value } => Ok(normalize(value.clone())),
            ExprObj::Arg { index } => self.args.get(*index).cloned().ok_or_else(|| {
                ValidationError::ArgOutOfRange {
                    index: *index,
                    count: self.args.len(),
                }
                .into()
            }),
            ExprObj::Key { index } => self
                .keys
                .get(*index)
                .map(|key| Value::String(key.clone()))
                .ok_or_else(|| {
                    ValidationError::KeyOutOfRange {
                        index: *index,
                        count: self.keys.len(),
                    }
                    .into()
                }),
            ExprObj::Var { name } | ExprObj::Index { name } => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| ExecutionError::Undefined(name.clone())),
            ExprObj::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(normalize(self.runtime.builtins.call(name, &args)?))
            }
        }
    }
}
