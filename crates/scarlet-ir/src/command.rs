//! Statement-level IR nodes.

use serde::{Deserialize, Serialize};

use crate::ExprObj;

/// A compiled script: the root of every IR tree.
///
/// `argv` and `keyv` list the declared argument and key names in declaration
/// order. Position `i` of `argv` is bound by the `{"kind": "arg", "index": i}`
/// expression, and likewise for keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "script")]
pub struct ScriptObj {
    pub cmds: Vec<Command>,
    pub argv: Vec<String>,
    pub keyv: Vec<String>,
}

/// A plain block of commands that does not open a new script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "seq")]
pub struct SeqObj {
    pub cmds: Vec<Command>,
}

impl SeqObj {
    pub fn new(cmds: Vec<Command>) -> Self {
        Self { cmds }
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }
}

/// A single command inside a script or block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Introduces a new variable. `assign` is always a `var` reference.
    Declare { assign: ExprObj, value: ExprObj },

    /// Rebinds an already declared variable.
    Assign { assign: ExprObj, value: ExprObj },

    /// Evaluates an expression for its side effects.
    Stmt { expr: ExprObj },

    Branch {
        condition: ExprObj,
        then: SeqObj,
        #[serde(rename = "else")]
        otherwise: SeqObj,
    },

    /// Iterates an array. `index` is an `index` reference, `value` a `var` reference.
    For {
        array: ExprObj,
        index: ExprObj,
        value: ExprObj,
        body: SeqObj,
    },

    While { condition: ExprObj, body: SeqObj },

    /// Ends the script. `None` returns no value.
    Return { value: Option<ExprObj> },
}

impl Command {
    /// The `kind` tag this command serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Declare { .. } => "declare",
            Command::Assign { .. } => "assign",
            Command::Stmt { .. } => "stmt",
            Command::Branch { .. } => "branch",
            Command::For { .. } => "for",
            Command::While { .. } => "while",
            Command::Return { .. } => "return",
        }
    }
}
