//! Expression-level IR nodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An expression node.
///
/// This is the small vocabulary both backends understand: literals,
/// positional script inputs, variable references and standard-library calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprObj {
    /// A JSON literal.
    Val { value: Value },
    /// The JSON-decoded script argument at `index`.
    Arg { index: usize },
    /// The key name at `index`.
    Key { index: usize },
    /// A reference to a declared variable.
    Var { name: String },
    /// A reference to a for-loop index, which evaluates 0-based.
    Index { name: String },
    /// A standard-library call such as `cjson.decode`.
    Call { name: String, args: Vec<ExprObj> },
}

impl ExprObj {
    pub fn val(value: impl Into<Value>) -> Self {
        ExprObj::Val {
            value: value.into(),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        ExprObj::Var { name: name.into() }
    }

    pub fn index(name: impl Into<String>) -> Self {
        ExprObj::Index { name: name.into() }
    }

    pub fn call(name: impl Into<String>, args: Vec<ExprObj>) -> Self {
        ExprObj::Call {
            name: name.into(),
            args,
        }
    }

    /// Returns the referenced name if this is a `var` or `index` reference.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            ExprObj::Var { name } | ExprObj::Index { name } => Some(name),
            _ => None,
        }
    }
}
