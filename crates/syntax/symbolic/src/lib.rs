//! Symbolic script builder for Scarlet.
//!
//! Scripts are built as a tree of statements rooted in a [`ScriptScope`] and
//! compiled into the IR consumed by the Lua emitter and the in-memory runtime.
//!
//! ```
//! use rhizome_scarlet_syntax_symbolic::{ScriptScope, call};
//!
//! let mut scope = ScriptScope::new();
//! let items = scope.add_arg("items").unwrap();
//! let count = scope.add_local(0).unwrap();
//! let (body, _ix, value) = scope.for_(&items);
//! scope.seq(body).add(call("redis.log", &[&"notice", &value]));
//! scope.set_return_value(Some(&count));
//!
//! let script = scope.compile();
//! assert_eq!(script.argv, vec!["items".to_string()]);
//! ```

mod expr;
mod seq;
mod variable;

pub use expr::{Call, Expr, call, lit};
pub use seq::{ScriptScope, SeqId, SeqMut};
pub use variable::{VarKind, Variable};

use thiserror::Error;

/// Errors raised while building a script.
///
/// All of these indicate a mistake in the code building the script rather
/// than a condition that can occur when the script runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolicError {
    #[error("ambiguous arg name: {0}")]
    DuplicateArg(String),

    #[error("ambiguous key name: {0}")]
    DuplicateKey(String),

    #[error("{0} must be used in for loop")]
    LoopVariable(String),

    #[error("{0} is not assignable")]
    NotAssignable(String),
}
