//! In-memory runtime for Scarlet.
//!
//! Interprets compiled scripts without a server, calling into the same
//! standard-library functions a server's script engine provides. Used for
//! tests and offline development.

mod builtins;
mod interpreter;
mod sink;
mod value;

pub use builtins::{Argc, Builtin, BuiltinError, Builtins, canonical_json, to_text, type_name};
pub use interpreter::{MemoryConfig, MemoryRuntime};
pub use sink::{CaptureSink, LogSink, StdoutSink};
pub use value::{format_number, normalize, normalize_number};

use rhizome_scarlet_ir::ValidationError;
use thiserror::Error;

/// Errors that can occur during execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("invalid script: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Builtin(#[from] BuiltinError),

    #[error("expected {expected} {what}, got {got}")]
    InputCount {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("cannot iterate over {0}")]
    NotIterable(&'static str),

    #[error("undefined variable: {0}")]
    Undefined(String),

    #[error("while loop exceeded {0} iterations")]
    IterationLimit(u64),
}
