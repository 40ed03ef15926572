//! Lua backend for Scarlet scripts.
//!
//! [`emit`] turns a compiled script into a Lua chunk that can be loaded on a
//! server. [`LuaRuntime`] runs such chunks locally in LuaJIT with the parts
//! of the server environment the generated code uses.

mod codegen;
mod runtime;

pub use codegen::{CompileError, emit, emit_expr};
pub use runtime::LuaRuntime;

use rhizome_scarlet_ir::ValidationError;
use thiserror::Error;

/// Errors that can occur during execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("compilation error: {0}")]
    Compile(#[from] CompileError),

    #[error("invalid script: {0}")]
    Validation(#[from] ValidationError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected} {what}, got {got}")]
    InputCount {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}
