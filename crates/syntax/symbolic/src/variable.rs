//! Declared variables.

use rhizome_scarlet_ir::{Command, ExprObj};

use crate::{Expr, SymbolicError};

/// What a variable was declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// A script argument.
    Argument,
    /// A key name.
    Key,
    /// A local declared with an initial value.
    Local,
    /// The index of a for loop.
    Index,
    /// The value of a for loop.
    Value,
}

impl VarKind {
    pub fn prefix(self) -> &'static str {
        match self {
            VarKind::Argument => "arg",
            VarKind::Key => "key",
            VarKind::Local => "var",
            VarKind::Index => "ix",
            VarKind::Value => "val",
        }
    }
}

/// A reference to a declared variable.
///
/// The index is assigned once when the variable is declared and counts up
/// separately per namespace. The index and value variables of one for loop
/// share the loop's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    kind: VarKind,
    index: usize,
}

impl Variable {
    pub(crate) fn new(kind: VarKind, index: usize) -> Self {
        Self { kind, index }
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The name the variable is referenced by in the IR, e.g. `arg_0`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.index)
    }

    /// Returns the reference node. Loop indices use an `index` node so
    /// backends can present them 0-based.
    pub fn get_ref(&self) -> ExprObj {
        match self.kind {
            VarKind::Index => ExprObj::index(self.name()),
            _ => ExprObj::var(self.name()),
        }
    }

    /// Builds the command declaring this variable with `value`.
    ///
    /// Loop variables are bound by their loop and have no declaration.
    pub fn declaration(&self, value: ExprObj) -> Result<Command, SymbolicError> {
        match self.kind {
            VarKind::Index | VarKind::Value => Err(SymbolicError::LoopVariable(self.name())),
            VarKind::Argument | VarKind::Key | VarKind::Local => Ok(Command::Declare {
                assign: self.get_ref(),
                value,
            }),
        }
    }
}

impl Expr for Variable {
    fn compile(&self) -> ExprObj {
        self.get_ref()
    }
}
