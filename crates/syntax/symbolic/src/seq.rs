//! Sequences, the script scope and control flow.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use rhizome_scarlet_ir::{Command, ExprObj, ScriptObj, SeqObj};

use crate::{Expr, SymbolicError, VarKind, Variable};

/// Scope ids start at 1. Id 0 marks [`SeqId::ROOT`], which every scope has.
static NEXT_SCOPE: AtomicUsize = AtomicUsize::new(1);

/// Handle to one sequence of statements owned by a [`ScriptScope`].
///
/// Handles carry the id of the scope that created them and are rejected by
/// any other scope. A cloned scope accepts the handles of its original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqId {
    scope: usize,
    index: usize,
}

impl SeqId {
    /// The script scope's own sequence.
    pub const ROOT: SeqId = SeqId { scope: 0, index: 0 };
}

/// One entry of a sequence. Child blocks are referenced by handle so they
/// can still be extended after the parent statement was appended.
#[derive(Debug, Clone)]
enum Statement {
    Stmt(ExprObj),
    Declare(Command),
    Assign {
        var: Variable,
        value: ExprObj,
    },
    Branch {
        condition: ExprObj,
        then: SeqId,
        otherwise: SeqId,
    },
    For {
        array: ExprObj,
        index: Variable,
        value: Variable,
        body: SeqId,
    },
    While {
        condition: ExprObj,
        body: SeqId,
    },
    Return(Option<ExprObj>),
}

/// The root of a script.
///
/// Owns every sequence of the script, the argument, key and local
/// namespaces, and the loop id counter. Building is single pass: statements
/// are appended in call order and [`ScriptScope::compile`] freezes the
/// result into a [`ScriptObj`].
#[derive(Debug, Clone)]
pub struct ScriptScope {
    id: usize,
    seqs: Vec<Vec<Statement>>,
    args: Vec<(String, Variable)>,
    keys: Vec<(String, Variable)>,
    arg_names: HashSet<String>,
    key_names: HashSet<String>,
    locals: Vec<Variable>,
    loops: usize,
}

impl Default for ScriptScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptScope {
    pub fn new() -> Self {
        Self {
            id: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
            seqs: vec![Vec::new()],
            args: Vec::new(),
            keys: Vec::new(),
            arg_names: HashSet::new(),
            key_names: HashSet::new(),
            locals: Vec::new(),
            loops: 0,
        }
    }

    /// Returns a cursor appending to the sequence `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this scope.
    pub fn seq(&mut self, id: SeqId) -> SeqMut<'_> {
        self.check_owned(id);
        SeqMut { scope: self, id }
    }

    fn check_owned(&self, id: SeqId) {
        let owned = (id == SeqId::ROOT || id.scope == self.id) && id.index < self.seqs.len();
        assert!(owned, "sequence {}:{} not in this scope", id.scope, id.index);
    }

    /// Declares a script argument.
    pub fn add_arg(&mut self, name: &str) -> Result<Variable, SymbolicError> {
        if self.arg_names.contains(name) {
            return Err(SymbolicError::DuplicateArg(name.to_string()));
        }
        let index = self.args.len();
        let arg = Variable::new(VarKind::Argument, index);
        self.declare(arg, ExprObj::Arg { index })?;
        self.args.push((name.to_string(), arg));
        self.arg_names.insert(name.to_string());
        Ok(arg)
    }

    /// Declares a key.
    pub fn add_key(&mut self, name: &str) -> Result<Variable, SymbolicError> {
        if self.key_names.contains(name) {
            return Err(SymbolicError::DuplicateKey(name.to_string()));
        }
        let index = self.keys.len();
        let key = Variable::new(VarKind::Key, index);
        self.declare(key, ExprObj::Key { index })?;
        self.keys.push((name.to_string(), key));
        self.key_names.insert(name.to_string());
        Ok(key)
    }

    /// Declares a local initialized from `init`.
    pub fn add_local(&mut self, init: impl Expr) -> Result<Variable, SymbolicError> {
        let local = Variable::new(VarKind::Local, self.locals.len());
        self.declare(local, init.compile())?;
        self.locals.push(local);
        Ok(local)
    }

    fn declare(&mut self, var: Variable, value: ExprObj) -> Result<(), SymbolicError> {
        let cmd = var.declaration(value)?;
        self.push(SeqId::ROOT, Statement::Declare(cmd));
        Ok(())
    }

    /// Allocates the next loop id.
    pub fn add_loop(&mut self) -> usize {
        let id = self.loops;
        self.loops += 1;
        id
    }

    /// Appends the terminal return. `None` returns no value.
    pub fn set_return_value(&mut self, value: Option<&dyn Expr>) {
        let value = value.map(|value| value.compile());
        self.push(SeqId::ROOT, Statement::Return(value));
    }

    pub fn args(&self) -> impl Iterator<Item = (&str, Variable)> {
        self.args.iter().map(|(name, var)| (name.as_str(), *var))
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, Variable)> {
        self.keys.iter().map(|(name, var)| (name.as_str(), *var))
    }

    pub fn locals(&self) -> &[Variable] {
        &self.locals
    }

    // Root sequence shortcuts.

    pub fn add(&mut self, term: impl Expr) {
        self.seq(SeqId::ROOT).add(term);
    }

    pub fn assign(&mut self, var: &Variable, value: impl Expr) -> Result<(), SymbolicError> {
        self.seq(SeqId::ROOT).assign(var, value)
    }

    pub fn is_empty(&self) -> bool {
        self.seqs[SeqId::ROOT.index].is_empty()
    }

    pub fn for_(&mut self, array: impl Expr) -> (SeqId, Variable, Variable) {
        self.seq(SeqId::ROOT).for_(array)
    }

    pub fn if_(&mut self, condition: impl Expr) -> (SeqId, SeqId) {
        self.seq(SeqId::ROOT).if_(condition)
    }

    pub fn while_(&mut self, condition: impl Expr) -> SeqId {
        self.seq(SeqId::ROOT).while_(condition)
    }

    /// Compiles the sequence `id` as a plain block.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this scope.
    pub fn compile_seq(&self, id: SeqId) -> SeqObj {
        self.check_owned(id);
        SeqObj::new(self.compile_cmds(id))
    }

    /// Compiles the script, consuming the builder.
    pub fn compile(self) -> ScriptObj {
        ScriptObj {
            cmds: self.compile_cmds(SeqId::ROOT),
            argv: self.args.into_iter().map(|(name, _)| name).collect(),
            keyv: self.keys.into_iter().map(|(name, _)| name).collect(),
        }
    }

    fn new_seq(&mut self) -> SeqId {
        self.seqs.push(Vec::new());
        SeqId {
            scope: self.id,
            index: self.seqs.len() - 1,
        }
    }

    fn push(&mut self, id: SeqId, stmt: Statement) {
        self.seqs[id.index].push(stmt);
    }

    fn compile_cmds(&self, id: SeqId) -> Vec<Command> {
        self.seqs[id.index]
            .iter()
            .map(|stmt| self.compile_statement(stmt))
            .collect()
    }

    fn compile_statement(&self, stmt: &Statement) -> Command {
        match stmt {
            Statement::Stmt(expr) => Command::Stmt { expr: expr.clone() },
            Statement::Declare(cmd) => cmd.clone(),
            Statement::Assign { var, value } => Command::Assign {
                assign: var.get_ref(),
                value: value.clone(),
            },
            Statement::Branch {
                condition,
                then,
                otherwise,
            } => Command::Branch {
                condition: condition.clone(),
                then: self.compile_seq(*then),
                otherwise: self.compile_seq(*otherwise),
            },
            Statement::For {
                array,
                index,
                value,
                body,
            } => Command::For {
                array: array.clone(),
                index: index.get_ref(),
                value: value.get_ref(),
                body: self.compile_seq(*body),
            },
            Statement::While { condition, body } => Command::While {
                condition: condition.clone(),
                body: self.compile_seq(*body),
            },
            Statement::Return(value) => Command::Return {
                value: value.clone(),
            },
        }
    }
}

/// Appends statements to one sequence of a [`ScriptScope`].
///
/// Control-flow methods append their node right away and hand back handles
/// to the child sequences. Anything added through those handles later still
/// ends up inside the node when the script is compiled.
pub struct SeqMut<'a> {
    scope: &'a mut ScriptScope,
    id: SeqId,
}

impl SeqMut<'_> {
    pub fn id(&self) -> SeqId {
        self.id
    }

    /// Appends an expression evaluated for its side effects.
    pub fn add(&mut self, term: impl Expr) -> &mut Self {
        self.scope.push(self.id, Statement::Stmt(term.compile()));
        self
    }

    /// Appends an assignment to a local.
    pub fn assign(&mut self, var: &Variable, value: impl Expr) -> Result<(), SymbolicError> {
        if var.kind() != VarKind::Local {
            return Err(SymbolicError::NotAssignable(var.name()));
        }
        self.scope.push(
            self.id,
            Statement::Assign {
                var: *var,
                value: value.compile(),
            },
        );
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.scope.seqs[self.id.index].is_empty()
    }

    pub fn compile(&self) -> SeqObj {
        self.scope.compile_seq(self.id)
    }

    /// Appends a for loop over `array`.
    ///
    /// Returns the loop body, the index variable and the value variable.
    pub fn for_(&mut self, array: impl Expr) -> (SeqId, Variable, Variable) {
        let loop_id = self.scope.add_loop();
        let index = Variable::new(VarKind::Index, loop_id);
        let value = Variable::new(VarKind::Value, loop_id);
        let body = self.scope.new_seq();
        self.scope.push(
            self.id,
            Statement::For {
                array: array.compile(),
                index,
                value,
                body,
            },
        );
        (body, index, value)
    }

    /// Appends an if branch.
    ///
    /// Returns the bodies of the successful and the unsuccessful branch.
    pub fn if_(&mut self, condition: impl Expr) -> (SeqId, SeqId) {
        let then = self.scope.new_seq();
        let otherwise = self.scope.new_seq();
        self.scope.push(
            self.id,
            Statement::Branch {
                condition: condition.compile(),
                then,
                otherwise,
            },
        );
        (then, otherwise)
    }

    /// Appends a while loop. Returns the loop body, which runs until
    /// `condition` no longer holds.
    pub fn while_(&mut self, condition: impl Expr) -> SeqId {
        let body = self.scope.new_seq();
        self.scope.push(
            self.id,
            Statement::While {
                condition: condition.compile(),
                body,
            },
        );
        body
    }
}
