//! Expressions.

use rhizome_scarlet_ir::ExprObj;
use serde_json::Value;

/// Anything that compiles to one expression node.
pub trait Expr {
    fn compile(&self) -> ExprObj;
}

impl<T: Expr + ?Sized> Expr for &T {
    fn compile(&self) -> ExprObj {
        (**self).compile()
    }
}

impl Expr for ExprObj {
    fn compile(&self) -> ExprObj {
        self.clone()
    }
}

impl Expr for Value {
    fn compile(&self) -> ExprObj {
        ExprObj::val(self.clone())
    }
}

impl Expr for str {
    fn compile(&self) -> ExprObj {
        ExprObj::val(self)
    }
}

impl Expr for String {
    fn compile(&self) -> ExprObj {
        ExprObj::val(self.as_str())
    }
}

macro_rules! literal_expr {
    ($($ty:ty),*) => {
        $(
            impl Expr for $ty {
                fn compile(&self) -> ExprObj {
                    ExprObj::val(*self)
                }
            }
        )*
    };
}

literal_expr!(bool, i32, i64, u32, u64, f64);

/// Wraps a JSON-compatible value as a literal expression.
pub fn lit(value: impl Into<Value>) -> ExprObj {
    ExprObj::val(value)
}

/// A call to a standard-library function such as `cjson.decode`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    name: String,
    args: Vec<ExprObj>,
}

impl Call {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Expr for Call {
    fn compile(&self) -> ExprObj {
        ExprObj::call(self.name.clone(), self.args.clone())
    }
}

/// Calls the function `name` with `args`, compiled left to right.
pub fn call(name: &str, args: &[&dyn Expr]) -> Call {
    Call {
        name: name.to_string(),
        args: args.iter().map(|arg| arg.compile()).collect(),
    }
}
