//! The default expression language.
//!
//! This implements the expression subset of Python that makes sense inside
//! a replacement field: literals, displays, comprehensions, operators,
//! attribute and item access, calls and lambdas.  Statements and anything
//! that binds names outside of an expression (assignment expressions,
//! imports) are not supported.
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::evaluator::{CompiledExpr, Evaluator};
use crate::value::Value;

pub(crate) mod ast;
mod eval;
pub(crate) mod lexer;
pub(crate) mod parser;
pub(crate) mod tokens;

/// Evaluates a subset of Python expressions.
///
/// This is the evaluator every [`Environment`](crate::Environment) starts
/// out with.  Expressions can only reach the values of the render context,
/// the captured context and the environment's globals.
///
/// ```
/// # use fstr::{context, Environment};
/// let env = Environment::new();
/// let tmpl = env.template("{', '.join(str(x * 2) for x in items if x)}").unwrap();
/// assert_eq!(tmpl.render(context!(items => [0, 1, 2])).unwrap(), "2, 4");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PyEvaluator;

impl Evaluator for PyEvaluator {
    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledExpr>, Error> {
        let ast = ok!(parser::parse_expr(source));
        Ok(Arc::new(PyExpr { ast }))
    }
}

#[derive(Debug)]
struct PyExpr {
    ast: ast::Expr,
}

impl CompiledExpr for PyExpr {
    fn eval(&self, ctx: &Context<'_>) -> Result<Value, Error> {
        eval::eval(&self.ast, &eval::Frame::root(ctx))
    }
}
