use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::Context;
use crate::environment::Environment;
use crate::error::Error;
use crate::evaluator::CompiledExpr;
use crate::render::validate_context;
use crate::value::Value;

/// A handle to a compiled expression.
///
/// An expression is created via the
/// [`compile_expression`](Environment::compile_expression) method.  It provides
/// a method to evaluate the expression and return the result as value object.
/// This is the same machinery a template uses for its replacement fields,
/// without the conversion and format spec step.
///
/// This is usually best paired with [`context`](crate::context!) to pass
/// a single value to it.
///
/// # Example
///
/// ```rust
/// # use fstr::{Environment, context};
/// let env = Environment::new();
/// let expr = env.compile_expression("10 < number < 20").unwrap();
/// let rv = expr.eval(context!(number => 15)).unwrap();
/// assert!(rv.is_true());
/// ```
pub struct Expression<'env> {
    env: &'env Environment,
    source: String,
    compiled: Arc<dyn CompiledExpr>,
}

impl fmt::Debug for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("env", &self.env)
            .finish()
    }
}

impl<'env> Expression<'env> {
    pub(crate) fn new(
        env: &'env Environment,
        source: &str,
        compiled: Arc<dyn CompiledExpr>,
    ) -> Expression<'env> {
        Expression {
            env,
            source: source.to_string(),
            compiled,
        }
    }

    /// Returns the expression source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression with some context.
    ///
    /// The result of the expression is returned as [`Value`].
    pub fn eval<S: Serialize>(&self, ctx: S) -> Result<Value, Error> {
        // reduce total amount of code falling under mono morphization into
        // this function, and share the rest in _eval.
        self._eval(Value::from_serialize(&ctx))
    }

    fn _eval(&self, ctx: Value) -> Result<Value, Error> {
        let ctx = ok!(validate_context(ctx));
        let captured = Value::NONE;
        let context = Context::new(self.env, &ctx, &captured);
        self.compiled
            .eval(&context)
            .and_then(Value::validate)
            .map_err(|mut err| {
                err.set_expression(&self.source);
                self.env.attach_debug_info(err, &self.source)
            })
    }
}
