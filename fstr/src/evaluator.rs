//! The seam between templates and the expression language.
//!
//! Templates only know how to find the expression parts of their source.
//! Turning an expression into something that produces a [`Value`] is the
//! job of an [`Evaluator`].  The default one is
//! [`PyEvaluator`](crate::PyEvaluator) which understands a subset of
//! Python's expression grammar, but an environment can be configured with a
//! different evaluator via
//! [`Environment::set_evaluator`](crate::Environment::set_evaluator).
//!
//! ```
//! use std::sync::Arc;
//! use fstr::{CompiledExpr, Context, Environment, Error, ErrorKind, Evaluator};
//! use fstr::value::Value;
//!
//! /// An evaluator that only understands bare names.
//! #[derive(Debug)]
//! struct Names;
//!
//! #[derive(Debug)]
//! struct Name(String);
//!
//! impl Evaluator for Names {
//!     fn compile(&self, source: &str) -> Result<Arc<dyn CompiledExpr>, Error> {
//!         if source.chars().all(|c| c.is_alphanumeric() || c == '_') {
//!             Ok(Arc::new(Name(source.to_string())))
//!         } else {
//!             Err(Error::new(ErrorKind::SyntaxError, "only names are allowed"))
//!         }
//!     }
//! }
//!
//! impl CompiledExpr for Name {
//!     fn eval(&self, ctx: &Context<'_>) -> Result<Value, Error> {
//!         ctx.lookup(&self.0).ok_or_else(|| {
//!             Error::new(ErrorKind::UndefinedName, format!("name '{}' is not defined", self.0))
//!         })
//!     }
//! }
//!
//! let mut env = Environment::new();
//! env.set_evaluator(Names);
//! assert!(env.template("{1 + 1}").is_err());
//! let tmpl = env.template("Hello {name}!").unwrap();
//! assert_eq!(tmpl.render(fstr::context!(name => "World")).unwrap(), "Hello World!");
//! ```
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::value::Value;

/// Compiles expression source into an evaluable form.
///
/// Compilation happens once, when a template is created.  Errors returned
/// here are reported as template construction errors.  If the error carries
/// an offset it must be relative to the start of `source`; the template
/// compiler maps it back into template coordinates.
pub trait Evaluator: Send + Sync + 'static {
    /// Compiles a single expression.
    ///
    /// The source is already trimmed, has its newlines removed and is
    /// guaranteed to not be empty.
    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledExpr>, Error>;
}

/// A compiled expression.
pub trait CompiledExpr: fmt::Debug + Send + Sync {
    /// Evaluates the expression against a context.
    fn eval(&self, ctx: &Context<'_>) -> Result<Value, Error>;
}
