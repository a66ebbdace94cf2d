//! fstr: delayed f-string style templates for Rust.
//!
//! A template is text with replacement fields in braces, exactly like a
//! Python f-string.  Unlike an f-string the template is not evaluated where
//! it is written.  It is compiled once and can then be rendered any number
//! of times against different contexts.
//!
//! ```
//! use fstr::{Environment, context};
//!
//! let env = Environment::new();
//! let tmpl = env.template("{name!r} has {len(items)} item{'s' if len(items) != 1 else ''}").unwrap();
//! assert_eq!(
//!     tmpl.render(context!(name => "cart", items => vec![1, 2])).unwrap(),
//!     "'cart' has 2 items"
//! );
//! ```
//!
//! For super trivial cases where you need to render a string once, you can
//! also use the [`render!`] macro which acts a bit like a replacement
//! for the [`format!`] macro.
//!
//! # Syntax
//!
//! A replacement field is `{expression!conversion:spec}` where conversion
//! and spec are optional:
//!
//! * `{{` and `}}` produce literal braces.
//! * the conversion is one of `!s` (`str()`), `!r` (`repr()`) or `!a`
//!   (`ascii()`) and is applied before the spec.
//! * the spec follows Python's format spec mini-language (`>10`, `.2f`,
//!   `,d`, `#x`, ...).  It may itself contain replacement fields such as
//!   `{value:{width}.{precision}}` which are rendered first.
//!
//! Templates are checked when they are created.  Malformed braces, empty
//! expressions, invalid conversions, backslashes in expressions and syntax
//! errors are reported with an [`Error`] carrying the offset into the
//! template source.  Undefined names are only detected when a template is
//! rendered.
//!
//! # Contexts
//!
//! Names are resolved in this order:
//!
//! 1. names bound inside the expression (lambda parameters, comprehension
//!    variables)
//! 2. the context passed to [`Template::render`]
//! 3. the context captured with [`Environment::template_with_context`]
//! 4. the globals of the [`Environment`] including the builtin functions
//!
//! Any type implementing [`serde::Serialize`] that serializes into a map can
//! be passed as context.  The [`context!`] macro is the most convenient way
//! to build one.  Rust has no way to look into the stack frame of a caller,
//! so rendering from the "current scope" goes through a [`ScopeProvider`]
//! such as the one built by the [`scope!`] macro.
//!
//! # Expressions
//!
//! The default [`PyEvaluator`] understands the expression subset of Python:
//! literals, list/dict/set displays, comprehensions, arithmetic, comparison
//! and boolean operators, conditional expressions, attribute and item
//! access, slicing, calls and lambdas.  Other expression languages can be
//! plugged in by implementing [`Evaluator`].
//!
//! # Optional Features
//!
//! There are some additional features that can be enabled:
//!
//! - `builtins`: registers the Python builtin functions (`len`, `range`,
//!   `sorted`, ...) with [`Environment::new`].  Enabled by default.
//! - `debug`: errors can carry the template source and render it with a
//!   marker under the failing offset.  Enabled by default.
//! - `unstable_machinery`: exposes the scanner and splitter in
//!   [`machinery`].  There are no stability guarantees for this API.
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::get_first)]
#![allow(clippy::needless_borrowed_reference)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod compiler;
mod context;
mod defaults;
mod environment;
mod error;
mod evaluator;
mod expr;
mod expression;
mod render;
mod scope;
mod template;
mod utils;

pub mod format_utils;
pub mod functions;
pub mod value;

#[cfg(feature = "debug")]
mod debug;

pub use self::compiler::segments::{
    CompiledTemplate, Conversion, ExprSlot, Segment, Specifier,
};
pub use self::context::Context;
pub use self::environment::Environment;
pub use self::error::{Error, ErrorKind};
pub use self::evaluator::{CompiledExpr, Evaluator};
pub use self::expr::PyEvaluator;
pub use self::expression::Expression;
pub use self::scope::{Scope, ScopeProvider};
pub use self::template::Template;
pub use self::value::Value;

#[doc(hidden)]
pub use self::macros::__context;

/// This module gives access to the low level machinery.
///
/// This module is only provided by the `unstable_machinery` feature and is
/// not covered by any stability guarantees.
#[cfg(feature = "unstable_machinery")]
#[cfg_attr(docsrs, doc(cfg(feature = "unstable_machinery")))]
pub mod machinery {
    pub use crate::compiler::scanner::{scan, Chunk};
    pub use crate::compiler::splitter::split_specifier;
}
