use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::compile::compile_template;
use crate::defaults::{self, DEFAULT_MAX_SPEC_DEPTH};
use crate::error::Error;
use crate::evaluator::Evaluator;
use crate::expr::PyEvaluator;
use crate::expression::Expression;
use crate::functions;
use crate::template::Template;
use crate::value::{FunctionArgs, FunctionResult, Value};

/// An abstraction that holds the engine configuration.
///
/// The environment decides how expressions are compiled (the
/// [`Evaluator`]), which names are available to every template besides the
/// ones passed to a render call (the globals) and a few limits.  Templates
/// borrow the environment they were created from.
///
/// There are generally two ways to construct an environment:
///
/// * [`Environment::new`] creates an environment preconfigured with sensible
///   defaults.  It will contain all built-in functions.
/// * [`Environment::empty`] creates an environment without any globals.
///
/// ```
/// # use fstr::{Environment, context};
/// let mut env = Environment::new();
/// env.add_global("greeting", "Hello");
/// let tmpl = env.template("{greeting}, {name}!").unwrap();
/// assert_eq!(tmpl.render(context!(name => "World")).unwrap(), "Hello, World!");
/// ```
#[derive(Clone)]
pub struct Environment {
    evaluator: Arc<dyn Evaluator>,
    globals: BTreeMap<Cow<'static, str>, Value>,
    max_spec_depth: usize,
    #[cfg(feature = "debug")]
    debug: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::empty()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("max_spec_depth", &self.max_spec_depth)
            .finish()
    }
}

impl Environment {
    /// Creates a new environment with sensible defaults.
    ///
    /// The environment uses the [`PyEvaluator`] and has all the builtin
    /// functions loaded.  If you do not want any globals you can use the
    /// alternative [`empty`](Environment::empty) method.
    pub fn new() -> Environment {
        Environment {
            globals: defaults::get_globals(),
            ..Environment::empty()
        }
    }

    /// Creates an environment without globals.
    pub fn empty() -> Environment {
        Environment {
            evaluator: Arc::new(PyEvaluator),
            globals: Default::default(),
            max_spec_depth: DEFAULT_MAX_SPEC_DEPTH,
            #[cfg(feature = "debug")]
            debug: cfg!(debug_assertions),
        }
    }

    /// Creates a template from a string.
    ///
    /// All expressions are compiled right away which means that malformed
    /// templates fail here and not when they are rendered.
    ///
    /// ```
    /// # use fstr::{Environment, context};
    /// let env = Environment::new();
    /// let tmpl = env.template("{x:>{width}}").unwrap();
    /// assert_eq!(tmpl.render(context!(x => 10, width => 3)).unwrap(), " 10");
    /// ```
    pub fn template(&self, source: &str) -> Result<Template<'_>, Error> {
        self.template_with_captured(source, Value::NONE)
    }

    /// Creates a template from a string with a captured context.
    ///
    /// The captured values are visible to every render of the template.
    /// Values passed to a render call shadow captured values of the same
    /// name.
    ///
    /// ```
    /// # use fstr::{Environment, context};
    /// let env = Environment::new();
    /// let tmpl = env
    ///     .template_with_context("{greeting}, {name}!", context!(greeting => "Hi"))
    ///     .unwrap();
    /// assert_eq!(tmpl.render(context!(name => "Anna")).unwrap(), "Hi, Anna!");
    /// ```
    pub fn template_with_context<S: Serialize>(
        &self,
        source: &str,
        captured: S,
    ) -> Result<Template<'_>, Error> {
        // reduce total amount of code falling under mono morphization into
        // this function, and share the rest in template_with_captured.
        let captured = ok!(crate::render::validate_context(Value::from_serialize(&captured)));
        self.template_with_captured(source, captured)
    }

    fn template_with_captured(&self, source: &str, captured: Value) -> Result<Template<'_>, Error> {
        log::debug!("compiling template {:?}", source);
        match compile_template(source, &*self.evaluator, self.max_spec_depth) {
            Ok(compiled) => Ok(Template::new(self, Arc::new(compiled), source, captured)),
            Err(err) => Err(self.attach_debug_info(err, source)),
        }
    }

    /// Compiles and renders a template from a string in one go.
    ///
    /// ```
    /// # use fstr::{Environment, context};
    /// let env = Environment::new();
    /// let rv = env.render_str("Hello {name}", context! { name => "World" });
    /// assert_eq!(rv.unwrap(), "Hello World");
    /// ```
    ///
    /// **Note on values:** The [`Value`] type implements `Serialize` and can be
    /// efficiently passed to render.  It does not undergo actual serialization.
    pub fn render_str<S: Serialize>(&self, source: &str, ctx: S) -> Result<String, Error> {
        ok!(self.template(source)).render(ctx)
    }

    /// Compiles a standalone expression.
    ///
    /// This lets one use the expression language of the environment on its
    /// own.  For more information and an example see [`Expression`].
    pub fn compile_expression(&self, expr: &str) -> Result<Expression<'_>, Error> {
        log::debug!("compiling expression {:?}", expr);
        match self.evaluator.compile(expr.trim()) {
            Ok(compiled) => Ok(Expression::new(self, expr, compiled)),
            Err(mut err) => {
                err.set_expression(expr);
                Err(self.attach_debug_info(err, expr))
            }
        }
    }

    /// Replaces the expression evaluator.
    ///
    /// Templates created afterwards compile their expressions with the new
    /// evaluator.
    pub fn set_evaluator<E: Evaluator>(&mut self, evaluator: E) {
        self.evaluator = Arc::new(evaluator);
    }

    /// Sets how deeply replacement fields may nest inside format specs.
    ///
    /// The outermost replacement field counts as the first level.  The
    /// default of 2 matches Python and permits `{x:{width}}` but not
    /// `{x:{y:{z}}}`.  Values below 1 are treated as 1.
    pub fn set_max_spec_depth(&mut self, depth: usize) {
        self.max_spec_depth = depth.max(1);
    }

    /// Returns the maximum spec nesting depth.
    pub fn max_spec_depth(&self) -> usize {
        self.max_spec_depth
    }

    /// Enable or disable the debug mode.
    ///
    /// When the debug mode is enabled errors carry the source of the
    /// template they were raised from.  Formatting such an error with the
    /// alternative formatting (`{:#}`) shows the source with a marker under
    /// the offending position.  The cost of this is that the template source
    /// is cloned into the error.
    ///
    /// This requires the `debug` feature.  This is enabled by default if
    /// debug assertions are enabled and false otherwise.
    #[cfg(feature = "debug")]
    #[cfg_attr(docsrs, doc(cfg(feature = "debug")))]
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    /// Returns the current value of the debug flag.
    #[cfg(feature = "debug")]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Adds a new global function.
    ///
    /// For details about functions have a look at [`functions`].  Note that
    /// functions and other global variables share the same namespace.
    /// For more details about functions have a look at
    /// [`Function`](crate::functions::Function).
    pub fn add_function<N, F, Rv, Args>(&mut self, name: N, f: F)
    where
        N: Into<Cow<'static, str>>,
        F: functions::Function<Rv, Args>,
        Rv: FunctionResult,
        Args: FunctionArgs,
    {
        self.add_global(name.into(), Value::from_function(f))
    }

    /// Adds a global variable.
    ///
    /// Globals have the lowest priority.  Values from the render context or
    /// the captured context shadow them.
    pub fn add_global<N, V>(&mut self, name: N, value: V)
    where
        N: Into<Cow<'static, str>>,
        V: Into<Value>,
    {
        self.globals.insert(name.into(), value.into());
    }

    /// Removes a global function or variable by name.
    pub fn remove_global(&mut self, name: &str) {
        self.globals.remove(name);
    }

    /// Looks up a global.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    #[allow(unused_mut)]
    pub(crate) fn attach_debug_info(&self, mut err: Error, source: &str) -> Error {
        #[cfg(feature = "debug")]
        {
            if self.debug {
                err.attach_debug_info(source);
            }
        }
        #[cfg(not(feature = "debug"))]
        {
            let _source = source;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_builtins() {
        let env = Environment::empty();
        assert!(env.get_global("len").is_none());
        let err = env.render_str("{len('x')}", ()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UndefinedName);
    }

    #[test]
    fn test_globals() {
        let mut env = Environment::new();
        env.add_global("answer", 42);
        assert_eq!(env.render_str("{answer}", ()).unwrap(), "42");
        env.remove_global("answer");
        assert!(env.render_str("{answer}", ()).is_err());
    }

    #[test]
    fn test_max_spec_depth() {
        let mut env = Environment::new();
        assert_eq!(env.max_spec_depth(), 2);
        assert!(env.template("{1:{2:{3}}}").is_err());
        env.set_max_spec_depth(3);
        assert_eq!(env.render_str("{1:{5:{'d'}}}", ()).unwrap(), "    1");
        env.set_max_spec_depth(1);
        assert!(env.template("{1:{2}}").is_err());
    }
}
