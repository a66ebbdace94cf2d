use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::segments::CompiledTemplate;
use crate::context::Context;
use crate::environment::Environment;
use crate::error::Error;
use crate::render::{render_template, validate_context};
use crate::scope::ScopeProvider;
use crate::value::{merge_maps, Value};

/// Represents a handle to a compiled template.
///
/// Templates are created with [`Environment::template`] or
/// [`Environment::template_with_context`].  All expressions are compiled
/// when the template is created; rendering only evaluates them.  A template
/// never changes after it was created and can be cheaply cloned and
/// rendered from many threads at once.
///
/// To render the [`render`](Template::render) method can be used.
#[derive(Clone)]
pub struct Template<'env> {
    env: &'env Environment,
    compiled: Arc<CompiledTemplate>,
    source: Arc<str>,
    captured: Value,
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ok!(write!(f, "fstr({}", Value::from(&*self.source).to_repr()));
        if let Some(captured) = self.captured.as_map() {
            for (key, value) in captured.iter() {
                ok!(write!(f, ", {}={}", key, value.to_repr()));
            }
        }
        f.write_str(")")
    }
}

impl<'env> Template<'env> {
    pub(crate) fn new(
        env: &'env Environment,
        compiled: Arc<CompiledTemplate>,
        source: &str,
        captured: Value,
    ) -> Template<'env> {
        Template {
            env,
            compiled,
            source: source.into(),
            captured,
        }
    }

    /// Returns the raw template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the sources of the top level expressions in order.
    ///
    /// ```
    /// # use fstr::Environment;
    /// let env = Environment::new();
    /// let tmpl = env.template("{a} and { b + 1 :>{w}}").unwrap();
    /// assert_eq!(tmpl.expressions(), vec!["a", "b + 1"]);
    /// ```
    pub fn expressions(&self) -> Vec<&str> {
        self.compiled.slots().map(|slot| slot.source()).collect()
    }

    /// Returns the compiled segments.
    pub fn compiled(&self) -> &CompiledTemplate {
        &self.compiled
    }

    /// Returns the context captured when the template was created.
    pub fn captured(&self) -> &Value {
        &self.captured
    }

    /// Renders the template into a string.
    ///
    /// The provided value is used as the call-time context.  It must
    /// serialize into a map (or unit for no values).  Names in it shadow
    /// the captured context of the template.
    ///
    /// ```
    /// # use fstr::{Environment, context};
    /// # let env = Environment::new();
    /// let tmpl = env.template("Hello {name}!").unwrap();
    /// println!("{}", tmpl.render(context!(name => "John")).unwrap());
    /// ```
    ///
    /// To render a single value use the [`context!`](crate::context!)
    /// macro.  Any [`Serialize`] type that serializes into a struct or map
    /// works as well.
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, Error> {
        // reduce total amount of code falling under mono morphization into
        // this function, and share the rest in _render.
        self._render(Value::from_serialize(&ctx))
    }

    /// Renders the template with bindings from a [`ScopeProvider`].
    ///
    /// Local bindings of the provider take precedence over its enclosing
    /// bindings.  Both are used as the call-time context so they shadow the
    /// captured context.
    pub fn render_from_scope(&self, provider: &dyn ScopeProvider) -> Result<String, Error> {
        self._render(merge_maps([provider.locals(), provider.enclosing()]))
    }

    fn _render(&self, ctx: Value) -> Result<String, Error> {
        let ctx = ok!(validate_context(ctx));
        log::trace!("rendering template {:?}", self.source);
        let context = Context::new(self.env, &ctx, &self.captured);
        render_template(&self.compiled, &context)
            .map_err(|err| self.env.attach_debug_info(err, &self.source))
    }
}
