use crate::value::Value;

/// Supplies the bindings for [`Template::render_from_scope`](crate::Template::render_from_scope).
///
/// A provider stands in for the stack frame a template is rendered from.
/// The enclosing bindings play the role of module level names and the
/// local bindings the role of the names of the calling function.  Both
/// should be dict values; anything else is treated as empty.
pub trait ScopeProvider {
    /// The enclosing bindings.
    fn enclosing(&self) -> Value;

    /// The local bindings.  These shadow the enclosing bindings.
    fn locals(&self) -> Value;
}

/// A fixed set of enclosing and local bindings.
///
/// Usually created with the [`scope!`](crate::scope!) macro.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    enclosing: Value,
    locals: Value,
}

impl Scope {
    /// Creates a scope from enclosing and local bindings.
    pub fn new(enclosing: Value, locals: Value) -> Scope {
        Scope { enclosing, locals }
    }
}

impl ScopeProvider for Scope {
    fn enclosing(&self) -> Value {
        self.enclosing.clone()
    }

    fn locals(&self) -> Value {
        self.locals.clone()
    }
}
