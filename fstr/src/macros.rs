// `ok!` and `some!` are less bloaty alternatives to the standard library's try operator (`?`).
// Since we do not need type conversions in this crate we can fall back to much easier match
// patterns that compile faster and produce less bloaty code.

macro_rules! ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => return Err(err),
        }
    };
}

macro_rules! some {
    ($expr:expr) => {
        match $expr {
            Some(val) => val,
            None => return None,
        }
    };
}

/// Hidden utility module for the [`context!`](crate::context!) macro.
#[doc(hidden)]
pub mod __context {
    use crate::value::{Value, ValueMap};
    use crate::Environment;
    use std::rc::Rc;

    #[inline(always)]
    pub fn make() -> ValueMap {
        ValueMap::default()
    }

    #[inline(always)]
    pub fn add(ctx: &mut ValueMap, key: &'static str, value: Value) {
        ctx.insert(Value::from(key), value);
    }

    #[inline(always)]
    pub fn build(ctx: ValueMap) -> Value {
        Value::from(ctx)
    }

    pub fn thread_local_env() -> Rc<Environment> {
        thread_local! {
            static ENV: Rc<Environment> = Rc::new(Environment::new());
        }
        ENV.with(|x| x.clone())
    }
}

/// Creates a template context from keys and values or merging in another value.
///
/// ```rust
/// # use fstr::context;
/// let ctx = context!{
///     name => "Peter",
///     location => "World",
/// };
/// ```
///
/// Alternatively if the variable name matches the key name it can
/// be omitted:
///
/// ```rust
/// # use fstr::context;
/// let name = "Peter";
/// let ctx = context!{ name };
/// ```
///
/// The return value is a [`Value`](crate::value::Value) holding a dict.
///
/// Additionally the macro supports a second syntax that can merge other
/// contexts.  In that case one or more values need to be passed with a
/// leading `..` operator.  Keys that appear earlier win:
///
/// ```rust
/// # use fstr::context;
/// let defaults = context! { a => "A", b => "default" };
/// let ctx = context! {
///     b => "B",
///     ..defaults
/// };
/// ```
///
/// # Note on Conversions
///
/// This macro uses [`Value::from_serialize`](crate::Value::from_serialize)
/// for conversions.  Pass values with `&value` if you intend on still being
/// able to use them after the macro invocation.
#[macro_export]
macro_rules! context {
    () => {
        $crate::__context::build($crate::__context::make())
    };
    (
        $($key:ident $(=> $value:expr)?),*
        $(, .. $ctx:expr),* $(,)?
    ) => {{
        let mut ctx = $crate::__context::make();
        $(
            $crate::__context_pair!(ctx, $key $(=> $value)?);
        )*
        let ctx = $crate::__context::build(ctx);
        let merge_ctx = [
            $(
                $crate::value::Value::from($ctx),
            )*
        ];
        if merge_ctx.is_empty() {
            ctx
        } else {
            $crate::value::merge_maps(::std::iter::once(ctx).chain(merge_ctx))
        }
    }};
    (
        $(.. $ctx:expr),* $(,)?
    ) => {{
        $crate::value::merge_maps([
            $(
                $crate::value::Value::from($ctx),
            )*
        ])
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! __context_pair {
    ($ctx:ident, $key:ident) => {{
        $crate::__context_pair!($ctx, $key => $key);
    }};
    ($ctx:ident, $key:ident => $value:expr) => {
        $crate::__context::add(
            &mut $ctx,
            stringify!($key),
            $crate::value::Value::from_serialize(&$value),
        );
    };
}

/// Creates a [`Scope`](crate::Scope) from variables visible at the call site.
///
/// Rust cannot look into the stack frame of a caller, so the bindings that
/// should be visible to a template have to be named explicitly.  Variables
/// listed before the optional `;` become local bindings, an expression after
/// `; ..` provides the enclosing bindings.  Local bindings win over enclosing
/// ones.
///
/// ```
/// # use fstr::{scope, context, Environment};
/// let env = Environment::new();
/// let tmpl = env.template("{greeting}, {name}!").unwrap();
/// let greeting = "Hello";
/// let name = "World";
/// let rv = tmpl.render_from_scope(&scope!(greeting, name)).unwrap();
/// assert_eq!(rv, "Hello, World!");
///
/// let globals = context! { greeting => "Hi", name => "nobody" };
/// let rv = tmpl.render_from_scope(&scope!(name; ..globals)).unwrap();
/// assert_eq!(rv, "Hi, World!");
/// ```
#[macro_export]
macro_rules! scope {
    ($($key:ident $(=> $value:expr)?),* $(,)?) => {
        $crate::Scope::new($crate::Value::from(()), $crate::context! { $($key $(=> $value)?),* })
    };
    ($($key:ident $(=> $value:expr)?),* ; .. $enclosing:expr) => {
        $crate::Scope::new(
            $crate::Value::from($enclosing),
            $crate::context! { $($key $(=> $value)?),* },
        )
    };
}

/// A macro similar to [`format!`] but that uses delayed templates for
/// rendering.
///
/// This can be used to quickly render a template into a string without
/// having to create an environment first.  Note however that the template
/// is recompiled every time the [`render!`](crate::render) macro is called.
///
/// There are two forms for this macro.  The default form takes template
/// source and context variables, the extended form also lets you provide
/// a custom environment that should be used rather than a default one.
/// The context variables are passed the same way as with the
/// [`context!`](crate::context) macro.
///
/// # Example
///
/// Passing context explicitly:
///
/// ```
/// # use fstr::render;
/// println!("{}", render!("Hello {name}!", name => "World"));
/// ```
///
/// Passing variables with the default name:
///
/// ```
/// # use fstr::render;
/// let name = "World";
/// println!("{}", render!("Hello {name!r}!", name));
/// ```
///
/// Passing an explicit environment:
///
/// ```
/// # use fstr::{Environment, render};
/// let env = Environment::new();
/// println!("{}", render!(in env, "Hello {name:>10}!", name => "World"));
/// ```
///
/// # Panics
///
/// This macro panics if the format string is an invalid template or the
/// template evaluation failed.
#[macro_export]
macro_rules! render {
    (
        in $env:expr,
        $tmpl:expr
        $(, $key:ident $(=> $value:expr)?)* $(,)?
    ) => {
        ($env).render_str($tmpl, $crate::context! { $($key $(=> $value)? ,)* })
            .expect("failed to render template")
    };
    (
        $tmpl:expr
        $(, $key:ident $(=> $value:expr)?)* $(,)?
    ) => {
        $crate::render!(in $crate::__context::thread_local_env(), $tmpl, $($key $(=> $value)? ,)*)
    }
}
