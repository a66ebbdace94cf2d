use fstr::value::Value;
use fstr::{context, scope, Environment, Scope, ScopeProvider};
use similar_asserts::assert_eq;

const A_GLOBAL: i64 = 1;

#[test]
fn test_simple_scope_render() {
    let env = Environment::new();
    let tmpl = env.template("{A_GLOBAL} {a_local}").unwrap();
    let a_local = 2;
    let globals = context!(A_GLOBAL);
    assert_eq!(
        tmpl.render_from_scope(&scope!(a_local; ..globals)).unwrap(),
        "1 2"
    );
}

#[test]
fn test_scope_macro_forms() {
    let env = Environment::new();
    let tmpl = env.template("{x}-{y}").unwrap();
    let x = "a";
    assert_eq!(tmpl.render_from_scope(&scope!(x, y => 2)).unwrap(), "a-2");
    let enclosing = context!(x => "outer", y => "outer");
    assert_eq!(
        tmpl.render_from_scope(&scope!(y => "inner"; ..enclosing))
            .unwrap(),
        "outer-inner"
    );
}

struct Request {
    path: &'static str,
    user: Option<&'static str>,
}

impl ScopeProvider for Request {
    fn enclosing(&self) -> Value {
        context!(user => "anonymous", app => "demo")
    }

    fn locals(&self) -> Value {
        match self.user {
            Some(user) => context!(path => self.path, user),
            None => context!(path => self.path),
        }
    }
}

#[test]
fn test_custom_provider() {
    let env = Environment::new();
    let tmpl = env.template("{app}: {user} requested {path!r}").unwrap();
    assert_eq!(
        tmpl.render_from_scope(&Request {
            path: "/",
            user: None
        })
        .unwrap(),
        "demo: anonymous requested '/'"
    );
    assert_eq!(
        tmpl.render_from_scope(&Request {
            path: "/admin",
            user: Some("root")
        })
        .unwrap(),
        "demo: root requested '/admin'"
    );
}

#[test]
fn test_empty_scope() {
    let env = Environment::new();
    let tmpl = env.template("{len('abc')}").unwrap();
    assert_eq!(tmpl.render_from_scope(&Scope::default()).unwrap(), "3");
}
