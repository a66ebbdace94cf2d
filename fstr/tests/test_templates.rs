use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use fstr::value::{Kwargs, Object, Value};
use fstr::{context, render, Environment};
use similar_asserts::assert_eq;

fn render_one(source: &str, ctx: Value) -> String {
    let env = Environment::new();
    let tmpl = env.template(source).unwrap();
    tmpl.render(ctx).unwrap()
}

#[test]
fn test_basic() {
    let env = Environment::new();
    let tmpl = env
        .template_with_context("{x} + {y} = {x + y}", context!(x => 1))
        .unwrap();
    assert_eq!(tmpl.render(context!(y => 2)).unwrap(), "1 + 2 = 3");
    assert_eq!(tmpl.render(context!(y => 3)).unwrap(), "1 + 3 = 4");
}

#[test]
fn test_basic_format_language() {
    let env = Environment::new();
    let tmpl = env
        .template_with_context("{x!r} + {y!r} = {x + y!r}", context!(x => "a"))
        .unwrap();
    assert_eq!(tmpl.render(context!(y => "b")).unwrap(), "'a' + 'b' = 'ab'");
    assert_eq!(tmpl.render(context!(y => "c")).unwrap(), "'a' + 'c' = 'ac'");
}

#[test]
fn test_render_macro() {
    assert_eq!(render!("Hello {name}!", name => "World"), "Hello World!");
    let name = "Peter";
    assert_eq!(render!("Hello {name!r}!", name), "Hello 'Peter'!");
    let env = Environment::new();
    assert_eq!(render!(in env, "{x:>4}", x => 7), "   7");
}

#[test]
fn test_struct_context() {
    #[derive(serde::Serialize)]
    struct User {
        name: &'static str,
        age: u32,
    }

    let env = Environment::new();
    let tmpl = env.template("{name} is {age}").unwrap();
    assert_eq!(
        tmpl.render(User {
            name: "Anna",
            age: 31
        })
        .unwrap(),
        "Anna is 31"
    );
}

#[test]
fn test_json_context() {
    let ctx: serde_json::Value =
        serde_json::from_str(r#"{"items": [1, 2, 3], "meta": {"title": "list"}}"#).unwrap();
    assert_eq!(
        render_one("{meta['title']}: {sum(items)}", Value::from_serialize(&ctx)),
        "list: 6"
    );
}

#[test]
fn test_format_language_with_inner_template() {
    let env = Environment::new();
    let tmpl = env.template("{x:{width}}").unwrap();
    assert_eq!(tmpl.render(context!(x => 10, width => 3)).unwrap(), " 10");
    assert_eq!(tmpl.render(context!(x => 3, width => 4)).unwrap(), "   3");

    let tmpl = env.template("{x:{width}.{precision}}").unwrap();
    assert_eq!(
        tmpl.render(context!(x => 1.2345, width => 4, precision => 2))
            .unwrap(),
        " 1.2"
    );
}

#[test]
fn test_dict_lookups() {
    let d = context! { foo => "bar" };
    assert_eq!(render_one("{d['foo']}", context!(d => d.clone())), "bar");
    assert_eq!(render_one(r#"{d["foo"]}"#, context!(d => d)), "bar");

    let env = Environment::new();
    let quotes = env
        .compile_expression(r##"{'"': "double-quote", "'": "single-quote", "#": "hash"}"##)
        .unwrap()
        .eval(())
        .unwrap();
    assert_eq!(render_one(r#"{d["'"]}"#, context!(d => quotes.clone())), "single-quote");
    assert_eq!(render_one(r#"{d['"']}"#, context!(d => quotes.clone())), "double-quote");
    assert_eq!(render_one("{d['#']}", context!(d => quotes)), "hash");
    assert_eq!(render_one("{'#'}", context!()), "#");
}

#[test]
fn test_call_registered_function() {
    let mut env = Environment::new();
    env.add_function("add", |x: i64, y: i64| x + y);
    let tmpl = env.template("{add(x, y)}").unwrap();
    assert_eq!(tmpl.render(context!(x => 1, y => 2)).unwrap(), "3");
}

#[test]
fn test_call_function_from_context() {
    let foo = Value::from_function(|x: Value| format!("x={x}"));
    assert_eq!(render_one("{foo(10)}", context!(foo)), "x=10");
}

#[test]
fn test_brace_escapes() {
    assert_eq!(render_one("{{}}", context!()), "{}");
    assert_eq!(render_one("{{{x}}}", context!(x => 1)), "{1}");
    assert_eq!(render_one("{'{'}", context!()), "{");
    assert_eq!(render_one("{'}'}", context!()), "}");
}

#[test]
fn test_leading_and_trailing_space() {
    for source in ["{   1 + 2}", "{1 + 2   }", "{   1 + 2   }", "{ 3}", "{3  }"] {
        assert_eq!(render_one(source, context!()), "3", "{source}");
    }
    assert_eq!(
        render_one("{ {x: y} }", context!(x => "a", y => 1)),
        "{'a': 1}"
    );
    assert_eq!(
        render_one("expr={ {x: y for x, y in [(1, 2), ]} }", context!()),
        "expr={1: 2}"
    );
    assert_eq!(
        render_one("expr={ {x: y for x, y in [(1, 2), ]}}", context!()),
        "expr={1: 2}"
    );
}

#[test]
fn test_many_expressions() {
    let env = Environment::new();
    for n in 250..260 {
        let tmpl = env.template(&"{x} ".repeat(n)).unwrap();
        assert_eq!(tmpl.render(context!(x => "X")).unwrap(), "X ".repeat(n));
    }
    let tmpl = env.template(&"{x} {x:{width}} ".repeat(250)).unwrap();
    assert_eq!(
        tmpl.render(context!(x => "X", width => 1)).unwrap(),
        "X ".repeat(500)
    );
    let tmpl = env.template(&"{1} {'x'} {'y'} ".repeat(1000)).unwrap();
    assert_eq!(tmpl.render(()).unwrap(), "1 x y ".repeat(1000));
}

#[test]
fn test_width_precision_specifiers() {
    let ctx = context!(width => 10, precision => 4, value => 12.34567);
    for source in [
        "result: {value:{width}.{precision}}",
        "result: {value:{width!r}.{precision}}",
        "result: {value:{width:0}.{precision:1}}",
        "result: {value:{1}{0:0}.{precision:1}}",
        "result: {value:{ 1}{ 0:0}.{ precision:1}}",
    ] {
        assert_eq!(render_one(source, ctx.clone()), "result:      12.35", "{source}");
    }
}

#[test]
fn test_hex_specifiers() {
    for (value, source) in [
        (10, "{value:#{1}0x}"),
        (10, "{value:{'#'}1{0}{'x'}}"),
        (-10, "{value:-{'#'}1{0}x}"),
        (-10, "{value:{'-'}#{1}0{'x'}}"),
        (10, "{value:#{3 != {4:5} and width}x}"),
    ] {
        let expected = if value < 0 { "      -0xa" } else { "       0xa" };
        assert_eq!(
            render_one(source, context!(value, width => 10)),
            expected,
            "{source}"
        );
    }
}

#[derive(Debug, Default)]
struct Counter(AtomicUsize);

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("counter")
    }
}

impl Object for Counter {
    fn format(&self, _spec: &str) -> Option<Result<String, fstr::Error>> {
        Some(Ok((self.0.fetch_add(1, Ordering::SeqCst) + 1).to_string()))
    }
}

#[test]
fn test_side_effect_order() {
    let ctx = context!(x => Value::from_object(Counter::default()));
    assert_eq!(render_one("{x} {x}", ctx.clone()), "1 2");
    // the same object keeps counting across renders
    assert_eq!(render_one("{x}-{x}-{x}", ctx), "3-4-5");
}

#[derive(Debug)]
struct SpecEcho;

impl fmt::Display for SpecEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("echo")
    }
}

impl Object for SpecEcho {
    fn format(&self, spec: &str) -> Option<Result<String, fstr::Error>> {
        Some(Ok(if spec.is_empty() {
            "*".to_string()
        } else {
            spec.to_string()
        }))
    }
}

#[derive(Debug)]
struct SpecEchoFactory;

impl fmt::Display for SpecEchoFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<class 'Obj'>")
    }
}

impl Object for SpecEchoFactory {
    fn call(&self, _args: &[Value], _kwargs: &Kwargs) -> Result<Value, fstr::Error> {
        Ok(Value::from_object(SpecEcho))
    }
}

#[test]
fn test_custom_format_hook() {
    let ctx = context!(Obj => Value::from_object(SpecEchoFactory));
    assert_eq!(render_one("{Obj():x}", ctx.clone()), "x");
    assert_eq!(render_one("{Obj()}", ctx.clone()), "*");
    assert_eq!(render_one("{Obj():}", ctx), "*");
    assert_eq!(render_one("{3:}", context!()), "3");
    assert_eq!(render_one("{3!s:}", context!()), "3");
}

#[test]
fn test_backslashes_in_literal_text() {
    for (source, expected) in [
        ("\t", "\t"),
        (r"\t", "\\t"),
        ("{2}\t", "2\t"),
        ("{2}\t{3}", "2\t3"),
        ("\u{0394}", "\u{0394}"),
        (r"\u0394", "\\u0394"),
        ("{2}\u{0394}{3}", "2\u{0394}3"),
        (r"\x20", "\\x20"),
        ("{2}\x20{3}", "2 3"),
        ("\\{6*7}", "\\42"),
        (r"\{6*7}", "\\42"),
    ] {
        assert_eq!(render_one(source, context!()), expected, "{source:?}");
    }
}

#[test]
fn test_newlines_in_expressions() {
    assert_eq!(render_one("{0}", context!()), "0");
    assert_eq!(render_one("{3+\n4}", context!()), "7");
}

#[test]
fn test_empty_format_specifier() {
    for (source, expected) in [
        ("{x}", "test"),
        ("{x:}", "test"),
        ("{x!s:}", "test"),
        ("{x!r:}", "'test'"),
    ] {
        assert_eq!(render_one(source, context!(x => "test")), expected);
    }
}

#[test]
fn test_lambdas() {
    let env = Environment::new();
    for (source, expected) in [
        ("{(lambda y:x*y)('8')!r}", "'88888'"),
        ("{(lambda y:x*y)('8')!r:10}", "'88888'   "),
        ("{(lambda y:x*y)('8'):10}", "88888     "),
    ] {
        let tmpl = env.template_with_context(source, context!(x => 5)).unwrap();
        assert_eq!(tmpl.render(()).unwrap(), expected, "{source}");
    }
}

#[test]
fn test_triple_quoted_strings() {
    for (source, expected) in [
        ("{'''x'''}", "x"),
        ("{'''eric's'''}", "eric's"),
        (r#"{"x" """eric"s""" "y"}"#, r#"xeric"sy"#),
        (r#"{"x" """eric"s"""}"#, r#"xeric"s"#),
        (r#"{"""eric"s""" "y"}"#, r#"eric"sy"#),
        (r#"{"""x""" """eric"s""" "y"}"#, r#"xeric"sy"#),
        (r#"{"""x""" """eric"s""" """y"""}"#, r#"xeric"sy"#),
        (r#"{r"""x""" """eric"s""" """y"""}"#, r#"xeric"sy"#),
    ] {
        assert_eq!(render_one(source, context!()), expected, "{source}");
    }
}

#[test]
fn test_not_equal() {
    assert_eq!(render_one("{3!=4}", context!()), "True");
    assert_eq!(render_one("{3!=4:}", context!()), "True");
    assert_eq!(render_one("{3!=4!s}", context!()), "True");
    assert_eq!(render_one("{3!=4!s:.3}", context!()), "Tru");
}

#[test]
fn test_conversions() {
    assert_eq!(render_one("{3.14:10.10}", context!()), "      3.14");
    assert_eq!(render_one("{3.14!s:10.10}", context!()), "3.14      ");
    assert_eq!(render_one("{3.14!r:10.10}", context!()), "3.14      ");
    assert_eq!(render_one("{3.14!a:10.10}", context!()), "3.14      ");
    assert_eq!(render_one(r#"{"a"}"#, context!()), "a");
    assert_eq!(render_one(r#"{"a"!r}"#, context!()), "'a'");
    assert_eq!(render_one(r#"{"a"!a}"#, context!()), "'a'");
    assert_eq!(render_one(r#"{"ä"!a}"#, context!()), r"'\xe4'");
    assert_eq!(render_one(r#"{"a!r"}"#, context!()), "a!r");
    assert_eq!(render_one("{3.14:!<10.10}", context!()), "3.14!!!!!!");
}

#[test]
fn test_shadowing_and_globals() {
    let mut env = Environment::new();
    env.add_global("x", "global");
    env.add_global("y", "global");
    env.add_global("z", "global");
    let tmpl = env
        .template_with_context("{x} {y} {z}", context!(x => "captured", y => "captured"))
        .unwrap();
    assert_eq!(
        tmpl.render(context!(x => "call")).unwrap(),
        "call captured global"
    );
}

#[test]
fn test_context_shadows_builtins() {
    assert_eq!(render_one("{len}", context!(len => 3)), "3");
    assert_eq!(render_one("{len('abc')}", context!()), "3");
}

#[test]
fn test_determinism() {
    let env = Environment::new();
    let tmpl = env
        .template("{', '.join(sorted(names))} {n:08.3f}")
        .unwrap();
    let ctx = context!(names => vec!["b", "c", "a"], n => 3.14159);
    let first = tmpl.render(ctx.clone()).unwrap();
    let second = tmpl.render(ctx).unwrap();
    assert_eq!(first, "a, b, c 0003.142");
    assert_eq!(first, second);
}

#[test]
fn test_render_from_threads() {
    let env = Environment::new();
    let tmpl = env.template("{n} squared is {n ** 2}").unwrap();
    std::thread::scope(|scope| {
        for n in 0..4 {
            let tmpl = tmpl.clone();
            scope.spawn(move || {
                assert_eq!(
                    tmpl.render(context!(n)).unwrap(),
                    format!("{n} squared is {}", n * n)
                );
            });
        }
    });
}

#[test]
fn test_template_introspection() {
    let env = Environment::new();
    let tmpl = env
        .template_with_context("{a!r:>{w}} {{x}} {b}", context!(w => 4))
        .unwrap();
    assert_eq!(tmpl.source(), "{a!r:>{w}} {{x}} {b}");
    assert_eq!(tmpl.expressions(), vec!["a", "b"]);
    assert_eq!(tmpl.compiled().segments().len(), 3);
    assert_eq!(format!("{tmpl:?}"), "fstr('{a!r:>{w}} {{x}} {b}', w=4)");
}
