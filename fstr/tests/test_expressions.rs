use fstr::value::Value;
use fstr::{context, Environment, ErrorKind};
use similar_asserts::assert_eq;

fn eval_repr(expr: &str, ctx: Value) -> String {
    let env = Environment::new();
    let expr = env.compile_expression(expr).unwrap();
    expr.eval(ctx).unwrap().to_repr()
}

fn eval(expr: &str) -> String {
    eval_repr(expr, context!())
}

#[test]
fn test_literals() {
    assert_eq!(eval("42"), "42");
    assert_eq!(eval("0x1f + 0o17 + 0b11"), "49");
    assert_eq!(eval("1_000_000"), "1000000");
    assert_eq!(eval("1.5"), "1.5");
    assert_eq!(eval("1e3"), "1000.0");
    assert_eq!(eval("'a' 'b' \"c\""), "'abc'");
    assert_eq!(eval("r'x' u'y'"), "'xy'");
    assert_eq!(eval("True, False, None"), "(True, False, None)");
    assert_eq!(eval("()"), "()");
    assert_eq!(eval("(1,)"), "(1,)");
    assert_eq!(eval("[1, 'a', [2]]"), "[1, 'a', [2]]");
    assert_eq!(eval("{'a': 1, 'b': 2}"), "{'a': 1, 'b': 2}");
    assert_eq!(eval("{1, 2, 2}"), "{1, 2}");
    assert_eq!(eval("{}"), "{}");
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), "7");
    assert_eq!(eval("(1 + 2) * 3"), "9");
    assert_eq!(eval("7 // 2, -7 // 2, 7 % 3, -7 % 3"), "(3, -4, 1, 2)");
    assert_eq!(eval("7 / 2"), "3.5");
    assert_eq!(eval("2 ** 3 ** 2"), "512");
    assert_eq!(eval("-2 ** 2"), "-4");
    assert_eq!(eval("2 ** -1"), "0.5");
    assert_eq!(eval("~5, 6 & 3, 6 | 3, 6 ^ 3, 1 << 4, 32 >> 2"), "(-6, 2, 7, 5, 16, 8)");
    assert_eq!(eval("'ab' * 2 + 'c'"), "'ababc'");
    assert_eq!(eval("[1] + [2] * 2"), "[1, 2, 2]");
}

#[test]
fn test_printf_formatting() {
    assert_eq!(eval("'%s' % 5"), "'5'");
    assert_eq!(eval("'%s-%r' % ('a', 'b')"), "\"a-'b'\"");
    assert_eq!(eval("'%5d|%-5d|%05d' % (42, 42, 42)"), "'   42|42   |00042'");
    assert_eq!(eval("'%.2f %+d %.3d' % (3.14159, 5, 7)"), "'3.14 +5 007'");
    assert_eq!(eval("'%x %X %#o' % (255, 255, 8)"), "'ff FF 0o10'");
    assert_eq!(eval("'%(name)s is %(age)d' % {'name': 'Anna', 'age': 30}"), "'Anna is 30'");
    assert_eq!(eval("'100%% %c%c' % (65, 'b')"), "'100% Ab'");
    assert_eq!(eval("'%5.1s|%*d' % ('abc', 4, 7)"), "'    a|   7'");
    assert_eq!(eval("'%d %s' % (3.9, (1,))"), "'3 (1,)'");
    assert_eq!(eval("'%s' % {'a': 1}"), "\"{'a': 1}\"");
    assert_eq!(eval("7 % 3"), "1");

    let env = Environment::new();
    for source in ["'%s %s' % 1", "'%s' % (1, 2)", "'%d' % 'x'", "'%(a)s' % 1", "'%' % 1"] {
        let err = env.compile_expression(source).unwrap().eval(()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation, "{source}");
    }
}

#[test]
fn test_integer_overflow() {
    let env = Environment::new();
    let expr = env.compile_expression("x * x").unwrap();
    let err = expr.eval(context!(x => i64::MAX)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("1 < 2 < 3"), "True");
    assert_eq!(eval("1 < 3 < 2"), "False");
    assert_eq!(eval("1 == 1.0"), "True");
    assert_eq!(eval("'a' in 'cat', 'x' not in ['y']"), "(True, True)");
    assert_eq!(eval("None is None, 1 is not None"), "(True, True)");
    assert_eq!(eval("[1, 2] < [1, 3]"), "True");
}

#[test]
fn test_boolean_operators() {
    assert_eq!(eval("0 or 'x'"), "'x'");
    assert_eq!(eval("'' and 1"), "''");
    assert_eq!(eval("not []"), "True");
    assert_eq!(eval("'yes' if 1 else 'no'"), "'yes'");
    // short circuiting skips the undefined name
    assert_eq!(eval("True or missing"), "True");
}

#[test]
fn test_subscripts_and_slices() {
    let ctx = context!(items => vec![1, 2, 3, 4, 5], s => "hello");
    assert_eq!(eval_repr("items[0], items[-1]", ctx.clone()), "(1, 5)");
    assert_eq!(eval_repr("items[1:3]", ctx.clone()), "[2, 3]");
    assert_eq!(eval_repr("items[::2]", ctx.clone()), "[1, 3, 5]");
    assert_eq!(eval_repr("items[::-1]", ctx.clone()), "[5, 4, 3, 2, 1]");
    assert_eq!(eval_repr("s[1:-1]", ctx.clone()), "'ell'");
    assert_eq!(eval_repr("s.upper()", ctx), "'HELLO'");
}

#[test]
fn test_attributes() {
    let ctx = context!(user => context!(name => "Anna", tags => vec!["a", "b"]));
    assert_eq!(eval_repr("user.name", ctx.clone()), "'Anna'");
    assert_eq!(eval_repr("user['tags'][1]", ctx.clone()), "'b'");
    assert_eq!(eval_repr("user.get('missing', 0)", ctx.clone()), "0");
    assert_eq!(eval_repr("list(user.keys())", ctx), "['name', 'tags']");
}

#[test]
fn test_comprehensions() {
    assert_eq!(eval("[x * x for x in range(5) if x % 2]"), "[1, 9]");
    assert_eq!(eval("{x: x * 2 for x in 'ab'}"), "{'a': 'aa', 'b': 'bb'}");
    assert_eq!(eval("{x % 3 for x in range(10)}"), "{0, 1, 2}");
    assert_eq!(eval("[(a, b) for a in range(2) for b in 'xy']"), "[(0, 'x'), (0, 'y'), (1, 'x'), (1, 'y')]");
    assert_eq!(eval("[a + b for a, b in [(1, 2), (3, 4)]]"), "[3, 7]");
    assert_eq!(eval("sum(x for x in range(4))"), "6");
}

#[test]
fn test_comprehension_scope() {
    let ctx = context!(x => "outer");
    assert_eq!(eval_repr("[x for x in range(2)], x", ctx), "([0, 1], 'outer')");
}

#[test]
fn test_lambdas() {
    assert_eq!(eval("(lambda: 42)()"), "42");
    assert_eq!(eval("(lambda a, b=2: a * b)(3)"), "6");
    assert_eq!(eval("(lambda a, b=2: a * b)(3, b=3)"), "9");
    assert_eq!(eval("sorted([3, 1, 2], key=lambda x: -x)"), "[3, 2, 1]");
    assert_eq!(eval("(lambda x: lambda y: x + y)(1)(2)"), "3");
    let ctx = context!(factor => 3);
    assert_eq!(eval_repr("(lambda v: v * factor)(2)", ctx.clone()), "6");
    assert_eq!(eval_repr("[(lambda: i)() for i in range(3)]", ctx), "[0, 1, 2]");
}

#[test]
fn test_function_calls() {
    let mut env = Environment::new();
    env.add_function("greet", |name: String, punct: Option<String>| {
        format!("Hello {name}{}", punct.unwrap_or_else(|| "!".into()))
    });
    let expr = env.compile_expression("greet('Anna'), greet(*['Bob', '?'])").unwrap();
    assert_eq!(expr.eval(()).unwrap().to_repr(), "('Hello Anna!', 'Hello Bob?')");

    let expr = env
        .compile_expression("dict(**{'a': 1}, b=2)")
        .unwrap();
    assert_eq!(expr.eval(()).unwrap().to_repr(), "{'a': 1, 'b': 2}");
}

#[test]
fn test_undefined_name() {
    let env = Environment::new();
    let expr = env.compile_expression("a + 1").unwrap();
    let err = expr.eval(()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
    assert_eq!(err.detail(), Some("name 'a' is not defined"));
}

#[test]
fn test_syntax_errors() {
    let env = Environment::new();
    for source in ["1 +", "a b", "[1, 2", "lambda x", "1 if 2", "a @ b", "x = 1", "import os"] {
        let err = env.compile_expression(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError, "{source}");
    }
}

#[test]
fn test_empty_environment() {
    let env = Environment::empty();
    let err = env
        .compile_expression("len('x')")
        .unwrap()
        .eval(())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
}
