#![cfg(feature = "builtins")]
use fstr::{context, Environment};
use similar_asserts::assert_eq;

fn render(source: &str) -> String {
    let env = Environment::new();
    env.render_str(source, context!(items => vec![3, 1, 2], names => vec!["bob", "al"]))
        .unwrap()
}

#[test]
fn test_numbers() {
    assert_eq!(render("{abs(-3)} {abs(-1.5)}"), "3 1.5");
    assert_eq!(render("{divmod(7, 2)} {divmod(-7, 2)}"), "(3, 1) (-4, 1)");
    assert_eq!(render("{pow(2, 10)} {pow(3, 4, 5)}"), "1024 1");
    assert_eq!(render("{round(2.5)} {round(3.14159, 2)}"), "2 3.14");
    assert_eq!(render("{round(2.675, 2)} {round(0.285, 2)} {round(1.005, 2)}"), "2.67 0.28 1.0");
    assert_eq!(render("{int('ff', 16)} {int(' 12 ')} {float('1.5')}"), "255 12 1.5");
    assert_eq!(render("{bin(5)} {oct(8)} {hex(255)}"), "0b101 0o10 0xff");
    assert_eq!(render("{sum(items)} {sum(items, 10)}"), "6 16");
}

#[test]
fn test_sequences() {
    assert_eq!(render("{len(items)} {len('abc')} {len({})}"), "3 3 0");
    assert_eq!(render("{sorted(items)} {sorted(items, reverse=True)}"), "[1, 2, 3] [3, 2, 1]");
    assert_eq!(render("{sorted(names, key=len)}"), "['al', 'bob']");
    assert_eq!(render("{max(items)} {min(items)} {max(names, key=len)}"), "3 1 bob");
    assert_eq!(render("{min([], default=0)} {max(4, 9, 2)}"), "0 9");
    assert_eq!(render("{list(reversed(items))} {tuple(items)}"), "[2, 1, 3] (3, 1, 2)");
    assert_eq!(render("{list(enumerate(names, 1))}"), "[(1, 'bob'), (2, 'al')]");
    assert_eq!(render("{list(zip(items, names))}"), "[(3, 'bob'), (1, 'al')]");
    assert_eq!(render("{list(range(3))} {list(range(1, 10, 4))}"), "[0, 1, 2] [1, 5, 9]");
    assert_eq!(render("{all(items)} {any([0, ''])}"), "True False");
}

#[test]
fn test_conversions() {
    assert_eq!(render("{str(1.0)} {repr('x')} {ascii('ä')}"), r"1.0 'x' '\xe4'");
    assert_eq!(render("{bool(0)} {bool('x')} {bool()}"), "False True False");
    assert_eq!(render("{chr(65)} {ord('A')}"), "A 65");
    assert_eq!(render("{dict(a=1)} {dict([('b', 2)])}"), "{'a': 1} {'b': 2}");
    assert_eq!(render("{format(3.14159, '.2f')} {format(42)}"), "3.14 42");
}

#[test]
fn test_builtin_repr() {
    assert_eq!(render("{len}"), "<built-in function len>");
    assert_eq!(render("{(lambda: 1)!r}"), "<function <lambda>>");
}

#[test]
fn test_custom_function_shadows_builtin() {
    let mut env = Environment::new();
    env.add_function("len", |_value: fstr::Value| 42);
    assert_eq!(env.render_str("{len('abc')}", ()).unwrap(), "42");
}
