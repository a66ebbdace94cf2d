use fstr::{context, Environment, ErrorKind};
use similar_asserts::assert_eq;

fn compile_error(source: &str) -> fstr::Error {
    let env = Environment::new();
    match env.template(source) {
        Ok(tmpl) => panic!("expected {source:?} to fail, got {tmpl:?}"),
        Err(err) => err,
    }
}

fn render_error(source: &str, ctx: fstr::Value) -> fstr::Error {
    let env = Environment::new();
    let tmpl = env.template(source).unwrap();
    match tmpl.render(ctx) {
        Ok(rv) => panic!("expected {source:?} to fail, got {rv:?}"),
        Err(err) => err,
    }
}

#[test]
fn test_mismatched_braces() {
    for source in [
        "{{}", "{{}}}", "}", "x}", "x}x", "{3:}>10}", "{3:}}>10}", "{3:{{>10}", "{3", "{3!",
        "{3:", "{3!s", "{3!s:", "{3!s:3", "x{", "x{x", "{x", "{3:s", "{{{", "{{}}{", "{",
    ] {
        assert_eq!(
            compile_error(source).kind(),
            ErrorKind::MismatchedBraces,
            "{source}"
        );
    }
}

#[test]
fn test_mismatched_parentheses() {
    let err = compile_error("{3)+(4}");
    assert_eq!(err.kind(), ErrorKind::MismatchedParentheses);
    assert_eq!(err.offset(), Some(2));
    assert_eq!(compile_error("{)}").kind(), ErrorKind::MismatchedParentheses);
    let err = compile_error("{(x}");
    assert_eq!(err.kind(), ErrorKind::MismatchedParentheses);
    assert_eq!(err.offset(), Some(3));
}

#[test]
fn test_unclosed_brackets() {
    for source in ["{]}", "{a[4)}", "{a(4]}", "{,}"] {
        assert!(compile_error(source).kind() != ErrorKind::EmptyExpression, "{source}");
    }
    assert_eq!(compile_error("{]}").kind(), ErrorKind::SyntaxError);
    assert_eq!(compile_error("{,}").kind(), ErrorKind::SyntaxError);
}

#[test]
fn test_missing_expression() {
    for source in [
        "{}",
        "{!r}",
        "{ !r}",
        "{10:{ }}",
        " { } ",
        "{\t\x0c\r\n}",
        "{!x}",
        "{ !xr}",
        "{!x:}",
        "{!x:a}",
        "{ !xr:}",
        "{ !xr:a}",
        "{!}",
        "{:}",
        "{\u{a0}}",
        "{\n}",
    ] {
        assert_eq!(
            compile_error(source).kind(),
            ErrorKind::EmptyExpression,
            "{source:?}"
        );
    }
    // the scanner runs before the expression is looked at
    for source in ["{!", "{!s:", "{:", "{:x", "{ ' {} "] {
        assert_eq!(compile_error(source).kind(), ErrorKind::MismatchedBraces, "{source:?}");
    }
}

#[test]
fn test_backslashes_in_expression() {
    for source in [
        r"{\}",
        r"{\'a\'}",
        r"{\t3}",
        r"{'a\n'}",
        r"{'a\'b'}",
        r#"{"x\"y"}"#,
    ] {
        assert_eq!(
            compile_error(source).kind(),
            ErrorKind::BackslashInExpression,
            "{source}"
        );
    }
}

#[test]
fn test_bad_conversions() {
    for source in [
        "{3!g}", "{3!A}", "{3!3}", "{3!G}", "{3!!}", "{3!:}", "{3! s}", "{3!ss}", "{3!ss:}",
        "{3!ss:s}",
    ] {
        assert_eq!(
            compile_error(source).kind(),
            ErrorKind::InvalidConversion,
            "{source}"
        );
    }
    assert_eq!(compile_error("{x!s{y}}").kind(), ErrorKind::DynamicConversion);
    assert_eq!(compile_error("{'s'!{'r'}}").kind(), ErrorKind::DynamicConversion);
}

#[test]
fn test_invalid_format_specifier_expressions() {
    assert_eq!(compile_error("{'s'!r{':10'}}").kind(), ErrorKind::DynamicConversion);
    assert_eq!(compile_error("{4:{/5}}").kind(), ErrorKind::SyntaxError);
}

#[test]
fn test_nested_too_deeply() {
    let err = compile_error("{x:{y:{z}}}");
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.offset(), Some(6));
}

#[test]
fn test_syntax_error_offset_in_nested_spec() {
    let err = compile_error("abc {x:>{1 +}}");
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.expression(), Some("1 +"));
    assert!(err.offset().unwrap() >= 9);
}

#[test]
fn test_missing_variable() {
    let err = render_error("v:{value}", context!());
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
    assert_eq!(err.offset(), Some(3));
    assert_eq!(err.expression(), Some("value"));
}

#[test]
fn test_format_application_errors() {
    for source in ["{(lambda: 0):x}", "{(0,):x}", "{1000:j}", "{'abc':d}", "{3:.2s}"] {
        let err = render_error(source, context!());
        assert_eq!(err.kind(), ErrorKind::FormatError, "{source}");
        assert!(std::error::Error::source(&err).is_some(), "{source}");
    }
}

#[test]
fn test_runtime_errors() {
    assert_eq!(
        render_error("{1 + 'a'}", context!()).kind(),
        ErrorKind::InvalidOperation
    );
    assert_eq!(
        render_error("{len(1, 2)}", context!()).kind(),
        ErrorKind::InvalidArguments
    );
    assert_eq!(
        render_error("{x.nope()}", context!(x => "abc")).kind(),
        ErrorKind::UnknownMethod
    );
}

#[test]
fn test_nothing_partial_on_failure() {
    let env = Environment::new();
    let tmpl = env.template("ok {a} {b}").unwrap();
    assert!(tmpl.render(context!(a => 1)).is_err());
    assert_eq!(tmpl.render(context!(a => 1, b => 2)).unwrap(), "ok 1 2");
}

#[test]
fn test_context_must_be_a_map() {
    let env = Environment::new();
    let tmpl = env.template("{x}").unwrap();
    let err = tmpl.render(vec![1, 2, 3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_error_display() {
    insta::assert_snapshot!(compile_error("}").to_string(), @"mismatched braces: single '}' is not allowed (at offset 0)");
    insta::assert_snapshot!(compile_error("ab{").to_string(), @"mismatched braces: expecting '}' (at offset 2)");
    insta::assert_snapshot!(compile_error("{x!z}").to_string(), @r###"invalid conversion character: invalid conversion character "z": expected 's', 'r', or 'a' (at offset 3)"###);
    insta::assert_snapshot!(render_error("v:{value}", context!()).to_string(), @"name is not defined: name 'value' is not defined (at offset 3)");
}

#[test]
#[cfg(feature = "debug")]
fn test_error_display_with_source() {
    let mut env = Environment::new();
    env.set_debug(true);
    let tmpl = env.template("v:{value}").unwrap();
    let err = tmpl.render(context!()).unwrap_err();
    assert_eq!(err.template_source(), Some("v:{value}"));
    insta::assert_snapshot!(format!("{err:#}"), @r###"
name is not defined: name 'value' is not defined (at offset 3)
------------------------------- Template Source -------------------------------
   1 > v:{value}
     i    ^ name is not defined
~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
"###);

    env.set_debug(false);
    let err = env.template("{").unwrap_err();
    assert_eq!(err.template_source(), None);
}
