use std::sync::Arc;

use crate::compiler::scanner::{open_parens, scan, Chunk};
use crate::compiler::segments::{CompiledTemplate, Conversion, ExprSlot, Segment, Specifier};
use crate::compiler::splitter::split_specifier;
use crate::error::{Error, ErrorKind};
use crate::evaluator::{CompiledExpr, Evaluator};

/// Compiles template source into segments.
///
/// Every expression is compiled eagerly with the given evaluator.  Format
/// specs with nested fields are compiled recursively; `max_spec_depth`
/// counts the replacement field levels including the outermost one.
pub(crate) fn compile_template(
    source: &str,
    evaluator: &dyn Evaluator,
    max_spec_depth: usize,
) -> Result<CompiledTemplate, Error> {
    Compiler {
        evaluator,
        max_spec_depth,
    }
    .compile(source, 0, 1)
}

struct Compiler<'a> {
    evaluator: &'a dyn Evaluator,
    max_spec_depth: usize,
}

fn error_at(kind: ErrorKind, msg: &'static str, offset: usize) -> Error {
    Error::new(kind, msg).with_offset(offset)
}

// Maps an offset into the newline stripped expression back to an offset
// into the trimmed expression.
fn unstrip_offset(trimmed: &str, offset: usize) -> usize {
    let mut seen = 0;
    for (idx, b) in trimmed.bytes().enumerate() {
        if b == b'\n' {
            continue;
        }
        if seen == offset {
            return idx;
        }
        seen += 1;
    }
    trimmed.len()
}

impl<'a> Compiler<'a> {
    fn compile(&self, source: &str, base: usize, level: usize) -> Result<CompiledTemplate, Error> {
        let chunks = ok!(scan(source, level > 1).map_err(|mut err| {
            err.shift_offset(base);
            err
        }));
        let mut segments = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            segments.push(match chunk {
                Chunk::Literal(text) => Segment::Literal(text),
                Chunk::Region(range) => Segment::Expr(ok!(self.compile_region(
                    &source[range.clone()],
                    base + range.start,
                    level
                ))),
            });
        }
        Ok(CompiledTemplate { segments })
    }

    fn compile_region(&self, region: &str, offset: usize, level: usize) -> Result<ExprSlot, Error> {
        let (expr, tail) = split_specifier(region);
        if open_parens(expr) > 0 {
            return Err(error_at(
                ErrorKind::MismatchedParentheses,
                "unclosed '(' in expression",
                offset + region.len(),
            ));
        }
        let (source, compiled) = ok!(self.compile_expr(expr, offset));
        let tail_offset = offset + expr.len();

        let (conversion, spec) = match tail.strip_prefix('!') {
            Some(rest) => {
                let (marker, spec) = match rest.find(':') {
                    Some(idx) => (&rest[..idx], Some((&rest[idx + 1..], tail_offset + idx + 2))),
                    None => (rest, None),
                };
                if marker.contains('{') {
                    return Err(error_at(
                        ErrorKind::DynamicConversion,
                        "nested fields are only allowed in the format spec",
                        tail_offset + 1,
                    ));
                }
                let conversion = ok!(Conversion::from_marker(marker.trim_end()).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidConversion,
                        format!("invalid conversion character {marker:?}: expected 's', 'r', or 'a'"),
                    )
                    .with_offset(tail_offset + 1)
                }));
                (Some(conversion), spec)
            }
            None => (None, tail.get(1..).map(|spec| (spec, tail_offset + 1))),
        };

        let spec = match spec {
            Some((spec, _)) if spec.is_empty() => None,
            Some((spec, spec_offset)) if spec.contains('{') => {
                if level >= self.max_spec_depth {
                    return Err(error_at(
                        ErrorKind::SyntaxError,
                        "expressions nested too deeply",
                        spec_offset,
                    ));
                }
                Some(Specifier::Dynamic(Box::new(ok!(self.compile(
                    spec,
                    spec_offset,
                    level + 1
                )))))
            }
            Some((spec, spec_offset)) => {
                if let Some(idx) = spec.find('}') {
                    return Err(error_at(
                        ErrorKind::MismatchedBraces,
                        "single '}' is not allowed",
                        spec_offset + idx,
                    ));
                }
                Some(Specifier::Static(spec.to_string()))
            }
            None => None,
        };

        Ok(ExprSlot {
            source,
            compiled,
            conversion,
            spec,
            offset,
        })
    }

    fn compile_expr(
        &self,
        expr: &str,
        offset: usize,
    ) -> Result<(String, Arc<dyn CompiledExpr>), Error> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(error_at(
                ErrorKind::EmptyExpression,
                "empty expression not allowed",
                offset,
            ));
        }
        let lead = offset + (expr.len() - expr.trim_start().len());
        if let Some(idx) = trimmed.find('\\') {
            return Err(error_at(
                ErrorKind::BackslashInExpression,
                "expression part cannot include a backslash",
                lead + idx,
            ));
        }

        let source = trimmed.replace('\n', "");
        match self.evaluator.compile(&source) {
            Ok(compiled) => Ok((source, compiled)),
            Err(mut err) => {
                err.set_offset_if_missing(0);
                if let Some(err_offset) = err.offset() {
                    err = err.with_offset(lead + unstrip_offset(trimmed, err_offset));
                }
                err.set_expression(&source);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::expr::PyEvaluator;

    fn compile(source: &str) -> Result<CompiledTemplate, Error> {
        compile_template(source, &PyEvaluator::default(), 2)
    }

    fn compile_err(source: &str) -> (ErrorKind, Option<usize>) {
        let err = compile(source).unwrap_err();
        (err.kind(), err.offset())
    }

    #[test]
    fn test_segments() {
        let tmpl = compile("Hello {name!r:>10}, {{ok}}").unwrap();
        let segments = tmpl.segments();
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[0], Segment::Literal(ref s) if s == "Hello "));
        let slot = match segments[1] {
            Segment::Expr(ref slot) => slot,
            _ => panic!("expected an expression"),
        };
        assert_eq!(slot.source(), "name");
        assert_eq!(slot.conversion(), Some(Conversion::Repr));
        assert!(matches!(slot.spec(), Some(Specifier::Static(s)) if s == ">10"));
        assert_eq!(slot.offset(), 7);
        assert!(matches!(segments[2], Segment::Literal(ref s) if s == ", {ok}"));
    }

    #[test]
    fn test_expression_cleanup() {
        let tmpl = compile("{ a +\n b }").unwrap();
        let sources: Vec<_> = tmpl.slots().map(|x| x.source()).collect();
        assert_eq!(sources, vec!["a + b"]);
    }

    #[test]
    fn test_dynamic_spec() {
        let tmpl = compile("{x:{w}.{p}}").unwrap();
        let slot = tmpl.slots().next().unwrap();
        let nested = match slot.spec() {
            Some(Specifier::Dynamic(nested)) => nested,
            other => panic!("unexpected spec {other:?}"),
        };
        let offsets: Vec<_> = nested.slots().map(|x| x.offset()).collect();
        assert_eq!(offsets, vec![4, 8]);
    }

    #[test]
    fn test_empty_spec_and_conversion_spacing() {
        let tmpl = compile("{x:}{y!s }").unwrap();
        let slots: Vec<_> = tmpl.slots().collect();
        assert!(slots[0].spec().is_none());
        assert_eq!(slots[1].conversion(), Some(Conversion::Str));
    }

    #[test]
    fn test_errors() {
        assert_eq!(compile_err("{}"), (ErrorKind::EmptyExpression, Some(1)));
        assert_eq!(compile_err("ab{ }"), (ErrorKind::EmptyExpression, Some(3)));
        assert_eq!(compile_err("{!r}"), (ErrorKind::EmptyExpression, Some(1)));
        assert_eq!(compile_err("{x!z}"), (ErrorKind::InvalidConversion, Some(3)));
        assert_eq!(compile_err("{x!}"), (ErrorKind::InvalidConversion, Some(3)));
        assert_eq!(compile_err("{x! r}"), (ErrorKind::InvalidConversion, Some(3)));
        assert_eq!(compile_err("{x!rr}"), (ErrorKind::InvalidConversion, Some(3)));
        assert_eq!(compile_err("{x!{c}}"), (ErrorKind::DynamicConversion, Some(3)));
        assert_eq!(compile_err("{'a\\n'}"), (ErrorKind::BackslashInExpression, Some(3)));
        assert_eq!(compile_err("{x:{y:{z}}}"), (ErrorKind::SyntaxError, Some(6)));
        assert_eq!(compile_err("{x:{{y}}}").0, ErrorKind::MismatchedBraces);
        assert_eq!(compile_err("{'a\\'b'}"), (ErrorKind::BackslashInExpression, Some(3)));
        assert_eq!(compile_err("{\"x\\\"y\"}"), (ErrorKind::BackslashInExpression, Some(3)));
        assert_eq!(compile_err("ab{(x}"), (ErrorKind::MismatchedParentheses, Some(5)));
        assert_eq!(compile_err("{f(x, ')'}"), (ErrorKind::MismatchedParentheses, Some(9)));
    }

    #[test]
    fn test_parens_in_spec_are_fill() {
        let tmpl = compile("{x:(>5}").unwrap();
        let slot = tmpl.slots().next().unwrap();
        assert!(matches!(slot.spec(), Some(Specifier::Static(s)) if s == "(>5"));
    }

    #[test]
    fn test_syntax_error_offsets() {
        let err = compile("abc {1 +}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.expression(), Some("1 +"));
        assert!(err.offset().unwrap() >= 5);

        let err = compile("{x:{1 +}}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.offset().unwrap() >= 4);
    }

    #[test]
    fn test_unstrip_offset() {
        assert_eq!(unstrip_offset("a\nb", 0), 0);
        assert_eq!(unstrip_offset("a\nb", 1), 2);
        assert_eq!(unstrip_offset("a\nb", 2), 3);
    }
}
