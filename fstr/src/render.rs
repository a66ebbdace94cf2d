use std::borrow::Cow;

use crate::compiler::segments::{CompiledTemplate, ExprSlot, Segment, Specifier};
use crate::context::Context;
use crate::error::{Error, ErrorKind};
use crate::format_utils::{apply_conversion, format_value};
use crate::value::{Value, ValueKind};

/// Checks that a converted context can be used for name lookups.
pub(crate) fn validate_context(ctx: Value) -> Result<Value, Error> {
    let ctx = ok!(ctx.validate());
    match ctx.kind() {
        ValueKind::Dict | ValueKind::None => Ok(ctx),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("context must be a mapping, not {}", ctx.type_name()),
        )),
    }
}

/// Renders compiled segments against a context.
///
/// Slots are evaluated strictly left to right.  The output is collected in
/// a local buffer so nothing is returned if any slot fails.
pub(crate) fn render_template(
    compiled: &CompiledTemplate,
    ctx: &Context<'_>,
) -> Result<String, Error> {
    let mut out = String::new();
    for segment in compiled.segments() {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Expr(slot) => out.push_str(&ok!(render_slot(slot, ctx))),
        }
    }
    Ok(out)
}

fn render_slot(slot: &ExprSlot, ctx: &Context<'_>) -> Result<String, Error> {
    let value = ok!(slot
        .compiled
        .eval(ctx)
        .and_then(Value::validate)
        .map_err(|mut err| {
            err.set_offset_if_missing(slot.offset);
            err.set_expression(&slot.source);
            err
        }));

    // the expression is evaluated before its specifier
    let spec = match slot.spec {
        None => Cow::Borrowed(""),
        Some(Specifier::Static(ref spec)) => Cow::Borrowed(spec.as_str()),
        Some(Specifier::Dynamic(ref nested)) => Cow::Owned(ok!(render_template(nested, ctx))),
    };

    let value = match slot.conversion {
        Some(conversion) => apply_conversion(value, conversion),
        None => value,
    };

    log::trace!("formatting {:?} with spec {:?}", slot.source, spec);
    format_value(&value, &spec).map_err(|err| {
        let mut rv = Error::new(
            ErrorKind::FormatError,
            format!(
                "cannot format result of {:?} ({}) with spec {:?}",
                slot.source,
                value.type_name(),
                spec
            ),
        )
        .with_offset(slot.offset)
        .with_source(err);
        rv.set_expression(&slot.source);
        rv
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::context;
    use crate::environment::Environment;

    #[test]
    fn test_validate_context() {
        assert!(validate_context(Value::from(())).is_ok());
        assert!(validate_context(context!(a => 1)).is_ok());
        let err = validate_context(Value::from(vec![1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.detail(), Some("context must be a mapping, not list"));
    }

    #[test]
    fn test_format_error_wraps_source() {
        let env = Environment::new();
        let err = env.render_str("ab {x:d}", context!(x => "str")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatError);
        assert_eq!(err.offset(), Some(4));
        assert_eq!(err.expression(), Some("x"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_eval_error_keeps_kind() {
        let env = Environment::new();
        let err = env.render_str("{1 // 0}", ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.offset(), Some(1));
        assert_eq!(err.expression(), Some("1 // 0"));
    }
}
