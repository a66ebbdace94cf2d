use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::value::{python_cmp, Value, ValueRepr};

pub enum CoerceResult {
    I64(i64, i64),
    F64(f64, f64),
}

pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    Some(match value.0 {
        ValueRepr::Bool(x) => x as i64 as f64,
        ValueRepr::I64(x) => x as f64,
        ValueRepr::F64(x) => x,
        _ => return None,
    })
}

pub fn coerce(a: &Value, b: &Value) -> Option<CoerceResult> {
    match (&a.0, &b.0) {
        (ValueRepr::F64(a), ValueRepr::F64(b)) => Some(CoerceResult::F64(*a, *b)),

        // are floats involved?
        (ValueRepr::F64(a), _) => Some(CoerceResult::F64(*a, some!(as_f64(b)))),
        (_, ValueRepr::F64(b)) => Some(CoerceResult::F64(some!(as_f64(a)), *b)),

        // everything else is an int or a bool
        _ => Some(CoerceResult::I64(some!(a.as_i64()), some!(b.as_i64()))),
    }
}

/// Resolves a possibly negative index against a length.
pub(crate) fn normalize_index(idx: i64, len: usize) -> Option<usize> {
    let idx = if idx < 0 { idx + len as i64 } else { idx };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

fn slice_indices(len: usize, start: &Value, stop: &Value, step: &Value) -> Result<Vec<usize>, Error> {
    fn opt_int(value: &Value) -> Result<Option<i64>, Error> {
        if value.is_none() {
            Ok(None)
        } else {
            value.as_i64().map(Some).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    "slice indices must be integers or None",
                )
            })
        }
    }

    let len = len as i64;
    let step = ok!(opt_int(step)).unwrap_or(1);
    if step == 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "slice step cannot be zero",
        ));
    }
    let clamp = |idx: i64, lower: i64, upper: i64| {
        let idx = if idx < 0 { idx + len } else { idx };
        idx.clamp(lower, upper)
    };

    let mut rv = Vec::new();
    if step > 0 {
        let start = ok!(opt_int(start)).map_or(0, |x| clamp(x, 0, len));
        let stop = ok!(opt_int(stop)).map_or(len, |x| clamp(x, 0, len));
        let mut idx = start;
        while idx < stop {
            rv.push(idx as usize);
            idx += step;
        }
    } else {
        let start = ok!(opt_int(start)).map_or(len - 1, |x| clamp(x, -1, len - 1));
        let stop = ok!(opt_int(stop)).map_or(-1, |x| clamp(x, -1, len - 1));
        let mut idx = start;
        while idx > stop {
            rv.push(idx as usize);
            idx += step;
        }
    }
    Ok(rv)
}

/// Implements Python's `value[start:stop:step]`.
pub fn slice(value: &Value, start: &Value, stop: &Value, step: &Value) -> Result<Value, Error> {
    match value.0 {
        ValueRepr::String(ref s) => {
            let chars: Vec<char> = s.chars().collect();
            let indices = ok!(slice_indices(chars.len(), start, stop, step));
            Ok(Value::from(indices.into_iter().map(|x| chars[x]).collect::<String>()))
        }
        ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => {
            let indices = ok!(slice_indices(items.len(), start, stop, step));
            let sliced = indices.into_iter().map(|x| items[x].clone()).collect();
            Ok(match value.0 {
                ValueRepr::Tuple(_) => Value::from_tuple(sliced),
                _ => ValueRepr::List(Arc::new(sliced)).into(),
            })
        }
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("'{}' object is not subscriptable", value.type_name()),
        )),
    }
}

fn impossible_op(op: &str, lhs: &Value, rhs: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op,
            lhs.type_name(),
            rhs.type_name()
        ),
    )
}

fn failed_op(op: &str, lhs: &Value, rhs: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("unable to calculate {} {op} {}", lhs.to_repr(), rhs.to_repr()),
    )
}

fn zero_division(what: &str) -> Error {
    Error::new(ErrorKind::InvalidOperation, format!("{what} by zero"))
}

macro_rules! math_binop {
    ($name:ident, $int:ident, $float:tt) => {
        pub fn $name(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
            match coerce(lhs, rhs) {
                Some(CoerceResult::I64(a, b)) => match a.$int(b) {
                    Some(val) => Ok(Value::from(val)),
                    None => Err(failed_op(stringify!($float), lhs, rhs))
                },
                Some(CoerceResult::F64(a, b)) => Ok((a $float b).into()),
                _ => Err(impossible_op(stringify!($float), lhs, rhs))
            }
        }
    }
}

fn concat_seq(a: &[Value], b: &[Value]) -> Vec<Value> {
    a.iter().chain(b.iter()).cloned().collect()
}

pub fn add(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    match (&lhs.0, &rhs.0) {
        (ValueRepr::String(a), ValueRepr::String(b)) => return Ok(Value::from([&**a, &**b].concat())),
        (ValueRepr::List(a), ValueRepr::List(b)) => return Ok(Value::from(concat_seq(a, b))),
        (ValueRepr::Tuple(a), ValueRepr::Tuple(b)) => return Ok(Value::from_tuple(concat_seq(a, b))),
        _ => {}
    }
    match coerce(lhs, rhs) {
        Some(CoerceResult::I64(a, b)) => a
            .checked_add(b)
            .map(Value::from)
            .ok_or_else(|| failed_op("+", lhs, rhs)),
        Some(CoerceResult::F64(a, b)) => Ok((a + b).into()),
        None => Err(impossible_op("+", lhs, rhs)),
    }
}

math_binop!(sub, checked_sub, -);

fn repeat_items(items: &[Value], times: usize) -> Vec<Value> {
    (0..times).flat_map(|_| items.iter().cloned()).collect()
}

fn repeat(lhs: &Value, rhs: &Value) -> Option<Result<Value, Error>> {
    let (seq, times) = match (&lhs.0, &rhs.0) {
        (ValueRepr::Bool(_) | ValueRepr::I64(_), _) => (rhs, some!(lhs.as_i64())),
        (_, ValueRepr::Bool(_) | ValueRepr::I64(_)) => (lhs, some!(rhs.as_i64())),
        _ => return None,
    };
    let times = times.max(0) as usize;
    Some(match seq.0 {
        ValueRepr::String(ref s) => Ok(Value::from(s.repeat(times))),
        ValueRepr::List(ref items) => Ok(Value::from(repeat_items(items, times))),
        ValueRepr::Tuple(ref items) => Ok(Value::from_tuple(repeat_items(items, times))),
        _ => return None,
    })
}

pub fn mul(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    if let Some(rv) = repeat(lhs, rhs) {
        return rv;
    }
    match coerce(lhs, rhs) {
        Some(CoerceResult::I64(a, b)) => a
            .checked_mul(b)
            .map(Value::from)
            .ok_or_else(|| failed_op("*", lhs, rhs)),
        Some(CoerceResult::F64(a, b)) => Ok((a * b).into()),
        None => Err(impossible_op("*", lhs, rhs)),
    }
}

pub fn div(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    match (as_f64(lhs), as_f64(rhs)) {
        (Some(_), Some(b)) if b == 0.0 => Err(zero_division("division")),
        (Some(a), Some(b)) => Ok((a / b).into()),
        _ => Err(impossible_op("/", lhs, rhs)),
    }
}

pub fn int_div(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    match coerce(lhs, rhs) {
        Some(CoerceResult::I64(_, 0)) => Err(zero_division("integer division or modulo")),
        Some(CoerceResult::I64(a, b)) => {
            let q = a.wrapping_div(b);
            let q = if (a.wrapping_rem(b) != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q };
            Ok(Value::from(q))
        }
        Some(CoerceResult::F64(_, b)) if b == 0.0 => Err(zero_division("float floor division")),
        Some(CoerceResult::F64(a, b)) => Ok((a / b).floor().into()),
        None => Err(impossible_op("//", lhs, rhs)),
    }
}

/// Implements Python's `%` which takes the sign of the divisor.
///
/// With a string on the left this is printf style formatting.
pub fn rem(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    if let Some(fmt) = lhs.as_str() {
        return crate::format_utils::printf_format(fmt, rhs).map(Value::from);
    }
    match coerce(lhs, rhs) {
        Some(CoerceResult::I64(_, 0)) => Err(zero_division("integer division or modulo")),
        Some(CoerceResult::I64(a, b)) => {
            let r = a.wrapping_rem(b);
            let r = if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r };
            Ok(Value::from(r))
        }
        Some(CoerceResult::F64(_, b)) if b == 0.0 => Err(zero_division("float modulo")),
        Some(CoerceResult::F64(a, b)) => {
            let r = a % b;
            let r = if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r };
            Ok(r.into())
        }
        None => Err(impossible_op("%", lhs, rhs)),
    }
}

/// Implements a binary `pow` operation on values.
pub fn pow(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    match coerce(lhs, rhs) {
        Some(CoerceResult::I64(a, b)) if b < 0 => Ok((a as f64).powf(b as f64).into()),
        Some(CoerceResult::I64(a, b)) => {
            match u32::try_from(b).ok().and_then(|b| a.checked_pow(b)) {
                Some(val) => Ok(Value::from(val)),
                None => Err(failed_op("**", lhs, rhs)),
            }
        }
        Some(CoerceResult::F64(a, b)) => Ok((a.powf(b)).into()),
        None => Err(impossible_op("**", lhs, rhs)),
    }
}

macro_rules! bit_binop {
    ($name:ident, $op:tt) => {
        pub fn $name(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
            match (&lhs.0, &rhs.0) {
                (ValueRepr::Bool(a), ValueRepr::Bool(b)) => Ok(Value::from(*a $op *b)),
                _ => match (lhs.as_i64(), rhs.as_i64()) {
                    (Some(a), Some(b)) => Ok(Value::from(a $op b)),
                    _ => Err(impossible_op(stringify!($op), lhs, rhs)),
                },
            }
        }
    };
}

bit_binop!(bit_and, &);
bit_binop!(bit_or, |);
bit_binop!(bit_xor, ^);

pub fn shift_left(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    match (lhs.as_i64(), rhs.as_i64()) {
        (Some(_), Some(b)) if b < 0 => Err(Error::new(ErrorKind::InvalidOperation, "negative shift count")),
        (Some(a), Some(b)) => u32::try_from(b)
            .ok()
            .and_then(|b| a.checked_mul(1i64.checked_shl(b).filter(|x| *x > 0)?))
            .map(Value::from)
            .ok_or_else(|| failed_op("<<", lhs, rhs)),
        _ => Err(impossible_op("<<", lhs, rhs)),
    }
}

pub fn shift_right(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    match (lhs.as_i64(), rhs.as_i64()) {
        (Some(_), Some(b)) if b < 0 => Err(Error::new(ErrorKind::InvalidOperation, "negative shift count")),
        (Some(a), Some(b)) => Ok(Value::from(a >> b.min(63))),
        _ => Err(impossible_op(">>", lhs, rhs)),
    }
}

/// Implements an unary `neg` operation on value.
pub fn neg(val: &Value) -> Result<Value, Error> {
    match val.0 {
        ValueRepr::F64(x) => Ok((-x).into()),
        _ => match val.as_i64() {
            Some(x) => x
                .checked_neg()
                .map(Value::from)
                .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "integer overflow")),
            None => Err(bad_operand("unary -", val)),
        },
    }
}

/// Implements an unary `+` operation on value.
pub fn pos(val: &Value) -> Result<Value, Error> {
    match val.0 {
        ValueRepr::F64(_) | ValueRepr::I64(_) => Ok(val.clone()),
        ValueRepr::Bool(b) => Ok(Value::from(b as i64)),
        _ => Err(bad_operand("unary +", val)),
    }
}

/// Implements an unary `~` operation on value.
pub fn invert(val: &Value) -> Result<Value, Error> {
    match val.as_i64() {
        Some(x) => Ok(Value::from(!x)),
        None => Err(bad_operand("unary ~", val)),
    }
}

fn bad_operand(op: &str, val: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("bad operand type for {op}: '{}'", val.type_name()),
    )
}

/// Implements a containment operation on values.
pub fn contains(container: &Value, value: &Value) -> Result<bool, Error> {
    match container.0 {
        ValueRepr::String(ref s) => match value.as_str() {
            Some(needle) => Ok(s.contains(needle)),
            None => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "'in <string>' requires string as left operand, not {}",
                    value.type_name()
                ),
            )),
        },
        ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => {
            Ok(items.iter().any(|item| item == value))
        }
        ValueRepr::Set(ref items) => Ok(items.contains(value)),
        ValueRepr::Map(ref map) => Ok(map.contains_key(value)),
        ValueRepr::Object(ref obj) => match obj.iter() {
            Some(items) => Ok(items.iter().any(|item| item == value)),
            None => Err(not_container(container)),
        },
        _ => Err(not_container(container)),
    }
}

fn not_container(container: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ),
    )
}

/// Implements `is` which compares identity for containers and objects and
/// equality for the immutable primitives.
pub fn is_same(a: &Value, b: &Value) -> bool {
    match (&a.0, &b.0) {
        (ValueRepr::None, ValueRepr::None) => true,
        (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
        (ValueRepr::I64(a), ValueRepr::I64(b)) => a == b,
        (ValueRepr::F64(a), ValueRepr::F64(b)) => a.to_bits() == b.to_bits(),
        (ValueRepr::String(a), ValueRepr::String(b)) => Arc::ptr_eq(a, b) || a == b,
        (ValueRepr::List(a), ValueRepr::List(b)) => Arc::ptr_eq(a, b),
        (ValueRepr::Tuple(a), ValueRepr::Tuple(b)) => Arc::ptr_eq(a, b),
        (ValueRepr::Set(a), ValueRepr::Set(b)) => Arc::ptr_eq(a, b),
        (ValueRepr::Map(a), ValueRepr::Map(b)) => Arc::ptr_eq(a, b),
        (ValueRepr::Object(a), ValueRepr::Object(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Implements the ordering comparisons.
pub fn compare(op: &str, lhs: &Value, rhs: &Value) -> Result<bool, Error> {
    let ordering = ok!(python_cmp(lhs, rhs).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "'{op}' not supported between instances of '{}' and '{}'",
                lhs.type_name(),
                rhs.type_name()
            ),
        )
    }));
    Ok(match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}
