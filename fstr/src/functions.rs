//! Global functions and abstractions.
//!
//! This module provides the abstractions for functions that can registered as
//! global functions to the environment via
//! [`add_function`](crate::Environment::add_function).
//!
//! # Custom Functions
//!
//! A custom global function is just a simple rust function which accepts up
//! to four arguments and returns a result.  Arguments are converted from
//! values via [`ArgType`](crate::value::ArgType).
//!
//! ```rust
//! # use fstr::Environment;
//! # let mut env = Environment::new();
//! use fstr::{Error, ErrorKind};
//!
//! fn read_file(name: String) -> Result<String, Error> {
//!     std::fs::read_to_string(&name)
//!         .map_err(|e| Error::new(
//!             ErrorKind::InvalidOperation,
//!             "cannot load file"
//!         ).with_source(e))
//! }
//!
//! env.add_function("read_file", read_file);
//! ```
//!
//! # Built-in Functions
//!
//! When the `builtins` feature is enabled a subset of Python's builtin
//! functions is added to environments created with
//! [`Environment::new`](crate::Environment::new).  They are also all provided
//! in this module.  Functions that return iterators in Python (`enumerate`,
//! `reversed`, `zip`, `range`) return lists here.
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::value::{FunctionArgs, FunctionResult, Kwargs, Object, Value};

type FuncFunc = dyn Fn(&[Value], &Kwargs) -> Result<Value, Error> + Sync + Send + 'static;

/// A boxed function.
#[derive(Clone)]
pub(crate) struct BoxedFunction(Arc<FuncFunc>, &'static str);

/// A utility trait that represents global functions.
///
/// This trait is used by the [`add_function`](crate::Environment::add_function)
/// method to abstract over different types of functions.
///
/// Functions accept up to 4 parameters.  A function can return any of the
/// following types:
///
/// * `Rv` where `Rv` implements `Into<Value>`
/// * `Result<Rv, Error>` where `Rv` implements `Into<Value>`
///
/// The parameters can be marked optional by using `Option<T>`.  The last
/// argument can also use [`Rest<T>`](crate::value::Rest) to capture the
/// remaining arguments or [`Kwargs`] to receive the keyword arguments.
///
/// # Variadic
///
/// ```
/// # use fstr::Environment;
/// # let mut env = Environment::new();
/// use fstr::value::Rest;
///
/// fn product(values: Rest<i64>) -> i64 {
///     values.iter().product()
/// }
///
/// env.add_function("product", product);
/// let tmpl = env.template("{product(1, 2, 3)}").unwrap();
/// assert_eq!(tmpl.render(()).unwrap(), "6");
/// ```
pub trait Function<Rv, Args>: Send + Sync + 'static {
    /// Calls a function with the given arguments.
    #[doc(hidden)]
    fn invoke(&self, args: Args) -> Rv;
}

macro_rules! tuple_impls {
    ( $( $name:ident )* ) => {
        impl<Func, Rv, $($name),*> Function<Rv, ($($name,)*)> for Func
        where
            Func: Fn($($name),*) -> Rv + Send + Sync + 'static,
            Rv: FunctionResult,
        {
            fn invoke(&self, args: ($($name,)*)) -> Rv {
                #[allow(non_snake_case)]
                let ($($name,)*) = args;
                (self)($($name,)*)
            }
        }
    };
}

tuple_impls! {}
tuple_impls! { A }
tuple_impls! { A B }
tuple_impls! { A B C }
tuple_impls! { A B C D }

impl BoxedFunction {
    /// Creates a new boxed function.
    pub fn new<F, Rv, Args>(f: F) -> BoxedFunction
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: FunctionArgs,
    {
        BoxedFunction(
            Arc::new(move |args, kwargs| -> Result<Value, Error> {
                f.invoke(ok!(Args::from_values(args, kwargs))).into_result()
            }),
            std::any::type_name::<F>(),
        )
    }

    /// Invokes the function.
    pub fn invoke(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        (self.0)(args, kwargs)
    }

    /// Creates a value from a boxed function.
    pub fn to_value(&self) -> Value {
        Value::from_object(self.clone())
    }

    fn name(&self) -> &'static str {
        match self.1.rsplit("::").next() {
            Some(name) if !name.is_empty() => name,
            _ => "function",
        }
    }
}

impl fmt::Debug for BoxedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            if self.1.is_empty() {
                "BoxedFunction"
            } else {
                self.1
            }
        )
    }
}

impl fmt::Display for BoxedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name())
    }
}

impl Object for BoxedFunction {
    fn type_name(&self) -> &str {
        "builtin_function_or_method"
    }

    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        self.invoke(args, kwargs)
    }
}

#[cfg(feature = "builtins")]
mod builtins {
    use super::*;

    use std::cmp::Ordering;

    use crate::error::ErrorKind;
    use crate::format_utils::format_value;
    use crate::value::{ops, python_cmp, Rest, ValueMap, ValueRepr};

    const MAX_RANGE: usize = 100_000;

    fn type_error(msg: String) -> Error {
        Error::new(ErrorKind::InvalidOperation, msg)
    }

    fn collect(value: Option<Value>) -> Result<Vec<Value>, Error> {
        match value {
            Some(value) => Ok(ok!(value.try_iter()).collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the absolute value of a number.
    pub fn abs(value: Value) -> Result<Value, Error> {
        match value.0 {
            ValueRepr::Bool(val) => Ok(Value::from(val as i64)),
            ValueRepr::I64(val) => val
                .checked_abs()
                .map(Value::from)
                .ok_or_else(|| type_error("integer overflow in abs()".into())),
            ValueRepr::F64(val) => Ok(Value::from(val.abs())),
            _ => Err(type_error(format!(
                "bad operand type for abs(): '{}'",
                value.type_name()
            ))),
        }
    }

    /// Returns `True` if all items of the iterable are true.
    pub fn all(iterable: Value) -> Result<bool, Error> {
        Ok(ok!(iterable.try_iter()).all(|x| x.is_true()))
    }

    /// Returns `True` if any item of the iterable is true.
    pub fn any(iterable: Value) -> Result<bool, Error> {
        Ok(ok!(iterable.try_iter()).any(|x| x.is_true()))
    }

    /// Returns the `repr()` of a value with non-ASCII characters escaped.
    pub fn ascii(value: Value) -> String {
        value.to_ascii()
    }

    fn radix_repr(prefix: &str, value: i64, digits: String) -> String {
        if value < 0 {
            format!("-{prefix}{digits}")
        } else {
            format!("{prefix}{digits}")
        }
    }

    /// Converts an integer to a binary string prefixed with `0b`.
    pub fn bin(value: i64) -> String {
        radix_repr("0b", value, format!("{:b}", value.unsigned_abs()))
    }

    /// Converts an integer to an octal string prefixed with `0o`.
    pub fn oct(value: i64) -> String {
        radix_repr("0o", value, format!("{:o}", value.unsigned_abs()))
    }

    /// Converts an integer to a hexadecimal string prefixed with `0x`.
    pub fn hex(value: i64) -> String {
        radix_repr("0x", value, format!("{:x}", value.unsigned_abs()))
    }

    /// Returns the truthiness of a value.
    pub fn bool(value: Option<Value>) -> bool {
        value.map_or(false, |x| x.is_true())
    }

    /// Returns the character for a unicode code point.
    pub fn chr(value: i64) -> Result<String, Error> {
        u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| type_error("chr() arg not in range(0x110000)".into()))
    }

    /// Returns the code point of a single character string.
    pub fn ord(value: String) -> Result<u32, Error> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c as u32),
            _ => Err(type_error(format!(
                "ord() expected a character, but string of length {} found",
                value.chars().count()
            ))),
        }
    }

    /// Creates a dict.
    ///
    /// Accepts a dict or an iterable of key/value pairs plus keyword
    /// arguments.  `dict(a=1)` is the same as `{'a': 1}`.
    pub fn dict(value: Option<Value>, kwargs: Kwargs) -> Result<Value, Error> {
        let mut rv = ValueMap::new();
        match value {
            None => {}
            Some(Value(ValueRepr::Map(ref map))) => {
                rv.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(value) => {
                for item in ok!(value.try_iter()) {
                    let pair: Vec<Value> = ok!(item.try_iter()).collect();
                    match <[Value; 2]>::try_from(pair) {
                        Ok([key, value]) if key.is_hashable() => {
                            rv.insert(key, value);
                        }
                        _ => {
                            return Err(type_error(
                                "dict() items must be key/value pairs of hashable keys".into(),
                            ))
                        }
                    }
                }
            }
        }
        for (key, value) in kwargs.iter() {
            rv.insert(Value::from(key), value.clone());
        }
        Ok(Value::from(rv))
    }

    /// Returns the quotient and the remainder of an integer division.
    pub fn divmod(a: Value, b: Value) -> Result<Value, Error> {
        Ok(Value::from_tuple(vec![
            ok!(ops::int_div(&a, &b)),
            ok!(ops::rem(&a, &b)),
        ]))
    }

    /// Pairs every item of an iterable with its index.
    pub fn enumerate(iterable: Value, start: Option<i64>) -> Result<Value, Error> {
        let start = start.unwrap_or(0);
        Ok(ok!(iterable.try_iter())
            .zip(start..)
            .map(|(item, idx)| Value::from_tuple(vec![Value::from(idx), item]))
            .collect())
    }

    /// Converts a number or string to a float.
    pub fn float(value: Option<Value>) -> Result<f64, Error> {
        let value = match value {
            Some(value) => value,
            None => return Ok(0.0),
        };
        match value.0 {
            ValueRepr::String(ref s) => s.trim().replace('_', "").parse().map_err(|_| {
                type_error(format!(
                    "could not convert string to float: {}",
                    value.to_repr()
                ))
            }),
            _ => f64::try_from(value),
        }
    }

    /// Formats a value with a format spec like `{value:spec}` would.
    pub fn format(value: Value, spec: Option<String>) -> Result<String, Error> {
        format_value(&value, spec.as_deref().unwrap_or(""))
    }

    fn parse_int(s: &str, base: u32) -> Option<i64> {
        let s = s.trim();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let lower = digits.to_ascii_lowercase();
        let (base, digits) = match (base, lower.get(..2)) {
            (0 | 16, Some("0x")) => (16, &lower[2..]),
            (0 | 8, Some("0o")) => (8, &lower[2..]),
            (0 | 2, Some("0b")) => (2, &lower[2..]),
            (0, _) => (10, &lower[..]),
            (base, _) => (base, &lower[..]),
        };
        if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
            return None;
        }
        let value = i64::from_str_radix(&digits.replace('_', ""), base).ok()?;
        Some(if negative { -value } else { value })
    }

    /// Converts a value to an integer.
    ///
    /// Floats are truncated towards zero.  Strings are parsed in the given
    /// base (10 by default, 0 to detect the base from a prefix).
    pub fn int(value: Option<Value>, base: Option<u32>) -> Result<i64, Error> {
        let value = match value {
            Some(value) => value,
            None => return Ok(0),
        };
        match value.0 {
            ValueRepr::String(ref s) => {
                let base = base.unwrap_or(10);
                if base == 1 || base > 36 {
                    return Err(Error::new(
                        ErrorKind::InvalidArguments,
                        "int() base must be >= 2 and <= 36, or 0",
                    ));
                }
                parse_int(s, base).ok_or_else(|| {
                    type_error(format!(
                        "invalid literal for int() with base {}: {}",
                        base,
                        value.to_repr()
                    ))
                })
            }
            _ if base.is_some() => Err(type_error(
                "int() can't convert non-string with explicit base".into(),
            )),
            ValueRepr::F64(val) => {
                if val.is_finite() && val.trunc().abs() < 9.2e18 {
                    Ok(val.trunc() as i64)
                } else {
                    Err(type_error(format!(
                        "cannot convert float {} to integer",
                        value
                    )))
                }
            }
            _ => i64::try_from(value),
        }
    }

    /// Returns the length of a value.
    pub fn len(value: Value) -> Result<usize, Error> {
        value.len().ok_or_else(|| {
            type_error(format!(
                "object of type '{}' has no len()",
                value.type_name()
            ))
        })
    }

    /// Creates a list from an iterable.
    pub fn list(value: Option<Value>) -> Result<Value, Error> {
        collect(value).map(Value::from)
    }

    /// Creates a tuple from an iterable.
    pub fn tuple(value: Option<Value>) -> Result<Value, Error> {
        collect(value).map(Value::from_tuple)
    }

    fn extremum(
        name: &str,
        args: Rest<Value>,
        kwargs: Kwargs,
        wanted: Ordering,
    ) -> Result<Value, Error> {
        ok!(kwargs.expect_only(&["key", "default"]));
        let key: Option<Value> = ok!(kwargs.get("key"));
        let items = match args.len() {
            0 => {
                return Err(Error::new(
                    ErrorKind::InvalidArguments,
                    format!("{name} expected at least 1 argument, got 0"),
                ))
            }
            1 => ok!(args[0].try_iter()).collect(),
            _ => args.0,
        };

        let mut best: Option<(Value, Value)> = None;
        for item in items {
            let item_key = match key {
                Some(ref key) => ok!(key.call(&[item.clone()], &Kwargs::default())),
                None => item.clone(),
            };
            let replace = match best {
                Some((ref best_key, _)) => ok!(python_cmp(&item_key, best_key)) == wanted,
                None => true,
            };
            if replace {
                best = Some((item_key, item));
            }
        }

        match best {
            Some((_, value)) => Ok(value),
            None => kwargs.get_value("default").cloned().ok_or_else(|| {
                type_error(format!("{name}() arg is an empty sequence"))
            }),
        }
    }

    /// Returns the largest item.
    pub fn max(args: Rest<Value>, kwargs: Kwargs) -> Result<Value, Error> {
        extremum("max", args, kwargs, Ordering::Greater)
    }

    /// Returns the smallest item.
    pub fn min(args: Rest<Value>, kwargs: Kwargs) -> Result<Value, Error> {
        extremum("min", args, kwargs, Ordering::Less)
    }

    /// Raises a number to a power, optionally modulo a third number.
    pub fn pow(base: Value, exp: Value, modulo: Option<Value>) -> Result<Value, Error> {
        let modulo = match modulo {
            Some(modulo) => modulo,
            None => return ops::pow(&base, &exp),
        };
        let (mut base, mut exp, modulo) = match (base.as_i64(), exp.as_i64(), modulo.as_i64()) {
            (Some(base), Some(exp), Some(modulo)) => (base, exp, modulo),
            _ => {
                return Err(type_error(
                    "pow() 3rd argument not allowed unless all arguments are integers".into(),
                ))
            }
        };
        if modulo == 0 {
            return Err(type_error("pow() 3rd argument cannot be 0".into()));
        }
        if exp < 0 {
            return Err(type_error(
                "pow() 2nd argument cannot be negative when 3rd argument specified".into(),
            ));
        }
        let m = modulo as i128;
        let mut rv: i128 = 1;
        let mut b = (base as i128).rem_euclid(m);
        while exp > 0 {
            if exp & 1 == 1 {
                rv = (rv * b).rem_euclid(m);
            }
            b = (b * b).rem_euclid(m);
            exp >>= 1;
        }
        base = rv as i64;
        // python's result takes the sign of the modulus
        if base != 0 && modulo < 0 {
            base += modulo;
        }
        Ok(Value::from(base))
    }

    /// Returns a list of integers.
    ///
    /// `range(stop)`, `range(start, stop)` and `range(start, stop, step)`
    /// work like in Python.  Ranges with more than 100000 items fail.
    pub fn range(lower: i64, upper: Option<i64>, step: Option<i64>) -> Result<Value, Error> {
        let (start, stop) = match upper {
            Some(upper) => (lower, upper),
            None => (0, lower),
        };
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArguments,
                "range() arg 3 must not be zero",
            ));
        }
        let len = if step > 0 && start < stop {
            (stop as i128 - start as i128 + step as i128 - 1) / step as i128
        } else if step < 0 && start > stop {
            (start as i128 - stop as i128 - step as i128 - 1) / -(step as i128)
        } else {
            0
        };
        if len > MAX_RANGE as i128 {
            return Err(type_error(format!(
                "range has too many elements (limit is {MAX_RANGE})"
            )));
        }
        Ok((0..len as i64).map(|idx| start + idx * step).collect())
    }

    /// Returns the `repr()` of a value.
    pub fn repr(value: Value) -> String {
        value.to_repr()
    }

    /// Returns the items of a sequence in reverse order.
    pub fn reversed(value: Value) -> Result<Value, Error> {
        let mut items: Vec<Value> = ok!(value.try_iter()).collect();
        items.reverse();
        Ok(Value::from(items))
    }

    fn round_half_even(val: f64) -> f64 {
        if (val - val.trunc()).abs() == 0.5 {
            2.0 * (val / 2.0).round()
        } else {
            val.round()
        }
    }

    /// Rounds a number to a given precision in decimal digits.
    ///
    /// Halves are rounded to the nearest even number.  Without `ndigits`
    /// the result is an integer.
    pub fn round(value: Value, ndigits: Option<i64>) -> Result<Value, Error> {
        match (&value.0, ndigits) {
            (ValueRepr::I64(val), Some(digits)) if digits < 0 => {
                let factor = match 10i64.checked_pow(digits.unsigned_abs() as u32) {
                    Some(factor) => factor,
                    None => return Ok(Value::from(0)),
                };
                let rounded = round_half_even(*val as f64 / factor as f64) as i64;
                Ok(Value::from(rounded.saturating_mul(factor)))
            }
            (ValueRepr::Bool(_) | ValueRepr::I64(_), _) => int(Some(value), None).map(Value::from),
            (ValueRepr::F64(val), None) => {
                int(Some(Value::from(round_half_even(*val))), None).map(Value::from)
            }
            (ValueRepr::F64(val), Some(digits)) if digits >= 0 => {
                // decimal formatting rounds the exact binary value
                let formatted = format!("{:.*}", digits.min(400) as usize, val);
                Ok(Value::from(formatted.parse::<f64>().unwrap_or(*val)))
            }
            (ValueRepr::F64(val), Some(digits)) => {
                let factor = 10f64.powi(digits.max(-308) as i32);
                let rounded = round_half_even(val * factor) / factor;
                Ok(Value::from(if rounded.is_finite() { rounded } else { *val }))
            }
            _ => Err(type_error(format!(
                "type {} doesn't define __round__ method",
                value.type_name()
            ))),
        }
    }

    /// Returns a sorted list of the items of an iterable.
    ///
    /// Supports the `key` and `reverse` keyword arguments.
    pub fn sorted(iterable: Value, kwargs: Kwargs) -> Result<Value, Error> {
        ok!(kwargs.expect_only(&["key", "reverse"]));
        let key: Option<Value> = ok!(kwargs.get("key"));
        let reverse: Option<bool> = ok!(kwargs.get("reverse"));

        let mut items = Vec::new();
        for item in ok!(iterable.try_iter()) {
            let sort_key = match key {
                Some(ref key) => ok!(key.call(&[item.clone()], &Kwargs::default())),
                None => item.clone(),
            };
            items.push((sort_key, item));
        }

        let mut err = None;
        items.sort_by(|(a, _), (b, _)| {
            let (a, b) = if reverse.unwrap_or(false) {
                (b, a)
            } else {
                (a, b)
            };
            python_cmp(a, b).unwrap_or_else(|e| {
                err.get_or_insert(e);
                Ordering::Equal
            })
        });
        match err {
            Some(err) => Err(err),
            None => Ok(items.into_iter().map(|(_, item)| item).collect()),
        }
    }

    /// Returns the `str()` of a value.
    pub fn str(value: Option<Value>) -> String {
        value.map(|x| x.to_string()).unwrap_or_default()
    }

    /// Sums up the items of an iterable.
    pub fn sum(iterable: Value, start: Option<Value>) -> Result<Value, Error> {
        let mut rv = start.unwrap_or_else(|| Value::from(0));
        if rv.as_str().is_some() {
            return Err(type_error(
                "sum() can't sum strings [use ''.join(seq) instead]".into(),
            ));
        }
        for item in ok!(iterable.try_iter()) {
            rv = ok!(ops::add(&rv, &item));
        }
        Ok(rv)
    }

    /// Pairs up the items of multiple iterables.
    pub fn zip(iterables: Rest<Value>) -> Result<Value, Error> {
        let mut iters = Vec::with_capacity(iterables.len());
        for iterable in iterables.iter() {
            iters.push(ok!(iterable.try_iter()));
        }
        if iters.is_empty() {
            return Ok(Value::from(Vec::<Value>::new()));
        }
        let mut rv = Vec::new();
        'outer: loop {
            let mut row = Vec::with_capacity(iters.len());
            for iter in iters.iter_mut() {
                match iter.next() {
                    Some(item) => row.push(item),
                    None => break 'outer,
                }
            }
            rv.push(Value::from_tuple(row));
        }
        Ok(Value::from(rv))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        use similar_asserts::assert_eq;

        #[test]
        fn test_int_parsing() {
            assert_eq!(int(Some(Value::from(" 42 ")), None).unwrap(), 42);
            assert_eq!(int(Some(Value::from("-0x_ff")), Some(0)).unwrap(), -255);
            assert_eq!(int(Some(Value::from("ff")), Some(16)).unwrap(), 255);
            assert_eq!(int(Some(Value::from(-3.9)), None).unwrap(), -3);
            assert!(int(Some(Value::from("4.5")), None).is_err());
            assert!(int(Some(Value::from(f64::NAN)), None).is_err());
        }

        #[test]
        fn test_round() {
            assert_eq!(round(Value::from(2.5), None).unwrap(), Value::from(2));
            assert_eq!(round(Value::from(3.5), None).unwrap(), Value::from(4));
            assert_eq!(round(Value::from(1250), Some(-2)).unwrap(), Value::from(1200));
            assert_eq!(round(Value::from(1.2345), Some(2)).unwrap(), Value::from(1.23));
            assert_eq!(round(Value::from(2.675), Some(2)).unwrap(), Value::from(2.67));
            assert_eq!(round(Value::from(0.285), Some(2)).unwrap(), Value::from(0.28));
            assert_eq!(round(Value::from(1.005), Some(2)).unwrap(), Value::from(1.0));
        }

        #[test]
        fn test_range() {
            assert_eq!(range(3, None, None).unwrap().to_string(), "[0, 1, 2]");
            assert_eq!(range(5, Some(0), Some(-2)).unwrap().to_string(), "[5, 3, 1]");
            assert_eq!(range(0, Some(5), Some(3)).unwrap().to_string(), "[0, 3]");
            assert!(range(0, Some(1), Some(0)).is_err());
            assert!(range(0, Some(i64::MAX), None).is_err());
        }

        #[test]
        fn test_pow_modulo() {
            assert_eq!(
                pow(Value::from(3), Value::from(4), Some(Value::from(5))).unwrap(),
                Value::from(1)
            );
            assert_eq!(
                pow(Value::from(3), Value::from(3), Some(Value::from(-5))).unwrap(),
                Value::from(-3)
            );
        }

        #[test]
        fn test_radix() {
            assert_eq!(bin(-5), "-0b101");
            assert_eq!(oct(8), "0o10");
            assert_eq!(hex(255), "0xff");
        }
    }
}

#[cfg(feature = "builtins")]
pub use self::builtins::*;
