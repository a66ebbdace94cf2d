//! Provides a dynamic value type abstraction.
//!
//! This module gives access to a dynamically typed value which is what
//! template expressions evaluate to.  The value type follows Python's data
//! model closely: it knows the difference between integers and floats, lists
//! and tuples, and renders itself the way `str()`, `repr()` and `ascii()`
//! would.
//!
//! # Basic Value Conversions
//!
//! Values are typically created via the [`From`] trait:
//!
//! ```
//! # use fstr::value::Value;
//! let int_value = Value::from(42);
//! let none_value = Value::from(());
//! let true_value = Value::from(true);
//! assert_eq!(true_value.to_string(), "True");
//! ```
//!
//! Or via the [`FromIterator`] trait:
//!
//! ```
//! # use fstr::value::Value;
//! let value: Value = (1..4).collect();
//! assert_eq!(value.to_string(), "[1, 2, 3]");
//! ```
//!
//! # Serde Conversions
//!
//! Values passed to a render call go through [`serde`].  This can also be
//! triggered manually by using the [`Value::from_serialize`] method:
//!
//! ```
//! # use fstr::value::Value;
//! let value = Value::from_serialize(&[1, 2, 3]);
//! ```
//!
//! # Dynamic Objects
//!
//! Values can also hold objects implementing the [`Object`] trait.  Objects
//! can expose attributes, items, methods, be callable and customize how they
//! are formatted with a format spec.
//!
//! # Memory Management
//!
//! Values are immutable and internally reference counted which means they
//! can be cloned cheaply.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::utils::{ascii_escape, float_repr, quote_str};

pub use crate::value::argtypes::{
    from_args, ArgType, FunctionArgs, FunctionResult, Kwargs, Rest,
};
pub use crate::value::object::Object;

mod argtypes;
mod methods;
mod object;
pub(crate) mod ops;
mod serialize;

/// The map type used for dicts.
///
/// Dicts remember insertion order like Python's dicts do.
pub type ValueMap = IndexMap<Value, Value>;

/// The set type used for sets.
pub type ValueSet = IndexSet<Value>;

/// Merges multiple dict values into one.
///
/// Keys from values that come first take precedence.  Values that are not
/// dicts are skipped.
pub fn merge_maps<I, V>(iter: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let mut rv = ValueMap::new();
    for value in iter {
        let value = value.into();
        if let ValueRepr::Map(ref map) = value.0 {
            for (k, v) in map.iter() {
                if !rv.contains_key(k) {
                    rv.insert(k.clone(), v.clone());
                }
            }
        }
    }
    Value::from(rv)
}

/// Describes the kind of value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValueKind {
    /// The value is `None`.
    None,
    /// The value is a bool.
    Bool,
    /// The value is an integer.
    Int,
    /// The value is a float.
    Float,
    /// The value is a string.
    String,
    /// The value is a list.
    List,
    /// The value is a tuple.
    Tuple,
    /// The value is a set.
    Set,
    /// The value is a dict.
    Dict,
    /// The value is a dynamic object.
    Object,
    /// The value could not be created.
    Invalid,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::None => "NoneType",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "str",
            ValueKind::List => "list",
            ValueKind::Tuple => "tuple",
            ValueKind::Set => "set",
            ValueKind::Dict => "dict",
            ValueKind::Object => "object",
            ValueKind::Invalid => "invalid",
        })
    }
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    None,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(Arc<str>),
    List(Arc<Vec<Value>>),
    Tuple(Arc<Vec<Value>>),
    Set(Arc<ValueSet>),
    Map(Arc<ValueMap>),
    Object(Arc<dyn Object>),
    Invalid(Arc<str>),
}

impl fmt::Debug for ValueRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRepr::None => f.write_str("None"),
            ValueRepr::Bool(val) => fmt::Debug::fmt(val, f),
            ValueRepr::I64(val) => fmt::Debug::fmt(val, f),
            ValueRepr::F64(val) => fmt::Debug::fmt(val, f),
            ValueRepr::String(val) => fmt::Debug::fmt(val, f),
            ValueRepr::List(val) => f.debug_list().entries(val.iter()).finish(),
            ValueRepr::Tuple(val) => {
                let mut t = f.debug_tuple("");
                for item in val.iter() {
                    t.field(item);
                }
                t.finish()
            }
            ValueRepr::Set(val) => f.debug_set().entries(val.iter()).finish(),
            ValueRepr::Map(val) => f.debug_map().entries(val.iter()).finish(),
            ValueRepr::Object(val) => fmt::Debug::fmt(val, f),
            ValueRepr::Invalid(val) => write!(f, "<invalid value: {}>", val),
        }
    }
}

/// Represents a dynamically typed value.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl Default for Value {
    fn default() -> Value {
        ValueRepr::None.into()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ValueRepr::None, ValueRepr::None) => true,
            (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
            (ValueRepr::List(a), ValueRepr::List(b)) => a == b,
            (ValueRepr::Tuple(a), ValueRepr::Tuple(b)) => a == b,
            (ValueRepr::Set(a), ValueRepr::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.contains(x))
            }
            (ValueRepr::Map(a), ValueRepr::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (ValueRepr::Object(a), ValueRepr::Object(b)) => Arc::ptr_eq(a, b),
            (ValueRepr::Invalid(a), ValueRepr::Invalid(b)) => a == b,
            _ => match ops::coerce(self, other) {
                Some(ops::CoerceResult::I64(a, b)) => a == b,
                Some(ops::CoerceResult::F64(a, b)) => a == b,
                None => false,
            },
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.0 {
            ValueRepr::None => 0u8.hash(state),
            ValueRepr::Bool(b) => (b as i64).hash(state),
            ValueRepr::I64(i) => i.hash(state),
            // integral floats must hash like the int they equal
            ValueRepr::F64(f) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
                    (f as i64).hash(state)
                } else {
                    f.to_bits().hash(state)
                }
            }
            ValueRepr::String(ref s) => s.hash(state),
            ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => items.hash(state),
            ValueRepr::Set(ref items) => items.len().hash(state),
            ValueRepr::Map(ref map) => map.len().hash(state),
            ValueRepr::Object(ref obj) => (Arc::as_ptr(obj) as *const () as usize).hash(state),
            ValueRepr::Invalid(ref msg) => msg.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::String(ref s) => f.write_str(s),
            ValueRepr::Object(ref obj) => fmt::Display::fmt(obj, f),
            _ => self.write_repr(f),
        }
    }
}

impl Value {
    /// The `None` value.
    pub const NONE: Value = Value(ValueRepr::None);

    /// Creates a value from something that can be serialized.
    ///
    /// This is the method used whenever a serializable object is passed to
    /// one of the APIs that internally want to create a value.  For instance
    /// this is what [`context!`](crate::context) and
    /// [`render`](crate::Template::render) will use.
    ///
    /// ```
    /// # use fstr::value::Value;
    /// let val = Value::from_serialize(&vec![1, 2, 3]);
    /// assert_eq!(val.to_string(), "[1, 2, 3]");
    /// ```
    ///
    /// This method does not fail but it might return an invalid value if the
    /// [`Serialize`] implementation failed.  Invalid values fail when they are
    /// used in an expression.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Value {
        serialize::transform(value)
    }

    /// Creates a value from a dynamic object.
    pub fn from_object<T: Object>(value: T) -> Value {
        Value::from_dyn_object(Arc::new(value))
    }

    /// Creates a value from an already reference counted dynamic object.
    pub fn from_dyn_object(value: Arc<dyn Object>) -> Value {
        ValueRepr::Object(value).into()
    }

    /// Creates a callable value from a function.
    ///
    /// ```
    /// # use fstr::value::Value;
    /// let add = Value::from_function(|a: i64, b: i64| a + b);
    /// let rv = add.call(&[Value::from(1), Value::from(2)], &Default::default()).unwrap();
    /// assert_eq!(rv, Value::from(3));
    /// ```
    pub fn from_function<F, Rv, Args>(f: F) -> Value
    where
        F: crate::functions::Function<Rv, Args>,
        Rv: FunctionResult,
        Args: FunctionArgs,
    {
        crate::functions::BoxedFunction::new(f).to_value()
    }

    /// Creates a tuple value.
    pub fn from_tuple(items: Vec<Value>) -> Value {
        ValueRepr::Tuple(Arc::new(items)).into()
    }

    /// Creates a set value.  Duplicates are removed.
    pub fn from_set<I: IntoIterator<Item = Value>>(items: I) -> Value {
        ValueRepr::Set(Arc::new(items.into_iter().collect())).into()
    }

    pub(crate) fn invalid<D: Into<Arc<str>>>(msg: D) -> Value {
        ValueRepr::Invalid(msg.into()).into()
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::None => ValueKind::None,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::I64(_) => ValueKind::Int,
            ValueRepr::F64(_) => ValueKind::Float,
            ValueRepr::String(_) => ValueKind::String,
            ValueRepr::List(_) => ValueKind::List,
            ValueRepr::Tuple(_) => ValueKind::Tuple,
            ValueRepr::Set(_) => ValueKind::Set,
            ValueRepr::Map(_) => ValueKind::Dict,
            ValueRepr::Object(_) => ValueKind::Object,
            ValueRepr::Invalid(_) => ValueKind::Invalid,
        }
    }

    /// Returns the Python type name of the value.
    ///
    /// For objects this is [`Object::type_name`].
    pub fn type_name(&self) -> &str {
        match self.0 {
            ValueRepr::Object(ref obj) => obj.type_name(),
            _ => match self.kind() {
                ValueKind::None => "NoneType",
                ValueKind::Bool => "bool",
                ValueKind::Int => "int",
                ValueKind::Float => "float",
                ValueKind::String => "str",
                ValueKind::List => "list",
                ValueKind::Tuple => "tuple",
                ValueKind::Set => "set",
                ValueKind::Dict => "dict",
                ValueKind::Object | ValueKind::Invalid => "object",
            },
        }
    }

    /// Returns `true` if the value is `None`.
    pub fn is_none(&self) -> bool {
        matches!(self.0, ValueRepr::None)
    }

    /// Is this value true the way Python's `bool()` sees it?
    pub fn is_true(&self) -> bool {
        match self.0 {
            ValueRepr::None | ValueRepr::Invalid(_) => false,
            ValueRepr::Bool(val) => val,
            ValueRepr::I64(val) => val != 0,
            ValueRepr::F64(val) => val != 0.0,
            ValueRepr::String(ref s) => !s.is_empty(),
            ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => !items.is_empty(),
            ValueRepr::Set(ref items) => !items.is_empty(),
            ValueRepr::Map(ref map) => !map.is_empty(),
            ValueRepr::Object(ref obj) => obj.is_true(),
        }
    }

    /// Returns `true` if the value can be used as dict key or set member.
    pub fn is_hashable(&self) -> bool {
        match self.0 {
            ValueRepr::List(_) | ValueRepr::Set(_) | ValueRepr::Map(_) => false,
            ValueRepr::Tuple(ref items) => items.iter().all(|x| x.is_hashable()),
            _ => true,
        }
    }

    /// Returns `true` for ints, floats and bools.
    pub fn is_number(&self) -> bool {
        matches!(
            self.0,
            ValueRepr::Bool(_) | ValueRepr::I64(_) | ValueRepr::F64(_)
        )
    }

    /// If the value is a string, return it.
    pub fn as_str(&self) -> Option<&str> {
        match self.0 {
            ValueRepr::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// If the value is an int (or bool), return it.
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            ValueRepr::Bool(val) => Some(val as i64),
            ValueRepr::I64(val) => Some(val),
            _ => None,
        }
    }

    /// If the value is a list or tuple, return the items.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self.0 {
            ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => Some(&items[..]),
            _ => None,
        }
    }

    /// If the value is a dict, return it.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self.0 {
            ValueRepr::Map(ref map) => Some(map),
            _ => None,
        }
    }

    /// If the value is an object, return it.
    pub fn as_object(&self) -> Option<&Arc<dyn Object>> {
        match self.0 {
            ValueRepr::Object(ref obj) => Some(obj),
            _ => None,
        }
    }

    /// Downcasts an object value to a concrete type.
    pub fn downcast_object_ref<T: Object>(&self) -> Option<&T> {
        self.as_object().and_then(|obj| obj.downcast_ref::<T>())
    }

    /// Returns the length of the value if it has one.
    pub fn len(&self) -> Option<usize> {
        match self.0 {
            ValueRepr::String(ref s) => Some(s.chars().count()),
            ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => Some(items.len()),
            ValueRepr::Set(ref items) => Some(items.len()),
            ValueRepr::Map(ref map) => Some(map.len()),
            ValueRepr::Object(ref obj) => obj.len(),
            _ => None,
        }
    }

    /// Returns `true` if the value has a length of zero.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Iterates over the value the way a Python `for` loop would.
    ///
    /// Strings yield characters, dicts yield their keys.
    pub fn try_iter(&self) -> Result<std::vec::IntoIter<Value>, Error> {
        let items: Vec<Value> = match self.0 {
            ValueRepr::String(ref s) => s.chars().map(Value::from).collect(),
            ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => items.to_vec(),
            ValueRepr::Set(ref items) => items.iter().cloned().collect(),
            ValueRepr::Map(ref map) => map.keys().cloned().collect(),
            ValueRepr::Object(ref obj) => match obj.iter() {
                Some(items) => items,
                None => return Err(self.not_iterable()),
            },
            ValueRepr::Invalid(ref msg) => return Err(invalid_value_error(msg)),
            _ => return Err(self.not_iterable()),
        };
        Ok(items.into_iter())
    }

    fn not_iterable(&self) -> Error {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("'{}' object is not iterable", self.type_name()),
        )
    }

    /// Looks up an attribute.
    ///
    /// Dicts expose their string keys as attributes as well.
    pub fn get_attr(&self, name: &str) -> Result<Value, Error> {
        let rv = match self.0 {
            ValueRepr::Object(ref obj) => obj.get_attr(name),
            ValueRepr::Map(ref map) => map.get(&Value::from(name)).cloned(),
            ValueRepr::Invalid(ref msg) => return Err(invalid_value_error(msg)),
            _ => None,
        };
        rv.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "'{}' object has no attribute '{}'",
                    self.type_name(),
                    name
                ),
            )
        })
    }

    /// Looks up an item by key or index.
    pub fn get_item(&self, key: &Value) -> Result<Value, Error> {
        match self.0 {
            ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => {
                let idx = ok!(index_from_value(self, key));
                ops::normalize_index(idx, items.len())
                    .and_then(|idx| items.get(idx).cloned())
                    .ok_or_else(|| index_out_of_range(self))
            }
            ValueRepr::String(ref s) => {
                let idx = ok!(index_from_value(self, key));
                let len = s.chars().count();
                ops::normalize_index(idx, len)
                    .and_then(|idx| s.chars().nth(idx))
                    .map(Value::from)
                    .ok_or_else(|| index_out_of_range(self))
            }
            ValueRepr::Map(ref map) => map.get(key).cloned().ok_or_else(|| {
                Error::new(ErrorKind::InvalidOperation, format!("key error: {}", key.to_repr()))
            }),
            ValueRepr::Object(ref obj) => obj.get_item(key).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("'{}' object is not subscriptable", self.type_name()),
                )
            }),
            ValueRepr::Invalid(ref msg) => Err(invalid_value_error(msg)),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("'{}' object is not subscriptable", self.type_name()),
            )),
        }
    }

    /// Calls the value.
    pub fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        match self.0 {
            ValueRepr::Object(ref obj) => obj.call(args, kwargs),
            ValueRepr::Invalid(ref msg) => Err(invalid_value_error(msg)),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("'{}' object is not callable", self.type_name()),
            )),
        }
    }

    /// Calls a method on the value.
    ///
    /// Strings, lists and dicts provide a subset of the methods Python
    /// provides.  Objects dispatch to [`Object::call_method`].
    pub fn call_method(&self, name: &str, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        methods::call_method(self, name, args, kwargs)
    }

    /// Returns the `repr()` of the value.
    ///
    /// ```
    /// # use fstr::value::Value;
    /// assert_eq!(Value::from("it's").to_repr(), r#""it's""#);
    /// assert_eq!(Value::from(1.0).to_repr(), "1.0");
    /// ```
    pub fn to_repr(&self) -> String {
        struct Repr<'a>(&'a Value);
        impl<'a> fmt::Display for Repr<'a> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.write_repr(f)
            }
        }
        Repr(self).to_string()
    }

    /// Returns the `ascii()` of the value.
    ///
    /// This is the `repr()` with all non ASCII characters escaped.
    pub fn to_ascii(&self) -> String {
        ascii_escape(&self.to_repr())
    }

    fn write_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_seq<'a, I: Iterator<Item = &'a Value>>(
            f: &mut fmt::Formatter<'_>,
            items: I,
        ) -> fmt::Result {
            for (idx, item) in items.enumerate() {
                if idx > 0 {
                    ok!(f.write_str(", "));
                }
                ok!(item.write_repr(f));
            }
            Ok(())
        }

        match self.0 {
            ValueRepr::None => f.write_str("None"),
            ValueRepr::Bool(true) => f.write_str("True"),
            ValueRepr::Bool(false) => f.write_str("False"),
            ValueRepr::I64(val) => write!(f, "{val}"),
            ValueRepr::F64(val) => f.write_str(&float_repr(val)),
            ValueRepr::String(ref s) => f.write_str(&quote_str(s)),
            ValueRepr::List(ref items) => {
                ok!(f.write_str("["));
                ok!(write_seq(f, items.iter()));
                f.write_str("]")
            }
            ValueRepr::Tuple(ref items) => {
                ok!(f.write_str("("));
                ok!(write_seq(f, items.iter()));
                if items.len() == 1 {
                    ok!(f.write_str(","));
                }
                f.write_str(")")
            }
            ValueRepr::Set(ref items) => {
                if items.is_empty() {
                    return f.write_str("set()");
                }
                ok!(f.write_str("{"));
                ok!(write_seq(f, items.iter()));
                f.write_str("}")
            }
            ValueRepr::Map(ref map) => {
                ok!(f.write_str("{"));
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(", "));
                    }
                    ok!(key.write_repr(f));
                    ok!(f.write_str(": "));
                    ok!(value.write_repr(f));
                }
                f.write_str("}")
            }
            ValueRepr::Object(ref obj) => f.write_str(&obj.repr()),
            ValueRepr::Invalid(ref msg) => write!(f, "<invalid value: {msg}>"),
        }
    }

    /// Fails with the stored error if this is an invalid value.
    pub(crate) fn validate(self) -> Result<Value, Error> {
        match self.0 {
            ValueRepr::Invalid(ref msg) => Err(invalid_value_error(msg)),
            _ => Ok(self),
        }
    }
}

fn invalid_value_error(msg: &str) -> Error {
    Error::new(ErrorKind::BadSerialization, msg.to_string())
}

fn index_from_value(container: &Value, key: &Value) -> Result<i64, Error> {
    key.as_i64().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "{} indices must be integers, not {}",
                container.type_name(),
                key.type_name()
            ),
        )
    })
}

fn index_out_of_range(container: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("{} index out of range", container.type_name()),
    )
}

impl From<ValueRepr> for Value {
    #[inline(always)]
    fn from(val: ValueRepr) -> Value {
        Value(val)
    }
}

impl From<()> for Value {
    #[inline(always)]
    fn from(_: ()) -> Value {
        ValueRepr::None.into()
    }
}

impl From<bool> for Value {
    #[inline(always)]
    fn from(val: bool) -> Value {
        ValueRepr::Bool(val).into()
    }
}

macro_rules! value_from_int {
    ($($src:ty),*) => {
        $(
            impl From<$src> for Value {
                #[inline(always)]
                fn from(val: $src) -> Self {
                    ValueRepr::I64(val as i64).into()
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! value_from_wide_int {
    ($($src:ty),*) => {
        $(
            impl From<$src> for Value {
                fn from(val: $src) -> Self {
                    match i64::try_from(val) {
                        Ok(val) => ValueRepr::I64(val).into(),
                        Err(_) => Value::invalid(format!("integer {val} out of range")),
                    }
                }
            }
        )*
    };
}

value_from_wide_int!(u64, usize, i128, u128, isize);

impl From<f32> for Value {
    #[inline(always)]
    fn from(val: f32) -> Self {
        ValueRepr::F64(val as f64).into()
    }
}

impl From<f64> for Value {
    #[inline(always)]
    fn from(val: f64) -> Self {
        ValueRepr::F64(val).into()
    }
}

impl From<char> for Value {
    fn from(val: char) -> Self {
        let mut buf = [0u8; 4];
        ValueRepr::String(Arc::from(&*val.encode_utf8(&mut buf))).into()
    }
}

impl<'a> From<&'a str> for Value {
    #[inline(always)]
    fn from(val: &'a str) -> Self {
        ValueRepr::String(Arc::from(val)).into()
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(val: String) -> Self {
        ValueRepr::String(Arc::from(val)).into()
    }
}

impl From<Arc<str>> for Value {
    #[inline(always)]
    fn from(val: Arc<str>) -> Self {
        ValueRepr::String(val).into()
    }
}

impl<'a> From<&'a Value> for Value {
    #[inline(always)]
    fn from(val: &'a Value) -> Self {
        val.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        match val {
            Some(val) => val.into(),
            None => ValueRepr::None.into(),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Self {
        ValueRepr::List(Arc::new(val.into_iter().map(Into::into).collect())).into()
    }
}

impl From<ValueMap> for Value {
    fn from(val: ValueMap) -> Self {
        ValueRepr::Map(Arc::new(val)).into()
    }
}

impl<K: Into<Value>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(val: BTreeMap<K, V>) -> Self {
        val.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K: Into<Value>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(val: HashMap<K, V>) -> Self {
        val.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<V: Into<Value>> FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        ValueRepr::List(Arc::new(iter.into_iter().map(Into::into).collect())).into()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ValueRepr::Map(Arc::new(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
        .into()
    }
}

fn unsupported_conversion(kind: &str, target: &str) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("cannot convert {kind} to {target}"),
    )
}

macro_rules! primitive_try_from {
    ($ty:ident, {
        $($pat:pat $(if $if_expr:expr)? => $expr:expr,)*
    }) => {
        impl TryFrom<Value> for $ty {
            type Error = Error;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value.0 {
                    $($pat $(if $if_expr)? => TryFrom::try_from($expr).ok(),)*
                    _ => None
                }.ok_or_else(|| unsupported_conversion(value.type_name(), stringify!($ty)))
            }
        }
    }
}

macro_rules! primitive_int_try_from {
    ($ty:ident) => {
        primitive_try_from!($ty, {
            ValueRepr::Bool(val) => val as i64,
            ValueRepr::I64(val) => val,
        });
    };
}

primitive_int_try_from!(u8);
primitive_int_try_from!(u16);
primitive_int_try_from!(u32);
primitive_int_try_from!(u64);
primitive_int_try_from!(usize);
primitive_int_try_from!(i8);
primitive_int_try_from!(i16);
primitive_int_try_from!(i32);
primitive_int_try_from!(i64);

primitive_try_from!(bool, {
    ValueRepr::Bool(val) => val,
});

primitive_try_from!(f64, {
    ValueRepr::Bool(val) => val as i64 as f64,
    ValueRepr::I64(val) => val as f64,
    ValueRepr::F64(val) => val,
});

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.0 {
            ValueRepr::String(ref s) => Ok(s.to_string()),
            _ => Err(unsupported_conversion(value.type_name(), "String")),
        }
    }
}

/// Compares two values the way Python's ordering operators do.
///
/// Numbers compare with numbers, strings with strings and sequences of the
/// same type element by element.  Everything else is not orderable.
pub(crate) fn python_cmp(a: &Value, b: &Value) -> Result<Ordering, Error> {
    let rv = match (&a.0, &b.0) {
        (ValueRepr::String(a), ValueRepr::String(b)) => Some(a.cmp(b)),
        (ValueRepr::List(x), ValueRepr::List(y)) | (ValueRepr::Tuple(x), ValueRepr::Tuple(y)) => {
            for (a, b) in x.iter().zip(y.iter()) {
                if a != b {
                    return python_cmp(a, b);
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => match ops::coerce(a, b) {
            Some(ops::CoerceResult::I64(a, b)) => Some(a.cmp(&b)),
            Some(ops::CoerceResult::F64(a, b)) => a.partial_cmp(&b),
            None => None,
        },
    };
    rv.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "'<' not supported between instances of '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_str_and_repr() {
        assert_eq!(Value::from(()).to_string(), "None");
        assert_eq!(Value::from(true).to_string(), "True");
        assert_eq!(Value::from(3.0).to_string(), "3.0");
        assert_eq!(Value::from(1e20).to_string(), "1e+20");
        assert_eq!(Value::from("a").to_string(), "a");
        assert_eq!(Value::from("a").to_repr(), "'a'");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "['a', 'b']");
        assert_eq!(Value::from_tuple(vec![Value::from(0)]).to_string(), "(0,)");
        assert_eq!(Value::from_set(Vec::new()).to_string(), "set()");
        let map: Value = vec![(1, 2)].into_iter().collect();
        assert_eq!(map.to_string(), "{1: 2}");
    }

    #[test]
    fn test_numeric_equality_and_hash() {
        let mut map = ValueMap::new();
        map.insert(Value::from(1), Value::from("int"));
        assert_eq!(map.get(&Value::from(1.0)), Some(&Value::from("int")));
        assert_eq!(map.get(&Value::from(true)), Some(&Value::from("int")));
        assert_eq!(Value::from(2), Value::from(2.0));
        assert!(Value::from("1") != Value::from(1));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from(0).is_true());
        assert!(!Value::from("").is_true());
        assert!(!Value::from(Vec::<Value>::new()).is_true());
        assert!(Value::from(0.5).is_true());
        assert!(Value::from_tuple(vec![Value::NONE]).is_true());
    }

    #[test]
    fn test_get_item() {
        let v = Value::from(vec![1, 2, 3]);
        assert_eq!(v.get_item(&Value::from(-1)).unwrap(), Value::from(3));
        assert_eq!(
            v.get_item(&Value::from(3)).unwrap_err().to_string(),
            "invalid operation: list index out of range"
        );
        assert_eq!(
            Value::from("abc").get_item(&Value::from(1)).unwrap(),
            Value::from("b")
        );
    }

    #[test]
    fn test_merge_maps() {
        let a: Value = vec![("a", 1), ("b", 1)].into_iter().collect();
        let b: Value = vec![("b", 2), ("c", 2)].into_iter().collect();
        assert_eq!(merge_maps([a, b]).to_string(), "{'a': 1, 'b': 1, 'c': 2}");
    }
}
