use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// A utility trait that represents the return value of functions.
///
/// It's implemented for the following types:
///
/// * `Rv` where `Rv` implements `Into<Value>`
/// * `Result<Rv, Error>` where `Rv` implements `Into<Value>`
pub trait FunctionResult {
    #[doc(hidden)]
    fn into_result(self) -> Result<Value, Error>;
}

impl<I: Into<Value>> FunctionResult for Result<I, Error> {
    fn into_result(self) -> Result<Value, Error> {
        self.map(Into::into)
    }
}

impl<I: Into<Value>> FunctionResult for I {
    fn into_result(self) -> Result<Value, Error> {
        Ok(self.into())
    }
}

/// Helper trait representing valid function arguments.
///
/// Since it's more convenient to write functions with concrete types
/// instead of values, this helper trait exists to automatically perform
/// this conversion.  It is implemented for functions up to an arity of 4
/// parameters.
///
/// For each argument the conversion is performed via the [`ArgType`]
/// trait which is implemented for many common types.  For manual
/// conversions the [`from_args`] utility should be used.
pub trait FunctionArgs: Sized {
    /// Converts to function arguments from a slice of values.
    #[doc(hidden)]
    fn from_values(values: &[Value], kwargs: &Kwargs) -> Result<Self, Error>;
}

/// Utility function to convert a slice of values into arguments.
///
/// This performs the same conversion that [`Function`](crate::functions::Function)
/// performs.  It exists so that one can leverage the same functionality when
/// implementing [`Object::call_method`](crate::value::Object::call_method).
///
/// ```
/// use fstr::value::{from_args, Kwargs, Value};
/// # fn foo() -> Result<(), fstr::Error> {
/// # let args = vec![Value::from("foo"), Value::from(42i64)]; let args = &args[..];
///
/// // args is &[Value]
/// let (string, num): (String, i64) = from_args(args, &Kwargs::default())?;
/// # Ok(()) } fn main() { foo().unwrap(); }
/// ```
#[inline(always)]
pub fn from_args<Args: FunctionArgs>(values: &[Value], kwargs: &Kwargs) -> Result<Args, Error> {
    Args::from_values(values, kwargs)
}

/// A trait implemented by all function argument types.
///
/// This trait is used by [`FunctionArgs`].  It's implemented for the
/// following types:
///
/// * unsigned integers: [`u8`], [`u16`], [`u32`], [`u64`], [`usize`]
/// * signed integers: [`i8`], [`i16`], [`i32`], [`i64`]
/// * floats: [`f64`] (ints and bools are accepted too)
/// * bool: [`bool`]
/// * string: [`String`] (any value, converted with `str()`)
/// * values: [`Value`]
/// * vectors: [`Vec<T>`] (from any iterable)
///
/// The type is also implemented for optional values (`Option<T>`) which is
/// used to encode optional parameters.  Additionally it's implemented for
/// [`Rest<T>`] which collects the remaining positional arguments and for
/// [`Kwargs`] which receives the keyword arguments.
pub trait ArgType: Sized {
    /// Set for types that receive keyword arguments.
    #[doc(hidden)]
    const TAKES_KWARGS: bool = false;

    #[doc(hidden)]
    fn from_value(value: Option<&Value>) -> Result<Self, Error>;

    #[doc(hidden)]
    #[inline(always)]
    fn from_values(
        values: &[Value],
        offset: usize,
        kwargs: &Kwargs,
    ) -> Result<(Self, usize), Error> {
        let _kwargs = kwargs;
        Ok((ok!(Self::from_value(values.get(offset))), 1))
    }
}

fn missing_argument() -> Error {
    Error::new(ErrorKind::InvalidArguments, "missing argument")
}

fn check_kwargs(kwargs: &Kwargs, takes_kwargs: bool) -> Result<(), Error> {
    if takes_kwargs {
        return Ok(());
    }
    match kwargs.iter().next() {
        Some((key, _)) => Err(Error::new(
            ErrorKind::InvalidArguments,
            format!("unexpected keyword argument '{key}'"),
        )),
        None => Ok(()),
    }
}

macro_rules! tuple_impls {
    ( $( $name:ident )* ) => {
        impl<$($name: ArgType,)*> FunctionArgs for ($($name,)*) {
            fn from_values(values: &[Value], kwargs: &Kwargs) -> Result<Self, Error> {
                #![allow(non_snake_case, unused)]
                let mut idx = 0;
                let mut takes_kwargs = false;
                $(
                    let ($name, consumed) = ok!($name::from_values(values, idx, kwargs));
                    idx += consumed;
                    takes_kwargs |= $name::TAKES_KWARGS;
                )*
                if values.len() > idx {
                    return Err(Error::new(
                        ErrorKind::InvalidArguments,
                        format!("expected at most {} arguments, got {}", idx, values.len()),
                    ));
                }
                ok!(check_kwargs(kwargs, takes_kwargs));
                Ok(($($name,)*))
            }
        }
    };
}

tuple_impls! {}
tuple_impls! { A }
tuple_impls! { A B }
tuple_impls! { A B C }
tuple_impls! { A B C D }

macro_rules! try_from_arg_type {
    ($($ty:ident),*) => {
        $(
            impl ArgType for $ty {
                fn from_value(value: Option<&Value>) -> Result<Self, Error> {
                    match value {
                        Some(value) => TryFrom::try_from(value.clone()),
                        None => Err(missing_argument()),
                    }
                }
            }
        )*
    };
}

try_from_arg_type!(u8, u16, u32, u64, usize, i8, i16, i32, i64, bool, f64);

impl ArgType for Value {
    fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        match value {
            Some(value) => Ok(value.clone()),
            None => Err(missing_argument()),
        }
    }
}

impl ArgType for String {
    fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        match value {
            Some(value) => Ok(value.to_string()),
            None => Err(missing_argument()),
        }
    }
}

impl<T: ArgType> ArgType for Option<T> {
    fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        match value {
            Some(value) if !value.is_none() => T::from_value(Some(value)).map(Some),
            _ => Ok(None),
        }
    }
}

impl<T: ArgType> ArgType for Vec<T> {
    fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        match value {
            None => Ok(Vec::new()),
            Some(value) => {
                let mut rv = Vec::new();
                for item in ok!(value.try_iter()) {
                    rv.push(ok!(T::from_value(Some(&item))));
                }
                Ok(rv)
            }
        }
    }
}

/// Utility type to capture remaining arguments.
///
/// In some cases you might want to have a variadic function.  In that case
/// you can define the last positional argument of a
/// [`Function`](crate::functions::Function) this way.  The `Rest<T>` type
/// collects all the remaining positional arguments.  The type itself
/// deref's into the inner vector.
///
/// ```
/// use fstr::value::Rest;
///
/// fn sum(values: Rest<i64>) -> i64 {
///     values.iter().sum()
/// }
/// # let mut env = fstr::Environment::new();
/// # env.add_function("my_sum", sum);
/// ```
#[derive(Debug)]
pub struct Rest<T>(pub Vec<T>);

impl<T> Deref for Rest<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Rest<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: ArgType> ArgType for Rest<T> {
    fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        Ok(Rest(ok!(value
            .into_iter()
            .map(|v| T::from_value(Some(v)))
            .collect::<Result<_, _>>())))
    }

    fn from_values(
        values: &[Value],
        offset: usize,
        _kwargs: &Kwargs,
    ) -> Result<(Self, usize), Error> {
        let args = values.get(offset..).unwrap_or_default();
        Ok((
            Rest(ok!(args
                .iter()
                .map(|v| T::from_value(Some(v)))
                .collect::<Result<_, _>>())),
            args.len(),
        ))
    }
}

/// The keyword arguments of a call.
///
/// When used as the last argument of a
/// [`Function`](crate::functions::Function) it receives the keyword
/// arguments the function was invoked with.  Functions that do not take
/// `Kwargs` reject keyword arguments.
///
/// ```
/// use fstr::value::Kwargs;
///
/// fn greet(name: String, kwargs: Kwargs) -> Result<String, fstr::Error> {
///     kwargs.expect_only(&["greeting"])?;
///     let greeting: Option<String> = kwargs.get("greeting")?;
///     Ok(format!("{}, {}!", greeting.as_deref().unwrap_or("Hello"), name))
/// }
/// # let mut env = fstr::Environment::new();
/// # env.add_function("greet", greet);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    values: IndexMap<String, Value>,
}

impl Kwargs {
    /// Returns `true` if no keyword arguments were passed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of keyword arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks if a keyword argument was passed.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Gets a keyword argument converted into a concrete type.
    ///
    /// Missing arguments convert like missing positional arguments which
    /// means `Option<T>` yields `None` for them.
    pub fn get<T: ArgType>(&self, key: &str) -> Result<T, Error> {
        T::from_value(self.values.get(key)).map_err(|mut err| {
            if err.detail() == Some("missing argument") {
                err = Error::new(
                    ErrorKind::InvalidArguments,
                    format!("missing keyword argument '{key}'"),
                );
            }
            err
        })
    }

    /// Returns the raw value of a keyword argument.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Iterates over the keyword arguments in call order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fails if a keyword argument not in `allowed` was passed.
    pub fn expect_only(&self, allowed: &[&str]) -> Result<(), Error> {
        match self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(Error::new(
                ErrorKind::InvalidArguments,
                format!("unexpected keyword argument '{key}'"),
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) -> Result<(), Error> {
        if self.values.contains_key(&key) {
            return Err(Error::new(
                ErrorKind::InvalidArguments,
                format!("keyword argument repeated: {key}"),
            ));
        }
        self.values.insert(key, value);
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Kwargs {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ArgType for Kwargs {
    const TAKES_KWARGS: bool = true;

    fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        match value {
            None => Ok(Kwargs::default()),
            Some(_) => Err(Error::new(
                ErrorKind::InvalidArguments,
                "keyword arguments cannot be passed positionally",
            )),
        }
    }

    fn from_values(
        _values: &[Value],
        _offset: usize,
        kwargs: &Kwargs,
    ) -> Result<(Self, usize), Error> {
        Ok((kwargs.clone(), 0))
    }
}
