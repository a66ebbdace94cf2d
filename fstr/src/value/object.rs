use std::any::{Any, TypeId};
use std::fmt;

use crate::error::{Error, ErrorKind};
use crate::value::{Kwargs, Value};

/// A utility trait that represents a dynamic object.
///
/// The engine uses the [`Value`] type to represent values that expressions
/// work with.  Most of these values are primitives such as integers, strings
/// or dicts.  However it is also possible to expose custom types without
/// undergoing a serialization step.  For this to work a type needs to
/// implement the [`Object`] trait and be wrapped in a value with
/// [`Value::from_object`](crate::value::Value::from_object).
///
/// The engine uses reference counted objects with interior mutability in the
/// value type.  This means that all trait methods take `&self` and types like
/// [`Mutex`](std::sync::Mutex) or atomics need to be used to enable
/// mutability.
///
/// Objects need to implement [`Display`](std::fmt::Display) which is used as
/// their `str()`.  Every method has a default so an object only implements
/// the parts of the Python data model it needs.
///
/// ```
/// use std::fmt;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use fstr::value::{Object, Value};
///
/// #[derive(Debug, Default)]
/// struct Counter(AtomicUsize);
///
/// impl fmt::Display for Counter {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
///     }
/// }
///
/// impl Object for Counter {}
///
/// let env = fstr::Environment::new();
/// let tmpl = env.template("{c} {c}").unwrap();
/// let ctx = fstr::context! { c => Value::from_object(Counter::default()) };
/// assert_eq!(tmpl.render(ctx).unwrap(), "1 2");
/// ```
pub trait Object: fmt::Display + fmt::Debug + Any + Sync + Send {
    /// The Python type name of the object.
    fn type_name(&self) -> &str {
        "object"
    }

    /// Returns the `repr()` of the object.
    ///
    /// Defaults to the `str()` of the object.
    fn repr(&self) -> String {
        self.to_string()
    }

    /// Looks up an attribute by name.
    fn get_attr(&self, name: &str) -> Option<Value> {
        let _name = name;
        None
    }

    /// Looks up an item by key.
    fn get_item(&self, key: &Value) -> Option<Value> {
        let _key = key;
        None
    }

    /// Returns the length of the object if it is sized.
    fn len(&self) -> Option<usize> {
        None
    }

    /// Returns the items if the object is iterable.
    fn iter(&self) -> Option<Vec<Value>> {
        None
    }

    /// Returns the truthiness of the object.
    fn is_true(&self) -> bool {
        self.len() != Some(0)
    }

    /// Called when the object is invoked directly.
    ///
    /// The default implementation just generates an error that the object
    /// cannot be invoked.
    ///
    /// To convert the arguments into arguments use the
    /// [`from_args`](crate::value::from_args) function.
    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        let _args = args;
        let _kwargs = kwargs;
        Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("'{}' object is not callable", self.type_name()),
        ))
    }

    /// Called when the engine tries to call a method on the object.
    ///
    /// It's the responsibility of the implementer to ensure that an
    /// error is generated if an invalid method is invoked.  If the method
    /// is not known an [`ErrorKind::UnknownMethod`] error must be returned,
    /// in which case the engine falls back to calling the attribute of the
    /// same name.
    fn call_method(&self, name: &str, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        let _args = args;
        let _kwargs = kwargs;
        Err(Error::new(
            ErrorKind::UnknownMethod,
            format!("'{}' object has no method named {}", self.type_name(), name),
        ))
    }

    /// Formats the object according to a format spec.
    ///
    /// This is the hook that `{value:spec}` invokes.  Returning `None` (the
    /// default) means the object has no custom formatting in which case an
    /// empty spec renders the `str()` of the object and any other spec fails.
    fn format(&self, spec: &str) -> Option<Result<String, Error>> {
        let _spec = spec;
        None
    }
}

impl dyn Object {
    /// Returns some reference to the boxed object if it is of type `T`, or None if it isn’t.
    ///
    /// This is basically the "reverse" of [`from_object`](Value::from_object).
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        let type_id = (*self).type_id();
        if type_id == TypeId::of::<T>() {
            // SAFETY: type type id check ensures this type cast is correct
            Some(unsafe { &*(self as *const dyn Object as *const T) })
        } else {
            None
        }
    }

    /// Checks if the object is of a specific type.
    pub fn is<T: 'static>(&self) -> bool {
        (*self).type_id() == TypeId::of::<T>()
    }
}
