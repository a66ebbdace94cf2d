use std::fmt;

use crate::environment::Environment;
use crate::value::Value;

/// The bindings an expression is evaluated against.
///
/// A context layers the values passed to a render call over the values
/// captured when the template was created, and those over the globals of
/// the environment.  The first layer that knows a name wins.
pub struct Context<'a> {
    env: &'a Environment,
    call_time: &'a Value,
    captured: &'a Value,
}

impl<'a> Context<'a> {
    pub(crate) fn new(env: &'a Environment, call_time: &'a Value, captured: &'a Value) -> Self {
        Context {
            env,
            call_time,
            captured,
        }
    }

    /// Looks up a name.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let key = Value::from(name);
        self.call_time
            .as_map()
            .and_then(|map| map.get(&key))
            .or_else(|| self.captured.as_map().and_then(|map| map.get(&key)))
            .cloned()
            .or_else(|| self.env.get_global(name))
    }

    /// Returns the environment the context belongs to.
    pub fn env(&self) -> &'a Environment {
        self.env
    }
}

impl<'a> fmt::Debug for Context<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("call_time", self.call_time)
            .field("captured", self.captured)
            .finish()
    }
}
