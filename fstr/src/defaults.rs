use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::value::Value;

/// The default spec nesting depth.
///
/// Like Python this allows `{x:{width}}` but rejects a replacement field
/// inside the format spec of a nested field.
pub(crate) const DEFAULT_MAX_SPEC_DEPTH: usize = 2;

pub(crate) fn get_globals() -> BTreeMap<Cow<'static, str>, Value> {
    #[allow(unused_mut)]
    let mut rv = BTreeMap::new();
    #[cfg(feature = "builtins")]
    {
        use crate::functions::{self, BoxedFunction};

        macro_rules! register {
            ($($name:ident),* $(,)?) => {
                $(
                    rv.insert(
                        Cow::Borrowed(stringify!($name)),
                        BoxedFunction::new(functions::$name).to_value(),
                    );
                )*
            };
        }

        register!(
            abs, all, any, ascii, bin, bool, chr, dict, divmod, enumerate, float, format, hex,
            int, len, list, max, min, oct, ord, pow, range, repr, reversed, round, sorted, str,
            sum, tuple, zip,
        );
    }

    rv
}
