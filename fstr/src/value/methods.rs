use crate::error::{Error, ErrorKind};
use crate::value::{from_args, Kwargs, Value, ValueRepr};

fn no_such_method(value: &Value, name: &str) -> Error {
    Error::new(
        ErrorKind::UnknownMethod,
        format!("'{}' object has no attribute '{}'", value.type_name(), name),
    )
}

/// Dispatches a method call on a value.
///
/// Objects get the first chance to handle the call.  If they do not know
/// the method, the attribute of the same name is looked up and called.
/// Dicts do the same for keys that are not dict methods.
pub(crate) fn call_method(
    value: &Value,
    name: &str,
    args: &[Value],
    kwargs: &Kwargs,
) -> Result<Value, Error> {
    match value.0 {
        ValueRepr::String(ref s) => call_str_method(value, s, name, args, kwargs),
        ValueRepr::List(ref items) | ValueRepr::Tuple(ref items) => {
            call_seq_method(value, items, name, args, kwargs)
        }
        ValueRepr::Map(ref map) => match name {
            "get" => {
                let (key, default): (Value, Option<Value>) = ok!(from_args(args, kwargs));
                Ok(map.get(&key).cloned().or(default).unwrap_or_default())
            }
            "keys" => {
                ok!(from_args::<()>(args, kwargs));
                Ok(map.keys().cloned().collect())
            }
            "values" => {
                ok!(from_args::<()>(args, kwargs));
                Ok(map.values().cloned().collect())
            }
            "items" => {
                ok!(from_args::<()>(args, kwargs));
                Ok(map
                    .iter()
                    .map(|(k, v)| Value::from_tuple(vec![k.clone(), v.clone()]))
                    .collect())
            }
            "copy" => {
                ok!(from_args::<()>(args, kwargs));
                Ok(value.clone())
            }
            _ => match map.get(&Value::from(name)) {
                Some(attr) => attr.call(args, kwargs),
                None => Err(no_such_method(value, name)),
            },
        },
        ValueRepr::Set(ref items) => {
            let (other,): (Value,) = ok!(from_args(args, kwargs));
            let other: Vec<Value> = ok!(other.try_iter()).collect();
            match name {
                "union" => Ok(Value::from_set(
                    items.iter().cloned().chain(other.into_iter()),
                )),
                "intersection" => Ok(Value::from_set(
                    items.iter().filter(|x| other.contains(x)).cloned(),
                )),
                "difference" => Ok(Value::from_set(
                    items.iter().filter(|x| !other.contains(x)).cloned(),
                )),
                "issubset" => Ok(Value::from(items.iter().all(|x| other.contains(x)))),
                _ => Err(no_such_method(value, name)),
            }
        }
        ValueRepr::Object(ref obj) => match obj.call_method(name, args, kwargs) {
            Err(err) if err.kind() == ErrorKind::UnknownMethod => match obj.get_attr(name) {
                Some(attr) => attr.call(args, kwargs),
                None => Err(err),
            },
            rv => rv,
        },
        ValueRepr::Invalid(_) => value.clone().validate(),
        _ => Err(no_such_method(value, name)),
    }
}

fn call_seq_method(
    value: &Value,
    items: &[Value],
    name: &str,
    args: &[Value],
    kwargs: &Kwargs,
) -> Result<Value, Error> {
    match name {
        "index" => {
            let (needle,): (Value,) = ok!(from_args(args, kwargs));
            items
                .iter()
                .position(|x| x == &needle)
                .map(Value::from)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("{} is not in {}", needle.to_repr(), value.type_name()),
                    )
                })
        }
        "count" => {
            let (needle,): (Value,) = ok!(from_args(args, kwargs));
            Ok(Value::from(items.iter().filter(|x| *x == &needle).count()))
        }
        "copy" if matches!(value.0, ValueRepr::List(_)) => {
            ok!(from_args::<()>(args, kwargs));
            Ok(value.clone())
        }
        _ => Err(no_such_method(value, name)),
    }
}

fn str_needles(value: Value) -> Result<Vec<String>, Error> {
    match value.0 {
        ValueRepr::String(ref s) => Ok(vec![s.to_string()]),
        ValueRepr::Tuple(ref items) => items
            .iter()
            .map(|item| {
                item.as_str().map(|s| s.to_string()).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidArguments,
                        "tuple for startswith/endswith must only contain str",
                    )
                })
            })
            .collect(),
        _ => Err(Error::new(
            ErrorKind::InvalidArguments,
            format!("expected str or a tuple of str, not {}", value.type_name()),
        )),
    }
}

fn pad(s: &str, width: usize, fill: char, align: char) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let missing = width - len;
    let (left, right) = match align {
        '<' => (0, missing),
        '>' => (missing, 0),
        // python's str.center puts the odd extra character on the left
        // when the width is odd
        _ => {
            let left = missing / 2 + (missing & width & 1);
            (left, missing - left)
        }
    };
    let mut rv = String::with_capacity(s.len() + missing);
    rv.extend(std::iter::repeat(fill).take(left));
    rv.push_str(s);
    rv.extend(std::iter::repeat(fill).take(right));
    rv
}

fn fill_char(fill: Option<String>) -> Result<char, Error> {
    let fill = fill.unwrap_or_else(|| " ".into());
    let mut chars = fill.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::new(
            ErrorKind::InvalidArguments,
            "the fill character must be exactly one character long",
        )),
    }
}

fn split_whitespace(s: &str, maxsplit: Option<usize>) -> Vec<Value> {
    let mut rv = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit.map_or(false, |max| rv.len() >= max) {
            rv.push(Value::from(rest));
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                rv.push(Value::from(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            None => {
                rv.push(Value::from(rest));
                break;
            }
        }
    }
    rv
}

fn title_case(s: &str) -> String {
    let mut rv = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        if prev_cased {
            rv.extend(c.to_lowercase());
        } else {
            rv.extend(c.to_uppercase());
        }
        prev_cased = c.is_alphabetic();
    }
    rv
}

fn call_str_method(
    value: &Value,
    s: &str,
    name: &str,
    args: &[Value],
    kwargs: &Kwargs,
) -> Result<Value, Error> {
    match name {
        "upper" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(s.to_uppercase()))
        }
        "lower" | "casefold" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(s.to_lowercase()))
        }
        "title" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(title_case(s)))
        }
        "capitalize" => {
            ok!(from_args::<()>(args, kwargs));
            let mut chars = s.chars();
            Ok(Value::from(match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.as_str().to_lowercase().chars())
                    .collect::<String>(),
                None => String::new(),
            }))
        }
        "swapcase" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(
                s.chars()
                    .flat_map(|c| {
                        if c.is_uppercase() {
                            c.to_lowercase().collect::<Vec<_>>()
                        } else {
                            c.to_uppercase().collect::<Vec<_>>()
                        }
                    })
                    .collect::<String>(),
            ))
        }
        "strip" | "lstrip" | "rstrip" => {
            let (chars,): (Option<String>,) = ok!(from_args(args, kwargs));
            let rv = match (name, chars) {
                ("strip", None) => s.trim(),
                ("lstrip", None) => s.trim_start(),
                (_, None) => s.trim_end(),
                ("strip", Some(ref chars)) => s.trim_matches(|c: char| chars.contains(c)),
                ("lstrip", Some(ref chars)) => s.trim_start_matches(|c: char| chars.contains(c)),
                (_, Some(ref chars)) => s.trim_end_matches(|c: char| chars.contains(c)),
            };
            Ok(Value::from(rv))
        }
        "split" => {
            let (sep, maxsplit): (Option<String>, Option<i64>) = ok!(from_args(args, kwargs));
            let maxsplit = maxsplit.and_then(|x| usize::try_from(x).ok());
            match sep {
                None => Ok(Value::from(split_whitespace(s, maxsplit))),
                Some(sep) if sep.is_empty() => Err(Error::new(
                    ErrorKind::InvalidArguments,
                    "empty separator",
                )),
                Some(sep) => Ok(match maxsplit {
                    Some(max) => s.splitn(max + 1, sep.as_str()).map(Value::from).collect(),
                    None => s.split(sep.as_str()).map(Value::from).collect(),
                }),
            }
        }
        "splitlines" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(s.lines().map(Value::from).collect())
        }
        "join" => {
            let (items,): (Vec<Value>,) = ok!(from_args(args, kwargs));
            let mut rv = String::new();
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    rv.push_str(s);
                }
                match item.as_str() {
                    Some(item) => rv.push_str(item),
                    None => {
                        return Err(Error::new(
                            ErrorKind::InvalidArguments,
                            format!(
                                "sequence item {}: expected str instance, {} found",
                                idx,
                                item.type_name()
                            ),
                        ))
                    }
                }
            }
            Ok(Value::from(rv))
        }
        "replace" => {
            let (old, new, count): (String, String, Option<i64>) = ok!(from_args(args, kwargs));
            Ok(Value::from(match count.and_then(|x| usize::try_from(x).ok()) {
                Some(count) => s.replacen(old.as_str(), &new, count),
                None => s.replace(old.as_str(), &new),
            }))
        }
        "startswith" | "endswith" => {
            let (needles,): (Value,) = ok!(from_args(args, kwargs));
            let needles = ok!(str_needles(needles));
            Ok(Value::from(needles.iter().any(|needle| {
                if name == "startswith" {
                    s.starts_with(needle.as_str())
                } else {
                    s.ends_with(needle.as_str())
                }
            })))
        }
        "find" | "rfind" | "index" | "rindex" => {
            let (needle,): (String,) = ok!(from_args(args, kwargs));
            let pos = if name.starts_with('r') {
                s.rfind(needle.as_str())
            } else {
                s.find(needle.as_str())
            };
            match pos {
                Some(pos) => Ok(Value::from(s[..pos].chars().count())),
                None if name.ends_with("find") => Ok(Value::from(-1)),
                None => Err(Error::new(ErrorKind::InvalidOperation, "substring not found")),
            }
        }
        "count" => {
            let (needle,): (String,) = ok!(from_args(args, kwargs));
            if needle.is_empty() {
                Ok(Value::from(s.chars().count() + 1))
            } else {
                Ok(Value::from(s.matches(needle.as_str()).count()))
            }
        }
        "zfill" => {
            let (width,): (usize,) = ok!(from_args(args, kwargs));
            let (sign, digits) = match s.chars().next() {
                Some(c @ ('+' | '-')) => (Some(c), &s[1..]),
                _ => (None, s),
            };
            let len = s.chars().count();
            let mut rv = String::with_capacity(width.max(s.len()));
            rv.extend(sign);
            rv.extend(std::iter::repeat('0').take(width.saturating_sub(len)));
            rv.push_str(digits);
            Ok(Value::from(rv))
        }
        "ljust" | "rjust" | "center" => {
            let (width, fill): (usize, Option<String>) = ok!(from_args(args, kwargs));
            let align = match name {
                "ljust" => '<',
                "rjust" => '>',
                _ => '^',
            };
            Ok(Value::from(pad(s, width, ok!(fill_char(fill)), align)))
        }
        "isdigit" | "isdecimal" | "isnumeric" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(
                !s.is_empty() && s.chars().all(|c| c.is_numeric()),
            ))
        }
        "isalpha" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(
                !s.is_empty() && s.chars().all(char::is_alphabetic),
            ))
        }
        "isalnum" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(
                !s.is_empty() && s.chars().all(char::is_alphanumeric),
            ))
        }
        "isspace" => {
            ok!(from_args::<()>(args, kwargs));
            Ok(Value::from(
                !s.is_empty() && s.chars().all(char::is_whitespace),
            ))
        }
        "isupper" | "islower" => {
            ok!(from_args::<()>(args, kwargs));
            let mut cased = s.chars().filter(|c| c.is_lowercase() || c.is_uppercase());
            let check: fn(char) -> bool = if name == "isupper" {
                char::is_uppercase
            } else {
                char::is_lowercase
            };
            let mut any = false;
            let all = cased.all(|c| {
                any = true;
                check(c)
            });
            Ok(Value::from(any && all))
        }
        _ => Err(no_such_method(value, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn call(value: &str, name: &str, args: &[Value]) -> String {
        Value::from(value)
            .call_method(name, args, &Kwargs::default())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_str_methods() {
        assert_eq!(call("hello", "upper", &[]), "HELLO");
        assert_eq!(call("hello world", "title", &[]), "Hello World");
        assert_eq!(call("  a b  ", "split", &[]), "['a', 'b']");
        assert_eq!(
            call("a,b,c", "split", &[Value::from(","), Value::from(1)]),
            "['a', 'b,c']"
        );
        assert_eq!(
            call(", ", "join", &[Value::from(vec!["a", "b"])]),
            "a, b"
        );
        assert_eq!(call("-42", "zfill", &[Value::from(5)]), "-0042");
        assert_eq!(call("ab", "center", &[Value::from(5)]), "  ab ");
        assert_eq!(call("abc", "center", &[Value::from(6), Value::from("*")]), "*abc**");
        assert_eq!(call("xxhixx", "strip", &[Value::from("x")]), "hi");
        assert_eq!(call("hello", "find", &[Value::from("z")]), "-1");
    }

    #[test]
    fn test_unknown_method() {
        let err = Value::from("x")
            .call_method("nope", &[], &Kwargs::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownMethod);
        assert_eq!(
            err.to_string(),
            "unknown method: 'str' object has no attribute 'nope'"
        );
    }

    #[test]
    fn test_dict_methods() {
        let d: Value = vec![("a", 1)].into_iter().collect();
        let kwargs = Kwargs::default();
        assert_eq!(
            d.call_method("get", &[Value::from("b"), Value::from(2)], &kwargs)
                .unwrap(),
            Value::from(2)
        );
        assert_eq!(
            d.call_method("items", &[], &kwargs).unwrap().to_string(),
            "[('a', 1)]"
        );
    }
}
