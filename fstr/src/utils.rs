use std::fmt::Write;
use std::str::Chars;

use crate::error::{Error, ErrorKind};

/// Helper for dealing with untrusted size hints.
#[inline(always)]
pub(crate) fn untrusted_size_hint(value: usize) -> usize {
    value.min(1024)
}

pub struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnDrop<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// Formats a float the way Python's `repr()` does.
///
/// This is the shortest representation that round-trips.  Scientific
/// notation is used for exponents below -4 and from 16 upwards.
pub fn float_repr(val: f64) -> String {
    if val.is_nan() {
        return "nan".into();
    } else if val.is_infinite() {
        return if val.is_sign_negative() { "-inf" } else { "inf" }.into();
    } else if val == 0.0 {
        return if val.is_sign_negative() { "-0.0" } else { "0.0" }.into();
    }

    let sci = format!("{val:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if (-4..16).contains(&exp) {
        let mut rv = val.to_string();
        if !rv.contains('.') {
            rv.push_str(".0");
        }
        rv
    } else {
        format!(
            "{mantissa}e{}{:02}",
            if exp < 0 { '-' } else { '+' },
            exp.unsigned_abs()
        )
    }
}

/// Quotes a string the way Python's `repr()` does.
///
/// Single quotes are preferred unless the string contains single quotes
/// but no double quotes.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut rv = String::with_capacity(s.len() + 2);
    rv.push(quote);
    for c in s.chars() {
        match c {
            '\\' => rv.push_str("\\\\"),
            '\n' => rv.push_str("\\n"),
            '\r' => rv.push_str("\\r"),
            '\t' => rv.push_str("\\t"),
            c if c == quote => {
                rv.push('\\');
                rv.push(c);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code < 0x100 {
                    write!(rv, "\\x{code:02x}").ok();
                } else {
                    write!(rv, "\\u{code:04x}").ok();
                }
            }
            c => rv.push(c),
        }
    }
    rv.push(quote);
    rv
}

/// Escapes all non ASCII characters like Python's `ascii()` does.
pub fn ascii_escape(s: &str) -> String {
    let mut rv = String::with_capacity(s.len());
    for c in s.chars() {
        let code = c as u32;
        if code < 0x80 {
            rv.push(c);
        } else if code < 0x100 {
            write!(rv, "\\x{code:02x}").ok();
        } else if code < 0x10000 {
            write!(rv, "\\u{code:04x}").ok();
        } else {
            write!(rv, "\\U{code:08x}").ok();
        }
    }
    rv
}

fn parse_hex(chars: &mut Chars, digits: usize) -> Result<char, Error> {
    let hexnum = chars.take(digits).collect::<String>();
    if hexnum.len() != digits {
        return Err(bad_escape(&format!("truncated \\x{hexnum} escape")));
    }
    u32::from_str_radix(&hexnum, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| bad_escape(&format!("invalid escape value {hexnum}")))
}

fn bad_escape(msg: &str) -> Error {
    Error::new(ErrorKind::BadEscape, msg.to_string())
}

/// Un-escape a string literal body, following Python rules.
///
/// Unknown escapes are kept verbatim like Python does.
pub fn unescape(s: &str) -> Result<String, Error> {
    let mut rv = String::with_capacity(s.len());
    let mut char_iter = s.chars();

    while let Some(c) = char_iter.next() {
        if c != '\\' {
            rv.push(c);
            continue;
        }
        match char_iter.next() {
            None => return Err(bad_escape("string ends with a backslash")),
            Some(d) => match d {
                '\n' => {}
                '\\' | '\'' | '"' => rv.push(d),
                'a' => rv.push('\x07'),
                'b' => rv.push('\x08'),
                'f' => rv.push('\x0C'),
                'n' => rv.push('\n'),
                'r' => rv.push('\r'),
                't' => rv.push('\t'),
                'v' => rv.push('\x0B'),
                'x' => rv.push(ok!(parse_hex(&mut char_iter, 2))),
                'u' => rv.push(ok!(parse_hex(&mut char_iter, 4))),
                'U' => rv.push(ok!(parse_hex(&mut char_iter, 8))),
                '0'..='7' => {
                    let mut code = d as u32 - '0' as u32;
                    for _ in 0..2 {
                        match char_iter.clone().next() {
                            Some(o @ '0'..='7') => {
                                code = code * 8 + (o as u32 - '0' as u32);
                                char_iter.next();
                            }
                            _ => break,
                        }
                    }
                    rv.push(ok!(char::from_u32(code)
                        .ok_or_else(|| bad_escape("invalid octal escape"))));
                }
                other => {
                    rv.push('\\');
                    rv.push(other);
                }
            },
        }
    }

    Ok(rv)
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(3.14), "3.14");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1234567.0), "1234567.0");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.00001), "1e-05");
        assert_eq!(float_repr(-1.5e-7), "-1.5e-07");
        assert_eq!(float_repr(f64::INFINITY), "inf");
    }

    #[test]
    fn test_quote_str() {
        assert_eq!(quote_str("a"), "'a'");
        assert_eq!(quote_str("eric's"), "\"eric's\"");
        assert_eq!(quote_str("'\""), "'\\'\"'");
        assert_eq!(quote_str("a\nb"), "'a\\nb'");
        assert_eq!(quote_str("ä"), "'ä'");
    }

    #[test]
    fn test_ascii_escape() {
        assert_eq!(ascii_escape("'ä€😀'"), "'\\xe4\\u20ac\\U0001f600'");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\x41\u00e4\101").unwrap(), "a\nbAäA");
        assert_eq!(unescape(r"\d").unwrap(), r"\d");
        assert_eq!(unescape(r"\x4").unwrap_err().kind(), ErrorKind::BadEscape);
    }
}
