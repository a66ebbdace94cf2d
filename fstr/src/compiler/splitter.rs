use crate::compiler::scanner::QuoteState;

/// Splits the interior of a replacement field into expression and tail.
///
/// The split happens at the first `!` (but not `!=`) or `:` which is outside
/// of any brackets and string literals.  The tail keeps its delimiter and is
/// empty if there is no split point.
pub fn split_specifier(region: &str) -> (&str, &str) {
    let bytes = region.as_bytes();
    let mut braces = 0i32;
    let mut brackets = 0i32;
    let mut parens = 0i32;
    let mut quote = QuoteState::Closed;
    let mut pos = 0;

    while pos < bytes.len() {
        let consumed = quote.feed(bytes, pos);
        if consumed > 0 {
            pos += consumed;
            continue;
        }
        match bytes[pos] {
            b'{' => braces += 1,
            b'}' => braces -= 1,
            b'[' => brackets += 1,
            b']' => brackets -= 1,
            b'(' => parens += 1,
            b')' => parens -= 1,
            b'!' | b':' if braces == 0 && brackets == 0 && parens == 0 => {
                if bytes[pos] == b'!' && bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    continue;
                }
                return region.split_at(pos);
            }
            _ => {}
        }
        pos += 1;
    }

    (region, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tail() {
        assert_eq!(split_specifier("x"), ("x", ""));
        assert_eq!(split_specifier("a + b"), ("a + b", ""));
    }

    #[test]
    fn test_conversion_and_spec() {
        assert_eq!(split_specifier("x!r"), ("x", "!r"));
        assert_eq!(split_specifier("x:>10"), ("x", ":>10"));
        assert_eq!(split_specifier("x!r:>10"), ("x", "!r:>10"));
        assert_eq!(split_specifier("x:{w}.{p}"), ("x", ":{w}.{p}"));
    }

    #[test]
    fn test_not_equal() {
        assert_eq!(split_specifier("3!=4"), ("3!=4", ""));
        assert_eq!(split_specifier("a != b!r"), ("a != b", "!r"));
        assert_eq!(split_specifier("x:!=<5"), ("x", ":!=<5"));
    }

    #[test]
    fn test_nesting() {
        assert_eq!(split_specifier("d['a:b']"), ("d['a:b']", ""));
        assert_eq!(split_specifier("x[1:2]:>5"), ("x[1:2]", ":>5"));
        assert_eq!(split_specifier("{'a': 1}['a']"), ("{'a': 1}['a']", ""));
        assert_eq!(split_specifier("(lambda x: x)(1)"), ("(lambda x: x)(1)", ""));
        assert_eq!(split_specifier("'''a:b'''!s"), ("'''a:b'''", "!s"));
        assert_eq!(split_specifier("\"!\""), ("\"!\"", ""));
    }
}
