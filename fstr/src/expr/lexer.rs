use std::borrow::Cow;

use crate::error::{Error, ErrorKind};
use crate::expr::tokens::{Span, Token};
use crate::utils::unescape;

/// Tokenizes an expression.
pub struct Tokenizer<'s> {
    rest: &'s str,
    current_offset: usize,
}

fn lex_identifier(s: &str) -> usize {
    s.chars()
        .enumerate()
        .map_while(|(idx, c)| {
            let cont = if c == '_' {
                true
            } else if idx == 0 {
                c.is_alphabetic()
            } else {
                c.is_alphanumeric()
            };
            cont.then(|| c.len_utf8())
        })
        .sum::<usize>()
}

fn is_string_prefix(ident: &str) -> Option<bool> {
    match ident {
        "r" | "R" => Some(true),
        "u" | "U" => Some(false),
        _ => None,
    }
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer.
    pub fn new(input: &'s str) -> Tokenizer<'s> {
        Tokenizer {
            rest: input,
            current_offset: 0,
        }
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Result<Option<(Token<'s>, Span)>, Error> {
        self.skip_whitespace();
        if self.rest.is_empty() {
            return Ok(None);
        }
        let old_loc = self.current_offset;

        // two character operators
        let op = match self.rest_bytes().get(..2) {
            Some(b"//") => Some(Token::FloorDiv),
            Some(b"**") => Some(Token::Pow),
            Some(b"==") => Some(Token::Eq),
            Some(b"!=") => Some(Token::Ne),
            Some(b">=") => Some(Token::Gte),
            Some(b"<=") => Some(Token::Lte),
            Some(b"<<") => Some(Token::ShiftLeft),
            Some(b">>") => Some(Token::ShiftRight),
            _ => None,
        };
        if let Some(op) = op {
            self.advance(2);
            return Ok(Some((op, self.span(old_loc))));
        }

        // single character operators (and strings)
        let op = match self.rest_bytes()[0] {
            b'+' => Some(Token::Plus),
            b'-' => Some(Token::Minus),
            b'*' => Some(Token::Mul),
            b'/' => Some(Token::Div),
            b'%' => Some(Token::Mod),
            b'@' => Some(Token::MatMul),
            b'.' if !matches!(self.rest_bytes().get(1), Some(b'0'..=b'9')) => Some(Token::Dot),
            b',' => Some(Token::Comma),
            b':' => Some(Token::Colon),
            b'~' => Some(Token::Tilde),
            b'|' => Some(Token::Pipe),
            b'^' => Some(Token::Caret),
            b'&' => Some(Token::Ampersand),
            b'=' => Some(Token::Assign),
            b'>' => Some(Token::Gt),
            b'<' => Some(Token::Lt),
            b'(' => Some(Token::ParenOpen),
            b')' => Some(Token::ParenClose),
            b'[' => Some(Token::BracketOpen),
            b']' => Some(Token::BracketClose),
            b'{' => Some(Token::BraceOpen),
            b'}' => Some(Token::BraceClose),
            b'\'' | b'"' => return self.eat_string(0, false).map(Some),
            b'0'..=b'9' | b'.' => return self.eat_number().map(Some),
            _ => None,
        };
        if let Some(op) = op {
            self.advance(1);
            Ok(Some((op, self.span(old_loc))))
        } else {
            self.eat_identifier().map(Some)
        }
    }

    #[inline]
    fn rest_bytes(&self) -> &[u8] {
        self.rest.as_bytes()
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let (skipped, new_rest) = self.rest.split_at(bytes);
        self.current_offset += bytes;
        self.rest = new_rest;
        skipped
    }

    #[inline]
    fn span(&self, start_offset: usize) -> Span {
        Span {
            start_offset,
            end_offset: self.current_offset,
        }
    }

    #[inline]
    fn syntax_error(&self, msg: &'static str) -> Error {
        Error::new(ErrorKind::SyntaxError, msg).with_offset(self.current_offset)
    }

    fn eat_number(&mut self) -> Result<(Token<'s>, Span), Error> {
        #[derive(Copy, Clone)]
        enum State {
            RadixInteger, // 0x10
            Integer,      // 123
            Fraction,     // .123
            Exponent,     // E | e
            ExponentSign, // +|-
        }

        let old_loc = self.current_offset;

        let radix = match self.rest_bytes().get(..2) {
            Some(b"0b" | b"0B") => 2,
            Some(b"0o" | b"0O") => 8,
            Some(b"0x" | b"0X") => 16,
            _ => 10,
        };

        let mut state = if radix == 10 {
            State::Integer
        } else {
            self.advance(2);
            State::RadixInteger
        };

        let mut num_len = self
            .rest_bytes()
            .iter()
            .take_while(|&c| c.is_ascii_digit())
            .count();
        let mut has_underscore = false;
        for c in self.rest_bytes()[num_len..].iter().copied() {
            state = match (c, state) {
                (b'.', State::Integer) => State::Fraction,
                (b'E' | b'e', State::Integer | State::Fraction) => State::Exponent,
                (b'+' | b'-', State::Exponent) => State::ExponentSign,
                (b'0'..=b'9', State::Exponent) => State::ExponentSign,
                (b'0'..=b'9', state) => state,
                (b'a'..=b'f' | b'A'..=b'F', State::RadixInteger) if radix == 16 => state,
                (b'_', _) => {
                    has_underscore = true;
                    state
                }
                _ => break,
            };
            num_len += 1;
        }
        let is_float = !matches!(state, State::Integer | State::RadixInteger);

        let mut num = Cow::Borrowed(self.advance(num_len));
        if has_underscore {
            if num.ends_with('_') {
                return Err(self.syntax_error("'_' may not occur at end of number"));
            }
            num = Cow::Owned(num.replace('_', ""));
        }

        Ok((
            ok!(if is_float {
                num.parse()
                    .map(Token::Float)
                    .map_err(|_| self.syntax_error("invalid float"))
            } else if num.is_empty() {
                Err(self.syntax_error("invalid integer"))
            } else {
                u64::from_str_radix(&num, radix)
                    .map(Token::Int)
                    .map_err(|_| self.syntax_error("invalid integer"))
            }),
            self.span(old_loc),
        ))
    }

    fn eat_identifier(&mut self) -> Result<(Token<'s>, Span), Error> {
        let ident_len = lex_identifier(self.rest);
        if ident_len == 0 {
            return Err(self.syntax_error("unexpected character"));
        }
        if let Some(raw) = is_string_prefix(&self.rest[..ident_len]) {
            if matches!(self.rest_bytes().get(ident_len), Some(b'\'' | b'"')) {
                return self.eat_string(ident_len, raw);
            }
        }
        let old_loc = self.current_offset;
        let ident = self.advance(ident_len);
        Ok((Token::Ident(ident), self.span(old_loc)))
    }

    fn eat_string(&mut self, prefix_len: usize, raw: bool) -> Result<(Token<'s>, Span), Error> {
        let old_loc = self.current_offset;
        let bytes = &self.rest_bytes()[prefix_len..];
        let delim = bytes[0];
        let triple = bytes.starts_with(&[delim; 3]);
        let quote_len = if triple { 3 } else { 1 };

        let mut escaped = false;
        let mut pos = quote_len;
        let end = loop {
            let c = match bytes.get(pos) {
                Some(&c) => c,
                None => return Err(self.syntax_error("unterminated string literal")),
            };
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == delim && (!triple || bytes[pos..].starts_with(&[delim; 3])) {
                break pos;
            }
            pos += 1;
        };

        let s = self.advance(prefix_len + end + quote_len);
        let body = &s[prefix_len + quote_len..prefix_len + end];
        let value = if raw || !body.contains('\\') {
            body.to_string()
        } else {
            ok!(unescape(body).map_err(|err| {
                Error::new(ErrorKind::SyntaxError, "invalid escape in string literal")
                    .with_offset(old_loc)
                    .with_source(err)
            }))
        };
        Ok((Token::Str(value), self.span(old_loc)))
    }

    fn skip_whitespace(&mut self) {
        let skipped = self
            .rest
            .chars()
            .map_while(|c| c.is_whitespace().then(|| c.len_utf8()))
            .sum();
        if skipped > 0 {
            self.advance(skipped);
        }
    }
}

/// Utility function to quickly tokenize into an iterator.
pub fn tokenize(input: &str) -> impl Iterator<Item = Result<(Token<'_>, Span), Error>> {
    let mut tokenizer = Tokenizer::new(input);
    std::iter::from_fn(move || tokenizer.next_token().transpose())
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input).map(|x| x.unwrap().0).collect()
    }

    #[test]
    fn test_basic_identifiers() {
        fn assert_ident(s: &str) {
            assert_eq!(tokens(s), vec![Token::Ident(s)]);
        }
        assert_ident("foo_bar_baz");
        assert_ident("_foo_bar_baz");
        assert_ident("_42world");
        assert_ident("_world42");
        assert_ident("world42");
        assert_ident("straße");
        assert_eq!(tokens("42world"), vec![Token::Int(42), Token::Ident("world")]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("0x_ff 0o17 0b101 1_000 42"),
            vec![
                Token::Int(255),
                Token::Int(15),
                Token::Int(5),
                Token::Int(1000),
                Token::Int(42),
            ]
        );
        assert_eq!(
            tokens("1.5 .5 1e3 2.5E-2"),
            vec![
                Token::Float(1.5),
                Token::Float(0.5),
                Token::Float(1000.0),
                Token::Float(0.025),
            ]
        );
        assert!(tokenize("1_").next().unwrap().is_err());
        assert!(tokenize("99999999999999999999").next().unwrap().is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(r#"'a' "b" '''c'd''' """e"f""" r'\n' u'x' 'tab\t'"#),
            vec![
                Token::Str("a".into()),
                Token::Str("b".into()),
                Token::Str("c'd".into()),
                Token::Str("e\"f".into()),
                Token::Str("\\n".into()),
                Token::Str("x".into()),
                Token::Str("tab\t".into()),
            ]
        );
        let err = tokenize("'abc").next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("a//b**c<<d>>e!=f<=g>=h==i"),
            vec![
                Token::Ident("a"),
                Token::FloorDiv,
                Token::Ident("b"),
                Token::Pow,
                Token::Ident("c"),
                Token::ShiftLeft,
                Token::Ident("d"),
                Token::ShiftRight,
                Token::Ident("e"),
                Token::Ne,
                Token::Ident("f"),
                Token::Lte,
                Token::Ident("g"),
                Token::Gte,
                Token::Ident("h"),
                Token::Eq,
                Token::Ident("i"),
            ]
        );
        assert_eq!(
            tokens("x.y[0]"),
            vec![
                Token::Ident("x"),
                Token::Dot,
                Token::Ident("y"),
                Token::BracketOpen,
                Token::Int(0),
                Token::BracketClose,
            ]
        );
    }

    #[test]
    fn test_spans() {
        let spans: Vec<_> = tokenize("ab + 'cd'")
            .map(|x| x.unwrap().1)
            .map(|span| (span.start_offset, span.end_offset))
            .collect();
        assert_eq!(spans, vec![(0, 2), (3, 4), (5, 9)]);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a $").nth(1).unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.offset(), Some(2));
    }
}
