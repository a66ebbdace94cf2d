use std::ops::Range;

use crate::error::{Error, ErrorKind};

/// A piece of scanned template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Literal text with doubled braces collapsed.
    Literal(String),
    /// The interior of a replacement field, without the delimiting braces.
    Region(Range<usize>),
}

/// Tracks whether the scanner is inside a string literal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum QuoteState {
    #[default]
    Closed,
    Single(u8),
    Triple(u8),
}

impl QuoteState {
    pub fn is_open(self) -> bool {
        self != QuoteState::Closed
    }

    /// Feeds the byte at `pos` and returns how many bytes were consumed.
    ///
    /// While closed this only consumes quote characters and returns `0` for
    /// everything else.  While open every byte is consumed.
    pub fn feed(&mut self, bytes: &[u8], pos: usize) -> usize {
        let c = bytes[pos];
        match *self {
            QuoteState::Closed => {
                if c != b'\'' && c != b'"' {
                    0
                } else if bytes.get(pos + 1) == Some(&c) && bytes.get(pos + 2) == Some(&c) {
                    *self = QuoteState::Triple(c);
                    3
                } else {
                    *self = QuoteState::Single(c);
                    1
                }
            }
            QuoteState::Single(q) => {
                if c == q {
                    *self = QuoteState::Closed;
                }
                1
            }
            QuoteState::Triple(q) => {
                if bytes[pos..].starts_with(&[q, q, q]) {
                    *self = QuoteState::Closed;
                    3
                } else {
                    1
                }
            }
        }
    }
}

fn run_length(bytes: &[u8], pos: usize, c: u8) -> usize {
    bytes[pos..].iter().take_while(|&&b| b == c).count()
}

fn mismatched_braces(msg: &'static str, offset: usize) -> Error {
    Error::new(ErrorKind::MismatchedBraces, msg).with_offset(offset)
}

/// Splits template source into literal text and replacement field regions.
///
/// In nested mode (the source is a format spec) doubled braces are not an
/// escape and fail instead.
pub fn scan(source: &str, nested: bool) -> Result<Vec<Chunk>, Error> {
    let bytes = source.as_bytes();
    let mut chunks = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let brace_pos = match bytes[pos..].iter().position(|&b| b == b'{' || b == b'}') {
            Some(offset) => pos + offset,
            None => {
                literal.push_str(&source[pos..]);
                break;
            }
        };
        literal.push_str(&source[pos..brace_pos]);
        let brace = bytes[brace_pos];
        let run = run_length(bytes, brace_pos, brace);
        pos = brace_pos + run;

        if brace == b'}' {
            if run % 2 == 1 {
                return Err(mismatched_braces("single '}' is not allowed", brace_pos));
            } else if nested {
                return Err(mismatched_braces(
                    "doubled braces are not allowed in a format spec",
                    brace_pos,
                ));
            }
            literal.extend(std::iter::repeat('}').take(run / 2));
            continue;
        }

        if nested && run > 1 {
            return Err(mismatched_braces(
                "doubled braces are not allowed in a format spec",
                brace_pos,
            ));
        }
        literal.extend(std::iter::repeat('{').take(run / 2));
        if run % 2 == 0 {
            continue;
        }

        if !literal.is_empty() {
            chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
        }
        let end = ok!(scan_region(bytes, pos, pos - 1));
        log::trace!("scanned expression region {}..{}", pos, end);
        chunks.push(Chunk::Region(pos..end));
        pos = end + 1;
    }

    if !literal.is_empty() {
        chunks.push(Chunk::Literal(literal));
    }
    Ok(chunks)
}

/// Returns the number of parentheses left open at the end of `expr`.
pub(crate) fn open_parens(expr: &str) -> usize {
    let bytes = expr.as_bytes();
    let mut quote = QuoteState::Closed;
    let mut parens = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        let consumed = quote.feed(bytes, pos);
        if consumed > 0 {
            pos += consumed;
            continue;
        }
        match bytes[pos] {
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            _ => {}
        }
        pos += 1;
    }
    parens
}

/// Finds the closing brace of a region whose interior starts at `start`.
fn scan_region(bytes: &[u8], start: usize, open: usize) -> Result<usize, Error> {
    let mut depth = 1usize;
    let mut parens = 0usize;
    let mut quote = QuoteState::Closed;
    let mut pos = start;

    while pos < bytes.len() {
        // an escaped quote would otherwise end the string early
        if quote.is_open() && bytes[pos] == b'\\' {
            return Err(Error::new(
                ErrorKind::BackslashInExpression,
                "expression part cannot include a backslash",
            )
            .with_offset(pos));
        }
        let consumed = quote.feed(bytes, pos);
        if consumed > 0 {
            pos += consumed;
            continue;
        }
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' if depth > 1 => depth -= 1,
            b'}' => {
                let run = run_length(bytes, pos, b'}');
                if run % 2 == 1 {
                    return Ok(pos);
                }
                pos += run;
                continue;
            }
            b'(' => parens += 1,
            b')' => {
                if parens == 0 {
                    return Err(Error::new(
                        ErrorKind::MismatchedParentheses,
                        "unmatched ')'",
                    )
                    .with_offset(pos));
                }
                parens -= 1;
            }
            _ => {}
        }
        pos += 1;
    }

    Err(mismatched_braces("expecting '}'", open))
}
