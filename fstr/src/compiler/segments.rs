use std::fmt;
use std::sync::Arc;

use crate::evaluator::CompiledExpr;

/// The conversion marker of a replacement field (`!s`, `!r` or `!a`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// `!s` applies `str()`.
    Str,
    /// `!r` applies `repr()`.
    Repr,
    /// `!a` applies `ascii()`.
    Ascii,
}

impl Conversion {
    pub(crate) fn from_marker(marker: &str) -> Option<Conversion> {
        match marker {
            "s" => Some(Conversion::Str),
            "r" => Some(Conversion::Repr),
            "a" => Some(Conversion::Ascii),
            _ => None,
        }
    }

    /// Returns the marker character.
    pub fn as_char(self) -> char {
        match self {
            Conversion::Str => 's',
            Conversion::Repr => 'r',
            Conversion::Ascii => 'a',
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}", self.as_char())
    }
}

/// The format spec of a replacement field.
#[derive(Debug)]
pub enum Specifier {
    /// A spec without nested expressions such as `>10.2f`.
    Static(String),
    /// A spec with nested expressions such as `{width}.{precision}`.
    ///
    /// It is rendered with the same context before it is applied.
    Dynamic(Box<CompiledTemplate>),
}

/// A compiled replacement field.
pub struct ExprSlot {
    pub(crate) source: String,
    pub(crate) compiled: Arc<dyn CompiledExpr>,
    pub(crate) conversion: Option<Conversion>,
    pub(crate) spec: Option<Specifier>,
    pub(crate) offset: usize,
}

impl fmt::Debug for ExprSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExprSlot")
            .field("source", &self.source)
            .field("conversion", &self.conversion)
            .field("spec", &self.spec)
            .field("offset", &self.offset)
            .finish()
    }
}

impl ExprSlot {
    /// The expression source with surrounding whitespace and newlines removed.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The conversion marker if there is one.
    pub fn conversion(&self) -> Option<Conversion> {
        self.conversion
    }

    /// The format spec if there is one.
    pub fn spec(&self) -> Option<&Specifier> {
        self.spec.as_ref()
    }

    /// Byte offset of the expression in the template source.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// A piece of a compiled template.
#[derive(Debug)]
pub enum Segment {
    /// Text copied to the output.  Doubled braces are already collapsed.
    Literal(String),
    /// A replacement field.
    Expr(ExprSlot),
}

/// The compiled form of a template source.
#[derive(Debug, Default)]
pub struct CompiledTemplate {
    pub(crate) segments: Vec<Segment>,
}

impl CompiledTemplate {
    /// Returns the segments in source order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over the top level replacement fields.
    pub fn slots(&self) -> impl Iterator<Item = &ExprSlot> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Expr(slot) => Some(slot),
            Segment::Literal(_) => None,
        })
    }
}
