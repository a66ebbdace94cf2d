use std::borrow::Cow;
use std::fmt;

/// Represents template errors.
///
/// Errors raised while a template is compiled carry the byte offset into the
/// template source where the problem was detected.  Errors raised while a
/// template is rendered additionally carry the source of the expression that
/// failed.
///
/// If debug mode is enabled an error contains the template source as well
/// which is rendered with a marker under the offending offset when the error
/// is formatted with the alternative formatting (``format!("{:#}", err)``).
///
/// # Example
///
/// ```rust
/// # let env = fstr::Environment::new();
/// match env.template("{1 + }") {
///     Ok(tmpl) => println!("{:?}", tmpl),
///     Err(err) => {
///         eprintln!("Could not compile template:");
///         eprintln!("  {:#}", err);
///     }
/// }
/// ```
pub struct Error {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    offset: Option<usize>,
    expression: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    #[cfg(feature = "debug")]
    pub(crate) debug_info: Option<crate::debug::DebugInfo>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut err = f.debug_struct("Error");
        err.field("kind", &self.kind);
        if let Some(ref detail) = self.detail {
            err.field("detail", detail);
        }
        if let Some(offset) = self.offset {
            err.field("offset", &offset);
        }
        if let Some(ref expression) = self.expression {
            err.field("expression", expression);
        }
        if let Some(ref source) = self.source {
            err.field("source", source);
        }
        err.finish()?;

        // so that debug info is shown when the error is unwrapped in tests
        #[cfg(feature = "debug")]
        {
            if !f.alternate() {
                if let Some(ref info) = self.debug_info {
                    ok!(crate::debug::render_debug_info(
                        f,
                        self.kind,
                        self.offset,
                        info
                    ));
                }
            }
        }

        Ok(())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Error {}

/// An enum describing the error kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The template ended inside an expression or contains a stray `}`.
    MismatchedBraces,
    /// A closing parenthesis inside an expression has no opening partner.
    MismatchedParentheses,
    /// An expression region contains nothing but whitespace.
    EmptyExpression,
    /// The conversion after `!` is not one of `s`, `r` or `a`.
    InvalidConversion,
    /// The conversion after `!` contains a nested expression.
    DynamicConversion,
    /// An expression contains a backslash.
    BackslashInExpression,
    /// The expression evaluator rejected the expression source.
    SyntaxError,
    /// An expression referenced a name that is not defined.
    UndefinedName,
    /// Applying the conversion or format spec to a value failed.
    FormatError,
    /// An operation on a value is not supported.
    InvalidOperation,
    /// A function was called with unsuitable arguments.
    InvalidArguments,
    /// A method is not available on a value.
    UnknownMethod,
    /// A string literal contains an unsupported escape sequence.
    BadEscape,
    /// A value could not be converted into the internal format.
    BadSerialization,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::MismatchedBraces => "mismatched braces",
            ErrorKind::MismatchedParentheses => "mismatched parentheses",
            ErrorKind::EmptyExpression => "empty expression not allowed",
            ErrorKind::InvalidConversion => "invalid conversion character",
            ErrorKind::DynamicConversion => "conversion character cannot be dynamic",
            ErrorKind::BackslashInExpression => "expression cannot contain a backslash",
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::UndefinedName => "name is not defined",
            ErrorKind::FormatError => "could not format value",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::InvalidArguments => "invalid arguments",
            ErrorKind::UnknownMethod => "unknown method",
            ErrorKind::BadEscape => "bad string escape",
            ErrorKind::BadSerialization => "could not serialize to internal format",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref detail) = self.detail {
            ok!(write!(f, "{}: {}", self.kind, detail));
        } else {
            ok!(write!(f, "{}", self.kind));
        }
        if let Some(offset) = self.offset {
            ok!(write!(f, " (at offset {offset})"));
        }
        #[cfg(feature = "debug")]
        {
            if f.alternate() {
                if let Some(ref info) = self.debug_info {
                    ok!(crate::debug::render_debug_info(
                        f,
                        self.kind,
                        self.offset,
                        info
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            offset: None,
            expression: None,
            source: None,
            #[cfg(feature = "debug")]
            debug_info: None,
        }
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attaches a byte offset into the template source.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn set_offset_if_missing(&mut self, offset: usize) {
        if self.offset.is_none() {
            self.offset = Some(offset);
        }
    }

    /// Moves the offset by `by` bytes.  Used when errors from a nested
    /// specifier travel up into the enclosing template.
    pub(crate) fn shift_offset(&mut self, by: usize) {
        if let Some(ref mut offset) = self.offset {
            *offset += by;
        }
    }

    pub(crate) fn set_expression(&mut self, expr: &str) {
        if self.expression.is_none() {
            self.expression = Some(expr.into());
        }
    }

    #[cfg(feature = "debug")]
    pub(crate) fn attach_debug_info(&mut self, template_source: &str) {
        if self.debug_info.is_none() {
            self.debug_info = Some(crate::debug::DebugInfo {
                template_source: Some(template_source.to_string()),
            });
        }
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error detail
    ///
    /// The detail is an error message that provides further details about
    /// the error kind.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the byte offset into the template source if known.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns the source of the expression that failed to render.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Returns the template source if debug information is available.
    ///
    /// The template source is only embedded into the error if the debug
    /// mode is enabled on the environment
    /// ([`Environment::set_debug`](crate::Environment::set_debug)).
    pub fn template_source(&self) -> Option<&str> {
        #[cfg(feature = "debug")]
        {
            self.debug_info
                .as_ref()
                .and_then(|x| x.template_source.as_deref())
        }
        #[cfg(not(feature = "debug"))]
        {
            None
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            detail: None,
            offset: None,
            expression: None,
            source: None,
            #[cfg(feature = "debug")]
            debug_info: None,
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::new(ErrorKind::FormatError, "formatting failed")
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::new(ErrorKind::BadSerialization, msg.to_string())
    }
}
