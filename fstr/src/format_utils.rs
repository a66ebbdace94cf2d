//! Conversions and the format-spec mini-language.
//!
//! Everything after the `:` of a template expression is a format spec that
//! follows the grammar Python's `format()` builtin uses:
//!
//! ```text
//! [[fill]align][sign][#][0][width][grouping][.precision][type]
//! ```
//!
//! Bools, ints, floats and strings understand the full language.  Other
//! values only accept an empty spec unless they are objects providing their
//! own [`Object::format`](crate::value::Object::format).
use std::fmt::LowerExp;
use std::num::FpCategory;

use crate::compiler::segments::Conversion;
use crate::error::{Error, ErrorKind};
use crate::utils::float_repr;
use crate::value::{Value, ValueRepr};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    // padding goes between the sign and the digits
    AfterSign,
}

#[derive(Debug, PartialEq, Eq)]
struct FillAlign {
    fill: Option<char>,
    align: Align,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Type {
    Default,
    Binary,
    Char,
    Decimal,
    Octal,
    LowerHex,
    UpperHex,
    LowerE,
    UpperE,
    LowerF,
    UpperF,
    LowerG,
    UpperG,
    Number,
    Percent,
    String,
}

impl Type {
    fn code(&self) -> char {
        match self {
            Type::Default => ' ',
            Type::Binary => 'b',
            Type::Char => 'c',
            Type::Decimal => 'd',
            Type::Octal => 'o',
            Type::LowerHex => 'x',
            Type::UpperHex => 'X',
            Type::LowerE => 'e',
            Type::UpperE => 'E',
            Type::LowerF => 'f',
            Type::UpperF => 'F',
            Type::LowerG => 'g',
            Type::UpperG => 'G',
            Type::Number => 'n',
            Type::Percent => '%',
            Type::String => 's',
        }
    }

    fn is_float_type(&self) -> bool {
        matches!(
            self,
            Type::LowerE
                | Type::UpperE
                | Type::LowerF
                | Type::UpperF
                | Type::LowerG
                | Type::UpperG
                | Type::Percent
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Separator {
    Comma,
    Underscore,
}

#[derive(Debug, PartialEq, Eq)]
struct FormatSpec {
    fill_align: Option<FillAlign>,
    print_sign: bool,
    space_before_positive_num: bool,
    alternate_form: bool,
    zero_padded: bool,
    width: Option<usize>,
    integer_grouping: Option<Separator>,
    precision: Option<usize>,
    ty: Type,
}

fn format_error<D: Into<std::borrow::Cow<'static, str>>>(msg: D) -> Error {
    Error::new(ErrorKind::FormatError, msg)
}

impl FormatSpec {
    fn format(&self, val: &Value) -> Result<String, Error> {
        match val.0 {
            ValueRepr::Bool(b) => self.format_integer(b as i64),
            ValueRepr::I64(i) => self.format_integer(i),
            ValueRepr::F64(f) => self.format_float(f, "float"),
            ValueRepr::String(ref s) => self.format_str(s),
            _ => Err(format_error(format!(
                "unsupported format string passed to {}.__format__",
                val.type_name()
            ))),
        }
    }

    fn unknown_code(&self, type_name: &str) -> Error {
        format_error(format!(
            "Unknown format code '{}' for object of type '{}'",
            self.ty.code(),
            type_name
        ))
    }

    fn has_sign_option(&self) -> bool {
        self.print_sign || self.space_before_positive_num
    }

    fn format_str(&self, text: &str) -> Result<String, Error> {
        if !matches!(self.ty, Type::Default | Type::String) {
            return Err(self.unknown_code("str"));
        }
        if self.has_sign_option() {
            return Err(format_error("Sign not allowed in string format specifier"));
        }
        if self.alternate_form {
            return Err(format_error(
                "Alternate form (#) not allowed in string format specifier",
            ));
        }
        if self.integer_grouping.is_some() {
            return Err(format_error("Cannot specify ',' with 's'."));
        }
        if matches!(
            self.fill_align,
            Some(FillAlign {
                align: Align::AfterSign,
                ..
            })
        ) {
            return Err(format_error(
                "'=' alignment not allowed in string format specifier",
            ));
        }

        let text = match self.precision {
            Some(p) => text.chars().take(p).collect(),
            None => text.to_string(),
        };
        Ok(self.apply_padding(text, Align::Left))
    }

    // Format the number in scientific form, and extract mantissa and exponent
    // parts. Exponent produced by Rust's fmt lib doesn't exactly match the format
    // used by Python's formatting utils, so this function returns it as an integer
    // and callers format it further. Also, the integer exponent is used to decide
    // `f` vs. `e` formats when the general format (`g`) is used.
    fn mantissa_and_exp<T: LowerExp>(val: T, precision: usize) -> (String, i32) {
        let sci = format!("{val:.precision$e}");
        match sci.rsplit_once('e') {
            Some((m, e)) => (m.to_owned(), e.parse::<i32>().unwrap_or(0)),
            None => (sci, 0),
        }
    }

    // If precision is zero, the decimal point is omitted unless `#` option is used
    fn fix_decimal_point(&self, mut num: String) -> String {
        if let Some(0) = self.precision {
            if self.alternate_form {
                num.push('.');
            }
        }
        num
    }

    // If '#' option is not used, remove insignificant trailing zeros from the
    // floating point number for the general format. Also remove the decimal point if
    // there are no significant digits left after it.
    fn remove_insignificants<'a>(&self, num: &'a str) -> &'a str {
        if !self.alternate_form && num.contains('.') {
            num.trim_end_matches('0').trim_end_matches('.')
        } else {
            num
        }
    }

    fn number_in_general_format(&self, val: f64, is_uppercase: bool) -> String {
        let precision = self
            .precision
            .map(|p| if p == 0 { 1 } else { p })
            .unwrap_or(6);

        let (manti, exp) = Self::mantissa_and_exp(val, precision - 1);
        if exp >= -4 && exp < precision as i32 {
            let decimal_places = (precision as i32 - 1 - exp) as usize;
            let num = format!("{val:.decimal_places$}");
            self.group_decimal_num(self.remove_insignificants(&num).to_owned())
        } else {
            let manti = self.group_decimal_num(self.remove_insignificants(&manti).to_owned());
            format!("{manti}{}{exp:+03}", if is_uppercase { 'E' } else { 'e' })
        }
    }

    // Group the digits in a given number into chunks of size `group_size`, separated
    // by the given `separator` char. The function doesn't interpret the number
    // string in any way, so the caller must make sure that it contains only [0-9]
    // digits to avoid malformed grouping.
    fn group(num: &str, separator: char, group_size: usize) -> String {
        let prefix_len = num.len() % group_size;
        let mut grouped = num[0..prefix_len].to_string();
        let mut digits = num[prefix_len..].chars();

        while !digits.as_str().is_empty() {
            if !grouped.is_empty() {
                grouped.push(separator);
            }
            grouped.extend(digits.by_ref().take(group_size));
        }
        grouped
    }

    // Group the digits of a given number according to the requested format. The
    // number string is assumed to be in one of the binary encoding formats: `b`,
    // `o`, `x` or `X`.
    fn group_binary_num(&self, number: String) -> Result<String, Error> {
        match self.integer_grouping {
            Some(Separator::Comma) => Err(format_error(format!(
                "Cannot specify ',' with '{}'.",
                self.ty.code()
            ))),
            Some(Separator::Underscore) => Ok(Self::group(&number, '_', 4)),
            None => Ok(number),
        }
    }

    // Group the digits of a given number according to the requested format. The
    // number string is assumed to be in decimal form: `xxx[. [yyy] ]`. This means in
    // case of scientific form (`e` or `E`), only the mantissa should be passed.
    fn group_decimal_num(&self, number: String) -> String {
        let separator = match self.integer_grouping {
            Some(Separator::Comma) => ',',
            Some(Separator::Underscore) => '_',
            None => return number,
        };

        match number.split_once('.') {
            Some((integer, fraction)) => {
                format!("{}.{fraction}", Self::group(integer, separator, 3))
            }
            None => Self::group(&number, separator, 3),
        }
    }

    fn sign(&self, is_negative: bool) -> &'static str {
        if is_negative {
            "-"
        } else if self.print_sign {
            "+"
        } else if self.space_before_positive_num {
            " "
        } else {
            ""
        }
    }

    fn format_integer(&self, val: i64) -> Result<String, Error> {
        if self.ty.is_float_type() {
            return self.format_float(val as f64, "int");
        }
        if self.precision.is_some() {
            return Err(format_error(
                "Precision not allowed in integer format specifier",
            ));
        }

        let abs = val.unsigned_abs();
        let sign = self.sign(val < 0);
        let number = match self.ty {
            Type::Binary => ok!(self.group_binary_num(format!("{abs:b}"))),
            Type::Octal => ok!(self.group_binary_num(format!("{abs:o}"))),
            Type::LowerHex => ok!(self.group_binary_num(format!("{abs:x}"))),
            Type::UpperHex => ok!(self.group_binary_num(format!("{abs:X}"))),
            Type::Default | Type::Decimal | Type::Number => {
                self.group_decimal_num(format!("{abs}"))
            }
            Type::Char => {
                if self.has_sign_option() {
                    return Err(format_error(
                        "Sign not allowed with integer format specifier 'c'",
                    ));
                }
                let c = ok!(u32::try_from(val)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format_error("%c arg not in range(0x110000)")));
                return Ok(self.apply_padding(c.to_string(), Align::Left));
            }
            _ => return Err(self.unknown_code("int")),
        };

        Ok(self.format_number(&number, sign))
    }

    fn format_float(&self, val: f64, type_name: &str) -> Result<String, Error> {
        let sign = if val.is_nan() {
            ""
        } else {
            self.sign(val.is_sign_negative())
        };
        let upper = matches!(self.ty, Type::UpperE | Type::UpperF | Type::UpperG);

        if val.is_nan() || val.is_infinite() {
            let word = if val.is_nan() { "nan" } else { "inf" };
            let num = if upper {
                word.to_uppercase()
            } else {
                word.to_string()
            };
            return match self.ty {
                Type::Percent => Ok(self.format_number(&format!("{num}%"), sign)),
                Type::String
                | Type::Binary
                | Type::Char
                | Type::Decimal
                | Type::Octal
                | Type::LowerHex
                | Type::UpperHex => Err(self.unknown_code(type_name)),
                _ => Ok(self.format_number(&num, sign)),
            };
        }

        let abs = val.abs();
        let num = match self.ty {
            Type::Default => match self.precision {
                // without precision the shortest round-tripping repr is used
                None => {
                    let repr = float_repr(abs);
                    if repr.contains('e') {
                        repr
                    } else {
                        self.group_decimal_num(repr)
                    }
                }
                Some(_) => {
                    let mut num = if abs.classify() == FpCategory::Zero {
                        "0".to_string()
                    } else {
                        self.number_in_general_format(abs, false)
                    };
                    if !num.contains(['.', 'e', 'E']) {
                        num.push_str(".0");
                    }
                    num
                }
            },
            Type::LowerE | Type::UpperE => {
                let precision = self.precision.unwrap_or(6);
                let (mant, exp) = Self::mantissa_and_exp(abs, precision);
                let mant = self.group_decimal_num(self.fix_decimal_point(mant));
                format!("{mant}{}{exp:+03}", if upper { 'E' } else { 'e' })
            }
            Type::LowerF | Type::UpperF => {
                let prec = self.precision.unwrap_or(6);
                let num = format!("{abs:.prec$}");
                self.group_decimal_num(self.fix_decimal_point(num))
            }
            Type::LowerG | Type::UpperG | Type::Number => {
                if abs.classify() == FpCategory::Zero {
                    "0".to_string()
                } else {
                    self.number_in_general_format(abs, upper)
                }
            }
            Type::Percent => {
                let prec = self.precision.unwrap_or(6);
                let num = format!("{:.prec$}", abs * 100.0);
                format!("{}%", self.group_decimal_num(self.fix_decimal_point(num)))
            }
            Type::String
            | Type::Binary
            | Type::Char
            | Type::Decimal
            | Type::Octal
            | Type::LowerHex
            | Type::UpperHex => return Err(self.unknown_code(type_name)),
        };

        Ok(self.format_number(&num, sign))
    }

    // Prepend the given number with '0's to fill the given minimum width. The
    // `fill_width` is the number of zeros to be inserted, except if grouping option
    // (`,` or `_`) is used, in which case the zeros are also grouped according to
    // the number they're attached to, and the group character is accounted in the
    // minimum width.
    //
    // An extra '0' is prepended to avoid returning a malformed number starting with
    // a group separator.
    fn apply_zero_padding(&self, num: &str, fill_width: usize) -> String {
        let (sep, group_width) = match self.integer_grouping {
            Some(Separator::Comma) => (',', 3),
            Some(Separator::Underscore) => match self.ty {
                Type::Binary | Type::Octal | Type::LowerHex | Type::UpperHex => ('_', 4),
                _ => ('_', 3),
            },
            None => return format!("{}{num}", "0".repeat(fill_width)),
        };

        // The integer prefix up to the first separator is extended with zeros
        // and regrouped.  For example, `12` is the target prefix in `12,345`,
        // `12,345.67`, `12.345`, `12.34e+02`, and `12e+02`.
        let first_separator = if let Some(point) = num.find('.') {
            num[0..point].find(sep).unwrap_or(point)
        } else {
            num.find(sep)
                .or_else(|| num.find(['e', 'E']))
                .unwrap_or(num.len())
        };

        let (prefix, grouped_suffix) = num.split_at(first_separator);
        let zero_padded_prefix = format!("{}{prefix}", "0".repeat(fill_width));
        let grouped_prefix = Self::group(&zero_padded_prefix, sep, group_width);

        // Trim extra chars from the beginning of the padded and grouped prefix.
        let trim_index = grouped_prefix.len() - prefix.len() - fill_width;
        let grouped_prefix = &grouped_prefix[trim_index..];
        format!(
            "{}{grouped_prefix}{grouped_suffix}",
            if grouped_prefix.starts_with(sep) {
                "0"
            } else {
                ""
            }
        )
    }

    fn format_number(&self, number: &str, sign: &str) -> String {
        let radix = if self.alternate_form {
            match self.ty {
                Type::Binary => "0b",
                Type::Octal => "0o",
                Type::LowerHex => "0x",
                Type::UpperHex => "0X",
                _ => "",
            }
        } else {
            ""
        };

        let curr_width = sign.len() + radix.len() + number.chars().count();
        let fill_width = self.width.unwrap_or(0).saturating_sub(curr_width);

        match self.fill_align {
            None if self.zero_padded && fill_width > 0 => {
                format!(
                    "{sign}{radix}{}",
                    self.apply_zero_padding(number, fill_width)
                )
            }
            Some(FillAlign {
                fill,
                align: Align::AfterSign,
            }) => {
                let fill = fill.unwrap_or(if self.zero_padded { '0' } else { ' ' });
                let filler: String = std::iter::repeat(fill).take(fill_width).collect();
                format!("{sign}{radix}{filler}{number}")
            }
            _ => self.apply_padding(format!("{sign}{radix}{number}"), Align::Right),
        }
    }

    fn apply_padding(&self, text: String, default_align: Align) -> String {
        let curr_width = text.chars().count();
        let min_width = match self.width {
            Some(min_width) if curr_width < min_width => min_width,
            _ => return text,
        };
        let fill_width = min_width - curr_width;
        let zero_fill = if self.zero_padded { '0' } else { ' ' };
        let (fill_char, align) = match self.fill_align {
            Some(FillAlign { fill, align }) => (fill.unwrap_or(zero_fill), align),
            None => (zero_fill, default_align),
        };
        let fill = |n: usize| -> String { std::iter::repeat(fill_char).take(n).collect() };
        match align {
            Align::Left => format!("{text}{}", fill(fill_width)),
            Align::Right | Align::AfterSign => format!("{}{text}", fill(fill_width)),
            Align::Center => {
                let left_width = fill_width / 2;
                format!(
                    "{}{text}{}",
                    fill(left_width),
                    fill(fill_width - left_width)
                )
            }
        }
    }
}

// Cursor over the format spec, providing helper functions to the parser.
struct Cursor<'s> {
    source: &'s str,
    current_offset: usize,
}

impl<'s> Cursor<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            current_offset: 0,
        }
    }

    #[inline]
    fn rest(&self) -> &'s str {
        &self.source[self.current_offset..]
    }

    #[inline]
    fn rest_bytes(&self) -> &'s [u8] {
        &self.source.as_bytes()[self.current_offset..]
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let consumed = &self.rest()[..bytes];
        self.current_offset += bytes;
        consumed
    }

    fn advance_if(&mut self, ascii_char: u8) -> bool {
        match self.rest_bytes().first() {
            Some(next) if *next == ascii_char => {
                self.advance(1);
                true
            }
            _ => false,
        }
    }

    #[inline]
    fn is_end(&self) -> bool {
        self.source.len() == self.current_offset
    }
}

fn parse_number(cursor: &mut Cursor) -> Result<Option<usize>, Error> {
    let digit_count = cursor
        .rest_bytes()
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digit_count == 0 {
        Ok(None)
    } else {
        let num_str = cursor.advance(digit_count);
        let num = ok!(num_str.parse::<usize>().map_err(|e| {
            format_error("Too many decimal digits in format string").with_source(e)
        }));
        Ok(Some(num))
    }
}

fn parse_type(cursor: &mut Cursor) -> Result<Type, Error> {
    let t = match cursor.rest().chars().next() {
        None => return Ok(Type::Default),
        Some('b') => Type::Binary,
        Some('c') => Type::Char,
        Some('d') => Type::Decimal,
        Some('e') => Type::LowerE,
        Some('E') => Type::UpperE,
        Some('f') => Type::LowerF,
        Some('F') => Type::UpperF,
        Some('g') => Type::LowerG,
        Some('G') => Type::UpperG,
        Some('n') => Type::Number,
        Some('o') => Type::Octal,
        Some('s') => Type::String,
        Some('x') => Type::LowerHex,
        Some('X') => Type::UpperHex,
        Some('%') => Type::Percent,
        Some(c) => {
            return Err(format_error(format!("Unknown format code '{c}'")));
        }
    };
    cursor.advance(1);
    Ok(t)
}

fn parse_fill_align(cursor: &mut Cursor) -> Option<FillAlign> {
    fn align_for(c: char) -> Option<Align> {
        match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::AfterSign),
            _ => None,
        }
    }

    let mut chars = cursor.rest().chars();
    let maybe_fill = chars.next();
    let maybe_align = chars.next();

    let (consumed, fa) = match (maybe_fill, maybe_align.and_then(align_for)) {
        (Some(f), Some(align)) => (
            f.len_utf8() + 1,
            FillAlign {
                fill: Some(f),
                align,
            },
        ),
        (Some(a), None) => match align_for(a) {
            Some(align) => (1, FillAlign { fill: None, align }),
            None => return None,
        },
        (None, _) => return None,
    };

    cursor.advance(consumed);
    Some(fa)
}

fn parse_format_spec(spec: &str) -> Result<FormatSpec, Error> {
    let mut cursor = Cursor::new(spec);
    let mut print_sign = false;
    let mut space_before_positive_num = false;
    let fill_align = parse_fill_align(&mut cursor);

    if cursor.advance_if(b'+') {
        print_sign = true;
    } else if cursor.advance_if(b' ') {
        space_before_positive_num = true;
    } else {
        cursor.advance_if(b'-');
    }

    let alternate_form = cursor.advance_if(b'#');
    let mut zero_padded = cursor.advance_if(b'0');

    let mut width = ok!(parse_number(&mut cursor));
    if zero_padded && width.is_none() {
        // a lone '0' is a width of zero rather than the zero-padding flag
        zero_padded = false;
        width = Some(0);
    }

    let integer_grouping = if cursor.advance_if(b',') {
        Some(Separator::Comma)
    } else if cursor.advance_if(b'_') {
        Some(Separator::Underscore)
    } else {
        None
    };

    let precision = if cursor.advance_if(b'.') {
        match ok!(parse_number(&mut cursor)) {
            Some(precision) => Some(precision),
            None => return Err(format_error("Format specifier missing precision")),
        }
    } else {
        None
    };

    let ty = ok!(parse_type(&mut cursor));
    if !cursor.is_end() {
        return Err(format_error("Invalid format specifier"));
    }

    Ok(FormatSpec {
        fill_align,
        print_sign,
        space_before_positive_num,
        alternate_form,
        zero_padded,
        width,
        integer_grouping,
        precision,
        ty,
    })
}

/// Applies a format spec to a value the way Python's `format()` does.
///
/// ```
/// # use fstr::format_utils::format_value;
/// # use fstr::Value;
/// assert_eq!(format_value(&Value::from(10), "#10x").unwrap(), "       0xa");
/// assert_eq!(format_value(&Value::from(3.14), "!<10.10").unwrap(), "3.14!!!!!!");
/// ```
pub fn format_value(value: &Value, spec: &str) -> Result<String, Error> {
    if let ValueRepr::Object(ref obj) = value.0 {
        if let Some(rv) = obj.format(spec) {
            return rv;
        }
    }
    if let ValueRepr::Invalid(_) = value.0 {
        ok!(value.clone().validate());
    }
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    ok!(parse_format_spec(spec)).format(value)
}

fn printf_error<D: Into<std::borrow::Cow<'static, str>>>(msg: D) -> Error {
    Error::new(ErrorKind::InvalidOperation, msg)
}

fn printf_number(bytes: &[u8], pos: &mut usize) -> Option<usize> {
    let start = *pos;
    while bytes.get(*pos).map_or(false, |c| c.is_ascii_digit()) {
        *pos += 1;
    }
    std::str::from_utf8(&bytes[start..*pos]).ok()?.parse().ok()
}

/// Implements printf style formatting (`'%s: %05.1f' % (name, val)`).
///
/// A tuple supplies positional arguments, a dict supplies `%(key)s`
/// lookups and any other value is the single argument.  Each conversion
/// is mapped onto a format spec and handed to [`format_value`].
pub fn printf_format(fmt: &str, args: &Value) -> Result<String, Error> {
    let mapping = args.as_map();
    let positional = match args.0 {
        ValueRepr::Tuple(ref items) => &items[..],
        _ => std::slice::from_ref(args),
    };
    let mut next_arg = 0;
    let mut take_arg = || match positional.get(next_arg) {
        Some(value) => {
            next_arg += 1;
            Ok(value.clone())
        }
        None => Err(printf_error("not enough arguments for format string")),
    };

    let mut rv = String::with_capacity(fmt.len());
    let mut rest = fmt;
    while let Some(idx) = rest.find('%') {
        rv.push_str(&rest[..idx]);
        let spec = &rest[idx + 1..];
        let bytes = spec.as_bytes();
        let mut pos = 0;

        let named = if bytes.first() == Some(&b'(') {
            let end = ok!(spec.find(')').ok_or_else(|| printf_error("incomplete format key")));
            let map = ok!(mapping.ok_or_else(|| printf_error("format requires a mapping")));
            pos = end + 1;
            let key = &spec[1..end];
            Some(ok!(map
                .get(&Value::from(key))
                .cloned()
                .ok_or_else(|| printf_error(format!("key {key:?} missing from mapping")))))
        } else {
            None
        };

        let (mut left, mut zero, mut alternate) = (false, false, false);
        let mut sign = "";
        while let Some(&c) = bytes.get(pos) {
            match c {
                b'-' => left = true,
                b'0' => zero = true,
                b'#' => alternate = true,
                b'+' => sign = "+",
                b' ' if sign.is_empty() => sign = " ",
                b' ' => {}
                _ => break,
            }
            pos += 1;
        }

        let mut width = None;
        if bytes.get(pos) == Some(&b'*') {
            pos += 1;
            let star = ok!(take_arg());
            let star = ok!(star
                .as_i64()
                .ok_or_else(|| printf_error("* wants int")));
            left |= star < 0;
            width = Some(star.unsigned_abs() as usize);
        } else if let Some(num) = printf_number(bytes, &mut pos) {
            width = Some(num);
        }

        let mut precision = None;
        if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            if bytes.get(pos) == Some(&b'*') {
                pos += 1;
                let star = ok!(take_arg());
                precision = Some(ok!(star
                    .as_i64()
                    .ok_or_else(|| printf_error("* wants int"))).max(0) as usize);
            } else {
                precision = Some(printf_number(bytes, &mut pos).unwrap_or(0));
            }
        }
        while matches!(bytes.get(pos), Some(b'h' | b'l' | b'L')) {
            pos += 1;
        }

        let ty = match spec[pos..].chars().next() {
            Some(ty) => ty,
            None => return Err(printf_error("incomplete format")),
        };
        rest = &spec[pos + ty.len_utf8()..];
        if ty == '%' {
            rv.push('%');
            continue;
        }
        let value = match named {
            Some(value) => value,
            None => ok!(take_arg()),
        };

        let (value, is_number, spec_ty) = match ty {
            's' => (Value::from(value.to_string()), false, ""),
            'r' => (Value::from(value.to_repr()), false, ""),
            'a' => (Value::from(value.to_ascii()), false, ""),
            'c' => {
                let ch = match (value.as_i64(), value.as_str()) {
                    (Some(code), _) => u32::try_from(code).ok().and_then(char::from_u32),
                    (None, Some(s)) if s.chars().count() == 1 => s.chars().next(),
                    _ => None,
                };
                match ch {
                    Some(ch) => (Value::from(ch.to_string()), false, ""),
                    None => return Err(printf_error("%c requires int or char")),
                }
            }
            'd' | 'i' | 'u' => match value.0 {
                ValueRepr::F64(f) if f.is_finite() => (Value::from(f.trunc() as i64), true, "d"),
                ValueRepr::Bool(_) | ValueRepr::I64(_) => (value, true, "d"),
                _ => {
                    return Err(printf_error(format!(
                        "%{ty} format: a real number is required, not {}",
                        value.type_name()
                    )))
                }
            },
            'x' | 'X' | 'o' => match value.0 {
                ValueRepr::Bool(_) | ValueRepr::I64(_) => {
                    (value, true, if ty == 'o' { "o" } else if ty == 'x' { "x" } else { "X" })
                }
                _ => {
                    return Err(printf_error(format!(
                        "%{ty} format: an integer is required, not {}",
                        value.type_name()
                    )))
                }
            },
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' => match crate::value::ops::as_f64(&value) {
                Some(f) => {
                    let spec_ty = match ty {
                        'e' => "e",
                        'E' => "E",
                        'f' => "f",
                        'F' => "F",
                        'g' => "g",
                        _ => "G",
                    };
                    (Value::from(f), true, spec_ty)
                }
                None => {
                    return Err(printf_error(format!(
                        "must be real number, not {}",
                        value.type_name()
                    )))
                }
            },
            other => {
                return Err(printf_error(format!(
                    "unsupported format character {other:?}"
                )))
            }
        };

        // integer precision is a minimum digit count, not a format spec
        let mut body = match (spec_ty, precision) {
            ("d", Some(digits)) => {
                let n = value.as_i64().unwrap_or(0);
                let signed = n < 0 || !sign.is_empty();
                ok!(format_value(
                    &value,
                    &format!("{sign}0{}d", digits + signed as usize)
                ))
            }
            _ => {
                let mut spec = String::new();
                if is_number {
                    spec.push_str(sign);
                    if alternate {
                        spec.push('#');
                    }
                    if zero && !left {
                        if let Some(width) = width {
                            spec.push_str(&format!("0{width}"));
                        }
                    }
                }
                if let Some(precision) = precision {
                    spec.push_str(&format!(".{precision}"));
                }
                spec.push_str(spec_ty);
                ok!(format_value(&value, &spec))
            }
        };
        if let Some(width) = width {
            let len = body.chars().count();
            if len < width {
                let pad = " ".repeat(width - len);
                body = if left { body + &pad } else { pad + &body };
            }
        }
        rv.push_str(&body);
    }
    rv.push_str(rest);

    if mapping.is_none() && next_arg < positional.len() {
        return Err(printf_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(rv)
}

/// Applies a conversion (`!s`, `!r` or `!a`) to a value.
pub fn apply_conversion(value: Value, conversion: Conversion) -> Value {
    match conversion {
        Conversion::Str => match value.0 {
            ValueRepr::String(_) => value,
            _ => Value::from(value.to_string()),
        },
        Conversion::Repr => Value::from(value.to_repr()),
        Conversion::Ascii => Value::from(value.to_ascii()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn fmt(value: impl Into<Value>, spec: &str) -> String {
        format_value(&value.into(), spec).unwrap()
    }

    #[test]
    fn test_parse_format_spec() {
        let spec = parse_format_spec("*^+#012,.3f").unwrap();
        assert_eq!(
            spec.fill_align,
            Some(FillAlign {
                fill: Some('*'),
                align: Align::Center
            })
        );
        assert!(spec.print_sign);
        assert!(spec.alternate_form);
        assert!(spec.zero_padded);
        assert_eq!(spec.width, Some(12));
        assert_eq!(spec.integer_grouping, Some(Separator::Comma));
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.ty, Type::LowerF);
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt(1234, "10"), "      1234");
        assert_eq!(fmt(1234, "<10"), "1234      ");
        assert_eq!(fmt(-1234, "010"), "-000001234");
        assert_eq!(fmt(-42, "=+8"), "-     42");
        assert_eq!(fmt(1234567, ","), "1,234,567");
        assert_eq!(fmt(255, "#b"), "0b11111111");
        assert_eq!(fmt(255, "_b"), "1111_1111");
        assert_eq!(fmt(255, "X"), "FF");
        assert_eq!(fmt(65, "c"), "A");
        assert_eq!(fmt(10, ".2f"), "10.00");
        assert_eq!(fmt(42, " d"), " 42");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt(1.2345, "4.2"), " 1.2");
        assert_eq!(fmt(12.34567, "10.4"), "     12.35");
        assert_eq!(fmt(3.14, "10.10"), "      3.14");
        assert_eq!(fmt(3.0, ".3"), "3.0");
        assert_eq!(fmt(1e20, "10"), "     1e+20");
        assert_eq!(fmt(3.14159, ".2f"), "3.14");
        assert_eq!(fmt(1234.5, ",.1f"), "1,234.5");
        assert_eq!(fmt(0.25, ".1%"), "25.0%");
        assert_eq!(fmt(12345.678, ".2e"), "1.23e+04");
        assert_eq!(fmt(0.00001234, "g"), "1.234e-05");
        assert_eq!(fmt(-1.5, "+.1f"), "-1.5");
        assert_eq!(fmt(f64::INFINITY, "F"), "INF");
    }

    #[test]
    fn test_strings() {
        assert_eq!(fmt("3.14", "10.10"), "3.14      ");
        assert_eq!(fmt("abc", ">5"), "  abc");
        assert_eq!(fmt("abc", "*^7"), "**abc**");
        assert_eq!(fmt("abcdef", ".2"), "ab");
        assert_eq!(fmt("äöü", "5"), "äöü  ");
    }

    #[test]
    fn test_bools() {
        assert_eq!(fmt(true, ""), "True");
        assert_eq!(fmt(true, ">5"), "    1");
        assert_eq!(fmt(false, "d"), "0");
    }

    #[test]
    fn test_errors() {
        let err = format_value(&Value::from(1000), "j").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatError);
        assert_eq!(
            err.to_string(),
            "could not format value: Unknown format code 'j'"
        );
        let err = format_value(&Value::from("x"), "d").unwrap_err();
        assert_eq!(
            err.detail(),
            Some("Unknown format code 'd' for object of type 'str'")
        );
        let err = format_value(&Value::from(1), ".2").unwrap_err();
        assert_eq!(
            err.detail(),
            Some("Precision not allowed in integer format specifier")
        );
        let err = format_value(&Value::from(vec![1]), ">3").unwrap_err();
        assert_eq!(
            err.detail(),
            Some("unsupported format string passed to list.__format__")
        );
        assert_eq!(fmt(vec![1], ""), "[1]");
    }

    #[test]
    fn test_conversions() {
        let v = Value::from("ä");
        assert_eq!(apply_conversion(v.clone(), Conversion::Str).to_string(), "ä");
        assert_eq!(apply_conversion(v.clone(), Conversion::Repr).to_string(), "'ä'");
        assert_eq!(apply_conversion(v, Conversion::Ascii).to_string(), "'\\xe4'");
    }
}
