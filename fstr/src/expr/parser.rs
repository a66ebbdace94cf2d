use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::expr::ast::{self, Spanned};
use crate::expr::lexer::Tokenizer;
use crate::expr::tokens::{Span, Token};
use crate::value::Value;

const MAX_RECURSION: usize = 150;
const KEYWORDS: [&str; 17] = [
    "and", "or", "not", "in", "is", "if", "else", "for", "lambda", "None", "True", "False",
    "def", "class", "return", "yield", "await",
];

fn unexpected<D: fmt::Display>(unexpected: D, expected: &str) -> Error {
    Error::new(
        ErrorKind::SyntaxError,
        format!("unexpected {unexpected}, expected {expected}"),
    )
}

fn unexpected_eof(expected: &str) -> Error {
    unexpected("end of input", expected)
}

fn make_const(value: Value, span: Span) -> ast::Expr {
    ast::Expr::Const(Spanned::new(ast::Const { value }, span))
}

fn syntax_error(msg: Cow<'static, str>) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

macro_rules! syntax_error {
    ($msg:expr) => {{
        return Err(syntax_error(Cow::Borrowed($msg)));
    }};
    ($msg:expr, $($tt:tt)*) => {{
        return Err(syntax_error(Cow::Owned(format!($msg, $($tt)*))));
    }};
}

macro_rules! expect_token {
    ($parser:expr, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some(rv) => rv,
            None => return Err(unexpected_eof($expectation)),
        }
    }};
    ($parser:expr, $match:pat, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some((token @ $match, span)) => (token, span),
            Some((token, _)) => return Err(unexpected(token, $expectation)),
            None => return Err(unexpected_eof($expectation)),
        }
    }};
    ($parser:expr, $match:pat => $target:expr, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some(($match, span)) => ($target, span),
            Some((token, _)) => return Err(unexpected(token, $expectation)),
            None => return Err(unexpected_eof($expectation)),
        }
    }};
}

macro_rules! matches_token {
    ($p:expr, $match:pat) => {
        match $p.stream.current() {
            Err(err) => return Err(err),
            Ok(Some(($match, _))) => true,
            _ => false,
        }
    };
}

macro_rules! skip_token {
    ($p:expr, $match:pat) => {
        match $p.stream.current() {
            Err(err) => return Err(err),
            Ok(Some(($match, _))) => {
                let _ = $p.stream.next();
                true
            }
            _ => false,
        }
    };
}

struct TokenStream<'a> {
    tokenizer: Tokenizer<'a>,
    current: Option<Result<(Token<'a>, Span), Error>>,
    last_span: Span,
}

impl<'a> TokenStream<'a> {
    /// Tokenize an expression
    pub fn new(source: &'a str) -> TokenStream<'a> {
        let mut tokenizer = Tokenizer::new(source);
        let current = tokenizer.next_token().transpose();
        TokenStream {
            tokenizer,
            current,
            last_span: Span::default(),
        }
    }

    /// Advance the stream.
    pub fn next(&mut self) -> Result<Option<(Token<'a>, Span)>, Error> {
        let rv = self.current.take();
        self.current = self.tokenizer.next_token().transpose();
        if let Some(Ok((_, span))) = rv {
            self.last_span = span;
        }
        rv.transpose()
    }

    /// Look at the current token
    pub fn current(&mut self) -> Result<Option<(&Token<'a>, Span)>, Error> {
        match self.current {
            Some(Ok(ref tok)) => Ok(Some((&tok.0, tok.1))),
            Some(Err(_)) => match self.current.take() {
                Some(Err(err)) => Err(err),
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Expands the span
    #[inline(always)]
    pub fn expand_span(&self, mut span: Span) -> Span {
        span.end_offset = self.last_span.end_offset;
        span
    }

    /// Returns the current span.
    #[inline(always)]
    pub fn current_span(&self) -> Span {
        if let Some(Ok((_, span))) = self.current {
            span
        } else {
            self.last_span
        }
    }

    /// Returns the last seen span.
    #[inline(always)]
    pub fn last_span(&self) -> Span {
        self.last_span
    }
}

struct Parser<'a> {
    stream: TokenStream<'a>,
    depth: usize,
}

macro_rules! binop {
    ($func:ident, $next:ident, { $($tok:tt)* }) => {
        fn $func(&mut self) -> Result<ast::Expr, Error> {
            let span = self.stream.current_span();
            let mut left = ok!(self.$next());
            loop {
                let op = match ok!(self.stream.current()) {
                    $($tok)*
                    _ => break,
                };
                ok!(self.stream.next());
                let right = ok!(self.$next());
                left = ast::Expr::BinOp(Spanned::new(
                    ast::BinOp { op, left, right, },
                    self.stream.expand_span(span),
                ));
            }
            Ok(left)
        }
    };
}

macro_rules! unaryop {
    ($func:ident, $next:ident, { $($tok:tt)* }) => {
        fn $func(&mut self) -> Result<ast::Expr, Error> {
            let span = self.stream.current_span();
            let op = match ok!(self.stream.current()) {
                $($tok)*
                _ => return self.$next()
            };
            ok!(self.stream.next());
            Ok(ast::Expr::UnaryOp(Spanned::new(
                ast::UnaryOp {
                    op,
                    expr: ok!(with_recursion_guard!(self, self.$func())),
                },
                self.stream.expand_span(span),
            )))
        }
    };
}

macro_rules! with_recursion_guard {
    ($parser:expr, $expr:expr) => {{
        $parser.depth += 1;
        if $parser.depth > MAX_RECURSION {
            return Err(syntax_error(Cow::Borrowed(
                "expression exceeds maximum recursion limits",
            )));
        }
        let rv = $expr;
        $parser.depth -= 1;
        rv
    }};
}

impl<'a> Parser<'a> {
    /// Creates a new parser.
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser {
            stream: TokenStream::new(source),
            depth: 0,
        }
    }

    /// Parses an expression and asserts that there is no more input after it.
    ///
    /// A bare tuple such as `1, 2` is accepted at this level.
    pub fn parse_standalone_expr(&mut self) -> Result<ast::Expr, Error> {
        self.parse_expr_list()
            .and_then(|result| {
                if ok!(self.stream.next()).is_some() {
                    syntax_error!("unexpected input after expression")
                } else {
                    Ok(result)
                }
            })
            .map_err(|err| self.attach_location_to_error(err))
    }

    fn parse_expr_list(&mut self) -> Result<ast::Expr, Error> {
        let span = self.stream.current_span();
        let expr = ok!(self.parse_expr());
        if !matches_token!(self, Token::Comma) {
            return Ok(expr);
        }
        let mut items = vec![expr];
        while skip_token!(self, Token::Comma) {
            if ok!(self.stream.current()).is_none() {
                break;
            }
            items.push(ok!(self.parse_expr()));
        }
        Ok(ast::Expr::Seq(Spanned::new(
            ast::Seq {
                kind: ast::SeqKind::Tuple,
                items,
            },
            self.stream.expand_span(span),
        )))
    }

    fn parse_expr(&mut self) -> Result<ast::Expr, Error> {
        with_recursion_guard!(self, {
            if matches_token!(self, Token::Ident("lambda")) {
                self.parse_lambda()
            } else {
                self.parse_ifexpr()
            }
        })
    }

    fn parse_lambda(&mut self) -> Result<ast::Expr, Error> {
        let (_, span) = expect_token!(self, Token::Ident("lambda"), "lambda");
        let mut params: Vec<ast::Param> = Vec::new();
        loop {
            if skip_token!(self, Token::Colon) {
                break;
            }
            if !params.is_empty() {
                expect_token!(self, Token::Comma, "`,`");
                if skip_token!(self, Token::Colon) {
                    break;
                }
            }
            let (name, _) = expect_token!(self, Token::Ident(name) => name, "identifier");
            if KEYWORDS.contains(&name) {
                syntax_error!("invalid parameter name '{}'", name);
            }
            if params.iter().any(|x| x.name == name) {
                syntax_error!("duplicate argument '{}' in lambda", name);
            }
            let default = if skip_token!(self, Token::Assign) {
                Some(ok!(self.parse_expr()))
            } else if params.iter().any(|x| x.default.is_some()) {
                syntax_error!("non-default argument follows default argument");
            } else {
                None
            };
            params.push(ast::Param {
                name: name.to_string(),
                default,
            });
        }
        let body = ok!(self.parse_expr());
        Ok(ast::Expr::Lambda(Spanned::new(
            ast::Lambda {
                params,
                body: Arc::new(body),
            },
            self.stream.expand_span(span),
        )))
    }

    fn parse_ifexpr(&mut self) -> Result<ast::Expr, Error> {
        let span = self.stream.current_span();
        let expr = ok!(self.parse_or());
        if !skip_token!(self, Token::Ident("if")) {
            return Ok(expr);
        }
        let test_expr = ok!(self.parse_or());
        expect_token!(self, Token::Ident("else"), "else");
        let false_expr = ok!(self.parse_expr());
        Ok(ast::Expr::IfExpr(Spanned::new(
            ast::IfExpr {
                test_expr,
                true_expr: expr,
                false_expr,
            },
            self.stream.expand_span(span),
        )))
    }

    binop!(parse_or, parse_and, {
        Some((Token::Ident("or"), _)) => ast::BinOpKind::ScOr,
    });
    binop!(parse_and, parse_not, {
        Some((Token::Ident("and"), _)) => ast::BinOpKind::ScAnd,
    });
    unaryop!(parse_not, parse_compare, {
        Some((Token::Ident("not"), _)) => ast::UnaryOpKind::Not,
    });

    fn parse_compare(&mut self) -> Result<ast::Expr, Error> {
        let span = self.stream.current_span();
        let left = ok!(self.parse_bitor());
        let mut ops = Vec::new();
        loop {
            let op = match ok!(self.stream.current()) {
                Some((Token::Eq, _)) => ast::CmpOp::Eq,
                Some((Token::Ne, _)) => ast::CmpOp::Ne,
                Some((Token::Lt, _)) => ast::CmpOp::Lt,
                Some((Token::Lte, _)) => ast::CmpOp::Lte,
                Some((Token::Gt, _)) => ast::CmpOp::Gt,
                Some((Token::Gte, _)) => ast::CmpOp::Gte,
                Some((Token::Ident("in"), _)) => ast::CmpOp::In,
                Some((Token::Ident("not"), _)) => {
                    ok!(self.stream.next());
                    expect_token!(self, Token::Ident("in"), "in");
                    ops.push((ast::CmpOp::NotIn, ok!(self.parse_bitor())));
                    continue;
                }
                Some((Token::Ident("is"), _)) => {
                    ok!(self.stream.next());
                    let op = if skip_token!(self, Token::Ident("not")) {
                        ast::CmpOp::IsNot
                    } else {
                        ast::CmpOp::Is
                    };
                    ops.push((op, ok!(self.parse_bitor())));
                    continue;
                }
                _ => break,
            };
            ok!(self.stream.next());
            ops.push((op, ok!(self.parse_bitor())));
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(ast::Expr::Compare(Spanned::new(
                ast::Compare { left, ops },
                self.stream.expand_span(span),
            )))
        }
    }

    binop!(parse_bitor, parse_bitxor, {
        Some((Token::Pipe, _)) => ast::BinOpKind::BitOr,
    });
    binop!(parse_bitxor, parse_bitand, {
        Some((Token::Caret, _)) => ast::BinOpKind::BitXor,
    });
    binop!(parse_bitand, parse_shift, {
        Some((Token::Ampersand, _)) => ast::BinOpKind::BitAnd,
    });
    binop!(parse_shift, parse_math1, {
        Some((Token::ShiftLeft, _)) => ast::BinOpKind::ShiftLeft,
        Some((Token::ShiftRight, _)) => ast::BinOpKind::ShiftRight,
    });
    binop!(parse_math1, parse_math2, {
        Some((Token::Plus, _)) => ast::BinOpKind::Add,
        Some((Token::Minus, _)) => ast::BinOpKind::Sub,
    });
    binop!(parse_math2, parse_unary, {
        Some((Token::Mul, _)) => ast::BinOpKind::Mul,
        Some((Token::Div, _)) => ast::BinOpKind::Div,
        Some((Token::FloorDiv, _)) => ast::BinOpKind::FloorDiv,
        Some((Token::Mod, _)) => ast::BinOpKind::Rem,
        Some((Token::MatMul, _)) => syntax_error!("the `@` operator is not supported"),
    });
    unaryop!(parse_unary, parse_power, {
        Some((Token::Minus, _)) => ast::UnaryOpKind::Neg,
        Some((Token::Plus, _)) => ast::UnaryOpKind::Pos,
        Some((Token::Tilde, _)) => ast::UnaryOpKind::Invert,
    });

    fn parse_power(&mut self) -> Result<ast::Expr, Error> {
        let span = self.stream.current_span();
        let expr = ok!(self.parse_primary());
        let left = ok!(self.parse_postfix(expr, span));
        if !skip_token!(self, Token::Pow) {
            return Ok(left);
        }
        // right associative and binds tighter than a unary operator on the left
        let right = ok!(with_recursion_guard!(self, self.parse_unary()));
        Ok(ast::Expr::BinOp(Spanned::new(
            ast::BinOp {
                op: ast::BinOpKind::Pow,
                left,
                right,
            },
            self.stream.expand_span(span),
        )))
    }

    fn parse_postfix(&mut self, expr: ast::Expr, span: Span) -> Result<ast::Expr, Error> {
        let mut expr = expr;
        loop {
            match ok!(self.stream.current()) {
                Some((Token::Dot, _)) => {
                    ok!(self.stream.next());
                    let (name, _) = expect_token!(self, Token::Ident(name) => name, "identifier");
                    expr = ast::Expr::GetAttr(Spanned::new(
                        ast::GetAttr {
                            name: name.to_string(),
                            expr,
                        },
                        self.stream.expand_span(span),
                    ));
                }
                Some((Token::BracketOpen, _)) => {
                    ok!(self.stream.next());
                    expr = ok!(self.parse_subscript(expr, span));
                }
                Some((Token::ParenOpen, _)) => {
                    let args = ok!(self.parse_args());
                    expr = ast::Expr::Call(Spanned::new(
                        ast::Call { expr, args },
                        self.stream.expand_span(span),
                    ));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_subscript(&mut self, expr: ast::Expr, span: Span) -> Result<ast::Expr, Error> {
        let mut start = None;
        let mut stop = None;
        let mut step = None;
        let mut is_slice = false;

        if !matches_token!(self, Token::Colon) {
            start = Some(ok!(self.parse_expr_list()));
        }
        if skip_token!(self, Token::Colon) {
            is_slice = true;
            if !matches_token!(self, Token::BracketClose | Token::Colon) {
                stop = Some(ok!(self.parse_expr()));
            }
            if skip_token!(self, Token::Colon) && !matches_token!(self, Token::BracketClose) {
                step = Some(ok!(self.parse_expr()));
            }
        }
        expect_token!(self, Token::BracketClose, "`]`");

        Ok(if !is_slice {
            ast::Expr::GetItem(Spanned::new(
                ast::GetItem {
                    expr,
                    subscript_expr: ok!(
                        start.ok_or_else(|| syntax_error(Cow::Borrowed("empty subscript")))
                    ),
                },
                self.stream.expand_span(span),
            ))
        } else {
            ast::Expr::Slice(Spanned::new(
                ast::Slice {
                    expr,
                    start,
                    stop,
                    step,
                },
                self.stream.expand_span(span),
            ))
        })
    }

    fn parse_args(&mut self) -> Result<Vec<ast::CallArg>, Error> {
        let mut args = Vec::new();
        let mut has_kwargs = false;

        enum ArgType {
            Regular,
            Splat,
            KwargsSplat,
        }

        expect_token!(self, Token::ParenOpen, "`(`");
        loop {
            if skip_token!(self, Token::ParenClose) {
                break;
            }
            if !args.is_empty() {
                expect_token!(self, Token::Comma, "`,`");
                if skip_token!(self, Token::ParenClose) {
                    break;
                }
            }

            let arg_type = if skip_token!(self, Token::Pow) {
                ArgType::KwargsSplat
            } else if skip_token!(self, Token::Mul) {
                ArgType::Splat
            } else {
                ArgType::Regular
            };

            let span = self.stream.current_span();
            let expr = ok!(self.parse_expr());

            match arg_type {
                ArgType::Regular => match expr {
                    ast::Expr::Var(ref var) if skip_token!(self, Token::Assign) => {
                        has_kwargs = true;
                        args.push(ast::CallArg::Kwarg(var.id.clone(), ok!(self.parse_expr())));
                    }
                    _ if args.is_empty() && matches_token!(self, Token::Ident("for")) => {
                        let generator = ok!(self.parse_comprehension(
                            ast::CompKind::Generator,
                            ast::CompElement::Single(expr),
                            span
                        ));
                        args.push(ast::CallArg::Pos(generator));
                        expect_token!(self, Token::ParenClose, "`)`");
                        break;
                    }
                    _ if has_kwargs => {
                        syntax_error!("positional argument follows keyword argument");
                    }
                    _ => args.push(ast::CallArg::Pos(expr)),
                },
                ArgType::Splat => args.push(ast::CallArg::PosSplat(expr)),
                ArgType::KwargsSplat => {
                    args.push(ast::CallArg::KwargSplat(expr));
                    has_kwargs = true;
                }
            }

            if args.len() > 2000 {
                syntax_error!("too many arguments in function call")
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<ast::Expr, Error> {
        with_recursion_guard!(self, self.parse_primary_impl())
    }

    fn parse_primary_impl(&mut self) -> Result<ast::Expr, Error> {
        let (token, span) = expect_token!(self, "expression");
        macro_rules! const_val {
            ($expr:expr) => {
                make_const(Value::from($expr), self.stream.expand_span(span))
            };
        }

        match token {
            Token::Ident("True") => Ok(const_val!(true)),
            Token::Ident("False") => Ok(const_val!(false)),
            Token::Ident("None") => Ok(const_val!(())),
            Token::Ident(name) if KEYWORDS.contains(&name) => {
                syntax_error!("unexpected keyword '{}'", name)
            }
            Token::Ident(name) => Ok(ast::Expr::Var(Spanned::new(
                ast::Var {
                    id: name.to_string(),
                },
                span,
            ))),
            Token::Str(mut buf) => {
                while matches_token!(self, Token::Str(_)) {
                    if let Some((Token::Str(s), _)) = ok!(self.stream.next()) {
                        buf.push_str(&s);
                    }
                }
                Ok(const_val!(buf))
            }
            Token::Int(val) => match i64::try_from(val) {
                Ok(val) => Ok(const_val!(val)),
                Err(_) => syntax_error!("integer literal too large"),
            },
            Token::Float(val) => Ok(const_val!(val)),
            Token::ParenOpen => self.parse_tuple_or_expression(span),
            Token::BracketOpen => self.parse_list_expr(span),
            Token::BraceOpen => self.parse_dict_or_set_expr(span),
            token => syntax_error!("unexpected {}", token),
        }
    }

    fn parse_seq_items(
        &mut self,
        first: ast::Expr,
        end: fn(&Token<'_>) -> bool,
        closing: &'static str,
    ) -> Result<Vec<ast::Expr>, Error> {
        let mut items = vec![first];
        loop {
            match ok!(self.stream.next()) {
                Some((ref token, _)) if end(token) => break,
                Some((Token::Comma, _)) => {}
                Some((token, _)) => return Err(unexpected(token, closing)),
                None => return Err(unexpected_eof(closing)),
            }
            if let Some((token, _)) = ok!(self.stream.current()) {
                if end(token) {
                    ok!(self.stream.next());
                    break;
                }
            }
            items.push(ok!(self.parse_expr()));
        }
        Ok(items)
    }

    fn parse_list_expr(&mut self, span: Span) -> Result<ast::Expr, Error> {
        if skip_token!(self, Token::BracketClose) {
            return Ok(self.make_seq(ast::SeqKind::List, Vec::new(), span));
        }
        let first = ok!(self.parse_expr());
        if matches_token!(self, Token::Ident("for")) {
            let rv = ok!(self.parse_comprehension(
                ast::CompKind::List,
                ast::CompElement::Single(first),
                span
            ));
            expect_token!(self, Token::BracketClose, "`]`");
            return Ok(rv);
        }
        let items = ok!(self.parse_seq_items(
            first,
            |t| matches!(t, Token::BracketClose),
            "`,` or `]`"
        ));
        Ok(self.make_seq(ast::SeqKind::List, items, span))
    }

    fn parse_dict_or_set_expr(&mut self, span: Span) -> Result<ast::Expr, Error> {
        if skip_token!(self, Token::BraceClose) {
            return Ok(ast::Expr::Dict(Spanned::new(
                ast::Dict { pairs: Vec::new() },
                self.stream.expand_span(span),
            )));
        }

        let first = ok!(self.parse_expr());
        if !skip_token!(self, Token::Colon) {
            if matches_token!(self, Token::Ident("for")) {
                let rv = ok!(self.parse_comprehension(
                    ast::CompKind::Set,
                    ast::CompElement::Single(first),
                    span
                ));
                expect_token!(self, Token::BraceClose, "`}`");
                return Ok(rv);
            }
            let items = ok!(self.parse_seq_items(
                first,
                |t| matches!(t, Token::BraceClose),
                "`,` or `}`"
            ));
            return Ok(self.make_seq(ast::SeqKind::Set, items, span));
        }

        let value = ok!(self.parse_expr());
        if matches_token!(self, Token::Ident("for")) {
            let rv = ok!(self.parse_comprehension(
                ast::CompKind::Dict,
                ast::CompElement::Pair(first, value),
                span
            ));
            expect_token!(self, Token::BraceClose, "`}`");
            return Ok(rv);
        }

        let mut pairs = vec![(first, value)];
        loop {
            if skip_token!(self, Token::BraceClose) {
                break;
            }
            expect_token!(self, Token::Comma, "`,` or `}`");
            if skip_token!(self, Token::BraceClose) {
                break;
            }
            let key = ok!(self.parse_expr());
            expect_token!(self, Token::Colon, "`:`");
            pairs.push((key, ok!(self.parse_expr())));
        }
        Ok(ast::Expr::Dict(Spanned::new(
            ast::Dict { pairs },
            self.stream.expand_span(span),
        )))
    }

    fn parse_tuple_or_expression(&mut self, span: Span) -> Result<ast::Expr, Error> {
        if skip_token!(self, Token::ParenClose) {
            return Ok(self.make_seq(ast::SeqKind::Tuple, Vec::new(), span));
        }
        let expr = ok!(self.parse_expr());
        if matches_token!(self, Token::Ident("for")) {
            let rv = ok!(self.parse_comprehension(
                ast::CompKind::Generator,
                ast::CompElement::Single(expr),
                span
            ));
            expect_token!(self, Token::ParenClose, "`)`");
            return Ok(rv);
        }
        if matches_token!(self, Token::Comma) {
            let items = ok!(self.parse_seq_items(
                expr,
                |t| matches!(t, Token::ParenClose),
                "`,` or `)`"
            ));
            return Ok(self.make_seq(ast::SeqKind::Tuple, items, span));
        }
        expect_token!(self, Token::ParenClose, "`)`");
        Ok(expr)
    }

    fn make_seq(&self, kind: ast::SeqKind, items: Vec<ast::Expr>, span: Span) -> ast::Expr {
        ast::Expr::Seq(Spanned::new(
            ast::Seq { kind, items },
            self.stream.expand_span(span),
        ))
    }

    fn parse_comprehension(
        &mut self,
        kind: ast::CompKind,
        element: ast::CompElement,
        span: Span,
    ) -> Result<ast::Expr, Error> {
        let mut generators = Vec::new();
        while skip_token!(self, Token::Ident("for")) {
            let target = ok!(self.parse_target_list());
            expect_token!(self, Token::Ident("in"), "in");
            let iter = ok!(self.parse_or());
            let mut conditions = Vec::new();
            while skip_token!(self, Token::Ident("if")) {
                conditions.push(ok!(self.parse_or()));
            }
            generators.push(ast::CompFor {
                target,
                iter,
                conditions,
            });
        }
        Ok(ast::Expr::Comprehension(Spanned::new(
            ast::Comprehension {
                kind,
                element,
                generators,
            },
            self.stream.expand_span(span),
        )))
    }

    fn parse_target_list(&mut self) -> Result<ast::Target, Error> {
        let first = ok!(self.parse_target());
        if !matches_token!(self, Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while skip_token!(self, Token::Comma) {
            if matches_token!(self, Token::Ident("in")) {
                break;
            }
            items.push(ok!(self.parse_target()));
        }
        Ok(ast::Target::Tuple(items))
    }

    fn parse_target(&mut self) -> Result<ast::Target, Error> {
        with_recursion_guard!(self, {
            if skip_token!(self, Token::ParenOpen) {
                let rv = ok!(self.parse_target_list());
                expect_token!(self, Token::ParenClose, "`)`");
                Ok(rv)
            } else {
                let span = self.stream.current_span();
                let expr = ok!(self.parse_primary());
                match expr {
                    ast::Expr::Var(var) => Ok(ast::Target::Name(var.id.clone())),
                    other => Err(syntax_error(Cow::Owned(format!(
                        "cannot assign to {}",
                        other.description()
                    )))
                    .with_offset(span.start_offset)),
                }
            }
        })
    }

    fn attach_location_to_error(&mut self, mut err: Error) -> Error {
        err.set_offset_if_missing(self.stream.last_span().start_offset);
        err
    }
}

/// Parses a standalone expression.
pub fn parse_expr(source: &str) -> Result<ast::Expr, Error> {
    Parser::new(source).parse_standalone_expr()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ast::Expr {
        match parse_expr(source) {
            Ok(expr) => expr,
            Err(err) => panic!("failed to parse {source:?}: {err}"),
        }
    }

    #[test]
    fn test_precedence() {
        match parse_ok("1 + 2 * 3") {
            ast::Expr::BinOp(op) => {
                assert!(matches!(op.op, ast::BinOpKind::Add));
                assert!(matches!(op.right, ast::Expr::BinOp(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_ok("-2 ** 2") {
            ast::Expr::UnaryOp(op) => assert!(matches!(op.expr, ast::Expr::BinOp(_))),
            other => panic!("unexpected {other:?}"),
        }
        match parse_ok("not a == b") {
            ast::Expr::UnaryOp(op) => assert!(matches!(op.expr, ast::Expr::Compare(_))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_chained_compare() {
        match parse_ok("a < b <= c not in d is not e") {
            ast::Expr::Compare(cmp) => {
                let ops: Vec<_> = cmp.ops.iter().map(|x| x.0).collect();
                assert_eq!(
                    ops,
                    vec![
                        ast::CmpOp::Lt,
                        ast::CmpOp::Lte,
                        ast::CmpOp::NotIn,
                        ast::CmpOp::IsNot
                    ]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_displays() {
        assert!(matches!(parse_ok("()"), ast::Expr::Seq(ref s) if s.kind == ast::SeqKind::Tuple));
        assert!(matches!(parse_ok("(1,)"), ast::Expr::Seq(ref s) if s.items.len() == 1));
        assert!(matches!(parse_ok("(1)"), ast::Expr::Const(_)));
        assert!(matches!(parse_ok("1, 2"), ast::Expr::Seq(ref s) if s.items.len() == 2));
        assert!(matches!(parse_ok("[1, 2,]"), ast::Expr::Seq(ref s) if s.items.len() == 2));
        assert!(matches!(parse_ok("{1, 2}"), ast::Expr::Seq(ref s) if s.kind == ast::SeqKind::Set));
        assert!(matches!(parse_ok("{}"), ast::Expr::Dict(_)));
        assert!(matches!(parse_ok("{'a': 1, 'b': 2}"), ast::Expr::Dict(ref d) if d.pairs.len() == 2));
    }

    #[test]
    fn test_comprehensions() {
        for (source, kind) in [
            ("[x for x in y]", ast::CompKind::List),
            ("{x for x in y if x}", ast::CompKind::Set),
            ("{k: v for k, v in d.items()}", ast::CompKind::Dict),
            ("(x for (a, b) in y for x in a)", ast::CompKind::Generator),
        ] {
            match parse_ok(source) {
                ast::Expr::Comprehension(comp) => assert_eq!(comp.kind, kind),
                other => panic!("unexpected {other:?}"),
            }
        }
        match parse_ok("sum(x for x in y)") {
            ast::Expr::Call(call) => assert_eq!(call.args.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lambda() {
        match parse_ok("lambda a, b=2: a + b") {
            ast::Expr::Lambda(lambda) => {
                assert_eq!(lambda.params.len(), 2);
                assert!(lambda.params[1].default.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_ok("lambda: 1"), ast::Expr::Lambda(_)));
    }

    #[test]
    fn test_strings_concatenate() {
        match parse_ok("'a' \"b\" '''c'''") {
            ast::Expr::Const(c) => assert_eq!(c.value, Value::from("abc")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_errors() {
        for source in [
            "1 +",
            "(1",
            "[1, 2",
            "a b",
            "a @ b",
            "lambda x x",
            "f(a=1, 2)",
            "x if y",
            "9223372036854775808",
            "for",
            "[x for 1 in y]",
        ] {
            let err = parse_expr(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SyntaxError, "{source}");
            assert!(err.offset().is_some(), "{source}");
        }
    }

    #[test]
    fn test_recursion_limit() {
        let source = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        let err = parse_expr(&source).unwrap_err();
        assert!(err.detail().unwrap().contains("recursion"));
    }
}
