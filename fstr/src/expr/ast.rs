use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::expr::tokens::Span;
use crate::value::Value;

/// Container for nodes with location info.
///
/// This container fulfills two purposes: it adds location information
/// to nodes, but it also ensures the nodes is heap allocated.  The
/// latter is useful to ensure that enum variants do not cause the enum
/// to become too large.
pub struct Spanned<T> {
    inner: Box<(T, Span)>,
}

impl<T> Spanned<T> {
    /// Creates a new spanned node.
    pub fn new(node: T, span: Span) -> Spanned<T> {
        Spanned {
            inner: Box::new((node, span)),
        }
    }

    /// Accesses the span.
    pub fn span(&self) -> Span {
        self.inner.1
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ok!(fmt::Debug::fmt(&self.inner.0, f));
        write!(f, "{:?}", self.inner.1)
    }
}

/// An expression node.
#[allow(clippy::enum_variant_names)]
#[derive(Debug)]
pub enum Expr {
    Var(Spanned<Var>),
    Const(Spanned<Const>),
    Seq(Spanned<Seq>),
    Dict(Spanned<Dict>),
    UnaryOp(Spanned<UnaryOp>),
    BinOp(Spanned<BinOp>),
    Compare(Spanned<Compare>),
    IfExpr(Spanned<IfExpr>),
    GetAttr(Spanned<GetAttr>),
    GetItem(Spanned<GetItem>),
    Slice(Spanned<Slice>),
    Call(Spanned<Call>),
    Lambda(Spanned<Lambda>),
    Comprehension(Spanned<Comprehension>),
}

impl Expr {
    /// Returns the span of the node.
    pub fn span(&self) -> Span {
        match self {
            Expr::Var(s) => s.span(),
            Expr::Const(s) => s.span(),
            Expr::Seq(s) => s.span(),
            Expr::Dict(s) => s.span(),
            Expr::UnaryOp(s) => s.span(),
            Expr::BinOp(s) => s.span(),
            Expr::Compare(s) => s.span(),
            Expr::IfExpr(s) => s.span(),
            Expr::GetAttr(s) => s.span(),
            Expr::GetItem(s) => s.span(),
            Expr::Slice(s) => s.span(),
            Expr::Call(s) => s.span(),
            Expr::Lambda(s) => s.span(),
            Expr::Comprehension(s) => s.span(),
        }
    }

    /// Returns a short description of the node for error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Expr::Var(_) => "name",
            Expr::Const(_) => "literal",
            Expr::Seq(_) => "display",
            Expr::Dict(_) => "dict display",
            Expr::UnaryOp(_) | Expr::BinOp(_) => "expression",
            Expr::Compare(_) => "comparison",
            Expr::IfExpr(_) => "conditional expression",
            Expr::GetAttr(_) => "attribute",
            Expr::GetItem(_) | Expr::Slice(_) => "subscript",
            Expr::Call(_) => "function call",
            Expr::Lambda(_) => "lambda",
            Expr::Comprehension(_) => "comprehension",
        }
    }

    /// Collects all names this expression refers to.
    ///
    /// Names bound inside the expression (lambda parameters, comprehension
    /// targets) are included as well.  This is used by closures to decide
    /// which values to capture, where capturing too much is harmless.
    pub fn referenced_names<'a>(&'a self, rv: &mut BTreeSet<&'a str>) {
        fn opt<'a>(expr: &'a Option<Expr>, rv: &mut BTreeSet<&'a str>) {
            if let Some(expr) = expr {
                expr.referenced_names(rv);
            }
        }

        match self {
            Expr::Var(var) => {
                rv.insert(&var.id);
            }
            Expr::Const(_) => {}
            Expr::Seq(seq) => seq.items.iter().for_each(|x| x.referenced_names(rv)),
            Expr::Dict(dict) => {
                for (key, value) in &dict.pairs {
                    key.referenced_names(rv);
                    value.referenced_names(rv);
                }
            }
            Expr::UnaryOp(op) => op.expr.referenced_names(rv),
            Expr::BinOp(op) => {
                op.left.referenced_names(rv);
                op.right.referenced_names(rv);
            }
            Expr::Compare(cmp) => {
                cmp.left.referenced_names(rv);
                cmp.ops.iter().for_each(|(_, x)| x.referenced_names(rv));
            }
            Expr::IfExpr(expr) => {
                expr.test_expr.referenced_names(rv);
                expr.true_expr.referenced_names(rv);
                expr.false_expr.referenced_names(rv);
            }
            Expr::GetAttr(attr) => attr.expr.referenced_names(rv),
            Expr::GetItem(item) => {
                item.expr.referenced_names(rv);
                item.subscript_expr.referenced_names(rv);
            }
            Expr::Slice(slice) => {
                slice.expr.referenced_names(rv);
                opt(&slice.start, rv);
                opt(&slice.stop, rv);
                opt(&slice.step, rv);
            }
            Expr::Call(call) => {
                call.expr.referenced_names(rv);
                for arg in &call.args {
                    match arg {
                        CallArg::Pos(expr)
                        | CallArg::Kwarg(_, expr)
                        | CallArg::PosSplat(expr)
                        | CallArg::KwargSplat(expr) => expr.referenced_names(rv),
                    }
                }
            }
            Expr::Lambda(lambda) => {
                for param in &lambda.params {
                    opt(&param.default, rv);
                }
                lambda.body.referenced_names(rv);
            }
            Expr::Comprehension(comp) => {
                match comp.element {
                    CompElement::Single(ref expr) => expr.referenced_names(rv),
                    CompElement::Pair(ref key, ref value) => {
                        key.referenced_names(rv);
                        value.referenced_names(rv);
                    }
                }
                for gen in &comp.generators {
                    gen.iter.referenced_names(rv);
                    gen.conditions.iter().for_each(|x| x.referenced_names(rv));
                }
            }
        }
    }
}

/// Looks up a variable.
#[derive(Debug)]
pub struct Var {
    pub id: String,
}

/// Loads a constant
#[derive(Debug)]
pub struct Const {
    pub value: Value,
}

/// The kind of a sequence display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SeqKind {
    List,
    Tuple,
    Set,
}

/// A list, tuple or set display.
#[derive(Debug)]
pub struct Seq {
    pub kind: SeqKind,
    pub items: Vec<Expr>,
}

/// A dict display.
#[derive(Debug)]
pub struct Dict {
    pub pairs: Vec<(Expr, Expr)>,
}

/// A kind of unary operator.
#[derive(Debug, Copy, Clone)]
pub enum UnaryOpKind {
    Not,
    Neg,
    Pos,
    Invert,
}

/// An unary operator expression.
#[derive(Debug)]
pub struct UnaryOp {
    pub op: UnaryOpKind,
    pub expr: Expr,
}

/// A kind of binary operator.
#[derive(Debug, Copy, Clone)]
pub enum BinOpKind {
    ScAnd,
    ScOr,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

/// A binary operator expression.
#[derive(Debug)]
pub struct BinOp {
    pub op: BinOpKind,
    pub left: Expr,
    pub right: Expr,
}

/// A comparison operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Is,
    IsNot,
}

/// A possibly chained comparison such as `a < b <= c`.
#[derive(Debug)]
pub struct Compare {
    pub left: Expr,
    pub ops: Vec<(CmpOp, Expr)>,
}

/// An if expression.
#[derive(Debug)]
pub struct IfExpr {
    pub test_expr: Expr,
    pub true_expr: Expr,
    pub false_expr: Expr,
}

/// An attribute lookup expression.
#[derive(Debug)]
pub struct GetAttr {
    pub expr: Expr,
    pub name: String,
}

/// An item lookup expression.
#[derive(Debug)]
pub struct GetItem {
    pub expr: Expr,
    pub subscript_expr: Expr,
}

/// Represents a slice.
#[derive(Debug)]
pub struct Slice {
    pub expr: Expr,
    pub start: Option<Expr>,
    pub stop: Option<Expr>,
    pub step: Option<Expr>,
}

/// An argument to a call.
#[derive(Debug)]
pub enum CallArg {
    Pos(Expr),
    Kwarg(String, Expr),
    PosSplat(Expr),
    KwargSplat(Expr),
}

/// Calls something.
#[derive(Debug)]
pub struct Call {
    pub expr: Expr,
    pub args: Vec<CallArg>,
}

/// A lambda parameter.
#[derive(Debug)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// A lambda expression.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Arc<Expr>,
}

/// The binding target of a comprehension loop.
#[derive(Debug)]
pub enum Target {
    Name(String),
    Tuple(Vec<Target>),
}

/// One `for ... in ... if ...` clause of a comprehension.
#[derive(Debug)]
pub struct CompFor {
    pub target: Target,
    pub iter: Expr,
    pub conditions: Vec<Expr>,
}

/// The kind of a comprehension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

/// The produced element of a comprehension.
#[derive(Debug)]
pub enum CompElement {
    Single(Expr),
    Pair(Expr, Expr),
}

/// A list, set or dict comprehension or a generator expression.
#[derive(Debug)]
pub struct Comprehension {
    pub kind: CompKind,
    pub element: CompElement,
    pub generators: Vec<CompFor>,
}
