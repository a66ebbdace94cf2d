use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, ErrorKind};
use crate::expr::ast;
use crate::utils::OnDrop;
use crate::value::{ops, Kwargs, Object, Value, ValueMap};

const MAX_CALL_DEPTH: usize = 100;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// The local bindings of an evaluation.
///
/// The root frame of an evaluation resolves names through the template
/// context.  Comprehensions push child frames for their targets and lambda
/// calls run in detached frames that only see what the lambda captured.
pub(crate) struct Frame<'a> {
    vars: BTreeMap<String, Value>,
    parent: Option<&'a Frame<'a>>,
    ctx: Option<&'a Context<'a>>,
}

impl<'a> Frame<'a> {
    /// Creates the root frame for a context.
    pub fn root(ctx: &'a Context<'a>) -> Frame<'a> {
        Frame {
            vars: BTreeMap::new(),
            parent: None,
            ctx: Some(ctx),
        }
    }

    fn detached(vars: BTreeMap<String, Value>) -> Frame<'static> {
        Frame {
            vars,
            parent: None,
            ctx: None,
        }
    }

    fn child(&self) -> Frame<'_> {
        Frame {
            vars: BTreeMap::new(),
            parent: Some(self),
            ctx: None,
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let mut frame = self;
        loop {
            if let Some(value) = frame.vars.get(name) {
                return Some(value.clone());
            }
            if let Some(ctx) = frame.ctx {
                return ctx.lookup(name);
            }
            frame = some!(frame.parent);
        }
    }
}

/// Evaluates an expression in a frame.
pub(crate) fn eval(expr: &ast::Expr, frame: &Frame<'_>) -> Result<Value, Error> {
    match expr {
        ast::Expr::Var(var) => match frame.lookup(&var.id) {
            Some(value) => value.validate(),
            None => Err(Error::new(
                ErrorKind::UndefinedName,
                format!("name '{}' is not defined", var.id),
            )),
        },
        ast::Expr::Const(c) => Ok(c.value.clone()),
        ast::Expr::Seq(seq) => {
            let mut items = Vec::with_capacity(seq.items.len());
            for item in &seq.items {
                items.push(ok!(eval(item, frame)));
            }
            match seq.kind {
                ast::SeqKind::List => Ok(Value::from(items)),
                ast::SeqKind::Tuple => Ok(Value::from_tuple(items)),
                ast::SeqKind::Set => make_set(items),
            }
        }
        ast::Expr::Dict(dict) => {
            let mut map = ValueMap::with_capacity(dict.pairs.len());
            for (key, value) in &dict.pairs {
                let key = ok!(hashable(ok!(eval(key, frame))));
                map.insert(key, ok!(eval(value, frame)));
            }
            Ok(Value::from(map))
        }
        ast::Expr::UnaryOp(op) => {
            let value = ok!(eval(&op.expr, frame));
            match op.op {
                ast::UnaryOpKind::Not => Ok(Value::from(!value.is_true())),
                ast::UnaryOpKind::Neg => ops::neg(&value),
                ast::UnaryOpKind::Pos => ops::pos(&value),
                ast::UnaryOpKind::Invert => ops::invert(&value),
            }
        }
        ast::Expr::BinOp(op) => eval_binop(op, frame),
        ast::Expr::Compare(cmp) => eval_compare(cmp, frame),
        ast::Expr::IfExpr(expr) => {
            if ok!(eval(&expr.test_expr, frame)).is_true() {
                eval(&expr.true_expr, frame)
            } else {
                eval(&expr.false_expr, frame)
            }
        }
        ast::Expr::GetAttr(attr) => ok!(eval(&attr.expr, frame)).get_attr(&attr.name),
        ast::Expr::GetItem(item) => {
            let value = ok!(eval(&item.expr, frame));
            value.get_item(&ok!(eval(&item.subscript_expr, frame)))
        }
        ast::Expr::Slice(slice) => {
            let value = ok!(eval(&slice.expr, frame));
            let start = ok!(eval_opt(&slice.start, frame));
            let stop = ok!(eval_opt(&slice.stop, frame));
            let step = ok!(eval_opt(&slice.step, frame));
            ops::slice(&value, &start, &stop, &step)
        }
        ast::Expr::Call(call) => eval_call(call, frame),
        ast::Expr::Lambda(lambda) => Closure::create(lambda, frame).map(Value::from_object),
        ast::Expr::Comprehension(comp) => eval_comprehension(comp, frame),
    }
}

fn eval_opt(expr: &Option<ast::Expr>, frame: &Frame<'_>) -> Result<Value, Error> {
    match expr {
        Some(expr) => eval(expr, frame),
        None => Ok(Value::NONE),
    }
}

fn hashable(value: Value) -> Result<Value, Error> {
    if value.is_hashable() {
        Ok(value)
    } else {
        Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("unhashable type: '{}'", value.type_name()),
        ))
    }
}

fn make_set(items: Vec<Value>) -> Result<Value, Error> {
    let mut rv = Vec::with_capacity(items.len());
    for item in items {
        rv.push(ok!(hashable(item)));
    }
    Ok(Value::from_set(rv))
}

fn eval_binop(op: &ast::BinOp, frame: &Frame<'_>) -> Result<Value, Error> {
    let left = ok!(eval(&op.left, frame));
    let f = match op.op {
        ast::BinOpKind::ScAnd => {
            return if left.is_true() {
                eval(&op.right, frame)
            } else {
                Ok(left)
            }
        }
        ast::BinOpKind::ScOr => {
            return if left.is_true() {
                Ok(left)
            } else {
                eval(&op.right, frame)
            }
        }
        ast::BinOpKind::Add => ops::add,
        ast::BinOpKind::Sub => ops::sub,
        ast::BinOpKind::Mul => ops::mul,
        ast::BinOpKind::Div => ops::div,
        ast::BinOpKind::FloorDiv => ops::int_div,
        ast::BinOpKind::Rem => ops::rem,
        ast::BinOpKind::Pow => ops::pow,
        ast::BinOpKind::BitAnd => ops::bit_and,
        ast::BinOpKind::BitOr => ops::bit_or,
        ast::BinOpKind::BitXor => ops::bit_xor,
        ast::BinOpKind::ShiftLeft => ops::shift_left,
        ast::BinOpKind::ShiftRight => ops::shift_right,
    };
    let right = ok!(eval(&op.right, frame));
    f(&left, &right)
}

fn eval_compare(cmp: &ast::Compare, frame: &Frame<'_>) -> Result<Value, Error> {
    let mut left = ok!(eval(&cmp.left, frame));
    for (op, right) in &cmp.ops {
        let right = ok!(eval(right, frame));
        let rv = match op {
            ast::CmpOp::Eq => left == right,
            ast::CmpOp::Ne => left != right,
            ast::CmpOp::Lt => ok!(ops::compare("<", &left, &right)),
            ast::CmpOp::Lte => ok!(ops::compare("<=", &left, &right)),
            ast::CmpOp::Gt => ok!(ops::compare(">", &left, &right)),
            ast::CmpOp::Gte => ok!(ops::compare(">=", &left, &right)),
            ast::CmpOp::In => ok!(ops::contains(&right, &left)),
            ast::CmpOp::NotIn => !ok!(ops::contains(&right, &left)),
            ast::CmpOp::Is => ops::is_same(&left, &right),
            ast::CmpOp::IsNot => !ops::is_same(&left, &right),
        };
        if !rv {
            return Ok(Value::from(false));
        }
        left = right;
    }
    Ok(Value::from(true))
}

fn eval_call(call: &ast::Call, frame: &Frame<'_>) -> Result<Value, Error> {
    let mut args = Vec::with_capacity(call.args.len());
    let mut kwargs = Kwargs::default();

    enum Callee<'a> {
        Value(Value),
        Method(Value, &'a str),
    }

    // the callee is evaluated before its arguments
    let callee = match call.expr {
        ast::Expr::GetAttr(ref attr) => {
            Callee::Method(ok!(eval(&attr.expr, frame)), attr.name.as_str())
        }
        ref expr => Callee::Value(ok!(eval(expr, frame))),
    };

    for arg in &call.args {
        match arg {
            ast::CallArg::Pos(expr) => args.push(ok!(eval(expr, frame))),
            ast::CallArg::PosSplat(expr) => args.extend(ok!(ok!(eval(expr, frame)).try_iter())),
            ast::CallArg::Kwarg(name, expr) => {
                ok!(kwargs.insert(name.clone(), ok!(eval(expr, frame))));
            }
            ast::CallArg::KwargSplat(expr) => {
                let value = ok!(eval(expr, frame));
                let map = ok!(value.as_map().ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidArguments,
                        format!(
                            "argument after ** must be a mapping, not {}",
                            value.type_name()
                        ),
                    )
                }));
                for (key, value) in map.iter() {
                    let key = ok!(key.as_str().ok_or_else(|| {
                        Error::new(ErrorKind::InvalidArguments, "keywords must be strings")
                    }));
                    ok!(kwargs.insert(key.to_string(), value.clone()));
                }
            }
        }
    }

    match callee {
        Callee::Value(func) => func.call(&args, &kwargs),
        Callee::Method(obj, name) => obj.call_method(name, &args, &kwargs),
    }
}

fn bind_target(
    target: &ast::Target,
    value: Value,
    vars: &mut BTreeMap<String, Value>,
) -> Result<(), Error> {
    match target {
        ast::Target::Name(name) => {
            vars.insert(name.clone(), value);
        }
        ast::Target::Tuple(targets) => {
            let items: Vec<Value> = ok!(value.try_iter()).collect();
            if items.len() != targets.len() {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    if items.len() < targets.len() {
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            targets.len(),
                            items.len()
                        )
                    } else {
                        format!("too many values to unpack (expected {})", targets.len())
                    },
                ));
            }
            for (target, item) in targets.iter().zip(items) {
                ok!(bind_target(target, item, vars));
            }
        }
    }
    Ok(())
}

enum CompOutput {
    Items(Vec<Value>),
    Pairs(ValueMap),
}

fn eval_comprehension(comp: &ast::Comprehension, frame: &Frame<'_>) -> Result<Value, Error> {
    let mut out = match comp.kind {
        ast::CompKind::Dict => CompOutput::Pairs(ValueMap::new()),
        _ => CompOutput::Items(Vec::new()),
    };
    ok!(run_comprehension(comp, 0, frame, &mut out));
    match (comp.kind, out) {
        (_, CompOutput::Pairs(map)) => Ok(Value::from(map)),
        (ast::CompKind::Set, CompOutput::Items(items)) => make_set(items),
        (_, CompOutput::Items(items)) => Ok(Value::from(items)),
    }
}

fn run_comprehension(
    comp: &ast::Comprehension,
    idx: usize,
    frame: &Frame<'_>,
    out: &mut CompOutput,
) -> Result<(), Error> {
    let gen = match comp.generators.get(idx) {
        Some(gen) => gen,
        None => {
            match (&comp.element, out) {
                (ast::CompElement::Single(expr), CompOutput::Items(items)) => {
                    items.push(ok!(eval(expr, frame)));
                }
                (ast::CompElement::Pair(key, value), CompOutput::Pairs(map)) => {
                    let key = ok!(hashable(ok!(eval(key, frame))));
                    map.insert(key, ok!(eval(value, frame)));
                }
                _ => unreachable!("comprehension element does not match its kind"),
            }
            return Ok(());
        }
    };

    'items: for item in ok!(ok!(eval(&gen.iter, frame)).try_iter()) {
        let mut inner = frame.child();
        ok!(bind_target(&gen.target, item, &mut inner.vars));
        for cond in &gen.conditions {
            if !ok!(eval(cond, &inner)).is_true() {
                continue 'items;
            }
        }
        ok!(run_comprehension(comp, idx + 1, &inner, out));
    }
    Ok(())
}

/// A function created by a lambda expression.
///
/// Defaults are evaluated when the lambda is created.  Names the body
/// refers to are resolved at creation time as well, so a closure keeps
/// working after the context it was created in is gone.
pub(crate) struct Closure {
    params: Vec<(String, Option<Value>)>,
    body: Arc<ast::Expr>,
    captured: BTreeMap<String, Value>,
}

impl Closure {
    fn create(lambda: &ast::Lambda, frame: &Frame<'_>) -> Result<Closure, Error> {
        let mut params = Vec::with_capacity(lambda.params.len());
        for param in &lambda.params {
            let default = match param.default {
                Some(ref expr) => Some(ok!(eval(expr, frame))),
                None => None,
            };
            params.push((param.name.clone(), default));
        }

        let mut names = BTreeSet::new();
        lambda.body.referenced_names(&mut names);
        let captured = names
            .into_iter()
            .filter(|name| !params.iter().any(|(param, _)| param == name))
            .filter_map(|name| frame.lookup(name).map(|value| (name.to_string(), value)))
            .collect();

        Ok(Closure {
            params,
            body: lambda.body.clone(),
            captured,
        })
    }

    fn bind_args(&self, args: &[Value], kwargs: &Kwargs) -> Result<BTreeMap<String, Value>, Error> {
        if args.len() > self.params.len() {
            return Err(Error::new(
                ErrorKind::InvalidArguments,
                format!(
                    "<lambda>() takes {} positional arguments but {} were given",
                    self.params.len(),
                    args.len()
                ),
            ));
        }
        if let Some((key, _)) = kwargs
            .iter()
            .find(|(key, _)| !self.params.iter().any(|(name, _)| name == key))
        {
            return Err(Error::new(
                ErrorKind::InvalidArguments,
                format!("<lambda>() got an unexpected keyword argument '{key}'"),
            ));
        }

        let mut vars = self.captured.clone();
        for (idx, (name, default)) in self.params.iter().enumerate() {
            let value = match (args.get(idx), kwargs.get_value(name)) {
                (Some(_), Some(_)) => {
                    return Err(Error::new(
                        ErrorKind::InvalidArguments,
                        format!("<lambda>() got multiple values for argument '{name}'"),
                    ))
                }
                (Some(value), None) | (None, Some(value)) => value.clone(),
                (None, None) => match default {
                    Some(value) => value.clone(),
                    None => {
                        return Err(Error::new(
                            ErrorKind::InvalidArguments,
                            format!("<lambda>() missing required argument: '{name}'"),
                        ))
                    }
                },
            };
            vars.insert(name.clone(), value);
        }
        Ok(vars)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("captured", &self.captured)
            .finish()
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<function <lambda>>")
    }
}

impl Object for Closure {
    fn type_name(&self) -> &str {
        "function"
    }

    fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, Error> {
        let frame = Frame::detached(ok!(self.bind_args(args, kwargs)));
        let depth = CALL_DEPTH.with(|depth| {
            depth.set(depth.get() + 1);
            depth.get()
        });
        let _guard = OnDrop::new(|| CALL_DEPTH.with(|depth| depth.set(depth.get() - 1)));
        if depth > MAX_CALL_DEPTH {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "recursion limit exceeded",
            ));
        }
        eval(&self.body, &frame)
    }
}
