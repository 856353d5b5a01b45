//! Reference interpreter for the statement subset the rewrite pass produces.
//!
//! It only has to be faithful enough to compare a program against its
//! rewritten form: echoed output and the top-level return value. Jumps follow
//! the language rule that a `goto` may leave blocks and loops but never enter
//! them, so a label is looked up in the current statement list and then in
//! each enclosing one.

use fescate_core::ast::{
    ArrayItem, BinaryOp, Callee, CastKind, Expr, Function, IncDecOp, InterpolatedPart, Stmt,
    UnaryOp, VarName,
};
use std::collections::HashMap;
use std::mem;

const STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Ordered key/value pairs. Keys are `Int` or `Str`.
    Array(Vec<(Value, Value)>),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Str(s) => !s.is_empty() && s != "0",
            Self::Array(items) => !items.is_empty(),
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Self::Null => 0,
            Self::Bool(b) => i64::from(*b),
            Self::Int(n) => *n,
            Self::Str(s) => s.trim().parse().unwrap_or(0),
            Self::Array(items) => i64::from(!items.is_empty()),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Null | Self::Bool(false) => String::new(),
            Self::Bool(true) => "1".into(),
            Self::Int(n) => n.to_string(),
            Self::Str(s) => s.clone(),
            Self::Array(_) => "Array".into(),
        }
    }

    fn as_number(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Null => Some(0),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Array(_) => None,
        }
    }

    fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(_), _) | (_, Self::Bool(_)) | (Self::Null, _) | (_, Self::Null) => {
                self.truthy() == other.truthy()
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_text() == other.to_text(),
            },
        }
    }

    fn compare(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) if a.trim().parse::<i64>().is_err() => a.cmp(b),
            _ => self.to_int().cmp(&other.to_int()),
        }
    }

    fn array_key(&self) -> Self {
        match self {
            Self::Str(s) => s.parse().map_or_else(|_| self.clone(), Self::Int),
            Self::Bool(b) => Self::Int(i64::from(*b)),
            Self::Null => Self::Str(String::new()),
            other => other.clone(),
        }
    }
}

/// How a statement hands control back to its parent.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Next,
    Break(usize),
    Continue(usize),
    Goto(String),
    Return(Value),
}

/// Result of one full run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub output: String,
    pub returned: Value,
}

#[derive(Debug, Default)]
pub struct Interpreter {
    vars: HashMap<String, Value>,
    constants: HashMap<String, Value>,
    functions: HashMap<String, Function>,
    output: String,
    steps: usize,
}

/// Run `program` and collect what it echoes.
pub fn run(program: &[Stmt]) -> Outcome {
    Interpreter::default().run(program)
}

impl Interpreter {
    pub fn run(mut self, program: &[Stmt]) -> Outcome {
        self.hoist(program);
        let returned = match self.block(program) {
            Flow::Next => Value::Null,
            Flow::Return(value) => value,
            Flow::Goto(label) => panic!("goto to unknown label {label}"),
            other => panic!("{other:?} outside of a loop"),
        };
        Outcome {
            output: self.output,
            returned,
        }
    }

    /// Unconditional declarations are visible before their statement runs.
    fn hoist(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if let Stmt::Function(function) = stmt {
                self.declare(function);
            }
        }
    }

    fn declare(&mut self, function: &Function) {
        self.functions
            .insert(function.name.to_ascii_lowercase(), function.clone());
    }

    fn block(&mut self, stmts: &[Stmt]) -> Flow {
        let mut pc = 0;
        while pc < stmts.len() {
            self.steps += 1;
            assert!(self.steps < STEP_LIMIT, "step limit exceeded");
            match self.stmt(&stmts[pc]) {
                Flow::Next => pc += 1,
                Flow::Goto(label) => {
                    match stmts
                        .iter()
                        .position(|s| matches!(s, Stmt::Label(l) if *l == label))
                    {
                        Some(target) => pc = target + 1,
                        None => return Flow::Goto(label),
                    }
                }
                other => return other,
            }
        }
        Flow::Next
    }

    /// `None` keeps the loop going; `Some` leaves it with the given flow.
    fn iteration(flow: Flow) -> Option<Flow> {
        match flow {
            Flow::Next | Flow::Continue(1) => None,
            Flow::Break(1) => Some(Flow::Next),
            Flow::Break(n) => Some(Flow::Break(n - 1)),
            Flow::Continue(n) => Some(Flow::Continue(n - 1)),
            other => Some(other),
        }
    }

    fn depth(&mut self, num: Option<&Expr>) -> usize {
        num.map_or(1, |e| usize::try_from(self.eval(e).to_int()).unwrap_or(1).max(1))
    }

    fn stmt(&mut self, stmt: &Stmt) -> Flow {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.eval(expr);
            }
            Stmt::Echo(exprs) => {
                for expr in exprs {
                    let text = self.eval(expr).to_text();
                    self.output.push_str(&text);
                }
            }
            Stmt::InlineHtml(text) => self.output.push_str(text),
            Stmt::Return { expr, .. } => {
                let value = expr.as_ref().map_or(Value::Null, |e| self.eval(e));
                return Flow::Return(value);
            }
            Stmt::If(node) => {
                if self.eval(&node.cond).truthy() {
                    return self.block(&node.stmts);
                }
                for branch in &node.elseifs {
                    if self.eval(&branch.cond).truthy() {
                        return self.block(&branch.stmts);
                    }
                }
                if let Some(stmts) = &node.else_ {
                    return self.block(stmts);
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                stmts,
            } => {
                for expr in init {
                    self.eval(expr);
                }
                loop {
                    let mut pass = true;
                    for expr in cond {
                        pass = self.eval(expr).truthy();
                    }
                    if !pass {
                        break;
                    }
                    let flow = self.block(stmts);
                    if let Some(exit) = Self::iteration(flow) {
                        return exit;
                    }
                    for expr in step {
                        self.eval(expr);
                    }
                }
            }
            Stmt::While { cond, stmts } => {
                while self.eval(cond).truthy() {
                    let flow = self.block(stmts);
                    if let Some(exit) = Self::iteration(flow) {
                        return exit;
                    }
                }
            }
            Stmt::Do { stmts, cond } => loop {
                let flow = self.block(stmts);
                if let Some(exit) = Self::iteration(flow) {
                    return exit;
                }
                if !self.eval(cond).truthy() {
                    break;
                }
            },
            Stmt::Foreach(node) => {
                let Value::Array(items) = self.eval(&node.expr) else {
                    panic!("foreach over a non-array");
                };
                for (key, value) in items {
                    if let Some(target) = &node.key {
                        self.assign(target, key);
                    }
                    self.assign(&node.value, value);
                    let flow = self.block(&node.stmts);
                    if let Some(exit) = Self::iteration(flow) {
                        return exit;
                    }
                }
            }
            Stmt::Switch { cond, cases, .. } => {
                let subject = self.eval(cond);
                let mut start = None;
                for (i, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.cond {
                        if self.eval(test).loose_eq(&subject) {
                            start = Some(i);
                            break;
                        }
                    }
                }
                let start = start.or_else(|| cases.iter().position(|c| c.cond.is_none()));
                if let Some(start) = start {
                    for case in &cases[start..] {
                        match self.block(&case.stmts) {
                            Flow::Next => {}
                            Flow::Break(1) | Flow::Continue(1) => return Flow::Next,
                            Flow::Break(n) => return Flow::Break(n - 1),
                            Flow::Continue(n) => return Flow::Continue(n - 1),
                            other => return other,
                        }
                    }
                }
            }
            Stmt::Break(num) => return Flow::Break(self.depth(num.as_ref())),
            Stmt::Continue(num) => return Flow::Continue(self.depth(num.as_ref())),
            Stmt::Goto(label) => return Flow::Goto(label.clone()),
            Stmt::Label(_) | Stmt::Nop => {}
            Stmt::Function(function) => self.declare(function),
            Stmt::Const { consts, .. } => {
                for c in consts {
                    let value = self.eval(&c.value);
                    self.constants.insert(c.name.clone(), value);
                }
            }
            Stmt::Unset(vars) => {
                for var in vars {
                    if let Expr::Variable(VarName::Ident(name)) = var {
                        self.vars.remove(name);
                    }
                }
            }
            Stmt::Block(stmts) => return self.block(stmts),
            other => panic!("unsupported statement {other:?}"),
        }
        Flow::Next
    }

    fn assign(&mut self, target: &Expr, value: Value) {
        match target {
            Expr::Variable(VarName::Ident(name)) => {
                self.vars.insert(name.clone(), value);
            }
            Expr::ArrayDimFetch { var, dim } => {
                let Expr::Variable(VarName::Ident(name)) = var.as_ref() else {
                    panic!("nested array writes are not supported");
                };
                let key = dim.as_ref().map(|d| self.eval(d).array_key());
                let slot = self
                    .vars
                    .entry(name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                let Value::Array(items) = slot else {
                    panic!("${name} is not an array");
                };
                push_item(items, key, value);
            }
            other => panic!("cannot assign to {other:?}"),
        }
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Value {
        match name.to_ascii_lowercase().as_str() {
            "count" => match args.first() {
                Some(Value::Array(items)) => Value::Int(items.len() as i64),
                _ => Value::Int(1),
            },
            "strlen" => Value::Int(args.first().map_or(0, |v| v.to_text().len()) as i64),
            "define" => {
                let name = args[0].to_text();
                self.constants.insert(name, args[1].clone());
                Value::Bool(true)
            }
            "defined" => Value::Bool(self.constants.contains_key(&args[0].to_text())),
            "function_exists" => Value::Bool(
                self.functions
                    .contains_key(&args[0].to_text().to_ascii_lowercase()),
            ),
            lowered => {
                let Some(function) = self.functions.get(lowered).cloned() else {
                    panic!("call to undefined function {name}");
                };
                let mut frame = HashMap::new();
                for (i, param) in function.params.iter().enumerate() {
                    let value = match args.get(i) {
                        Some(v) => v.clone(),
                        None => param
                            .default
                            .as_ref()
                            .map_or(Value::Null, |d| self.eval(d)),
                    };
                    frame.insert(param.name.clone(), value);
                }
                let saved = mem::replace(&mut self.vars, frame);
                let flow = self.block(&function.stmts);
                self.vars = saved;
                match flow {
                    Flow::Return(value) => value,
                    Flow::Next => Value::Null,
                    other => panic!("{other:?} escaped function {name}"),
                }
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Int(n) => Value::Int(*n),
            Expr::String(s) => Value::Str(s.clone()),
            Expr::Interpolated(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        InterpolatedPart::Literal(s) => text.push_str(s),
                        InterpolatedPart::Expr(e) => text.push_str(&self.eval(e).to_text()),
                    }
                }
                Value::Str(text)
            }
            Expr::ConstFetch(name) => match name.last().to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                _ => self
                    .constants
                    .get(name.last())
                    .cloned()
                    .unwrap_or_else(|| panic!("undefined constant {}", name.to_text())),
            },
            Expr::Variable(VarName::Ident(name)) => {
                self.vars.get(name).cloned().unwrap_or(Value::Null)
            }
            Expr::Array { items, .. } => {
                let mut entries = Vec::new();
                for item in items.iter().flatten() {
                    let ArrayItem { key, value, .. } = item;
                    let key = key.as_ref().map(|k| self.eval(k).array_key());
                    let value = self.eval(value);
                    push_item(&mut entries, key, value);
                }
                Value::Array(entries)
            }
            Expr::ArrayDimFetch { var, dim: Some(dim) } => {
                let container = self.eval(var);
                let key = self.eval(dim).array_key();
                match container {
                    Value::Array(items) => items
                        .into_iter()
                        .find(|(k, _)| *k == key)
                        .map_or(Value::Null, |(_, v)| v),
                    _ => Value::Null,
                }
            }
            Expr::Assign { var, expr, .. } => {
                let value = self.eval(expr);
                self.assign(var, value.clone());
                value
            }
            Expr::AssignOp { op, var, expr } => {
                let current = self.eval(var);
                let rhs = self.eval(expr);
                let value = binary(*op, &current, &rhs);
                self.assign(var, value.clone());
                value
            }
            Expr::IncDec { op, var } => {
                let before = self.eval(var).to_int();
                let after = match op {
                    IncDecOp::PreInc | IncDecOp::PostInc => before + 1,
                    IncDecOp::PreDec | IncDecOp::PostDec => before - 1,
                };
                self.assign(var, Value::Int(after));
                match op {
                    IncDecOp::PreInc | IncDecOp::PreDec => Value::Int(after),
                    IncDecOp::PostInc | IncDecOp::PostDec => Value::Int(before),
                }
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::BooleanAnd | BinaryOp::LogicalAnd => {
                    Value::Bool(self.eval(left).truthy() && self.eval(right).truthy())
                }
                BinaryOp::BooleanOr | BinaryOp::LogicalOr => {
                    Value::Bool(self.eval(left).truthy() || self.eval(right).truthy())
                }
                BinaryOp::Coalesce => match self.eval(left) {
                    Value::Null => self.eval(right),
                    value => value,
                },
                _ => {
                    let l = self.eval(left);
                    let r = self.eval(right);
                    binary(*op, &l, &r)
                }
            },
            Expr::Unary { op, expr } => {
                let value = self.eval(expr);
                match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Minus => Value::Int(-value.to_int()),
                    UnaryOp::Plus => Value::Int(value.to_int()),
                    UnaryOp::BitwiseNot => Value::Int(!value.to_int()),
                }
            }
            Expr::Ternary { cond, then, else_ } => {
                let test = self.eval(cond);
                if test.truthy() {
                    then.as_ref().map_or(test, |t| self.eval(t))
                } else {
                    self.eval(else_)
                }
            }
            Expr::Cast { kind, expr } => {
                let value = self.eval(expr);
                match kind {
                    CastKind::Int => Value::Int(value.to_int()),
                    CastKind::String => Value::Str(value.to_text()),
                    CastKind::Bool => Value::Bool(value.truthy()),
                    other => panic!("unsupported cast {other:?}"),
                }
            }
            Expr::Isset(vars) => Value::Bool(vars.iter().all(|v| self.eval(v) != Value::Null)),
            Expr::Print(expr) => {
                let text = self.eval(expr).to_text();
                self.output.push_str(&text);
                Value::Int(1)
            }
            Expr::FuncCall {
                name: Callee::Name(name),
                args,
            } => {
                let values = args.iter().map(|a| self.eval(&a.value)).collect();
                self.call(name.last(), values)
            }
            other => panic!("unsupported expression {other:?}"),
        }
    }
}

fn push_item(items: &mut Vec<(Value, Value)>, key: Option<Value>, value: Value) {
    let key = key.unwrap_or_else(|| {
        let next = items
            .iter()
            .filter_map(|(k, _)| match k {
                Value::Int(n) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Value::Int(next)
    });
    match items.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => items.push((key, value)),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    use std::cmp::Ordering;
    match op {
        BinaryOp::Plus => Value::Int(l.to_int() + r.to_int()),
        BinaryOp::Minus => Value::Int(l.to_int() - r.to_int()),
        BinaryOp::Mul => Value::Int(l.to_int() * r.to_int()),
        BinaryOp::Div => Value::Int(l.to_int() / r.to_int()),
        BinaryOp::Mod => Value::Int(l.to_int() % r.to_int()),
        BinaryOp::Concat => Value::Str(l.to_text() + &r.to_text()),
        BinaryOp::BitwiseAnd => Value::Int(l.to_int() & r.to_int()),
        BinaryOp::BitwiseOr => Value::Int(l.to_int() | r.to_int()),
        BinaryOp::BitwiseXor => Value::Int(l.to_int() ^ r.to_int()),
        BinaryOp::Equal => Value::Bool(l.loose_eq(r)),
        BinaryOp::NotEqual => Value::Bool(!l.loose_eq(r)),
        BinaryOp::Identical => Value::Bool(l == r),
        BinaryOp::NotIdentical => Value::Bool(l != r),
        BinaryOp::Smaller => Value::Bool(l.compare(r) == Ordering::Less),
        BinaryOp::SmallerOrEqual => Value::Bool(l.compare(r) != Ordering::Greater),
        BinaryOp::Greater => Value::Bool(l.compare(r) == Ordering::Greater),
        BinaryOp::GreaterOrEqual => Value::Bool(l.compare(r) != Ordering::Less),
        BinaryOp::Spaceship => Value::Int(match l.compare(r) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }),
        BinaryOp::LogicalXor => Value::Bool(l.truthy() ^ r.truthy()),
        other => panic!("unsupported operator {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{brk, echo, echo_var, eq, if_, inc, int, lt, set, tru, var, while_};

    #[test]
    fn goto_leaves_nested_blocks() {
        let program = vec![
            Stmt::Block(vec![echo(1), Stmt::Goto("out".into()), echo(2)]),
            echo(3),
            Stmt::Label("out".into()),
            echo(4),
        ];
        assert_eq!(run(&program).output, "14");
    }

    #[test]
    fn nested_break_leaves_both_loops() {
        let program = vec![
            set("i", int(0)),
            while_(
                lt(var("i"), int(3)),
                vec![
                    inc("i"),
                    while_(
                        tru(),
                        vec![echo_var("i"), if_(eq(var("i"), int(2)), vec![brk(2)]), brk(1)],
                    ),
                ],
            ),
            echo(9),
        ];
        assert_eq!(run(&program).output, "129");
    }
}
