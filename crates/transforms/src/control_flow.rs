//! Rewrites of structured control flow into labels and gotos.
//!
//! Loops and `switch` get a (break, continue) label pair on entry; `break N`
//! and `continue N` become gotos to the pair N levels up. `for`, `while` and
//! `do` are flattened completely. `foreach` and `switch` stay native and only
//! gain the labels their jumps need.

use crate::scrambler::Scrambler;
use fescate_core::ast::{Expr, Foreach, If, Name, Stmt, UnaryOp};
use fescate_utils::errors::{RewriteError, ScrambleError};

/// Jump targets of one loop or `switch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLabels {
    pub break_label: String,
    pub continue_label: String,
}

impl LoopLabels {
    pub fn generate(labels: &mut Scrambler) -> Result<Self, ScrambleError> {
        Ok(Self {
            break_label: labels.new_label()?,
            continue_label: labels.new_label()?,
        })
    }
}

/// Labels of the loops enclosing the current node, innermost last.
#[derive(Debug, Default)]
pub struct LoopStack {
    frames: Vec<LoopLabels>,
}

impl LoopStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, labels: LoopLabels) {
        self.frames.push(labels);
    }

    pub fn pop(&mut self) -> Option<LoopLabels> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Labels targeted by `keyword depth`.
    ///
    /// A missing depth means 1, and so does 0.
    pub fn resolve(
        &self,
        keyword: &'static str,
        depth: Option<&Expr>,
    ) -> Result<&LoopLabels, RewriteError> {
        let depth = match depth {
            None => 1,
            Some(Expr::Int(n)) if *n >= 0 => (*n as usize).max(1),
            Some(_) => return Err(RewriteError::NonLiteralDepth { keyword }),
        };
        let available = self.frames.len();
        if depth > available {
            return Err(RewriteError::OutsideLoop {
                keyword,
                depth,
                available,
            });
        }
        Ok(&self.frames[available - depth])
    }
}

/// `if (!function_exists(...))` guards conditional declarations and is left alone.
pub fn is_function_exists_guard(cond: &Expr) -> bool {
    let Expr::Unary {
        op: UnaryOp::Not,
        expr,
    } = cond
    else {
        return false;
    };
    matches!(
        expr.as_ref(),
        Expr::FuncCall { name, .. }
            if name.name().is_some_and(|n: &Name| n.last().eq_ignore_ascii_case("function_exists"))
    )
}

/// Flatten an `if` / `elseif` / `else` chain.
pub fn rewrite_if(node: If, labels: &mut Scrambler) -> Result<Vec<Stmt>, ScrambleError> {
    let If {
        cond,
        stmts,
        elseifs,
        else_,
        ..
    } = node;

    if !elseifs.is_empty() {
        // Tests and gotos first, then each branch body behind its label.
        let end = labels.new_label()?;
        let mut tests = Vec::with_capacity(elseifs.len() + 3);
        let mut bodies = Vec::new();

        let then = labels.new_label()?;
        tests.push(Stmt::goto_if(cond, &then));
        bodies.push(Stmt::Label(then));
        bodies.extend(stmts);
        bodies.push(Stmt::Goto(end.clone()));

        let last = elseifs.len() - 1;
        for (i, branch) in elseifs.into_iter().enumerate() {
            let label = labels.new_label()?;
            tests.push(Stmt::goto_if(branch.cond, &label));
            bodies.push(Stmt::Label(label));
            bodies.extend(branch.stmts);
            if i != last {
                bodies.push(Stmt::Goto(end.clone()));
            }
        }

        tests.extend(else_.unwrap_or_default());
        tests.push(Stmt::Goto(end.clone()));
        tests.extend(bodies);
        tests.push(Stmt::Label(end));
        return Ok(tests);
    }

    if let Some(otherwise) = else_ {
        let then = labels.new_label()?;
        let end = labels.new_label()?;
        let mut out = Vec::with_capacity(otherwise.len() + stmts.len() + 4);
        out.push(Stmt::goto_if(cond, &then));
        out.extend(otherwise);
        out.push(Stmt::Goto(end.clone()));
        out.push(Stmt::Label(then));
        out.extend(stmts);
        out.push(Stmt::Label(end));
        return Ok(out);
    }

    let end = labels.new_label()?;
    let mut out = Vec::with_capacity(stmts.len() + 2);
    out.push(Stmt::goto_if(cond.negate(), &end));
    out.extend(stmts);
    out.push(Stmt::Label(end));
    Ok(out)
}

/// `init; top: if (!cond) goto break; body; continue: step; goto top; break:`
///
/// With several conditions all but the last are evaluated for their effects
/// and the last one decides, as the language does.
pub fn rewrite_for(
    init: Vec<Expr>,
    mut cond: Vec<Expr>,
    step: Vec<Expr>,
    stmts: Vec<Stmt>,
    jumps: LoopLabels,
    labels: &mut Scrambler,
) -> Result<Vec<Stmt>, ScrambleError> {
    let top = labels.new_label()?;
    let mut out: Vec<Stmt> = init.into_iter().map(Stmt::expr).collect();
    out.push(Stmt::Label(top.clone()));
    if let Some(decisive) = cond.pop() {
        out.extend(cond.into_iter().map(Stmt::expr));
        out.push(Stmt::goto_if(decisive.negate(), &jumps.break_label));
    }
    out.extend(stmts);
    out.push(Stmt::Label(jumps.continue_label));
    out.extend(step.into_iter().map(Stmt::expr));
    out.push(Stmt::Goto(top));
    out.push(Stmt::Label(jumps.break_label));
    Ok(out)
}

/// `continue: if (!cond) goto break; body; goto continue; break:`
pub fn rewrite_while(cond: Expr, stmts: Vec<Stmt>, jumps: LoopLabels) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len() + 4);
    out.push(Stmt::Label(jumps.continue_label.clone()));
    out.push(Stmt::goto_if(cond.negate(), &jumps.break_label));
    out.extend(stmts);
    out.push(Stmt::Goto(jumps.continue_label));
    out.push(Stmt::Label(jumps.break_label));
    out
}

/// `top: body; continue: if (cond) goto top; break:`
///
/// `continue` inside a `do` loop re-evaluates the condition, so it gets its
/// own label between the body and the test.
pub fn rewrite_do(
    stmts: Vec<Stmt>,
    cond: Expr,
    jumps: LoopLabels,
    labels: &mut Scrambler,
) -> Result<Vec<Stmt>, ScrambleError> {
    let top = labels.new_label()?;
    let mut out = Vec::with_capacity(stmts.len() + 4);
    out.push(Stmt::Label(top.clone()));
    out.extend(stmts);
    out.push(Stmt::Label(jumps.continue_label));
    out.push(Stmt::goto_if(cond, &top));
    out.push(Stmt::Label(jumps.break_label));
    Ok(out)
}

/// Append the continue label to the body. The caller may shuffle the body
/// before [`close_foreach`] puts the break label after the loop.
pub fn open_foreach(node: &mut Foreach, jumps: &LoopLabels) {
    node.stmts.push(Stmt::Label(jumps.continue_label.clone()));
}

pub fn close_foreach(node: Foreach, jumps: LoopLabels) -> Vec<Stmt> {
    vec![Stmt::Foreach(node), Stmt::Label(jumps.break_label)]
}

/// A `switch` stays native; both of its labels follow it since `continue`
/// targeting a `switch` acts like `break`.
pub fn rewrite_switch(switch: Stmt, jumps: LoopLabels) -> Vec<Stmt> {
    vec![
        switch,
        Stmt::Label(jumps.continue_label),
        Stmt::Label(jumps.break_label),
    ]
}
