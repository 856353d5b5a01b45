//! Generic depth-first traversal parameterised by a pluggable [`Visitor`].
//!
//! Statements are visited pre-order on the way down and post-order on the way
//! up. A statement's `leave` hook receives it by value and returns the list of
//! statements to splice in its place, which is how structural rewrites replace
//! one node with many. Replacements are not traversed again.

use crate::ast::*;
use crate::tree::{Ancestors, Frame, NodeKind, Slot};
use fescate_utils::errors::RewriteError;
use std::mem;

/// Result of leaving a statement.
#[derive(Debug)]
pub enum Splice {
    /// Keep the (possibly mutated) statement.
    Keep(Stmt),
    /// Replace it with zero or more sibling statements.
    Replace(Vec<Stmt>),
}

/// Auxiliary nodes that are neither statements nor expressions.
#[derive(Debug)]
pub enum NodeMut<'a> {
    Param(&'a mut Param),
    Const(&'a mut Const),
    PropertyItem(&'a mut PropertyItem),
    ClosureUse(&'a mut ClosureUse),
    Catch(&'a mut Catch),
    Case(&'a mut Case),
    TraitAdaptation(&'a mut TraitAdaptation),
}

/// Hooks invoked by the [`Traverser`]. Every hook defaults to a no-op.
pub trait Visitor {
    fn enter_stmt(&mut self, _stmt: &mut Stmt, _tree: &Ancestors) -> Result<(), RewriteError> {
        Ok(())
    }

    fn leave_stmt(&mut self, stmt: Stmt, _tree: &Ancestors) -> Result<Splice, RewriteError> {
        Ok(Splice::Keep(stmt))
    }

    fn enter_expr(&mut self, _expr: &mut Expr, _tree: &Ancestors) -> Result<(), RewriteError> {
        Ok(())
    }

    fn leave_expr(&mut self, _expr: &mut Expr, _tree: &Ancestors) -> Result<(), RewriteError> {
        Ok(())
    }

    fn leave_node(&mut self, _node: NodeMut<'_>, _tree: &Ancestors) -> Result<(), RewriteError> {
        Ok(())
    }
}

/// Walks a statement list with one visitor.
#[derive(Debug)]
pub struct Traverser<'v, V: Visitor> {
    visitor: &'v mut V,
    tree: Ancestors,
}

impl<'v, V: Visitor> Traverser<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        Self {
            visitor,
            tree: Ancestors::new(),
        }
    }

    /// Traverse a whole program and return the rewritten statement list.
    pub fn traverse(mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, RewriteError> {
        self.stmts(stmts)
    }

    fn stmts(&mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, RewriteError> {
        let mut out = Vec::with_capacity(stmts.len());
        for (index, stmt) in stmts.into_iter().enumerate() {
            self.tree.enter_slot(Slot::Stmts, index);
            match self.stmt(stmt)? {
                Splice::Keep(stmt) => out.push(stmt),
                Splice::Replace(stmts) => out.extend(stmts),
            }
        }
        Ok(out)
    }

    fn body(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), RewriteError> {
        *stmts = self.stmts(mem::take(stmts))?;
        Ok(())
    }

    fn stmt(&mut self, mut stmt: Stmt) -> Result<Splice, RewriteError> {
        self.visitor.enter_stmt(&mut stmt, &self.tree)?;
        self.tree.push(Frame::of_stmt(&stmt));
        let walked = self.stmt_children(&mut stmt);
        self.tree.pop();
        walked?;
        self.visitor.leave_stmt(stmt, &self.tree)
    }

    fn at(&mut self, slot: Slot, index: usize) {
        self.tree.enter_slot(slot, index);
    }

    fn stmt_children(&mut self, stmt: &mut Stmt) -> Result<(), RewriteError> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.at(Slot::Expr, 0);
                self.expr(expr)?;
            }
            Stmt::Echo(exprs) | Stmt::Global(exprs) | Stmt::Unset(exprs) => {
                self.exprs(Slot::Expr, exprs)?;
            }
            Stmt::Return { expr, .. } => {
                self.at(Slot::Expr, 0);
                self.opt_expr(expr)?;
            }
            Stmt::If(node) => {
                self.at(Slot::Cond, 0);
                self.expr(&mut node.cond)?;
                self.body(&mut node.stmts)?;
                for elseif in &mut node.elseifs {
                    self.tree.push(Frame::of_kind(NodeKind::ElseIf));
                    self.at(Slot::Cond, 0);
                    let walked = self
                        .expr(&mut elseif.cond)
                        .and_then(|()| self.body(&mut elseif.stmts));
                    self.tree.pop();
                    walked?;
                }
                if let Some(stmts) = &mut node.else_ {
                    self.tree.push(Frame::of_kind(NodeKind::Else));
                    let walked = self.body(stmts);
                    self.tree.pop();
                    walked?;
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                stmts,
            } => {
                self.exprs(Slot::Expr, init)?;
                self.exprs(Slot::Cond, cond)?;
                self.exprs(Slot::Expr, step)?;
                self.body(stmts)?;
            }
            Stmt::While { cond, stmts } => {
                self.at(Slot::Cond, 0);
                self.expr(cond)?;
                self.body(stmts)?;
            }
            Stmt::Do { stmts, cond } => {
                self.body(stmts)?;
                self.at(Slot::Cond, 0);
                self.expr(cond)?;
            }
            Stmt::Foreach(node) => {
                self.at(Slot::Expr, 0);
                self.expr(&mut node.expr)?;
                if let Some(key) = &mut node.key {
                    self.at(Slot::Key, 0);
                    self.expr(key)?;
                }
                self.at(Slot::Value, 0);
                self.expr(&mut node.value)?;
                self.body(&mut node.stmts)?;
            }
            Stmt::Switch { cond, cases, .. } => {
                self.at(Slot::Cond, 0);
                self.expr(cond)?;
                for case in cases {
                    self.tree.push(Frame::of_kind(NodeKind::Case));
                    let walked = self.case(case);
                    self.tree.pop();
                    walked?;
                    self.visitor.leave_node(NodeMut::Case(case), &self.tree)?;
                }
            }
            Stmt::Break(depth) | Stmt::Continue(depth) => {
                self.at(Slot::Expr, 0);
                self.opt_expr(depth)?;
            }
            Stmt::Function(func) => {
                self.params(&mut func.params)?;
                self.body(&mut func.stmts)?;
            }
            Stmt::ClassLike(class) => self.class_body(class)?,
            Stmt::ClassMethod(method) => {
                self.params(&mut method.params)?;
                if let Some(stmts) = &mut method.stmts {
                    self.body(stmts)?;
                }
            }
            Stmt::Property { props, .. } => {
                for (index, prop) in props.iter_mut().enumerate() {
                    if let Some(default) = &mut prop.default {
                        self.at(Slot::Value, index);
                        self.expr(default)?;
                    }
                    self.visitor.leave_node(NodeMut::PropertyItem(prop), &self.tree)?;
                }
            }
            Stmt::ClassConst { consts, .. } | Stmt::Const { consts, .. } => {
                for (index, item) in consts.iter_mut().enumerate() {
                    self.at(Slot::Value, index);
                    self.expr(&mut item.value)?;
                    self.visitor.leave_node(NodeMut::Const(item), &self.tree)?;
                }
            }
            Stmt::TraitUse { adaptations, .. } => {
                for adaptation in adaptations {
                    self.visitor
                        .leave_node(NodeMut::TraitAdaptation(adaptation), &self.tree)?;
                }
            }
            Stmt::Namespace { stmts, .. } | Stmt::Block(stmts) => self.body(stmts)?,
            Stmt::Static(vars) => {
                for (index, var) in vars.iter_mut().enumerate() {
                    self.at(Slot::Var, index);
                    self.expr(&mut var.var)?;
                    if let Some(default) = &mut var.default {
                        self.at(Slot::Value, index);
                        self.expr(default)?;
                    }
                }
            }
            Stmt::TryCatch {
                stmts,
                catches,
                finally,
            } => {
                self.body(stmts)?;
                for catch in catches {
                    self.tree.push(Frame::of_kind(NodeKind::Catch));
                    let walked = self.body(&mut catch.stmts);
                    self.tree.pop();
                    walked?;
                    self.visitor.leave_node(NodeMut::Catch(catch), &self.tree)?;
                }
                if let Some(stmts) = finally {
                    self.body(stmts)?;
                }
            }
            Stmt::Declare { declares, stmts } => {
                for (index, (_, value)) in declares.iter_mut().enumerate() {
                    self.at(Slot::Value, index);
                    self.expr(value)?;
                }
                if let Some(stmts) = stmts {
                    self.body(stmts)?;
                }
            }
            Stmt::Use { .. }
            | Stmt::GroupUse { .. }
            | Stmt::InlineHtml(_)
            | Stmt::Goto(_)
            | Stmt::Label(_)
            | Stmt::HaltCompiler(_)
            | Stmt::Nop => {}
        }
        Ok(())
    }

    fn case(&mut self, case: &mut Case) -> Result<(), RewriteError> {
        if let Some(cond) = &mut case.cond {
            self.at(Slot::Cond, 0);
            self.expr(cond)?;
        }
        self.body(&mut case.stmts)
    }

    fn class_body(&mut self, class: &mut ClassLike) -> Result<(), RewriteError> {
        self.body(&mut class.stmts)
    }

    fn params(&mut self, params: &mut [Param]) -> Result<(), RewriteError> {
        for (index, param) in params.iter_mut().enumerate() {
            if let Some(default) = &mut param.default {
                self.at(Slot::Value, index);
                self.expr(default)?;
            }
            self.visitor.leave_node(NodeMut::Param(param), &self.tree)?;
        }
        Ok(())
    }

    fn exprs(&mut self, slot: Slot, exprs: &mut [Expr]) -> Result<(), RewriteError> {
        for (index, expr) in exprs.iter_mut().enumerate() {
            self.at(slot, index);
            self.expr(expr)?;
        }
        Ok(())
    }

    fn opt_expr(&mut self, expr: &mut Option<Expr>) -> Result<(), RewriteError> {
        match expr {
            Some(expr) => self.expr(expr),
            None => Ok(()),
        }
    }

    fn boxed(&mut self, slot: Slot, expr: &mut Expr) -> Result<(), RewriteError> {
        self.at(slot, 0);
        self.expr(expr)
    }

    fn args(&mut self, args: &mut [Arg]) -> Result<(), RewriteError> {
        for (index, arg) in args.iter_mut().enumerate() {
            self.at(Slot::Args, index);
            self.expr(&mut arg.value)?;
        }
        Ok(())
    }

    fn items(&mut self, items: &mut [Option<ArrayItem>]) -> Result<(), RewriteError> {
        for (index, item) in items.iter_mut().enumerate().filter_map(|(i, it)| it.as_mut().map(|it| (i, it))) {
            if let Some(key) = &mut item.key {
                self.at(Slot::Key, index);
                self.expr(key)?;
            }
            self.at(Slot::Value, index);
            self.expr(&mut item.value)?;
        }
        Ok(())
    }

    fn class_ref(&mut self, class: &mut ClassRef) -> Result<(), RewriteError> {
        match class {
            ClassRef::Name(_) => Ok(()),
            ClassRef::Expr(expr) => self.boxed(Slot::Class, expr),
            ClassRef::Anonymous(decl) => {
                self.tree.push(Frame::of_kind(NodeKind::Class));
                let walked = self.class_body(decl);
                self.tree.pop();
                walked
            }
        }
    }

    fn member(&mut self, member: &mut Member) -> Result<(), RewriteError> {
        match member {
            Member::Ident(_) => Ok(()),
            Member::Expr(expr) => self.boxed(Slot::Name, expr),
        }
    }

    fn parts(&mut self, parts: &mut [InterpolatedPart]) -> Result<(), RewriteError> {
        for (index, part) in parts.iter_mut().enumerate() {
            if let InterpolatedPart::Expr(expr) = part {
                self.at(Slot::Expr, index);
                self.expr(expr)?;
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &mut Expr) -> Result<(), RewriteError> {
        self.visitor.enter_expr(expr, &self.tree)?;
        self.tree.push(Frame::of_expr(expr));
        let walked = self.expr_children(expr);
        self.tree.pop();
        walked?;
        self.visitor.leave_expr(expr, &self.tree)
    }

    fn expr_children(&mut self, expr: &mut Expr) -> Result<(), RewriteError> {
        match expr {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::MagicConst(_)
            | Expr::ConstFetch(_) => {}
            Expr::Interpolated(parts) | Expr::ShellExec(parts) => self.parts(parts)?,
            Expr::Array { items, .. } | Expr::List(items) => self.items(items)?,
            Expr::Variable(VarName::Ident(_)) => {}
            Expr::Variable(VarName::Expr(inner)) => self.boxed(Slot::Name, inner)?,
            Expr::ClassConstFetch { class, .. } => self.class_ref(class)?,
            Expr::Assign { var, expr, .. } | Expr::AssignOp { var, expr, .. } => {
                self.boxed(Slot::Var, var)?;
                self.boxed(Slot::Expr, expr)?;
            }
            Expr::Binary { left, right, .. } => {
                self.boxed(Slot::Expr, left)?;
                self.at(Slot::Expr, 1);
                self.expr(right)?;
            }
            Expr::Unary { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::Empty(expr)
            | Expr::Print(expr)
            | Expr::Include { expr, .. }
            | Expr::Eval(expr)
            | Expr::Clone(expr)
            | Expr::ErrorSuppress(expr)
            | Expr::Throw(expr)
            | Expr::YieldFrom(expr) => self.boxed(Slot::Expr, expr)?,
            Expr::IncDec { var, .. } => self.boxed(Slot::Var, var)?,
            Expr::Ternary { cond, then, else_ } => {
                self.boxed(Slot::Cond, cond)?;
                if let Some(then) = then {
                    self.boxed(Slot::Expr, then)?;
                }
                self.at(Slot::Expr, 1);
                self.expr(else_)?;
            }
            Expr::Instanceof { expr, class } => {
                self.boxed(Slot::Expr, expr)?;
                self.class_ref(class)?;
            }
            Expr::ArrayDimFetch { var, dim } => {
                self.boxed(Slot::Var, var)?;
                if let Some(dim) = dim {
                    self.boxed(Slot::Key, dim)?;
                }
            }
            Expr::PropertyFetch { var, name, .. } => {
                self.boxed(Slot::Var, var)?;
                self.member(name)?;
            }
            Expr::StaticPropertyFetch { class, name } => {
                self.class_ref(class)?;
                self.member(name)?;
            }
            Expr::FuncCall { name, args } => {
                if let Callee::Expr(callee) = name {
                    self.boxed(Slot::Name, callee)?;
                }
                self.args(args)?;
            }
            Expr::MethodCall { var, name, args, .. } => {
                self.boxed(Slot::Var, var)?;
                self.member(name)?;
                self.args(args)?;
            }
            Expr::StaticCall { class, name, args } => {
                self.class_ref(class)?;
                self.member(name)?;
                self.args(args)?;
            }
            Expr::New { class, args } => {
                self.class_ref(class)?;
                self.args(args)?;
            }
            Expr::Closure(closure) => {
                self.params(&mut closure.params)?;
                for used in &mut closure.uses {
                    self.visitor.leave_node(NodeMut::ClosureUse(used), &self.tree)?;
                }
                self.body(&mut closure.stmts)?;
            }
            Expr::ArrowFunction(arrow) => {
                self.params(&mut arrow.params)?;
                self.boxed(Slot::Expr, &mut arrow.expr)?;
            }
            Expr::Isset(vars) => self.exprs(Slot::Expr, vars)?,
            Expr::Exit(expr) => {
                if let Some(expr) = expr {
                    self.boxed(Slot::Expr, expr)?;
                }
            }
            Expr::Yield { key, value } => {
                if let Some(key) = key {
                    self.boxed(Slot::Key, key)?;
                }
                if let Some(value) = value {
                    self.boxed(Slot::Value, value)?;
                }
            }
            Expr::Match { cond, arms } => {
                self.boxed(Slot::Cond, cond)?;
                for (index, arm) in arms.iter_mut().enumerate() {
                    if let Some(conds) = &mut arm.conds {
                        self.exprs(Slot::Cond, conds)?;
                    }
                    self.at(Slot::Expr, index);
                    self.expr(&mut arm.body)?;
                }
            }
        }
        Ok(())
    }
}
