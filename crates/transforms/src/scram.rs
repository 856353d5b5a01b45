//! The rewrite pass: identifier renaming, control-flow flattening and nested
//! statement shuffling, all in one traversal.
//!
//! Renames are applied on the way up so that a node's children are already in
//! their final form when the node itself is rewritten. Loop labels are pushed
//! on the way down so that `break` and `continue` find their targets.

use crate::config::ObfuscationConfig;
use crate::control_flow::{self, LoopLabels, LoopStack};
use crate::grab::{is_literal_keyword, promoted_params, ConstantTable};
use crate::scrambler::{Category, Scramblers};
use crate::shuffle::{shuffle_stmts, ShufflePolicy};
use crate::{RewriteContext, Transform};
use fescate_core::annotation::annotations_of;
use fescate_core::ast::{
    Arg, Callee, ClassKind, ClassLike, ClassRef, Expr, If, Member, Name, Stmt, TraitAdaptation,
    TypeHint, UseItem, UseKind, VarName,
};
use fescate_core::traverse::{NodeMut, Splice, Traverser, Visitor};
use fescate_core::tree::{Ancestors, NodeKind};
use fescate_utils::errors::RewriteError;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::mem;
use tracing::{debug, warn};

/// Visitor carrying everything one file's rewrite needs.
#[derive(Debug)]
pub struct ScramVisitor<'a> {
    config: &'a ObfuscationConfig,
    scramblers: &'a mut Scramblers,
    /// Output of the grab pass. Supplies the promoted constructor parameters
    /// of classes declared in other files; the `encode` flag of constants is
    /// only logged.
    constants: &'a ConstantTable,
    rng: &'a mut StdRng,
    policy: ShufflePolicy,
    loops: LoopStack,
    /// Promoted constructor parameters of each enclosing function scope.
    promoted: Vec<HashSet<String>>,
    changes: usize,
}

impl<'a> ScramVisitor<'a> {
    pub fn new(
        config: &'a ObfuscationConfig,
        scramblers: &'a mut Scramblers,
        constants: &'a ConstantTable,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            config,
            scramblers,
            constants,
            rng,
            policy: ShufflePolicy::from_config(config),
            loops: LoopStack::new(),
            promoted: Vec::new(),
            changes: 0,
        }
    }

    /// Number of renames and rewrites performed so far.
    pub const fn changes(&self) -> usize {
        self.changes
    }

    // =========================================================================
    // Renaming helpers
    // =========================================================================

    fn rename(&mut self, category: Category, name: &mut String) -> Result<(), RewriteError> {
        let scrambled = self.scramblers.scramble(category, name)?;
        if scrambled != *name {
            *name = scrambled;
            self.changes += 1;
        }
        Ok(())
    }

    fn rename_last(&mut self, category: Category, name: &mut Name) -> Result<(), RewriteError> {
        match name.parts.last_mut() {
            Some(last) => self.rename(category, last),
            None => Ok(()),
        }
    }

    /// Rename the namespace segments of a qualified name, or all of them.
    fn rename_namespace(&mut self, name: &mut Name, all: bool) -> Result<(), RewriteError> {
        if !self.config.obfuscate_namespace {
            return Ok(());
        }
        let keep = usize::from(!all);
        let prefix = name.parts.len().saturating_sub(keep);
        for part in &mut name.parts[..prefix] {
            self.rename(Category::FunctionOrClass, part)?;
        }
        Ok(())
    }

    /// Rename a symbol living in the function/class table: last segment when
    /// `enabled`, namespace segments under their own flag.
    fn rename_symbol(&mut self, name: &mut Name, enabled: bool) -> Result<(), RewriteError> {
        if is_special_class(name) {
            return Ok(());
        }
        if enabled {
            self.rename_last(Category::FunctionOrClass, name)?;
        }
        self.rename_namespace(name, false)
    }

    fn rename_class(&mut self, name: &mut Name) -> Result<(), RewriteError> {
        self.rename_symbol(name, self.config.obfuscate_class_name)
    }

    fn rename_class_ref(&mut self, class: &mut ClassRef) -> Result<(), RewriteError> {
        match class {
            ClassRef::Name(name) => self.rename_class(name),
            ClassRef::Anonymous(decl) => self.rename_class_header(decl),
            ClassRef::Expr(_) => Ok(()),
        }
    }

    fn rename_type(&mut self, ty: &mut Option<TypeHint>) -> Result<(), RewriteError> {
        if let Some(ty) = ty {
            for name in ty.names_mut() {
                self.rename_class(name)?;
            }
        }
        Ok(())
    }

    /// Names a class-like declaration introduces or refers to in its header.
    fn rename_class_header(&mut self, class: &mut ClassLike) -> Result<(), RewriteError> {
        let config = self.config;
        let own_flag = match class.kind {
            ClassKind::Class => config.obfuscate_class_name,
            ClassKind::Interface => config.obfuscate_interface_name,
            ClassKind::Trait => config.obfuscate_trait_name,
        };
        if own_flag {
            if let Some(name) = &mut class.name {
                self.rename(Category::FunctionOrClass, name)?;
            }
        }
        // An interface extends interfaces, a class extends a class.
        let extends_flag = match class.kind {
            ClassKind::Interface => config.obfuscate_interface_name,
            _ => config.obfuscate_class_name,
        };
        for parent in &mut class.extends {
            self.rename_symbol(parent, extends_flag)?;
        }
        for iface in &mut class.implements {
            self.rename_symbol(iface, config.obfuscate_interface_name)?;
        }
        Ok(())
    }

    /// Category for `$name`, honouring promoted constructor parameters.
    /// `None` leaves the variable alone.
    fn variable_category(&self, name: &str) -> Option<Category> {
        let promoted = self
            .promoted
            .last()
            .is_some_and(|scope| scope.contains(name));
        if promoted {
            return self.config.obfuscate_property.then_some(Category::Property);
        }
        self.config.obfuscate_variable.then_some(Category::Variable)
    }

    fn rename_variable(&mut self, name: &mut String) -> Result<(), RewriteError> {
        match self.variable_category(name) {
            Some(category) => self.rename(category, name),
            None => Ok(()),
        }
    }

    fn method_renamable(&self, name: &str) -> bool {
        self.config.obfuscate_method_name
            && !(self.config.ignore_snake_case_methods && name.contains('_'))
    }

    fn rename_method_call(&mut self, name: &mut Member, tree: &Ancestors) -> Result<(), RewriteError> {
        let Member::Ident(ident) = name else {
            return Ok(());
        };
        if !self.method_renamable(ident) {
            return Ok(());
        }
        let sequence = tree.call_sequence(ident.as_str());
        let excluded = annotations_of(tree.doc_for_call())
            .iter()
            .any(|a| a.exclude && a.covers_call(ident.as_str(), &sequence));
        if excluded {
            debug!("method call {} excluded by annotation", ident);
            return Ok(());
        }
        self.rename(Category::Method, ident)
    }

    fn shuffle(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), RewriteError> {
        if !self.config.shuffle_stmts || !self.policy.applies(stmts.len()) {
            return Ok(());
        }
        let labels = self.scramblers.get_mut(Category::Label);
        if shuffle_stmts(stmts, &self.policy, labels, &mut *self.rng)? {
            self.changes += 1;
        }
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn rename_use_items(&mut self, kind: UseKind, items: &mut [UseItem]) -> Result<(), RewriteError> {
        let config = self.config;
        for item in items {
            let kind = if item.kind == UseKind::Unknown {
                kind
            } else {
                item.kind
            };
            match kind {
                UseKind::Function => {
                    self.rename_symbol(&mut item.name, config.obfuscate_function_name)?;
                    if config.obfuscate_function_name {
                        if let Some(alias) = &mut item.alias {
                            self.rename(Category::FunctionOrClass, alias)?;
                        }
                    }
                }
                UseKind::Constant => {
                    if config.obfuscate_constant {
                        self.rename_last(Category::Constant, &mut item.name)?;
                        if let Some(alias) = &mut item.alias {
                            self.rename(Category::Constant, alias)?;
                        }
                    }
                    self.rename_namespace(&mut item.name, false)?;
                }
                UseKind::Normal | UseKind::Unknown => {
                    // The last segment may name a class or a namespace.
                    if config.obfuscate_namespace {
                        self.rename_namespace(&mut item.name, true)?;
                    } else {
                        self.rename_symbol(&mut item.name, config.obfuscate_class_name)?;
                    }
                    self.rename_alias(item.alias.as_mut())?;
                }
            }
        }
        Ok(())
    }

    fn rename_alias(&mut self, alias: Option<&mut String>) -> Result<(), RewriteError> {
        let Some(alias) = alias else {
            return Ok(());
        };
        let (functions, classes) = (
            self.config.obfuscate_function_name,
            self.config.obfuscate_class_name,
        );
        if functions != classes {
            warn!(
                "renaming import alias {} with only one of function/class renaming enabled",
                alias
            );
        }
        if functions || classes {
            self.rename(Category::FunctionOrClass, alias)?;
        }
        Ok(())
    }

    fn rename_stmt(&mut self, stmt: &mut Stmt) -> Result<(), RewriteError> {
        let config = self.config;
        match stmt {
            Stmt::Label(name) | Stmt::Goto(name) if config.obfuscate_label => {
                self.rename(Category::Label, name)?;
            }
            Stmt::Function(func) => {
                if config.obfuscate_function_name {
                    self.rename(Category::FunctionOrClass, &mut func.name)?;
                }
                self.rename_type(&mut func.return_type)?;
            }
            Stmt::ClassLike(class) => self.rename_class_header(class)?,
            Stmt::ClassMethod(method) => {
                let excluded = annotations_of(method.doc.as_deref())
                    .iter()
                    .any(|a| a.exclude);
                if excluded {
                    debug!("method {} excluded by annotation", method.name);
                } else if self.method_renamable(&method.name) {
                    self.rename(Category::Method, &mut method.name)?;
                }
                self.rename_type(&mut method.return_type)?;
            }
            Stmt::Property { ty, .. } => self.rename_type(ty)?,
            Stmt::TraitUse { traits, .. } => {
                for name in traits {
                    self.rename_symbol(name, config.obfuscate_trait_name)?;
                }
            }
            Stmt::Namespace {
                name: Some(name), ..
            } => self.rename_namespace(name, true)?,
            Stmt::Use { kind, uses } => self.rename_use_items(*kind, uses)?,
            Stmt::GroupUse { kind, prefix, uses } => {
                self.rename_namespace(prefix, true)?;
                self.rename_use_items(*kind, uses)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn rewrite_if(&mut self, mut node: If) -> Result<Splice, RewriteError> {
        self.shuffle(&mut node.stmts)?;
        for branch in &mut node.elseifs {
            self.shuffle(&mut branch.stmts)?;
        }
        if let Some(stmts) = &mut node.else_ {
            self.shuffle(stmts)?;
        }
        if !self.config.obfuscate_if_stmt
            || control_flow::is_function_exists_guard(&node.cond)
            || declares_symbols(&node)
        {
            return Ok(Splice::Keep(Stmt::If(node)));
        }
        self.changes += 1;
        let labels = self.scramblers.get_mut(Category::Label);
        Ok(Splice::Replace(control_flow::rewrite_if(node, labels)?))
    }

    fn pop_loop(&mut self) -> Option<LoopLabels> {
        if self.config.obfuscate_loop_stmt {
            self.loops.pop()
        } else {
            None
        }
    }

    fn rewrite_loop(&mut self, mut stmt: Stmt) -> Result<Splice, RewriteError> {
        match &mut stmt {
            Stmt::For { stmts, .. } | Stmt::While { stmts, .. } | Stmt::Do { stmts, .. } => {
                self.shuffle(stmts)?;
            }
            _ => {}
        }
        let Some(jumps) = self.pop_loop() else {
            if let Stmt::Foreach(node) = &mut stmt {
                self.shuffle(&mut node.stmts)?;
            }
            return Ok(Splice::Keep(stmt));
        };

        let out = match stmt {
            Stmt::For {
                init,
                cond,
                step,
                stmts,
            } => {
                let labels = self.scramblers.get_mut(Category::Label);
                control_flow::rewrite_for(init, cond, step, stmts, jumps, labels)?
            }
            Stmt::While { cond, stmts } => control_flow::rewrite_while(cond, stmts, jumps),
            Stmt::Do { stmts, cond } => {
                let labels = self.scramblers.get_mut(Category::Label);
                control_flow::rewrite_do(stmts, cond, jumps, labels)?
            }
            Stmt::Foreach(mut node) => {
                // The continue label goes in before shuffling so it stays last.
                control_flow::open_foreach(&mut node, &jumps);
                self.shuffle(&mut node.stmts)?;
                control_flow::close_foreach(node, jumps)
            }
            switch => control_flow::rewrite_switch(switch, jumps),
        };
        self.changes += 1;
        Ok(Splice::Replace(out))
    }

    fn rewrite_jump(&mut self, stmt: Stmt) -> Result<Splice, RewriteError> {
        if !self.config.obfuscate_loop_stmt {
            return Ok(Splice::Keep(stmt));
        }
        let (keyword, depth) = match &stmt {
            Stmt::Break(depth) => ("break", depth.as_ref()),
            Stmt::Continue(depth) => ("continue", depth.as_ref()),
            _ => return Ok(Splice::Keep(stmt)),
        };
        let labels = self.loops.resolve(keyword, depth)?;
        let target = if keyword == "break" {
            labels.break_label.clone()
        } else {
            labels.continue_label.clone()
        };
        self.changes += 1;
        Ok(Splice::Replace(vec![Stmt::Goto(target)]))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Rename named arguments so they keep matching the renamed parameters.
    /// Names listed in `promoted` are properties as well and follow them.
    fn rename_arg_names(&mut self, args: &mut [Arg], promoted: &[String]) -> Result<(), RewriteError> {
        for arg in args.iter_mut() {
            let Some(name) = arg.name.as_mut() else {
                continue;
            };
            let category = if promoted.iter().any(|p| p == name) {
                self.config.obfuscate_property.then_some(Category::Property)
            } else {
                self.config.obfuscate_variable.then_some(Category::Variable)
            };
            if let Some(category) = category {
                self.rename(category, name)?;
            }
        }
        Ok(())
    }

    /// Named arguments of a method call. Methods the scrambler leaves alone
    /// may belong to built-in classes, whose parameters keep their names.
    fn rename_method_args(&mut self, name: &Member, args: &mut [Arg]) -> Result<(), RewriteError> {
        let external = match name {
            Member::Ident(ident) => self.scramblers.get(Category::Method).is_ignored(ident),
            Member::Expr(_) => false,
        };
        if external {
            return Ok(());
        }
        self.rename_arg_names(args, &[])
    }

    /// Named arguments passed to the constructor of `class`.
    fn rename_constructor_args(
        &mut self,
        class: &ClassRef,
        args: &mut [Arg],
        tree: &Ancestors,
    ) -> Result<(), RewriteError> {
        let constants = self.constants;
        let promoted = match class {
            ClassRef::Name(name) if name.is("parent") => Vec::new(),
            ClassRef::Name(name) if is_special_class(name) => tree
                .enclosing_class()
                .map(|own| constants.promoted(own).to_vec())
                .unwrap_or_default(),
            ClassRef::Name(name) => {
                if self.scramblers.builtins().is_class(name.last()) {
                    return Ok(());
                }
                constants.promoted(name.last()).to_vec()
            }
            ClassRef::Anonymous(decl) => promoted_params(decl),
            ClassRef::Expr(_) => Vec::new(),
        };
        self.rename_arg_names(args, &promoted)
    }

    fn rename_call(&mut self, name: &mut Name, args: &mut [Arg]) -> Result<(), RewriteError> {
        let config = self.config;
        let callee = name.last().to_ascii_lowercase();
        match callee.as_str() {
            "define" if config.obfuscate_constant => {
                match args {
                    [Arg {
                        value: Expr::String(constant),
                        ..
                    }, _] => self.rename_name_string(Category::Constant, constant)?,
                    _ => {
                        return Err(RewriteError::CallShape {
                            function: "define".into(),
                            expected: "two arguments, the first a string literal",
                        })
                    }
                }
            }
            "defined" if config.obfuscate_constant => match args.first_mut() {
                Some(Arg {
                    value: Expr::String(constant),
                    ..
                }) => self.rename_name_string(Category::Constant, constant)?,
                _ => {
                    return Err(RewriteError::CallShape {
                        function: "defined".into(),
                        expected: "a string literal argument",
                    })
                }
            },
            "function_exists" if config.obfuscate_function_name => match args {
                [Arg {
                    value: Expr::String(function),
                    ..
                }] => self.rename_name_string(Category::FunctionOrClass, function)?,
                [_] => warn!("function_exists() called with a computed name; left unchanged"),
                _ => {
                    return Err(RewriteError::CallShape {
                        function: "function_exists".into(),
                        expected: "exactly one argument",
                    })
                }
            },
            _ => {}
        }
        self.rename_symbol(name, config.obfuscate_function_name)
    }

    /// Rename a name written as a string literal, such as the argument of
    /// `define()`. Namespace segments follow the namespace flag.
    fn rename_name_string(&mut self, category: Category, text: &mut String) -> Result<(), RewriteError> {
        let mut name = Name::parse(text);
        self.rename_last(category, &mut name)?;
        self.rename_namespace(&mut name, false)?;
        *text = name.to_text();
        Ok(())
    }

    fn rename_expr(&mut self, expr: &mut Expr, tree: &Ancestors) -> Result<(), RewriteError> {
        let config = self.config;
        match expr {
            Expr::Variable(VarName::Ident(name)) => self.rename_variable(name)?,
            Expr::PropertyFetch {
                name: Member::Ident(name),
                ..
            } if config.obfuscate_property => self.rename(Category::Property, name)?,
            Expr::StaticPropertyFetch { class, name } => {
                if let (Member::Ident(name), true) = (name, config.obfuscate_property) {
                    self.rename(Category::Property, name)?;
                }
                self.rename_class_ref(class)?;
            }
            Expr::ConstFetch(name) => {
                if is_literal_keyword(name.last()) {
                    return Ok(());
                }
                if config.obfuscate_constant {
                    self.rename_last(Category::Constant, name)?;
                }
                self.rename_namespace(name, false)?;
            }
            Expr::ClassConstFetch { class, name } => {
                if config.obfuscate_class_constant && !name.eq_ignore_ascii_case("class") {
                    self.rename(Category::ClassConstant, name)?;
                }
                self.rename_class_ref(class)?;
            }
            Expr::FuncCall {
                name: Callee::Name(name),
                args,
            } => {
                if !self.scramblers.builtins().is_function(name.last()) {
                    self.rename_arg_names(args, &[])?;
                }
                self.rename_call(name, args)?;
            }
            Expr::FuncCall {
                name: Callee::Expr(_),
                args,
            } => self.rename_arg_names(args, &[])?,
            Expr::MethodCall { name, args, .. } => {
                self.rename_method_args(name, args)?;
                self.rename_method_call(name, tree)?;
            }
            Expr::StaticCall { class, name, args } => {
                if name.ident().is_some_and(|m| m.eq_ignore_ascii_case("__construct")) {
                    self.rename_constructor_args(class, args, tree)?;
                } else {
                    self.rename_method_args(name, args)?;
                }
                self.rename_method_call(name, tree)?;
                self.rename_class_ref(class)?;
            }
            Expr::New { class, args } => {
                self.rename_constructor_args(class, args, tree)?;
                self.rename_class_ref(class)?;
            }
            Expr::Instanceof { class, .. } => self.rename_class_ref(class)?,
            Expr::String(text) if tree.is_callback_string() && is_identifier(text) => {
                if self.method_renamable(text) {
                    self.rename(Category::Method, text)?;
                }
            }
            Expr::Closure(closure) => {
                self.rename_type(&mut closure.return_type)?;
                self.shuffle(&mut closure.stmts)?;
            }
            Expr::ArrowFunction(arrow) => self.rename_type(&mut arrow.return_type)?,
            _ => {}
        }
        Ok(())
    }
}

/// `self`, `parent` and `static` resolve at run time and are never renamed.
fn is_special_class(name: &Name) -> bool {
    ["self", "parent", "static"].iter().any(|s| name.is(s))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether a branch of `node` declares a function or class directly.
///
/// Flattening such an `if` would turn a conditional declaration into an
/// unconditional one.
fn declares_symbols(node: &If) -> bool {
    let declares = |stmts: &[Stmt]| {
        stmts
            .iter()
            .any(|s| matches!(s, Stmt::Function(_) | Stmt::ClassLike(_)))
    };
    declares(&node.stmts)
        || node.elseifs.iter().any(|b| declares(&b.stmts))
        || node.else_.as_deref().is_some_and(declares)
}

impl Visitor for ScramVisitor<'_> {
    fn enter_stmt(&mut self, stmt: &mut Stmt, _tree: &Ancestors) -> Result<(), RewriteError> {
        match stmt {
            Stmt::For { .. }
            | Stmt::While { .. }
            | Stmt::Do { .. }
            | Stmt::Foreach(_)
            | Stmt::Switch { .. }
                if self.config.obfuscate_loop_stmt =>
            {
                let labels = self.scramblers.get_mut(Category::Label);
                self.loops.push(LoopLabels::generate(labels)?);
            }
            Stmt::ClassMethod(method) => {
                let promoted = method
                    .params
                    .iter()
                    .filter(|p| p.flags.0 != 0)
                    .map(|p| p.name.clone())
                    .collect();
                self.promoted.push(promoted);
            }
            Stmt::Function(_) => self.promoted.push(HashSet::new()),
            _ => {}
        }
        Ok(())
    }

    fn leave_stmt(&mut self, mut stmt: Stmt, _tree: &Ancestors) -> Result<Splice, RewriteError> {
        self.rename_stmt(&mut stmt)?;
        match stmt {
            Stmt::InlineHtml(text) if self.config.obfuscate_string => {
                self.changes += 1;
                Ok(Splice::Keep(Stmt::Echo(vec![Expr::String(text)])))
            }
            Stmt::If(node) => self.rewrite_if(node),
            Stmt::For { .. }
            | Stmt::While { .. }
            | Stmt::Do { .. }
            | Stmt::Foreach(_)
            | Stmt::Switch { .. } => self.rewrite_loop(stmt),
            Stmt::Break(_) | Stmt::Continue(_) => self.rewrite_jump(stmt),
            Stmt::Function(mut func) => {
                self.promoted.pop();
                self.shuffle(&mut func.stmts)?;
                Ok(Splice::Keep(Stmt::Function(func)))
            }
            Stmt::ClassMethod(mut method) => {
                self.promoted.pop();
                if let Some(stmts) = &mut method.stmts {
                    self.shuffle(stmts)?;
                }
                Ok(Splice::Keep(Stmt::ClassMethod(method)))
            }
            Stmt::TryCatch {
                mut stmts,
                catches,
                mut finally,
            } => {
                self.shuffle(&mut stmts)?;
                if let Some(finally) = &mut finally {
                    self.shuffle(finally)?;
                }
                Ok(Splice::Keep(Stmt::TryCatch {
                    stmts,
                    catches,
                    finally,
                }))
            }
            other => Ok(Splice::Keep(other)),
        }
    }

    fn leave_expr(&mut self, expr: &mut Expr, tree: &Ancestors) -> Result<(), RewriteError> {
        self.rename_expr(expr, tree)
    }

    fn leave_node(&mut self, node: NodeMut<'_>, tree: &Ancestors) -> Result<(), RewriteError> {
        let config = self.config;
        match node {
            NodeMut::Param(param) => {
                self.rename_variable(&mut param.name)?;
                self.rename_type(&mut param.ty)?;
            }
            NodeMut::ClosureUse(used) => self.rename_variable(&mut used.var)?,
            NodeMut::PropertyItem(prop) if config.obfuscate_property => {
                self.rename(Category::Property, &mut prop.name)?;
            }
            NodeMut::Const(item) => {
                if self.constants.encode(&item.name) {
                    debug!("constant {} is flagged for encoding", item.name);
                }
                let in_class = tree
                    .parent()
                    .is_some_and(|frame| frame.kind == NodeKind::ClassConst);
                if in_class && config.obfuscate_class_constant {
                    self.rename(Category::ClassConstant, &mut item.name)?;
                } else if !in_class && config.obfuscate_constant {
                    self.rename(Category::Constant, &mut item.name)?;
                }
            }
            NodeMut::Catch(catch) => {
                for ty in &mut catch.types {
                    self.rename_class(ty)?;
                }
                if let Some(var) = &mut catch.var {
                    self.rename_variable(var)?;
                }
                self.shuffle(&mut catch.stmts)?;
            }
            NodeMut::Case(case) => self.shuffle(&mut case.stmts)?,
            NodeMut::TraitAdaptation(adaptation) => match adaptation {
                TraitAdaptation::Alias {
                    trait_,
                    method,
                    new_name,
                    ..
                } => {
                    if let Some(name) = trait_ {
                        self.rename_symbol(name, config.obfuscate_trait_name)?;
                    }
                    if self.method_renamable(method) {
                        self.rename(Category::Method, method)?;
                    }
                    if let Some(alias) = new_name {
                        if self.method_renamable(alias) {
                            self.rename(Category::Method, alias)?;
                        }
                    }
                }
                TraitAdaptation::Precedence {
                    trait_,
                    method,
                    insteadof,
                } => {
                    self.rename_symbol(trait_, config.obfuscate_trait_name)?;
                    for name in insteadof {
                        self.rename_symbol(name, config.obfuscate_trait_name)?;
                    }
                    if self.method_renamable(method) {
                        self.rename(Category::Method, method)?;
                    }
                }
            },
            _ => {}
        }
        Ok(())
    }
}

/// Renaming, control-flow flattening and nested shuffling over one file.
#[derive(Debug, Default)]
pub struct Scram;

impl Transform for Scram {
    fn name(&self) -> &'static str {
        "Scram"
    }

    fn apply(
        &self,
        program: &mut Vec<Stmt>,
        cx: &mut RewriteContext<'_>,
        rng: &mut StdRng,
    ) -> Result<bool, RewriteError> {
        let mut visitor = ScramVisitor::new(cx.config, &mut *cx.scramblers, cx.constants, rng);
        *program = Traverser::new(&mut visitor).traverse(mem::take(program))?;
        debug!("{} rename(s) and rewrite(s)", visitor.changes());
        Ok(visitor.changes() > 0)
    }
}
