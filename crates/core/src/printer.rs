//! Pretty printer turning a statement list back into source text.
//!
//! Operands that are not atomic are always parenthesised, so the output never
//! depends on operator precedence tables to keep its meaning.

use crate::ast::*;
use rand::{rngs::StdRng, Rng};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrinterOptions {
    /// Emit every string byte as a random mix of `\xHH` and `\OOO` escapes.
    pub obfuscate_strings: bool,
    pub keep_doc_comments: bool,
    /// No indentation, no newlines and no comments.
    pub compact: bool,
}

/// Pretty printer for one file.
#[derive(Debug)]
pub struct Printer<'r> {
    options: PrinterOptions,
    rng: &'r mut StdRng,
    out: String,
    depth: usize,
}

/// Escape every byte of `value` as a hex or octal escape for a double-quoted literal.
pub fn escape_bytes(value: &str, rng: &mut StdRng) -> String {
    let mut escaped = String::with_capacity(value.len() * 4);
    for byte in value.bytes() {
        if rng.random_bool(0.5) {
            escaped.push_str(&format!("\\x{byte:02x}"));
        } else {
            escaped.push_str(&format!("\\{byte:03o}"));
        }
    }
    escaped
}

fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn modifiers(flags: Modifiers) -> String {
    let mut words = Vec::new();
    for (flag, word) in [
        (Modifiers::ABSTRACT, "abstract"),
        (Modifiers::FINAL, "final"),
        (Modifiers::PUBLIC, "public"),
        (Modifiers::PROTECTED, "protected"),
        (Modifiers::PRIVATE, "private"),
        (Modifiers::STATIC, "static"),
        (Modifiers::READONLY, "readonly"),
    ] {
        if flags.has(flag) {
            words.push(word);
        }
    }
    words.join(" ")
}

fn type_hint(hint: &TypeHint) -> String {
    match hint {
        TypeHint::Keyword(word) => word.clone(),
        TypeHint::Name(name) => name.to_text(),
        TypeHint::Nullable(inner) => format!("?{}", type_hint(inner)),
        TypeHint::Union(types) => types.iter().map(type_hint).collect::<Vec<_>>().join("|"),
        TypeHint::Intersection(types) => types.iter().map(type_hint).collect::<Vec<_>>().join("&"),
    }
}

const fn cast_keyword(kind: CastKind) -> &'static str {
    match kind {
        CastKind::Int => "(int)",
        CastKind::Float => "(float)",
        CastKind::String => "(string)",
        CastKind::Bool => "(bool)",
        CastKind::Array => "(array)",
        CastKind::Object => "(object)",
        CastKind::Unset => "(unset)",
    }
}

const fn include_keyword(kind: IncludeKind) -> &'static str {
    match kind {
        IncludeKind::Include => "include",
        IncludeKind::IncludeOnce => "include_once",
        IncludeKind::Require => "require",
        IncludeKind::RequireOnce => "require_once",
    }
}

/// Expressions that never need parentheses as an operand.
fn is_atomic(expr: &Expr) -> bool {
    match expr {
        Expr::Int(v) => *v >= 0,
        Expr::Float(v) => v.is_sign_positive(),
        Expr::String(_)
        | Expr::Interpolated(_)
        | Expr::MagicConst(_)
        | Expr::Array { .. }
        | Expr::List(_)
        | Expr::ConstFetch(_)
        | Expr::ClassConstFetch { .. }
        | Expr::Isset(_)
        | Expr::Empty(_)
        | Expr::Exit(_)
        | Expr::Eval(_)
        | Expr::ShellExec(_) => true,
        other => is_dereferenceable(other),
    }
}

/// Expressions that can be followed by `->`, `::`, `[...]` or `(...)` as-is.
const fn is_dereferenceable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Variable(_)
            | Expr::ArrayDimFetch { .. }
            | Expr::PropertyFetch { .. }
            | Expr::StaticPropertyFetch { .. }
            | Expr::FuncCall { .. }
            | Expr::MethodCall { .. }
            | Expr::StaticCall { .. }
    )
}

impl<'r> Printer<'r> {
    pub fn new(options: PrinterOptions, rng: &'r mut StdRng) -> Self {
        Self {
            options,
            rng,
            out: String::new(),
            depth: 0,
        }
    }

    /// Print a whole file, starting with the opening tag.
    pub fn print_file(mut self, stmts: &[Stmt]) -> String {
        self.out.push_str("<?php");
        if self.options.compact {
            self.out.push(' ');
        }
        self.stmts(stmts);
        let trimmed = self.out.trim_end().len();
        self.out.truncate(trimmed);
        self.out.push('\n');
        self.out
    }

    /// Print a single expression.
    pub fn print_expr(mut self, expr: &Expr) -> String {
        self.expr(expr);
        self.out
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn line(&mut self) {
        if self.options.compact {
            return;
        }
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if let Stmt::HaltCompiler(rest) = stmt {
                self.line();
                self.push("__halt_compiler();");
                self.push(rest);
                return;
            }
            self.stmt(stmt);
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        self.push(" {");
        self.depth += 1;
        self.stmts(stmts);
        self.depth -= 1;
        self.line();
        self.push("}");
    }

    fn doc(&mut self, doc: Option<&str>) {
        if let Some(doc) = doc.filter(|_| self.options.keep_doc_comments && !self.options.compact) {
            self.line();
            self.push(doc);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if matches!(stmt, Stmt::Nop) {
            return;
        }
        self.doc(stmt.doc());
        self.line();
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.expr(expr);
                self.push(";");
            }
            Stmt::Echo(exprs) => {
                self.push("echo ");
                self.list(exprs);
                self.push(";");
            }
            Stmt::InlineHtml(html) => {
                self.push("?>");
                // the closing tag swallows one directly following newline
                if html.starts_with('\n') {
                    self.push("\n");
                }
                self.push(html);
                self.push("<?php\n");
            }
            Stmt::Return { expr, .. } => {
                self.push("return");
                if let Some(expr) = expr {
                    self.push(" ");
                    self.expr(expr);
                }
                self.push(";");
            }
            Stmt::If(node) => {
                self.push("if (");
                self.expr(&node.cond);
                self.push(")");
                self.block(&node.stmts);
                for elseif in &node.elseifs {
                    self.push(" elseif (");
                    self.expr(&elseif.cond);
                    self.push(")");
                    self.block(&elseif.stmts);
                }
                if let Some(stmts) = &node.else_ {
                    self.push(" else");
                    self.block(stmts);
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                stmts,
            } => {
                self.push("for (");
                self.list(init);
                self.push("; ");
                self.list(cond);
                self.push("; ");
                self.list(step);
                self.push(")");
                self.block(stmts);
            }
            Stmt::While { cond, stmts } => {
                self.push("while (");
                self.expr(cond);
                self.push(")");
                self.block(stmts);
            }
            Stmt::Do { stmts, cond } => {
                self.push("do");
                self.block(stmts);
                self.push(" while (");
                self.expr(cond);
                self.push(");");
            }
            Stmt::Foreach(node) => {
                self.push("foreach (");
                self.expr(&node.expr);
                self.push(" as ");
                if let Some(key) = &node.key {
                    self.expr(key);
                    self.push(" => ");
                }
                if node.by_ref {
                    self.push("&");
                }
                self.expr(&node.value);
                self.push(")");
                self.block(&node.stmts);
            }
            Stmt::Switch { cond, cases, .. } => {
                self.push("switch (");
                self.expr(cond);
                self.push(") {");
                self.depth += 1;
                for case in cases {
                    self.line();
                    match &case.cond {
                        Some(cond) => {
                            self.push("case ");
                            self.expr(cond);
                            self.push(":");
                        }
                        None => self.push("default:"),
                    }
                    self.depth += 1;
                    self.stmts(&case.stmts);
                    self.depth -= 1;
                }
                self.depth -= 1;
                self.line();
                self.push("}");
            }
            Stmt::Break(depth) | Stmt::Continue(depth) => {
                self.push(if matches!(stmt, Stmt::Break(_)) { "break" } else { "continue" });
                if let Some(depth) = depth {
                    self.push(" ");
                    self.expr(depth);
                }
                self.push(";");
            }
            Stmt::Goto(label) => {
                self.push("goto ");
                self.push(label);
                self.push(";");
            }
            Stmt::Label(label) => {
                self.push(label);
                self.push(":");
            }
            Stmt::Function(func) => {
                self.push("function ");
                if func.by_ref {
                    self.push("&");
                }
                self.push(&func.name);
                self.signature(&func.params, func.return_type.as_ref());
                self.block(&func.stmts);
            }
            Stmt::ClassLike(class) => self.class_like(class, None),
            Stmt::ClassMethod(method) => {
                let flags = modifiers(method.flags);
                if !flags.is_empty() {
                    self.push(&flags);
                    self.push(" ");
                }
                self.push("function ");
                if method.by_ref {
                    self.push("&");
                }
                self.push(&method.name);
                self.signature(&method.params, method.return_type.as_ref());
                match &method.stmts {
                    Some(stmts) => self.block(stmts),
                    None => self.push(";"),
                }
            }
            Stmt::Property { flags, ty, props, .. } => {
                let flags = modifiers(*flags);
                self.push(if flags.is_empty() { "var" } else { &flags });
                if let Some(ty) = ty {
                    self.push(" ");
                    self.push(&type_hint(ty));
                }
                for (i, prop) in props.iter().enumerate() {
                    self.push(if i == 0 { " $" } else { ", $" });
                    self.push(&prop.name);
                    if let Some(default) = &prop.default {
                        self.push(" = ");
                        self.expr(default);
                    }
                }
                self.push(";");
            }
            Stmt::ClassConst { flags, consts, .. } => {
                let flags = modifiers(*flags);
                if !flags.is_empty() {
                    self.push(&flags);
                    self.push(" ");
                }
                self.consts(consts);
            }
            Stmt::Const { consts, .. } => self.consts(consts),
            Stmt::TraitUse {
                traits,
                adaptations,
            } => {
                self.push("use ");
                self.push(&traits.iter().map(Name::to_text).collect::<Vec<_>>().join(", "));
                if adaptations.is_empty() {
                    self.push(";");
                } else {
                    self.push(" {");
                    self.depth += 1;
                    for adaptation in adaptations {
                        self.line();
                        self.adaptation(adaptation);
                    }
                    self.depth -= 1;
                    self.line();
                    self.push("}");
                }
            }
            Stmt::Namespace {
                name,
                stmts,
                braced,
            } => {
                self.push("namespace");
                if let Some(name) = name {
                    self.push(" ");
                    self.push(&name.to_text());
                }
                if *braced {
                    self.block(stmts);
                } else {
                    self.push(";");
                    self.stmts(stmts);
                }
            }
            Stmt::Use { kind, uses } => {
                self.push("use ");
                self.push(use_kind_keyword(*kind));
                let items: Vec<String> = uses.iter().map(|u| use_item(u, false)).collect();
                self.push(&items.join(", "));
                self.push(";");
            }
            Stmt::GroupUse { kind, prefix, uses } => {
                self.push("use ");
                self.push(use_kind_keyword(*kind));
                self.push(&prefix.to_text());
                self.push("\\{");
                let items: Vec<String> = uses
                    .iter()
                    .map(|u| use_item(u, *kind == UseKind::Unknown))
                    .collect();
                self.push(&items.join(", "));
                self.push("};");
            }
            Stmt::Global(vars) => {
                self.push("global ");
                self.list(vars);
                self.push(";");
            }
            Stmt::Static(vars) => {
                self.push("static ");
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(&var.var);
                    if let Some(default) = &var.default {
                        self.push(" = ");
                        self.expr(default);
                    }
                }
                self.push(";");
            }
            Stmt::Unset(vars) => {
                self.push("unset(");
                self.list(vars);
                self.push(");");
            }
            Stmt::TryCatch {
                stmts,
                catches,
                finally,
            } => {
                self.push("try");
                self.block(stmts);
                for catch in catches {
                    self.push(" catch (");
                    self.push(&catch.types.iter().map(Name::to_text).collect::<Vec<_>>().join(" | "));
                    if let Some(var) = &catch.var {
                        self.push(" $");
                        self.push(var);
                    }
                    self.push(")");
                    self.block(&catch.stmts);
                }
                if let Some(stmts) = finally {
                    self.push(" finally");
                    self.block(stmts);
                }
            }
            Stmt::Declare { declares, stmts } => {
                self.push("declare(");
                for (i, (key, value)) in declares.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(key);
                    self.push("=");
                    self.expr(value);
                }
                self.push(")");
                match stmts {
                    Some(stmts) => self.block(stmts),
                    None => self.push(";"),
                }
            }
            Stmt::Block(stmts) => {
                self.push("{");
                self.depth += 1;
                self.stmts(stmts);
                self.depth -= 1;
                self.line();
                self.push("}");
            }
            Stmt::HaltCompiler(_) | Stmt::Nop => {}
        }
    }

    fn consts(&mut self, consts: &[Const]) {
        self.push("const ");
        for (i, item) in consts.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&item.name);
            self.push(" = ");
            self.expr(&item.value);
        }
        self.push(";");
    }

    fn adaptation(&mut self, adaptation: &TraitAdaptation) {
        match adaptation {
            TraitAdaptation::Alias {
                trait_,
                method,
                modifier,
                new_name,
            } => {
                if let Some(trait_) = trait_ {
                    self.push(&trait_.to_text());
                    self.push("::");
                }
                self.push(method);
                self.push(" as");
                if let Some(modifier) = modifier {
                    self.push(" ");
                    self.push(&modifiers(*modifier));
                }
                if let Some(new_name) = new_name {
                    self.push(" ");
                    self.push(new_name);
                }
                self.push(";");
            }
            TraitAdaptation::Precedence {
                trait_,
                method,
                insteadof,
            } => {
                self.push(&trait_.to_text());
                self.push("::");
                self.push(method);
                self.push(" insteadof ");
                self.push(&insteadof.iter().map(Name::to_text).collect::<Vec<_>>().join(", "));
                self.push(";");
            }
        }
    }

    fn class_like(&mut self, class: &ClassLike, args: Option<&[Arg]>) {
        let flags = modifiers(class.flags);
        if !flags.is_empty() {
            self.push(&flags);
            self.push(" ");
        }
        self.push(match class.kind {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Trait => "trait",
        });
        if let Some(args) = args {
            self.args(args);
        }
        if let Some(name) = &class.name {
            self.push(" ");
            self.push(name);
        }
        if !class.extends.is_empty() {
            self.push(" extends ");
            self.push(&class.extends.iter().map(Name::to_text).collect::<Vec<_>>().join(", "));
        }
        if !class.implements.is_empty() {
            self.push(" implements ");
            self.push(&class.implements.iter().map(Name::to_text).collect::<Vec<_>>().join(", "));
        }
        self.block(&class.stmts);
    }

    fn signature(&mut self, params: &[Param], return_type: Option<&TypeHint>) {
        self.push("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let flags = modifiers(param.flags);
            if !flags.is_empty() {
                self.push(&flags);
                self.push(" ");
            }
            if let Some(ty) = &param.ty {
                self.push(&type_hint(ty));
                self.push(" ");
            }
            if param.by_ref {
                self.push("&");
            }
            if param.variadic {
                self.push("...");
            }
            self.push("$");
            self.push(&param.name);
            if let Some(default) = &param.default {
                self.push(" = ");
                self.expr(default);
            }
        }
        self.push(")");
        if let Some(ty) = return_type {
            self.push(": ");
            self.push(&type_hint(ty));
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(expr);
        }
    }

    fn operand(&mut self, expr: &Expr) {
        if is_atomic(expr) {
            self.expr(expr);
        } else {
            self.push("(");
            self.expr(expr);
            self.push(")");
        }
    }

    fn receiver(&mut self, expr: &Expr) {
        if is_dereferenceable(expr) {
            self.expr(expr);
        } else {
            self.push("(");
            self.expr(expr);
            self.push(")");
        }
    }

    fn class_ref(&mut self, class: &ClassRef) {
        match class {
            ClassRef::Name(name) => self.push(&name.to_text()),
            ClassRef::Expr(expr) => self.receiver(expr),
            ClassRef::Anonymous(decl) => self.class_like(decl, None),
        }
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Ident(name) => self.push(name),
            Member::Expr(expr) => {
                self.push("{");
                self.expr(expr);
                self.push("}");
            }
        }
    }

    fn args(&mut self, args: &[Arg]) {
        self.push("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if let Some(name) = &arg.name {
                self.push(name);
                self.push(": ");
            }
            if arg.unpack {
                self.push("...");
            }
            self.expr(&arg.value);
        }
        self.push(")");
    }

    fn items(&mut self, items: &[Option<ArrayItem>]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let Some(item) = item else {
                continue;
            };
            if let Some(key) = &item.key {
                self.expr(key);
                self.push(" => ");
            }
            if item.by_ref {
                self.push("&");
            }
            if item.unpack {
                self.push("...");
            }
            self.expr(&item.value);
        }
    }

    fn string(&mut self, value: &str) {
        if value.is_empty() {
            self.push("''");
        } else if self.options.obfuscate_strings {
            let escaped = escape_bytes(value, self.rng);
            self.push("\"");
            self.push(&escaped);
            self.push("\"");
        } else {
            self.push(&single_quoted(value));
        }
    }

    fn closure_params(&mut self, is_static: bool, keyword: &str, by_ref: bool) {
        if is_static {
            self.push("static ");
        }
        self.push(keyword);
        if by_ref {
            self.push(" &");
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(value) if *value == i64::MIN => self.push("PHP_INT_MIN"),
            Expr::Int(value) => self.push(&value.to_string()),
            Expr::Float(value) if value.is_nan() => self.push("NAN"),
            Expr::Float(value) if value.is_infinite() => {
                self.push(if value.is_sign_negative() { "-INF" } else { "INF" });
            }
            Expr::Float(value) => self.push(&format!("{value:?}")),
            Expr::String(value) => self.string(value),
            Expr::Interpolated(parts) => {
                if parts.is_empty() {
                    self.push("''");
                    return;
                }
                self.push("(");
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.push(" . ");
                    }
                    match part {
                        InterpolatedPart::Literal(text) => self.string(text),
                        InterpolatedPart::Expr(inner) => self.operand(inner),
                    }
                }
                self.push(")");
            }
            Expr::ShellExec(parts) => {
                self.push("`");
                for part in parts {
                    match part {
                        InterpolatedPart::Literal(text) => self.push(text),
                        InterpolatedPart::Expr(inner) => {
                            self.push("{");
                            self.expr(inner);
                            self.push("}");
                        }
                    }
                }
                self.push("`");
            }
            Expr::MagicConst(magic) => self.push(magic.keyword()),
            Expr::Array { items, short } => {
                self.push(if *short { "[" } else { "array(" });
                self.items(items);
                self.push(if *short { "]" } else { ")" });
            }
            Expr::List(items) => {
                self.push("list(");
                self.items(items);
                self.push(")");
            }
            Expr::Variable(VarName::Ident(name)) => {
                self.push("$");
                self.push(name);
            }
            Expr::Variable(VarName::Expr(inner)) => {
                self.push("${");
                self.expr(inner);
                self.push("}");
            }
            Expr::ConstFetch(name) => self.push(&name.to_text()),
            Expr::ClassConstFetch { class, name } => {
                self.class_ref(class);
                self.push("::");
                self.push(name);
            }
            Expr::Assign { var, expr, by_ref } => {
                self.expr(var);
                self.push(if *by_ref { " =& " } else { " = " });
                self.operand(expr);
            }
            Expr::AssignOp { op, var, expr } => {
                self.expr(var);
                self.push(" ");
                self.push(op.symbol());
                self.push("= ");
                self.operand(expr);
            }
            Expr::Binary { op, left, right } => {
                self.operand(left);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.operand(right);
            }
            Expr::Unary { op, expr } => {
                self.push(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::BitwiseNot => "~",
                    UnaryOp::Minus => "-",
                    UnaryOp::Plus => "+",
                });
                self.operand(expr);
            }
            Expr::IncDec { op, var } => match op {
                IncDecOp::PreInc => {
                    self.push("++");
                    self.expr(var);
                }
                IncDecOp::PreDec => {
                    self.push("--");
                    self.expr(var);
                }
                IncDecOp::PostInc => {
                    self.expr(var);
                    self.push("++");
                }
                IncDecOp::PostDec => {
                    self.expr(var);
                    self.push("--");
                }
            },
            Expr::Cast { kind, expr } => {
                self.push(cast_keyword(*kind));
                self.push(" ");
                self.operand(expr);
            }
            Expr::Ternary { cond, then, else_ } => {
                self.operand(cond);
                match then {
                    Some(then) => {
                        self.push(" ? ");
                        self.operand(then);
                        self.push(" : ");
                    }
                    None => self.push(" ?: "),
                }
                self.operand(else_);
            }
            Expr::Instanceof { expr, class } => {
                self.operand(expr);
                self.push(" instanceof ");
                self.class_ref(class);
            }
            Expr::ArrayDimFetch { var, dim } => {
                self.receiver(var);
                self.push("[");
                if let Some(dim) = dim {
                    self.expr(dim);
                }
                self.push("]");
            }
            Expr::PropertyFetch {
                var,
                name,
                nullsafe,
            } => {
                self.receiver(var);
                self.push(if *nullsafe { "?->" } else { "->" });
                self.member(name);
            }
            Expr::StaticPropertyFetch { class, name } => {
                self.class_ref(class);
                self.push("::$");
                self.member(name);
            }
            Expr::FuncCall { name, args } => {
                match name {
                    Callee::Name(name) => self.push(&name.to_text()),
                    Callee::Expr(callee) => self.receiver(callee),
                }
                self.args(args);
            }
            Expr::MethodCall {
                var,
                name,
                args,
                nullsafe,
            } => {
                self.receiver(var);
                self.push(if *nullsafe { "?->" } else { "->" });
                self.member(name);
                self.args(args);
            }
            Expr::StaticCall { class, name, args } => {
                self.class_ref(class);
                self.push("::");
                self.member(name);
                self.args(args);
            }
            Expr::New { class, args } => {
                self.push("new ");
                match class {
                    ClassRef::Anonymous(decl) => self.class_like(decl, Some(args)),
                    ClassRef::Name(name) => {
                        self.push(&name.to_text());
                        self.args(args);
                    }
                    ClassRef::Expr(expr) => {
                        if matches!(
                            **expr,
                            Expr::Variable(_)
                                | Expr::ArrayDimFetch { .. }
                                | Expr::PropertyFetch { .. }
                                | Expr::StaticPropertyFetch { .. }
                        ) {
                            self.expr(expr);
                        } else {
                            self.push("(");
                            self.expr(expr);
                            self.push(")");
                        }
                        self.args(args);
                    }
                }
            }
            Expr::Closure(closure) => {
                self.closure_params(closure.is_static, "function", closure.by_ref);
                self.signature(&closure.params, None);
                if !closure.uses.is_empty() {
                    self.push(" use (");
                    let uses: Vec<String> = closure
                        .uses
                        .iter()
                        .map(|u| format!("{}${}", if u.by_ref { "&" } else { "" }, u.var))
                        .collect();
                    self.push(&uses.join(", "));
                    self.push(")");
                }
                if let Some(ty) = &closure.return_type {
                    self.push(": ");
                    self.push(&type_hint(ty));
                }
                self.block(&closure.stmts);
            }
            Expr::ArrowFunction(arrow) => {
                self.closure_params(arrow.is_static, "fn", arrow.by_ref);
                self.signature(&arrow.params, arrow.return_type.as_ref());
                self.push(" => ");
                self.operand(&arrow.expr);
            }
            Expr::Isset(vars) => {
                self.push("isset(");
                self.list(vars);
                self.push(")");
            }
            Expr::Empty(expr) => {
                self.push("empty(");
                self.expr(expr);
                self.push(")");
            }
            Expr::Exit(expr) => {
                self.push("exit");
                if let Some(expr) = expr {
                    self.push("(");
                    self.expr(expr);
                    self.push(")");
                }
            }
            Expr::Print(expr) => {
                self.push("print ");
                self.operand(expr);
            }
            Expr::Include { kind, expr } => {
                self.push(include_keyword(*kind));
                self.push(" ");
                self.operand(expr);
            }
            Expr::Eval(expr) => {
                self.push("eval(");
                self.expr(expr);
                self.push(")");
            }
            Expr::Clone(expr) => {
                self.push("clone ");
                self.operand(expr);
            }
            Expr::ErrorSuppress(expr) => {
                self.push("@");
                self.operand(expr);
            }
            Expr::Throw(expr) => {
                self.push("throw ");
                self.operand(expr);
            }
            Expr::Yield { key, value } => {
                self.push("yield");
                if let Some(key) = key {
                    self.push(" ");
                    self.operand(key);
                    self.push(" =>");
                }
                if let Some(value) = value {
                    self.push(" ");
                    self.operand(value);
                }
            }
            Expr::YieldFrom(expr) => {
                self.push("yield from ");
                self.operand(expr);
            }
            Expr::Match { cond, arms } => {
                self.push("match (");
                self.expr(cond);
                self.push(") {");
                for (i, arm) in arms.iter().enumerate() {
                    self.push(if i == 0 { " " } else { ", " });
                    match &arm.conds {
                        Some(conds) => self.list(conds),
                        None => self.push("default"),
                    }
                    self.push(" => ");
                    self.expr(&arm.body);
                }
                self.push(" }");
            }
        }
    }
}

const fn use_kind_keyword(kind: UseKind) -> &'static str {
    match kind {
        UseKind::Function => "function ",
        UseKind::Constant => "const ",
        UseKind::Normal | UseKind::Unknown => "",
    }
}

fn use_item(item: &UseItem, with_kind: bool) -> String {
    let mut text = String::new();
    if with_kind {
        text.push_str(use_kind_keyword(item.kind));
    }
    text.push_str(&item.name.to_text());
    if let Some(alias) = &item.alias {
        text.push_str(" as ");
        text.push_str(alias);
    }
    text
}
