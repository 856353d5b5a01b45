//! Cross-crate tests and the helpers they share.
//!
//! Programs are built directly as syntax trees so that no external parser is
//! needed; [`interp`] runs them before and after rewriting.

pub mod interp;

#[cfg(test)]
mod core;
#[cfg(test)]
mod transforms;

use fescate_core::ast::{BinaryOp, Expr, Foreach, Function, If, Param, Stmt};
use fescate_core::reserved::Builtins;
use fescate_transform::scram::Scram;
use fescate_transform::shuffle::Shuffle;
use fescate_transform::{pass, ConstantTable, ObfuscationConfig, RewriteContext, Scramblers, Transform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Default configuration with a fixed seed.
pub fn seeded() -> ObfuscationConfig {
    ObfuscationConfig {
        seed: Some(42),
        ..ObfuscationConfig::default()
    }
}

/// Run the rewrite pass and top-level shuffling over `program`.
pub fn rewrite(config: &ObfuscationConfig, mut program: Vec<Stmt>) -> (Vec<Stmt>, Scramblers) {
    let mut scramblers = Scramblers::new(config, &Builtins::standard());
    let constants = ConstantTable::new();
    let passes: Vec<Box<dyn Transform>> = vec![Box::new(Scram), Box::new(Shuffle)];
    let mut rng = StdRng::seed_from_u64(42);
    let mut cx = RewriteContext {
        config,
        scramblers: &mut scramblers,
        constants: &constants,
    };
    pass::run(&mut program, &passes, &mut cx, &mut rng).unwrap();
    (program, scramblers)
}

// Expressions

pub fn int(n: i64) -> Expr {
    Expr::Int(n)
}

pub fn text(s: &str) -> Expr {
    Expr::string(s)
}

pub fn var(name: &str) -> Expr {
    Expr::var(name)
}

pub fn tru() -> Expr {
    Expr::constant("true")
}

pub fn lt(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinaryOp::Smaller, a, b)
}

pub fn eq(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinaryOp::Identical, a, b)
}

pub fn modulo(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinaryOp::Mod, a, b)
}

pub fn plus(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinaryOp::Plus, a, b)
}

pub fn concat(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinaryOp::Concat, a, b)
}

pub fn list(values: &[i64]) -> Expr {
    Expr::Array {
        items: values
            .iter()
            .map(|&v| {
                Some(fescate_core::ast::ArrayItem {
                    key: None,
                    value: Expr::Int(v),
                    by_ref: false,
                    unpack: false,
                })
            })
            .collect(),
        short: true,
    }
}

// Statements

pub fn echo(n: i64) -> Stmt {
    Stmt::Echo(vec![Expr::Int(n)])
}

pub fn echo_var(name: &str) -> Stmt {
    Stmt::Echo(vec![Expr::var(name)])
}

pub fn set(name: &str, value: Expr) -> Stmt {
    Stmt::expr(Expr::assign(Expr::var(name), value))
}

pub fn inc(name: &str) -> Stmt {
    Stmt::expr(Expr::IncDec {
        op: fescate_core::ast::IncDecOp::PostInc,
        var: Box::new(Expr::var(name)),
    })
}

pub fn if_(cond: Expr, stmts: Vec<Stmt>) -> Stmt {
    Stmt::If(If {
        cond,
        stmts,
        elseifs: Vec::new(),
        else_: None,
        doc: None,
    })
}

pub fn if_else(cond: Expr, stmts: Vec<Stmt>, else_: Vec<Stmt>) -> Stmt {
    Stmt::If(If {
        cond,
        stmts,
        elseifs: Vec::new(),
        else_: Some(else_),
        doc: None,
    })
}

pub fn while_(cond: Expr, stmts: Vec<Stmt>) -> Stmt {
    Stmt::While { cond, stmts }
}

pub fn do_(stmts: Vec<Stmt>, cond: Expr) -> Stmt {
    Stmt::Do { stmts, cond }
}

/// `for ($name = from; $name < to; $name++)`
pub fn count_to(name: &str, from: i64, to: i64, stmts: Vec<Stmt>) -> Stmt {
    Stmt::For {
        init: vec![Expr::assign(var(name), int(from))],
        cond: vec![lt(var(name), int(to))],
        step: vec![Expr::IncDec {
            op: fescate_core::ast::IncDecOp::PostInc,
            var: Box::new(var(name)),
        }],
        stmts,
    }
}

pub fn foreach(subject: Expr, value: &str, stmts: Vec<Stmt>) -> Stmt {
    Stmt::Foreach(Foreach {
        expr: subject,
        key: None,
        by_ref: false,
        value: var(value),
        stmts,
        doc: None,
    })
}

pub fn brk(depth: i64) -> Stmt {
    Stmt::Break((depth != 1).then(|| int(depth)))
}

pub fn cont(depth: i64) -> Stmt {
    Stmt::Continue((depth != 1).then(|| int(depth)))
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return {
        expr: Some(value),
        doc: None,
    }
}

pub fn function(name: &str, params: &[&str], stmts: Vec<Stmt>) -> Stmt {
    Stmt::Function(Function {
        name: name.to_string(),
        by_ref: false,
        params: params.iter().map(|p| Param::new(p)).collect(),
        return_type: None,
        stmts,
        doc: None,
    })
}
