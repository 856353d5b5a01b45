//! Goto-based control flow must behave exactly like the structured original.

use crate::interp::run;
use crate::*;
use fescate_core::ast::{Case, ElseIf, Expr, If, Stmt, UnaryOp};
use fescate_transform::{Category, ObfuscationConfig};

fn no_shuffle() -> ObfuscationConfig {
    ObfuscationConfig {
        shuffle_stmts: false,
        ..seeded()
    }
}

/// Run `program` before and after rewriting under both shuffle settings and
/// return the common output.
fn equivalent(program: Vec<Stmt>) -> String {
    let expected = run(&program);
    for config in [seeded(), no_shuffle()] {
        let (rewritten, _) = rewrite(&config, program.clone());
        assert_eq!(run(&rewritten), expected, "rewritten: {rewritten:#?}");
    }
    expected.output
}

fn contains_loops(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match s {
        Stmt::For { .. } | Stmt::While { .. } | Stmt::Do { .. } => true,
        Stmt::If(node) => contains_loops(&node.stmts),
        _ => false,
    })
}

#[test]
fn elseif_chain_inside_for() {
    let chain = Stmt::If(If {
        cond: eq(var("i"), int(0)),
        stmts: vec![echo(100)],
        elseifs: vec![
            ElseIf {
                cond: eq(modulo(var("i"), int(2)), int(0)),
                stmts: vec![echo(2)],
            },
            ElseIf {
                cond: eq(var("i"), int(3)),
                stmts: vec![echo(3), echo(33)],
            },
        ],
        else_: Some(vec![echo(9)]),
        doc: None,
    });
    let program = vec![
        count_to(
            "i",
            0,
            6,
            vec![chain, if_(eq(var("i"), int(5)), vec![cont(1)]), echo_var("i")],
        ),
        echo(7),
    ];
    assert_eq!(equivalent(program.clone()), "1000912233332497");

    let (rewritten, _) = rewrite(&no_shuffle(), program);
    assert!(!contains_loops(&rewritten));
}

#[test]
fn nested_break_and_continue_with_depth() {
    let program = vec![
        set("i", int(0)),
        while_(
            lt(var("i"), int(4)),
            vec![
                inc("i"),
                set("j", int(0)),
                do_(
                    vec![
                        inc("j"),
                        if_(eq(var("j"), int(2)), vec![cont(2)]),
                        if_(eq(var("i"), int(3)), vec![brk(2)]),
                        echo_var("i"),
                        echo_var("j"),
                    ],
                    lt(var("j"), int(3)),
                ),
            ],
        ),
        echo(0),
    ];
    assert_eq!(equivalent(program), "11210");
}

#[test]
fn switch_inside_foreach() {
    let switch = Stmt::Switch {
        cond: var("n"),
        cases: vec![
            Case {
                cond: Some(int(1)),
                stmts: vec![echo(10), brk(1)],
            },
            Case {
                cond: Some(int(2)),
                stmts: vec![cont(2)],
            },
            Case {
                cond: Some(int(4)),
                stmts: vec![brk(2)],
            },
            Case {
                cond: None,
                stmts: vec![echo_var("n")],
            },
        ],
        doc: None,
    };
    let program = vec![
        foreach(list(&[1, 2, 3, 4, 5]), "n", vec![switch, echo(0)]),
        echo(7),
    ];
    assert_eq!(equivalent(program.clone()), "100307");

    let (rewritten, _) = rewrite(&no_shuffle(), program);
    assert!(rewritten.iter().any(|s| matches!(s, Stmt::Foreach(_))));
    assert!(!format!("{rewritten:?}").contains("Break("));
}

#[test]
fn continue_in_do_while_rechecks_the_condition() {
    let program = vec![
        set("n", int(0)),
        do_(
            vec![
                inc("n"),
                if_(eq(modulo(var("n"), int(2)), int(0)), vec![cont(1)]),
                echo_var("n"),
            ],
            lt(var("n"), int(7)),
        ),
    ];
    assert_eq!(equivalent(program), "1357");
}

#[test]
fn return_from_a_rewritten_loop() {
    let square = Expr::binary(fescate_core::ast::BinaryOp::Mul, var("k"), var("k"));
    let program = vec![
        function(
            "first_square_above",
            &["limit"],
            vec![
                set("k", int(0)),
                while_(
                    tru(),
                    vec![
                        inc("k"),
                        if_(
                            Expr::binary(fescate_core::ast::BinaryOp::Greater, square, var("limit")),
                            vec![ret(var("k"))],
                        ),
                    ],
                ),
            ],
        ),
        Stmt::Echo(vec![Expr::call("first_square_above", vec![int(10)])]),
        Stmt::Echo(vec![Expr::call("first_square_above", vec![int(50)])]),
    ];
    assert_eq!(equivalent(program), "48");
}

#[test]
fn break_two_targets_the_outer_loop() {
    let program = vec![while_(
        tru(),
        vec![while_(tru(), vec![brk(2)]), echo(1)],
    )];
    let (rewritten, _) = rewrite(&no_shuffle(), program);

    let Some(Stmt::Label(outer_break)) = rewritten.last() else {
        panic!("expected the outer break label last: {rewritten:#?}");
    };
    let jumps = rewritten
        .iter()
        .filter(|s| matches!(s, Stmt::Goto(l) if l == outer_break))
        .count();
    assert_eq!(jumps, 1);
    assert_eq!(run(&rewritten).output, "");
}

#[test]
fn simple_if_becomes_negated_guard() {
    let program = vec![if_(var("ready"), vec![echo(1)])];
    let (rewritten, scramblers) = rewrite(&no_shuffle(), program);
    let ready = scramblers.get(Category::Variable).mappings()["ready"].clone();

    let [Stmt::If(guard), body, Stmt::Label(end)] = rewritten.as_slice() else {
        panic!("unexpected shape: {rewritten:#?}");
    };
    assert_eq!(
        guard.cond,
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(var(&ready)),
        }
    );
    assert_eq!(guard.stmts, [Stmt::Goto(end.clone())]);
    assert!(guard.elseifs.is_empty() && guard.else_.is_none());
    assert_eq!(*body, echo(1));
}

#[test]
fn disabled_flags_keep_structure() {
    let config = ObfuscationConfig {
        obfuscate_if_stmt: false,
        obfuscate_loop_stmt: false,
        ..no_shuffle()
    };
    let program = vec![
        set("i", int(0)),
        while_(
            lt(var("i"), int(3)),
            vec![inc("i"), if_else(eq(var("i"), int(2)), vec![brk(1)], vec![echo_var("i")])],
        ),
    ];
    let (rewritten, _) = rewrite(&config, program.clone());
    assert!(matches!(rewritten[1], Stmt::While { .. }));
    assert_eq!(run(&rewritten), run(&program));
}
