use crate::interp::run;
use crate::{echo, function, rewrite, seeded};
use fescate_core::ast::{Expr, Name, Stmt, UseItem, UseKind};
use fescate_transform::config::ChunkMode;
use fescate_transform::ObfuscationConfig;

fn shuffle_only() -> ObfuscationConfig {
    ObfuscationConfig {
        shuffle_stmts: true,
        ..seeded().without_renaming()
    }
}

fn tags(stmts: &[Stmt]) -> Vec<i64> {
    stmts
        .iter()
        .filter_map(|s| match s {
            Stmt::Echo(exprs) => match exprs.as_slice() {
                [Expr::Int(n)] => Some(*n),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn expected(range: std::ops::RangeInclusive<i64>) -> String {
    range.map(|n| n.to_string()).collect()
}

#[test]
fn execution_order_survives_reordering() {
    let program: Vec<Stmt> = (1..=12).map(echo).collect();
    let (shuffled, _) = rewrite(&shuffle_only(), program);

    assert!(matches!(shuffled.first(), Some(Stmt::Goto(_))));
    assert_eq!(shuffled.last(), Some(&echo(12)));
    assert_ne!(tags(&shuffled), (1..=12).collect::<Vec<_>>());
    assert_eq!(run(&shuffled).output, expected(1..=12));
}

#[test]
fn function_bodies_shuffle_in_ratio_mode() {
    let config = ObfuscationConfig {
        chunk_mode: ChunkMode::Ratio,
        chunk_ratio: 4,
        min_chunk_size: 2,
        ..shuffle_only()
    };
    let body: Vec<Stmt> = (1..=16).map(echo).collect();
    let program = vec![
        function("emit", &[], body),
        Stmt::expr(Expr::call("emit", Vec::new())),
    ];
    let (shuffled, _) = rewrite(&config, program);

    let Stmt::Function(emit) = &shuffled[0] else {
        panic!("expected the function first");
    };
    // Four chunks of four, each framed by a label and a goto.
    assert_eq!(emit.stmts.len(), 16 + 4 * 2 + 2);
    assert_eq!(run(&shuffled).output, expected(1..=16));
}

#[test]
fn imports_stay_ahead_of_shuffled_code() {
    let import = Stmt::Use {
        kind: UseKind::Normal,
        uses: vec![UseItem {
            kind: UseKind::Unknown,
            name: Name::parse("App\\Support\\Str"),
            alias: None,
        }],
    };
    let mut program = vec![import.clone()];
    program.extend((1..=6).map(echo));
    let (shuffled, _) = rewrite(&shuffle_only(), program);

    assert_eq!(shuffled[0], import);
    assert!(matches!(shuffled[1], Stmt::Goto(_)));
    assert_eq!(shuffled.last(), Some(&echo(6)));
    assert_eq!(run(&shuffled[1..]).output, expected(1..=6));
}

#[test]
fn short_bodies_are_not_shuffled() {
    let config = ObfuscationConfig {
        min_chunk_size: 4,
        ..shuffle_only()
    };
    let program: Vec<Stmt> = (1..=5).map(echo).collect();
    let (same, _) = rewrite(&config, program.clone());
    assert_eq!(same, program);
}
