use crate::{brk, echo, echo_var, inc, int, lt, rewrite, seeded, set, var, while_};
use fescate_core::printer::{Printer, PrinterOptions};
use fescate_transform::Category;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn print(stmts: &[fescate_core::ast::Stmt], compact: bool) -> String {
    let mut rng = StdRng::seed_from_u64(42);
    let options = PrinterOptions {
        compact,
        ..PrinterOptions::default()
    };
    Printer::new(options, &mut rng).print_file(stmts)
}

#[test]
fn rewritten_loop_prints_as_gotos() {
    let program = vec![
        set("total", int(0)),
        while_(
            lt(var("total"), int(10)),
            vec![inc("total"), echo_var("total"), brk(1)],
        ),
        echo(0),
    ];
    let (rewritten, scramblers) = rewrite(&seeded(), program);
    let source = print(&rewritten, false);

    assert!(source.starts_with("<?php\n"));
    assert!(!source.contains("while"));
    assert!(!source.contains("break"));
    assert!(source.contains("goto "));
    assert!(!source.contains("$total"));
    let total = &scramblers.get(Category::Variable).mappings()["total"];
    assert!(source.contains(&format!("${total}")));
}

#[test]
fn compact_output_is_a_single_line() {
    let program = vec![set("a", int(1)), echo_var("a")];
    let source = print(&program, true);
    assert!(source.starts_with("<?php "));
    assert_eq!(source.trim_end().lines().count(), 1);
}
