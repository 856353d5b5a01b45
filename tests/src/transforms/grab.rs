use fescate_core::ast::{BinaryOp, Const, Expr, Stmt};
use fescate_core::traverse::Traverser;
use fescate_transform::grab::GrabVisitor;
use fescate_transform::ConstantTable;

fn constant(name: &str, value: Expr, doc: Option<&str>) -> Stmt {
    Stmt::Const {
        consts: vec![Const {
            name: name.into(),
            value,
            doc: None,
        }],
        doc: doc.map(str::to_string),
    }
}

fn grab(table: &mut ConstantTable, program: Vec<Stmt>) {
    let mut visitor = GrabVisitor::new(table);
    Traverser::new(&mut visitor).traverse(program).unwrap();
}

fn a_dot_y() -> Expr {
    Expr::binary(BinaryOp::Concat, Expr::constant("A"), Expr::string("y"))
}

#[test]
fn concatenated_constant_is_folded() {
    let mut table = ConstantTable::new();
    grab(
        &mut table,
        vec![
            constant("A", Expr::string("x"), None),
            constant("B", a_dot_y(), None),
        ],
    );
    assert_eq!(table.get("B").and_then(|c| c.value()).as_deref(), Some("xy"));
    assert_eq!(table.resolve(), 0);
}

#[test]
fn forward_reference_across_files_resolves_after_sweep() {
    let mut table = ConstantTable::new();
    grab(&mut table, vec![constant("B", a_dot_y(), None)]);
    grab(
        &mut table,
        vec![constant("A", Expr::string("x"), Some("/** @fescate(encode) */"))],
    );
    assert_eq!(table.get("B").and_then(|c| c.value()), None);

    assert_eq!(table.resolve(), 1);
    assert_eq!(table.get("B").and_then(|c| c.value()).as_deref(), Some("xy"));
    assert!(table.encode("A"));
    assert!(!table.encode("B"));
}
