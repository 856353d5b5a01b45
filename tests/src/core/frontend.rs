use crate::interp::run;
use crate::{rewrite, seeded};
use fescate_core::frontend::{read_dump, read_stmt_list};
use serde_json::{json, Value};

fn var(name: &str) -> Value {
    json!({"nodeType": "Expr_Variable", "name": name})
}

fn int(n: i64) -> Value {
    json!({"nodeType": "Scalar_LNumber", "value": n})
}

fn when(cond: Value, stmts: Value) -> Value {
    json!({"nodeType": "Stmt_If", "cond": cond, "stmts": stmts, "elseifs": [], "else": null})
}

fn identical(left: Value, right: Value) -> Value {
    json!({"nodeType": "Expr_BinaryOp_Identical", "left": left, "right": right})
}

/// `$i = 0; while ($i < 5) { $i++; if ($i === 2) continue; if ($i === 4) break; echo $i; } echo "done";`
fn counting_loop() -> Value {
    json!([
        {
            "nodeType": "Stmt_Expression",
            "expr": {"nodeType": "Expr_Assign", "var": var("i"), "expr": int(0)}
        },
        {
            "nodeType": "Stmt_While",
            "cond": {"nodeType": "Expr_BinaryOp_Smaller", "left": var("i"), "right": int(5)},
            "stmts": [
                {"nodeType": "Stmt_Expression", "expr": {"nodeType": "Expr_PostInc", "var": var("i")}},
                when(identical(var("i"), int(2)), json!([{"nodeType": "Stmt_Continue", "num": null}])),
                when(identical(var("i"), int(4)), json!([{"nodeType": "Stmt_Break", "num": null}])),
                {"nodeType": "Stmt_Echo", "exprs": [var("i")]}
            ]
        },
        {
            "nodeType": "Stmt_Echo",
            "exprs": [{"nodeType": "Scalar_String", "value": "done", "attributes": {"kind": 2}}]
        }
    ])
}

#[test]
fn parsed_loop_runs_the_same_after_rewriting() {
    let program = read_stmt_list(&counting_loop()).unwrap();
    assert_eq!(run(&program).output, "13done");

    let (rewritten, _) = rewrite(&seeded(), program.clone());
    assert_ne!(rewritten, program);
    assert_eq!(run(&rewritten).output, "13done");
}

#[test]
fn dump_with_banner_matches_plain_list() {
    let dump = format!("====> File /tmp/loop.php:\n==> JSON dump:\n{:#}\n", counting_loop());
    assert_eq!(
        read_dump(&dump).unwrap(),
        read_stmt_list(&counting_loop()).unwrap()
    );
}
