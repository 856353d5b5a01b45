//! The whole per-file pipeline, fed with syntax-tree dumps instead of source.

use crate::seeded;
use fescate_core::ast::Stmt;
use fescate_core::frontend::{read_dump, SourceParser};
use fescate_core::reserved::Builtins;
use fescate_transform::{Category, ObfuscationConfig, Obfuscator};
use fescate_utils::errors::{ObfuscateError, ParseError};
use serde_json::json;

/// Treats the "source" as a JSON dump.
struct DumpParser;

impl SourceParser for DumpParser {
    fn parse(&self, source: &str) -> Result<Vec<Stmt>, ParseError> {
        read_dump(source)
    }
}

fn obfuscator(config: ObfuscationConfig) -> Obfuscator {
    Obfuscator::with_parser(config, &Builtins::standard(), Box::new(DumpParser))
}

fn ident(name: &str) -> serde_json::Value {
    json!({"nodeType": "Identifier", "name": name})
}

fn fetch(name: &str) -> serde_json::Value {
    json!({"nodeType": "Expr_ConstFetch", "name": {"nodeType": "Name", "parts": [name]}})
}

fn declare(name: &str, value: serde_json::Value) -> serde_json::Value {
    json!({
        "nodeType": "Stmt_Const",
        "consts": [{"nodeType": "Const", "name": ident(name), "value": value}]
    })
}

fn string(value: &str) -> serde_json::Value {
    json!({"nodeType": "Scalar_String", "value": value})
}

#[test]
fn constants_grabbed_across_files() {
    let first = json!([
        declare("B", json!({"nodeType": "Expr_BinaryOp_Concat", "left": fetch("A"), "right": string("y")})),
        {"nodeType": "Stmt_Echo", "exprs": [fetch("B")]}
    ])
    .to_string();
    let second = json!([declare("A", string("x"))]).to_string();

    let mut obfuscator = obfuscator(seeded());
    assert_eq!(obfuscator.grab(&first).unwrap(), 1);
    assert_eq!(obfuscator.grab(&second).unwrap(), 1);
    assert_eq!(obfuscator.resolve_constants(), 1);
    assert_eq!(
        obfuscator.constants().get("B").and_then(|c| c.value()).as_deref(),
        Some("xy")
    );

    let result = obfuscator.obfuscate(&first).unwrap();
    let b = &obfuscator.scramblers().get(Category::Constant).mappings()["B"];
    assert!(result.source.starts_with("<?php"));
    assert!(result.source.contains(b.as_str()));
    assert_eq!(result.transforms_applied, ["Scram"]);
    assert_eq!(result.obfuscated_size, result.source.len());
}

#[test]
fn unparsable_source_is_not_fatal() {
    let mut obfuscator = obfuscator(seeded());
    let err = obfuscator.obfuscate("<?php echo 1;").unwrap_err();
    assert!(matches!(err, ObfuscateError::Parse(_)));
    assert!(!err.is_fatal());
}

#[test]
fn header_follows_opening_tag() {
    let config = ObfuscationConfig {
        comment: Some("Generated build\nDo not edit".into()),
        strip_indentation: false,
        ..seeded()
    };
    let source = format!("#!/usr/bin/env php\n{}", json!([{"nodeType": "Stmt_Nop"}]));
    let result = obfuscator(config).obfuscate(&source).unwrap();
    assert!(result.source.starts_with(
        "#!/usr/bin/env php\n<?php\n/*\n * Generated build\n * Do not edit\n */\n"
    ));
}

#[test]
fn named_constructor_arguments_across_files() {
    let param = |name: &str, flags: u32| {
        json!({
            "nodeType": "Param",
            "var": {"nodeType": "Expr_Variable", "name": name},
            "flags": flags
        })
    };
    let arg = |name: &str, value: serde_json::Value| {
        json!({"nodeType": "Arg", "value": value, "byRef": false, "unpack": false, "name": ident(name)})
    };
    let declaration = json!([{
        "nodeType": "Stmt_Class",
        "name": ident("Account"),
        "stmts": [{
            "nodeType": "Stmt_ClassMethod",
            "flags": 1,
            "name": ident("__construct"),
            "params": [param("owner", 4), param("limit", 0)],
            "stmts": []
        }]
    }])
    .to_string();
    let usage = json!([{
        "nodeType": "Stmt_Expression",
        "expr": {
            "nodeType": "Expr_New",
            "class": {"nodeType": "Name", "parts": ["Account"]},
            "args": [arg("owner", string("ann")), arg("limit", json!({"nodeType": "Scalar_LNumber", "value": 5}))]
        }
    }])
    .to_string();

    let mut obfuscator = obfuscator(seeded());
    obfuscator.grab(&declaration).unwrap();
    obfuscator.grab(&usage).unwrap();
    obfuscator.resolve_constants();
    let result = obfuscator.obfuscate(&usage).unwrap();

    let scramblers = obfuscator.scramblers();
    let owner = &scramblers.get(Category::Property).mappings()["owner"];
    let limit = &scramblers.get(Category::Variable).mappings()["limit"];
    assert!(result.source.contains(&format!("({owner}: ")));
    assert!(result.source.contains(&format!(", {limit}: 5)")));
}
