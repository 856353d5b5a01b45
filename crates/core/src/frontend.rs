//! Source front end: turns a JSON syntax dump into the [`crate::ast`] model.
//!
//! The dump format is the one produced by `php-parse --json-dump`: an array of
//! nodes, each an object with a `nodeType` tag and its sub-nodes as fields.
//! Node names from both the 4.x and 5.x dumpers are accepted.

use crate::ast::*;
use fescate_utils::errors::ParseError;
use serde_json::Value;
use std::io::Write;
use std::process::Command;
use tracing::debug;

/// Anything that can turn source text into a statement list.
pub trait SourceParser {
    fn parse(&self, source: &str) -> Result<Vec<Stmt>, ParseError>;
}

/// Runs an external dumper on the source and reads its JSON output.
#[derive(Debug, Clone)]
pub struct ExternalParser {
    program: String,
    args: Vec<String>,
}

impl ExternalParser {
    pub const DEFAULT_COMMAND: &'static str = "php-parse --json-dump";

    /// `command` is split on whitespace; the source file path is appended last.
    pub fn new(command: &str) -> Result<Self, ParseError> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| ParseError::Command {
            command: command.to_string(),
            reason: "empty command".into(),
        })?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SourceParser for ExternalParser {
    fn parse(&self, source: &str) -> Result<Vec<Stmt>, ParseError> {
        let mut file = tempfile::Builder::new().suffix(".php").tempfile()?;
        file.write_all(source.as_bytes())?;
        file.flush()?;

        debug!("running `{} {}`", self.command_line(), file.path().display());
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .output()
            .map_err(|e| ParseError::Command {
                command: self.command_line(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(ParseError::Command {
                command: self.command_line(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        read_dump(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse a dump, skipping any banner the dumper prints before the JSON array.
pub fn read_dump(text: &str) -> Result<Vec<Stmt>, ParseError> {
    let start = text.find('[').ok_or_else(|| ParseError::Malformed {
        node: "dump".into(),
        msg: "no JSON array in parser output".into(),
    })?;
    let value: Value = serde_json::from_str(text[start..].trim_end())?;
    read_stmt_list(&value)
}

/// Convert an already-decoded JSON array of statement nodes.
pub fn read_stmt_list(value: &Value) -> Result<Vec<Stmt>, ParseError> {
    let nodes = value.as_array().ok_or_else(|| ParseError::Malformed {
        node: "dump".into(),
        msg: "top level is not an array".into(),
    })?;
    nodes.iter().map(stmt).collect()
}

// =============================================================================
// Field access
// =============================================================================

fn node_type(v: &Value) -> Result<&str, ParseError> {
    v.get("nodeType")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("node", "missing nodeType"))
}

fn malformed(node: &str, msg: &str) -> ParseError {
    ParseError::Malformed {
        node: node.to_string(),
        msg: msg.to_string(),
    }
}

/// Field that may be absent or `null`.
fn opt<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|f| !f.is_null())
}

fn field<'a>(v: &'a Value, key: &str) -> Result<&'a Value, ParseError> {
    opt(v, key).ok_or_else(|| {
        let node = v.get("nodeType").and_then(Value::as_str).unwrap_or("node");
        malformed(node, &format!("missing `{key}`"))
    })
}

fn list<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    opt(v, key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn flag(v: &Value, key: &str) -> bool {
    opt(v, key).and_then(Value::as_bool).unwrap_or(false)
}

fn int(v: &Value, key: &str) -> i64 {
    opt(v, key).and_then(Value::as_i64).unwrap_or(0)
}

fn string(v: &Value, key: &str) -> Result<String, ParseError> {
    field(v, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(node_type(v).unwrap_or("node"), &format!("`{key}` is not a string")))
}

fn attribute<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get("attributes").and_then(|a| opt(a, key))
}

/// Text of the last doc comment attached to a node.
fn doc(v: &Value) -> Option<String> {
    attribute(v, "comments")?
        .as_array()?
        .iter()
        .rev()
        .find(|c| c.get("nodeType").and_then(Value::as_str) == Some("Comment_Doc"))
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn modifiers(v: &Value) -> Modifiers {
    Modifiers(u32::try_from(int(v, "flags")).unwrap_or(0))
}

/// `Identifier`, `VarLikeIdentifier` or a bare string.
fn ident(v: &Value) -> Result<String, ParseError> {
    if let Some(s) = v.as_str() {
        return Ok(s.to_string());
    }
    string(v, "name")
}

fn name(v: &Value) -> Result<Name, ParseError> {
    let kind = match node_type(v)? {
        "Name" => NameKind::Normal,
        "Name_FullyQualified" => NameKind::FullyQualified,
        "Name_Relative" => NameKind::Relative,
        other => return Err(malformed(other, "expected a name")),
    };
    let parts = match opt(v, "parts").and_then(Value::as_array) {
        Some(parts) => parts
            .iter()
            .map(|p| p.as_str().map(str::to_string).ok_or_else(|| malformed("Name", "non-string part")))
            .collect::<Result<Vec<_>, _>>()?,
        None => string(v, "name")?.split('\\').map(str::to_string).collect(),
    };
    Ok(Name { parts, kind })
}

fn names(v: &Value, key: &str) -> Result<Vec<Name>, ParseError> {
    list(v, key).iter().map(name).collect()
}

fn opt_name(v: &Value, key: &str) -> Result<Option<Name>, ParseError> {
    opt(v, key).map(name).transpose()
}

fn type_hint(v: &Value) -> Result<TypeHint, ParseError> {
    Ok(match node_type(v)? {
        "Identifier" => TypeHint::Keyword(ident(v)?),
        "Name" | "Name_FullyQualified" | "Name_Relative" => TypeHint::Name(name(v)?),
        "NullableType" => TypeHint::Nullable(Box::new(type_hint(field(v, "type")?)?)),
        "UnionType" => TypeHint::Union(list(v, "types").iter().map(type_hint).collect::<Result<_, _>>()?),
        "IntersectionType" => {
            TypeHint::Intersection(list(v, "types").iter().map(type_hint).collect::<Result<_, _>>()?)
        }
        other => return Err(ParseError::Unsupported(other.to_string())),
    })
}

fn opt_type(v: &Value, key: &str) -> Result<Option<TypeHint>, ParseError> {
    opt(v, key).map(type_hint).transpose()
}

// =============================================================================
// Statements
// =============================================================================

fn stmts(v: &Value, key: &str) -> Result<Vec<Stmt>, ParseError> {
    list(v, key).iter().map(stmt).collect()
}

fn opt_stmts(v: &Value, key: &str) -> Result<Option<Vec<Stmt>>, ParseError> {
    match opt(v, key) {
        Some(value) => Ok(Some(read_stmt_list(value)?)),
        None => Ok(None),
    }
}

fn stmt(v: &Value) -> Result<Stmt, ParseError> {
    let kind = node_type(v)?;
    Ok(match kind {
        "Stmt_Expression" => Stmt::Expression {
            expr: expr(field(v, "expr")?)?,
            doc: doc(v),
        },
        "Stmt_Echo" => Stmt::Echo(exprs(v, "exprs")?),
        "Stmt_InlineHTML" => Stmt::InlineHtml(string(v, "value")?),
        "Stmt_Return" => Stmt::Return {
            expr: opt_expr(v, "expr")?,
            doc: doc(v),
        },
        "Stmt_If" => Stmt::If(If {
            cond: expr(field(v, "cond")?)?,
            stmts: stmts(v, "stmts")?,
            elseifs: list(v, "elseifs")
                .iter()
                .map(|e| {
                    Ok(ElseIf {
                        cond: expr(field(e, "cond")?)?,
                        stmts: stmts(e, "stmts")?,
                    })
                })
                .collect::<Result<_, ParseError>>()?,
            else_: opt(v, "else").map(|e| stmts(e, "stmts")).transpose()?,
            doc: doc(v),
        }),
        "Stmt_For" => Stmt::For {
            init: exprs(v, "init")?,
            cond: exprs(v, "cond")?,
            step: exprs(v, "loop")?,
            stmts: stmts(v, "stmts")?,
        },
        "Stmt_While" => Stmt::While {
            cond: expr(field(v, "cond")?)?,
            stmts: stmts(v, "stmts")?,
        },
        "Stmt_Do" => Stmt::Do {
            stmts: stmts(v, "stmts")?,
            cond: expr(field(v, "cond")?)?,
        },
        "Stmt_Foreach" => Stmt::Foreach(Foreach {
            expr: expr(field(v, "expr")?)?,
            key: opt_expr(v, "keyVar")?,
            by_ref: flag(v, "byRef"),
            value: expr(field(v, "valueVar")?)?,
            stmts: stmts(v, "stmts")?,
            doc: doc(v),
        }),
        "Stmt_Switch" => Stmt::Switch {
            cond: expr(field(v, "cond")?)?,
            cases: list(v, "cases")
                .iter()
                .map(|c| {
                    Ok(Case {
                        cond: opt_expr(c, "cond")?,
                        stmts: stmts(c, "stmts")?,
                    })
                })
                .collect::<Result<_, ParseError>>()?,
            doc: doc(v),
        },
        "Stmt_Break" => Stmt::Break(opt_expr(v, "num")?),
        "Stmt_Continue" => Stmt::Continue(opt_expr(v, "num")?),
        "Stmt_Goto" => Stmt::Goto(ident(field(v, "name")?)?),
        "Stmt_Label" => Stmt::Label(ident(field(v, "name")?)?),
        "Stmt_Function" => Stmt::Function(Function {
            name: ident(field(v, "name")?)?,
            by_ref: flag(v, "byRef"),
            params: params(v)?,
            return_type: opt_type(v, "returnType")?,
            stmts: stmts(v, "stmts")?,
            doc: doc(v),
        }),
        "Stmt_Class" => Stmt::ClassLike(class_like(v, ClassKind::Class)?),
        "Stmt_Interface" => Stmt::ClassLike(class_like(v, ClassKind::Interface)?),
        "Stmt_Trait" => Stmt::ClassLike(class_like(v, ClassKind::Trait)?),
        "Stmt_ClassMethod" => Stmt::ClassMethod(Method {
            name: ident(field(v, "name")?)?,
            flags: modifiers(v),
            by_ref: flag(v, "byRef"),
            params: params(v)?,
            return_type: opt_type(v, "returnType")?,
            stmts: opt_stmts(v, "stmts")?,
            doc: doc(v),
        }),
        "Stmt_Property" => Stmt::Property {
            flags: modifiers(v),
            ty: opt_type(v, "type")?,
            props: list(v, "props")
                .iter()
                .map(|p| {
                    Ok(PropertyItem {
                        name: ident(field(p, "name")?)?,
                        default: opt_expr(p, "default")?,
                    })
                })
                .collect::<Result<_, ParseError>>()?,
            doc: doc(v),
        },
        "Stmt_ClassConst" => Stmt::ClassConst {
            flags: modifiers(v),
            consts: consts(v)?,
            doc: doc(v),
        },
        "Stmt_Const" => Stmt::Const {
            consts: consts(v)?,
            doc: doc(v),
        },
        "Stmt_TraitUse" => Stmt::TraitUse {
            traits: names(v, "traits")?,
            adaptations: list(v, "adaptations")
                .iter()
                .map(adaptation)
                .collect::<Result<_, _>>()?,
        },
        "Stmt_Namespace" => Stmt::Namespace {
            name: opt_name(v, "name")?,
            stmts: stmts(v, "stmts")?,
            braced: attribute(v, "kind").and_then(Value::as_i64) == Some(2),
        },
        "Stmt_Use" => Stmt::Use {
            kind: use_kind(int(v, "type")),
            uses: use_items(v)?,
        },
        "Stmt_GroupUse" => Stmt::GroupUse {
            kind: use_kind(int(v, "type")),
            prefix: name(field(v, "prefix")?)?,
            uses: use_items(v)?,
        },
        "Stmt_Global" => Stmt::Global(exprs(v, "vars")?),
        "Stmt_Static" => Stmt::Static(
            list(v, "vars")
                .iter()
                .map(|s| {
                    Ok(StaticVar {
                        var: expr(field(s, "var")?)?,
                        default: opt_expr(s, "default")?,
                    })
                })
                .collect::<Result<_, ParseError>>()?,
        ),
        "Stmt_Unset" => Stmt::Unset(exprs(v, "vars")?),
        "Stmt_TryCatch" => Stmt::TryCatch {
            stmts: stmts(v, "stmts")?,
            catches: list(v, "catches")
                .iter()
                .map(|c| {
                    Ok(Catch {
                        types: names(c, "types")?,
                        var: opt(c, "var").map(variable_name).transpose()?,
                        stmts: stmts(c, "stmts")?,
                    })
                })
                .collect::<Result<_, ParseError>>()?,
            finally: opt(v, "finally").map(|f| stmts(f, "stmts")).transpose()?,
        },
        "Stmt_Declare" => Stmt::Declare {
            declares: list(v, "declares")
                .iter()
                .map(|d| Ok((ident(field(d, "key")?)?, expr(field(d, "value")?)?)))
                .collect::<Result<_, ParseError>>()?,
            stmts: opt_stmts(v, "stmts")?,
        },
        "Stmt_Block" => Stmt::Block(stmts(v, "stmts")?),
        "Stmt_HaltCompiler" => Stmt::HaltCompiler(string(v, "remaining")?),
        "Stmt_Nop" => Stmt::Nop,
        // 4.x models `throw` as a statement
        "Stmt_Throw" => Stmt::expr(Expr::Throw(Box::new(expr(field(v, "expr")?)?))),
        other => return Err(ParseError::Unsupported(other.to_string())),
    })
}

fn class_like(v: &Value, kind: ClassKind) -> Result<ClassLike, ParseError> {
    let (extends, implements) = match kind {
        ClassKind::Interface => (names(v, "extends")?, Vec::new()),
        _ => (opt_name(v, "extends")?.into_iter().collect(), names(v, "implements")?),
    };
    Ok(ClassLike {
        kind,
        name: opt(v, "name").map(ident).transpose()?,
        flags: modifiers(v),
        extends,
        implements,
        stmts: stmts(v, "stmts")?,
        doc: doc(v),
    })
}

fn consts(v: &Value) -> Result<Vec<Const>, ParseError> {
    list(v, "consts")
        .iter()
        .map(|c| {
            Ok(Const {
                name: ident(field(c, "name")?)?,
                value: expr(field(c, "value")?)?,
                doc: doc(c),
            })
        })
        .collect()
}

fn adaptation(v: &Value) -> Result<TraitAdaptation, ParseError> {
    match node_type(v)? {
        "Stmt_TraitUseAdaptation_Alias" => Ok(TraitAdaptation::Alias {
            trait_: opt_name(v, "trait")?,
            method: ident(field(v, "method")?)?,
            modifier: opt(v, "newModifier")
                .and_then(Value::as_u64)
                .and_then(|m| u32::try_from(m).ok())
                .map(Modifiers),
            new_name: opt(v, "newName").map(ident).transpose()?,
        }),
        "Stmt_TraitUseAdaptation_Precedence" => Ok(TraitAdaptation::Precedence {
            trait_: name(field(v, "trait")?)?,
            method: ident(field(v, "method")?)?,
            insteadof: names(v, "insteadof")?,
        }),
        other => Err(ParseError::Unsupported(other.to_string())),
    }
}

fn use_kind(code: i64) -> UseKind {
    match code {
        1 => UseKind::Normal,
        2 => UseKind::Function,
        3 => UseKind::Constant,
        _ => UseKind::Unknown,
    }
}

fn use_items(v: &Value) -> Result<Vec<UseItem>, ParseError> {
    list(v, "uses")
        .iter()
        .map(|u| {
            Ok(UseItem {
                kind: use_kind(int(u, "type")),
                name: name(field(u, "name")?)?,
                alias: opt(u, "alias").map(ident).transpose()?,
            })
        })
        .collect()
}

fn params(v: &Value) -> Result<Vec<Param>, ParseError> {
    list(v, "params")
        .iter()
        .map(|p| {
            Ok(Param {
                name: variable_name(field(p, "var")?)?,
                ty: opt_type(p, "type")?,
                default: opt_expr(p, "default")?,
                by_ref: flag(p, "byRef"),
                variadic: flag(p, "variadic"),
                flags: modifiers(p),
            })
        })
        .collect()
}

/// Name of an `Expr_Variable` that must be a plain identifier.
fn variable_name(v: &Value) -> Result<String, ParseError> {
    field(v, "name")?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed("Expr_Variable", "expected a plain variable name"))
}

// =============================================================================
// Expressions
// =============================================================================

fn exprs(v: &Value, key: &str) -> Result<Vec<Expr>, ParseError> {
    list(v, key).iter().map(expr).collect()
}

fn opt_expr(v: &Value, key: &str) -> Result<Option<Expr>, ParseError> {
    opt(v, key).map(expr).transpose()
}

fn boxed(v: &Value, key: &str) -> Result<Box<Expr>, ParseError> {
    Ok(Box::new(expr(field(v, key)?)?))
}

fn binary_op(suffix: &str) -> Option<BinaryOp> {
    Some(match suffix {
        "Plus" => BinaryOp::Plus,
        "Minus" => BinaryOp::Minus,
        "Mul" => BinaryOp::Mul,
        "Div" => BinaryOp::Div,
        "Mod" => BinaryOp::Mod,
        "Pow" => BinaryOp::Pow,
        "Concat" => BinaryOp::Concat,
        "BitwiseAnd" => BinaryOp::BitwiseAnd,
        "BitwiseOr" => BinaryOp::BitwiseOr,
        "BitwiseXor" => BinaryOp::BitwiseXor,
        "ShiftLeft" => BinaryOp::ShiftLeft,
        "ShiftRight" => BinaryOp::ShiftRight,
        "BooleanAnd" => BinaryOp::BooleanAnd,
        "BooleanOr" => BinaryOp::BooleanOr,
        "LogicalAnd" => BinaryOp::LogicalAnd,
        "LogicalOr" => BinaryOp::LogicalOr,
        "LogicalXor" => BinaryOp::LogicalXor,
        "Equal" => BinaryOp::Equal,
        "NotEqual" => BinaryOp::NotEqual,
        "Identical" => BinaryOp::Identical,
        "NotIdentical" => BinaryOp::NotIdentical,
        "Smaller" => BinaryOp::Smaller,
        "SmallerOrEqual" => BinaryOp::SmallerOrEqual,
        "Greater" => BinaryOp::Greater,
        "GreaterOrEqual" => BinaryOp::GreaterOrEqual,
        "Spaceship" => BinaryOp::Spaceship,
        "Coalesce" => BinaryOp::Coalesce,
        _ => return None,
    })
}

fn cast_kind(suffix: &str) -> Option<CastKind> {
    Some(match suffix {
        "Int" => CastKind::Int,
        "Double" => CastKind::Float,
        "String" => CastKind::String,
        "Bool" => CastKind::Bool,
        "Array" => CastKind::Array,
        "Object" => CastKind::Object,
        "Unset" => CastKind::Unset,
        _ => return None,
    })
}

fn magic_const(suffix: &str) -> Option<MagicConst> {
    Some(match suffix {
        "Class" => MagicConst::Class,
        "Dir" => MagicConst::Dir,
        "File" => MagicConst::File,
        "Function" => MagicConst::Function,
        "Line" => MagicConst::Line,
        "Method" => MagicConst::Method,
        "Namespace" => MagicConst::Namespace,
        "Trait" => MagicConst::Trait,
        "Property" => MagicConst::Property,
        _ => return None,
    })
}

fn include_kind(code: i64) -> IncludeKind {
    match code {
        2 => IncludeKind::IncludeOnce,
        3 => IncludeKind::Require,
        4 => IncludeKind::RequireOnce,
        _ => IncludeKind::Include,
    }
}

fn member(v: &Value) -> Result<Member, ParseError> {
    if v.is_string() || matches!(node_type(v), Ok("Identifier" | "VarLikeIdentifier")) {
        return Ok(Member::Ident(ident(v)?));
    }
    Ok(Member::Expr(Box::new(expr(v)?)))
}

fn class_ref(v: &Value) -> Result<ClassRef, ParseError> {
    match node_type(v)? {
        "Name" | "Name_FullyQualified" | "Name_Relative" => Ok(ClassRef::Name(name(v)?)),
        "Stmt_Class" => Ok(ClassRef::Anonymous(Box::new(class_like(v, ClassKind::Class)?))),
        _ => Ok(ClassRef::Expr(Box::new(expr(v)?))),
    }
}

fn callee(v: &Value) -> Result<Callee, ParseError> {
    match node_type(v)? {
        "Name" | "Name_FullyQualified" | "Name_Relative" => Ok(Callee::Name(name(v)?)),
        _ => Ok(Callee::Expr(Box::new(expr(v)?))),
    }
}

fn args(v: &Value) -> Result<Vec<Arg>, ParseError> {
    list(v, "args")
        .iter()
        .map(|a| match node_type(a)? {
            "Arg" => Ok(Arg {
                value: expr(field(a, "value")?)?,
                by_ref: flag(a, "byRef"),
                unpack: flag(a, "unpack"),
                name: opt(a, "name").map(ident).transpose()?,
            }),
            other => Err(ParseError::Unsupported(other.to_string())),
        })
        .collect()
}

fn array_items(v: &Value) -> Result<Vec<Option<ArrayItem>>, ParseError> {
    list(v, "items")
        .iter()
        .map(|item| {
            if item.is_null() {
                return Ok(None);
            }
            Ok(Some(ArrayItem {
                key: opt_expr(item, "key")?,
                value: expr(field(item, "value")?)?,
                by_ref: flag(item, "byRef"),
                unpack: flag(item, "unpack"),
            }))
        })
        .collect()
}

fn interpolated(v: &Value) -> Result<Vec<InterpolatedPart>, ParseError> {
    list(v, "parts")
        .iter()
        .map(|part| match node_type(part)? {
            "Scalar_EncapsedStringPart" | "InterpolatedStringPart" => {
                Ok(InterpolatedPart::Literal(string(part, "value")?))
            }
            _ => Ok(InterpolatedPart::Expr(expr(part)?)),
        })
        .collect()
}

fn expr(v: &Value) -> Result<Expr, ParseError> {
    let kind = node_type(v)?;

    if let Some(suffix) = kind.strip_prefix("Expr_BinaryOp_") {
        let op = binary_op(suffix).ok_or_else(|| ParseError::Unsupported(kind.to_string()))?;
        return Ok(Expr::Binary {
            op,
            left: boxed(v, "left")?,
            right: boxed(v, "right")?,
        });
    }
    if let Some(suffix) = kind.strip_prefix("Expr_AssignOp_") {
        let op = binary_op(suffix).ok_or_else(|| ParseError::Unsupported(kind.to_string()))?;
        return Ok(Expr::AssignOp {
            op,
            var: boxed(v, "var")?,
            expr: boxed(v, "expr")?,
        });
    }
    if let Some(suffix) = kind.strip_prefix("Expr_Cast_") {
        let cast = cast_kind(suffix).ok_or_else(|| ParseError::Unsupported(kind.to_string()))?;
        return Ok(Expr::Cast {
            kind: cast,
            expr: boxed(v, "expr")?,
        });
    }
    if let Some(suffix) = kind.strip_prefix("Scalar_MagicConst_") {
        return magic_const(suffix)
            .map(Expr::MagicConst)
            .ok_or_else(|| ParseError::Unsupported(kind.to_string()));
    }

    Ok(match kind {
        "Scalar_LNumber" | "Scalar_Int" => Expr::Int(
            field(v, "value")?
                .as_i64()
                .ok_or_else(|| malformed(kind, "integer out of range"))?,
        ),
        "Scalar_DNumber" | "Scalar_Float" => Expr::Float(
            field(v, "value")?
                .as_f64()
                .ok_or_else(|| malformed(kind, "not a number"))?,
        ),
        "Scalar_String" => Expr::String(string(v, "value")?),
        "Scalar_Encapsed" | "Scalar_InterpolatedString" => Expr::Interpolated(interpolated(v)?),
        "Expr_Array" => Expr::Array {
            items: array_items(v)?,
            // Array_::KIND_SHORT
            short: attribute(v, "kind").and_then(Value::as_i64) == Some(2),
        },
        "Expr_List" => Expr::List(array_items(v)?),
        "Expr_Variable" => match field(v, "name")? {
            Value::String(s) => Expr::Variable(VarName::Ident(s.clone())),
            inner => Expr::Variable(VarName::Expr(Box::new(expr(inner)?))),
        },
        "Expr_ConstFetch" => Expr::ConstFetch(name(field(v, "name")?)?),
        "Expr_ClassConstFetch" => Expr::ClassConstFetch {
            class: class_ref(field(v, "class")?)?,
            name: ident(field(v, "name")?)?,
        },
        "Expr_Assign" => Expr::Assign {
            var: boxed(v, "var")?,
            expr: boxed(v, "expr")?,
            by_ref: false,
        },
        "Expr_AssignRef" => Expr::Assign {
            var: boxed(v, "var")?,
            expr: boxed(v, "expr")?,
            by_ref: true,
        },
        "Expr_BooleanNot" => Expr::Unary {
            op: UnaryOp::Not,
            expr: boxed(v, "expr")?,
        },
        "Expr_BitwiseNot" => Expr::Unary {
            op: UnaryOp::BitwiseNot,
            expr: boxed(v, "expr")?,
        },
        "Expr_UnaryMinus" => Expr::Unary {
            op: UnaryOp::Minus,
            expr: boxed(v, "expr")?,
        },
        "Expr_UnaryPlus" => Expr::Unary {
            op: UnaryOp::Plus,
            expr: boxed(v, "expr")?,
        },
        "Expr_PreInc" | "Expr_PreDec" | "Expr_PostInc" | "Expr_PostDec" => Expr::IncDec {
            op: match kind {
                "Expr_PreInc" => IncDecOp::PreInc,
                "Expr_PreDec" => IncDecOp::PreDec,
                "Expr_PostInc" => IncDecOp::PostInc,
                _ => IncDecOp::PostDec,
            },
            var: boxed(v, "var")?,
        },
        "Expr_Ternary" => Expr::Ternary {
            cond: boxed(v, "cond")?,
            then: opt(v, "if").map(expr).transpose()?.map(Box::new),
            else_: boxed(v, "else")?,
        },
        "Expr_Instanceof" => Expr::Instanceof {
            expr: boxed(v, "expr")?,
            class: class_ref(field(v, "class")?)?,
        },
        "Expr_ArrayDimFetch" => Expr::ArrayDimFetch {
            var: boxed(v, "var")?,
            dim: opt(v, "dim").map(expr).transpose()?.map(Box::new),
        },
        "Expr_PropertyFetch" | "Expr_NullsafePropertyFetch" => Expr::PropertyFetch {
            var: boxed(v, "var")?,
            name: member(field(v, "name")?)?,
            nullsafe: kind == "Expr_NullsafePropertyFetch",
        },
        "Expr_StaticPropertyFetch" => Expr::StaticPropertyFetch {
            class: class_ref(field(v, "class")?)?,
            name: member(field(v, "name")?)?,
        },
        "Expr_FuncCall" => Expr::FuncCall {
            name: callee(field(v, "name")?)?,
            args: args(v)?,
        },
        "Expr_MethodCall" | "Expr_NullsafeMethodCall" => Expr::MethodCall {
            var: boxed(v, "var")?,
            name: member(field(v, "name")?)?,
            args: args(v)?,
            nullsafe: kind == "Expr_NullsafeMethodCall",
        },
        "Expr_StaticCall" => Expr::StaticCall {
            class: class_ref(field(v, "class")?)?,
            name: member(field(v, "name")?)?,
            args: args(v)?,
        },
        "Expr_New" => Expr::New {
            class: class_ref(field(v, "class")?)?,
            args: args(v)?,
        },
        "Expr_Closure" => Expr::Closure(Box::new(Closure {
            is_static: flag(v, "static"),
            by_ref: flag(v, "byRef"),
            params: params(v)?,
            uses: list(v, "uses")
                .iter()
                .map(|u| {
                    Ok(ClosureUse {
                        var: variable_name(field(u, "var")?)?,
                        by_ref: flag(u, "byRef"),
                    })
                })
                .collect::<Result<_, ParseError>>()?,
            return_type: opt_type(v, "returnType")?,
            stmts: stmts(v, "stmts")?,
        })),
        "Expr_ArrowFunction" => Expr::ArrowFunction(Box::new(ArrowFunction {
            is_static: flag(v, "static"),
            by_ref: flag(v, "byRef"),
            params: params(v)?,
            return_type: opt_type(v, "returnType")?,
            expr: expr(field(v, "expr")?)?,
        })),
        "Expr_Isset" => Expr::Isset(exprs(v, "vars")?),
        "Expr_Empty" => Expr::Empty(boxed(v, "expr")?),
        "Expr_Exit" => Expr::Exit(opt(v, "expr").map(expr).transpose()?.map(Box::new)),
        "Expr_Print" => Expr::Print(boxed(v, "expr")?),
        "Expr_Include" => Expr::Include {
            kind: include_kind(int(v, "type")),
            expr: boxed(v, "expr")?,
        },
        "Expr_Eval" => Expr::Eval(boxed(v, "expr")?),
        "Expr_Clone" => Expr::Clone(boxed(v, "expr")?),
        "Expr_ErrorSuppress" => Expr::ErrorSuppress(boxed(v, "expr")?),
        "Expr_Throw" => Expr::Throw(boxed(v, "expr")?),
        "Expr_Yield" => Expr::Yield {
            key: opt(v, "key").map(expr).transpose()?.map(Box::new),
            value: opt(v, "value").map(expr).transpose()?.map(Box::new),
        },
        "Expr_YieldFrom" => Expr::YieldFrom(boxed(v, "expr")?),
        "Expr_ShellExec" => Expr::ShellExec(interpolated(v)?),
        "Expr_Match" => Expr::Match {
            cond: boxed(v, "cond")?,
            arms: list(v, "arms")
                .iter()
                .map(|arm| {
                    Ok(MatchArm {
                        conds: opt(arm, "conds")
                            .map(|_| exprs(arm, "conds"))
                            .transpose()?,
                        body: expr(field(arm, "body")?)?,
                    })
                })
                .collect::<Result<_, ParseError>>()?,
        },
        other => return Err(ParseError::Unsupported(other.to_string())),
    })
}
