//! Upward queries over the ancestor stack maintained during traversal.
//!
//! Nodes never point at their parents. Instead the traverser keeps a stack of
//! [`Frame`]s describing every node between the root and the one being visited,
//! and visitors query that stack for the enclosing class, annotation comments
//! or the shape of a surrounding call chain.

use crate::ast::{ClassKind, Expr, MagicConst, Stmt, UnaryOp};

/// Coarse node classification recorded for each ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    // === Statements ===
    Expression,
    Return,
    If,
    ElseIf,
    Else,
    For,
    While,
    Do,
    Foreach,
    Switch,
    Case,
    Function,
    Class,
    Interface,
    Trait,
    ClassMethod,
    Property,
    ClassConst,
    Const,
    Namespace,
    TryCatch,
    Catch,
    Declare,
    Statement,

    // === Expressions ===
    Assign,
    FuncCall,
    MethodCall,
    StaticCall,
    New,
    Array,
    Closure,
    ArrowFunction,
    Not,
    Expr,
}

/// Which child slot of a node is currently being traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    None,
    Var,
    Class,
    Name,
    Args,
    Key,
    Value,
    Cond,
    Stmts,
    Expr,
}

/// What the traverser remembers about one ancestor.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: NodeKind,
    /// Local name: declared name for declarations, callee name for calls.
    pub name: Option<String>,
    pub doc: Option<String>,
    /// Two-element list whose first element can designate an object or class.
    pub callable_pair: bool,
    /// Slot of this node holding the child currently being visited.
    pub slot: Slot,
    /// Position of that child inside the slot.
    pub index: usize,
}

impl Frame {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            doc: None,
            callable_pair: false,
            slot: Slot::None,
            index: 0,
        }
    }

    fn named(kind: NodeKind, name: Option<String>) -> Self {
        Self {
            name,
            ..Self::new(kind)
        }
    }

    pub fn of_stmt(stmt: &Stmt) -> Self {
        let mut frame = match stmt {
            Stmt::Expression { .. } => Self::new(NodeKind::Expression),
            Stmt::Return { .. } => Self::new(NodeKind::Return),
            Stmt::If(_) => Self::new(NodeKind::If),
            Stmt::For { .. } => Self::new(NodeKind::For),
            Stmt::While { .. } => Self::new(NodeKind::While),
            Stmt::Do { .. } => Self::new(NodeKind::Do),
            Stmt::Foreach(_) => Self::new(NodeKind::Foreach),
            Stmt::Switch { .. } => Self::new(NodeKind::Switch),
            Stmt::Function(f) => Self::named(NodeKind::Function, Some(f.name.clone())),
            Stmt::ClassLike(class) => {
                let kind = match class.kind {
                    ClassKind::Class => NodeKind::Class,
                    ClassKind::Interface => NodeKind::Interface,
                    ClassKind::Trait => NodeKind::Trait,
                };
                Self::named(kind, class.name.clone())
            }
            Stmt::ClassMethod(m) => Self::named(NodeKind::ClassMethod, Some(m.name.clone())),
            Stmt::Property { .. } => Self::new(NodeKind::Property),
            Stmt::ClassConst { .. } => Self::new(NodeKind::ClassConst),
            Stmt::Const { .. } => Self::new(NodeKind::Const),
            Stmt::Namespace { name, .. } => {
                Self::named(NodeKind::Namespace, name.as_ref().map(|n| n.parts.join("\\")))
            }
            Stmt::TryCatch { .. } => Self::new(NodeKind::TryCatch),
            Stmt::Declare { .. } => Self::new(NodeKind::Declare),
            _ => Self::new(NodeKind::Statement),
        };
        frame.doc = stmt.doc().map(str::to_string);
        frame
    }

    pub fn of_expr(expr: &Expr) -> Self {
        match expr {
            Expr::Assign { .. } | Expr::AssignOp { .. } => Self::new(NodeKind::Assign),
            Expr::FuncCall { name, .. } => Self::named(
                NodeKind::FuncCall,
                name.name().map(|n| n.last().to_ascii_lowercase()),
            ),
            Expr::MethodCall { name, .. } => {
                Self::named(NodeKind::MethodCall, name.ident().map(str::to_string))
            }
            Expr::StaticCall { name, .. } => {
                Self::named(NodeKind::StaticCall, name.ident().map(str::to_string))
            }
            Expr::New { .. } => Self::new(NodeKind::New),
            Expr::Array { items, .. } => Self {
                callable_pair: is_callable_pair(items),
                ..Self::new(NodeKind::Array)
            },
            Expr::Closure(_) => Self::new(NodeKind::Closure),
            Expr::ArrowFunction(_) => Self::new(NodeKind::ArrowFunction),
            Expr::Unary {
                op: UnaryOp::Not, ..
            } => Self::new(NodeKind::Not),
            _ => Self::new(NodeKind::Expr),
        }
    }

    pub fn of_kind(kind: NodeKind) -> Self {
        Self::new(kind)
    }
}

fn is_callable_pair(items: &[Option<crate::ast::ArrayItem>]) -> bool {
    if items.len() != 2 {
        return false;
    }
    let Some(Some(first)) = items.first() else {
        return false;
    };
    if first.key.is_some() {
        return false;
    }
    match &first.value {
        Expr::Variable(_) => true,
        Expr::ClassConstFetch { name, .. } => name.eq_ignore_ascii_case("class"),
        Expr::MagicConst(MagicConst::Class) => true,
        _ => false,
    }
}

/// The stack of frames from the root down to the parent of the current node.
#[derive(Debug, Default, Clone)]
pub struct Ancestors {
    frames: Vec<Frame>,
}

impl Ancestors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Record which slot of the innermost frame is about to be visited.
    pub fn enter_slot(&mut self, slot: Slot, index: usize) {
        if let Some(top) = self.frames.last_mut() {
            top.slot = slot;
            top.index = index;
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Name of the innermost enclosing class, interface or trait.
    pub fn enclosing_class(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find(|f| {
                matches!(
                    f.kind,
                    NodeKind::Class | NodeKind::Interface | NodeKind::Trait
                )
            })
            .and_then(|f| f.name.as_deref())
    }

    /// Doc comment governing a method or static call.
    ///
    /// Climbs from the call through outer calls it is the receiver of, then
    /// accepts the first assignment, `if`, `return`, `switch`, `foreach` or
    /// expression statement above the chain.
    pub fn doc_for_call(&self) -> Option<&str> {
        let mut frames = self.frames.iter().rev();
        let mut holder = frames.next()?;
        while matches!(holder.kind, NodeKind::MethodCall | NodeKind::StaticCall)
            && matches!(holder.slot, Slot::Var | Slot::Class)
        {
            if let Some(doc) = holder.doc.as_deref() {
                return Some(doc);
            }
            holder = frames.next()?;
        }
        match holder.kind {
            NodeKind::If
            | NodeKind::Return
            | NodeKind::Switch
            | NodeKind::Foreach
            | NodeKind::Expression => holder.doc.as_deref(),
            NodeKind::Assign => holder.doc.as_deref().or_else(|| {
                frames
                    .next()
                    .filter(|f| f.kind == NodeKind::Expression)
                    .and_then(|f| f.doc.as_deref())
            }),
            _ => None,
        }
    }

    /// Names of a call and every call it is (transitively) the receiver of,
    /// starting with `own` and ending with the outermost call of the chain.
    pub fn call_sequence(&self, own: &str) -> Vec<String> {
        let mut sequence = vec![own.to_string()];
        for frame in self.frames.iter().rev() {
            let chained = matches!(frame.kind, NodeKind::MethodCall | NodeKind::StaticCall)
                && matches!(frame.slot, Slot::Var | Slot::Class);
            if !chained {
                break;
            }
            sequence.push(frame.name.clone().unwrap_or_default());
        }
        sequence
    }

    /// Whether a string literal at the current position names a method.
    ///
    /// That is the second element of `[$obj, 'm']` / `[X::class, 'm']` /
    /// `[__CLASS__, 'm']`, or the second argument of `method_exists()`.
    pub fn is_callback_string(&self) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        match parent.kind {
            NodeKind::Array => parent.callable_pair && parent.slot == Slot::Value && parent.index == 1,
            NodeKind::FuncCall => {
                parent.name.as_deref() == Some("method_exists")
                    && parent.slot == Slot::Args
                    && parent.index == 1
            }
            _ => false,
        }
    }
}
