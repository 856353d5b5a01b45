//! Syntax tree for the scripting language being obfuscated.
//!
//! The model covers the statements and expressions produced by the JSON front
//! end. Every identifier slot the rewrite pass touches is a plain `String` or a
//! [`Name`], so renaming is a matter of mutating the slot in place.

// =============================================================================
// Names and types
// =============================================================================

/// How a qualified name is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// `Foo\Bar`
    Normal,
    /// `\Foo\Bar`
    FullyQualified,
    /// `namespace\Foo`
    Relative,
}

/// A possibly namespaced name, stored as its `\`-separated segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub parts: Vec<String>,
    pub kind: NameKind,
}

impl Name {
    pub fn new(parts: Vec<String>) -> Self {
        Self {
            parts,
            kind: NameKind::Normal,
        }
    }

    /// Build a name from its textual form, honouring a leading `\`.
    pub fn parse(text: &str) -> Self {
        let (kind, rest) = if let Some(rest) = text.strip_prefix('\\') {
            (NameKind::FullyQualified, rest)
        } else if let Some(rest) = text.strip_prefix("namespace\\") {
            (NameKind::Relative, rest)
        } else {
            (NameKind::Normal, text)
        };
        Self {
            parts: rest.split('\\').map(str::to_string).collect(),
            kind,
        }
    }

    /// The local (last) segment.
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    pub fn first(&self) -> &str {
        self.parts.first().map_or("", String::as_str)
    }

    /// `true` for a single unqualified segment equal to `name`, ignoring case.
    pub fn is(&self, name: &str) -> bool {
        self.parts.len() == 1 && self.parts[0].eq_ignore_ascii_case(name)
    }

    pub fn to_text(&self) -> String {
        let joined = self.parts.join("\\");
        match self.kind {
            NameKind::Normal => joined,
            NameKind::FullyQualified => format!("\\{joined}"),
            NameKind::Relative => format!("namespace\\{joined}"),
        }
    }
}

/// A declared type in a parameter, property or return position.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    /// Built-in type keyword such as `int`, `array` or `self`.
    Keyword(String),
    Name(Name),
    Nullable(Box<TypeHint>),
    Union(Vec<TypeHint>),
    Intersection(Vec<TypeHint>),
}

impl TypeHint {
    /// Every class name mentioned by this hint.
    pub fn names_mut(&mut self) -> Vec<&mut Name> {
        match self {
            Self::Keyword(_) => Vec::new(),
            Self::Name(name) => vec![name],
            Self::Nullable(inner) => inner.names_mut(),
            Self::Union(types) | Self::Intersection(types) => {
                types.iter_mut().flat_map(TypeHint::names_mut).collect()
            }
        }
    }
}

/// Visibility and other declaration modifiers, as a bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const PUBLIC: u32 = 1;
    pub const PROTECTED: u32 = 2;
    pub const PRIVATE: u32 = 4;
    pub const STATIC: u32 = 8;
    pub const ABSTRACT: u32 = 16;
    pub const FINAL: u32 = 32;
    pub const READONLY: u32 = 64;

    pub const fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

// =============================================================================
// Statements
// =============================================================================

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression {
        expr: Expr,
        doc: Option<String>,
    },
    Echo(Vec<Expr>),
    InlineHtml(String),
    Return {
        expr: Option<Expr>,
        doc: Option<String>,
    },
    If(If),
    For {
        init: Vec<Expr>,
        cond: Vec<Expr>,
        step: Vec<Expr>,
        stmts: Vec<Stmt>,
    },
    While {
        cond: Expr,
        stmts: Vec<Stmt>,
    },
    Do {
        stmts: Vec<Stmt>,
        cond: Expr,
    },
    Foreach(Foreach),
    Switch {
        cond: Expr,
        cases: Vec<Case>,
        doc: Option<String>,
    },
    Break(Option<Expr>),
    Continue(Option<Expr>),
    Goto(String),
    Label(String),
    Function(Function),
    ClassLike(ClassLike),
    ClassMethod(Method),
    Property {
        flags: Modifiers,
        ty: Option<TypeHint>,
        props: Vec<PropertyItem>,
        doc: Option<String>,
    },
    ClassConst {
        flags: Modifiers,
        consts: Vec<Const>,
        doc: Option<String>,
    },
    Const {
        consts: Vec<Const>,
        doc: Option<String>,
    },
    TraitUse {
        traits: Vec<Name>,
        adaptations: Vec<TraitAdaptation>,
    },
    Namespace {
        name: Option<Name>,
        stmts: Vec<Stmt>,
        /// `namespace X { ... }` rather than `namespace X;`
        braced: bool,
    },
    Use {
        kind: UseKind,
        uses: Vec<UseItem>,
    },
    GroupUse {
        kind: UseKind,
        prefix: Name,
        uses: Vec<UseItem>,
    },
    Global(Vec<Expr>),
    Static(Vec<StaticVar>),
    Unset(Vec<Expr>),
    TryCatch {
        stmts: Vec<Stmt>,
        catches: Vec<Catch>,
        finally: Option<Vec<Stmt>>,
    },
    Declare {
        declares: Vec<(String, Expr)>,
        stmts: Option<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    HaltCompiler(String),
    Nop,
}

impl Stmt {
    /// Wrap an expression as a statement.
    pub const fn expr(expr: Expr) -> Self {
        Self::Expression { expr, doc: None }
    }

    /// `if (cond) { goto label; }`
    pub fn goto_if(cond: Expr, label: &str) -> Self {
        Self::If(If {
            cond,
            stmts: vec![Self::Goto(label.to_string())],
            elseifs: Vec::new(),
            else_: None,
            doc: None,
        })
    }

    /// The doc comment attached to this statement, if it carries one.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Self::Expression { doc, .. }
            | Self::Return { doc, .. }
            | Self::Switch { doc, .. }
            | Self::Property { doc, .. }
            | Self::ClassConst { doc, .. }
            | Self::Const { doc, .. } => doc.as_deref(),
            Self::If(node) => node.doc.as_deref(),
            Self::Foreach(node) => node.doc.as_deref(),
            Self::Function(node) => node.doc.as_deref(),
            Self::ClassLike(node) => node.doc.as_deref(),
            Self::ClassMethod(node) => node.doc.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub stmts: Vec<Stmt>,
    pub elseifs: Vec<ElseIf>,
    pub else_: Option<Vec<Stmt>>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub cond: Expr,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Foreach {
    pub expr: Expr,
    pub key: Option<Expr>,
    pub by_ref: bool,
    pub value: Expr,
    pub stmts: Vec<Stmt>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// `None` for `default:`
    pub cond: Option<Expr>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub types: Vec<Name>,
    pub var: Option<String>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeHint>,
    pub default: Option<Expr>,
    pub by_ref: bool,
    pub variadic: bool,
    /// Constructor promotion modifiers.
    pub flags: Modifiers,
}

impl Param {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: None,
            default: None,
            by_ref: false,
            variadic: false,
            flags: Modifiers::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub stmts: Vec<Stmt>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

/// A class, interface or trait declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLike {
    pub kind: ClassKind,
    /// `None` for anonymous classes.
    pub name: Option<String>,
    pub flags: Modifiers,
    /// Parent class, or parent interfaces for an interface.
    pub extends: Vec<Name>,
    pub implements: Vec<Name>,
    pub stmts: Vec<Stmt>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub flags: Modifiers,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    /// `None` for abstract and interface methods.
    pub stmts: Option<Vec<Stmt>>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyItem {
    pub name: String,
    pub default: Option<Expr>,
}

/// One `NAME = value` pair of a `const` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    pub name: String,
    pub value: Expr,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraitAdaptation {
    /// `T::m as protected n;`
    Alias {
        trait_: Option<Name>,
        method: String,
        modifier: Option<Modifiers>,
        new_name: Option<String>,
    },
    /// `A::m insteadof B;`
    Precedence {
        trait_: Name,
        method: String,
        insteadof: Vec<Name>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Unknown,
    Normal,
    Function,
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseItem {
    pub kind: UseKind,
    pub name: Name,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticVar {
    pub var: Expr,
    pub default: Option<Expr>,
}

// =============================================================================
// Expressions
// =============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    Int(i64),
    Float(f64),
    String(String),
    /// Double-quoted string or heredoc with embedded expressions.
    Interpolated(Vec<InterpolatedPart>),
    MagicConst(MagicConst),
    Array {
        items: Vec<Option<ArrayItem>>,
        short: bool,
    },
    List(Vec<Option<ArrayItem>>),

    // === Names ===
    Variable(VarName),
    ConstFetch(Name),
    ClassConstFetch {
        class: ClassRef,
        name: String,
    },

    // === Operations ===
    Assign {
        var: Box<Expr>,
        expr: Box<Expr>,
        by_ref: bool,
    },
    AssignOp {
        op: BinaryOp,
        var: Box<Expr>,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    IncDec {
        op: IncDecOp,
        var: Box<Expr>,
    },
    Cast {
        kind: CastKind,
        expr: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Option<Box<Expr>>,
        else_: Box<Expr>,
    },
    Instanceof {
        expr: Box<Expr>,
        class: ClassRef,
    },

    // === Access ===
    ArrayDimFetch {
        var: Box<Expr>,
        dim: Option<Box<Expr>>,
    },
    PropertyFetch {
        var: Box<Expr>,
        name: Member,
        nullsafe: bool,
    },
    StaticPropertyFetch {
        class: ClassRef,
        name: Member,
    },

    // === Calls ===
    FuncCall {
        name: Callee,
        args: Vec<Arg>,
    },
    MethodCall {
        var: Box<Expr>,
        name: Member,
        args: Vec<Arg>,
        nullsafe: bool,
    },
    StaticCall {
        class: ClassRef,
        name: Member,
        args: Vec<Arg>,
    },
    New {
        class: ClassRef,
        args: Vec<Arg>,
    },

    // === Functions ===
    Closure(Box<Closure>),
    ArrowFunction(Box<ArrowFunction>),

    // === Language constructs ===
    Isset(Vec<Expr>),
    Empty(Box<Expr>),
    Exit(Option<Box<Expr>>),
    Print(Box<Expr>),
    Include {
        kind: IncludeKind,
        expr: Box<Expr>,
    },
    Eval(Box<Expr>),
    Clone(Box<Expr>),
    ErrorSuppress(Box<Expr>),
    Throw(Box<Expr>),
    Yield {
        key: Option<Box<Expr>>,
        value: Option<Box<Expr>>,
    },
    YieldFrom(Box<Expr>),
    ShellExec(Vec<InterpolatedPart>),
    Match {
        cond: Box<Expr>,
        arms: Vec<MatchArm>,
    },
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Self::Variable(VarName::Ident(name.to_string()))
    }

    pub fn string(value: &str) -> Self {
        Self::String(value.to_string())
    }

    pub fn constant(name: &str) -> Self {
        Self::ConstFetch(Name::parse(name))
    }

    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(var: Self, expr: Self) -> Self {
        Self::Assign {
            var: Box::new(var),
            expr: Box::new(expr),
            by_ref: false,
        }
    }

    pub fn call(name: &str, args: Vec<Self>) -> Self {
        Self::FuncCall {
            name: Callee::Name(Name::parse(name)),
            args: args.into_iter().map(Arg::new).collect(),
        }
    }

    /// Logical negation, unwrapping an existing `!` instead of stacking another.
    pub fn negate(self) -> Self {
        match self {
            Self::Unary {
                op: UnaryOp::Not,
                expr,
            } => *expr,
            other => Self::Unary {
                op: UnaryOp::Not,
                expr: Box::new(other),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarName {
    Ident(String),
    /// `$$expr` / `${expr}`
    Expr(Box<Expr>),
}

/// The name slot of a property or method access.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Ident(String),
    Expr(Box<Expr>),
}

impl Member {
    pub fn ident(&self) -> Option<&str> {
        match self {
            Self::Ident(name) => Some(name),
            Self::Expr(_) => None,
        }
    }
}

/// The class slot of `new`, static access and `instanceof`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    Name(Name),
    Expr(Box<Expr>),
    Anonymous(Box<ClassLike>),
}

impl ClassRef {
    pub fn name_mut(&mut self) -> Option<&mut Name> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Name(Name),
    Expr(Box<Expr>),
}

impl Callee {
    pub fn name(&self) -> Option<&Name> {
        match self {
            Self::Name(name) => Some(name),
            Self::Expr(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub value: Expr,
    pub by_ref: bool,
    pub unpack: bool,
    /// PHP 8 named argument.
    pub name: Option<String>,
}

impl Arg {
    pub const fn new(value: Expr) -> Self {
        Self {
            value,
            by_ref: false,
            unpack: false,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub unpack: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolatedPart {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub uses: Vec<ClosureUse>,
    pub return_type: Option<TypeHint>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureUse {
    pub var: String,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    /// `None` for the `default` arm.
    pub conds: Option<Vec<Expr>>,
    pub body: Expr,
}

// =============================================================================
// Operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    BooleanAnd,
    BooleanOr,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Smaller,
    SmallerOrEqual,
    Greater,
    GreaterOrEqual,
    Spaceship,
    Coalesce,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Concat => ".",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::BooleanAnd => "&&",
            Self::BooleanOr => "||",
            Self::LogicalAnd => "and",
            Self::LogicalOr => "or",
            Self::LogicalXor => "xor",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Identical => "===",
            Self::NotIdentical => "!==",
            Self::Smaller => "<",
            Self::SmallerOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Spaceship => "<=>",
            Self::Coalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    BitwiseNot,
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicConst {
    Class,
    Dir,
    File,
    Function,
    Line,
    Method,
    Namespace,
    Trait,
    Property,
}

impl MagicConst {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Class => "__CLASS__",
            Self::Dir => "__DIR__",
            Self::File => "__FILE__",
            Self::Function => "__FUNCTION__",
            Self::Line => "__LINE__",
            Self::Method => "__METHOD__",
            Self::Namespace => "__NAMESPACE__",
            Self::Trait => "__TRAIT__",
            Self::Property => "__PROPERTY__",
        }
    }
}
