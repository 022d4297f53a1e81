//! The resolved input tree.
//!
//! The external front-end parses, binds and type-checks the source program,
//! then hands the core this tree together with a `SemanticModel` (see
//! `sem`). Every expression node carries a `NodeId` the model is queried
//! with. The core never mutates the tree.

use serde::{Deserialize, Serialize};

use crate::sem::TypeId;
use crate::span::Span;

/// Identity of one expression node, unique within a compilation input.
pub type NodeId = u32;

// ─── Declarations ─────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub types: Vec<TypeDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeDeclKind,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDeclKind {
    Class,
    Struct,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Property(PropertyDecl),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeId,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeId,
    pub by_ref: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub is_static: bool,
    /// Generic parameter names of an open generic method, declaration order.
    pub type_params: Vec<String>,
    pub params: Vec<ParamDecl>,
    pub return_ty: TypeId,
    pub returns_by_ref: bool,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub ty: TypeId,
    pub is_static: bool,
    pub is_indexer: bool,
    /// Indexer value parameters; empty for plain properties.
    pub index_params: Vec<ParamDecl>,
    pub getter: Option<Block>,
    pub setter: Option<Block>,
    /// Annotation names applied to the property; emitted by the auxiliary
    /// annotation pass after all members are declared.
    pub annotations: Vec<String>,
    pub span: Span,
}

// ─── Statements ───────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<StmtNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StmtNode {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: String,
    pub ty: TypeId,
    pub by_ref: bool,
    pub init: Option<ExprNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwitchSection {
    pub labels: Vec<CaseLabel>,
    pub stmts: Vec<StmtNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CaseLabel {
    Case(ExprNode),
    Default,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatchClause {
    pub ty: TypeId,
    pub block: Block,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum UsingResource {
    Decl(LocalDecl),
    Expr(ExprNode),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StmtKind {
    LocalDecl(Vec<LocalDecl>),
    Expr(ExprNode),
    Return(Option<ExprNode>),
    Throw(Option<ExprNode>),
    If {
        cond: ExprNode,
        then_block: Block,
        else_block: Option<Block>,
    },
    For {
        init: Vec<StmtNode>,
        cond: Option<ExprNode>,
        incr: Vec<ExprNode>,
        body: Block,
    },
    Switch {
        scrutinee: ExprNode,
        sections: Vec<SwitchSection>,
    },
    Break,
    Try {
        block: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Using {
        resource: UsingResource,
        body: Block,
    },
    Block(Block),

    // Constructs the generator degrades to a comment record (see stmt.rs).
    While {
        cond: ExprNode,
        body: Block,
    },
    DoWhile {
        cond: ExprNode,
        body: Block,
    },
    ForEach {
        name: String,
        ty: TypeId,
        source: ExprNode,
        body: Block,
    },
    Lock {
        target: ExprNode,
        body: Block,
    },
    Unsafe(Block),
    Checked(Block),
    Continue,
    Goto(String),
    Yield(Option<ExprNode>),
}

impl StmtKind {
    /// The construct name echoed when a kind is not supported, or `None`
    /// for fully supported kinds.
    pub fn unsupported_name(&self) -> Option<&'static str> {
        match self {
            StmtKind::While { .. } => Some("while"),
            StmtKind::DoWhile { .. } => Some("do"),
            StmtKind::ForEach { .. } => Some("foreach"),
            StmtKind::Lock { .. } => Some("lock"),
            StmtKind::Unsafe(_) => Some("unsafe"),
            StmtKind::Checked(_) => Some("checked"),
            StmtKind::Continue => Some("continue"),
            StmtKind::Goto(_) => Some("goto"),
            StmtKind::Yield(_) => Some("yield"),
            _ => None,
        }
    }

    /// Short rendering of the construct for traceability comments.
    pub fn summary(&self) -> String {
        match self {
            StmtKind::LocalDecl(decls) => {
                let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
                format!("var {}", names.join(", "))
            }
            StmtKind::Expr(e) => e.summary(),
            StmtKind::Return(Some(e)) => format!("return {}", e.summary()),
            StmtKind::Return(None) => "return".to_string(),
            StmtKind::Throw(Some(e)) => format!("throw {}", e.summary()),
            StmtKind::Throw(None) => "throw".to_string(),
            StmtKind::If { cond, .. } => format!("if ({})", cond.summary()),
            StmtKind::For { cond, .. } => match cond {
                Some(c) => format!("for (...; {}; ...)", c.summary()),
                None => "for (...)".to_string(),
            },
            StmtKind::Switch { scrutinee, .. } => format!("switch ({})", scrutinee.summary()),
            StmtKind::Break => "break".to_string(),
            StmtKind::Try { .. } => "try".to_string(),
            StmtKind::Using { resource, .. } => match resource {
                UsingResource::Decl(d) => format!("using (var {})", d.name),
                UsingResource::Expr(e) => format!("using ({})", e.summary()),
            },
            StmtKind::Block(_) => "block".to_string(),
            StmtKind::While { cond, .. } => format!("while ({})", cond.summary()),
            StmtKind::DoWhile { cond, .. } => format!("do ... while ({})", cond.summary()),
            StmtKind::ForEach { name, source, .. } => {
                format!("foreach ({} in {})", name, source.summary())
            }
            StmtKind::Lock { target, .. } => format!("lock ({})", target.summary()),
            StmtKind::Unsafe(_) => "unsafe".to_string(),
            StmtKind::Checked(_) => "checked".to_string(),
            StmtKind::Continue => "continue".to_string(),
            StmtKind::Goto(label) => format!("goto {}", label),
            StmtKind::Yield(_) => "yield".to_string(),
        }
    }
}

// ─── Expressions ──────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExprNode {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i64),
    BoolLit(bool),
    StrLit(String),
    NullLit,
    /// A simple name, resolved through the semantic model.
    Name(String),
    Member {
        target: Box<ExprNode>,
        name: String,
    },
    Index {
        target: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    Call {
        callee: Box<ExprNode>,
        args: Vec<ExprNode>,
        /// Explicit generic arguments, declaration order.
        type_args: Vec<TypeId>,
    },
    New {
        ty: TypeId,
        args: Vec<ExprNode>,
    },
    Assign {
        target: Box<ExprNode>,
        value: Box<ExprNode>,
    },
    Binary {
        op: BinOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    AddressOf(Box<ExprNode>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Lt,
    Gt,
}

impl ExprNode {
    /// Short rendering for traceability comments.
    pub fn summary(&self) -> String {
        match &self.kind {
            ExprKind::IntLit(v) => v.to_string(),
            ExprKind::BoolLit(v) => v.to_string(),
            ExprKind::StrLit(s) => format!("{:?}", s),
            ExprKind::NullLit => "null".to_string(),
            ExprKind::Name(name) => name.clone(),
            ExprKind::Member { target, name } => format!("{}.{}", target.summary(), name),
            ExprKind::Index { target, .. } => format!("{}[...]", target.summary()),
            ExprKind::Call { callee, .. } => format!("{}(...)", callee.summary()),
            ExprKind::New { .. } => "new".to_string(),
            ExprKind::Assign { target, value } => {
                format!("{} = {}", target.summary(), value.summary())
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Rem => "%",
                    BinOp::Eq => "==",
                    BinOp::Lt => "<",
                    BinOp::Gt => ">",
                };
                format!("{} {} {}", lhs.summary(), sym, rhs.summary())
            }
            ExprKind::AddressOf(inner) => format!("&{}", inner.summary()),
        }
    }
}
