//! Syntax tree of the unit language
//!
//! Generic type arguments are erased during parsing; `TypeExpr` keeps the
//! base name as written and the array rank.

use crate::kit::lexer::Coordinate;
use std::fmt;

/// Member/class visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    Public,
    Protected,
    Private,
    #[default]
    PackagePrivate,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
            Visibility::PackagePrivate => "package-private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

/// A whole source file
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub fields: Vec<FieldDecl>,
    pub constructors: Vec<MethodDecl>,
    pub methods: Vec<MethodDecl>,
    pub pos: Coordinate,
}

impl ClassDecl {
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub modifiers: Modifiers,
    pub init: Option<Expr>,
    pub pos: Coordinate,
}

/// Method or constructor
///
/// Constructors carry `void` as their return type and the class name as
/// their name.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub params: Vec<Param>,
    pub returns: TypeExpr,
    pub body: Option<Vec<Stmt>>,
    pub is_constructor: bool,
    pub pos: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub pos: Coordinate,
}

/// A type as written: base name plus array rank
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    pub name: String,
    pub dims: usize,
    pub pos: Coordinate,
}

impl TypeExpr {
    pub fn new(name: impl Into<String>, dims: usize, pos: Coordinate) -> Self {
        Self {
            name: name.into(),
            dims,
            pos,
        }
    }

    pub fn void(pos: Coordinate) -> Self {
        Self::new("void", 0, pos)
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" && self.dims == 0
    }

    /// Element type of an array type
    pub fn element(&self) -> TypeExpr {
        Self::new(self.name.clone(), self.dims.saturating_sub(1), self.pos)
    }

    /// Last segment of a qualified name (`java.util.Scanner` -> `Scanner`)
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())?;
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub pos: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Caught exception class names (multi-catch allowed)
    pub types: Vec<String>,
    pub name: String,
    pub body: Vec<Stmt>,
    pub pos: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    /// `ty == None` means `var`
    Local {
        ty: Option<TypeExpr>,
        declarators: Vec<Declarator>,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        ty: Option<TypeExpr>,
        name: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Coordinate,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Coordinate) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    Str(String),
    Bool(bool),
    Null,
    This,
    Name(String),
    Field {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// `target == None` is an unqualified call on the current class
    Call {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        class: TypeExpr,
        args: Vec<Expr>,
    },
    /// `new T[a][b][]`: `dims` are the sized dimensions, `ty` the full array type
    NewArray {
        ty: TypeExpr,
        dims: Vec<Expr>,
    },
    /// `{1, 2}` or `new int[]{1, 2}`; `ty` is the array type being built
    ArrayLit {
        ty: TypeExpr,
        items: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IncDec {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `op` is set for compound assignment
    Assign {
        target: Box<Expr>,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
    Cast {
        ty: TypeExpr,
        operand: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}
