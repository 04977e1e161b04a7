//! syntax tree of template expression bodies

/// literal constants
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// logical not: !
    Not,
    /// numeric negation: -
    Neg,
    /// numeric conversion: +
    Plus,
    /// type name: typeof
    TypeOf,
}

/// infix operators that always evaluate both operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// loose equality: ==
    Eq,
    /// loose inequality: !=
    Ne,
    /// strict equality: ===
    StrictEq,
    /// strict inequality: !==
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

/// short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    /// nullish coalescing: ??
    Nullish,
}

/// an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Array(Vec<Expr>),
    /// untagged template literal
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    /// tag`...`
    Tagged {
        tag: Box<Expr>,
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    /// obj.prop, obj[prop], obj?.prop
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        optional: bool,
    },
    /// callee(args), callee?.(args)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    /// boundary of a chain containing `?.`; a short-circuit inside yields undefined
    OptionalChain(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

impl Expr {
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn number(n: f64) -> Self {
        Expr::Literal(Literal::Number(n))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }
}

/// a statement of the expression body
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Return(Option<Expr>),
    Expr(Expr),
    /// const / let / var
    Declare {
        name: String,
        init: Option<Expr>,
    },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Empty,
}

/// a parsed expression body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}
