//! # Intermediate AST
//!
//! A small JavaScript-shaped statement/expression tree. Lowering produces it
//! fresh for every compilation and the printer turns it into text.

/// A sequence of statements inside braces.
pub type Block = Vec<Stmt>;

/// The lowered body of one compiled function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    StrictEq,
    StrictNotEq,
    Gt,
    Lt,
    Gte,
    Lte,
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
            BinaryOp::Mod => "%",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::StrictEq | BinaryOp::StrictNotEq => 8,
            BinaryOp::Gt | BinaryOp::Lt | BinaryOp::Gte | BinaryOp::Lte => 9,
            BinaryOp::Add | BinaryOp::Sub => 11,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    Literal(Literal),
    /// Text of a template literal, printed between backticks.
    Template(String),
    /// Structured literal data typed into a control (arrays, objects).
    Json(serde_json::Value),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Await(Box<Expr>),
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Arrow {
        params: Vec<String>,
        body: Box<Expr>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(text.into()))
    }

    pub fn number(value: f64) -> Self {
        Expr::Literal(Literal::Number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn undefined() -> Self {
        Expr::Literal(Literal::Undefined)
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// `object.method(args)`
    pub fn method(object: Expr, method: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(object, method), args)
    }

    pub fn new_instance(class: &str, args: Vec<Expr>) -> Self {
        Expr::New {
            callee: Box::new(Expr::ident(class)),
            args,
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn awaited(expr: Expr) -> Self {
        Expr::Await(Box::new(expr))
    }

    pub fn assign(op: Option<BinaryOp>, target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Binding strength used by the printer to place parentheses.
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Assign { .. } | Expr::Arrow { .. } => 2,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { .. } | Expr::Await(_) => 14,
            Expr::Member { .. } | Expr::Call { .. } | Expr::New { .. } => 18,
            Expr::Identifier(_)
            | Expr::Literal(_)
            | Expr::Template(_)
            | Expr::Json(_)
            | Expr::Object(_)
            | Expr::Array(_) => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
}

impl VarKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    VarDecl {
        kind: VarKind,
        name: String,
        init: Option<Expr>,
    },
    If {
        test: Expr,
        consequent: Block,
        alternate: Block,
    },
    While {
        test: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        test: Expr,
    },
    For {
        init: Box<Stmt>,
        test: Expr,
        update: Expr,
        body: Block,
    },
    /// `for (const <binding> of <iterable>)`; the binding may be a pattern.
    ForOf {
        binding: String,
        iterable: Expr,
        body: Block,
    },
    Function {
        name: String,
        params: Vec<String>,
        is_async: bool,
        body: Block,
    },
    Return(Option<Expr>),
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn constant(name: impl Into<String>, init: Expr) -> Self {
        Stmt::VarDecl {
            kind: VarKind::Const,
            name: name.into(),
            init: Some(init),
        }
    }

    /// Whether the statement owns a braced block.
    pub fn is_compound(&self) -> bool {
        !matches!(
            self,
            Stmt::Expr(_) | Stmt::VarDecl { .. } | Stmt::Return(_)
        )
    }

    /// Visits this statement and every statement nested inside it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Stmt)) {
        visit(self);
        match self {
            Stmt::If {
                consequent,
                alternate,
                ..
            } => {
                for stmt in consequent.iter().chain(alternate.iter()) {
                    stmt.walk(visit);
                }
            }
            Stmt::While { body, .. }
            | Stmt::DoWhile { body, .. }
            | Stmt::For { body, .. }
            | Stmt::ForOf { body, .. }
            | Stmt::Function { body, .. } => {
                for stmt in body {
                    stmt.walk(visit);
                }
            }
            Stmt::Expr(_) | Stmt::VarDecl { .. } | Stmt::Return(_) => {}
        }
    }
}

impl Program {
    /// Every statement in the program, nested ones included, in source order.
    pub fn statements(&self) -> Vec<&Stmt> {
        let mut all = Vec::new();
        for stmt in &self.body {
            stmt.walk(&mut |s| all.push(s));
        }
        all
    }
}
