use crate::frontend::lexer::TokenKind;
use std::fmt;

/// Integer width of a declaration. The language's only type concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    I8,
    I16,
    I32,
    I64,
}

impl Width {
    /// Width used for all arithmetic results and function returns.
    pub const WORKING: Width = Width::I32;

    pub fn bits(self) -> u32 {
        match self {
            Width::I8 => 8,
            Width::I16 => 16,
            Width::I32 => 32,
            Width::I64 => 64,
        }
    }

    pub fn from_keyword(kind: TokenKind) -> Option<Width> {
        match kind {
            TokenKind::I8 => Some(Width::I8),
            TokenKind::I16 => Some(Width::I16),
            TokenKind::I32 => Some(Width::I32),
            TokenKind::I64 => Some(Width::I64),
            _ => None,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<BinOp> {
        match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            _ => None,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `var name width = init;`
    VarDecl {
        name: String,
        width: Width,
        init: Expr,
        line: usize,
    },
    /// `print expr;`
    Print { expr: Expr, line: usize },
    /// `fn name ( stmts... ) ;`
    FuncDecl {
        name: String,
        body: Block,
        line: usize,
    },
    /// `prototype name;`
    Prototype { name: String, line: usize },
    /// Expression evaluated for its value, which is otherwise discarded.
    Expr(Expr),
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::VarDecl { line, .. } => *line,
            Stmt::Print { line, .. } => *line,
            Stmt::FuncDecl { line, .. } => *line,
            Stmt::Prototype { line, .. } => *line,
            Stmt::Expr(e) => e.line(),
        }
    }
}

/// Function body container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Unsigned decimal literal, typed by the context it appears in.
    Number {
        text: String,
        width: Width,
        line: usize,
    },
    Ident {
        name: String,
        line: usize,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: usize,
    },
    /// Zero-argument call: `name()`
    Call {
        name: String,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Number { line, .. } => *line,
            Expr::Ident { line, .. } => *line,
            Expr::Binary { line, .. } => *line,
            Expr::Call { line, .. } => *line,
        }
    }

    /// Move both operands of a `Binary` onto `stack`, leaving empty leaves.
    fn detach_children(&mut self, stack: &mut Vec<Expr>) {
        if let Expr::Binary { left, right, .. } = self {
            stack.push(std::mem::replace(&mut **left, Expr::empty()));
            stack.push(std::mem::replace(&mut **right, Expr::empty()));
        }
    }

    fn empty() -> Expr {
        Expr::Ident {
            name: String::new(),
            line: 0,
        }
    }
}

// Operator chains are as deep as they are long; drop them with a heap stack.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        self.detach_children(&mut stack);
        while let Some(mut expr) = stack.pop() {
            expr.detach_children(&mut stack);
        }
    }
}
