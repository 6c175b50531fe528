use std::fmt::Display;

use crate::token::TokenKind;

/// The parsed program: a sequence of top-level statements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Source {
    pub items: Vec<Item>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
}

impl UnaryOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::NOT => Self::Not,
            TokenKind::MINUS => Self::Minus,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    Is,
    Isnt,
    Exceeds,
    Under,
    Atleast,
    Atmost,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Power => "**",
            Self::Is => "is",
            Self::Isnt => "isnt",
            Self::Exceeds => "exceeds",
            Self::Under => "under",
            Self::Atleast => "atleast",
            Self::Atmost => "atmost",
        })
    }
}

impl BinOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::STAR => Self::Star,
            TokenKind::SLASH => Self::Slash,
            TokenKind::PERCENT => Self::Percent,
            TokenKind::POWER => Self::Power,
            TokenKind::IS => Self::Is,
            TokenKind::ISNT => Self::Isnt,
            TokenKind::EXCEEDS => Self::Exceeds,
            TokenKind::UNDER => Self::Under,
            TokenKind::ATLEAST => Self::Atleast,
            TokenKind::ATMOST => Self::Atmost,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Void,
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            Self::Str(s) => s.to_owned(),
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Void => "void".to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        line: usize,
    },
    Ident {
        name: String,
        line: usize,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        line: usize,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinOp,
        rhs: Box<Expr>,
        line: usize,
    },
    Logical {
        lhs: Box<Expr>,
        op: LogicalOp,
        rhs: Box<Expr>,
        line: usize,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        line: usize,
    },
    /// List literal: `tome [1, 2, 3]` or bare `[1, 2, 3]`.
    Tome {
        elements: Vec<Expr>,
        line: usize,
    },
    /// Dict literal: `grimoire {"k": v}` or bare `{"k": v}`.
    Grimoire {
        pairs: Vec<(Expr, Expr)>,
        line: usize,
    },
    Index {
        collection: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },
    Member {
        object: Box<Expr>,
        member: String,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Self::Literal { line, .. }
            | Self::Ident { line, .. }
            | Self::Unary { line, .. }
            | Self::Binary { line, .. }
            | Self::Logical { line, .. }
            | Self::Call { line, .. }
            | Self::Tome { line, .. }
            | Self::Grimoire { line, .. }
            | Self::Index { line, .. }
            | Self::Member { line, .. } => *line,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// `conjure`/`summon`/`const prophecy` declaration.
    VarDecl {
        name: String,
        init: Expr,
        is_const: bool,
        line: usize,
    },
    /// `transmute name as value`.
    Reassign {
        name: String,
        value: Expr,
        line: usize,
    },
    /// `transmute collection[index] as value`.
    IndexAssign {
        collection: Expr,
        index: Expr,
        value: Expr,
        line: usize,
    },
    /// `vanquish name`.
    Delete {
        name: String,
        line: usize,
    },
    /// `spell`/`incantation` declaration. An incantation forwards its
    /// result to the speech collaborator after every call.
    SpellDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Item>,
        announces_result: bool,
        line: usize,
    },
    /// `cast value` (return).
    Cast {
        value: Option<Expr>,
        line: usize,
    },
    If {
        condition: Expr,
        then_branch: Box<Item>,
        elif_branches: Vec<(Expr, Item)>,
        else_branch: Option<Box<Item>>,
        line: usize,
    },
    /// `patrol until cond { body }`: runs while the condition is falsy.
    Until {
        condition: Expr,
        body: Box<Item>,
        line: usize,
    },
    /// `hunt each name in collection { body }`.
    Hunt {
        variable: String,
        iterable: Expr,
        body: Box<Item>,
        line: usize,
    },
    Break {
        line: usize,
    },
    Continue {
        line: usize,
    },
    Block(Vec<Item>),
    ExprStmt(Expr),
}
