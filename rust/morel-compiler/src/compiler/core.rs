//! Typed core tree: the rewritten AST produced by inference.
//!
//! `fun` declarations are desugared to `val rec … fn`, constructor patterns
//! are resolved against the environment, record selectors carry their slot,
//! and every node carries its principal type.

use crate::compiler::ast::Literal;
use crate::compiler::tokens::Pos;
use crate::compiler::types::{DataDef, Type};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Expr {
    pub ty: Type,
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Id(String),
    /// Record selector with its 0-based slot in the record's label order.
    Selector { label: String, slot: usize },
    Apply { func: Box<Expr>, arg: Box<Expr> },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    /// Fields in label order.
    Record(Vec<(String, Expr)>),
    Let { decls: Vec<Decl>, body: Box<Expr> },
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Case { scrutinee: Box<Expr>, rules: Vec<Rule> },
    Fn { rules: Vec<Rule> },
    AndAlso(Box<Expr>, Box<Expr>),
    OrElse(Box<Expr>, Box<Expr>),
    /// Built-in infix with type-directed dispatch.
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    /// Unary `~`.
    Negate(Box<Expr>),
    From(FromCore),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Times,
    Divide,
    Div,
    Mod,
    Caret,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Cons,
}

#[derive(Debug, Clone)]
pub struct FromCore {
    /// `(name, source)` pairs in source order.
    pub sources: Vec<(String, Expr)>,
    pub filter: Option<Box<Expr>>,
    /// Group keys `(label, exp)` in declaration order.
    pub group: Vec<(String, Expr)>,
    pub compute: Vec<ComputeItem>,
    pub yield_exp: Option<Box<Expr>>,
}

#[derive(Debug, Clone)]
pub struct ComputeItem {
    pub label: String,
    pub agg: Expr,
    pub arg: Expr,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub pat: Pat,
    pub exp: Expr,
}

#[derive(Debug, Clone)]
pub struct Pat {
    pub ty: Type,
    pub kind: PatKind,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum PatKind {
    Wildcard,
    Id(String),
    Literal(Literal),
    Tuple(Vec<Pat>),
    List(Vec<Pat>),
    /// Fields `(label, slot, pat)` in label order; slot indexes the matched
    /// record's full field sequence, so an ellipsis pattern can skip fields.
    Record {
        fields: Vec<(String, usize, Pat)>,
        ellipsis: bool,
    },
    Con {
        name: String,
        arg: Option<Box<Pat>>,
    },
    Cons(Box<Pat>, Box<Pat>),
    Layered(String, Box<Pat>),
}

impl Pat {
    /// Names this pattern binds, with their types, left to right.
    pub fn bound_names(&self, out: &mut Vec<(String, Type)>) {
        match &self.kind {
            PatKind::Wildcard | PatKind::Literal(_) => {}
            PatKind::Id(name) => out.push((name.clone(), self.ty.clone())),
            PatKind::Tuple(items) | PatKind::List(items) => {
                for p in items {
                    p.bound_names(out);
                }
            }
            PatKind::Record { fields, .. } => {
                for (_, _, p) in fields {
                    p.bound_names(out);
                }
            }
            PatKind::Con { arg, .. } => {
                if let Some(p) = arg {
                    p.bound_names(out);
                }
            }
            PatKind::Cons(head, tail) => {
                head.bound_names(out);
                tail.bound_names(out);
            }
            PatKind::Layered(name, p) => {
                out.push((name.clone(), self.ty.clone()));
                p.bound_names(out);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Decl {
    Val { binds: Vec<ValBind> },
    Datatype(Vec<Rc<DataDef>>),
}

#[derive(Debug, Clone)]
pub struct ValBind {
    pub rec: bool,
    pub pat: Pat,
    pub exp: Expr,
}
