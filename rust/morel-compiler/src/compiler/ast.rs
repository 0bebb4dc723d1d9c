//! Abstract syntax tree for ML statements, with precedence-aware unparsing.

use crate::compiler::tokens::Pos;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ── Labels ──

/// Record label ordering: numeric labels sort numerically and precede
/// alphabetic labels; alphabetic labels sort lexicographically. Tuples are
/// records labeled `"1"`, `"2"`, … so `#2` lands after `#1` even past `#9`.
pub fn label_cmp(a: &str, b: &str) -> Ordering {
    let na = a.parse::<u64>().ok();
    let nb = b.parse::<u64>().ok();
    match (na, nb) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Labels `"1"`, `"2"`, … `"n"` for an n-tuple.
pub fn ordinal_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

// ── Operators ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assoc {
    Left,
    Right,
}

/// Infix precedence table. `andalso` and `orelse` are keywords with their own
/// AST forms; everything else dispatches by name.
pub fn infix_prec(op: &str) -> Option<(u8, Assoc)> {
    Some(match op {
        "*" | "/" | "div" | "mod" | "intersect" => (7, Assoc::Left),
        "+" | "-" | "^" | "union" | "except" => (6, Assoc::Left),
        "::" | "@" => (5, Assoc::Right),
        "=" | "<>" | "<" | ">" | "<=" | ">=" => (4, Assoc::Left),
        ":=" | "o" => (3, Assoc::Left),
        _ => return None,
    })
}

/// Printing level of function application (tighter than every infix).
const APPLY_PREC: u8 = 9;
/// Printing level of atoms.
const ATOM_PREC: u8 = 10;

// ── Literals ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(BigInt),
    Real(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Unit,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => {
                if n.sign() == num_bigint::Sign::Minus {
                    write!(f, "~{}", -n.clone())
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::Real(v) => write!(f, "{}", format_real(*v)),
            Literal::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Literal::Char(c) => write!(f, "#\"{}\"", escape_char(*c)),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Unit => write!(f, "()"),
        }
    }
}

/// Format a real the way ML prints it: `~` for the sign, and always a
/// fraction or exponent so the literal re-parses as a real.
pub fn format_real(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "~inf" }.to_string();
    }
    let mut s = if v == v.trunc() && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        let s = format!("{}", v);
        if s.contains('.') || s.contains('e') || s.contains('E') {
            s
        } else {
            format!("{}.0", s)
        }
    };
    if let Some(stripped) = s.strip_prefix('-') {
        s = format!("~{}", stripped);
    }
    s.replace('e', "E").replace("E-", "E~")
}

pub fn escape_string(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        out.push_str(&escape_char(c));
    }
    out
}

fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\\' => "\\\\".to_string(),
        '"' => "\\\"".to_string(),
        _ => c.to_string(),
    }
}

// ── Expressions ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Literal constant
    Literal(Literal, Pos),
    /// Identifier, possibly qualified: `x`, `List.map`
    Id(String, Pos),
    /// Record selector: `#label`
    RecordSelector(String, Pos),
    /// Application: `f x`
    Apply(Box<Expr>, Box<Expr>, Pos),
    /// Infix call: `a + b`, `h :: t`
    InfixCall(String, Box<Expr>, Box<Expr>, Pos),
    /// Prefix negation: `~ e`
    PrefixCall(String, Box<Expr>, Pos),
    /// Short-circuit conjunction
    AndAlso(Box<Expr>, Box<Expr>, Pos),
    /// Short-circuit disjunction
    OrElse(Box<Expr>, Box<Expr>, Pos),
    /// Tuple: `(a, b)` (two or more fields)
    Tuple(Vec<Expr>, Pos),
    /// List: `[a, b]`
    List(Vec<Expr>, Pos),
    /// Record: `{a = 1, b = 2}`; fields sorted by label at construction
    Record(Vec<(String, Expr)>, Pos),
    /// `let decls in body end`
    Let(Vec<Decl>, Box<Expr>, Pos),
    /// `if c then t else f`
    If(Box<Expr>, Box<Expr>, Box<Expr>, Pos),
    /// `case e of p1 => e1 | …`
    Case(Box<Expr>, Vec<MatchRule>, Pos),
    /// `fn p1 => e1 | …`
    Fn(Vec<MatchRule>, Pos),
    /// `from s1 as id1, … where e group … compute … yield e`
    From(FromExpr, Pos),
    /// `e : ty`
    Annotated(Box<Expr>, TypeExp, Pos),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRule {
    pub pat: Pat,
    pub exp: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FromExpr {
    pub sources: Vec<QuerySource>,
    pub where_exp: Option<Box<Expr>>,
    pub group: Vec<GroupKey>,
    pub compute: Vec<Aggregate>,
    pub yield_exp: Option<Box<Expr>>,
}

/// One query source: `exp as name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySource {
    pub exp: Expr,
    pub name: String,
    pub pos: Pos,
}

/// One grouping key: `exp as label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupKey {
    pub exp: Expr,
    pub label: String,
    pub pos: Pos,
}

/// One aggregate: `agg of arg as label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    pub agg: Expr,
    pub arg: Expr,
    pub label: String,
    pub pos: Pos,
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Literal(_, p)
            | Expr::Id(_, p)
            | Expr::RecordSelector(_, p)
            | Expr::Apply(_, _, p)
            | Expr::InfixCall(_, _, _, p)
            | Expr::PrefixCall(_, _, p)
            | Expr::AndAlso(_, _, p)
            | Expr::OrElse(_, _, p)
            | Expr::Tuple(_, p)
            | Expr::List(_, p)
            | Expr::Record(_, p)
            | Expr::Let(_, _, p)
            | Expr::If(_, _, _, p)
            | Expr::Case(_, _, p)
            | Expr::Fn(_, p)
            | Expr::From(_, p)
            | Expr::Annotated(_, _, p) => *p,
        }
    }

    /// Build a record expression, sorting the fields into label order.
    pub fn record(mut fields: Vec<(String, Expr)>, pos: Pos) -> Expr {
        fields.sort_by(|a, b| label_cmp(&a.0, &b.0));
        Expr::Record(fields, pos)
    }

    fn prec(&self) -> u8 {
        match self {
            Expr::Literal(..)
            | Expr::Id(..)
            | Expr::RecordSelector(..)
            | Expr::Tuple(..)
            | Expr::List(..)
            | Expr::Record(..) => ATOM_PREC,
            Expr::Apply(..) => APPLY_PREC,
            Expr::PrefixCall(..) => 8,
            Expr::InfixCall(op, _, _, _) => infix_prec(op).map(|(p, _)| p).unwrap_or(4),
            Expr::AndAlso(..) => 2,
            Expr::OrElse(..) => 1,
            Expr::Let(..)
            | Expr::If(..)
            | Expr::Case(..)
            | Expr::Fn(..)
            | Expr::From(..)
            | Expr::Annotated(..) => 0,
        }
    }

    fn unparse(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        let prec = self.prec();
        let parens = prec < min_prec;
        if parens {
            write!(f, "(")?;
        }
        match self {
            Expr::Literal(lit, _) => write!(f, "{}", lit)?,
            Expr::Id(name, _) => write!(f, "{}", name)?,
            Expr::RecordSelector(label, _) => write!(f, "#{}", label)?,
            Expr::Apply(func, arg, _) => {
                func.unparse(f, APPLY_PREC)?;
                write!(f, " ")?;
                arg.unparse(f, APPLY_PREC + 1)?;
            }
            Expr::InfixCall(op, lhs, rhs, _) => {
                let (p, assoc) = infix_prec(op).unwrap_or((4, Assoc::Left));
                let (lp, rp) = match assoc {
                    Assoc::Left => (p, p + 1),
                    Assoc::Right => (p + 1, p),
                };
                lhs.unparse(f, lp)?;
                write!(f, " {} ", op)?;
                rhs.unparse(f, rp)?;
            }
            Expr::PrefixCall(op, arg, _) => {
                write!(f, "{} ", op)?;
                arg.unparse(f, 9)?;
            }
            Expr::AndAlso(lhs, rhs, _) => {
                lhs.unparse(f, 2)?;
                write!(f, " andalso ")?;
                rhs.unparse(f, 3)?;
            }
            Expr::OrElse(lhs, rhs, _) => {
                lhs.unparse(f, 1)?;
                write!(f, " orelse ")?;
                rhs.unparse(f, 2)?;
            }
            Expr::Tuple(items, _) => {
                write!(f, "(")?;
                for (i, e) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    e.unparse(f, 0)?;
                }
                write!(f, ")")?;
            }
            Expr::List(items, _) => {
                write!(f, "[")?;
                for (i, e) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    e.unparse(f, 0)?;
                }
                write!(f, "]")?;
            }
            Expr::Record(fields, _) => {
                write!(f, "{{")?;
                for (i, (label, e)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = ", label)?;
                    e.unparse(f, 0)?;
                }
                write!(f, "}}")?;
            }
            Expr::Let(decls, body, _) => {
                write!(f, "let ")?;
                for d in decls {
                    write!(f, "{} ", d)?;
                }
                write!(f, "in ")?;
                body.unparse(f, 0)?;
                write!(f, " end")?;
            }
            Expr::If(cond, then_exp, else_exp, _) => {
                write!(f, "if ")?;
                cond.unparse(f, 0)?;
                write!(f, " then ")?;
                then_exp.unparse(f, 0)?;
                write!(f, " else ")?;
                else_exp.unparse(f, 0)?;
            }
            Expr::Case(scrutinee, rules, _) => {
                write!(f, "case ")?;
                scrutinee.unparse(f, 0)?;
                write!(f, " of ")?;
                unparse_rules(f, rules)?;
            }
            Expr::Fn(rules, _) => {
                write!(f, "fn ")?;
                unparse_rules(f, rules)?;
            }
            Expr::From(from, _) => {
                write!(f, "from ")?;
                for (i, s) in from.sources.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    s.exp.unparse(f, 1)?;
                    write!(f, " as {}", s.name)?;
                }
                if let Some(w) = &from.where_exp {
                    write!(f, " where ")?;
                    w.unparse(f, 1)?;
                }
                if !from.group.is_empty() {
                    write!(f, " group ")?;
                    for (i, g) in from.group.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        g.exp.unparse(f, 1)?;
                        write!(f, " as {}", g.label)?;
                    }
                    if !from.compute.is_empty() {
                        write!(f, " compute ")?;
                        for (i, a) in from.compute.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            a.agg.unparse(f, APPLY_PREC)?;
                            write!(f, " of ")?;
                            a.arg.unparse(f, 1)?;
                            write!(f, " as {}", a.label)?;
                        }
                    }
                }
                if let Some(y) = &from.yield_exp {
                    write!(f, " yield ")?;
                    y.unparse(f, 1)?;
                }
            }
            Expr::Annotated(e, ty, _) => {
                e.unparse(f, 1)?;
                write!(f, " : {}", ty)?;
            }
        }
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn unparse_rules(f: &mut fmt::Formatter<'_>, rules: &[MatchRule]) -> fmt::Result {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            write!(f, " | ")?;
        }
        write!(f, "{} => ", rule.pat)?;
        rule.exp.unparse(f, 0)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.unparse(f, 0)
    }
}

// ── Patterns ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pat {
    /// `_`
    Wildcard(Pos),
    /// Variable or nullary constructor; resolved during inference
    Id(String, Pos),
    /// Literal pattern
    Literal(Literal, Pos),
    /// `(p1, p2)`
    Tuple(Vec<Pat>, Pos),
    /// `[p1, p2]`
    List(Vec<Pat>, Pos),
    /// `{a = p, b, ...}`; fields sorted by label at construction
    Record {
        fields: Vec<(String, Pat)>,
        ellipsis: bool,
        pos: Pos,
    },
    /// Constructor application: `SOME p`
    Con(String, Box<Pat>, Pos),
    /// `h :: t`
    Cons(Box<Pat>, Box<Pat>, Pos),
    /// `name as p`
    Layered(String, Box<Pat>, Pos),
    /// `p : ty`
    Annotated(Box<Pat>, TypeExp, Pos),
}

impl Pat {
    pub fn pos(&self) -> Pos {
        match self {
            Pat::Wildcard(p)
            | Pat::Id(_, p)
            | Pat::Literal(_, p)
            | Pat::Tuple(_, p)
            | Pat::List(_, p)
            | Pat::Record { pos: p, .. }
            | Pat::Con(_, _, p)
            | Pat::Cons(_, _, p)
            | Pat::Layered(_, _, p)
            | Pat::Annotated(_, _, p) => *p,
        }
    }

    pub fn record(mut fields: Vec<(String, Pat)>, ellipsis: bool, pos: Pos) -> Pat {
        fields.sort_by(|a, b| label_cmp(&a.0, &b.0));
        Pat::Record {
            fields,
            ellipsis,
            pos,
        }
    }

    fn unparse(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        // Pattern levels: atoms 3, constructor application 2, cons 1, layered/annotated 0.
        let prec = match self {
            Pat::Wildcard(_)
            | Pat::Id(..)
            | Pat::Literal(..)
            | Pat::Tuple(..)
            | Pat::List(..)
            | Pat::Record { .. } => 3,
            Pat::Con(..) => 2,
            Pat::Cons(..) => 1,
            Pat::Layered(..) | Pat::Annotated(..) => 0,
        };
        let parens = prec < min_prec;
        if parens {
            write!(f, "(")?;
        }
        match self {
            Pat::Wildcard(_) => write!(f, "_")?,
            Pat::Id(name, _) => write!(f, "{}", name)?,
            Pat::Literal(lit, _) => write!(f, "{}", lit)?,
            Pat::Tuple(items, _) => {
                write!(f, "(")?;
                for (i, p) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    p.unparse(f, 0)?;
                }
                write!(f, ")")?;
            }
            Pat::List(items, _) => {
                write!(f, "[")?;
                for (i, p) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    p.unparse(f, 0)?;
                }
                write!(f, "]")?;
            }
            Pat::Record {
                fields, ellipsis, ..
            } => {
                write!(f, "{{")?;
                for (i, (label, p)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = ", label)?;
                    p.unparse(f, 0)?;
                }
                if *ellipsis {
                    if !fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, "}}")?;
            }
            Pat::Con(name, arg, _) => {
                write!(f, "{} ", name)?;
                arg.unparse(f, 3)?;
            }
            Pat::Cons(head, tail, _) => {
                head.unparse(f, 2)?;
                write!(f, " :: ")?;
                tail.unparse(f, 1)?;
            }
            Pat::Layered(name, p, _) => {
                write!(f, "{} as ", name)?;
                p.unparse(f, 1)?;
            }
            Pat::Annotated(p, ty, _) => {
                p.unparse(f, 1)?;
                write!(f, " : {}", ty)?;
            }
        }
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Pat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.unparse(f, 0)
    }
}

// ── Type expressions ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExp {
    /// `'a`
    Var(String, Pos),
    /// Named type with arguments: `int`, `'a list`, `('a, 'b) pair`
    Con(String, Vec<TypeExp>, Pos),
    /// `t1 * t2`
    Tuple(Vec<TypeExp>, Pos),
    /// `t1 -> t2`
    Fn(Box<TypeExp>, Box<TypeExp>, Pos),
    /// `{a: t1, b: t2}`; fields sorted by label at construction
    Record(Vec<(String, TypeExp)>, Pos),
}

impl TypeExp {
    pub fn pos(&self) -> Pos {
        match self {
            TypeExp::Var(_, p)
            | TypeExp::Con(_, _, p)
            | TypeExp::Tuple(_, p)
            | TypeExp::Fn(_, _, p)
            | TypeExp::Record(_, p) => *p,
        }
    }

    pub fn record(mut fields: Vec<(String, TypeExp)>, pos: Pos) -> TypeExp {
        fields.sort_by(|a, b| label_cmp(&a.0, &b.0));
        TypeExp::Record(fields, pos)
    }

    fn unparse(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        // Type levels: -> is 1 (right-assoc), * is 2, application/atom 3.
        let prec = match self {
            TypeExp::Fn(..) => 1,
            TypeExp::Tuple(..) => 2,
            _ => 3,
        };
        let parens = prec < min_prec;
        if parens {
            write!(f, "(")?;
        }
        match self {
            TypeExp::Var(name, _) => write!(f, "'{}", name)?,
            TypeExp::Con(name, args, _) => match args.len() {
                0 => write!(f, "{}", name)?,
                1 => {
                    args[0].unparse(f, 3)?;
                    write!(f, " {}", name)?;
                }
                _ => {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        a.unparse(f, 0)?;
                    }
                    write!(f, ") {}", name)?;
                }
            },
            TypeExp::Tuple(items, _) => {
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    t.unparse(f, 3)?;
                }
            }
            TypeExp::Fn(dom, cod, _) => {
                dom.unparse(f, 2)?;
                write!(f, " -> ")?;
                cod.unparse(f, 1)?;
            }
            TypeExp::Record(fields, _) => {
                write!(f, "{{")?;
                for (i, (label, t)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", label)?;
                    t.unparse(f, 0)?;
                }
                write!(f, "}}")?;
            }
        }
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.unparse(f, 0)
    }
}

// ── Declarations ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    /// `val [rec] p = e and …`
    Val(Vec<ValBind>, Pos),
    /// `fun f p1 … = e | …`
    Fun(Vec<FunBind>, Pos),
    /// `datatype ('a, …) t = C of ty | …`
    Datatype(Vec<DatBind>, Pos),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValBind {
    pub rec: bool,
    pub pat: Pat,
    pub exp: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunBind {
    pub name: String,
    pub clauses: Vec<FunClause>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunClause {
    pub pats: Vec<Pat>,
    pub exp: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatBind {
    pub ty_vars: Vec<String>,
    pub name: String,
    pub cons: Vec<ConBind>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConBind {
    pub name: String,
    pub ty: Option<TypeExp>,
    pub pos: Pos,
}

impl Decl {
    pub fn pos(&self) -> Pos {
        match self {
            Decl::Val(_, p) | Decl::Fun(_, p) | Decl::Datatype(_, p) => *p,
        }
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Val(binds, _) => {
                write!(f, "val ")?;
                for (i, b) in binds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    if b.rec {
                        write!(f, "rec ")?;
                    }
                    write!(f, "{} = {}", b.pat, b.exp)?;
                }
                Ok(())
            }
            Decl::Fun(binds, _) => {
                write!(f, "fun ")?;
                for (i, b) in binds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    for (j, clause) in b.clauses.iter().enumerate() {
                        if j > 0 {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", b.name)?;
                        for p in &clause.pats {
                            write!(f, " ")?;
                            p.unparse_atom(f)?;
                        }
                        write!(f, " = {}", clause.exp)?;
                    }
                }
                Ok(())
            }
            Decl::Datatype(binds, _) => {
                write!(f, "datatype ")?;
                for (i, b) in binds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    match b.ty_vars.len() {
                        0 => {}
                        1 => write!(f, "'{} ", b.ty_vars[0])?,
                        _ => {
                            write!(f, "(")?;
                            for (j, v) in b.ty_vars.iter().enumerate() {
                                if j > 0 {
                                    write!(f, ", ")?;
                                }
                                write!(f, "'{}", v)?;
                            }
                            write!(f, ") ")?;
                        }
                    }
                    write!(f, "{} = ", b.name)?;
                    for (j, c) in b.cons.iter().enumerate() {
                        if j > 0 {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", c.name)?;
                        if let Some(ty) = &c.ty {
                            write!(f, " of {}", ty)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl Pat {
    fn unparse_atom(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.unparse(f, 3)
    }
}
