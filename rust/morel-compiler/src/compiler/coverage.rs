//! Match coverage analysis: redundant and nonexhaustive warnings.
//!
//! Classic usefulness recursion over a pattern matrix. A clause is redundant
//! when it is useless with respect to the clauses before it; a match is
//! nonexhaustive when a wildcard row is still useful after every clause.

use crate::compiler::ast::Literal;
use crate::compiler::core::{Pat, PatKind, Rule};
use crate::compiler::infer::{TypeEnv, TypeError};
use crate::compiler::tokens::Pos;
use crate::compiler::types::Type;

#[derive(Debug, Clone, PartialEq)]
enum Tag {
    Tuple(usize),
    Record(usize),
    Ctor(String),
    Nil,
    ConsCell,
    Lit(Literal),
}

#[derive(Debug, Clone)]
enum SPat {
    Wild,
    Con { tag: Tag, args: Vec<SPat> },
}

fn wilds(n: usize) -> Vec<SPat> {
    (0..n).map(|_| SPat::Wild).collect()
}

fn simplify(pat: &Pat) -> SPat {
    match &pat.kind {
        PatKind::Wildcard | PatKind::Id(_) => SPat::Wild,
        PatKind::Literal(Literal::Unit) => SPat::Con {
            tag: Tag::Tuple(0),
            args: Vec::new(),
        },
        PatKind::Literal(lit) => SPat::Con {
            tag: Tag::Lit(lit.clone()),
            args: Vec::new(),
        },
        PatKind::Tuple(items) => SPat::Con {
            tag: Tag::Tuple(items.len()),
            args: items.iter().map(simplify).collect(),
        },
        PatKind::List(items) => {
            let mut spat = SPat::Con {
                tag: Tag::Nil,
                args: Vec::new(),
            };
            for item in items.iter().rev() {
                spat = SPat::Con {
                    tag: Tag::ConsCell,
                    args: vec![simplify(item), spat],
                };
            }
            spat
        }
        PatKind::Record { fields, .. } => {
            let width = match &pat.ty {
                Type::Record(fs) => fs.len(),
                Type::Tuple(items) => items.len(),
                _ => fields.len(),
            };
            let mut args = wilds(width);
            for (_, slot, p) in fields {
                if *slot < width {
                    args[*slot] = simplify(p);
                }
            }
            SPat::Con {
                tag: Tag::Record(width),
                args,
            }
        }
        PatKind::Con { name, arg } => SPat::Con {
            tag: Tag::Ctor(name.clone()),
            args: arg.iter().map(|p| simplify(p)).collect(),
        },
        PatKind::Cons(head, tail) => SPat::Con {
            tag: Tag::ConsCell,
            args: vec![simplify(head), simplify(tail)],
        },
        PatKind::Layered(_, inner) => simplify(inner),
    }
}

fn arity(tag: &Tag, env: &TypeEnv) -> usize {
    match tag {
        Tag::Tuple(n) | Tag::Record(n) => *n,
        Tag::ConsCell => 2,
        Tag::Nil | Tag::Lit(_) => 0,
        Tag::Ctor(name) => env
            .datatype_of_con(name)
            .and_then(|d| d.con(name).map(|c| usize::from(c.arg.is_some())))
            .unwrap_or(0),
    }
}

/// Whether the tags observed in a column form a complete signature.
fn complete_signature(tags: &[Tag], env: &TypeEnv) -> Option<Vec<Tag>> {
    let first = tags.first()?;
    match first {
        Tag::Tuple(_) | Tag::Record(_) => Some(vec![first.clone()]),
        Tag::Nil | Tag::ConsCell => {
            let has_nil = tags.iter().any(|t| matches!(t, Tag::Nil));
            let has_cons = tags.iter().any(|t| matches!(t, Tag::ConsCell));
            if has_nil && has_cons {
                Some(vec![Tag::Nil, Tag::ConsCell])
            } else {
                None
            }
        }
        Tag::Lit(Literal::Bool(_)) => {
            let has_true = tags.iter().any(|t| matches!(t, Tag::Lit(Literal::Bool(true))));
            let has_false = tags
                .iter()
                .any(|t| matches!(t, Tag::Lit(Literal::Bool(false))));
            if has_true && has_false {
                Some(vec![
                    Tag::Lit(Literal::Bool(true)),
                    Tag::Lit(Literal::Bool(false)),
                ])
            } else {
                None
            }
        }
        Tag::Lit(_) => None,
        Tag::Ctor(name) => {
            let def = env.datatype_of_con(name)?;
            let all_present = def.cons.iter().all(|c| {
                tags.iter()
                    .any(|t| matches!(t, Tag::Ctor(n) if n == &c.name))
            });
            if all_present {
                Some(def.cons.iter().map(|c| Tag::Ctor(c.name.clone())).collect())
            } else {
                None
            }
        }
    }
}

fn specialize(matrix: &[Vec<SPat>], tag: &Tag, arity: usize) -> Vec<Vec<SPat>> {
    let mut out = Vec::new();
    for row in matrix {
        match &row[0] {
            SPat::Wild => {
                let mut new_row = wilds(arity);
                new_row.extend_from_slice(&row[1..]);
                out.push(new_row);
            }
            SPat::Con { tag: t, args } if t == tag => {
                let mut new_row = args.clone();
                new_row.extend_from_slice(&row[1..]);
                out.push(new_row);
            }
            SPat::Con { .. } => {}
        }
    }
    out
}

fn default_matrix(matrix: &[Vec<SPat>]) -> Vec<Vec<SPat>> {
    matrix
        .iter()
        .filter(|row| matches!(row[0], SPat::Wild))
        .map(|row| row[1..].to_vec())
        .collect()
}

fn useful(matrix: &[Vec<SPat>], row: &[SPat], env: &TypeEnv) -> bool {
    if row.is_empty() {
        return matrix.is_empty();
    }
    match &row[0] {
        SPat::Con { tag, args } => {
            let mut new_row = args.clone();
            new_row.extend_from_slice(&row[1..]);
            useful(&specialize(matrix, tag, args.len()), &new_row, env)
        }
        SPat::Wild => {
            let tags: Vec<Tag> = matrix
                .iter()
                .filter_map(|r| match &r[0] {
                    SPat::Con { tag, .. } => Some(tag.clone()),
                    SPat::Wild => None,
                })
                .collect();
            match complete_signature(&tags, env) {
                Some(signature) => signature.iter().any(|tag| {
                    let n = arity(tag, env);
                    let mut new_row = wilds(n);
                    new_row.extend_from_slice(&row[1..]);
                    useful(&specialize(matrix, tag, n), &new_row, env)
                }),
                None => useful(&default_matrix(matrix), &row[1..], env),
            }
        }
    }
}

/// Check one `case`/`fn` match; returns `Redundant` warnings for unreachable
/// clauses and a `NotExhaustive` warning if a value can slip through.
pub fn check_match(rules: &[Rule], env: &TypeEnv, pos: Pos) -> Vec<TypeError> {
    let mut warnings = Vec::new();
    let rows: Vec<Vec<SPat>> = rules.iter().map(|r| vec![simplify(&r.pat)]).collect();
    for i in 1..rows.len() {
        if !useful(&rows[..i], &rows[i], env) {
            warnings.push(TypeError::Redundant {
                pos: rules[i].pat.pos,
            });
        }
    }
    if useful(&rows, &[SPat::Wild], env) {
        warnings.push(TypeError::NotExhaustive { pos });
    }
    warnings
}
