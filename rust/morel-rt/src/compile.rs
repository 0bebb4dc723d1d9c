//! Translation of the typed core tree into the `Code` tree.

use crate::code::{ArithOp, Code, CompareOp, EvalContext, FromCode, LetGroup, NumMode};
use crate::env::EvalEnv;
use crate::value::{EvalError, Value};
use morel_compiler::ast::Literal;
use morel_compiler::compiler::tokens::Pos;
use morel_compiler::core::{self, BinOp, ExprKind, PatKind};
use morel_compiler::{PrimType, Type};
use num_traits::ToPrimitive;
use std::rc::Rc;

pub fn compile_expr(exp: &core::Expr) -> Result<Code, EvalError> {
    match &exp.kind {
        ExprKind::Literal(lit) => Ok(Code::Constant(literal_value(lit)?)),
        ExprKind::Id(name) => Ok(Code::Get { name: name.clone() }),
        ExprKind::Selector { slot, .. } => Ok(Code::Constant(Value::Selector(*slot))),
        ExprKind::Apply { func, arg } => Ok(Code::Apply {
            func: Box::new(compile_expr(func)?),
            arg: Box::new(compile_expr(arg)?),
        }),
        ExprKind::Tuple(items) => {
            let labels = (1..=items.len()).map(|i| i.to_string()).collect();
            Ok(Code::Record {
                labels: Rc::new(labels),
                codes: items.iter().map(compile_expr).collect::<Result<_, _>>()?,
            })
        }
        ExprKind::List(items) => Ok(Code::ListOf(
            items.iter().map(compile_expr).collect::<Result<_, _>>()?,
        )),
        ExprKind::Record(fields) => {
            let labels = fields.iter().map(|(l, _)| l.clone()).collect();
            Ok(Code::Record {
                labels: Rc::new(labels),
                codes: fields
                    .iter()
                    .map(|(_, e)| compile_expr(e))
                    .collect::<Result<_, _>>()?,
            })
        }
        ExprKind::Let { decls, body } => {
            let mut groups = Vec::new();
            for decl in decls {
                groups.extend(compile_decl(decl)?);
            }
            Ok(Code::Let {
                groups,
                body: Box::new(compile_expr(body)?),
            })
        }
        ExprKind::If(cond, then_exp, else_exp) => Ok(Code::If(
            Box::new(compile_expr(cond)?),
            Box::new(compile_expr(then_exp)?),
            Box::new(compile_expr(else_exp)?),
        )),
        ExprKind::Case { scrutinee, rules } => Ok(Code::Case {
            scrutinee: Box::new(compile_expr(scrutinee)?),
            rules: Rc::new(compile_rules(rules)?),
        }),
        ExprKind::Fn { rules } => Ok(Code::MakeClosure {
            rules: Rc::new(compile_rules(rules)?),
        }),
        ExprKind::AndAlso(lhs, rhs) => Ok(Code::AndAlso(
            Box::new(compile_expr(lhs)?),
            Box::new(compile_expr(rhs)?),
        )),
        ExprKind::OrElse(lhs, rhs) => Ok(Code::OrElse(
            Box::new(compile_expr(lhs)?),
            Box::new(compile_expr(rhs)?),
        )),
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs_code = Box::new(compile_expr(lhs)?);
            let rhs_code = Box::new(compile_expr(rhs)?);
            match op {
                BinOp::Plus | BinOp::Minus | BinOp::Times | BinOp::Divide | BinOp::Div
                | BinOp::Mod => Ok(Code::Arith {
                    op: match op {
                        BinOp::Plus => ArithOp::Plus,
                        BinOp::Minus => ArithOp::Minus,
                        BinOp::Times => ArithOp::Times,
                        BinOp::Divide => ArithOp::Divide,
                        BinOp::Div => ArithOp::Div,
                        _ => ArithOp::Mod,
                    },
                    mode: num_mode(&lhs.ty),
                    lhs: lhs_code,
                    rhs: rhs_code,
                }),
                BinOp::Caret => Ok(Code::StrConcat(lhs_code, rhs_code)),
                BinOp::Cons => Ok(Code::ConsOp {
                    head: lhs_code,
                    tail: rhs_code,
                }),
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    Ok(Code::Compare {
                        op: match op {
                            BinOp::Eq => CompareOp::Eq,
                            BinOp::Ne => CompareOp::Ne,
                            BinOp::Lt => CompareOp::Lt,
                            BinOp::Le => CompareOp::Le,
                            BinOp::Gt => CompareOp::Gt,
                            _ => CompareOp::Ge,
                        },
                        lhs: lhs_code,
                        rhs: rhs_code,
                    })
                }
            }
        }
        ExprKind::Negate(arg) => Ok(Code::Negate {
            mode: num_mode(&arg.ty),
            arg: Box::new(compile_expr(arg)?),
        }),
        ExprKind::From(from) => Ok(Code::From(Box::new(FromCode {
            sources: from
                .sources
                .iter()
                .map(|(n, e)| Ok((n.clone(), compile_expr(e)?)))
                .collect::<Result<_, EvalError>>()?,
            filter: from.filter.as_deref().map(compile_expr).transpose()?,
            group: from
                .group
                .iter()
                .map(|(l, e)| Ok((l.clone(), compile_expr(e)?)))
                .collect::<Result<_, EvalError>>()?,
            compute: from
                .compute
                .iter()
                .map(|item| {
                    Ok((
                        item.label.clone(),
                        compile_expr(&item.agg)?,
                        compile_expr(&item.arg)?,
                    ))
                })
                .collect::<Result<_, EvalError>>()?,
            yield_code: from.yield_exp.as_deref().map(compile_expr).transpose()?,
        }))),
    }
}

fn compile_rules(rules: &[core::Rule]) -> Result<Vec<(core::Pat, Code)>, EvalError> {
    rules
        .iter()
        .map(|r| Ok((r.pat.clone(), compile_expr(&r.exp)?)))
        .collect()
}

/// Compile a declaration into binding groups: one group per `val` chain, and
/// one constant binding per datatype constructor.
pub fn compile_decl(decl: &core::Decl) -> Result<Vec<LetGroup>, EvalError> {
    match decl {
        core::Decl::Val { binds } => {
            let binds = binds
                .iter()
                .map(|b| Ok((b.pat.clone(), b.rec, compile_expr(&b.exp)?)))
                .collect::<Result<_, EvalError>>()?;
            Ok(vec![LetGroup { binds }])
        }
        core::Decl::Datatype(defs) => {
            let mut binds = Vec::new();
            for def in defs {
                for con in &def.cons {
                    let value = if con.arg.is_some() {
                        Value::Ctor(con.name.clone())
                    } else {
                        Value::Data(con.name.clone(), None)
                    };
                    binds.push((
                        core::Pat {
                            ty: Type::UNIT,
                            kind: PatKind::Id(con.name.clone()),
                            pos: Pos::ZERO,
                        },
                        false,
                        Code::Constant(value),
                    ));
                }
            }
            Ok(vec![LetGroup { binds }])
        }
    }
}

/// Compile and evaluate a top-level declaration against a persistent
/// environment; returns the extended environment and the values bound.
pub fn eval_decl(
    decl: &core::Decl,
    env: &EvalEnv,
    ctx: &mut EvalContext,
) -> Result<(EvalEnv, Vec<(String, Value)>), EvalError> {
    let mut env = env.clone();
    let mut bound = Vec::new();
    for group in compile_decl(decl)? {
        let (next, names) = crate::code::eval_let_group(&group, &env, ctx)?;
        env = next;
        bound.extend(names);
    }
    Ok((env, bound))
}

pub fn literal_value(lit: &Literal) -> Result<Value, EvalError> {
    Ok(match lit {
        Literal::Int(n) => Value::Int(n.to_i64().ok_or(EvalError::Overflow)?),
        Literal::Real(v) => Value::Real(*v),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Char(c) => Value::Char(*c),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Unit => Value::Unit,
    })
}

fn num_mode(ty: &Type) -> NumMode {
    if matches!(ty, Type::Prim(PrimType::Real)) {
        NumMode::Real
    } else {
        NumMode::Int
    }
}
