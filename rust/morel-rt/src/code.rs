//! Compiled code tree and its evaluator.
//!
//! Each `Code` node is a closed unit: given an environment and the session
//! context it produces a value or fails with an `EvalError`. Closures pair a
//! rule list with the environment captured when the `fn` was evaluated.

use crate::builtins;
use crate::env::EvalEnv;
use crate::props::Props;
use crate::value::{Closure, EvalError, Value};
use morel_compiler::ast::Literal;
use morel_compiler::core::{Pat, PatKind};
use std::cmp::Ordering;
use std::rc::Rc;

/// Session state visible to running code: the mutable properties and a
/// snapshot of the top-level bindings for `Sys.env`.
#[derive(Debug, Default)]
pub struct EvalContext {
    pub props: Props,
    pub bindings: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumMode {
    Int,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Plus,
    Minus,
    Times,
    Divide,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub enum Code {
    Constant(Value),
    Get { name: String },
    Let { groups: Vec<LetGroup>, body: Box<Code> },
    MakeClosure { rules: Rc<Vec<(Pat, Code)>> },
    Apply { func: Box<Code>, arg: Box<Code> },
    If(Box<Code>, Box<Code>, Box<Code>),
    AndAlso(Box<Code>, Box<Code>),
    OrElse(Box<Code>, Box<Code>),
    Case { scrutinee: Box<Code>, rules: Rc<Vec<(Pat, Code)>> },
    /// Records and tuples: codes in label order.
    Record { labels: Rc<Vec<String>>, codes: Vec<Code> },
    ListOf(Vec<Code>),
    Arith { op: ArithOp, mode: NumMode, lhs: Box<Code>, rhs: Box<Code> },
    Negate { mode: NumMode, arg: Box<Code> },
    Compare { op: CompareOp, lhs: Box<Code>, rhs: Box<Code> },
    StrConcat(Box<Code>, Box<Code>),
    ConsOp { head: Box<Code>, tail: Box<Code> },
    From(Box<FromCode>),
}

#[derive(Debug, Clone)]
pub struct LetGroup {
    pub binds: Vec<(Pat, bool, Code)>,
}

#[derive(Debug, Clone)]
pub struct FromCode {
    pub sources: Vec<(String, Code)>,
    pub filter: Option<Code>,
    pub group: Vec<(String, Code)>,
    pub compute: Vec<(String, Code, Code)>,
    pub yield_code: Option<Code>,
}

impl Code {
    pub fn eval(&self, env: &EvalEnv, ctx: &mut EvalContext) -> Result<Value, EvalError> {
        match self {
            Code::Constant(v) => Ok(v.clone()),
            Code::Get { name } => env.lookup(name).ok_or_else(|| {
                // Inference has already proved the name is bound.
                EvalError::Internal(format!("unbound name {}", name))
            }),
            Code::Let { groups, body } => {
                let mut env = env.clone();
                for group in groups {
                    env = eval_let_group(group, &env, ctx)?.0;
                }
                body.eval(&env, ctx)
            }
            Code::MakeClosure { rules } => Ok(Value::Closure(Rc::new(Closure {
                rules: rules.clone(),
                env: env.clone(),
            }))),
            Code::Apply { func, arg } => {
                let func = func.eval(env, ctx)?;
                let arg = arg.eval(env, ctx)?;
                apply_value(func, arg, ctx)
            }
            Code::If(cond, then_code, else_code) => {
                if cond.eval(env, ctx)?.as_bool()? {
                    then_code.eval(env, ctx)
                } else {
                    else_code.eval(env, ctx)
                }
            }
            Code::AndAlso(lhs, rhs) => {
                if lhs.eval(env, ctx)?.as_bool()? {
                    rhs.eval(env, ctx)
                } else {
                    Ok(Value::Bool(false))
                }
            }
            Code::OrElse(lhs, rhs) => {
                if lhs.eval(env, ctx)?.as_bool()? {
                    Ok(Value::Bool(true))
                } else {
                    rhs.eval(env, ctx)
                }
            }
            Code::Case { scrutinee, rules } => {
                let value = scrutinee.eval(env, ctx)?;
                for (pat, body) in rules.iter() {
                    if let Some(rule_env) = match_pat(pat, &value, env.clone()) {
                        return body.eval(&rule_env, ctx);
                    }
                }
                Err(EvalError::NonexhaustiveMatch)
            }
            Code::Record { labels, codes } => {
                let values = codes
                    .iter()
                    .map(|c| c.eval(env, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Record {
                    labels: labels.clone(),
                    values,
                })
            }
            Code::ListOf(codes) => {
                let values = codes
                    .iter()
                    .map(|c| c.eval(env, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            Code::Arith { op, mode, lhs, rhs } => {
                let lhs = lhs.eval(env, ctx)?;
                let rhs = rhs.eval(env, ctx)?;
                eval_arith(*op, *mode, &lhs, &rhs)
            }
            Code::Negate { mode, arg } => {
                let arg = arg.eval(env, ctx)?;
                match mode {
                    NumMode::Int => arg
                        .as_int()?
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or(EvalError::Overflow),
                    NumMode::Real => Ok(Value::Real(-arg.as_real()?)),
                }
            }
            Code::Compare { op, lhs, rhs } => {
                let lhs = lhs.eval(env, ctx)?;
                let rhs = rhs.eval(env, ctx)?;
                let result = match op {
                    CompareOp::Eq => lhs.equals(&rhs)?,
                    CompareOp::Ne => !lhs.equals(&rhs)?,
                    CompareOp::Lt => lhs.compare(&rhs)? == Ordering::Less,
                    CompareOp::Le => lhs.compare(&rhs)? != Ordering::Greater,
                    CompareOp::Gt => lhs.compare(&rhs)? == Ordering::Greater,
                    CompareOp::Ge => lhs.compare(&rhs)? != Ordering::Less,
                };
                Ok(Value::Bool(result))
            }
            Code::StrConcat(lhs, rhs) => {
                let mut s = lhs.eval(env, ctx)?.as_str()?.to_string();
                s.push_str(rhs.eval(env, ctx)?.as_str()?);
                Ok(Value::Str(s))
            }
            Code::ConsOp { head, tail } => {
                let head = head.eval(env, ctx)?;
                let tail = tail.eval(env, ctx)?.into_list()?;
                let mut items = Vec::with_capacity(tail.len() + 1);
                items.push(head);
                items.extend(tail);
                Ok(Value::List(items))
            }
            Code::From(from) => eval_from(from, env, ctx),
        }
    }
}

/// Evaluate one `val … and …` group. Right-hand sides see the environment
/// before the group plus the group's own recursive names; patterns then bind
/// into the result environment. Returns the extended environment and the
/// bound names in order.
pub fn eval_let_group(
    group: &LetGroup,
    env: &EvalEnv,
    ctx: &mut EvalContext,
) -> Result<(EvalEnv, Vec<(String, Value)>), EvalError> {
    let mut rhs_env = env.clone();
    for (pat, rec, _) in &group.binds {
        if *rec {
            if let PatKind::Id(name) = &pat.kind {
                rhs_env = rhs_env.bind_rec(name);
            }
        }
    }
    let mut out_env = rhs_env.clone();
    let mut bound = Vec::new();
    for (pat, rec, code) in &group.binds {
        let value = code.eval(&rhs_env, ctx)?;
        if *rec {
            if let PatKind::Id(name) = &pat.kind {
                // Tie the knot: the closure's captured environment now
                // resolves its own name to itself.
                rhs_env.patch(name, value.clone());
                bound.push((name.clone(), value));
                continue;
            }
        }
        let mut names = Vec::new();
        out_env = bind_pat(pat, &value, out_env, &mut names).ok_or(EvalError::Bind)?;
        bound.extend(names);
    }
    Ok((out_env, bound))
}

fn bind_pat(
    pat: &Pat,
    value: &Value,
    env: EvalEnv,
    names: &mut Vec<(String, Value)>,
) -> Option<EvalEnv> {
    let env = match_pat(pat, value, env)?;
    let mut collected = Vec::new();
    collect_names(pat, value, &mut collected);
    names.extend(collected);
    Some(env)
}

fn collect_names(pat: &Pat, value: &Value, out: &mut Vec<(String, Value)>) {
    match (&pat.kind, value) {
        (PatKind::Id(name), v) => out.push((name.clone(), v.clone())),
        (PatKind::Tuple(pats), Value::Record { values, .. }) => {
            for (p, v) in pats.iter().zip(values) {
                collect_names(p, v, out);
            }
        }
        (PatKind::List(pats), Value::List(values)) => {
            for (p, v) in pats.iter().zip(values) {
                collect_names(p, v, out);
            }
        }
        (PatKind::Record { fields, .. }, Value::Record { values, .. }) => {
            for (_, slot, p) in fields {
                if let Some(v) = values.get(*slot) {
                    collect_names(p, v, out);
                }
            }
        }
        (PatKind::Con { arg: Some(p), .. }, Value::Data(_, Some(v))) => collect_names(p, v, out),
        (PatKind::Cons(head, tail), Value::List(values)) => {
            if let Some((h, t)) = values.split_first() {
                collect_names(head, h, out);
                collect_names(tail, &Value::List(t.to_vec()), out);
            }
        }
        (PatKind::Layered(name, p), v) => {
            out.push((name.clone(), v.clone()));
            collect_names(p, v, out);
        }
        _ => {}
    }
}

/// Match a pattern against a value. Success yields the environment extended
/// with the pattern's bindings; failure is local and leaves no trace.
pub fn match_pat(pat: &Pat, value: &Value, env: EvalEnv) -> Option<EvalEnv> {
    match (&pat.kind, value) {
        (PatKind::Wildcard, _) => Some(env),
        (PatKind::Id(name), v) => Some(env.bind(name, v.clone())),
        (PatKind::Literal(lit), v) => {
            if literal_matches(lit, v) {
                Some(env)
            } else {
                None
            }
        }
        (PatKind::Tuple(pats), Value::Record { values, .. }) => {
            if pats.len() != values.len() {
                return None;
            }
            let mut env = env;
            for (p, v) in pats.iter().zip(values) {
                env = match_pat(p, v, env)?;
            }
            Some(env)
        }
        (PatKind::List(pats), Value::List(values)) => {
            if pats.len() != values.len() {
                return None;
            }
            let mut env = env;
            for (p, v) in pats.iter().zip(values) {
                env = match_pat(p, v, env)?;
            }
            Some(env)
        }
        (PatKind::Record { fields, .. }, Value::Record { values, .. }) => {
            let mut env = env;
            for (_, slot, p) in fields {
                let v = values.get(*slot)?;
                env = match_pat(p, v, env)?;
            }
            Some(env)
        }
        (PatKind::Con { name, arg }, Value::Data(con_name, payload)) => {
            if name != con_name {
                return None;
            }
            match (arg, payload) {
                (None, None) => Some(env),
                (Some(p), Some(v)) => match_pat(p, v, env),
                _ => None,
            }
        }
        (PatKind::Cons(head, tail), Value::List(values)) => {
            let (h, t) = values.split_first()?;
            let env = match_pat(head, h, env)?;
            match_pat(tail, &Value::List(t.to_vec()), env)
        }
        (PatKind::Layered(name, inner), v) => {
            let env = env.bind(name, v.clone());
            match_pat(inner, v, env)
        }
        _ => None,
    }
}

fn literal_matches(lit: &Literal, value: &Value) -> bool {
    match (lit, value) {
        (Literal::Int(a), Value::Int(b)) => {
            use num_traits::ToPrimitive;
            a.to_i64().map(|a| a == *b).unwrap_or(false)
        }
        (Literal::Real(a), Value::Real(b)) => a == b,
        (Literal::Str(a), Value::Str(b)) => a == b,
        (Literal::Char(a), Value::Char(b)) => a == b,
        (Literal::Bool(a), Value::Bool(b)) => a == b,
        (Literal::Unit, Value::Unit) => true,
        _ => false,
    }
}

/// Apply a function value: user closures match their parameter rules,
/// constructors tag, selectors project, built-ins collect arguments until
/// saturated.
pub fn apply_value(func: Value, arg: Value, ctx: &mut EvalContext) -> Result<Value, EvalError> {
    match func {
        Value::Closure(closure) => {
            for (pat, body) in closure.rules.iter() {
                if let Some(env) = match_pat(pat, &arg, closure.env.clone()) {
                    return body.eval(&env, ctx);
                }
            }
            Err(EvalError::NonexhaustiveMatch)
        }
        Value::Ctor(name) => Ok(Value::Data(name, Some(Box::new(arg)))),
        Value::Selector(slot) => match arg {
            Value::Record { values, .. } => values
                .get(slot)
                .cloned()
                .ok_or(EvalError::Subscript),
            other => Err(EvalError::Internal(format!(
                "selector applied to {}",
                other.describe()
            ))),
        },
        Value::Builtin(name, mut args) => {
            args.push(arg);
            if args.len() >= builtins::arity(&name) {
                builtins::exec(&name, args, ctx)
            } else {
                Ok(Value::Builtin(name, args))
            }
        }
        other => Err(EvalError::Internal(format!(
            "apply of non-function value {}",
            other.describe()
        ))),
    }
}

fn eval_arith(op: ArithOp, mode: NumMode, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match mode {
        NumMode::Int => {
            let a = lhs.as_int()?;
            let b = rhs.as_int()?;
            let result = match op {
                ArithOp::Plus => a.checked_add(b).ok_or(EvalError::Overflow)?,
                ArithOp::Minus => a.checked_sub(b).ok_or(EvalError::Overflow)?,
                ArithOp::Times => a.checked_mul(b).ok_or(EvalError::Overflow)?,
                ArithOp::Divide | ArithOp::Div => {
                    if b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    div_floor(a, b)
                }
                ArithOp::Mod => {
                    if b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    mod_floor(a, b)
                }
            };
            Ok(Value::Int(result))
        }
        NumMode::Real => {
            let a = lhs.as_real()?;
            let b = rhs.as_real()?;
            let result = match op {
                ArithOp::Plus => a + b,
                ArithOp::Minus => a - b,
                ArithOp::Times => a * b,
                ArithOp::Divide => a / b,
                ArithOp::Div => (a / b).floor(),
                ArithOp::Mod => a - b * (a / b).floor(),
            };
            Ok(Value::Real(result))
        }
    }
}

/// ML `div` rounds toward negative infinity.
pub fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// ML `mod` takes the sign of the divisor.
pub fn mod_floor(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

// ── Queries ──

fn eval_from(from: &FromCode, env: &EvalEnv, ctx: &mut EvalContext) -> Result<Value, EvalError> {
    let mut rows: Vec<EvalEnv> = Vec::new();
    walk_sources(from, 0, env.clone(), ctx, &mut rows)?;

    if from.group.is_empty() {
        let mut out = Vec::new();
        for row in &rows {
            out.push(row_value(&from.sources, &from.yield_code, row, ctx)?);
        }
        return Ok(Value::List(out));
    }

    // Group rows by their evaluated key record, first appearance first.
    let mut groups: Vec<(Vec<Value>, Vec<EvalEnv>)> = Vec::new();
    for row in rows {
        let mut key = Vec::new();
        for (_, code) in &from.group {
            key.push(code.eval(&row, ctx)?);
        }
        let mut found = false;
        for (existing, members) in &mut groups {
            if keys_equal(existing, &key)? {
                members.push(row.clone());
                found = true;
                break;
            }
        }
        if !found {
            groups.push((key, vec![row]));
        }
    }

    let mut labels: Vec<String> = from.group.iter().map(|(l, _)| l.clone()).collect();
    labels.extend(from.compute.iter().map(|(l, _, _)| l.clone()));
    let mut out = Vec::new();
    for (key, members) in groups {
        let mut group_env = env.clone();
        for ((label, _), value) in from.group.iter().zip(&key) {
            group_env = group_env.bind(label, value.clone());
        }
        for (label, agg_code, arg_code) in &from.compute {
            let agg = agg_code.eval(env, ctx)?;
            let mut args = Vec::new();
            for member in &members {
                args.push(arg_code.eval(member, ctx)?);
            }
            let value = apply_value(agg, Value::List(args), ctx)?;
            group_env = group_env.bind(label, value);
        }
        let value = match &from.yield_code {
            Some(code) => code.eval(&group_env, ctx)?,
            None => record_of(&labels, &group_env)?,
        };
        out.push(value);
    }
    Ok(Value::List(out))
}

fn walk_sources(
    from: &FromCode,
    index: usize,
    env: EvalEnv,
    ctx: &mut EvalContext,
    rows: &mut Vec<EvalEnv>,
) -> Result<(), EvalError> {
    if index == from.sources.len() {
        if let Some(filter) = &from.filter {
            if !filter.eval(&env, ctx)?.as_bool()? {
                return Ok(());
            }
        }
        rows.push(env);
        return Ok(());
    }
    let (name, code) = &from.sources[index];
    let items = code.eval(&env, ctx)?.into_list()?;
    for item in items {
        walk_sources(from, index + 1, env.bind(name, item), ctx, rows)?;
    }
    Ok(())
}

fn row_value(
    sources: &[(String, Code)],
    yield_code: &Option<Code>,
    row: &EvalEnv,
    ctx: &mut EvalContext,
) -> Result<Value, EvalError> {
    match yield_code {
        Some(code) => code.eval(row, ctx),
        None => {
            let labels: Vec<String> = sources.iter().map(|(n, _)| n.clone()).collect();
            record_of(&labels, row)
        }
    }
}

/// The default projection: the sole binding's value, or the record of all
/// bindings in label order.
fn record_of(labels: &[String], env: &EvalEnv) -> Result<Value, EvalError> {
    let lookup = |name: &String| {
        env.lookup(name)
            .ok_or_else(|| EvalError::Internal(format!("unbound row variable {}", name)))
    };
    if labels.len() == 1 {
        return lookup(&labels[0]);
    }
    let mut sorted: Vec<String> = labels.to_vec();
    sorted.sort_by(|a, b| morel_compiler::ast::label_cmp(a, b));
    let values = sorted
        .iter()
        .map(lookup)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Record {
        labels: Rc::new(sorted),
        values,
    })
}

fn keys_equal(a: &[Value], b: &[Value]) -> Result<bool, EvalError> {
    for (x, y) in a.iter().zip(b) {
        if !x.equals(y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_and_mod_floor_toward_negative_infinity() {
        assert_eq!(div_floor(20, 3), 6);
        assert_eq!(div_floor(20, -3), -7);
        assert_eq!(div_floor(-10, 3), -4);
        assert_eq!(mod_floor(-10, 3), 2);
        assert_eq!(mod_floor(10, -3), -2);
        assert_eq!(mod_floor(10, 3), 1);
    }
}
