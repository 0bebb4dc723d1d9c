//! Implementations of the built-in environment.
//!
//! Each built-in is identified by its qualified name; top-level aliases are
//! folded onto the qualified implementation. `arity` is the number of
//! curried arguments a built-in collects before it runs — tupled built-ins
//! take one.

use crate::code::{apply_value, div_floor, mod_floor, EvalContext};
use crate::value::{EvalError, Value};
use std::cmp::Ordering;

/// Top-level aliases share the qualified implementation.
fn canonical(name: &str) -> &str {
    match name {
        "ignore" => "General.ignore",
        "o" => "General.o",
        "@" => "List.append",
        "map" => "List.map",
        "count" => "Relational.count",
        "exists" => "Relational.exists",
        "notExists" => "Relational.notExists",
        "empty" => "Relational.empty",
        "sum" => "Relational.sum",
        "max" => "Relational.max",
        "min" => "Relational.min",
        "only" => "Relational.only",
        "onlyOrNone" => "Relational.onlyOrNone",
        other => other,
    }
}

/// Curried argument count before the implementation runs.
pub fn arity(name: &str) -> usize {
    match canonical(name) {
        "List.map" | "List.mapPartial" | "List.app" | "List.filter" | "List.partition"
        | "List.find" | "List.exists" | "List.all" | "List.collate" | "Option.map"
        | "Option.filter" | "Option.app" | "Option.mapPartial" | "Option.compose"
        | "Option.composePartial" | "General.o" | "String.concatWith" | "String.map"
        | "String.translate" | "String.isPrefix" | "String.isSuffix" | "String.isSubstring"
        | "Char.contains" | "Char.notContains" | "Vector.app" | "Vector.map" | "Vector.all"
        | "Vector.exists" | "Vector.find" | "Vector.collate" | "Bag.app" | "Bag.map"
        | "Bag.filter" => 2,
        "List.foldl" | "List.foldr" | "Vector.foldl" | "Vector.foldr" | "Bag.fold" => 3,
        _ => 1,
    }
}

/// Constant (non-function) built-ins, bound directly as values.
pub fn constant_value(name: &str) -> Option<Value> {
    Some(match name {
        "nil" => Value::List(Vec::new()),
        "String.maxSize" => Value::Int(i64::MAX),
        "Char.minChar" => Value::Char('\u{0}'),
        "Char.maxChar" => Value::Char('\u{ff}'),
        "Math.e" => Value::Real(std::f64::consts::E),
        "Math.pi" => Value::Real(std::f64::consts::PI),
        _ => return None,
    })
}

pub fn exec(name: &str, mut args: Vec<Value>, ctx: &mut EvalContext) -> Result<Value, EvalError> {
    let name = canonical(name);
    match name {
        // ── General ──
        "not" => Ok(Value::Bool(!args[0].as_bool()?)),
        "abs" | "Int.abs" => {
            let n = args[0].as_int()?;
            n.checked_abs().map(Value::Int).ok_or(EvalError::Overflow)
        }
        "General.ignore" => Ok(Value::Unit),
        "General.o" => {
            let x = args.pop().ok_or(EvalError::Internal("o".to_string()))?;
            let (f, g) = pair(&args[0])?;
            let gx = apply_value(g, x, ctx)?;
            apply_value(f, gx, ctx)
        }
        "union" => {
            let (a, b) = pair(&args[0])?;
            let mut items = a.into_list()?;
            items.extend(b.into_list()?);
            Ok(Value::List(items))
        }
        "except" => {
            let (a, b) = pair(&args[0])?;
            let mut remove = b.into_list()?;
            let mut out = Vec::new();
            'next: for item in a.into_list()? {
                for i in 0..remove.len() {
                    if item.equals(&remove[i])? {
                        remove.remove(i);
                        continue 'next;
                    }
                }
                out.push(item);
            }
            Ok(Value::List(out))
        }
        "intersect" => {
            let (a, b) = pair(&args[0])?;
            let mut keep = b.into_list()?;
            let mut out = Vec::new();
            'next2: for item in a.into_list()? {
                for i in 0..keep.len() {
                    if item.equals(&keep[i])? {
                        keep.remove(i);
                        out.push(item);
                        continue 'next2;
                    }
                }
            }
            Ok(Value::List(out))
        }

        // ── List ──
        "List.null" => Ok(Value::Bool(args[0].as_list()?.is_empty())),
        "List.length" => Ok(Value::Int(args[0].as_list()?.len() as i64)),
        "List.hd" => args[0]
            .as_list()?
            .first()
            .cloned()
            .ok_or(EvalError::Empty),
        "List.tl" => {
            let items = args[0].as_list()?;
            if items.is_empty() {
                return Err(EvalError::Empty);
            }
            Ok(Value::List(items[1..].to_vec()))
        }
        "List.last" => args[0].as_list()?.last().cloned().ok_or(EvalError::Empty),
        "List.rev" => {
            let mut items = args.remove(0).into_list()?;
            items.reverse();
            Ok(Value::List(items))
        }
        "List.append" => {
            let (a, b) = pair(&args[0])?;
            let mut items = a.into_list()?;
            items.extend(b.into_list()?);
            Ok(Value::List(items))
        }
        "List.revAppend" => {
            let (a, b) = pair(&args[0])?;
            let mut items = a.into_list()?;
            items.reverse();
            items.extend(b.into_list()?);
            Ok(Value::List(items))
        }
        "List.concat" | "Vector.concat" => {
            let mut out = Vec::new();
            for inner in args.remove(0).into_list()? {
                out.extend(inner.into_list()?);
            }
            Ok(Value::List(out))
        }
        "List.take" => {
            let (list, n) = pair(&args[0])?;
            let items = list.into_list()?;
            let n = usize_index(n.as_int()?, items.len() + 1)?;
            Ok(Value::List(items[..n].to_vec()))
        }
        "List.drop" => {
            let (list, n) = pair(&args[0])?;
            let items = list.into_list()?;
            let n = usize_index(n.as_int()?, items.len() + 1)?;
            Ok(Value::List(items[n..].to_vec()))
        }
        "List.nth" => {
            let (list, n) = pair(&args[0])?;
            let items = list.into_list()?;
            let n = usize_index(n.as_int()?, items.len())?;
            Ok(items[n].clone())
        }
        "List.getItem" => {
            let items = args.remove(0).into_list()?;
            Ok(match items.split_first() {
                Some((head, tail)) => Value::option(Some(Value::tuple(vec![
                    head.clone(),
                    Value::List(tail.to_vec()),
                ]))),
                None => Value::option(None),
            })
        }
        "List.map" | "Bag.map" | "Vector.map" => {
            let f = args.remove(0);
            let items = args.remove(0).into_list()?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(apply_value(f.clone(), item, ctx)?);
            }
            Ok(Value::List(out))
        }
        "List.mapPartial" => {
            let f = args.remove(0);
            let items = args.remove(0).into_list()?;
            let mut out = Vec::new();
            for item in items {
                if let Value::Data(con, payload) = apply_value(f.clone(), item, ctx)? {
                    if con == "SOME" {
                        if let Some(v) = payload {
                            out.push(*v);
                        }
                    }
                }
            }
            Ok(Value::List(out))
        }
        "List.app" | "Bag.app" | "Vector.app" => {
            let f = args.remove(0);
            for item in args.remove(0).into_list()? {
                apply_value(f.clone(), item, ctx)?;
            }
            Ok(Value::Unit)
        }
        "List.filter" | "Bag.filter" => {
            let f = args.remove(0);
            let items = args.remove(0).into_list()?;
            let mut out = Vec::new();
            for item in items {
                if apply_value(f.clone(), item.clone(), ctx)?.as_bool()? {
                    out.push(item);
                }
            }
            Ok(Value::List(out))
        }
        "List.partition" => {
            let f = args.remove(0);
            let items = args.remove(0).into_list()?;
            let mut yes = Vec::new();
            let mut no = Vec::new();
            for item in items {
                if apply_value(f.clone(), item.clone(), ctx)?.as_bool()? {
                    yes.push(item);
                } else {
                    no.push(item);
                }
            }
            Ok(Value::tuple(vec![Value::List(yes), Value::List(no)]))
        }
        "List.find" | "Vector.find" => {
            let f = args.remove(0);
            for item in args.remove(0).into_list()? {
                if apply_value(f.clone(), item.clone(), ctx)?.as_bool()? {
                    return Ok(Value::option(Some(item)));
                }
            }
            Ok(Value::option(None))
        }
        "List.exists" | "Vector.exists" => {
            let f = args.remove(0);
            for item in args.remove(0).into_list()? {
                if apply_value(f.clone(), item, ctx)?.as_bool()? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "List.all" | "Vector.all" => {
            let f = args.remove(0);
            for item in args.remove(0).into_list()? {
                if !apply_value(f.clone(), item, ctx)?.as_bool()? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        "List.foldl" | "Bag.fold" | "Vector.foldl" => {
            let f = args.remove(0);
            let mut acc = args.remove(0);
            for item in args.remove(0).into_list()? {
                acc = apply_value(f.clone(), Value::tuple(vec![item, acc]), ctx)?;
            }
            Ok(acc)
        }
        "List.foldr" | "Vector.foldr" => {
            let f = args.remove(0);
            let mut acc = args.remove(0);
            let mut items = args.remove(0).into_list()?;
            items.reverse();
            for item in items {
                acc = apply_value(f.clone(), Value::tuple(vec![item, acc]), ctx)?;
            }
            Ok(acc)
        }
        "List.tabulate" | "Vector.tabulate" => {
            let (n, f) = pair(&args[0])?;
            let n = n.as_int()?;
            if n < 0 {
                return Err(EvalError::SizeError);
            }
            let mut out = Vec::with_capacity(n as usize);
            for i in 0..n {
                out.push(apply_value(f.clone(), Value::Int(i), ctx)?);
            }
            Ok(Value::List(out))
        }
        "List.collate" | "Vector.collate" => {
            let f = args.remove(0);
            let (a, b) = pair(&args[0])?;
            let a = a.into_list()?;
            let b = b.into_list()?;
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = apply_value(f.clone(), Value::tuple(vec![x.clone(), y.clone()]), ctx)?;
                if let Value::Data(con, _) = &ord {
                    if con != "EQUAL" {
                        return Ok(ord);
                    }
                }
            }
            Ok(Value::order(a.len().cmp(&b.len())))
        }

        // ── Option ──
        "Option.isSome" => Ok(Value::Bool(matches!(
            &args[0],
            Value::Data(con, _) if con == "SOME"
        ))),
        "Option.valOf" => match args.remove(0) {
            Value::Data(con, Some(v)) if con == "SOME" => Ok(*v),
            _ => Err(EvalError::OptionError),
        },
        "Option.getOpt" => {
            let (opt, default) = pair(&args[0])?;
            match opt {
                Value::Data(con, Some(v)) if con == "SOME" => Ok(*v),
                _ => Ok(default),
            }
        }
        "Option.map" => {
            let f = args.remove(0);
            match args.remove(0) {
                Value::Data(con, Some(v)) if con == "SOME" => {
                    Ok(Value::option(Some(apply_value(f, *v, ctx)?)))
                }
                _ => Ok(Value::option(None)),
            }
        }
        "Option.join" => match args.remove(0) {
            Value::Data(con, Some(v)) if con == "SOME" => Ok(*v),
            _ => Ok(Value::option(None)),
        },
        "Option.filter" => {
            let f = args.remove(0);
            let v = args.remove(0);
            if apply_value(f, v.clone(), ctx)?.as_bool()? {
                Ok(Value::option(Some(v)))
            } else {
                Ok(Value::option(None))
            }
        }
        "Option.app" => {
            let f = args.remove(0);
            if let Value::Data(con, Some(v)) = args.remove(0) {
                if con == "SOME" {
                    apply_value(f, *v, ctx)?;
                }
            }
            Ok(Value::Unit)
        }
        "Option.mapPartial" => {
            let f = args.remove(0);
            match args.remove(0) {
                Value::Data(con, Some(v)) if con == "SOME" => apply_value(f, *v, ctx),
                _ => Ok(Value::option(None)),
            }
        }
        "Option.compose" => {
            let x = args.pop().ok_or(EvalError::Internal("compose".to_string()))?;
            let (f, g) = pair(&args[0])?;
            match apply_value(g, x, ctx)? {
                Value::Data(con, Some(v)) if con == "SOME" => {
                    Ok(Value::option(Some(apply_value(f, *v, ctx)?)))
                }
                _ => Ok(Value::option(None)),
            }
        }
        "Option.composePartial" => {
            let x = args.pop().ok_or(EvalError::Internal("composePartial".to_string()))?;
            let (f, g) = pair(&args[0])?;
            match apply_value(g, x, ctx)? {
                Value::Data(con, Some(v)) if con == "SOME" => apply_value(f, *v, ctx),
                _ => Ok(Value::option(None)),
            }
        }

        // ── String ──
        "String.size" => Ok(Value::Int(args[0].as_str()?.chars().count() as i64)),
        "String.sub" => {
            let (s, i) = pair(&args[0])?;
            let s = s.as_str()?.to_string();
            let i = usize_index(i.as_int()?, s.chars().count())?;
            Ok(Value::Char(s.chars().nth(i).ok_or(EvalError::Subscript)?))
        }
        "String.substring" => {
            let items = fields(&args[0], 3)?;
            let s: Vec<char> = items[0].as_str()?.chars().collect();
            let i = items[1].as_int()?;
            let n = items[2].as_int()?;
            if i < 0 || n < 0 || (i + n) as usize > s.len() {
                return Err(EvalError::Subscript);
            }
            Ok(Value::Str(s[i as usize..(i + n) as usize].iter().collect()))
        }
        "String.extract" => {
            let items = fields(&args[0], 3)?;
            let s: Vec<char> = items[0].as_str()?.chars().collect();
            let i = items[1].as_int()?;
            if i < 0 || i as usize > s.len() {
                return Err(EvalError::Subscript);
            }
            match &items[2] {
                Value::Data(con, Some(n)) if con == "SOME" => {
                    let n = n.as_int()?;
                    if n < 0 || (i + n) as usize > s.len() {
                        return Err(EvalError::Subscript);
                    }
                    Ok(Value::Str(s[i as usize..(i + n) as usize].iter().collect()))
                }
                _ => Ok(Value::Str(s[i as usize..].iter().collect())),
            }
        }
        "String.concat" => {
            let mut out = String::new();
            for item in args.remove(0).into_list()? {
                out.push_str(item.as_str()?);
            }
            Ok(Value::Str(out))
        }
        "String.concatWith" => {
            let sep = args.remove(0).as_str()?.to_string();
            let parts = args
                .remove(0)
                .into_list()?
                .into_iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Str(parts.join(&sep)))
        }
        "String.str" => Ok(Value::Str(args[0].as_char()?.to_string())),
        "String.implode" => {
            let mut out = String::new();
            for item in args.remove(0).into_list()? {
                out.push(item.as_char()?);
            }
            Ok(Value::Str(out))
        }
        "String.explode" => Ok(Value::List(
            args[0].as_str()?.chars().map(Value::Char).collect(),
        )),
        "String.map" => {
            let f = args.remove(0);
            let mut out = String::new();
            for c in args.remove(0).as_str()?.chars() {
                out.push(apply_value(f.clone(), Value::Char(c), ctx)?.as_char()?);
            }
            Ok(Value::Str(out))
        }
        "String.translate" => {
            let f = args.remove(0);
            let mut out = String::new();
            for c in args.remove(0).as_str()?.chars() {
                out.push_str(apply_value(f.clone(), Value::Char(c), ctx)?.as_str()?);
            }
            Ok(Value::Str(out))
        }
        "String.isPrefix" => Ok(Value::Bool(
            args[1].as_str()?.starts_with(args[0].as_str()?),
        )),
        "String.isSuffix" => Ok(Value::Bool(args[1].as_str()?.ends_with(args[0].as_str()?))),
        "String.isSubstring" => Ok(Value::Bool(args[1].as_str()?.contains(args[0].as_str()?))),

        // ── Char ──
        "Char.chr" => {
            let n = args[0].as_int()?;
            if !(0..=255).contains(&n) {
                return Err(EvalError::ChrOutOfRange);
            }
            Ok(Value::Char(n as u8 as char))
        }
        "Char.ord" => Ok(Value::Int(args[0].as_char()? as i64)),
        "Char.succ" => {
            let c = args[0].as_char()? as i64 + 1;
            if c > 255 {
                return Err(EvalError::ChrOutOfRange);
            }
            Ok(Value::Char(c as u8 as char))
        }
        "Char.pred" => {
            let c = args[0].as_char()? as i64 - 1;
            if c < 0 {
                return Err(EvalError::ChrOutOfRange);
            }
            Ok(Value::Char(c as u8 as char))
        }
        "Char.isDigit" => Ok(Value::Bool(args[0].as_char()?.is_ascii_digit())),
        "Char.isAlpha" => Ok(Value::Bool(args[0].as_char()?.is_ascii_alphabetic())),
        "Char.isAlphaNum" => Ok(Value::Bool(args[0].as_char()?.is_ascii_alphanumeric())),
        "Char.isSpace" => Ok(Value::Bool(args[0].as_char()?.is_ascii_whitespace())),
        "Char.isLower" => Ok(Value::Bool(args[0].as_char()?.is_ascii_lowercase())),
        "Char.isUpper" => Ok(Value::Bool(args[0].as_char()?.is_ascii_uppercase())),
        "Char.toLower" => Ok(Value::Char(args[0].as_char()?.to_ascii_lowercase())),
        "Char.toUpper" => Ok(Value::Char(args[0].as_char()?.to_ascii_uppercase())),
        "Char.contains" => Ok(Value::Bool(
            args[0].as_str()?.contains(args[1].as_char()?),
        )),
        "Char.notContains" => Ok(Value::Bool(
            !args[0].as_str()?.contains(args[1].as_char()?),
        )),

        // ── Math ──
        "Math.acos" => Ok(Value::Real(args[0].as_real()?.acos())),
        "Math.asin" => Ok(Value::Real(args[0].as_real()?.asin())),
        "Math.atan" => Ok(Value::Real(args[0].as_real()?.atan())),
        "Math.cos" => Ok(Value::Real(args[0].as_real()?.cos())),
        "Math.cosh" => Ok(Value::Real(args[0].as_real()?.cosh())),
        "Math.exp" => Ok(Value::Real(args[0].as_real()?.exp())),
        "Math.ln" => Ok(Value::Real(args[0].as_real()?.ln())),
        "Math.log10" => Ok(Value::Real(args[0].as_real()?.log10())),
        "Math.sin" => Ok(Value::Real(args[0].as_real()?.sin())),
        "Math.sinh" => Ok(Value::Real(args[0].as_real()?.sinh())),
        "Math.sqrt" => Ok(Value::Real(args[0].as_real()?.sqrt())),
        "Math.tan" => Ok(Value::Real(args[0].as_real()?.tan())),
        "Math.tanh" => Ok(Value::Real(args[0].as_real()?.tanh())),
        "Math.atan2" => {
            let (y, x) = pair(&args[0])?;
            Ok(Value::Real(y.as_real()?.atan2(x.as_real()?)))
        }
        "Math.pow" => {
            let (x, y) = pair(&args[0])?;
            Ok(Value::Real(x.as_real()?.powf(y.as_real()?)))
        }

        // ── Real ──
        "Real.abs" => Ok(Value::Real(args[0].as_real()?.abs())),
        "Real.ceil" => real_to_int(args[0].as_real()?.ceil()),
        "Real.floor" => real_to_int(args[0].as_real()?.floor()),
        "Real.round" => real_to_int(args[0].as_real()?.round()),
        "Real.trunc" => real_to_int(args[0].as_real()?.trunc()),
        "Real.fromInt" => Ok(Value::Real(args[0].as_int()? as f64)),
        "Real.toString" => Ok(Value::Str(morel_compiler::ast::format_real(
            args[0].as_real()?,
        ))),
        "Real.compare" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::order(a.compare(&b)?))
        }
        "Real.min" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::Real(a.as_real()?.min(b.as_real()?)))
        }
        "Real.max" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::Real(a.as_real()?.max(b.as_real()?)))
        }

        // ── Int ──
        "Int.compare" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::order(a.as_int()?.cmp(&b.as_int()?)))
        }
        "Int.div" => {
            let (a, b) = pair(&args[0])?;
            let b = b.as_int()?;
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(div_floor(a.as_int()?, b)))
        }
        "Int.mod" => {
            let (a, b) = pair(&args[0])?;
            let b = b.as_int()?;
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(mod_floor(a.as_int()?, b)))
        }
        "Int.rem" => {
            let (a, b) = pair(&args[0])?;
            let b = b.as_int()?;
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(a.as_int()? % b))
        }
        "Int.max" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::Int(a.as_int()?.max(b.as_int()?)))
        }
        "Int.min" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::Int(a.as_int()?.min(b.as_int()?)))
        }
        "Int.sameSign" => {
            let (a, b) = pair(&args[0])?;
            Ok(Value::Bool(a.as_int()?.signum() == b.as_int()?.signum()))
        }
        "Int.sign" => Ok(Value::Int(args[0].as_int()?.signum())),
        "Int.toString" => {
            let n = args[0].as_int()?;
            Ok(Value::Str(if n < 0 {
                format!("~{}", n.unsigned_abs())
            } else {
                n.to_string()
            }))
        }

        // ── Vector / Bag (both evaluate over list values) ──
        "Vector.fromList" | "Bag.fromList" | "Bag.toList" => Ok(args.remove(0)),
        "Vector.length" | "Bag.length" => Ok(Value::Int(args[0].as_list()?.len() as i64)),
        "Vector.sub" => {
            let (v, i) = pair(&args[0])?;
            let items = v.into_list()?;
            let i = usize_index(i.as_int()?, items.len())?;
            Ok(items[i].clone())
        }
        "Bag.null" => Ok(Value::Bool(args[0].as_list()?.is_empty())),

        // ── Relational ──
        "Relational.count" => Ok(Value::Int(args[0].as_list()?.len() as i64)),
        "Relational.exists" => Ok(Value::Bool(!args[0].as_list()?.is_empty())),
        "Relational.notExists" | "Relational.empty" => {
            Ok(Value::Bool(args[0].as_list()?.is_empty()))
        }
        "Relational.sum" => {
            let mut total: i64 = 0;
            for item in args[0].as_list()? {
                total = total
                    .checked_add(item.as_int()?)
                    .ok_or(EvalError::Overflow)?;
            }
            Ok(Value::Int(total))
        }
        "Relational.max" => extremum(args.remove(0), Ordering::Greater),
        "Relational.min" => extremum(args.remove(0), Ordering::Less),
        "Relational.only" => {
            let mut items = args.remove(0).into_list()?;
            match items.len() {
                0 => Err(EvalError::Empty),
                1 => Ok(items.remove(0)),
                _ => Err(EvalError::SizeError),
            }
        }
        "Relational.onlyOrNone" => {
            let mut items = args.remove(0).into_list()?;
            match items.len() {
                0 => Ok(Value::option(None)),
                1 => Ok(Value::option(Some(items.remove(0)))),
                _ => Err(EvalError::SizeError),
            }
        }

        // ── Sys ──
        "Sys.env" => {
            let items = ctx
                .bindings
                .iter()
                .map(|(name, ty)| {
                    Value::tuple(vec![Value::Str(name.clone()), Value::Str(ty.clone())])
                })
                .collect();
            Ok(Value::List(items))
        }
        "Sys.set" => {
            let (name, value) = pair(&args[0])?;
            ctx.props.set(name.as_str()?, &value)?;
            Ok(Value::Unit)
        }
        "Sys.show" => Ok(Value::option(
            ctx.props.show(args[0].as_str()?)?.map(Value::Str),
        )),
        "Sys.unset" => {
            ctx.props.unset(args[0].as_str()?)?;
            Ok(Value::Unit)
        }
        "Sys.showAll" => {
            let items = ctx
                .props
                .show_all()
                .into_iter()
                .map(|(name, value)| Value::tuple(vec![Value::Str(name), Value::Str(value)]))
                .collect();
            Ok(Value::List(items))
        }

        other => Err(EvalError::Internal(format!("no built-in named {}", other))),
    }
}

fn pair(value: &Value) -> Result<(Value, Value), EvalError> {
    match value {
        Value::Record { values, .. } if values.len() == 2 => {
            Ok((values[0].clone(), values[1].clone()))
        }
        other => Err(EvalError::Internal(format!(
            "expected a pair, got {}",
            other.describe()
        ))),
    }
}

fn fields(value: &Value, n: usize) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Record { values, .. } if values.len() == n => Ok(values.clone()),
        other => Err(EvalError::Internal(format!(
            "expected a {}-tuple, got {}",
            n,
            other.describe()
        ))),
    }
}

fn usize_index(i: i64, len: usize) -> Result<usize, EvalError> {
    if i < 0 || i as usize >= len {
        Err(EvalError::Subscript)
    } else {
        Ok(i as usize)
    }
}

fn real_to_int(v: f64) -> Result<Value, EvalError> {
    if v.is_nan() || v.is_infinite() {
        return Err(EvalError::DomainError("not a finite real".to_string()));
    }
    if v < i64::MIN as f64 || v > i64::MAX as f64 {
        return Err(EvalError::Overflow);
    }
    Ok(Value::Int(v as i64))
}

fn extremum(list: Value, keep: Ordering) -> Result<Value, EvalError> {
    let items = list.into_list()?;
    let mut iter = items.into_iter();
    let mut best = iter.next().ok_or(EvalError::Empty)?;
    for item in iter {
        if item.compare(&best)? == keep {
            best = item;
        }
    }
    Ok(best)
}
