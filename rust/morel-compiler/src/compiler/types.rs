//! Internal types: primitives, type variables, constructors, and schemes.

use crate::compiler::ast::label_cmp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use strum_macros::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum PrimType {
    Bool,
    Char,
    Int,
    Real,
    String,
    Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Prim(PrimType),
    /// A type variable. During inference the ordinal is a unification
    /// variable; in a scheme it is a bound variable below the scheme's count.
    Var(u32),
    Fn(Box<Type>, Box<Type>),
    /// Two or more components.
    Tuple(Vec<Type>),
    List(Box<Type>),
    /// Fields in label order.
    Record(Vec<(String, Type)>),
    /// A datatype or an application of a parameterized type constructor.
    Data { name: String, args: Vec<Type> },
}

impl Type {
    pub const BOOL: Type = Type::Prim(PrimType::Bool);
    pub const CHAR: Type = Type::Prim(PrimType::Char);
    pub const INT: Type = Type::Prim(PrimType::Int);
    pub const REAL: Type = Type::Prim(PrimType::Real);
    pub const STRING: Type = Type::Prim(PrimType::String);
    pub const UNIT: Type = Type::Prim(PrimType::Unit);

    pub fn func(dom: Type, cod: Type) -> Type {
        Type::Fn(Box::new(dom), Box::new(cod))
    }

    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn record(mut fields: Vec<(String, Type)>) -> Type {
        fields.sort_by(|a, b| label_cmp(&a.0, &b.0));
        Type::Record(fields)
    }

    pub fn data(name: &str, args: Vec<Type>) -> Type {
        Type::Data {
            name: name.to_string(),
            args,
        }
    }

    /// Rewrite every variable through `f`.
    pub fn map_vars(&self, f: &impl Fn(u32) -> Type) -> Type {
        match self {
            Type::Prim(p) => Type::Prim(*p),
            Type::Var(v) => f(*v),
            Type::Fn(dom, cod) => Type::func(dom.map_vars(f), cod.map_vars(f)),
            Type::Tuple(items) => Type::Tuple(items.iter().map(|t| t.map_vars(f)).collect()),
            Type::List(elem) => Type::list(elem.map_vars(f)),
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(l, t)| (l.clone(), t.map_vars(f)))
                    .collect(),
            ),
            Type::Data { name, args } => Type::Data {
                name: name.clone(),
                args: args.iter().map(|t| t.map_vars(f)).collect(),
            },
        }
    }

    /// Variables in first-appearance order, deduplicated.
    pub fn collect_vars(&self, out: &mut Vec<u32>) {
        match self {
            Type::Prim(_) => {}
            Type::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Type::Fn(dom, cod) => {
                dom.collect_vars(out);
                cod.collect_vars(out);
            }
            Type::Tuple(items) => {
                for t in items {
                    t.collect_vars(out);
                }
            }
            Type::List(elem) => elem.collect_vars(out),
            Type::Record(fields) => {
                for (_, t) in fields {
                    t.collect_vars(out);
                }
            }
            Type::Data { args, .. } => {
                for t in args {
                    t.collect_vars(out);
                }
            }
        }
    }

    /// Labels of the fields a selector can address, in label order. Tuples
    /// expose ordinal labels; every other type exposes nothing.
    pub fn field_labels(&self) -> Option<Vec<String>> {
        match self {
            Type::Record(fields) => Some(fields.iter().map(|(l, _)| l.clone()).collect()),
            Type::Tuple(items) => Some((1..=items.len()).map(|i| i.to_string()).collect()),
            _ => None,
        }
    }

    fn unparse(&self, f: &mut fmt::Formatter<'_>, names: &HashMap<u32, String>, min_prec: u8) -> fmt::Result {
        // Levels: -> is 1 (right-assoc), * is 2, application/atom 3.
        let prec = match self {
            Type::Fn(..) => 1,
            Type::Tuple(..) => 2,
            _ => 3,
        };
        let parens = prec < min_prec;
        if parens {
            write!(f, "(")?;
        }
        match self {
            Type::Prim(p) => write!(f, "{}", p)?,
            Type::Var(v) => write!(f, "'{}", names.get(v).map(String::as_str).unwrap_or("?"))?,
            Type::Fn(dom, cod) => {
                dom.unparse(f, names, 2)?;
                write!(f, " -> ")?;
                cod.unparse(f, names, 1)?;
            }
            Type::Tuple(items) => {
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    t.unparse(f, names, 3)?;
                }
            }
            Type::List(elem) => {
                elem.unparse(f, names, 3)?;
                write!(f, " list")?;
            }
            Type::Record(fields) => {
                write!(f, "{{")?;
                for (i, (label, t)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:", label)?;
                    t.unparse(f, names, 0)?;
                }
                write!(f, "}}")?;
            }
            Type::Data { name, args } => match args.len() {
                0 => write!(f, "{}", name)?,
                1 => {
                    args[0].unparse(f, names, 3)?;
                    write!(f, " {}", name)?;
                }
                _ => {
                    write!(f, "(")?;
                    for (i, t) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        t.unparse(f, names, 0)?;
                    }
                    write!(f, ") {}", name)?;
                }
            },
        }
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Names `'a`, `'b`, …, `'z`, `'t26`, … assigned by first appearance.
fn var_names(vars: &[u32]) -> HashMap<u32, String> {
    vars.iter()
        .enumerate()
        .map(|(i, &v)| {
            let name = if i < 26 {
                ((b'a' + i as u8) as char).to_string()
            } else {
                format!("t{}", i)
            };
            (v, name)
        })
        .collect()
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        self.unparse(f, &var_names(&vars), 0)
    }
}

/// A type with universally quantified variables `0 .. vars`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub vars: u32,
    pub ty: Type,
}

impl Scheme {
    pub fn mono(ty: Type) -> Scheme {
        Scheme { vars: 0, ty }
    }

    pub fn poly(vars: u32, ty: Type) -> Scheme {
        Scheme { vars, ty }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}

// ── Datatype definitions ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConDef {
    pub name: String,
    /// Argument type mentioning `Var(0) .. Var(arity)`; `None` for nullary.
    pub arg: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDef {
    pub name: String,
    pub arity: usize,
    pub cons: Vec<ConDef>,
}

impl DataDef {
    pub fn con(&self, name: &str) -> Option<&ConDef> {
        self.cons.iter().find(|c| c.name == name)
    }

    /// The type this datatype denotes, applied to its own parameters.
    pub fn self_type(&self) -> Type {
        Type::Data {
            name: self.name.clone(),
            args: (0..self.arity as u32).map(Type::Var).collect(),
        }
    }
}

/// Registry entry for a named type constructor. `Temporary` is the sentinel
/// installed while a `datatype` is being elaborated, so constructors of
/// self-referential types can mention the type before it is finalized; it is
/// replaced by `Data` before inference returns.
#[derive(Debug, Clone)]
pub enum TyCon {
    Data(Rc<DataDef>),
    Temporary { arity: usize },
}

impl TyCon {
    pub fn arity(&self) -> usize {
        match self {
            TyCon::Data(def) => def.arity,
            TyCon::Temporary { arity } => *arity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_function_and_tuple() {
        let ty = Type::func(Type::INT, Type::func(Type::INT, Type::INT));
        assert_eq!(ty.to_string(), "int -> int -> int");
        let ty = Type::func(Type::func(Type::INT, Type::INT), Type::INT);
        assert_eq!(ty.to_string(), "(int -> int) -> int");
        let ty = Type::Tuple(vec![Type::INT, Type::BOOL]);
        assert_eq!(ty.to_string(), "int * bool");
        let ty = Type::func(Type::Tuple(vec![Type::INT, Type::INT]), Type::INT);
        assert_eq!(ty.to_string(), "int * int -> int");
    }

    #[test]
    fn display_vars_in_appearance_order() {
        let ty = Type::func(
            Type::func(Type::Var(7), Type::Var(3)),
            Type::func(Type::list(Type::Var(7)), Type::list(Type::Var(3))),
        );
        assert_eq!(ty.to_string(), "('a -> 'b) -> 'a list -> 'b list");
    }

    #[test]
    fn display_record_and_data() {
        let ty = Type::record(vec![
            ("b".to_string(), Type::BOOL),
            ("a".to_string(), Type::INT),
        ]);
        assert_eq!(ty.to_string(), "{a:int, b:bool}");
        let ty = Type::data("option", vec![Type::INT]);
        assert_eq!(ty.to_string(), "int option");
    }

    #[test]
    fn tuple_type_in_list_needs_parens() {
        let ty = Type::list(Type::Tuple(vec![Type::INT, Type::BOOL]));
        assert_eq!(ty.to_string(), "(int * bool) list");
    }
}
