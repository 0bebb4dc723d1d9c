//! Runtime values.

use crate::code::Code;
use crate::env::EvalEnv;
use morel_compiler::core;
use std::cmp::Ordering;
use std::rc::Rc;
use thiserror::Error;

/// Runtime failures. Each aborts the current top-level statement; the
/// persistent environment is untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("uncaught exception Match: match nonexhaustive")]
    NonexhaustiveMatch,
    #[error("uncaught exception Bind: binding failed")]
    Bind,
    #[error("uncaught exception Div: division by zero")]
    DivisionByZero,
    #[error("uncaught exception Domain: {0}")]
    DomainError(String),
    #[error("uncaught exception Subscript: subscript out of range")]
    Subscript,
    #[error("uncaught exception Empty: empty list")]
    Empty,
    #[error("uncaught exception Option: option was NONE")]
    OptionError,
    #[error("uncaught exception Size: invalid size")]
    SizeError,
    #[error("uncaught exception Overflow: integer overflow")]
    Overflow,
    #[error("uncaught exception Chr: character code out of range")]
    ChrOutOfRange,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Real(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Unit,
    List(Vec<Value>),
    /// Tuples and records: field values in label order. Tuples carry the
    /// ordinal labels `"1"`, `"2"`, …
    Record {
        labels: Rc<Vec<String>>,
        values: Vec<Value>,
    },
    /// A datatype constructor application.
    Data(String, Option<Box<Value>>),
    /// A unary constructor awaiting its argument.
    Ctor(String),
    /// A record selector used as a function value.
    Selector(usize),
    /// A built-in function with the arguments collected so far.
    Builtin(String, Vec<Value>),
    Closure(Rc<Closure>),
}

#[derive(Debug)]
pub struct Closure {
    pub rules: Rc<Vec<(core::Pat, Code)>>,
    pub env: EvalEnv,
}

impl Value {
    pub fn tuple(values: Vec<Value>) -> Value {
        if values.is_empty() {
            return Value::Unit;
        }
        let labels = (1..=values.len()).map(|i| i.to_string()).collect();
        Value::Record {
            labels: Rc::new(labels),
            values,
        }
    }

    pub fn option(value: Option<Value>) -> Value {
        match value {
            Some(v) => Value::Data("SOME".to_string(), Some(Box::new(v))),
            None => Value::Data("NONE".to_string(), None),
        }
    }

    pub fn order(ordering: Ordering) -> Value {
        let name = match ordering {
            Ordering::Less => "LESS",
            Ordering::Equal => "EQUAL",
            Ordering::Greater => "GREATER",
        };
        Value::Data(name.to_string(), None)
    }

    pub fn as_int(&self) -> Result<i64, EvalError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(Value::bad("int", other)),
        }
    }

    pub fn as_real(&self) -> Result<f64, EvalError> {
        match self {
            Value::Real(v) => Ok(*v),
            other => Err(Value::bad("real", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, EvalError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(Value::bad("string", other)),
        }
    }

    pub fn as_char(&self) -> Result<char, EvalError> {
        match self {
            Value::Char(c) => Ok(*c),
            other => Err(Value::bad("char", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Value::bad("bool", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], EvalError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Value::bad("list", other)),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Value::bad("list", &other)),
        }
    }

    fn bad(expected: &str, actual: &Value) -> EvalError {
        EvalError::Internal(format!(
            "expected {}, got {}",
            expected,
            actual.describe()
        ))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::Char(_) => "char",
            Value::Bool(_) => "bool",
            Value::Unit => "unit",
            Value::List(_) => "list",
            Value::Record { .. } => "record",
            Value::Data(..) | Value::Ctor(_) => "datatype value",
            Value::Selector(_) | Value::Builtin(..) | Value::Closure(_) => "fn",
        }
    }

    /// Structural comparison of first-order values. Functions are not
    /// comparable; NaN has no order.
    pub fn compare(&self, other: &Value) -> Result<Ordering, EvalError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| EvalError::DomainError("unordered real values".to_string())),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Unit, Value::Unit) => Ok(Ordering::Equal),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        other => return Ok(other),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (Value::Record { values: a, .. }, Value::Record { values: b, .. }) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        other => return Ok(other),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (Value::Data(na, pa), Value::Data(nb, pb)) => match na.cmp(nb) {
                Ordering::Equal => match (pa, pb) {
                    (None, None) => Ok(Ordering::Equal),
                    (Some(x), Some(y)) => x.compare(y),
                    (None, Some(_)) => Ok(Ordering::Less),
                    (Some(_), None) => Ok(Ordering::Greater),
                },
                other => Ok(other),
            },
            _ => Err(EvalError::DomainError(format!(
                "cannot compare {} with {}",
                self.describe(),
                other.describe()
            ))),
        }
    }

    pub fn equals(&self, other: &Value) -> Result<bool, EvalError> {
        Ok(self.compare(other)? == Ordering::Equal)
    }
}
