//! The session: a persistent environment fed one statement at a time.
//!
//! Each statement runs parse → infer → compile → eval. On success the
//! session commits the extended environments; on any error the environments
//! that existed before the statement remain in force.

use crate::builtins;
use crate::code::EvalContext;
use crate::compile;
use crate::env::EvalEnv;
use crate::print::print_value;
use crate::props::Props;
use crate::value::{EvalError, Value};
use morel_compiler::compiler::builtin::{built_ins, BuiltIn};
use morel_compiler::{CompileError, ParseError, Scheme, Type, TypeEnv, TypeError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// The built-in descriptor table, shared by every session.
static BUILT_INS: Lazy<Vec<BuiltIn>> = Lazy::new(built_ins);

#[derive(Debug, Error)]
pub enum MorelError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
    #[error("runtime error: {0}")]
    Eval(#[from] EvalError),
}

impl MorelError {
    /// The pipeline stage that detected the error.
    pub fn stage(&self) -> &'static str {
        match self {
            MorelError::Parse(_) => "parse",
            MorelError::Type(_) => "type",
            MorelError::Eval(_) => "eval",
        }
    }
}

impl From<CompileError> for MorelError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Parse(e) => MorelError::Parse(e),
            CompileError::Type(e) => MorelError::Type(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Val,
    Con,
}

/// One `(name, type, value)` triple a statement produced.
#[derive(Debug)]
pub struct BindingResult {
    pub kind: BindingKind,
    pub name: String,
    pub scheme: Scheme,
    pub value: Value,
}

impl BindingResult {
    pub fn format(&self, props: &Props) -> String {
        match self.kind {
            BindingKind::Val => format!(
                "val {} = {} : {}",
                self.name,
                print_value(&self.value, props),
                self.scheme
            ),
            BindingKind::Con => format!("con {} : {}", self.name, self.scheme),
        }
    }
}

#[derive(Debug)]
pub struct StatementResult {
    pub bindings: Vec<BindingResult>,
    pub warnings: Vec<String>,
}

pub struct Session {
    type_env: TypeEnv,
    eval_env: EvalEnv,
    ctx: EvalContext,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Session {
        let type_env = TypeEnv::initial();
        let mut eval_env = EvalEnv::empty();
        for builtin in BUILT_INS.iter() {
            let value = builtins::constant_value(builtin.name)
                .unwrap_or_else(|| Value::Builtin(builtin.name.to_string(), Vec::new()));
            eval_env = eval_env.bind(builtin.name, value);
        }
        for name in ["NONE", "LESS", "EQUAL", "GREATER"] {
            eval_env = eval_env.bind(name, Value::Data(name.to_string(), None));
        }
        eval_env = eval_env.bind("SOME", Value::Ctor("SOME".to_string()));
        let mut session = Session {
            type_env,
            eval_env,
            ctx: EvalContext::default(),
        };
        session.refresh_env_summary();
        session
    }

    pub fn props(&self) -> &Props {
        &self.ctx.props
    }

    pub fn props_mut(&mut self) -> &mut Props {
        &mut self.ctx.props
    }

    /// Evaluate one statement (text without the terminating `;`). The
    /// environment is extended only on success.
    pub fn eval_statement(&mut self, text: &str) -> Result<StatementResult, MorelError> {
        let coverage = self.ctx.props.match_coverage_enabled;
        let inferred = morel_compiler::compile_statement(text, &self.type_env, coverage)?;
        let (eval_env, bound) = compile::eval_decl(&inferred.decl, &self.eval_env, &mut self.ctx)?;

        let values: HashMap<String, Value> = bound.into_iter().collect();
        let kind = match &inferred.decl {
            morel_compiler::core::Decl::Datatype(_) => BindingKind::Con,
            morel_compiler::core::Decl::Val { .. } => BindingKind::Val,
        };
        let mut bindings = Vec::new();
        for (name, scheme) in &inferred.bindings {
            let value = values.get(name).cloned().ok_or_else(|| {
                EvalError::Internal(format!("no value bound for {}", name))
            })?;
            bindings.push(BindingResult {
                kind,
                name: name.clone(),
                scheme: scheme.clone(),
                value,
            });
        }

        self.type_env = inferred.env;
        self.eval_env = eval_env;
        self.refresh_env_summary();
        Ok(StatementResult {
            bindings,
            warnings: inferred.warnings.iter().map(|w| w.to_string()).collect(),
        })
    }

    /// Register a foreign value (the root of an external data source). Its
    /// type is derived structurally from the value.
    pub fn bind_foreign(&mut self, name: &str, value: Value) {
        let ty = value_type(&value);
        self.type_env = self.type_env.bind(
            name,
            morel_compiler::infer::Binding::Val(generalized(ty)),
        );
        self.eval_env = self.eval_env.bind(name, value);
        self.refresh_env_summary();
    }

    fn refresh_env_summary(&mut self) {
        let mut names = self.type_env.names();
        names.reverse();
        self.ctx.bindings = names
            .into_iter()
            .map(|(name, scheme)| (name, scheme.to_string()))
            .collect();
    }
}

fn generalized(ty: Type) -> Scheme {
    let mut vars = Vec::new();
    ty.collect_vars(&mut vars);
    Scheme {
        vars: vars.len() as u32,
        ty,
    }
}

fn value_type(value: &Value) -> Type {
    match value {
        Value::Int(_) => Type::INT,
        Value::Real(_) => Type::REAL,
        Value::Str(_) => Type::STRING,
        Value::Char(_) => Type::CHAR,
        Value::Bool(_) => Type::BOOL,
        Value::Unit => Type::UNIT,
        Value::List(items) => Type::list(
            items
                .first()
                .map(value_type)
                .unwrap_or(Type::Var(0)),
        ),
        Value::Record { labels, values } => Type::Record(
            labels
                .iter()
                .cloned()
                .zip(values.iter().map(value_type))
                .collect(),
        ),
        Value::Data(name, payload) => match (name.as_str(), payload) {
            ("SOME", Some(v)) => Type::data("option", vec![value_type(v)]),
            ("NONE", _) => Type::data("option", vec![Type::Var(0)]),
            ("LESS" | "EQUAL" | "GREATER", _) => Type::data("order", vec![]),
            _ => Type::UNIT,
        },
        Value::Ctor(_) | Value::Selector(_) | Value::Builtin(..) | Value::Closure(_) => {
            Type::func(Type::Var(0), Type::Var(1))
        }
    }
}

/// Build a value from JSON: objects become records, arrays lists, integral
/// numbers ints, other numbers reals.
pub fn value_from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Unit,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            Value::List(items.iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map
                .iter()
                .map(|(k, v)| (k.clone(), value_from_json(v)))
                .collect();
            fields.sort_by(|a, b| morel_compiler::ast::label_cmp(&a.0, &b.0));
            let (labels, values): (Vec<String>, Vec<Value>) = fields.into_iter().unzip();
            Value::Record {
                labels: Rc::new(labels),
                values,
            }
        }
    }
}
