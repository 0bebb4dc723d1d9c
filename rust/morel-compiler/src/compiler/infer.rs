//! Type inference: walks the AST, emits equality constraints, solves them
//! with the unifier, and rewrites the program into the typed core tree.
//!
//! `fun` declarations are desugared to `val rec … fn` here, constructor
//! patterns are disambiguated against the environment, and record selectors
//! are resolved to slots through deferred unifier actions.

use crate::compiler::ast::{self, Literal};
use crate::compiler::builtin;
use crate::compiler::core;
use crate::compiler::coverage;
use crate::compiler::tokens::Pos;
use crate::compiler::types::{ConDef, DataDef, PrimType, Scheme, TyCon, Type};
use crate::compiler::unify::{self, Action, Subst, Term, UnifyFailure, Var};
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TypeError {
    #[error("unbound variable or constructor: {name}")]
    Unbound { name: String, pos: Pos },
    #[error("unbound type constructor: {name}")]
    UnboundType { name: String, pos: Pos },
    #[error("type constructor {name} expects {expected} arguments, got {actual}")]
    TyConArity {
        name: String,
        expected: usize,
        actual: usize,
        pos: Pos,
    },
    #[error("cannot unify {left} with {right}")]
    Mismatch { left: String, right: String },
    #[error("apply of non-function: {ty}")]
    NotFunction { ty: String },
    #[error("unresolved flex record (can't tell what fields there are besides {fields})")]
    FlexRecord { fields: String, pos: Pos },
    #[error("recursive binding must be a function: {name}")]
    RecNotFn { name: String, pos: Pos },
    #[error("pattern of recursive binding must be an identifier")]
    RecNotId { pos: Pos },
    #[error("{name} is not a constructor")]
    NotConstructor { name: String, pos: Pos },
    #[error("constructor {name} requires an argument")]
    ConNeedsArg { name: String, pos: Pos },
    #[error("constructor {name} takes no argument")]
    ConNoArg { name: String, pos: Pos },
    #[error("clauses of {name} have different numbers of patterns")]
    ClauseArity { name: String, pos: Pos },
    #[error("overloaded operator applied to {ty}")]
    BadOverload { ty: String },
    #[error("warning: match nonexhaustive")]
    NotExhaustive { pos: Pos },
    #[error("warning: match redundant")]
    Redundant { pos: Pos },
}

// ── Type environment ──

/// A binding in the type environment: an ordinary value with its scheme, or
/// a datatype constructor.
#[derive(Debug, Clone)]
pub enum Binding {
    Val(Scheme),
    Con { data: Rc<DataDef>, index: usize },
}

#[derive(Debug)]
struct ValFrame {
    parent: Option<Rc<ValFrame>>,
    name: String,
    binding: Binding,
}

/// Chained, immutable type environment plus the type-constructor registry.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    vals: Option<Rc<ValFrame>>,
    tycons: HashMap<String, TyCon>,
}

impl TypeEnv {
    /// The top-level environment seeded with built-ins and the built-in
    /// datatypes `'a option` and `order`.
    pub fn initial() -> TypeEnv {
        let mut env = TypeEnv::default();
        let option_def = Rc::new(DataDef {
            name: "option".to_string(),
            arity: 1,
            cons: vec![
                ConDef {
                    name: "NONE".to_string(),
                    arg: None,
                },
                ConDef {
                    name: "SOME".to_string(),
                    arg: Some(Type::Var(0)),
                },
            ],
        });
        let order_def = Rc::new(DataDef {
            name: "order".to_string(),
            arity: 0,
            cons: vec![
                ConDef {
                    name: "LESS".to_string(),
                    arg: None,
                },
                ConDef {
                    name: "EQUAL".to_string(),
                    arg: None,
                },
                ConDef {
                    name: "GREATER".to_string(),
                    arg: None,
                },
            ],
        });
        env.tycons
            .insert("option".to_string(), TyCon::Data(option_def.clone()));
        env.tycons
            .insert("order".to_string(), TyCon::Data(order_def.clone()));
        env.tycons
            .insert("vector".to_string(), TyCon::Data(Rc::new(DataDef {
                name: "vector".to_string(),
                arity: 1,
                cons: Vec::new(),
            })));
        env.tycons.insert("bag".to_string(), TyCon::Data(Rc::new(DataDef {
            name: "bag".to_string(),
            arity: 1,
            cons: Vec::new(),
        })));
        for def in [&option_def, &order_def] {
            for (index, con) in def.cons.iter().enumerate() {
                env = env.bind(
                    &con.name,
                    Binding::Con {
                        data: def.clone(),
                        index,
                    },
                );
            }
        }
        for builtin in builtin::built_ins() {
            env = env.bind(builtin.name, Binding::Val(builtin.scheme));
        }
        env
    }

    pub fn bind(&self, name: &str, binding: Binding) -> TypeEnv {
        TypeEnv {
            vals: Some(Rc::new(ValFrame {
                parent: self.vals.clone(),
                name: name.to_string(),
                binding,
            })),
            tycons: self.tycons.clone(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        let mut frame = self.vals.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                return Some(&f.binding);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    pub fn tycon(&self, name: &str) -> Option<&TyCon> {
        self.tycons.get(name)
    }

    pub fn with_tycon(&self, name: &str, tycon: TyCon) -> TypeEnv {
        let mut env = self.clone();
        env.tycons.insert(name.to_string(), tycon);
        env
    }

    /// The datatype that declares constructor `name`, if any.
    pub fn datatype_of_con(&self, name: &str) -> Option<Rc<DataDef>> {
        match self.lookup(name) {
            Some(Binding::Con { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Visible value bindings, newest first, shadowed names omitted.
    pub fn names(&self) -> Vec<(String, Scheme)> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        let mut frame = self.vals.as_deref();
        while let Some(f) = frame {
            if !seen.contains(&f.name) {
                seen.push(f.name.clone());
                if let Binding::Val(scheme) = &f.binding {
                    out.push((f.name.clone(), scheme.clone()));
                }
            }
            frame = f.parent.as_deref();
        }
        out
    }
}

// ── Inference result ──

#[derive(Debug)]
pub struct Inferred {
    pub decl: core::Decl,
    /// Names the statement introduces, with their generalized schemes, in
    /// declaration order.
    pub bindings: Vec<(String, Scheme)>,
    /// Environment for the next statement.
    pub env: TypeEnv,
    /// Match coverage warnings (when enabled).
    pub warnings: Vec<TypeError>,
}

pub fn infer_statement(
    decl: &ast::Decl,
    env: &TypeEnv,
    coverage_enabled: bool,
) -> Result<Inferred, TypeError> {
    let mut resolver = Resolver::new();
    let (core_decl, inner_env, bound, tycon_updates) = resolver.decl(env, decl)?;

    let equations = std::mem::take(&mut resolver.equations);
    let actions = std::mem::take(&mut resolver.actions);
    let subst = unify::unify(equations, actions).map_err(classify_failure)?;
    let mut subst = subst;

    // Overloaded operators default to int when nothing constrained them.
    for v in &resolver.arith_vars {
        default_numeric(&mut subst, *v, &[PrimType::Int, PrimType::Real])?;
    }
    for v in &resolver.compare_vars {
        default_numeric(
            &mut subst,
            *v,
            &[PrimType::Int, PrimType::Real, PrimType::String, PrimType::Char],
        )?;
    }

    // Flex records that never met a concrete record type.
    for (v, fields, pos) in &resolver.flex_sites {
        if let Term::Var(_) = subst.apply(&Term::Var(*v)) {
            return Err(TypeError::FlexRecord {
                fields: fields.clone(),
                pos: *pos,
            });
        }
    }

    let core_decl = finish_decl(core_decl, &subst)?;

    let mut warnings = Vec::new();
    if coverage_enabled {
        collect_match_warnings(&core_decl, &inner_env, &mut warnings);
    }

    // Generalize the statement's bindings and build the session environment.
    let mut env_after = env.clone();
    for (name, tycon) in &tycon_updates {
        env_after = env_after.with_tycon(name, tycon.clone());
    }
    let mut bindings = Vec::new();
    match &core_decl {
        core::Decl::Datatype(defs) => {
            for def in defs {
                for (index, con) in def.cons.iter().enumerate() {
                    let scheme = con_scheme(def, index);
                    env_after = env_after.bind(
                        &con.name,
                        Binding::Con {
                            data: def.clone(),
                            index,
                        },
                    );
                    bindings.push((con.name.clone(), scheme));
                }
            }
        }
        core::Decl::Val { .. } => {
            for (name, ty) in &bound {
                let resolved = subst_type(&subst, ty);
                let scheme = generalize(&resolved);
                env_after = env_after.bind(name, Binding::Val(scheme.clone()));
                bindings.push((name.clone(), scheme));
            }
        }
    }

    Ok(Inferred {
        decl: core_decl,
        bindings,
        env: env_after,
        warnings,
    })
}

fn classify_failure(failure: UnifyFailure) -> TypeError {
    let left_is_fn = matches!(&failure.left, Term::Seq { op, .. } if op == "fn");
    let right_is_fn = matches!(&failure.right, Term::Seq { op, .. } if op == "fn");
    if left_is_fn != right_is_fn {
        let other = if left_is_fn {
            &failure.right
        } else {
            &failure.left
        };
        if !matches!(other, Term::Var(_)) {
            return TypeError::NotFunction {
                ty: term_to_type(other).to_string(),
            };
        }
    }
    TypeError::Mismatch {
        left: term_to_type(&failure.left).to_string(),
        right: term_to_type(&failure.right).to_string(),
    }
}

fn default_numeric(subst: &mut Subst, v: Var, allowed: &[PrimType]) -> Result<(), TypeError> {
    match subst.apply(&Term::Var(v)) {
        Term::Var(w) => {
            subst.insert(w, Term::atom("int"));
            Ok(())
        }
        term => {
            let ty = term_to_type(&term);
            if allowed.iter().any(|p| ty == Type::Prim(*p)) {
                Ok(())
            } else {
                Err(TypeError::BadOverload { ty: ty.to_string() })
            }
        }
    }
}

fn generalize(ty: &Type) -> Scheme {
    let mut vars = Vec::new();
    ty.collect_vars(&mut vars);
    let mapping: HashMap<u32, u32> = vars
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, i as u32))
        .collect();
    Scheme {
        vars: vars.len() as u32,
        ty: ty.map_vars(&|v| Type::Var(mapping[&v])),
    }
}

fn con_scheme(def: &Rc<DataDef>, index: usize) -> Scheme {
    let con = &def.cons[index];
    let result = def.self_type();
    let ty = match &con.arg {
        Some(arg) => Type::func(arg.clone(), result),
        None => result,
    };
    Scheme {
        vars: def.arity as u32,
        ty,
    }
}

// ── Terms ⇄ types ──

pub fn type_to_term(ty: &Type) -> Term {
    match ty {
        Type::Prim(p) => Term::atom(&p.to_string()),
        Type::Var(v) => Term::Var(*v),
        Type::Fn(dom, cod) => Term::seq("fn", vec![type_to_term(dom), type_to_term(cod)]),
        Type::Tuple(items) => Term::seq("tuple", items.iter().map(type_to_term).collect()),
        Type::List(elem) => Term::seq("list", vec![type_to_term(elem)]),
        Type::Record(fields) => {
            if fields.is_empty() {
                return Term::atom("unit");
            }
            let op = record_op(fields.iter().map(|(l, _)| l.as_str()));
            Term::Seq {
                op,
                args: fields.iter().map(|(_, t)| type_to_term(t)).collect(),
            }
        }
        Type::Data { name, args } => {
            if args.is_empty() {
                Term::atom(name)
            } else {
                let mut terms = vec![Term::atom(name)];
                terms.extend(args.iter().map(type_to_term));
                Term::seq("apply", terms)
            }
        }
    }
}

/// Record operator with the (sorted) labels baked in: `record:a:b`.
fn record_op<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    let mut op = "record".to_string();
    for l in labels {
        op.push(':');
        op.push_str(l);
    }
    op
}

pub fn term_to_type(term: &Term) -> Type {
    match term {
        Term::Var(v) => Type::Var(*v),
        Term::Seq { op, args } => match op.as_str() {
            "fn" => Type::func(term_to_type(&args[0]), term_to_type(&args[1])),
            "tuple" => Type::Tuple(args.iter().map(term_to_type).collect()),
            "list" => Type::list(term_to_type(&args[0])),
            "apply" => {
                let name = match &args[0] {
                    Term::Seq { op, .. } => op.clone(),
                    Term::Var(_) => "?".to_string(),
                };
                Type::Data {
                    name,
                    args: args[1..].iter().map(term_to_type).collect(),
                }
            }
            _ if op.starts_with("record:") => {
                let labels: Vec<&str> = op.split(':').skip(1).collect();
                Type::Record(
                    labels
                        .iter()
                        .zip(args)
                        .map(|(l, t)| (l.to_string(), term_to_type(t)))
                        .collect(),
                )
            }
            name => match PrimType::from_str(name) {
                Ok(p) => Type::Prim(p),
                Err(_) => Type::Data {
                    name: name.to_string(),
                    args: Vec::new(),
                },
            },
        },
    }
}

fn subst_type(subst: &Subst, ty: &Type) -> Type {
    ty.map_vars(&|v| term_to_type(&subst.apply(&Term::Var(v))))
}

/// Index of `label` in the fields a term's operator exposes.
fn term_field_index(term: &Term, label: &str) -> Option<usize> {
    match term {
        Term::Seq { op, args } => {
            if op == "tuple" {
                let n: usize = label.parse().ok()?;
                if n >= 1 && n <= args.len() {
                    Some(n - 1)
                } else {
                    None
                }
            } else if let Some(rest) = op.strip_prefix("record:") {
                rest.split(':').position(|l| l == label)
            } else {
                None
            }
        }
        Term::Var(_) => None,
    }
}

// ── The resolver ──

struct Resolver {
    next_var: u32,
    equations: Vec<(Term, Term)>,
    actions: HashMap<Var, Vec<Action>>,
    /// Result variables of overloaded arithmetic; int unless solved to real.
    arith_vars: Vec<Var>,
    /// Operand variables of comparison operators.
    compare_vars: Vec<Var>,
    /// Variables that must resolve to a record: `(var, known-fields, pos)`.
    flex_sites: Vec<(Var, String, Pos)>,
    /// Scoped names for type variables in annotations.
    ty_vars: HashMap<String, Type>,
    /// Counter for synthesized `fun` argument names.
    next_arg: u32,
}

impl Resolver {
    fn new() -> Self {
        Self {
            next_var: 0,
            equations: Vec::new(),
            actions: HashMap::new(),
            arith_vars: Vec::new(),
            compare_vars: Vec::new(),
            flex_sites: Vec::new(),
            ty_vars: HashMap::new(),
            next_arg: 0,
        }
    }

    fn fresh(&mut self) -> u32 {
        let v = self.next_var;
        self.next_var += 1;
        v
    }

    fn fresh_ty(&mut self) -> Type {
        Type::Var(self.fresh())
    }

    fn equate(&mut self, left: Term, right: Term) {
        self.equations.push((left, right));
    }

    fn equate_ty(&mut self, left: &Type, right: &Type) {
        self.equate(type_to_term(left), type_to_term(right));
    }

    fn instantiate(&mut self, scheme: &Scheme) -> Type {
        if scheme.vars == 0 {
            return scheme.ty.clone();
        }
        let fresh: Vec<Type> = (0..scheme.vars).map(|_| self.fresh_ty()).collect();
        scheme.ty.map_vars(&|v| {
            if (v as usize) < fresh.len() {
                fresh[v as usize].clone()
            } else {
                Type::Var(v)
            }
        })
    }

    // ── Declarations ──

    /// Infer a declaration. Returns the core declaration, the environment
    /// it produces (for following declarations), the value names it binds
    /// with their unresolved types, and any type-constructor updates.
    fn decl(
        &mut self,
        env: &TypeEnv,
        decl: &ast::Decl,
    ) -> Result<(core::Decl, TypeEnv, Vec<(String, Type)>, Vec<(String, TyCon)>), TypeError> {
        match decl {
            ast::Decl::Val(binds, _) => {
                let (core_binds, env_after, bound) = self.val_binds(env, binds)?;
                Ok((core::Decl::Val { binds: core_binds }, env_after, bound, Vec::new()))
            }
            ast::Decl::Fun(binds, _) => {
                let val_binds = self.desugar_fun(env, binds)?;
                let (core_binds, env_after, bound) = self.val_binds(env, &val_binds)?;
                Ok((core::Decl::Val { binds: core_binds }, env_after, bound, Vec::new()))
            }
            ast::Decl::Datatype(binds, _) => self.datatype(env, binds),
        }
    }

    fn val_binds(
        &mut self,
        env: &TypeEnv,
        binds: &[ast::ValBind],
    ) -> Result<(Vec<core::ValBind>, TypeEnv, Vec<(String, Type)>), TypeError> {
        // Recursive names are visible to every right-hand side in the group;
        // everything else sees only the pre-group environment.
        let mut rhs_env = env.clone();
        let mut rec_vars: HashMap<String, u32> = HashMap::new();
        for bind in binds {
            if bind.rec {
                let name = match rec_pat_name(&bind.pat) {
                    Some(name) => name,
                    None => {
                        return Err(TypeError::RecNotId {
                            pos: bind.pat.pos(),
                        })
                    }
                };
                if !matches!(bind.exp, ast::Expr::Fn(..)) {
                    return Err(TypeError::RecNotFn {
                        name: name.to_string(),
                        pos: bind.exp.pos(),
                    });
                }
                let v = self.fresh();
                rec_vars.insert(name.to_string(), v);
                rhs_env = rhs_env.bind(name, Binding::Val(Scheme::mono(Type::Var(v))));
            }
        }

        let mut core_binds = Vec::new();
        let mut bound = Vec::new();
        let mut env_after = env.clone();
        for bind in binds {
            let exp = self.expr(&rhs_env, &bind.exp)?;
            let mut names = Vec::new();
            let pat = self.pat(env, &bind.pat, &mut names)?;
            self.equate_ty(&pat.ty, &exp.ty);
            if bind.rec {
                let name = rec_pat_name(&bind.pat).unwrap_or("?");
                if let Some(v) = rec_vars.get(name) {
                    self.equate_ty(&Type::Var(*v), &exp.ty);
                }
            }
            for (name, ty) in &names {
                env_after = env_after.bind(name, Binding::Val(Scheme::mono(ty.clone())));
                bound.push((name.clone(), ty.clone()));
            }
            core_binds.push(core::ValBind {
                rec: bind.rec,
                pat,
                exp,
            });
        }
        Ok((core_binds, env_after, bound))
    }

    fn datatype(
        &mut self,
        env: &TypeEnv,
        binds: &[ast::DatBind],
    ) -> Result<(core::Decl, TypeEnv, Vec<(String, Type)>, Vec<(String, TyCon)>), TypeError> {
        // A temporary marker lets constructors refer to the datatype being
        // declared (and to siblings in a `datatype … and` chain); it is
        // replaced once the definitions are complete.
        let mut elab_env = env.clone();
        for bind in binds {
            elab_env = elab_env.with_tycon(
                &bind.name,
                TyCon::Temporary {
                    arity: bind.ty_vars.len(),
                },
            );
        }
        let mut defs = Vec::new();
        for bind in binds {
            let mut param_map: HashMap<String, Type> = HashMap::new();
            for (i, v) in bind.ty_vars.iter().enumerate() {
                param_map.insert(v.clone(), Type::Var(i as u32));
            }
            let mut cons = Vec::new();
            for con in &bind.cons {
                let arg = match &con.ty {
                    Some(ty) => Some(self.resolve_type_with(&elab_env, ty, &mut param_map, false)?),
                    None => None,
                };
                cons.push(ConDef {
                    name: con.name.clone(),
                    arg,
                });
            }
            defs.push(Rc::new(DataDef {
                name: bind.name.clone(),
                arity: bind.ty_vars.len(),
                cons,
            }));
        }
        let mut env_after = env.clone();
        let mut updates = Vec::new();
        for def in &defs {
            env_after = env_after.with_tycon(&def.name, TyCon::Data(def.clone()));
            for index in 0..def.cons.len() {
                env_after = env_after.bind(
                    &def.cons[index].name,
                    Binding::Con {
                        data: def.clone(),
                        index,
                    },
                );
            }
            updates.push((def.name.clone(), TyCon::Data(def.clone())));
        }
        Ok((core::Decl::Datatype(defs), env_after, Vec::new(), updates))
    }

    // ── fun desugaring ──

    fn desugar_fun(
        &mut self,
        env: &TypeEnv,
        binds: &[ast::FunBind],
    ) -> Result<Vec<ast::ValBind>, TypeError> {
        binds
            .iter()
            .map(|bind| self.desugar_fun_bind(env, bind))
            .collect()
    }

    fn desugar_fun_bind(
        &mut self,
        env: &TypeEnv,
        bind: &ast::FunBind,
    ) -> Result<ast::ValBind, TypeError> {
        let mut clauses: Vec<(Vec<ast::Pat>, ast::Expr)> = Vec::new();
        for clause in &bind.clauses {
            let pats = self.resolve_clause_pats(env, &clause.pats)?;
            clauses.push((pats, clause.exp.clone()));
        }
        let arity = clauses[0].0.len();
        if clauses.iter().any(|(pats, _)| pats.len() != arity) {
            return Err(TypeError::ClauseArity {
                name: bind.name.clone(),
                pos: bind.pos,
            });
        }
        let exp = if clauses.len() == 1 {
            let (pats, body) = clauses.into_iter().next().unwrap();
            fn_tower(pats, body)
        } else if arity == 1 {
            let rules = clauses
                .into_iter()
                .map(|(mut pats, body)| ast::MatchRule {
                    pos: pats[0].pos().plus(body.pos()),
                    pat: pats.remove(0),
                    exp: body,
                })
                .collect();
            ast::Expr::Fn(rules, bind.pos)
        } else {
            // Multi-clause, multi-argument: a fn tower over fresh names and a
            // case over the argument tuple.
            let args: Vec<String> = (0..arity)
                .map(|_| {
                    let n = self.next_arg;
                    self.next_arg += 1;
                    format!("v${}", n)
                })
                .collect();
            let scrutinee = ast::Expr::Tuple(
                args.iter()
                    .map(|a| ast::Expr::Id(a.clone(), Pos::ZERO))
                    .collect(),
                Pos::ZERO,
            );
            let rules = clauses
                .into_iter()
                .map(|(pats, body)| ast::MatchRule {
                    pos: body.pos(),
                    pat: ast::Pat::Tuple(pats, Pos::ZERO),
                    exp: body,
                })
                .collect();
            let case = ast::Expr::Case(Box::new(scrutinee), rules, bind.pos);
            let arg_pats = args
                .into_iter()
                .map(|a| ast::Pat::Id(a, Pos::ZERO))
                .collect();
            fn_tower(arg_pats, case)
        };
        Ok(ast::ValBind {
            rec: true,
            pat: ast::Pat::Id(bind.name.clone(), bind.pos),
            exp,
            pos: bind.pos,
        })
    }

    /// Disambiguate clause-level identifier patterns against the
    /// environment: a unary constructor takes the next sibling pattern as
    /// its argument; a nullary constructor stands alone.
    fn resolve_clause_pats(
        &mut self,
        env: &TypeEnv,
        pats: &[ast::Pat],
    ) -> Result<Vec<ast::Pat>, TypeError> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < pats.len() {
            match &pats[i] {
                ast::Pat::Id(name, pos) => match env.lookup(name) {
                    Some(Binding::Con { data, index }) => {
                        let has_arg = data.cons[*index].arg.is_some();
                        if has_arg {
                            let Some(arg) = pats.get(i + 1) else {
                                return Err(TypeError::ConNeedsArg {
                                    name: name.clone(),
                                    pos: *pos,
                                });
                            };
                            out.push(ast::Pat::Con(
                                name.clone(),
                                Box::new(arg.clone()),
                                pos.plus(arg.pos()),
                            ));
                            i += 2;
                            continue;
                        }
                        out.push(pats[i].clone());
                        i += 1;
                    }
                    _ => {
                        out.push(pats[i].clone());
                        i += 1;
                    }
                },
                _ => {
                    out.push(pats[i].clone());
                    i += 1;
                }
            }
        }
        Ok(out)
    }

    // ── Expressions ──

    fn expr(&mut self, env: &TypeEnv, exp: &ast::Expr) -> Result<core::Expr, TypeError> {
        let pos = exp.pos();
        let v = self.fresh();
        let node_ty = Type::Var(v);
        let node = |kind| core::Expr {
            ty: Type::Var(v),
            kind,
            pos,
        };
        match exp {
            ast::Expr::Literal(lit, _) => {
                self.equate(Term::Var(v), Term::atom(literal_type(lit)));
                Ok(node(core::ExprKind::Literal(lit.clone())))
            }
            ast::Expr::Id(name, _) => {
                let binding = env.lookup(name).ok_or_else(|| TypeError::Unbound {
                    name: name.clone(),
                    pos,
                })?;
                let ty = match binding {
                    Binding::Val(scheme) => self.instantiate(&scheme.clone()),
                    Binding::Con { data, index } => {
                        let scheme = con_scheme(data, *index);
                        self.instantiate(&scheme)
                    }
                };
                self.equate_ty(&node_ty, &ty);
                Ok(node(core::ExprKind::Id(name.clone())))
            }
            ast::Expr::RecordSelector(label, _) => {
                let arg = self.fresh();
                let res = self.fresh();
                self.equate(
                    Term::Var(v),
                    Term::seq("fn", vec![Term::Var(arg), Term::Var(res)]),
                );
                self.add_selector_action(arg, res, label.clone());
                self.flex_sites.push((arg, label.clone(), pos));
                Ok(node(core::ExprKind::Selector {
                    label: label.clone(),
                    slot: usize::MAX,
                }))
            }
            ast::Expr::Apply(func, arg, _) => {
                let func = self.expr(env, func)?;
                let arg = self.expr(env, arg)?;
                self.equate(
                    type_to_term(&func.ty),
                    Term::seq("fn", vec![type_to_term(&arg.ty), Term::Var(v)]),
                );
                Ok(node(core::ExprKind::Apply {
                    func: Box::new(func),
                    arg: Box::new(arg),
                }))
            }
            ast::Expr::InfixCall(op, lhs, rhs, _) => self.infix(env, op, lhs, rhs, v, pos),
            ast::Expr::PrefixCall(_, arg, _) => {
                let arg = self.expr(env, arg)?;
                self.equate_ty(&node_ty, &arg.ty);
                self.arith_vars.push(v);
                Ok(node(core::ExprKind::Negate(Box::new(arg))))
            }
            ast::Expr::AndAlso(lhs, rhs, _) => {
                let lhs = self.expr(env, lhs)?;
                let rhs = self.expr(env, rhs)?;
                self.equate_ty(&lhs.ty, &Type::BOOL);
                self.equate_ty(&rhs.ty, &Type::BOOL);
                self.equate_ty(&node_ty, &Type::BOOL);
                Ok(node(core::ExprKind::AndAlso(Box::new(lhs), Box::new(rhs))))
            }
            ast::Expr::OrElse(lhs, rhs, _) => {
                let lhs = self.expr(env, lhs)?;
                let rhs = self.expr(env, rhs)?;
                self.equate_ty(&lhs.ty, &Type::BOOL);
                self.equate_ty(&rhs.ty, &Type::BOOL);
                self.equate_ty(&node_ty, &Type::BOOL);
                Ok(node(core::ExprKind::OrElse(Box::new(lhs), Box::new(rhs))))
            }
            ast::Expr::Tuple(items, _) => {
                let items: Vec<core::Expr> = items
                    .iter()
                    .map(|e| self.expr(env, e))
                    .collect::<Result<_, _>>()?;
                let term = Term::seq("tuple", items.iter().map(|e| type_to_term(&e.ty)).collect());
                self.equate(Term::Var(v), term);
                Ok(node(core::ExprKind::Tuple(items)))
            }
            ast::Expr::List(items, _) => {
                let elem = self.fresh_ty();
                let items: Vec<core::Expr> = items
                    .iter()
                    .map(|e| self.expr(env, e))
                    .collect::<Result<_, _>>()?;
                for item in &items {
                    self.equate_ty(&item.ty, &elem);
                }
                self.equate_ty(&node_ty, &Type::list(elem));
                Ok(node(core::ExprKind::List(items)))
            }
            ast::Expr::Record(fields, _) => {
                let fields: Vec<(String, core::Expr)> = fields
                    .iter()
                    .map(|(l, e)| Ok((l.clone(), self.expr(env, e)?)))
                    .collect::<Result<_, TypeError>>()?;
                let op = record_op(fields.iter().map(|(l, _)| l.as_str()));
                let term = Term::Seq {
                    op,
                    args: fields.iter().map(|(_, e)| type_to_term(&e.ty)).collect(),
                };
                self.equate(Term::Var(v), term);
                Ok(node(core::ExprKind::Record(fields)))
            }
            ast::Expr::Let(decls, body, _) => {
                let mut inner_env = env.clone();
                let mut core_decls = Vec::new();
                for d in decls {
                    let (core_d, env_next, _, _) = self.decl(&inner_env, d)?;
                    core_decls.push(core_d);
                    inner_env = env_next;
                }
                let body = self.expr(&inner_env, body)?;
                self.equate_ty(&node_ty, &body.ty);
                Ok(node(core::ExprKind::Let {
                    decls: core_decls,
                    body: Box::new(body),
                }))
            }
            ast::Expr::If(cond, then_exp, else_exp, _) => {
                let cond = self.expr(env, cond)?;
                let then_exp = self.expr(env, then_exp)?;
                let else_exp = self.expr(env, else_exp)?;
                self.equate_ty(&cond.ty, &Type::BOOL);
                self.equate_ty(&then_exp.ty, &node_ty);
                self.equate_ty(&else_exp.ty, &node_ty);
                Ok(node(core::ExprKind::If(
                    Box::new(cond),
                    Box::new(then_exp),
                    Box::new(else_exp),
                )))
            }
            ast::Expr::Case(scrutinee, rules, _) => {
                let scrutinee = self.expr(env, scrutinee)?;
                let core_rules = self.rules(env, rules, &scrutinee.ty.clone(), &node_ty)?;
                Ok(node(core::ExprKind::Case {
                    scrutinee: Box::new(scrutinee),
                    rules: core_rules,
                }))
            }
            ast::Expr::Fn(rules, _) => {
                let dom = self.fresh_ty();
                let cod = self.fresh_ty();
                let core_rules = self.rules(env, rules, &dom, &cod)?;
                self.equate_ty(&node_ty, &Type::func(dom, cod));
                Ok(node(core::ExprKind::Fn { rules: core_rules }))
            }
            ast::Expr::From(from, _) => self.from(env, from, v, pos),
            ast::Expr::Annotated(inner, ty_exp, _) => {
                let inner = self.expr(env, inner)?;
                let ty = self.resolve_type(env, ty_exp)?;
                self.equate_ty(&inner.ty, &ty);
                self.equate_ty(&node_ty, &inner.ty);
                // The annotation constrains the type; the core node is the
                // inner expression itself.
                Ok(core::Expr {
                    ty: Type::Var(v),
                    kind: inner.kind,
                    pos,
                })
            }
        }
    }

    fn infix(
        &mut self,
        env: &TypeEnv,
        op: &str,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
        v: Var,
        pos: Pos,
    ) -> Result<core::Expr, TypeError> {
        let lhs = self.expr(env, lhs)?;
        let rhs = self.expr(env, rhs)?;
        let node_ty = Type::Var(v);
        let node = |kind| core::Expr {
            ty: Type::Var(v),
            kind,
            pos,
        };
        let bin = |op, lhs, rhs| core::ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        match op {
            "+" | "-" | "*" | "/" | "div" | "mod" => {
                self.equate_ty(&lhs.ty, &node_ty);
                self.equate_ty(&rhs.ty, &node_ty);
                self.arith_vars.push(v);
                let bop = match op {
                    "+" => core::BinOp::Plus,
                    "-" => core::BinOp::Minus,
                    "*" => core::BinOp::Times,
                    "/" => core::BinOp::Divide,
                    "div" => core::BinOp::Div,
                    _ => core::BinOp::Mod,
                };
                Ok(node(bin(bop, lhs, rhs)))
            }
            "^" => {
                self.equate_ty(&lhs.ty, &Type::STRING);
                self.equate_ty(&rhs.ty, &Type::STRING);
                self.equate_ty(&node_ty, &Type::STRING);
                Ok(node(bin(core::BinOp::Caret, lhs, rhs)))
            }
            "=" | "<>" => {
                self.equate_ty(&lhs.ty, &rhs.ty);
                self.equate_ty(&node_ty, &Type::BOOL);
                let bop = if op == "=" {
                    core::BinOp::Eq
                } else {
                    core::BinOp::Ne
                };
                Ok(node(bin(bop, lhs, rhs)))
            }
            "<" | "<=" | ">" | ">=" => {
                self.equate_ty(&lhs.ty, &rhs.ty);
                self.equate_ty(&node_ty, &Type::BOOL);
                if let Type::Var(w) = &lhs.ty {
                    self.compare_vars.push(*w);
                }
                let bop = match op {
                    "<" => core::BinOp::Lt,
                    "<=" => core::BinOp::Le,
                    ">" => core::BinOp::Gt,
                    _ => core::BinOp::Ge,
                };
                Ok(node(bin(bop, lhs, rhs)))
            }
            "::" => {
                self.equate_ty(&rhs.ty, &Type::list(lhs.ty.clone()));
                self.equate_ty(&node_ty, &rhs.ty);
                Ok(node(bin(core::BinOp::Cons, lhs, rhs)))
            }
            _ => {
                // Everything else (`@`, `o`, `union`, …) is an environment
                // binding applied to the operand pair.
                let scheme = match env.lookup(op) {
                    Some(Binding::Val(scheme)) => scheme.clone(),
                    _ => {
                        return Err(TypeError::Unbound {
                            name: op.to_string(),
                            pos,
                        })
                    }
                };
                let fn_ty = self.instantiate(&scheme);
                let pair_ty = Type::Tuple(vec![lhs.ty.clone(), rhs.ty.clone()]);
                self.equate_ty(&fn_ty, &Type::func(pair_ty.clone(), node_ty.clone()));
                let func = core::Expr {
                    ty: fn_ty,
                    kind: core::ExprKind::Id(op.to_string()),
                    pos,
                };
                let arg = core::Expr {
                    ty: pair_ty,
                    kind: core::ExprKind::Tuple(vec![lhs, rhs]),
                    pos,
                };
                Ok(node(core::ExprKind::Apply {
                    func: Box::new(func),
                    arg: Box::new(arg),
                }))
            }
        }
    }

    fn rules(
        &mut self,
        env: &TypeEnv,
        rules: &[ast::MatchRule],
        pat_ty: &Type,
        body_ty: &Type,
    ) -> Result<Vec<core::Rule>, TypeError> {
        let mut out = Vec::new();
        for rule in rules {
            let mut names = Vec::new();
            let pat = self.pat(env, &rule.pat, &mut names)?;
            self.equate_ty(&pat.ty, pat_ty);
            let mut rule_env = env.clone();
            for (name, ty) in &names {
                rule_env = rule_env.bind(name, Binding::Val(Scheme::mono(ty.clone())));
            }
            let exp = self.expr(&rule_env, &rule.exp)?;
            self.equate_ty(&exp.ty, body_ty);
            out.push(core::Rule { pat, exp });
        }
        Ok(out)
    }

    fn from(
        &mut self,
        env: &TypeEnv,
        from: &ast::FromExpr,
        v: Var,
        pos: Pos,
    ) -> Result<core::Expr, TypeError> {
        let node_ty = Type::Var(v);
        let mut row_env = env.clone();
        let mut sources = Vec::new();
        let mut source_tys: Vec<(String, Type)> = Vec::new();
        for source in &from.sources {
            let exp = self.expr(&row_env, &source.exp)?;
            let elem = self.fresh_ty();
            self.equate_ty(&exp.ty, &Type::list(elem.clone()));
            row_env = row_env.bind(&source.name, Binding::Val(Scheme::mono(elem.clone())));
            source_tys.push((source.name.clone(), elem));
            sources.push((source.name.clone(), exp));
        }
        let filter = match &from.where_exp {
            Some(w) => {
                let w = self.expr(&row_env, w)?;
                self.equate_ty(&w.ty, &Type::BOOL);
                Some(Box::new(w))
            }
            None => None,
        };

        if from.group.is_empty() {
            let yield_ty = match &from.yield_exp {
                Some(y) => {
                    let y = self.expr(&row_env, y)?;
                    let ty = y.ty.clone();
                    self.equate_ty(&node_ty, &Type::list(ty.clone()));
                    return Ok(core::Expr {
                        ty: Type::Var(v),
                        kind: core::ExprKind::From(core::FromCore {
                            sources,
                            filter,
                            group: Vec::new(),
                            compute: Vec::new(),
                            yield_exp: Some(Box::new(y)),
                        }),
                        pos,
                    });
                }
                None => default_row_type(&source_tys),
            };
            self.equate_ty(&node_ty, &Type::list(yield_ty));
            return Ok(core::Expr {
                ty: Type::Var(v),
                kind: core::ExprKind::From(core::FromCore {
                    sources,
                    filter,
                    group: Vec::new(),
                    compute: Vec::new(),
                    yield_exp: None,
                }),
                pos,
            });
        }

        // Grouped query: keys and aggregate arguments are typed in the row
        // environment; the aggregate function and the yield expression see
        // only the grouped bindings.
        let mut group = Vec::new();
        let mut group_env = env.clone();
        let mut group_tys: Vec<(String, Type)> = Vec::new();
        for key in &from.group {
            let exp = self.expr(&row_env, &key.exp)?;
            group_env = group_env.bind(&key.label, Binding::Val(Scheme::mono(exp.ty.clone())));
            group_tys.push((key.label.clone(), exp.ty.clone()));
            group.push((key.label.clone(), exp));
        }
        let mut compute = Vec::new();
        for agg in &from.compute {
            let agg_fn = self.expr(env, &agg.agg)?;
            let arg = self.expr(&row_env, &agg.arg)?;
            let result = self.fresh_ty();
            self.equate_ty(
                &agg_fn.ty,
                &Type::func(Type::list(arg.ty.clone()), result.clone()),
            );
            group_env = group_env.bind(&agg.label, Binding::Val(Scheme::mono(result.clone())));
            group_tys.push((agg.label.clone(), result));
            compute.push(core::ComputeItem {
                label: agg.label.clone(),
                agg: agg_fn,
                arg,
            });
        }
        let yield_exp = match &from.yield_exp {
            Some(y) => {
                let y = self.expr(&group_env, y)?;
                self.equate_ty(&node_ty, &Type::list(y.ty.clone()));
                Some(Box::new(y))
            }
            None => {
                let ty = default_row_type(&group_tys);
                self.equate_ty(&node_ty, &Type::list(ty));
                None
            }
        };
        Ok(core::Expr {
            ty: Type::Var(v),
            kind: core::ExprKind::From(core::FromCore {
                sources,
                filter,
                group,
                compute,
                yield_exp,
            }),
            pos,
        })
    }

    // ── Patterns ──

    fn pat(
        &mut self,
        env: &TypeEnv,
        pat: &ast::Pat,
        names: &mut Vec<(String, Type)>,
    ) -> Result<core::Pat, TypeError> {
        let pos = pat.pos();
        let v = self.fresh();
        let node_ty = Type::Var(v);
        let node = |kind| core::Pat {
            ty: Type::Var(v),
            kind,
            pos,
        };
        match pat {
            ast::Pat::Wildcard(_) => Ok(node(core::PatKind::Wildcard)),
            ast::Pat::Id(name, _) => match env.lookup(name) {
                Some(Binding::Con { data, index }) => {
                    if data.cons[*index].arg.is_some() {
                        return Err(TypeError::ConNeedsArg {
                            name: name.clone(),
                            pos,
                        });
                    }
                    let ty = self.instantiate(&con_scheme(data, *index));
                    self.equate_ty(&node_ty, &ty);
                    Ok(node(core::PatKind::Con {
                        name: name.clone(),
                        arg: None,
                    }))
                }
                _ => {
                    names.push((name.clone(), node_ty));
                    Ok(node(core::PatKind::Id(name.clone())))
                }
            },
            ast::Pat::Literal(lit, _) => {
                self.equate(Term::Var(v), Term::atom(literal_type(lit)));
                Ok(node(core::PatKind::Literal(lit.clone())))
            }
            ast::Pat::Tuple(items, _) => {
                let items: Vec<core::Pat> = items
                    .iter()
                    .map(|p| self.pat(env, p, names))
                    .collect::<Result<_, _>>()?;
                let term = Term::seq("tuple", items.iter().map(|p| type_to_term(&p.ty)).collect());
                self.equate(Term::Var(v), term);
                Ok(node(core::PatKind::Tuple(items)))
            }
            ast::Pat::List(items, _) => {
                let elem = self.fresh_ty();
                let items: Vec<core::Pat> = items
                    .iter()
                    .map(|p| self.pat(env, p, names))
                    .collect::<Result<_, _>>()?;
                for item in &items {
                    self.equate_ty(&item.ty, &elem);
                }
                self.equate_ty(&node_ty, &Type::list(elem));
                Ok(node(core::PatKind::List(items)))
            }
            ast::Pat::Record {
                fields,
                ellipsis,
                pos: _,
            } => {
                let fields: Vec<(String, core::Pat)> = fields
                    .iter()
                    .map(|(l, p)| Ok((l.clone(), self.pat(env, p, names)?)))
                    .collect::<Result<_, TypeError>>()?;
                if *ellipsis {
                    // Flex record: defer the field equations until the full
                    // label set is known.
                    let field_info: Vec<(String, Term)> = fields
                        .iter()
                        .map(|(l, p)| (l.clone(), type_to_term(&p.ty)))
                        .collect();
                    let labels = fields
                        .iter()
                        .map(|(l, _)| l.clone())
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.flex_sites.push((v, labels, pos));
                    self.actions.entry(v).or_default().push(Box::new(
                        move |_, term, eqs| {
                            for (label, field_term) in &field_info {
                                match term_field_index(term, label) {
                                    Some(i) => {
                                        if let Term::Seq { args, .. } = term {
                                            eqs.push((field_term.clone(), args[i].clone()));
                                        }
                                    }
                                    None => {
                                        return Err(UnifyFailure {
                                            left: Term::atom(&format!("record-with-{}", label)),
                                            right: term.clone(),
                                        })
                                    }
                                }
                            }
                            Ok(())
                        },
                    ));
                } else {
                    let op = record_op(fields.iter().map(|(l, _)| l.as_str()));
                    let term = Term::Seq {
                        op,
                        args: fields.iter().map(|(_, p)| type_to_term(&p.ty)).collect(),
                    };
                    self.equate(Term::Var(v), term);
                }
                let fields = fields
                    .into_iter()
                    .map(|(l, p)| (l, usize::MAX, p))
                    .collect();
                Ok(node(core::PatKind::Record {
                    fields,
                    ellipsis: *ellipsis,
                }))
            }
            ast::Pat::Con(name, arg, _) => {
                let (data, index) = match env.lookup(name) {
                    Some(Binding::Con { data, index }) => (data.clone(), *index),
                    Some(_) | None => {
                        return Err(TypeError::NotConstructor {
                            name: name.clone(),
                            pos,
                        })
                    }
                };
                if data.cons[index].arg.is_none() {
                    return Err(TypeError::ConNoArg {
                        name: name.clone(),
                        pos,
                    });
                }
                let fn_ty = self.instantiate(&con_scheme(&data, index));
                let arg_pat = self.pat(env, arg, names)?;
                self.equate_ty(
                    &fn_ty,
                    &Type::func(arg_pat.ty.clone(), node_ty.clone()),
                );
                Ok(node(core::PatKind::Con {
                    name: name.clone(),
                    arg: Some(Box::new(arg_pat)),
                }))
            }
            ast::Pat::Cons(head, tail, _) => {
                let head = self.pat(env, head, names)?;
                let tail = self.pat(env, tail, names)?;
                self.equate_ty(&tail.ty, &Type::list(head.ty.clone()));
                self.equate_ty(&node_ty, &tail.ty);
                Ok(node(core::PatKind::Cons(Box::new(head), Box::new(tail))))
            }
            ast::Pat::Layered(name, inner, _) => {
                let inner = self.pat(env, inner, names)?;
                self.equate_ty(&node_ty, &inner.ty);
                names.push((name.clone(), node_ty));
                Ok(node(core::PatKind::Layered(name.clone(), Box::new(inner))))
            }
            ast::Pat::Annotated(inner, ty_exp, _) => {
                let inner = self.pat(env, inner, names)?;
                let ty = self.resolve_type(env, ty_exp)?;
                self.equate_ty(&inner.ty, &ty);
                self.equate_ty(&node_ty, &inner.ty);
                Ok(core::Pat {
                    ty: Type::Var(v),
                    kind: inner.kind,
                    pos,
                })
            }
        }
    }

    fn add_selector_action(&mut self, arg: Var, res: Var, label: String) {
        self.actions
            .entry(arg)
            .or_default()
            .push(Box::new(move |_, term, eqs| {
                match term_field_index(term, &label) {
                    Some(i) => {
                        if let Term::Seq { args, .. } = term {
                            eqs.push((Term::Var(res), args[i].clone()));
                        }
                        Ok(())
                    }
                    None => Err(UnifyFailure {
                        left: Term::atom(&format!("record-with-{}", label)),
                        right: term.clone(),
                    }),
                }
            }));
    }

    // ── Type expressions ──

    fn resolve_type(&mut self, env: &TypeEnv, ty: &ast::TypeExp) -> Result<Type, TypeError> {
        let mut scoped = std::mem::take(&mut self.ty_vars);
        let result = self.resolve_type_with(env, ty, &mut scoped, true);
        self.ty_vars = scoped;
        result
    }

    fn resolve_type_with(
        &mut self,
        env: &TypeEnv,
        ty: &ast::TypeExp,
        vars: &mut HashMap<String, Type>,
        fresh_vars: bool,
    ) -> Result<Type, TypeError> {
        match ty {
            ast::TypeExp::Var(name, pos) => {
                if let Some(t) = vars.get(name) {
                    return Ok(t.clone());
                }
                if !fresh_vars {
                    return Err(TypeError::UnboundType {
                        name: format!("'{}", name),
                        pos: *pos,
                    });
                }
                let t = self.fresh_ty();
                vars.insert(name.clone(), t.clone());
                Ok(t)
            }
            ast::TypeExp::Con(name, args, pos) => {
                let args: Vec<Type> = args
                    .iter()
                    .map(|a| self.resolve_type_with(env, a, vars, fresh_vars))
                    .collect::<Result<_, _>>()?;
                if let Ok(prim) = PrimType::from_str(name) {
                    if !args.is_empty() {
                        return Err(TypeError::TyConArity {
                            name: name.clone(),
                            expected: 0,
                            actual: args.len(),
                            pos: *pos,
                        });
                    }
                    return Ok(Type::Prim(prim));
                }
                if name == "list" {
                    if args.len() != 1 {
                        return Err(TypeError::TyConArity {
                            name: name.clone(),
                            expected: 1,
                            actual: args.len(),
                            pos: *pos,
                        });
                    }
                    return Ok(Type::list(args.into_iter().next().unwrap()));
                }
                match env.tycon(name) {
                    Some(tycon) => {
                        let arity = tycon.arity();
                        if args.len() != arity {
                            return Err(TypeError::TyConArity {
                                name: name.clone(),
                                expected: arity,
                                actual: args.len(),
                                pos: *pos,
                            });
                        }
                        Ok(Type::Data {
                            name: name.clone(),
                            args,
                        })
                    }
                    None => Err(TypeError::UnboundType {
                        name: name.clone(),
                        pos: *pos,
                    }),
                }
            }
            ast::TypeExp::Tuple(items, _) => {
                let items = items
                    .iter()
                    .map(|t| self.resolve_type_with(env, t, vars, fresh_vars))
                    .collect::<Result<_, _>>()?;
                Ok(Type::Tuple(items))
            }
            ast::TypeExp::Fn(dom, cod, _) => Ok(Type::func(
                self.resolve_type_with(env, dom, vars, fresh_vars)?,
                self.resolve_type_with(env, cod, vars, fresh_vars)?,
            )),
            ast::TypeExp::Record(fields, _) => {
                let fields = fields
                    .iter()
                    .map(|(l, t)| {
                        Ok((
                            l.clone(),
                            self.resolve_type_with(env, t, vars, fresh_vars)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, TypeError>>()?;
                Ok(Type::record(fields))
            }
        }
    }
}

fn rec_pat_name(pat: &ast::Pat) -> Option<&str> {
    match pat {
        ast::Pat::Id(name, _) => Some(name),
        ast::Pat::Annotated(inner, _, _) => rec_pat_name(inner),
        _ => None,
    }
}

fn fn_tower(pats: Vec<ast::Pat>, body: ast::Expr) -> ast::Expr {
    let mut exp = body;
    for pat in pats.into_iter().rev() {
        let pos = pat.pos().plus(exp.pos());
        exp = ast::Expr::Fn(
            vec![ast::MatchRule {
                pat,
                exp,
                pos,
            }],
            pos,
        );
    }
    exp
}

fn literal_type(lit: &Literal) -> &'static str {
    match lit {
        Literal::Int(_) => "int",
        Literal::Real(_) => "real",
        Literal::Str(_) => "string",
        Literal::Char(_) => "char",
        Literal::Bool(_) => "bool",
        Literal::Unit => "unit",
    }
}

/// The default yield of an un-yielded query: the sole binding's value when
/// there is exactly one, otherwise the row record.
fn default_row_type(bindings: &[(String, Type)]) -> Type {
    if bindings.len() == 1 {
        bindings[0].1.clone()
    } else {
        Type::record(bindings.to_vec())
    }
}

// ── Resolution pass: apply the substitution to the core tree ──

fn finish_decl(decl: core::Decl, subst: &Subst) -> Result<core::Decl, TypeError> {
    Ok(match decl {
        core::Decl::Val { binds } => core::Decl::Val {
            binds: binds
                .into_iter()
                .map(|b| {
                    Ok(core::ValBind {
                        rec: b.rec,
                        pat: finish_pat(b.pat, subst)?,
                        exp: finish_expr(b.exp, subst)?,
                    })
                })
                .collect::<Result<_, TypeError>>()?,
        },
        d @ core::Decl::Datatype(_) => d,
    })
}

fn finish_expr(exp: core::Expr, subst: &Subst) -> Result<core::Expr, TypeError> {
    let ty = subst_type(subst, &exp.ty);
    let pos = exp.pos;
    let kind = match exp.kind {
        core::ExprKind::Selector { label, .. } => {
            let slot = match &ty {
                Type::Fn(dom, _) => dom
                    .field_labels()
                    .and_then(|labels| labels.iter().position(|l| l == &label)),
                _ => None,
            };
            let slot = slot.ok_or_else(|| TypeError::FlexRecord {
                fields: label.clone(),
                pos,
            })?;
            core::ExprKind::Selector { label, slot }
        }
        core::ExprKind::Apply { func, arg } => core::ExprKind::Apply {
            func: Box::new(finish_expr(*func, subst)?),
            arg: Box::new(finish_expr(*arg, subst)?),
        },
        core::ExprKind::Tuple(items) => core::ExprKind::Tuple(
            items
                .into_iter()
                .map(|e| finish_expr(e, subst))
                .collect::<Result<_, _>>()?,
        ),
        core::ExprKind::List(items) => core::ExprKind::List(
            items
                .into_iter()
                .map(|e| finish_expr(e, subst))
                .collect::<Result<_, _>>()?,
        ),
        core::ExprKind::Record(fields) => core::ExprKind::Record(
            fields
                .into_iter()
                .map(|(l, e)| Ok((l, finish_expr(e, subst)?)))
                .collect::<Result<_, TypeError>>()?,
        ),
        core::ExprKind::Let { decls, body } => core::ExprKind::Let {
            decls: decls
                .into_iter()
                .map(|d| finish_decl(d, subst))
                .collect::<Result<_, _>>()?,
            body: Box::new(finish_expr(*body, subst)?),
        },
        core::ExprKind::If(c, t, e) => core::ExprKind::If(
            Box::new(finish_expr(*c, subst)?),
            Box::new(finish_expr(*t, subst)?),
            Box::new(finish_expr(*e, subst)?),
        ),
        core::ExprKind::Case { scrutinee, rules } => core::ExprKind::Case {
            scrutinee: Box::new(finish_expr(*scrutinee, subst)?),
            rules: finish_rules(rules, subst)?,
        },
        core::ExprKind::Fn { rules } => core::ExprKind::Fn {
            rules: finish_rules(rules, subst)?,
        },
        core::ExprKind::AndAlso(a, b) => core::ExprKind::AndAlso(
            Box::new(finish_expr(*a, subst)?),
            Box::new(finish_expr(*b, subst)?),
        ),
        core::ExprKind::OrElse(a, b) => core::ExprKind::OrElse(
            Box::new(finish_expr(*a, subst)?),
            Box::new(finish_expr(*b, subst)?),
        ),
        core::ExprKind::Binary { op, lhs, rhs } => core::ExprKind::Binary {
            op,
            lhs: Box::new(finish_expr(*lhs, subst)?),
            rhs: Box::new(finish_expr(*rhs, subst)?),
        },
        core::ExprKind::Negate(e) => core::ExprKind::Negate(Box::new(finish_expr(*e, subst)?)),
        core::ExprKind::From(from) => core::ExprKind::From(core::FromCore {
            sources: from
                .sources
                .into_iter()
                .map(|(n, e)| Ok((n, finish_expr(e, subst)?)))
                .collect::<Result<_, TypeError>>()?,
            filter: match from.filter {
                Some(e) => Some(Box::new(finish_expr(*e, subst)?)),
                None => None,
            },
            group: from
                .group
                .into_iter()
                .map(|(l, e)| Ok((l, finish_expr(e, subst)?)))
                .collect::<Result<_, TypeError>>()?,
            compute: from
                .compute
                .into_iter()
                .map(|item| {
                    Ok(core::ComputeItem {
                        label: item.label,
                        agg: finish_expr(item.agg, subst)?,
                        arg: finish_expr(item.arg, subst)?,
                    })
                })
                .collect::<Result<_, TypeError>>()?,
            yield_exp: match from.yield_exp {
                Some(e) => Some(Box::new(finish_expr(*e, subst)?)),
                None => None,
            },
        }),
        kind @ (core::ExprKind::Literal(_) | core::ExprKind::Id(_)) => kind,
    };
    Ok(core::Expr { ty, kind, pos })
}

fn finish_rules(rules: Vec<core::Rule>, subst: &Subst) -> Result<Vec<core::Rule>, TypeError> {
    rules
        .into_iter()
        .map(|r| {
            Ok(core::Rule {
                pat: finish_pat(r.pat, subst)?,
                exp: finish_expr(r.exp, subst)?,
            })
        })
        .collect()
}

fn finish_pat(pat: core::Pat, subst: &Subst) -> Result<core::Pat, TypeError> {
    let ty = subst_type(subst, &pat.ty);
    let pos = pat.pos;
    let kind = match pat.kind {
        core::PatKind::Tuple(items) => core::PatKind::Tuple(
            items
                .into_iter()
                .map(|p| finish_pat(p, subst))
                .collect::<Result<_, _>>()?,
        ),
        core::PatKind::List(items) => core::PatKind::List(
            items
                .into_iter()
                .map(|p| finish_pat(p, subst))
                .collect::<Result<_, _>>()?,
        ),
        core::PatKind::Record { fields, ellipsis } => {
            let labels = ty.field_labels().ok_or(TypeError::FlexRecord {
                fields: fields
                    .iter()
                    .map(|(l, _, _)| l.clone())
                    .collect::<Vec<_>>()
                    .join(", "),
                pos,
            })?;
            let fields = fields
                .into_iter()
                .map(|(label, _, p)| {
                    let slot =
                        labels
                            .iter()
                            .position(|l| l == &label)
                            .ok_or(TypeError::FlexRecord {
                                fields: label.clone(),
                                pos,
                            })?;
                    Ok((label, slot, finish_pat(p, subst)?))
                })
                .collect::<Result<_, TypeError>>()?;
            core::PatKind::Record { fields, ellipsis }
        }
        core::PatKind::Con { name, arg } => core::PatKind::Con {
            name,
            arg: match arg {
                Some(p) => Some(Box::new(finish_pat(*p, subst)?)),
                None => None,
            },
        },
        core::PatKind::Cons(h, t) => core::PatKind::Cons(
            Box::new(finish_pat(*h, subst)?),
            Box::new(finish_pat(*t, subst)?),
        ),
        core::PatKind::Layered(name, p) => {
            core::PatKind::Layered(name, Box::new(finish_pat(*p, subst)?))
        }
        kind @ (core::PatKind::Wildcard | core::PatKind::Id(_) | core::PatKind::Literal(_)) => kind,
    };
    Ok(core::Pat { ty, kind, pos })
}

// ── Coverage ──

fn collect_match_warnings(decl: &core::Decl, env: &TypeEnv, out: &mut Vec<TypeError>) {
    if let core::Decl::Val { binds } = decl {
        for bind in binds {
            walk_expr_warnings(&bind.exp, env, out);
        }
    }
}

fn walk_expr_warnings(exp: &core::Expr, env: &TypeEnv, out: &mut Vec<TypeError>) {
    match &exp.kind {
        core::ExprKind::Case { scrutinee, rules } => {
            walk_expr_warnings(scrutinee, env, out);
            out.extend(coverage::check_match(rules, env, exp.pos));
            for r in rules {
                walk_expr_warnings(&r.exp, env, out);
            }
        }
        core::ExprKind::Fn { rules } => {
            out.extend(coverage::check_match(rules, env, exp.pos));
            for r in rules {
                walk_expr_warnings(&r.exp, env, out);
            }
        }
        core::ExprKind::Apply { func, arg } => {
            walk_expr_warnings(func, env, out);
            walk_expr_warnings(arg, env, out);
        }
        core::ExprKind::Tuple(items) | core::ExprKind::List(items) => {
            for e in items {
                walk_expr_warnings(e, env, out);
            }
        }
        core::ExprKind::Record(fields) => {
            for (_, e) in fields {
                walk_expr_warnings(e, env, out);
            }
        }
        core::ExprKind::Let { decls, body } => {
            for d in decls {
                collect_match_warnings(d, env, out);
            }
            walk_expr_warnings(body, env, out);
        }
        core::ExprKind::If(c, t, e) => {
            walk_expr_warnings(c, env, out);
            walk_expr_warnings(t, env, out);
            walk_expr_warnings(e, env, out);
        }
        core::ExprKind::AndAlso(a, b)
        | core::ExprKind::OrElse(a, b)
        | core::ExprKind::Binary { lhs: a, rhs: b, .. } => {
            walk_expr_warnings(a, env, out);
            walk_expr_warnings(b, env, out);
        }
        core::ExprKind::Negate(e) => walk_expr_warnings(e, env, out),
        core::ExprKind::From(from) => {
            for (_, e) in &from.sources {
                walk_expr_warnings(e, env, out);
            }
            if let Some(e) = &from.filter {
                walk_expr_warnings(e, env, out);
            }
            for (_, e) in &from.group {
                walk_expr_warnings(e, env, out);
            }
            for item in &from.compute {
                walk_expr_warnings(&item.agg, env, out);
                walk_expr_warnings(&item.arg, env, out);
            }
            if let Some(e) = &from.yield_exp {
                walk_expr_warnings(e, env, out);
            }
        }
        core::ExprKind::Literal(_) | core::ExprKind::Id(_) | core::ExprKind::Selector { .. } => {}
    }
}
