//! First-order unification (Martelli–Montanari) with occurs check and
//! deferred per-variable actions.

use std::collections::{HashMap, VecDeque};
use std::fmt;

pub type Var = u32;

/// A term is a variable or a sequence `op(t₁, …, tₙ)`; a nullary sequence is
/// an atom identified by its operator string.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(Var),
    Seq { op: String, args: Vec<Term> },
}

impl Term {
    pub fn atom(op: &str) -> Term {
        Term::Seq {
            op: op.to_string(),
            args: Vec::new(),
        }
    }

    pub fn seq(op: &str, args: Vec<Term>) -> Term {
        Term::Seq {
            op: op.to_string(),
            args,
        }
    }

    pub fn contains(&self, v: Var) -> bool {
        match self {
            Term::Var(w) => *w == v,
            Term::Seq { args, .. } => args.iter().any(|t| t.contains(v)),
        }
    }

    fn replace(&self, v: Var, t: &Term) -> Term {
        match self {
            Term::Var(w) if *w == v => t.clone(),
            Term::Var(w) => Term::Var(*w),
            Term::Seq { op, args } => Term::Seq {
                op: op.clone(),
                args: args.iter().map(|a| a.replace(v, t)).collect(),
            },
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "T{}", v),
            Term::Seq { op, args } => {
                if args.is_empty() {
                    write!(f, "{}", op)
                } else {
                    write!(f, "{}(", op)?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}

/// An acyclic, fully resolved mapping from variables to terms. Applying a
/// solved substitution twice is a no-op.
#[derive(Debug, Default)]
pub struct Subst {
    map: HashMap<Var, Term>,
}

impl Subst {
    pub fn get(&self, v: Var) -> Option<&Term> {
        self.map.get(&v)
    }

    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Var(v) => match self.map.get(v) {
                Some(t) => t.clone(),
                None => Term::Var(*v),
            },
            Term::Seq { op, args } => Term::Seq {
                op: op.clone(),
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
        }
    }

    /// Bind `v` to `t`, keeping every stored term fully resolved.
    pub fn insert(&mut self, v: Var, t: Term) {
        for val in self.map.values_mut() {
            *val = val.replace(v, &t);
        }
        self.map.insert(v, t);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The first pair of terms that could not be reconciled.
#[derive(Debug, Clone)]
pub struct UnifyFailure {
    pub left: Term,
    pub right: Term,
}

impl fmt::Display for UnifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot unify {} with {}", self.left, self.right)
    }
}

/// A deferred action, run once its variable has been resolved. Receives the
/// variable, the term it was unified with, and may append new equations.
pub type Action = Box<dyn FnMut(Var, &Term, &mut Vec<(Term, Term)>) -> Result<(), UnifyFailure>>;

pub fn unify(
    equations: Vec<(Term, Term)>,
    mut actions: HashMap<Var, Vec<Action>>,
) -> Result<Subst, UnifyFailure> {
    let mut work: VecDeque<(Term, Term)> = equations.into();
    let mut subst = Subst::default();
    loop {
        solve(&mut work, &mut subst)?;
        // Actions fire once their variable has resolved to a compound term;
        // a variable still chained to a free variable stays pending (the
        // caller decides what an unresolved site means). Equations an action
        // appends go through another round of solving.
        let ready: Vec<Var> = actions
            .keys()
            .copied()
            .filter(|v| matches!(subst.apply(&Term::Var(*v)), Term::Seq { .. }))
            .collect();
        if ready.is_empty() {
            return Ok(subst);
        }
        let mut appended = Vec::new();
        for v in ready {
            let term = subst.apply(&Term::Var(v));
            if let Some(list) = actions.remove(&v) {
                for mut action in list {
                    action(v, &term, &mut appended)?;
                }
            }
        }
        if appended.is_empty() {
            return Ok(subst);
        }
        work.extend(appended);
    }
}

fn solve(work: &mut VecDeque<(Term, Term)>, subst: &mut Subst) -> Result<(), UnifyFailure> {
    while let Some((left, right)) = work.pop_front() {
        let left = subst.apply(&left);
        let right = subst.apply(&right);
        match (left, right) {
            (Term::Var(a), Term::Var(b)) if a == b => {}
            (Term::Var(v), t) | (t, Term::Var(v)) => {
                if t.contains(v) {
                    return Err(UnifyFailure {
                        left: Term::Var(v),
                        right: t,
                    });
                }
                subst.insert(v, t);
            }
            (
                Term::Seq {
                    op: lop,
                    args: largs,
                },
                Term::Seq {
                    op: rop,
                    args: rargs,
                },
            ) => {
                if lop != rop || largs.len() != rargs.len() {
                    return Err(UnifyFailure {
                        left: Term::Seq {
                            op: lop,
                            args: largs,
                        },
                        right: Term::Seq {
                            op: rop,
                            args: rargs,
                        },
                    });
                }
                for pair in largs.into_iter().zip(rargs) {
                    work.push_back(pair);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(v: Var) -> Term {
        Term::Var(v)
    }

    #[test]
    fn variable_binds_to_term() {
        let t = Term::seq("f", vec![Term::atom("int")]);
        let subst = unify(vec![(var(0), t.clone())], HashMap::new()).expect("solvable");
        assert_eq!(subst.len(), 1);
        assert_eq!(subst.get(0), Some(&t));
    }

    #[test]
    fn decompose_binds_componentwise() {
        let left = Term::seq("f", vec![var(0), Term::atom("int")]);
        let right = Term::seq("f", vec![Term::atom("bool"), var(1)]);
        let subst = unify(vec![(left, right)], HashMap::new()).expect("solvable");
        assert_eq!(subst.get(0), Some(&Term::atom("bool")));
        assert_eq!(subst.get(1), Some(&Term::atom("int")));
    }

    #[test]
    fn occurs_check_fails() {
        let right = Term::seq("f", vec![var(0)]);
        assert!(unify(vec![(var(0), right)], HashMap::new()).is_err());
    }

    #[test]
    fn operator_mismatch_fails() {
        let err = unify(
            vec![(Term::atom("int"), Term::atom("bool"))],
            HashMap::new(),
        )
        .expect_err("unsolvable");
        assert_eq!(err.left, Term::atom("int"));
        assert_eq!(err.right, Term::atom("bool"));
    }

    #[test]
    fn solved_substitution_is_idempotent() {
        let left = Term::seq("f", vec![var(0), var(1)]);
        let right = Term::seq("f", vec![var(1), Term::atom("int")]);
        let subst = unify(vec![(left, right)], HashMap::new()).expect("solvable");
        let term = Term::seq("g", vec![var(0), var(1), Term::atom("bool")]);
        let once = subst.apply(&term);
        let twice = subst.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn chained_variables_resolve_fully() {
        let subst = unify(
            vec![(var(0), var(1)), (var(1), Term::atom("int"))],
            HashMap::new(),
        )
        .expect("solvable");
        assert_eq!(subst.apply(&var(0)), Term::atom("int"));
        assert_eq!(subst.apply(&var(1)), Term::atom("int"));
    }

    #[test]
    fn action_appends_equations() {
        // When T0 resolves to a record, equate T1 with its second field.
        let mut actions: HashMap<Var, Vec<Action>> = HashMap::new();
        actions.insert(
            0,
            vec![Box::new(|_, term, eqs| {
                if let Term::Seq { args, .. } = term {
                    eqs.push((Term::Var(1), args[1].clone()));
                }
                Ok(())
            })],
        );
        let record = Term::seq("record:a:b", vec![Term::atom("int"), Term::atom("bool")]);
        let subst = unify(vec![(var(0), record)], actions).expect("solvable");
        assert_eq!(subst.apply(&var(1)), Term::atom("bool"));
    }
}
