//! Morel compiler front end.
//!
//! Transforms ML statements into a typed core tree: lexing and parsing to
//! the AST, Hindley–Milner type inference over first-order unification, and
//! the `fun`/constructor/selector rewrites that produce the core form the
//! runtime evaluates.

pub mod compiler;

pub use compiler::ast;
pub use compiler::core;
pub use compiler::infer::{self, Inferred, TypeEnv, TypeError};
pub use compiler::parser::{
    parse_decl, parse_expression, parse_literal, parse_statement, ParseError,
};
pub use compiler::types::{DataDef, PrimType, Scheme, Type};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

/// Parse and infer one statement against an environment. Returns the typed
/// core declaration, the names it binds, and the environment that follows.
pub fn compile_statement(
    text: &str,
    env: &TypeEnv,
    coverage_enabled: bool,
) -> Result<Inferred, CompileError> {
    let decl = parse_statement(text)?;
    let inferred = infer::infer_statement(&decl, env, coverage_enabled)?;
    Ok(inferred)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_of(source: &str) -> String {
        let env = TypeEnv::initial();
        let inferred = compile_statement(source, &env, false).expect("inference failure");
        inferred.bindings[0].1.to_string()
    }

    #[test]
    fn infer_arithmetic() {
        assert_eq!(type_of("1 + 2"), "int");
        assert_eq!(type_of("1.0 + ~2.0"), "real");
        assert_eq!(type_of("\"a\" ^ \"b\""), "string");
        assert_eq!(type_of("true andalso false"), "bool");
    }

    #[test]
    fn infer_functions() {
        assert_eq!(type_of("fn x => x + 1"), "int -> int");
        assert_eq!(type_of("fn x => fn y => x + y"), "int -> int -> int");
        assert_eq!(type_of("fn x => x"), "'a -> 'a");
    }

    #[test]
    fn infer_recursion() {
        assert_eq!(
            type_of("let val rec f = fn n => if n = 0 then 1 else n * f (n - 1) in f 5 end"),
            "int"
        );
    }

    #[test]
    fn infer_selector() {
        assert_eq!(type_of("#b {a = 1, b = true}"), "bool");
    }

    #[test]
    fn unresolved_flex_record_fails() {
        let env = TypeEnv::initial();
        let err = compile_statement("fn {a = x, ...} => x", &env, false).expect_err("flex");
        assert!(err.to_string().contains("unresolved flex record"));
    }

    #[test]
    fn unbound_identifier_fails() {
        let env = TypeEnv::initial();
        let err = compile_statement("x + 1", &env, false).expect_err("unbound");
        assert!(err.to_string().contains("unbound"));
    }

    #[test]
    fn rec_binding_must_be_fn() {
        let env = TypeEnv::initial();
        let err = compile_statement("val rec x = 1", &env, false).expect_err("rec");
        assert!(err.to_string().contains("recursive binding"));
    }
}
