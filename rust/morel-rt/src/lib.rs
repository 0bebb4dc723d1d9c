//! Morel runtime — compiles the typed core tree to a `Code` tree and
//! evaluates it against chained immutable environments, with the built-in
//! library, the value printer, and the persistent session.

pub mod builtins;
pub mod code;
pub mod compile;
pub mod env;
pub mod print;
pub mod props;
pub mod session;
pub mod value;

pub use props::Props;
pub use session::{BindingKind, BindingResult, MorelError, Session, StatementResult};
pub use value::{EvalError, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_has_an_implementation_or_constant() {
        let mut ctx = code::EvalContext::default();
        for builtin in morel_compiler::compiler::builtin::built_ins() {
            if builtins::constant_value(builtin.name).is_some() {
                continue;
            }
            let arity = builtins::arity(builtin.name);
            assert!(arity >= 1, "{} has zero arity", builtin.name);
            // Saturating with garbage must reach the implementation, not
            // fall through to "no built-in named".
            let args = vec![Value::Unit; arity];
            match builtins::exec(builtin.name, args, &mut ctx) {
                Err(EvalError::Internal(msg)) => {
                    assert!(
                        !msg.starts_with("no built-in named"),
                        "missing implementation: {}",
                        builtin.name
                    );
                }
                _ => {}
            }
        }
    }
}
