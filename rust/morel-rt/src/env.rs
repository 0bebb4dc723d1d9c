//! Chained, immutable evaluation environments.
//!
//! Each frame binds one name; lookup walks newest-first. The single mutable
//! exception is the `val rec` placeholder cell, which is written exactly
//! once when the recursive closure has been built.

use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct EvalEnv(Option<Rc<Frame>>);

#[derive(Debug)]
struct Frame {
    parent: EvalEnv,
    name: String,
    slot: Slot,
}

#[derive(Debug)]
enum Slot {
    Value(Value),
    Rec(RefCell<Option<Value>>),
}

impl EvalEnv {
    pub fn empty() -> EvalEnv {
        EvalEnv(None)
    }

    pub fn bind(&self, name: &str, value: Value) -> EvalEnv {
        EvalEnv(Some(Rc::new(Frame {
            parent: self.clone(),
            name: name.to_string(),
            slot: Slot::Value(value),
        })))
    }

    /// Bind `name` to an unfilled recursive cell; `patch` writes it.
    pub fn bind_rec(&self, name: &str) -> EvalEnv {
        EvalEnv(Some(Rc::new(Frame {
            parent: self.clone(),
            name: name.to_string(),
            slot: Slot::Rec(RefCell::new(None)),
        })))
    }

    /// Back-patch the newest recursive cell bound to `name`.
    pub fn patch(&self, name: &str, value: Value) {
        let mut frame = self.0.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                if let Slot::Rec(cell) = &f.slot {
                    *cell.borrow_mut() = Some(value);
                }
                return;
            }
            frame = f.parent.0.as_deref();
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut frame = self.0.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                return match &f.slot {
                    Slot::Value(v) => Some(v.clone()),
                    Slot::Rec(cell) => cell.borrow().clone(),
                };
            }
            frame = f.parent.0.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_frame_shadows() {
        let env = EvalEnv::empty().bind("x", Value::Int(1)).bind("x", Value::Int(2));
        assert!(matches!(env.lookup("x"), Some(Value::Int(2))));
    }

    #[test]
    fn parent_frames_remain_visible() {
        let env = EvalEnv::empty().bind("x", Value::Int(1));
        let child = env.bind("y", Value::Int(2));
        assert!(matches!(child.lookup("x"), Some(Value::Int(1))));
        assert!(matches!(env.lookup("y"), None));
    }

    #[test]
    fn rec_cell_resolves_after_patch() {
        let env = EvalEnv::empty().bind_rec("f");
        assert!(env.lookup("f").is_none());
        env.patch("f", Value::Int(42));
        assert!(matches!(env.lookup("f"), Some(Value::Int(42))));
    }
}
