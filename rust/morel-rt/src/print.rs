//! Value printing in re-parseable ML syntax.
//!
//! `printLength` limits list and record elements, `printDepth` limits
//! nesting, `stringDepth` truncates strings. Elided content prints as `...`
//! or `#`, matching the classic ML top level.

use crate::props::Props;
use crate::value::Value;
use morel_compiler::ast::{escape_string, format_real};

pub fn print_value(value: &Value, props: &Props) -> String {
    let mut out = String::new();
    print(value, props, props.print_depth, false, &mut out);
    out
}

fn print(value: &Value, props: &Props, depth: i64, atom: bool, out: &mut String) {
    if depth < 0 {
        out.push('#');
        return;
    }
    match value {
        Value::Int(n) => {
            if *n < 0 {
                out.push('~');
                out.push_str(&n.unsigned_abs().to_string());
            } else {
                out.push_str(&n.to_string());
            }
        }
        Value::Real(v) => out.push_str(&format_real(*v)),
        Value::Str(s) => {
            let truncated: String = if props.string_depth >= 0
                && s.chars().count() > props.string_depth as usize
            {
                let mut t: String = s.chars().take(props.string_depth as usize).collect();
                t.push('#');
                t
            } else {
                s.clone()
            };
            out.push('"');
            out.push_str(&escape_string(&truncated));
            out.push('"');
        }
        Value::Char(c) => {
            out.push_str("#\"");
            out.push_str(&escape_string(&c.to_string()));
            out.push('"');
        }
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Unit => out.push_str("()"),
        Value::List(items) => {
            out.push('[');
            print_items(items, props, depth, out);
            out.push(']');
        }
        Value::Record { labels, values } => {
            if is_tuple(labels) {
                out.push('(');
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    print(v, props, depth - 1, false, out);
                }
                out.push(')');
            } else {
                out.push('{');
                let mut count = 0;
                for (label, v) in labels.iter().zip(values) {
                    if count > 0 {
                        out.push(',');
                    }
                    if props.print_length >= 0 && count >= props.print_length {
                        out.push_str("...");
                        break;
                    }
                    out.push_str(label);
                    out.push('=');
                    print(v, props, depth - 1, false, out);
                    count += 1;
                }
                out.push('}');
            }
        }
        Value::Data(name, payload) => match payload {
            None => out.push_str(name),
            Some(v) => {
                if atom {
                    out.push('(');
                }
                out.push_str(name);
                out.push(' ');
                print(v, props, depth - 1, true, out);
                if atom {
                    out.push(')');
                }
            }
        },
        Value::Ctor(_) | Value::Selector(_) | Value::Builtin(..) | Value::Closure(_) => {
            out.push_str("fn")
        }
    }
}

fn print_items(items: &[Value], props: &Props, depth: i64, out: &mut String) {
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if props.print_length >= 0 && i as i64 >= props.print_length {
            out.push_str("...");
            return;
        }
        print(v, props, depth - 1, false, out);
    }
}

fn is_tuple(labels: &[String]) -> bool {
    labels.len() >= 2
        && labels
            .iter()
            .enumerate()
            .all(|(i, l)| l == &(i + 1).to_string())
}

/// Greedy wrap at spaces for terminal output.
pub fn wrap(text: &str, width: usize) -> String {
    if width == 0 || text.len() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut line_len = 0;
    for word in text.split(' ') {
        if line_len > 0 && line_len + 1 + word.len() > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += word.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn props() -> Props {
        Props::default()
    }

    #[test]
    fn scalars() {
        assert_eq!(print_value(&Value::Int(-7), &props()), "~7");
        assert_eq!(print_value(&Value::Real(1.0), &props()), "1.0");
        assert_eq!(print_value(&Value::Str("ab".into()), &props()), "\"ab\"");
        assert_eq!(print_value(&Value::Char('x'), &props()), "#\"x\"");
        assert_eq!(print_value(&Value::Unit, &props()), "()");
    }

    #[test]
    fn collections() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(print_value(&list, &props()), "[1,2]");
        let tuple = Value::tuple(vec![Value::Int(1), Value::Bool(true)]);
        assert_eq!(print_value(&tuple, &props()), "(1,true)");
        let record = Value::Record {
            labels: Rc::new(vec!["a".to_string(), "b".to_string()]),
            values: vec![Value::Int(2), Value::Int(1)],
        };
        assert_eq!(print_value(&record, &props()), "{a=2,b=1}");
    }

    #[test]
    fn print_length_elides() {
        let mut p = props();
        p.print_length = 2;
        let list = Value::List((1..=5).map(Value::Int).collect());
        assert_eq!(print_value(&list, &p), "[1,2,...]");
    }

    #[test]
    fn print_depth_elides() {
        let mut p = props();
        p.print_depth = 1;
        let nested = Value::List(vec![Value::List(vec![Value::Int(1)])]);
        assert_eq!(print_value(&nested, &p), "[[#]]");
    }

    #[test]
    fn string_depth_truncates() {
        let mut p = props();
        p.string_depth = 3;
        let s = Value::Str("abcdef".to_string());
        assert_eq!(print_value(&s, &p), "\"abc#\"");
    }

    #[test]
    fn constructors() {
        let v = Value::option(Some(Value::Int(1)));
        assert_eq!(print_value(&v, &props()), "SOME 1");
        let nested = Value::option(Some(Value::option(Some(Value::Int(1)))));
        assert_eq!(print_value(&nested, &props()), "SOME (SOME 1)");
    }
}
