//! Runtime-mutable session properties.

use crate::value::{EvalError, Value};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum PropName {
    Hybrid,
    InlinePassCount,
    LineWidth,
    MatchCoverageEnabled,
    Output,
    PrintDepth,
    PrintLength,
    StringDepth,
}

#[derive(Debug, Clone)]
pub struct Props {
    pub hybrid: bool,
    pub inline_pass_count: i64,
    pub line_width: i64,
    pub match_coverage_enabled: bool,
    pub output: String,
    pub print_depth: i64,
    pub print_length: i64,
    pub string_depth: i64,
}

impl Default for Props {
    fn default() -> Self {
        Self {
            hybrid: false,
            inline_pass_count: 5,
            line_width: 79,
            match_coverage_enabled: true,
            output: "classic".to_string(),
            print_depth: 5,
            print_length: 12,
            string_depth: 70,
        }
    }
}

impl Props {
    fn parse_name(name: &str) -> Result<PropName, EvalError> {
        PropName::from_str(name)
            .map_err(|_| EvalError::DomainError(format!("unknown property {}", name)))
    }

    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), EvalError> {
        let prop = Self::parse_name(name)?;
        match prop {
            PropName::Hybrid => self.hybrid = expect_bool(name, value)?,
            PropName::InlinePassCount => self.inline_pass_count = expect_int(name, value)?,
            PropName::LineWidth => self.line_width = expect_int(name, value)?,
            PropName::MatchCoverageEnabled => {
                self.match_coverage_enabled = expect_bool(name, value)?
            }
            PropName::Output => self.output = expect_str(name, value)?,
            PropName::PrintDepth => self.print_depth = expect_int(name, value)?,
            PropName::PrintLength => self.print_length = expect_int(name, value)?,
            PropName::StringDepth => self.string_depth = expect_int(name, value)?,
        }
        Ok(())
    }

    pub fn show(&self, name: &str) -> Result<Option<String>, EvalError> {
        let prop = Self::parse_name(name)?;
        Ok(Some(self.get(prop)))
    }

    pub fn unset(&mut self, name: &str) -> Result<(), EvalError> {
        let prop = Self::parse_name(name)?;
        let defaults = Props::default();
        match prop {
            PropName::Hybrid => self.hybrid = defaults.hybrid,
            PropName::InlinePassCount => self.inline_pass_count = defaults.inline_pass_count,
            PropName::LineWidth => self.line_width = defaults.line_width,
            PropName::MatchCoverageEnabled => {
                self.match_coverage_enabled = defaults.match_coverage_enabled
            }
            PropName::Output => self.output = defaults.output,
            PropName::PrintDepth => self.print_depth = defaults.print_depth,
            PropName::PrintLength => self.print_length = defaults.print_length,
            PropName::StringDepth => self.string_depth = defaults.string_depth,
        }
        Ok(())
    }

    fn get(&self, prop: PropName) -> String {
        match prop {
            PropName::Hybrid => self.hybrid.to_string(),
            PropName::InlinePassCount => self.inline_pass_count.to_string(),
            PropName::LineWidth => self.line_width.to_string(),
            PropName::MatchCoverageEnabled => self.match_coverage_enabled.to_string(),
            PropName::Output => self.output.clone(),
            PropName::PrintDepth => self.print_depth.to_string(),
            PropName::PrintLength => self.print_length.to_string(),
            PropName::StringDepth => self.string_depth.to_string(),
        }
    }

    pub fn show_all(&self) -> Vec<(String, String)> {
        use strum::IntoEnumIterator;
        PropName::iter()
            .map(|p| (p.to_string(), self.get(p)))
            .collect()
    }
}

fn expect_bool(name: &str, value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(EvalError::DomainError(format!(
            "property {} expects a bool",
            name
        ))),
    }
}

fn expect_int(name: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        _ => Err(EvalError::DomainError(format!(
            "property {} expects an int",
            name
        ))),
    }
}

fn expect_str(name: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(EvalError::DomainError(format!(
            "property {} expects a string",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference() {
        let props = Props::default();
        assert!(!props.hybrid);
        assert_eq!(props.inline_pass_count, 5);
        assert_eq!(props.line_width, 79);
        assert!(props.match_coverage_enabled);
        assert_eq!(props.output, "classic");
        assert_eq!(props.print_depth, 5);
        assert_eq!(props.print_length, 12);
        assert_eq!(props.string_depth, 70);
    }

    #[test]
    fn set_show_unset() {
        let mut props = Props::default();
        props.set("printLength", &Value::Int(3)).unwrap();
        assert_eq!(props.show("printLength").unwrap(), Some("3".to_string()));
        props.unset("printLength").unwrap();
        assert_eq!(props.show("printLength").unwrap(), Some("12".to_string()));
        assert!(props.set("nope", &Value::Int(1)).is_err());
        assert!(props.set("lineWidth", &Value::Bool(true)).is_err());
    }
}
