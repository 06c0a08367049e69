//! Conditions gating optional parts of a TRE
//!
//! The grammar is matched by plain substring search, in this order:
//!
//! | Form          | Holds when                                              |
//! |---------------|---------------------------------------------------------|
//! | `A AND B`     | both `A` and `B` hold (exactly two operands)            |
//! | `NAME!=`      | `NAME` is bound and its trimmed value is not empty      |
//! | `NAME!=VALUE` | the raw value of `NAME` differs from `VALUE`            |
//! | `NAME=VALUE`  | the raw value of `NAME` equals `VALUE`                  |
//!
//! Anything else is rejected rather than guessed at.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::params::ParameterTable;

const AND: &str = " AND ";
const NOT_EQUAL: &str = "!=";
const EQUAL: &str = "=";

/// A parsed condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    NotEmpty(String),
    NotEqual { name: String, literal: String },
    Equal { name: String, literal: String },
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains(AND) {
            let operands = s.split(AND).collect::<Vec<_>>();
            let [left, right] = operands.as_slice() else {
                return Err(Error::MalformedCondition(s.to_string()));
            };
            return Ok(Condition::And(
                Box::new(left.parse()?),
                Box::new(right.parse()?),
            ));
        }

        if let Some(name) = s.strip_suffix(NOT_EQUAL) {
            return Ok(Condition::NotEmpty(name.to_string()));
        }

        if let Some((name, literal)) = s.split_once(NOT_EQUAL) {
            return Ok(Condition::NotEqual {
                name: name.to_string(),
                literal: literal.to_string(),
            });
        }

        if let Some((name, literal)) = s.split_once(EQUAL) {
            return Ok(Condition::Equal {
                name: name.to_string(),
                literal: literal.to_string(),
            });
        }

        Err(Error::UnsupportedCondition(s.to_string()))
    }
}

impl Condition {
    /// Evaluate against the values bound so far
    pub fn evaluate(&self, params: &ParameterTable) -> Result<bool> {
        match self {
            Condition::And(left, right) => Ok(left.evaluate(params)? && right.evaluate(params)?),
            Condition::NotEmpty(name) => Ok(params
                .get(name)
                .is_some_and(|parameter| !parameter.value.trim().is_empty())),
            Condition::NotEqual { name, literal } => Ok(params.value(name)? != literal.as_str()),
            Condition::Equal { name, literal } => Ok(params.value(name)? == literal.as_str()),
        }
    }
}

/// Parse and evaluate `expression` in one go
pub fn evaluate(expression: &str, params: &ParameterTable) -> Result<bool> {
    expression.parse::<Condition>()?.evaluate(params)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::condition::{evaluate, Condition};
    use crate::error::{Error, Result};
    use crate::params::ParameterTable;
    use crate::schema::FieldKind;

    fn params() -> ParameterTable {
        let mut params = ParameterTable::new();
        params.bind("FOO", "   ", FieldKind::String);
        params.bind("BAR", "AB", FieldKind::String);
        params.bind("NUM", "01", FieldKind::Integer);
        params
    }

    #[test]
    fn parse_forms() -> Result<()> {
        assert_eq!("FOO!=".parse::<Condition>()?, Condition::NotEmpty("FOO".into()));
        assert_eq!(
            "BAR!=AB".parse::<Condition>()?,
            Condition::NotEqual {
                name: "BAR".into(),
                literal: "AB".into()
            }
        );
        assert_eq!(
            "NUM=01".parse::<Condition>()?,
            Condition::Equal {
                name: "NUM".into(),
                literal: "01".into()
            }
        );
        assert!(matches!(
            "BAR!= AND NUM=01".parse::<Condition>()?,
            Condition::And(_, _)
        ));
        Ok(())
    }

    #[test]
    fn blank_value_is_empty() -> Result<()> {
        let params = params();
        assert!(!evaluate("FOO!=", &params)?);
        assert!(evaluate("BAR!=", &params)?);
        assert!(!evaluate("MISSING!=", &params)?);
        Ok(())
    }

    #[test]
    fn compare_raw_values() -> Result<()> {
        let params = params();
        assert!(evaluate("BAR=AB", &params)?);
        assert!(!evaluate("BAR!=AB", &params)?);
        assert!(evaluate("NUM!=1", &params)?);
        assert!(!evaluate("NUM=1", &params)?);
        assert!(evaluate("FOO=   ", &params)?);
        Ok(())
    }

    #[test]
    fn and_requires_both() -> Result<()> {
        let params = params();
        assert!(evaluate("BAR!= AND NUM=01", &params)?);
        assert!(!evaluate("FOO!= AND NUM=01", &params)?);
        Ok(())
    }

    #[test]
    fn reject_malformed_conditions() {
        let params = params();
        assert!(matches!(
            evaluate("BAR!= AND NUM=01 AND FOO!=", &params),
            Err(Error::MalformedCondition(_))
        ));
        assert!(matches!(
            evaluate("NUM>01", &params),
            Err(Error::UnsupportedCondition(condition)) if condition == "NUM>01"
        ));
        assert!(matches!(
            evaluate("MISSING=1", &params),
            Err(Error::MissingParameter(name)) if name == "MISSING"
        ));
    }
}
