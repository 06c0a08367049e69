//! Loop counts computed from previously read fields
//!
//! Only the formulas used by published TRE definitions are understood, anything else is rejected.

use std::str::FromStr;

use derive_more::derive::Display;

use crate::error::{Error, Result};
use crate::params::ParameterTable;

/// A loop count formula
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum Formula {
    #[display("(NPART+1)*NPART/2")]
    PartTriangle,

    #[display("(NUMOPG+1)*NUMOPG/2")]
    OperationTriangle,

    #[display("NPAR*NPARO")]
    ParametersByOrder,

    #[display("NPLN-1")]
    PlanesLessOne,

    #[display("NXPTS*NYPTS")]
    PointGrid,
}

impl Formula {
    const ALL: [Formula; 5] = [
        Formula::PartTriangle,
        Formula::OperationTriangle,
        Formula::ParametersByOrder,
        Formula::PlanesLessOne,
        Formula::PointGrid,
    ];

    /// Evaluate the formula against the bound parameters
    pub fn evaluate(&self, params: &ParameterTable) -> Result<i128> {
        let value = |name: &str| params.int_value(name).map(i128::from);

        Ok(match self {
            Formula::PartTriangle => {
                let n = value("NPART")?;
                (n + 1).saturating_mul(n) / 2
            }
            Formula::OperationTriangle => {
                let n = value("NUMOPG")?;
                (n + 1).saturating_mul(n) / 2
            }
            Formula::ParametersByOrder => value("NPAR")?.saturating_mul(value("NPARO")?),
            Formula::PlanesLessOne => value("NPLN")? - 1,
            Formula::PointGrid => value("NXPTS")?.saturating_mul(value("NYPTS")?),
        })
    }

    /// Evaluate the formula as the repetition count of loop `name`
    pub fn count(&self, name: &str, params: &ParameterTable) -> Result<usize> {
        let count = self.evaluate(params)?;
        usize::try_from(count).map_err(|_| Error::InvalidLoopCount {
            name: name.to_string(),
            count,
        })
    }
}

/// Strip whitespace and parentheses wrapped around a lone identifier
fn normalize(formula: &str) -> String {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();

    let mut normalized = String::with_capacity(compact.len());
    let mut rest = compact.as_str();
    while let Some(open) = rest.find('(') {
        normalized.push_str(&rest[..open]);
        let inner = &rest[open + 1..];
        match inner.find(')') {
            Some(close)
                if close > 0
                    && inner[..close]
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                normalized.push_str(&inner[..close]);
                rest = &inner[close + 1..];
            }
            _ => {
                normalized.push('(');
                rest = inner;
            }
        }
    }
    normalized.push_str(rest);
    normalized
}

impl FromStr for Formula {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = normalize(s);
        Formula::ALL
            .into_iter()
            .find(|formula| formula.to_string() == normalized)
            .ok_or_else(|| Error::UnsupportedFormula(s.to_string()))
    }
}
