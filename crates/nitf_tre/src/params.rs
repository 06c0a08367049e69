//! Values bound while walking a single TRE
//!
//! A [`ParameterTable`] lives for one parse or serialize call. Loop iterations share it with the
//! enclosing scope, so a later iteration sees (and overrides) whatever an earlier one bound.

use byteorder::{BigEndian, ByteOrder};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::schema::FieldKind;
use crate::types::encode_text;

/// A bound field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Value exactly as it appears on the wire
    pub value: String,
    pub kind: FieldKind,
}

/// Name to value scope for one record
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    values: IndexMap<String, Parameter>,
}

impl ParameterTable {
    pub fn new() -> ParameterTable {
        ParameterTable::default()
    }

    /// Bind `value` under `name`, replacing any earlier binding
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>, kind: FieldKind) {
        self.values.insert(
            name.into(),
            Parameter {
                value: value.into(),
                kind,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.values.get(name)
    }

    /// Raw value of a bound parameter
    pub fn value(&self, name: &str) -> Result<&str> {
        self.get(name)
            .map(|parameter| parameter.value.as_str())
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// Interpret a bound parameter as an unsigned integer.
    ///
    /// `uint` fields are read as big endian binary, everything else as decimal text.
    pub fn int_value(&self, name: &str) -> Result<u64> {
        let parameter = self
            .get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))?;

        let invalid = || Error::InvalidParameterValue {
            name: name.to_string(),
            value: parameter.value.clone(),
        };

        match parameter.kind {
            FieldKind::Uint => {
                let bytes = encode_text(&parameter.value).ok_or_else(invalid)?;
                if bytes.is_empty() || bytes.len() > 8 {
                    return Err(invalid());
                }
                Ok(BigEndian::read_uint(&bytes, bytes.len()))
            }
            _ => parameter.value.trim().parse::<u64>().map_err(|_| invalid()),
        }
    }

    /// Interpret a bound parameter as a length or repetition count
    pub fn count(&self, name: &str) -> Result<usize> {
        let value = self.int_value(name)?;
        usize::try_from(value).map_err(|_| Error::InvalidParameterValue {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
