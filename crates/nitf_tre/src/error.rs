//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::types::{SegmentKind, TreLocation};

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// unable to load schema document
    #[error("unable to load schema document")]
    SchemaLoad(#[from] SchemaLoadError),

    /// parameter {0} has not been bound yet
    #[error("parameter {0} has not been bound yet")]
    MissingParameter(String),

    /// parameter {name} is not a valid count: {value:?}
    #[error("parameter {name} is not a valid count: {value:?}")]
    InvalidParameterValue { name: String, value: String },

    /// unsupported formula {0}
    #[error("unsupported formula {0}")]
    UnsupportedFormula(String),

    /// unsupported condition syntax {0}
    #[error("unsupported condition syntax {0}")]
    UnsupportedCondition(String),

    /// condition {0} must have exactly two operands around AND
    #[error("condition {0} must have exactly two operands around AND")]
    MalformedCondition(String),

    /// loop {name} resolved to an invalid count {count}
    #[error("loop {name} resolved to an invalid count {count}")]
    InvalidLoopCount { name: String, count: i128 },

    /// loop {name} holds {actual} groups but its count resolves to {expected}
    #[error("loop {name} holds {actual} groups but its count resolves to {expected}")]
    LoopCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// field {field} must be {expected} bytes, value {value:?} is {actual}
    #[error("field {field} must be {expected} bytes, value {value:?} is {actual}")]
    FieldLengthMismatch {
        field: String,
        value: String,
        expected: usize,
        actual: usize,
    },

    /// field {field} value {value} is outside of {minval:?}..={maxval:?}
    #[error("field {field} value {value} is outside of {minval:?}..={maxval:?}")]
    FieldRange {
        field: String,
        value: String,
        minval: Option<f64>,
        maxval: Option<f64>,
    },

    /// no value was provided for field {0}
    #[error("no value was provided for field {0}")]
    MissingValue(String),

    /// field {0} holds a character that can not be written as a single byte
    #[error("field {0} holds a character that can not be written as a single byte")]
    UnencodableValue(String),

    /// {tag} may only be placed in a {required} segment, not in {location}
    #[error("{tag} may only be placed in a {required} segment, not in {location}")]
    PlacementMismatch {
        tag: String,
        required: SegmentKind,
        location: TreLocation,
    },

    /// no schema is registered for {0}
    #[error("no schema is registered for {0}")]
    SchemaNotFound(String),

    /// {tag} declares {declared} bytes but its schema describes {consumed}
    #[error("{tag} declares {declared} bytes but its schema describes {consumed}")]
    TreLengthMismatch {
        tag: String,
        declared: usize,
        consumed: usize,
    },

    /// {tag} payload of {length} bytes does not fit the 5 digit length field
    #[error("{tag} payload of {length} bytes does not fit the 5 digit length field")]
    TreTooLarge { tag: String, length: usize },

    /// extension block ends inside a record that needs {declared} bytes, only {remaining} are left
    #[error("extension block ends inside a record that needs {declared} bytes, only {remaining} are left")]
    TruncatedBlock { declared: usize, remaining: usize },
}

/// Error type to provide further information when a schema document is rejected
#[derive(Error, Diagnostic, Debug)]
#[error("unable to load schema document")]
pub enum SchemaLoadError {
    /// malformed document
    #[error("malformed document")]
    Json(#[from] serde_json::Error),

    /// tag name {0:?} must be between 1 and 6 characters
    #[error("tag name {0:?} must be between 1 and 6 characters")]
    InvalidTagName(String),

    /// field {0} needs exactly one of length or length_var
    #[error("field {0} needs exactly one of length or length_var")]
    FieldLength(String),

    /// pad value {value:?} does not match its length {length}
    #[error("pad value {value:?} does not match its length {length}")]
    PadValue { value: String, length: usize },

    /// field {field} has a non numeric bound {value:?}
    #[error("field {field} has a non numeric bound {value:?}")]
    InvalidBound { field: String, value: String },

    /// loop {0} needs exactly one of iterations, counter or formula
    #[error("loop {0} needs exactly one of iterations, counter or formula")]
    LoopCount(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
