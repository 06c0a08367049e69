//! TRE schemas and the registry holding them
//!
//! A schema describes the payload of one tag as an ordered list of [`StructureNode`]s. Schemas are
//! loaded from JSON documents:
//!
//! ```json
//! {
//!   "tres": [
//!     {
//!       "name": "SAMPLE",
//!       "location": "image",
//!       "nodes": [
//!         { "field": { "name": "COUNT", "type": "integer", "length": 3 } },
//!         { "loop": { "name": "ITEMS", "counter": "COUNT", "body": [
//!             { "field": { "name": "ITEM", "length": 4 } }
//!         ] } },
//!         { "conditional": { "cond": "COUNT!=000", "body": [
//!             { "field": { "length": 2, "value": "  " } }
//!         ] } }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::io::Read;

use bon::Builder;
use derive_more::derive::Display;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result, SchemaLoadError};
use crate::formula::Formula;
use crate::params::ParameterTable;
use crate::types::{is_tag_name, SegmentKind};

const BUILTIN_SCHEMAS: &str = include_str!("schemas/builtin.json");

/// How the bytes of a field are interpreted
#[derive(Debug, Display, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Printable characters, padded with spaces on the right
    #[default]
    #[display("string")]
    String,

    /// Decimal integer, padded with zeros on the left
    #[display("integer")]
    Integer,

    /// Decimal number with a fixed width
    #[display("real")]
    Real,

    /// Unsigned big endian binary integer
    #[display("uint")]
    Uint,
}

/// Length of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLength {
    /// A fixed number of bytes
    Literal(usize),

    /// The value of a previously read field
    Reference(String),
}

impl FieldLength {
    /// Resolve the number of bytes against the values bound so far
    pub fn resolve(&self, params: &ParameterTable) -> Result<usize> {
        match self {
            FieldLength::Literal(length) => Ok(*length),
            FieldLength::Reference(name) => params.count(name),
        }
    }
}

/// Number of repetitions of a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCount {
    /// A fixed number of repetitions
    Literal(usize),

    /// The value of a previously read field
    Reference(String),

    /// One of the formulas understood by [`Formula`]
    Formula(String),
}

impl LoopCount {
    /// Resolve the number of repetitions against the values bound so far
    pub fn resolve(&self, name: &str, params: &ParameterTable) -> Result<usize> {
        match self {
            LoopCount::Literal(count) => Ok(*count),
            LoopCount::Reference(reference) => params.count(reference),
            LoopCount::Formula(formula) => formula.parse::<Formula>()?.count(name, params),
        }
    }
}

/// A single field of a TRE
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: Option<String>,
    pub longname: Option<String>,
    pub kind: FieldKind,
    pub length: FieldLength,
    pub minval: Option<f64>,
    pub maxval: Option<f64>,
    /// Fixed content of a pad field
    pub value: Option<String>,
}

impl FieldSpec {
    /// The name the value is bound under, [`None`] for pad fields.
    pub fn binding_name(&self) -> Option<&str> {
        [self.name.as_deref(), self.longname.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
    }

    pub(crate) fn check_range(&self, field: &str, value: &str, number: f64) -> Result<()> {
        let below = self.minval.is_some_and(|min| number < min);
        let above = self.maxval.is_some_and(|max| number > max);
        if below || above {
            return Err(Error::FieldRange {
                field: field.to_string(),
                value: value.to_string(),
                minval: self.minval,
                maxval: self.maxval,
            });
        }
        Ok(())
    }
}

/// A repeated group of nodes
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    pub name: String,
    pub count: LoopCount,
    pub body: Vec<StructureNode>,
}

/// Nodes only present when `condition` holds
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalSpec {
    pub condition: String,
    pub body: Vec<StructureNode>,
}

/// One node of a TRE grammar
#[derive(Debug, Clone, PartialEq)]
pub enum StructureNode {
    Field(FieldSpec),
    Loop(LoopSpec),
    Conditional(ConditionalSpec),
}

/// The grammar for a single tag
#[derive(Debug, Clone, PartialEq)]
pub struct TreSchema {
    /// Tag name, without padding
    pub name: String,

    /// The only kind of segment this tag may be written to
    pub location: Option<SegmentKind>,

    /// Ordered nodes describing the payload
    pub nodes: Vec<StructureNode>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    tres: Vec<RawTre>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTre {
    name: String,
    #[serde(default)]
    location: Option<SegmentKind>,
    nodes: Vec<RawNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawNode {
    Field(RawField),
    Loop(RawLoop),
    Conditional(RawConditional),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    longname: Option<String>,
    #[serde(default, rename = "type")]
    kind: FieldKind,
    #[serde(default)]
    length: Option<usize>,
    #[serde(default)]
    length_var: Option<String>,
    #[serde(default)]
    minval: Option<String>,
    #[serde(default)]
    maxval: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLoop {
    name: String,
    #[serde(default)]
    iterations: Option<usize>,
    #[serde(default)]
    counter: Option<String>,
    #[serde(default)]
    formula: Option<String>,
    body: Vec<RawNode>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConditional {
    cond: String,
    body: Vec<RawNode>,
}

fn parse_bound(field: &str, bound: Option<String>) -> core::result::Result<Option<f64>, SchemaLoadError> {
    bound
        .map(|value| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| SchemaLoadError::InvalidBound {
                    field: field.to_string(),
                    value: value.clone(),
                })
        })
        .transpose()
}

impl TryFrom<RawField> for FieldSpec {
    type Error = SchemaLoadError;

    fn try_from(raw: RawField) -> core::result::Result<Self, Self::Error> {
        let label = [raw.name.as_deref(), raw.longname.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or("(pad)")
            .to_string();

        let length = match (raw.length, raw.length_var) {
            (Some(length), None) => FieldLength::Literal(length),
            (None, Some(reference)) if !reference.is_empty() => FieldLength::Reference(reference),
            _ => return Err(SchemaLoadError::FieldLength(label)),
        };

        if let (Some(value), FieldLength::Literal(length)) = (&raw.value, &length) {
            if value.chars().count() != *length {
                return Err(SchemaLoadError::PadValue {
                    value: value.clone(),
                    length: *length,
                });
            }
        }

        Ok(FieldSpec {
            minval: parse_bound(&label, raw.minval)?,
            maxval: parse_bound(&label, raw.maxval)?,
            name: raw.name,
            longname: raw.longname,
            kind: raw.kind,
            length,
            value: raw.value,
        })
    }
}

impl TryFrom<RawLoop> for LoopSpec {
    type Error = SchemaLoadError;

    fn try_from(raw: RawLoop) -> core::result::Result<Self, Self::Error> {
        let count = match (raw.iterations, raw.counter, raw.formula) {
            (Some(iterations), None, None) => LoopCount::Literal(iterations),
            (None, Some(counter), None) => LoopCount::Reference(counter),
            (None, None, Some(formula)) => LoopCount::Formula(formula),
            _ => return Err(SchemaLoadError::LoopCount(raw.name)),
        };

        Ok(LoopSpec {
            name: raw.name,
            count,
            body: convert_nodes(raw.body)?,
        })
    }
}

impl TryFrom<RawNode> for StructureNode {
    type Error = SchemaLoadError;

    fn try_from(raw: RawNode) -> core::result::Result<Self, Self::Error> {
        Ok(match raw {
            RawNode::Field(field) => StructureNode::Field(field.try_into()?),
            RawNode::Loop(spec) => StructureNode::Loop(spec.try_into()?),
            RawNode::Conditional(spec) => StructureNode::Conditional(ConditionalSpec {
                condition: spec.cond,
                body: convert_nodes(spec.body)?,
            }),
        })
    }
}

impl TryFrom<RawTre> for TreSchema {
    type Error = SchemaLoadError;

    fn try_from(raw: RawTre) -> core::result::Result<Self, Self::Error> {
        let name = raw.name.trim_end_matches(' ').to_string();
        if !is_tag_name(&name) {
            return Err(SchemaLoadError::InvalidTagName(raw.name));
        }

        Ok(TreSchema {
            name,
            location: raw.location,
            nodes: convert_nodes(raw.nodes)?,
        })
    }
}

fn convert_nodes(raw: Vec<RawNode>) -> core::result::Result<Vec<StructureNode>, SchemaLoadError> {
    raw.into_iter().map(StructureNode::try_from).collect()
}

/// Parse a schema document without registering it
pub fn parse_document(document: &str) -> Result<Vec<TreSchema>> {
    let raw: RawDocument = serde_json::from_str(document).map_err(SchemaLoadError::from)?;
    raw.tres
        .into_iter()
        .map(|tre| TreSchema::try_from(tre).map_err(Error::from))
        .collect()
}

/// Options for how a [`SchemaRegistry`] is created
#[derive(Debug, Clone, Copy, Builder)]
pub struct SchemaRegistryOptions {
    /// Load the schemas shipped with this library
    #[builder(default = true)]
    pub builtin_schemas: bool,
}

/// Holds the schema of every known tag
///
/// Documents may be added at any time, but only ever append: when several documents define the
/// same tag the first registered definition is used.
///
/// ```
/// # fn doit() -> nitf_tre::error::Result<()>
/// # {
/// use nitf_tre::SchemaRegistry;
///
/// let mut registry = SchemaRegistry::new()?;
/// registry.register_str(r#"{ "tres": [
///     { "name": "TSTA", "nodes": [ { "field": { "name": "A", "length": 2 } } ] }
/// ] }"#)?;
///
/// assert!(registry.contains("BLOCKA"));
/// assert!(registry.contains("TSTA"));
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, TreSchema>,
}

impl SchemaRegistry {
    /// Create a registry holding the builtin schemas
    pub fn new() -> Result<SchemaRegistry> {
        Self::with_options(SchemaRegistryOptions::builder().build())
    }

    /// Create a registry without any schemas
    pub fn empty() -> SchemaRegistry {
        SchemaRegistry::default()
    }

    /// Create a registry using the given options
    pub fn with_options(options: SchemaRegistryOptions) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::empty();
        if options.builtin_schemas {
            registry.register_str(BUILTIN_SCHEMAS)?;
        }
        Ok(registry)
    }

    /// Append the schemas of a JSON document read from `reader`.
    ///
    /// Returns the number of tags that became known. Nothing is registered when the document is
    /// rejected.
    pub fn register<R: Read>(&mut self, mut reader: R) -> Result<usize> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        self.register_str(&document)
    }

    /// Append the schemas of a JSON document
    #[instrument(skip_all, err)]
    pub fn register_str(&mut self, document: &str) -> Result<usize> {
        let schemas = parse_document(document)?;
        Ok(self.register_schemas(schemas))
    }

    /// Append already built schemas, returning the number of tags that became known
    pub fn register_schemas(&mut self, schemas: impl IntoIterator<Item = TreSchema>) -> usize {
        let mut added = 0;
        for schema in schemas {
            if self.schemas.contains_key(&schema.name) {
                debug!(tag = %schema.name, "ignoring duplicate schema definition");
                continue;
            }
            self.schemas.insert(schema.name.clone(), schema);
            added += 1;
        }
        debug!(added, total = self.schemas.len(), "registered schemas");
        added
    }

    /// Look up the schema for a tag, ignoring trailing padding
    pub fn get(&self, tag: &str) -> Option<&TreSchema> {
        self.schemas.get(tag.trim_end_matches(' '))
    }

    /// Whether a schema has been registered for a tag
    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Number of known tags
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no tags are known
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Known tag names in registration order
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(|name| name.as_str())
    }
}
