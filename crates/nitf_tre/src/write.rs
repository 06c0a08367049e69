//! Types for writing TRE records
//!

use binrw::BinWrite;
use std::io::{Cursor, Write};
use tracing::{instrument, trace, Level};

use crate::collection::{Tre, TreCollection, TreContent};
use crate::condition;
use crate::entry::{Entry, Group};
use crate::error::{Error, Result};
use crate::params::ParameterTable;
use crate::schema::{FieldKind, FieldSpec, SchemaRegistry, StructureNode};
use crate::types::{encode_text, TreLocation, TreTagHeader, HEADER_LENGTH, MAX_PAYLOAD_LENGTH};

const PAD_NAME: &str = "(pad)";

/// TRE record generator
///
/// Parsed records are laid out again with their schema, values shorter than their field are
/// padded according to the field type. Opaque records are written back unchanged.
///
/// ```
/// # fn doit() -> nitf_tre::error::Result<()>
/// # {
/// use nitf_tre::{SchemaRegistry, TreLocation, TreReader, TreWriter};
///
/// let registry = SchemaRegistry::new()?;
/// let block = b"ABCDEF00010X.........";
///
/// let tres = TreReader::new(&registry).parse_block(block, TreLocation::Overflow)?;
/// let bytes = TreWriter::new(&registry).block_bytes(&tres, TreLocation::Overflow)?;
///
/// assert_eq!(bytes, block);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TreWriter<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> TreWriter<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> TreWriter<'a> {
        TreWriter { registry }
    }

    /// Lay out the payload of a record destined for `location`
    #[instrument(skip(self, tre), fields(tag = tre.name()), err)]
    pub fn payload(&self, tre: &Tre, location: TreLocation) -> Result<Vec<u8>> {
        let entries = match tre.content() {
            TreContent::Opaque(data) => return Ok(data.clone()),
            TreContent::Parsed(entries) => entries,
        };

        let schema = self
            .registry
            .get(tre.name())
            .ok_or_else(|| Error::SchemaNotFound(tre.name().to_string()))?;

        if let Some(kind) = schema.location {
            if !location.accepts(kind) {
                return Err(Error::PlacementMismatch {
                    tag: tre.name().to_string(),
                    required: kind,
                    location,
                });
            }
        }

        let mut params = ParameterTable::new();
        let mut out = Vec::new();
        write_nodes(&schema.nodes, entries, &mut params, &mut out)?;
        Ok(out)
    }

    /// The full record, tag and length header followed by the payload
    pub fn to_bytes(&self, tre: &Tre, location: TreLocation) -> Result<Vec<u8>> {
        let payload = self.payload(tre, location)?;
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(Error::TreTooLarge {
                tag: tre.name().to_string(),
                length: payload.len(),
            });
        }

        let header = TreTagHeader {
            tag: tre.name().to_string(),
            length: payload.len(),
        };

        let mut out = Cursor::new(Vec::with_capacity(payload.len() + HEADER_LENGTH));
        header.write(&mut out)?;
        let mut out = out.into_inner();
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Write a single record, returning the number of bytes written
    pub fn write_tre<W: Write>(&self, writer: &mut W, tre: &Tre, location: TreLocation) -> Result<usize> {
        let bytes = self.to_bytes(tre, location)?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Every record of `collection` attached to `location`, in order
    pub fn block_bytes(&self, collection: &TreCollection, location: TreLocation) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for tre in collection.for_location(location) {
            out.extend(self.to_bytes(tre, location)?);
        }
        Ok(out)
    }

    /// Write the extension block for `location`, returning its length.
    ///
    /// The block is laid out completely before anything is written, a failing record leaves
    /// `writer` untouched.
    #[instrument(skip(self, writer, collection), ret(level = Level::DEBUG), err)]
    pub fn write_block<W: Write>(
        &self,
        writer: &mut W,
        collection: &TreCollection,
        location: TreLocation,
    ) -> Result<usize> {
        let bytes = self.block_bytes(collection, location)?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }
}

fn write_nodes(
    nodes: &[StructureNode],
    entries: &[Entry],
    params: &mut ParameterTable,
    out: &mut Vec<u8>,
) -> Result<()> {
    for node in nodes {
        match node {
            StructureNode::Field(field) => {
                let length = field.length.resolve(params)?;

                let Some(name) = field.binding_name() else {
                    let value = field.value.clone().unwrap_or_else(|| " ".repeat(length));
                    out.extend(encode_checked(PAD_NAME, &value, length)?);
                    continue;
                };

                let value = entries
                    .iter()
                    .find(|entry| entry.name() == name)
                    .and_then(Entry::value)
                    .ok_or_else(|| Error::MissingValue(name.to_string()))?;

                let formatted = format_value(field, name, value, length)?;
                out.extend(encode_checked(name, &formatted, length)?);
                trace!(field = name, value = ?formatted, "wrote field");
                params.bind(name, formatted, field.kind);
            }
            StructureNode::Loop(spec) => {
                let count = spec.count.resolve(&spec.name, params)?;

                let groups: &[Group] = match entries.iter().find(|entry| entry.name() == spec.name) {
                    Some(entry) => entry
                        .groups()
                        .ok_or_else(|| Error::MissingValue(spec.name.clone()))?,
                    None if count == 0 => &[],
                    None => return Err(Error::MissingValue(spec.name.clone())),
                };

                if groups.len() != count {
                    return Err(Error::LoopCountMismatch {
                        name: spec.name.clone(),
                        expected: count,
                        actual: groups.len(),
                    });
                }

                for group in groups {
                    write_nodes(&spec.body, group, params, out)?;
                }
            }
            StructureNode::Conditional(spec) => {
                if condition::evaluate(&spec.condition, params)? {
                    write_nodes(&spec.body, entries, params, out)?;
                }
            }
        }
    }

    Ok(())
}

fn encode_checked(field: &str, value: &str, length: usize) -> Result<Vec<u8>> {
    let bytes = encode_text(value).ok_or_else(|| Error::UnencodableValue(field.to_string()))?;
    if bytes.len() != length {
        return Err(Error::FieldLengthMismatch {
            field: field.to_string(),
            value: value.to_string(),
            expected: length,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Pad `value` to `length` according to the kind of `field`.
///
/// Numeric values are checked against the bounds of the field whenever they parse, values that
/// do not parse are passed through and must already have the right length.
fn format_value(field: &FieldSpec, name: &str, value: &str, length: usize) -> Result<String> {
    let current = value.chars().count();

    match field.kind {
        FieldKind::String => Ok(format!("{value:<length$}")),
        FieldKind::Uint if current < length => {
            Ok(format!("{}{value}", "\0".repeat(length - current)))
        }
        FieldKind::Uint => Ok(value.to_string()),
        FieldKind::Integer => {
            let Ok(number) = value.trim().parse::<i64>() else {
                return Ok(value.to_string());
            };
            field.check_range(name, value, number as f64)?;
            if current == length {
                Ok(value.to_string())
            } else {
                Ok(format!("{number:0length$}"))
            }
        }
        FieldKind::Real => {
            let number = match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => number,
                _ => return Ok(value.to_string()),
            };
            field.check_range(name, value, number)?;
            if current == length {
                Ok(value.to_string())
            } else {
                Ok(format_real(number, length))
            }
        }
    }
}

/// Fixed width decimal, spending whatever the integer part leaves on the fraction
fn format_real(number: f64, width: usize) -> String {
    let integer_digits = format!("{:.0}", number.trunc()).len();
    let Some(precision) = width.checked_sub(integer_digits + 1).filter(|p| *p > 0) else {
        return format!("{number:0width$.0}");
    };

    let formatted = format!("{number:0width$.precision$}");
    if formatted.len() > width {
        // rounding carried into the integer part
        let precision = precision - 1;
        return format!("{number:0width$.precision$}");
    }
    formatted
}
