//! Types for reading TRE records
//!

use binrw::BinRead;
use std::io::{self, Cursor, Read};
use tracing::{debug, instrument, trace, warn};

use crate::{
    collection::{Tre, TreCollection},
    condition,
    entry::{Entry, Group},
    error::{Error, Result},
    params::ParameterTable,
    schema::{SchemaRegistry, StructureNode},
    types::{decode_text, TreLocation, TreTagHeader, HEADER_LENGTH},
};

/// TRE record reader
///
/// Records with a registered schema are parsed into entries, every other record is kept as an
/// opaque payload.
///
/// ```
/// # fn doit() -> nitf_tre::error::Result<()>
/// # {
/// use nitf_tre::{SchemaRegistry, TreLocation, TreReader};
///
/// let registry = SchemaRegistry::new()?;
/// let reader = TreReader::new(&registry);
///
/// let tres = reader.parse_block(b"ABCDEF00010X.........", TreLocation::Overflow)?;
/// assert_eq!(tres.len(), 1);
/// assert!(tres[0].is_opaque());
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TreReader<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> TreReader<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> TreReader<'a> {
        TreReader { registry }
    }

    /// Read the payload of a record whose header has already been consumed.
    #[instrument(skip(self, reader), err)]
    pub fn read_tre<R: Read>(
        &self,
        reader: &mut R,
        tag: &str,
        length: usize,
        location: TreLocation,
    ) -> Result<Tre> {
        let mut payload = Vec::new();
        reader.take(length as u64).read_to_end(&mut payload)?;
        if payload.len() != length {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        self.parse_payload(tag, &payload, location)
    }

    /// Parse an in-memory payload for `tag`
    pub fn parse_payload(&self, tag: &str, payload: &[u8], location: TreLocation) -> Result<Tre> {
        let tag = tag.trim_end_matches(' ');

        let Some(schema) = self.registry.get(tag) else {
            debug!(tag, length = payload.len(), "no schema registered, keeping opaque payload");
            return Ok(Tre::opaque(tag, location, payload.to_vec()));
        };

        if let Some(kind) = schema.location {
            if !location.accepts(kind) {
                warn!(tag, required = %kind, %location, "record found outside of its segment kind");
            }
        }

        let mut params = ParameterTable::new();
        let mut cursor = Cursor::new(payload);
        let mut entries = Vec::new();
        read_nodes(&schema.nodes, &mut cursor, &mut params, &mut entries)?;

        let consumed = cursor.position() as usize;
        if consumed != payload.len() {
            return Err(Error::TreLengthMismatch {
                tag: tag.to_string(),
                declared: payload.len(),
                consumed,
            });
        }

        debug!(tag, entries = entries.len(), "parsed record");
        Ok(Tre::parsed(tag, location, Group::new(entries)))
    }

    /// Read a single record including its tag and length header
    pub fn read_record<R: Read>(&self, reader: &mut R, location: TreLocation) -> Result<Tre> {
        let header = read_header(reader)?;
        self.read_tre(reader, &header.tag, header.length, location)
    }

    /// Read records until exactly `total` bytes have been consumed
    #[instrument(skip(self, reader), err)]
    pub fn read_block<R: Read>(
        &self,
        reader: &mut R,
        total: usize,
        location: TreLocation,
    ) -> Result<TreCollection> {
        let mut collection = TreCollection::new();
        let mut remaining = total;

        while remaining > 0 {
            if remaining < HEADER_LENGTH {
                return Err(Error::TruncatedBlock {
                    declared: HEADER_LENGTH,
                    remaining,
                });
            }

            let header = read_header(reader)?;
            remaining -= HEADER_LENGTH;

            if header.length > remaining {
                return Err(Error::TruncatedBlock {
                    declared: header.length,
                    remaining,
                });
            }

            collection.add(self.read_tre(reader, &header.tag, header.length, location)?);
            remaining -= header.length;
        }

        Ok(collection)
    }

    /// Read every record of an in-memory extension block
    pub fn parse_block(&self, data: &[u8], location: TreLocation) -> Result<TreCollection> {
        self.read_block(&mut Cursor::new(data), data.len(), location)
    }
}

fn read_header<R: Read>(reader: &mut R) -> Result<TreTagHeader> {
    let mut raw = [0u8; HEADER_LENGTH];
    reader.read_exact(&mut raw)?;
    Ok(TreTagHeader::read(&mut Cursor::new(raw))?)
}

fn remaining_bytes(cursor: &Cursor<&[u8]>) -> usize {
    cursor.get_ref().len().saturating_sub(cursor.position() as usize)
}

fn read_bytes(cursor: &mut Cursor<&[u8]>, length: usize) -> Result<Vec<u8>> {
    if length > remaining_bytes(cursor) {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    let mut raw = vec![0u8; length];
    cursor.read_exact(&mut raw)?;
    Ok(raw)
}

fn read_nodes(
    nodes: &[StructureNode],
    cursor: &mut Cursor<&[u8]>,
    params: &mut ParameterTable,
    entries: &mut Vec<Entry>,
) -> Result<()> {
    for node in nodes {
        match node {
            StructureNode::Field(field) => {
                let length = field.length.resolve(params)?;
                let raw = read_bytes(cursor, length)?;

                let Some(name) = field.binding_name() else {
                    continue;
                };

                let value = decode_text(&raw);
                trace!(field = name, value = ?value, "read field");
                params.bind(name, value.clone(), field.kind);
                entries.push(Entry::new_field(name, value, field.kind));
            }
            StructureNode::Loop(spec) => {
                let count = spec.count.resolve(&spec.name, params)?;
                trace!(name = %spec.name, count, "read loop");

                let mut groups = Vec::new();
                for _ in 0..count {
                    let start = cursor.position();
                    let mut body = Vec::new();
                    read_nodes(&spec.body, cursor, params, &mut body)?;

                    // empty iterations are only bounded by the payload size
                    if cursor.position() == start && count > cursor.get_ref().len() {
                        return Err(Error::InvalidLoopCount {
                            name: spec.name.clone(),
                            count: count as i128,
                        });
                    }
                    groups.push(Group::new(body));
                }
                entries.push(Entry::new_groups(&spec.name, groups));
            }
            StructureNode::Conditional(spec) => {
                if condition::evaluate(&spec.condition, params)? {
                    read_nodes(&spec.body, cursor, params, entries)?;
                }
            }
        }
    }

    Ok(())
}
