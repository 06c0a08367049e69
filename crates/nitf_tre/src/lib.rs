//! This library reads and writes the **tagged record extensions** (TREs) carried by NITF files.
//!
//! # TRE Format Documentation
//!
//! The headers of a NITF file, and of every segment inside it, end in extension blocks holding any
//! number of TREs. A TRE is a self describing record: a tag name tells which layout the payload
//! follows, but the layout itself is not part of the file. This crate keeps the layouts in a
//! [`SchemaRegistry`] and uses them to turn payloads into named values and back.
//!
//! ## Record Structure
//!
//! | Offset (bytes) | Field          | Description                                                  |
//! |----------------|----------------|--------------------------------------------------------------|
//! | 0x0000         | Tag            | 6 bytes: tag name, left justified and padded with spaces     |
//! | 0x0006         | Length         | 5 bytes: payload length as zero padded ASCII digits          |
//! | 0x000B         | Payload        | `Length` bytes laid out according to the schema of `Tag`     |
//!
//! An extension block is a plain sequence of records. Its total length is stored by the header
//! owning it, the records have to fill it exactly.
//!
//! ### Payload
//!
//! A schema describes a payload as an ordered list of nodes:
//!
//! - **Field**: a fixed number of bytes, or as many bytes as the value of an earlier field says.
//!   Values are `string`, `integer`, `real` or binary `uint`. Unnamed fields are padding.
//! - **Loop**: a body repeated a fixed number of times, as many times as an earlier field says, or
//!   as many times as a formula over earlier fields says.
//! - **Conditional**: a body only present when a condition over earlier fields holds.
//!
//! Records whose tag has no schema are kept as opaque bytes and written back unchanged.
//!
//! ### Locations
//!
//! Extension blocks live in the file header, in image, graphic, symbol, label and text
//! subheaders, or in an overflow segment when the owning header ran out of space. A schema may
//! restrict its tag to one kind of segment, see [`TreLocation`].
//!
//! ## Additional Information
//!
//! - **Character set**: payload bytes are exposed one `char` per byte (ISO-8859-1)
//! - **Maximum payload**: 99999 bytes
//! - **Endianness**: big-endian for `uint` fields
//!

pub mod collection;
pub mod condition;
pub mod entry;
pub mod error;
pub mod formula;
pub mod params;
pub mod read;
pub mod schema;
pub mod types;
pub mod write;

pub use collection::{Tre, TreCollection};
pub use entry::{Entry, Group};
pub use read::TreReader;
pub use schema::{SchemaRegistry, SchemaRegistryOptions};
pub use types::TreLocation;
pub use write::TreWriter;
