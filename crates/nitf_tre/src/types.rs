//! Base types for the wire structure of tagged record extensions.

use binrw::{BinRead, BinWrite};
use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

/// Number of bytes used for the tag name of a record
pub const TAG_LENGTH: usize = 6;

/// Number of ASCII digits used for the payload length of a record
pub const LENGTH_DIGITS: usize = 5;

/// Size of the tag and length prefix in front of every payload
pub const HEADER_LENGTH: usize = TAG_LENGTH + LENGTH_DIGITS;

/// Largest payload the length field can describe
pub const MAX_PAYLOAD_LENGTH: usize = 99_999;

/// TRE header
///
/// Every record starts with a 6 byte tag name, padded with spaces on the right, followed by the
/// length of the payload as 5 ASCII digits.
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct TreTagHeader {
    /// The tag name with the padding removed
    #[br(try_map = |raw: [u8; TAG_LENGTH]| decode_tag(&raw))]
    #[bw(try_map = |tag: &String| encode_tag(tag))]
    pub tag: String,

    /// The number of payload bytes following the header
    #[br(try_map = |raw: [u8; LENGTH_DIGITS]| decode_length(&raw))]
    #[bw(try_map = |length: &usize| encode_length(*length))]
    pub length: usize,
}

/// Field bytes are kept as ISO-8859-1 text so that every byte survives a round trip
pub(crate) fn decode_text(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

/// Inverse of [`decode_text`], [`None`] when a character does not fit in a byte
pub(crate) fn encode_text(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Tag names are printable ASCII, at most [`TAG_LENGTH`] long
pub(crate) fn is_tag_name(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= TAG_LENGTH
        && tag.bytes().all(|b| b.is_ascii_graphic() || b == b' ')
}

fn decode_tag(raw: &[u8; TAG_LENGTH]) -> Result<String, String> {
    let tag = decode_text(raw).trim_end_matches(' ').to_string();
    if tag.is_empty() {
        return Err("record has an empty tag name".into());
    }
    if !is_tag_name(&tag) {
        return Err(format!("{tag:?} is not a valid tag name"));
    }
    Ok(tag)
}

fn encode_tag(tag: &str) -> Result<[u8; TAG_LENGTH], String> {
    if !is_tag_name(tag) {
        return Err(format!("{tag:?} is not a valid tag name"));
    }
    let mut raw = [b' '; TAG_LENGTH];
    raw[..tag.len()].copy_from_slice(tag.as_bytes());
    Ok(raw)
}

fn decode_length(raw: &[u8; LENGTH_DIGITS]) -> Result<usize, String> {
    if !raw.iter().all(u8::is_ascii_digit) {
        return Err(format!(
            "record length {:?} is not a decimal number",
            String::from_utf8_lossy(raw)
        ));
    }
    Ok(raw
        .iter()
        .fold(0usize, |acc, digit| acc * 10 + (digit - b'0') as usize))
}

fn encode_length(length: usize) -> Result<[u8; LENGTH_DIGITS], String> {
    if length > MAX_PAYLOAD_LENGTH {
        return Err(format!("record length {length} exceeds {MAX_PAYLOAD_LENGTH}"));
    }
    let mut raw = [0u8; LENGTH_DIGITS];
    raw.copy_from_slice(format!("{length:05}").as_bytes());
    Ok(raw)
}

/// The kind of segment a schema may restrict a TRE to
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    #[display("file")]
    File,
    #[display("image")]
    Image,
    #[display("graphic")]
    Graphic,
    #[display("symbol")]
    Symbol,
    #[display("label")]
    Label,
    #[display("text")]
    Text,
}

/// Where in the container a TRE was read from or is going to be written to
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreLocation {
    /// User defined header data of the file header (`UDHD`)
    #[display("file user defined header")]
    FileUserDefinedHeader,

    /// Extended header data of the file header (`XHD`)
    #[display("file extended header")]
    FileExtendedHeader,

    /// User defined image data of an image subheader (`UDID`)
    #[display("image user defined subheader")]
    ImageUserDefinedSubheader,

    /// Extended subheader data of an image subheader (`IXSHD`)
    #[display("image extended subheader")]
    ImageExtendedSubheader,

    /// Extended subheader data of a graphic subheader (`SXSHD`)
    #[display("graphic extended subheader")]
    GraphicExtendedSubheader,

    /// Extended subheader data of a symbol subheader
    #[display("symbol extended subheader")]
    SymbolExtendedSubheader,

    /// Extended subheader data of a label subheader
    #[display("label extended subheader")]
    LabelExtendedSubheader,

    /// Extended subheader data of a text subheader (`TXSHD`)
    #[display("text extended subheader")]
    TextExtendedSubheader,

    /// A `TRE_OVERFLOW` data extension segment, which may hold any TRE
    #[display("overflow")]
    Overflow,
}

impl TreLocation {
    /// The kind of segment this location belongs to, [`None`] for overflow segments.
    pub const fn segment(&self) -> Option<SegmentKind> {
        match self {
            TreLocation::FileUserDefinedHeader | TreLocation::FileExtendedHeader => {
                Some(SegmentKind::File)
            }
            TreLocation::ImageUserDefinedSubheader | TreLocation::ImageExtendedSubheader => {
                Some(SegmentKind::Image)
            }
            TreLocation::GraphicExtendedSubheader => Some(SegmentKind::Graphic),
            TreLocation::SymbolExtendedSubheader => Some(SegmentKind::Symbol),
            TreLocation::LabelExtendedSubheader => Some(SegmentKind::Label),
            TreLocation::TextExtendedSubheader => Some(SegmentKind::Text),
            TreLocation::Overflow => None,
        }
    }

    /// Whether a TRE restricted to `kind` may be written here
    pub fn accepts(&self, kind: SegmentKind) -> bool {
        self.segment().map_or(true, |segment| segment == kind)
    }

    /// Map the `DESOFLW` value of an overflow segment to the header it overflowed from
    pub fn from_overflow_code(code: &str) -> Option<TreLocation> {
        match code.trim_end_matches(' ') {
            "UDHD" => Some(TreLocation::FileUserDefinedHeader),
            "XHD" => Some(TreLocation::FileExtendedHeader),
            "UDID" => Some(TreLocation::ImageUserDefinedSubheader),
            "IXSHD" => Some(TreLocation::ImageExtendedSubheader),
            "SXSHD" => Some(TreLocation::GraphicExtendedSubheader),
            "TXSHD" => Some(TreLocation::TextExtendedSubheader),
            _ => None,
        }
    }

    /// The `DESOFLW` value naming this location, if it can overflow
    pub const fn overflow_code(&self) -> Option<&'static str> {
        match self {
            TreLocation::FileUserDefinedHeader => Some("UDHD"),
            TreLocation::FileExtendedHeader => Some("XHD"),
            TreLocation::ImageUserDefinedSubheader => Some("UDID"),
            TreLocation::ImageExtendedSubheader => Some("IXSHD"),
            TreLocation::GraphicExtendedSubheader => Some("SXSHD"),
            TreLocation::TextExtendedSubheader => Some("TXSHD"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{SegmentKind, TreLocation, TreTagHeader};

    #[test]
    fn read_header() -> Result<()> {
        let mut input = Cursor::new(b"BLOCKA00123".to_vec());

        let expected = TreTagHeader {
            tag: "BLOCKA".into(),
            length: 123,
        };

        assert_eq!(TreTagHeader::read(&mut input)?, expected);

        Ok(())
    }

    #[test]
    fn read_short_tag_header() -> Result<()> {
        let mut input = Cursor::new(b"AB    00010".to_vec());

        let header = TreTagHeader::read(&mut input)?;
        assert_eq!(header.tag, "AB");
        assert_eq!(header.length, 10);

        Ok(())
    }

    #[test]
    fn read_header_with_invalid_tag() {
        let inputs: [&[u8]; 4] = [b"AB\xe9   00001", b"AB\x01   00001", b"ABC\t  00001", b"      00001"];
        for raw in inputs {
            let mut input = Cursor::new(raw.to_vec());
            assert!(TreTagHeader::read(&mut input).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn keep_inner_spaces_in_tag() -> Result<()> {
        let mut input = Cursor::new(b"AB C  00000".to_vec());
        let header = TreTagHeader::read(&mut input)?;
        assert_eq!(header.tag, "AB C");

        let mut actual = Vec::new();
        header.write(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual, b"AB C  00000".to_vec());

        Ok(())
    }

    #[test]
    fn read_header_with_invalid_length() {
        let mut input = Cursor::new(b"BLOCKA00 23".to_vec());
        assert!(TreTagHeader::read(&mut input).is_err());
    }

    #[test]
    fn write_header() -> Result<()> {
        let header = TreTagHeader {
            tag: "AB".into(),
            length: 7,
        };

        let mut actual = Vec::new();
        header.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, b"AB    00007".to_vec());

        Ok(())
    }

    #[test]
    fn write_header_too_large() {
        let header = TreTagHeader {
            tag: "AB".into(),
            length: 100_000,
        };

        let mut actual = Vec::new();
        assert!(header.write(&mut Cursor::new(&mut actual)).is_err());
    }

    #[test]
    fn overflow_accepts_any_segment() {
        assert!(TreLocation::Overflow.accepts(SegmentKind::File));
        assert!(TreLocation::Overflow.accepts(SegmentKind::Image));
        assert!(TreLocation::ImageExtendedSubheader.accepts(SegmentKind::Image));
        assert!(!TreLocation::ImageExtendedSubheader.accepts(SegmentKind::File));
    }

    #[test]
    fn overflow_codes() {
        for location in [
            TreLocation::FileUserDefinedHeader,
            TreLocation::FileExtendedHeader,
            TreLocation::ImageUserDefinedSubheader,
            TreLocation::ImageExtendedSubheader,
            TreLocation::GraphicExtendedSubheader,
            TreLocation::TextExtendedSubheader,
        ] {
            let code = location.overflow_code().unwrap();
            assert_eq!(TreLocation::from_overflow_code(code), Some(location));
        }
        assert_eq!(TreLocation::from_overflow_code("IXSHD "), Some(TreLocation::ImageExtendedSubheader));
        assert_eq!(TreLocation::from_overflow_code("BOGUS"), None);
    }
}
