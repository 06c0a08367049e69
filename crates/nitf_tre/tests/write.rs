use miette::{IntoDiagnostic, Result};
use nitf_tre::{
    error::Error, schema::FieldKind, Entry, Group, SchemaRegistry, Tre, TreCollection,
    TreLocation, TreReader, TreWriter,
};
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use tracing_test::traced_test;
use walkdir::WalkDir;

fn resources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("resources")
}

fn registry() -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new()?;
    for entry in WalkDir::new(resources().join("schemas"))
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        registry.register(File::open(entry.path()).into_diagnostic()?)?;
    }
    Ok(registry)
}

fn location_of(path: &Path) -> Option<TreLocation> {
    match path.parent()?.file_name()?.to_str()? {
        "file" => Some(TreLocation::FileExtendedHeader),
        "image" => Some(TreLocation::ImageExtendedSubheader),
        "overflow" => Some(TreLocation::Overflow),
        _ => None,
    }
}

#[instrument(skip_all, fields(file=%path.file_name().unwrap().to_string_lossy()))]
fn validate_block_round_trip(registry: &SchemaRegistry, path: &Path) -> Result<()> {
    let location = location_of(path).expect("block directory names a location");
    let expected = fs::read(path).into_diagnostic()?;

    let tres = TreReader::new(registry).parse_block(&expected, location)?;
    info!("read {} records", tres.len());

    let mut actual = Vec::new();
    let written = TreWriter::new(registry).write_block(&mut actual, &tres, location)?;

    assert_eq!(written, expected.len());
    assert_eq!(actual, expected);

    let reparsed = TreReader::new(registry).parse_block(&actual, location)?;
    assert_eq!(reparsed, tres);

    Ok(())
}

#[traced_test]
#[test]
fn validate_block_writing() -> Result<()> {
    let registry = registry()?;

    let to_test = WalkDir::new(resources().join("blocks"))
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "bin"));

    for path in to_test {
        validate_block_round_trip(&registry, &path)?;
    }

    Ok(())
}

fn tstfil(num: &str, items: &[(&str, &str)]) -> Tre {
    let groups = items
        .iter()
        .map(|(code, value)| {
            Group::new(vec![
                Entry::new_field("CODE", *code, FieldKind::String),
                Entry::new_field("VALUE", *value, FieldKind::Real),
            ])
        })
        .collect();

    Tre::parsed(
        "TSTFIL",
        TreLocation::FileExtendedHeader,
        Group::new(vec![
            Entry::new_field("NUM", num, FieldKind::Integer),
            Entry::new_groups("ITEMS", groups),
            Entry::new_field("NOTE", "hi", FieldKind::String),
        ]),
    )
}

#[test]
fn write_padded_entries() -> Result<()> {
    let registry = registry()?;
    let writer = TreWriter::new(&registry);

    let tre = tstfil("1", &[("A", "7.5")]);
    let bytes = writer.to_bytes(&tre, TreLocation::FileExtendedHeader)?;
    assert_eq!(bytes, b"TSTFIL0001701A  7.5000hi    ".to_vec());

    let tres = TreReader::new(&registry).parse_block(&bytes, TreLocation::FileExtendedHeader)?;
    assert_eq!(tres[0].field("NUM"), Some("01"));
    assert_eq!(tres[0].field("NOTE"), Some("hi  "));

    Ok(())
}

#[test]
fn write_empty_loop() -> Result<()> {
    let registry = registry()?;
    let writer = TreWriter::new(&registry);

    let bytes = writer.to_bytes(&tstfil("0", &[]), TreLocation::FileExtendedHeader)?;
    assert_eq!(bytes, b"TSTFIL0000400  ".to_vec());

    Ok(())
}

#[test]
fn reject_invalid_entries() -> Result<()> {
    let registry = registry()?;
    let writer = TreWriter::new(&registry);

    let too_many = tstfil("21", &[]);
    assert!(matches!(
        writer.to_bytes(&too_many, TreLocation::FileExtendedHeader),
        Err(Error::FieldRange { .. })
    ));

    let mismatch = tstfil("2", &[("A", "1.0")]);
    assert!(matches!(
        writer.to_bytes(&mismatch, TreLocation::FileExtendedHeader),
        Err(Error::LoopCountMismatch { expected: 2, actual: 1, .. })
    ));

    let misplaced = tstfil("1", &[("A", "1.0")]);
    assert!(matches!(
        writer.to_bytes(&misplaced, TreLocation::ImageExtendedSubheader),
        Err(Error::PlacementMismatch { .. })
    ));

    Ok(())
}

#[test]
fn write_failure_leaves_output_untouched() -> Result<()> {
    let registry = registry()?;
    let writer = TreWriter::new(&registry);

    let collection = [
        Tre::opaque("ABCDEF", TreLocation::FileExtendedHeader, b"X".to_vec()),
        tstfil("99", &[]),
    ]
    .into_iter()
    .collect::<TreCollection>();

    let mut out = Vec::new();
    assert!(writer
        .write_block(&mut out, &collection, TreLocation::FileExtendedHeader)
        .is_err());
    assert!(out.is_empty());

    Ok(())
}

#[test]
fn reattach_overflow_records() -> Result<()> {
    let registry = registry()?;
    let reader = TreReader::new(&registry);
    let writer = TreWriter::new(&registry);

    let block = fs::read(resources().join("blocks/image/blocka_use00a.bin")).into_diagnostic()?;
    let overflow = reader.parse_block(&block, TreLocation::Overflow)?;

    let mut subheader = TreCollection::new();
    subheader.reattach(overflow, TreLocation::ImageExtendedSubheader);

    assert_eq!(
        writer.block_bytes(&subheader, TreLocation::ImageExtendedSubheader)?,
        block
    );

    Ok(())
}
