use nitf_tre::{error::Error, Entry, SchemaRegistry, TreCollection, TreLocation, TreReader};
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_test::traced_test;
use walkdir::WalkDir;

fn resources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("resources")
}

fn registry() -> Result<SchemaRegistry, Error> {
    let mut registry = SchemaRegistry::new()?;
    for entry in WalkDir::new(resources().join("schemas"))
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        registry.register(File::open(entry.path())?)?;
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

fn read_block(registry: &SchemaRegistry, name: &str) -> Result<TreCollection, Error> {
    let path = resources().join("blocks").join(name);
    let location = location_of(&path).expect("block directory names a location");
    TreReader::new(registry).parse_block(&fs::read(path)?, location)
}

fn validate_block(registry: &SchemaRegistry, path: &Path) -> Result<(), Error> {
    info!("testing {}", path.display());

    let location = location_of(path).expect("block directory names a location");
    let tres = TreReader::new(registry).parse_block(&fs::read(path)?, location)?;

    let expected = fs::read_to_string(path.with_extension("tags"))?
        .lines()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let actual = tres
        .iter()
        .map(|tre| match tre.is_opaque() {
            true => format!("{}*", tre.name()),
            false => tre.name().to_string(),
        })
        .collect::<Vec<_>>();

    assert_eq!(actual, expected);
    assert!(tres.iter().all(|tre| tre.location() == location));

    Ok(())
}

#[traced_test]
#[test]
fn validate_block_parsing() -> Result<(), Error> {
    let registry = registry()?;

    let to_test = WalkDir::new(resources().join("blocks"))
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "bin"))
        .collect::<Vec<_>>();
    assert!(!to_test.is_empty());

    for path in to_test {
        validate_block(&registry, &path)?;
    }

    Ok(())
}

#[test]
fn read_image_fields() -> Result<(), Error> {
    let registry = registry()?;
    let tres = read_block(&registry, "image/blocka_use00a.bin")?;

    let blocka = tres.with_name("BLOCKA").next().unwrap();
    assert_eq!(blocka.int_value("BLOCK_INSTANCE"), Some(1));
    assert_eq!(blocka.int_value("L_LINES"), Some(2048));
    assert_eq!(blocka.field("FRLC_LOC"), Some("421919.44N0712144.14W"));
    assert_eq!(blocka.entries().unwrap().len(), 9);

    let use00a = tres.with_name("USE00A").next().unwrap();
    assert_eq!(use00a.int_value("ANGLE_TO_NORTH"), Some(270));
    assert_eq!(use00a.real_value("MEAN_GSD"), Some(12.5));
    assert_eq!(use00a.real_value("ROLL_ANG"), Some(-3.25));
    assert_eq!(use00a.field("SUN_AZ"), Some("123.4"));

    let opaque = tres.with_name("ABCDEF").next().unwrap();
    assert_eq!(opaque.raw_data(), Some(&b"X........."[..]));

    Ok(())
}

#[test]
fn read_loops_and_conditions() -> Result<(), Error> {
    let registry = registry()?;
    let tres = read_block(&registry, "file/header.bin")?;

    let tstfil = &tres[0];
    let items = tstfil.entry("ITEMS").and_then(Entry::groups).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].field("CODE"), Some("ABC"));
    assert_eq!(items[1].field("VALUE"), Some("-02.25"));
    assert_eq!(tstfil.field("NOTE"), Some("note"));

    Ok(())
}

#[test]
fn read_binary_fields() -> Result<(), Error> {
    let registry = registry()?;
    let tres = read_block(&registry, "overflow/des.bin")?;

    let tstbin = tres.with_name("TSTBIN").next().unwrap();
    assert_eq!(tstbin.field("LEN"), Some("\u{0}\u{4}"));
    assert_eq!(tstbin.field("DATA"), Some("\u{1}\u{2}\u{fe}\u{ff}"));
    assert_eq!(tstbin.field("EXTRA"), Some("abc"));

    let ichipb = tres.with_name("ICHIPB").next().unwrap();
    assert_eq!(ichipb.real_value("SCALE_FACTOR"), Some(1.0));
    assert_eq!(ichipb.real_value("OP_ROW_22"), Some(2047.5));
    assert_eq!(ichipb.int_value("FI_COL"), Some(2048));

    Ok(())
}

#[test]
fn read_without_schemas() -> Result<(), Error> {
    let registry = SchemaRegistry::empty();
    let tres = read_block(&registry, "overflow/des.bin")?;

    assert_eq!(tres.len(), 3);
    assert!(tres.iter().all(|tre| tre.is_opaque()));

    Ok(())
}
