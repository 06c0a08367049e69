use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::{Context, IntoDiagnostic, Result};
use nitf_tre::{collection::TreContent, Entry, Group, SchemaRegistry, TreCollection, TreLocation};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::debug;

pub mod diff;
pub mod inspect;
pub mod verify;

#[derive(clap::Subcommand)]
pub enum TreCommands {
    /// Print the records of an extension block
    Inspect(inspect::InspectArgs),
    /// Check that extension blocks are written back unchanged
    Verify(verify::VerifyArgs),
    /// Compare two extension blocks field by field
    Diff(diff::DiffArgs),
}

impl TreCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            TreCommands::Inspect(inspect) => inspect.handle(),
            TreCommands::Verify(verify) => verify.handle(),
            TreCommands::Diff(diff) => diff.handle(),
        }
    }
}

/// Where an extension block was taken from
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LocationArg {
    /// File header user defined data (UDHD)
    Udhd,
    /// File header extended data (XHD)
    Xhd,
    /// Image subheader user defined data (UDID)
    Udid,
    /// Image subheader extended data (IXSHD)
    Ixshd,
    /// Graphic subheader extended data (SXSHD)
    Sxshd,
    /// Symbol subheader extended data
    Symbol,
    /// Label subheader extended data
    Label,
    /// Text subheader extended data (TXSHD)
    Txshd,
    /// TRE overflow segment
    #[default]
    Overflow,
}

impl From<LocationArg> for TreLocation {
    fn from(value: LocationArg) -> Self {
        match value {
            LocationArg::Udhd => TreLocation::FileUserDefinedHeader,
            LocationArg::Xhd => TreLocation::FileExtendedHeader,
            LocationArg::Udid => TreLocation::ImageUserDefinedSubheader,
            LocationArg::Ixshd => TreLocation::ImageExtendedSubheader,
            LocationArg::Sxshd => TreLocation::GraphicExtendedSubheader,
            LocationArg::Symbol => TreLocation::SymbolExtendedSubheader,
            LocationArg::Label => TreLocation::LabelExtendedSubheader,
            LocationArg::Txshd => TreLocation::TextExtendedSubheader,
            LocationArg::Overflow => TreLocation::Overflow,
        }
    }
}

/// Options shared by every command reading extension blocks
#[derive(Args)]
struct BlockOptions {
    /// Where the block was taken from
    #[arg(short, long, value_enum, default_value_t = LocationArg::Overflow)]
    location: LocationArg,

    /// Additional schema documents, earlier documents take precedence
    #[arg(short, long, value_name = "FILE")]
    schema: Vec<PathBuf>,

    /// Do not load the builtin schemas
    #[arg(long, default_value_t = false)]
    no_builtin: bool,
}

impl BlockOptions {
    fn location(&self) -> TreLocation {
        self.location.into()
    }

    fn registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::with_options(
            nitf_tre::SchemaRegistryOptions::builder()
                .builtin_schemas(!self.no_builtin)
                .build(),
        )?;

        for path in &self.schema {
            let f = File::open(path)
                .into_diagnostic()
                .context(format!("path: {}", path.display()))?;
            let added = registry
                .register(f)
                .context(format!("loading schemas from {}", path.display()))?;
            debug!("registered {} schemas from {}", added, path.display());
        }

        Ok(registry)
    }

    fn read(&self, registry: &SchemaRegistry, path: &Path) -> Result<TreCollection> {
        let data = std::fs::read(path)
            .into_diagnostic()
            .context(format!("path: {}", path.display()))?;

        let tres = nitf_tre::TreReader::new(registry)
            .parse_block(&data, self.location())
            .context(format!("reading {}", path.display()))?;
        Ok(tres)
    }
}

/// Render a block as one line per field, loop iterations numbered from zero
fn render(tres: &TreCollection) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, tre) in tres.iter().enumerate() {
        match tre.content() {
            TreContent::Opaque(data) => lines.push(format!(
                "{}[{}] opaque, {} bytes: {}",
                tre.name(),
                index,
                data.len(),
                data.iter().take(32).map(|b| format!("{b:02x}")).join(" ")
            )),
            TreContent::Parsed(entries) => {
                lines.push(format!("{}[{}]", tre.name(), index));
                render_group(entries, 1, &mut lines);
            }
        }
    }
    lines
}

fn render_group(group: &Group, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for entry in group {
        match entry {
            Entry::Field { name, value, kind } => {
                lines.push(format!("{indent}{name} ({kind}) = {value:?}"));
            }
            Entry::Groups { name, groups } => {
                for (index, group) in groups.iter().enumerate() {
                    lines.push(format!("{indent}{name}[{index}]"));
                    render_group(group, depth + 1, lines);
                }
            }
        }
    }
}
