use clap::{Args, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tracing::info;

use super::{render, BlockOptions};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct InspectArgs {
    /// An input file holding one extension block
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    #[command(flatten)]
    options: BlockOptions,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

impl InspectArgs {
    pub fn handle(&self) -> Result<()> {
        let registry = self.options.registry()?;
        let tres = self.options.read(&registry, &self.file)?;
        info!("read {} records from {}", tres.len(), self.file.display());

        match self.format {
            Format::Text => render(&tres).iter().for_each(|line| println!("{line}")),
            Format::Json => {
                println!("{}", serde_json::to_string_pretty(&tres).into_diagnostic()?)
            }
        }

        Ok(())
    }
}
