use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use nitf_tre::{SchemaRegistry, TreWriter};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};
use walkdir::WalkDir;

use super::BlockOptions;

#[derive(Args)]
pub struct VerifyArgs {
    /// An input file holding one extension block
    #[arg(short, long, value_name = "FILE", conflicts_with = "directory", required_unless_present = "directory")]
    file: Option<PathBuf>,

    /// A directory of extension blocks, searched recursively
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Extension of the block files inside the directory
    #[arg(long, default_value = "bin")]
    extension: String,

    #[command(flatten)]
    options: BlockOptions,
}

impl VerifyArgs {
    #[instrument(skip_all, fields(file = %path.display()))]
    fn verify_block(&self, registry: &SchemaRegistry, path: &Path) -> Result<()> {
        let expected = std::fs::read(path)
            .into_diagnostic()
            .context(format!("path: {}", path.display()))?;

        let tres = self.options.read(registry, path)?;
        let actual = TreWriter::new(registry)
            .block_bytes(&tres, self.options.location())
            .context("writing records")?;

        if actual != expected {
            let offset = actual
                .iter()
                .zip(&expected)
                .position(|(a, e)| a != e)
                .unwrap_or(actual.len().min(expected.len()));
            return Err(miette!(
                "output differs from input at byte {} ({} vs {} bytes)",
                offset,
                actual.len(),
                expected.len()
            ));
        }

        info!("{} records verified", tres.len());
        Ok(())
    }

    fn files(&self) -> Vec<PathBuf> {
        match (&self.file, &self.directory) {
            (Some(file), _) => vec![file.clone()],
            (None, Some(directory)) => WalkDir::new(directory)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some(self.extension.as_str()))
                .collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn handle(&self) -> Result<()> {
        let registry = self.options.registry()?;

        let files = self.files();
        if files.is_empty() {
            return Err(miette!("no extension blocks found"));
        }

        let mut failures = 0;
        for path in &files {
            if let Err(report) = self.verify_block(&registry, path) {
                error!("{}: {:?}", path.display(), report);
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(miette!(
                "{} of {} blocks did not round trip",
                failures,
                files.len()
            ));
        }

        info!("all {} blocks round trip", files.len());
        Ok(())
    }
}
