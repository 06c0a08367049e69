use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::Result;
use nitf_tre::TreCollection;
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};
use std::{fmt::Display, path::PathBuf};
use tracing::info;

use super::{render, BlockOptions};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    /// Only list tags that were added or removed
    Summary,
    /// List changed tags and every changed field
    #[default]
    Full,
}

#[derive(Debug, Eq, PartialEq)]
enum Change {
    Added(String),
    Removed(String),
    Comparison(String, String, String),
    Context(Vec<String>),
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(v) => writeln!(f, "✅ {}", v.green()),
            Change::Removed(v) => writeln!(f, "❌ {}", v.red()),
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Context(lines) => writeln!(f, "{}", lines.iter().join("\n")),
        }
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// The original extension block
    #[arg(short, long, value_name = "FILE")]
    old: PathBuf,

    /// The changed extension block
    #[arg(short, long, value_name = "FILE")]
    new: PathBuf,

    #[command(flatten)]
    options: BlockOptions,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,
}

impl DiffArgs {
    fn compare_tags(&self, old: &TreCollection, new: &TreCollection) -> Vec<Change> {
        let mut result = Vec::new();

        if old.len() != new.len() {
            result.push(Change::Comparison(
                "records".into(),
                old.len().to_string(),
                new.len().to_string(),
            ));
        }

        let old_names = old.unique_names();
        let new_names = new.unique_names();

        new_names
            .iter()
            .filter(|name| !old_names.contains(*name))
            .for_each(|name| result.push(Change::Added(name.to_string())));

        old_names
            .iter()
            .filter(|name| !new_names.contains(*name))
            .for_each(|name| result.push(Change::Removed(name.to_string())));

        result
    }

    fn compare_fields(&self, old: &TreCollection, new: &TreCollection) -> Option<Change> {
        let old = render(old).iter().map(|l| format!("{l}\n")).join("");
        let new = render(new).iter().map(|l| format!("{l}\n")).join("");

        let diff = TextDiff::from_lines(&old, &new);
        if diff.ratio() >= 1.0 {
            return None;
        }

        let mut lines = Vec::new();
        for group in diff.grouped_ops(1) {
            for op in group {
                for change in diff.iter_inline_changes(&op) {
                    let mut line = match change.tag() {
                        ChangeTag::Delete => format!("{}", "-".red()),
                        ChangeTag::Insert => format!("{}", "+".green()),
                        ChangeTag::Equal => " ".to_string(),
                    };

                    for (emphasized, value) in change.iter_strings_lossy() {
                        let value = value.trim_end_matches('\n');
                        match (emphasized, change.tag()) {
                            (true, ChangeTag::Insert) => {
                                line.push_str(&format!("{}", value.green().underline()))
                            }
                            (true, _) => line.push_str(&format!("{}", value.red().underline())),
                            (false, ChangeTag::Insert) => {
                                line.push_str(&format!("{}", value.green()))
                            }
                            (false, ChangeTag::Delete) => {
                                line.push_str(&format!("{}", value.red()))
                            }
                            (false, ChangeTag::Equal) => {
                                line.push_str(&format!("{}", value.dimmed()))
                            }
                        }
                    }
                    lines.push(line);
                }
            }
        }

        Some(Change::Context(lines))
    }

    pub fn handle(&self) -> Result<()> {
        let registry = self.options.registry()?;
        let old = self.options.read(&registry, &self.old)?;
        let new = self.options.read(&registry, &self.new)?;

        let mut changes = self.compare_tags(&old, &new);
        if self.mode == Mode::Full {
            changes.extend(self.compare_fields(&old, &new));
        }

        if changes.is_empty() {
            info!("blocks are identical");
            return Ok(());
        }

        println!("🔃 {} vs {}", self.old.display().blue(), self.new.display().blue());
        for change in changes {
            print!("{}", change);
        }

        Ok(())
    }
}
