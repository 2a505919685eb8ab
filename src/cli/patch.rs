use std::{
    io::{self, IsTerminal},
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::Parser;
use dua::{
    Destination, PatchError, PatchReport, ProjectConfig, WriteOptions, patch_inf_file,
    storage::{DEFAULT_SIBLING_PREFIX, LineEnding},
};
use rayon::prelude::*;
use tracing::instrument;

use super::terminal::{Colorize, is_narrow};

#[derive(Debug, Parser)]
#[command(about = "Patch INF files with a project's hardware IDs and registry settings")]
pub struct Patch {
    /// INF files to patch (prompted for when omitted)
    files: Vec<PathBuf>,

    /// The project whose configuration is applied (prompted for when omitted)
    #[arg(short, long)]
    project: Option<String>,

    /// Overwrite the input files instead of writing prefixed copies
    #[arg(long, conflicts_with = "prefix")]
    in_place: bool,

    /// File name prefix of the patched copies
    #[arg(long, default_value = DEFAULT_SIBLING_PREFIX)]
    prefix: String,

    /// Write CRLF line endings
    #[arg(long)]
    crlf: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Patch {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config_path: &Path) -> anyhow::Result<()> {
        let config = ProjectConfig::load(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;

        let project = match self.project {
            Some(ref project) => project.clone(),
            None => prompt_project(&config)?,
        };
        // Fail once up front rather than once per file.
        config.project(&project)?;

        let files = if self.files.is_empty() {
            vec![prompt_file()?]
        } else {
            self.files.clone()
        };

        let options = self.write_options();
        let results: Vec<_> = files
            .par_iter()
            .map(|path| (path, patch_inf_file(path, &config, &project, &options)))
            .collect();

        match self.output {
            OutputFormat::Table => Self::output_table(&results),
            OutputFormat::Json => Self::output_json(&results)?,
        }

        let failed = results.iter().filter(|(_, result)| result.is_err()).count();
        if failed > 0 {
            bail!("{failed} of {} files could not be patched", results.len());
        }
        Ok(())
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            destination: if self.in_place {
                Destination::InPlace
            } else {
                Destination::Sibling {
                    prefix: self.prefix.clone(),
                }
            },
            line_ending: if self.crlf {
                LineEnding::Crlf
            } else {
                LineEnding::AsIs
            },
        }
    }

    fn output_table(results: &[(&PathBuf, Result<PatchReport, PatchError>)]) {
        let narrow = is_narrow();
        for (path, result) in results {
            match result {
                Ok(report) => {
                    let stats = &report.stats;
                    let summary = format!(
                        "{} ({}, {}): {} hardware IDs expanded to {} lines, {} registry sections",
                        report.output.display(),
                        report.inf_type,
                        report.codec,
                        stats.hardware_ids,
                        stats.expanded_lines,
                        stats.registry_sections,
                    );
                    if narrow {
                        println!("{} {}", "✓".success(), path.display());
                        println!("  {}", summary.dim());
                    } else {
                        println!("{} {} → {}", "✓".success(), path.display(), summary.dim());
                    }
                }
                Err(error) => {
                    println!("{} {}: {}", "✗".warning(), path.display(), error_chain(error));
                }
            }
        }
    }

    fn output_json(results: &[(&PathBuf, Result<PatchReport, PatchError>)]) -> anyhow::Result<()> {
        use serde_json::json;

        let files: Vec<_> = results
            .iter()
            .map(|(path, result)| match result {
                Ok(report) => json!({
                    "input": path,
                    "output": report.output,
                    "type": report.inf_type.label(),
                    "config_path": report.inf_type.config_path(),
                    "codec": report.codec.name(),
                    "extension_ids": report.stats.extension_ids,
                    "hardware_ids": report.stats.hardware_ids,
                    "expanded_lines": report.stats.expanded_lines,
                    "add_reg_lines": report.stats.add_reg_lines,
                    "registry_sections": report.stats.registry_sections,
                }),
                Err(error) => json!({
                    "input": path,
                    "error": error_chain(error),
                }),
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&files)?);
        Ok(())
    }
}

fn error_chain(error: &PatchError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn prompt_project(config: &ProjectConfig) -> anyhow::Result<String> {
    if !io::stdin().is_terminal() {
        bail!("--project is required when not running interactively");
    }

    let names: Vec<&str> = config.project_names().collect();
    if names.is_empty() {
        bail!("the configuration declares no projects");
    }

    let selection = names
        .iter()
        .fold(
            dialoguer::Select::new().with_prompt("Project"),
            |select, name| select.item(name),
        )
        .default(0)
        .interact()?;
    Ok(names[selection].to_string())
}

fn prompt_file() -> anyhow::Result<PathBuf> {
    if !io::stdin().is_terminal() {
        bail!("no INF files given");
    }

    let input: String = dialoguer::Input::new()
        .with_prompt("INF file path")
        .interact_text()?;
    // Paths dragged into a terminal are often quoted.
    Ok(PathBuf::from(input.trim().trim_matches('"')))
}
