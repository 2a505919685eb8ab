use std::path::PathBuf;

use clap::Parser;
use dua::{InfType, storage::read_descriptor};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Show the detected type of INF files")]
pub struct Identify {
    /// INF files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Identify {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let mut unidentified = 0;

        for path in &self.files {
            let descriptor = match read_descriptor(path) {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    println!("{} {}: {error}", "✗".warning(), path.display());
                    unidentified += 1;
                    continue;
                }
            };

            if let Some(inf_type) = InfType::identify(&descriptor.text) {
                println!(
                    "{} {}: {} {}",
                    "✓".success(),
                    path.display(),
                    inf_type.label().info(),
                    format!("({}, {})", inf_type.config_path(), descriptor.codec).dim()
                );
            } else {
                println!(
                    "{} {}: unknown catalog file",
                    "✗".warning(),
                    path.display()
                );
                unidentified += 1;
            }
        }

        if unidentified > 0 {
            anyhow::bail!(
                "{unidentified} of {} files could not be identified",
                self.files.len()
            );
        }
        Ok(())
    }
}
