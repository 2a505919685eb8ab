use std::{env, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use dua::workflow::{SubmitSettings, SubmitWorkflow, hlkx::HlkxTool};
use tracing::instrument;

use super::{IssueArgs, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Submit the newest DUA package attached to an issue")]
pub struct Submit {
    #[command(flatten)]
    issue: IssueArgs,

    /// Path to the HlkxTool executable
    #[arg(long, env = "HLKX_TOOL")]
    hlkx_tool: Option<PathBuf>,

    /// Driver version, also passed as the firmware version
    #[arg(long, default_value = "1.0")]
    driver_version: String,

    /// Directory the package is downloaded to
    #[arg(long, default_value = "temp_submit")]
    work_dir: PathBuf,
}

impl Submit {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let issue = self.issue.issue()?;
        let tickets = self.issue.client()?;
        let tool = HlkxTool::locate(self.hlkx_tool, &env::current_dir()?);

        let workflow = SubmitWorkflow {
            tickets: &tickets,
            tool: &tool,
            settings: SubmitSettings {
                work_dir: self.work_dir,
                driver_version: self.driver_version,
                ..SubmitSettings::default()
            },
        };
        let outcome = workflow
            .run(&issue)
            .with_context(|| format!("submission for {}#{} failed", issue.repo, issue.number))?;

        println!("{} Submitted {}", "✓".success(), outcome.hlkx.display());
        println!("{}", outcome.output.trim_end().dim());
        Ok(())
    }
}
