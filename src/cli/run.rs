use std::{env, path::{Path, PathBuf}};

use anyhow::Context;
use clap::Parser;
use dua::{
    ProjectConfig,
    workflow::{DuaSettings, DuaWorkflow, dashboard::DevCenterClient, hlkx::HlkxTool},
};
use tracing::instrument;

use super::{IssueArgs, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Process a DUA request issue")]
pub struct Run {
    #[command(flatten)]
    issue: IssueArgs,

    /// Dashboard API access token
    #[arg(long, env = "DASHBOARD_TOKEN", hide_env_values = true)]
    dashboard_token: Option<String>,

    /// Use placeholder assets when the dashboard download fails
    #[arg(
        long,
        env = "DUA_MOCK_MODE",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    mock: bool,

    /// Path to the HlkxTool executable
    #[arg(long, env = "HLKX_TOOL")]
    hlkx_tool: Option<PathBuf>,

    /// Directory for downloads and results
    #[arg(long, default_value = "temp_dua")]
    work_dir: PathBuf,
}

impl Run {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config_path: &Path) -> anyhow::Result<()> {
        let config = ProjectConfig::load(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        let issue = self.issue.issue()?;
        let tickets = self.issue.client()?;
        let dashboard = DevCenterClient::new(self.dashboard_token);
        let tool = HlkxTool::locate(self.hlkx_tool, &env::current_dir()?);

        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard,
            tool: &tool,
            config: &config,
            settings: DuaSettings {
                work_dir: self.work_dir,
                mock_mode: self.mock,
            },
        };
        let outcome = workflow
            .run(&issue)
            .with_context(|| format!("DUA run for {}#{} failed", issue.repo, issue.number))?;

        println!(
            "{} Patched {} ({})",
            "✓".success(),
            outcome.patch.output.display(),
            outcome.patch.inf_type
        );
        println!("{} Attached {}", "✓".success(), outcome.hlkx.display());
        println!("{} Attached {}", "✓".success(), outcome.driver_zip.display());
        Ok(())
    }
}
