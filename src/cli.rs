use std::{env, path::PathBuf};

mod identify;
mod patch;
mod run;
mod submit;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use dua::workflow::{IssueRef, ticket::GiteaClient};
use identify::Identify;
use patch::Patch;
use run::Run;
use submit::Submit;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The project configuration file
    #[arg(
        short,
        long,
        env = "DUA_CONFIG",
        default_value = "config/config.json",
        global = true
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(self.config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Patch INF files with a project's hardware IDs and registry settings
    Patch(Patch),

    /// Show the detected type of INF files
    Identify(Identify),

    /// Process a DUA request issue
    ///
    /// Downloads the submission's driver, patches its INF, rebuilds the DUA
    /// package and attaches the results to the issue.
    Run(Run),

    /// Submit the newest DUA package attached to an issue
    Submit(Submit),
}

impl Command {
    fn run(self, config: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Patch(command) => command.run(&config)?,
            Self::Identify(command) => command.run()?,
            Self::Run(command) => command.run(&config)?,
            Self::Submit(command) => command.run()?,
        }
        Ok(())
    }
}

/// Where the request issue lives and how to reach the tracker.
#[derive(Debug, clap::Args)]
pub struct IssueArgs {
    /// Repository in `owner/name` form [env: GITHUB_REPOSITORY, GITEA_REPOSITORY]
    #[arg(long)]
    repo: Option<String>,

    /// The issue number
    #[arg(long, env = "ISSUE_NUMBER")]
    issue: u64,

    /// Issue tracker access token [env: GITEA_TOKEN, GITHUB_TOKEN]
    #[arg(long)]
    token: Option<String>,

    /// Issue tracker repository API endpoint
    #[arg(long, default_value = GiteaClient::DEFAULT_BASE_URL)]
    api_url: String,
}

impl IssueArgs {
    fn issue(&self) -> anyhow::Result<IssueRef> {
        let repo = self
            .repo
            .clone()
            .or_else(|| first_env(&["GITHUB_REPOSITORY", "GITEA_REPOSITORY"]))
            .context("missing repository (pass --repo or set GITEA_REPOSITORY)")?;
        Ok(IssueRef {
            repo,
            number: self.issue,
        })
    }

    fn client(&self) -> anyhow::Result<GiteaClient> {
        let token = self
            .token
            .clone()
            .or_else(|| first_env(&["GITEA_TOKEN", "GITHUB_TOKEN"]))
            .context("missing issue tracker token (pass --token or set GITEA_TOKEN)")?;
        Ok(GiteaClient::new(token).with_base_url(&self.api_url))
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|value| !value.is_empty()))
}
