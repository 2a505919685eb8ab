//! Issue-driven DUA automation.
//!
//! A DUA request is an issue naming a project, a product and a dashboard
//! submission. [`DuaWorkflow`] downloads the submission's driver, patches its
//! INF for the project, rebuilds the DUA package and attaches the results to
//! the issue. [`SubmitWorkflow`] later submits the newest attached package.
//!
//! External services sit behind the [`TicketClient`], [`Dashboard`] and
//! [`SigningTool`] traits. Every failure after the issue has been read is
//! reported back to the issue as a comment before it is returned.

use std::{io, path::PathBuf};

pub mod archive;
pub mod dashboard;
mod dua;
pub mod hlkx;
pub mod issue;
pub mod locate;
mod submit;
pub mod ticket;

pub use dashboard::{Dashboard, DashboardError};
pub use dua::{DuaOutcome, DuaSettings, DuaWorkflow};
pub use hlkx::{SigningTool, ToolError};
pub use submit::{SubmitOutcome, SubmitSettings, SubmitWorkflow, latest_hlkx};
pub use ticket::{TicketClient, TicketError};

use crate::storage::PatchError;
use archive::ArchiveError;

/// The issue a workflow runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    /// Repository in `owner/name` form.
    pub repo: String,
    /// The issue number.
    pub number: u64,
}

/// Errors that abort a workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The issue tracker could not be reached.
    #[error(transparent)]
    Ticket(#[from] TicketError),

    /// The issue lacks a required field.
    #[error("issue is missing the '{0}' field")]
    MissingField(&'static str),

    /// The submission assets could not be downloaded.
    #[error("failed to download submission assets")]
    Download(#[from] DashboardError),

    /// A driver archive could not be read or written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// No INF in the driver matches the product.
    #[error("no INF matching product '{product}' found")]
    InfNotFound {
        /// The product description from the issue.
        product: String,
    },

    /// The INF could not be patched.
    #[error("failed to patch INF")]
    Patch(#[from] PatchError),

    /// The signing tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// No comment carries an HLKX package.
    #[error("no HLKX package found in issue comments")]
    NoHlkxAsset,

    /// The work directory could not be prepared.
    #[error("failed to prepare '{}'", .path.display())]
    Io {
        /// The directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Posts failure comments on the issue a workflow runs for.
struct Reporter<'a> {
    tickets: &'a dyn TicketClient,
    issue: &'a IssueRef,
}

impl<'a> Reporter<'a> {
    const fn new(tickets: &'a dyn TicketClient, issue: &'a IssueRef) -> Self {
        Self { tickets, issue }
    }

    /// Posts `message`, then hands back the error. A failure to post is
    /// logged; the original error wins.
    fn fail(&self, message: &str, error: impl Into<WorkflowError>) -> WorkflowError {
        let error = error.into();
        tracing::error!("{message} ({error})");
        if let Err(post_error) =
            self.tickets
                .post_comment(&self.issue.repo, self.issue.number, message)
        {
            tracing::warn!("Failed to post failure comment: {post_error}");
        }
        error
    }
}

fn create_dir(path: &std::path::Path) -> Result<(), WorkflowError> {
    std::fs::create_dir_all(path).map_err(|source| WorkflowError::Io {
        path: path.to_path_buf(),
        source,
    })
}
