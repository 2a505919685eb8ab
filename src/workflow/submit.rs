use std::path::{Path, PathBuf};

use tracing::instrument;

use super::{
    IssueRef, Reporter, WorkflowError, create_dir,
    hlkx::{DUA_DRIVER_TYPE, SigningTool, SubmitRequest},
    issue::IssueFields,
    ticket::{Asset, Comment, TicketClient},
};

/// Notification address used when the issue author has no public email.
pub const FALLBACK_EMAIL: &str = "bot@example.com";

/// Driver name used when the issue names no project.
pub const FALLBACK_PROJECT: &str = "UnknownProject";

const MISSING_PRODUCT: &str = "❌ Missing Product ID in issue body.";
const NO_HLKX: &str = "❌ No HLKX package found in comments to submit.";

/// Where a submit run keeps its files, and how the driver is described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitSettings {
    /// Directory the package is downloaded to.
    pub work_dir: PathBuf,
    /// Driver version, also passed as the firmware version.
    pub driver_version: String,
    /// Driver type of the submission.
    pub driver_type: String,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("temp_submit"),
            driver_version: "1.0".to_string(),
            driver_type: DUA_DRIVER_TYPE.to_string(),
        }
    }
}

/// The result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// The submitted package.
    pub hlkx: PathBuf,
    /// Output of the signing tool.
    pub output: String,
}

/// Finds the newest HLKX attachment, scanning comments newest first.
///
/// Within a comment the first matching attachment wins.
#[must_use]
pub fn latest_hlkx(comments: &[Comment]) -> Option<&Asset> {
    comments.iter().rev().find_map(|comment| {
        comment.assets.iter().find(|asset| {
            Path::new(&asset.name)
                .extension()
                .is_some_and(|extension| extension == "hlkx")
        })
    })
}

/// Submits the package a [`super::DuaWorkflow`] attached to an issue.
pub struct SubmitWorkflow<'a> {
    /// The issue tracker.
    pub tickets: &'a dyn TicketClient,
    /// The tool submitting the package.
    pub tool: &'a dyn SigningTool,
    /// Work directory and driver description.
    pub settings: SubmitSettings,
}

impl SubmitWorkflow<'_> {
    /// Runs the workflow for an issue.
    ///
    /// The existing product is taken from the `Existing Product ID` field,
    /// or from `Product ID` when that is absent.
    ///
    /// # Errors
    ///
    /// Fails if the issue cannot be read, names no product, carries no HLKX
    /// package, or the submission fails. Failures after the issue has been
    /// read are also posted to the issue.
    #[instrument(skip(self), fields(repo = %issue.repo, issue = issue.number))]
    pub fn run(&self, issue: &IssueRef) -> Result<SubmitOutcome, WorkflowError> {
        let reporter = Reporter::new(self.tickets, issue);

        let ticket = self.tickets.get_issue(&issue.repo, issue.number)?;
        let email = ticket
            .user
            .email
            .as_deref()
            .filter(|email| !email.is_empty())
            .unwrap_or(FALLBACK_EMAIL);

        let fields = IssueFields::parse(ticket.body());
        let existing_product_id = fields
            .existing_product_id
            .as_deref()
            .or(fields.product_id.as_deref())
            .ok_or_else(|| reporter.fail(MISSING_PRODUCT, WorkflowError::MissingField("Product ID")))?;

        let comments = self
            .tickets
            .get_comments(&issue.repo, issue.number)
            .map_err(|error| reporter.fail(&failure_comment(&error), error))?;
        let asset =
            latest_hlkx(&comments).ok_or_else(|| reporter.fail(NO_HLKX, WorkflowError::NoHlkxAsset))?;

        create_dir(&self.settings.work_dir)
            .map_err(|error| reporter.fail(&failure_comment(&error), error))?;
        let hlkx = self.settings.work_dir.join(local_name(&asset.name));
        tracing::info!("Downloading {} to {}", asset.name, hlkx.display());
        self.tickets
            .download_file(&asset.browser_download_url, &hlkx)
            .map_err(|error| reporter.fail(&failure_comment(&error), error))?;

        let request = SubmitRequest {
            hlkx: &hlkx,
            to_email: email,
            driver_name: fields.project_name.as_deref().unwrap_or(FALLBACK_PROJECT),
            driver_version: &self.settings.driver_version,
            driver_type: &self.settings.driver_type,
            existing_product_id: Some(existing_product_id),
        };
        let output = self
            .tool
            .submit(&request)
            .map_err(|error| reporter.fail(&failure_comment(&error), error))?;

        self.tickets.post_comment(
            &issue.repo,
            issue.number,
            &format!("✅ **Submission Successful**\n\n```\n{output}\n```"),
        )?;

        Ok(SubmitOutcome { hlkx, output })
    }
}

fn failure_comment(error: &dyn std::error::Error) -> String {
    format!("❌ **Submission Failed**\n\nError: {error}")
}

/// Attachment names come from the tracker; keep only the final component.
fn local_name(name: &str) -> &std::ffi::OsStr {
    Path::new(name)
        .file_name()
        .unwrap_or_else(|| "package.hlkx".as_ref())
}
