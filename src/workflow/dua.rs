use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::instrument;

use super::{
    IssueRef, Reporter, WorkflowError, archive, create_dir,
    dashboard::{Assets, Dashboard, DashboardError, MockDashboard},
    hlkx::SigningTool,
    issue::IssueFields,
    locate::locate_inf,
    ticket::TicketClient,
};
use crate::{
    domain::ProjectConfig,
    storage::{LineEnding, PatchReport, WriteOptions, patch_inf_file},
};

const DOWNLOAD_FAILED: &str = "❌ Failed to download initial driver and shell from Dashboard.";
const INVALID_DRIVER: &str = "❌ Downloaded driver file is invalid.";
const INF_NOT_FOUND: &str = "⚠️ Could not identify target INF file or file not found.";
const PATCH_FAILED: &str = "❌ Failed to patch INF file.";
const WORKSPACE_FAILED: &str = "❌ Failed to prepare the work directory.";
const PACKAGE_FAILED: &str = "❌ Failed to archive the processed driver.";
const UPLOAD_FAILED: &str = "❌ Failed to upload processed artifacts.";

/// Where a DUA run keeps its files, and whether placeholder assets may be
/// used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuaSettings {
    /// Directory holding downloads, the extracted driver and the results.
    pub work_dir: PathBuf,
    /// Use [`MockDashboard`] assets when the dashboard download fails.
    pub mock_mode: bool,
}

impl Default for DuaSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("temp_dua"),
            mock_mode: false,
        }
    }
}

impl DuaSettings {
    /// The directory the driver package is extracted to.
    #[must_use]
    pub fn extract_dir(&self) -> PathBuf {
        self.work_dir.join("extracted_driver")
    }

    /// The rebuilt DUA package.
    #[must_use]
    pub fn processed_hlkx(&self) -> PathBuf {
        self.work_dir.join("processed.hlkx")
    }

    /// The archive of the patched driver.
    #[must_use]
    pub fn processed_driver_zip(&self) -> PathBuf {
        self.work_dir.join("processed_driver.zip")
    }
}

/// The artifacts of a successful DUA run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuaOutcome {
    /// The patched INF file.
    pub patch: PatchReport,
    /// The rebuilt DUA package.
    pub hlkx: PathBuf,
    /// The archive of the patched driver.
    pub driver_zip: PathBuf,
    /// The success comment the artifacts are attached to.
    pub comment_id: u64,
}

/// Processes a DUA request issue.
pub struct DuaWorkflow<'a> {
    /// The issue tracker.
    pub tickets: &'a dyn TicketClient,
    /// The source of submission assets.
    pub dashboard: &'a dyn Dashboard,
    /// The tool rebuilding the DUA package.
    pub tool: &'a dyn SigningTool,
    /// Project configurations for INF patching.
    pub config: &'a ProjectConfig,
    /// Work directory and mock mode.
    pub settings: DuaSettings,
}

impl DuaWorkflow<'_> {
    /// Runs the workflow for an issue.
    ///
    /// # Errors
    ///
    /// Fails if the issue cannot be read or lacks its project name or
    /// submission ID, or if any later step fails. Failures after that point
    /// are also posted to the issue.
    #[instrument(skip(self), fields(repo = %issue.repo, issue = issue.number))]
    pub fn run(&self, issue: &IssueRef) -> Result<DuaOutcome, WorkflowError> {
        let reporter = Reporter::new(self.tickets, issue);

        let ticket = self.tickets.get_issue(&issue.repo, issue.number)?;
        let fields = IssueFields::parse(ticket.body());
        tracing::debug!(?fields, "parsed issue");

        let project = fields
            .project_name
            .as_deref()
            .ok_or(WorkflowError::MissingField("Project Name"))?;
        let submission_id = fields
            .submission_id
            .as_deref()
            .ok_or(WorkflowError::MissingField("Submission ID"))?;

        let work_dir = &self.settings.work_dir;
        create_dir(work_dir).map_err(|error| reporter.fail(WORKSPACE_FAILED, error))?;

        let assets = self
            .download(submission_id, work_dir)
            .map_err(|error| reporter.fail(DOWNLOAD_FAILED, error))?;

        let extract_dir = self.settings.extract_dir();
        if extract_dir.exists() {
            fs::remove_dir_all(&extract_dir).map_err(|source| {
                reporter.fail(
                    WORKSPACE_FAILED,
                    WorkflowError::Io {
                        path: extract_dir.clone(),
                        source,
                    },
                )
            })?;
        }
        archive::extract(&assets.driver, &extract_dir)
            .map_err(|error| reporter.fail(INVALID_DRIVER, error))?;

        let product = fields.product_id.as_deref().unwrap_or_default();
        let inf = locate_inf(&extract_dir, product).ok_or_else(|| {
            reporter.fail(
                INF_NOT_FOUND,
                WorkflowError::InfNotFound {
                    product: product.to_string(),
                },
            )
        })?;

        tracing::info!("Patching {} for project {project}", inf.display());
        // Driver packages are built and signed on Windows.
        let options = WriteOptions {
            line_ending: LineEnding::Crlf,
            ..WriteOptions::in_place()
        };
        let patch = patch_inf_file(&inf, self.config, project, &options)
            .map_err(|error| reporter.fail(PATCH_FAILED, error))?;

        let hlkx = self.settings.processed_hlkx();
        self.tool
            .dua(&assets.hlkx, &extract_dir, &hlkx)
            .map_err(|error| reporter.fail(&format!("❌ HlkxTool DUA failed: {error}"), error))?;

        let driver_zip = self.settings.processed_driver_zip();
        archive::create(&extract_dir, &driver_zip)
            .map_err(|error| reporter.fail(PACKAGE_FAILED, error))?;

        let comment = self
            .tickets
            .post_comment(
                &issue.repo,
                issue.number,
                &success_comment(project, submission_id),
            )
            .map_err(|error| reporter.fail(UPLOAD_FAILED, error))?;
        for artifact in [&hlkx, &driver_zip] {
            self.tickets
                .upload_attachment(&issue.repo, comment.id, artifact)
                .map_err(|error| reporter.fail(UPLOAD_FAILED, error))?;
        }
        tracing::info!("Upload complete");

        Ok(DuaOutcome {
            patch,
            hlkx,
            driver_zip,
            comment_id: comment.id,
        })
    }

    fn download(&self, submission_id: &str, directory: &Path) -> Result<Assets, DashboardError> {
        match self.dashboard.download_assets(submission_id, directory) {
            Err(error) if self.settings.mock_mode => {
                tracing::warn!("Dashboard download failed ({error}), using mock assets");
                MockDashboard.download_assets(submission_id, directory)
            }
            result => result,
        }
    }
}

fn success_comment(project: &str, submission_id: &str) -> String {
    format!(
        "✅ **DUA Processing Complete**\nProject: {project}\nSubmission ID: {submission_id}\n\nProcessed Driver and HLKX attached.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::InfType,
        storage::read_descriptor,
        workflow::fakes::{FakeDashboard, FakeTickets, FakeTool},
    };

    const ISSUE: &str = "### Project Name\n\nchogori\n\n### Product ID\n\nGraphics Base INF Template\n\n### Submission ID\n\n1152921505698059287\n";

    const CONFIG: &str = r#"{"project": {"chogori": {"gfx": {"base": {
        "dev_id": ["B080"],
        "subsys_id": ["0BDA1028"]
    }}}}}"#;

    const INF: &str = "[Version]\nCatalogFile = igdlh.cat\n\n[Intel.NTamd64]\n%iPTLGT% = PTL_IG, PCI\\VEN_8086&DEV_B080\n";

    fn issue() -> IssueRef {
        IssueRef {
            repo: "owner/dua".to_string(),
            number: 12,
        }
    }

    fn dashboard() -> FakeDashboard {
        FakeDashboard {
            driver_files: vec![("Graphics/iigd_dch.inf", INF), ("Graphics/igdlh.cat", "cat")],
            unavailable: false,
        }
    }

    fn settings(work_dir: &Path) -> DuaSettings {
        DuaSettings {
            work_dir: work_dir.to_path_buf(),
            mock_mode: false,
        }
    }

    #[test]
    fn request_is_patched_rebuilt_and_attached() {
        let tmp = tempfile::tempdir().unwrap();
        let tickets = FakeTickets::new(ISSUE);
        let tool = FakeTool::default();
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard(),
            tool: &tool,
            config: &config,
            settings: settings(tmp.path()),
        };

        let outcome = workflow.run(&issue()).unwrap();

        let inf = tmp.path().join("extracted_driver/Graphics/iigd_dch.inf");
        assert_eq!(outcome.patch.output, inf);
        assert_eq!(outcome.patch.inf_type, InfType::GfxBase);
        let patched = read_descriptor(&inf).unwrap().text;
        assert!(patched.ends_with("PCI\\VEN_8086&DEV_B080&SUBSYS_0BDA1028"));
        assert!(patched.contains("\r\n\r\n[Intel.NTamd64]\r\n"));
        assert!(patched.starts_with("[Version]\r\nCatalogFile = igdlh.cat\r\n"));

        assert_eq!(
            tool.calls.borrow()[0],
            [
                tmp.path().join("shell.hlkx").display().to_string(),
                tmp.path().join("extracted_driver").display().to_string(),
                tmp.path().join("processed.hlkx").display().to_string(),
            ]
        );

        let posted = tickets.posted();
        assert_eq!(posted.len(), 1);
        assert!(posted[0].contains("Project: chogori"));
        assert!(posted[0].contains("Submission ID: 1152921505698059287"));
        assert_eq!(
            *tickets.uploads.borrow(),
            [
                (outcome.comment_id, tmp.path().join("processed.hlkx")),
                (outcome.comment_id, tmp.path().join("processed_driver.zip")),
            ]
        );

        // The uploaded archive carries the patched INF.
        let check = tmp.path().join("check");
        archive::extract(&outcome.driver_zip, &check).unwrap();
        assert_eq!(
            fs::read(check.join("Graphics/iigd_dch.inf")).unwrap(),
            fs::read(&inf).unwrap()
        );
    }

    #[test]
    fn missing_submission_id_aborts_silently() {
        let tmp = tempfile::tempdir().unwrap();
        let tickets = FakeTickets::new("### Project Name\n\nchogori\n");
        let config = ProjectConfig::default();
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard(),
            tool: &FakeTool::default(),
            config: &config,
            settings: settings(tmp.path()),
        };

        let error = workflow.run(&issue()).unwrap_err();

        assert!(matches!(error, WorkflowError::MissingField("Submission ID")));
        assert!(tickets.posted().is_empty());
    }

    #[test]
    fn download_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let tickets = FakeTickets::new(ISSUE);
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let unavailable = FakeDashboard {
            unavailable: true,
            ..FakeDashboard::default()
        };
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &unavailable,
            tool: &FakeTool::default(),
            config: &config,
            settings: settings(tmp.path()),
        };

        let error = workflow.run(&issue()).unwrap_err();

        assert!(matches!(error, WorkflowError::Download(_)));
        assert_eq!(tickets.posted(), [DOWNLOAD_FAILED]);
    }

    #[test]
    fn mock_mode_falls_back_to_placeholder_assets() {
        let tmp = tempfile::tempdir().unwrap();
        let tickets = FakeTickets::new(ISSUE);
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let unavailable = FakeDashboard {
            unavailable: true,
            ..FakeDashboard::default()
        };
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &unavailable,
            tool: &FakeTool::default(),
            config: &config,
            settings: DuaSettings {
                work_dir: tmp.path().to_path_buf(),
                mock_mode: true,
            },
        };

        let error = workflow.run(&issue()).unwrap_err();

        // The placeholder driver is an empty archive, so no INF is found.
        assert!(tmp.path().join("duashell.hlkx").is_file());
        assert!(matches!(error, WorkflowError::InfNotFound { .. }));
        assert_eq!(tickets.posted(), [INF_NOT_FOUND]);
    }

    #[test]
    fn unknown_project_is_reported_as_patch_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let tickets = FakeTickets::new(&ISSUE.replace("chogori", "kailash"));
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard(),
            tool: &FakeTool::default(),
            config: &config,
            settings: settings(tmp.path()),
        };

        let error = workflow.run(&issue()).unwrap_err();

        assert!(matches!(error, WorkflowError::Patch(_)));
        assert_eq!(tickets.posted(), [PATCH_FAILED]);
    }

    #[test]
    fn tool_failure_is_reported_with_details() {
        let tmp = tempfile::tempdir().unwrap();
        let tickets = FakeTickets::new(ISSUE);
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let tool = FakeTool {
            fail: true,
            ..FakeTool::default()
        };
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard(),
            tool: &tool,
            config: &config,
            settings: settings(tmp.path()),
        };

        let error = workflow.run(&issue()).unwrap_err();

        assert!(matches!(error, WorkflowError::Tool(_)));
        let posted = tickets.posted();
        assert_eq!(posted.len(), 1);
        assert!(posted[0].starts_with("❌ HlkxTool DUA failed: dua failed with exit code 1"));
        assert!(tickets.uploads.borrow().is_empty());
    }

    #[test]
    fn packaging_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory in the way of the archive.
        fs::create_dir_all(tmp.path().join("processed_driver.zip")).unwrap();
        let tickets = FakeTickets::new(ISSUE);
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard(),
            tool: &FakeTool::default(),
            config: &config,
            settings: settings(tmp.path()),
        };

        let error = workflow.run(&issue()).unwrap_err();

        assert!(matches!(error, WorkflowError::Archive(_)));
        assert_eq!(tickets.posted(), [PACKAGE_FAILED]);
        assert!(tickets.uploads.borrow().is_empty());
    }

    #[test]
    fn unusable_work_dir_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work");
        fs::write(&work_dir, "not a directory").unwrap();
        let tickets = FakeTickets::new(ISSUE);
        let config: ProjectConfig = CONFIG.parse().unwrap();
        let workflow = DuaWorkflow {
            tickets: &tickets,
            dashboard: &dashboard(),
            tool: &FakeTool::default(),
            config: &config,
            settings: settings(&work_dir),
        };

        let error = workflow.run(&issue()).unwrap_err();

        assert!(matches!(error, WorkflowError::Io { .. }));
        assert_eq!(tickets.posted(), [WORKSPACE_FAILED]);
    }
}
