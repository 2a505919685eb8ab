//! The hardware dashboard holding the submissions DUA packages derive from.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use reqwest::{blocking::Client, header::AUTHORIZATION};
use serde::Deserialize;

/// The initial driver package and DUA shell of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assets {
    /// The zipped initial driver.
    pub driver: PathBuf,
    /// The DUA shell HLKX package.
    pub hlkx: PathBuf,
}

/// A submission as returned by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Submission {
    /// Downloadable files of the submission.
    #[serde(default)]
    pub downloads: Vec<Download>,
}

/// One downloadable file of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Download {
    /// Where to fetch the file.
    pub url: String,
    /// The file name.
    pub name: String,
    /// What the file is, `driver` or `hlkx`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Errors talking to the dashboard.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No access token is available.
    #[error("not authenticated to the dashboard API")]
    NotAuthenticated,

    /// The request failed or the dashboard answered with an error status.
    #[error("dashboard request failed")]
    Http(#[from] reqwest::Error),

    /// A downloaded file could not be written.
    #[error("failed to write '{}'", .path.display())]
    Io {
        /// The local file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The submission lacks a required download.
    #[error("submission {submission_id} has no '{kind}' download")]
    MissingAsset {
        /// The submission.
        submission_id: String,
        /// The missing download type.
        kind: &'static str,
    },
}

/// Operations the DUA workflow needs from the dashboard.
pub trait Dashboard {
    /// Returns an access token, if one is available.
    fn authenticate(&self) -> Option<String>;

    /// Fetches a submission.
    ///
    /// # Errors
    ///
    /// Fails if there is no token or the request fails.
    fn get_submission(&self, submission_id: &str) -> Result<Submission, DashboardError>;

    /// Downloads the driver and DUA shell of a submission into `directory`.
    ///
    /// # Errors
    ///
    /// Fails if the submission cannot be fetched, a download fails, or either
    /// asset is missing.
    fn download_assets(&self, submission_id: &str, directory: &Path)
    -> Result<Assets, DashboardError>;
}

/// A [`Dashboard`] for the Partner Center hardware API.
#[derive(Debug, Clone)]
pub struct DevCenterClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl DevCenterClient {
    /// The API endpoint used unless overridden.
    pub const DEFAULT_API_BASE: &'static str = "https://manage.devcenter.microsoft.com/v1.0/my";

    /// Creates a client. Without a token every request fails with
    /// [`DashboardError::NotAuthenticated`].
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            token: token.filter(|token| !token.is_empty()),
        }
    }

    /// Uses a different API endpoint.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn fetch(&self, url: &str, target: &Path) -> Result<(), DashboardError> {
        let mut response = self.http.get(url).send()?.error_for_status()?;
        let mut file = File::create(target).map_err(|source| DashboardError::Io {
            path: target.to_path_buf(),
            source,
        })?;
        response.copy_to(&mut file)?;
        Ok(())
    }
}

impl Dashboard for DevCenterClient {
    fn authenticate(&self) -> Option<String> {
        self.token.clone()
    }

    fn get_submission(&self, submission_id: &str) -> Result<Submission, DashboardError> {
        let token = self.authenticate().ok_or(DashboardError::NotAuthenticated)?;
        let url = format!("{}/hardware/submissions/{submission_id}", self.api_base);
        tracing::debug!("Fetching submission {submission_id}");

        let submission = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(submission)
    }

    fn download_assets(
        &self,
        submission_id: &str,
        directory: &Path,
    ) -> Result<Assets, DashboardError> {
        let submission = self.get_submission(submission_id)?;
        tracing::info!("Found {} downloads", submission.downloads.len());

        fs::create_dir_all(directory).map_err(|source| DashboardError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut driver = None;
        let mut hlkx = None;
        for download in &submission.downloads {
            // Names come from the server; keep only the final component.
            let Some(name) = Path::new(&download.name).file_name() else {
                continue;
            };
            let target = directory.join(name);
            tracing::info!("Downloading {}", download.name);
            self.fetch(&download.url, &target)?;

            match download.kind.as_str() {
                "driver" => driver = Some(target),
                "hlkx" => hlkx = Some(target),
                other => tracing::debug!("Ignoring download of type '{other}'"),
            }
        }

        let missing = |kind| DashboardError::MissingAsset {
            submission_id: submission_id.to_string(),
            kind,
        };
        Ok(Assets {
            driver: driver.ok_or_else(|| missing("driver"))?,
            hlkx: hlkx.ok_or_else(|| missing("hlkx"))?,
        })
    }
}

/// A [`Dashboard`] producing placeholder assets, for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDashboard;

impl MockDashboard {
    /// An empty zip archive: just the end of central directory record.
    pub const EMPTY_ZIP: [u8; 22] = [
        b'P', b'K', 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ];

    /// Contents of the placeholder HLKX package.
    pub const FAKE_HLKX: &'static [u8] = b"fake hlkx content";
}

impl Dashboard for MockDashboard {
    fn authenticate(&self) -> Option<String> {
        None
    }

    fn get_submission(&self, _submission_id: &str) -> Result<Submission, DashboardError> {
        Ok(Submission::default())
    }

    fn download_assets(
        &self,
        submission_id: &str,
        directory: &Path,
    ) -> Result<Assets, DashboardError> {
        tracing::info!(
            "Mock downloading assets for {submission_id} to {}",
            directory.display()
        );
        let write = |path: PathBuf, contents: &[u8]| match fs::write(&path, contents) {
            Ok(()) => Ok(path),
            Err(source) => Err(DashboardError::Io { path, source }),
        };

        fs::create_dir_all(directory).map_err(|source| DashboardError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
        Ok(Assets {
            driver: write(directory.join("initial_driver.zip"), &Self::EMPTY_ZIP)?,
            hlkx: write(directory.join("duashell.hlkx"), Self::FAKE_HLKX)?,
        })
    }
}
