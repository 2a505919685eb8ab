//! The issue tracker DUA requests are filed in.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use reqwest::{
    blocking::{Client, RequestBuilder, multipart::Form},
    header::{ACCEPT, AUTHORIZATION},
};
use serde::{Deserialize, Serialize};

/// An issue as returned by the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Issue {
    /// Markdown body of the issue.
    #[serde(default)]
    pub body: Option<String>,
    /// The issue author.
    #[serde(default)]
    pub user: User,
}

impl Issue {
    /// The issue body, empty if the issue has none.
    #[must_use]
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// An issue author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Public email address, if the author exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

/// A comment on an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Comment {
    /// The comment ID.
    #[serde(default)]
    pub id: u64,
    /// Files attached to the comment.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A file attached to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    /// The file name.
    pub name: String,
    /// Where the file can be downloaded from.
    #[serde(alias = "url")]
    pub browser_download_url: String,
}

/// A comment the tracker accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PostedComment {
    /// The ID attachments are uploaded against.
    pub id: u64,
}

#[derive(Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

/// Errors talking to the issue tracker.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    /// The request failed or the tracker answered with an error status.
    #[error("issue tracker request failed")]
    Http(#[from] reqwest::Error),

    /// A local file could not be read or written.
    #[error("failed to access '{}'", .path.display())]
    Io {
        /// The local file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// An attachment to upload does not exist.
    #[error("file not found: '{}'", .0.display())]
    MissingFile(PathBuf),
}

/// Operations the workflows need from the issue tracker.
pub trait TicketClient {
    /// Fetches an issue.
    ///
    /// # Errors
    ///
    /// Fails if the request fails.
    fn get_issue(&self, repo: &str, number: u64) -> Result<Issue, TicketError>;

    /// Fetches the comments of an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Fails if the request fails.
    fn get_comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>, TicketError>;

    /// Posts a comment on an issue.
    ///
    /// # Errors
    ///
    /// Fails if the request fails.
    fn post_comment(&self, repo: &str, number: u64, body: &str)
    -> Result<PostedComment, TicketError>;

    /// Attaches a local file to a comment.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist or the upload fails.
    fn upload_attachment(&self, repo: &str, comment_id: u64, path: &Path)
    -> Result<(), TicketError>;

    /// Downloads a URL to a local file.
    ///
    /// # Errors
    ///
    /// Fails if the request fails or the file cannot be written.
    fn download_file(&self, url: &str, target: &Path) -> Result<(), TicketError>;
}

/// A [`TicketClient`] for the Gitea REST API.
#[derive(Debug, Clone)]
pub struct GiteaClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GiteaClient {
    /// The repository API endpoint used unless overridden.
    pub const DEFAULT_BASE_URL: &'static str = "https://ops.platformlabs.lenovo.com/api/v1/repos";

    /// Creates a client authenticating with an access token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Uses a different repository API endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("token {}", self.token))
    }

    fn comments_url(&self, repo: &str, number: u64) -> String {
        format!("{}/{repo}/issues/{number}/comments", self.base_url)
    }
}

impl TicketClient for GiteaClient {
    fn get_issue(&self, repo: &str, number: u64) -> Result<Issue, TicketError> {
        let url = format!("{}/{repo}/issues/{number}", self.base_url);
        tracing::debug!("GET issue {url}");
        let issue = self
            .authorized(self.http.get(&url))
            .header(ACCEPT, "application/json")
            .send()?
            .error_for_status()?
            .json()?;
        Ok(issue)
    }

    fn get_comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>, TicketError> {
        let url = self.comments_url(repo, number);
        tracing::debug!("GET comments {url}");
        let comments = self
            .authorized(self.http.get(&url))
            .header(ACCEPT, "application/json")
            .send()?
            .error_for_status()?
            .json()?;
        Ok(comments)
    }

    fn post_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PostedComment, TicketError> {
        tracing::debug!("POST comment on #{number}");
        let comment = self
            .authorized(self.http.post(self.comments_url(repo, number)))
            .header(ACCEPT, "application/json")
            .json(&NewComment { body })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(comment)
    }

    fn upload_attachment(
        &self,
        repo: &str,
        comment_id: u64,
        path: &Path,
    ) -> Result<(), TicketError> {
        if !path.is_file() {
            return Err(TicketError::MissingFile(path.to_path_buf()));
        }

        let url = format!("{}/{repo}/issues/comments/{comment_id}/assets", self.base_url);
        tracing::debug!("Uploading {} to comment {comment_id}", path.display());
        let form = Form::new()
            .file("attachment", path)
            .map_err(|source| TicketError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let response = self
            .authorized(self.http.post(&url))
            .multipart(form)
            .send()?
            .error_for_status()?;
        tracing::debug!("Upload response: {}", response.status());
        Ok(())
    }

    fn download_file(&self, url: &str, target: &Path) -> Result<(), TicketError> {
        tracing::debug!("Downloading {url} -> {}", target.display());
        let mut response = self
            .authorized(self.http.get(url))
            .header(ACCEPT, "application/octet-stream")
            .send()?
            .error_for_status()?;

        let mut file = File::create(target).map_err(|source| TicketError::Io {
            path: target.to_path_buf(),
            source,
        })?;
        response.copy_to(&mut file)?;
        Ok(())
    }
}
