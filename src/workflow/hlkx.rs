//! The HLKX signing and submission tool.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{Command, Output},
};

/// Driver type whose submissions update an existing product.
pub const DUA_DRIVER_TYPE: &str = "DUA";

/// Executable name looked up on `PATH` when no other location applies.
pub const DEFAULT_EXECUTABLE: &str = "HlkxTool.exe";

/// Parameters of a dashboard submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest<'a> {
    /// The HLKX package to submit.
    pub hlkx: &'a Path,
    /// Address notified about the submission.
    pub to_email: &'a str,
    /// Driver name shown on the dashboard.
    pub driver_name: &'a str,
    /// Driver version, also passed as the firmware version.
    pub driver_version: &'a str,
    /// Driver type, usually [`DUA_DRIVER_TYPE`].
    pub driver_type: &'a str,
    /// The product a DUA submission updates.
    pub existing_product_id: Option<&'a str>,
}

/// Errors running the signing tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// An input file or folder does not exist.
    #[error("{what} not found: '{}'", .path.display())]
    MissingInput {
        /// Which input is missing.
        what: &'static str,
        /// The missing path.
        path: PathBuf,
    },

    /// The executable could not be started.
    #[error("failed to run '{}'", .program.display())]
    Spawn {
        /// The executable.
        program: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The tool exited unsuccessfully.
    #[error("{command} failed with exit code {}: {stderr}", .code.map_or_else(|| "none".to_string(), |code| code.to_string()))]
    Failed {
        /// The subcommand that failed.
        command: &'static str,
        /// The exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Operations the workflows need from the signing tool.
pub trait SigningTool {
    /// Merges a driver folder into a DUA shell, writing a new package to
    /// `output`.
    ///
    /// # Errors
    ///
    /// Fails if an input is missing or the tool fails.
    fn dua(&self, hlkx: &Path, driver_folder: &Path, output: &Path) -> Result<(), ToolError>;

    /// Submits a package to the dashboard, returning the tool's output.
    ///
    /// # Errors
    ///
    /// Fails if the tool fails.
    fn submit(&self, request: &SubmitRequest<'_>) -> Result<String, ToolError>;
}

/// A [`SigningTool`] running the `HlkxTool` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlkxTool {
    executable: PathBuf,
}

impl HlkxTool {
    /// Uses the given executable.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Finds the executable: `explicit` if given, else
    /// `HlkxTool/HlkxTool.exe` below `working_dir` if it exists, else
    /// [`DEFAULT_EXECUTABLE`] on `PATH`.
    #[must_use]
    pub fn locate(explicit: Option<PathBuf>, working_dir: &Path) -> Self {
        let executable = explicit.unwrap_or_else(|| {
            let local = working_dir.join("HlkxTool").join(DEFAULT_EXECUTABLE);
            if local.is_file() {
                local
            } else {
                PathBuf::from(DEFAULT_EXECUTABLE)
            }
        });
        tracing::debug!("Using executable: {}", executable.display());
        Self { executable }
    }

    /// The executable this tool runs.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments of a `dua` invocation.
    #[must_use]
    pub fn dua_args(hlkx: &Path, driver_folder: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "dua".into(),
            hlkx.into(),
            driver_folder.into(),
            output.into(),
        ]
    }

    /// Arguments of a `submit` invocation.
    ///
    /// The existing product ID is only passed for DUA submissions.
    #[must_use]
    pub fn submit_args(request: &SubmitRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "submit".into(),
            "--hlkx".into(),
            request.hlkx.into(),
            "--to".into(),
            request.to_email.into(),
            "--driver-name".into(),
            format!("{} {}", request.driver_name, request.driver_version).into(),
            "--driver-type".into(),
            request.driver_type.into(),
            "--fw".into(),
            request.driver_version.into(),
            "--yes".into(),
            "--non-interactive".into(),
        ];

        if request.driver_type.eq_ignore_ascii_case(DUA_DRIVER_TYPE) {
            if let Some(id) = request.existing_product_id {
                args.extend(["--existing-product-id".into(), id.into()]);
            }
        }
        args
    }

    fn run(&self, command: &'static str, args: Vec<OsString>) -> Result<Output, ToolError> {
        tracing::info!(
            "Running: {} {}",
            self.executable.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|source| ToolError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!("STDOUT:\n{stdout}");
        if !stderr.is_empty() {
            tracing::debug!("STDERR:\n{stderr}");
        }

        if output.status.success() {
            Ok(output)
        } else {
            tracing::error!("{command} failed with status {}", output.status);
            Err(ToolError::Failed {
                command,
                code: output.status.code(),
                stdout: stdout.into_owned(),
                stderr: stderr.into_owned(),
            })
        }
    }
}

fn require(what: &'static str, path: &Path) -> Result<(), ToolError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

impl SigningTool for HlkxTool {
    fn dua(&self, hlkx: &Path, driver_folder: &Path, output: &Path) -> Result<(), ToolError> {
        require("HLKX file", hlkx)?;
        require("driver folder", driver_folder)?;
        self.run("dua", Self::dua_args(hlkx, driver_folder, output))?;
        Ok(())
    }

    fn submit(&self, request: &SubmitRequest<'_>) -> Result<String, ToolError> {
        let output = self.run("submit", Self::submit_args(request))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
