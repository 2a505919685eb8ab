use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::instrument;

use crate::{
    domain::{ConfigError, InfType, PatchStats, ProjectConfig, patch},
    storage::encoding::{self, Codec, LineEnding},
};

/// Default file name prefix for [`Destination::Sibling`].
pub const DEFAULT_SIBLING_PREFIX: &str = "updated_";

/// Where a patched INF file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Overwrite the input file.
    InPlace,
    /// Write a new file next to the input, named `<prefix><input name>`.
    Sibling {
        /// Prefix added to the input file name.
        prefix: String,
    },
}

impl Default for Destination {
    fn default() -> Self {
        Self::Sibling {
            prefix: DEFAULT_SIBLING_PREFIX.to_string(),
        }
    }
}

impl Destination {
    /// The output path for the given input path.
    #[must_use]
    pub fn resolve(&self, input: &Path) -> PathBuf {
        match self {
            Self::InPlace => input.to_path_buf(),
            Self::Sibling { prefix } => {
                let name = input
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                input.with_file_name(format!("{prefix}{name}"))
            }
        }
    }
}

/// Options controlling how a patched INF file is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Where the output goes.
    pub destination: Destination,
    /// Line terminator of the output.
    pub line_ending: LineEnding,
}

impl WriteOptions {
    /// Options that overwrite the input file.
    #[must_use]
    pub fn in_place() -> Self {
        Self {
            destination: Destination::InPlace,
            line_ending: LineEnding::default(),
        }
    }
}

/// INF text read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// The decoded text.
    pub text: String,
    /// The codec the text was decoded with.
    pub codec: Codec,
}

/// Summary of a successful [`patch_inf_file`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// The INF file that was read.
    pub input: PathBuf,
    /// The file the patched INF was written to.
    pub output: PathBuf,
    /// The detected INF type.
    pub inf_type: InfType,
    /// The codec the input was decoded with.
    pub codec: Codec,
    /// What the patcher changed.
    pub stats: PatchStats,
}

/// Errors that can occur while patching an INF file.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The project configuration could not be loaded, or lacks the project.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The INF file could not be decoded with any supported codec.
    #[error("unable to decode INF file '{}' (unknown encoding?)", .path.display())]
    UndecodableInput {
        /// The INF path.
        path: PathBuf,
    },

    /// The INF file references none of the known catalog files.
    #[error("could not identify INF type of '{}' from its CatalogFile", .path.display())]
    UnidentifiedType {
        /// The INF path.
        path: PathBuf,
    },

    /// Reading or writing the INF file failed.
    #[error("failed to access '{}'", .path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Reads and decodes an INF file.
///
/// # Errors
///
/// Returns [`PatchError::Io`] if the file cannot be read, and
/// [`PatchError::UndecodableInput`] if no codec decodes it or it is empty.
pub fn read_descriptor(path: &Path) -> Result<Descriptor, PatchError> {
    let bytes = fs::read(path).map_err(|source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match encoding::decode(&bytes) {
        Some((codec, text)) if !text.is_empty() => Ok(Descriptor { text, codec }),
        _ => Err(PatchError::UndecodableInput {
            path: path.to_path_buf(),
        }),
    }
}

/// Writes INF text as UTF-16LE with a byte order mark.
///
/// # Errors
///
/// Returns [`PatchError::Io`] if the file cannot be written.
pub fn write_descriptor(path: &Path, text: &str, line_ending: LineEnding) -> Result<(), PatchError> {
    fs::write(path, encoding::encode(text, line_ending)).map_err(|source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Patches an INF file for a project.
///
/// The file is read, its type is identified from its catalog reference, and
/// the configuration node for that type is applied. The output is written
/// only once every earlier step has succeeded.
///
/// # Errors
///
/// This function fails if:
///
/// - the project is not declared in the configuration
/// - the file cannot be read or decoded
/// - the INF type cannot be identified
/// - the output cannot be written
#[instrument(skip(config, options))]
pub fn patch_inf_file(
    path: &Path,
    config: &ProjectConfig,
    project: &str,
    options: &WriteOptions,
) -> Result<PatchReport, PatchError> {
    tracing::info!("Processing {} for project {project}", path.display());
    let project_config = config.project(project)?;

    let descriptor = read_descriptor(path)?;
    tracing::debug!(codec = %descriptor.codec, "read INF");

    let inf_type =
        InfType::identify(&descriptor.text).ok_or_else(|| PatchError::UnidentifiedType {
            path: path.to_path_buf(),
        })?;
    tracing::info!("Detected type: {inf_type} ({})", inf_type.config_path());

    let patched = patch(&descriptor.text, project_config.resolve(inf_type.config_path()));

    let output = options.destination.resolve(path);
    write_descriptor(&output, &patched.text, options.line_ending)?;
    tracing::info!("Wrote {}", output.display());

    Ok(PatchReport {
        input: path.to_path_buf(),
        output,
        inf_type,
        codec: descriptor.codec,
        stats: patched.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "project": {
            "chogori": {
                "gfx": {
                    "base": {
                        "dev_id": ["B080"],
                        "subsys_id": ["0BDA1028", "0BDB1028"],
                        "register_function": {"PTL_Reg": [["Feature", "dword", 1]]}
                    }
                }
            }
        }
    }"#;

    const GFX_BASE_INF: &str = "[Version]\r\nCatalogFile = igdlh.cat\r\n\r\n[Intel.NTamd64]\r\n%iPTLGT% = PTL_IG, PCI\\VEN_8086&DEV_B080\r\n\r\n[PTL_IG]\r\nCopyFiles = Files\r\n\r\n";

    fn config() -> ProjectConfig {
        CONFIG.parse().unwrap()
    }

    #[test]
    fn sibling_destination_prefixes_file_name() {
        let destination = Destination::default();
        assert_eq!(
            destination.resolve(Path::new("/drivers/iigd_dch.inf")),
            Path::new("/drivers/updated_iigd_dch.inf")
        );
        assert_eq!(
            Destination::InPlace.resolve(Path::new("/drivers/iigd_dch.inf")),
            Path::new("/drivers/iigd_dch.inf")
        );
    }

    #[test]
    fn patch_writes_sibling_file_in_utf16() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("iigd_dch.inf");
        fs::write(&input, GFX_BASE_INF).unwrap();

        let report = patch_inf_file(&input, &config(), "chogori", &WriteOptions::default()).unwrap();

        assert_eq!(report.output, tmp.path().join("updated_iigd_dch.inf"));
        assert_eq!(report.inf_type, InfType::GfxBase);
        assert_eq!(report.codec, Codec::Utf8);
        assert_eq!(report.stats.expanded_lines, 2);
        assert_eq!(report.stats.registry_sections, 1);

        // The input is untouched.
        assert_eq!(fs::read_to_string(&input).unwrap(), GFX_BASE_INF);

        let bytes = fs::read(&report.output).unwrap();
        assert!(bytes.starts_with(&encoding::UTF16LE_BOM));
        let written = read_descriptor(&report.output).unwrap();
        assert_eq!(written.codec, Codec::Utf16);
        assert!(written.text.contains("PCI\\VEN_8086&DEV_B080&SUBSYS_0BDA1028\n"));
        assert!(written.text.contains("PCI\\VEN_8086&DEV_B080&SUBSYS_0BDB1028\n"));
        assert!(written.text.contains("CopyFiles = Files\nAddReg = PTL_Reg\n"));
        assert!(written.text.ends_with("[PTL_Reg]\nHKR,, Feature, %REG_DWORD%, 1\n"));
    }

    #[test]
    fn patch_in_place_overwrites_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("iigd_dch.inf");
        fs::write(&input, GFX_BASE_INF).unwrap();

        let options = WriteOptions {
            destination: Destination::InPlace,
            line_ending: LineEnding::Crlf,
        };
        let report = patch_inf_file(&input, &config(), "chogori", &options).unwrap();

        assert_eq!(report.output, input);
        let written = read_descriptor(&input).unwrap();
        assert!(written.text.starts_with("[Version]\r\nCatalogFile = igdlh.cat\r\n"));
        assert!(!written.text.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn round_trip_preserves_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("round_trip.inf");
        let text = "[Version]\nCatalogFile = npu_extension.cat\n; 驱动 Ω\n";

        write_descriptor(&path, text, LineEnding::AsIs).unwrap();

        assert_eq!(read_descriptor(&path).unwrap().text, text);
    }

    #[test]
    fn unknown_project_fails_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("missing.inf");

        let error = patch_inf_file(&input, &config(), "kailash", &WriteOptions::default())
            .unwrap_err();
        assert!(matches!(
            error,
            PatchError::Config(ConfigError::ProjectMissing { .. })
        ));
    }

    #[test]
    fn unidentified_type_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("netwtw.inf");
        fs::write(&input, "[Version]\nCatalogFile = netwtw.cat\n").unwrap();

        let error = patch_inf_file(&input, &config(), "chogori", &WriteOptions::default())
            .unwrap_err();

        assert!(matches!(error, PatchError::UnidentifiedType { .. }));
        assert!(!tmp.path().join("updated_netwtw.inf").exists());
    }

    #[test]
    fn empty_file_is_undecodable() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("empty.inf");
        fs::write(&input, b"").unwrap();

        let error = read_descriptor(&input).unwrap_err();
        assert!(matches!(error, PatchError::UndecodableInput { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();

        let error = read_descriptor(&tmp.path().join("absent.inf")).unwrap_err();
        assert!(matches!(error, PatchError::Io { .. }));
    }
}
