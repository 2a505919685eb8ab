//! Zip archives of driver packages.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

/// Errors reading or writing driver archives.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// A file or directory could not be accessed.
    #[error("failed to access '{}'", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The archive is malformed.
    #[error("invalid zip archive '{}'", .path.display())]
    Zip {
        /// The archive path.
        path: PathBuf,
        /// The underlying zip error.
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path) -> impl FnOnce(zip::result::ZipError) -> Self + '_ {
        move |source| Self::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extracts a zip archive into `destination`, returning the number of
/// entries.
///
/// # Errors
///
/// Fails if the archive cannot be opened or is malformed, or if an entry
/// cannot be written.
pub fn extract(archive: &Path, destination: &Path) -> Result<usize, ArchiveError> {
    let file = File::open(archive).map_err(ArchiveError::io(archive))?;
    let mut zip = ZipArchive::new(file).map_err(ArchiveError::zip(archive))?;

    fs::create_dir_all(destination).map_err(ArchiveError::io(destination))?;
    zip.extract(destination).map_err(ArchiveError::zip(archive))?;

    tracing::debug!(
        "Extracted {} entries from {} to {}",
        zip.len(),
        archive.display(),
        destination.display()
    );
    Ok(zip.len())
}

/// Compresses the contents of `source` into a new zip archive, returning
/// the number of files written.
///
/// Entry names are relative to `source` and use `/` separators.
///
/// # Errors
///
/// Fails if `source` cannot be walked, a file cannot be read, or the
/// archive cannot be written.
pub fn create(source: &Path, archive: &Path) -> Result<usize, ArchiveError> {
    let file = File::create(archive).map_err(ArchiveError::io(archive))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|error| ArchiveError::Io {
            path: error.path().unwrap_or(source).to_path_buf(),
            source: error.into(),
        })?;
        let name = entry_name(source, entry.path());

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .map_err(ArchiveError::zip(archive))?;
            continue;
        }

        writer
            .start_file(name, options)
            .map_err(ArchiveError::zip(archive))?;
        let mut input = File::open(entry.path()).map_err(ArchiveError::io(entry.path()))?;
        io::copy(&mut input, &mut writer).map_err(ArchiveError::io(entry.path()))?;
        files += 1;
    }

    writer.finish().map_err(ArchiveError::zip(archive))?;
    tracing::debug!("Wrote {files} files from {} to {}", source.display(), archive.display());
    Ok(files)
}

fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
