//! Transactional commit of an embedding job.
//!
//! For a file at `P` the committer works on two siblings:
//! - `P.backup`: verbatim copy of the original, taken before anything else
//! - `P.tmp`: remux output
//!
//! The original path is only ever mutated by the final rename of `P.tmp`
//! over `P`. Any failure after the backup exists restores it over `P`, so the
//! original is either untouched or recoverable at every step.

use log::{debug, error, warn};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::media::{MediaError, MediaTool};
use crate::models::EmbeddingJob;
use crate::strategy::{EmbedError, EmbedStrategy, ImageCodec};

pub const BACKUP_SUFFIX: &str = ".backup";
pub const TMP_SUFFIX: &str = ".tmp";

/// `path` with `suffix` appended to its full file name (`a.mp3` -> `a.mp3.tmp`).
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("could not back up {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("output {} failed validation: {reason}", .path.display())]
    Validation { path: PathBuf, reason: String },

    #[error("could not move {} into place: {source}", .path.display())]
    Swap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Backup Handle
// ============================================================================

/// Verified copy of an original file, kept until the commit finishes.
#[derive(Debug)]
pub struct BackupHandle {
    original: PathBuf,
    backup: PathBuf,
}

impl BackupHandle {
    /// Copy `original` to its `.backup` sibling and check the copy's length.
    pub fn create(original: &Path) -> io::Result<Self> {
        let backup = sibling_path(original, BACKUP_SUFFIX);
        let copied = fs::copy(original, &backup)?;
        let expected = fs::metadata(original)?.len();
        if copied != expected || fs::metadata(&backup)?.len() != expected {
            let _ = fs::remove_file(&backup);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("backup is {} bytes, original is {} bytes", copied, expected),
            ));
        }
        debug!("Backed up {} to {}", original.display(), backup.display());
        Ok(Self {
            original: original.to_path_buf(),
            backup,
        })
    }

    pub fn path(&self) -> &Path {
        &self.backup
    }

    /// Rename the backup over the original.
    pub fn restore(self) -> io::Result<()> {
        warn!("Restoring {} from backup", self.original.display());
        fs::rename(&self.backup, &self.original)
    }

    /// Delete the backup after a successful commit.
    pub fn discard(self) -> io::Result<()> {
        fs::remove_file(&self.backup)
    }
}

// ============================================================================
// Commit
// ============================================================================

/// Check the output has a readable, non-empty duration.
pub fn validate_output(tool: &dyn MediaTool, path: &Path) -> Result<(), String> {
    let report = tool.probe(path).map_err(|e: MediaError| e.to_string())?;
    let duration = report
        .format
        .and_then(|f| f.duration)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();
    if duration.is_empty() {
        return Err("no duration could be read".to_string());
    }
    debug!("Validated {} (duration {}s)", path.display(), duration);
    Ok(())
}

fn remove_if_present(path: &Path) {
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

fn roll_back(backup: BackupHandle) {
    let backup_path = backup.path().to_path_buf();
    if let Err(e) = backup.restore() {
        error!(
            "Could not restore original from {}: {}",
            backup_path.display(),
            e
        );
    }
}

/// Back up, embed into `P.tmp`, validate, then rename over `P`.
/// Returns the image codec that was embedded.
pub fn commit_embedding(
    tool: &dyn MediaTool,
    job: &EmbeddingJob,
) -> Result<ImageCodec, CommitError> {
    let original = job.source.as_path();

    let backup = BackupHandle::create(original).map_err(|source| CommitError::Backup {
        path: original.to_path_buf(),
        source,
    })?;

    let tmp = sibling_path(original, TMP_SUFFIX);
    let strategy = EmbedStrategy::select(job.family, job.replace_existing);

    let codec = match strategy.embed(tool, job, &tmp) {
        Ok(codec) => codec,
        Err(e) => {
            remove_if_present(&tmp);
            roll_back(backup);
            return Err(e.into());
        }
    };

    if let Err(reason) = validate_output(tool, &tmp) {
        remove_if_present(&tmp);
        roll_back(backup);
        return Err(CommitError::Validation { path: tmp, reason });
    }

    if let Err(source) = fs::rename(&tmp, original) {
        remove_if_present(&tmp);
        roll_back(backup);
        return Err(CommitError::Swap {
            path: original.to_path_buf(),
            source,
        });
    }

    let backup_path = backup.path().to_path_buf();
    if let Err(e) = backup.discard() {
        warn!("Could not delete backup {}: {}", backup_path.display(), e);
    }
    Ok(codec)
}
