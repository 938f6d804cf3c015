//! Job directories and atomic control-file I/O.
//!
//! Each job lives in its own directory under `<root>/execute/`. The
//! client is the sole writer of the command file and the cancel marker;
//! the worker owns everything else. That strict per-file ownership is
//! what keeps the protocol lock-free.
//!
//! The command file is written via temp file, fsync, then atomic rename,
//! so a polling worker observes it either fully absent or fully present
//! -- never partially written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::constants::{
    CANCEL_FILE, CLAIM_FILE, COMMAND_FILE, COMPLETION_FILE, ERROR_FILE, EVENTS_FILE, EXECUTE_DIR,
    RESPONSE_FILE,
};
use crate::error::{Error, Result};
use crate::types::CommandDescriptor;

/// Owner-only mode for job directories.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Owner-only mode for client-written control files.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// One job's directory under the bridge root.
///
/// # Examples
///
/// ```no_run
/// use fsbridge::JobDir;
/// use std::path::Path;
///
/// # async fn example() -> fsbridge::Result<()> {
/// let job = JobDir::create(Path::new("/tmp/bridge"), "20260807T101530123-0000-9f2c").await?;
/// assert!(job.path().ends_with("execute/20260807T101530123-0000-9f2c"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JobDir {
    path: PathBuf,
}

impl JobDir {
    /// Create the job directory (and `execute/` above it) with
    /// owner-only permissions.
    pub async fn create(root: &Path, job_id: &str) -> Result<Self> {
        let execute = root.join(EXECUTE_DIR);
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder
            .create(&execute)
            .await
            .map_err(|source| Error::CreateDir {
                path: execute.display().to_string(),
                source,
            })?;

        let path = execute.join(job_id);
        let mut builder = tokio::fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder
            .create(&path)
            .await
            .map_err(|source| Error::CreateDir {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self { path })
    }

    /// Handle to an existing (or already removed) job directory. Does
    /// not touch the filesystem.
    pub fn open(root: &Path, job_id: &str) -> Self {
        Self {
            path: root.join(EXECUTE_DIR).join(job_id),
        }
    }

    /// The job directory itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the command descriptor file.
    pub fn command_path(&self) -> PathBuf {
        self.path.join(COMMAND_FILE)
    }

    /// Path of the claim marker.
    pub fn claim_path(&self) -> PathBuf {
        self.path.join(CLAIM_FILE)
    }

    /// Path of the completion marker.
    pub fn completion_path(&self) -> PathBuf {
        self.path.join(COMPLETION_FILE)
    }

    /// Path of the success result file.
    pub fn response_path(&self) -> PathBuf {
        self.path.join(RESPONSE_FILE)
    }

    /// Path of the error result file.
    pub fn error_path(&self) -> PathBuf {
        self.path.join(ERROR_FILE)
    }

    /// Path of the event log.
    pub fn events_path(&self) -> PathBuf {
        self.path.join(EVENTS_FILE)
    }

    /// Path of the cancel marker.
    pub fn cancel_path(&self) -> PathBuf {
        self.path.join(CANCEL_FILE)
    }

    /// Whether a worker has claimed the job.
    ///
    /// Existence is the whole check: any content, even malformed bytes,
    /// counts as a claim.
    pub async fn has_claim(&self) -> bool {
        path_exists(&self.claim_path()).await
    }

    /// Whether the worker has marked the job complete.
    pub async fn is_complete(&self) -> bool {
        path_exists(&self.completion_path()).await
    }

    /// Write the command descriptor atomically.
    ///
    /// The descriptor is serialized into a temp file in the job
    /// directory, synced to stable storage, then renamed into place. On
    /// any failure the temp file is removed and the error propagates;
    /// no partial command file is ever visible.
    pub async fn write_command(&self, descriptor: &CommandDescriptor) -> Result<()> {
        let bytes =
            serde_json::to_vec_pretty(descriptor).map_err(|source| Error::Serialize {
                job_id: descriptor.job_id.clone(),
                source,
            })?;

        let target = self.command_path();
        let temp = self.path.join(format!("{COMMAND_FILE}.tmp"));

        if let Err(source) = write_and_sync(&temp, &bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::Write {
                path: temp.display().to_string(),
                source,
            });
        }

        if let Err(source) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::Rename {
                from: temp.display().to_string(),
                to: target.display().to_string(),
                source,
            });
        }

        Ok(())
    }

    /// Write the zero-byte cancel marker.
    ///
    /// Idempotent, and a silent no-op when the job directory no longer
    /// exists -- the job may already have completed and been cleaned up,
    /// which is not an error worth surfacing to a canceling caller.
    pub async fn write_cancel_marker(&self) -> Result<()> {
        let path = self.cancel_path();
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        match options.open(&path).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Write {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Remove the whole job directory.
    ///
    /// Used by the submitter once a result has been consumed; failures
    /// are the caller's to log, since a leftover directory is harmless.
    pub async fn remove(&self) -> std::io::Result<()> {
        tokio::fs::remove_dir_all(&self.path).await
    }
}

/// Existence check that treats any error as "not there yet".
async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Write bytes to a fresh file with owner-only permissions and force
/// them to stable storage.
async fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = match options.open(path).await {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            // A temp file left behind by a crashed predecessor; start over.
            tokio::fs::remove_file(path).await?;
            options.open(path).await?
        }
        Err(err) => return Err(err),
    };

    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
