//! Advisory job cancellation.
//!
//! Cancellation is cooperative: the client leaves a zero-byte sentinel
//! in the job directory and the worker checks for it between steps.
//! Nothing here shortens an in-flight wait -- only completion or the
//! caller's timeout resolves a submit call.

use std::path::Path;

use crate::error::Result;
use crate::jobdir::JobDir;

/// Request cancellation of a job.
///
/// Writes the cancel marker with owner-only permissions. Idempotent, and
/// a silent no-op when the job directory no longer exists (the job may
/// already have completed and been cleaned up).
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// # async fn example() -> fsbridge::Result<()> {
/// fsbridge::request_cancel(Path::new("/tmp/bridge"), "20260807T101530123-0000-9f2c").await?;
/// # Ok(())
/// # }
/// ```
pub async fn request_cancel(root: &Path, job_id: &str) -> Result<()> {
    JobDir::open(root, job_id).write_cancel_marker().await
}
