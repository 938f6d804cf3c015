//! Error types for bridge-local failures.
//!
//! These cover environment and programmer errors only: failing to create
//! a job directory or to write the command file atomically. Protocol
//! outcomes (worker unavailable, timeouts, missing results) are not
//! errors in this sense -- they resolve to a structured
//! [`ErrorResponse`](crate::types::ErrorResponse) so the caller is never
//! left without an answer. Retrying a local I/O failure without fixing
//! the environment is pointless, which is why it propagates as `Err`
//! instead.

use thiserror::Error;

/// Errors that can occur while preparing or submitting a job.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to create the job directory (or its `execute/` parent).
    #[error("failed to create job directory '{path}': {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or sync a bridge control file.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// The file that could not be written.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to atomically rename the temp command file into place.
    #[error("failed to rename '{from}' into '{to}': {source}")]
    Rename {
        /// The temporary file being renamed.
        from: String,
        /// The destination path.
        to: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the command descriptor.
    #[error("failed to serialize command for job {job_id}: {source}")]
    Serialize {
        /// The job whose descriptor failed to serialize.
        job_id: String,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_path() {
        let err = Error::CreateDir {
            path: "/tmp/bridge/execute/abc".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/bridge/execute/abc"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn rename_display_includes_both_paths() {
        let err = Error::Rename {
            from: "a.tmp".to_string(),
            to: "command.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.tmp"));
        assert!(msg.contains("command.json"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
