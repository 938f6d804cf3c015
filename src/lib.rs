//! Filesystem request/response bridge between short-lived tool clients
//! and a long-running host worker.
//!
//! When the only channel between two processes is a shared directory --
//! no sockets, no shared memory, sometimes not even the same process
//! table (WSL and Windows, remote filesystems) -- this crate turns that
//! directory into a job bridge: atomic submission, two-phase
//! acknowledgment (claim, then completion), heartbeat-based liveness,
//! advisory cancellation, and incremental NDJSON event streaming.
//!
//! # Overview
//!
//! A job is a directory under `<root>/execute/`. The client writes the
//! command file atomically (temp file + fsync + rename) so the worker
//! never observes it half-written; the worker answers with a claim
//! marker, optional progress events, a result file, and a completion
//! marker. Each file has exactly one writer for its entire lifetime,
//! which is what keeps the protocol safe without locks. All waiting is
//! time-sliced polling -- deliberately no inotify/FSEvents, which are
//! unreliable on the remote and virtualized filesystems this bridge
//! exists for.
//!
//! Protocol failures (worker down, nobody claimed the job, budget
//! exhausted, completion without a result) are not `Err`s: they resolve
//! to a structured [`ErrorResponse`] with a stable machine-readable code
//! so the caller can tell "nobody is listening" from "it's just slow".
//!
//! # Examples
//!
//! ```no_run
//! use fsbridge::{JobSubmitter, ScriptRequest, SubmitOptions};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> fsbridge::Result<()> {
//! let submitter = JobSubmitter::new("/tmp/debug-bridge");
//!
//! let response = submitter
//!     .submit(
//!         ScriptRequest::new("captureStack").with_param("threadId", json!(4)),
//!         SubmitOptions::new().with_timeout(Duration::from_secs(10)),
//!     )
//!     .await?;
//!
//! match response {
//!     fsbridge::BridgeResponse::Success(ok) => println!("{}", ok.data),
//!     fsbridge::BridgeResponse::Failure(err) => {
//!         eprintln!("{}: {}", err.code(), err.error.message)
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`submit`] - The submission state machine and its options
//! - [`types`] - Wire types for command, result, event, and health data
//! - [`events`] - Incremental event-log tailing and watching
//! - [`health`] - Heartbeat staleness checks
//! - [`jobdir`] - Job directory layout and atomic control-file I/O
//! - [`cancel`] - Advisory cancellation
//! - [`id`] - Sortable, path-safe job identifiers
//! - [`platform`] - Poll-interval detection for kernel-bridging filesystems

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod health;
pub mod id;
pub mod jobdir;
pub mod platform;
pub mod submit;
pub mod types;

#[cfg(feature = "logging")]
pub mod logging;

pub use cancel::request_cancel;
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use events::{EventLogTail, EventStream, EventStreamHandle};
pub use health::HealthMonitor;
pub use id::IdGenerator;
pub use jobdir::JobDir;
pub use submit::{EventCallback, JobSubmitter, SubmitOptions};
pub use types::{
    BridgeResponse, CommandDescriptor, ErrorDetail, ErrorResponse, EventRecord, HealthStatus,
    ResponseMeta, ScriptRequest, SuccessResponse,
};
