//! Well-known file names, directory names, timing defaults, and error
//! codes for the bridge directory protocol.
//!
//! The on-disk layout under a bridge root:
//!
//! ```text
//! <root>/host.json                     heartbeat (worker-maintained)
//! <root>/execute/<jobId>/command.json  command descriptor (client, atomic)
//! <root>/execute/<jobId>/claimed.json  claim marker (worker)
//! <root>/execute/<jobId>/done          completion marker (worker)
//! <root>/execute/<jobId>/response.json success result (worker)
//! <root>/execute/<jobId>/error.json    error result (worker, wins over response.json)
//! <root>/execute/<jobId>/events.ndjson append-only event log (worker)
//! <root>/execute/<jobId>/cancel        cancel marker (client)
//! ```

use std::time::Duration;

/// Heartbeat file at the bridge root. The worker rewrites it periodically;
/// its modification time is the liveness signal.
pub const HEARTBEAT_FILE: &str = "host.json";

/// Directory under the bridge root that holds one subdirectory per job.
pub const EXECUTE_DIR: &str = "execute";

/// Command descriptor file inside a job directory. Written once by the
/// client via temp-file-plus-rename, so observers never see it partially
/// written.
pub const COMMAND_FILE: &str = "command.json";

/// Claim marker. Existence alone means "a worker accepted this job";
/// content is deliberately ignored.
pub const CLAIM_FILE: &str = "claimed.json";

/// Completion marker. Zero-byte; existence means a result file is ready.
pub const COMPLETION_FILE: &str = "done";

/// Success result file.
pub const RESPONSE_FILE: &str = "response.json";

/// Error result file. Takes precedence over [`RESPONSE_FILE`] when both
/// exist.
pub const ERROR_FILE: &str = "error.json";

/// Append-only NDJSON event log written by the worker during execution.
pub const EVENTS_FILE: &str = "events.ndjson";

/// Cancel marker. Zero-byte sentinel written by the client; advisory only.
pub const CANCEL_FILE: &str = "cancel";

/// Key in a success result's `data` object that indirects the payload to
/// a sibling file in the job directory.
pub const DATA_FILE_REF_KEY: &str = "dataFile";

/// Format version stamped into every command descriptor.
pub const COMMAND_FORMAT_VERSION: u32 = 1;

/// Heartbeat staleness threshold. Ages strictly below this are healthy.
///
/// The worker touches the heartbeat roughly every 5-10 seconds, so this
/// allows one or two missed beats before the bridge is reported down.
pub const HEALTH_STALE_THRESHOLD: Duration = Duration::from_millis(30_000);

/// Ceiling on the pickup phase (waiting for a claim marker). The
/// effective pickup budget is the smaller of this and the total timeout.
pub const PICKUP_CEILING: Duration = Duration::from_millis(5_000);

/// Poll interval on conventional local filesystems.
pub const POLL_INTERVAL_LOCAL: Duration = Duration::from_millis(50);

/// Poll interval on filesystems that bridge two OS kernels (WSL drvfs,
/// `\\wsl$` shares), where metadata propagation is slow enough to be
/// mistaken for a slow worker.
pub const POLL_INTERVAL_BRIDGED: Duration = Duration::from_millis(150);

/// Total submit timeout applied when the caller does not supply one.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Client identifier stamped into command descriptors unless overridden.
pub const DEFAULT_CLIENT_ID: &str = "fsbridge";

/// Error code: the health check failed before submission.
pub const E_BRIDGE_UNAVAILABLE: &str = "E_BRIDGE_UNAVAILABLE";

/// Error code: no worker claimed the job within the pickup budget.
pub const E_PICKUP_TIMEOUT: &str = "E_PICKUP_TIMEOUT";

/// Error code: the caller's total timeout budget was exhausted.
pub const E_TIMEOUT: &str = "E_TIMEOUT";

/// Error code: the job reported complete but produced no result file.
pub const E_NO_RESPONSE: &str = "E_NO_RESPONSE";
