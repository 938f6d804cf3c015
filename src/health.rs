//! Worker liveness detection from heartbeat staleness.
//!
//! The worker rewrites `<root>/host.json` every few seconds; the monitor
//! never reads its content, only its modification time. The 30-second
//! threshold sits at 3-6x the worker's observed 5-10 second heartbeat
//! interval, so one or two missed beats do not produce a false negative
//! while a crashed worker is still detected within one threshold window.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

use crate::constants::{HEALTH_STALE_THRESHOLD, HEARTBEAT_FILE};
use crate::types::HealthStatus;

/// Checks whether the worker behind a bridge root looks alive.
///
/// A check is a submission precondition: the submitter fails fast with a
/// structured unavailability error instead of creating a job directory
/// that nobody will ever claim.
///
/// # Examples
///
/// ```no_run
/// use fsbridge::HealthMonitor;
/// use std::path::Path;
///
/// # async fn example() {
/// let monitor = HealthMonitor::new(Path::new("/tmp/bridge"));
/// let status = monitor.check().await;
/// if !status.healthy {
///     eprintln!("worker down: {}", status.diagnostic());
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    heartbeat_path: PathBuf,
    threshold: Duration,
}

impl HealthMonitor {
    /// Monitor the heartbeat under `root` with the default threshold.
    pub fn new(root: &Path) -> Self {
        Self {
            heartbeat_path: root.join(HEARTBEAT_FILE),
            threshold: HEALTH_STALE_THRESHOLD,
        }
    }

    /// Override the staleness threshold.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// The heartbeat file being watched.
    pub fn heartbeat_path(&self) -> &Path {
        &self.heartbeat_path
    }

    /// Check worker liveness.
    ///
    /// An absent heartbeat file reports unhealthy with the epoch-zero
    /// "never seen" sentinel; a present one is healthy iff its age is
    /// strictly below the threshold.
    pub async fn check(&self) -> HealthStatus {
        let mtime = match tokio::fs::metadata(&self.heartbeat_path).await {
            Ok(meta) => match meta.modified() {
                Ok(mtime) => mtime,
                Err(_) => return HealthStatus::never_seen(),
            },
            Err(_) => return HealthStatus::never_seen(),
        };

        evaluate(mtime, SystemTime::now(), self.threshold)
    }
}

/// Pure staleness evaluation, split out so the threshold boundary can be
/// tested without manufacturing file timestamps.
pub(crate) fn evaluate(mtime: SystemTime, now: SystemTime, threshold: Duration) -> HealthStatus {
    // A heartbeat from the "future" (clock skew on network mounts) is
    // treated as age zero rather than an error.
    let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
    HealthStatus {
        healthy: age < threshold,
        last_seen: DateTime::<Utc>::from(mtime),
        age_ms: Some(age.as_millis() as u64),
    }
}
