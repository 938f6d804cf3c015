//! Bridge configuration.

use std::path::Path;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CLIENT_ID, DEFAULT_SUBMIT_TIMEOUT, HEALTH_STALE_THRESHOLD, PICKUP_CEILING,
    POLL_INTERVAL_LOCAL,
};
use crate::platform::PollProfile;

/// Configuration for a bridge root.
///
/// Constructed once per root, either with the defaults or via
/// [`detect`](BridgeConfig::detect) which also probes the root's
/// filesystem to pick the poll interval for the whole session.
///
/// # Defaults
///
/// | Setting            | Default     | Description                                |
/// |--------------------|-------------|--------------------------------------------|
/// | `client_id`        | `fsbridge`  | Stamped into command descriptors           |
/// | `poll_interval`    | 50 ms       | Sleep between marker polls (150 ms bridged)|
/// | `pickup_ceiling`   | 5000 ms     | Max wait for a claim marker                |
/// | `health_threshold` | 30 000 ms   | Heartbeat staleness cutoff                 |
/// | `default_timeout`  | 30 000 ms   | Total budget when the caller sets none     |
///
/// # Examples
///
/// ```
/// use fsbridge::BridgeConfig;
/// use std::time::Duration;
///
/// let config = BridgeConfig::default()
///     .with_client_id("debug-tools")
///     .with_poll_interval(Duration::from_millis(25));
/// assert_eq!(config.client_id, "debug-tools");
/// assert_eq!(config.pickup_ceiling, Duration::from_millis(5000));
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Client identifier written into every command descriptor.
    pub client_id: String,

    /// Sleep between polls of the claim/completion markers and the
    /// event log.
    pub poll_interval: Duration,

    /// Ceiling on the pickup phase. The effective pickup budget is the
    /// smaller of this and the total timeout.
    pub pickup_ceiling: Duration,

    /// Heartbeat ages strictly below this are healthy.
    pub health_threshold: Duration,

    /// Total submit budget applied when [`SubmitOptions`] carries no
    /// timeout.
    ///
    /// [`SubmitOptions`]: crate::submit::SubmitOptions
    pub default_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            poll_interval: POLL_INTERVAL_LOCAL,
            pickup_ceiling: PICKUP_CEILING,
            health_threshold: HEALTH_STALE_THRESHOLD,
            default_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }
}

impl BridgeConfig {
    /// Defaults plus a poll interval chosen by probing the root's
    /// filesystem once (see [`PollProfile::detect`]).
    pub fn detect(root: &Path) -> Self {
        Self {
            poll_interval: PollProfile::detect(root).poll_interval(),
            ..Self::default()
        }
    }

    /// Set the client identifier.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the pickup-phase ceiling.
    pub fn with_pickup_ceiling(mut self, ceiling: Duration) -> Self {
        self.pickup_ceiling = ceiling;
        self
    }

    /// Set the heartbeat staleness threshold.
    pub fn with_health_threshold(mut self, threshold: Duration) -> Self {
        self.health_threshold = threshold;
        self
    }

    /// Set the default total timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}
