//! Worker liveness as inferred from the heartbeat file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a heartbeat check.
///
/// `last_seen` is the heartbeat file's modification time, or the Unix
/// epoch as a "never seen" sentinel when the file does not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Whether the worker looks alive.
    pub healthy: bool,

    /// When the worker last touched the heartbeat; epoch zero if never.
    pub last_seen: DateTime<Utc>,

    /// Heartbeat age at check time, in milliseconds. Absent when the
    /// heartbeat file was never seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<u64>,
}

impl HealthStatus {
    /// Status for a heartbeat file that does not exist.
    pub fn never_seen() -> Self {
        Self {
            healthy: false,
            last_seen: DateTime::UNIX_EPOCH,
            age_ms: None,
        }
    }

    /// One-line diagnostic suitable for an unavailability error message.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsbridge::HealthStatus;
    ///
    /// assert_eq!(
    ///     HealthStatus::never_seen().diagnostic(),
    ///     "heartbeat file not found"
    /// );
    /// ```
    pub fn diagnostic(&self) -> String {
        match self.age_ms {
            None => "heartbeat file not found".to_string(),
            Some(age_ms) => format!("heartbeat age: {}s (stale)", age_ms / 1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_seen_uses_epoch_sentinel() {
        let status = HealthStatus::never_seen();
        assert!(!status.healthy);
        assert_eq!(status.last_seen.timestamp_millis(), 0);
        assert!(status.age_ms.is_none());
    }

    #[test]
    fn stale_diagnostic_reports_age_in_seconds() {
        let status = HealthStatus {
            healthy: false,
            last_seen: Utc::now(),
            age_ms: Some(31_500),
        };
        assert_eq!(status.diagnostic(), "heartbeat age: 31s (stale)");
    }
}
