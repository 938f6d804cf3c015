//! Result envelopes read back from `response.json` / `error.json`.
//!
//! A completed job yields exactly one of a success envelope or an error
//! envelope, discriminated by the `ok` flag on the wire and by the
//! [`BridgeResponse`] variants in Rust. Error envelopes are also how the
//! client itself reports protocol-level failures (unavailable worker,
//! timeouts, missing results) -- the codes in
//! [`constants`](crate::constants) are stable and machine-readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{E_BRIDGE_UNAVAILABLE, E_NO_RESPONSE, E_PICKUP_TIMEOUT, E_TIMEOUT};
use crate::types::HealthStatus;

/// Envelope metadata shared by success and error results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// When the envelope was produced.
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    /// Metadata stamped with the current time.
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// A successful job result.
///
/// `data` may arrive indirected: a worker avoiding a large inline blob
/// writes `{ "dataFile": "<sibling>" }` instead, and the submitter
/// resolves and inlines the sibling file before the envelope reaches the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    /// Always `true` for a success envelope.
    pub ok: bool,

    /// Result type tag, chosen by the worker.
    #[serde(rename = "type")]
    pub kind: String,

    /// The result payload.
    pub data: Value,

    /// Envelope metadata.
    pub meta: ResponseMeta,
}

/// Machine-readable error information inside an error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Stable machine-readable code (see [`crate::constants`] for the
    /// codes the client itself produces; workers may add their own).
    pub code: String,

    /// Human-readable message with remediation guidance.
    pub message: String,
}

/// A failed job result, written by the worker or synthesized by the
/// client for protocol-level failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false` for an error envelope.
    pub ok: bool,

    /// Result type tag.
    #[serde(rename = "type")]
    pub kind: String,

    /// The error itself.
    pub error: ErrorDetail,

    /// Envelope metadata.
    pub meta: ResponseMeta,
}

impl ErrorResponse {
    fn new(code: &str, message: String) -> Self {
        Self {
            ok: false,
            kind: "error".to_string(),
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
            meta: ResponseMeta::now(),
        }
    }

    /// The health check failed before submission.
    pub fn bridge_unavailable(health: &HealthStatus) -> Self {
        Self::new(
            E_BRIDGE_UNAVAILABLE,
            format!(
                "bridge worker unavailable ({}); start the host process or check that it can reach the bridge directory",
                health.diagnostic()
            ),
        )
    }

    /// No worker claimed the job within the pickup budget (but the
    /// total budget still had room).
    pub fn pickup_timeout(budget_ms: u64) -> Self {
        Self::new(
            E_PICKUP_TIMEOUT,
            format!(
                "no worker claimed the job within {budget_ms}ms; the worker may be at capacity, \
                 still starting, or crashed -- retry, or check the host process"
            ),
        )
    }

    /// The caller's total timeout budget was exhausted.
    pub fn timeout(total_ms: u64) -> Self {
        Self::new(
            E_TIMEOUT,
            format!(
                "job did not complete within {total_ms}ms; increase the timeout or check worker \
                 progress in the job's event log"
            ),
        )
    }

    /// The completion marker exists but no result file does.
    pub fn no_response(detail: &str) -> Self {
        Self::new(
            E_NO_RESPONSE,
            format!("job reported complete but returned no usable result ({detail}); this is a worker-side fault -- the job directory is left in place for inspection"),
        )
    }

    /// The stable machine-readable error code.
    pub fn code(&self) -> &str {
        &self.error.code
    }
}

/// A finished job's outcome: success or error.
///
/// Serialization is untagged; the `data` field identifies a success
/// envelope and the `error` field an error envelope, matching what the
/// worker writes to `response.json` and `error.json` respectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeResponse {
    /// The job succeeded.
    Success(SuccessResponse),
    /// The job failed, or the protocol could not complete it.
    Failure(ErrorResponse),
}

impl BridgeResponse {
    /// Returns `true` for a success envelope.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error envelope, if this is a failure.
    pub fn as_failure(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Failure(err) => Some(err),
            Self::Success(_) => None,
        }
    }

    /// The success envelope, if this is a success.
    pub fn as_success(&self) -> Option<&SuccessResponse> {
        match self {
            Self::Success(ok) => Some(ok),
            Self::Failure(_) => None,
        }
    }
}
