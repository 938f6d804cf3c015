//! Command descriptor: the job request written to `command.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The job request as the caller expresses it.
///
/// The submitter turns this into a [`CommandDescriptor`] by stamping the
/// format version, client identifier, job identifier, and creation time.
///
/// # Examples
///
/// ```
/// use fsbridge::ScriptRequest;
/// use serde_json::json;
///
/// let request = ScriptRequest::new("captureStack")
///     .with_param("threadId", json!(4))
///     .with_timeout_ms(10_000);
/// assert_eq!(request.script, "captureStack");
/// assert_eq!(request.params["threadId"], json!(4));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptRequest {
    /// Opaque script/task name the worker dispatches on.
    pub script: String,

    /// Script parameters: string keys, arbitrary JSON values.
    pub params: Map<String, Value>,

    /// Advisory execution timeout passed through to the worker.
    pub timeout_ms: Option<u64>,

    /// Inline script body, for dynamically supplied tasks the worker
    /// does not already know by name.
    pub payload: Option<String>,
}

impl ScriptRequest {
    /// Create a request for a named script with no parameters.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Set the advisory worker-side timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Attach an inline script body.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// The command descriptor written once, atomically, to `command.json`.
///
/// Owned exclusively by the client until written; read-only to the
/// worker afterwards. Never mutated.
///
/// # Examples
///
/// ```
/// use fsbridge::CommandDescriptor;
/// use chrono::Utc;
/// use serde_json::Map;
///
/// let descriptor = CommandDescriptor {
///     version: 1,
///     client_id: "debug-tools".to_string(),
///     job_id: "20260807T101530123-0000-9f2c".to_string(),
///     created_at: Utc::now(),
///     script: "captureStack".to_string(),
///     params: Map::new(),
///     timeout_ms: None,
///     payload: None,
/// };
///
/// let json = serde_json::to_value(&descriptor).unwrap();
/// assert_eq!(json["version"], 1);
/// assert_eq!(json["clientId"], "debug-tools");
/// assert!(json.get("timeoutMs").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescriptor {
    /// Command format version.
    pub version: u32,

    /// Identifier of the submitting client.
    pub client_id: String,

    /// The job identifier; also the job directory name.
    pub job_id: String,

    /// When the command was created.
    pub created_at: DateTime<Utc>,

    /// Opaque script/task name.
    pub script: String,

    /// Script parameters.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Advisory execution timeout for the worker, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Inline script body, when the task is supplied dynamically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}
