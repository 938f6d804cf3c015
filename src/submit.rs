//! Job submission: the bridge's central state machine.
//!
//! A submit call moves through health gate, atomic submission, pickup
//! phase, and execution phase, then reads the result back. One total
//! timeout budget covers both polling phases, with the pickup phase
//! additionally capped by its own ceiling, and an absolute-deadline
//! check guarantees the caller's budget is never overshot by more than
//! one poll interval.
//!
//! Every polling-phase failure resolves to a structured
//! [`ErrorResponse`]; only local I/O failures while creating and writing
//! the job (environment problems a retry cannot fix) surface as `Err`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::constants::{COMMAND_FORMAT_VERSION, DATA_FILE_REF_KEY};
use crate::error::Result;
use crate::events::EventLogTail;
use crate::health::HealthMonitor;
use crate::id::IdGenerator;
use crate::jobdir::JobDir;
use crate::types::{
    BridgeResponse, CommandDescriptor, ErrorResponse, EventRecord, HealthStatus, ScriptRequest,
    SuccessResponse,
};

/// Callback invoked for each event record the worker appends while the
/// job runs.
pub type EventCallback = Arc<dyn Fn(EventRecord) + Send + Sync>;

/// Per-call options for [`JobSubmitter::submit`].
///
/// # Examples
///
/// ```
/// use fsbridge::SubmitOptions;
/// use std::time::Duration;
///
/// let options = SubmitOptions::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_on_event(|record| println!("{:?}", record.event));
/// ```
#[derive(Clone, Default)]
pub struct SubmitOptions {
    /// Total budget across pickup and execution. Falls back to the
    /// configured default when unset.
    pub timeout: Option<Duration>,

    /// Cancellation signal. Firing it writes the advisory cancel marker
    /// but does not resolve the call; only completion or timeout does.
    pub cancel: Option<CancellationToken>,

    /// Event callback, invoked in file order for each record.
    pub on_event: Option<EventCallback>,
}

impl SubmitOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total timeout budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation signal.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Attach an event callback.
    pub fn with_on_event<F>(mut self, on_event: F) -> Self
    where
        F: Fn(EventRecord) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(on_event));
        self
    }
}

impl std::fmt::Debug for SubmitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitOptions")
            .field("timeout", &self.timeout)
            .field("cancel", &self.cancel.is_some())
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

/// Submits jobs to one bridge root and waits for their results.
///
/// Construct one per bridge root and share it by reference; there is no
/// process-wide state. Concurrent submissions are independent polling
/// loops over disjoint job directories.
///
/// # Examples
///
/// ```no_run
/// use fsbridge::{JobSubmitter, ScriptRequest, SubmitOptions};
///
/// # async fn example() -> fsbridge::Result<()> {
/// let submitter = JobSubmitter::new("/tmp/bridge");
/// let response = submitter
///     .submit(ScriptRequest::new("captureStack"), SubmitOptions::new())
///     .await?;
/// if let Some(failure) = response.as_failure() {
///     eprintln!("{}: {}", failure.code(), failure.error.message);
/// }
/// # Ok(())
/// # }
/// ```
pub struct JobSubmitter {
    root: PathBuf,
    config: BridgeConfig,
    health: HealthMonitor,
    ids: IdGenerator,
}

impl JobSubmitter {
    /// Submitter for `root`, probing the filesystem once to pick the
    /// poll interval for the whole session.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config = BridgeConfig::detect(&root);
        let health = HealthMonitor::new(&root).with_threshold(config.health_threshold);
        Self {
            root,
            config,
            health,
            ids: IdGenerator::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.health = HealthMonitor::new(&self.root).with_threshold(config.health_threshold);
        self.config = config;
        self
    }

    /// The bridge root this submitter targets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The active configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Check worker liveness without submitting anything.
    pub async fn check_health(&self) -> HealthStatus {
        self.health.check().await
    }

    /// Submit a job and wait for its outcome.
    ///
    /// Fails fast with `E_BRIDGE_UNAVAILABLE` when the worker's
    /// heartbeat is missing or stale -- no job directory is created.
    /// Otherwise the command is written atomically and the call polls
    /// for the claim marker (pickup phase, capped at the pickup
    /// ceiling), then the completion marker (execution phase), then
    /// reads the result. `E_PICKUP_TIMEOUT`, `E_TIMEOUT`, and
    /// `E_NO_RESPONSE` are returned as structured failures, never as
    /// `Err`.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for local failures while creating the job
    /// directory or writing the command file.
    pub async fn submit(
        &self,
        request: ScriptRequest,
        options: SubmitOptions,
    ) -> Result<BridgeResponse> {
        let total = options.timeout.unwrap_or(self.config.default_timeout);
        let total_ms = total.as_millis() as u64;

        let health = self.health.check().await;
        if !health.healthy {
            debug!(diagnostic = %health.diagnostic(), "refusing submission: worker unavailable");
            return Ok(BridgeResponse::Failure(ErrorResponse::bridge_unavailable(
                &health,
            )));
        }

        let job_id = self.ids.next();
        let descriptor = CommandDescriptor {
            version: COMMAND_FORMAT_VERSION,
            client_id: self.config.client_id.clone(),
            job_id: job_id.clone(),
            created_at: Utc::now(),
            script: request.script,
            params: request.params,
            timeout_ms: request.timeout_ms,
            payload: request.payload,
        };

        let job = JobDir::create(&self.root, &job_id).await?;
        job.write_command(&descriptor).await?;
        debug!(job_id = %job_id, script = %descriptor.script, "command submitted");

        let mut tail = options
            .on_event
            .as_ref()
            .map(|_| EventLogTail::new(job.events_path()));

        let interval = self.config.poll_interval;
        let started = Instant::now();
        let pickup_budget = total.min(self.config.pickup_ceiling);

        // Pickup phase. A completion marker counts too: a worker can race
        // ahead and finish between two polls without the claim ever being
        // observed, and the claim check only exists to pick the right
        // timeout message, not to gate the result.
        let mut picked_up = false;
        loop {
            if job.has_claim().await || job.is_complete().await {
                picked_up = true;
                break;
            }
            if started.elapsed() >= pickup_budget {
                break;
            }
            self.drain_events(&mut tail, &options).await;
            sleep(interval).await;
        }

        if !picked_up {
            let failure = if started.elapsed() >= total {
                ErrorResponse::timeout(total_ms)
            } else {
                warn!(job_id = %job_id, "job was never claimed");
                ErrorResponse::pickup_timeout(pickup_budget.as_millis() as u64)
            };
            return Ok(BridgeResponse::Failure(failure));
        }

        // Execution phase, under the remainder of the total budget. A
        // budget already exhausted by pickup times out here without a
        // single completion poll; inside the loop the elapsed check is
        // the absolute-deadline safety net, firing the moment the budget
        // runs out, including exactly at the phase boundary.
        if started.elapsed() >= total {
            self.drain_events(&mut tail, &options).await;
            return Ok(BridgeResponse::Failure(ErrorResponse::timeout(total_ms)));
        }

        let mut cancel_requested = false;
        let completed = loop {
            if job.is_complete().await {
                break true;
            }
            if started.elapsed() >= total {
                break false;
            }
            self.drain_events(&mut tail, &options).await;

            match options.cancel.as_ref().filter(|_| !cancel_requested) {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            debug!(job_id = %job_id, "cancellation requested; leaving marker");
                            if let Err(err) = job.write_cancel_marker().await {
                                warn!(job_id = %job_id, error = %err, "failed to write cancel marker");
                            }
                            cancel_requested = true;
                        }
                        () = sleep(interval) => {}
                    }
                }
                None => sleep(interval).await,
            }
        };

        // Final drain, so events appended just before completion (or the
        // deadline) still reach the callback.
        self.drain_events(&mut tail, &options).await;

        if !completed {
            return Ok(BridgeResponse::Failure(ErrorResponse::timeout(total_ms)));
        }

        let (response, consumed) = read_result(&job).await;
        if consumed {
            if let Err(err) = job.remove().await {
                debug!(job_id = %job_id, error = %err, "failed to remove consumed job directory");
            }
        }
        Ok(response)
    }

    async fn drain_events(&self, tail: &mut Option<EventLogTail>, options: &SubmitOptions) {
        if let (Some(tail), Some(on_event)) = (tail.as_mut(), options.on_event.as_ref()) {
            for record in tail.poll().await {
                on_event(record);
            }
        }
    }
}

/// Read the job's result files.
///
/// The error file takes precedence over the success file. Returns the
/// response plus whether a worker-produced result was actually consumed
/// (which is what licenses deleting the job directory); a missing or
/// unreadable result degrades to `E_NO_RESPONSE` and leaves the
/// directory in place for inspection.
async fn read_result(job: &JobDir) -> (BridgeResponse, bool) {
    if let Some(bytes) = read_optional(&job.error_path()).await {
        return match serde_json::from_slice::<ErrorResponse>(&bytes) {
            Ok(envelope) => (BridgeResponse::Failure(envelope), true),
            Err(err) => {
                warn!(path = %job.error_path().display(), error = %err, "unreadable error result");
                (
                    BridgeResponse::Failure(ErrorResponse::no_response(
                        "error file is not valid JSON",
                    )),
                    false,
                )
            }
        };
    }

    if let Some(bytes) = read_optional(&job.response_path()).await {
        return match serde_json::from_slice::<SuccessResponse>(&bytes) {
            Ok(mut envelope) => match resolve_data_ref(job, &mut envelope).await {
                Ok(()) => (BridgeResponse::Success(envelope), true),
                Err(detail) => (
                    BridgeResponse::Failure(ErrorResponse::no_response(&detail)),
                    false,
                ),
            },
            Err(err) => {
                warn!(path = %job.response_path().display(), error = %err, "unreadable success result");
                (
                    BridgeResponse::Failure(ErrorResponse::no_response(
                        "response file is not valid JSON",
                    )),
                    false,
                )
            }
        };
    }

    (
        BridgeResponse::Failure(ErrorResponse::no_response("no result file present")),
        false,
    )
}

/// Resolve a large-payload indirection, if the success data is one.
///
/// A data object whose sole key is the reference key names a sibling
/// file; its parsed content replaces the reference. The name must be a
/// bare file name -- the job directory is the trust boundary.
async fn resolve_data_ref(
    job: &JobDir,
    envelope: &mut SuccessResponse,
) -> std::result::Result<(), String> {
    let Some(name) = data_ref_name(&envelope.data) else {
        return Ok(());
    };

    if !is_bare_file_name(&name) {
        return Err(format!(
            "data reference '{name}' is not a bare sibling file name"
        ));
    }

    let path = job.path().join(&name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| format!("data file '{name}' could not be read: {err}"))?;
    envelope.data = serde_json::from_slice(&bytes)
        .map_err(|err| format!("data file '{name}' is not valid JSON: {err}"))?;
    Ok(())
}

fn data_ref_name(data: &Value) -> Option<String> {
    let object = data.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object
        .get(DATA_FILE_REF_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

async fn read_optional(path: &Path) -> Option<Vec<u8>> {
    tokio::fs::read(path).await.ok()
}
