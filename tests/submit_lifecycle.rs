//! End-to-end submission lifecycle tests.
//!
//! Each test plays the worker itself: it polls the bridge root for the
//! job directory the submitter creates, then writes claim markers,
//! events, results, and completion markers the way the real host does.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use fsbridge::{BridgeConfig, EventRecord, JobSubmitter, ScriptRequest, SubmitOptions};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

fn touch_heartbeat(root: &Path) {
    std::fs::write(root.join("host.json"), b"{\"pid\": 1}").unwrap();
}

fn fast_config() -> BridgeConfig {
    BridgeConfig::default().with_poll_interval(Duration::from_millis(10))
}

/// Wait until the submitter has created a job directory with a fully
/// written command file, and return its path.
async fn wait_for_job(root: &Path) -> PathBuf {
    let execute = root.join("execute");
    loop {
        if let Ok(mut entries) = tokio::fs::read_dir(&execute).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let dir = entry.path();
                if tokio::fs::try_exists(dir.join("command.json"))
                    .await
                    .unwrap_or(false)
                {
                    return dir;
                }
            }
        }
        sleep(Duration::from_millis(5)).await;
    }
}

async fn write(path: PathBuf, bytes: &[u8]) {
    tokio::fs::write(path, bytes).await.unwrap();
}

fn success_body(data: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "ok": true,
        "type": "value",
        "data": data,
        "meta": {"timestamp": "2026-08-07T10:15:30Z"}
    }))
    .unwrap()
}

#[tokio::test]
async fn completed_job_round_trips_with_events_and_cleanup() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let events: Arc<Mutex<Vec<EventRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let worker_root = root.path().to_path_buf();
    let worker = tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;

        let command = tokio::fs::read(job.join("command.json")).await.unwrap();
        let command: serde_json::Value = serde_json::from_slice(&command).unwrap();
        assert_eq!(command["script"], "captureStack");
        assert_eq!(command["params"]["threadId"], 4);

        write(job.join("claimed.json"), b"{\"worker\":\"w1\"}").await;
        write(
            job.join("events.ndjson"),
            b"{\"event\":\"started\"}\n{\"event\":\"step\",\"line\":12}\n",
        )
        .await;
        sleep(Duration::from_millis(50)).await;
        write(job.join("response.json"), &success_body(json!({"frames": ["main"]}))).await;
        write(job.join("done"), b"").await;
        job
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("captureStack").with_param("threadId", json!(4)),
            SubmitOptions::new()
                .with_timeout(Duration::from_secs(5))
                .with_on_event(move |record| sink.lock().unwrap().push(record)),
        )
        .await
        .unwrap();

    let job = worker.await.unwrap();

    let success = response.as_success().expect("job should succeed");
    assert_eq!(success.data, json!({"frames": ["main"]}));
    assert_eq!(success.kind, "value");

    // The consumed job directory is removed by the submitter.
    assert!(!tokio::fs::try_exists(&job).await.unwrap());

    let events = events.lock().unwrap();
    let names: Vec<_> = events.iter().filter_map(|e| e.event.clone()).collect();
    assert_eq!(names, ["started", "step"]);
}

#[tokio::test]
async fn missing_heartbeat_fails_fast_without_creating_a_job() {
    let root = tempfile::tempdir().unwrap();

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let started = Instant::now();
    let response = submitter
        .submit(ScriptRequest::new("noop"), SubmitOptions::new())
        .await
        .unwrap();

    let failure = response.as_failure().expect("should be unavailable");
    assert_eq!(failure.code(), "E_BRIDGE_UNAVAILABLE");
    assert!(failure.error.message.contains("heartbeat file not found"));

    // Fail fast: no polling happened, no job directory was created.
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!root.path().join("execute").exists());
}

#[tokio::test]
async fn stale_heartbeat_fails_fast_with_age_diagnostic() {
    let root = tempfile::tempdir().unwrap();
    let heartbeat = root.path().join("host.json");
    std::fs::write(&heartbeat, b"{}").unwrap();
    std::fs::OpenOptions::new()
        .write(true)
        .open(&heartbeat)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(45))
        .unwrap();

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(ScriptRequest::new("noop"), SubmitOptions::new())
        .await
        .unwrap();

    let failure = response.as_failure().unwrap();
    assert_eq!(failure.code(), "E_BRIDGE_UNAVAILABLE");
    assert!(failure.error.message.contains("stale"));
    assert!(!root.path().join("execute").exists());
}

#[tokio::test]
async fn exhausted_total_budget_reports_generic_timeout_not_pickup() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    // Total timeout below the pickup ceiling: the 300ms budget governs.
    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let started = Instant::now();
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_millis(300)),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.as_failure().unwrap().code(), "E_TIMEOUT");
    assert!(
        elapsed >= Duration::from_millis(300),
        "returned before the budget: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(2),
        "took far longer than the 300ms budget: {elapsed:?}"
    );
}

#[tokio::test]
async fn unclaimed_job_with_remaining_budget_reports_pickup_timeout() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let submitter = JobSubmitter::new(root.path())
        .with_config(fast_config().with_pickup_ceiling(Duration::from_millis(300)));
    let started = Instant::now();
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    let failure = response.as_failure().unwrap();
    assert_eq!(failure.code(), "E_PICKUP_TIMEOUT");
    assert!(failure.error.message.contains("retry"));
    assert!(
        elapsed < Duration::from_secs(2),
        "pickup phase overran its ceiling: {elapsed:?}"
    );

    // The unclaimed job directory is left behind for inspection.
    assert!(root.path().join("execute").exists());
}

#[tokio::test]
async fn total_budget_is_shared_across_both_phases() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    // Claim lands near the end of the pickup window; completion never
    // arrives. The execution phase only gets what the pickup phase left.
    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        sleep(Duration::from_millis(1_200)).await;
        write(job.join("claimed.json"), b"{}").await;
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let started = Instant::now();
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_millis(1_500)),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.as_failure().unwrap().code(), "E_TIMEOUT");
    assert!(
        elapsed >= Duration::from_millis(1_500),
        "returned before the total budget: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(3_500),
        "execution phase ignored the shared budget: {elapsed:?}"
    );
}

#[tokio::test]
async fn cancellation_is_advisory_and_never_resolves_the_call() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    // Worker claims immediately and then ignores the cancel marker.
    let job_slot: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let worker_slot = job_slot.clone();
    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("claimed.json"), b"{}").await;
        *worker_slot.lock().unwrap() = Some(job);
    });

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new()
                .with_timeout(Duration::from_millis(800))
                .with_cancel(token),
        )
        .await
        .unwrap();

    // Cancellation did not shorten the wait; the timeout resolved it.
    assert_eq!(response.as_failure().unwrap().code(), "E_TIMEOUT");

    // The advisory marker was left for the worker.
    let job = job_slot.lock().unwrap().clone().unwrap();
    assert!(tokio::fs::try_exists(job.join("cancel")).await.unwrap());
}

#[tokio::test]
async fn cancel_after_completion_is_a_silent_noop() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let worker_root = root.path().to_path_buf();
    let worker = tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("claimed.json"), b"{}").await;
        write(job.join("response.json"), &success_body(json!(1))).await;
        write(job.join("done"), b"").await;
        job
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    assert!(response.is_ok());

    // The job directory is gone; canceling it anyway must not error.
    let job = worker.await.unwrap();
    let job_id = job.file_name().unwrap().to_str().unwrap();
    fsbridge::request_cancel(root.path(), job_id).await.unwrap();
    assert!(!tokio::fs::try_exists(&job).await.unwrap());
}

#[tokio::test]
async fn worker_racing_ahead_of_the_claim_poll_still_resolves() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    // No claim marker at all: response and completion appear together.
    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("response.json"), &success_body(json!("fast"))).await;
        write(job.join("done"), b"").await;
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    assert_eq!(response.as_success().unwrap().data, json!("fast"));
}

#[tokio::test]
async fn malformed_claim_content_still_counts_as_a_claim() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("claimed.json"), b"<<< not json >>>").await;
        sleep(Duration::from_millis(50)).await;
        write(job.join("response.json"), &success_body(json!(true))).await;
        write(job.join("done"), b"").await;
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    assert!(response.is_ok());
}

#[tokio::test]
async fn completion_without_any_result_degrades_to_no_response() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let job_slot: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let worker_slot = job_slot.clone();
    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("claimed.json"), b"{}").await;
        write(job.join("done"), b"").await;
        *worker_slot.lock().unwrap() = Some(job);
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    let failure = response.as_failure().unwrap();
    assert_eq!(failure.code(), "E_NO_RESPONSE");

    // The faulty job directory is kept for post-mortem inspection.
    let job = job_slot.lock().unwrap().clone().unwrap();
    assert!(tokio::fs::try_exists(&job).await.unwrap());
}

#[tokio::test]
async fn error_result_takes_precedence_over_success_result() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("claimed.json"), b"{}").await;
        write(job.join("response.json"), &success_body(json!("ignored"))).await;
        write(
            job.join("error.json"),
            serde_json::to_vec(&json!({
                "ok": false,
                "type": "error",
                "error": {"code": "E_SCRIPT_FAILED", "message": "assertion failed"},
                "meta": {"timestamp": "2026-08-07T10:15:30Z"}
            }))
            .unwrap()
            .as_slice(),
        )
        .await;
        write(job.join("done"), b"").await;
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("noop"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    let failure = response.as_failure().unwrap();
    assert_eq!(failure.code(), "E_SCRIPT_FAILED");
    assert_eq!(failure.error.message, "assertion failed");
}

#[tokio::test]
async fn large_payload_reference_is_resolved_and_inlined() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    let payload = json!({
        "modules": (0..500).map(|i| json!({"id": i, "name": format!("module-{i}")})).collect::<Vec<_>>(),
        "truncated": false
    });
    let expected = payload.clone();

    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let job = wait_for_job(&worker_root).await;
        write(job.join("claimed.json"), b"{}").await;
        write(job.join("payload.json"), &serde_json::to_vec(&payload).unwrap()).await;
        write(
            job.join("response.json"),
            &success_body(json!({"dataFile": "payload.json"})),
        )
        .await;
        write(job.join("done"), b"").await;
    });

    let submitter = JobSubmitter::new(root.path()).with_config(fast_config());
    let response = submitter
        .submit(
            ScriptRequest::new("listModules"),
            SubmitOptions::new().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    let success = response.as_success().expect("indirect payload should resolve");
    assert_eq!(success.data, expected);
    assert!(success.data.get("dataFile").is_none(), "reference must be gone");
}

#[tokio::test]
async fn concurrent_submissions_use_disjoint_job_directories() {
    let root = tempfile::tempdir().unwrap();
    touch_heartbeat(root.path());

    // A worker that answers every job it finds, forever.
    let worker_root = root.path().to_path_buf();
    tokio::spawn(async move {
        let mut answered: Vec<PathBuf> = Vec::new();
        loop {
            if let Ok(mut entries) = tokio::fs::read_dir(worker_root.join("execute")).await {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let job = entry.path();
                    if answered.contains(&job)
                        || !tokio::fs::try_exists(job.join("command.json"))
                            .await
                            .unwrap_or(false)
                    {
                        continue;
                    }
                    let command = tokio::fs::read(job.join("command.json")).await.unwrap();
                    let command: serde_json::Value = serde_json::from_slice(&command).unwrap();
                    write(job.join("claimed.json"), b"{}").await;
                    write(
                        job.join("response.json"),
                        &success_body(command["params"]["n"].clone()),
                    )
                    .await;
                    write(job.join("done"), b"").await;
                    answered.push(job);
                }
            }
            sleep(Duration::from_millis(5)).await;
        }
    });

    let submitter = Arc::new(JobSubmitter::new(root.path()).with_config(fast_config()));
    let mut handles = Vec::new();
    for n in 0..4 {
        let submitter = submitter.clone();
        handles.push(tokio::spawn(async move {
            submitter
                .submit(
                    ScriptRequest::new("echo").with_param("n", json!(n)),
                    SubmitOptions::new().with_timeout(Duration::from_secs(5)),
                )
                .await
                .unwrap()
        }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        let response = handle.await.unwrap();
        assert_eq!(response.as_success().unwrap().data, json!(n));
    }
}
