//! Incremental tailing of the worker's append-only event log.
//!
//! The log is NDJSON: one JSON object per line, appended while the job
//! runs. The tail tracks a byte offset and reads only bytes it has not
//! seen, so the cost of a poll is proportional to what was appended, not
//! to the size of the log. A record split across two reads -- the writer
//! caught mid-line, or a line straddling a poll boundary -- is carried
//! as raw bytes until its terminating newline arrives, which also keeps
//! multi-byte UTF-8 sequences intact across the split.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::types::EventRecord;

/// Incremental reader over one job's `events.ndjson`.
///
/// Each [`poll`](EventLogTail::poll) returns the records completed since
/// the previous poll, in file order, each exactly once. An absent file
/// means the worker has not started writing yet and yields no records.
///
/// # Examples
///
/// ```no_run
/// use fsbridge::EventLogTail;
/// use std::path::PathBuf;
///
/// # async fn example() {
/// let mut tail = EventLogTail::new(PathBuf::from("/tmp/bridge/execute/job-1/events.ndjson"));
/// for record in tail.poll().await {
///     println!("{:?}", record.event);
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct EventLogTail {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl EventLogTail {
    /// Tail the log at `path` from the beginning.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            partial: Vec::new(),
        }
    }

    /// Bytes of the log consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read any newly appended bytes and return the records they
    /// complete.
    ///
    /// The final fragment of the read is never parsed immediately: the
    /// writer may still be mid-line, so it is held back and prefixed to
    /// the next read. A line that fails to parse is logged and dropped;
    /// one corrupt record does not halt the stream.
    pub async fn poll(&mut self) -> Vec<EventRecord> {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(_) => return Vec::new(),
        };
        if len <= self.offset {
            return Vec::new();
        }

        let chunk = match self.read_range(len).await {
            Ok(chunk) => chunk,
            Err(err) => {
                // Transient read failure; the next tick retries the same range.
                debug!(path = %self.path.display(), error = %err, "event log read failed");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        let mut buffer = std::mem::take(&mut self.partial);
        buffer.extend_from_slice(&chunk);

        let mut fragments = buffer.split(|&b| b == b'\n');
        // `split` always yields at least one fragment; the last one has no
        // terminating newline yet and becomes the new carry buffer.
        let mut held = fragments.next().map(<[u8]>::to_vec).unwrap_or_default();
        for fragment in fragments {
            if let Some(record) = parse_line(&held) {
                records.push(record);
            }
            held = fragment.to_vec();
        }
        self.partial = held;
        self.offset = len;

        records
    }

    async fn read_range(&self, len: u64) -> std::io::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut chunk = Vec::with_capacity((len - self.offset) as usize);
        file.take(len - self.offset).read_to_end(&mut chunk).await?;
        Ok(chunk)
    }
}

/// Parse one complete log line. Blank lines are skipped silently;
/// malformed lines are logged and dropped.
fn parse_line(line: &[u8]) -> Option<EventRecord> {
    let line = match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    };
    if line.is_empty() {
        return None;
    }

    match serde_json::from_slice(line) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(
                error = %err,
                line = %String::from_utf8_lossy(line),
                "dropping malformed event record"
            );
            None
        }
    }
}

/// A spawned polling watcher over an event log.
///
/// Created by [`EventStream::watch`]; polls until unsubscribed or
/// dropped, delivering each record to the callback exactly once.
#[derive(Debug)]
pub struct EventStreamHandle {
    token: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl EventStreamHandle {
    /// Stop watching. Performs one final drain of the log so records
    /// appended just before unsubscription are still delivered.
    pub async fn unsubscribe(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EventStreamHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Polling event-stream watcher.
pub struct EventStream;

impl EventStream {
    /// Watch the event log at `path`, invoking `on_event` for every
    /// complete record in file order.
    ///
    /// The watcher is independent of any submit call: it may be started
    /// before the log exists and keeps polling through worker restarts.
    /// Unsubscribe via [`EventStreamHandle::unsubscribe`] (or drop the
    /// handle to stop without the final drain).
    pub fn watch<F>(path: PathBuf, poll_interval: Duration, on_event: F) -> EventStreamHandle
    where
        F: Fn(EventRecord) + Send + 'static,
    {
        let token = CancellationToken::new();
        let watcher_token = token.clone();

        let task = tokio::spawn(async move {
            let mut tail = EventLogTail::new(path);
            loop {
                for record in tail.poll().await {
                    on_event(record);
                }

                tokio::select! {
                    () = watcher_token.cancelled() => {
                        for record in tail.poll().await {
                            on_event(record);
                        }
                        return;
                    }
                    () = tokio::time::sleep(poll_interval) => {}
                }
            }
        });

        EventStreamHandle {
            token,
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &std::path::Path, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(bytes).unwrap();
    }

    #[tokio::test]
    async fn absent_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut tail = EventLogTail::new(dir.path().join("events.ndjson"));
        assert!(tail.poll().await.is_empty());
        assert_eq!(tail.offset(), 0);
    }

    #[tokio::test]
    async fn complete_lines_are_delivered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        append(&path, b"{\"event\":\"a\"}\n{\"event\":\"b\"}\n");

        let mut tail = EventLogTail::new(path);
        let records = tail.poll().await;
        let names: Vec<_> = records.iter().filter_map(|r| r.event.clone()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn trailing_fragment_is_held_until_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");

        append(&path, b"{\"event\":\"first\"}\n{\"event\":\"sec");
        let mut tail = EventLogTail::new(path.clone());
        let first = tail.poll().await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].event.as_deref(), Some("first"));

        append(&path, b"ond\"}\n");
        let second = tail.poll().await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].event.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn split_inside_multibyte_character_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        let line = "{\"message\":\"voil\u{00e0}\"}\n".as_bytes();
        let split = line.len() - 4; // inside the two-byte 'à'

        append(&path, &line[..split]);
        let mut tail = EventLogTail::new(path.clone());
        assert!(tail.poll().await.is_empty());

        append(&path, &line[split..]);
        let records = tail.poll().await;
        assert_eq!(records[0].message.as_deref(), Some("voil\u{00e0}"));
    }

    #[tokio::test]
    async fn corrupt_line_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        append(
            &path,
            b"{\"event\":\"ok\"}\nnot json\n{\"event\":\"also ok\"}\n",
        );

        let mut tail = EventLogTail::new(path);
        let records = tail.poll().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event.as_deref(), Some("ok"));
        assert_eq!(records[1].event.as_deref(), Some("also ok"));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        append(&path, b"{\"event\":\"a\"}\n\r\n\n{\"event\":\"b\"}\n");

        let mut tail = EventLogTail::new(path);
        assert_eq!(tail.poll().await.len(), 2);
    }

    #[tokio::test]
    async fn offset_advances_and_bytes_are_never_rescanned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        append(&path, b"{\"event\":\"a\"}\n");

        let mut tail = EventLogTail::new(path.clone());
        assert_eq!(tail.poll().await.len(), 1);
        let after_first = tail.offset();
        assert_eq!(after_first, 14);

        // Re-polling without new bytes delivers nothing.
        assert!(tail.poll().await.is_empty());

        append(&path, b"{\"event\":\"b\"}\n");
        let records = tail.poll().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event.as_deref(), Some("b"));
        assert!(tail.offset() > after_first);
    }
}
