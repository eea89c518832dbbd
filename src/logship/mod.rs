//! Log queue and shipper
//!
//! Decouples log production (synchronous, inline, anywhere in the
//! process) from log delivery (a network call that must never block the
//! producer). Records flow through a bounded channel to a single worker
//! task that forwards them to a remote collector with a short timeout,
//! appending each to a date-stamped local NDJSON file along the way.
//! Delivery is best-effort: failures are noted locally and the record is
//! dropped, never retried.

pub mod layer;

pub use layer::ShipperLayer;

use crate::config::LoggingConfig;
use crate::error::{NotescribeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One captured log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the event was intercepted
    pub timestamp: DateTime<Utc>,
    /// Severity level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub level: String,
    /// Event message
    pub message: String,
    /// Originating module path
    pub target: String,
    /// Source file, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Structured fields attached to the event
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Wire envelope posted to the collector, matching what it expects
#[derive(Debug, Serialize)]
struct CollectorEnvelope<'a> {
    log: &'a LogRecord,
    r#type: &'static str,
    application: &'static str,
}

/// Items flowing through the queue; `Shutdown` is the sentinel that
/// terminates the worker loop cleanly
#[derive(Debug)]
enum QueueItem {
    Record(Box<LogRecord>),
    Shutdown,
}

/// Producer handle onto the bounded log queue
///
/// Cheap to clone. Enqueueing never blocks and never fails upward: a
/// full or closed queue drops the record with a local note.
#[derive(Clone)]
pub struct LogQueue {
    tx: mpsc::Sender<QueueItem>,
}

impl LogQueue {
    /// Enqueues a record for shipping, dropping it if the queue is full
    pub fn enqueue(&self, record: LogRecord) {
        if let Err(e) = self.tx.try_send(QueueItem::Record(Box::new(record))) {
            // Local note only; logging must never bubble an error into
            // the producer, and using tracing here would recurse.
            eprintln!("[logship] queue rejected record: {}", e);
        }
    }
}

/// Handle on the shipper worker task
pub struct LogShipper {
    tx: mpsc::Sender<QueueItem>,
    handle: JoinHandle<()>,
}

impl LogShipper {
    /// Spawns the shipper worker and returns its handle plus a producer
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the delivery HTTP client cannot be built; a
    /// client without the delivery timeout is not an acceptable stand-in.
    pub fn spawn(config: LoggingConfig) -> Result<(Self, LogQueue)> {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let queue = LogQueue { tx: tx.clone() };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.delivery_timeout_ms))
            .build()
            .map_err(|e| {
                NotescribeError::LogShipping(format!("failed to build delivery client: {}", e))
            })?;

        let handle = tokio::spawn(run_worker(
            rx,
            client,
            config.collector_url.clone(),
            config.file_dir.clone(),
        ));

        Ok((Self { tx, handle }, queue))
    }

    /// Sends the shutdown sentinel and waits for the worker to finish
    ///
    /// Records already queued ahead of the sentinel are still processed.
    pub async fn shutdown(self) {
        if self.tx.send(QueueItem::Shutdown).await.is_err() {
            // Worker already gone; nothing to wait for beyond the join.
        }
        if let Err(e) = self.handle.await {
            eprintln!("[logship] worker join failed: {}", e);
        }
    }
}

/// Worker loop: WAITING -> DEQUEUED -> {DELIVERED | DELIVERY_FAILED} -> WAITING
async fn run_worker(
    mut rx: mpsc::Receiver<QueueItem>,
    client: reqwest::Client,
    collector_url: String,
    file_dir: PathBuf,
) {
    while let Some(item) = rx.recv().await {
        let record = match item {
            QueueItem::Shutdown => break,
            QueueItem::Record(record) => record,
        };

        append_to_file(&file_dir, &record);
        deliver(&client, &collector_url, &record).await;
    }
}

/// Attempt one delivery; on any failure note it locally and move on
async fn deliver(client: &reqwest::Client, collector_url: &str, record: &LogRecord) {
    let envelope = CollectorEnvelope {
        log: record,
        r#type: "backend",
        application: "notescribe",
    };

    match client.post(collector_url).json(&envelope).send().await {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => {
            eprintln!(
                "[logship] collector returned {}, dropping: {} {}",
                response.status(),
                record.level,
                record.message
            );
        }
        Err(e) => {
            eprintln!(
                "[logship] delivery failed ({}), dropping: {} {}",
                e, record.level, record.message
            );
        }
    }
}

/// Append the record as one NDJSON line to the date-stamped local file
fn append_to_file(file_dir: &Path, record: &LogRecord) {
    let result = (|| -> std::io::Result<()> {
        std::fs::create_dir_all(file_dir)?;
        let file_name = format!("backend-{}.logs", Utc::now().format("%Y-%m-%d"));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_dir.join(file_name))?;
        let line = serde_json::to_string(record).unwrap_or_default();
        writeln!(file, "{}", line)
    })();

    if let Err(e) = result {
        eprintln!("[logship] file sink failed: {}", e);
    }
}

impl LogRecord {
    /// Creates a record stamped now with no structured fields
    pub fn new(level: impl Into<String>, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.into(),
            message: message.into(),
            target: target.into(),
            file: None,
            line: None,
            fields: serde_json::Map::new(),
        }
    }
}
