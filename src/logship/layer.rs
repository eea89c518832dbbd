//! Tracing layer feeding the log queue
//!
//! Converts every tracing event in the process into a [`LogRecord`] and
//! hands it to the bounded queue without blocking the code that logged.

use super::{LogQueue, LogRecord};
use chrono::Utc;
use serde_json::Value;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A tracing layer that enqueues events for the shipper
pub struct ShipperLayer {
    queue: LogQueue,
}

impl ShipperLayer {
    /// Create a new layer feeding the given queue
    pub fn new(queue: LogQueue) -> Self {
        Self { queue }
    }
}

impl<S> Layer<S> for ShipperLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = serde_json::Map::new();
        let mut visitor = FieldVisitor(&mut fields);
        event.record(&mut visitor);

        // The message is a field like any other; pull it out of the map
        let message = fields
            .remove("message")
            .and_then(|v| match v {
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .unwrap_or_default();

        let metadata = event.metadata();
        let record = LogRecord {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            message,
            target: metadata.target().to_string(),
            file: metadata.file().map(String::from),
            line: metadata.line(),
            fields,
        };

        // Non-blocking; a full queue drops the record with a local note
        self.queue.enqueue(record);
    }
}

/// Field visitor that extracts tracing event fields into a JSON map
struct FieldVisitor<'a>(&'a mut serde_json::Map<String, Value>);

impl<'a> tracing::field::Visit for FieldVisitor<'a> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
