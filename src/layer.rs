use crate::record::{ExceptionInfo, LogEvent, LogLevel, PropertyValue, Scalar};
use crate::report::ErrorReport;
use crate::sink::EventSink;
use chrono::Local;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Events from this crate's own modules never become reports.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");
const OWN_TARGET_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

/// `true` for this crate's root target and its submodules, but not for
/// other crates that merely share the name prefix.
fn is_own_target(target: &str) -> bool {
    target == OWN_TARGET || target.starts_with(OWN_TARGET_PREFIX)
}

/// `tracing_subscriber` layer that turns events into Raygun reports and
/// forwards them to an [`EventSink`] via a bounded channel and a
/// background task.
///
/// By default this layer only captures events with level `ERROR`. The
/// report is built on the thread that logged the event (so the ambient
/// request is visible), while network I/O happens on the background task.
/// Each report is sent once; failures are printed to stderr and counted.
pub struct ReportLayer {
    sender: mpsc::Sender<ErrorReport>,
    sink: Arc<EventSink>,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full or closed.
    pub dropped_events: Arc<AtomicU64>,
    /// Reports the sink failed to deliver.
    pub failed_events: Arc<AtomicU64>,
}

impl ReportLayer {
    /// Create a new layer capturing `ERROR` events and spawn the delivery
    /// task. Must be called inside a Tokio runtime.
    ///
    /// A minimal threshold of 16 is enforced for `buffer`.
    pub fn new(sink: Arc<EventSink>, buffer: usize) -> (Self, JoinHandle<()>) {
        Self::with_min_level(sink, buffer, Level::ERROR)
    }

    /// Same as [`ReportLayer::new`] but captures every event at
    /// `min_level` or more severe.
    pub fn with_min_level(sink: Arc<EventSink>, buffer: usize, min_level: Level) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<ErrorReport>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));
        let failed_events = Arc::new(AtomicU64::new(0));

        let sink_bg = Arc::clone(&sink);
        let failed_events_bg = Arc::clone(&failed_events);

        let handle = tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                if let Err(e) = sink_bg.deliver(report).await {
                    failed_events_bg.fetch_add(1, Ordering::Relaxed);
                    eprintln!("error sending raygun report: {}", e);
                }
            }
        });

        (Self {
            sender: tx,
            sink,
            min_level,
            total_events,
            enqueued_events,
            dropped_events,
            failed_events,
        }, handle)
    }
}

impl<S> Layer<S> for ReportLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level || is_own_target(meta.target()) {
            return;
        }

        let mut properties = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut exception: Option<ExceptionInfo> = None;

        let mut visitor = FieldVisitor {
            properties: &mut properties,
            message: &mut message,
            exception: &mut exception,
        };
        event.record(&mut visitor);

        let log_event = LogEvent {
            timestamp: Local::now().fixed_offset(),
            level: LogLevel::from(*meta.level()),
            message_template: message.unwrap_or_default(),
            exception,
            properties,
        };
        let report = self.sink.build_report(&log_event);

        match self.sender.try_send(report) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("raygun report channel full, dropping report");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("raygun delivery task has stopped, dropping report");
            }
        }
    }
}

use tracing::field::{Field, Visit};

/// Collects event fields into [`PropertyValue`]s.
///
/// `message` becomes the template and the first recorded error becomes the
/// exception; an error is also kept as a property under its field name.
pub struct FieldVisitor<'a> {
    pub properties: &'a mut BTreeMap<String, PropertyValue>,
    pub message: &'a mut Option<String>,
    pub exception: &'a mut Option<ExceptionInfo>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: Scalar) {
        self.properties.insert(field.name().to_string(), PropertyValue::Scalar(value));
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, Scalar::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Scalar::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Scalar::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Scalar::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Scalar::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.exception.is_none() {
            *self.exception = Some(ExceptionInfo::from_error(value));
        }
        self.insert(field, Scalar::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Scalar::Other(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_target_matches_crate_and_submodules_only() {
        assert!(is_own_target("tracing_raygun_sink"));
        assert!(is_own_target("tracing_raygun_sink::client"));
        assert!(!is_own_target("tracing_raygun_sink_billing"));
        assert!(!is_own_target("tracing_raygun_sink_billing::invoices"));
        assert!(!is_own_target("checkout"));
    }
}
