use std::sync::Arc;

use tracing_raygun_sink::noop_transport::NoopTransport;
use tracing_raygun_sink::{EventSink, LogEvent, LogLevel, SinkConfig};

/// Shows the custom grouping hook: events carrying a `GroupKey` property
/// are grouped under that key and observers are told about it.
#[tokio::main]
async fn main() {
    let sink = EventSink::with_transport(SinkConfig::new("local-only"), Arc::new(NoopTransport))
        .expect("build sink");

    sink.on_grouping(|ctx, group| {
        println!(
            "report with tags {:?} grouped as {:?}",
            ctx.report.details.tags.as_slice(),
            group.group_key
        );
        Ok(())
    });

    let grouped = LogEvent::new(LogLevel::Error, "checkout failed for cart {CartId}")
        .with_property("CartId", 981)
        .with_property("GroupKey", "checkout-error");
    let ungrouped = LogEvent::new(LogLevel::Error, "unexpected state");

    sink.emit(&grouped).await.expect("send grouped");
    sink.emit(&ungrouped).await.expect("send ungrouped");
}
