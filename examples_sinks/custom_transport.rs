use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_raygun_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_raygun_sink::noop_transport::NoopTransport;
use tracing_raygun_sink::report::ErrorReport;
use tracing_raygun_sink::transport::ReportTransport;
use tracing_raygun_sink::{EventSink, SinkConfig};

/// Example of plugging in a completely custom transport by implementing
/// `ReportTransport` directly. This one prints the wire JSON.
struct StdoutTransport;

#[async_trait]
impl ReportTransport for StdoutTransport {
    async fn send(&self, _api_key: &str, report: &ErrorReport) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let transport: Arc<dyn ReportTransport> = if std::env::args().any(|a| a == "--load") {
        Arc::new(NoopTransport)
    } else {
        Arc::new(StdoutTransport)
    };

    let mut config = SinkConfig::new("local-only");
    config.tags = vec!["example".to_string()];
    let sink = EventSink::with_transport(config, transport).expect("build sink");

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        enable_stdout: false,
        ..LayerConfig::default()
    };
    init_tracing_with_config(Arc::new(sink), layer_config).expect("install subscriber");

    let n: u64 = if std::env::args().any(|a| a == "--load") { 10_000 } else { 1 };
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, OrderId = 42, "payment failed for order {{OrderId}}");
    }

    let elapsed = start.elapsed();
    eprintln!("built {} reports in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(1)).await;
}
