use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use tracing_raygun_sink::init::init_tracing;
use tracing_raygun_sink::request::{scope_request, HttpRequest, TaskLocalRequestContext};
use tracing_raygun_sink::{EventSink, SinkConfig};

/// Reads `RAYGUN_SINK_*` variables and reports an error logged while an
/// HTTP request is being served.
#[tokio::main]
async fn main() {
    let mut config = SinkConfig::from_env().expect("RAYGUN_SINK_API_KEY must be set");
    config.ignored_form_field_names.push("password".to_string());

    let sink = EventSink::new(config)
        .expect("build sink")
        .with_request_context(Arc::new(TaskLocalRequestContext));
    init_tracing(Arc::new(sink)).expect("install subscriber");

    info!("starting service");

    let request = HttpRequest::from_url("POST", "https://shop.example.com/login?next=%2Fcart")
        .with_form_body("user=bob&password=hunter2")
        .with_header("User-Agent", "curl/8.5.0")
        .with_ip_address("203.0.113.7");

    scope_request(request, async {
        error!(
            UserName = "bob",
            ApplicationVersion = env!("CARGO_PKG_VERSION"),
            reason = "invalid password",
            "authentication failed for {{UserName}}"
        );
    })
    .await;

    sleep(Duration::from_secs(2)).await;
}
