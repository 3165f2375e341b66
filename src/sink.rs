use std::sync::Arc;

use tracing::debug;

use crate::client::RaygunClient;
use crate::config::SinkConfig;
use crate::error::{BoxError, SinkError};
use crate::formatter::{lookup_optional_string_property, simplify};
use crate::grouping::{GroupingContext, GroupingCoordinator, MessageGroup};
use crate::record::LogEvent;
use crate::report::{machine_name, EnvironmentDetail, ErrorReport, RequestDetail, Tags, UserDetail};
use crate::request::RequestContextProvider;
use crate::transport::ReportTransport;

/// Custom-data key holding the rendered message.
pub const RENDERED_MESSAGE_KEY: &str = "RenderedLogMessage";
/// Custom-data key holding the raw message template.
pub const MESSAGE_TEMPLATE_KEY: &str = "LogMessageTemplate";

/// Turns [`LogEvent`]s into [`ErrorReport`]s and sends them to Raygun.
///
/// The sink holds only immutable configuration, the client and the
/// grouping coordinator, so `emit` can be called from many threads at
/// once.
pub struct EventSink {
    config: SinkConfig,
    client: RaygunClient,
    coordinator: Arc<GroupingCoordinator>,
    request_context: Option<Arc<dyn RequestContextProvider>>,
    machine_name: String,
}

impl EventSink {
    /// Build a sink delivering over HTTP to `config.endpoint`.
    #[cfg(feature = "http")]
    pub fn new(config: SinkConfig) -> Result<Self, SinkError> {
        let transport = Arc::new(crate::http::HttpTransport::new(config.endpoint.clone()));
        Self::with_transport(config, transport)
    }

    /// Build a sink delivering through a custom transport.
    ///
    /// **Returns**
    /// - `Err(SinkError::InvalidConfiguration)` if the application key is
    ///   blank. Nothing can be emitted in that case.
    pub fn with_transport(config: SinkConfig, transport: Arc<dyn ReportTransport>) -> Result<Self, SinkError> {
        config.validate()?;

        let mut client = RaygunClient::new(config.application_key.clone(), transport)?;
        client.add_wrapper_exceptions(config.wrapper_exceptions.iter().cloned());

        let coordinator = Arc::new(GroupingCoordinator::new(config.group_key_property.clone()));
        client.set_grouping_resolver(coordinator.clone());

        debug!(
            tags = ?config.tags,
            group_key_property = %config.group_key_property,
            "raygun event sink initialized"
        );

        Ok(EventSink {
            config,
            client,
            coordinator,
            request_context: None,
            machine_name: machine_name(),
        })
    }

    /// Attach the source of the ambient HTTP request.
    pub fn with_request_context(mut self, provider: Arc<dyn RequestContextProvider>) -> Self {
        self.request_context = Some(provider);
        self
    }

    /// Register an observer fired whenever a custom grouping key is
    /// resolved during a send. An observer error aborts that send.
    pub fn on_grouping<F>(&self, observer: F)
    where
        F: Fn(&GroupingContext<'_>, &MessageGroup) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.coordinator.subscribe(observer);
    }

    /// Build the report for `event` without sending it.
    ///
    /// Runs on the caller's thread, so the ambient request (if any) is the
    /// one the event was logged under.
    pub fn build_report(&self, event: &LogEvent) -> ErrorReport {
        let mut tags = Tags::from(self.config.tags.clone());
        tags.push(event.level.to_string());

        let mut custom_data: std::collections::BTreeMap<String, serde_json::Value> = event
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), simplify(value)))
            .collect();

        // Inserted last: these win over user properties of the same name.
        let rendered = event.render_message(self.config.format_provider.as_deref());
        custom_data.insert(RENDERED_MESSAGE_KEY.to_string(), serde_json::Value::String(rendered));
        custom_data.insert(
            MESSAGE_TEMPLATE_KEY.to_string(),
            serde_json::Value::String(event.message_template.clone()),
        );

        let mut report = ErrorReport::new(event.timestamp.with_timezone(&chrono::Utc));
        let details = &mut report.details;

        details.error = event
            .exception
            .as_ref()
            .map(|exception| self.client.build_error_detail(exception));

        details.user = lookup_optional_string_property(&event.properties, &self.config.user_name_property)
            .map(|identifier| UserDetail { identifier });
        details.version =
            lookup_optional_string_property(&event.properties, &self.config.application_version_property);

        details.environment = EnvironmentDetail::capture();
        details.machine_name = self.machine_name.clone();
        details.tags = tags;
        details.user_custom_data = custom_data;

        details.request = self
            .request_context
            .as_ref()
            .and_then(|provider| provider.current_request())
            .map(|request| RequestDetail::from_request(&request, &self.config.ignored_form_field_names));

        report
    }

    /// Send an already built report. One attempt, no retries.
    pub async fn deliver(&self, report: ErrorReport) -> Result<(), SinkError> {
        self.client.send(report).await
    }

    /// Build the report for `event` and send it.
    ///
    /// **Returns**
    /// - `Err(SinkError::Transport)` if delivery failed.
    /// - `Err(SinkError::Observer)` if a grouping observer failed.
    pub async fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        let report = self.build_report(event);
        self.deliver(report).await
    }
}
