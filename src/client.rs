use std::sync::Arc;

use tracing::debug;

use crate::error::SinkError;
use crate::grouping::GroupingResolver;
use crate::record::ExceptionInfo;
use crate::report::{ErrorDetail, ErrorReport};
use crate::transport::ReportTransport;

/// Client for the Raygun service.
///
/// Owns the application key, the set of wrapper exception types, the
/// optional grouping resolver and the [`ReportTransport`] used for the
/// actual delivery. Safe to share between threads; `send` keeps no state
/// between calls.
pub struct RaygunClient {
    api_key: String,
    transport: Arc<dyn ReportTransport>,
    wrapper_exceptions: Vec<String>,
    grouping_resolver: Option<Arc<dyn GroupingResolver>>,
}

impl RaygunClient {
    /// Create a client for `api_key` delivering through `transport`.
    ///
    /// **Returns**
    /// - `Err(SinkError::InvalidConfiguration)` if `api_key` is blank.
    pub fn new(api_key: impl Into<String>, transport: Arc<dyn ReportTransport>) -> Result<Self, SinkError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SinkError::InvalidConfiguration(
                "application key must not be empty".to_string(),
            ));
        }
        Ok(RaygunClient {
            api_key,
            transport,
            wrapper_exceptions: Vec::new(),
            grouping_resolver: None,
        })
    }

    /// Register error type names that only wrap a more meaningful cause.
    ///
    /// A name matches a type name exactly or as its last path segment
    /// (`"Wrapper"` matches `app::errors::Wrapper`).
    pub fn add_wrapper_exceptions<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.wrapper_exceptions.contains(&name) {
                self.wrapper_exceptions.push(name);
            }
        }
    }

    pub fn set_grouping_resolver(&mut self, resolver: Arc<dyn GroupingResolver>) {
        self.grouping_resolver = Some(resolver);
    }

    fn is_wrapper(&self, type_name: &str) -> bool {
        self.wrapper_exceptions.iter().any(|name| {
            type_name == name
                || type_name
                    .strip_suffix(name.as_str())
                    .map_or(false, |prefix| prefix.ends_with("::"))
        })
    }

    /// Build the exception subtree of a report.
    ///
    /// Wrapper exceptions at the head of the chain are skipped as long as
    /// they have an inner cause.
    pub fn build_error_detail(&self, exception: &ExceptionInfo) -> ErrorDetail {
        let mut current = exception;
        while self.is_wrapper(&current.type_name) {
            match current.inner.as_deref() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        to_error_detail(current)
    }

    /// Ask the grouping resolver for an override key and store it on the
    /// report.
    pub fn resolve_grouping_key(&self, report: &mut ErrorReport) -> Result<(), SinkError> {
        let Some(resolver) = &self.grouping_resolver else {
            return Ok(());
        };
        if let Some(key) = resolver.resolve(report).map_err(SinkError::Observer)? {
            report.details.grouping_key = Some(key);
        }
        Ok(())
    }

    /// Resolve grouping and deliver `report` through the transport.
    ///
    /// Exactly one delivery attempt is made.
    pub async fn send(&self, mut report: ErrorReport) -> Result<(), SinkError> {
        self.resolve_grouping_key(&mut report)?;

        debug!(
            grouping_key = report.details.grouping_key.as_deref(),
            tags = ?report.details.tags.as_slice(),
            "sending error report"
        );

        self.transport
            .send(&self.api_key, &report)
            .await
            .map_err(SinkError::Transport)
    }
}

fn to_error_detail(exception: &ExceptionInfo) -> ErrorDetail {
    ErrorDetail {
        class_name: exception.type_name.clone(),
        message: exception.message.clone(),
        inner_error: exception.inner.as_deref().map(|inner| Box::new(to_error_detail(inner))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::noop_transport::NoopTransport;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::error::Error;

    struct FailingTransport;

    #[async_trait]
    impl ReportTransport for FailingTransport {
        async fn send(&self, _api_key: &str, _report: &ErrorReport) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("connection refused".into())
        }
    }

    fn client() -> RaygunClient {
        RaygunClient::new("key", Arc::new(NoopTransport)).unwrap()
    }

    fn chain() -> ExceptionInfo {
        ExceptionInfo::new("app::TaskFailed", "task failed").with_inner(
            ExceptionInfo::new("Wrapped", "wrapped").with_inner(ExceptionInfo::new("ParseIntError", "invalid digit")),
        )
    }

    #[test]
    fn rejects_blank_key() {
        assert!(matches!(
            RaygunClient::new(" ", Arc::new(NoopTransport)),
            Err(SinkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn error_detail_keeps_chain_without_wrappers() {
        let detail = client().build_error_detail(&chain());
        assert_eq!(detail.class_name, "app::TaskFailed");
        let inner = detail.inner_error.unwrap();
        assert_eq!(inner.class_name, "Wrapped");
        assert_eq!(inner.inner_error.unwrap().class_name, "ParseIntError");
    }

    #[test]
    fn wrappers_are_stripped_from_the_head() {
        let mut client = client();
        client.add_wrapper_exceptions(["TaskFailed", "Wrapped"]);

        let detail = client.build_error_detail(&chain());
        assert_eq!(detail.class_name, "ParseIntError");
        assert_eq!(detail.message, "invalid digit");
        assert!(detail.inner_error.is_none());
    }

    #[test]
    fn wrapper_without_inner_is_kept() {
        let mut client = client();
        client.add_wrapper_exceptions(["Wrapped"]);
        let detail = client.build_error_detail(&ExceptionInfo::new("Wrapped", "alone"));
        assert_eq!(detail.class_name, "Wrapped");
    }

    #[test]
    fn wrapper_match_respects_path_segments() {
        let mut client = client();
        client.add_wrapper_exceptions(["Failed"]);
        let detail = client.build_error_detail(&chain());
        assert_eq!(detail.class_name, "app::TaskFailed");
    }

    #[test]
    fn resolver_sets_grouping_key() {
        let mut client = client();
        let resolver = |_: &ErrorReport| -> Result<Option<String>, BoxError> { Ok(Some("fixed".to_string())) };
        client.set_grouping_resolver(Arc::new(resolver));

        let mut report = ErrorReport::new(Utc::now());
        client.resolve_grouping_key(&mut report).unwrap();
        assert_eq!(report.details.grouping_key.as_deref(), Some("fixed"));
    }

    #[tokio::test]
    async fn resolver_failure_aborts_send() {
        let mut client = client();
        let resolver = |_: &ErrorReport| -> Result<Option<String>, BoxError> { Err("boom".into()) };
        client.set_grouping_resolver(Arc::new(resolver));

        let err = client.send(ErrorReport::new(Utc::now())).await.unwrap_err();
        assert!(matches!(err, SinkError::Observer(_)));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let client = RaygunClient::new("key", Arc::new(FailingTransport)).unwrap();
        let err = client.send(ErrorReport::new(Utc::now())).await.unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
