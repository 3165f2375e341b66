use crate::report::ErrorReport;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`ErrorReport`]s built by the sink.
///
/// Implementations are responsible for putting a report on the wire
/// (Raygun HTTP API, a test double, a local file, etc). The client calls
/// `send` exactly once per report and never retries.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Deliver a single report.
    ///
    /// **Parameters**
    /// - `api_key`: application key the report belongs to.
    /// - `report`: fully-populated [`ErrorReport`], grouping key included.
    ///
    /// **Returns**
    /// - `Ok(())` if the report was accepted by the backend.
    /// - `Err(..)` if delivery failed (network error, serialization
    ///   error, HTTP status, etc). The error is surfaced to the caller of
    ///   `EventSink::emit` unchanged.
    async fn send(&self, api_key: &str, report: &ErrorReport) -> Result<(), Box<dyn Error + Send + Sync>>;
}
