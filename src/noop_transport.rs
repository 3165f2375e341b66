use crate::report::ErrorReport;
use crate::transport::ReportTransport;
use async_trait::async_trait;
use std::error::Error;

/// A transport that accepts and drops every report.
///
/// Useful for measuring the cost of report building without any network
/// I/O, and for running the sink with reporting switched off.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl ReportTransport for NoopTransport {
    async fn send(&self, _api_key: &str, _report: &ErrorReport) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
