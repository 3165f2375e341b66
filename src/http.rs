use crate::config::DEFAULT_ENDPOINT;
use crate::report::ErrorReport;
use crate::transport::ReportTransport;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;

/// [`ReportTransport`] posting reports as JSON to the Raygun entries API.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Construct a transport targeting `endpoint`.
    ///
    /// **Parameters**
    /// - `endpoint`: full URL of the entries API, e.g.
    ///   [`DEFAULT_ENDPOINT`] or a local proxy.
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpTransport {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl ReportTransport for HttpTransport {
    async fn send(&self, api_key: &str, report: &ErrorReport) -> Result<(), Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-ApiKey", api_key)
            .json(report)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("Raygun rejected report with status {}: {}", status, text).into())
        }
    }
}
