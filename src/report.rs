use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::request::HttpRequest;

const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error report in the Raygun entries wire format.
///
/// Built per event by the sink, handed to the client and not retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorReport {
    pub occurred_on: DateTime<Utc>,
    pub details: ReportDetails,
}

impl ErrorReport {
    pub fn new(occurred_on: DateTime<Utc>) -> Self {
        ErrorReport {
            occurred_on,
            details: ReportDetails::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportDetails {
    pub machine_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub environment: EnvironmentDetail,
    pub tags: Tags,
    pub user_custom_data: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestDetail>,
    pub client: ClientDetail,
}

/// Report tags.
///
/// Serialized in insertion order; equality ignores order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn push(&mut self, tag: impl Into<String>) {
        self.0.push(tag.into());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl PartialEq for Tags {
    fn eq(&self, other: &Self) -> bool {
        let mut left: Vec<&String> = self.0.iter().collect();
        let mut right: Vec<&String> = other.0.iter().collect();
        left.sort();
        right.sort();
        left == right
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Tags(tags)
    }
}

/// Exception subtree, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDetail {
    pub class_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<Box<ErrorDetail>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDetail {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientDetail {
    pub name: String,
    pub version: String,
}

impl Default for ClientDetail {
    fn default() -> Self {
        ClientDetail {
            name: CLIENT_NAME.to_string(),
            version: CLIENT_VERSION.to_string(),
        }
    }
}

/// Machine and runtime snapshot taken when the report is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentDetail {
    pub processor_count: usize,
    pub os_version: String,
    pub architecture: String,
    /// Megabytes.
    pub total_physical_memory: u64,
    /// Megabytes.
    pub available_physical_memory: u64,
    /// Hours east of UTC.
    pub utc_offset: f64,
}

impl EnvironmentDetail {
    pub fn capture() -> Self {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();

        let processor_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let os_version = sysinfo::System::long_os_version()
            .unwrap_or_else(|| std::env::consts::OS.to_string());

        EnvironmentDetail {
            processor_count,
            os_version,
            architecture: std::env::consts::ARCH.to_string(),
            total_physical_memory: sys.total_memory() / (1024 * 1024),
            available_physical_memory: sys.available_memory() / (1024 * 1024),
            utc_offset: f64::from(Local::now().offset().local_minus_utc()) / 3600.0,
        }
    }
}

/// Host name of this machine, `"unknown"` when it cannot be read.
pub fn machine_name() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    pub url: String,
    pub http_method: String,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub query_string: BTreeMap<String, String>,
    pub form: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

impl RequestDetail {
    /// Copy `request`, dropping form fields named in `ignored_form_fields`.
    ///
    /// Names match ASCII case-insensitively; `"*"` drops every form field.
    pub fn from_request(request: &HttpRequest, ignored_form_fields: &[String]) -> Self {
        let ignore_all = ignored_form_fields.iter().any(|name| name == "*");
        let form = if ignore_all {
            BTreeMap::new()
        } else {
            request
                .form
                .iter()
                .filter(|(name, _)| {
                    !ignored_form_fields
                        .iter()
                        .any(|ignored| ignored.eq_ignore_ascii_case(name))
                })
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        };

        RequestDetail {
            host_name: request.host_name.clone(),
            url: request.url.clone(),
            http_method: request.http_method.clone(),
            ip_address: request.ip_address.clone(),
            query_string: request.query_string.clone(),
            form,
            headers: request.headers.clone(),
            raw_data: request.raw_data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn tags_compare_without_order() {
        let a = Tags::from(vec!["api".to_string(), "Error".to_string()]);
        let b = Tags::from(vec!["Error".to_string(), "api".to_string()]);
        let c = Tags::from(vec!["Error".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!(["api", "Error"]));
    }

    #[test]
    fn ignored_form_fields_are_redacted() {
        let request = HttpRequest::from_url("POST", "/login").with_form_body("User=bob&Password=secret&remember=1");

        let detail = RequestDetail::from_request(&request, &["password".to_string()]);
        assert_eq!(detail.form.len(), 2);
        assert!(!detail.form.contains_key("Password"));

        let detail = RequestDetail::from_request(&request, &["*".to_string()]);
        assert!(detail.form.is_empty());

        let detail = RequestDetail::from_request(&request, &[]);
        assert_eq!(detail.form.len(), 3);
    }

    #[test]
    fn optional_sections_are_omitted_from_json() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut report = ErrorReport::new(when);
        report.details.machine_name = "web-1".to_string();
        report.details.tags.push("Error");

        let json = serde_json::to_value(&report).unwrap();
        let details = &json["Details"];
        assert_eq!(json["OccurredOn"], json!("2024-03-01T12:00:00Z"));
        assert_eq!(details["MachineName"], json!("web-1"));
        assert_eq!(details["Tags"], json!(["Error"]));
        assert!(details.get("User").is_none());
        assert!(details.get("Request").is_none());
        assert!(details.get("Error").is_none());
        assert!(details.get("GroupingKey").is_none());
        assert_eq!(details["Client"]["Name"], json!("tracing-raygun-sink"));
    }

    #[test]
    fn request_ip_uses_wire_name() {
        let request = HttpRequest::from_url("GET", "/").with_ip_address("10.0.0.1");
        let json = serde_json::to_value(RequestDetail::from_request(&request, &[])).unwrap();
        assert_eq!(json["IPAddress"], json!("10.0.0.1"));
    }

    #[test]
    fn environment_snapshot_has_basics() {
        let env = EnvironmentDetail::capture();
        assert!(env.processor_count >= 1);
        assert!(!env.architecture.is_empty());
        assert!(!machine_name().is_empty());
    }
}
