use std::collections::BTreeMap;
use std::future::Future;

use url::{form_urlencoded, ParseError, Url};

/// Base used to resolve relative request URLs; never reported.
const RELATIVE_BASE: &str = "http://localhost/";

/// Snapshot of the HTTP request being served when an event was logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub host_name: Option<String>,
    pub url: String,
    pub http_method: String,
    pub ip_address: Option<String>,
    pub query_string: BTreeMap<String, String>,
    pub form: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub raw_data: Option<String>,
}

impl HttpRequest {
    /// Build a request from a method and an absolute or relative URL.
    ///
    /// The host (and port, if explicit) goes to `host_name`, the path to
    /// `url`, and the query string is decoded into `query_string`. Userinfo
    /// and fragments are dropped. Relative URLs leave `host_name` empty.
    pub fn from_url(method: impl Into<String>, url: &str) -> Self {
        let (parsed, relative) = match Url::parse(url) {
            Ok(parsed) => (Some(parsed), false),
            Err(ParseError::RelativeUrlWithoutBase) => {
                (Url::parse(RELATIVE_BASE).and_then(|base| base.join(url)).ok(), true)
            }
            Err(_) => (None, false),
        };

        let mut request = HttpRequest {
            http_method: method.into(),
            ..Default::default()
        };
        match parsed {
            Some(parsed) => {
                if !relative {
                    request.host_name = parsed.host_str().map(|host| match parsed.port() {
                        Some(port) => format!("{}:{}", host, port),
                        None => host.to_string(),
                    });
                }
                request.url = parsed.path().to_string();
                request.query_string = parsed.query_pairs().into_owned().collect();
            }
            None => request.url = url.to_string(),
        }
        request
    }

    /// Attach an `application/x-www-form-urlencoded` body as form fields.
    /// Later duplicates win.
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.form
            .extend(form_urlencoded::parse(body.as_bytes()).into_owned());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// Source of the request currently being handled, if any.
pub trait RequestContextProvider: Send + Sync {
    fn current_request(&self) -> Option<HttpRequest>;
}

tokio::task_local! {
    static CURRENT_REQUEST: HttpRequest;
}

/// Run `future` with `request` as the ambient request for
/// [`TaskLocalRequestContext`].
pub async fn scope_request<F>(request: HttpRequest, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_REQUEST.scope(request, future).await
}

/// Run `f` synchronously with `request` as the ambient request.
pub fn sync_scope_request<R>(request: HttpRequest, f: impl FnOnce() -> R) -> R {
    CURRENT_REQUEST.sync_scope(request, f)
}

/// Ambient request provider backed by a Tokio task-local.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalRequestContext;

impl RequestContextProvider for TaskLocalRequestContext {
    fn current_request(&self) -> Option<HttpRequest> {
        CURRENT_REQUEST.try_with(|request| request.clone()).ok()
    }
}
