use std::fmt;
use std::sync::Arc;

use crate::error::SinkError;
use crate::template::FormatProvider;

/// Default Raygun ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.raygun.com/entries";

pub const DEFAULT_USER_NAME_PROPERTY: &str = "UserName";
pub const DEFAULT_APPLICATION_VERSION_PROPERTY: &str = "ApplicationVersion";
pub const DEFAULT_GROUP_KEY_PROPERTY: &str = "GroupKey";

/// Configuration of an [`EventSink`](crate::sink::EventSink).
///
/// Fixed at construction and never mutated afterwards.
///
/// **Fields**
/// - `application_key`: Raygun application API key. Required, must not
///   be blank.
/// - `wrapper_exceptions`: error type names stripped from the head of an
///   exception chain when they wrap an inner cause.
/// - `user_name_property`: event property holding the user identity.
/// - `application_version_property`: event property holding the version.
/// - `tags`: static tags put on every report, before the level tag.
/// - `ignored_form_field_names`: request form fields removed from reports
///   (`"*"` removes all of them).
/// - `group_key_property`: custom-data entry used as the grouping key.
/// - `format_provider`: optional hook used when rendering messages.
/// - `endpoint`: URL used by the HTTP transport.
#[derive(Clone)]
pub struct SinkConfig {
    pub application_key: String,
    pub wrapper_exceptions: Vec<String>,
    pub user_name_property: String,
    pub application_version_property: String,
    pub tags: Vec<String>,
    pub ignored_form_field_names: Vec<String>,
    pub group_key_property: String,
    pub format_provider: Option<Arc<dyn FormatProvider>>,
    pub endpoint: String,
}

impl SinkConfig {
    /// Configuration with the given key and every other field defaulted.
    pub fn new(application_key: impl Into<String>) -> Self {
        SinkConfig {
            application_key: application_key.into(),
            wrapper_exceptions: Vec::new(),
            user_name_property: DEFAULT_USER_NAME_PROPERTY.to_string(),
            application_version_property: DEFAULT_APPLICATION_VERSION_PROPERTY.to_string(),
            tags: Vec::new(),
            ignored_form_field_names: Vec::new(),
            group_key_property: DEFAULT_GROUP_KEY_PROPERTY.to_string(),
            format_provider: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SinkError> {
        if self.application_key.trim().is_empty() {
            return Err(SinkError::InvalidConfiguration(
                "application key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("application_key", &"<redacted>")
            .field("wrapper_exceptions", &self.wrapper_exceptions)
            .field("user_name_property", &self.user_name_property)
            .field("application_version_property", &self.application_version_property)
            .field("tags", &self.tags)
            .field("ignored_form_field_names", &self.ignored_form_field_names)
            .field("group_key_property", &self.group_key_property)
            .field("format_provider", &self.format_provider.is_some())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
