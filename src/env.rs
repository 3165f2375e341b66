//! Environment variable names used by this crate for convenient
//! configuration of the sink from services.
//!
//! These are purely helpers; [`SinkConfig`] itself never reads the
//! environment.

use crate::config::{SinkConfig, DEFAULT_ENDPOINT};
use crate::error::SinkError;

/// Raygun application API key. Required.
pub const RAYGUN_SINK_API_KEY_ENV: &str = "RAYGUN_SINK_API_KEY";

/// Entries endpoint, defaults to the public Raygun API.
pub const RAYGUN_SINK_ENDPOINT_ENV: &str = "RAYGUN_SINK_ENDPOINT";

/// Comma-separated static tags.
pub const RAYGUN_SINK_TAGS_ENV: &str = "RAYGUN_SINK_TAGS";

/// Comma-separated form field names to redact.
pub const RAYGUN_SINK_IGNORED_FORM_FIELDS_ENV: &str = "RAYGUN_SINK_IGNORED_FORM_FIELDS";

/// Comma-separated wrapper error type names.
pub const RAYGUN_SINK_WRAPPER_EXCEPTIONS_ENV: &str = "RAYGUN_SINK_WRAPPER_EXCEPTIONS";

/// Split a comma-separated list, trimming entries and skipping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl SinkConfig {
    /// Build a configuration from `RAYGUN_SINK_*` variables.
    ///
    /// **Returns**
    /// - `Err(SinkError::InvalidConfiguration)` if the API key variable is
    ///   missing or blank.
    pub fn from_env() -> Result<Self, SinkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SinkError> {
        let api_key = lookup(RAYGUN_SINK_API_KEY_ENV).unwrap_or_default();

        let mut config = SinkConfig::new(api_key);
        config.endpoint = lookup(RAYGUN_SINK_ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        config.tags = lookup(RAYGUN_SINK_TAGS_ENV).map(|v| split_list(&v)).unwrap_or_default();
        config.ignored_form_field_names = lookup(RAYGUN_SINK_IGNORED_FORM_FIELDS_ENV)
            .map(|v| split_list(&v))
            .unwrap_or_default();
        config.wrapper_exceptions = lookup(RAYGUN_SINK_WRAPPER_EXCEPTIONS_ENV)
            .map(|v| split_list(&v))
            .unwrap_or_default();

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_lists_and_endpoint() {
        let config = SinkConfig::from_lookup(lookup_from(&[
            (RAYGUN_SINK_API_KEY_ENV, "abc"),
            (RAYGUN_SINK_ENDPOINT_ENV, "http://localhost:8080/entries"),
            (RAYGUN_SINK_TAGS_ENV, "api, eu-west ,,"),
            (RAYGUN_SINK_IGNORED_FORM_FIELDS_ENV, "password,card"),
        ]))
        .unwrap();

        assert_eq!(config.application_key, "abc");
        assert_eq!(config.endpoint, "http://localhost:8080/entries");
        assert_eq!(config.tags, vec!["api", "eu-west"]);
        assert_eq!(config.ignored_form_field_names, vec!["password", "card"]);
        assert!(config.wrapper_exceptions.is_empty());
    }

    #[test]
    fn missing_key_is_invalid() {
        let err = SinkConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, SinkError::InvalidConfiguration(_)));
    }

    #[test]
    fn endpoint_falls_back_to_public_api() {
        let config = SinkConfig::from_lookup(lookup_from(&[(RAYGUN_SINK_API_KEY_ENV, "abc")])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.tags.is_empty());
    }
}
