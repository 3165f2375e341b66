use chrono::{DateTime, FixedOffset, Local};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use crate::template::{self, FormatProvider};

/// Severity of a [`LogEvent`].
///
/// The `Display` form is what ends up as the level tag on every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Information,
            tracing::Level::WARN => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }
}

/// Leaf value of a structured property.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    /// A value only known through its textual form (e.g. a `Debug` rendering).
    Other(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::String(v) | Scalar::Other(v) => f.write_str(v),
        }
    }
}

/// Structured value attached to a [`LogEvent`] under a property name.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Sequence(Vec<PropertyValue>),
    Dictionary(Vec<(Scalar, PropertyValue)>),
    Structure {
        type_tag: Option<String>,
        fields: Vec<(String, PropertyValue)>,
    },
}

impl PropertyValue {
    pub fn null() -> Self {
        PropertyValue::Scalar(Scalar::Null)
    }
}

impl From<Scalar> for PropertyValue {
    fn from(value: Scalar) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Scalar(Scalar::String(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Scalar(Scalar::I64(value.into()))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Scalar(Scalar::I64(value))
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Scalar(Scalar::U64(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Scalar(Scalar::F64(value))
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Error captured on a [`LogEvent`], with its chain of causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    pub inner: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            inner: None,
        }
    }

    pub fn with_inner(mut self, inner: ExceptionInfo) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Capture an error and every `source()` below it.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let inner = error.source().map(|source| Box::new(ExceptionInfo::from_error(source)));
        ExceptionInfo {
            type_name: parse_type_from_debug(&format!("{:?}", error)).to_string(),
            message: error.to_string(),
            inner,
        }
    }
}

/// `Debug` prefixes of `std::io::Error`, which prints its internal repr
/// instead of its own name.
const IO_ERROR_DEBUG_PREFIXES: [&str; 3] = ["Os { code:", "Custom { kind:", "Kind("];

/// Best-effort type name from a `Debug` rendering: `ParseIntError { .. }`
/// yields `ParseIntError`, `std::io::Error` yields `io::Error`. Falls back
/// to `"Error"`.
pub fn parse_type_from_debug(debug: &str) -> &str {
    if IO_ERROR_DEBUG_PREFIXES.iter().any(|prefix| debug.starts_with(prefix)) {
        return "io::Error";
    }
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(debug.len());
    let name = debug[..end].trim_end_matches(':');
    if name.is_empty() {
        "Error"
    } else {
        name
    }
}

/// Structured log event handed to the sink.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub level: LogLevel,
    pub message_template: String,
    pub exception: Option<ExceptionInfo>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl LogEvent {
    /// New event stamped with the local time and no properties.
    pub fn new(level: LogLevel, message_template: impl Into<String>) -> Self {
        LogEvent {
            timestamp: Local::now().fixed_offset(),
            level,
            message_template: message_template.into(),
            exception: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Render the message template against the event's properties.
    pub fn render_message(&self, provider: Option<&dyn FormatProvider>) -> String {
        template::render(&self.message_template, &self.properties, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer {
        source: std::num::ParseIntError,
    }

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("could not read order id")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.source)
        }
    }

    #[test]
    fn level_display_names() {
        assert_eq!(LogLevel::Error.to_string(), "Error");
        assert_eq!(LogLevel::from(tracing::Level::WARN), LogLevel::Warning);
        assert_eq!(LogLevel::from(tracing::Level::INFO).to_string(), "Information");
    }

    #[test]
    fn type_name_from_debug() {
        assert_eq!(parse_type_from_debug("ParseIntError { kind: InvalidDigit }"), "ParseIntError");
        assert_eq!(parse_type_from_debug("io::Error(Os)"), "io::Error");
        assert_eq!(parse_type_from_debug("\"plain message\""), "Error");
    }

    #[test]
    fn io_errors_are_named_io_error() {
        let err = std::fs::File::open("/nonexistent").unwrap_err();
        assert_eq!(ExceptionInfo::from_error(&err).type_name, "io::Error");

        let custom = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert_eq!(ExceptionInfo::from_error(&custom).type_name, "io::Error");

        let kind_only = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(parse_type_from_debug(&format!("{:?}", kind_only)), "io::Error");
    }

    #[test]
    fn exception_chain_follows_sources() {
        let source = "x".parse::<u32>().unwrap_err();
        let err = Outer { source };
        let info = ExceptionInfo::from_error(&err);

        assert_eq!(info.type_name, "Outer");
        assert_eq!(info.message, "could not read order id");
        let inner = info.inner.expect("inner cause");
        assert_eq!(inner.type_name, "ParseIntError");
        assert!(inner.inner.is_none());
    }
}
