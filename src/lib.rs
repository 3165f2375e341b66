pub mod error;
pub mod record;
pub mod template;
pub mod formatter;
pub mod report;
pub mod request;
pub mod grouping;
pub mod transport;
pub mod client;
pub mod config;
pub mod sink;
pub mod layer;

#[cfg(feature = "http")]
pub mod http;

pub mod env;
pub mod init;
pub mod noop_transport;

pub use config::SinkConfig;
pub use error::SinkError;
pub use grouping::{GroupingContext, MessageGroup};
pub use record::{ExceptionInfo, LogEvent, LogLevel, PropertyValue, Scalar};
pub use report::ErrorReport;
pub use sink::EventSink;
