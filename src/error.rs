use std::error::Error;

/// Boxed error used at the transport and observer seams.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors produced while building, wiring or delivering reports.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The sink cannot be constructed from the given configuration.
    #[error("invalid sink configuration: {0}")]
    InvalidConfiguration(String),

    /// The transport failed to deliver a report (network, HTTP status, ...).
    #[error("report transport failed: {0}")]
    Transport(#[source] BoxError),

    /// A grouping observer returned an error while the report was being sent.
    #[error("grouping observer failed: {0}")]
    Observer(#[source] BoxError),

    /// The global `tracing` subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
