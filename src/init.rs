use crate::error::SinkError;
use crate::layer::ReportLayer;
use crate::sink::EventSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Конфигурация слоя отправки отчётов.
///
/// Управляет размером внутреннего буфера, минимальным уровнем событий,
/// которые превращаются в отчёты, а также тем, нужно ли дополнительно
/// печатать логи в консоль через `fmt`‑слой.
///
/// **Поля**
/// - `channel_buffer`: максимальное число [`ErrorReport`](crate::report::ErrorReport)
///   в очереди до начала дропа новых отчётов.
/// - `min_level`: минимальный уровень события, по умолчанию `ERROR`.
/// - `enable_stdout`: если `true`, поверх `ReportLayer` добавляется
///   `tracing_subscriber::fmt::Layer` и события печатаются в консоль.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub min_level: Level,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            min_level: Level::ERROR,
            enable_stdout: true,
        }
    }
}

/// Initialize global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: [`EventSink`] that builds and delivers the reports.
/// - `config`: [`LayerConfig`] controlling buffering and filtering.
///
/// **Returns**
/// - the handle of the background delivery task.
/// - `Err(SinkError::Subscriber)` if a global subscriber is already set.
///
/// Must be called inside a Tokio runtime.
pub fn init_tracing_with_config(sink: Arc<EventSink>, config: LayerConfig) -> Result<JoinHandle<()>, SinkError> {
    let (layer, handle) = ReportLayer::with_min_level(sink, config.channel_buffer, config.min_level);

    // Слой отчётов подключается всегда; `fmt`‑слой только при
    // `enable_stdout = true`. Типы subscriber'ов различаются, поэтому две
    // ветки.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`]: `ERROR` events become reports and everything
/// is echoed to stdout.
pub fn init_tracing(sink: Arc<EventSink>) -> Result<JoinHandle<()>, SinkError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
