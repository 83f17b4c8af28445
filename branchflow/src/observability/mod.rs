//! Observability utilities.

mod logger;
mod tracing;

#[cfg(test)]
pub use logger::MockFlowLogger;
pub use logger::{
    format_error, CollectingLogger, FlowLogger, LogLevel, LogRecord, NoOpLogger, TracingLogger,
};
pub use tracing::{init_tracing, LogFormat, SpanTimer};
