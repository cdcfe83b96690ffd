//! 日志输出能力
//!
//! 总线只依赖 `Logger`，不关心具体输出；默认实现 `TracingLogger` 经由 `tracing` 输出，
//! target 为 `eventbus`。
//!
use std::error::Error as StdError;

pub use tracing::Level;

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str, cause: Option<&(dyn StdError + 'static)>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        let cause = cause.map(|cause| cause.to_string());
        let cause = cause.as_deref();
        match level {
            Level::ERROR => tracing::error!(target: "eventbus", cause, "{message}"),
            Level::WARN => tracing::warn!(target: "eventbus", cause, "{message}"),
            Level::INFO => tracing::info!(target: "eventbus", cause, "{message}"),
            Level::DEBUG => tracing::debug!(target: "eventbus", cause, "{message}"),
            _ => tracing::trace!(target: "eventbus", cause, "{message}"),
        }
    }
}
