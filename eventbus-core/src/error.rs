//! 事件总线统一错误定义
//!
//! 覆盖注册/发现、投递与取消、队列与主线程调度、默认实例等最小必要集合；
//! 处理器内部的失败统一收敛为 `HandlerFailure`，由异常隔离边界决定记录、
//! 重抛或转为 `SubscriberExceptionEvent`。
//!
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventBusError {
    // --- 注册/发现 ---
    #[error("subscriber already registered: subscriber={subscriber}, event={event}")]
    DuplicateSubscription {
        subscriber: &'static str,
        event: &'static str,
    },
    #[error("subscriber {subscriber} and its parents have no handler methods")]
    NoHandlersFound { subscriber: &'static str },
    #[error("invalid handler method: handler={handler}, reason={reason}")]
    InvalidHandlerSignature { handler: String, reason: String },
    #[error("discovery error: {reason}")]
    Discovery { reason: String },

    // --- 投递 ---
    #[error("invalid cancel: {reason}")]
    InvalidCancel { reason: &'static str },
    #[error("invoking subscriber failed: handler={handler}, event={event}: {source}")]
    HandlerInvocation {
        handler: String,
        event: &'static str,
        #[source]
        source: HandlerFailure,
    },

    // --- 队列/调度 ---
    #[error("queue misuse: {reason}")]
    QueueMisuse { reason: &'static str },
    #[error("poster unavailable: {reason}")]
    PosterUnavailable { reason: String },

    // --- 默认实例 ---
    #[error("default event bus already installed")]
    DefaultAlreadyInstalled,
}

/// 统一 Result 类型别名
pub type EventBusResult<T> = Result<T, EventBusError>;

/// 处理器失败
/// - `Error`：处理器返回的错误
/// - `Panic`：处理器执行期间发生 panic，保留其消息
///
/// 可克隆，以便随 `SubscriberExceptionEvent` 一并投递。
#[derive(Debug, Clone, Error)]
pub enum HandlerFailure {
    #[error("{0:#}")]
    Error(Arc<anyhow::Error>),
    #[error("handler panicked: {0}")]
    Panic(Arc<str>),
}

impl HandlerFailure {
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => Arc::from(message.as_str()),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Arc::from(*message),
                Err(_) => Arc::from("non-string panic payload"),
            },
        };
        Self::Panic(message)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// 取回处理器返回的具体错误类型（沿 anyhow 的上下文链查找）
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Error(error) => error.downcast_ref::<E>(),
            Self::Panic(_) => None,
        }
    }
}

impl From<anyhow::Error> for HandlerFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::Error(Arc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn panic_payloads_keep_their_message() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 42)).unwrap_err();
        let failure = HandlerFailure::from_panic(payload);
        assert!(failure.is_panic());
        assert_eq!(failure.to_string(), "handler panicked: boom 42");

        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(
            HandlerFailure::from_panic(payload).to_string(),
            "handler panicked: static"
        );
    }

    #[test]
    fn error_failures_expose_the_original_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("disk full")]
        struct DiskFull;

        let failure = HandlerFailure::from(anyhow::Error::new(DiskFull).context("saving draft"));
        assert!(failure.downcast_ref::<DiskFull>().is_some());
        assert_eq!(failure.to_string(), "saving draft: disk full");
    }
}
