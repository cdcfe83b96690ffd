//! 失败事件
//!
//! `ThrowableFailureEvent` 包装任务返回的错误，`suppress_error_ui` 提示接收方无需展示错误界面。
//! 执行作用域用于区分失败来自哪个调用方（例如某个界面），由 `AsyncExecutor` 在投递前写入。
//!
use eventbus_core::Event;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 执行作用域：任意共享值
pub type ExecutionScope = Arc<dyn Any + Send + Sync>;

pub trait HasExecutionScope {
    fn execution_scope(&self) -> Option<&ExecutionScope>;

    fn set_execution_scope(&mut self, scope: Option<ExecutionScope>);
}

/// 可由 `AsyncExecutor` 构造的失败事件
pub trait FailureEvent: Event + HasExecutionScope + Sized {
    fn from_error(error: anyhow::Error) -> Self;
}

/// 默认失败事件
#[derive(Clone)]
pub struct ThrowableFailureEvent {
    error: Arc<anyhow::Error>,
    suppress_error_ui: bool,
    execution_scope: Option<ExecutionScope>,
}

impl ThrowableFailureEvent {
    pub fn new(error: anyhow::Error) -> Self {
        Self::with_suppress_error_ui(error, false)
    }

    pub fn with_suppress_error_ui(error: anyhow::Error, suppress_error_ui: bool) -> Self {
        Self {
            error: Arc::new(error),
            suppress_error_ui,
            execution_scope: None,
        }
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn suppress_error_ui(&self) -> bool {
        self.suppress_error_ui
    }
}

impl fmt::Debug for ThrowableFailureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrowableFailureEvent")
            .field("error", &format_args!("{:#}", self.error))
            .field("suppress_error_ui", &self.suppress_error_ui)
            .field("has_scope", &self.execution_scope.is_some())
            .finish()
    }
}

impl Event for ThrowableFailureEvent {}

impl HasExecutionScope for ThrowableFailureEvent {
    fn execution_scope(&self) -> Option<&ExecutionScope> {
        self.execution_scope.as_ref()
    }

    fn set_execution_scope(&mut self, scope: Option<ExecutionScope>) {
        self.execution_scope = scope;
    }
}

impl FailureEvent for ThrowableFailureEvent {
    fn from_error(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}
