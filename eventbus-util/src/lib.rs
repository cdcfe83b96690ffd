//! 事件总线辅助工具（eventbus-util）
//!
//! - `AsyncExecutor`：在执行器或 tokio 任务中运行可失败的任务，失败时向总线投递失败事件；
//! - `ThrowableFailureEvent`：默认的失败事件，可携带执行作用域；
//! - `ErrorMapping`：沿错误的 cause 链把错误类型映射为消息/资源标识。
//!
pub mod async_executor;
pub mod error;
pub mod error_mapping;
pub mod failure_event;

pub use async_executor::{AsyncExecutor, FailureFactory};
pub use error::{UtilError, UtilResult};
pub use error_mapping::ErrorMapping;
pub use failure_event::{ExecutionScope, FailureEvent, HasExecutionScope, ThrowableFailureEvent};
