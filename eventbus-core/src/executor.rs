//! 执行器：后台与异步投递所用的任务执行能力
//!
//! - `ThreadExecutor`：每个任务一个具名系统线程（默认，弹性无上限）；
//! - `TokioExecutor`：交给 tokio 运行时的阻塞线程池执行。
//!
//! 调用方需保证执行器不会永久饥饿，后台与异步投递的活性依赖于此。
//!
use std::sync::Arc;
use std::thread;

/// 执行单元
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

impl<T: Executor + ?Sized> Executor for Arc<T> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

/// 每个任务一个具名线程
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    thread_name: String,
}

impl ThreadExecutor {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("eventbus-worker")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(job);
        if let Err(err) = spawned {
            tracing::error!(target: "eventbus", error = %err, "failed to spawn executor thread");
        }
    }
}

/// 在 tokio 运行时的阻塞线程池上执行
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// 绑定到当前所在的运行时
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        tokio::runtime::Handle::try_current().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // 处理器可能阻塞，不能占用异步工作线程
        drop(self.handle.spawn_blocking(job));
    }
}
