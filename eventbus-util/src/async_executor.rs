//! 异步任务执行器（AsyncExecutor）
//!
//! 在执行器线程（或 tokio 任务）中运行可失败的任务；任务返回错误时，
//! 由 `FailureFactory` 构造失败事件，附加执行作用域后投递到总线。
//!
//! 默认值：
//! - 总线：`EventBus::global()`；
//! - 执行器：每个任务一个具名线程；
//! - 失败事件：`ThrowableFailureEvent`。
//!
use crate::error::UtilResult;
use crate::failure_event::{ExecutionScope, FailureEvent, ThrowableFailureEvent};
use bon::Builder;
use eventbus_core::{EventBus, EventRef, Executor, ThreadExecutor};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// 失败事件构造器
#[derive(Clone, Copy)]
pub struct FailureFactory {
    event_type: &'static str,
    make: fn(anyhow::Error, Option<ExecutionScope>) -> EventRef,
}

impl FailureFactory {
    pub fn of<F: FailureEvent>() -> Self {
        Self {
            event_type: std::any::type_name::<F>(),
            make: make_failure::<F>,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    fn make(&self, error: anyhow::Error, scope: Option<ExecutionScope>) -> EventRef {
        (self.make)(error, scope)
    }
}

impl Default for FailureFactory {
    fn default() -> Self {
        Self::of::<ThrowableFailureEvent>()
    }
}

impl fmt::Debug for FailureFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailureFactory({})", self.event_type)
    }
}

fn make_failure<F: FailureEvent>(error: anyhow::Error, scope: Option<ExecutionScope>) -> EventRef {
    let mut event = F::from_error(error);
    event.set_execution_scope(scope);
    EventRef::new(event)
}

fn default_executor() -> Arc<dyn Executor> {
    Arc::new(ThreadExecutor::new("eventbus-async-executor"))
}

#[derive(Builder, Clone)]
pub struct AsyncExecutor {
    #[builder(default = EventBus::global().clone())]
    bus: EventBus,
    #[builder(default = default_executor())]
    executor: Arc<dyn Executor>,
    #[builder(default)]
    failure_factory: FailureFactory,
    /// 附加到失败事件上的执行作用域
    scope: Option<ExecutionScope>,
}

impl AsyncExecutor {
    /// 全部使用默认值
    pub fn create() -> Self {
        Self::builder().build()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// 在执行器上运行任务
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let reporter = self.reporter();
        self.executor.execute(Box::new(move || {
            if let Err(error) = job() {
                reporter.report(error);
            }
        }));
    }

    /// 在当前 tokio 运行时上运行异步任务
    pub fn spawn<Fut>(&self, future: Fut) -> UtilResult<JoinHandle<()>>
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = Handle::try_current()?;
        Ok(self.spawn_on(&handle, future))
    }

    pub fn spawn_on<Fut>(&self, handle: &Handle, future: Fut) -> JoinHandle<()>
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let reporter = self.reporter();
        handle.spawn(async move {
            if let Err(error) = future.await {
                reporter.report(error);
            }
        })
    }

    fn reporter(&self) -> Reporter {
        Reporter {
            bus: self.bus.clone(),
            failure_factory: self.failure_factory,
            scope: self.scope.clone(),
        }
    }
}

impl fmt::Debug for AsyncExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncExecutor")
            .field("bus", &self.bus)
            .field("failure_factory", &self.failure_factory)
            .field("has_scope", &self.scope.is_some())
            .finish()
    }
}

struct Reporter {
    bus: EventBus,
    failure_factory: FailureFactory,
    scope: Option<ExecutionScope>,
}

impl Reporter {
    fn report(self, error: anyhow::Error) {
        tracing::debug!(
            target: "eventbus",
            failure_event = self.failure_factory.event_type(),
            "async job failed: {error:#}"
        );
        let event = self.failure_factory.make(error, self.scope);
        if let Err(err) = self.bus.post_event(event) {
            tracing::error!(target: "eventbus", error = %err, "could not post failure event");
        }
    }
}
