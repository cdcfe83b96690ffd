//! 宿主主线程支持
//!
//! - `MainThreadSupport`：宿主提供“主线程”判定与主线程投递器；
//! - `MainLoop`：单线程主循环的最小能力（判定当前线程、调度任务）；
//! - `MainThreadPoster`：基于 `MainLoop` 的有序投递器，单次排空超过时间预算即让出并重新调度；
//! - `LoopMainThreadSupport`：把任意 `MainLoop` 适配为 `MainThreadSupport`；
//! - `ThreadMainLoop`：独立线程上的主循环，供非 GUI 宿主与测试使用。
//!
//! 未配置主线程支持时，总线把所有线程都视为主线程。
//!
use super::Poster;
use super::pending::{DEFAULT_POOL_LIMIT, PendingPostQueue};
use crate::bus::EventBus;
use crate::error::{EventBusError, EventBusResult};
use crate::event::EventRef;
use crate::executor::Job;
use crate::logger::Level;
use crate::subscription::Subscription;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// 默认单次排空时间预算
pub const DEFAULT_DRAIN_BUDGET: Duration = Duration::from_millis(10);

pub trait MainThreadSupport: Send + Sync {
    fn is_main_thread(&self) -> bool;

    fn create_poster(&self) -> Arc<dyn Poster>;
}

pub trait MainLoop: Send + Sync + 'static {
    fn is_current(&self) -> bool;

    /// 调度任务到主循环；主循环已停止时返回 false
    fn schedule(&self, job: Job) -> bool;
}

/// 主线程有序投递器
pub struct MainThreadPoster<L: MainLoop> {
    inner: Arc<Drain<L>>,
}

struct Drain<L> {
    main_loop: Arc<L>,
    queue: PendingPostQueue,
    budget: Duration,
}

impl<L: MainLoop> MainThreadPoster<L> {
    pub fn new(main_loop: Arc<L>, budget: Duration) -> Self {
        Self {
            inner: Arc::new(Drain {
                main_loop,
                queue: PendingPostQueue::new(DEFAULT_POOL_LIMIT),
                budget,
            }),
        }
    }

    /// 尚未投递的数量
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }
}

impl<L: MainLoop> Poster for MainThreadPoster<L> {
    fn enqueue(
        &self,
        bus: &EventBus,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) -> EventBusResult<()> {
        if self.inner.queue.enqueue_and_claim(subscription, event) && !self.inner.schedule(bus) {
            self.inner.queue.release_claim();
            return Err(EventBusError::PosterUnavailable {
                reason: "could not schedule a drain on the main loop".to_string(),
            });
        }
        Ok(())
    }
}

impl<L: MainLoop> Drain<L> {
    fn schedule(self: &Arc<Self>, bus: &EventBus) -> bool {
        let drain = self.clone();
        let bus = bus.clone();
        self.main_loop.schedule(Box::new(move || drain.run(&bus)))
    }

    fn run(self: &Arc<Self>, bus: &EventBus) {
        let started = Instant::now();
        loop {
            let Some(post) = self.queue.poll_or_release() else {
                return;
            };
            if let Err(err) = bus.invoke_pending(post) {
                bus.logger()
                    .log(Level::ERROR, "main thread delivery failed", Some(&err));
            }
            if started.elapsed() >= self.budget {
                // 让出主循环，占用标记保持不变
                if !self.schedule(bus) {
                    self.queue.release_claim();
                    bus.logger().log(
                        Level::ERROR,
                        "could not reschedule the main thread drain",
                        None,
                    );
                }
                return;
            }
        }
    }
}

/// 把 `MainLoop` 适配为 `MainThreadSupport`
pub struct LoopMainThreadSupport<L: MainLoop> {
    main_loop: Arc<L>,
    budget: Duration,
}

impl<L: MainLoop> LoopMainThreadSupport<L> {
    pub fn new(main_loop: Arc<L>) -> Self {
        Self::with_budget(main_loop, DEFAULT_DRAIN_BUDGET)
    }

    pub fn with_budget(main_loop: Arc<L>, budget: Duration) -> Self {
        Self { main_loop, budget }
    }
}

impl<L: MainLoop> MainThreadSupport for LoopMainThreadSupport<L> {
    fn is_main_thread(&self) -> bool {
        self.main_loop.is_current()
    }

    fn create_poster(&self) -> Arc<dyn Poster> {
        Arc::new(MainThreadPoster::new(self.main_loop.clone(), self.budget))
    }
}

/// 独立线程上的主循环
///
/// 所有句柄释放后线程在处理完剩余任务时退出。
pub struct ThreadMainLoop {
    jobs: mpsc::UnboundedSender<Job>,
    thread_id: ThreadId,
}

impl ThreadMainLoop {
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Arc<Self>> {
        let (jobs, mut receiver) = mpsc::unbounded_channel::<Job>();
        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            while let Some(job) = receiver.blocking_recv() {
                job();
            }
        })?;
        Ok(Arc::new(Self {
            jobs,
            thread_id: handle.thread().id(),
        }))
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl MainLoop for ThreadMainLoop {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn schedule(&self, job: Job) -> bool {
        self.jobs.send(job).is_ok()
    }
}
