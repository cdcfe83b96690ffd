//! 线程模式投递器
//!
//! - `BackgroundPoster`：唯一后台工作线程，串行 FIFO；
//! - `AsyncPoster`：每次投递一个独立任务，无序；
//! - `MainThreadPoster`：绑定宿主主循环，按时间预算分批排空并让出。
//!
//! `Posting` 模式直接在投递线程调用，没有对应的投递器。
//!
mod async_poster;
mod background;
pub mod main_thread;
pub(crate) mod pending;

use crate::bus::EventBus;
use crate::error::EventBusResult;
use crate::event::EventRef;
use crate::subscription::Subscription;
use std::sync::Arc;

pub(crate) use async_poster::AsyncPoster;
pub(crate) use background::BackgroundPoster;
pub use main_thread::{
    LoopMainThreadSupport, MainLoop, MainThreadPoster, MainThreadSupport, ThreadMainLoop,
};
pub use pending::DEFAULT_POOL_LIMIT;

/// 投递器：`enqueue` 不阻塞调用方，处理器稍后在对应上下文中执行
pub trait Poster: Send + Sync {
    fn enqueue(
        &self,
        bus: &EventBus,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) -> EventBusResult<()>;
}
