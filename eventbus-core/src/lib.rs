//! 进程内事件总线（eventbus-core）
//!
//! 订阅者为事件类型登记处理器，生产者投递事件实例，总线把每个事件分发给所有匹配的处理器：
//! - 注册表（`registry`）：事件类型 → 按优先级排序的订阅，订阅者 → 已订阅类型；
//! - 分发（`bus`）：按线程划分的投递状态、可重入投递、取消、异常隔离；
//! - 线程模式（`thread_mode`、`poster`）：同步、主线程、主线程有序、后台串行、异步；
//! - 事件层级（`event`、`hierarchy`）：按接口/父类型匹配订阅；
//! - 处理器发现（`meta`、`finder`）：本地处理器表与外部索引，沿父订阅者链去重并缓存；
//! - 粘性事件（`sticky`）：每个类型保留最近一次实例，供后注册的粘性处理器补发。
//!
//! 总线不依赖具体的主线程实现、日志输出或执行器，均通过 trait 注入，
//! 未注入主线程支持时也能完整工作。
//!
//! 典型用法：
//! 1. 为事件类型实现 `Event`（可用 `eventbus-macros` 的 `#[derive(Event)]`）；
//! 2. 为订阅者实现 `Subscriber` 声明处理器（或使用 `#[subscriber]`）；
//! 3. `EventBus::register` 注册 `Arc` 持有的订阅者，`EventBus::post` 投递事件。
//!
pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod events;
pub mod executor;
pub mod hierarchy;
pub mod logger;
pub mod meta;
pub mod poster;
pub mod subscription;
pub mod thread_mode;

mod finder;
mod posting;
mod registry;
mod sticky;

pub use bus::EventBus;
pub use config::EventBusConfig;
pub use error::{EventBusError, EventBusResult, HandlerFailure};
pub use event::{Event, EventAny, EventRef, EventType, Supertype, SupertypeKind};
pub use events::{NoSubscriberEvent, SubscriberExceptionEvent};
pub use executor::{Executor, Job, ThreadExecutor, TokioExecutor};
pub use logger::{Level, Logger, TracingLogger};
pub use meta::{
    HandlerMethod, HandlerOutput, Handlers, ParentLink, SimpleSubscriberIndex,
    SimpleSubscriberInfo, Subscriber, SubscriberAny, SubscriberClass, SubscriberIndex,
    SubscriberInfo,
};
pub use poster::{
    LoopMainThreadSupport, MainLoop, MainThreadPoster, MainThreadSupport, Poster, ThreadMainLoop,
};
pub use subscription::{SubscriberId, Subscription};
pub use thread_mode::ThreadMode;

// 允许在本 crate 内部通过 ::eventbus_core 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::eventbus_core 路径。
extern crate self as eventbus_core;
