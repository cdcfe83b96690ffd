//! 总线配置（EventBusConfig）
//!
//! 构造一次，交给 `EventBus::with_config` 后不可变。
//! 默认值：日志与通知事件全部开启、不重抛处理器错误、启用事件继承、宽松校验、使用索引。
//!
use crate::executor::Executor;
use crate::logger::Logger;
use crate::meta::SubscriberIndex;
use crate::poster::{DEFAULT_POOL_LIMIT, MainThreadSupport};
use bon::Builder;
use std::sync::Arc;
use std::time::Duration;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::event_bus_config_builder::{IsUnset, SetSubscriberIndexes, State as BuilderState};

#[derive(Builder, Clone)]
pub struct EventBusConfig {
    /// 记录处理器抛出的错误
    #[builder(default = true)]
    pub(crate) log_subscriber_exceptions: bool,
    /// 记录无订阅者的事件
    #[builder(default = true)]
    pub(crate) log_no_subscriber_messages: bool,
    /// 处理器出错时投递 `SubscriberExceptionEvent`
    #[builder(default = true)]
    pub(crate) send_subscriber_exception_event: bool,
    /// 无订阅者时投递 `NoSubscriberEvent`
    #[builder(default = true)]
    pub(crate) send_no_subscriber_event: bool,
    /// 处理器出错时把错误返回给 `post` 的调用方
    #[builder(default)]
    pub(crate) throw_subscriber_exception: bool,
    /// 按事件类型层级匹配订阅
    #[builder(default = true)]
    pub(crate) event_inheritance: bool,
    /// 非法处理器描述直接失败而非跳过
    #[builder(default)]
    pub(crate) strict_method_verification: bool,
    /// 忽略外部索引，只使用本地处理器表
    #[builder(default)]
    pub(crate) ignore_generated_index: bool,
    /// 后台/异步队列保留的空闲槽位上限
    #[builder(default = DEFAULT_POOL_LIMIT)]
    pub(crate) pending_post_pool_limit: usize,
    /// 后台工作线程空闲等待时长
    #[builder(default = Duration::from_secs(1))]
    pub(crate) background_poll_timeout: Duration,
    pub(crate) executor: Option<Arc<dyn Executor>>,
    pub(crate) logger: Option<Arc<dyn Logger>>,
    pub(crate) main_thread_support: Option<Arc<dyn MainThreadSupport>>,
    #[builder(default)]
    pub(crate) subscriber_indexes: Vec<Arc<dyn SubscriberIndex>>,
}

impl<S: BuilderState> EventBusConfigBuilder<S> {
    /// 仅使用单个索引
    pub fn index(
        self,
        index: impl SubscriberIndex + 'static,
    ) -> EventBusConfigBuilder<SetSubscriberIndexes<S>>
    where
        <S as BuilderState>::SubscriberIndexes: IsUnset,
    {
        let index: Arc<dyn SubscriberIndex> = Arc::new(index);
        self.subscriber_indexes(vec![index])
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
