//! 事件总线（EventBus）
//!
//! 负责注册/注销、按线程划分的投递状态、事件类型匹配、取消与异常隔离：
//! - 注册时经 `HandlerFinder` 得到处理器描述，在同一临界区内整体可见；
//! - 投递在调用线程上排队并按 FIFO 排空，处理器内的再次投递只入队，由最外层调用继续排空；
//! - 每个订阅按其线程模式直接调用或交给对应投递器；
//! - 处理器的错误与 panic 在 `invoke_subscriber` 处被隔离，按配置记录、重抛或转为通知事件。
//!
//! 任何锁都不会在执行处理器期间持有。
//!
use crate::config::EventBusConfig;
use crate::error::{EventBusError, EventBusResult, HandlerFailure};
use crate::event::{self, Event, EventRef, EventType};
use crate::events::{NoSubscriberEvent, SubscriberExceptionEvent};
use crate::executor::{Executor, ThreadExecutor};
use crate::finder::HandlerFinder;
use crate::hierarchy;
use crate::logger::{Level, Logger, TracingLogger};
use crate::meta::{SubscriberAny, SubscriberClass, Subscriber};
use crate::posting::{PostingGuard, PostingStates, SharedPostingState};
use crate::poster::pending::PendingPost;
use crate::poster::{AsyncPoster, BackgroundPoster, MainThreadSupport, Poster};
use crate::registry::SubscriptionRegistry;
use crate::sticky::StickyEvents;
use crate::subscription::{SubscriberId, Subscription};
use crate::thread_mode::ThreadMode;
use parking_lot::RwLock;
use std::any::TypeId;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<EventBus> = OnceLock::new();

const NOT_POSTING_THREAD: &str =
    "this method may only be called from inside event handling methods on the posting thread";

/// 事件总线句柄，克隆后共享同一实例
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

struct Inner {
    registry: RwLock<SubscriptionRegistry>,
    sticky: StickyEvents,
    posting: PostingStates,
    finder: HandlerFinder,
    main_thread_support: Option<Arc<dyn MainThreadSupport>>,
    main_poster: Option<Arc<dyn Poster>>,
    background_poster: BackgroundPoster,
    async_poster: AsyncPoster,
    executor: Arc<dyn Executor>,
    logger: Arc<dyn Logger>,
    log_subscriber_exceptions: bool,
    log_no_subscriber_messages: bool,
    send_subscriber_exception_event: bool,
    send_no_subscriber_event: bool,
    throw_subscriber_exception: bool,
    event_inheritance: bool,
}

/// 单个事件类型的投递结果
enum Delivery {
    NoSubscribers,
    Delivered,
    Canceled,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let main_poster = config
            .main_thread_support
            .as_ref()
            .map(|support| support.create_poster());

        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(SubscriptionRegistry::default()),
                sticky: StickyEvents::default(),
                posting: PostingStates::default(),
                finder: HandlerFinder::new(
                    config.subscriber_indexes,
                    config.strict_method_verification,
                    config.ignore_generated_index,
                ),
                main_thread_support: config.main_thread_support,
                main_poster,
                background_poster: BackgroundPoster::new(
                    config.pending_post_pool_limit,
                    config.background_poll_timeout,
                ),
                async_poster: AsyncPoster::new(config.pending_post_pool_limit),
                executor: config
                    .executor
                    .unwrap_or_else(|| Arc::new(ThreadExecutor::default())),
                logger: config.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
                log_subscriber_exceptions: config.log_subscriber_exceptions,
                log_no_subscriber_messages: config.log_no_subscriber_messages,
                send_subscriber_exception_event: config.send_subscriber_exception_event,
                send_no_subscriber_event: config.send_no_subscriber_event,
                throw_subscriber_exception: config.throw_subscriber_exception,
                event_inheritance: config.event_inheritance,
            }),
        }
    }

    /// 进程内共享的默认实例，首次访问时以默认配置创建
    pub fn global() -> &'static EventBus {
        GLOBAL.get_or_init(EventBus::new)
    }

    /// 以指定配置安装默认实例；已存在时失败
    pub fn install_global(config: EventBusConfig) -> EventBusResult<&'static EventBus> {
        let mut installed = false;
        let bus = GLOBAL.get_or_init(|| {
            installed = true;
            EventBus::with_config(config)
        });
        if installed {
            Ok(bus)
        } else {
            Err(EventBusError::DefaultAlreadyInstalled)
        }
    }

    // ---- 注册 ----

    /// 注册订阅者的全部处理器；粘性处理器随即收到已存储的匹配事件
    pub fn register<S: Subscriber>(&self, subscriber: &Arc<S>) -> EventBusResult<()> {
        let methods = self.inner.finder.find(SubscriberClass::of::<S>())?;
        let erased: Arc<SubscriberAny> = subscriber.clone();
        let subscriber_id = SubscriberId::of(&erased);

        let sticky = {
            let mut registry = self.inner.registry.write();
            if let Some(method) = methods
                .iter()
                .find(|method| registry.contains(subscriber_id, method))
            {
                return Err(EventBusError::DuplicateSubscription {
                    subscriber: std::any::type_name::<S>(),
                    event: method.event_type().name(),
                });
            }

            let mut sticky = Vec::new();
            for method in methods.iter() {
                let subscription = registry.subscribe(erased.clone(), method.clone())?;
                if method.is_sticky() {
                    sticky.push(subscription);
                }
            }
            sticky
        };

        // 注册表锁释放后再投递粘性事件
        if !sticky.is_empty() {
            let is_main_thread = self.is_main_thread();
            for subscription in sticky {
                let events = self
                    .inner
                    .sticky
                    .matching(subscription.event_type(), self.inner.event_inheritance);
                for event in events {
                    self.post_to_subscription(&subscription, event, is_main_thread)?;
                }
            }
        }
        Ok(())
    }

    /// 注销订阅者；未注册时仅记录日志并返回 false
    pub fn unregister<S: ?Sized>(&self, subscriber: &Arc<S>) -> bool {
        let removed = self
            .inner
            .registry
            .write()
            .unsubscribe_all(SubscriberId::of(subscriber));
        if !removed {
            self.inner.logger.log(
                Level::WARN,
                &format!(
                    "Subscriber to unregister was not registered before: {}",
                    std::any::type_name::<S>()
                ),
                None,
            );
        }
        removed
    }

    pub fn is_registered<S: ?Sized>(&self, subscriber: &Arc<S>) -> bool {
        self.inner
            .registry
            .read()
            .is_registered(SubscriberId::of(subscriber))
    }

    // ---- 投递 ----

    pub fn post<E: Event>(&self, event: E) -> EventBusResult<()> {
        self.post_event(EventRef::new(event))
    }

    /// 投递共享事件实例
    ///
    /// 处理器内的再次投递只入队，待当前事件投递结束后由最外层调用按 FIFO 继续处理。
    /// 开启 `throw_subscriber_exception` 时，首个处理器错误会中止本次排空，
    /// 本线程队列中剩余的事件被丢弃并记录警告。
    pub fn post_event(&self, event: EventRef) -> EventBusResult<()> {
        let is_main_thread = self.is_main_thread();
        let state = self.inner.posting.current();
        {
            let mut posting = state.lock();
            posting.queue.push_back(event);
            if posting.is_posting {
                return Ok(());
            }
            posting.is_posting = true;
            posting.is_main_thread = is_main_thread;
        }

        let _guard = PostingGuard::new(&self.inner.posting);
        let result = self.drain_posting_queue(&state);
        if let Err(err) = &result {
            let discarded = state.lock().queue.len();
            if discarded > 0 {
                self.inner.logger.log(
                    Level::WARN,
                    &format!("Discarding {discarded} queued event(s) after delivery failed"),
                    Some(err),
                );
            }
        }
        result
    }

    /// 先存储为粘性事件，再投递
    pub fn post_sticky<E: Event>(&self, event: E) -> EventBusResult<()> {
        self.post_sticky_event(EventRef::new(event))
    }

    pub fn post_sticky_event(&self, event: EventRef) -> EventBusResult<()> {
        self.inner.sticky.put(event.clone());
        self.post_event(event)
    }

    pub fn sticky_event<E: Event>(&self) -> Option<Arc<E>> {
        self.inner
            .sticky
            .get(TypeId::of::<E>())
            .and_then(|event| event.downcast::<E>())
    }

    pub fn remove_sticky_event<E: Event>(&self) -> Option<Arc<E>> {
        self.inner
            .sticky
            .remove(TypeId::of::<E>())
            .and_then(|event| event.downcast::<E>())
    }

    /// 仅当存储的正是该实例时移除
    pub fn remove_sticky_instance<E: Event>(&self, event: &Arc<E>) -> bool {
        self.inner
            .sticky
            .remove_instance(&EventRef::from_arc(event.clone()))
    }

    pub fn remove_all_sticky_events(&self) {
        self.inner.sticky.clear();
    }

    /// 取消当前事件向后续订阅的传递
    ///
    /// 仅允许 `Posting` 模式的处理器在投递线程上，针对其正在处理的事件调用。
    pub fn cancel_event_delivery<E: Event>(&self, event: &E) -> EventBusResult<()> {
        let Some(state) = self.inner.posting.get_current() else {
            return Err(EventBusError::InvalidCancel {
                reason: NOT_POSTING_THREAD,
            });
        };
        let mut posting = state.lock();
        if !posting.is_posting {
            return Err(EventBusError::InvalidCancel {
                reason: NOT_POSTING_THREAD,
            });
        }
        let (Some(current), Some(subscription)) = (&posting.event, &posting.subscription) else {
            return Err(EventBusError::InvalidCancel {
                reason: "no event is being delivered",
            });
        };

        let addr = event::addr_of(event);
        let is_current = addr == current.addr()
            || hierarchy::project(
                current.as_any(),
                current.event_type(),
                subscription.event_type().id(),
            )
            .is_some_and(|view| event::addr_of(view) == addr);
        if !is_current {
            return Err(EventBusError::InvalidCancel {
                reason: "only the currently handled event may be aborted",
            });
        }
        if subscription.handler_method().thread_mode() != ThreadMode::Posting {
            return Err(EventBusError::InvalidCancel {
                reason: "event handlers may only abort the incoming event in posting mode",
            });
        }

        posting.canceled = true;
        Ok(())
    }

    pub fn has_subscriber_for_event<E: Event>(&self) -> bool {
        self.has_subscriber_for_event_type(EventType::of::<E>())
    }

    pub fn has_subscriber_for_event_type(&self, event_type: EventType) -> bool {
        let registry = self.inner.registry.read();
        if self.inner.event_inheritance {
            hierarchy::resolve(event_type)
                .iter()
                .any(|resolved| registry.has_subscriptions(resolved.event_type().id()))
        } else {
            registry.has_subscriptions(event_type.id())
        }
    }

    /// 异常隔离边界：执行处理器，并按配置处理其错误或 panic
    ///
    /// 已注销（失活）的订阅直接跳过。自定义投递器应通过此方法执行处理器。
    pub fn invoke_subscriber(
        &self,
        subscription: &Subscription,
        event: &EventRef,
    ) -> EventBusResult<()> {
        if !subscription.is_active() {
            return Ok(());
        }
        let Some(view) = hierarchy::project(
            event.as_any(),
            event.event_type(),
            subscription.event_type().id(),
        ) else {
            return Err(EventBusError::QueueMisuse {
                reason: "event is not assignable to the subscribed event type",
            });
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscription.invoke(view)));
        let failure = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(error)) => HandlerFailure::from(error),
            Err(payload) => HandlerFailure::from_panic(payload),
        };
        self.handle_subscriber_exception(subscription, event, failure)
    }

    // ---- 其他 ----

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.inner.executor
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.inner.logger
    }

    /// 清空处理器发现缓存与事件类型层级缓存
    pub fn clear_caches(&self) {
        self.inner.finder.clear_cache();
        hierarchy::clear_cache();
    }

    /// 无主线程支持时所有线程都视为主线程
    pub(crate) fn is_main_thread(&self) -> bool {
        self.inner
            .main_thread_support
            .as_ref()
            .is_none_or(|support| support.is_main_thread())
    }

    pub(crate) fn invoke_pending(&self, post: PendingPost) -> EventBusResult<()> {
        let PendingPost {
            event,
            subscription,
        } = post;
        self.invoke_subscriber(&subscription, &event)
    }

    fn drain_posting_queue(&self, state: &SharedPostingState) -> EventBusResult<()> {
        loop {
            let (event, is_main_thread) = {
                let mut posting = state.lock();
                match posting.queue.pop_front() {
                    Some(event) => (event, posting.is_main_thread),
                    None => return Ok(()),
                }
            };
            self.post_single_event(event, is_main_thread, state)?;
        }
    }

    fn post_single_event(
        &self,
        event: EventRef,
        is_main_thread: bool,
        state: &SharedPostingState,
    ) -> EventBusResult<()> {
        let concrete = event.event_type();
        let event_types: Vec<TypeId> = if self.inner.event_inheritance {
            hierarchy::resolve(concrete)
                .iter()
                .map(|resolved| resolved.event_type().id())
                .collect()
        } else {
            vec![concrete.id()]
        };

        let mut found = false;
        for event_type in event_types {
            match self.post_single_event_for_type(&event, event_type, is_main_thread, state)? {
                Delivery::NoSubscribers => {}
                Delivery::Delivered => found = true,
                // 取消作用于整个事件，其余匹配类型不再投递
                Delivery::Canceled => {
                    found = true;
                    break;
                }
            }
        }

        if !found {
            self.handle_no_subscribers(event)?;
        }
        Ok(())
    }

    fn post_single_event_for_type(
        &self,
        event: &EventRef,
        event_type: TypeId,
        is_main_thread: bool,
        state: &SharedPostingState,
    ) -> EventBusResult<Delivery> {
        let subscriptions = self.inner.registry.read().lookup(event_type);
        let Some(subscriptions) = subscriptions.filter(|s| !s.is_empty()) else {
            return Ok(Delivery::NoSubscribers);
        };

        for subscription in subscriptions.iter() {
            state.lock().begin_delivery(event, subscription);
            let result = self.post_to_subscription(subscription, event.clone(), is_main_thread);
            let canceled = state.lock().end_delivery();
            result?;
            if canceled {
                return Ok(Delivery::Canceled);
            }
        }
        Ok(Delivery::Delivered)
    }

    fn post_to_subscription(
        &self,
        subscription: &Arc<Subscription>,
        event: EventRef,
        is_main_thread: bool,
    ) -> EventBusResult<()> {
        match subscription.handler_method().thread_mode() {
            ThreadMode::Posting => self.invoke_subscriber(subscription, &event),
            ThreadMode::Main => match &self.inner.main_poster {
                Some(poster) if !is_main_thread => {
                    poster.enqueue(self, subscription.clone(), event)
                }
                _ => self.invoke_subscriber(subscription, &event),
            },
            ThreadMode::MainOrdered => match &self.inner.main_poster {
                Some(poster) => poster.enqueue(self, subscription.clone(), event),
                // 无主线程支持时退化为立即执行，此时不保证与主线程的顺序
                None => self.invoke_subscriber(subscription, &event),
            },
            ThreadMode::Background => {
                if is_main_thread {
                    self.inner
                        .background_poster
                        .enqueue(self, subscription.clone(), event)
                } else {
                    self.invoke_subscriber(subscription, &event)
                }
            }
            ThreadMode::Async => self
                .inner
                .async_poster
                .enqueue(self, subscription.clone(), event),
        }
    }

    fn handle_no_subscribers(&self, event: EventRef) -> EventBusResult<()> {
        if self.inner.log_no_subscriber_messages {
            self.inner.logger.log(
                Level::DEBUG,
                &format!(
                    "No subscribers registered for event {}",
                    event.event_type().name()
                ),
                None,
            );
        }
        if self.inner.send_no_subscriber_event
            && !event.is::<NoSubscriberEvent>()
            && !event.is::<SubscriberExceptionEvent>()
        {
            self.post(NoSubscriberEvent::new(self.clone(), event))?;
        }
        Ok(())
    }

    fn handle_subscriber_exception(
        &self,
        subscription: &Subscription,
        event: &EventRef,
        failure: HandlerFailure,
    ) -> EventBusResult<()> {
        let handler = subscription.handler_method().method_string();

        // 异常通知事件的处理器出错只记录，不再上报
        if let Some(report) = event.downcast_ref::<SubscriberExceptionEvent>() {
            if self.inner.log_subscriber_exceptions {
                self.inner.logger.log(
                    Level::ERROR,
                    &format!("SubscriberExceptionEvent subscriber {handler} threw an exception"),
                    Some(&failure),
                );
                self.inner.logger.log(
                    Level::ERROR,
                    &format!(
                        "Initial event {} caused exception",
                        report.causing_event().event_type().name()
                    ),
                    Some(report.failure()),
                );
            }
            return Ok(());
        }

        if self.inner.throw_subscriber_exception {
            return Err(EventBusError::HandlerInvocation {
                handler,
                event: event.event_type().name(),
                source: failure,
            });
        }
        if self.inner.log_subscriber_exceptions {
            self.inner.logger.log(
                Level::ERROR,
                &format!(
                    "Could not dispatch event {} to subscribing method {handler}",
                    event.event_type().name()
                ),
                Some(&failure),
            );
        }
        if self.inner.send_subscriber_exception_event {
            self.post(SubscriberExceptionEvent::new(
                self.clone(),
                failure,
                event.clone(),
                subscription.subscriber().clone(),
            ))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn active_posting_states(&self) -> usize {
        self.inner.posting.len()
    }

    #[cfg(test)]
    pub(crate) fn background_pooled(&self) -> usize {
        self.inner.background_poster.queue().pooled()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventBus[index_count={}, event_inheritance={}]",
            self.inner.finder.index_count(),
            self.inner.event_inheritance
        )
    }
}
