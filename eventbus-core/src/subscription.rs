use crate::event::{EventAny, EventType};
use crate::meta::{HandlerMethod, SubscriberAny};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 订阅者身份：注册时 `Arc` 分配的地址
///
/// 注册期间总线持有订阅者的强引用，地址不会被复用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }
}

/// 订阅：订阅者 + 处理器描述 + 活跃标记
///
/// 相等性由（订阅者身份, 处理器描述）决定；注销开始时活跃标记即被清除。
pub struct Subscription {
    subscriber: Arc<SubscriberAny>,
    subscriber_id: SubscriberId,
    method: HandlerMethod,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(subscriber: Arc<SubscriberAny>, method: HandlerMethod) -> Self {
        Self {
            subscriber_id: SubscriberId::of(&subscriber),
            subscriber,
            method,
            active: AtomicBool::new(true),
        }
    }

    pub fn subscriber(&self) -> &Arc<SubscriberAny> {
        &self.subscriber
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    pub fn handler_method(&self) -> &HandlerMethod {
        &self.method
    }

    pub fn event_type(&self) -> EventType {
        self.method.event_type()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn invoke(&self, event: &EventAny) -> anyhow::Result<()> {
        self.method.invoke(&*self.subscriber, event)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.subscriber_id == other.subscriber_id && self.method == other.method
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber_id)
            .field("method", &self.method)
            .field("active", &self.is_active())
            .finish()
    }
}
