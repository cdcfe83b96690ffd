//! 订阅注册表
//!
//! - `by_event_type`：事件类型 → 按优先级降序排列的订阅快照（写时复制）；
//! - `types_by_subscriber`：订阅者 → 已订阅的事件类型。
//!
//! 两张表由总线外层的读写锁统一保护；读取方拿到的是不可变快照，
//! 在其上迭代时不受并发注册/注销影响。
//!
use crate::error::{EventBusError, EventBusResult};
use crate::meta::{HandlerMethod, SubscriberAny};
use crate::subscription::{SubscriberId, Subscription};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type Snapshot = Arc<[Arc<Subscription>]>;

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    by_event_type: HashMap<TypeId, Snapshot>,
    types_by_subscriber: HashMap<SubscriberId, Vec<TypeId>>,
}

impl SubscriptionRegistry {
    pub(crate) fn contains(&self, subscriber: SubscriberId, method: &HandlerMethod) -> bool {
        self.by_event_type
            .get(&method.event_type().id())
            .is_some_and(|subscriptions| {
                subscriptions.iter().any(|existing| {
                    existing.subscriber_id() == subscriber && existing.handler_method() == method
                })
            })
    }

    /// 新订阅插入到第一个优先级严格更低的订阅之前
    pub(crate) fn subscribe(
        &mut self,
        subscriber: Arc<SubscriberAny>,
        method: HandlerMethod,
    ) -> EventBusResult<Arc<Subscription>> {
        let subscriber_id = SubscriberId::of(&subscriber);
        if self.contains(subscriber_id, &method) {
            return Err(EventBusError::DuplicateSubscription {
                subscriber: method.declaring_type().name(),
                event: method.event_type().name(),
            });
        }

        let event_type = method.event_type().id();
        let priority = method.priority();
        let subscription = Arc::new(Subscription::new(subscriber, method));

        let mut subscriptions = self
            .by_event_type
            .get(&event_type)
            .map(|current| current.to_vec())
            .unwrap_or_default();
        let position = subscriptions
            .iter()
            .position(|existing| priority > existing.handler_method().priority())
            .unwrap_or(subscriptions.len());
        subscriptions.insert(position, subscription.clone());
        self.by_event_type.insert(event_type, subscriptions.into());

        self.types_by_subscriber
            .entry(subscriber_id)
            .or_default()
            .push(event_type);

        Ok(subscription)
    }

    /// 先清除活跃标记，再从各事件类型的快照中移除；返回是否曾注册
    pub(crate) fn unsubscribe_all(&mut self, subscriber: SubscriberId) -> bool {
        let Some(event_types) = self.types_by_subscriber.remove(&subscriber) else {
            return false;
        };

        for event_type in event_types {
            let Some(current) = self.by_event_type.get(&event_type) else {
                continue;
            };
            let remaining: Vec<_> = current
                .iter()
                .filter(|subscription| {
                    if subscription.subscriber_id() == subscriber {
                        subscription.deactivate();
                        false
                    } else {
                        true
                    }
                })
                .cloned()
                .collect();

            if remaining.is_empty() {
                self.by_event_type.remove(&event_type);
            } else {
                self.by_event_type.insert(event_type, remaining.into());
            }
        }
        true
    }

    pub(crate) fn lookup(&self, event_type: TypeId) -> Option<Snapshot> {
        self.by_event_type.get(&event_type).cloned()
    }

    pub(crate) fn has_subscriptions(&self, event_type: TypeId) -> bool {
        self.by_event_type
            .get(&event_type)
            .is_some_and(|subscriptions| !subscriptions.is_empty())
    }

    pub(crate) fn is_registered(&self, subscriber: SubscriberId) -> bool {
        self.types_by_subscriber.contains_key(&subscriber)
    }
}
