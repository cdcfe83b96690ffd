//! 总线自身投递的通知事件
//!
use crate::bus::EventBus;
use crate::error::HandlerFailure;
use crate::event::{Event, EventRef};
use crate::meta::SubscriberAny;
use std::sync::Arc;

/// 事件没有任何订阅者时投递
pub struct NoSubscriberEvent {
    bus: EventBus,
    original: EventRef,
}

impl NoSubscriberEvent {
    pub(crate) fn new(bus: EventBus, original: EventRef) -> Self {
        Self { bus, original }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn original_event(&self) -> &EventRef {
        &self.original
    }
}

impl Event for NoSubscriberEvent {}

/// 处理器出错时投递
pub struct SubscriberExceptionEvent {
    bus: EventBus,
    failure: HandlerFailure,
    causing_event: EventRef,
    causing_subscriber: Arc<SubscriberAny>,
}

impl SubscriberExceptionEvent {
    pub(crate) fn new(
        bus: EventBus,
        failure: HandlerFailure,
        causing_event: EventRef,
        causing_subscriber: Arc<SubscriberAny>,
    ) -> Self {
        Self {
            bus,
            failure,
            causing_event,
            causing_subscriber,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn failure(&self) -> &HandlerFailure {
        &self.failure
    }

    pub fn causing_event(&self) -> &EventRef {
        &self.causing_event
    }

    pub fn causing_subscriber(&self) -> &Arc<SubscriberAny> {
        &self.causing_subscriber
    }
}

impl Event for SubscriberExceptionEvent {}
