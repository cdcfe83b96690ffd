use super::Poster;
use super::pending::PendingPostQueue;
use crate::bus::EventBus;
use crate::error::{EventBusError, EventBusResult};
use crate::event::EventRef;
use crate::logger::Level;
use crate::subscription::Subscription;
use std::sync::Arc;

/// 异步投递器：每个待投递项对应一个一次性任务
pub(crate) struct AsyncPoster {
    queue: Arc<PendingPostQueue>,
}

impl AsyncPoster {
    pub(crate) fn new(pool_limit: usize) -> Self {
        Self {
            queue: Arc::new(PendingPostQueue::new(pool_limit)),
        }
    }
}

impl Poster for AsyncPoster {
    fn enqueue(
        &self,
        bus: &EventBus,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) -> EventBusResult<()> {
        self.queue.enqueue(subscription, event);

        let queue = self.queue.clone();
        let task_bus = bus.clone();
        bus.executor().execute(Box::new(move || {
            let outcome = match queue.poll() {
                Some(post) => task_bus.invoke_pending(post),
                None => Err(EventBusError::QueueMisuse {
                    reason: "no pending post available",
                }),
            };
            if let Err(err) = outcome {
                task_bus
                    .logger()
                    .log(Level::ERROR, "async delivery failed", Some(&err));
            }
        }));
        Ok(())
    }
}
