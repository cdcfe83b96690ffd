use super::Poster;
use super::pending::PendingPostQueue;
use crate::bus::EventBus;
use crate::error::EventBusResult;
use crate::event::EventRef;
use crate::logger::Level;
use crate::subscription::Subscription;
use std::sync::Arc;
use std::time::Duration;

/// 后台投递器
/// - 队列非空且无工作线程时，向执行器提交唯一的工作任务
/// - 工作任务空闲等待超过 `idle_timeout` 后退出
pub(crate) struct BackgroundPoster {
    queue: Arc<PendingPostQueue>,
    idle_timeout: Duration,
}

impl BackgroundPoster {
    pub(crate) fn new(pool_limit: usize, idle_timeout: Duration) -> Self {
        Self {
            queue: Arc::new(PendingPostQueue::new(pool_limit)),
            idle_timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn queue(&self) -> &PendingPostQueue {
        &self.queue
    }
}

impl Poster for BackgroundPoster {
    fn enqueue(
        &self,
        bus: &EventBus,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) -> EventBusResult<()> {
        if self.queue.enqueue_and_claim(subscription, event) {
            let queue = self.queue.clone();
            let idle_timeout = self.idle_timeout;
            let worker_bus = bus.clone();
            bus.executor()
                .execute(Box::new(move || run(&worker_bus, &queue, idle_timeout)));
        }
        Ok(())
    }
}

fn run(bus: &EventBus, queue: &PendingPostQueue, idle_timeout: Duration) {
    loop {
        let post = match queue.poll_timeout(idle_timeout) {
            Some(post) => post,
            // 超时后在锁内复查，仍为空才退出
            None => match queue.poll_or_release() {
                Some(post) => post,
                None => return,
            },
        };
        if let Err(err) = bus.invoke_pending(post) {
            bus.logger().log(
                Level::ERROR,
                &format!(
                    "{} was interrupted",
                    std::thread::current()
                        .name()
                        .unwrap_or("background worker")
                ),
                Some(&err),
            );
        }
    }
}
