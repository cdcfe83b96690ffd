//! 待投递队列
//!
//! 以槽位下标组织的单链 FIFO：槽位存放（事件, 订阅），出队后槽位被清空并进入空闲表复用。
//! 空闲表至多保留 `pool_limit` 个槽位，超出时把末尾槽位移入空出的下标并删除末尾，
//! 因此任何时刻槽位总数都不超过 `len + pool_limit`。
//!
//! `active` 标记与队列共用同一把锁，用于保证同一队列至多一个消费者（后台工作线程或主线程排空任务）。
//!
use crate::event::EventRef;
use crate::subscription::Subscription;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// 默认空闲槽位上限
pub const DEFAULT_POOL_LIMIT: usize = 10_000;

pub(crate) struct PendingPost {
    pub(crate) event: EventRef,
    pub(crate) subscription: Arc<Subscription>,
}

struct Slot {
    post: Option<PendingPost>,
    prev: Option<usize>,
    next: Option<usize>,
    /// 空闲槽位在空闲表中的位置
    free_at: Option<usize>,
}

/// 槽位总数恒等于 `len + free.len()`，且 `free.len() <= pool_limit`
#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    active: bool,
}

impl Arena {
    fn obtain(&mut self, post: PendingPost) -> usize {
        let slot = Slot {
            post: Some(post),
            prev: self.tail,
            next: None,
            free_at: None,
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize, pool_limit: usize) {
        // 槽位内容已在出队时取走
        let slot = &mut self.slots[index];
        slot.prev = None;
        slot.next = None;
        if self.free.len() < pool_limit {
            slot.free_at = Some(self.free.len());
            self.free.push(index);
        } else {
            self.remove_slot(index);
        }
    }

    /// 物理删除槽位：末尾槽位移入该下标，并修正指向它的链接
    fn remove_slot(&mut self, index: usize) {
        self.slots.swap_remove(index);
        if self.slots.capacity() / 4 > self.slots.len() {
            self.slots.shrink_to(self.slots.len() * 2);
        }
        let Some(moved) = self.slots.get(index) else {
            return;
        };
        let (prev, next, free_at) = (moved.prev, moved.next, moved.free_at);
        if let Some(position) = free_at {
            self.free[position] = index;
            return;
        }
        match prev {
            Some(prev) => self.slots[prev].next = Some(index),
            None => self.head = Some(index),
        }
        match next {
            Some(next) => self.slots[next].prev = Some(index),
            None => self.tail = Some(index),
        }
    }

    fn push(&mut self, post: PendingPost) {
        let index = self.obtain(post);
        match self.tail {
            Some(tail) => self.slots[tail].next = Some(index),
            None => {
                debug_assert!(self.head.is_none(), "queue head present without a tail");
                self.head = Some(index);
            }
        }
        self.tail = Some(index);
        self.len += 1;
    }

    fn pop(&mut self, pool_limit: usize) -> Option<PendingPost> {
        let index = self.head?;
        let slot = &mut self.slots[index];
        let post = slot.post.take();
        self.head = slot.next;
        match self.head {
            Some(head) => self.slots[head].prev = None,
            None => self.tail = None,
        }
        self.len -= 1;
        self.release(index, pool_limit);
        post
    }
}

pub(crate) struct PendingPostQueue {
    arena: Mutex<Arena>,
    available: Condvar,
    pool_limit: usize,
}

impl PendingPostQueue {
    pub(crate) fn new(pool_limit: usize) -> Self {
        Self {
            arena: Mutex::new(Arena::default()),
            available: Condvar::new(),
            pool_limit,
        }
    }

    pub(crate) fn enqueue(&self, subscription: Arc<Subscription>, event: EventRef) {
        self.arena.lock().push(PendingPost {
            event,
            subscription,
        });
        self.available.notify_all();
    }

    /// 入队；若当前无活跃消费者则占用并返回 true
    pub(crate) fn enqueue_and_claim(
        &self,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) -> bool {
        let claimed = {
            let mut arena = self.arena.lock();
            arena.push(PendingPost {
                event,
                subscription,
            });
            !std::mem::replace(&mut arena.active, true)
        };
        self.available.notify_all();
        claimed
    }

    pub(crate) fn poll(&self) -> Option<PendingPost> {
        self.arena.lock().pop(self.pool_limit)
    }

    /// 队列为空时至多等待 `timeout`
    pub(crate) fn poll_timeout(&self, timeout: Duration) -> Option<PendingPost> {
        let mut arena = self.arena.lock();
        if arena.head.is_none() {
            self.available.wait_for(&mut arena, timeout);
        }
        arena.pop(self.pool_limit)
    }

    /// 出队；队列已空则在同一把锁内释放消费者占用
    pub(crate) fn poll_or_release(&self) -> Option<PendingPost> {
        let mut arena = self.arena.lock();
        let post = arena.pop(self.pool_limit);
        if post.is_none() {
            arena.active = false;
        }
        post
    }

    pub(crate) fn release_claim(&self) {
        self.arena.lock().active = false;
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.lock().len
    }

    /// 当前保留的空闲槽位数
    #[cfg(test)]
    pub(crate) fn pooled(&self) -> usize {
        self.arena.lock().free.len()
    }

    #[cfg(test)]
    pub(crate) fn allocated(&self) -> usize {
        self.arena.lock().slots.len()
    }
}
