//! 按调用线程划分的投递状态
//!
//! 每个正在执行 `post` 的线程在总线内拥有一份独立状态：
//! 待处理队列、是否处于投递中、是否主线程，以及当前事件/订阅与取消标记。
//! 状态在首次投递时创建，最外层投递结束时释放。
//!
use crate::event::EventRef;
use crate::subscription::Subscription;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};

#[derive(Default)]
pub(crate) struct PostingState {
    pub(crate) queue: VecDeque<EventRef>,
    pub(crate) is_posting: bool,
    pub(crate) is_main_thread: bool,
    pub(crate) event: Option<EventRef>,
    pub(crate) subscription: Option<Arc<Subscription>>,
    pub(crate) canceled: bool,
}

impl PostingState {
    pub(crate) fn begin_delivery(&mut self, event: &EventRef, subscription: &Arc<Subscription>) {
        self.event = Some(event.clone());
        self.subscription = Some(subscription.clone());
        self.canceled = false;
    }

    /// 复位当前事件/订阅，返回投递期间是否被取消
    pub(crate) fn end_delivery(&mut self) -> bool {
        self.event = None;
        self.subscription = None;
        std::mem::take(&mut self.canceled)
    }
}

pub(crate) type SharedPostingState = Arc<Mutex<PostingState>>;

#[derive(Default)]
pub(crate) struct PostingStates {
    states: DashMap<ThreadId, SharedPostingState>,
}

impl PostingStates {
    pub(crate) fn current(&self) -> SharedPostingState {
        self.states
            .entry(thread::current().id())
            .or_default()
            .clone()
    }

    pub(crate) fn get_current(&self) -> Option<SharedPostingState> {
        self.states
            .get(&thread::current().id())
            .map(|state| state.clone())
    }

    pub(crate) fn release_current(&self) {
        self.states.remove(&thread::current().id());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}

/// 最外层投递结束（含展开）时释放本线程状态
pub(crate) struct PostingGuard<'a> {
    states: &'a PostingStates,
}

impl<'a> PostingGuard<'a> {
    pub(crate) fn new(states: &'a PostingStates) -> Self {
        Self { states }
    }
}

impl Drop for PostingGuard<'_> {
    fn drop(&mut self) {
        self.states.release_current();
    }
}
