//! 外部处理器索引
//!
//! 索引按订阅者类型给出处理器描述表，可链接到父订阅者的信息（super info），
//! 并声明发现流程是否继续沿父链查找。未被索引覆盖的类型回退到本地处理器表。
//!
use super::handler_method::HandlerMethod;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// 单个订阅者类型的索引信息
pub trait SubscriberInfo: Send + Sync {
    fn subscriber_class(&self) -> TypeId;

    fn handler_methods(&self) -> Vec<HandlerMethod>;

    /// 父订阅者的信息
    fn super_info(&self) -> Option<Arc<dyn SubscriberInfo>>;

    /// 是否继续检查父订阅者
    fn should_check_superclass(&self) -> bool;
}

/// 索引提供者
pub trait SubscriberIndex: Send + Sync {
    fn subscriber_info(&self, subscriber_class: TypeId) -> Option<Arc<dyn SubscriberInfo>>;
}

/// 基于固定描述表的索引信息
pub struct SimpleSubscriberInfo {
    class: TypeId,
    methods: Vec<HandlerMethod>,
    super_info: Option<Arc<dyn SubscriberInfo>>,
    should_check_superclass: bool,
}

impl SimpleSubscriberInfo {
    pub fn new<S: Any>(should_check_superclass: bool, methods: Vec<HandlerMethod>) -> Self {
        Self {
            class: TypeId::of::<S>(),
            methods,
            super_info: None,
            should_check_superclass,
        }
    }

    pub fn with_super_info(mut self, super_info: Arc<dyn SubscriberInfo>) -> Self {
        self.super_info = Some(super_info);
        self
    }
}

impl SubscriberInfo for SimpleSubscriberInfo {
    fn subscriber_class(&self) -> TypeId {
        self.class
    }

    fn handler_methods(&self) -> Vec<HandlerMethod> {
        self.methods.clone()
    }

    fn super_info(&self) -> Option<Arc<dyn SubscriberInfo>> {
        self.super_info.clone()
    }

    fn should_check_superclass(&self) -> bool {
        self.should_check_superclass
    }
}

/// 以类型为键的内存索引
#[derive(Default)]
pub struct SimpleSubscriberIndex {
    infos: HashMap<TypeId, Arc<dyn SubscriberInfo>>,
}

impl SimpleSubscriberIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(mut self, info: Arc<dyn SubscriberInfo>) -> Self {
        self.infos.insert(info.subscriber_class(), info);
        self
    }
}

impl SubscriberIndex for SimpleSubscriberIndex {
    fn subscriber_info(&self, subscriber_class: TypeId) -> Option<Arc<dyn SubscriberInfo>> {
        self.infos.get(&subscriber_class).cloned()
    }
}
