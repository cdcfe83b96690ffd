//! 处理器描述（HandlerMethod）
//!
//! 不可变描述：声明类型 + 名称 + 事件类型 + 线程模式 + 优先级 + 粘性标记，
//! 以及类型擦除后的调用入口。相等性仅由（声明类型, 名称, 事件类型）决定。
//!
use crate::event::{Event, EventAny, EventType};
use crate::thread_mode::ThreadMode;
use anyhow::anyhow;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 类型擦除后的订阅者
pub type SubscriberAny = dyn Any + Send + Sync;

/// 从订阅者视图到其内嵌父订阅者视图的投影
pub type ReceiverProjection = for<'a> fn(&'a SubscriberAny) -> Option<&'a SubscriberAny>;

pub(crate) type Invoker =
    Arc<dyn Fn(&SubscriberAny, &EventAny) -> anyhow::Result<()> + Send + Sync>;

/// 处理器返回值：`()` 或 `Result<(), E>`
pub trait HandlerOutput {
    fn into_result(self) -> anyhow::Result<()>;
}

impl HandlerOutput for () {
    fn into_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> HandlerOutput for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// 声明处理器的订阅者类型
#[derive(Clone, Copy, Debug)]
pub struct DeclaringType {
    id: TypeId,
    name: &'static str,
}

impl DeclaringType {
    pub fn of<S: Any>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// 处理器描述
#[derive(Clone)]
pub struct HandlerMethod {
    name: &'static str,
    declaring: DeclaringType,
    event_type: EventType,
    thread_mode: ThreadMode,
    priority: i32,
    sticky: bool,
    invoker: Invoker,
}

impl HandlerMethod {
    /// 由订阅者方法构造描述，默认 `Posting` 模式、优先级 0、非粘性
    pub fn new<S, E, F, R>(name: &'static str, handler: F) -> Self
    where
        S: Any + Send + Sync,
        E: Event,
        F: Fn(&S, &E) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        let invoker: Invoker = Arc::new(move |subscriber: &SubscriberAny, event: &EventAny| {
            let subscriber = subscriber.downcast_ref::<S>().ok_or_else(|| {
                anyhow!("receiver is not a {}", std::any::type_name::<S>())
            })?;
            let event = event
                .downcast_ref::<E>()
                .ok_or_else(|| anyhow!("event is not a {}", std::any::type_name::<E>()))?;
            handler(subscriber, event).into_result()
        });

        Self {
            name,
            declaring: DeclaringType::of::<S>(),
            event_type: EventType::of::<E>(),
            thread_mode: ThreadMode::default(),
            priority: 0,
            sticky: false,
            invoker,
        }
    }

    pub fn with_thread_mode(mut self, thread_mode: ThreadMode) -> Self {
        self.thread_mode = thread_mode;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declaring_type(&self) -> DeclaringType {
        self.declaring
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn thread_mode(&self) -> ThreadMode {
        self.thread_mode
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    /// `Declaring#name(Event)` 形式的可读签名
    pub fn method_string(&self) -> String {
        format!(
            "{}#{}({})",
            self.declaring.name,
            self.name,
            self.event_type.name()
        )
    }

    pub(crate) fn invoke(
        &self,
        subscriber: &SubscriberAny,
        event: &EventAny,
    ) -> anyhow::Result<()> {
        (self.invoker)(subscriber, event)
    }

    /// 父订阅者上声明的处理器：调用前先沿投影链取得父订阅者视图
    pub(crate) fn rebased(&self, chain: &[ReceiverProjection]) -> Self {
        if chain.is_empty() {
            return self.clone();
        }
        let chain: Arc<[ReceiverProjection]> = chain.into();
        let inner = self.invoker.clone();
        let declaring = self.declaring.name;
        let invoker: Invoker = Arc::new(move |subscriber: &SubscriberAny, event: &EventAny| {
            let mut receiver = subscriber;
            for project in chain.iter() {
                receiver = project(receiver)
                    .ok_or_else(|| anyhow!("receiver {declaring} is not reachable"))?;
            }
            inner(receiver, event)
        });

        Self {
            invoker,
            ..self.clone()
        }
    }
}

impl PartialEq for HandlerMethod {
    fn eq(&self, other: &Self) -> bool {
        self.declaring.id == other.declaring.id
            && self.name == other.name
            && self.event_type == other.event_type
    }
}

impl Eq for HandlerMethod {}

impl Hash for HandlerMethod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring.id.hash(state);
        self.name.hash(state);
        self.event_type.hash(state);
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("method", &self.method_string())
            .field("thread_mode", &self.thread_mode)
            .field("priority", &self.priority)
            .field("sticky", &self.sticky)
            .finish()
    }
}
