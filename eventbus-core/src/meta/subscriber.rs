//! 订阅者与本地处理器表
//!
//! - `Subscriber`：订阅者类型声明自身的处理器表，并可声明组合复用的父订阅者；
//! - `Handlers`：处理器表构建器；
//! - `SubscriberClass`：订阅者的运行期类型令牌，供发现流程沿父链遍历；
//! - `ParentLink`：到父订阅者的链接（父类型令牌 + 接收者投影）。
//!
//! 父订阅者以字段形式内嵌于子订阅者，并通过 `AsRef` 暴露。
//!
use super::handler_method::{HandlerMethod, HandlerOutput, ReceiverProjection, SubscriberAny};
use crate::event::Event;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// 订阅者
pub trait Subscriber: Any + Send + Sync {
    /// 声明本类型自身的处理器（不含父订阅者）
    ///
    /// 仅由外部索引提供处理器的类型可保留默认的空表。
    fn handlers(handlers: &mut Handlers<Self>)
    where
        Self: Sized,
    {
        let _ = handlers;
    }

    /// 父订阅者，其处理器一并参与发现
    fn parent() -> Option<ParentLink>
    where
        Self: Sized,
    {
        None
    }
}

/// 处理器表构建器
pub struct Handlers<S> {
    methods: Vec<HandlerMethod>,
    _marker: PhantomData<fn(&S)>,
}

impl<S: Subscriber> Handlers<S> {
    pub(crate) fn new() -> Self {
        Self {
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 以默认参数（`Posting`、优先级 0、非粘性）登记处理器
    pub fn on<E, F, R>(&mut self, name: &'static str, handler: F) -> &mut Self
    where
        E: Event,
        F: Fn(&S, &E) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        self.add(HandlerMethod::new::<S, E, F, R>(name, handler))
    }

    /// 登记完整描述
    pub fn add(&mut self, method: HandlerMethod) -> &mut Self {
        self.methods.push(method);
        self
    }

    pub(crate) fn into_methods(self) -> Vec<HandlerMethod> {
        self.methods
    }
}

/// 订阅者运行期类型令牌
#[derive(Clone, Copy)]
pub struct SubscriberClass {
    id: TypeId,
    name: &'static str,
    describe: fn() -> Vec<HandlerMethod>,
    parent: fn() -> Option<ParentLink>,
}

impl SubscriberClass {
    pub fn of<S: Subscriber>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
            describe: describe::<S>,
            parent: S::parent,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 本地处理器表
    pub fn handler_methods(&self) -> Vec<HandlerMethod> {
        (self.describe)()
    }

    pub fn parent(&self) -> Option<ParentLink> {
        (self.parent)()
    }
}

impl fmt::Debug for SubscriberClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn describe<S: Subscriber>() -> Vec<HandlerMethod> {
    let mut handlers = Handlers::<S>::new();
    S::handlers(&mut handlers);
    handlers.into_methods()
}

/// 到父订阅者的链接
#[derive(Clone, Copy, Debug)]
pub struct ParentLink {
    class: SubscriberClass,
    project: ReceiverProjection,
}

impl ParentLink {
    /// `S` 内嵌父订阅者 `P`
    pub fn of<S, P>() -> Self
    where
        S: Subscriber + AsRef<P>,
        P: Subscriber,
    {
        Self {
            class: SubscriberClass::of::<P>(),
            project: project_parent::<S, P>,
        }
    }

    pub fn class(&self) -> SubscriberClass {
        self.class
    }

    pub fn projection(&self) -> ReceiverProjection {
        self.project
    }
}

fn project_parent<S, P>(subscriber: &SubscriberAny) -> Option<&SubscriberAny>
where
    S: Subscriber + AsRef<P>,
    P: Subscriber,
{
    subscriber
        .downcast_ref::<S>()
        .map(|subscriber| <S as AsRef<P>>::as_ref(subscriber) as &SubscriberAny)
}
