//! 事件模型
//!
//! - `Event`：可投递的值，按具体类型匹配订阅，可选声明上级类型；
//! - `EventType`：运行期类型令牌（`TypeId` + 名称 + 上级类型表）；
//! - `Supertype`：上级类型声明，携带从子类型视图到上级视图的投影；
//! - `EventRef`：共享持有的事件实例，按引用身份比较。
//!
//! 上级类型分两类：`Interface` 可有多个，`Parent` 至多一个（构成父链）。
//! 投影基于 `AsRef`，子类型通过内嵌字段暴露其上级视图。
//!
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 类型擦除后的事件视图
pub type EventAny = dyn Any + Send + Sync;

/// 从某一类型视图到其上级类型视图的投影
pub type Projection = for<'a> fn(&'a EventAny) -> Option<&'a EventAny>;

/// 可投递的事件
pub trait Event: Any + Send + Sync {
    /// 直接上级类型，按声明顺序参与解析
    fn supertypes() -> Vec<Supertype>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// 事件运行期类型令牌
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<Supertype>,
}

impl EventType {
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
            supertypes: E::supertypes,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn supertypes(&self) -> Vec<Supertype> {
        (self.supertypes)()
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 上级类型种类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupertypeKind {
    Interface,
    Parent,
}

/// 上级类型声明
#[derive(Clone, Copy)]
pub struct Supertype {
    ty: EventType,
    kind: SupertypeKind,
    project: Projection,
}

impl Supertype {
    /// 声明 `E` 实现了“接口” `I`
    pub fn interface<E, I>() -> Self
    where
        E: Event + AsRef<I>,
        I: Event,
    {
        Self {
            ty: EventType::of::<I>(),
            kind: SupertypeKind::Interface,
            project: project_to::<E, I>,
        }
    }

    /// 声明 `P` 为 `E` 的父类型
    pub fn parent<E, P>() -> Self
    where
        E: Event + AsRef<P>,
        P: Event,
    {
        Self {
            ty: EventType::of::<P>(),
            kind: SupertypeKind::Parent,
            project: project_to::<E, P>,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.ty
    }

    pub fn kind(&self) -> SupertypeKind {
        self.kind
    }

    pub fn projection(&self) -> Projection {
        self.project
    }
}

impl fmt::Debug for Supertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supertype")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .finish()
    }
}

fn project_to<E, P>(event: &EventAny) -> Option<&EventAny>
where
    E: Event + AsRef<P>,
    P: Event,
{
    event
        .downcast_ref::<E>()
        .map(|event| <E as AsRef<P>>::as_ref(event) as &EventAny)
}

/// 共享事件实例
/// - 克隆只增加引用计数，身份（地址）保持不变
/// - 记录构造时的具体类型，供匹配与投影使用
#[derive(Clone)]
pub struct EventRef {
    inner: Arc<EventAny>,
    ty: EventType,
}

impl EventRef {
    pub fn new<E: Event>(event: E) -> Self {
        Self::from_arc(Arc::new(event))
    }

    pub fn from_arc<E: Event>(event: Arc<E>) -> Self {
        Self {
            inner: event,
            ty: EventType::of::<E>(),
        }
    }

    pub fn event_type(&self) -> EventType {
        self.ty
    }

    pub fn as_any(&self) -> &EventAny {
        &*self.inner
    }

    pub fn is<E: Event>(&self) -> bool {
        self.ty.id() == TypeId::of::<E>()
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    pub fn downcast<E: Event>(&self) -> Option<Arc<E>> {
        self.inner.clone().downcast::<E>().ok()
    }

    /// 实例地址，作为引用身份
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn same_instance(&self, other: &EventRef) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventRef({}@{:#x})", self.ty.name, self.addr())
    }
}

/// 任意引用的地址，用于与 `EventRef::addr` 比较
pub(crate) fn addr_of<T: ?Sized>(value: &T) -> usize {
    value as *const T as *const () as usize
}
