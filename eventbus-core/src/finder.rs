//! 处理器发现与缓存（HandlerFinder）
//!
//! 将订阅者类型解析为有序的处理器描述表：
//! - 优先查询外部索引（支持 super info 链接），未覆盖的类型回退到本地处理器表；
//! - 沿父订阅者链向上遍历，跳过标准库命名空间；
//! - 同名同事件的处理器仅保留最靠近子类型的声明（先按事件类型、冲突时再按完整签名）；
//! - 严格校验下非法描述直接失败，宽松校验下静默跳过；
//! - 结果按具体类型缓存，可清空。
//!
//! 遍历所用的临时状态（FindState）按槽位复用，最多保留 4 个。
//!
use crate::error::{EventBusError, EventBusResult};
use crate::meta::{
    HandlerMethod, ReceiverProjection, SubscriberClass, SubscriberIndex, SubscriberInfo,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const POOL_SIZE: usize = 4;

const SKIPPED_NAMESPACES: [&str; 3] = ["std::", "core::", "alloc::"];

pub(crate) struct HandlerFinder {
    indexes: Vec<Arc<dyn SubscriberIndex>>,
    strict: bool,
    ignore_generated_index: bool,
    cache: DashMap<TypeId, Arc<[HandlerMethod]>>,
    pool: FindStatePool,
}

impl HandlerFinder {
    pub(crate) fn new(
        indexes: Vec<Arc<dyn SubscriberIndex>>,
        strict: bool,
        ignore_generated_index: bool,
    ) -> Self {
        Self {
            indexes,
            strict,
            ignore_generated_index,
            cache: DashMap::new(),
            pool: FindStatePool::default(),
        }
    }

    pub(crate) fn find(&self, class: SubscriberClass) -> EventBusResult<Arc<[HandlerMethod]>> {
        if let Some(methods) = self.cache.get(&class.id()).map(|m| m.clone()) {
            return Ok(methods);
        }

        let methods = self.discover(class)?;
        if methods.is_empty() {
            return Err(EventBusError::NoHandlersFound {
                subscriber: class.name(),
            });
        }

        let methods: Arc<[HandlerMethod]> = methods.into();
        self.cache.insert(class.id(), methods.clone());
        Ok(methods)
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.clear();
    }

    pub(crate) fn index_count(&self) -> usize {
        self.indexes.len()
    }

    fn discover(&self, class: SubscriberClass) -> EventBusResult<Vec<HandlerMethod>> {
        let mut state = self.pool.prepare(class);

        while let Some(current) = state.class {
            let info = if self.ignore_generated_index {
                None
            } else {
                self.subscriber_info(&state, current.id())
            };

            match &info {
                Some(info) => {
                    if info.subscriber_class() != current.id() {
                        return Err(EventBusError::Discovery {
                            reason: format!(
                                "index answered with another subscriber type while resolving {}",
                                current.name()
                            ),
                        });
                    }
                    self.accept_all(&mut state, current, info.handler_methods())?;
                    if !info.should_check_superclass() {
                        state.skip_parents = true;
                    }
                }
                None => self.accept_all(&mut state, current, current.handler_methods())?,
            }

            state.info = info;
            state.move_to_parent();
        }

        Ok(self.pool.release(state))
    }

    fn subscriber_info(&self, state: &FindState, class: TypeId) -> Option<Arc<dyn SubscriberInfo>> {
        if let Some(super_info) = state.info.as_ref().and_then(|info| info.super_info()) {
            if super_info.subscriber_class() == class {
                return Some(super_info);
            }
        }
        self.indexes
            .iter()
            .find_map(|index| index.subscriber_info(class))
    }

    fn accept_all(
        &self,
        state: &mut FindState,
        class: SubscriberClass,
        methods: Vec<HandlerMethod>,
    ) -> EventBusResult<()> {
        let mut declared = HashSet::new();

        for method in methods {
            if method.declaring_type().id() != class.id() {
                self.reject(
                    &method,
                    format!(
                        "declared on {} but listed for {}",
                        method.declaring_type().name(),
                        class.name()
                    ),
                )?;
                continue;
            }
            if !declared.insert((method.name(), method.event_type().id())) {
                self.reject(&method, "declared more than once".to_string())?;
                continue;
            }
            if state.check_add(method.name(), method.event_type().id()) {
                let method = method.rebased(&state.chain);
                state.methods.push(method);
            }
        }
        Ok(())
    }

    fn reject(&self, method: &HandlerMethod, reason: String) -> EventBusResult<()> {
        if self.strict {
            return Err(EventBusError::InvalidHandlerSignature {
                handler: method.method_string(),
                reason,
            });
        }
        Ok(())
    }
}

enum Claim {
    Method { name: &'static str, depth: usize },
    Consumed,
}

#[derive(Default)]
struct FindState {
    methods: Vec<HandlerMethod>,
    any_method_by_event_type: HashMap<TypeId, Claim>,
    depth_by_method_key: HashMap<(&'static str, TypeId), usize>,
    visited: HashSet<TypeId>,
    chain: Vec<ReceiverProjection>,
    class: Option<SubscriberClass>,
    depth: usize,
    skip_parents: bool,
    info: Option<Arc<dyn SubscriberInfo>>,
}

impl FindState {
    fn init(&mut self, class: SubscriberClass) {
        self.class = Some(class);
        self.visited.insert(class.id());
    }

    fn recycle(&mut self) {
        self.methods.clear();
        self.any_method_by_event_type.clear();
        self.depth_by_method_key.clear();
        self.visited.clear();
        self.chain.clear();
        self.class = None;
        self.depth = 0;
        self.skip_parents = false;
        self.info = None;
    }

    /// 两级检查：同一事件类型首次出现直接接受；再次出现才比较完整签名
    fn check_add(&mut self, name: &'static str, event: TypeId) -> bool {
        let depth = self.depth;
        match self
            .any_method_by_event_type
            .insert(event, Claim::Method { name, depth })
        {
            None => true,
            Some(previous) => {
                if let Claim::Method {
                    name: previous_name,
                    depth: previous_depth,
                } = previous
                {
                    self.check_add_with_signature(previous_name, event, previous_depth);
                }
                self.any_method_by_event_type.insert(event, Claim::Consumed);
                self.check_add_with_signature(name, event, depth)
            }
        }
    }

    fn check_add_with_signature(
        &mut self,
        name: &'static str,
        event: TypeId,
        depth: usize,
    ) -> bool {
        match self.depth_by_method_key.get(&(name, event)) {
            // 子类型上已有同签名声明
            Some(&existing) if existing < depth => false,
            _ => {
                self.depth_by_method_key.insert((name, event), depth);
                true
            }
        }
    }

    fn move_to_parent(&mut self) {
        let next = if self.skip_parents {
            None
        } else {
            self.class.and_then(|class| class.parent())
        };

        self.class = match next {
            Some(link)
                if !is_skipped(link.class().name()) && self.visited.insert(link.class().id()) =>
            {
                self.chain.push(link.projection());
                self.depth += 1;
                Some(link.class())
            }
            _ => None,
        };
    }
}

fn is_skipped(type_name: &str) -> bool {
    SKIPPED_NAMESPACES
        .iter()
        .any(|prefix| type_name.starts_with(prefix))
}

#[derive(Default)]
struct FindStatePool {
    slots: Mutex<[Option<FindState>; POOL_SIZE]>,
}

impl FindStatePool {
    fn prepare(&self, class: SubscriberClass) -> FindState {
        let recycled = self.slots.lock().iter_mut().find_map(Option::take);
        let mut state = recycled.unwrap_or_default();
        state.init(class);
        state
    }

    fn release(&self, mut state: FindState) -> Vec<HandlerMethod> {
        let methods = std::mem::take(&mut state.methods);
        state.recycle();
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(state);
        }
        methods
    }

    #[cfg(test)]
    fn pooled(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::meta::{
        Handlers, ParentLink, SimpleSubscriberIndex, SimpleSubscriberInfo, Subscriber,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Message;
    impl Event for Message {}

    struct Other;
    impl Event for Other {}

    #[derive(Default)]
    struct Base {
        hits: AtomicUsize,
    }
    impl Base {
        fn on_message(&self, _: &Message) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        fn on_message_audit(&self, _: &Message) {
            self.hits.fetch_add(100, Ordering::SeqCst);
        }
    }
    impl Subscriber for Base {
        fn handlers(handlers: &mut Handlers<Self>) {
            handlers
                .on("on_message", Self::on_message)
                .on("on_message_audit", Self::on_message_audit);
        }
    }

    #[derive(Default)]
    struct Child {
        base: Base,
        own: AtomicUsize,
    }
    impl Child {
        fn on_message(&self, _: &Message) {
            self.own.fetch_add(1, Ordering::SeqCst);
        }
    }
    impl AsRef<Base> for Child {
        fn as_ref(&self) -> &Base {
            &self.base
        }
    }
    impl Subscriber for Child {
        fn handlers(handlers: &mut Handlers<Self>) {
            handlers.on("on_message", Self::on_message);
        }
        fn parent() -> Option<ParentLink> {
            Some(ParentLink::of::<Self, Base>())
        }
    }

    fn finder() -> HandlerFinder {
        HandlerFinder::new(Vec::new(), false, false)
    }

    #[test]
    fn most_derived_declaration_wins() {
        let methods = finder().find(SubscriberClass::of::<Child>()).unwrap();
        let names: Vec<_> = methods.iter().map(|m| m.method_string()).collect();
        assert_eq!(methods.len(), 2, "{names:?}");
        assert_eq!(methods[0].declaring_type().id(), TypeId::of::<Child>());
        assert_eq!(methods[1].name(), "on_message_audit");

        // 父链上的处理器经投影作用于内嵌的父订阅者
        let child = Child::default();
        for method in methods.iter() {
            method.invoke(&child, &Message).unwrap();
        }
        assert_eq!(child.own.load(Ordering::SeqCst), 1);
        assert_eq!(child.base.hits.load(Ordering::SeqCst), 100);
    }

    struct Empty;
    impl Subscriber for Empty {}

    #[test]
    fn empty_subscribers_are_rejected() {
        match finder().find(SubscriberClass::of::<Empty>()) {
            Err(EventBusError::NoHandlersFound { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    struct Misdeclared;
    impl Subscriber for Misdeclared {
        fn handlers(handlers: &mut Handlers<Self>) {
            handlers
                .add(HandlerMethod::new("on_other", |_: &Misdeclared, _: &Other| {}))
                .add(HandlerMethod::new("on_message", Base::on_message))
                .add(HandlerMethod::new("on_other", |_: &Misdeclared, _: &Other| {}));
        }
    }

    #[test]
    fn strict_verification_fails_on_foreign_receivers() {
        let strict = HandlerFinder::new(Vec::new(), true, false);
        match strict.find(SubscriberClass::of::<Misdeclared>()) {
            Err(EventBusError::InvalidHandlerSignature { handler, .. }) => {
                assert!(handler.contains("on_message"), "{handler}");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let lenient = finder().find(SubscriberClass::of::<Misdeclared>()).unwrap();
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].name(), "on_other");
    }

    #[test]
    fn index_takes_precedence_over_local_handlers() {
        let info = SimpleSubscriberInfo::new::<Empty>(
            false,
            vec![HandlerMethod::new("on_message", |_: &Empty, _: &Message| {})],
        );
        let index = SimpleSubscriberIndex::new().with_info(Arc::new(info));
        let indexed = HandlerFinder::new(vec![Arc::new(index)], false, false);

        let methods = indexed.find(SubscriberClass::of::<Empty>()).unwrap();
        assert_eq!(methods.len(), 1);

        // 忽略索引后只剩（空的）本地处理器表
        let local = HandlerFinder::new(indexed.indexes.clone(), false, true);
        assert!(matches!(
            local.find(SubscriberClass::of::<Empty>()),
            Err(EventBusError::NoHandlersFound { .. })
        ));
    }

    #[test]
    fn super_info_links_and_stops_the_walk() {
        let base_info: Arc<dyn SubscriberInfo> = Arc::new(SimpleSubscriberInfo::new::<Base>(
            false,
            vec![HandlerMethod::new("on_message_audit", Base::on_message_audit)],
        ));
        let child_info = SimpleSubscriberInfo::new::<Child>(
            true,
            vec![HandlerMethod::new("on_message", Child::on_message)],
        )
        .with_super_info(base_info);
        let index = SimpleSubscriberIndex::new().with_info(Arc::new(child_info));
        let finder = HandlerFinder::new(vec![Arc::new(index)], true, false);

        let methods = finder.find(SubscriberClass::of::<Child>()).unwrap();
        let names: Vec<_> = methods.iter().map(|m| m.name()).collect();
        // Base 的本地表含 on_message，但其索引信息替代了本地表
        assert_eq!(names, vec!["on_message", "on_message_audit"]);
    }

    #[test]
    fn results_are_cached_until_cleared() {
        let finder = finder();
        let first = finder.find(SubscriberClass::of::<Child>()).unwrap();
        let second = finder.find(SubscriberClass::of::<Child>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        finder.clear_cache();
        let third = finder.find(SubscriberClass::of::<Child>()).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first.len(), third.len());
    }

    #[test]
    fn find_state_pool_is_bounded() {
        let finder = finder();
        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        finder.clear_cache();
                        finder.find(SubscriberClass::of::<Child>()).unwrap();
                    }
                });
            }
        });
        assert!(finder.pool.pooled() <= POOL_SIZE);
        assert!(finder.pool.pooled() >= 1);
    }
}
