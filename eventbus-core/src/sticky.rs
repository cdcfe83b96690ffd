//! 粘性事件存储：每个具体类型仅保留最近一次的实例
//!
use crate::event::{EventRef, EventType};
use crate::hierarchy;
use dashmap::DashMap;
use std::any::TypeId;

#[derive(Default)]
pub(crate) struct StickyEvents {
    events: DashMap<TypeId, EventRef>,
}

impl StickyEvents {
    pub(crate) fn put(&self, event: EventRef) {
        self.events.insert(event.event_type().id(), event);
    }

    pub(crate) fn get(&self, event_type: TypeId) -> Option<EventRef> {
        self.events.get(&event_type).map(|entry| entry.value().clone())
    }

    pub(crate) fn remove(&self, event_type: TypeId) -> Option<EventRef> {
        self.events.remove(&event_type).map(|(_, event)| event)
    }

    /// 仅当存储的正是该实例时移除
    pub(crate) fn remove_instance(&self, event: &EventRef) -> bool {
        self.events
            .remove_if(&event.event_type().id(), |_, stored| stored.same_instance(event))
            .is_some()
    }

    pub(crate) fn clear(&self) {
        self.events.clear();
    }

    /// 可投递给 `event_type` 订阅的粘性事件：精确匹配，或在继承模式下所有可赋值的类型
    pub(crate) fn matching(&self, event_type: EventType, event_inheritance: bool) -> Vec<EventRef> {
        if !event_inheritance {
            return self.get(event_type.id()).into_iter().collect();
        }
        let candidates: Vec<EventRef> = self
            .events
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        candidates
            .into_iter()
            .filter(|candidate| {
                hierarchy::resolve(candidate.event_type())
                    .iter()
                    .any(|resolved| resolved.event_type() == event_type)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Supertype};

    struct Status(u8);
    impl Event for Status {}

    struct DetailedStatus {
        status: Status,
    }
    impl AsRef<Status> for DetailedStatus {
        fn as_ref(&self) -> &Status {
            &self.status
        }
    }
    impl Event for DetailedStatus {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::parent::<Self, Status>()]
        }
    }

    #[test]
    fn keeps_the_latest_instance_per_type() {
        let store = StickyEvents::default();
        let first = EventRef::new(Status(1));
        let second = EventRef::new(Status(2));
        store.put(first.clone());
        store.put(second.clone());

        let stored = store.get(TypeId::of::<Status>()).unwrap();
        assert!(stored.same_instance(&second));
        assert!(!store.remove_instance(&first));
        assert!(store.remove_instance(&second));
        assert!(store.get(TypeId::of::<Status>()).is_none());
    }

    #[test]
    fn matching_follows_the_inheritance_switch() {
        let store = StickyEvents::default();
        store.put(EventRef::new(Status(1)));
        store.put(EventRef::new(DetailedStatus { status: Status(2) }));

        let status = EventType::of::<Status>();
        assert_eq!(store.matching(status, false).len(), 1);
        assert_eq!(store.matching(status, true).len(), 2);
        assert_eq!(store.matching(EventType::of::<DetailedStatus>(), true).len(), 1);

        store.clear();
        assert!(store.matching(status, true).is_empty());
    }
}
