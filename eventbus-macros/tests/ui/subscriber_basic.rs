use eventbus_core::{EventBus, Subscriber as _, SubscriberClass};
use eventbus_macros::{Event, subscriber};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Event)]
struct Ping;

#[derive(Default)]
struct Counter {
    hits: AtomicUsize,
}

#[subscriber]
impl Counter {
    #[subscribe]
    fn on_ping(&self, _event: &Ping) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    #[subscribe(thread_mode = Posting, priority = 5, sticky)]
    fn on_ping_sticky(&self, _event: &Ping) -> anyhow::Result<()> {
        Ok(())
    }

    fn helper(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn main() {
    assert_eq!(SubscriberClass::of::<Counter>().handler_methods().len(), 2);
    assert!(Counter::parent().is_none());

    let bus = EventBus::new();
    let counter = Arc::new(Counter::default());
    bus.register(&counter).unwrap();
    bus.post(Ping).unwrap();
    assert_eq!(counter.helper(), 1);
}
