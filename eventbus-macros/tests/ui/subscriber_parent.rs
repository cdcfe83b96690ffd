use eventbus_core::{Subscriber as _, SubscriberClass};
use eventbus_macros::{Event, subscriber};

#[derive(Debug, Event)]
struct Ping;

#[derive(Default)]
struct Base;

#[subscriber]
impl Base {
    #[subscribe(priority = -1)]
    fn on_ping(&self, _event: &Ping) {}
}

#[derive(Default)]
struct Child {
    base: Base,
}

impl AsRef<Base> for Child {
    fn as_ref(&self) -> &Base {
        &self.base
    }
}

#[subscriber(parent = Base)]
impl Child {}

fn main() {
    assert!(Child::parent().is_some());
    assert!(SubscriberClass::of::<Child>().handler_methods().is_empty());
    let _ = Child::default();
}
