use eventbus_core::{Event as _, SupertypeKind};
use eventbus_macros::Event;

#[derive(Debug, Event)]
struct Audited {
    actor: String,
}

#[derive(Debug, Event)]
struct Base {
    code: u32,
}

#[derive(Debug, Event)]
struct Transferred {
    #[event(interface)]
    audit: Audited,
    #[event(parent)]
    base: Base,
    amount: u64,
}

#[derive(Debug, Event)]
struct Wrapped(#[event(parent)] Base, u8);

fn main() {
    let supertypes = Transferred::supertypes();
    assert_eq!(supertypes.len(), 2);
    assert_eq!(supertypes[0].kind(), SupertypeKind::Interface);
    assert_eq!(supertypes[1].kind(), SupertypeKind::Parent);

    let event = Transferred {
        audit: Audited { actor: "ops".into() },
        base: Base { code: 3 },
        amount: 10,
    };
    let base: &Base = event.as_ref();
    let audit: &Audited = event.as_ref();
    assert_eq!(base.code, 3);
    assert_eq!(audit.actor, "ops");
    assert_eq!(event.amount, 10);

    let wrapped = Wrapped(Base { code: 9 }, 0);
    let inner: &Base = wrapped.as_ref();
    assert_eq!(inner.code, 9);
    assert_eq!(wrapped.1, 0);
}
