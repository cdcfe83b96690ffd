use eventbus_macros::Event;

#[derive(Debug, Event)]
struct Opened {
    id: String,
}

#[derive(Debug, Event)]
enum Lifecycle {
    Started,
    Stopped { code: i32 },
}

fn main() {
    let _ = Opened { id: "a".into() }.id;
    let _ = Lifecycle::Stopped { code: 1 };
    let _ = Lifecycle::Started;
}
