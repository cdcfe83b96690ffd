use eventbus_core::{
    EventBus, EventBusConfig, LoopMainThreadSupport, MainLoop, ThreadMainLoop, TokioExecutor,
};
use eventbus_macros::{Event, subscriber};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("eventbus=debug")
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Event)]
struct Work(u32);

struct Observed {
    value: u32,
    thread: ThreadId,
}

struct Recorder {
    tx: Mutex<mpsc::Sender<Observed>>,
}

impl Recorder {
    fn new() -> (Arc<Self>, mpsc::Receiver<Observed>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Self { tx: Mutex::new(tx) }), rx)
    }

    fn record(&self, event: &Work) {
        let _ = self.tx.lock().unwrap().send(Observed {
            value: event.0,
            thread: thread::current().id(),
        });
    }
}

fn collect(rx: &mpsc::Receiver<Observed>, count: usize) -> Vec<Observed> {
    (0..count).map(|_| rx.recv_timeout(WAIT).unwrap()).collect()
}

struct BackgroundWorker(Arc<Recorder>);

#[subscriber]
impl BackgroundWorker {
    #[subscribe(thread_mode = Background)]
    fn on_work(&self, event: &Work) {
        self.0.record(event);
    }
}

struct AsyncWorker(Arc<Recorder>);

#[subscriber]
impl AsyncWorker {
    #[subscribe(thread_mode = Async)]
    fn on_work(&self, event: &Work) {
        self.0.record(event);
    }
}

struct MainWorker(Arc<Recorder>);

#[subscriber]
impl MainWorker {
    #[subscribe(thread_mode = Main)]
    fn on_work(&self, event: &Work) {
        self.0.record(event);
    }
}

struct OrderedWorker(Arc<Recorder>);

#[subscriber]
impl OrderedWorker {
    #[subscribe(thread_mode = MainOrdered)]
    fn on_work(&self, event: &Work) {
        self.0.record(event);
    }
}

#[test]
fn background_delivery_is_serial_and_off_the_posting_thread() {
    init_tracing();
    let bus = EventBus::new();
    let (recorder, rx) = Recorder::new();
    bus.register(&Arc::new(BackgroundWorker(recorder))).unwrap();

    for i in 0..50 {
        bus.post(Work(i)).unwrap();
    }
    let observed = collect(&rx, 50);
    assert_eq!(
        observed.iter().map(|o| o.value).collect::<Vec<_>>(),
        (0..50).collect::<Vec<_>>()
    );
    assert!(observed.iter().all(|o| o.thread != thread::current().id()));
}

#[test]
fn background_worker_restarts_after_going_idle() {
    let bus = EventBus::with_config(
        EventBusConfig::builder()
            .background_poll_timeout(Duration::from_millis(10))
            .build(),
    );
    let (recorder, rx) = Recorder::new();
    bus.register(&Arc::new(BackgroundWorker(recorder))).unwrap();

    bus.post(Work(1)).unwrap();
    assert_eq!(collect(&rx, 1)[0].value, 1);
    thread::sleep(Duration::from_millis(100));
    bus.post(Work(2)).unwrap();
    assert_eq!(collect(&rx, 1)[0].value, 2);
}

#[test]
fn async_delivery_runs_every_event_on_the_executor() {
    let bus = EventBus::new();
    let (recorder, rx) = Recorder::new();
    bus.register(&Arc::new(AsyncWorker(recorder))).unwrap();

    for i in 0..20 {
        bus.post(Work(i)).unwrap();
    }
    let mut values: Vec<u32> = collect(&rx, 20).into_iter().map(|o| o.value).collect();
    values.sort_unstable();
    assert_eq!(values, (0..20).collect::<Vec<_>>());
}

#[test]
fn without_main_thread_support_main_modes_run_inline() {
    let bus = EventBus::new();
    let (main_recorder, main_rx) = Recorder::new();
    let (ordered_recorder, ordered_rx) = Recorder::new();
    bus.register(&Arc::new(MainWorker(main_recorder))).unwrap();
    bus.register(&Arc::new(OrderedWorker(ordered_recorder)))
        .unwrap();

    bus.post(Work(1)).unwrap();
    // 同步完成，无需等待
    let main = main_rx.try_recv().unwrap();
    let ordered = ordered_rx.try_recv().unwrap();
    assert_eq!(main.thread, thread::current().id());
    assert_eq!(ordered.thread, thread::current().id());
}

fn main_loop_bus(budget: Duration) -> (EventBus, Arc<ThreadMainLoop>) {
    let main_loop = ThreadMainLoop::spawn("test-main").unwrap();
    let support = LoopMainThreadSupport::with_budget(main_loop.clone(), budget);
    let bus = EventBus::with_config(
        EventBusConfig::builder()
            .main_thread_support(Arc::new(support))
            .build(),
    );
    (bus, main_loop)
}

#[test]
fn main_mode_hops_to_the_main_loop_from_other_threads() {
    init_tracing();
    let (bus, main_loop) = main_loop_bus(Duration::from_millis(10));
    let (recorder, rx) = Recorder::new();
    bus.register(&Arc::new(MainWorker(recorder))).unwrap();

    for i in 0..10 {
        bus.post(Work(i)).unwrap();
    }
    let observed = collect(&rx, 10);
    assert_eq!(
        observed.iter().map(|o| o.value).collect::<Vec<_>>(),
        (0..10).collect::<Vec<_>>()
    );
    assert!(observed.iter().all(|o| o.thread == main_loop.thread_id()));
}

#[test]
fn main_and_main_ordered_differ_when_posting_on_the_main_loop() {
    let (bus, main_loop) = main_loop_bus(Duration::from_millis(10));
    let (main_recorder, main_rx) = Recorder::new();
    let (ordered_recorder, ordered_rx) = Recorder::new();
    bus.register(&Arc::new(MainWorker(main_recorder))).unwrap();
    bus.register(&Arc::new(OrderedWorker(ordered_recorder)))
        .unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let posting_bus = bus.clone();
    assert!(main_loop.schedule(Box::new(move || {
        posting_bus.post(Work(7)).unwrap();
        // Main 已同步执行，MainOrdered 仍在排队
        let main_seen = main_rx.try_recv().is_ok();
        let ordered_seen = ordered_rx.try_recv().is_ok();
        let _ = done_tx.send((main_seen, ordered_seen, ordered_rx));
    })));

    let (main_seen, ordered_seen, ordered_rx) = done_rx.recv_timeout(WAIT).unwrap();
    assert!(main_seen);
    assert!(!ordered_seen);
    let ordered = ordered_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(ordered.value, 7);
    assert_eq!(ordered.thread, main_loop.thread_id());
}

#[test]
fn background_from_a_non_main_thread_runs_inline() {
    let (bus, _main_loop) = main_loop_bus(Duration::from_millis(10));
    let (recorder, rx) = Recorder::new();
    bus.register(&Arc::new(BackgroundWorker(recorder))).unwrap();

    bus.post(Work(3)).unwrap();
    let observed = rx.try_recv().unwrap();
    assert_eq!(observed.value, 3);
    assert_eq!(observed.thread, thread::current().id());
}

#[test]
fn zero_budget_drains_one_event_per_turn_without_losing_order() {
    init_tracing();
    let (bus, main_loop) = main_loop_bus(Duration::ZERO);
    let (recorder, rx) = Recorder::new();
    bus.register(&Arc::new(OrderedWorker(recorder))).unwrap();

    for i in 0..25 {
        bus.post(Work(i)).unwrap();
    }
    let observed = collect(&rx, 25);
    assert_eq!(
        observed.iter().map(|o| o.value).collect::<Vec<_>>(),
        (0..25).collect::<Vec<_>>()
    );
    assert!(observed.iter().all(|o| o.thread == main_loop.thread_id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_executor_drives_async_delivery() {
    init_tracing();
    let executor = TokioExecutor::current().unwrap();
    let bus = EventBus::with_config(
        EventBusConfig::builder()
            .executor(Arc::new(executor))
            .build(),
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    struct Forwarder(tokio::sync::mpsc::UnboundedSender<u32>);

    #[subscriber]
    impl Forwarder {
        #[subscribe(thread_mode = Async)]
        fn on_work(&self, event: &Work) {
            let _ = self.0.send(event.0);
        }
    }

    bus.register(&Arc::new(Forwarder(tx))).unwrap();
    for i in 0..5 {
        bus.post(Work(i)).unwrap();
    }

    let mut values = Vec::new();
    for _ in 0..5 {
        let value = tokio::time::timeout(WAIT, rx.recv())
            .await
            .unwrap()
            .unwrap();
        values.push(value);
    }
    values.sort_unstable();
    assert_eq!(values, [0, 1, 2, 3, 4]);
}
