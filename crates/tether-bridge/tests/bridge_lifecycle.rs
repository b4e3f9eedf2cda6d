//! Lifecycle, identity, and threading-contract tests for the engine bridge
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;

use tether_bridge::{
    BridgeError, EngineBridge, EngineJob, HostTransport, InteropMediator, JsObjectHandle,
};

/// Transport that runs jobs inline; enough for tests that stay on one thread.
struct InlineTransport;

impl HostTransport for InlineTransport {
    fn dispatch(&self, job: EngineJob) {
        job();
    }

    fn label(&self) -> &str {
        "inline"
    }
}

/// Transport that forwards jobs over a channel to wherever the engine loop
/// happens to run.
struct ChannelTransport {
    jobs: Sender<EngineJob>,
}

impl HostTransport for ChannelTransport {
    fn dispatch(&self, job: EngineJob) {
        self.jobs.send(job).expect("engine loop must be alive");
    }

    fn label(&self) -> &str {
        "channel"
    }
}

#[derive(Default)]
struct QuietMediator;

impl InteropMediator for QuietMediator {
    fn module_registered(&self, _name: &str) {}
}

fn build_bridge() -> EngineBridge {
    EngineBridge::builder()
        .transport(Arc::new(InlineTransport))
        .mediator(Arc::new(QuietMediator))
        .build()
        .expect("bridge construction must succeed")
}

#[test]
fn test_missing_transport_yields_precondition_error() {
    let outcome = EngineBridge::builder()
        .mediator(Arc::new(QuietMediator))
        .build();
    assert!(matches!(outcome, Err(BridgeError::Precondition(_))));
}

#[test]
fn test_global_identity_is_stable_across_many_calls() {
    let mut bridge = build_bridge();
    let first = bridge.global().unwrap();
    for _ in 0..16 {
        let next = bridge.global().unwrap();
        assert!(first.same_value(&next));
    }
}

#[test]
fn test_fresh_allocations_never_alias() {
    let mut bridge = build_bridge();
    let mut seen: Vec<JsObjectHandle> = Vec::new();
    for _ in 0..32 {
        let handle = bridge.create_object().unwrap();
        assert!(seen.iter().all(|earlier| !earlier.same_value(&handle)));
        seen.push(handle);
    }
}

#[test]
fn test_every_operation_fails_after_teardown() {
    let mut bridge = build_bridge();
    let held = bridge.create_object().unwrap();
    bridge.teardown();

    assert!(matches!(bridge.global(), Err(BridgeError::NotInitialized)));
    assert!(matches!(
        bridge.main_object(),
        Err(BridgeError::NotInitialized)
    ));
    assert!(matches!(
        bridge.create_object(),
        Err(BridgeError::NotInitialized)
    ));
    assert!(matches!(
        bridge.register_module_object(&held, "Tardy"),
        Err(BridgeError::NotInitialized)
    ));
    assert!(matches!(
        bridge.module_object("Tardy"),
        Err(BridgeError::NotInitialized)
    ));
    assert!(matches!(
        bridge.eval("({})"),
        Err(BridgeError::NotInitialized)
    ));
    assert!(matches!(
        bridge.to_json(&held),
        Err(BridgeError::NotInitialized)
    ));
}

#[test]
fn test_mediator_hears_about_teardown_once() {
    struct ClosureCounter {
        closed: Mutex<u32>,
    }

    impl InteropMediator for ClosureCounter {
        fn module_registered(&self, _name: &str) {}

        fn bridge_closed(&self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    let mediator = Arc::new(ClosureCounter {
        closed: Mutex::new(0),
    });
    let mut bridge = EngineBridge::builder()
        .transport(Arc::new(InlineTransport))
        .mediator(Arc::clone(&mediator) as Arc<dyn InteropMediator>)
        .build()
        .unwrap();

    bridge.teardown();
    bridge.teardown();
    drop(bridge);
    assert_eq!(*mediator.closed.lock().unwrap(), 1);
}

#[test]
fn test_transport_delivers_jobs_to_the_engine_loop() {
    let (jobs, job_queue) = channel::<EngineJob>();
    let transport = Arc::new(ChannelTransport { jobs });
    let touched = Arc::new(AtomicBool::new(false));

    let mut bridge = EngineBridge::builder()
        .transport(Arc::clone(&transport) as Arc<dyn HostTransport>)
        .mediator(Arc::new(QuietMediator))
        .build()
        .unwrap();
    assert_eq!(bridge.transport().label(), "channel");

    // A foreign thread queues work through the transport instead of touching
    // the engine directly.
    let flag = Arc::clone(&touched);
    let producer = thread::spawn(move || {
        transport.dispatch(Box::new(move || flag.store(true, Ordering::SeqCst)));
    });
    producer.join().unwrap();

    // The engine loop drains the queue between bridge operations.
    while let Ok(job) = job_queue.try_recv() {
        job();
    }
    assert!(touched.load(Ordering::SeqCst));
    assert!(bridge.eval("true").unwrap().as_boolean() == Some(true));
}

#[test]
fn test_handles_cross_threads_as_opaque_tokens() {
    enum Command {
        Create,
        Register(JsObjectHandle, String),
        Stop,
    }

    let (commands, command_queue) = channel::<Command>();
    let (replies, reply_queue) = channel::<JsObjectHandle>();

    // The bridge is confined to the engine thread; only handles travel.
    let engine = thread::spawn(move || {
        let mut bridge = build_bridge();
        for command in command_queue {
            match command {
                Command::Create => {
                    replies.send(bridge.create_object().unwrap()).unwrap();
                }
                Command::Register(handle, name) => {
                    bridge.register_module_object(&handle, &name).unwrap();
                }
                Command::Stop => break,
            }
        }
        bridge.eval("typeof host.Remote").unwrap().as_str() == Some("object")
    });

    commands.send(Command::Create).unwrap();
    let token = reply_queue.recv().unwrap();
    let keep_alive = token.clone();
    drop(token);

    commands
        .send(Command::Register(keep_alive, "Remote".to_owned()))
        .unwrap();
    commands.send(Command::Stop).unwrap();
    assert!(engine.join().unwrap());
}
