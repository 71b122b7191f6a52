use std::sync::Mutex;

use super::*;

type Log = Arc<Mutex<Vec<String>>>;

fn recording_consumer(log: &Log, name: &str) -> Arc<dyn Consumer> {
    let log = log.clone();
    let name = name.to_string();
    Arc::new(move |data: &[u8]| {
        log.lock()
            .unwrap()
            .push(format!("{name}:{}", String::from_utf8_lossy(data)));
    })
}

fn recording_subscriber(log: &Log, name: &str) -> Arc<dyn Subscriber> {
    let log = log.clone();
    let name = name.to_string();
    Arc::new(move || log.lock().unwrap().push(name.clone()))
}

#[test]
fn consumer_runs_before_subscribers_in_registration_order() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.register_subscriber("desktop", recording_subscriber(&log, "sub-1"));
    registry
        .register_consumer("desktop", recording_consumer(&log, "consumer"))
        .unwrap();
    registry.register_subscriber("desktop", recording_subscriber(&log, "sub-2"));
    registry.register_subscriber("desktop", recording_subscriber(&log, "sub-3"));

    registry.dispatch("desktop", b"payload");

    assert_eq!(
        *log.lock().unwrap(),
        vec!["consumer:payload", "sub-1", "sub-2", "sub-3"]
    );
}

#[test]
fn second_consumer_is_rejected_and_first_stays_bound() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry
        .register_consumer("agent_flags", recording_consumer(&log, "first"))
        .unwrap();

    let err = registry
        .register_consumer("agent_flags", recording_consumer(&log, "second"))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::AlreadyRegistered { ref subsystem } if subsystem == "agent_flags"
    ));

    registry.dispatch("agent_flags", b"x");
    assert_eq!(*log.lock().unwrap(), vec!["first:x"]);
}

#[test]
fn subscribers_are_pinged_without_a_consumer() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    let sub = recording_subscriber(&log, "sub");
    registry.register_subscriber("katc", sub.clone());
    registry.register_subscriber("katc", sub);

    registry.dispatch("katc", b"ignored");

    assert!(!registry.has_consumer("katc"));
    assert_eq!(registry.subscriber_count("katc"), 2);
    assert_eq!(*log.lock().unwrap(), vec!["sub", "sub"]);
}

#[test]
fn dispatch_for_unknown_subsystem_is_a_no_op() {
    let registry = Registry::new();
    registry.dispatch("nobody", b"data");
    assert_eq!(registry.subscriber_count("nobody"), 0);
}

#[test]
fn panicking_consumer_does_not_stop_subscribers() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry
        .register_consumer(
            "desktop",
            Arc::new(|_: &[u8]| panic!("consumer blew up")),
        )
        .unwrap();
    registry.register_subscriber("desktop", recording_subscriber(&log, "sub"));

    registry.dispatch("desktop", b"data");

    assert_eq!(*log.lock().unwrap(), vec!["sub"]);
}
