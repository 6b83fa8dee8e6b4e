//! End-to-end sessions against a scripted host over the loopback transport.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use objlink_client::Channel;
use objlink_transport::{pair, LoopbackEndpoint, MessageTransport};
use objlink_wire::{Message, ObjectDescriptor};
use serde_json::{json, Value};

/// Minimal host side of the protocol: answers the init request with a fixed
/// object map, records everything the client sends, and lets tests push
/// responses, update batches, and signal emissions.
struct ScriptedHost {
    endpoint: LoopbackEndpoint,
    received: Rc<RefCell<Vec<Message>>>,
}

impl ScriptedHost {
    fn new(endpoint: LoopbackEndpoint, objects: HashMap<String, ObjectDescriptor>) -> Self {
        let received = Rc::new(RefCell::new(Vec::new()));
        let log = received.clone();
        let reply_from = endpoint.clone();
        endpoint.set_on_message(Box::new(move |payload| {
            let message = Message::decode(&payload).expect("client sent invalid message");
            if message == Message::InitRequest {
                let response = Message::InitResponse {
                    objects: objects.clone(),
                };
                reply_from
                    .send(&response.encode().expect("init response should encode"))
                    .expect("init response should send");
            }
            log.borrow_mut().push(message);
        }));
        Self { endpoint, received }
    }

    fn send(&self, message: Message) {
        self.endpoint
            .send(&message.encode().expect("host message should encode"))
            .expect("host send should succeed");
    }

    fn respond(&self, id: u64, data: Value) {
        self.send(Message::Response { id, data });
    }

    fn push_update(&self, object: &str, property: &str, value: Value) {
        let mut updates = HashMap::new();
        let mut map = HashMap::new();
        map.insert(property.to_string(), value);
        updates.insert(object.to_string(), map);
        self.send(Message::PropertyUpdateBatch { updates });
    }

    fn emit(&self, object: &str, signal: i32, args: Vec<Value>) {
        self.send(Message::SignalEmission {
            object: object.to_string(),
            signal,
            args,
        });
    }

    fn invocations(&self) -> Vec<(u64, String, i32, Vec<Value>)> {
        self.received
            .borrow()
            .iter()
            .filter_map(|message| match message {
                Message::InvokeMethod {
                    id,
                    object,
                    method,
                    args,
                } => Some((*id, object.clone(), *method, args.clone())),
                _ => None,
            })
            .collect()
    }

    fn property_writes(&self) -> Vec<(String, String, Value)> {
        self.received
            .borrow()
            .iter()
            .filter_map(|message| match message {
                Message::PropertyWrite {
                    object,
                    property,
                    value,
                } => Some((object.clone(), property.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }
}

fn calc_objects() -> HashMap<String, ObjectDescriptor> {
    let mut objects = HashMap::new();
    objects.insert(
        "calc".to_string(),
        ObjectDescriptor::new()
            .with_method("add", 0)
            .with_property("total", json!(0))
            .with_signal("totalChanged", 1),
    );
    objects
}

fn open_session(objects: HashMap<String, ObjectDescriptor>) -> (Channel, ScriptedHost) {
    let (client_end, host_end) = pair();
    let host = ScriptedHost::new(host_end, objects);
    let channel = Channel::open(Rc::new(client_end), |_| {}).expect("channel should open");
    assert!(channel.is_ready(), "scripted host answers init synchronously");
    (channel, host)
}

#[test]
fn calculator_round_trip() {
    let (channel, host) = open_session(calc_objects());
    let calc = channel.object("calc").expect("calc should be registered");

    // Before any traffic the cache holds the descriptor's seed value.
    assert_eq!(calc.property("total"), Some(json!(0)));

    let result = Rc::new(RefCell::new(None));
    let sink = result.clone();
    calc.call_with("add", vec![json!(2), json!(3)], move |data| {
        *sink.borrow_mut() = Some(data);
    })
    .expect("call should send");

    assert_eq!(
        host.invocations(),
        vec![(1, "calc".to_string(), 0, vec![json!(2), json!(3)])]
    );
    assert!(result.borrow().is_none());

    host.respond(1, json!(5));
    assert_eq!(*result.borrow(), Some(json!(5)));

    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = changes.clone();
    calc.on_property_changed("total", move |args| {
        log.borrow_mut().extend(args.to_vec());
    });

    host.push_update("calc", "total", json!(5));
    assert_eq!(calc.property("total"), Some(json!(5)));
    assert_eq!(*changes.borrow(), vec![json!(5)]);
}

#[test]
fn property_write_is_eventually_consistent() {
    let (channel, host) = open_session(calc_objects());
    let calc = channel.object("calc").expect("calc should be registered");

    calc.set_property("total", json!(42)).expect("write should send");

    // The write went out as a request and did not touch the cache.
    assert_eq!(
        host.property_writes(),
        vec![("calc".to_string(), "total".to_string(), json!(42))]
    );
    assert_eq!(calc.property("total"), Some(json!(0)));

    // Only the host's confirmation moves the cache.
    host.push_update("calc", "total", json!(42));
    assert_eq!(calc.property("total"), Some(json!(42)));
}

#[test]
fn signal_emission_reaches_subscribers_in_connect_order() {
    let (channel, host) = open_session(calc_objects());
    let calc = channel.object("calc").expect("calc should be registered");

    let order = Rc::new(RefCell::new(Vec::new()));
    let first = order.clone();
    calc.connect("totalChanged", move |args| {
        first.borrow_mut().push(("first", args.to_vec()));
    })
    .expect("signal should exist");
    let second = order.clone();
    let duplicate = calc
        .connect("totalChanged", move |args| {
            second.borrow_mut().push(("second", args.to_vec()));
        })
        .expect("signal should exist");

    host.emit("calc", 1, vec![json!(7), json!("carry")]);
    assert_eq!(
        *order.borrow(),
        vec![
            ("first", vec![json!(7), json!("carry")]),
            ("second", vec![json!(7), json!("carry")]),
        ]
    );

    assert!(calc.disconnect(duplicate));
    host.emit("calc", 1, vec![json!(8)]);
    assert_eq!(order.borrow().len(), 3);
    assert_eq!(order.borrow()[2], ("first", vec![json!(8)]));
}

#[test]
fn batch_with_unknown_object_still_applies_to_known_ones() {
    let (channel, host) = open_session(calc_objects());
    let calc = channel.object("calc").expect("calc should be registered");

    let mut updates = HashMap::new();
    let mut ghost = HashMap::new();
    ghost.insert("x".to_string(), json!(true));
    updates.insert("ghost".to_string(), ghost);
    let mut known = HashMap::new();
    known.insert("total".to_string(), json!(11));
    updates.insert("calc".to_string(), known);
    host.send(Message::PropertyUpdateBatch { updates });

    assert_eq!(calc.property("total"), Some(json!(11)));
}

#[test]
fn multiple_objects_are_routed_independently() {
    let mut objects = calc_objects();
    objects.insert(
        "clock".to_string(),
        ObjectDescriptor::new()
            .with_property("time", json!("00:00"))
            .with_signal("tick", 0),
    );
    let (channel, host) = open_session(objects);

    assert_eq!(channel.object_names(), vec!["calc", "clock"]);
    let clock = channel.object("clock").expect("clock should be registered");

    let ticks = Rc::new(RefCell::new(0));
    let count = ticks.clone();
    clock
        .connect("tick", move |_| *count.borrow_mut() += 1)
        .expect("signal should exist");

    host.emit("clock", 0, vec![]);
    host.emit("calc", 1, vec![json!(1)]); // different object, same-shaped index space
    host.push_update("clock", "time", json!("00:01"));

    assert_eq!(*ticks.borrow(), 1);
    assert_eq!(clock.property("time"), Some(json!("00:01")));
    assert_eq!(
        channel.object("calc").expect("calc should be registered").property("total"),
        Some(json!(0))
    );
}

#[test]
fn responses_interleaved_with_unrelated_traffic_resolve_correctly() {
    let (channel, host) = open_session(calc_objects());
    let calc = channel.object("calc").expect("calc should be registered");

    let results = Rc::new(RefCell::new(Vec::new()));
    for n in 0..3 {
        let sink = results.clone();
        calc.call_with("add", vec![json!(n)], move |data| {
            sink.borrow_mut().push(data);
        })
        .expect("call should send");
    }

    // Out-of-order responses with interleaved updates and signals.
    host.respond(2, json!("second"));
    host.push_update("calc", "total", json!(99));
    host.respond(3, json!("third"));
    host.emit("calc", 1, vec![]);
    host.respond(1, json!("first"));

    assert_eq!(
        *results.borrow(),
        vec![json!("second"), json!("third"), json!("first")]
    );
    assert_eq!(calc.property("total"), Some(json!(99)));
}

#[test]
fn ready_callback_can_use_the_channel_immediately() {
    let (client_end, host_end) = pair();
    let host = ScriptedHost::new(host_end, calc_objects());

    let called_from_ready = Rc::new(RefCell::new(false));
    let flag = called_from_ready.clone();
    let _channel = Channel::open(
        Rc::new(client_end),
        move |channel| {
            let calc = channel.object("calc").expect("calc visible in ready callback");
            calc.call("add", vec![json!(1), json!(1)])
                .expect("call from ready callback should send");
            *flag.borrow_mut() = true;
        },
    )
    .expect("channel should open");

    assert!(*called_from_ready.borrow());
    assert_eq!(host.invocations().len(), 1);
}
