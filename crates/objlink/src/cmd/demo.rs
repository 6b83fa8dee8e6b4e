//! A complete session against a scripted host, both ends in-process.
//!
//! The host exposes one `counter` object with an `add` method, a `total`
//! property, and a `milestone` signal. Every protocol stage of a real
//! session happens over the loopback transport: init, method invocation
//! with a correlated response, a property write with its confirming update
//! batch, and a host-initiated signal emission.

use std::cell::RefCell;
use std::rc::Rc;

use objlink_client::Channel;
use objlink_transport::{pair, LoopbackEndpoint, MessageTransport};
use objlink_wire::{Message, ObjectDescriptor};
use serde_json::{json, Value};

use crate::cmd::DemoArgs;
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

const COUNTER_OBJECT: &str = "counter";
const ADD_METHOD: i32 = 0;
const MILESTONE_SIGNAL: i32 = 1;

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let (client_end, host_end) = pair();
    install_counter_host(host_end, args.milestone);

    let channel = Channel::open(
        Rc::new(client_end),
        move |channel| {
            tracing::info!(objects = channel.object_names().len(), "session ready");
        },
    )
    .map_err(|err| client_error("open failed", err))?;

    let counter = channel
        .object(COUNTER_OBJECT)
        .ok_or_else(|| CliError::new(INTERNAL, "host did not expose the counter object"))?;
    print_event(
        "ready",
        &format!(
            "object '{}' with methods {:?}",
            counter.name(),
            counter.method_names()
        ),
        format,
    );

    counter.on_property_changed("total", move |values| {
        for value in values {
            print_event("total-updated", &value.to_string(), format);
        }
    });
    counter
        .connect("milestone", move |values| {
            print_event("milestone", &format!("reached at {values:?}"), format);
        })
        .map_err(|err| client_error("connect failed", err))?;

    for value in &args.values {
        let value = *value;
        counter
            .call_with("add", vec![json!(value)], move |data| {
                print_event("add-returned", &format!("add({value}) -> {data}"), format);
            })
            .map_err(|err| client_error("call failed", err))?;
    }

    print_event("reset-requested", "writing total = 0", format);
    counter
        .set_property("total", json!(0))
        .map_err(|err| client_error("property write failed", err))?;

    let final_total = counter
        .property("total")
        .unwrap_or(Value::Null)
        .to_string();
    print_event("final-total", &final_total, format);

    channel.close();
    Ok(SUCCESS)
}

/// Script the host side of the protocol on the given endpoint.
fn install_counter_host(endpoint: LoopbackEndpoint, milestone: i64) {
    let total = Rc::new(RefCell::new(0i64));
    let reply_from = endpoint.clone();

    endpoint.set_on_message(Box::new(move |payload| {
        let message = match Message::decode(&payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "demo host ignoring invalid message");
                return;
            }
        };

        match message {
            Message::InitRequest => {
                let mut objects = std::collections::HashMap::new();
                objects.insert(
                    COUNTER_OBJECT.to_string(),
                    ObjectDescriptor::new()
                        .with_method("add", ADD_METHOD)
                        .with_property("total", json!(*total.borrow()))
                        .with_signal("milestone", MILESTONE_SIGNAL),
                );
                host_send(&reply_from, &Message::InitResponse { objects });
            }
            Message::InvokeMethod {
                id,
                method: ADD_METHOD,
                args,
                ..
            } => {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                let new_total = {
                    let mut total = total.borrow_mut();
                    *total += sum;
                    *total
                };
                host_send(&reply_from, &Message::Response { id, data: json!(new_total) });
                confirm_total(&reply_from, new_total);
                if new_total >= milestone && new_total - sum < milestone {
                    host_send(
                        &reply_from,
                        &Message::SignalEmission {
                            object: COUNTER_OBJECT.to_string(),
                            signal: MILESTONE_SIGNAL,
                            args: vec![json!(new_total)],
                        },
                    );
                }
            }
            Message::PropertyWrite {
                property, value, ..
            } if property == "total" => {
                let new_total = value.as_i64().unwrap_or(0);
                *total.borrow_mut() = new_total;
                confirm_total(&reply_from, new_total);
            }
            other => {
                tracing::debug!(kind = other.kind(), "demo host ignoring message");
            }
        }
    }));
}

fn confirm_total(endpoint: &LoopbackEndpoint, new_total: i64) {
    let mut properties = std::collections::HashMap::new();
    properties.insert("total".to_string(), json!(new_total));
    let mut updates = std::collections::HashMap::new();
    updates.insert(COUNTER_OBJECT.to_string(), properties);
    host_send(endpoint, &Message::PropertyUpdateBatch { updates });
}

fn host_send(endpoint: &LoopbackEndpoint, message: &Message) {
    match message.encode() {
        Ok(text) => {
            if let Err(err) = endpoint.send(&text) {
                tracing::warn!(error = %err, "demo host send failed");
            }
        }
        Err(err) => tracing::warn!(error = %err, "demo host encode failed"),
    }
}
