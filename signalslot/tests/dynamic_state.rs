mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use signalslot::contrib::{Attributes, DynamicState, FETCH_ATTRIBUTE_ARGS};
use signalslot::*;

#[derive(Default, Serialize)]
struct Host {
    name: String,
    #[serde(skip)]
    attributes: Attributes,
}
dynamic_state!(Host, attributes);

#[test]
fn test_first_provider_wins_and_is_cached() {
    let fetches = Arc::new(AtomicUsize::new(0));

    let declining = Slot::new(|_: &Kwargs| ()).with_signature(Signature::keywords(FETCH_ATTRIBUTE_ARGS));
    let address = {
        let fetches = fetches.clone();
        Slot::new(move |kwargs: &Kwargs| -> Option<Value> {
            if kwargs["name"] != "address" {
                return None;
            }
            fetches.fetch_add(1, Ordering::SeqCst);
            let host = kwargs["obj"]["name"].as_str()?;
            Some(Value::from(format!("{host}.example.net")))
        })
        .with_signature(Signature::keywords(FETCH_ATTRIBUTE_ARGS))
    };
    Host::fetch_attribute().connect(declining).unwrap();
    Host::fetch_attribute().connect(address).unwrap();

    let host = Host { name: "db1".to_owned(), ..Default::default() };
    assert_eq!(host.attribute("address").unwrap(), "db1.example.net");
    assert_eq!(host.attribute("address").unwrap(), "db1.example.net");
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let err = host.attribute("uptime").unwrap_err();
    assert_eq!(err.to_string(), format!("{} has no attribute uptime", std::any::type_name::<Host>()));
}

#[test]
fn test_fetch_attribute_declares_its_args() {
    let signal = Host::fetch_attribute();
    assert_eq!(signal.args(), FETCH_ATTRIBUTE_ARGS);

    let err = signal.connect(|_: &Kwargs| ()).unwrap_err();
    assert!(matches!(err, SignalSlotError::IncompatibleSlotSignature { .. }));
}
