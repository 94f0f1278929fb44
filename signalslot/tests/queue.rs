mod common;

use common::watcher;
use signalslot::*;

#[test]
fn test_flush_calls_slot_twice_in_order() {
    let signal_a = Signal::new();
    let (record, check) = watcher();
    signal_a.connect(move |kwargs: &Kwargs| record(kwargs.clone())).unwrap();

    let mut queue = Queue::new();
    queue.queue(&signal_a, kwargs! {});
    queue.queue(&signal_a, kwargs! { "x" => 1 });
    assert!(check().is_empty());

    queue.flush().unwrap();
    assert_eq!(check(), vec![kwargs! {}, kwargs! { "x" => 1 }]);
}

#[test]
fn test_flush_mixed_signals() {
    let (record, check) = watcher();
    let record = std::sync::Arc::new(record);
    let first = Signal::builder().name("first").build_threadsafe();
    let second = Signal::builder().name("second").build_threadsafe();
    for signal in [&first, &second] {
        let record = record.clone();
        let name = signal.name().unwrap_or_default().to_owned();
        signal.connect(move |_: &Kwargs| record(name.clone())).unwrap();
    }

    let mut queue = Queue::default();
    queue.queue(&second, kwargs! {});
    queue.queue(&first, kwargs! {});
    queue.queue(&second, kwargs! {});
    queue.flush().unwrap();

    assert_eq!(check(), ["second", "first", "second"]);
}
