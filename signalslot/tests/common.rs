use std::sync::{Arc, Mutex};

use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init(); }

/// Returns a recorder to call from slots, and a check draining everything recorded so far.
#[allow(unused)]
pub fn watcher<T: Send + 'static>() -> (Box<dyn Fn(T) + Send + Sync>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let calls = calls.clone();
        Box::new(move |value: T| {
            calls.lock().unwrap().push(value);
        })
    };

    let check = Box::new(move || {
        let calls: Vec<T> = calls.lock().unwrap().drain(..).collect();
        calls
    });

    (watcher, check)
}
