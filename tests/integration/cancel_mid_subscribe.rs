//! Cancelling a subscribe after the request is sent but before any
//! response byte arrives lands a `CANCELLED` outcome without touching
//! the stored timetoken.

#[path = "../support/mock_http.rs"]
mod mock_http;

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use mock_http::{MockHttpServer, ScriptedResponse};
use pubsub_core::{Context, ContextConfig, NotifyMode, Outcome};

#[test]
fn cancel_during_long_poll_yields_cancelled_outcome() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::Hang]);

    let mut config = ContextConfig::new("demo", "demo");
    config.origin_host = "127.0.0.1".to_owned();
    config.use_tls = false;
    config.origin_port = Some(server.addr().port());
    config.use_os_resolver = true;

    let done: Arc<(Mutex<Option<Outcome>>, Condvar)> = Arc::new((Mutex::new(None), Condvar::new()));
    let done_in_callback = Arc::clone(&done);
    let notify = NotifyMode::Callback(Arc::new(move |_kind, outcome| {
        let (lock, cvar) = &*done_in_callback;
        *lock.lock().unwrap() = Some(outcome);
        cvar.notify_all();
    }));

    let ctx = Context::init(config, notify);

    let started = ctx.subscribe("ch", "");
    assert_eq!(started, Outcome::Started);

    std::thread::sleep(Duration::from_millis(50));
    ctx.cancel();

    let (lock, cvar) = &*done;
    let guard = lock.lock().unwrap();
    let (guard, timed_out) = cvar
        .wait_timeout_while(guard, Duration::from_secs(2), |o| o.is_none())
        .unwrap();
    assert!(!timed_out.timed_out(), "callback never fired");
    assert_eq!(*guard, Some(Outcome::Cancelled));
    drop(guard);

    ctx.free();
    assert_eq!(ctx.last_result(), Outcome::Cancelled);
    assert_eq!(ctx.timetoken(), "0");
}
