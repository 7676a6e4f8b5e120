//! While one operation is in flight on a context, a second overlapping
//! operation is rejected with `IN_PROGRESS` and does not disturb the
//! first transaction.

#[path = "../support/mock_http.rs"]
mod mock_http;

use std::time::Duration;

use mock_http::{MockHttpServer, ScriptedResponse};
use pubsub_core::{Context, ContextConfig, NotifyMode, Outcome, PublishOptions};

#[test]
fn second_overlapping_operation_is_rejected_without_disturbing_the_first() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::Hang]);

    let mut config = ContextConfig::new("demo", "demo");
    config.origin_host = "127.0.0.1".to_owned();
    config.use_tls = false;
    config.origin_port = Some(server.addr().port());
    config.use_os_resolver = true;
    let ctx = Context::init(config, NotifyMode::Callback(std::sync::Arc::new(|_, _| {})));

    let first = ctx.subscribe("ch", "");
    assert_eq!(first, Outcome::Started);

    // Give the worker thread time to actually send the request and
    // block on the hung connection before probing the invariant.
    std::thread::sleep(Duration::from_millis(50));

    let second = ctx.publish("ch", "\"x\"", &PublishOptions::default());
    assert_eq!(second, Outcome::InProgress);

    let third = ctx.time();
    assert_eq!(third, Outcome::InProgress);

    ctx.free();
}
