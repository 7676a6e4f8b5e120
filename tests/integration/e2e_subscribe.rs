//! A subscribe whose response carries two messages, drained in order
//! via `get`/`get_channel`.

#[path = "../support/mock_http.rs"]
mod mock_http;

use mock_http::{MockHttpServer, ScriptedResponse};
use pubsub_core::{Context, ContextConfig, NotifyMode, Outcome};

#[test]
fn subscribe_seeded_stream_yields_both_messages_in_order() {
    mock_http::init_tracing();
    let body = br#"{"t":{"t":"15012345678901234"},"m":[{"c":"ch","d":"Test 1"},{"c":"ch","d":"Test 1 - 2"}]}"#;
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(&body[..])]);

    let mut config = ContextConfig::new("demo", "demo");
    config.origin_host = "127.0.0.1".to_owned();
    config.use_tls = false;
    config.origin_port = Some(server.addr().port());
    config.use_os_resolver = true;
    let ctx = Context::init(config, NotifyMode::Sync);

    let outcome = ctx.subscribe("ch", "");

    assert_eq!(outcome, Outcome::Ok);
    assert_eq!(ctx.get(), Some(b"Test 1".to_vec()));
    assert_eq!(ctx.get_channel(), Some("ch".to_owned()));
    assert_eq!(ctx.get(), Some(b"Test 1 - 2".to_vec()));
    assert_eq!(ctx.get(), None);
}
