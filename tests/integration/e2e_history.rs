//! `message_counts` places counts at the caller's channel-list indices,
//! using -1 for channels the server omitted.

#![cfg(feature = "advanced-history")]

#[path = "../support/mock_http.rs"]
mod mock_http;

use mock_http::{MockHttpServer, ScriptedResponse};
use pubsub_core::{Context, ContextConfig, NotifyMode, Outcome};

#[test]
fn message_counts_places_results_in_input_channel_order() {
    mock_http::init_tracing();
    let body = br#"{"error":false,"channels":{"a":3,"b":0}}"#;
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(&body[..])]);

    let mut config = ContextConfig::new("demo", "demo");
    config.origin_host = "127.0.0.1".to_owned();
    config.use_tls = false;
    config.origin_port = Some(server.addr().port());
    config.use_os_resolver = true;
    let ctx = Context::init(config, NotifyMode::Sync);

    let outcome = ctx.message_counts(&["a", "b", "c"], Some("16000000000000000"), None);

    assert_eq!(outcome, Outcome::Ok);
    assert_eq!(ctx.get_message_counts(), vec![3, 0, -1]);
    assert_eq!(
        ctx.get_channels_with_message_counts(10),
        vec![("a".to_owned(), 3), ("b".to_owned(), 0)]
    );
}
