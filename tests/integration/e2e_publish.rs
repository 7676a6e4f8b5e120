//! A publish that succeeds, a publish the server rejects with a
//! channel-name error, and method-aware request building (GET, POST,
//! POST with GZIP), each driven through the real transaction engine
//! against an in-process server.

#[path = "../support/mock_http.rs"]
mod mock_http;

use std::time::{Duration, Instant};

use mock_http::{MockHttpServer, ScriptedResponse};
use pubsub_core::{Context, ContextConfig, NotifyMode, Outcome, PublishFailure, PublishMethod, PublishOptions};

/// Polls for the mock server to have finished handling the one
/// connection the test drove, since the request handler runs on its
/// own thread slightly out of step with the client's own read loop.
fn wait_for_request_head(server: &MockHttpServer) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        if let Some(head) = server.last_request_head() {
            return head;
        }
        assert!(Instant::now() < deadline, "server never captured a request");
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn test_config(port: u16) -> ContextConfig {
    let mut config = ContextConfig::new("demo", "demo");
    config.origin_host = "127.0.0.1".to_owned();
    config.use_tls = false;
    config.origin_port = Some(port);
    config.use_os_resolver = true;
    config
}

#[test]
fn publish_success_reports_ok_and_http_200() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(
        &br#"[1,"Sent","15012345678901234"]"#[..],
    )]);
    let ctx = Context::init(test_config(server.addr().port()), NotifyMode::Sync);

    let outcome = ctx.publish("ch", "\"Hello\"", &PublishOptions::default());

    assert_eq!(outcome, Outcome::Ok);
    assert_eq!(ctx.last_http_code(), Some(200));
}

#[test]
fn publish_rejected_channel_name_reports_sub_reason_and_http_400() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::status_json(
        400,
        &br#"[0,"Invalid Character in Channel Name","0"]"#[..],
    )]);
    let ctx = Context::init(test_config(server.addr().port()), NotifyMode::Sync);

    let outcome = ctx.publish(",", "\"x\"", &PublishOptions::default());

    assert_eq!(
        outcome,
        Outcome::PublishFailed(PublishFailure::InvalidCharInChanName)
    );
    assert_eq!(ctx.last_http_code(), Some(400));
    assert_eq!(
        ctx.last_publish_result(),
        Some(PublishFailure::InvalidCharInChanName)
    );
}

#[test]
fn publish_via_get_encodes_message_into_the_url() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(
        &br#"[1,"Sent","1"]"#[..],
    )]);
    let ctx = Context::init(test_config(server.addr().port()), NotifyMode::Sync);

    let outcome = ctx.publish("ch", "\"hi\"", &PublishOptions::default());
    assert_eq!(outcome, Outcome::Ok);

    let head = String::from_utf8(wait_for_request_head(&server)).unwrap();
    let request_line = head.lines().next().unwrap();
    assert!(request_line.starts_with("GET /publish/demo/demo/0/ch/0/"));
}

#[test]
fn publish_via_post_sends_the_message_as_a_request_body() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(
        &br#"[1,"Sent","1"]"#[..],
    )]);
    let ctx = Context::init(test_config(server.addr().port()), NotifyMode::Sync);

    let options = PublishOptions {
        method: Some(PublishMethod::Post),
        ..PublishOptions::default()
    };
    let outcome = ctx.publish("ch", "\"hi\"", &options);
    assert_eq!(outcome, Outcome::Ok);

    let head = String::from_utf8(wait_for_request_head(&server)).unwrap();
    let request_line = head.lines().next().unwrap();
    assert!(request_line.starts_with("POST /publish/demo/demo/0/ch/0"));
    assert!(!request_line.contains("/0/\"hi\""));
    assert!(head.to_lowercase().contains("content-type: application/json"));
    assert!(!head.to_lowercase().contains("content-encoding"));
}

#[test]
fn publish_via_post_gzip_compresses_a_large_repetitive_body() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(
        &br#"[1,"Sent","1"]"#[..],
    )]);
    let ctx = Context::init(test_config(server.addr().port()), NotifyMode::Sync);

    let big_message = format!("\"{}\"", "hello world, ".repeat(200));
    let options = PublishOptions {
        method: Some(PublishMethod::PostGzip),
        ..PublishOptions::default()
    };
    let outcome = ctx.publish("ch", &big_message, &options);
    assert_eq!(outcome, Outcome::Ok);

    let head = String::from_utf8(wait_for_request_head(&server)).unwrap();
    assert!(head.starts_with("POST /publish/demo/demo/0/ch/0"));
    assert!(head.to_lowercase().contains("content-encoding: gzip"));
}

#[test]
fn publish_options_apply_store_replicate_meta_and_ttl_as_query_params() {
    mock_http::init_tracing();
    let server = MockHttpServer::start(vec![ScriptedResponse::ok_json(
        &br#"[1,"Sent","1"]"#[..],
    )]);
    let ctx = Context::init(test_config(server.addr().port()), NotifyMode::Sync);

    let options = PublishOptions {
        store: Some(false),
        replicate: Some(false),
        meta: Some(r#"{"lang":"en"}"#.to_owned()),
        ttl: Some(10),
        ..PublishOptions::default()
    };
    let outcome = ctx.publish("ch", "\"hi\"", &options);
    assert_eq!(outcome, Outcome::Ok);

    let head = String::from_utf8(wait_for_request_head(&server)).unwrap();
    let request_line = head.lines().next().unwrap();
    assert!(request_line.contains("store=false"));
    assert!(request_line.contains("replicate=false"));
    assert!(request_line.contains("ttl=10"));
    assert!(request_line.contains("meta="));
}
