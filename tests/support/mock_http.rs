//! A minimal in-process HTTP/1.1 server for driving the transaction
//! engine end-to-end without a real origin.
//!
//! Adapted from `crates/rt-test-utils/src/mock_ws_server.rs`'s
//! accept-loop shape (bind to port 0, spawn a handler per connection,
//! expose the bound address) to plain `std::net` + HTTP/1.1 framing
//! instead of a tokio WebSocket server, since this crate's transport is
//! synchronous.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Installs a `tracing` subscriber so `RUST_LOG=debug cargo test -- --nocapture`
/// shows the transaction engine's state-transition events. Safe to call
/// from every test in a binary; the second and later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted response per accepted connection.
pub enum ScriptedResponse {
    /// Write a full HTTP/1.1 response, then close.
    Respond { status: u16, reason: &'static str, body: Vec<u8> },
    /// Read the request, then never write anything — used to test
    /// cancellation of a transaction blocked on a long-poll read.
    Hang,
}

impl ScriptedResponse {
    pub fn ok_json(body: impl Into<Vec<u8>>) -> Self {
        ScriptedResponse::Respond {
            status: 200,
            reason: "OK",
            body: body.into(),
        }
    }

    pub fn status_json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        ScriptedResponse::Respond {
            status,
            reason: "Error",
            body: body.into(),
        }
    }
}

/// A mock HTTP/1.1 server for integration tests.
///
/// Binds to `127.0.0.1:0` and serves one scripted response per accepted
/// connection, in order. The connection is closed after the response is
/// written; the client's `Content-Length`-bounded read loop treats that
/// as end of body, so this never trips up `transaction::receive_response`.
pub struct MockHttpServer {
    addr: SocketAddr,
    captured: Arc<Mutex<Vec<Vec<u8>>>>,
    _handle: JoinHandle<()>,
}

impl MockHttpServer {
    pub fn start(responses: Vec<ScriptedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock http listener");
        let addr = listener.local_addr().expect("local_addr");
        let responses = Arc::new(Mutex::new(responses.into_iter()));
        let captured = Arc::new(Mutex::new(Vec::new()));

        let captured_in_loop = Arc::clone(&captured);
        let handle = std::thread::spawn(move || {
            Self::accept_loop(listener, responses, captured_in_loop);
        });

        MockHttpServer {
            addr,
            captured,
            _handle: handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The request line and headers (no body) of the most recently
    /// completed connection, if any have finished yet.
    pub fn last_request_head(&self) -> Option<Vec<u8>> {
        self.captured.lock().unwrap().last().cloned()
    }

    fn accept_loop(
        listener: TcpListener,
        responses: Arc<Mutex<std::vec::IntoIter<ScriptedResponse>>>,
        captured: Arc<Mutex<Vec<Vec<u8>>>>,
    ) {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let next = responses.lock().unwrap().next();
            let Some(response) = next else { break };
            let exhausted = responses.lock().unwrap().len() == 0;
            let captured = Arc::clone(&captured);
            std::thread::spawn(move || {
                // Tests that cancel mid-flight close the client side early;
                // that's an expected race, not a test failure.
                if let Ok(head) = Self::handle_connection(&mut stream, &response) {
                    captured.lock().unwrap().push(head);
                }
            });
            if exhausted {
                break;
            }
        }
    }

    fn handle_connection(stream: &mut std::net::TcpStream, response: &ScriptedResponse) -> std::io::Result<Vec<u8>> {
        let head = read_request_headers(stream)?;

        match response {
            ScriptedResponse::Hang => {
                // Hold the connection open without writing. The test
                // itself finishes long before this thread would; it is
                // left running and reaped at process exit.
                std::thread::sleep(std::time::Duration::from_secs(5));
                Ok(head)
            }
            ScriptedResponse::Respond { status, reason, body } => {
                let status_line = format!("HTTP/1.1 {status} {reason}\r\n");
                let headers = format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len());
                stream.write_all(status_line.as_bytes())?;
                stream.write_all(headers.as_bytes())?;
                stream.write_all(body)?;
                stream.flush()?;
                Ok(head)
            }
        }
    }
}

/// Reads until the `\r\n\r\n` header terminator and returns everything
/// up to (not including) it. Does not consume any request body that
/// follows — good enough for inspecting the request line and headers.
fn read_request_headers(stream: &mut std::net::TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];
    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            return Ok(buf[..pos].to_vec());
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(buf);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
