//! Transaction state machine: drives one HTTP round-trip from URL
//! assembly through DNS resolution, connect, request send, response
//! receive, to a parsed result.
//!
//! Expressed as a tagged-variant current state plus a `step`-shaped
//! driver (`run`); the state is recorded at every transition so the
//! machine is observable and unit-testable with synthetic traces.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::resolver::Resolve;
use crate::transport::{self, Stream};

/// Where the transaction currently is. `Terminal` carries no payload —
/// the caller inspects the `Result` returned by [`Transaction::run`]
/// instead, matching the outcome/error split the rest of the crate
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    UrlBuilt,
    Resolving,
    Connecting,
    TlsHandshake,
    SendingRequest,
    RecvStatus,
    RecvHeaders,
    RecvBody,
    Parsing,
    Terminal,
}

/// A fully-received, still-unparsed HTTP response. `body` is the raw
/// payload buffer; `status` is the HTTP status line's code.
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Cooperative, edge-triggered cancellation handle shared between a
/// context and its in-flight transaction.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. A no-op if the transaction has already
    /// reached a terminal state (the flag is simply never observed).
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// How often a blocked long-poll read re-checks `cancel`: cancellation
/// mid-receive must land in bounded time, not only at the next
/// whole-transaction deadline.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Transaction {
    pub state: State,
    cancel: CancelToken,
}

impl Transaction {
    pub fn new(cancel: CancelToken) -> Self {
        Transaction {
            state: State::Idle,
            cancel,
        }
    }

    fn advance(&mut self, state: State) -> Result<(), Error> {
        self.state = state;
        tracing::debug!(state = ?self.state, "transaction state");
        if self.cancel.take() {
            tracing::debug!("cancellation observed, transaction terminated");
            self.state = State::Terminal;
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Drive one full HTTP transaction over a freshly resolved
    /// connection. `reuse` is an existing connection from a prior
    /// transaction to the same origin; it is used instead of a fresh
    /// connect when present and still usable, and replaced on any
    /// send/receive error.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, resolver, request, reuse, deadline), fields(host, port))]
    pub fn run<R: Resolve>(
        &mut self,
        resolver: &R,
        host: &str,
        port: u16,
        use_tls: bool,
        prefer_v6: bool,
        request: &[u8],
        reuse: &mut Option<Stream>,
        deadline: Instant,
    ) -> Result<RawResponse, Error> {
        self.advance(State::UrlBuilt)?;

        self.advance(State::Resolving)?;
        let addr = match resolver.resolve(host, prefer_v6, deadline) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(host, error = %e, "resolve failed, retrying once");
                resolver.resolve(host, prefer_v6, deadline)?
            }
        };

        let mut stream = if let Some(existing) = reuse.take() {
            existing
        } else {
            self.advance(State::Connecting)?;
            if use_tls {
                self.advance(State::TlsHandshake)?;
            }
            transport::connect(addr, port, host, use_tls, deadline)?
        };

        self.advance(State::SendingRequest)?;
        if let Err(e) = transport::write_all(&mut stream, request, deadline) {
            return Err(e);
        }

        let result = self.receive_response(&mut stream, deadline);
        match result {
            Ok(resp) => {
                *reuse = Some(stream);
                self.state = State::Terminal;
                Ok(resp)
            }
            Err(e) => Err(e),
        }
    }

    /// A blocking read bounded by `deadline`, but split into short
    /// polling slices so the long-poll subscribe wait (which can hold
    /// the connection open for the full deadline) still observes
    /// `cancel` promptly instead of only at the next FSM transition.
    fn read_with_cancel(&mut self, stream: &mut Stream, buf: &mut [u8], deadline: Instant) -> Result<usize, Error> {
        loop {
            if self.cancel.take() {
                self.state = State::Terminal;
                return Err(Error::Cancelled);
            }
            let slice_deadline = std::cmp::min(deadline, Instant::now() + CANCEL_POLL_INTERVAL);
            match transport::read_some(stream, buf, slice_deadline) {
                Err(Error::Timeout) if Instant::now() < deadline => continue,
                other => return other,
            }
        }
    }

    fn receive_response(&mut self, stream: &mut Stream, deadline: Instant) -> Result<RawResponse, Error> {
        self.advance(State::RecvStatus)?;

        let mut buf = Vec::with_capacity(4096);
        let mut read_chunk = [0u8; 4096];
        let header_end;
        let (status, content_length);

        loop {
            let n = self.read_with_cancel(stream, &mut read_chunk, deadline)?;
            if n == 0 {
                return Err(Error::Format("connection closed before headers completed"));
            }
            buf.extend_from_slice(&read_chunk[..n]);

            let mut headers = [httparse::EMPTY_HEADER; 64];
            let mut response = httparse::Response::new(&mut headers);
            match response.parse(&buf) {
                Ok(httparse::Status::Complete(offset)) => {
                    header_end = offset;
                    status = response.code.ok_or(Error::Format("missing status code"))?;
                    content_length = response
                        .headers
                        .iter()
                        .find(|h| h.name.eq_ignore_ascii_case("content-length"))
                        .and_then(|h| std::str::from_utf8(h.value).ok())
                        .and_then(|s| s.parse::<usize>().ok());
                    break;
                }
                Ok(httparse::Status::Partial) => continue,
                Err(_) => return Err(Error::Format("malformed HTTP response headers")),
            }
        }

        self.advance(State::RecvHeaders)?;

        self.advance(State::RecvBody)?;
        let wanted_total = content_length.map(|len| header_end + len);
        loop {
            if let Some(total) = wanted_total {
                if buf.len() >= total {
                    break;
                }
            }
            let n = self.read_with_cancel(stream, &mut read_chunk, deadline)?;
            if n == 0 {
                break; // peer closed; treat buffered bytes as the whole body
            }
            buf.extend_from_slice(&read_chunk[..n]);
        }

        self.advance(State::Parsing)?;
        let body = buf[header_end..].to_vec();
        Ok(RawResponse { status, body })
    }
}
