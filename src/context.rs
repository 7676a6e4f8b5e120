//! Context façade: the public operations, single-transaction-at-a-time
//! enforcement, and the wait/notify surface for both notification
//! modes.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{Error, Outcome, PublishFailure};
use crate::history;
use crate::json;
use crate::publish::{self, PublishMethod, PublishOptions, PublishResult};
use crate::resolver::{OsResolver, Resolve, SelfResolver};
use crate::subscribe;
use crate::transaction::{CancelToken, Transaction};
use crate::transport::Stream;
use crate::url;
use crate::uuid_gen;

/// Notification mode selected at construction. Both transports are
/// always compiled in; this is a runtime value, not a Cargo feature —
/// see DESIGN.md's "Callback vs. sync" decision.
pub enum NotifyMode {
    Sync,
    Callback(Arc<dyn Fn(OperationKind, Outcome) + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Publish,
    Subscribe,
    Time,
    MessageCounts,
    AddChannelToGroup,
    RemoveChannelFromGroup,
    RemoveChannelGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionSlot {
    None,
    Busy(OperationKind),
}

#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub publish_key: String,
    pub subscribe_key: String,
    pub origin_host: String,
    pub use_tls: bool,
    /// Overrides the 443/80 default implied by `use_tls`. `None` in
    /// production; tests point this at a mock server's ephemeral port.
    pub origin_port: Option<u16>,
    pub dns_server: SocketAddr,
    pub use_os_resolver: bool,
    pub transaction_timeout: Duration,
}

impl ContextConfig {
    pub fn new(publish_key: impl Into<String>, subscribe_key: impl Into<String>) -> Self {
        ContextConfig {
            publish_key: publish_key.into(),
            subscribe_key: subscribe_key.into(),
            origin_host: "pubsub.example.com".to_owned(),
            use_tls: true,
            origin_port: None,
            dns_server: "8.8.8.8:53".parse().unwrap(),
            use_os_resolver: cfg!(feature = "os-resolver"),
            transaction_timeout: Duration::from_secs(20),
        }
    }
}

struct State {
    slot: TransactionSlot,
    auth: Option<String>,
    uuid: String,
    timetoken: String,
    last_outcome: Outcome,
    last_http_code: Option<u16>,
    last_publish_result: Option<PublishFailure>,
    last_history_input_order: Vec<i64>,
    last_history_response_order: Vec<(String, u64)>,
    receive_queue: VecDeque<(String, Vec<u8>)>,
    last_dequeued_channel: Option<String>,
    connection: Option<Stream>,
}

enum ResolverChoice {
    Os(OsResolver),
    Self_(SelfResolver),
}

/// A long-lived pub/sub context: the unit of work and the unit of
/// mutual exclusion. Held behind `Arc` so callback-mode operations can
/// hand a clone to their worker thread.
pub struct Context {
    config: Mutex<ContextConfig>,
    state: Mutex<State>,
    busy_cvar: Condvar,
    cancel: CancelToken,
    notify: NotifyMode,
}

impl Context {
    /// `allocate` + `init` combined: there is no use for an
    /// unconfigured context handle in a safe-Rust API.
    pub fn init(config: ContextConfig, notify: NotifyMode) -> Arc<Context> {
        Arc::new(Context {
            cancel: CancelToken::new(),
            state: Mutex::new(State {
                slot: TransactionSlot::None,
                auth: None,
                uuid: uuid_gen::generate(),
                timetoken: subscribe::INITIAL_TIMETOKEN.to_owned(),
                last_outcome: Outcome::Ok,
                last_http_code: None,
                last_publish_result: None,
                last_history_input_order: Vec::new(),
                last_history_response_order: Vec::new(),
                receive_queue: VecDeque::new(),
                last_dequeued_channel: None,
                connection: None,
            }),
            busy_cvar: Condvar::new(),
            notify,
            config: Mutex::new(config),
        })
    }

    pub fn set_origin(&self, host: impl Into<String>, use_tls: bool) {
        let mut config = self.config.lock().unwrap();
        config.origin_host = host.into();
        config.use_tls = use_tls;
    }

    pub fn set_auth(&self, token: impl Into<String>) {
        self.state.lock().unwrap().auth = Some(token.into());
    }

    pub fn set_uuid(&self, uuid: impl Into<String>) {
        self.state.lock().unwrap().uuid = uuid.into();
    }

    /// Switches the resolver strategy between the crate's own DNS
    /// codec and the OS resolver, implemented as a runtime toggle for
    /// testability. Rejected with `IN_PROGRESS` while a transaction is
    /// in flight.
    pub fn set_non_blocking_io(&self, use_os_resolver: bool) -> Outcome {
        if self.state.lock().unwrap().slot != TransactionSlot::None {
            return Outcome::InProgress;
        }
        self.config.lock().unwrap().use_os_resolver = use_os_resolver;
        Outcome::Ok
    }

    fn begin(&self, kind: OperationKind) -> Result<(), Outcome> {
        let mut state = self.state.lock().unwrap();
        if state.slot != TransactionSlot::None {
            return Err(Outcome::InProgress);
        }
        state.slot = TransactionSlot::Busy(kind);
        Ok(())
    }

    fn end(&self, outcome: Outcome) -> Outcome {
        let mut state = self.state.lock().unwrap();
        state.slot = TransactionSlot::None;
        state.last_outcome = outcome.clone();
        self.busy_cvar.notify_all();
        outcome
    }

    /// Runs `work` either inline (`Sync`) or on a detached worker
    /// thread that invokes the registered callback when done
    /// (`Callback`), returning `STARTED` to the caller immediately.
    /// `work` is responsible for calling [`Context::end`] itself.
    fn dispatch(
        self: &Arc<Self>,
        kind: OperationKind,
        work: impl FnOnce(&Context) -> Outcome + Send + 'static,
    ) -> Outcome {
        match &self.notify {
            NotifyMode::Sync => work(self),
            NotifyMode::Callback(callback) => {
                let ctx = Arc::clone(self);
                let callback = Arc::clone(callback);
                std::thread::spawn(move || {
                    let outcome = work(&ctx);
                    tracing::debug!(?kind, ?outcome, "callback transaction finished");
                    callback(kind, outcome);
                });
                Outcome::Started
            }
        }
    }

    fn resolver_and_target(&self) -> (ResolverChoice, String, u16, bool) {
        let config = self.config.lock().unwrap();
        let port = config.origin_port.unwrap_or(if config.use_tls { 443 } else { 80 });
        let resolver = if config.use_os_resolver {
            ResolverChoice::Os(OsResolver)
        } else {
            ResolverChoice::Self_(SelfResolver::new(config.dns_server))
        };
        (resolver, config.origin_host.clone(), port, config.use_tls)
    }

    fn run_transaction(&self, path_and_query: &str) -> Result<(u16, Vec<u8>), Error> {
        self.run_http_request("GET", path_and_query, None)
    }

    /// Builds and sends one HTTP request. `body`, when present, is sent
    /// with `Content-Type: application/json`, an optional
    /// `Content-Encoding` (e.g. `"gzip"` for a compressed publish), and
    /// a `Content-Length` matching its bytes.
    fn run_http_request(
        &self,
        method: &str,
        path_and_query: &str,
        body: Option<(Option<&str>, &[u8])>,
    ) -> Result<(u16, Vec<u8>), Error> {
        let (resolver, host, port, use_tls) = self.resolver_and_target();
        let deadline = Instant::now() + self.config.lock().unwrap().transaction_timeout;

        let mut head = format!(
            "{method} {path_and_query} HTTP/1.1\r\nHost: {host}\r\nConnection: keep-alive\r\nAccept: */*\r\n"
        );
        let request = match body {
            Some((content_encoding, payload)) => {
                head.push_str("Content-Type: application/json\r\n");
                if let Some(encoding) = content_encoding {
                    head.push_str(&format!("Content-Encoding: {encoding}\r\n"));
                }
                head.push_str(&format!("Content-Length: {}\r\n\r\n", payload.len()));
                let mut bytes = head.into_bytes();
                bytes.extend_from_slice(payload);
                bytes
            }
            None => {
                head.push_str("\r\n");
                head.into_bytes()
            }
        };

        let mut txn = Transaction::new(self.cancel.clone());
        let mut conn_slot = self.state.lock().unwrap().connection.take();

        let result = match resolver {
            ResolverChoice::Os(r) => txn.run(&r, &host, port, use_tls, false, &request, &mut conn_slot, deadline),
            ResolverChoice::Self_(r) => txn.run(&r, &host, port, use_tls, false, &request, &mut conn_slot, deadline),
        };

        self.state.lock().unwrap().connection = conn_slot;

        result.map(|resp| (resp.status, resp.body))
    }

    fn query_suffix(&self, extra: &[(&str, String)]) -> String {
        let state = self.state.lock().unwrap();
        let mut parts = Vec::new();
        if let Some(auth) = &state.auth {
            parts.push(format!("auth={}", encode_component(auth)));
        }
        parts.push(format!("uuid={}", encode_component(&state.uuid)));
        drop(state);
        parts.push(format!(
            "pnsdk={}",
            encode_component(&format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
        ));
        for (key, value) in extra {
            parts.push(format!("{key}={}", encode_component(value)));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }

    pub fn publish(self: &Arc<Self>, channel: &str, message_json: &str, options: &PublishOptions) -> Outcome {
        if self.begin(OperationKind::Publish).is_err() {
            return Outcome::InProgress;
        }
        let channel = channel.to_owned();
        let message_json = message_json.to_owned();
        let options = options.clone();
        self.dispatch(OperationKind::Publish, move |ctx| ctx.do_publish(&channel, &message_json, &options))
    }

    fn do_publish(&self, channel: &str, message_json: &str, options: &PublishOptions) -> Outcome {
        let Ok(encoded_channel) = encode_or(channel, 256) else {
            return self.end(Outcome::UrlEncodedTooLong);
        };

        let config = self.config.lock().unwrap();
        let publish_key = config.publish_key.clone();
        let subscribe_key = config.subscribe_key.clone();
        drop(config);

        let mut extra = Vec::new();
        if let Some(store) = options.store {
            extra.push(("store", store.to_string()));
        }
        if let Some(replicate) = options.replicate {
            extra.push(("replicate", replicate.to_string()));
        }
        if let Some(meta) = &options.meta {
            extra.push(("meta", meta.clone()));
        }
        if let Some(ttl) = options.ttl {
            extra.push(("ttl", ttl.to_string()));
        }

        match options.method() {
            PublishMethod::Get => {
                let Ok(encoded_message) = encode_or(message_json, 8192) else {
                    return self.end(Outcome::UrlEncodedTooLong);
                };
                let path = format!("/publish/{publish_key}/{subscribe_key}/0/{encoded_channel}/0/{encoded_message}");
                let suffix = self.query_suffix(&extra);
                match self.run_transaction(&format!("{path}{suffix}")) {
                    Ok((status, body)) => self.finish_publish(status, &body),
                    Err(e) => self.end(e.into_outcome()),
                }
            }
            method @ (PublishMethod::Post | PublishMethod::PostGzip) => {
                let path = format!("/publish/{publish_key}/{subscribe_key}/0/{encoded_channel}/0");
                let suffix = self.query_suffix(&extra);
                let plain = message_json.as_bytes();
                let (payload, content_encoding) = if method == PublishMethod::PostGzip {
                    compress_if_worthwhile(plain)
                } else {
                    (plain.to_vec(), None)
                };
                match self.run_http_request("POST", &format!("{path}{suffix}"), Some((content_encoding, &payload))) {
                    Ok((status, body)) => self.finish_publish(status, &body),
                    Err(e) => self.end(e.into_outcome()),
                }
            }
        }
    }

    fn finish_publish(&self, status: u16, body: &[u8]) -> Outcome {
        self.state.lock().unwrap().last_http_code = Some(status);

        match publish::parse_publish_response(body) {
            Ok(PublishResult::Ok) if status == 200 => self.end(Outcome::Ok),
            Ok(PublishResult::Failed(reason)) => {
                self.state.lock().unwrap().last_publish_result = Some(reason.clone());
                self.end(Outcome::PublishFailed(reason))
            }
            Ok(PublishResult::Ok) => self.end(Outcome::HttpError(status)),
            Err(_) if status >= 400 => self.end(Outcome::HttpError(status)),
            Err(_) => self.end(Outcome::FormatError),
        }
    }

    pub fn subscribe(self: &Arc<Self>, channel: &str, channel_group: &str) -> Outcome {
        if self.begin(OperationKind::Subscribe).is_err() {
            return Outcome::InProgress;
        }
        let channel = channel.to_owned();
        let channel_group = channel_group.to_owned();
        self.dispatch(OperationKind::Subscribe, move |ctx| ctx.do_subscribe(&channel, &channel_group))
    }

    fn do_subscribe(&self, channel: &str, channel_group: &str) -> Outcome {
        let Ok(encoded_channel) = encode_or(channel, 256) else {
            return self.end(Outcome::UrlEncodedTooLong);
        };

        let timetoken = self.state.lock().unwrap().timetoken.clone();
        let config = self.config.lock().unwrap();
        let path = format!("/v2/subscribe/{}/{encoded_channel}/0", config.subscribe_key);
        drop(config);

        let mut extra = vec![("tt", timetoken)];
        if !channel_group.is_empty() {
            extra.push(("channel-group", channel_group.to_owned()));
        }
        let suffix = self.query_suffix(&extra);

        match self.run_transaction(&format!("{path}{suffix}")) {
            Ok((200, body)) => self.finish_subscribe(&body),
            Ok((status, _)) => self.end(Outcome::HttpError(status)),
            Err(e) => self.end(e.into_outcome()),
        }
    }

    fn finish_subscribe(&self, body: &[u8]) -> Outcome {
        match subscribe::slice_response(body) {
            Ok(sliced) => {
                let new_timetoken =
                    String::from_utf8_lossy(json::span_as_raw_str(body, sliced.new_timetoken)).into_owned();
                let mut messages = VecDeque::with_capacity(sliced.messages.len());
                for msg in &sliced.messages {
                    let channel = String::from_utf8_lossy(json::span_as_raw_str(body, msg.channel)).into_owned();
                    let payload = json::span_as_raw_str(body, msg.payload).to_vec();
                    messages.push_back((channel, payload));
                }

                let mut state = self.state.lock().unwrap();
                state.timetoken = new_timetoken; // replaced only on success
                state.receive_queue.extend(messages);
                drop(state);
                self.end(Outcome::Ok)
            }
            Err(e) => self.end(e.into_outcome()),
        }
    }

    pub fn time(self: &Arc<Self>) -> Outcome {
        if self.begin(OperationKind::Time).is_err() {
            return Outcome::InProgress;
        }
        self.dispatch(OperationKind::Time, |ctx| match ctx.run_transaction("/time/0") {
            Ok((200, _)) => ctx.end(Outcome::Ok),
            Ok((status, _)) => ctx.end(Outcome::HttpError(status)),
            Err(e) => ctx.end(e.into_outcome()),
        })
    }

    #[cfg(feature = "advanced-history")]
    pub fn message_counts(
        self: &Arc<Self>,
        channels: &[&str],
        timetoken: Option<&str>,
        channel_timetokens: Option<&[&str]>,
    ) -> Outcome {
        if timetoken.is_some() == channel_timetokens.is_some() {
            return Outcome::InvalidParameters;
        }
        // A prior subscribe's message batch must be fully drained via
        // `get()` before a message-counts transaction can start.
        if !self.state.lock().unwrap().receive_queue.is_empty() {
            return Outcome::RxBuffNotEmpty;
        }
        if self.begin(OperationKind::MessageCounts).is_err() {
            return Outcome::InProgress;
        }
        let channels: Vec<String> = channels.iter().map(|c| (*c).to_owned()).collect();
        let timetoken = timetoken.map(str::to_owned);
        let channel_timetokens = channel_timetokens.map(|v| v.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>());

        self.dispatch(OperationKind::MessageCounts, move |ctx| {
            let channel_refs: Vec<&str> = channels.iter().map(String::as_str).collect();
            ctx.do_message_counts(&channel_refs, timetoken.as_deref(), channel_timetokens.as_deref())
        })
    }

    #[cfg(feature = "advanced-history")]
    fn do_message_counts(&self, channels: &[&str], timetoken: Option<&str>, channel_timetokens: Option<&[String]>) -> Outcome {
        let joined_channels: Vec<String> = channels.iter().map(|c| encode_component(c)).collect();
        let config = self.config.lock().unwrap();
        let path = format!(
            "/v3/history/sub-key/{}/channels-with-messages/{}",
            config.subscribe_key,
            joined_channels.join(",")
        );
        drop(config);

        let extra = if let Some(tt) = timetoken {
            vec![("timetoken", tt.to_owned())]
        } else {
            vec![("channelTimetokens", channel_timetokens.unwrap().join(","))]
        };
        let suffix = self.query_suffix(&extra);

        match self.run_transaction(&format!("{path}{suffix}")) {
            Ok((200, body)) => self.finish_message_counts(&body, channels),
            Ok((status, _)) => self.end(Outcome::HttpError(status)),
            Err(e) => self.end(e.into_outcome()),
        }
    }

    #[cfg(feature = "advanced-history")]
    fn finish_message_counts(&self, body: &[u8], input_channels: &[&str]) -> Outcome {
        let input_order = match history::parse_input_order(body, input_channels) {
            Ok(v) => v,
            Err(e) => return self.end(e.into_outcome()),
        };
        // Unbounded here; callers apply their own capacity when reading
        // the response-order view via `get_channels_with_message_counts`.
        let response_order = match history::parse_response_order(body, usize::MAX) {
            Ok(v) => v.into_iter().map(|c| (c.channel, c.count)).collect(),
            Err(e) => return self.end(e.into_outcome()),
        };
        let mut state = self.state.lock().unwrap();
        state.last_history_input_order = input_order;
        state.last_history_response_order = response_order;
        drop(state);
        self.end(Outcome::Ok)
    }

    /// Input-channel-order view: one entry per channel passed to
    /// `message_counts`, in that order, with
    /// [`history::MISSING_CHANNEL_SENTINEL`] for channels the server
    /// didn't mention.
    #[cfg(feature = "advanced-history")]
    pub fn get_message_counts(&self) -> Vec<i64> {
        self.state.lock().unwrap().last_history_input_order.clone()
    }

    /// Server response-order view: `(channel, count)` pairs in the
    /// order the server returned them, truncated to `capacity` entries
    /// rather than failing if there were more.
    #[cfg(feature = "advanced-history")]
    pub fn get_channels_with_message_counts(&self, capacity: usize) -> Vec<(String, u64)> {
        let mut v = self.state.lock().unwrap().last_history_response_order.clone();
        v.truncate(capacity);
        v
    }

    pub fn add_channel_to_group(self: &Arc<Self>, channel: &str, group: &str) -> Outcome {
        self.channel_group_op(OperationKind::AddChannelToGroup, channel, group, "add")
    }

    pub fn remove_channel_from_group(self: &Arc<Self>, channel: &str, group: &str) -> Outcome {
        self.channel_group_op(OperationKind::RemoveChannelFromGroup, channel, group, "remove")
    }

    pub fn remove_channel_group(self: &Arc<Self>, group: &str) -> Outcome {
        self.channel_group_op(OperationKind::RemoveChannelGroup, "", group, "remove")
    }

    fn channel_group_op(self: &Arc<Self>, kind: OperationKind, channel: &str, group: &str, action: &str) -> Outcome {
        if self.begin(kind).is_err() {
            return Outcome::InProgress;
        }
        let channel = channel.to_owned();
        let group = group.to_owned();
        let action = action.to_owned();
        self.dispatch(kind, move |ctx| ctx.do_channel_group_op(&channel, &group, &action))
    }

    fn do_channel_group_op(&self, channel: &str, group: &str, action: &str) -> Outcome {
        let config = self.config.lock().unwrap();
        let path = format!(
            "/v1/channel-registration/sub-key/{}/channel-group/{}",
            config.subscribe_key,
            encode_component(group)
        );
        drop(config);
        let extra = if channel.is_empty() {
            vec![("remove", "true".to_owned())]
        } else {
            vec![(action, channel.to_owned())]
        };
        let suffix = self.query_suffix(&extra);

        match self.run_transaction(&format!("{path}{suffix}")) {
            Ok((200, body)) => match crate::channel_group::check_ack_response(&body) {
                Ok(()) => self.end(Outcome::Ok),
                Err(e) => self.end(e.into_outcome()),
            },
            Ok((status, _)) => self.end(Outcome::HttpError(status)),
            Err(e) => self.end(e.into_outcome()),
        }
    }

    /// Edge-triggered cancellation: a no-op while idle.
    pub fn cancel(&self) {
        if self.state.lock().unwrap().slot != TransactionSlot::None {
            tracing::debug!("cancel requested");
            self.cancel.cancel();
        }
    }

    /// Next received message's payload, or `None` if the batch is
    /// drained.
    pub fn get(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let (channel, payload) = state.receive_queue.pop_front()?;
        state.last_dequeued_channel = Some(channel);
        Some(payload)
    }

    /// Channel the most recent `get()` call returned a message for.
    pub fn get_channel(&self) -> Option<String> {
        self.state.lock().unwrap().last_dequeued_channel.clone()
    }

    /// Current subscribe cursor: unaffected by a cancelled or failed
    /// subscribe, replaced only when a subscribe actually succeeds.
    pub fn timetoken(&self) -> String {
        self.state.lock().unwrap().timetoken.clone()
    }

    pub fn last_result(&self) -> Outcome {
        self.state.lock().unwrap().last_outcome.clone()
    }

    pub fn last_http_code(&self) -> Option<u16> {
        self.state.lock().unwrap().last_http_code
    }

    pub fn last_publish_result(&self) -> Option<PublishFailure> {
        self.state.lock().unwrap().last_publish_result.clone()
    }

    /// Cancels any in-flight transaction and waits for it to reach a
    /// terminal state.
    pub fn free(self: &Arc<Self>) {
        self.cancel.cancel();
        let state = self.state.lock().unwrap();
        let _unused = self
            .busy_cvar
            .wait_while(state, |s| s.slot != TransactionSlot::None)
            .unwrap();
    }
}

/// GZIP-compresses `plain` when the result is more than 10% smaller;
/// otherwise returns the plaintext body uncompressed with no
/// `Content-Encoding`, matching the skip-if-not-worthwhile policy.
fn compress_if_worthwhile(plain: &[u8]) -> (Vec<u8>, Option<&'static str>) {
    if plain.is_empty() {
        return (plain.to_vec(), None);
    }
    match gzip_codec::compress(plain, flate2::Compression::default()) {
        Ok(packed) if plain.len().saturating_sub(packed.len()) * 10 > plain.len() => (packed, Some("gzip")),
        _ => (plain.to_vec(), None),
    }
}

fn encode_or(value: &str, max_len: usize) -> Result<String, ()> {
    url::encode(value.as_bytes(), max_len)
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .map_err(|_| ())
}

fn encode_component(value: &str) -> String {
    encode_or(value, 1024).unwrap_or_default()
}
