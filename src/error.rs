//! Outcome and error taxonomy.
//!
//! `Outcome` is what every public [`crate::context::Context`] operation
//! returns. `Error` is the internal, `thiserror`-derived type that the
//! lower layers (transport, resolver, codecs) raise; it is mapped onto
//! an `Outcome` at the transaction state machine boundary and never
//! escapes the crate's public surface.

use std::fmt;

/// The sub-reason attached to a `PUBLISH_FAILED` outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishFailure {
    InvalidCharInChanName,
    InvalidJson,
    AccountQuotaExceeded,
    Other(String),
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishFailure::InvalidCharInChanName => write!(f, "Invalid Character in Channel Name"),
            PublishFailure::InvalidJson => write!(f, "Invalid JSON"),
            PublishFailure::AccountQuotaExceeded => write!(f, "Account Quota Exceeded"),
            PublishFailure::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Terminal result of any context operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Started,
    InProgress,
    Timeout,
    Cancelled,
    AddrResolutionFailed,
    ConnectFailed,
    TlsFailed,
    HttpError(u16),
    FormatError,
    ErrorOnServer,
    PublishFailed(PublishFailure),
    InvalidChannel,
    InvalidParameters,
    InvalidTimetoken,
    RxBuffNotEmpty,
    BadCompression,
    UrlEncodedTooLong,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

/// Internal failure type for the layers beneath the transaction state
/// machine. Never surfaced to callers directly — see
/// [`Error::into_outcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("DNS resolution failed: {0}")]
    Dns(#[from] dns_codec::DnsCodecError),
    #[error("gzip compression failed: {0}")]
    Gzip(#[from] gzip_codec::GzipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("malformed response: {0}")]
    Format(&'static str),
    #[error("server reported a logical error")]
    ServerError,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("operation timed out")]
    Timeout,
    #[error("operation cancelled")]
    Cancelled,
    #[error("url encoding overflowed the buffer")]
    UrlEncodedTooLong,
    #[error("invalid parameters: {0}")]
    InvalidParameters(&'static str),
}

impl Error {
    /// Map an internal failure onto the outcome a caller observes.
    pub fn into_outcome(self) -> Outcome {
        match self {
            Error::Dns(_) => Outcome::AddrResolutionFailed,
            Error::Io(_) => Outcome::ConnectFailed,
            Error::Tls(_) => Outcome::TlsFailed,
            Error::Gzip(_) => Outcome::BadCompression,
            Error::Format(_) => Outcome::FormatError,
            Error::ServerError => Outcome::ErrorOnServer,
            Error::HttpStatus(code) => Outcome::HttpError(code),
            Error::Timeout => Outcome::Timeout,
            Error::Cancelled => Outcome::Cancelled,
            Error::UrlEncodedTooLong => Outcome::UrlEncodedTooLong,
            Error::InvalidParameters(_) => Outcome::InvalidParameters,
        }
    }
}
