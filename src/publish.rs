//! Publish request options and result extraction.

use crate::error::{Error, PublishFailure};
use crate::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMethod {
    Get,
    Post,
    PostGzip,
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub method: Option<PublishMethod>,
    pub store: Option<bool>,
    pub replicate: Option<bool>,
    pub meta: Option<String>,
    pub cipher_key: Option<String>,
    pub ttl: Option<u32>,
}

impl PublishOptions {
    pub fn method(&self) -> PublishMethod {
        self.method.unwrap_or(PublishMethod::Get)
    }
}

/// Outcome of parsing an HTTP-200 publish response body: `[1, "Sent",
/// "..."]` on success, `[0, "<reason>", ...]` on failure.
pub enum PublishResult {
    Ok,
    Failed(PublishFailure),
}

/// Parse the JSON array publish response body.
///
/// The tie-break rule (HTTP error status *and* a parseable publish
/// error) is handled by the caller: this function only interprets the
/// body; it does not know the HTTP status.
pub fn parse_publish_response(body: &[u8]) -> Result<PublishResult, Error> {
    let spans = json::skim_array_elements(body).map_err(|_| Error::Format("publish response is not a JSON array"))?;
    let code_span = spans
        .first()
        .ok_or(Error::Format("publish response array is empty"))?;
    let code = json::span_as_u64(body, *code_span)
        .ok_or(Error::Format("publish response status code is not an integer"))?;

    if code == 1 {
        return Ok(PublishResult::Ok);
    }

    let reason = spans
        .get(1)
        .map(|span| json::span_as_raw_str(body, *span))
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

    let failure = match reason.as_deref() {
        Some("Invalid Character in Channel Name") => PublishFailure::InvalidCharInChanName,
        Some("Invalid JSON") => PublishFailure::InvalidJson,
        Some("Account Quota Exceeded") => PublishFailure::AccountQuotaExceeded,
        Some(other) => PublishFailure::Other(other.to_owned()),
        None => PublishFailure::Other("unknown publish failure".to_owned()),
    };
    Ok(PublishResult::Failed(failure))
}
