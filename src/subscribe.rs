//! Subscribe protocol: timetoken handshake and receive-buffer slicing
//! into `(channel, payload)` pairs.

use crate::error::Error;
use crate::json::{self, Span};

/// One `(channel, payload)` pair sliced out of a subscribe response,
/// as byte ranges into the caller-owned response body.
pub struct SlicedMessage {
    pub channel: Span,
    pub payload: Span,
}

pub struct SlicedResponse {
    pub new_timetoken: Span,
    pub messages: Vec<SlicedMessage>,
}

/// Parse a subscribe response body shaped
/// `{"t":{"t":"NEW_TT"},"m":[{"c":"ch","d":MSG},...]}`.
///
/// Pure and deterministic over its input: the same bytes always
/// produce the same sequence of spans.
pub fn slice_response(body: &[u8]) -> Result<SlicedResponse, Error> {
    let (t_start, t_end) =
        json::find_top_level_field(body, "t")
            .map_err(|_| Error::Format("subscribe response is not a JSON object"))?
            .ok_or(Error::Format("subscribe response missing \"t\""))?;
    let t_obj = &body[t_start..t_end];
    let (tt_start, tt_end) = json::find_top_level_field(t_obj, "t")
        .map_err(|_| Error::Format("malformed \"t\" object"))?
        .ok_or(Error::Format("\"t\" object missing nested \"t\""))?;
    let new_timetoken = (t_start + tt_start, t_start + tt_end);

    let (m_start, m_end) = json::find_top_level_field(body, "m")
        .map_err(|_| Error::Format("subscribe response is not a JSON object"))?
        .ok_or(Error::Format("subscribe response missing \"m\""))?;
    let m_arr = &body[m_start..m_end];

    let entries = json::skim_array_elements(m_arr).map_err(|_| Error::Format("\"m\" is not a JSON array"))?;

    let mut messages = Vec::with_capacity(entries.len());
    for (entry_start, entry_end) in entries {
        let entry = &m_arr[entry_start..entry_end];
        let (c_start, c_end) = json::find_top_level_field(entry, "c")
            .map_err(|_| Error::Format("malformed message entry"))?
            .ok_or(Error::Format("message entry missing \"c\""))?;
        let (d_start, d_end) = json::find_top_level_field(entry, "d")
            .map_err(|_| Error::Format("malformed message entry"))?
            .ok_or(Error::Format("message entry missing \"d\""))?;

        let base = m_start + entry_start;
        messages.push(SlicedMessage {
            channel: (base + c_start, base + c_end),
            payload: (base + d_start, base + d_end),
        });
    }

    Ok(SlicedResponse {
        new_timetoken,
        messages,
    })
}

/// Initial timetoken for a fresh context: acts as "connect",
/// establishing the starting point in the stream.
pub const INITIAL_TIMETOKEN: &str = "0";
