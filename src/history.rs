//! Advanced-history decoder: parses per-channel message-count responses
//! into caller-supplied arrays. Feature-gated behind `advanced-history`.

use crate::error::Error;
use crate::json;

/// A decoded `(channel, count)` pair in server response order.
pub struct ChannelCount {
    pub channel: String,
    pub count: u64,
}

/// Sentinel placed at indices for channels the response did not
/// mention, in the input-channel-order view.
pub const MISSING_CHANNEL_SENTINEL: i64 = -1;

/// Verify the envelope and return the `(channel, count)` pairs in the
/// order the server returned them, truncated (not failing) to
/// `capacity` entries.
pub fn parse_response_order(body: &[u8], capacity: usize) -> Result<Vec<ChannelCount>, Error> {
    let channels_obj = validate_envelope(body)?;

    let fields = json::iter_top_level_fields(channels_obj)
        .map_err(|_| Error::Format("\"channels\" is not a JSON object"))?;

    let mut out = Vec::with_capacity(fields.len().min(capacity));
    for (key_span, val_span) in fields {
        if out.len() >= capacity {
            break;
        }
        let channel = String::from_utf8_lossy(json::span_as_raw_str(channels_obj, key_span)).into_owned();
        let count = json::span_as_u64(channels_obj, val_span)
            .ok_or(Error::Format("channel count is not a non-negative integer"))?;
        out.push(ChannelCount { channel, count });
    }
    Ok(out)
}

/// Verify the envelope and return counts in the order of the caller's
/// `input_channels`, with [`MISSING_CHANNEL_SENTINEL`] for channels the
/// response did not mention.
pub fn parse_input_order(body: &[u8], input_channels: &[&str]) -> Result<Vec<i64>, Error> {
    let channels_obj = validate_envelope(body)?;

    let fields = json::iter_top_level_fields(channels_obj)
        .map_err(|_| Error::Format("\"channels\" is not a JSON object"))?;

    let mut out = Vec::with_capacity(input_channels.len());
    for &wanted in input_channels {
        let mut found = None;
        for (key_span, val_span) in &fields {
            let key = json::span_as_raw_str(channels_obj, *key_span);
            if key == wanted.as_bytes() {
                let count = json::span_as_u64(channels_obj, *val_span)
                    .ok_or(Error::Format("channel count is not a non-negative integer"))?;
                found = Some(count as i64);
                break;
            }
        }
        out.push(found.unwrap_or(MISSING_CHANNEL_SENTINEL));
    }
    Ok(out)
}

fn validate_envelope(body: &[u8]) -> Result<&[u8], Error> {
    let (err_start, err_end) = json::find_top_level_field(body, "error")
        .map_err(|_| Error::Format("history response is not a JSON object"))?
        .ok_or(Error::Format("history response missing \"error\""))?;
    if &body[err_start..err_end] != b"false" {
        return Err(Error::ServerError);
    }
    let (ch_start, ch_end) = json::find_top_level_field(body, "channels")
        .map_err(|_| Error::Format("history response is not a JSON object"))?
        .ok_or(Error::Format("history response missing \"channels\""))?;
    Ok(&body[ch_start..ch_end])
}
