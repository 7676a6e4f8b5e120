//! Channel-group membership operations: `add_channel_to_group`,
//! `remove_channel_from_group`, `remove_channel_group`.
//!
//! Each operation is its own transaction; the server documents a
//! propagation delay before membership changes are visible to a
//! subsequent subscribe — this module has no way to wait that out and
//! does not attempt to. The delay is a caller-observed property, not
//! something this engine enforces.

use crate::error::Error;
use crate::json;

/// Verify a channel-group mutation response envelope
/// (`{"status":200,"message":"OK","service":"channel-registry"}` on
/// success, `{"error":true,...}` on failure).
pub fn check_ack_response(body: &[u8]) -> Result<(), Error> {
    if let Ok(Some((s, e))) = json::find_top_level_field(body, "error") {
        if &body[s..e] == b"true" {
            return Err(Error::ServerError);
        }
    }
    if let Ok(Some((s, e))) = json::find_top_level_field(body, "status") {
        let status = json::span_as_u64(body, (s, e)).unwrap_or(0);
        if !(200..300).contains(&status) {
            return Err(Error::ServerError);
        }
    }
    Ok(())
}
