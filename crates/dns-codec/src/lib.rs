//! Minimal DNS query/response wire codec (RFC 1035), built for exactly
//! the one thing a hosted pub/sub client needs from DNS: resolve a
//! hostname to an address without pulling in an async-DNS stack.
//!
//! Every decode path is bounds-checked against the captured datagram
//! length independent of what the datagram's own length fields claim,
//! and pointer-compression chasing is capped at a fixed hop count so a
//! corrupt or adversarial response can never cause an unbounded loop or
//! an out-of-bounds read.

mod error;
mod label;
mod query;
mod response;

pub use error::DnsCodecError;
pub use query::{build_query, QType};
pub use response::{decode_response, DnsAddress};
