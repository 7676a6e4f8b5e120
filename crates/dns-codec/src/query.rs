//! DNS query message construction (RFC 1035 §4.1).

use crate::error::DnsCodecError;
use crate::label::encode_name;

const CLASS_IN: u16 = 1;

/// Resource record types this codec knows how to request and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QType {
    A,
    Aaaa,
}

impl QType {
    fn code(self) -> u16 {
        match self {
            QType::A => 1,
            QType::Aaaa => 28,
        }
    }

    fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(QType::A),
            28 => Some(QType::Aaaa),
            _ => None,
        }
    }
}

/// Build a standard recursive query for `host` with a single question.
///
/// `id` should be unpredictable per transaction (the caller supplies it
/// so it can be stored and matched against the response's id field).
pub fn build_query(id: u16, host: &str, qtype: QType) -> Result<Vec<u8>, DnsCodecError> {
    let mut buf = Vec::with_capacity(32 + host.len());

    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&0x0100u16.to_be_bytes()); // RD=1, everything else 0
    buf.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    buf.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
    buf.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    buf.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT

    encode_name(host, &mut buf)?;
    buf.extend_from_slice(&qtype.code().to_be_bytes());
    buf.extend_from_slice(&CLASS_IN.to_be_bytes());

    Ok(buf)
}

pub(crate) fn qtype_from_code(code: u16) -> Option<QType> {
    QType::from_code(code)
}
