//! DNS response message decoding (RFC 1035 §4.1), with every read
//! bounds-checked against the captured datagram length — a response
//! is never trusted to describe its own size correctly.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::DnsCodecError;
use crate::label::decode_name;
use crate::query::{qtype_from_code, QType};

const HEADER_LEN: usize = 12;

/// A decoded answer-section address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

/// Parse a response datagram, validating the header and walking every
/// resource record, and return the address records matching `qtype`
/// for `expected_id`.
///
/// Ordering of the answer section is preserved (§4.3 of the protocol
/// this codec mirrors defines no reordering).
pub fn decode_response(
    buf: &[u8],
    expected_id: u16,
    qtype: QType,
) -> Result<Vec<DnsAddress>, DnsCodecError> {
    if buf.len() < HEADER_LEN {
        return Err(DnsCodecError::TruncatedHeader);
    }

    let id = u16::from_be_bytes([buf[0], buf[1]]);
    if id != expected_id {
        return Err(DnsCodecError::IdMismatch);
    }

    let flags = u16::from_be_bytes([buf[2], buf[3]]);
    let rcode = (flags & 0x000F) as u8;
    if rcode != 0 {
        return Err(DnsCodecError::ServerError(rcode));
    }

    let qdcount = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    let ancount = u16::from_be_bytes([buf[6], buf[7]]) as usize;

    let mut cursor = HEADER_LEN;

    for _ in 0..qdcount {
        let (_, after_name) = decode_name(buf, cursor)?;
        cursor = after_name
            .checked_add(4) // QTYPE + QCLASS
            .ok_or(DnsCodecError::OutOfBounds)?;
        if cursor > buf.len() {
            return Err(DnsCodecError::OutOfBounds);
        }
    }

    let mut addresses = Vec::new();

    for _ in 0..ancount {
        let (_, after_name) = decode_name(buf, cursor)?;
        cursor = after_name;

        let fixed_end = cursor
            .checked_add(10) // TYPE(2) CLASS(2) TTL(4) RDLENGTH(2)
            .ok_or(DnsCodecError::OutOfBounds)?;
        if fixed_end > buf.len() {
            return Err(DnsCodecError::OutOfBounds);
        }

        let rtype = u16::from_be_bytes([buf[cursor], buf[cursor + 1]]);
        let rdlength = u16::from_be_bytes([buf[cursor + 8], buf[cursor + 9]]) as usize;

        let rdata_start = fixed_end;
        let rdata_end = rdata_start
            .checked_add(rdlength)
            .ok_or(DnsCodecError::RdataOverrun)?;
        if rdata_end > buf.len() {
            return Err(DnsCodecError::RdataOverrun);
        }
        let rdata = &buf[rdata_start..rdata_end];

        if let Some(record_qtype) = qtype_from_code(rtype) {
            if record_qtype == qtype {
                match record_qtype {
                    QType::A if rdata.len() == 4 => {
                        addresses.push(DnsAddress::V4(Ipv4Addr::new(
                            rdata[0], rdata[1], rdata[2], rdata[3],
                        )));
                    }
                    QType::Aaaa if rdata.len() == 16 => {
                        let mut octets = [0u8; 16];
                        octets.copy_from_slice(rdata);
                        addresses.push(DnsAddress::V6(Ipv6Addr::from(octets)));
                    }
                    _ => {}
                }
            }
        }

        cursor = rdata_end;
    }

    if addresses.is_empty() {
        return Err(DnsCodecError::NoAddressRecord);
    }

    Ok(addresses)
}
