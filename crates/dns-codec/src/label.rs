//! DNS domain-name encoding and decoding (RFC 1035 §3.1, §4.1.4).

use crate::error::DnsCodecError;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_HOPS: u8 = 12;
const POINTER_TAG: u8 = 0b1100_0000;

/// Encode `host` (e.g. "example.com") as a sequence of length-prefixed
/// labels terminated by a zero byte, appended to `out`.
///
/// No compression is ever emitted on encode — outbound queries always
/// write the name out in full.
pub fn encode_name(host: &str, out: &mut Vec<u8>) -> Result<(), DnsCodecError> {
    let mut encoded_len = 0usize;
    for label in host.split('.') {
        if label.is_empty() {
            continue;
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsCodecError::LabelTooLong);
        }
        encoded_len += label.len() + 1;
        if encoded_len > MAX_NAME_LEN {
            return Err(DnsCodecError::NameTooLong);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

/// Decode a domain name starting at `start` within `buf`, following
/// pointer compression where present.
///
/// Returns the decoded name (dot-joined labels) and the offset
/// immediately following the name *as it appeared at `start`* — i.e.
/// after a terminating zero byte, or after the two bytes of a pointer,
/// whichever ends the name at its original position. This is the
/// offset the caller should resume parsing from for subsequent fields
/// in the same record.
pub fn decode_name(buf: &[u8], start: usize) -> Result<(String, usize), DnsCodecError> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor = start;
    let mut hops = 0u8;
    let mut end_of_name: Option<usize> = None;
    let mut total_len = 0usize;

    loop {
        let tag = *buf.get(cursor).ok_or(DnsCodecError::OutOfBounds)?;

        if tag == 0 {
            if end_of_name.is_none() {
                end_of_name = Some(cursor + 1);
            }
            break;
        }

        if tag & POINTER_TAG == POINTER_TAG {
            let lo = *buf.get(cursor + 1).ok_or(DnsCodecError::OutOfBounds)?;
            let target = (usize::from(tag & !POINTER_TAG) << 8) | usize::from(lo);

            if end_of_name.is_none() {
                end_of_name = Some(cursor + 2);
            }

            if target >= cursor || target < 12 {
                return Err(DnsCodecError::BadPointerTarget);
            }
            hops += 1;
            if hops > MAX_POINTER_HOPS {
                return Err(DnsCodecError::TooManyPointerHops);
            }
            cursor = target;
            continue;
        }

        if tag & POINTER_TAG != 0 {
            // Reserved label-type bits (0x40/0x80) — not supported.
            return Err(DnsCodecError::OutOfBounds);
        }

        let len = usize::from(tag);
        let label_start = cursor + 1;
        let label_end = label_start
            .checked_add(len)
            .ok_or(DnsCodecError::OutOfBounds)?;
        if label_end > buf.len() {
            return Err(DnsCodecError::OutOfBounds);
        }
        let label_bytes = &buf[label_start..label_end];
        let label = std::str::from_utf8(label_bytes)
            .map_err(|_| DnsCodecError::OutOfBounds)?
            .to_owned();

        total_len += label.len() + 1;
        if total_len > MAX_NAME_LEN {
            return Err(DnsCodecError::NameTooLong);
        }
        labels.push(label);
        cursor = label_end;
    }

    let end = end_of_name.ok_or(DnsCodecError::OutOfBounds)?;
    Ok((labels.join("."), end))
}
