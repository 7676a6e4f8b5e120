//! GZIP container framing around a raw DEFLATE stream.
//!
//! The compressed payload is produced by `flate2`'s raw deflate backend;
//! the 10-byte GZIP header and the CRC-32 + ISIZE trailer are assembled
//! by hand, since the caller needs to decide (based on the resulting
//! size) whether compression was worth sending at all.

mod crc32;

pub use crc32::{crc32, Crc32};

use flate2::{Compress, Compression, FlushCompress, Status};

#[derive(Debug, thiserror::Error)]
pub enum GzipError {
    #[error("deflate stream did not consume the full input")]
    BadCompression,
    #[error("deflate backend reported an error")]
    DeflateFailed,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const CM_DEFLATE: u8 = 8;

/// Compress `input` into a complete GZIP byte stream.
///
/// Returns the full container (header + deflate body + trailer). Callers
/// that only want to send a compressed body when it is actually smaller
/// should compare `result.len()` against `input.len()` themselves — this
/// function always compresses; the skip-if-not-worthwhile policy lives
/// with the caller.
pub fn compress(input: &[u8], level: Compression) -> Result<Vec<u8>, GzipError> {
    let mut out = Vec::with_capacity(input.len() / 2 + 18);
    out.extend_from_slice(&GZIP_MAGIC);
    out.push(CM_DEFLATE);
    out.push(0); // FLG: no extra fields, no name, no comment, no CRC16
    out.extend_from_slice(&[0, 0, 0, 0]); // MTIME: not tracked
    out.push(0); // XFL
    out.push(0xFF); // OS: unknown

    let deflated = deflate_raw(input)?;
    out.extend_from_slice(&deflated);

    out.extend_from_slice(&crc32(input).to_le_bytes());
    out.extend_from_slice(&(input.len() as u32).to_le_bytes());

    Ok(out)
}

fn deflate_raw(input: &[u8]) -> Result<Vec<u8>, GzipError> {
    let mut compressor = Compress::new(Compression::default(), false);
    let mut out = Vec::with_capacity(input.len());
    let mut buf = [0u8; 8192];

    let mut offset = 0;
    loop {
        let before_in = compressor.total_in();
        let status = compressor
            .compress(&input[offset..], &mut buf, FlushCompress::Finish)
            .map_err(|_| GzipError::DeflateFailed)?;
        let consumed = (compressor.total_in() - before_in) as usize;
        offset += consumed;
        let produced = compressor.total_out() as usize - out.len();
        out.extend_from_slice(&buf[..produced]);

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if offset >= input.len() && produced == 0 {
                    return Err(GzipError::DeflateFailed);
                }
            }
        }
    }

    if offset != input.len() {
        return Err(GzipError::BadCompression);
    }

    Ok(out)
}
