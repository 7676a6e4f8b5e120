//! Zero-copy JSON skimmer.
//!
//! Not a general parser: it locates top-level `"name":VALUE` pairs and
//! element boundaries by counting quotes and matched brackets with
//! escape handling, and reports byte ranges into the caller's buffer.
//! Callers receive `(offset, len)` slices, never owned copies.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("response body is not well-formed JSON at the point the skimmer needed to read")]
pub struct JsonSkimError;

/// Byte range `[start, end)` of a value within the buffer that was
/// skimmed.
pub type Span = (usize, usize);

fn skip_ws(buf: &[u8], mut i: usize) -> usize {
    while matches!(buf.get(i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        i += 1;
    }
    i
}

/// Scan a JSON string starting at `buf[start] == '"'`, returning the
/// index just past the closing quote.
fn scan_string(buf: &[u8], start: usize) -> Result<usize, JsonSkimError> {
    if buf.get(start) != Some(&b'"') {
        return Err(JsonSkimError);
    }
    let mut i = start + 1;
    loop {
        match buf.get(i) {
            None => return Err(JsonSkimError),
            Some(b'\\') => i += 2,
            Some(b'"') => return Ok(i + 1),
            Some(_) => i += 1,
        }
    }
}

/// Scan a bracketed value (`{...}` or `[...]`) starting at `buf[start]`,
/// returning the index just past the matching close bracket. Brackets
/// inside strings are not counted.
fn scan_bracketed(buf: &[u8], start: usize) -> Result<usize, JsonSkimError> {
    let open = *buf.get(start).ok_or(JsonSkimError)?;
    let close = match open {
        b'{' => b'}',
        b'[' => b']',
        _ => return Err(JsonSkimError),
    };
    let mut depth = 0u32;
    let mut i = start;
    loop {
        match buf.get(i) {
            None => return Err(JsonSkimError),
            Some(b'"') => i = scan_string(buf, i)?,
            Some(&b) if b == open => {
                depth += 1;
                i += 1;
            }
            Some(&b) if b == close => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            Some(_) => i += 1,
        }
    }
}

/// Scan a bare scalar (number, `true`, `false`, `null`) starting at
/// `buf[start]`, stopping at the first structural delimiter or
/// whitespace.
fn scan_scalar(buf: &[u8], start: usize) -> Result<usize, JsonSkimError> {
    let mut i = start;
    if buf.get(i).is_none() {
        return Err(JsonSkimError);
    }
    while let Some(&b) = buf.get(i) {
        if matches!(b, b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') {
            break;
        }
        i += 1;
    }
    if i == start {
        return Err(JsonSkimError);
    }
    Ok(i)
}

/// Find the end of the JSON value starting at `buf[start]`.
pub fn value_end(buf: &[u8], start: usize) -> Result<usize, JsonSkimError> {
    match buf.get(start) {
        Some(b'"') => scan_string(buf, start),
        Some(b'{') | Some(b'[') => scan_bracketed(buf, start),
        Some(_) => scan_scalar(buf, start),
        None => Err(JsonSkimError),
    }
}

/// Locate the value of a top-level `"name"` field in a buffer whose
/// first non-whitespace byte is `{`.
pub fn find_top_level_field(buf: &[u8], name: &str) -> Result<Option<Span>, JsonSkimError> {
    let mut i = skip_ws(buf, 0);
    if buf.get(i) != Some(&b'{') {
        return Err(JsonSkimError);
    }
    i += 1;
    i = skip_ws(buf, i);
    if buf.get(i) == Some(&b'}') {
        return Ok(None);
    }

    loop {
        if buf.get(i) != Some(&b'"') {
            return Err(JsonSkimError);
        }
        let key_start = i;
        let key_end = scan_string(buf, i)?;
        let key_matches = &buf[key_start + 1..key_end - 1] == name.as_bytes();
        i = skip_ws(buf, key_end);
        if buf.get(i) != Some(&b':') {
            return Err(JsonSkimError);
        }
        i = skip_ws(buf, i + 1);
        let val_start = i;
        let val_end = value_end(buf, i)?;
        if key_matches {
            return Ok(Some((val_start, val_end)));
        }
        i = skip_ws(buf, val_end);
        match buf.get(i) {
            Some(b',') => {
                i = skip_ws(buf, i + 1);
            }
            Some(b'}') => return Ok(None),
            _ => return Err(JsonSkimError),
        }
    }
}

/// Iterate the top-level `"key": value` pairs of an object (`buf[0] ==
/// '{'`), returning each key's span (quotes included) and each value's
/// span, in the order they appear in the buffer.
pub fn iter_top_level_fields(buf: &[u8]) -> Result<Vec<(Span, Span)>, JsonSkimError> {
    let mut i = skip_ws(buf, 0);
    if buf.get(i) != Some(&b'{') {
        return Err(JsonSkimError);
    }
    i = skip_ws(buf, i + 1);
    let mut out = Vec::new();
    if buf.get(i) == Some(&b'}') {
        return Ok(out);
    }
    loop {
        if buf.get(i) != Some(&b'"') {
            return Err(JsonSkimError);
        }
        let key_start = i;
        let key_end = scan_string(buf, i)?;
        i = skip_ws(buf, key_end);
        if buf.get(i) != Some(&b':') {
            return Err(JsonSkimError);
        }
        i = skip_ws(buf, i + 1);
        let val_start = i;
        let val_end = value_end(buf, i)?;
        out.push(((key_start, key_end), (val_start, val_end)));
        i = skip_ws(buf, val_end);
        match buf.get(i) {
            Some(b',') => i = skip_ws(buf, i + 1),
            Some(b'}') => return Ok(out),
            _ => return Err(JsonSkimError),
        }
    }
}

/// Split a top-level JSON array (`buf[0] == '['`) into the byte ranges
/// of its elements, in order.
pub fn skim_array_elements(buf: &[u8]) -> Result<Vec<Span>, JsonSkimError> {
    let mut i = skip_ws(buf, 0);
    if buf.get(i) != Some(&b'[') {
        return Err(JsonSkimError);
    }
    i = skip_ws(buf, i + 1);
    let mut out = Vec::new();
    if buf.get(i) == Some(&b']') {
        return Ok(out);
    }
    loop {
        let val_start = i;
        let val_end = value_end(buf, i)?;
        out.push((val_start, val_end));
        i = skip_ws(buf, val_end);
        match buf.get(i) {
            Some(b',') => i = skip_ws(buf, i + 1),
            Some(b']') => return Ok(out),
            _ => return Err(JsonSkimError),
        }
    }
}

/// Interpret a scalar span as a JSON string body (quotes stripped, no
/// unescaping — callers needing unescaped text must do that explicitly).
pub fn span_as_raw_str(buf: &[u8], span: Span) -> &[u8] {
    let (start, end) = span;
    if end - start >= 2 && buf[start] == b'"' && buf[end - 1] == b'"' {
        &buf[start + 1..end - 1]
    } else {
        &buf[start..end]
    }
}

/// Parse a scalar span as a non-negative decimal integer.
pub fn span_as_u64(buf: &[u8], span: Span) -> Option<u64> {
    let (start, end) = span;
    std::str::from_utf8(&buf[start..end]).ok()?.parse().ok()
}
