//! Info-hash extraction for `.torrent` files.
//!
//! Only enough bencode is understood to find the raw bytes of the top-level
//! `info` dictionary; the hash is SHA-1 over exactly those bytes (BEP 3).

use sha1::{Digest, Sha1};

const MAX_DEPTH: usize = 64;

/// Uppercase hex SHA-1 of the `info` dictionary.
pub fn info_hash(torrent: &[u8]) -> Result<String, String> {
    let info = info_span(torrent)?;
    Ok(hex::encode_upper(Sha1::digest(info)))
}

fn info_span(buf: &[u8]) -> Result<&[u8], String> {
    if buf.first() != Some(&b'd') {
        return Err("top level is not a dictionary".into());
    }
    let mut pos = 1;
    let mut info = None;
    loop {
        match buf.get(pos) {
            Some(b'e') => break,
            Some(_) => {
                let (key, value_start) = read_bytes(buf, pos)?;
                let value_end = skip_value(buf, value_start, 1)?;
                if key == b"info" {
                    info = Some(&buf[value_start..value_end]);
                }
                pos = value_end;
            }
            None => return Err("unterminated dictionary".into()),
        }
    }
    match info {
        Some(span) if span.first() == Some(&b'd') => Ok(span),
        Some(_) => Err("info is not a dictionary".into()),
        None => Err("missing info dictionary".into()),
    }
}

/// Reads a `<len>:<bytes>` string at `pos`, returning it and the position after it.
fn read_bytes(buf: &[u8], pos: usize) -> Result<(&[u8], usize), String> {
    let colon = buf[pos..]
        .iter()
        .position(|&b| b == b':')
        .map(|i| pos + i)
        .ok_or("string without length separator")?;
    let len: usize = std::str::from_utf8(&buf[pos..colon])
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or("invalid string length")?;
    let start = colon + 1;
    let end = start.checked_add(len).ok_or("string length overflow")?;
    if end > buf.len() {
        return Err("string runs past end of input".into());
    }
    Ok((&buf[start..end], end))
}

fn skip_value(buf: &[u8], pos: usize, depth: usize) -> Result<usize, String> {
    if depth > MAX_DEPTH {
        return Err("nesting too deep".into());
    }
    match buf.get(pos) {
        Some(b'i') => {
            let end = buf[pos..]
                .iter()
                .position(|&b| b == b'e')
                .map(|i| pos + i)
                .ok_or("unterminated integer")?;
            let digits = &buf[pos + 1..end];
            let digits = digits.strip_prefix(b"-").unwrap_or(digits);
            if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
                return Err("invalid integer".into());
            }
            Ok(end + 1)
        }
        Some(b'l') | Some(b'd') => {
            let is_dict = buf[pos] == b'd';
            let mut cur = pos + 1;
            loop {
                match buf.get(cur) {
                    Some(b'e') => return Ok(cur + 1),
                    Some(_) => {
                        if is_dict {
                            cur = read_bytes(buf, cur)?.1;
                        }
                        cur = skip_value(buf, cur, depth + 1)?;
                    }
                    None => return Err("unterminated container".into()),
                }
            }
        }
        Some(b'0'..=b'9') => Ok(read_bytes(buf, pos)?.1),
        Some(other) => Err(format!("unexpected byte {:#04x}", other)),
        None => Err("unexpected end of input".into()),
    }
}
