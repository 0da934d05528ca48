//! # Parser
//!
//! Module dedicated to PGP/MIME message parsing (RFC 3156).
//!
//! The signed part of a `multipart/signed` message is taken from the
//! raw bytes, not from a decoded MIME tree: a single byte of
//! difference invalidates the signature.

use std::{borrow::Cow, collections::BTreeMap};

use mail_parser::MessageParser;
use tracing::{debug, trace};

use crate::{
    qp,
    utils::{find, normalize_crlf, trim},
    Error, Result,
};

const BEGIN_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";
const END_SIGNATURE: &str = "-----END PGP SIGNATURE-----";

/// The parts of a `multipart/signed` message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignedParts {
    /// The exact signed bytes, with CRLF line endings.
    pub signed: Vec<u8>,
    /// The detached signature, transfer decoded.
    pub signature: Vec<u8>,
    pub micalg: Option<String>,
}

/// Returns `true` if the given content type is a PGP/MIME signed one.
///
/// The check is case-sensitive.
pub fn is_signed_message(ctype: &str) -> bool {
    ctype.contains("multipart/signed") && ctype.contains("application/pgp-signature")
}

/// Returns `true` if the given content type is a PGP/MIME encrypted
/// one.
///
/// The check is case-sensitive.
pub fn is_encrypted_message(ctype: &str) -> bool {
    ctype.contains("multipart/encrypted") && ctype.contains("application/pgp-encrypted")
}

/// Parses a raw `multipart/signed` message (or part).
pub fn parse_pgp_mime(raw: &[u8]) -> Result<SignedParts> {
    let ctype = find_content_type(raw)?;

    if !is_signed_message(&ctype) {
        return Err(Error::NotSignedError(ctype));
    }

    let boundary = find_boundary(&ctype).ok_or_else(|| Error::MissingBoundaryError(ctype.clone()))?;
    let (_, body) = split_headers(raw).ok_or(Error::MissingHeaderSeparatorError)?;

    debug!(%boundary, "parse multipart/signed");

    let parts = split_parts(body, &boundary);
    let (signed, signature) = match parts.as_slice() {
        [signed, signature, ..] => (*signed, *signature),
        _ => return Err(Error::MissingSecondPartError(boundary)),
    };

    Ok(SignedParts {
        signed: normalize_crlf(signed),
        signature: decode_signature(signature),
        micalg: find_param(&ctype, "micalg"),
    })
}

/// Parses a raw `multipart/encrypted` message (or part) and returns
/// its armored ciphertext.
pub fn parse_encrypted_mime(raw: &[u8]) -> Result<Vec<u8>> {
    let ctype = find_content_type(raw)?;

    if !is_encrypted_message(&ctype) {
        return Err(Error::NotEncryptedError(ctype));
    }

    let boundary = find_boundary(&ctype).ok_or_else(|| Error::MissingBoundaryError(ctype.clone()))?;
    let (_, body) = split_headers(raw).ok_or(Error::MissingHeaderSeparatorError)?;

    debug!(%boundary, "parse multipart/encrypted");

    let parts = split_parts(body, &boundary);
    let part = parts
        .get(1)
        .ok_or_else(|| Error::MissingSecondPartError(boundary.clone()))?;

    let ciphertext = match split_headers(part) {
        Some((_, body)) => trim(body),
        None => trim(part),
    };

    if ciphertext.is_empty() {
        return Err(Error::MissingSecondPartError(boundary));
    }

    Ok(ciphertext.to_vec())
}

/// Extracts the exact bytes of the first part of the given multipart
/// body, with CRLF line endings.
///
/// The line break preceding the next delimiter belongs to the
/// delimiter, so it is not part of the content.
pub fn extract_signed_content(body: &[u8], boundary: &str) -> Result<Vec<u8>> {
    match split_parts(body, boundary).as_slice() {
        [signed, _, ..] => Ok(normalize_crlf(signed)),
        _ => Err(Error::MissingSecondPartError(boundary.to_owned())),
    }
}

/// Finds the `Content-Type` header value in the top header block,
/// continuation lines joined.
pub fn find_content_type(raw: &[u8]) -> Result<String> {
    let headers = match split_headers(raw) {
        Some((headers, _)) => headers,
        None => raw,
    };

    parse_headers(&String::from_utf8_lossy(headers))
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-type"))
        .map(|(_, val)| val)
        .ok_or(Error::MissingContentTypeError)
}

/// Finds the boundary parameter of the given content type.
pub fn find_boundary(ctype: &str) -> Option<String> {
    find_param(ctype, "boundary").filter(|boundary| !boundary.is_empty())
}

/// Finds the given parameter of a structured header value.
///
/// RFC 2231 continuations (`name*0`, `name*1*`…) are concatenated in
/// order and their percent-encoded segments decoded.
pub fn find_param(value: &str, name: &str) -> Option<String> {
    let mut segments: BTreeMap<usize, String> = BTreeMap::new();

    for param in split_params(value).into_iter().skip(1) {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };

        let key = key.trim().to_ascii_lowercase();
        let val = unquote(val.trim());

        if key == name {
            return Some(val.into_owned());
        }

        let Some(section) = key.strip_prefix(name).and_then(|key| key.strip_prefix('*')) else {
            continue;
        };

        if section.is_empty() {
            segments.insert(0, decode_extended_value(&val, true));
            continue;
        }

        let (index, extended) = match section.strip_suffix('*') {
            Some(index) => (index, true),
            None => (section, false),
        };

        if let Ok(index) = index.parse::<usize>() {
            let val = if extended {
                decode_extended_value(&val, index == 0)
            } else {
                val.into_owned()
            };
            segments.insert(index, val);
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.into_values().collect())
    }
}

/// Splits the given raw message (or part) into its header block and
/// its body, without the blank separator line.
pub fn split_headers(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(body) = raw.strip_prefix(b"\r\n") {
        return Some((&[], body));
    }

    if let Some(body) = raw.strip_prefix(b"\n") {
        return Some((&[], body));
    }

    let crlf = find(raw, b"\r\n\r\n", 0).map(|pos| (pos, pos + 4));
    let lf = find(raw, b"\n\n", 0).map(|pos| (pos, pos + 2));

    let (end, start) = match (crlf, lf) {
        (Some(crlf), Some(lf)) if lf.0 < crlf.0 => lf,
        (Some(crlf), _) => crlf,
        (None, Some(lf)) => lf,
        (None, None) => return None,
    };

    Some((&raw[..end], &raw[start..]))
}

/// Parses the given header block into unfolded `(name, value)` pairs.
pub fn parse_headers(block: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in block.lines() {
        if line.starts_with(|c: char| c == ' ' || c == '\t') {
            if let Some((_, val)) = headers.last_mut() {
                val.push(' ');
                val.push_str(line.trim());
            }
            continue;
        }

        if let Some((key, val)) = line.split_once(':') {
            headers.push((key.trim().to_owned(), val.trim().to_owned()));
        }
    }

    headers
}

/// Splits the given multipart body into raw parts.
///
/// The preamble and the epilogue are dropped. A last part without
/// closing delimiter is kept, trimmed.
fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();

    let Some(mut pos) = find_delimiter(body, delimiter, 0) else {
        return parts;
    };

    loop {
        let after = pos + delimiter.len();

        if body[after..].starts_with(b"--") {
            break;
        }

        // skip transport padding until the end of the delimiter line
        let Some(start) = find(body, b"\n", after).map(|pos| pos + 1) else {
            break;
        };

        match find_delimiter(body, delimiter, start) {
            Some(next) => {
                let mut end = next;

                if end > start && body[end - 1] == b'\n' {
                    end -= 1;
                    if end > start && body[end - 1] == b'\r' {
                        end -= 1;
                    }
                }

                parts.push(&body[start..end]);
                pos = next;
            }
            None => {
                let part = trim(&body[start..]);
                if !part.is_empty() {
                    parts.push(part);
                }
                break;
            }
        }
    }

    trace!(parts = parts.len(), "multipart body split");
    parts
}

/// Finds the next delimiter line, which must start a line and must
/// not be the prefix of a longer boundary.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut from = from;

    while let Some(pos) = find(body, delimiter, from) {
        let line_start = pos == 0 || body[pos - 1] == b'\n';
        let rest = &body[pos + delimiter.len()..];
        let line_end = match rest.first().copied() {
            None => true,
            Some(b'\r' | b'\n' | b' ' | b'\t') => true,
            Some(_) => rest.starts_with(b"--"),
        };

        if line_start && line_end {
            return Some(pos);
        }

        from = pos + 1;
    }

    None
}

/// Decodes the raw signature part.
///
/// The part is first decoded as a regular MIME part. If the result is
/// not a well-formed armored signature, the raw body is
/// quoted-printable decoded by hand, which copes with broken soft
/// line breaks.
fn decode_signature(part: &[u8]) -> Vec<u8> {
    let decoded = MessageParser::new()
        .parse(part)
        .and_then(|msg| msg.part(0).map(|part| trim(part.contents()).to_vec()))
        .unwrap_or_default();

    if is_armored_signature(&decoded) {
        return decoded;
    }

    let body = match split_headers(part) {
        Some((_, body)) => body,
        None => part,
    };

    let manually_decoded = qp::decode(body);
    let manually_decoded = trim(&manually_decoded);

    if is_armored_signature(manually_decoded) {
        debug!("signature decoded using the fallback quoted-printable decoder");
        return manually_decoded.to_vec();
    }

    if decoded.is_empty() {
        trim(body).to_vec()
    } else {
        decoded
    }
}

/// Checks that the given bytes form an armored signature whose body
/// is made of armor headers and base64 lines only.
fn is_armored_signature(bytes: &[u8]) -> bool {
    let Ok(armor) = std::str::from_utf8(trim(bytes)) else {
        return false;
    };

    let Some(armor) = armor
        .strip_prefix(BEGIN_SIGNATURE)
        .and_then(|armor| armor.strip_suffix(END_SIGNATURE))
    else {
        return false;
    };

    armor.lines().all(|line| {
        if line.contains(": ") {
            return true;
        }

        let (data, padding) = match line.strip_prefix('=') {
            // checksum line
            Some(checksum) => (checksum, ""),
            None => line.split_at(line.find('=').unwrap_or(line.len())),
        };

        data.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
            && padding.chars().all(|c| c == '=')
    })
}

fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => (),
        }
    }

    params.push(&value[start..]);
    params
}

fn unquote(val: &str) -> Cow<str> {
    match val.strip_prefix('"').and_then(|val| val.strip_suffix('"')) {
        Some(val) if val.contains('\\') => Cow::Owned(val.replace("\\\"", "\"").replace("\\\\", "\\")),
        Some(val) => Cow::Borrowed(val),
        None => Cow::Borrowed(val),
    }
}

/// Decodes a RFC 2231 extended value. The first section may start
/// with `charset'language'`.
fn decode_extended_value(val: &str, first: bool) -> String {
    let val = if first {
        match val.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
            [_, _, rest] => *rest,
            _ => val,
        }
    } else {
        val
    };

    let bytes = val.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let hex = bytes
            .get(i + 1..i + 3)
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());

        match (bytes[i], hex) {
            (b'%', Some(byte)) => {
                decoded.push(byte);
                i += 3;
            }
            (byte, _) => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
