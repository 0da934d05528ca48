//! Module dedicated to gpg output helpers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::validate::is_hex_key_id;

/// Parses a gpg timestamp.
///
/// Gpg emits either seconds since epoch or, with some options, an ISO
/// 8601 basic format like `20240131T120000`. Empty fields and `0`
/// mean "no date".
pub(crate) fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    let field = field.trim();

    if field.is_empty() || field == "0" {
        return None;
    }

    if field.chars().all(|c| c.is_ascii_digit()) {
        let secs = field.parse::<i64>().ok()?;
        return Utc.timestamp_opt(secs, 0).single();
    }

    NaiveDateTime::parse_from_str(field, "%Y%m%dT%H%M%S")
        .ok()
        .map(|date| Utc.from_utc_datetime(&date))
}

/// Decodes the `\xNN` escapes gpg uses in colon listings and status
/// lines (for example `\x3a` for a colon).
pub(crate) fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            let byte = std::str::from_utf8(&bytes[i + 2..i + 4])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = byte {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Returns the long (16 hex chars) key ID of the given key ID or
/// fingerprint, uppercased.
///
/// Anything that is not hexadecimal is returned as it is, uppercased.
pub(crate) fn long_key_id(id: &str) -> String {
    let id = id.trim().to_ascii_uppercase();
    if id.len() > 16 && is_hex_key_id(&id) {
        id[id.len() - 16..].to_owned()
    } else {
        id
    }
}

/// Returns the name of an OpenPGP public key algorithm ID (RFC 4880
/// section 9.1).
pub(crate) fn pubkey_algo_name(id: &str) -> String {
    match id.trim() {
        "1" | "2" | "3" => "RSA",
        "16" | "20" => "ElGamal",
        "17" => "DSA",
        "18" => "ECDH",
        "19" => "ECDSA",
        "22" => "EdDSA",
        "" => "unknown",
        other => return format!("algo {other}"),
    }
    .to_owned()
}

/// Returns the name of an OpenPGP hash algorithm ID (RFC 4880
/// section 9.4).
pub(crate) fn hash_algo_name(id: &str) -> Option<&'static str> {
    match id.trim() {
        "1" => Some("MD5"),
        "2" => Some("SHA1"),
        "3" => Some("RIPEMD160"),
        "8" => Some("SHA256"),
        "9" => Some("SHA384"),
        "10" => Some("SHA512"),
        "11" => Some("SHA224"),
        _ => None,
    }
}
