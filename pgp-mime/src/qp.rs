//! # Quoted-printable
//!
//! Module dedicated to the quoted-printable transfer encoding
//! (RFC 2045 §6.7).
//!
//! The encoder output is what gets signed, so it never leaves
//! trailing whitespace on a line and protects lines starting with
//! `From `: both are commonly rewritten by mail transports, which
//! would break the signature.
//!
//! The decoder is lenient: it accepts soft line breaks followed by
//! whitespace, bare LF line endings and lowercase hex digits, and
//! keeps invalid escape sequences as they are.

/// Maximum length of an encoded line, soft break included.
const MAX_LINE_LEN: usize = 76;

/// Encodes the given text as quoted-printable, with CRLF line
/// endings.
pub fn encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len() + text.len() / 8);
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_line(line.as_bytes(), &mut encoded);

        if lines.peek().is_some() {
            encoded.push_str("\r\n");
        }
    }

    encoded
}

fn encode_line(line: &[u8], encoded: &mut String) {
    let mut len = 0;

    for (i, &byte) in line.iter().enumerate() {
        let last = i + 1 == line.len();

        let literal = match byte {
            b' ' | b'\t' => !last,
            b'=' => false,
            b'F' => !(i == 0 && line.starts_with(b"From ")),
            33..=126 => true,
            _ => false,
        };

        let token_len = if literal { 1 } else { 3 };
        let max_len = if last { MAX_LINE_LEN } else { MAX_LINE_LEN - 1 };

        if len + token_len > max_len {
            encoded.push_str("=\r\n");
            len = 0;
        }

        if literal {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("={byte:02X}"));
        }

        len += token_len;
    }
}

/// Decodes the given quoted-printable bytes.
pub fn decode(input: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != b'=' {
            decoded.push(input[i]);
            i += 1;
            continue;
        }

        // soft line break, with tolerated trailing whitespace
        let mut j = i + 1;
        while j < input.len() && matches!(input[j], b' ' | b'\t') {
            j += 1;
        }

        if input[j..].starts_with(b"\r\n") {
            i = j + 2;
            continue;
        }

        if input[j..].starts_with(b"\n") {
            i = j + 1;
            continue;
        }

        if j == input.len() {
            i = j;
            continue;
        }

        match (
            input.get(i + 1).and_then(hex_value),
            input.get(i + 2).and_then(hex_value),
        ) {
            (Some(high), Some(low)) => {
                decoded.push(high << 4 | low);
                i += 3;
            }
            _ => {
                decoded.push(b'=');
                i += 1;
            }
        }
    }

    decoded
}

fn hex_value(byte: &u8) -> Option<u8> {
    (*byte as char).to_digit(16).map(|digit| digit as u8)
}
