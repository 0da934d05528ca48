//! # Identifier validation
//!
//! Every value interpolated into a gpg argument vector goes through
//! this module first. Only two shapes are accepted: hexadecimal key
//! IDs and fingerprints (8 to 40 chars), and RFC 5322 mailboxes
//! (`john@example.com` or `John Doe <john@example.com>`).

use email_address::EmailAddress;

use crate::{Error, Result};

/// Characters that never belong to a key ID nor to a mailbox we are
/// willing to hand to gpg.
const FORBIDDEN_CHARS: [char; 6] = [';', '`', '|', '$', '&', '\\'];

const KEY_SERVER_SCHEMES: [&str; 5] = ["hkp://", "hkps://", "http://", "https://", "ldap://"];

/// Returns `true` if the given string is either a hexadecimal key ID
/// (8 to 40 chars, case-insensitive) or a single RFC 5322 mailbox.
pub fn is_valid_identifier(id: &str) -> bool {
    if has_forbidden_chars(id) {
        return false;
    }

    let id = trim_spaces(id);

    if id.is_empty() || id.starts_with('-') {
        return false;
    }

    is_hex_key_id(id) || is_mailbox(id)
}

/// Validates the given identifier, returning it without surrounding
/// spaces.
pub fn validate_identifier(id: &str) -> Result<&str> {
    if is_valid_identifier(id) {
        Ok(trim_spaces(id))
    } else {
        Err(Error::InvalidIdentifierError(id.to_owned()))
    }
}

pub fn is_hex_key_id(id: &str) -> bool {
    (8..=40).contains(&id.len()) && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Returns the address part of a mailbox.
///
/// `John Doe <john@example.com>` gives `john@example.com`, anything
/// else is returned trimmed.
pub fn mailbox_address(id: &str) -> &str {
    let id = id.trim();

    match id.strip_suffix('>').and_then(|id| id.rsplit_once('<')) {
        Some((_, addr)) => addr.trim(),
        None => id,
    }
}

/// Control characters (newlines included) are rejected wherever they
/// appear, even at the edges.
fn has_forbidden_chars(id: &str) -> bool {
    id.chars()
        .any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c))
}

fn trim_spaces(id: &str) -> &str {
    id.trim_matches(' ')
}

fn is_mailbox(id: &str) -> bool {
    match id.strip_suffix('>').and_then(|id| id.rsplit_once('<')) {
        Some((name, addr)) => {
            let name = name.trim();
            let name_ok = !name.contains(['<', '>', '"']) || is_quoted(name);
            name_ok && !addr.contains(['<', '>']) && EmailAddress::is_valid(addr.trim())
        }
        None => !id.contains(['<', '>']) && EmailAddress::is_valid(id),
    }
}

fn is_quoted(name: &str) -> bool {
    name.len() >= 2
        && name.starts_with('"')
        && name.ends_with('"')
        && !name[1..name.len() - 1].contains('"')
}

/// Returns `true` if the given key server URL can be passed to gpg
/// `--keyserver`.
pub fn is_valid_key_server(url: &str) -> bool {
    if has_forbidden_chars(url) {
        return false;
    }

    let url = trim_spaces(url);

    let has_scheme = KEY_SERVER_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(scheme) && url.len() > scheme.len());

    has_scheme
        && url
            .chars()
            .all(|c| c.is_ascii_graphic() && !FORBIDDEN_CHARS.contains(&c))
}

pub fn validate_key_server(url: &str) -> Result<&str> {
    if is_valid_key_server(url) {
        Ok(trim_spaces(url))
    } else {
        Err(Error::InvalidKeyServerError(url.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_key_ids() {
        assert!(is_valid_identifier("ABCDEF12"));
        assert!(is_valid_identifier("601fee9b1d60185f"));
        assert!(is_valid_identifier(&"A".repeat(40)));
        assert!(is_valid_identifier("  601FEE9B1D60185F  "));

        assert!(!is_valid_identifier("ABCDEF1"));
        assert!(!is_valid_identifier(&"A".repeat(41)));
        assert!(!is_valid_identifier("GHIJKLMN"));
    }

    #[test]
    fn mailboxes() {
        assert!(is_valid_identifier("john@example.com"));
        assert!(is_valid_identifier("John Doe <john@example.com>"));
        assert!(is_valid_identifier("<john@example.com>"));
        assert!(is_valid_identifier("\"Doe, John\" <john@example.com>"));

        assert!(!is_valid_identifier("not an email"));
        assert!(!is_valid_identifier("John <john@example.com"));
        assert!(!is_valid_identifier("<<john@example.com>>"));
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("   "));
        assert!(!is_valid_identifier("ABCDEF12; rm -rf /"));
        assert!(!is_valid_identifier("ABCDEF12;"));
        assert!(!is_valid_identifier("john@example.com`id`"));
        assert!(!is_valid_identifier("`id`@example.com"));
        assert!(!is_valid_identifier("john@example.com\n--homedir=/tmp"));
        assert!(!is_valid_identifier("ABCDEF12\r\n"));
        assert!(!is_valid_identifier("ABCDEF12|cat"));
        assert!(!is_valid_identifier("a|b@example.com"));
        assert!(!is_valid_identifier("$(id)@example.com"));
        assert!(!is_valid_identifier("--homedir"));
        assert!(!is_valid_identifier("-x@example.com"));
    }

    #[test]
    fn rejects_control_chars_at_edges() {
        assert!(!is_valid_identifier("ABCDEF12\n"));
        assert!(!is_valid_identifier("\nABCDEF12"));
        assert!(!is_valid_identifier("john@example.com\r\n"));
        assert!(!is_valid_identifier("\tjohn@example.com"));
        assert!(!is_valid_identifier("John <john@example.com>\0"));

        let err = validate_identifier("ABCDEF12\n").unwrap_err();
        assert!(err.is_invalid_input());

        assert!(!is_valid_key_server("hkps://keys.openpgp.org\r\n"));
        assert!(validate_key_server(" hkps://keys.openpgp.org ").is_ok());
    }

    #[test]
    fn validate_returns_trimmed() {
        assert_eq!(validate_identifier(" ABCDEF12 ").unwrap(), "ABCDEF12");

        let err = validate_identifier("ABCDEF12; ls").unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn addresses() {
        assert_eq!(mailbox_address("John <john@example.com>"), "john@example.com");
        assert_eq!(mailbox_address(" john@example.com "), "john@example.com");
        assert_eq!(mailbox_address("ABCDEF12"), "ABCDEF12");
    }

    #[test]
    fn key_servers() {
        assert!(is_valid_key_server("hkps://keys.openpgp.org"));
        assert!(is_valid_key_server("hkp://pgp.mit.edu:11371"));
        assert!(is_valid_key_server("https://keyserver.ubuntu.com"));

        assert!(!is_valid_key_server("keys.openpgp.org"));
        assert!(!is_valid_key_server("hkps://"));
        assert!(!is_valid_key_server("hkps://keys.openpgp.org; id"));
        assert!(!is_valid_key_server("hkps://keys.openpgp.org\n"));
        assert!(!is_valid_key_server("--homedir"));
    }
}
