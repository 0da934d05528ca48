//! # Output parsing
//!
//! Module dedicated to gpg output scraping. Gpg reports results on
//! two channels: machine-readable status lines (`[GNUPG:] KEYWORD
//! args`, enabled with `--status-fd`) and human-readable messages.
//! Both end up interleaved on stderr since status lines are sent to
//! fd 2. Parsers prefer status lines and fall back to human text when
//! a status line is absent.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::{
    key::Trust,
    utils::{hash_algo_name, long_key_id, parse_timestamp, unescape},
};

pub use crate::key::{key_matches_email, parse_key_listing};

const STATUS_PREFIX: &str = "[GNUPG:] ";

static KEY_ID_IN_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:key(?:\s+ID)?|ID)\s+(?:0x)?([0-9A-F]{8,40})\b").unwrap()
});

static HEX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:[0-9A-F]{40}|[0-9A-F]{16})\b").unwrap());

static QUOTED_UID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"signature from "(.*)"(?:\s+\[(\w+)\])?"#).unwrap());

/// A line of gpg output, either a status line or a human message.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Line<'a> {
    Status(&'a str, Vec<&'a str>),
    Text(&'a str),
}

fn lines(output: &str) -> impl Iterator<Item = Line<'_>> {
    output.lines().map(|line| {
        let line = line.trim_end_matches('\r');
        match line.strip_prefix(STATUS_PREFIX) {
            Some(status) => {
                let mut fields = status.split(' ');
                let keyword = fields.next().unwrap_or_default();
                Line::Status(keyword, fields.collect())
            }
            None => Line::Text(line),
        }
    })
}

/// Joins the fields of a status line from the given index, used for
/// user IDs which can contain spaces.
fn rest(fields: &[&str], from: usize) -> Option<String> {
    let rest = fields.get(from..)?.join(" ");
    if rest.is_empty() {
        None
    } else {
        Some(unescape(&rest))
    }
}

fn field<'a>(fields: &[&'a str], i: usize) -> &'a str {
    fields.get(i).copied().unwrap_or_default()
}

/// The signature part of a verify or decrypt invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignatureStatus {
    /// Whether gpg reported any signature at all.
    pub found: bool,
    /// Whether the signature is cryptographically good.
    pub valid: bool,
    pub key_id: Option<String>,
    pub uid: Option<String>,
    pub fingerprint: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub trust: Trust,
    /// The ID of the public key gpg could not find to check the
    /// signature.
    pub missing_key: Option<String>,
}

impl SignatureStatus {
    fn set_key_id(&mut self, id: &str) {
        if !id.is_empty() {
            self.key_id = Some(long_key_id(id));
        }
    }
}

/// Parses the output of `gpg --verify --status-fd 2`.
pub fn parse_verify_output(output: &str) -> SignatureStatus {
    let mut status = SignatureStatus::default();
    let mut from_status = false;
    let mut trust_from_status = false;

    for line in lines(output) {
        match line {
            Line::Status(keyword, fields) => {
                trace!(keyword, ?fields, "parsing gpg status line");
                match keyword {
                    "GOODSIG" | "BADSIG" | "EXPSIG" | "EXPKEYSIG" | "REVKEYSIG" => {
                        from_status = true;
                        status.found = true;
                        status.valid = matches!(keyword, "GOODSIG" | "EXPKEYSIG" | "REVKEYSIG");
                        status.set_key_id(field(&fields, 0));
                        status.uid = rest(&fields, 1);
                        match keyword {
                            "EXPKEYSIG" => status.trust = Trust::Expired,
                            "REVKEYSIG" => status.trust = Trust::Revoked,
                            _ => (),
                        }
                    }
                    "VALIDSIG" => {
                        status.found = true;
                        let primary = field(&fields, 9);
                        let fpr = if primary.is_empty() {
                            field(&fields, 0)
                        } else {
                            primary
                        };
                        status.fingerprint = Some(fpr.to_ascii_uppercase());
                        status.signed_at = parse_timestamp(field(&fields, 2));
                    }
                    "ERRSIG" => {
                        status.found = true;
                        status.set_key_id(field(&fields, 0));
                        if field(&fields, 5) == "9" {
                            status.missing_key = status.key_id.clone();
                        }
                        if status.signed_at.is_none() {
                            status.signed_at = parse_timestamp(field(&fields, 4));
                        }
                    }
                    "NO_PUBKEY" => {
                        status.found = true;
                        status.missing_key = Some(long_key_id(field(&fields, 0)));
                    }
                    keyword => {
                        if let Some(trust) = Trust::from_status(keyword) {
                            if !matches!(status.trust, Trust::Expired | Trust::Revoked) {
                                status.trust = trust;
                            }
                            trust_from_status = true;
                        }
                    }
                }
            }
            Line::Text(text) => parse_verify_text(&mut status, text, from_status, trust_from_status),
        }
    }

    if status.missing_key.is_none() && output.contains("No public key") && !status.valid {
        status.found = true;
        status.missing_key = status
            .key_id
            .clone()
            .or_else(|| extract_key_id_from_error(output));
    }

    status
}

fn parse_verify_text(status: &mut SignatureStatus, text: &str, from_status: bool, trust_from_status: bool) {
    if from_status {
        return;
    }

    if text.contains("Good signature from") || text.contains("BAD signature from") {
        status.found = true;
        status.valid = text.contains("Good signature from");
        if let Some(captures) = QUOTED_UID.captures(text) {
            status.uid = captures.get(1).map(|uid| uid.as_str().to_owned());
            if !trust_from_status {
                if let Some(trust) = captures.get(2).and_then(|t| Trust::from_label(t.as_str())) {
                    status.trust = trust;
                }
            }
        }
    } else if let Some((_, id)) = text.split_once(" key ") {
        if text.trim_start_matches("gpg:").trim_start().starts_with("using ") {
            let id = id.trim().trim_start_matches("0x");
            if id.chars().all(|c| c.is_ascii_hexdigit()) && id.len() >= 8 {
                status.found = true;
                status.set_key_id(id);
                if id.len() == 40 && status.fingerprint.is_none() {
                    status.fingerprint = Some(id.to_ascii_uppercase());
                }
            }
        }
    } else if text.contains("There is no assurance") && !trust_from_status {
        status.trust = Trust::Undefined;
    }
}

/// The result of a decrypt invocation, before the plaintext is
/// attached.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DecryptStatus {
    /// `DECRYPTION_OKAY` was seen.
    pub okay: bool,
    /// `DECRYPTION_FAILED` was seen.
    pub failed: bool,
    /// The key IDs the message is encrypted to.
    pub recipients: Vec<String>,
    /// The key IDs gpg had no secret key for.
    pub missing_secret_keys: Vec<String>,
    /// The key ID of the subkey that decrypted the session key.
    pub decrypt_key_id: Option<String>,
    /// The embedded signature, if any.
    pub signature: SignatureStatus,
}

/// Parses the output of `gpg --decrypt --status-fd 2`.
pub fn parse_decrypt_output(output: &str) -> DecryptStatus {
    let mut status = DecryptStatus {
        signature: parse_verify_output(output),
        ..Default::default()
    };

    for line in lines(output) {
        match line {
            Line::Status("DECRYPTION_OKAY", _) => status.okay = true,
            Line::Status("DECRYPTION_FAILED", _) => status.failed = true,
            Line::Status("ENC_TO", fields) => {
                let id = long_key_id(field(&fields, 0));
                if !id.is_empty() && !status.recipients.contains(&id) {
                    status.recipients.push(id);
                }
            }
            Line::Status("NO_SECKEY", fields) => {
                let id = long_key_id(field(&fields, 0));
                if !id.is_empty() && !status.missing_secret_keys.contains(&id) {
                    status.missing_secret_keys.push(id);
                }
            }
            Line::Status("DECRYPTION_KEY", fields) => {
                let fpr = field(&fields, 0);
                if !fpr.is_empty() {
                    status.decrypt_key_id = Some(long_key_id(fpr));
                }
            }
            Line::Text(text) => {
                if text.contains("encrypted with") {
                    if let Some(id) = text.split("ID ").nth(1) {
                        let id: String = id.chars().take_while(char::is_ascii_hexdigit).collect();
                        let id = long_key_id(&id);
                        if id.len() >= 8 && !status.recipients.contains(&id) {
                            status.recipients.push(id);
                        }
                    }
                } else if text.contains("decryption failed") {
                    status.failed = true;
                }
            }
            _ => (),
        }
    }

    if status.failed && status.missing_secret_keys.is_empty() && output.contains("No secret key") {
        status.missing_secret_keys = status.recipients.clone();
    }

    status
}

/// The result of a sign invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignStatus {
    /// `SIG_CREATED` was seen.
    pub created: bool,
    pub hash_algo: Option<String>,
    pub fingerprint: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
}

/// Parses the output of `gpg --detach-sign --status-fd 2`.
///
/// The `SIG_CREATED` line reads `SIG_CREATED <type> <pk_algo>
/// <hash_algo> <class> <timestamp> <fingerprint>`.
pub fn parse_sign_output(output: &str) -> SignStatus {
    let mut status = SignStatus::default();

    for line in lines(output) {
        if let Line::Status("SIG_CREATED", fields) = line {
            status.created = true;
            status.hash_algo = hash_algo_name(field(&fields, 2)).map(ToOwned::to_owned);
            status.signed_at = parse_timestamp(field(&fields, 4));
            let fpr = field(&fields, 5);
            if !fpr.is_empty() {
                status.fingerprint = Some(fpr.to_ascii_uppercase());
            }
        }
    }

    status
}

/// Why a sign invocation failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignFailure {
    NoSecretKey,
    PassphraseTimeout,
    Other,
}

pub fn parse_sign_failure(output: &str) -> SignFailure {
    for line in lines(output) {
        if let Line::Status("INV_SGNR", fields) = line {
            if matches!(field(&fields, 0), "1" | "9") {
                return SignFailure::NoSecretKey;
            }
        }
    }

    let lower = output.to_ascii_lowercase();

    if lower.contains("no secret key") || lower.contains("secret key not available") {
        SignFailure::NoSecretKey
    } else if [
        "timeout",
        "timed out",
        "operation cancelled",
        "no pinentry",
        "inappropriate ioctl",
        "bad passphrase",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        SignFailure::PassphraseTimeout
    } else {
        SignFailure::Other
    }
}

/// A recipient gpg refused to encrypt for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidRecipient {
    pub recipient: String,
    /// `None` when the key does not exist, the reason why it cannot
    /// be used otherwise.
    pub unusable: Option<String>,
}

/// Parses the recipients gpg rejected during an encrypt invocation,
/// from `INV_RECP <reason> <recipient>` lines or from `<recipient>:
/// skipped: <reason>` messages.
pub fn parse_invalid_recipients(output: &str) -> Vec<InvalidRecipient> {
    let mut recipients: Vec<InvalidRecipient> = Vec::new();

    for line in lines(output) {
        let recipient = match line {
            Line::Status("INV_RECP", fields) => {
                let reason = field(&fields, 0);
                InvalidRecipient {
                    recipient: rest(&fields, 1).unwrap_or_default(),
                    unusable: unusable_recipient_reason(reason).map(ToOwned::to_owned),
                }
            }
            Line::Text(text) if text.contains(": skipped: ") => {
                let text = text.trim_start_matches("gpg: ");
                let Some((recipient, reason)) = text.split_once(": skipped: ") else {
                    continue;
                };
                InvalidRecipient {
                    recipient: recipient.trim().to_owned(),
                    unusable: if is_key_state_reason(reason) {
                        Some(reason.trim().to_owned())
                    } else {
                        None
                    },
                }
            }
            _ => continue,
        };

        if !recipients.iter().any(|r| r.recipient == recipient.recipient) {
            recipients.push(recipient);
        }
    }

    recipients
}

/// Returns the reason why the key of a rejected recipient cannot be
/// used, or `None` when gpg simply did not find any key (codes 0 and
/// 1, lookup failures and the like).
fn unusable_recipient_reason(code: &str) -> Option<&'static str> {
    match code {
        "3" => Some("wrong key usage"),
        "4" => Some("key revoked"),
        "5" => Some("key expired"),
        "10" => Some("key not trusted"),
        "13" => Some("key disabled"),
        _ => None,
    }
}

/// Whether a `skipped: <reason>` message is about the state of an
/// existing key, rather than a failed lookup (`No public key`,
/// `No data`, `Connection refused`, ...).
fn is_key_state_reason(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    ["unusable", "expired", "revoked", "disabled", "not trusted", "wrong key usage"]
        .iter()
        .any(|needle| reason.contains(needle))
}

/// Import statistics from an `IMPORT_RES` status line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImportStats {
    pub considered: usize,
    pub imported: usize,
    pub unchanged: usize,
}

impl ImportStats {
    /// Whether the import made at least one key available.
    pub fn has_keys(&self) -> bool {
        self.imported + self.unchanged > 0
    }
}

/// Parses the `IMPORT_RES <count> <no_user_id> <imported> <imported_rsa>
/// <unchanged> …` line of an import invocation.
pub fn parse_import_output(output: &str) -> Option<ImportStats> {
    lines(output).find_map(|line| match line {
        Line::Status("IMPORT_RES", fields) => {
            let num = |i| field(&fields, i).parse().unwrap_or_default();
            Some(ImportStats {
                considered: num(0),
                imported: num(2),
                unchanged: num(4),
            })
        }
        _ => None,
    })
}

/// Extracts a key ID from a gpg error message.
///
/// Best-effort: the first key ID following `key`, `key ID` or `ID`
/// wins, otherwise the first 16 or 40 hex chars token. Messages
/// naming several keys may give the wrong one.
pub fn extract_key_id_from_error(text: &str) -> Option<String> {
    KEY_ID_IN_ERROR
        .captures(text)
        .and_then(|captures| captures.get(1))
        .or_else(|| HEX_ID.find(text))
        .map(|id| long_key_id(id.as_str()))
}
