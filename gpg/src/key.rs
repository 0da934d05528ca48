//! # Keys
//!
//! Module dedicated to gpg keys: the [`KeyInfo`] snapshot and the
//! parser of gpg colon listings (`--with-colons`).

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::{
    utils::{long_key_id, parse_timestamp, pubkey_algo_name, unescape},
    validate::is_hex_key_id,
    Error, Result,
};

/// The validity of a key, as reported by gpg.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Trust {
    #[default]
    Unknown,
    Invalid,
    Disabled,
    Revoked,
    Expired,
    Undefined,
    Never,
    Marginal,
    Full,
    Ultimate,
}

impl Trust {
    /// Parses the validity field of a colon listing record.
    pub fn from_validity(field: &str) -> Self {
        match field.chars().next() {
            Some('i') => Self::Invalid,
            Some('d') => Self::Disabled,
            Some('r') => Self::Revoked,
            Some('e') => Self::Expired,
            Some('q') => Self::Undefined,
            Some('n') => Self::Never,
            Some('m') => Self::Marginal,
            Some('f') => Self::Full,
            Some('u') => Self::Ultimate,
            _ => Self::Unknown,
        }
    }

    /// Parses the keyword of a `TRUST_*` status line.
    pub fn from_status(keyword: &str) -> Option<Self> {
        match keyword {
            "TRUST_UNDEFINED" => Some(Self::Undefined),
            "TRUST_NEVER" => Some(Self::Never),
            "TRUST_MARGINAL" => Some(Self::Marginal),
            "TRUST_FULLY" => Some(Self::Full),
            "TRUST_ULTIMATE" => Some(Self::Ultimate),
            _ => None,
        }
    }

    /// Parses the bracketed validity gpg prints after a signer, like
    /// `[ultimate]`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim_matches(|c| c == '[' || c == ']') {
            "unknown" => Some(Self::Unknown),
            "undefined" => Some(Self::Undefined),
            "never" => Some(Self::Never),
            "marginal" => Some(Self::Marginal),
            "full" => Some(Self::Full),
            "ultimate" => Some(Self::Ultimate),
            "expired" => Some(Self::Expired),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl fmt::Display for Trust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trust = match self {
            Self::Unknown => "unknown",
            Self::Invalid => "invalid",
            Self::Disabled => "disabled",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Undefined => "undefined",
            Self::Never => "never",
            Self::Marginal => "marginal",
            Self::Full => "full",
            Self::Ultimate => "ultimate",
        };
        write!(f, "{trust}")
    }
}

/// Snapshot of a key from the local keyring.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyInfo {
    /// The long (16 hex chars) key ID of the primary key.
    pub key_id: String,
    /// The fingerprint of the primary key.
    pub fingerprint: String,
    /// The user IDs, in listing order.
    pub uids: Vec<String>,
    pub trust: Trust,
    pub expires: Option<DateTime<Utc>>,
    /// The public key algorithm name (RSA, EdDSA…).
    pub key_type: String,
    /// The key length in bits.
    pub length: u32,
    pub created: Option<DateTime<Utc>>,
    /// The raw capabilities field (`scESC`…).
    pub capabilities: String,
    /// Whether the key comes from the secret keyring listing.
    pub secret: bool,
}

impl KeyInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.trust == Trust::Expired || self.expires.is_some_and(|expires| expires <= now)
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
            && !matches!(self.trust, Trust::Revoked | Trust::Disabled | Trust::Invalid)
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// Uppercase capabilities describe the key as a whole (subkeys
    /// included).
    pub fn can_sign(&self) -> bool {
        self.capabilities.contains('S') || self.capabilities.contains('s')
    }

    pub fn can_encrypt(&self) -> bool {
        self.capabilities.contains('E') || self.capabilities.contains('e')
    }

    /// Returns `true` if one of the user IDs carries exactly the
    /// given email address.
    pub fn matches_email(&self, email: &str) -> bool {
        self.uids.iter().any(|uid| key_matches_email(uid, email))
    }

    /// Returns `true` if the given key ID or fingerprint designates
    /// this key.
    pub fn matches_id(&self, id: &str) -> bool {
        let id = id.trim().to_ascii_uppercase();
        is_hex_key_id(&id)
            && (self.fingerprint.ends_with(&id) || self.key_id.ends_with(&long_key_id(&id)))
    }

    pub fn primary_uid(&self) -> Option<&str> {
        self.uids.first().map(String::as_str)
    }
}

/// Returns `true` if the given user ID carries exactly the given
/// email address.
///
/// The address is taken from the angle brackets of the user ID
/// (`John Doe <john@example.com>`), or from the whole user ID when it
/// has no brackets. The comparison is case-insensitive and never
/// matches a substring: `john@example.com.malicious` does not match
/// `john@example.com`.
pub fn key_matches_email(uid: &str, email: &str) -> bool {
    let email = email.trim();

    if email.is_empty() {
        return false;
    }

    let addr = match (uid.rfind('<'), uid.rfind('>')) {
        (Some(start), Some(end)) if start < end => &uid[start + 1..end],
        _ => uid,
    };

    addr.trim().eq_ignore_ascii_case(email)
}

/// Parses a gpg colon listing into keys, in appearance order.
///
/// `pub` and `sec` records open a new key, the first `fpr` record
/// that follows holds its fingerprint and `uid` records append user
/// IDs. Subkey records (`sub`, `ssb`) close the primary section: the
/// fingerprints and user IDs that follow them are ignored.
pub fn parse_key_listing(listing: &str) -> Vec<KeyInfo> {
    let mut keys: Vec<KeyInfo> = Vec::new();
    let mut in_primary = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        match field(0) {
            tag @ ("pub" | "sec") => {
                trace!("parsing primary key record: {line}");
                keys.push(KeyInfo {
                    key_id: field(4).to_ascii_uppercase(),
                    trust: Trust::from_validity(field(1)),
                    length: field(2).parse().unwrap_or_default(),
                    key_type: pubkey_algo_name(field(3)),
                    created: parse_timestamp(field(5)),
                    expires: parse_timestamp(field(6)),
                    capabilities: field(11).to_owned(),
                    secret: tag == "sec",
                    ..Default::default()
                });
                in_primary = true;
            }
            "fpr" if in_primary => {
                if let Some(key) = keys.last_mut() {
                    if key.fingerprint.is_empty() {
                        key.fingerprint = field(9).to_ascii_uppercase();
                    }
                }
            }
            "uid" if in_primary => {
                if let Some(key) = keys.last_mut() {
                    key.uids.push(unescape(field(9)));
                }
            }
            "sub" | "ssb" => {
                in_primary = false;
            }
            _ => (),
        }
    }

    debug!("parsed {} keys from gpg listing", keys.len());
    keys
}

/// Parses a public key listing. An empty keyring is valid.
pub fn parse_public_key_listing(listing: &str) -> Result<Vec<KeyInfo>> {
    Ok(parse_key_listing(listing))
}

/// Parses a secret key listing. An empty secret keyring is an error
/// since nothing can be signed nor decrypted.
pub fn parse_secret_key_listing(listing: &str) -> Result<Vec<KeyInfo>> {
    let keys = parse_key_listing(listing);

    if keys.is_empty() {
        return Err(Error::NoSecretKeyError);
    }

    Ok(keys)
}
