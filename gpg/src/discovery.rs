//! # Key discovery
//!
//! Module dedicated to public key resolution: an email address is
//! first searched in the local keyring, then fetched from key
//! servers, in order, before a last local search.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    key::KeyInfo,
    validate::{is_hex_key_id, mailbox_address, validate_identifier},
    Error, Gpg, Result,
};

/// The outcome of a keyring search.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyLookup {
    /// A usable key carries the email.
    Found(KeyInfo),
    /// Keys carry the email, but all of them are expired, revoked or
    /// disabled.
    Unusable,
    /// No key carries the email.
    Missing,
}

/// Searches the given keys for the first usable one carrying exactly
/// the given email address.
pub fn lookup_key(keys: impl IntoIterator<Item = KeyInfo>, email: &str, now: DateTime<Utc>) -> KeyLookup {
    let mut lookup = KeyLookup::Missing;

    for key in keys {
        if !key.matches_email(email) {
            continue;
        }

        if key.is_usable_at(now) {
            return KeyLookup::Found(key);
        }

        debug!(key_id = %key.key_id, email, "skipping unusable public key");
        lookup = KeyLookup::Unusable;
    }

    lookup
}

/// The public key resolver.
#[derive(Clone, Debug)]
pub struct KeyResolver {
    gpg: Gpg,
    key_servers: Vec<String>,
}

impl KeyResolver {
    pub fn new(gpg: Gpg, key_servers: Vec<String>) -> Self {
        Self { gpg, key_servers }
    }

    pub fn key_servers(&self) -> &[String] {
        &self.key_servers
    }

    /// Finds a usable public key carrying exactly the given email.
    pub async fn find_public_key_by_email(&self, email: &str) -> Result<KeyInfo> {
        let email = mailbox_address(validate_identifier(email)?).to_lowercase();
        info!(%email, "find public key by email");

        let local = lookup_key(self.gpg.list_public_keys().await?, &email, Utc::now());

        if let KeyLookup::Found(key) = local {
            debug!(key_id = %key.key_id, "public key found in local keyring");
            return Ok(key);
        }

        let fetched = match self.gpg.fetch_key_from_any(&email, &self.key_servers).await {
            Ok(server) => {
                debug!(%server, "public key fetched");
                true
            }
            Err(err @ Error::GpgNotFoundError(_)) => return Err(err),
            Err(err) => {
                debug!("{err:?}");
                false
            }
        };

        let lookup = if fetched {
            lookup_key(self.gpg.list_public_keys().await?, &email, Utc::now())
        } else {
            local
        };

        match lookup {
            KeyLookup::Found(key) => Ok(key),
            KeyLookup::Unusable => Err(Error::KeyUnusableError(email)),
            KeyLookup::Missing => Err(Error::KeyNotFoundError {
                email,
                servers: self.key_servers.len(),
            }),
        }
    }

    /// Resolves the given recipients to key IDs, in order and without
    /// duplicates.
    ///
    /// Key IDs and fingerprints are kept as they are, email addresses
    /// go through [`KeyResolver::find_public_key_by_email`].
    pub async fn resolve_recipients(
        &self,
        recipients: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Vec<String>> {
        let mut key_ids: Vec<String> = Vec::new();

        for recipient in recipients {
            let recipient = validate_identifier(recipient.as_ref())?;

            let key_id = if is_hex_key_id(recipient) {
                recipient.to_ascii_uppercase()
            } else {
                self.find_public_key_by_email(recipient).await?.key_id
            };

            if !key_ids.contains(&key_id) {
                key_ids.push(key_id);
            }
        }

        Ok(key_ids)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{lookup_key, KeyLookup};
    use crate::{KeyInfo, Trust};

    fn key(id: &str, uid: &str, trust: Trust) -> KeyInfo {
        KeyInfo {
            key_id: id.into(),
            uids: vec![uid.into()],
            trust,
            ..Default::default()
        }
    }

    #[test]
    fn lookup_exact_email() {
        let now = Utc::now();
        let keys = vec![
            key("AAAAAAAAAAAAAAAA", "Evil <john@example.com.malicious>", Trust::Full),
            key("BBBBBBBBBBBBBBBB", "John <JOHN@example.com>", Trust::Full),
        ];

        match lookup_key(keys, "john@example.com", now) {
            KeyLookup::Found(key) => assert_eq!(key.key_id, "BBBBBBBBBBBBBBBB"),
            lookup => panic!("unexpected lookup {lookup:?}"),
        }
    }

    #[test]
    fn lookup_skips_expired() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut expired = key("AAAAAAAAAAAAAAAA", "John <john@example.com>", Trust::Full);
        expired.expires = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single();
        let valid = key("BBBBBBBBBBBBBBBB", "John <john@example.com>", Trust::Unknown);

        assert_eq!(
            lookup_key(vec![expired.clone()], "john@example.com", now),
            KeyLookup::Unusable
        );

        match lookup_key(vec![expired, valid], "john@example.com", now) {
            KeyLookup::Found(key) => assert_eq!(key.key_id, "BBBBBBBBBBBBBBBB"),
            lookup => panic!("unexpected lookup {lookup:?}"),
        }

        let revoked = key("CCCCCCCCCCCCCCCC", "John <john@example.com>", Trust::Revoked);
        assert_eq!(
            lookup_key(vec![revoked], "john@example.com", now),
            KeyLookup::Unusable
        );
    }

    #[test]
    fn lookup_missing() {
        assert_eq!(
            lookup_key(Vec::new(), "john@example.com", Utc::now()),
            KeyLookup::Missing
        );
    }
}
