//! # Configuration
//!
//! Module dedicated to secure mail configuration.

/// The secure mail configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct SecureMailConfig {
    /// Attach the signer public key (`application/pgp-keys`) to
    /// signed messages, so recipients can verify them without key
    /// servers.
    ///
    /// Defaults to `false`.
    pub attach_public_key: Option<bool>,

    /// Encrypt messages for the sender key as well, so sent messages
    /// can be read back.
    ///
    /// Defaults to `true`.
    pub encrypt_to_self: Option<bool>,
}

impl SecureMailConfig {
    pub fn is_attach_public_key(&self) -> bool {
        self.attach_public_key.unwrap_or_default()
    }

    pub fn is_encrypt_to_self(&self) -> bool {
        self.encrypt_to_self.unwrap_or(true)
    }
}
