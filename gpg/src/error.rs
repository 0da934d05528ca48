//! # Error
//!
//! Module dedicated to gpg errors. It contains an [`Error`] enum
//! based on [`thiserror::Error`] and a type alias [`Result`].

use std::io;

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key identifier {0:?}: expected a hex key ID (8-40 chars) or an email address")]
    InvalidIdentifierError(String),
    #[error("invalid key server {0:?}: expected a hkp://, hkps://, http(s):// or ldap:// URL")]
    InvalidKeyServerError(String),
    #[error("cannot encrypt data: no recipients given")]
    NoRecipientsError,
    #[error("cannot decrypt data: ciphertext is empty")]
    EmptyCiphertextError,
    #[error("cannot verify data: signature is empty")]
    EmptySignatureError,

    #[error("cannot find gpg, install GnuPG from https://gnupg.org/download (or `brew install gnupg`, `apt install gnupg`)")]
    GpgNotFoundError(#[source] process::Error),
    #[error("cannot run gpg")]
    RunGpgError(#[source] process::Error),

    #[error("cannot list gpg keys: {0}")]
    ListKeysError(String),
    #[error("cannot find any gpg secret key, generate one with `gpg --full-generate-key`")]
    NoSecretKeyError,
    #[error("cannot find any usable gpg signing key: all secret keys are expired, revoked or cannot sign")]
    NoUsableSigningKeyError,
    #[error("cannot find gpg secret key for {0}, list available keys with `gpg --list-secret-keys`")]
    SecretKeyNotFoundError(String),

    #[error("cannot sign data: secret key {0} is not available, check `gpg --list-secret-keys`")]
    SignNoSecretKeyError(String),
    #[error("cannot sign data with key {0}: passphrase prompt timed out or was cancelled, make sure gpg-agent and pinentry are running")]
    SignPassphraseTimeoutError(String),
    #[error("cannot sign data using gpg: {0}")]
    SignError(String),

    #[error("cannot verify signature: public key {key_id} not found locally nor on {servers} key servers, import it manually with `gpg --recv-keys {key_id}`")]
    VerifyPublicKeyNotFoundError { key_id: String, servers: usize },
    #[error("cannot verify signature using gpg: {0}")]
    VerifyError(String),

    #[error("cannot encrypt data: public key for recipient {0} not found, import it with `gpg --import` or `gpg --locate-keys`")]
    RecipientKeyNotFoundError(String),
    #[error("cannot encrypt data: public key for recipient {0} is unusable ({1})")]
    RecipientKeyUnusableError(String, String),
    #[error("cannot encrypt data using gpg: {0}")]
    EncryptError(String),

    #[error("cannot decrypt data: no secret key available for {}", .0.join(", "))]
    DecryptNoSecretKeyError(Vec<String>),
    #[error("cannot decrypt data using gpg: {0}")]
    DecryptError(String),

    #[error("cannot find public key for {email} locally nor on {servers} key servers, import it manually with `gpg --import` or `gpg --locate-keys {email}`")]
    KeyNotFoundError { email: String, servers: usize },
    #[error("cannot use public key for {0}: key is expired or revoked, ask the owner for an updated key")]
    KeyUnusableError(String),
    #[error("cannot fetch key {0} from key server {1}: {2}")]
    FetchKeyError(String, String, String),
    #[error("cannot fetch key {0} from any of the {1} key servers")]
    FetchKeyFromServersError(String, usize),
    #[error("cannot import keys using gpg: {0}")]
    ImportKeyError(String),
    #[error("cannot export public key {0}: {1}")]
    ExportKeyError(String, String),

    #[error("cannot create temporary file")]
    CreateTempFileError(#[source] io::Error),
    #[error("cannot write temporary file")]
    WriteTempFileError(#[source] io::Error),
}

impl Error {
    /// Returns `true` when the error was raised before running gpg
    /// because of a malformed input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifierError(_)
                | Self::InvalidKeyServerError(_)
                | Self::NoRecipientsError
                | Self::EmptyCiphertextError
                | Self::EmptySignatureError
        )
    }

    /// Returns `true` when a key could not be found, locally or on
    /// key servers.
    pub fn is_key_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSecretKeyError
                | Self::SecretKeyNotFoundError(_)
                | Self::SignNoSecretKeyError(_)
                | Self::VerifyPublicKeyNotFoundError { .. }
                | Self::RecipientKeyNotFoundError(_)
                | Self::DecryptNoSecretKeyError(_)
                | Self::KeyNotFoundError { .. }
        )
    }

    /// Returns `true` when a key exists but cannot be used because it
    /// is expired, revoked or untrusted.
    pub fn is_key_unusable(&self) -> bool {
        matches!(
            self,
            Self::NoUsableSigningKeyError
                | Self::RecipientKeyUnusableError(..)
                | Self::KeyUnusableError(_)
        )
    }
}
