//! Module dedicated to gpg signing.
//!
//! This module exposes [`Gpg::sign_data`] and its [`SignResult`].

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    parse::{parse_sign_failure, parse_sign_output, SignFailure},
    utils::long_key_id,
    validate::{mailbox_address, validate_identifier},
    Error, Gpg, Result,
};

/// The hash algorithm gpg uses when it does not tell.
const DEFAULT_HASH_ALGO: &str = "SHA256";

/// The detached signature produced by [`Gpg::sign_data`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignResult {
    /// The armored detached signature.
    pub signature: Vec<u8>,
    /// The long key ID of the signing key.
    pub key_id: String,
    pub signed_at: DateTime<Utc>,
    /// The hash algorithm name, as reported by gpg (`SHA256`…).
    pub hash_algo: Option<String>,
}

impl SignResult {
    /// Returns the RFC 3156 `micalg` parameter matching the hash
    /// algorithm, like `pgp-sha256`.
    pub fn micalg(&self) -> String {
        micalg(self.hash_algo.as_deref())
    }
}

/// Builds the `micalg` parameter of the given hash algorithm name.
pub fn micalg(hash_algo: Option<&str>) -> String {
    let algo = hash_algo.unwrap_or(DEFAULT_HASH_ALGO).to_ascii_lowercase();
    format!("pgp-{algo}")
}

impl Gpg {
    /// Produces an armored detached signature of the given data.
    ///
    /// When a sender email is given, it is embedded in the signature
    /// so verifiers see the right address of keys carrying several
    /// user IDs.
    pub async fn sign_data(
        &self,
        key_id: &str,
        data: impl Into<Vec<u8>>,
        sender: Option<&str>,
    ) -> Result<SignResult> {
        let key_id = validate_identifier(key_id)?;
        let sender = sender
            .map(validate_identifier)
            .transpose()?
            .map(mailbox_address);

        info!(key_id, ?sender, "sign data using gpg");

        let mut args: Vec<String> = vec![
            "--armor".into(),
            "--detach-sign".into(),
            "--local-user".into(),
            key_id.into(),
        ];

        if let Some(sender) = sender {
            args.push("--sender".into());
            args.push(sender.into());
        }

        let output = self
            .exec(args, data)
            .await
            .map_err(|err| passphrase_timeout(err, key_id))?;

        let stderr = output.stderr_lossy();
        let status = parse_sign_output(&stderr);

        if !output.is_success() || !status.created || output.stdout.is_empty() {
            debug!(code = output.code, "signing failed");
            return Err(sign_error(&stderr, key_id));
        }

        let key_id = match &status.fingerprint {
            Some(fpr) => long_key_id(fpr),
            None => key_id.to_ascii_uppercase(),
        };

        Ok(SignResult {
            signature: output.stdout,
            key_id,
            signed_at: status.signed_at.unwrap_or_else(Utc::now),
            hash_algo: status.hash_algo,
        })
    }
}

/// A timeout of the runner while signing means gpg was waiting for a
/// passphrase.
pub(crate) fn passphrase_timeout(err: Error, key_id: &str) -> Error {
    match err {
        Error::RunGpgError(err) if err.is_timeout() => {
            Error::SignPassphraseTimeoutError(key_id.to_owned())
        }
        err => err,
    }
}

pub(crate) fn sign_error(stderr: &str, key_id: &str) -> Error {
    match parse_sign_failure(stderr) {
        SignFailure::NoSecretKey => Error::SignNoSecretKeyError(key_id.to_owned()),
        SignFailure::PassphraseTimeout => Error::SignPassphraseTimeoutError(key_id.to_owned()),
        SignFailure::Other => Error::SignError(stderr.trim().to_owned()),
    }
}
