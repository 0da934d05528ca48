//! Module dedicated to gpg decryption.
//!
//! This module exposes [`Gpg::decrypt_data`] and its
//! [`DecryptResult`].

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    key::Trust,
    parse::{parse_decrypt_output, DecryptStatus},
    Error, Gpg, Result,
};

/// The plaintext of a decryption, with the embedded signature
/// outcome when the ciphertext was also signed.
///
/// Decryption success and signature validity are independent: a bad
/// embedded signature still gives the plaintext, with
/// `signature_ok` set to `false`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DecryptResult {
    pub plaintext: Vec<u8>,
    pub was_signed: bool,
    pub signature_ok: bool,
    pub signer_key_id: Option<String>,
    pub signer_uid: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signer_trust: Trust,
    /// The key ID of the subkey that decrypted the message.
    pub decrypt_key_id: Option<String>,
}

impl DecryptResult {
    pub fn new(plaintext: Vec<u8>, status: DecryptStatus) -> Self {
        let signature = status.signature;

        Self {
            plaintext,
            was_signed: signature.found,
            signature_ok: signature.found && signature.valid,
            signer_key_id: signature.key_id.or(signature.missing_key),
            signer_uid: signature.uid,
            signed_at: signature.signed_at,
            signer_trust: signature.trust,
            decrypt_key_id: status.decrypt_key_id,
        }
    }
}

impl Gpg {
    /// Decrypts the given armored (or binary) ciphertext.
    ///
    /// Embedded signatures are checked in the same invocation. Missing
    /// signer keys are not fetched: the signature is then reported as
    /// not ok.
    pub async fn decrypt_data(&self, ciphertext: impl Into<Vec<u8>>) -> Result<DecryptResult> {
        let ciphertext = ciphertext.into();

        if ciphertext.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::EmptyCiphertextError);
        }

        info!("decrypt data using gpg");

        let output = self.exec(vec!["--decrypt".into()], ciphertext).await?;
        let stderr = output.stderr_lossy();
        let status = parse_decrypt_output(&stderr);

        let decrypted = status.okay || (output.is_success() && !status.failed);

        if !decrypted {
            debug!(code = output.code, "decryption failed");

            if !status.missing_secret_keys.is_empty() {
                return Err(Error::DecryptNoSecretKeyError(status.missing_secret_keys));
            }

            return Err(Error::DecryptError(stderr.trim().to_owned()));
        }

        debug!(
            signed = status.signature.found,
            valid = status.signature.valid,
            "data decrypted"
        );

        Ok(DecryptResult::new(output.stdout, status))
    }
}
