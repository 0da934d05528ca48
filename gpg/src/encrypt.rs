//! Module dedicated to gpg encryption.
//!
//! This module exposes [`Gpg::encrypt_data`],
//! [`Gpg::sign_and_encrypt_data`] and their [`EncryptResult`].

use tracing::{debug, info};

use crate::{
    parse::{parse_invalid_recipients, parse_sign_failure, SignFailure},
    sign::{passphrase_timeout, sign_error},
    validate::{mailbox_address, validate_identifier},
    Error, Gpg, Result,
};

/// The ciphertext produced by an encryption.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncryptResult {
    /// The armored ciphertext.
    pub ciphertext: Vec<u8>,
    /// The recipients the data was encrypted for, deduplicated.
    pub recipient_keys: Vec<String>,
}

impl Gpg {
    /// Encrypts the given data for the given recipients.
    pub async fn encrypt_data(
        &self,
        recipients: impl IntoIterator<Item = impl AsRef<str>>,
        data: impl Into<Vec<u8>>,
    ) -> Result<EncryptResult> {
        self.encrypt(None, recipients, data, None).await
    }

    /// Signs then encrypts the given data in a single gpg invocation,
    /// so the signature ends up inside the ciphertext.
    pub async fn sign_and_encrypt_data(
        &self,
        signer: &str,
        recipients: impl IntoIterator<Item = impl AsRef<str>>,
        data: impl Into<Vec<u8>>,
        sender: Option<&str>,
    ) -> Result<EncryptResult> {
        self.encrypt(Some(signer), recipients, data, sender).await
    }

    async fn encrypt(
        &self,
        signer: Option<&str>,
        recipients: impl IntoIterator<Item = impl AsRef<str>>,
        data: impl Into<Vec<u8>>,
        sender: Option<&str>,
    ) -> Result<EncryptResult> {
        let mut recipient_keys: Vec<String> = Vec::new();

        for recipient in recipients {
            let recipient = validate_identifier(recipient.as_ref())?;
            if !recipient_keys.iter().any(|r| r.eq_ignore_ascii_case(recipient)) {
                recipient_keys.push(recipient.to_owned());
            }
        }

        if recipient_keys.is_empty() {
            return Err(Error::NoRecipientsError);
        }

        let signer = signer.map(validate_identifier).transpose()?;
        let sender = sender
            .map(validate_identifier)
            .transpose()?
            .map(mailbox_address);

        info!(?signer, recipients = ?recipient_keys, "encrypt data using gpg");

        // key discovery belongs to the resolver and its ordered key
        // servers, gpg must stick to the local keyring
        let mut args: Vec<String> = vec![
            "--armor".into(),
            "--encrypt".into(),
            "--auto-key-locate".into(),
            "local".into(),
        ];

        if let Some(signer) = signer {
            args.push("--sign".into());
            args.push("--local-user".into());
            args.push(signer.into());

            if let Some(sender) = sender {
                args.push("--sender".into());
                args.push(sender.into());
            }
        }

        if self.is_always_trust() {
            args.push("--trust-model".into());
            args.push("always".into());
        }

        for recipient in &recipient_keys {
            args.push("--recipient".into());
            args.push(recipient.clone());
        }

        let output = match signer {
            Some(signer) => self
                .exec(args, data)
                .await
                .map_err(|err| passphrase_timeout(err, signer))?,
            None => self.exec(args, data).await?,
        };

        if output.is_success() && !output.stdout.is_empty() {
            return Ok(EncryptResult {
                ciphertext: output.stdout,
                recipient_keys,
            });
        }

        let stderr = output.stderr_lossy();
        debug!(code = output.code, "encryption failed");

        let invalid = parse_invalid_recipients(&stderr);

        if let Some(recipient) = invalid.iter().find(|r| r.unusable.is_none()) {
            return Err(Error::RecipientKeyNotFoundError(recipient.recipient.clone()));
        }

        if let Some(recipient) = invalid.into_iter().next() {
            let reason = recipient.unusable.unwrap_or_default();
            return Err(Error::RecipientKeyUnusableError(recipient.recipient, reason));
        }

        if let Some(signer) = signer {
            if parse_sign_failure(&stderr) != SignFailure::Other {
                return Err(sign_error(&stderr, signer));
            }
        }

        Err(Error::EncryptError(stderr.trim().to_owned()))
    }
}
