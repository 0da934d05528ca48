//! # Sender
//!
//! Module dedicated to outgoing messages: signing, encrypting or
//! both, as PGP/MIME.

use gpg::{is_hex_key_id, mailbox_address, validate_identifier, Gpg, KeyResolver};
use pgp_mime::{Attachment, PgpMimeBuilder};
use tracing::{debug, info, warn};

use crate::{Error, OutboundMessage, Result, SecureMailConfig, SentMessage};

/// The secure message sender.
///
/// It does not send anything by itself: it produces raw messages to
/// be handed over to a transport.
#[derive(Clone, Debug)]
pub struct SecureSender {
    gpg: Gpg,
    resolver: KeyResolver,
    config: SecureMailConfig,
    builder: PgpMimeBuilder,
}

impl SecureSender {
    pub fn new(gpg: Gpg, resolver: KeyResolver, config: SecureMailConfig) -> Self {
        Self {
            gpg,
            resolver,
            config,
            builder: PgpMimeBuilder::new(),
        }
    }

    pub fn with_builder(mut self, builder: PgpMimeBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Signs the given message as `multipart/signed`.
    ///
    /// The signer is the given key ID (or email), else the secret key
    /// of the sender, else the default signing key.
    pub async fn sign(&self, msg: &OutboundMessage, signer: Option<&str>) -> Result<SentMessage> {
        info!(from = %msg.from, "sign message");

        let key_id = self.resolve_signer(&msg.from, signer).await?;
        let attachments = self.attachments(msg, &key_id).await?;

        let content = self
            .builder
            .prepare_content_to_sign(&msg.body, msg.content_type(), &attachments)?;

        let sender = mailbox_address(&msg.from);
        let signed = self
            .gpg
            .sign_data(&key_id, content.clone(), Some(sender))
            .await?;

        let body = self
            .builder
            .build_signed_message(&content, &signed.signature, &signed.micalg())?;

        Ok(SentMessage {
            raw: msg.write(body)?,
            signer: Some(signed.key_id.clone()),
            sign: Some(signed),
            encrypt: None,
        })
    }

    /// Encrypts the given message as `multipart/encrypted` for all its
    /// recipients.
    pub async fn encrypt(&self, msg: &OutboundMessage) -> Result<SentMessage> {
        info!(from = %msg.from, "encrypt message");

        let self_key_id = if self.config.is_encrypt_to_self() {
            // only the sender's own key, never the default signing key
            match self.gpg.find_key_by_email(&msg.from).await {
                Ok(key) => Some(key.key_id),
                Err(err) => {
                    warn!("cannot find sender key, message will not be readable from sent folder");
                    debug!("{err:?}");
                    None
                }
            }
        } else {
            None
        };

        let recipients = self.resolve_recipients(msg, self_key_id).await?;

        let content = self
            .builder
            .prepare_content_to_encrypt(&msg.body, msg.content_type(), &msg.attachments)?;

        let encrypted = self.gpg.encrypt_data(&recipients, content).await?;
        let body = self.builder.build_encrypted_message(&encrypted.ciphertext)?;

        Ok(SentMessage {
            raw: msg.write(body)?,
            sign: None,
            encrypt: Some(encrypted),
            signer: None,
        })
    }

    /// Signs then encrypts the given message, in a single gpg
    /// invocation: the signature is embedded in the ciphertext.
    pub async fn sign_and_encrypt(
        &self,
        msg: &OutboundMessage,
        signer: Option<&str>,
    ) -> Result<SentMessage> {
        info!(from = %msg.from, "sign and encrypt message");

        let key_id = self.resolve_signer(&msg.from, signer).await?;

        let self_key_id = if self.config.is_encrypt_to_self() {
            Some(key_id.clone())
        } else {
            None
        };

        let recipients = self.resolve_recipients(msg, self_key_id).await?;
        let attachments = self.attachments(msg, &key_id).await?;

        let content = self
            .builder
            .prepare_content_to_encrypt(&msg.body, msg.content_type(), &attachments)?;

        let sender = mailbox_address(&msg.from);
        let encrypted = self
            .gpg
            .sign_and_encrypt_data(&key_id, &recipients, content, Some(sender))
            .await?;

        let body = self.builder.build_encrypted_message(&encrypted.ciphertext)?;

        Ok(SentMessage {
            raw: msg.write(body)?,
            sign: None,
            encrypt: Some(encrypted),
            signer: Some(key_id),
        })
    }

    async fn resolve_signer(&self, from: &str, signer: Option<&str>) -> Result<String> {
        if let Some(signer) = signer {
            let signer = validate_identifier(signer)?;

            if is_hex_key_id(signer) {
                return Ok(signer.to_ascii_uppercase());
            }

            return Ok(self.gpg.find_key_by_email(signer).await?.key_id);
        }

        match self.gpg.find_key_by_email(from).await {
            Ok(key) => Ok(key.key_id),
            Err(err @ gpg::Error::SecretKeyNotFoundError(_)) => {
                debug!("{err}, falling back to default signing key");
                Ok(self.gpg.get_default_signing_key().await?.key_id)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn resolve_recipients(
        &self,
        msg: &OutboundMessage,
        self_key_id: Option<String>,
    ) -> Result<Vec<String>> {
        let recipients = msg.recipients();

        if recipients.is_empty() {
            return Err(Error::NoRecipientsError);
        }

        let mut key_ids = self.resolver.resolve_recipients(recipients).await?;

        if let Some(key_id) = self_key_id {
            if !key_ids.contains(&key_id) {
                key_ids.push(key_id);
            }
        }

        debug!(?key_ids, "recipients resolved");
        Ok(key_ids)
    }

    async fn attachments(&self, msg: &OutboundMessage, key_id: &str) -> Result<Vec<Attachment>> {
        let mut attachments = msg.attachments.clone();

        if self.config.is_attach_public_key() {
            let armored = self.gpg.export_public_key(key_id).await?;
            attachments.push(Attachment::public_key(key_id, armored));
        }

        Ok(attachments)
    }
}
