//! # Reader
//!
//! Module dedicated to incoming messages: PGP/MIME signed messages
//! are verified, encrypted ones are decrypted.

use gpg::{DecryptResult, Gpg, VerifyResult};
use pgp_mime::{
    find_content_type, is_encrypted_message, is_signed_message, parse_encrypted_mime,
    parse_pgp_mime, MessageContent,
};
use tracing::{debug, info};

use crate::Result;

/// The outcome of reading a message.
///
/// A bad signature is an outcome, not an error: see
/// [`VerifyResult::valid`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadOutcome {
    /// The message is neither signed nor encrypted.
    Plain(MessageContent),
    Verified {
        verify: VerifyResult,
        content: MessageContent,
    },
    Decrypted {
        decrypt: DecryptResult,
        /// The outcome of the verification of a decrypted
        /// `multipart/signed` payload.
        verify: Option<VerifyResult>,
        content: MessageContent,
    },
}

impl ReadOutcome {
    pub fn content(&self) -> &MessageContent {
        match self {
            Self::Plain(content) => content,
            Self::Verified { content, .. } => content,
            Self::Decrypted { content, .. } => content,
        }
    }
}

/// The secure message reader.
#[derive(Clone, Debug)]
pub struct SecureReader {
    gpg: Gpg,
}

impl SecureReader {
    pub fn new(gpg: Gpg) -> Self {
        Self { gpg }
    }

    /// Reads the given raw message.
    pub async fn read(&self, raw: &[u8]) -> Result<ReadOutcome> {
        let ctype = find_content_type(raw).unwrap_or_default();
        info!(%ctype, "read message");

        if is_signed_message(&ctype) {
            let (verify, content) = self.verify(raw).await?;
            return Ok(ReadOutcome::Verified { verify, content });
        }

        if is_encrypted_message(&ctype) {
            let ciphertext = parse_encrypted_mime(raw)?;
            let decrypt = self.gpg.decrypt_data(ciphertext).await?;

            let inner_ctype = find_content_type(&decrypt.plaintext).unwrap_or_default();

            let (verify, content) = if is_signed_message(&inner_ctype) {
                debug!("decrypted payload is signed");
                let (verify, content) = self.verify(&decrypt.plaintext).await?;
                (Some(verify), content)
            } else {
                (None, MessageContent::parse(&decrypt.plaintext)?)
            };

            return Ok(ReadOutcome::Decrypted {
                decrypt,
                verify,
                content,
            });
        }

        Ok(ReadOutcome::Plain(MessageContent::parse(raw)?))
    }

    async fn verify(&self, raw: &[u8]) -> Result<(VerifyResult, MessageContent)> {
        let parts = parse_pgp_mime(raw)?;

        let verify = self
            .gpg
            .verify_detached_signature(&parts.signed, &parts.signature)
            .await?;

        debug!(valid = verify.valid, "signature verified");

        let content = MessageContent::parse(&parts.signed)?;
        Ok((verify, content))
    }
}
