//! Module dedicated to outbound messages and their serialization.

use chrono::{DateTime, Utc};
use gpg::{mailbox_address, EncryptResult, SignResult};
use mail_builder::{headers::address::Address, MessageBuilder};
use pgp_mime::{Attachment, PgpMimePart};
use tracing::debug;

use crate::{Error, Result};

/// A message to be signed and/or encrypted, then sent.
///
/// Addresses are either bare (`alice@localhost`) or with a display
/// name (`Alice <alice@localhost>`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    /// Blind recipients are used to encrypt the message, but never
    /// written in its headers.
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Defaults to `text/plain`.
    pub content_type: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
    /// Defaults to a generated one.
    pub message_id: Option<String>,
}

impl OutboundMessage {
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("text/plain")
    }

    /// Returns the bare addresses of all recipients, in order: to, cc
    /// then bcc.
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|addr| mailbox_address(addr))
            .collect()
    }

    /// Writes the message headers around the given PGP/MIME body.
    pub(crate) fn write(&self, body: PgpMimePart) -> Result<Vec<u8>> {
        debug!(content_type = %body.content_type, "write message");

        let mut builder = MessageBuilder::new()
            .from(address(&self.from))
            .subject(self.subject.as_str())
            .body(body.into_mime_part());

        if !self.to.is_empty() {
            builder = builder.to(address_list(&self.to));
        }

        if !self.cc.is_empty() {
            builder = builder.cc(address_list(&self.cc));
        }

        if let Some(date) = self.date {
            builder = builder.date(date.timestamp().max(0) as u64);
        }

        if let Some(id) = &self.message_id {
            builder = builder.message_id(id.as_str());
        }

        builder.write_to_vec().map_err(Error::WriteMessageError)
    }
}

/// A message ready to be sent, with the outcome of the gpg
/// operations that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentMessage {
    /// The raw RFC 822 message.
    pub raw: Vec<u8>,
    /// The detached signature, for signed only messages.
    pub sign: Option<SignResult>,
    pub encrypt: Option<EncryptResult>,
    /// The key ID of the signer, for signed messages.
    pub signer: Option<String>,
}

fn address(mailbox: &str) -> Address<'_> {
    let email = mailbox_address(mailbox);
    let name = mailbox
        .split_once('<')
        .map(|(name, _)| name.trim().trim_matches('"'))
        .filter(|name| !name.is_empty());

    Address::new_address(name, email)
}

fn address_list(mailboxes: &[String]) -> Address<'_> {
    Address::new_list(mailboxes.iter().map(|mailbox| address(mailbox)).collect())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pgp_mime::PgpMimeBuilder;

    use super::OutboundMessage;

    #[test]
    fn recipients() {
        let msg = OutboundMessage {
            to: vec!["Alice <alice@localhost>".into()],
            cc: vec!["carol@localhost".into()],
            bcc: vec!["\"Bob B.\" <bob@localhost>".into()],
            ..Default::default()
        };

        assert_eq!(
            msg.recipients(),
            vec!["alice@localhost", "carol@localhost", "bob@localhost"]
        );
        assert_eq!(msg.content_type(), "text/plain");
    }

    #[test]
    fn write_headers() {
        let msg = OutboundMessage {
            from: "Alice <alice@localhost>".into(),
            to: vec!["bob@localhost".into()],
            bcc: vec!["hidden@localhost".into()],
            subject: "Secret".into(),
            date: Utc.timestamp_opt(0, 0).single(),
            message_id: Some("id@localhost".into()),
            ..Default::default()
        };

        let body = PgpMimeBuilder::new()
            .with_boundary("bound")
            .build_encrypted_message(b"-----BEGIN PGP MESSAGE-----")
            .unwrap();
        let raw = String::from_utf8(msg.write(body).unwrap()).unwrap();

        let header = |name: &str| {
            raw.lines()
                .find(|line| line.starts_with(name))
                .unwrap_or_default()
                .to_owned()
        };

        assert!(header("From: ").contains("Alice"));
        assert!(header("From: ").contains("alice@localhost"));
        assert!(header("To: ").contains("bob@localhost"));
        assert!(raw.contains("Subject: Secret\r\n"));
        assert!(raw.contains("Message-ID: <id@localhost>\r\n"));
        assert!(raw.contains("Date: Thu, 1 Jan 1970 00:00:00 +0000\r\n"));
        assert!(raw.contains("multipart/encrypted"));
        assert!(raw.contains("--bound\r\n"));
        assert!(!raw.contains("hidden@localhost"));
    }
}
