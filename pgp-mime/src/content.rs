//! Module dedicated to the inner content of messages, once verified
//! or decrypted.

use mail_parser::{MessageParser, MessagePart, MimeHeaders};

use crate::{Error, Result};

/// The readable content of a MIME message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MessageContent {
    pub text: Option<String>,
    pub html: Option<String>,
    /// The attachment file names, `noname` when missing.
    pub attachments: Vec<String>,
}

impl MessageContent {
    /// Parses the given raw MIME message (or part).
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let msg = MessageParser::new()
            .parse(raw)
            .ok_or(Error::ParseMessageError)?;

        let text = msg
            .text_part(0)
            .filter(|part| is_text_subtype(part, "plain"))
            .and_then(|part| part.text_contents())
            .map(ToOwned::to_owned);

        let html = msg
            .html_part(0)
            .filter(|part| is_text_subtype(part, "html"))
            .and_then(|part| part.text_contents())
            .map(ToOwned::to_owned);

        let attachments = msg
            .attachments()
            .map(|part| part.attachment_name().unwrap_or("noname").to_owned())
            .collect();

        Ok(Self {
            text,
            html,
            attachments,
        })
    }
}

fn is_text_subtype(part: &MessagePart, subtype: &str) -> bool {
    match part.content_type() {
        Some(ctype) => {
            ctype.ctype().eq_ignore_ascii_case("text")
                && ctype
                    .subtype()
                    .is_some_and(|s| s.eq_ignore_ascii_case(subtype))
        }
        None => subtype == "plain",
    }
}
