//! # Builder
//!
//! Module dedicated to PGP/MIME message building (RFC 3156).
//!
//! Signing is done in two steps: the content is first prepared as a
//! standalone MIME part, which is what gets signed, then wrapped
//! together with the detached signature. The prepared bytes are
//! embedded verbatim, so the signature still matches once the
//! message is parsed back.

use mail_builder::{
    headers::content_type::ContentType,
    mime::{BodyPart, MimePart},
};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, trace};

use crate::{
    qp,
    utils::{contains, normalize_crlf, trim},
    Error, Result,
};

/// The preamble written before the first part of PGP/MIME
/// multiparts, ignored by MIME readers.
const PREAMBLE: &str = "This is an OpenPGP/MIME message (RFC 4880 and 3156)\r\n";

/// A file attached to the prepared content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl ToString,
        content_type: impl ToString,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data: data.into(),
        }
    }

    /// Builds an `application/pgp-keys` attachment holding the given
    /// armored public key.
    pub fn public_key(key_id: &str, armored: impl Into<Vec<u8>>) -> Self {
        Self::new(format!("0x{key_id}.asc"), "application/pgp-keys", armored)
    }
}

/// A built PGP/MIME multipart: its content type with parameters,
/// and its body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PgpMimePart {
    pub content_type: String,
    pub params: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PgpMimePart {
    pub fn boundary(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == "boundary")
            .map(|(_, val)| val.as_str())
    }

    /// Returns the full `Content-Type` header value.
    pub fn content_type_header(&self) -> String {
        let mut header = self.content_type.clone();

        for (key, val) in &self.params {
            header.push_str(&format!("; {key}=\"{val}\""));
        }

        header
    }

    /// Returns the part as standalone MIME bytes, headers included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = format!("Content-Type: {}\r\n\r\n", self.content_type_header()).into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Turns the part into a [`MimePart`], so it can be used as the
    /// body of a [`mail_builder::MessageBuilder`].
    ///
    /// The body is written as it is, without any transfer encoding.
    pub fn into_mime_part(self) -> MimePart<'static> {
        let mut ctype = ContentType::new(self.content_type);

        for (key, val) in self.params {
            ctype = ctype.attribute(key, val);
        }

        MimePart::new(ctype, BodyPart::Binary(self.body.into())).transfer_encoding("7bit")
    }
}

/// The PGP/MIME builder.
///
/// Boundaries are random unless one is given with
/// [`PgpMimeBuilder::with_boundary`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PgpMimeBuilder {
    boundary: Option<String>,
}

impl PgpMimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundary(mut self, boundary: impl ToString) -> Self {
        self.boundary = Some(boundary.to_string());
        self
    }

    /// Prepares the MIME part to be signed.
    ///
    /// The text body is quoted-printable encoded, attachments are
    /// base64 encoded inside a `multipart/mixed`. Line endings are
    /// CRLF.
    pub fn prepare_content_to_sign(
        &self,
        body: &str,
        content_type: &str,
        attachments: &[Attachment],
    ) -> Result<Vec<u8>> {
        debug!(content_type, attachments = attachments.len(), "prepare content to sign");
        prepare_content(body, content_type, attachments)
    }

    /// Prepares the MIME part to be encrypted.
    ///
    /// The part is built the same way as
    /// [`PgpMimeBuilder::prepare_content_to_sign`].
    pub fn prepare_content_to_encrypt(
        &self,
        body: &str,
        content_type: &str,
        attachments: &[Attachment],
    ) -> Result<Vec<u8>> {
        debug!(content_type, attachments = attachments.len(), "prepare content to encrypt");
        prepare_content(body, content_type, attachments)
    }

    /// Wraps the prepared content and its detached signature into a
    /// `multipart/signed`.
    pub fn build_signed_message(
        &self,
        content: &[u8],
        signature: &[u8],
        micalg: &str,
    ) -> Result<PgpMimePart> {
        let signature = trim(signature);

        if signature.is_empty() {
            return Err(Error::EmptySignatureError);
        }

        let mut signature_part = concat!(
            "Content-Type: application/pgp-signature; name=\"signature.asc\"\r\n",
            "Content-Description: OpenPGP digital signature\r\n",
            "Content-Disposition: attachment; filename=\"signature.asc\"\r\n",
            "\r\n",
        )
        .as_bytes()
        .to_vec();
        signature_part.extend(normalize_crlf(signature));

        let boundary = self.boundary(&[content, &signature_part])?;
        debug!(%boundary, micalg, "build multipart/signed");

        Ok(PgpMimePart {
            content_type: String::from("multipart/signed"),
            params: vec![
                (String::from("protocol"), String::from("application/pgp-signature")),
                (String::from("micalg"), micalg.to_owned()),
                (String::from("boundary"), boundary.clone()),
            ],
            body: multipart_body(&boundary, &[content, &signature_part]),
        })
    }

    /// Wraps the armored ciphertext into a `multipart/encrypted`.
    pub fn build_encrypted_message(&self, ciphertext: &[u8]) -> Result<PgpMimePart> {
        let ciphertext = trim(ciphertext);

        if ciphertext.is_empty() {
            return Err(Error::EmptyCiphertextError);
        }

        let version_part = concat!(
            "Content-Type: application/pgp-encrypted\r\n",
            "Content-Description: PGP/MIME version identification\r\n",
            "\r\n",
            "Version: 1\r\n",
        )
        .as_bytes();

        let mut encrypted_part = concat!(
            "Content-Type: application/octet-stream; name=\"encrypted.asc\"\r\n",
            "Content-Description: OpenPGP encrypted message\r\n",
            "Content-Disposition: inline; filename=\"encrypted.asc\"\r\n",
            "\r\n",
        )
        .as_bytes()
        .to_vec();
        encrypted_part.extend(normalize_crlf(ciphertext));

        let boundary = self.boundary(&[&encrypted_part])?;
        debug!(%boundary, "build multipart/encrypted");

        Ok(PgpMimePart {
            content_type: String::from("multipart/encrypted"),
            params: vec![
                (String::from("protocol"), String::from("application/pgp-encrypted")),
                (String::from("boundary"), boundary.clone()),
            ],
            body: multipart_body(&boundary, &[version_part, &encrypted_part]),
        })
    }

    fn boundary(&self, parts: &[&[u8]]) -> Result<String> {
        let collides = |boundary: &str| {
            let delimiter = format!("--{boundary}");
            parts.iter().any(|part| contains(part, delimiter.as_bytes()))
        };

        match &self.boundary {
            Some(boundary) if collides(boundary) => {
                Err(Error::BoundaryCollisionError(boundary.clone()))
            }
            Some(boundary) => Ok(boundary.clone()),
            None => loop {
                let boundary = random_boundary();
                if !collides(&boundary) {
                    break Ok(boundary);
                }
            },
        }
    }
}

fn prepare_content(body: &str, content_type: &str, attachments: &[Attachment]) -> Result<Vec<u8>> {
    let content_type = match content_type.trim() {
        "" => "text/plain",
        ctype => ctype,
    };

    let text_part = MimePart::new(
        ContentType::new(content_type).attribute("charset", "utf-8"),
        BodyPart::Text(qp::encode(body).into()),
    )
    .transfer_encoding("quoted-printable");

    let part = if attachments.is_empty() {
        text_part
    } else {
        let mut parts = vec![text_part];

        for attachment in attachments {
            trace!(filename = %attachment.filename, ctype = %attachment.content_type, "attach file");

            let ctype = ContentType::new(attachment.content_type.as_str())
                .attribute("name", attachment.filename.as_str());
            let part = MimePart::new(ctype, BodyPart::Binary(attachment.data.as_slice().into()))
                .attachment(attachment.filename.as_str());

            parts.push(part);
        }

        MimePart::new("multipart/mixed", parts)
    };

    let mut bytes = Vec::new();
    part.write_part(&mut bytes)
        .map_err(Error::WriteMimePartError)?;

    Ok(normalize_crlf(&bytes))
}

fn multipart_body(boundary: &str, parts: &[&[u8]]) -> Vec<u8> {
    let mut body = PREAMBLE.as_bytes().to_vec();

    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(part);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn random_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    format!("pgp-mime-{token}")
}

#[cfg(test)]
mod tests {
    use super::{Attachment, PgpMimeBuilder};
    use crate::Error;

    #[test]
    fn prepare_text_content() {
        let content = PgpMimeBuilder::new()
            .prepare_content_to_sign("Hello = world \nFrom me\n", "text/plain", &[])
            .unwrap();
        let content = String::from_utf8(content).unwrap();

        assert!(content.starts_with("Content-Type: text/plain"));
        assert!(content.contains("charset"));
        assert!(content.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
        assert!(content.ends_with("\r\n\r\nHello =3D world=20\r\n=46rom me\r\n"));
        assert!(!content.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn prepare_content_with_attachments() {
        let attachments = [
            Attachment::new("data.bin", "application/octet-stream", vec![0, 159, 146, 150]),
            Attachment::public_key("AAAAAAAAAAAAAAAA", "-----BEGIN PGP PUBLIC KEY BLOCK-----"),
        ];

        let content = PgpMimeBuilder::new()
            .prepare_content_to_encrypt("body", "", &attachments)
            .unwrap();
        let content = String::from_utf8(content).unwrap();

        assert!(content.starts_with("Content-Type: multipart/mixed"));
        assert!(content.contains("Content-Type: text/plain"));
        assert!(content.contains("data.bin"));
        assert!(content.contains("Content-Type: application/pgp-keys"));
        assert!(content.contains("0xAAAAAAAAAAAAAAAA.asc"));
        assert!(!content.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn build_signed_message() {
        let part = PgpMimeBuilder::new()
            .with_boundary("bound")
            .build_signed_message(
                b"Content-Type: text/plain\r\n\r\nHello",
                b"-----BEGIN PGP SIGNATURE-----\nsig\n-----END PGP SIGNATURE-----\n",
                "pgp-sha256",
            )
            .unwrap();

        assert_eq!(part.boundary(), Some("bound"));
        assert_eq!(
            part.content_type_header(),
            "multipart/signed; protocol=\"application/pgp-signature\"; micalg=\"pgp-sha256\"; boundary=\"bound\""
        );

        let expected_body = concat!(
            "This is an OpenPGP/MIME message (RFC 4880 and 3156)\r\n",
            "--bound\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "Hello\r\n",
            "--bound\r\n",
            "Content-Type: application/pgp-signature; name=\"signature.asc\"\r\n",
            "Content-Description: OpenPGP digital signature\r\n",
            "Content-Disposition: attachment; filename=\"signature.asc\"\r\n",
            "\r\n",
            "-----BEGIN PGP SIGNATURE-----\r\n",
            "sig\r\n",
            "-----END PGP SIGNATURE-----\r\n",
            "--bound--\r\n",
        );

        assert_eq!(String::from_utf8(part.body).unwrap(), expected_body);
    }

    #[test]
    fn build_encrypted_message() {
        let part = PgpMimeBuilder::new()
            .with_boundary("bound")
            .build_encrypted_message(b"\n-----BEGIN PGP MESSAGE-----\r\nabc\r\n-----END PGP MESSAGE-----\n")
            .unwrap();

        assert_eq!(
            part.content_type_header(),
            "multipart/encrypted; protocol=\"application/pgp-encrypted\"; boundary=\"bound\""
        );

        let expected_body = concat!(
            "This is an OpenPGP/MIME message (RFC 4880 and 3156)\r\n",
            "--bound\r\n",
            "Content-Type: application/pgp-encrypted\r\n",
            "Content-Description: PGP/MIME version identification\r\n",
            "\r\n",
            "Version: 1\r\n",
            "\r\n",
            "--bound\r\n",
            "Content-Type: application/octet-stream; name=\"encrypted.asc\"\r\n",
            "Content-Description: OpenPGP encrypted message\r\n",
            "Content-Disposition: inline; filename=\"encrypted.asc\"\r\n",
            "\r\n",
            "-----BEGIN PGP MESSAGE-----\r\n",
            "abc\r\n",
            "-----END PGP MESSAGE-----\r\n",
            "--bound--\r\n",
        );

        assert_eq!(String::from_utf8(part.body).unwrap(), expected_body);
    }

    #[test]
    fn build_errors() {
        let builder = PgpMimeBuilder::new().with_boundary("bound");

        assert!(matches!(
            builder.build_signed_message(b"content", b" \r\n", "pgp-sha256"),
            Err(Error::EmptySignatureError)
        ));
        assert!(matches!(
            builder.build_encrypted_message(b""),
            Err(Error::EmptyCiphertextError)
        ));
        assert!(matches!(
            builder.build_signed_message(b"text\r\n--bound\r\n", b"sig", "pgp-sha256"),
            Err(Error::BoundaryCollisionError(boundary)) if boundary == "bound"
        ));
    }

    #[test]
    fn random_boundaries() {
        let builder = PgpMimeBuilder::new();
        let first = builder.build_encrypted_message(b"cipher").unwrap();
        let second = builder.build_encrypted_message(b"cipher").unwrap();

        assert!(first.boundary().unwrap().starts_with("pgp-mime-"));
        assert_ne!(first.boundary(), second.boundary());
    }
}
