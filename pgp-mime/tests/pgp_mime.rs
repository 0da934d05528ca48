use concat_with::concat_line;
use pgp_mime::{
    find_content_type, parse_encrypted_mime, parse_pgp_mime, Attachment, Error, MessageContent,
    PgpMimeBuilder,
};

const SIGNATURE: &str = concat_line!(
    "-----BEGIN PGP SIGNATURE-----",
    "",
    "iHUEARYIAB0WIQTWHkSo3/cyHU0/PyGhGZYdpvkRgAUCZbEGCwAKCRChGZYdpvkR",
    "gM8LAP9e3Vq8hxjgqUQOkTD0fxTUeKrG3v6i6G1xn0HHdSk8pAEAnYkL58wmFC+U",
    "=s0ZT",
    "-----END PGP SIGNATURE-----",
);

fn with_outer_headers(part: &[u8]) -> Vec<u8> {
    let mut msg = concat!(
        "From: alice@localhost\r\n",
        "To: bob@localhost\r\n",
        "Subject: signed\r\n",
        "MIME-Version: 1.0\r\n",
    )
    .as_bytes()
    .to_vec();
    msg.extend_from_slice(part);
    msg
}

#[test_log::test]
fn build_then_parse_signed_message() {
    let builder = PgpMimeBuilder::new();
    let attachments = [Attachment::new("notes.txt", "text/plain", "trailing space \nend")];

    let content = builder
        .prepare_content_to_sign("Hello, world!\n\nSee attachment.  \n", "text/plain", &attachments)
        .unwrap();
    let part = builder
        .build_signed_message(&content, SIGNATURE.as_bytes(), "pgp-sha256")
        .unwrap();
    let msg = with_outer_headers(&part.to_bytes());

    let parts = parse_pgp_mime(&msg).unwrap();

    assert_eq!(parts.signed, content);
    assert_eq!(parts.signature, SIGNATURE.replace('\n', "\r\n").as_bytes());
    assert_eq!(parts.micalg.as_deref(), Some("pgp-sha256"));

    let inner = MessageContent::parse(&parts.signed).unwrap();
    assert!(inner
        .text
        .unwrap()
        .starts_with("Hello, world!\r\n\r\nSee attachment.  "));
    assert_eq!(inner.attachments, vec![String::from("notes.txt")]);
}

#[test_log::test]
fn build_then_parse_encrypted_message() {
    let ciphertext = concat_line!(
        "-----BEGIN PGP MESSAGE-----",
        "",
        "hF4DR2jTsH0nRUUSAQdA3Lvp0j0Uv2YhB0VOBaJ+Y2iKn0A0mSdzKMSyDMjHsRgw",
        "=4lWb",
        "-----END PGP MESSAGE-----",
        "",
    );

    let part = PgpMimeBuilder::new()
        .build_encrypted_message(ciphertext.as_bytes())
        .unwrap();
    let msg = with_outer_headers(&part.to_bytes());

    assert_eq!(
        parse_encrypted_mime(&msg).unwrap(),
        ciphertext.trim().replace('\n', "\r\n").as_bytes()
    );
}

#[test_log::test]
fn parse_folded_rfc2231_boundary() {
    let msg = concat!(
        "From: alice@localhost\r\n",
        "Content-Type: multipart/signed; micalg=pgp-sha512;\r\n",
        " protocol=\"application/pgp-signature\";\r\n",
        "\tboundary*0=\"=-Bound\";\r\n",
        "\tboundary*1=\"ary1\"\r\n",
        "\r\n",
        "--=-Boundary1\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "Hello\r\n",
        "\r\n",
        "--=-Boundary1\r\n",
        "Content-Type: application/pgp-signature\r\n",
        "\r\n",
        "-----BEGIN PGP SIGNATURE-----\r\n",
        "\r\n",
        "iHUEARYIAB0WIQTWHkSo\r\n",
        "-----END PGP SIGNATURE-----\r\n",
        "--=-Boundary1--\r\n",
    );

    let parts = parse_pgp_mime(msg.as_bytes()).unwrap();

    assert_eq!(
        parts.signed,
        b"Content-Type: text/plain; charset=utf-8\r\n\r\nHello\r\n"
    );
    assert_eq!(
        parts.signature,
        b"-----BEGIN PGP SIGNATURE-----\r\n\r\niHUEARYIAB0WIQTWHkSo\r\n-----END PGP SIGNATURE-----"
    );
    assert_eq!(parts.micalg.as_deref(), Some("pgp-sha512"));
}

#[test_log::test]
fn parse_quoted_printable_signature() {
    let msg = concat!(
        "Content-Type: multipart/signed; boundary=\"b\"; protocol=\"application/pgp-signature\"\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "Hello\r\n",
        "--b\r\n",
        "Content-Type: application/pgp-signature\r\n",
        "Content-Transfer-Encoding: quoted-printable\r\n",
        "\r\n",
        "-----BEGIN PGP SIGNATURE-----\r\n",
        "\r\n",
        "iHUEARYIAB0WIQTWHkSo3/cyHU0/=  \r\n",
        "PyGh\r\n",
        "=3Ds0ZT\r\n",
        "-----END PGP SIGNATURE-----\r\n",
        "--b--\r\n",
    );

    let parts = parse_pgp_mime(msg.as_bytes()).unwrap();

    assert_eq!(parts.signed, b"Content-Type: text/plain\r\n\r\nHello");
    assert_eq!(
        parts.signature,
        concat!(
            "-----BEGIN PGP SIGNATURE-----\r\n",
            "\r\n",
            "iHUEARYIAB0WIQTWHkSo3/cyHU0/PyGh\r\n",
            "=s0ZT\r\n",
            "-----END PGP SIGNATURE-----",
        )
        .as_bytes()
    );
    assert_eq!(parts.micalg, None);
}

#[test_log::test]
fn parse_errors() {
    assert!(matches!(
        parse_pgp_mime(b"From: alice@localhost\r\n\r\nHello"),
        Err(Error::MissingContentTypeError)
    ));

    let err = parse_pgp_mime(b"Content-Type: text/plain\r\n\r\nHello").unwrap_err();
    assert!(matches!(&err, Error::NotSignedError(ctype) if ctype == "text/plain"));
    assert!(err.is_not_pgp_mime());

    assert!(matches!(
        parse_encrypted_mime(b"Content-Type: multipart/signed; protocol=\"application/pgp-signature\"\r\n\r\n"),
        Err(Error::NotEncryptedError(_))
    ));

    assert!(matches!(
        parse_pgp_mime(b"Content-Type: multipart/signed; protocol=\"application/pgp-signature\"\r\n\r\n"),
        Err(Error::MissingBoundaryError(_))
    ));

    assert!(matches!(
        parse_pgp_mime(b"Content-Type: multipart/signed; protocol=\"application/pgp-signature\"; boundary=b\r\n"),
        Err(Error::MissingHeaderSeparatorError)
    ));

    let msg = concat!(
        "Content-Type: multipart/encrypted; protocol=\"application/pgp-encrypted\"; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: application/pgp-encrypted\r\n",
        "\r\n",
        "Version: 1\r\n",
        "--b--\r\n",
    );
    assert!(matches!(
        parse_encrypted_mime(msg.as_bytes()),
        Err(Error::MissingSecondPartError(boundary)) if boundary == "b"
    ));
}

#[test_log::test]
fn find_top_level_content_type() {
    let msg = concat!(
        "Subject: test\r\n",
        "content-type: multipart/encrypted;\r\n",
        " protocol=\"application/pgp-encrypted\"; boundary=\"b\"\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
    );

    assert_eq!(
        find_content_type(msg.as_bytes()).unwrap(),
        "multipart/encrypted; protocol=\"application/pgp-encrypted\"; boundary=\"b\""
    );
}
