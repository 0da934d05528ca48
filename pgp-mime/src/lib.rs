#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Rust library to build and parse PGP/MIME messages, as defined in
//! [RFC 3156].
//!
//! The library does not sign nor encrypt anything by itself: it
//! prepares the MIME part to sign (or to encrypt), then wraps the
//! detached signature (or the ciphertext) into a `multipart/signed`
//! (or `multipart/encrypted`), see [`PgpMimeBuilder`].
//!
//! The parsing side gives back the exact signed bytes and the
//! signature, see [`parse_pgp_mime`], or the ciphertext, see
//! [`parse_encrypted_mime`].
//!
//! [RFC 3156]: https://www.rfc-editor.org/rfc/rfc3156

mod builder;
mod content;
mod error;
mod parser;
pub mod qp;
mod utils;

#[doc(inline)]
pub use crate::{
    builder::{Attachment, PgpMimeBuilder, PgpMimePart},
    content::MessageContent,
    error::{Error, Result},
    parser::{
        extract_signed_content, find_boundary, find_content_type, find_param,
        is_encrypted_message, is_signed_message, parse_encrypted_mime, parse_headers,
        parse_pgp_mime, split_headers, SignedParts,
    },
};
