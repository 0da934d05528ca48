#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Rust library to send and read PGP/MIME signed and encrypted
//! emails, using gpg.
//!
//! Outgoing messages go through a [`SecureSender`], which resolves
//! the signer and the recipient keys, prepares the MIME content,
//! asks gpg to sign and/or encrypt it, then writes the final raw
//! message.
//!
//! Incoming messages go through a [`SecureReader`], which verifies
//! `multipart/signed` messages and decrypts `multipart/encrypted`
//! ones.

mod config;
mod error;
mod message;
mod reader;
mod sender;

#[doc(inline)]
pub use crate::{
    config::SecureMailConfig,
    error::{Error, Result},
    message::{OutboundMessage, SentMessage},
    reader::{ReadOutcome, SecureReader},
    sender::SecureSender,
};
