#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Asynchronous library to sign, verify, encrypt and decrypt data by
//! driving the gpg binary.
//!
//! The library never reimplements OpenPGP: every operation is a
//! single invocation of a trusted gpg binary, spawned without any
//! shell. The rules are:
//!
//! 1. Every identifier (key ID, fingerprint, email address) handed to
//! gpg is validated first, see [`validate_identifier`].
//!
//! 2. Results are parsed from gpg status lines (`--status-fd`) and
//! colon listings (`--with-colons`), with a fallback on human
//! messages, see the [`parse`] module.
//!
//! 3. A bad signature is a result, not an error: see
//! [`VerifyResult::valid`] and [`DecryptResult::signature_ok`].
//!
//! 4. Missing public keys are fetched from key servers, in order, see
//! [`KeyResolver`].
//!
//! The entry point is the [`Gpg`] adapter.

mod config;
mod decrypt;
mod discovery;
mod encrypt;
mod error;
mod gpg;
mod key;
pub mod parse;
mod runner;
mod sign;
mod utils;
mod validate;
mod verify;

#[doc(inline)]
pub use crate::{
    config::{GpgConfig, DEFAULT_KEY_SERVERS},
    decrypt::DecryptResult,
    discovery::{lookup_key, KeyLookup, KeyResolver},
    encrypt::EncryptResult,
    error::{Error, Result},
    gpg::Gpg,
    key::{key_matches_email, KeyInfo, Trust},
    runner::{GpgRunner, SystemRunner},
    sign::{micalg, SignResult},
    validate::{
        is_hex_key_id, is_valid_identifier, is_valid_key_server, mailbox_address,
        validate_identifier, validate_key_server,
    },
    verify::VerifyResult,
};
