//! # Error
//!
//! Module dedicated to PGP/MIME errors. It contains an [`Error`] enum
//! based on [`thiserror::Error`] and a type alias [`Result`].

use std::io;

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot write MIME part")]
    WriteMimePartError(#[source] io::Error),
    #[error("cannot build PGP/MIME message: boundary {0:?} appears in the content")]
    BoundaryCollisionError(String),
    #[error("cannot build signed message: signature is empty")]
    EmptySignatureError,
    #[error("cannot build encrypted message: ciphertext is empty")]
    EmptyCiphertextError,

    #[error("cannot parse PGP/MIME message: missing Content-Type header")]
    MissingContentTypeError,
    #[error("cannot parse PGP/MIME message: missing boundary in Content-Type {0:?}")]
    MissingBoundaryError(String),
    #[error("cannot parse PGP/MIME message: missing blank line after headers")]
    MissingHeaderSeparatorError,
    #[error("cannot parse PGP/MIME message: missing second part for boundary {0:?}")]
    MissingSecondPartError(String),
    #[error("message is not PGP/MIME signed (Content-Type: {0})")]
    NotSignedError(String),
    #[error("message is not PGP/MIME encrypted (Content-Type: {0})")]
    NotEncryptedError(String),
    #[error("cannot parse MIME message")]
    ParseMessageError,
}

impl Error {
    /// Returns `true` when the error comes from a message that is
    /// simply not PGP/MIME, as opposed to a malformed one.
    pub fn is_not_pgp_mime(&self) -> bool {
        matches!(self, Self::NotSignedError(_) | Self::NotEncryptedError(_))
    }
}
