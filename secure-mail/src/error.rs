use std::io;

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot send message: no recipients given")]
    NoRecipientsError,
    #[error("cannot write message")]
    WriteMessageError(#[source] io::Error),

    #[error(transparent)]
    GpgError(#[from] gpg::Error),
    #[error(transparent)]
    PgpMimeError(#[from] pgp_mime::Error),
}

impl Error {
    /// Returns `true` when the error comes from a malformed input,
    /// rejected before running gpg.
    pub fn is_bad_input(&self) -> bool {
        match self {
            Self::NoRecipientsError => true,
            Self::GpgError(err) => err.is_invalid_input(),
            _ => false,
        }
    }

    /// Returns `true` when a key could not be found, locally or on
    /// key servers.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::GpgError(err) if err.is_key_not_found())
    }

    /// Returns `true` when a key exists but cannot be used.
    pub fn is_key_unusable(&self) -> bool {
        matches!(self, Self::GpgError(err) if err.is_key_unusable())
    }
}
