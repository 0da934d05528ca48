//! # Error
//!
//! Module dedicated to process errors. It contains an [`Error`] enum
//! based on [`thiserror::Error`] and a type alias [`Result`].

use std::{io, string::FromUtf8Error, time::Duration};

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot spawn program {1}")]
    SpawnCommandError(#[source] io::Error, String),
    #[error("cannot write data to standard input")]
    WriteStdinError(#[source] io::Error),
    #[error("cannot wait for command output")]
    WaitCommandError(#[source] io::Error),
    #[error("cannot get exit status code of command: {0}")]
    GetExitStatusCodeNotAvailableError(String),
    #[error("command {0} returned non-zero exit status code {1}: {2}")]
    GetExitStatusCodeNonZeroError(String, i32, String),
    #[error("command {0} did not finish within {1:?}")]
    TimeoutError(String, Duration),
    #[error("cannot parse command output as string")]
    ParseOutputAsUtf8StringError(#[source] FromUtf8Error),
}

impl Error {
    /// Returns `true` when the program could not be found or
    /// executed at all.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SpawnCommandError(err, _) if err.kind() == io::ErrorKind::NotFound)
    }

    /// Returns `true` when the command was aborted after its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutError(..))
    }
}
