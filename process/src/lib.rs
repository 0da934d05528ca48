#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Asynchronous library to run external programs.
//!
//! The core concept of this library is to simplify the execution of
//! external programs, following these rules:
//!
//! 1. Programs are executed asynchronously, using the [tokio] async
//! runtime.
//!
//! 2. Programs are spawned directly from an argument vector. No shell
//! is involved, which means arguments are never re-interpreted.
//!
//! 3. Standard output, standard error and the exit code are always
//! captured. A non-zero exit code is not an error: the caller
//! decides, see [`Output::ensure_success`].
//!
//! 4. Dropping the future returned by [`Command::run_with`] kills the
//! child process.

mod command;
mod error;
mod output;

#[doc(inline)]
pub use crate::{
    command::Command,
    error::{Error, Result},
    output::Output,
};
