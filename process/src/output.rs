//! # Output
//!
//! Module dedicated to command output. It only exposes an [`Output`]
//! struct, a wrapper around the exit code and the captured standard
//! channels.

use crate::{Error, Result};

/// Wrapper around command output.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Output {
    /// The exit status code of the program.
    pub code: i32,

    /// The raw bytes written on the standard output.
    pub stdout: Vec<u8>,

    /// The raw bytes written on the standard error.
    pub stderr: Vec<u8>,
}

impl Output {
    pub fn new(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Reads the standard output as string lossy.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Reads the standard error as string lossy.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Turns a non-zero exit status code into an error carrying the
    /// given command representation and the standard error.
    pub fn ensure_success(self, cmd: impl ToString) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            let err = self.stderr_lossy();
            Err(Error::GetExitStatusCodeNonZeroError(
                cmd.to_string(),
                self.code,
                err,
            ))
        }
    }
}

impl From<Output> for Vec<u8> {
    fn from(output: Output) -> Self {
        output.stdout
    }
}

impl TryFrom<Output> for String {
    type Error = Error;

    fn try_from(output: Output) -> Result<Self> {
        String::from_utf8(output.stdout).map_err(Error::ParseOutputAsUtf8StringError)
    }
}
