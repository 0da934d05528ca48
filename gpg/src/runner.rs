//! # Runner
//!
//! Module dedicated to the execution of the gpg binary. The
//! [`GpgRunner`] trait is the only place where gpg actually runs, so
//! it can be replaced by a scripted runner in tests.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use process::{Command, Output};

use crate::GpgConfig;

/// Runs gpg with the given arguments and standard input.
///
/// Implementations must never go through a shell: arguments are
/// handed to the program as they are.
#[async_trait]
pub trait GpgRunner: Send + Sync {
    async fn run(&self, args: Vec<String>, input: Vec<u8>) -> process::Result<Output>;
}

/// The runner spawning the gpg binary found on the system.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SystemRunner {
    program: PathBuf,
    home_dir: Option<PathBuf>,
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            home_dir: None,
            timeout: GpgConfig::default_timeout(),
        }
    }

    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut cmd = Command::new(self.program.display())
            // human messages are scraped when status lines are
            // missing, they need to be in english
            .env("LC_MESSAGES", "C")
            .env("LANGUAGE", "en")
            .with_timeout(Some(self.timeout));

        if let Some(home_dir) = &self.home_dir {
            cmd = cmd.arg("--homedir").arg(home_dir.display());
        }

        cmd.args(args)
    }
}

impl From<&GpgConfig> for SystemRunner {
    fn from(config: &GpgConfig) -> Self {
        Self::new(config.get_program())
            .with_home_dir(config.home_dir.clone())
            .with_timeout(config.get_timeout())
    }
}

#[async_trait]
impl GpgRunner for SystemRunner {
    async fn run(&self, args: Vec<String>, input: Vec<u8>) -> process::Result<Output> {
        self.command(args).run_with(input).await
    }
}
