use std::{fmt, io, process::Stdio, time::Duration};

use tokio::{io::AsyncWriteExt as _, process::Command as AsyncCommand};
use tracing::{debug, info};

use crate::{Error, Output, Result};

/// The command structure.
///
/// Represents one external program together with its argument
/// vector. Arguments are handed to the operating system as they are,
/// without going through a shell.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Command {
    pub fn new(program: impl ToString) -> Self {
        Self {
            program: program.to_string(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl ToString>) -> Self {
        self.args.extend(args.into_iter().map(|arg| arg.to_string()));
        self
    }

    pub fn env(mut self, key: impl ToString, val: impl ToString) -> Self {
        self.envs.push((key.to_string(), val.to_string()));
        self
    }

    /// Aborts the command (and kills the child) once the given
    /// duration elapsed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub async fn run(&self) -> Result<Output> {
        self.run_with(b"").await
    }

    /// Run the command with the given input.
    ///
    /// If the given input is empty, the standard input of the child
    /// is closed straight away. Otherwise the input is written to the
    /// standard input while the standard output and error are being
    /// read, so large inputs cannot fill up the pipes.
    pub async fn run_with(&self, input: impl AsRef<[u8]>) -> Result<Output> {
        info!(cmd = %self, "run command");

        let input = input.as_ref();

        match self.timeout {
            None => self.spawn_and_wait(input).await,
            Some(timeout) => tokio::time::timeout(timeout, self.spawn_and_wait(input))
                .await
                .map_err(|_| {
                    debug!(?timeout, "command timed out, killing child");
                    Error::TimeoutError(self.to_string(), timeout)
                })?,
        }
    }

    async fn spawn_and_wait(&self, input: &[u8]) -> Result<Output> {
        let mut child = AsyncCommand::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(key, val)| (key, val)))
            .stdin(if input.is_empty() {
                debug!("stdin closed");
                Stdio::null()
            } else {
                debug!("stdin piped");
                Stdio::piped()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| Error::SpawnCommandError(err, self.program.clone()))?;

        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input).await?;
                stdin.shutdown().await?;
            }
            io::Result::Ok(())
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(Error::WaitCommandError)?;

        match written {
            Ok(()) => (),
            // the program may legitimately exit before consuming its
            // whole input, the exit code tells what happened
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!("program closed its standard input early");
            }
            Err(err) => return Err(Error::WriteStdinError(err)),
        }

        let code = output
            .status
            .code()
            .ok_or_else(|| Error::GetExitStatusCodeNotAvailableError(self.to_string()))?;

        if code == 0 {
            debug!(code, "command gracefully exited");
        } else {
            let err = String::from_utf8_lossy(&output.stderr);
            debug!(code, %err, "command ungracefully exited");
        }

        Ok(Output::new(code, output.stdout, output.stderr))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
