//! # Gpg
//!
//! Module dedicated to the [`Gpg`] adapter and its keyring
//! operations. Signing, verification, encryption and decryption live
//! in their own modules.

use std::{fmt, sync::Arc};

use chrono::Utc;
use process::Output;
use tracing::{debug, info, warn};

use crate::{
    key::{parse_public_key_listing, parse_secret_key_listing, KeyInfo},
    parse::{parse_import_output, ImportStats},
    runner::{GpgRunner, SystemRunner},
    validate::{is_hex_key_id, mailbox_address, validate_identifier, validate_key_server},
    Error, GpgConfig, Result,
};

const LISTING_ARGS: [&str; 3] = ["--with-colons", "--fixed-list-mode", "--with-fingerprint"];

/// The gpg adapter.
///
/// Every operation is a single gpg invocation through the configured
/// [`GpgRunner`]. Dropping an operation future kills the gpg child.
#[derive(Clone)]
pub struct Gpg {
    runner: Arc<dyn GpgRunner>,
    key_servers: Vec<String>,
    default_key: Option<String>,
    always_trust: bool,
}

impl Gpg {
    /// Builds an adapter running the gpg binary described by the
    /// given configuration.
    pub fn new(config: &GpgConfig) -> Self {
        Self::with_runner(config, SystemRunner::from(config))
    }

    /// Builds an adapter on top of a custom runner.
    pub fn with_runner(config: &GpgConfig, runner: impl GpgRunner + 'static) -> Self {
        Self {
            runner: Arc::new(runner),
            key_servers: config.get_key_servers(),
            default_key: config.default_key.clone(),
            always_trust: config.is_always_trust(),
        }
    }

    pub fn key_servers(&self) -> &[String] {
        &self.key_servers
    }

    pub(crate) fn is_always_trust(&self) -> bool {
        self.always_trust
    }

    /// Runs gpg in batch mode with status lines sent to stderr.
    pub(crate) async fn exec(&self, args: Vec<String>, input: impl Into<Vec<u8>>) -> Result<Output> {
        let mut argv: Vec<String> = vec!["--batch".into(), "--status-fd".into(), "2".into()];
        argv.extend(args);

        let output = self
            .runner
            .run(argv, input.into())
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    Error::GpgNotFoundError(err)
                } else {
                    Error::RunGpgError(err)
                }
            })?;

        debug!(code = output.code, "gpg exited");
        Ok(output)
    }

    /// Checks that the gpg binary can be run.
    pub async fn check_available(&self) -> Result<()> {
        info!("check gpg availability");

        self.runner
            .run(vec!["--version".into()], Vec::new())
            .await
            .and_then(|output| output.ensure_success("gpg --version"))
            .map_err(Error::GpgNotFoundError)?;

        Ok(())
    }

    /// Lists the keys of the public keyring.
    ///
    /// An empty keyring gives an empty list.
    pub async fn list_public_keys(&self) -> Result<Vec<KeyInfo>> {
        info!("list gpg public keys");

        let output = self.list("--list-keys").await?;
        parse_public_key_listing(&output.to_string_lossy())
    }

    /// Lists the keys of the secret keyring.
    ///
    /// An empty secret keyring gives a [`Error::NoSecretKeyError`].
    pub async fn list_signing_keys(&self) -> Result<Vec<KeyInfo>> {
        info!("list gpg secret keys");

        let output = self.list("--list-secret-keys").await?;
        parse_secret_key_listing(&output.to_string_lossy())
    }

    async fn list(&self, cmd: &str) -> Result<Output> {
        let mut args: Vec<String> = LISTING_ARGS.iter().map(ToString::to_string).collect();
        args.push(cmd.into());

        let output = self.exec(args, Vec::new()).await?;

        if !output.is_success() {
            return Err(Error::ListKeysError(output.stderr_lossy().trim().to_owned()));
        }

        Ok(output)
    }

    /// Returns the key to sign with when no signer is given.
    ///
    /// The configured default key wins, otherwise the first usable
    /// secret key able to sign is taken.
    pub async fn get_default_signing_key(&self) -> Result<KeyInfo> {
        if let Some(default_key) = &self.default_key {
            let id = validate_identifier(default_key)?;
            debug!(id, "using configured default signing key");

            return self
                .list_signing_keys()
                .await?
                .into_iter()
                .find(|key| {
                    if is_hex_key_id(id) {
                        key.matches_id(id)
                    } else {
                        key.matches_email(mailbox_address(id))
                    }
                })
                .ok_or_else(|| Error::SecretKeyNotFoundError(id.to_owned()));
        }

        let now = Utc::now();
        self.list_signing_keys()
            .await?
            .into_iter()
            .find(|key| key.is_usable_at(now) && key.can_sign())
            .ok_or(Error::NoUsableSigningKeyError)
    }

    /// Finds the secret key carrying the given email address.
    ///
    /// Gpg flags like `--local-user` only behave when given an actual
    /// key ID, this turns an email into one.
    pub async fn find_key_by_email(&self, email: &str) -> Result<KeyInfo> {
        let email = mailbox_address(validate_identifier(email)?);
        info!(email, "find gpg secret key by email");

        let now = Utc::now();
        let mut unusable = false;

        for key in self.list_signing_keys().await? {
            if !key.matches_email(email) {
                continue;
            }

            if key.is_usable_at(now) && key.can_sign() {
                debug!(key_id = %key.key_id, "found secret key");
                return Ok(key);
            }

            debug!(key_id = %key.key_id, "skipping unusable secret key");
            unusable = true;
        }

        if unusable {
            Err(Error::KeyUnusableError(email.to_owned()))
        } else {
            Err(Error::SecretKeyNotFoundError(email.to_owned()))
        }
    }

    /// Imports the given armored keys into the keyring.
    pub async fn import_keys(&self, armored: impl Into<Vec<u8>>) -> Result<ImportStats> {
        info!("import gpg keys");

        let output = self.exec(vec!["--import".into()], armored).await?;

        match parse_import_output(&output.stderr_lossy()) {
            Some(stats) if stats.considered > 0 => {
                debug!(?stats, "keys imported");
                Ok(stats)
            }
            _ => Err(Error::ImportKeyError(output.stderr_lossy().trim().to_owned())),
        }
    }

    /// Exports the armored public key of the given key ID.
    pub async fn export_public_key(&self, key_id: &str) -> Result<Vec<u8>> {
        let key_id = validate_identifier(key_id)?;
        info!(key_id, "export gpg public key");

        let args = vec!["--armor".into(), "--export".into(), key_id.into()];
        let output = self.exec(args, Vec::new()).await?;

        if !output.is_success() {
            let err = output.stderr_lossy().trim().to_owned();
            return Err(Error::ExportKeyError(key_id.to_owned(), err));
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            let err = String::from("nothing exported");
            return Err(Error::ExportKeyError(key_id.to_owned(), err));
        }

        Ok(output.stdout)
    }

    /// Fetches the key designated by the given identifier from the
    /// given key server into the local keyring.
    ///
    /// Key IDs and fingerprints are received as they are, email
    /// addresses are located through the key server only.
    pub async fn fetch_key(&self, id: &str, key_server: &str) -> Result<()> {
        let id = validate_identifier(id)?;
        let key_server = validate_key_server(key_server)?;
        info!(id, key_server, "fetch gpg key");

        let mut args: Vec<String> = vec!["--keyserver".into(), key_server.into()];

        if is_hex_key_id(id) {
            args.push("--recv-keys".into());
            args.push(id.into());
        } else {
            args.push("--auto-key-locate".into());
            args.push("clear,nodefault,keyserver".into());
            args.push("--locate-keys".into());
            args.push(mailbox_address(id).into());
        }

        let output = self.exec(args, Vec::new()).await?;
        let stderr = output.stderr_lossy();

        let imported = match parse_import_output(&stderr) {
            Some(stats) => stats.has_keys(),
            None => true,
        };

        if output.is_success() && imported {
            debug!(id, key_server, "key fetched");
            Ok(())
        } else {
            let err = stderr.trim().to_owned();
            Err(Error::FetchKeyError(id.into(), key_server.into(), err))
        }
    }

    /// Fetches the key designated by the given identifier from the
    /// given key servers, in order, stopping at the first success.
    ///
    /// Returns the key server the key was fetched from.
    pub async fn fetch_key_from_any(&self, id: &str, key_servers: &[String]) -> Result<String> {
        let id = validate_identifier(id)?;

        for key_server in key_servers {
            match self.fetch_key(id, key_server).await {
                Ok(()) => return Ok(key_server.clone()),
                Err(err @ Error::GpgNotFoundError(_)) => return Err(err),
                Err(err) => {
                    warn!(id, %key_server, "cannot fetch key, trying next server");
                    debug!("{err:?}");
                }
            }
        }

        Err(Error::FetchKeyFromServersError(id.into(), key_servers.len()))
    }
}

impl fmt::Debug for Gpg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpg")
            .field("key_servers", &self.key_servers)
            .field("default_key", &self.default_key)
            .field("always_trust", &self.always_trust)
            .finish_non_exhaustive()
    }
}
