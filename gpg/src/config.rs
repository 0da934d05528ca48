//! # Configuration
//!
//! Module dedicated to gpg configuration.

use std::{path::PathBuf, time::Duration};

/// The ordered list of public key servers contacted when a key cannot
/// be found in the local keyring.
pub const DEFAULT_KEY_SERVERS: [&str; 4] = [
    "hkps://keys.openpgp.org",
    "hkps://keyserver.ubuntu.com",
    "hkps://pgp.mit.edu",
    "hkps://keys.gnupg.net",
];

/// The gpg configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct GpgConfig {
    /// The gpg program to run.
    ///
    /// Defaults to `gpg`, resolved using the `PATH` environment
    /// variable.
    pub program: Option<PathBuf>,

    /// The gpg home directory.
    ///
    /// Defaults to gpg default home directory (`$GNUPGHOME` or
    /// `~/.gnupg`).
    pub home_dir: Option<PathBuf>,

    /// The key servers used to fetch missing public keys, in order.
    ///
    /// Defaults to [`DEFAULT_KEY_SERVERS`].
    pub key_servers: Option<Vec<String>>,

    /// The key used to sign when no signer is given.
    ///
    /// Can be a key ID, a fingerprint or an email address. Defaults
    /// to the first usable secret key.
    pub default_key: Option<String>,

    /// The maximum amount of seconds a gpg invocation can take,
    /// passphrase prompts included.
    ///
    /// Defaults to 120 seconds.
    pub timeout: Option<u64>,

    /// Encrypt for recipients regardless of their web of trust
    /// validity. Expired and revoked keys are still rejected by gpg.
    ///
    /// Defaults to `true`.
    pub always_trust: Option<bool>,
}

impl GpgConfig {
    pub fn default_program() -> PathBuf {
        PathBuf::from("gpg")
    }

    pub fn default_key_servers() -> Vec<String> {
        DEFAULT_KEY_SERVERS.iter().map(ToString::to_string).collect()
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(120)
    }

    pub fn get_program(&self) -> PathBuf {
        self.program.clone().unwrap_or_else(Self::default_program)
    }

    pub fn get_key_servers(&self) -> Vec<String> {
        self.key_servers
            .clone()
            .unwrap_or_else(Self::default_key_servers)
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or_else(Self::default_timeout)
    }

    pub fn is_always_trust(&self) -> bool {
        self.always_trust.unwrap_or(true)
    }
}
