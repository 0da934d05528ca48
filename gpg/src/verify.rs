//! Module dedicated to gpg verification.
//!
//! This module exposes [`Gpg::verify_detached_signature`] and its
//! [`VerifyResult`].

use std::io::Write;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    key::Trust,
    parse::{parse_verify_output, SignatureStatus},
    Error, Gpg, Result,
};

/// The outcome of a signature check.
///
/// A bad signature is a result (`valid` is `false`), not an error.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VerifyResult {
    pub valid: bool,
    pub signer_key_id: Option<String>,
    pub signer_uid: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub trust: Trust,
    pub fingerprint: Option<String>,
}

impl From<SignatureStatus> for VerifyResult {
    fn from(status: SignatureStatus) -> Self {
        Self {
            valid: status.valid,
            signer_key_id: status.key_id,
            signer_uid: status.uid,
            signed_at: status.signed_at,
            trust: status.trust,
            fingerprint: status.fingerprint,
        }
    }
}

fn write_temp_file(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().map_err(Error::CreateTempFileError)?;
    file.write_all(bytes).map_err(Error::WriteTempFileError)?;
    file.flush().map_err(Error::WriteTempFileError)?;
    Ok(file)
}

impl Gpg {
    /// Verifies the given detached signature against the given data.
    ///
    /// When the signer public key is missing, it is fetched from the
    /// configured key servers and the verification is retried once.
    pub async fn verify_detached_signature(
        &self,
        data: impl AsRef<[u8]>,
        signature: impl AsRef<[u8]>,
    ) -> Result<VerifyResult> {
        let signature = signature.as_ref();

        if signature.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::EmptySignatureError);
        }

        info!("verify detached signature using gpg");

        // both files are removed when dropped, whatever the outcome
        let data_file = write_temp_file(data.as_ref())?;
        let sig_file = write_temp_file(signature)?;

        let mut status = self.run_verify(&sig_file, &data_file).await?;

        if let Some(key_id) = status.missing_key.take() {
            let servers = self.key_servers().len();
            debug!(%key_id, servers, "signer public key missing, fetching it");

            match self.fetch_key_from_any(&key_id, self.key_servers()).await {
                Ok(server) => debug!(%key_id, %server, "signer public key fetched"),
                Err(err @ Error::GpgNotFoundError(_)) => return Err(err),
                Err(err) => {
                    warn!(%key_id, "cannot fetch signer public key");
                    debug!("{err:?}");
                    return Err(Error::VerifyPublicKeyNotFoundError { key_id, servers });
                }
            }

            status = self.run_verify(&sig_file, &data_file).await?;

            if status.missing_key.is_some() {
                return Err(Error::VerifyPublicKeyNotFoundError { key_id, servers });
            }
        }

        Ok(status.into())
    }

    async fn run_verify(
        &self,
        sig_file: &NamedTempFile,
        data_file: &NamedTempFile,
    ) -> Result<SignatureStatus> {
        let args = vec![
            "--verify".into(),
            sig_file.path().to_string_lossy().into_owned(),
            data_file.path().to_string_lossy().into_owned(),
        ];

        let output = self.exec(args, Vec::new()).await?;
        let stderr = output.stderr_lossy();
        let status = parse_verify_output(&stderr);

        if !status.found {
            return Err(Error::VerifyError(stderr.trim().to_owned()));
        }

        debug!(valid = status.valid, code = output.code, "signature checked");
        Ok(status)
    }
}
