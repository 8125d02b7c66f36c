//! Signer selection from configuration or environment.
//!
//! Which signing backend a process uses is a deployment decision. The
//! [`SignerConfig`] enum names the variants; [`SignerConfig::build`] turns the
//! chosen one into the capability interface. Nothing downstream ever inspects
//! which backend it got.

use std::fmt;
use std::sync::Arc;

use crate::signer::{PaymentSigner, PrivateKeySigner};

/// Environment variable holding a 0x-prefixed private key.
pub const PRIVATE_KEY_ENV: &str = "X402_PRIVATE_KEY";

/// Environment variable holding the path to an encrypted keystore file.
#[cfg(feature = "keystore")]
pub const KEYSTORE_PATH_ENV: &str = "X402_KEYSTORE_PATH";

/// Environment variable holding the keystore password.
#[cfg(feature = "keystore")]
pub const KEYSTORE_PASSWORD_ENV: &str = "X402_KEYSTORE_PASSWORD";

/// Environment variable holding an AWS KMS key id, ARN, or alias.
#[cfg(feature = "aws-kms")]
pub const KMS_KEY_ID_ENV: &str = "X402_KMS_KEY_ID";

/// A configured signing backend, not yet connected.
#[derive(Clone)]
pub enum SignerConfig {
    /// In-memory private key. Development and testing only; the key lives in
    /// process memory.
    PrivateKey { private_key: String },
    /// Encrypted keystore file on disk.
    #[cfg(feature = "keystore")]
    Keystore {
        path: std::path::PathBuf,
        password: String,
    },
    /// Key held in AWS KMS; signing round-trips to the HSM.
    #[cfg(feature = "aws-kms")]
    AwsKms { key_id: String },
}

impl fmt::Debug for SignerConfig {
    // Secrets stay out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerConfig::PrivateKey { .. } => f.write_str("SignerConfig::PrivateKey { .. }"),
            #[cfg(feature = "keystore")]
            SignerConfig::Keystore { path, .. } => f
                .debug_struct("SignerConfig::Keystore")
                .field("path", path)
                .finish_non_exhaustive(),
            #[cfg(feature = "aws-kms")]
            SignerConfig::AwsKms { key_id } => f
                .debug_struct("SignerConfig::AwsKms")
                .field("key_id", key_id)
                .finish(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignerConfigError {
    #[error("No signer configured: set {PRIVATE_KEY_ENV} or another backend's variables")]
    Missing,
    #[error("Invalid private key")]
    InvalidPrivateKey(#[source] alloy_signer_local::LocalSignerError),
    #[cfg(feature = "keystore")]
    #[error("Failed to decrypt keystore {path:?}")]
    Keystore {
        path: std::path::PathBuf,
        #[source]
        source: alloy_signer_local::LocalSignerError,
    },
    #[cfg(feature = "aws-kms")]
    #[error("Failed to initialize AWS KMS signer")]
    AwsKms(#[source] crate::signer::kms::AwsSignerError),
}

impl SignerConfig {
    /// Reads the first configured backend from the environment, checking the
    /// private key, keystore, and KMS variables in that order.
    pub fn from_env() -> Result<Self, SignerConfigError> {
        if let Ok(private_key) = std::env::var(PRIVATE_KEY_ENV) {
            return Ok(SignerConfig::PrivateKey { private_key });
        }
        #[cfg(feature = "keystore")]
        if let (Ok(path), Ok(password)) = (
            std::env::var(KEYSTORE_PATH_ENV),
            std::env::var(KEYSTORE_PASSWORD_ENV),
        ) {
            return Ok(SignerConfig::Keystore {
                path: path.into(),
                password,
            });
        }
        #[cfg(feature = "aws-kms")]
        if let Ok(key_id) = std::env::var(KMS_KEY_ID_ENV) {
            return Ok(SignerConfig::AwsKms { key_id });
        }
        Err(SignerConfigError::Missing)
    }

    /// Builds the configured signer behind the capability interface.
    pub async fn build(self) -> Result<Arc<dyn PaymentSigner>, SignerConfigError> {
        match self {
            SignerConfig::PrivateKey { private_key } => {
                let signer: PrivateKeySigner = private_key
                    .parse()
                    .map_err(SignerConfigError::InvalidPrivateKey)?;
                Ok(Arc::new(signer))
            }
            #[cfg(feature = "keystore")]
            SignerConfig::Keystore { path, password } => {
                let signer = PrivateKeySigner::decrypt_keystore(&path, password)
                    .map_err(|source| SignerConfigError::Keystore { path, source })?;
                Ok(Arc::new(signer))
            }
            #[cfg(feature = "aws-kms")]
            SignerConfig::AwsKms { key_id } => {
                let signer = crate::signer::kms::kms_signer(key_id)
                    .await
                    .map_err(SignerConfigError::AwsKms)?;
                Ok(Arc::new(signer))
            }
        }
    }
}
