//! The signing capability boundary.
//!
//! Payment construction needs exactly two operations from a key holder:
//! produce a 65-byte signature over a payload's message hash, and report the
//! address that key controls. [`PaymentSigner`] captures that boundary and
//! nothing else; key material never crosses it.
//!
//! A local [`PrivateKeySigner`] and a remote HSM backend (see [`kms`])
//! implement the same trait and are interchangeable. Which one a deployment
//! uses is a configuration decision, made in [`crate::config`]. Any other
//! [`alloy_signer::Signer`] can be bridged with [`sign_with`].

use alloy_primitives::Address;
use alloy_signer::Signer;
use async_trait::async_trait;

pub use alloy_signer_local::PrivateKeySigner;

use crate::types::{PaymentPayload, PaymentSignature};

/// Signs payment payloads without exposing key material.
///
/// Implementations sign the payload's [`message_hash`](PaymentPayload::message_hash)
/// and return the signature in r‖s‖v form, with `s` in the low half of the
/// curve order per the standard malleability convention.
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    /// Signs one payment attempt. May suspend, e.g. for a network round trip
    /// to a remote key manager.
    async fn sign_payment(
        &self,
        payload: &PaymentPayload,
    ) -> Result<PaymentSignature, alloy_signer::Error>;

    /// The address the signing key controls, in checksummed form via its
    /// `Display` impl.
    fn address(&self) -> Address;
}

// Lets tests use `Result`/`unwrap_err` helpers on `Arc<dyn PaymentSigner>`,
// whose `Ok` type must be `Debug`. Not part of the public surface.
#[cfg(test)]
impl std::fmt::Debug for dyn PaymentSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSigner")
            .field("address", &self.address())
            .finish()
    }
}

/// Signs a payload's message hash with any alloy signer, normalizing `s`.
///
/// Backends wrapping an [`alloy_signer::Signer`] delegate their
/// [`PaymentSigner::sign_payment`] here.
pub async fn sign_with<S: Signer + Send + Sync>(
    signer: &S,
    payload: &PaymentPayload,
) -> Result<PaymentSignature, alloy_signer::Error> {
    let signature = signer.sign_hash(&payload.message_hash()).await?.normalized_s();
    Ok(PaymentSignature(signature.as_bytes()))
}

/// In-memory key, for development and testing.
#[async_trait]
impl PaymentSigner for PrivateKeySigner {
    async fn sign_payment(
        &self,
        payload: &PaymentPayload,
    ) -> Result<PaymentSignature, alloy_signer::Error> {
        sign_with(self, payload).await
    }

    fn address(&self) -> Address {
        Signer::address(self)
    }
}

/// AWS KMS remote signing backend.
///
/// The key never leaves the HSM; only sign requests and the public key cross
/// the wire. The returned signer satisfies [`PaymentSigner`] like any local
/// one.
#[cfg(feature = "aws-kms")]
pub mod kms {
    use super::*;

    pub use alloy_signer_aws::{AwsSigner, AwsSignerError};

    /// Connects to KMS using ambient AWS credentials and region.
    pub async fn kms_signer(key_id: impl Into<String>) -> Result<AwsSigner, AwsSignerError> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = aws_sdk_kms::Client::new(&config);
        AwsSigner::new(client, key_id.into(), None).await
    }

    #[async_trait]
    impl PaymentSigner for AwsSigner {
        async fn sign_payment(
            &self,
            payload: &PaymentPayload,
        ) -> Result<PaymentSignature, alloy_signer::Error> {
            sign_with(self, payload).await
        }

        fn address(&self) -> Address {
            Signer::address(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::types::UnixTimestamp;
    use alloy_primitives::{Signature, U256, address};

    fn sample_payload(payer: Address) -> PaymentPayload {
        PaymentPayload {
            amount: U256::from(1_000_000u64),
            recipient: address!("0x1111111111111111111111111111111111111111"),
            payer,
            chain_id: Network::Base.chain_id(),
            token: None,
            resource: "/api/test".to_string(),
            nonce: 1,
            expires_at: UnixTimestamp::from_secs(1_700_000_000),
        }
    }

    #[tokio::test]
    async fn test_local_signature_recovers_to_signer() {
        let signer = PrivateKeySigner::random();
        let payload = sample_payload(signer.address());

        let signature = signer.sign_payment(&payload).await.unwrap();

        let parsed = Signature::from_raw_array(&signature.0).unwrap();
        let recovered = parsed
            .recover_address_from_prehash(&payload.message_hash())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[tokio::test]
    async fn test_different_payloads_sign_differently() {
        let signer = PrivateKeySigner::random();
        let payload = sample_payload(signer.address());
        let mut other = payload.clone();
        other.nonce += 1;

        let a = signer.sign_payment(&payload).await.unwrap();
        let b = signer.sign_payment(&other).await.unwrap();
        assert_ne!(a.0, b.0);
    }
}
