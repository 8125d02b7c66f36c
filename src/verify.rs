//! Ordered verification of a payment header against requirements.
//!
//! Checks run cheapest-first and short-circuit: transport decoding, expiry,
//! amount, recipient, chain id, and only then the cryptographic signature
//! recovery. Most invalid traffic is rejected before the recovery cost is
//! paid. On success the *recovered* address is returned; the payload's
//! `payer` field is advisory and never trusted.

use alloy_primitives::{Address, Signature, U256};
use tracing::instrument;

use crate::proto::{InvalidHeader, decode_payment_header};
use crate::types::{PaymentRequirements, SignedPayment, UnixTimestamp};

/// Why a payment was rejected.
///
/// Every variant carries the offending values. `InvalidSignature` covers the
/// security-relevant mismatches (recipient, chain, payer, unrecoverable
/// signature) and is never worth retrying; `PaymentExpired` means the caller
/// should fetch fresh requirements; `InsufficientAmount` means the caller may
/// retry with a larger amount.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The header could not be decoded; the sender is non-compliant.
    #[error("Invalid payment header: {0}")]
    InvalidHeader(String),
    /// The payload's expiry is in the past.
    #[error("Payment expired at {expires_at}, current time {now}")]
    PaymentExpired {
        expires_at: UnixTimestamp,
        now: UnixTimestamp,
    },
    /// The payload offers less than the requirements demand.
    #[error("Insufficient amount: required {required}, got {provided}")]
    InsufficientAmount { required: U256, provided: U256 },
    /// Recipient/chain/payer mismatch or unrecoverable signature bytes.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Verifies a payment header against requirements using the current wall
/// clock. See [`verify_payment_at`].
pub fn verify_payment(
    payment_header: &str,
    requirements: &PaymentRequirements,
) -> Result<Address, VerificationError> {
    verify_payment_at(payment_header, requirements, UnixTimestamp::now())
}

/// Verifies a payment header against requirements at an explicit point in
/// time, returning the recovered payer address.
#[instrument(name = "x402.verify", skip_all, err)]
pub fn verify_payment_at(
    payment_header: &str,
    requirements: &PaymentRequirements,
    now: UnixTimestamp,
) -> Result<Address, VerificationError> {
    let signed = decode_payment_header(payment_header)
        .map_err(|InvalidHeader(msg)| VerificationError::InvalidHeader(msg))?;
    let payment = &signed.payment;

    if payment.expires_at < now {
        return Err(VerificationError::PaymentExpired {
            expires_at: payment.expires_at,
            now,
        });
    }

    if payment.amount < requirements.amount {
        return Err(VerificationError::InsufficientAmount {
            required: requirements.amount,
            provided: payment.amount,
        });
    }

    if payment.recipient != requirements.recipient {
        return Err(VerificationError::InvalidSignature(format!(
            "recipient mismatch: expected {}, got {}",
            requirements.recipient, payment.recipient
        )));
    }

    let expected_chain_id = requirements.network.chain_id();
    if payment.chain_id != expected_chain_id {
        return Err(VerificationError::InvalidSignature(format!(
            "chain mismatch: expected {}, got {}",
            expected_chain_id, payment.chain_id
        )));
    }

    let recovered = recover_payer(&signed)?;
    if recovered != payment.payer {
        return Err(VerificationError::InvalidSignature(format!(
            "payer mismatch: recovered {}, declared {}",
            recovered, payment.payer
        )));
    }

    #[cfg(feature = "telemetry")]
    tracing::debug!(payer = %recovered, resource = %payment.resource, "Payment verified");

    Ok(recovered)
}

/// Recovers the signing address from a signed payment.
///
/// Accepts recovery ids in both raw (0/1) and legacy (27/28) form.
pub fn recover_payer(signed: &SignedPayment) -> Result<Address, VerificationError> {
    let signature = Signature::from_raw_array(&signed.signature.0)
        .map_err(|e| VerificationError::InvalidSignature(format!("recovery failed: {e}")))?;
    signature
        .recover_address_from_prehash(&signed.payment.message_hash())
        .map_err(|e| VerificationError::InvalidSignature(format!("recovery failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::proto::encode_payment_header;
    use crate::signer::{PaymentSigner, PrivateKeySigner};
    use crate::types::{PaymentPayload, PaymentSignature, SignedPayment};
    use alloy_primitives::address;

    const NOW: UnixTimestamp = UnixTimestamp::from_secs(1_700_000_000);

    fn requirements() -> PaymentRequirements {
        PaymentRequirements::new(
            U256::from(1_000_000u64),
            address!("0x1111111111111111111111111111111111111111"),
            Network::Base,
            "/api/test",
        )
    }

    fn payload_for(payer: Address) -> PaymentPayload {
        PaymentPayload {
            amount: U256::from(1_000_000u64),
            recipient: address!("0x1111111111111111111111111111111111111111"),
            payer,
            chain_id: 8453,
            token: None,
            resource: "/api/test".to_string(),
            nonce: 1,
            expires_at: NOW + 3600,
        }
    }

    async fn sign_and_encode(signer: &PrivateKeySigner, payload: PaymentPayload) -> String {
        let signature = signer.sign_payment(&payload).await.unwrap();
        let signed = SignedPayment {
            payment: payload,
            signature,
        };
        encode_payment_header(&signed).unwrap()
    }

    #[tokio::test]
    async fn test_valid_payment_returns_recovered_address() {
        let signer = PrivateKeySigner::random();
        let header = sign_and_encode(&signer, payload_for(signer.address())).await;

        let payer = verify_payment_at(&header, &requirements(), NOW).unwrap();
        assert_eq!(payer, signer.address());
    }

    #[tokio::test]
    async fn test_overpayment_verifies() {
        let signer = PrivateKeySigner::random();
        let mut payload = payload_for(signer.address());
        payload.amount = U256::from(2_000_000u64);
        let header = sign_and_encode(&signer, payload).await;

        assert!(verify_payment_at(&header, &requirements(), NOW).is_ok());
    }

    #[tokio::test]
    async fn test_expired_payment_rejected() {
        let signer = PrivateKeySigner::random();
        let mut payload = payload_for(signer.address());
        payload.expires_at = UnixTimestamp::from_secs(1000);
        let header = sign_and_encode(&signer, payload).await;

        let err = verify_payment_at(&header, &requirements(), NOW).unwrap_err();
        assert!(matches!(err, VerificationError::PaymentExpired { .. }));
    }

    #[tokio::test]
    async fn test_insufficient_amount_rejected() {
        let signer = PrivateKeySigner::random();
        let mut payload = payload_for(signer.address());
        payload.amount = U256::from(100u64);
        let header = sign_and_encode(&signer, payload).await;

        let err = verify_payment_at(&header, &requirements(), NOW).unwrap_err();
        assert!(matches!(
            err,
            VerificationError::InsufficientAmount { required, provided }
                if required == U256::from(1_000_000u64) && provided == U256::from(100u64)
        ));
    }

    #[tokio::test]
    async fn test_wrong_recipient_rejected() {
        let signer = PrivateKeySigner::random();
        let mut payload = payload_for(signer.address());
        payload.recipient = address!("0x2222222222222222222222222222222222222222");
        let header = sign_and_encode(&signer, payload).await;

        let err = verify_payment_at(&header, &requirements(), NOW).unwrap_err();
        assert!(matches!(&err, VerificationError::InvalidSignature(msg) if msg.contains("recipient")));
    }

    #[tokio::test]
    async fn test_wrong_chain_id_rejected() {
        let signer = PrivateKeySigner::random();
        let mut payload = payload_for(signer.address());
        payload.chain_id = 1;
        let header = sign_and_encode(&signer, payload).await;

        let err = verify_payment_at(&header, &requirements(), NOW).unwrap_err();
        assert!(matches!(&err, VerificationError::InvalidSignature(msg) if msg.contains("chain")));
    }

    #[tokio::test]
    async fn test_payer_mismatch_rejected() {
        // Recipient, chain, amount and expiry all pass; only the key behind
        // the signature differs from the declared payer.
        let declared = PrivateKeySigner::random();
        let actual = PrivateKeySigner::random();
        let header = sign_and_encode(&actual, payload_for(declared.address())).await;

        let err = verify_payment_at(&header, &requirements(), NOW).unwrap_err();
        assert!(matches!(&err, VerificationError::InvalidSignature(msg) if msg.contains("payer")));
    }

    #[tokio::test]
    async fn test_unrecoverable_signature_rejected() {
        let signer = PrivateKeySigner::random();
        let signed = SignedPayment {
            payment: payload_for(signer.address()),
            signature: PaymentSignature([0u8; 65]),
        };
        let header = encode_payment_header(&signed).unwrap();

        let err = verify_payment_at(&header, &requirements(), NOW).unwrap_err();
        assert!(matches!(&err, VerificationError::InvalidSignature(msg) if msg.contains("recovery")));
    }

    #[test]
    fn test_undecodable_header_rejected() {
        for bad in ["", "!!!", "bm90IGpzb24="] {
            let err = verify_payment_at(bad, &requirements(), NOW).unwrap_err();
            assert!(matches!(err, VerificationError::InvalidHeader(_)));
        }
    }
}
