//! Payment record types and the canonical message hash.
//!
//! The key objects are [`PaymentRequirements`] (server-issued, what a resource
//! demands), [`PaymentPayload`] (client-built, one payment attempt), and
//! [`SignedPayment`] (payload plus its 65-byte ECDSA signature). The
//! [`PaymentPayload::message_hash`] digest is the pre-image shared by signing
//! and signature recovery, so its encoding is fixed byte-for-byte.

use alloy_primitives::{Address, B256, U256, keccak256};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display};
use std::ops::Add;
use std::time::SystemTime;

use crate::network::Network;

/// Default validity window applied when requirements carry no explicit expiry:
/// a fresh payment is good for five minutes.
pub const DEFAULT_PAYMENT_TTL_SECS: u64 = 300;

/// A Unix timestamp in seconds since the epoch.
///
/// Used for payment expiry. Serialized as a plain JSON integer.
///
/// # Example
///
/// ```
/// use x402_pay::types::UnixTimestamp;
///
/// let ts = UnixTimestamp::from_secs(1700000000);
/// assert_eq!(ts.as_secs(), 1700000000);
/// assert_eq!((ts + 300).as_secs(), 1700000300);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the Unix epoch.
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0 + rhs)
    }
}

/// A 65-byte ECDSA signature (32-byte `r`, 32-byte `s`, 1-byte recovery id).
///
/// Serialized as a 0x-prefixed hex string of exactly 130 characters.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PaymentSignature(pub [u8; 65]);

impl From<[u8; 65]> for PaymentSignature {
    fn from(bytes: [u8; 65]) -> Self {
        PaymentSignature(bytes)
    }
}

impl Debug for PaymentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentSignature(0x{})", hex::encode(self.0))
    }
}

impl Serialize for PaymentSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for PaymentSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        static SIG_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^0x[0-9a-fA-F]{130}$").expect("Invalid regex for payment signature")
        });

        if !SIG_REGEX.is_match(&s) {
            return Err(serde::de::Error::custom(
                "Invalid signature format: must be 0x-prefixed and 130 hex chars",
            ));
        }

        let bytes = hex::decode(&s[2..])
            .map_err(|_| serde::de::Error::custom("Failed to decode signature hex string"))?;
        let array: [u8; 65] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Signature must be exactly 65 bytes"))?;

        Ok(PaymentSignature(array))
    }
}

/// Payment requirements a server attaches to a `402 Payment Required`
/// response. Constructed per request, transmitted once, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Amount in the smallest currency unit (e.g. wei).
    pub amount: U256,
    /// Recipient address.
    pub recipient: Address,
    /// Network the payment must settle on.
    pub network: Network,
    /// Token contract address. `None` means the native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Address>,
    /// Human-readable description of what is being paid for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expiry of these requirements. When absent, the payer applies the
    /// [`DEFAULT_PAYMENT_TTL_SECS`] window from its own clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<UnixTimestamp>,
    /// Identifier of the resource the payment unlocks.
    pub resource: String,
}

impl PaymentRequirements {
    /// Requirements with no token, description, or explicit expiry.
    pub fn new(
        amount: U256,
        recipient: Address,
        network: Network,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            recipient,
            network,
            token: None,
            description: None,
            expires_at: None,
            resource: resource.into(),
        }
    }

    /// Demand payment in the given token instead of the native asset.
    pub fn with_token(mut self, token: Address) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Pin an explicit expiry instead of the payer-side default window.
    pub fn with_expires_at(mut self, expires_at: UnixTimestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// One payment attempt, built by the client from requirements plus its own
/// signer address and nonce. Immutable once built; consumed exactly once by
/// signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Amount in the smallest currency unit.
    pub amount: U256,
    /// Recipient address, copied from the requirements.
    pub recipient: Address,
    /// Address the client claims to pay from. Advisory: verification trusts
    /// the address recovered from the signature, not this field.
    pub payer: Address,
    /// Chain ID resolved from the requirements' network.
    pub chain_id: u64,
    /// Token contract address. `None` means the native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Address>,
    /// Identifier of the resource being paid for.
    pub resource: String,
    /// Per-client-instance counter. Strictly increasing within one client;
    /// not a cross-session replay guarantee.
    pub nonce: u64,
    /// When this payment attempt stops being acceptable.
    pub expires_at: UnixTimestamp,
}

/// Domain separation prefix for [`PaymentPayload::message_hash`].
const MESSAGE_DOMAIN: &[u8] = b"x402-payment-v1";

impl PaymentPayload {
    /// The 32-byte digest signing and recovery operate on.
    ///
    /// Fields are serialized into one buffer in fixed order (amount,
    /// recipient, payer, chain id, resource, nonce, expiry) using fixed-width
    /// big-endian encoding, with the variable-length resource length-prefixed,
    /// behind a domain separation prefix. The buffer is then keccak256-hashed.
    /// Identical payloads always produce identical digests; the explicit
    /// encoding keeps the signing and verifying sides byte-identical.
    ///
    /// The token field is not part of the digest.
    pub fn message_hash(&self) -> B256 {
        let resource = self.resource.as_bytes();
        let mut buf =
            Vec::with_capacity(MESSAGE_DOMAIN.len() + 32 + 20 + 20 + 8 + 8 + resource.len() + 8 + 8);
        buf.extend_from_slice(MESSAGE_DOMAIN);
        buf.extend_from_slice(&self.amount.to_be_bytes::<32>());
        buf.extend_from_slice(self.recipient.as_slice());
        buf.extend_from_slice(self.payer.as_slice());
        buf.extend_from_slice(&self.chain_id.to_be_bytes());
        buf.extend_from_slice(&(resource.len() as u64).to_be_bytes());
        buf.extend_from_slice(resource);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.expires_at.as_secs().to_be_bytes());
        keccak256(&buf)
    }
}

/// A [`PaymentPayload`] plus its signature, as transmitted in the `X-Payment`
/// header. Consumed exactly once by verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayment {
    pub payment: PaymentPayload,
    pub signature: PaymentSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample_payload() -> PaymentPayload {
        PaymentPayload {
            amount: U256::from(1_000_000u64),
            recipient: address!("0x1111111111111111111111111111111111111111"),
            payer: address!("0x2222222222222222222222222222222222222222"),
            chain_id: 8453,
            token: None,
            resource: "https://api.example.com/data".to_string(),
            nonce: 1,
            expires_at: UnixTimestamp::from_secs(1_700_000_000),
        }
    }

    #[test]
    fn test_message_hash_deterministic() {
        let payload = sample_payload();
        assert_eq!(payload.message_hash(), sample_payload().message_hash());
    }

    #[test]
    fn test_message_hash_changes_per_field() {
        let base = sample_payload().message_hash();

        let mut payload = sample_payload();
        payload.amount = U256::from(1_000_001u64);
        assert_ne!(payload.message_hash(), base);

        let mut payload = sample_payload();
        payload.recipient = address!("0x3333333333333333333333333333333333333333");
        assert_ne!(payload.message_hash(), base);

        let mut payload = sample_payload();
        payload.payer = address!("0x4444444444444444444444444444444444444444");
        assert_ne!(payload.message_hash(), base);

        let mut payload = sample_payload();
        payload.chain_id = 1;
        assert_ne!(payload.message_hash(), base);

        let mut payload = sample_payload();
        payload.resource = "https://api.example.com/other".to_string();
        assert_ne!(payload.message_hash(), base);

        let mut payload = sample_payload();
        payload.nonce = 2;
        assert_ne!(payload.message_hash(), base);

        let mut payload = sample_payload();
        payload.expires_at = UnixTimestamp::from_secs(1_700_000_001);
        assert_ne!(payload.message_hash(), base);
    }

    #[test]
    fn test_resource_boundary_is_unambiguous() {
        // Shifting bytes between the resource and its neighbors must not collide.
        let mut a = sample_payload();
        a.resource = "ab".to_string();
        let mut b = sample_payload();
        b.resource = "a".to_string();
        assert_ne!(a.message_hash(), b.message_hash());
    }

    #[test]
    fn test_signature_serde_roundtrip() {
        let signature = PaymentSignature([7u8; 65]);
        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json.len(), 2 + 2 + 130);
        let decoded: PaymentSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn test_signature_rejects_malformed() {
        for bad in [
            "\"deadbeef\"",
            "\"0x1234\"",
            "\"0xzz\"",
            &format!("\"0x{}\"", "ab".repeat(64)),
        ] {
            assert!(serde_json::from_str::<PaymentSignature>(bad).is_err());
        }
    }
}
