//! Wire encoding of payment records for HTTP headers.
//!
//! Both record kinds travel the same way: canonical JSON, then standard
//! base64, yielding an ASCII value safe for a header. Decoding is the exact
//! inverse and is total over arbitrary input: malformed transport encoding,
//! bad UTF-8, and missing fields all collapse into [`InvalidHeader`]. Unknown
//! JSON fields are ignored, so either side can add fields without breaking
//! the other.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{PaymentRequirements, SignedPayment};

/// Header carrying encoded [`PaymentRequirements`] on a 402 response.
pub const X_PAYMENT_REQUIREMENTS_HEADER: &str = "X-Payment-Requirements";

/// Header carrying an encoded [`SignedPayment`] on the retried request.
pub const X_PAYMENT_HEADER: &str = "X-Payment";

/// A header value that could not be decoded. Carries what went wrong; the
/// sender is treated as non-compliant rather than retried.
#[derive(Debug, thiserror::Error)]
#[error("Invalid x402 header: {0}")]
pub struct InvalidHeader(pub String);

/// A record that could not be serialized to a header value.
#[derive(Debug, thiserror::Error)]
#[error("Failed to encode x402 header")]
pub struct HeaderEncodeError(#[source] pub serde_json::Error);

fn encode<T: Serialize>(value: &T) -> Result<String, HeaderEncodeError> {
    let json = serde_json::to_vec(value).map_err(HeaderEncodeError)?;
    Ok(b64.encode(json))
}

fn decode<T: DeserializeOwned>(header: &str) -> Result<T, InvalidHeader> {
    let bytes = b64
        .decode(header)
        .map_err(|e| InvalidHeader(format!("base64 decode failed: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| InvalidHeader(format!("JSON parse failed: {e}")))
}

/// Encodes payment requirements into an `X-Payment-Requirements` value.
///
/// # Example
///
/// ```
/// use alloy_primitives::{Address, U256};
/// use x402_pay::network::Network;
/// use x402_pay::proto::encode_requirements_header;
/// use x402_pay::types::PaymentRequirements;
///
/// let requirements = PaymentRequirements::new(
///     U256::from(1_000_000u64),
///     Address::ZERO,
///     Network::Base,
///     "/api/data",
/// );
/// let header = encode_requirements_header(&requirements).unwrap();
/// assert!(header.is_ascii());
/// ```
pub fn encode_requirements_header(
    requirements: &PaymentRequirements,
) -> Result<String, HeaderEncodeError> {
    encode(requirements)
}

/// Decodes an `X-Payment-Requirements` value.
pub fn decode_requirements_header(header: &str) -> Result<PaymentRequirements, InvalidHeader> {
    decode(header)
}

/// Encodes a signed payment into an `X-Payment` value.
pub fn encode_payment_header(payment: &SignedPayment) -> Result<String, HeaderEncodeError> {
    encode(payment)
}

/// Decodes an `X-Payment` value.
pub fn decode_payment_header(header: &str) -> Result<SignedPayment, InvalidHeader> {
    decode(header)
}
