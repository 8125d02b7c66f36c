//! Middleware for handling HTTP 402 Payment Required responses.
//!
//! This module provides [`X402Payments`], a `reqwest_middleware::Middleware`
//! that drives one logical request through an optional 402 → pay → retry
//! cycle: it issues the original request unchanged, and when the answer is a
//! 402 carrying decodable payment requirements under the configured ceiling,
//! it signs a payment and reissues the identical request once with an
//! `X-Payment` header attached.

use http::{Extensions, HeaderValue, StatusCode};
use reqwest::{Request, Response};
use reqwest_middleware as rqm;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

use alloy_primitives::U256;
use x402_pay::proto::{
    HeaderEncodeError, X_PAYMENT_HEADER, X_PAYMENT_REQUIREMENTS_HEADER,
    decode_requirements_header, encode_payment_header,
};
use x402_pay::signer::PaymentSigner;
use x402_pay::types::{
    DEFAULT_PAYMENT_TTL_SECS, PaymentPayload, PaymentRequirements, SignedPayment, UnixTimestamp,
};

/// Errors that can occur while constructing or applying a payment.
///
/// These are fatal to the request. Reject outcomes (undecodable
/// requirements, or an amount above the ceiling) are not errors: the
/// original 402 response is handed back verbatim instead.
#[derive(Debug, thiserror::Error)]
pub enum X402PaymentsError {
    /// The original request could not be cloned for the paid retry.
    /// Typically the request body is a stream.
    #[error("Request object is not cloneable. Are you passing a streaming body?")]
    RequestNotCloneable,
    /// The signer capability failed to sign the payment payload.
    #[error("Failed to sign payment payload")]
    Signing(#[source] alloy_signer::Error),
    /// The signed payment could not be serialized.
    #[error("Failed to encode payment header")]
    Encode(#[source] HeaderEncodeError),
    /// The encoded payment did not fit into an HTTP header value.
    #[error("Failed to place payment header into the request")]
    HeaderValue(#[source] http::header::InvalidHeaderValue),
}

impl From<X402PaymentsError> for rqm::Error {
    fn from(error: X402PaymentsError) -> Self {
        rqm::Error::Middleware(error.into())
    }
}

/// Middleware that answers 402 responses with a signed payment and a single
/// retry.
///
/// Each instance owns a monotonic nonce counter; clones share it, so every
/// payment built through one client carries a distinct nonce no matter how
/// many requests run concurrently.
#[derive(Clone)]
pub struct X402Payments {
    signer: Arc<dyn PaymentSigner>,
    max_amount: Option<U256>,
    auto_pay: bool,
    nonce: Arc<AtomicU64>,
}

impl X402Payments {
    /// Creates the middleware around a signing capability.
    ///
    /// The nonce counter is seeded from the clock (epoch milliseconds) so
    /// successive client instances for the same key start above earlier ones.
    pub fn with_signer<S: PaymentSigner + 'static>(signer: S) -> Self {
        Self::with_shared_signer(Arc::new(signer))
    }

    /// Like [`X402Payments::with_signer`] for an already-shared signer.
    pub fn with_shared_signer(signer: Arc<dyn PaymentSigner>) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self {
            signer,
            max_amount: None,
            auto_pay: true,
            nonce: Arc::new(AtomicU64::new(seed)),
        }
    }

    /// Refuse to pay requirements above this amount. Above-ceiling 402
    /// responses are returned to the caller untouched.
    pub fn with_max_amount<A: Into<U256>>(mut self, max_amount: A) -> Self {
        self.max_amount = Some(max_amount.into());
        self
    }

    /// Toggle automatic payment. When disabled every response passes through
    /// unchanged; the signer is never invoked.
    pub fn with_auto_pay(mut self, auto_pay: bool) -> Self {
        self.auto_pay = auto_pay;
        self
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn build_payment_payload(&self, requirements: &PaymentRequirements) -> PaymentPayload {
        let expires_at = requirements
            .expires_at
            .unwrap_or_else(|| UnixTimestamp::now() + DEFAULT_PAYMENT_TTL_SECS);
        PaymentPayload {
            amount: requirements.amount,
            recipient: requirements.recipient,
            payer: self.signer.address(),
            chain_id: requirements.network.chain_id(),
            token: requirements.token,
            resource: requirements.resource.clone(),
            nonce: self.next_nonce(),
            expires_at,
        }
    }

    /// Builds the `X-Payment` header for the given requirements: payload
    /// construction, signing, and encoding.
    #[instrument(name = "x402.build_payment_header", skip_all, fields(
        network = %requirements.network,
        amount = %requirements.amount,
        resource = %requirements.resource,
    ))]
    pub async fn build_payment_header(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<HeaderValue, X402PaymentsError> {
        let payload = self.build_payment_payload(requirements);
        let signature = self
            .signer
            .sign_payment(&payload)
            .await
            .map_err(X402PaymentsError::Signing)?;
        #[cfg(feature = "telemetry")]
        tracing::debug!(nonce = payload.nonce, "Payment payload signed");
        let signed = SignedPayment {
            payment: payload,
            signature,
        };
        let encoded = encode_payment_header(&signed).map_err(X402PaymentsError::Encode)?;
        HeaderValue::from_str(&encoded).map_err(X402PaymentsError::HeaderValue)
    }
}

#[async_trait::async_trait]
impl rqm::Middleware for X402Payments {
    /// Intercepts the response. On a payable 402, constructs a payment and
    /// retries the identical request once.
    #[instrument(name = "x402.handle", skip(self, req, extensions, next), fields(method = %req.method(), url = %req.url()))]
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let retry_req = req.try_clone(); // For retrying with payment later

        let res = next.clone().run(req, extensions).await?;

        if res.status() != StatusCode::PAYMENT_REQUIRED || !self.auto_pay {
            return Ok(res);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!("Received 402 Payment Required");

        let requirements_header = res
            .headers()
            .get(X_PAYMENT_REQUIREMENTS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        // A 402 without decodable requirements is a terminal, non-error
        // outcome: the endpoint's answer goes back to the caller verbatim.
        let Some(requirements_header) = requirements_header else {
            return Ok(res);
        };
        let Ok(requirements) = decode_requirements_header(&requirements_header) else {
            return Ok(res);
        };

        if let Some(max_amount) = self.max_amount {
            if requirements.amount > max_amount {
                #[cfg(feature = "telemetry")]
                tracing::debug!(
                    amount = %requirements.amount,
                    max = %max_amount,
                    "Required amount exceeds ceiling, not paying"
                );
                return Ok(res);
            }
        }

        let mut retry_req = retry_req.ok_or(X402PaymentsError::RequestNotCloneable)?;
        let payment_header = self
            .build_payment_header(&requirements)
            .await
            .map_err(Into::<rqm::Error>::into)?;
        retry_req.headers_mut().insert(X_PAYMENT_HEADER, payment_header);
        next.run(retry_req, extensions).await
    }
}
