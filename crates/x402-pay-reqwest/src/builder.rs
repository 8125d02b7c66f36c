use reqwest::Client;
use reqwest_middleware as rqm;

use crate::middleware::X402Payments;

/// Attaches payment handling to a reqwest [`Client`].
///
/// ```rust,no_run
/// use alloy_signer_local::PrivateKeySigner;
/// use x402_pay_reqwest::{ReqwestWithPayments, X402Payments};
///
/// let signer = PrivateKeySigner::random();
/// let client = reqwest::Client::new()
///     .with_payments(X402Payments::with_signer(signer))
///     .build();
/// ```
pub trait ReqwestWithPayments {
    /// Wraps this client in a middleware stack with payment handling
    /// attached. Call `.build()` on the result, or `.with(...)` to add
    /// further middleware first.
    fn with_payments(self, payments: X402Payments) -> rqm::ClientBuilder;
}

impl ReqwestWithPayments for Client {
    fn with_payments(self, payments: X402Payments) -> rqm::ClientBuilder {
        rqm::ClientBuilder::new(self).with(payments)
    }
}
