#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Reqwest middleware for transparent pay-per-request
//! [HTTP 402](https://www.x402.org) payments.
//!
//! When a request comes back `402 Payment Required` with an
//! `X-Payment-Requirements` header, the middleware signs a payment satisfying
//! those requirements and retries the identical request once with an
//! `X-Payment` header attached. Anything else (a non-402 response, missing or
//! undecodable requirements, an amount above the configured ceiling) passes
//! through to the caller untouched.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use alloy_primitives::U256;
//! use alloy_signer_local::PrivateKeySigner;
//! use x402_pay_reqwest::{ReqwestWithPayments, X402Payments};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let signer: PrivateKeySigner = std::env::var("X402_PRIVATE_KEY")?.parse()?;
//! let client = reqwest::Client::new()
//!     .with_payments(
//!         X402Payments::with_signer(signer)
//!             // Never pay more than 1 USDC (6 decimals) per request.
//!             .with_max_amount(U256::from(1_000_000u64)),
//!     )
//!     .build();
//!
//! // Payments are handled automatically.
//! let response = client
//!     .get("https://api.example.com/premium")
//!     .send()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Any [`x402_pay::signer::PaymentSigner`] works as the signing backend; see
//! `x402_pay::config::SignerConfig` for selecting one from the environment.

mod builder;
mod middleware;

pub use builder::*;
pub use middleware::*;
