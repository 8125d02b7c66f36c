#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core Rust implementation of pay-per-request authorization over
//! [HTTP 402](https://www.x402.org).
//!
//! A resource server declares what a request costs by answering `402 Payment
//! Required` with an `X-Payment-Requirements` header. A client signs a payment
//! record satisfying those requirements and retries the request with an
//! `X-Payment` header. The server verifies the signed record before granting
//! access. This crate provides everything except the HTTP transport itself:
//!
//! - [`network`] - Supported settlement networks and their chain IDs.
//! - [`types`] - Payment requirements, payloads, signed payments, and the
//!   canonical message hash that signing and verification share.
//! - [`proto`] - Header names and the base64/JSON codec for both record kinds.
//! - [`signer`] - The signing capability boundary. Local keys and remote HSMs
//!   implement the same two-operation interface.
//! - [`verify`] - Ordered verification of a payment header against
//!   requirements, ending in signature recovery.
//! - [`config`] - Signer selection from configuration or environment.
//!
//! Client-side retry handling (turning a 402 into a paid retry) lives in the
//! companion `x402-pay-reqwest` crate, which wraps this core as a `reqwest`
//! middleware.
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables detailed tracing output for debugging and monitoring
//! - `keystore` - Enables loading local signers from encrypted keystore files
//! - `aws-kms` - Enables the AWS KMS remote signing backend

pub mod config;
pub mod network;
pub mod proto;
pub mod signer;
pub mod types;
pub mod verify;
