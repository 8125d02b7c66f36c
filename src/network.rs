//! Supported settlement networks and their chain IDs.
//!
//! This module defines the closed set of networks a payment can settle on and
//! the bidirectional mapping between a [`Network`] and its numeric chain ID.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Supported settlement networks.
///
/// Each variant maps to exactly one EIP-155 chain ID. The reverse mapping is
/// served from a table built once at startup, so both directions are O(1).
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Ethereum mainnet (chain ID 1).
    #[serde(rename = "ethereum")]
    Ethereum,
    /// Base mainnet (chain ID 8453).
    #[serde(rename = "base")]
    Base,
    /// Base Sepolia testnet (chain ID 84532).
    #[serde(rename = "base-sepolia")]
    BaseSepolia,
    /// Arbitrum One (chain ID 42161).
    #[serde(rename = "arbitrum")]
    Arbitrum,
    /// Optimism mainnet (chain ID 10).
    #[serde(rename = "optimism")]
    Optimism,
    /// Polygon mainnet (chain ID 137).
    #[serde(rename = "polygon")]
    Polygon,
}

static CHAIN_ID_TO_NETWORK: Lazy<HashMap<u64, Network>> = Lazy::new(|| {
    Network::variants()
        .iter()
        .map(|network| (network.chain_id(), *network))
        .collect()
});

impl Network {
    /// Return all known [`Network`] variants.
    pub fn variants() -> &'static [Network] {
        &[
            Network::Ethereum,
            Network::Base,
            Network::BaseSepolia,
            Network::Arbitrum,
            Network::Optimism,
            Network::Polygon,
        ]
    }

    /// Returns the chain ID this network settles on.
    ///
    /// # Example
    ///
    /// ```
    /// use x402_pay::network::Network;
    ///
    /// assert_eq!(Network::Base.chain_id(), 8453);
    /// ```
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Base => 8453,
            Network::BaseSepolia => 84532,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Polygon => 137,
        }
    }

    /// Looks up the network for a chain ID. Returns `None` for chain IDs no
    /// variant settles on.
    ///
    /// # Example
    ///
    /// ```
    /// use x402_pay::network::Network;
    ///
    /// assert_eq!(Network::from_chain_id(8453), Some(Network::Base));
    /// assert_eq!(Network::from_chain_id(999_999), None);
    /// ```
    pub fn from_chain_id(chain_id: u64) -> Option<Network> {
        CHAIN_ID_TO_NETWORK.get(&chain_id).copied()
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Ethereum => write!(f, "ethereum"),
            Network::Base => write!(f, "base"),
            Network::BaseSepolia => write!(f, "base-sepolia"),
            Network::Arbitrum => write!(f, "arbitrum"),
            Network::Optimism => write!(f, "optimism"),
            Network::Polygon => write!(f, "polygon"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown network: {0}")]
pub struct UnknownNetworkError(String);

impl FromStr for Network {
    type Err = UnknownNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethereum" => Ok(Network::Ethereum),
            "base" => Ok(Network::Base),
            "base-sepolia" => Ok(Network::BaseSepolia),
            "arbitrum" => Ok(Network::Arbitrum),
            "optimism" => Ok(Network::Optimism),
            "polygon" => Ok(Network::Polygon),
            other => Err(UnknownNetworkError(other.to_string())),
        }
    }
}
