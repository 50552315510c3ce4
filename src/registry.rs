//! Wrapped-asset registry - resolves and provisions wrapped tokens
//!
//! The Aetherius bridge contract owns the original<->wrapped mapping; this
//! module reads it and, for assets crossing for the first time, drives the
//! deploy-wrapped-token flow. Mappings are never deleted.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::connector::ChainConnector;
use crate::contracts::{AetheriusBridge, Erc20};
use crate::error::{classify_rpc_error, RelayError};

/// Resolution and provisioning of wrapped-token mappings.
#[async_trait]
pub trait WrappedAssetRegistry: Send + Sync {
    /// Wrapped token for an original asset, if one has been deployed.
    async fn resolve(&self, original: Address) -> Result<Option<Address>, RelayError>;

    /// Original asset for a wrapped token, if the mapping exists.
    async fn resolve_original(&self, wrapped: Address) -> Result<Option<Address>, RelayError>;

    /// Deploy the wrapped representation of `original` and return its
    /// address. Must re-resolve after deployment rather than predicting the
    /// address; the contract is the authority, including when a concurrent
    /// deployment for the same asset won the race.
    async fn provision(&self, original: Address) -> Result<Address, RelayError>;
}

/// Registry backed by the Aetherius bridge contract. Token metadata for
/// provisioning is read from the original ERC-20 on the Base side.
pub struct OnChainAssetRegistry {
    source: Arc<ChainConnector>,
    destination: Arc<ChainConnector>,
}

impl OnChainAssetRegistry {
    pub fn new(source: Arc<ChainConnector>, destination: Arc<ChainConnector>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

#[async_trait]
impl WrappedAssetRegistry for OnChainAssetRegistry {
    async fn resolve(&self, original: Address) -> Result<Option<Address>, RelayError> {
        let bridge =
            AetheriusBridge::new(self.destination.bridge_address(), self.destination.provider());
        let wrapped = bridge
            .wrappedTokens(original)
            .call()
            .await
            .map_err(|e| classify_rpc_error("wrappedTokens", &e.to_string()))?
            ._0;
        Ok((wrapped != Address::ZERO).then_some(wrapped))
    }

    async fn resolve_original(&self, wrapped: Address) -> Result<Option<Address>, RelayError> {
        let bridge =
            AetheriusBridge::new(self.destination.bridge_address(), self.destination.provider());
        let original = bridge
            .originalTokens(wrapped)
            .call()
            .await
            .map_err(|e| classify_rpc_error("originalTokens", &e.to_string()))?
            ._0;
        Ok((original != Address::ZERO).then_some(original))
    }

    async fn provision(&self, original: Address) -> Result<Address, RelayError> {
        // Metadata lives with the original token on the source chain.
        let erc20 = Erc20::new(original, self.source.provider());
        let name = erc20
            .name()
            .call()
            .await
            .map_err(|e| classify_rpc_error("name", &e.to_string()))?
            ._0;
        let symbol = erc20
            .symbol()
            .call()
            .await
            .map_err(|e| classify_rpc_error("symbol", &e.to_string()))?
            ._0;

        let wrapped_name = format!("Wrapped {}", name);
        let wrapped_symbol = format!("w{}", symbol);

        info!(
            token = %original,
            name = %wrapped_name,
            symbol = %wrapped_symbol,
            "Deploying wrapped token"
        );

        let provider = self.destination.wallet_provider()?;
        let bridge = AetheriusBridge::new(self.destination.bridge_address(), provider);
        let pending = bridge
            .deployWrappedToken(original, wrapped_name, wrapped_symbol)
            .send()
            .await
            .map_err(|e| classify_rpc_error("deployWrappedToken", &e.to_string()))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RelayError::Transaction(format!("deployWrappedToken receipt: {}", e)))?;

        if !receipt.status() {
            return Err(RelayError::Reverted(format!(
                "deployWrappedToken for {}",
                original
            )));
        }

        // Never trust a predicted address: the contract decides the final
        // mapping, so re-read it.
        match self.resolve(original).await? {
            Some(wrapped) => {
                info!(token = %original, wrapped = %wrapped, "Wrapped token deployed");
                Ok(wrapped)
            }
            None => Err(RelayError::Transaction(format!(
                "wrapped token for {} still unresolved after deployment",
                original
            ))),
        }
    }
}
