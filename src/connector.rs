//! Chain connector - one RPC session per ledger
//!
//! Wraps an alloy HTTP provider plus the validator's signer for one chain.
//! Read calls go through a shared provider; transaction submission builds a
//! wallet-backed provider per call and waits for the receipt.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::NetworkProfile;
use crate::contracts::{AetheriusBridge, BaseBridge};
use crate::error::{classify_rpc_error, RelayError};
use crate::health::LivenessProbe;
use crate::pipeline::BridgeSubmitter;
use crate::types::Chain;

/// An open RPC session to one chain's bridge.
pub struct ChainConnector {
    chain: Chain,
    rpc_url: String,
    bridge_address: Address,
    signer: PrivateKeySigner,
    provider: RootProvider<Http<Client>>,
}

impl ChainConnector {
    /// Open a session against a network profile. Probes the endpoint once so
    /// an unreachable or malformed RPC fails here, not at first use.
    pub async fn connect(
        chain: Chain,
        profile: &NetworkProfile,
        signer: PrivateKeySigner,
    ) -> Result<Self, RelayError> {
        let url = profile.rpc_url.parse().map_err(|e| {
            RelayError::Configuration(format!("invalid RPC URL for {}: {}", chain, e))
        })?;
        let provider = ProviderBuilder::new().on_http(url);

        let bridge_address = Address::from_str(&profile.bridge_address).map_err(|e| {
            RelayError::Configuration(format!("invalid bridge address for {}: {}", chain, e))
        })?;

        let connector = Self {
            chain,
            rpc_url: profile.rpc_url.clone(),
            bridge_address,
            signer,
            provider,
        };

        let height = connector.block_height().await?;
        info!(
            chain = %chain,
            height,
            bridge = %bridge_address,
            "Connected to chain RPC"
        );

        Ok(connector)
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn bridge_address(&self) -> Address {
        self.bridge_address
    }

    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }

    /// Current block number; doubles as the liveness probe.
    pub async fn block_height(&self) -> Result<u64, RelayError> {
        self.provider.get_block_number().await.map_err(|e| {
            RelayError::Connection(format!("{} block height probe failed: {}", self.chain, e))
        })
    }

    /// Fetch logs for a filter, classified onto [`RelayError`].
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, RelayError> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(|e| classify_rpc_error("getLogs", &e.to_string()))
    }

    /// Wallet-backed provider for transaction submission. Built per call so
    /// submissions never share signer state with the read path.
    pub fn wallet_provider(&self) -> Result<impl Provider<Http<Client>>, RelayError> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let url = self.rpc_url.parse().map_err(|e| {
            RelayError::Configuration(format!("invalid RPC URL for {}: {}", self.chain, e))
        })?;
        Ok(ProviderBuilder::new().wallet(wallet).on_http(url))
    }
}

#[async_trait]
impl LivenessProbe for ChainConnector {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn block_height(&self) -> Result<u64, RelayError> {
        ChainConnector::block_height(self).await
    }
}

/// Submits mint/unlock transactions with the validator wallet (direct-call
/// authorization: this wallet is the one the bridge contracts trust).
pub struct EvmBridgeSubmitter {
    source: Arc<ChainConnector>,
    destination: Arc<ChainConnector>,
}

impl EvmBridgeSubmitter {
    pub fn new(source: Arc<ChainConnector>, destination: Arc<ChainConnector>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

#[async_trait]
impl BridgeSubmitter for EvmBridgeSubmitter {
    async fn mint_wrapped(
        &self,
        original: Address,
        recipient: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<B256, RelayError> {
        let provider = self.destination.wallet_provider()?;
        let bridge = AetheriusBridge::new(self.destination.bridge_address(), provider);

        debug!(
            token = %original,
            recipient = %recipient,
            amount = %amount,
            nonce = %nonce,
            "Submitting mintWrappedTokens"
        );

        let pending = bridge
            .mintWrappedTokens(original, recipient, amount, nonce)
            .send()
            .await
            .map_err(|e| classify_rpc_error("mintWrappedTokens", &e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, "Mint transaction sent, waiting for confirmation");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RelayError::Transaction(format!("mintWrappedTokens receipt: {}", e)))?;

        if !receipt.status() {
            return Err(RelayError::Reverted(format!(
                "mintWrappedTokens for nonce {}",
                nonce
            )));
        }

        Ok(tx_hash)
    }

    async fn unlock_tokens(
        &self,
        original: Address,
        recipient: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<B256, RelayError> {
        let provider = self.source.wallet_provider()?;
        let bridge = BaseBridge::new(self.source.bridge_address(), provider);

        debug!(
            token = %original,
            recipient = %recipient,
            amount = %amount,
            nonce = %nonce,
            "Submitting unlockTokens"
        );

        let pending = bridge
            .unlockTokens(original, recipient, amount, nonce)
            .send()
            .await
            .map_err(|e| classify_rpc_error("unlockTokens", &e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, "Unlock transaction sent, waiting for confirmation");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RelayError::Transaction(format!("unlockTokens receipt: {}", e)))?;

        if !receipt.status() {
            return Err(RelayError::Reverted(format!(
                "unlockTokens for nonce {}",
                nonce
            )));
        }

        Ok(tx_hash)
    }
}
