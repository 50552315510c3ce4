//! Nonce ledger - the idempotency check in front of every mutating call
//!
//! The destination chain's bridge contract owns the processed-nonce record;
//! this module only reads it. There is no local copy: the on-chain record is
//! the single source of truth, and once a nonce reads `true` it stays true.

use alloy::primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;

use crate::connector::ChainConnector;
use crate::contracts::NonceRegistry;
use crate::error::{classify_rpc_error, RelayError};

/// Read access to one direction's processed-nonce record.
///
/// The result is advisory between the check and the confirmed submission;
/// a single active validator identity is assumed, so no second writer races
/// on the same nonce.
#[async_trait]
pub trait NonceLedger: Send + Sync {
    async fn is_processed(&self, nonce: U256) -> Result<bool, RelayError>;
}

/// Ledger backed by the `processedNonces` view of the destination bridge.
pub struct OnChainNonceLedger {
    connector: Arc<ChainConnector>,
}

impl OnChainNonceLedger {
    pub fn new(connector: Arc<ChainConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl NonceLedger for OnChainNonceLedger {
    async fn is_processed(&self, nonce: U256) -> Result<bool, RelayError> {
        let registry = NonceRegistry::new(self.connector.bridge_address(), self.connector.provider());
        let processed = registry
            .processedNonces(nonce)
            .call()
            .await
            .map_err(|e| classify_rpc_error("processedNonces", &e.to_string()))?;
        Ok(processed._0)
    }
}
