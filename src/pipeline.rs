//! Transfer pipeline - turns one observed event into one destination transaction
//!
//! Per event: check the nonce ledger, resolve (or provision) the asset
//! mapping, submit the mint/unlock through the retry policy, await the
//! receipt. A failure is terminal for that event only: it is logged with
//! enough context to replay by hand and the worker moves on.
//!
//! One worker per direction drains its bounded queue sequentially, so
//! per-direction ordering and single-flight hold by construction while the
//! two directions proceed independently.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::RelayError;
use crate::metrics;
use crate::nonce::NonceLedger;
use crate::registry::WrappedAssetRegistry;
use crate::retry::RetryPolicy;
use crate::types::{Direction, TransferEvent};

/// Submission of the destination-chain effect for a transfer.
///
/// `original` is always the Base-side token address; the Aetherius bridge
/// maps it to the wrapped token internally on mint.
#[async_trait]
pub trait BridgeSubmitter: Send + Sync {
    async fn mint_wrapped(
        &self,
        original: Address,
        recipient: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<B256, RelayError>;

    async fn unlock_tokens(
        &self,
        original: Address,
        recipient: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<B256, RelayError>;
}

/// Terminal pipeline states (failure is the `Err` branch of `process`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Destination transaction confirmed.
    Completed(B256),
    /// Nonce already honored on the destination chain; nothing submitted.
    Skipped,
}

/// One direction's transfer state machine.
pub struct TransferPipeline {
    direction: Direction,
    ledger: Arc<dyn NonceLedger>,
    registry: Arc<dyn WrappedAssetRegistry>,
    submitter: Arc<dyn BridgeSubmitter>,
    retry: RetryPolicy,
}

impl TransferPipeline {
    pub fn new(
        direction: Direction,
        ledger: Arc<dyn NonceLedger>,
        registry: Arc<dyn WrappedAssetRegistry>,
        submitter: Arc<dyn BridgeSubmitter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            direction,
            ledger,
            registry,
            submitter,
            retry,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Process one observed event to a terminal state.
    ///
    /// The ledger check must precede, and gate, the mutating call: skipping
    /// it risks a double mint/unlock.
    pub async fn process(&self, event: &TransferEvent) -> Result<Outcome, RelayError> {
        let processed = self
            .retry
            .run("processedNonces", || self.ledger.is_processed(event.nonce))
            .await?;
        if processed {
            info!(
                direction = %self.direction,
                nonce = %event.nonce,
                "Nonce already processed, skipping"
            );
            return Ok(Outcome::Skipped);
        }

        let tx_hash = match self.direction {
            Direction::LockToMint => {
                let wrapped = match self
                    .retry
                    .run("wrappedTokens", || self.registry.resolve(event.token))
                    .await?
                {
                    Some(wrapped) => wrapped,
                    // Provisioning is attempted once per event: a retried
                    // deploy would pay gas only to be rejected as a
                    // duplicate by the contract.
                    None => self.registry.provision(event.token).await?,
                };
                debug!(
                    token = %event.token,
                    wrapped = %wrapped,
                    "Wrapped token resolved"
                );

                self.retry
                    .run("mintWrappedTokens", || {
                        self.submitter.mint_wrapped(
                            event.token,
                            event.recipient,
                            event.amount,
                            event.nonce,
                        )
                    })
                    .await?
            }
            Direction::BurnToUnlock => {
                let original = self
                    .retry
                    .run("originalTokens", || {
                        self.registry.resolve_original(event.token)
                    })
                    .await?
                    .ok_or(RelayError::OriginalAssetNotFound(event.token))?;

                self.retry
                    .run("unlockTokens", || {
                        self.submitter.unlock_tokens(
                            original,
                            event.recipient,
                            event.amount,
                            event.nonce,
                        )
                    })
                    .await?
            }
        };

        Ok(Outcome::Completed(tx_hash))
    }
}

/// Sole consumer of one direction's event queue.
pub struct PipelineWorker {
    pipeline: TransferPipeline,
    events: mpsc::Receiver<TransferEvent>,
}

impl PipelineWorker {
    pub fn new(pipeline: TransferPipeline, events: mpsc::Receiver<TransferEvent>) -> Self {
        Self { pipeline, events }
    }

    /// Drain the queue one event at a time until every sender is gone.
    /// A pipeline failure never crashes the worker and never blocks the
    /// next event.
    pub async fn run(mut self) {
        let direction = self.pipeline.direction();
        info!(direction = %direction, "Pipeline worker started");

        while let Some(event) = self.events.recv().await {
            match self.pipeline.process(&event).await {
                Ok(Outcome::Completed(tx_hash)) => {
                    info!(
                        direction = %direction,
                        nonce = %event.nonce,
                        tx_hash = %tx_hash,
                        "Transfer completed"
                    );
                    metrics::TRANSFERS
                        .with_label_values(&[direction.as_str(), "completed"])
                        .inc();
                }
                Ok(Outcome::Skipped) => {
                    metrics::TRANSFERS
                        .with_label_values(&[direction.as_str(), "skipped"])
                        .inc();
                }
                Err(e) => {
                    // Everything needed to replay the event by hand.
                    error!(
                        direction = %direction,
                        nonce = %event.nonce,
                        token = %event.token,
                        amount = %event.amount,
                        recipient = %event.recipient,
                        error = %e,
                        "Transfer failed, event discarded"
                    );
                    metrics::TRANSFERS
                        .with_label_values(&[direction.as_str(), "failed"])
                        .inc();
                }
            }
        }

        info!(direction = %direction, "Pipeline worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubLedger {
        processed: bool,
        calls: AtomicU32,
    }

    impl StubLedger {
        fn new(processed: bool) -> Arc<Self> {
            Arc::new(Self {
                processed,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl NonceLedger for StubLedger {
        async fn is_processed(&self, _nonce: U256) -> Result<bool, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.processed)
        }
    }

    #[derive(Default)]
    struct StubRegistry {
        wrapped: Mutex<HashMap<Address, Address>>,
        originals: Mutex<HashMap<Address, Address>>,
        deploys: Mutex<Vec<Address>>,
        /// Mapping installed by `provision`, simulating the contract.
        deploy_result: Option<Address>,
    }

    #[async_trait]
    impl WrappedAssetRegistry for StubRegistry {
        async fn resolve(&self, original: Address) -> Result<Option<Address>, RelayError> {
            Ok(self.wrapped.lock().unwrap().get(&original).copied())
        }

        async fn resolve_original(&self, wrapped: Address) -> Result<Option<Address>, RelayError> {
            Ok(self.originals.lock().unwrap().get(&wrapped).copied())
        }

        async fn provision(&self, original: Address) -> Result<Address, RelayError> {
            self.deploys.lock().unwrap().push(original);
            let wrapped = self
                .deploy_result
                .ok_or_else(|| RelayError::Transaction("deploy failed".to_string()))?;
            self.wrapped.lock().unwrap().insert(original, wrapped);
            Ok(wrapped)
        }
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        mints: Mutex<Vec<(Address, Address, U256, U256)>>,
        unlocks: Mutex<Vec<(Address, Address, U256, U256)>>,
    }

    #[async_trait]
    impl BridgeSubmitter for RecordingSubmitter {
        async fn mint_wrapped(
            &self,
            original: Address,
            recipient: Address,
            amount: U256,
            nonce: U256,
        ) -> Result<B256, RelayError> {
            self.mints
                .lock()
                .unwrap()
                .push((original, recipient, amount, nonce));
            Ok(B256::repeat_byte(0x01))
        }

        async fn unlock_tokens(
            &self,
            original: Address,
            recipient: Address,
            amount: U256,
            nonce: U256,
        ) -> Result<B256, RelayError> {
            self.unlocks
                .lock()
                .unwrap()
                .push((original, recipient, amount, nonce));
            Ok(B256::repeat_byte(0x02))
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn lock_event(nonce: u64) -> TransferEvent {
        TransferEvent {
            direction: Direction::LockToMint,
            token: Address::repeat_byte(0xaa),
            sender: Address::repeat_byte(0x11),
            amount: U256::from(500u64),
            recipient: Address::repeat_byte(0x22),
            nonce: U256::from(nonce),
        }
    }

    #[tokio::test]
    async fn test_processed_nonce_is_skipped() {
        let ledger = StubLedger::new(true);
        let registry = Arc::new(StubRegistry::default());
        let submitter = Arc::new(RecordingSubmitter::default());
        let pipeline = TransferPipeline::new(
            Direction::LockToMint,
            ledger.clone(),
            registry,
            submitter.clone(),
            policy(),
        );

        let outcome = pipeline.process(&lock_event(7)).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
        assert!(submitter.mints.lock().unwrap().is_empty());
        assert!(submitter.unlocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mapped_asset_mints_without_deploy() {
        let registry = StubRegistry::default();
        registry
            .wrapped
            .lock()
            .unwrap()
            .insert(Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        let registry = Arc::new(registry);
        let submitter = Arc::new(RecordingSubmitter::default());
        let pipeline = TransferPipeline::new(
            Direction::LockToMint,
            StubLedger::new(false),
            registry.clone(),
            submitter.clone(),
            policy(),
        );

        let outcome = pipeline.process(&lock_event(7)).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert!(registry.deploys.lock().unwrap().is_empty());

        let mints = submitter.mints.lock().unwrap();
        assert_eq!(
            *mints,
            vec![(
                Address::repeat_byte(0xaa),
                Address::repeat_byte(0x22),
                U256::from(500u64),
                U256::from(7u64),
            )]
        );
    }

    #[tokio::test]
    async fn test_unmapped_asset_provisions_then_mints() {
        let registry = Arc::new(StubRegistry {
            deploy_result: Some(Address::repeat_byte(0xbb)),
            ..StubRegistry::default()
        });
        let submitter = Arc::new(RecordingSubmitter::default());
        let pipeline = TransferPipeline::new(
            Direction::LockToMint,
            StubLedger::new(false),
            registry.clone(),
            submitter.clone(),
            policy(),
        );

        let outcome = pipeline.process(&lock_event(7)).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(
            *registry.deploys.lock().unwrap(),
            vec![Address::repeat_byte(0xaa)]
        );
        assert_eq!(submitter.mints.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_wrapped_token_is_fatal_for_event() {
        let registry = Arc::new(StubRegistry::default());
        let submitter = Arc::new(RecordingSubmitter::default());
        let pipeline = TransferPipeline::new(
            Direction::BurnToUnlock,
            StubLedger::new(false),
            registry,
            submitter.clone(),
            policy(),
        );

        let event = TransferEvent {
            direction: Direction::BurnToUnlock,
            token: Address::repeat_byte(0xcc),
            sender: Address::repeat_byte(0x11),
            amount: U256::from(9u64),
            recipient: Address::repeat_byte(0x22),
            nonce: U256::from(3u64),
        };

        let err = pipeline.process(&event).await.unwrap_err();
        assert!(matches!(err, RelayError::OriginalAssetNotFound(_)));
        assert!(submitter.unlocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_burn_unlocks_original_token() {
        let registry = StubRegistry::default();
        registry
            .originals
            .lock()
            .unwrap()
            .insert(Address::repeat_byte(0xcc), Address::repeat_byte(0xaa));
        let registry = Arc::new(registry);
        let submitter = Arc::new(RecordingSubmitter::default());
        let pipeline = TransferPipeline::new(
            Direction::BurnToUnlock,
            StubLedger::new(false),
            registry,
            submitter.clone(),
            policy(),
        );

        let event = TransferEvent {
            direction: Direction::BurnToUnlock,
            token: Address::repeat_byte(0xcc),
            sender: Address::repeat_byte(0x11),
            amount: U256::from(9u64),
            recipient: Address::repeat_byte(0x22),
            nonce: U256::from(3u64),
        };

        pipeline.process(&event).await.unwrap();
        let unlocks = submitter.unlocks.lock().unwrap();
        // The unlock targets the resolved original token, not the wrapped one.
        assert_eq!(unlocks[0].0, Address::repeat_byte(0xaa));
    }
}
