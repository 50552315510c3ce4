//! Relay supervisor - owns the watchers, workers, and health monitor
//!
//! `start` wires everything up; `run` sits on the health-alert channel and
//! tears down / rebuilds the whole RPC layer when a chain goes unhealthy.
//! Queue senders live inside [`Wiring`], so dropping it closes the queues
//! and lets the workers drain and exit on their own.
//!
//! Wiring construction sits behind [`WiringFactory`]: the supervision loop
//! only tears down and rebuilds, it does not care where connectors come
//! from. Production uses [`ChainWiringFactory`].

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::connector::{ChainConnector, EvmBridgeSubmitter};
use crate::error::RelayError;
use crate::health::{HealthAlert, HealthMonitor};
use crate::metrics;
use crate::nonce::OnChainNonceLedger;
use crate::pipeline::{PipelineWorker, TransferPipeline};
use crate::registry::OnChainAssetRegistry;
use crate::retry::RetryPolicy;
use crate::types::{Chain, Direction, TransferEvent};
use crate::watcher::EventWatcher;

/// Everything tied to one pair of live RPC sessions.
pub struct Wiring {
    lock_tx: mpsc::Sender<TransferEvent>,
    burn_tx: mpsc::Sender<TransferEvent>,
    /// Pipeline workers; exit on their own once the senders drop.
    workers: JoinSet<()>,
    /// Watchers and health monitor; aborted on teardown.
    io: JoinSet<()>,
    health_rx: Option<mpsc::Receiver<HealthAlert>>,
}

impl Wiring {
    pub fn new(
        lock_tx: mpsc::Sender<TransferEvent>,
        burn_tx: mpsc::Sender<TransferEvent>,
        workers: JoinSet<()>,
        io: JoinSet<()>,
        health_rx: mpsc::Receiver<HealthAlert>,
    ) -> Self {
        Self {
            lock_tx,
            burn_tx,
            workers,
            io,
            health_rx: Some(health_rx),
        }
    }
}

/// Builds one complete [`Wiring`]. Called at startup and again after every
/// teardown; each call must produce fresh channels and tasks.
#[async_trait]
pub trait WiringFactory: Send + Sync {
    async fn build(&self) -> Result<Wiring, RelayError>;
}

/// Production factory: connects both chains over RPC and wires the on-chain
/// ledger, registry, and submitter implementations.
pub struct ChainWiringFactory {
    config: Config,
    signer: PrivateKeySigner,
}

#[async_trait]
impl WiringFactory for ChainWiringFactory {
    async fn build(&self) -> Result<Wiring, RelayError> {
        info!(
            mode = self.config.mode.as_str(),
            validator = %self.signer.address(),
            "Connecting relay wiring"
        );

        let base = Arc::new(
            ChainConnector::connect(
                Chain::Base,
                self.config.profile(Chain::Base),
                self.signer.clone(),
            )
            .await?,
        );
        let aetherius = Arc::new(
            ChainConnector::connect(
                Chain::Aetherius,
                self.config.profile(Chain::Aetherius),
                self.signer.clone(),
            )
            .await?,
        );

        let relayer = &self.config.relayer;
        let retry = RetryPolicy::from_config(relayer);
        let poll_interval = Duration::from_millis(relayer.poll_interval_ms);

        let registry = Arc::new(OnChainAssetRegistry::new(base.clone(), aetherius.clone()));
        let submitter = Arc::new(EvmBridgeSubmitter::new(base.clone(), aetherius.clone()));

        let (lock_tx, lock_rx) = mpsc::channel(relayer.queue_capacity);
        let (burn_tx, burn_rx) = mpsc::channel(relayer.queue_capacity);

        let mut workers = JoinSet::new();
        // Nonces for a lock->mint are recorded on Aetherius (where the mint
        // lands), and burn->unlock nonces on Base.
        workers.spawn(
            PipelineWorker::new(
                TransferPipeline::new(
                    Direction::LockToMint,
                    Arc::new(OnChainNonceLedger::new(aetherius.clone())),
                    registry.clone(),
                    submitter.clone(),
                    retry.clone(),
                ),
                lock_rx,
            )
            .run(),
        );
        workers.spawn(
            PipelineWorker::new(
                TransferPipeline::new(
                    Direction::BurnToUnlock,
                    Arc::new(OnChainNonceLedger::new(base.clone())),
                    registry,
                    submitter,
                    retry,
                ),
                burn_rx,
            )
            .run(),
        );

        let mut io = JoinSet::new();
        io.spawn(
            EventWatcher::new(
                base.clone(),
                Direction::LockToMint,
                poll_interval,
                lock_tx.clone(),
            )
            .run(),
        );
        io.spawn(
            EventWatcher::new(
                aetherius.clone(),
                Direction::BurnToUnlock,
                poll_interval,
                burn_tx.clone(),
            )
            .run(),
        );

        let (alert_tx, alert_rx) = mpsc::channel(1);
        io.spawn(
            HealthMonitor::new(
                base,
                aetherius,
                Duration::from_secs(relayer.health_interval_secs),
                alert_tx,
            )
            .run(),
        );

        Ok(Wiring::new(lock_tx, burn_tx, workers, io, alert_rx))
    }
}

pub struct RelaySupervisor<F: WiringFactory = ChainWiringFactory> {
    factory: F,
    reconnect_delay: Duration,
    wiring: Option<Wiring>,
}

impl RelaySupervisor<ChainWiringFactory> {
    pub fn new(config: Config) -> Result<Self, RelayError> {
        let signer = PrivateKeySigner::from_str(&config.validator_private_key)
            .map_err(|e| RelayError::Configuration(format!("invalid validator key: {}", e)))?;
        let reconnect_delay = Duration::from_secs(config.relayer.reconnect_delay_secs);
        Ok(Self::with_factory(
            ChainWiringFactory { config, signer },
            reconnect_delay,
        ))
    }
}

impl<F: WiringFactory> RelaySupervisor<F> {
    pub fn with_factory(factory: F, reconnect_delay: Duration) -> Self {
        Self {
            factory,
            reconnect_delay,
            wiring: None,
        }
    }

    /// Build the wiring and spawn the watcher/worker/monitor tasks.
    /// Calling `start` on a running supervisor is a no-op.
    pub async fn start(&mut self) -> Result<(), RelayError> {
        if self.wiring.is_some() {
            info!("Relay supervisor already running");
            return Ok(());
        }

        info!("Starting relay supervisor");
        self.wiring = Some(self.factory.build().await?);
        metrics::UP.set(1.0);
        Ok(())
    }

    /// Block until shutdown is signalled, reconnecting on health alerts.
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<(), RelayError> {
        self.start().await?;

        loop {
            // health_rx is taken out so `self` stays borrowable during
            // reconnects; it is restored with each new wiring.
            let mut health_rx = match self.wiring.as_mut().and_then(|w| w.health_rx.take()) {
                Some(rx) => rx,
                None => {
                    return Err(RelayError::Connection(
                        "relay supervisor has no live wiring".to_string(),
                    ))
                }
            };

            tokio::select! {
                _ = shutdown.recv() => {
                    self.shutdown().await;
                    return Ok(());
                }
                alert = health_rx.recv() => {
                    match alert {
                        Some(alert) => {
                            warn!(chain = %alert.chain, "Chain unhealthy, reconnecting");
                            self.reconnect(&mut shutdown).await?;
                        }
                        None => {
                            return Err(RelayError::Connection(
                                "health monitor exited unexpectedly".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Tear down the current wiring and rebuild until a connection holds,
    /// backing off by the configured reconnect delay. A shutdown signal
    /// during the backoff aborts the attempt cleanly.
    async fn reconnect(&mut self, shutdown: &mut mpsc::Receiver<()>) -> Result<(), RelayError> {
        self.teardown().await;

        loop {
            metrics::RECONNECTS.inc();
            match self.factory.build().await {
                Ok(wiring) => {
                    info!("Reconnected to both chains");
                    self.wiring = Some(wiring);
                    metrics::UP.set(1.0);
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs(),
                        "Reconnect failed"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => {
                            return Err(RelayError::Connection(
                                "shutdown during reconnect".to_string(),
                            ));
                        }
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }
    }

    async fn teardown(&mut self) {
        let Some(mut wiring) = self.wiring.take() else {
            return;
        };
        metrics::UP.set(0.0);

        wiring.io.abort_all();
        while wiring.io.join_next().await.is_some() {}

        // Closing the queues lets the workers finish in-flight events
        // before exiting, so no accepted event is lost to a reconnect.
        drop(wiring.lock_tx);
        drop(wiring.burn_tx);
        while wiring.workers.join_next().await.is_some() {}
    }

    /// Stop all tasks, draining queued events first. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.wiring.is_none() {
            return;
        }
        info!("Shutting down relay supervisor");
        self.teardown().await;
        info!("Relay supervisor stopped");
    }
}
