//! Connection health monitoring
//!
//! Periodically probes both chains with a cheap block-height call and
//! pushes an alert per failing chain so the supervisor can reconnect.
//! The alert channel has capacity 1 per the supervisor's wiring; a full
//! channel means a reconnect is already pending and the alert is dropped.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::metrics;
use crate::types::Chain;

/// Minimal liveness check against one chain's RPC endpoint.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    fn chain(&self) -> Chain;
    async fn block_height(&self) -> Result<u64, RelayError>;
}

/// Raised when a chain fails its liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthAlert {
    pub chain: Chain,
}

pub struct HealthMonitor {
    base: Arc<dyn LivenessProbe>,
    aetherius: Arc<dyn LivenessProbe>,
    interval: Duration,
    alerts: mpsc::Sender<HealthAlert>,
}

impl HealthMonitor {
    pub fn new(
        base: Arc<dyn LivenessProbe>,
        aetherius: Arc<dyn LivenessProbe>,
        interval: Duration,
        alerts: mpsc::Sender<HealthAlert>,
    ) -> Self {
        Self {
            base,
            aetherius,
            interval,
            alerts,
        }
    }

    /// Probe both chains every interval until the alert channel closes.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Health monitor started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let (base, aetherius) =
                tokio::join!(self.base.block_height(), self.aetherius.block_height());

            for (probe, result) in [(&self.base, base), (&self.aetherius, aetherius)] {
                let chain = probe.chain();
                match result {
                    Ok(height) => {
                        debug!(chain = %chain, height, "Health check passed");
                        metrics::LATEST_BLOCK
                            .with_label_values(&[chain.as_str()])
                            .set(height as f64);
                    }
                    Err(e) => {
                        warn!(chain = %chain, error = %e, "Health check failed");
                        match self.alerts.try_send(HealthAlert { chain }) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                debug!(chain = %chain, "Reconnect already pending");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                info!("Health monitor stopped");
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails for the first `failures` probes, then succeeds.
    struct FlakyProbe {
        chain: Chain,
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyProbe {
        fn new(chain: Chain, failures: u32) -> Arc<Self> {
            Arc::new(Self {
                chain,
                failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl LivenessProbe for FlakyProbe {
        fn chain(&self) -> Chain {
            self.chain
        }

        async fn block_height(&self) -> Result<u64, RelayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(RelayError::Connection("probe refused".to_string()))
            } else {
                Ok(1000 + call as u64)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_per_failing_cycle_then_silence() {
        let base = FlakyProbe::new(Chain::Base, 2);
        let aetherius = FlakyProbe::new(Chain::Aetherius, 0);
        let (tx, mut rx) = mpsc::channel(8);
        let monitor =
            HealthMonitor::new(base, aetherius, Duration::from_secs(30), tx);
        let handle = tokio::spawn(monitor.run());

        // First tick fires immediately; advance through three more cycles.
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.abort();

        let mut alerts = Vec::new();
        while let Ok(alert) = rx.try_recv() {
            alerts.push(alert);
        }
        assert_eq!(
            alerts,
            vec![HealthAlert { chain: Chain::Base }, HealthAlert { chain: Chain::Base }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_alert_channel_drops_duplicates() {
        let base = FlakyProbe::new(Chain::Base, u32::MAX);
        let aetherius = FlakyProbe::new(Chain::Aetherius, u32::MAX);
        let (tx, mut rx) = mpsc::channel(1);
        let monitor =
            HealthMonitor::new(base, aetherius, Duration::from_secs(30), tx);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.abort();

        // Only the first alert lands; the rest find the channel full.
        assert_eq!(rx.try_recv(), Ok(HealthAlert { chain: Chain::Base }));
        assert!(rx.try_recv().is_err());
    }
}
