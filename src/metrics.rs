//! Prometheus metrics for the bridge validator
//!
//! Exposed on the /metrics endpoint for scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Gauge, GaugeVec,
};

lazy_static! {
    // Event flow
    pub static ref EVENTS_DETECTED: CounterVec = register_counter_vec!(
        "validator_events_detected_total",
        "Total number of lock/burn events observed",
        &["direction"]
    ).unwrap();

    pub static ref TRANSFERS: CounterVec = register_counter_vec!(
        "validator_transfers_total",
        "Pipeline outcomes per transfer event",
        &["direction", "outcome"]
    ).unwrap();

    // Chain state
    pub static ref LATEST_BLOCK: GaugeVec = register_gauge_vec!(
        "validator_latest_block",
        "Latest block height observed per chain",
        &["chain"]
    ).unwrap();

    // Error recovery
    pub static ref RETRY_ATTEMPTS: CounterVec = register_counter_vec!(
        "validator_retry_attempts_total",
        "Retried outbound chain calls",
        &["operation"]
    ).unwrap();

    pub static ref RECONNECTS: Counter = register_counter!(
        "validator_reconnects_total",
        "Relay wiring rebuilds triggered by failed liveness probes"
    ).unwrap();

    // Health
    pub static ref UP: Gauge = register_gauge!(
        "validator_up",
        "1 when the validator process is serving"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_gauge_toggles() {
        UP.set(1.0);
        assert_eq!(UP.get(), 1.0);
        UP.set(0.0);
        assert_eq!(UP.get(), 0.0);
    }

    #[test]
    fn test_labeled_metrics_register() {
        TRANSFERS.with_label_values(&["lock_to_mint", "completed"]).inc();
        LATEST_BLOCK.with_label_values(&["base"]).set(100.0);
        assert_eq!(LATEST_BLOCK.with_label_values(&["base"]).get(), 100.0);
    }
}
