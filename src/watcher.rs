//! Event watcher - polls one bridge for lock/burn events
//!
//! One watcher per direction. Decoded events are forwarded over the
//! direction's bounded queue in delivery order; a full queue applies
//! backpressure to the poll loop instead of dropping events. The cursor is
//! in-memory only: there is deliberately no durable record of past work, so
//! a fresh watcher starts at the current head and never replays history.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::rpc::types::{Filter, Log};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::connector::ChainConnector;
use crate::error::RelayError;
use crate::metrics;
use crate::types::{Direction, TransferEvent};

/// Event signature hash for a direction's bridge event. Both events share
/// the parameter layout, only the name differs.
pub fn event_signature(direction: Direction) -> B256 {
    match direction {
        Direction::LockToMint => {
            keccak256(b"TokensLocked(address,address,uint256,address,uint256)")
        }
        Direction::BurnToUnlock => {
            keccak256(b"TokensBurned(address,address,uint256,address,uint256)")
        }
    }
}

/// Decode a bridge log into a [`TransferEvent`].
///
/// Indexed topics: token, sender, recipient. Non-indexed data: amount,
/// nonce (32 bytes each, big-endian).
pub fn parse_transfer_log(direction: Direction, log: &Log) -> Result<TransferEvent, RelayError> {
    let topics = log.topics();
    if topics.len() < 4 {
        return Err(RelayError::Transaction(format!(
            "{} event is missing indexed topics",
            direction
        )));
    }

    let token = Address::from_slice(&topics[1].as_slice()[12..]);
    let sender = Address::from_slice(&topics[2].as_slice()[12..]);
    let recipient = Address::from_slice(&topics[3].as_slice()[12..]);

    let data = log.data().data.as_ref();
    if data.len() < 64 {
        return Err(RelayError::Transaction(format!(
            "{} event data too short: {} bytes",
            direction,
            data.len()
        )));
    }

    let amount = U256::from_be_slice(&data[0..32]);
    let nonce = U256::from_be_slice(&data[32..64]);

    Ok(TransferEvent {
        direction,
        token,
        sender,
        amount,
        recipient,
        nonce,
    })
}

/// Polls one chain's bridge and feeds one direction's pipeline queue.
pub struct EventWatcher {
    connector: Arc<ChainConnector>,
    direction: Direction,
    poll_interval: Duration,
    events: mpsc::Sender<TransferEvent>,
}

impl EventWatcher {
    pub fn new(
        connector: Arc<ChainConnector>,
        direction: Direction,
        poll_interval: Duration,
        events: mpsc::Sender<TransferEvent>,
    ) -> Self {
        Self {
            connector,
            direction,
            poll_interval,
            events,
        }
    }

    /// Poll loop. Runs until the pipeline queue closes or the task is
    /// aborted by the supervisor; RPC failures are logged and retried on
    /// the next tick (persistent outages are the health monitor's problem).
    pub async fn run(self) {
        let chain = self.connector.chain();
        let signature = event_signature(self.direction);

        let mut cursor = loop {
            match self.connector.block_height().await {
                Ok(height) => break height,
                Err(e) => {
                    warn!(
                        chain = %chain,
                        error = %e,
                        "Failed to read initial block height, retrying"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        };

        info!(
            chain = %chain,
            direction = %self.direction,
            from_block = cursor + 1,
            "Event watcher started"
        );

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let head = match self.connector.block_height().await {
                Ok(height) => height,
                Err(e) => {
                    warn!(chain = %chain, error = %e, "Block height poll failed");
                    continue;
                }
            };
            metrics::LATEST_BLOCK
                .with_label_values(&[chain.as_str()])
                .set(head as f64);

            if head <= cursor {
                continue;
            }

            let filter = Filter::new()
                .address(self.connector.bridge_address())
                .from_block(cursor + 1)
                .to_block(head);

            // Cursor only advances after a successful fetch, so a failed
            // range is re-read on the next tick.
            let logs = match self.connector.get_logs(&filter).await {
                Ok(logs) => logs,
                Err(e) => {
                    warn!(
                        chain = %chain,
                        from_block = cursor + 1,
                        to_block = head,
                        error = %e,
                        "Log fetch failed"
                    );
                    continue;
                }
            };

            for log in logs {
                let topics = log.topics();
                if topics.is_empty() || topics[0] != signature {
                    continue;
                }

                match parse_transfer_log(self.direction, &log) {
                    Ok(event) => {
                        info!(
                            direction = %self.direction,
                            token = %event.token,
                            amount = %event.amount,
                            recipient = %event.recipient,
                            nonce = %event.nonce,
                            "Observed transfer event"
                        );
                        metrics::EVENTS_DETECTED
                            .with_label_values(&[self.direction.as_str()])
                            .inc();

                        // Blocks when the queue is full: backpressure, not drops.
                        if self.events.send(event).await.is_err() {
                            info!(
                                direction = %self.direction,
                                "Event queue closed, watcher stopping"
                            );
                            return;
                        }
                    }
                    Err(e) => {
                        error!(
                            direction = %self.direction,
                            tx_hash = ?log.transaction_hash,
                            error = %e,
                            "Failed to parse transfer log"
                        );
                    }
                }
            }

            cursor = head;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData};

    fn pad_address(address: Address) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(address.as_slice());
        B256::from(bytes)
    }

    fn event_log(direction: Direction, amount: U256, nonce: U256) -> Log {
        let token = Address::repeat_byte(0xaa);
        let sender = Address::repeat_byte(0x11);
        let recipient = Address::repeat_byte(0x22);

        let mut data = [0u8; 64];
        data[0..32].copy_from_slice(&amount.to_be_bytes::<32>());
        data[32..64].copy_from_slice(&nonce.to_be_bytes::<32>());

        let inner = alloy::primitives::Log {
            address: Address::repeat_byte(0xbb),
            data: LogData::new_unchecked(
                vec![
                    event_signature(direction),
                    pad_address(token),
                    pad_address(sender),
                    pad_address(recipient),
                ],
                Bytes::copy_from_slice(&data),
            ),
        };

        Log {
            inner,
            block_hash: None,
            block_number: None,
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: false,
        }
    }

    #[test]
    fn test_signatures_differ_per_direction() {
        assert_ne!(
            event_signature(Direction::LockToMint),
            event_signature(Direction::BurnToUnlock)
        );
    }

    #[test]
    fn test_parse_lock_event() {
        let log = event_log(Direction::LockToMint, U256::from(500u64), U256::from(7u64));
        let event = parse_transfer_log(Direction::LockToMint, &log).unwrap();

        assert_eq!(event.direction, Direction::LockToMint);
        assert_eq!(event.token, Address::repeat_byte(0xaa));
        assert_eq!(event.sender, Address::repeat_byte(0x11));
        assert_eq!(event.recipient, Address::repeat_byte(0x22));
        assert_eq!(event.amount, U256::from(500u64));
        assert_eq!(event.nonce, U256::from(7u64));
    }

    #[test]
    fn test_parse_burn_event() {
        let log = event_log(Direction::BurnToUnlock, U256::MAX, U256::from(1u64));
        let event = parse_transfer_log(Direction::BurnToUnlock, &log).unwrap();

        assert_eq!(event.direction, Direction::BurnToUnlock);
        assert_eq!(event.amount, U256::MAX);
    }

    #[test]
    fn test_parse_rejects_missing_topics() {
        let mut log = event_log(Direction::LockToMint, U256::ZERO, U256::ZERO);
        log.inner.data = LogData::new_unchecked(
            vec![event_signature(Direction::LockToMint)],
            log.inner.data.data.clone(),
        );
        assert!(parse_transfer_log(Direction::LockToMint, &log).is_err());
    }

    #[test]
    fn test_parse_rejects_short_data() {
        let mut log = event_log(Direction::LockToMint, U256::ZERO, U256::ZERO);
        log.inner.data = LogData::new_unchecked(
            log.inner.data.topics().to_vec(),
            Bytes::copy_from_slice(&[0u8; 16]),
        );
        assert!(parse_transfer_log(Direction::LockToMint, &log).is_err());
    }
}
