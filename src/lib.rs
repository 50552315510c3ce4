//! Aetherius Bridge Validator
//!
//! Watches the Base and Aetherius bridge contracts for lock and burn
//! events and relays each one to the opposite chain: locks on Base mint
//! wrapped tokens on Aetherius, burns on Aetherius unlock the originals
//! on Base. Nonce idempotency is enforced against the destination chain's
//! on-chain record, so a restarted or re-delivered event is never honored
//! twice.

pub mod api;
pub mod config;
pub mod connector;
pub mod contracts;
pub mod error;
pub mod health;
pub mod metrics;
pub mod nonce;
pub mod pipeline;
pub mod registry;
pub mod relay;
pub mod retry;
pub mod types;
pub mod watcher;
