//! Common types for cross-chain transfers.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two ledgers the validator is wired to.
///
/// Base is the source role (original assets are locked there), Aetherius the
/// destination role (wrapped assets are minted there). Which concrete
/// network each name binds to is decided by [`crate::config::NetworkMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Base,
    Aetherius,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Base => "base",
            Chain::Aetherius => "aetherius",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer direction, named after the pair of on-chain effects it links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// TokensLocked on Base -> mintWrappedTokens on Aetherius
    LockToMint,
    /// TokensBurned on Aetherius -> unlockTokens on Base
    BurnToUnlock,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::LockToMint => "lock_to_mint",
            Direction::BurnToUnlock => "burn_to_unlock",
        }
    }

    /// Chain whose bridge emits this direction's events.
    pub fn source_chain(&self) -> Chain {
        match self {
            Direction::LockToMint => Chain::Base,
            Direction::BurnToUnlock => Chain::Aetherius,
        }
    }

    /// Chain that receives this direction's mint/unlock transaction. Its
    /// bridge contract also owns the processed-nonce record.
    pub fn destination_chain(&self) -> Chain {
        match self {
            Direction::LockToMint => Chain::Aetherius,
            Direction::BurnToUnlock => Chain::Base,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observed lock/burn event, decoded from the bridge contract's log.
///
/// `token` is the locked original token for LockToMint and the burned
/// wrapped token for BurnToUnlock. `(direction, nonce)` is unique; the
/// emitting contract guarantees nonce uniqueness per bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub direction: Direction,
    pub token: Address,
    pub sender: Address,
    pub amount: U256,
    pub recipient: Address,
    pub nonce: U256,
}
