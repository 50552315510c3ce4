//! Error types and retry classification for the relay engine.

use alloy::primitives::Address;
use thiserror::Error;

/// Errors surfaced by the relay engine.
///
/// Each variant has a fixed retry class (see [`RelayError::class`]):
/// connection and transport failures are worth retrying, everything else
/// fails fast.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or malformed configuration. Fatal at startup; the process
    /// must not start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// RPC endpoint unreachable or returned a malformed response. Recovery
    /// is owned by the health monitor's reconnect loop.
    #[error("connection error: {0}")]
    Connection(String),

    /// Transaction submission or confirmation failed for a reason that may
    /// be transient (transport hiccup, timeout, dropped from mempool).
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Transaction was mined but reverted. Retrying resubmits an identical
    /// transaction against identical contract state, so this is terminal.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// BurnToUnlock observed a wrapped token the destination bridge has no
    /// original mapping for. Fatal for that event only.
    #[error("no original token mapped for wrapped token {0}")]
    OriginalAssetNotFound(Address),
}

/// Classifies errors for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Temporary failure - worth retrying
    Transient,
    /// Permanent failure - do not retry
    Permanent,
}

impl RelayError {
    /// Retry class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::Connection(_) | RelayError::Transaction(_) => ErrorClass::Transient,
            RelayError::Configuration(_)
            | RelayError::Reverted(_)
            | RelayError::OriginalAssetNotFound(_) => ErrorClass::Permanent,
        }
    }
}

/// Map an RPC/contract error message onto a [`RelayError`].
///
/// Alloy surfaces provider and contract failures as opaque error strings, so
/// classification is by substring. Unrecognized messages land in
/// `Transaction` (transient) rather than `Reverted`: we would rather waste a
/// bounded number of retries than permanently discard a recoverable event.
pub fn classify_rpc_error(context: &str, message: &str) -> RelayError {
    let lower = message.to_lowercase();

    if lower.contains("revert")
        || lower.contains("insufficient funds")
        || lower.contains("out of gas")
        || lower.contains("invalid parameters")
    {
        return RelayError::Reverted(format!("{}: {}", context, message));
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("503")
        || lower.contains("502")
        || lower.contains("temporarily unavailable")
    {
        return RelayError::Connection(format!("{}: {}", context, message));
    }

    RelayError::Transaction(format!("{}: {}", context, message))
}
