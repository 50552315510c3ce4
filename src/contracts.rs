//! Bridge contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the two bridge
//! contracts and the ERC-20 metadata surface.

use alloy::sol;

sol! {
    /// Base-side bridge: escrows original tokens.
    ///
    /// Emits `TokensLocked` when a user starts a Base -> Aetherius transfer;
    /// `unlockTokens` releases escrow for the reverse direction and records
    /// the nonce in `processedNonces`.
    #[sol(rpc)]
    contract BaseBridge {
        event TokensLocked(
            address indexed token,
            address indexed sender,
            uint256 amount,
            address indexed recipient,
            uint256 nonce
        );

        /// Release escrowed tokens for a burn observed on Aetherius.
        /// Validator-only; reverts if the nonce was already honored.
        function unlockTokens(
            address token,
            address recipient,
            uint256 amount,
            uint256 nonce
        ) external;

        function processedNonces(uint256 nonce) external view returns (bool);
    }

    /// Aetherius-side bridge: owns the wrapped-token registry.
    ///
    /// Emits `TokensBurned` when a user starts an Aetherius -> Base
    /// transfer; `mintWrappedTokens` honors a lock observed on Base and
    /// records the nonce in `processedNonces`.
    #[sol(rpc)]
    contract AetheriusBridge {
        event TokensBurned(
            address indexed token,
            address indexed sender,
            uint256 amount,
            address indexed recipient,
            uint256 nonce
        );

        /// Mint wrapped tokens for a lock observed on Base.
        /// Validator-only; reverts if the nonce was already honored.
        function mintWrappedTokens(
            address originalToken,
            address recipient,
            uint256 amount,
            uint256 nonce
        ) external;

        /// Deploy the wrapped representation of a Base token. The contract
        /// rejects a duplicate deployment for the same original token.
        function deployWrappedToken(
            address originalToken,
            string name,
            string symbol
        ) external returns (address);

        /// Wrapped token for an original, or the zero address.
        function wrappedTokens(address originalToken) external view returns (address);

        /// Original token for a wrapped one, or the zero address.
        function originalTokens(address wrappedToken) external view returns (address);

        function processedNonces(uint256 nonce) external view returns (bool);
    }

    /// Minimal view shared by both bridges, bound at either bridge address.
    /// Lets the nonce ledger stay agnostic of which side it reads.
    #[sol(rpc)]
    contract NonceRegistry {
        function processedNonces(uint256 nonce) external view returns (bool);
    }

    /// ERC-20 metadata, read from the original token when provisioning its
    /// wrapped representation.
    #[sol(rpc)]
    contract Erc20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
    }
}
