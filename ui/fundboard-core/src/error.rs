//! Error types shared across the chain client, wallet adapter and config.

use thiserror::Error;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("return data too short: need {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },
    #[error("offset or length out of range")]
    OutOfRange,
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid hex: {0}")]
    Hex(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("unknown connector: {0}")]
    UnknownConnector(String),
    #[error("{0} is not installed")]
    NotInstalled(String),
    #[error("{0}")]
    Rejected(String),
    #[error("wallet returned no accounts")]
    NoAccounts,
    #[error("a connection request is already pending")]
    ConnectInFlight,
    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("{message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ChainError {
    /// Converts a JSON-RPC error coming back from a wallet endpoint into the
    /// wallet taxonomy, so a user rejection reads as such.
    pub fn into_wallet_error(self) -> WalletError {
        match self {
            Self::Wallet(e) => e,
            Self::Rpc { code, message } if code == USER_REJECTED_CODE => {
                WalletError::Rejected(message)
            }
            other => WalletError::Provider(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rejection_maps_to_rejected() {
        let err = ChainError::Rpc {
            code: USER_REJECTED_CODE,
            message: "User rejected the request.".into(),
        };
        assert_eq!(
            err.into_wallet_error(),
            WalletError::Rejected("User rejected the request.".into())
        );
    }

    #[test]
    fn other_rpc_errors_become_provider_errors() {
        let err = ChainError::Rpc {
            code: -32000,
            message: "insufficient funds".into(),
        };
        assert_eq!(
            err.into_wallet_error(),
            WalletError::Provider("insufficient funds".into())
        );
    }
}
