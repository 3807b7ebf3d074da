//! Error types shared by the relay client, the signing bridge and the facade.

use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`BridgeError`], so callers can tell a user who
/// ignored the request apart from a broken transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unusable (missing recipient, bad hex, ...)
    Validation,
    /// The declared sender is not the bound address
    Authorization,
    /// Relay or RPC endpoint unreachable, or it answered with garbage
    Transport,
    /// No terminal relay response before the deadline
    Timeout,
    /// Facade wiring problem (provider set twice, provider missing)
    Configuration,
    /// The remote side (relay or RPC node) reported an error
    Remote,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("contract creation is not supported by the signing bridge")]
    ContractCreation,

    #[error("invalid request parameters: {0}")]
    InvalidParams(String),

    #[error("unknown address - unable to sign {subject} for this address")]
    UnknownAddress {
        address: Option<String>,
        subject: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay returned HTTP {status} for topic {topic}")]
    RelayStatus { topic: String, status: u16 },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("relay reported an error: {0}")]
    Relay(String),

    #[error("no response for topic {topic} after {waited:?}")]
    Timeout { topic: String, waited: Duration },

    #[error("{0} already set")]
    AlreadySet(&'static str),

    #[error("{0} not set")]
    NotSet(&'static str),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("no provider in the chain handled {0}")]
    Unhandled(String),

    #[error("failed to display URI: {0}")]
    Display(String),

    #[error("content store error: {0}")]
    Storage(String),

    #[error("no identity registered for {0}")]
    IdentityNotFound(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::ContractCreation | BridgeError::InvalidParams(_) => ErrorKind::Validation,
            BridgeError::UnknownAddress { .. } => ErrorKind::Authorization,
            BridgeError::Http(_)
            | BridgeError::RelayStatus { .. }
            | BridgeError::Parse(_)
            | BridgeError::Storage(_) => ErrorKind::Transport,
            BridgeError::Timeout { .. } => ErrorKind::Timeout,
            BridgeError::AlreadySet(_)
            | BridgeError::NotSet(_)
            | BridgeError::Unhandled(_)
            | BridgeError::Display(_) => ErrorKind::Configuration,
            BridgeError::Relay(_) | BridgeError::Rpc { .. } | BridgeError::IdentityNotFound(_) => {
                ErrorKind::Remote
            }
        }
    }

    /// Whether a relay poll that failed this way may be retried.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Http(_) | BridgeError::RelayStatus { .. })
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Parse(e.to_string())
    }
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(BridgeError::ContractCreation.kind(), ErrorKind::Validation);
        assert_eq!(
            BridgeError::UnknownAddress { address: None, subject: "transaction" }.kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            BridgeError::Timeout { topic: "t".into(), waited: Duration::from_secs(1) }.kind(),
            ErrorKind::Timeout
        );
        assert_eq!(BridgeError::AlreadySet("web3 provider").kind(), ErrorKind::Configuration);
        assert_eq!(BridgeError::Relay("denied".into()).kind(), ErrorKind::Remote);
        assert_eq!(BridgeError::Parse("eof".into()).kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_unknown_address_message() {
        let err = BridgeError::UnknownAddress {
            address: Some("0xdef".into()),
            subject: "message",
        };
        assert_eq!(
            err.to_string(),
            "unknown address - unable to sign message for this address"
        );
    }
}
