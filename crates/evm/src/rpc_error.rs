//! JSON-RPC error inspection.
//!
//! Wallets and nodes report contract reverts as JSON-RPC error
//! responses. Callers that need to recognize a specific failure (an
//! error code together with a message fragment) read it through
//! [`EvmError::rpc_details`] instead of matching on the nested alloy
//! error types.

use alloy::providers::PendingTransactionError;
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::transports::{RpcError, TransportErrorKind};

use crate::EvmError;

/// Code and message of a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcErrorDetails {
    pub code: i64,
    pub message: String,
}

impl RpcErrorDetails {
    fn from_payload(payload: &ErrorPayload) -> Self {
        Self {
            code: payload.code,
            message: payload.message.to_string(),
        }
    }

    /// Whether this is an error with `code` whose message mentions `fragment`.
    pub fn matches(&self, code: i64, fragment: &str) -> bool {
        self.code == code && self.message.contains(fragment)
    }
}

fn transport_details(err: &RpcError<TransportErrorKind>) -> Option<RpcErrorDetails> {
    err.as_error_resp().map(RpcErrorDetails::from_payload)
}

impl EvmError {
    /// Returns the JSON-RPC error response behind this error, if the node
    /// answered with one.
    pub fn rpc_details(&self) -> Option<RpcErrorDetails> {
        match self {
            Self::Transport(err) => transport_details(err),
            Self::Contract(alloy::contract::Error::TransportError(err)) => transport_details(err),
            Self::Transaction(PendingTransactionError::TransportError(err)) => {
                transport_details(err)
            }
            _ => None,
        }
    }
}
