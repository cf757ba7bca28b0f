//! Action errors and the user-facing alerts they turn into.

use std::fmt;

use bonddesk_evm::EvmError;
use serde::Serialize;
use ts_rs::TS;

use crate::bond::RegistryError;
use crate::units::UnitError;

/// JSON-RPC internal error code that nodes report for reverted calls.
const INTERNAL_ERROR_CODE: i64 = -32603;

/// Revert reason of a checked subtraction underflow in the depository
/// math library. Surfaces when a deposit exceeds the user's balance.
const SUB_UNDERFLOW: &str = "ds-math-sub-underflow";

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("wallet is not connected")]
    WalletNotConnected,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error(transparent)]
    Evm(#[from] EvmError),
    #[error("approval watch ended before an Approval event arrived")]
    ApprovalWatchClosed,
}

impl ActionError {
    /// Message shown to the user when no translation applies: the node's
    /// own error message when there is one, the error text otherwise.
    fn verbatim(&self) -> String {
        match self {
            Self::Evm(error) => error
                .rpc_details()
                .map_or_else(|| error.to_string(), |details| details.message),
            other => other.to_string(),
        }
    }

    fn is_sub_underflow(&self) -> bool {
        let Self::Evm(error) = self else {
            return false;
        };

        error
            .rpc_details()
            .is_some_and(|details| details.matches(INTERNAL_ERROR_CODE, SUB_UNDERFLOW))
    }
}

/// Notification raised on the alert side channel.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Alert {
    WalletNotConnected,
    InsufficientBalance,
    #[serde(rename_all = "camelCase")]
    MaxPayoutExceeded { max_payout: f64, symbol: String },
    Failed(String),
}

impl Alert {
    /// Alert for a failed action, carrying the error message verbatim.
    pub fn from_error(error: &ActionError) -> Self {
        match error {
            ActionError::WalletNotConnected => Self::WalletNotConnected,
            other => Self::Failed(other.verbatim()),
        }
    }

    /// Alert for a failed deposit. A subtraction underflow in the
    /// depository means the user tried to bond more than they hold.
    pub fn from_deposit_error(error: &ActionError) -> Self {
        if error.is_sub_underflow() {
            Self::InsufficientBalance
        } else {
            Self::from_error(error)
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WalletNotConnected => formatter.write_str("Please connect your wallet!"),
            Self::InsufficientBalance => write!(
                formatter,
                "You may be trying to bond more than your balance! Error code: {}. Message: {SUB_UNDERFLOW}",
                -INTERNAL_ERROR_CODE
            ),
            Self::MaxPayoutExceeded { max_payout, symbol } => write!(
                formatter,
                "You're trying to bond more than the maximum payout available! \
                 The maximum bond payout is {max_payout:.2} {symbol}."
            ),
            Self::Failed(message) => formatter.write_str(message),
        }
    }
}
