//! Asynchronous bond actions.
//!
//! Each action resolves the bond's contracts, talks to the chain through
//! [`BondChain`] (and [`BondSigner`](crate::chain::BondSigner) for
//! writes), converts raw integers with [`crate::units`], and publishes
//! the outcome through the [`Dispatcher`]. Failures are raised as
//! [`Alert`]s and also returned to the caller.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use tracing::error;

use crate::bond::{BondKey, BondRegistry};
use crate::chain::BondChain;
use crate::error::{ActionError, Alert};
use crate::store::Dispatcher;

mod account;
mod approve;
mod details;
mod purchase;
mod redeem;

#[derive(Debug, Clone)]
pub struct ChangeApproval {
    pub bond: BondKey,
    pub network: u64,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct CalcBondDetails {
    pub bond: BondKey,
    /// Amount typed by the user, in reserve token units. `None` or empty
    /// quotes a small default amount.
    pub value: Option<String>,
    pub network: u64,
    /// Raw reserve token balance of the user.
    pub user_balance: U256,
}

#[derive(Debug, Clone)]
pub struct BondAsset {
    pub value: String,
    pub address: Address,
    pub bond: BondKey,
    pub network: u64,
    /// Accepted price increase in percent; zero selects the default.
    pub slippage: Decimal,
}

#[derive(Debug, Clone)]
pub struct RedeemBond {
    pub address: Address,
    pub bond: BondKey,
    pub network: u64,
    pub autostake: bool,
}

/// Entry point for every bond action.
pub struct BondActions<C> {
    chain: C,
    registry: Arc<BondRegistry>,
    dispatcher: Dispatcher,
}

impl<C: BondChain> BondActions<C> {
    pub fn new(chain: C, registry: Arc<BondRegistry>, dispatcher: Dispatcher) -> Self {
        Self {
            chain,
            registry,
            dispatcher,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Raises an alert for a failed action and hands the result back.
    fn report<T>(
        &self,
        result: Result<T, ActionError>,
        to_alert: fn(&ActionError) -> Alert,
    ) -> Result<T, ActionError> {
        if let Err(error) = &result {
            error!(%error, "Bond action failed");
            self.dispatcher.alert(to_alert(error));
        }

        result
    }
}
