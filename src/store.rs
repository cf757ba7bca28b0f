//! Client-side store interface.
//!
//! Actions publish [`StoreAction`]s and [`Alert`]s on broadcast channels;
//! whatever renders the UI subscribes and applies them. The dispatcher
//! also owns the pending-transaction tracker so every tracked write is
//! announced and cleared through the same channel.

use alloy::primitives::TxHash;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::bond::BondKey;
use crate::error::Alert;

mod pending;

pub use pending::{PendingTxn, PendingTxns, TxnCategory};

/// Number of undelivered messages a slow subscriber may fall behind by.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum StoreAction {
    FetchAccountSuccess(AccountBondUpdate),
    FetchPendingTxns(PendingTxn),
    ClearPendingTxn(ClearedTxn),
    #[serde(rename = "calculateUserBondDetails")]
    UserBondDetails(UserBondDetails),
    #[serde(rename = "getBalances")]
    Balances(Balances),
    BondDetails(BondDetails),
}

/// Allowance and balance of a bond's reserve token after an approval.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(rename_all = "camelCase")]
pub struct AccountBondUpdate {
    pub bond: BondKey,
    pub allowance: f64,
    pub balance: f64,
    pub raw_balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(rename_all = "camelCase")]
pub struct ClearedTxn {
    #[ts(type = "string")]
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(rename_all = "camelCase")]
pub struct UserBondDetails {
    pub bond: BondKey,
    pub allowance: f64,
    pub balance: f64,
    pub raw_balance: String,
    pub interest_due: f64,
    #[ts(type = "number")]
    pub bond_maturation_time: u64,
    pub pending_payout: String,
}

/// Protocol token holdings, formatted with 9 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub protocol_token: String,
    pub staked_protocol_token: String,
}

/// Display values of one bond market, recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(rename_all = "camelCase")]
pub struct BondDetails {
    pub bond: BondKey,
    pub bond_discount: f64,
    pub debt_ratio: f64,
    pub bond_quote: f64,
    pub purchased: f64,
    #[ts(type = "number")]
    pub vesting_term: u64,
    pub max_payout: f64,
    pub bond_price: f64,
    pub market_price: String,
    pub max_user_can_buy: String,
}

impl BondDetails {
    /// Placeholder shown for retired bonds. No chain data is read.
    pub fn deprecated(bond: BondKey) -> Self {
        Self {
            bond,
            bond_discount: 1.0,
            debt_ratio: 1.0,
            bond_quote: 1.0,
            purchased: 1.0,
            vesting_term: 1,
            max_payout: 1.0,
            bond_price: 1.0,
            market_price: "0.0".to_owned(),
            max_user_can_buy: "0.0".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    actions: broadcast::Sender<StoreAction>,
    alerts: broadcast::Sender<Alert>,
    pending: PendingTxns,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        let (actions, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);

        Self {
            actions,
            alerts,
            pending: PendingTxns::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreAction> {
        self.actions.subscribe()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.alerts.subscribe()
    }

    pub fn pending(&self) -> &PendingTxns {
        &self.pending
    }

    pub fn dispatch(&self, action: StoreAction) {
        if self.actions.send(action).is_err() {
            debug!("No store subscribers, dropping action");
        }
    }

    pub fn alert(&self, alert: Alert) {
        warn!(%alert, "Alert raised");

        if self.alerts.send(alert).is_err() {
            debug!("No alert subscribers, dropping alert");
        }
    }

    /// Starts tracking a submitted transaction. The entry is cleared
    /// when the returned guard is dropped.
    #[must_use = "dropping the guard clears the pending transaction immediately"]
    pub fn track(&self, txn: PendingTxn) -> PendingGuard {
        let tx_hash = txn.tx_hash;
        if self.pending.add(txn.clone()) {
            self.dispatch(StoreAction::FetchPendingTxns(txn));
        }

        PendingGuard {
            dispatcher: self.clone(),
            tx_hash,
        }
    }

    /// Stops tracking `tx_hash`. Unknown hashes are ignored.
    pub fn clear(&self, tx_hash: TxHash) {
        if self.pending.remove(&tx_hash).is_some() {
            self.dispatch(StoreAction::ClearPendingTxn(ClearedTxn { tx_hash }));
        }
    }
}

/// Clears its pending transaction on drop, whichever way the action
/// leaves the scope.
#[derive(Debug)]
pub struct PendingGuard {
    dispatcher: Dispatcher,
    tx_hash: TxHash,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.dispatcher.clear(self.tx_hash);
    }
}
