//! Pending-transaction tracker.
//!
//! Every submitted write is recorded here until it confirms or fails.
//! Adding an already tracked hash and removing an unknown hash are both
//! no-ops, so cleanup can run on every exit path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::TxHash;
use serde::{Serialize, Serializer};
use ts_rs::TS;

use crate::bond::BondKey;

/// Category tag of a pending transaction, serialized as
/// `approve_<key>`, `bond_<key>`, `redeem_bond_<key>` or
/// `redeem_bond_<key>_autostake`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnCategory {
    Approve(BondKey),
    Bond(BondKey),
    Redeem { bond: BondKey, autostake: bool },
}

impl fmt::Display for TxnCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve(bond) => write!(formatter, "approve_{bond}"),
            Self::Bond(bond) => write!(formatter, "bond_{bond}"),
            Self::Redeem {
                bond,
                autostake: false,
            } => write!(formatter, "redeem_bond_{bond}"),
            Self::Redeem {
                bond,
                autostake: true,
            } => write!(formatter, "redeem_bond_{bond}_autostake"),
        }
    }
}

impl Serialize for TxnCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(rename_all = "camelCase")]
pub struct PendingTxn {
    #[ts(type = "string")]
    pub tx_hash: TxHash,
    pub text: String,
    #[ts(type = "string")]
    #[serde(rename = "type")]
    pub category: TxnCategory,
}

impl PendingTxn {
    pub fn new(tx_hash: TxHash, text: impl Into<String>, category: TxnCategory) -> Self {
        Self {
            tx_hash,
            text: text.into(),
            category,
        }
    }
}

/// Shared set of in-flight transactions keyed by hash.
#[derive(Debug, Clone, Default)]
pub struct PendingTxns {
    inner: Arc<Mutex<BTreeMap<TxHash, PendingTxn>>>,
}

impl PendingTxns {
    /// Records `txn`. Returns `false` when the hash was already tracked.
    pub fn add(&self, txn: PendingTxn) -> bool {
        let mut pending = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.contains_key(&txn.tx_hash) {
            return false;
        }

        pending.insert(txn.tx_hash, txn);
        true
    }

    /// Forgets `tx_hash`, returning the entry if it was tracked.
    pub fn remove(&self, tx_hash: &TxHash) -> Option<PendingTxn> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tx_hash)
    }

    pub fn contains(&self, tx_hash: &TxHash) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tx_hash)
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
