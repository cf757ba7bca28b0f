//! In-memory chain doubles for action tests.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, I256, TxHash, U256};
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use bonddesk_evm::EvmError;
use tokio::sync::oneshot;

use super::{ApprovalWatch, BondChain, BondInfo, BondSigner};

pub(crate) fn node_error(code: i64, message: &'static str) -> EvmError {
    EvmError::Transport(RpcError::ErrorResp(ErrorPayload {
        code,
        message: message.into(),
        data: None,
    }))
}

fn unavailable() -> EvmError {
    EvmError::Transport(TransportError::local_usage_str("rpc unavailable"))
}

/// Canned contract state. Every read is appended to `calls`.
#[derive(Debug, Default)]
pub(crate) struct MockChain {
    pub(crate) bond_price: U256,
    pub(crate) bond_price_in_usd: U256,
    /// `payoutFor` answers keyed by input value.
    pub(crate) payouts: HashMap<U256, U256>,
    pub(crate) max_payout: U256,
    pub(crate) debt_ratio: U256,
    pub(crate) vesting_term: U256,
    pub(crate) bond_info: BondInfo,
    pub(crate) pending_payout: U256,
    /// `valuation` answers keyed by amount.
    pub(crate) valuations: HashMap<U256, U256>,
    pub(crate) markdown: U256,
    pub(crate) balances: HashMap<(Address, Address), U256>,
    pub(crate) allowance: U256,
    pub(crate) oracle_answer: I256,
    pub(crate) reserves: (U256, U256),
    /// Makes every read fail with a transport error.
    pub(crate) offline: bool,
    pub(crate) calls: Mutex<Vec<&'static str>>,
}

impl MockChain {
    fn record(&self, call: &'static str) -> Result<(), EvmError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);

        if self.offline { Err(unavailable()) } else { Ok(()) }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BondChain for MockChain {
    async fn bond_price(&self, _bond: Address) -> Result<U256, EvmError> {
        self.record("bondPrice")?;
        Ok(self.bond_price)
    }

    async fn bond_price_in_usd(&self, _bond: Address) -> Result<U256, EvmError> {
        self.record("bondPriceInUSD")?;
        Ok(self.bond_price_in_usd)
    }

    async fn payout_for(&self, _bond: Address, value: U256) -> Result<U256, EvmError> {
        self.record("payoutFor")?;
        Ok(self.payouts.get(&value).copied().unwrap_or_default())
    }

    async fn max_payout(&self, _bond: Address) -> Result<U256, EvmError> {
        self.record("maxPayout")?;
        Ok(self.max_payout)
    }

    async fn standardized_debt_ratio(&self, _bond: Address) -> Result<U256, EvmError> {
        self.record("standardizedDebtRatio")?;
        Ok(self.debt_ratio)
    }

    async fn vesting_term(&self, _bond: Address) -> Result<U256, EvmError> {
        self.record("terms")?;
        Ok(self.vesting_term)
    }

    async fn bond_info(&self, _bond: Address, _depositor: Address) -> Result<BondInfo, EvmError> {
        self.record("bondInfo")?;
        Ok(self.bond_info)
    }

    async fn pending_payout_for(
        &self,
        _bond: Address,
        _depositor: Address,
    ) -> Result<U256, EvmError> {
        self.record("pendingPayoutFor")?;
        Ok(self.pending_payout)
    }

    async fn valuation(
        &self,
        _calculator: Address,
        _pair: Address,
        amount: U256,
    ) -> Result<U256, EvmError> {
        self.record("valuation")?;
        Ok(self.valuations.get(&amount).copied().unwrap_or_default())
    }

    async fn markdown(&self, _calculator: Address, _pair: Address) -> Result<U256, EvmError> {
        self.record("markdown")?;
        Ok(self.markdown)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, EvmError> {
        self.record("balanceOf")?;
        Ok(self.balances.get(&(token, owner)).copied().unwrap_or_default())
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, EvmError> {
        self.record("allowance")?;
        Ok(self.allowance)
    }

    async fn latest_answer(&self, _oracle: Address) -> Result<I256, EvmError> {
        self.record("latestRoundData")?;
        Ok(self.oracle_answer)
    }

    async fn pair_reserves(
        &self,
        _pair: Address,
        _protocol_token: Address,
    ) -> Result<(U256, U256), EvmError> {
        self.record("getReserves")?;
        Ok(self.reserves)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Submitted {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Deposit {
        bond: Address,
        amount: U256,
        max_price: U256,
        depositor: Address,
    },
    Redeem {
        bond: Address,
        recipient: Address,
        stake: bool,
    },
}

/// Wallet double. Submissions succeed with [`MockSigner::TX_HASH`]
/// unless a rejection is configured.
#[derive(Debug)]
pub(crate) struct MockSigner {
    pub(crate) address: Address,
    /// Value delivered to the approval watch once `approve` is submitted.
    /// `None` closes the watch without an event.
    pub(crate) approved_amount: Option<U256>,
    /// Keeps the approval watch open without ever delivering an event.
    pub(crate) withhold_approval: bool,
    pub(crate) reject_submit: Option<(i64, &'static str)>,
    pub(crate) reject_confirm: Option<(i64, &'static str)>,
    /// Makes `confirm` report the transaction as mined and reverted.
    pub(crate) revert_confirm: bool,
    pub(crate) submitted: Mutex<Vec<Submitted>>,
    pub(crate) watch_registered: Mutex<bool>,
    watcher: Mutex<Option<oneshot::Sender<U256>>>,
}

impl MockSigner {
    pub(crate) const TX_HASH: TxHash = TxHash::repeat_byte(0xab);

    pub(crate) fn new(address: Address) -> Self {
        Self {
            address,
            approved_amount: Some(U256::MAX),
            withhold_approval: false,
            reject_submit: None,
            reject_confirm: None,
            revert_confirm: false,
            submitted: Mutex::new(Vec::new()),
            watch_registered: Mutex::new(false),
            watcher: Mutex::new(None),
        }
    }

    pub(crate) fn submitted(&self) -> Vec<Submitted> {
        self.submitted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Whether a watch was registered and its receiving side is gone.
    pub(crate) fn watch_released(&self) -> bool {
        let registered = *self
            .watch_registered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        registered && watcher.as_ref().is_none_or(oneshot::Sender::is_closed)
    }

    fn submit(&self, call: Submitted) -> Result<TxHash, EvmError> {
        if let Some((code, message)) = self.reject_submit {
            return Err(node_error(code, message));
        }

        self.submitted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);

        Ok(Self::TX_HASH)
    }
}

#[async_trait]
impl BondSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, EvmError> {
        let tx_hash = self.submit(Submitted::Approve {
            token,
            spender,
            amount,
        })?;

        let mut watcher = self
            .watcher
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match self.approved_amount {
            _ if self.withhold_approval => {}
            Some(value) => {
                if let Some(sender) = watcher.take() {
                    sender.send(value).ok();
                }
            }
            None => {
                watcher.take();
            }
        }

        Ok(tx_hash)
    }

    async fn deposit(
        &self,
        bond: Address,
        amount: U256,
        max_price: U256,
        depositor: Address,
    ) -> Result<TxHash, EvmError> {
        self.submit(Submitted::Deposit {
            bond,
            amount,
            max_price,
            depositor,
        })
    }

    async fn redeem(
        &self,
        bond: Address,
        recipient: Address,
        stake: bool,
    ) -> Result<TxHash, EvmError> {
        self.submit(Submitted::Redeem {
            bond,
            recipient,
            stake,
        })
    }

    async fn confirm(&self, tx_hash: TxHash, _note: &str) -> Result<(), EvmError> {
        if self.revert_confirm {
            return Err(EvmError::Reverted { tx_hash });
        }

        match self.reject_confirm {
            Some((code, message)) => Err(node_error(code, message)),
            None => Ok(()),
        }
    }

    async fn watch_approval(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<ApprovalWatch, EvmError> {
        let (sender, receiver) = oneshot::channel();
        *self
            .watcher
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(sender);
        *self
            .watch_registered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = true;

        Ok(ApprovalWatch::new(receiver, None))
    }
}
