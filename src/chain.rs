//! Seams between the actions and the chain.
//!
//! [`BondChain`] covers every contract read the actions make and
//! [`BondSigner`] every write plus the approval watch. The alloy-backed
//! implementations live in [`reader`] and [`signer`]; tests use the
//! in-memory doubles from `mock`.

use alloy::primitives::{Address, I256, TxHash, U256};
use async_trait::async_trait;
use bonddesk_evm::EvmError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub mod reader;
pub mod signer;

#[cfg(test)]
pub(crate) mod mock;

pub use reader::ChainReader;
pub use signer::WalletSigner;

/// A depositor's vesting position in one bond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BondInfo {
    pub payout: U256,
    pub vesting: U256,
    pub last_timestamp: U256,
    pub price_paid: U256,
}

#[async_trait]
pub trait BondChain: Send + Sync {
    async fn bond_price(&self, bond: Address) -> Result<U256, EvmError>;

    async fn bond_price_in_usd(&self, bond: Address) -> Result<U256, EvmError>;

    async fn payout_for(&self, bond: Address, value: U256) -> Result<U256, EvmError>;

    async fn max_payout(&self, bond: Address) -> Result<U256, EvmError>;

    async fn standardized_debt_ratio(&self, bond: Address) -> Result<U256, EvmError>;

    /// Vesting term from the bond's current terms.
    async fn vesting_term(&self, bond: Address) -> Result<U256, EvmError>;

    async fn bond_info(&self, bond: Address, depositor: Address) -> Result<BondInfo, EvmError>;

    async fn pending_payout_for(&self, bond: Address, depositor: Address)
    -> Result<U256, EvmError>;

    async fn valuation(
        &self,
        calculator: Address,
        pair: Address,
        amount: U256,
    ) -> Result<U256, EvmError>;

    async fn markdown(&self, calculator: Address, pair: Address) -> Result<U256, EvmError>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, EvmError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, EvmError>;

    /// Latest answer of a Chainlink price feed.
    async fn latest_answer(&self, oracle: Address) -> Result<I256, EvmError>;

    /// Reserves of `pair` ordered as `(protocol_token, other)`.
    async fn pair_reserves(
        &self,
        pair: Address,
        protocol_token: Address,
    ) -> Result<(U256, U256), EvmError>;
}

/// Write access. Submissions return once the node accepted the
/// transaction; [`BondSigner::confirm`] waits for it to be mined.
#[async_trait]
pub trait BondSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, EvmError>;

    async fn deposit(
        &self,
        bond: Address,
        amount: U256,
        max_price: U256,
        depositor: Address,
    ) -> Result<TxHash, EvmError>;

    async fn redeem(
        &self,
        bond: Address,
        recipient: Address,
        stake: bool,
    ) -> Result<TxHash, EvmError>;

    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<(), EvmError>;

    /// Starts listening for `Approval(owner, spender)` on `token`. The
    /// listener is active once this returns, so it must be called before
    /// the approval is submitted.
    async fn watch_approval(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<ApprovalWatch, EvmError>;
}

/// One-shot subscription to an `Approval` event.
///
/// Dropping the watch stops the listener.
#[derive(Debug)]
pub struct ApprovalWatch {
    receiver: oneshot::Receiver<U256>,
    _listener: Option<Listener>,
}

#[derive(Debug)]
struct Listener(JoinHandle<()>);

impl Drop for Listener {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ApprovalWatch {
    pub(crate) fn new(receiver: oneshot::Receiver<U256>, listener: Option<JoinHandle<()>>) -> Self {
        Self {
            receiver,
            _listener: listener.map(Listener),
        }
    }

    /// Waits for the first matching event and returns the approved amount.
    pub async fn approved(self) -> Result<U256, oneshot::error::RecvError> {
        self.receiver.await
    }
}
