//! [`BondSigner`] over a [`Wallet`].

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bonddesk_evm::{Evm, EvmError, Wallet};
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::{ApprovalWatch, BondSigner};
use crate::bindings::{IBondDepository, IERC20};

#[derive(Debug, Clone)]
pub struct WalletSigner<W> {
    wallet: W,
}

impl<W: Wallet> WalletSigner<W> {
    pub fn new(wallet: W) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl<W: Wallet> BondSigner for WalletSigner<W> {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, EvmError> {
        let calldata = IERC20::approveCall { spender, amount }.abi_encode();
        self.wallet.submit(token, calldata.into(), "approve").await
    }

    async fn deposit(
        &self,
        bond: Address,
        amount: U256,
        max_price: U256,
        depositor: Address,
    ) -> Result<TxHash, EvmError> {
        let calldata = IBondDepository::depositCall {
            amount,
            maxPrice: max_price,
            depositor,
        }
        .abi_encode();

        self.wallet.submit(bond, calldata.into(), "bond deposit").await
    }

    async fn redeem(
        &self,
        bond: Address,
        recipient: Address,
        stake: bool,
    ) -> Result<TxHash, EvmError> {
        let calldata = IBondDepository::redeemCall { recipient, stake }.abi_encode();
        self.wallet.submit(bond, calldata.into(), "bond redeem").await
    }

    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<(), EvmError> {
        self.wallet.confirm(tx_hash, note).await?;
        Ok(())
    }

    async fn watch_approval(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<ApprovalWatch, EvmError> {
        let reserve = IERC20::new(token, self.wallet.provider().clone());
        let poller = reserve
            .Approval_filter()
            .topic1(owner.into_word())
            .topic2(spender.into_word())
            .watch()
            .await?;

        info!(%token, %owner, %spender, "Watching for Approval");

        let (sender, receiver) = oneshot::channel();
        let listener = tokio::spawn(async move {
            let mut events = poller.into_stream();

            while let Some(event) = events.next().await {
                match event {
                    Ok((approval, _)) if approval.owner == owner && approval.spender == spender => {
                        if sender.send(approval.value).is_err() {
                            debug!("Approval watch dropped before the event arrived");
                        }
                        return;
                    }
                    Ok(_) => {}
                    Err(error) => warn!(%error, "Failed to decode Approval log"),
                }
            }
        });

        Ok(ApprovalWatch::new(receiver, Some(listener)))
    }
}
