use alloy::primitives::U256;
use tracing::{debug, info};

use super::{BondActions, ChangeApproval};
use crate::chain::{BondChain, BondSigner};
use crate::error::{ActionError, Alert};
use crate::store::{AccountBondUpdate, PendingTxn, StoreAction, TxnCategory};
use crate::units;

impl<C: BondChain> BondActions<C> {
    /// Grants the bond depository an unlimited allowance on the bond's
    /// reserve token and refreshes the user's allowance and balance.
    #[tracing::instrument(skip_all, fields(bond = %request.bond, network = request.network))]
    pub async fn change_approval<S: BondSigner + ?Sized>(
        &self,
        signer: Option<&S>,
        request: &ChangeApproval,
    ) -> Result<AccountBondUpdate, ActionError> {
        let result = self.try_change_approval(signer, request).await;
        self.report(result, Alert::from_error)
    }

    async fn try_change_approval<S: BondSigner + ?Sized>(
        &self,
        signer: Option<&S>,
        request: &ChangeApproval,
    ) -> Result<AccountBondUpdate, ActionError> {
        let signer = signer.ok_or(ActionError::WalletNotConnected)?;
        let bond = self.registry.resolve(&request.bond, request.network)?;

        let watch = signer
            .watch_approval(bond.reserve(), request.address, bond.depository())
            .await?;
        let tx_hash = signer
            .approve(bond.reserve(), bond.depository(), U256::MAX)
            .await?;

        let pending = self.dispatcher.track(PendingTxn::new(
            tx_hash,
            format!("Approving {}", bond.name()),
            TxnCategory::Approve(bond.key().clone()),
        ));
        let approved = watch.approved();
        tokio::pin!(approved);
        let allowance = tokio::select! {
            biased;
            allowance = &mut approved => {
                allowance.map_err(|_| ActionError::ApprovalWatchClosed)?
            }
            confirmed = signer.confirm(tx_hash, "approve") => {
                confirmed?;
                debug!(%tx_hash, "Approval mined before its event was seen");
                self.chain
                    .allowance(bond.reserve(), request.address, bond.depository())
                    .await?
            }
        };
        drop(pending);

        info!(%tx_hash, %allowance, "Approval observed");

        let raw_balance = self
            .chain
            .balance_of(bond.reserve(), request.address)
            .await?;

        let update = AccountBondUpdate {
            bond: bond.key().clone(),
            allowance: f64::from(allowance),
            balance: units::token_amount(raw_balance),
            raw_balance: raw_balance.to_string(),
        };
        self.dispatcher
            .dispatch(StoreAction::FetchAccountSuccess(update.clone()));

        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bonddesk_evm::EvmError;
    use tracing_test::traced_test;

    use super::*;
    use crate::actions::test_support::{USER, actions, drain};
    use crate::bond::BondKey;
    use crate::bond::tests::{CHAIN_ID, stable_bond};
    use crate::chain::mock::{MockChain, MockSigner, Submitted};
    use crate::store::ClearedTxn;

    fn request() -> ChangeApproval {
        ChangeApproval {
            bond: BondKey::new("mai"),
            network: CHAIN_ID,
            address: USER,
        }
    }

    fn chain_with_balance() -> MockChain {
        let mut chain = MockChain::default();
        chain.balances.insert(
            (stable_bond().reserve, USER),
            U256::from(2_500_000_000_000_000_000u128),
        );
        chain
    }

    #[tokio::test]
    async fn without_wallet_nothing_is_submitted() {
        let actions = actions(chain_with_balance(), vec![stable_bond()]);
        let mut store = actions.dispatcher().subscribe();
        let mut alerts = actions.dispatcher().subscribe_alerts();

        let result = actions
            .change_approval::<MockSigner>(None, &request())
            .await;

        assert!(matches!(result, Err(ActionError::WalletNotConnected)));
        assert_eq!(drain(&mut alerts), vec![Alert::WalletNotConnected]);
        assert!(drain(&mut store).is_empty());
        assert!(actions.chain.calls().is_empty());
    }

    #[tokio::test]
    async fn approval_updates_allowance_and_balance() {
        let actions = actions(chain_with_balance(), vec![stable_bond()]);
        let signer = MockSigner::new(USER);
        let mut store = actions.dispatcher().subscribe();

        let update = actions
            .change_approval(Some(&signer), &request())
            .await
            .unwrap();

        assert_eq!(
            signer.submitted(),
            vec![Submitted::Approve {
                token: stable_bond().reserve,
                spender: stable_bond().address,
                amount: U256::MAX,
            }]
        );
        assert_eq!(update.raw_balance, "2500000000000000000");
        assert!((update.balance - 2.5).abs() < 1e-12);
        assert!(update.allowance > 1e76);

        let actions_seen = drain(&mut store);
        assert!(matches!(
            &actions_seen[..],
            [
                StoreAction::FetchPendingTxns(txn),
                StoreAction::ClearPendingTxn(ClearedTxn { tx_hash }),
                StoreAction::FetchAccountSuccess(account),
            ] if txn.text == "Approving MAI"
                && txn.category.to_string() == "approve_mai"
                && *tx_hash == MockSigner::TX_HASH
                && *account == update
        ));
        assert!(signer.watch_released());
    }

    #[tokio::test]
    async fn rejected_approval_alerts_and_releases_watch() {
        let actions = actions(chain_with_balance(), vec![stable_bond()]);
        let mut signer = MockSigner::new(USER);
        signer.reject_submit = Some((4001, "User denied transaction signature"));
        let mut store = actions.dispatcher().subscribe();
        let mut alerts = actions.dispatcher().subscribe_alerts();

        let result = actions.change_approval(Some(&signer), &request()).await;

        assert!(result.is_err());
        assert_eq!(
            drain(&mut alerts),
            vec![Alert::Failed("User denied transaction signature".to_owned())]
        );
        assert!(drain(&mut store).is_empty());
        assert!(signer.watch_released());
        assert!(actions.dispatcher().pending().is_empty());
    }

    #[traced_test]
    #[tokio::test]
    async fn closed_watch_clears_pending_entry() {
        let actions = actions(chain_with_balance(), vec![stable_bond()]);
        let mut signer = MockSigner::new(USER);
        signer.approved_amount = None;

        let result = actions.change_approval(Some(&signer), &request()).await;

        assert!(matches!(result, Err(ActionError::ApprovalWatchClosed)));
        assert!(actions.dispatcher().pending().is_empty());
        assert!(!actions.chain.calls().contains(&"balanceOf"));
        assert!(logs_contain("Bond action failed"));
    }

    #[tokio::test]
    async fn reverted_approval_without_event_fails() {
        let actions = actions(chain_with_balance(), vec![stable_bond()]);
        let mut signer = MockSigner::new(USER);
        signer.withhold_approval = true;
        signer.revert_confirm = true;
        let mut store = actions.dispatcher().subscribe();
        let mut alerts = actions.dispatcher().subscribe_alerts();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            actions.change_approval(Some(&signer), &request()),
        )
        .await
        .expect("approval should settle once the transaction reverts");

        assert!(matches!(
            result,
            Err(ActionError::Evm(EvmError::Reverted { tx_hash })) if tx_hash == MockSigner::TX_HASH
        ));
        assert_eq!(
            drain(&mut alerts),
            vec![Alert::Failed(format!(
                "transaction reverted: {}",
                MockSigner::TX_HASH
            ))]
        );
        assert!(matches!(
            &drain(&mut store)[..],
            [
                StoreAction::FetchPendingTxns(_),
                StoreAction::ClearPendingTxn(_),
            ]
        ));
        assert!(actions.dispatcher().pending().is_empty());
        assert!(signer.watch_released());
    }

    #[tokio::test]
    async fn mined_approval_without_event_reads_allowance() {
        let mut chain = chain_with_balance();
        chain.allowance = U256::from(7_000_000_000_000_000_000u128);
        let actions = actions(chain, vec![stable_bond()]);
        let mut signer = MockSigner::new(USER);
        signer.withhold_approval = true;

        let update = tokio::time::timeout(
            Duration::from_secs(5),
            actions.change_approval(Some(&signer), &request()),
        )
        .await
        .expect("approval should settle once the transaction is mined")
        .unwrap();

        assert!((update.allowance - 7e18).abs() < 1.0);
        assert!(actions.chain.calls().contains(&"allowance"));
        assert!(actions.dispatcher().pending().is_empty());
    }

    #[tokio::test]
    async fn unknown_bond_is_alerted() {
        let actions = actions(chain_with_balance(), vec![stable_bond()]);
        let signer = MockSigner::new(USER);
        let mut alerts = actions.dispatcher().subscribe_alerts();

        let result = actions
            .change_approval(
                Some(&signer),
                &ChangeApproval {
                    bond: BondKey::new("dai"),
                    ..request()
                },
            )
            .await;

        assert!(matches!(result, Err(ActionError::Registry(_))));
        assert_eq!(
            drain(&mut alerts),
            vec![Alert::Failed("bond dai is not configured on network 137".to_owned())]
        );
        assert!(signer.submitted().is_empty());
    }
}
