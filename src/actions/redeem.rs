use tracing::{debug, info};

use super::{BondActions, RedeemBond};
use crate::chain::{BondChain, BondSigner};
use crate::error::{ActionError, Alert};
use crate::store::{PendingTxn, TxnCategory};

impl<C: BondChain> BondActions<C> {
    /// Claims the vested payout of a bond, optionally staking it.
    #[tracing::instrument(skip_all, fields(bond = %request.bond, network = request.network))]
    pub async fn redeem_bond<S: BondSigner + ?Sized>(
        &self,
        signer: Option<&S>,
        request: &RedeemBond,
    ) -> Result<(), ActionError> {
        let result = self.try_redeem_bond(signer, request).await;
        self.report(result, Alert::from_error)
    }

    async fn try_redeem_bond<S: BondSigner + ?Sized>(
        &self,
        signer: Option<&S>,
        request: &RedeemBond,
    ) -> Result<(), ActionError> {
        let signer = signer.ok_or(ActionError::WalletNotConnected)?;
        let bond = self.registry.resolve(&request.bond, request.network)?;

        let tx_hash = signer
            .redeem(bond.depository(), request.address, request.autostake)
            .await?;
        let _pending = self.dispatcher.track(PendingTxn::new(
            tx_hash,
            format!("Redeeming {}", bond.name()),
            TxnCategory::Redeem {
                bond: bond.key().clone(),
                autostake: request.autostake,
            },
        ));

        signer.confirm(tx_hash, "bond redeem").await?;
        info!(%tx_hash, autostake = request.autostake, "Bond redeemed");

        if let Err(error) = self
            .calculate_user_bond_details(request.address, &request.bond, request.network)
            .await
        {
            debug!(%error, "User bond refresh after redeem failed");
        }
        if let Err(error) = self.get_balances(request.address, request.network).await {
            debug!(%error, "Balance refresh after redeem failed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{USER, actions, drain};
    use crate::bond::BondKey;
    use crate::bond::tests::{CHAIN_ID, lp_bond};
    use crate::chain::mock::{MockChain, MockSigner, Submitted};
    use crate::store::StoreAction;

    fn request(autostake: bool) -> RedeemBond {
        RedeemBond {
            address: USER,
            bond: BondKey::new("mai_clam"),
            network: CHAIN_ID,
            autostake,
        }
    }

    #[tokio::test]
    async fn redeem_refreshes_bond_then_balances() {
        let actions = actions(MockChain::default(), vec![lp_bond()]);
        let signer = MockSigner::new(USER);
        let mut store = actions.dispatcher().subscribe();

        actions
            .redeem_bond(Some(&signer), &request(false))
            .await
            .unwrap();

        assert_eq!(
            signer.submitted(),
            vec![Submitted::Redeem {
                bond: lp_bond().address,
                recipient: USER,
                stake: false,
            }]
        );
        assert!(matches!(
            &drain(&mut store)[..],
            [
                StoreAction::FetchPendingTxns(txn),
                StoreAction::UserBondDetails(_),
                StoreAction::Balances(_),
                StoreAction::ClearPendingTxn(_),
            ] if txn.text == "Redeeming MAI-CLAM LP"
                && txn.category.to_string() == "redeem_bond_mai_clam"
        ));
    }

    #[tokio::test]
    async fn autostake_is_tagged() {
        let actions = actions(MockChain::default(), vec![lp_bond()]);
        let signer = MockSigner::new(USER);
        let mut store = actions.dispatcher().subscribe();

        actions
            .redeem_bond(Some(&signer), &request(true))
            .await
            .unwrap();

        let seen = drain(&mut store);
        assert!(matches!(
            seen.first(),
            Some(StoreAction::FetchPendingTxns(txn))
                if txn.category.to_string() == "redeem_bond_mai_clam_autostake"
        ));
        assert!(matches!(
            &signer.submitted()[..],
            [Submitted::Redeem { stake: true, .. }]
        ));
    }

    #[tokio::test]
    async fn without_wallet_alerts() {
        let actions = actions(MockChain::default(), vec![lp_bond()]);
        let mut alerts = actions.dispatcher().subscribe_alerts();
        let mut store = actions.dispatcher().subscribe();

        let result = actions
            .redeem_bond::<MockSigner>(None, &request(false))
            .await;

        assert!(matches!(result, Err(ActionError::WalletNotConnected)));
        assert_eq!(drain(&mut alerts), vec![Alert::WalletNotConnected]);
        assert!(drain(&mut store).is_empty());
    }

    #[tokio::test]
    async fn reverted_redeem_is_alerted_and_cleared() {
        let actions = actions(MockChain::default(), vec![lp_bond()]);
        let mut signer = MockSigner::new(USER);
        signer.reject_confirm = Some((3, "execution reverted"));
        let mut alerts = actions.dispatcher().subscribe_alerts();

        let result = actions.redeem_bond(Some(&signer), &request(false)).await;

        assert!(result.is_err());
        assert_eq!(
            drain(&mut alerts),
            vec![Alert::Failed("execution reverted".to_owned())]
        );
        assert!(actions.dispatcher().pending().is_empty());
        assert!(!actions.chain.calls().contains(&"bondInfo"));
    }
}
