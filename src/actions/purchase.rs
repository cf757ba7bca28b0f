use tracing::{debug, info};

use super::{BondActions, BondAsset};
use crate::chain::{BondChain, BondSigner};
use crate::error::{ActionError, Alert};
use crate::store::{PendingTxn, TxnCategory};
use crate::units;

impl<C: BondChain> BondActions<C> {
    /// Deposits `request.value` reserve tokens into the bond, accepting
    /// a bond price up to the slippage tolerance above the current one.
    #[tracing::instrument(skip_all, fields(bond = %request.bond, network = request.network))]
    pub async fn bond_asset<S: BondSigner + ?Sized>(
        &self,
        signer: Option<&S>,
        request: &BondAsset,
    ) -> Result<(), ActionError> {
        let result = self.try_bond_asset(signer, request).await;
        self.report(result, Alert::from_deposit_error)
    }

    async fn try_bond_asset<S: BondSigner + ?Sized>(
        &self,
        signer: Option<&S>,
        request: &BondAsset,
    ) -> Result<(), ActionError> {
        let signer = signer.ok_or(ActionError::WalletNotConnected)?;
        let bond = self.registry.resolve(&request.bond, request.network)?;

        let amount = units::parse_token_amount(&request.value)?;
        let bond_price = self.chain.bond_price(bond.depository()).await?;
        let max_price = units::max_price_with_slippage(bond_price, request.slippage)?;

        let tx_hash = signer
            .deposit(bond.depository(), amount, max_price, request.address)
            .await?;
        let _pending = self.dispatcher.track(PendingTxn::new(
            tx_hash,
            format!("Bonding {}", bond.name()),
            TxnCategory::Bond(bond.key().clone()),
        ));

        signer.confirm(tx_hash, "bond deposit").await?;
        info!(%tx_hash, %amount, %max_price, "Bond deposit confirmed");

        if let Err(error) = self
            .calculate_user_bond_details(request.address, &request.bond, request.network)
            .await
        {
            debug!(%error, "User bond refresh after deposit failed");
        }

        Ok(())
    }
}
