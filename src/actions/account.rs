use alloy::primitives::Address;
use tracing::debug;

use super::BondActions;
use crate::bond::BondKey;
use crate::chain::BondChain;
use crate::error::{ActionError, Alert};
use crate::store::{Balances, StoreAction, UserBondDetails};
use crate::units;

impl<C: BondChain> BondActions<C> {
    /// Refreshes the user's position in one bond.
    #[tracing::instrument(skip_all, fields(bond = %bond, network = network))]
    pub async fn calculate_user_bond_details(
        &self,
        address: Address,
        bond: &BondKey,
        network: u64,
    ) -> Result<UserBondDetails, ActionError> {
        let result = self.try_user_bond_details(address, bond, network).await;
        self.report(result, Alert::from_error)
    }

    async fn try_user_bond_details(
        &self,
        address: Address,
        key: &BondKey,
        network: u64,
    ) -> Result<UserBondDetails, ActionError> {
        let bond = self.registry.resolve(key, network)?;
        let depository = bond.depository();

        let info = self.chain.bond_info(depository, address).await?;
        let pending_payout = self.chain.pending_payout_for(depository, address).await?;
        let allowance = self
            .chain
            .allowance(bond.reserve(), address, depository)
            .await?;
        let balance = self.chain.balance_of(bond.reserve(), address).await?;

        let details = UserBondDetails {
            bond: key.clone(),
            allowance: f64::from(allowance),
            balance: units::token_amount(balance),
            raw_balance: balance.to_string(),
            interest_due: units::protocol_amount(info.payout),
            bond_maturation_time: info
                .vesting
                .saturating_add(info.last_timestamp)
                .saturating_to::<u64>(),
            pending_payout: units::format_protocol_amount(pending_payout)?,
        };

        debug!(interest_due = details.interest_due, "User bond details refreshed");
        self.dispatcher
            .dispatch(StoreAction::UserBondDetails(details.clone()));

        Ok(details)
    }

    /// Refreshes the user's protocol token and staked token balances.
    #[tracing::instrument(skip_all, fields(network = network))]
    pub async fn get_balances(
        &self,
        address: Address,
        network: u64,
    ) -> Result<Balances, ActionError> {
        let result = self.try_get_balances(address, network).await;
        self.report(result, Alert::from_error)
    }

    async fn try_get_balances(
        &self,
        address: Address,
        network: u64,
    ) -> Result<Balances, ActionError> {
        let network = self.registry.network(network)?;

        let protocol_token = self
            .chain
            .balance_of(network.protocol_token, address)
            .await?;
        let staked_protocol_token = self
            .chain
            .balance_of(network.staked_protocol_token, address)
            .await?;

        let balances = Balances {
            protocol_token: units::format_protocol_amount(protocol_token)?,
            staked_protocol_token: units::format_protocol_amount(staked_protocol_token)?,
        };
        self.dispatcher
            .dispatch(StoreAction::Balances(balances.clone()));

        Ok(balances)
    }
}
