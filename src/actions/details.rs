use alloy::primitives::U256;
use tracing::{debug, info};

use super::{BondActions, CalcBondDetails};
use crate::bond::{Network, ResolvedBond};
use crate::chain::BondChain;
use crate::error::{ActionError, Alert};
use crate::store::{BondDetails, StoreAction};
use crate::units::{self, Holdings};

impl<C: BondChain> BondActions<C> {
    /// Computes the display values of a bond market for the amount the
    /// user is about to bond.
    #[tracing::instrument(skip_all, fields(bond = %request.bond, network = request.network))]
    pub async fn calc_bond_details(
        &self,
        request: &CalcBondDetails,
    ) -> Result<BondDetails, ActionError> {
        let result = self.try_calc_bond_details(request).await;
        self.report(result, Alert::from_error)
    }

    async fn try_calc_bond_details(
        &self,
        request: &CalcBondDetails,
    ) -> Result<BondDetails, ActionError> {
        let bond = self.registry.resolve(&request.bond, request.network)?;

        if bond.descriptor.deprecated {
            debug!("Bond is deprecated, returning placeholder details");
            let details = BondDetails::deprecated(bond.key().clone());
            self.dispatcher
                .dispatch(StoreAction::BondDetails(details.clone()));
            return Ok(details);
        }

        let amount = units::parse_amount(request.value.as_deref())?;
        let depository = bond.depository();
        let kind = bond.descriptor.kind;

        let bond_price_in_usd = self.chain.bond_price_in_usd(depository).await?;
        let market_price = self.market_price(bond.network).await?;
        let bond_discount = units::bond_discount(market_price, bond_price_in_usd);

        let quoted_value = if bond.descriptor.is_lp() {
            self.chain
                .valuation(bond.calculator(), bond.reserve(), amount)
                .await?
        } else {
            amount
        };
        let payout = self.chain.payout_for(depository, quoted_value).await?;
        let bond_quote = units::bond_quote(kind, payout);

        let user_payout = self
            .chain
            .payout_for(depository, request.user_balance)
            .await?;
        let raw_max_payout = self.chain.max_payout(depository).await?;
        let over_max_payout = units::is_over_max_payout(user_payout, raw_max_payout);
        let max_user_can_buy = units::max_user_can_buy(
            over_max_payout,
            raw_max_payout,
            bond_price_in_usd,
            request.user_balance,
        );

        let debt_ratio = units::debt_ratio(
            kind,
            self.chain.standardized_debt_ratio(depository).await?,
        );
        let purchased = units::purchased(self.holdings(&bond).await?)?;
        let vesting_term = self
            .chain
            .vesting_term(depository)
            .await?
            .saturating_to::<u64>();

        let max_payout = units::max_payout(raw_max_payout);
        let amount_supplied = request.value.as_deref().is_some_and(|value| !value.is_empty());
        if amount_supplied && bond_quote > max_payout {
            self.dispatcher.alert(Alert::MaxPayoutExceeded {
                max_payout,
                symbol: bond.network.payout_symbol.clone(),
            });
        }

        let details = BondDetails {
            bond: bond.key().clone(),
            bond_discount,
            debt_ratio,
            bond_quote,
            purchased,
            vesting_term,
            max_payout,
            bond_price: units::bond_price(bond_price_in_usd),
            market_price: units::market_price(market_price)?,
            max_user_can_buy: max_user_can_buy.to_string(),
        };

        info!(
            bond_discount,
            bond_quote,
            purchased,
            over_max_payout,
            "Bond details calculated"
        );
        self.dispatcher
            .dispatch(StoreAction::BondDetails(details.clone()));

        Ok(details)
    }

    /// Protocol token market price in USD with 9 decimals.
    async fn market_price(&self, network: &Network) -> Result<U256, ActionError> {
        let (protocol_reserve, quote_reserve) = self
            .chain
            .pair_reserves(network.market_pair, network.protocol_token)
            .await?;

        Ok(units::pair_price(protocol_reserve, quote_reserve)
            .saturating_mul(U256::from(network.quote_token_price)))
    }

    /// Treasury holdings of the bond's reserve asset.
    async fn holdings(&self, bond: &ResolvedBond<'_>) -> Result<Holdings, ActionError> {
        let treasury_balance = self
            .chain
            .balance_of(bond.reserve(), bond.treasury())
            .await?;

        if bond.descriptor.is_lp() {
            let markdown = self
                .chain
                .markdown(bond.calculator(), bond.reserve())
                .await?;
            let valuation = self
                .chain
                .valuation(bond.calculator(), bond.reserve(), treasury_balance)
                .await?;

            return Ok(Holdings::Lp {
                markdown,
                valuation,
            });
        }

        let oracle_answer = match bond.oracle() {
            Some(oracle) if !bond.descriptor.stable => Some(self.chain.latest_answer(oracle).await?),
            _ => None,
        };

        Ok(Holdings::Token {
            treasury_balance,
            stable: bond.descriptor.stable,
            oracle_answer,
        })
    }
}
