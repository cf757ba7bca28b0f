//! [`BondChain`] over an [`Evm`] provider.
//!
//! Calls are ABI-encoded here and executed through [`Evm::call`], which
//! keeps the node's error payload available to alert translation.

use alloy::primitives::aliases::U112;
use alloy::primitives::{Address, Bytes, I256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bonddesk_evm::{Evm, EvmError};
use tracing::trace;

use super::{BondChain, BondInfo};
use crate::bindings::{
    AggregatorV3Interface, IBondDepository, IBondingCalculator, IERC20, IUniswapV2Pair,
};

#[derive(Debug, Clone)]
pub struct ChainReader<E> {
    evm: E,
}

impl<E: Evm> ChainReader<E> {
    pub fn new(evm: E) -> Self {
        Self { evm }
    }

    async fn view<C: SolCall + Send>(
        &self,
        contract: Address,
        call: C,
    ) -> Result<C::Return, EvmError> {
        trace!(%contract, function = C::SIGNATURE, "eth_call");

        let calldata = Bytes::from(call.abi_encode());
        let output = self.evm.call(contract, calldata).await?;

        Ok(C::abi_decode_returns(&output)?)
    }
}

fn widen(reserve: U112) -> U256 {
    U256::from(reserve)
}

#[async_trait]
impl<E: Evm> BondChain for ChainReader<E> {
    async fn bond_price(&self, bond: Address) -> Result<U256, EvmError> {
        self.view(bond, IBondDepository::bondPriceCall {}).await
    }

    async fn bond_price_in_usd(&self, bond: Address) -> Result<U256, EvmError> {
        self.view(bond, IBondDepository::bondPriceInUSDCall {}).await
    }

    async fn payout_for(&self, bond: Address, value: U256) -> Result<U256, EvmError> {
        self.view(bond, IBondDepository::payoutForCall { value })
            .await
    }

    async fn max_payout(&self, bond: Address) -> Result<U256, EvmError> {
        self.view(bond, IBondDepository::maxPayoutCall {}).await
    }

    async fn standardized_debt_ratio(&self, bond: Address) -> Result<U256, EvmError> {
        self.view(bond, IBondDepository::standardizedDebtRatioCall {})
            .await
    }

    async fn vesting_term(&self, bond: Address) -> Result<U256, EvmError> {
        let terms = self.view(bond, IBondDepository::termsCall {}).await?;
        Ok(terms.vestingTerm)
    }

    async fn bond_info(&self, bond: Address, depositor: Address) -> Result<BondInfo, EvmError> {
        let info = self
            .view(bond, IBondDepository::bondInfoCall { depositor })
            .await?;

        Ok(BondInfo {
            payout: info.payout,
            vesting: info.vesting,
            last_timestamp: info.lastTimestamp,
            price_paid: info.pricePaid,
        })
    }

    async fn pending_payout_for(
        &self,
        bond: Address,
        depositor: Address,
    ) -> Result<U256, EvmError> {
        self.view(bond, IBondDepository::pendingPayoutForCall { depositor })
            .await
    }

    async fn valuation(
        &self,
        calculator: Address,
        pair: Address,
        amount: U256,
    ) -> Result<U256, EvmError> {
        self.view(calculator, IBondingCalculator::valuationCall { pair, amount })
            .await
    }

    async fn markdown(&self, calculator: Address, pair: Address) -> Result<U256, EvmError> {
        self.view(calculator, IBondingCalculator::markdownCall { pair })
            .await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, EvmError> {
        self.view(token, IERC20::balanceOfCall { account: owner })
            .await
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, EvmError> {
        self.view(token, IERC20::allowanceCall { owner, spender })
            .await
    }

    async fn latest_answer(&self, oracle: Address) -> Result<I256, EvmError> {
        let round = self
            .view(oracle, AggregatorV3Interface::latestRoundDataCall {})
            .await?;

        Ok(round.answer)
    }

    async fn pair_reserves(
        &self,
        pair: Address,
        protocol_token: Address,
    ) -> Result<(U256, U256), EvmError> {
        let token0 = self.view(pair, IUniswapV2Pair::token0Call {}).await?;
        let reserves = self.view(pair, IUniswapV2Pair::getReservesCall {}).await?;

        let (reserve0, reserve1) = (widen(reserves.reserve0), widen(reserves.reserve1));
        if token0 == protocol_token {
            Ok((reserve0, reserve1))
        } else {
            Ok((reserve1, reserve0))
        }
    }
}
