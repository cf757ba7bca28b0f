//! Conversions from on-chain fixed-point integers to display values.
//!
//! Bond depositories report LP-derived quantities and protocol token
//! amounts with 9 decimals and reserve token amounts with 18 decimals.
//! Chainlink answers carry 8 decimals.

use std::str::FromStr;

use alloy::primitives::utils::{UnitsError, format_units, parse_ether};
use alloy::primitives::{I256, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::bond::BondKind;

/// Amount quoted when the user has not typed one yet. Small enough to
/// stay below any realistic LP position.
pub(crate) const DEFAULT_QUOTE_AMOUNT: &str = "0.0001";

/// Slippage applied when the caller passes zero.
pub(crate) const DEFAULT_SLIPPAGE: Decimal = dec!(0.005);

const PROTOCOL_DECIMALS: i32 = 9;
const TOKEN_DECIMALS: i32 = 18;
const ORACLE_DECIMALS: i32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("volatile bond has no price feed answer")]
    MissingOracleAnswer,
    #[error("invalid amount: {0}")]
    Units(#[from] UnitsError),
    #[error("decimal conversion failed: {0}")]
    Decimal(#[from] rust_decimal::Error),
    #[error("value {0} does not fit the price range")]
    OutOfRange(Decimal),
}

fn scaled(raw: U256, decimals: i32) -> f64 {
    f64::from(raw) / 10f64.powi(decimals)
}

/// Parses the user-entered amount as an 18-decimal token quantity.
/// An absent or empty amount quotes [`DEFAULT_QUOTE_AMOUNT`].
pub fn parse_amount(value: Option<&str>) -> Result<U256, UnitError> {
    let value = value.filter(|value| !value.is_empty()).unwrap_or(DEFAULT_QUOTE_AMOUNT);
    parse_token_amount(value)
}

/// Parses an 18-decimal token quantity with no default.
pub fn parse_token_amount(value: &str) -> Result<U256, UnitError> {
    Ok(parse_ether(value)?)
}

/// Premium of the market price over the bond price, as a fraction.
///
/// `market_price` has 9 decimals, `bond_price_in_usd` has 18.
pub fn bond_discount(market_price: U256, bond_price_in_usd: U256) -> f64 {
    let bond_price = f64::from(bond_price_in_usd);
    (f64::from(market_price) * 1e9 - bond_price) / bond_price
}

/// LP depositories report the debt ratio with 9 decimals, token
/// depositories already standardize it.
pub fn debt_ratio(kind: BondKind, raw: U256) -> f64 {
    match kind {
        BondKind::Lp => scaled(raw, PROTOCOL_DECIMALS),
        BondKind::Token => f64::from(raw),
    }
}

pub fn bond_quote(kind: BondKind, payout: U256) -> f64 {
    match kind {
        BondKind::Lp => scaled(payout, PROTOCOL_DECIMALS),
        BondKind::Token => scaled(payout, TOKEN_DECIMALS),
    }
}

/// What the treasury holds of a bond's reserve asset.
#[derive(Debug, Clone, Copy)]
pub enum Holdings {
    /// LP reserve: calculator markdown (18 decimals) and the valuation of
    /// the treasury's LP balance (9 decimals).
    Lp { markdown: U256, valuation: U256 },
    /// Single-token reserve held by the treasury (18 decimals).
    Token {
        treasury_balance: U256,
        stable: bool,
        oracle_answer: Option<I256>,
    },
}

/// USD value of everything bonded so far.
pub fn purchased(holdings: Holdings) -> Result<f64, UnitError> {
    match holdings {
        Holdings::Lp {
            markdown,
            valuation,
        } => Ok(scaled(markdown, TOKEN_DECIMALS) * scaled(valuation, PROTOCOL_DECIMALS)),
        Holdings::Token {
            treasury_balance,
            stable: true,
            ..
        } => Ok(scaled(treasury_balance, TOKEN_DECIMALS)),
        Holdings::Token {
            treasury_balance,
            stable: false,
            oracle_answer,
        } => {
            let answer = oracle_answer
                .filter(|answer| answer.is_positive())
                .ok_or(UnitError::MissingOracleAnswer)?;

            Ok(scaled(treasury_balance, TOKEN_DECIMALS)
                * scaled(answer.unsigned_abs(), ORACLE_DECIMALS))
        }
    }
}

pub fn max_payout(raw: U256) -> f64 {
    scaled(raw, PROTOCOL_DECIMALS)
}

pub fn bond_price(bond_price_in_usd: U256) -> f64 {
    scaled(bond_price_in_usd, TOKEN_DECIMALS)
}

/// Market price formatted with 9 decimals, trailing zeros trimmed.
pub fn market_price(raw: U256) -> Result<String, UnitError> {
    format_protocol_amount(raw)
}

/// Price of one protocol token in quote tokens, with 9 decimals.
///
/// The protocol token has 9 decimals and the quote token 18, so the
/// plain reserve ratio already carries the 9-decimal scale. An empty
/// pool prices at zero.
pub fn pair_price(protocol_reserve: U256, quote_reserve: U256) -> U256 {
    quote_reserve.checked_div(protocol_reserve).unwrap_or_default()
}

/// 9-decimal amount as a float (interest due, protocol balances).
pub fn protocol_amount(raw: U256) -> f64 {
    scaled(raw, PROTOCOL_DECIMALS)
}

/// 18-decimal reserve token amount as a float.
pub fn token_amount(raw: U256) -> f64 {
    scaled(raw, TOKEN_DECIMALS)
}

/// Formats a 9-decimal amount (protocol token balances, pending payouts).
pub fn format_protocol_amount(raw: U256) -> Result<String, UnitError> {
    Ok(trim_fraction(format_units(raw, 9u8)?))
}

fn trim_fraction(formatted: String) -> String {
    let Some((whole, fraction)) = formatted.split_once('.') else {
        return format!("{formatted}.0");
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Whether the payout for the user's whole balance reaches the
/// depository's maximum payout. `user_payout` has 18 decimals.
pub fn is_over_max_payout(user_payout: U256, max_payout: U256) -> bool {
    user_payout / U256::from(1_000_000_000u64) >= max_payout
}

/// Largest deposit the user can make, as a raw integer.
///
/// Users whose balance would exceed the maximum payout are capped just
/// below it; everyone else may deposit their full balance.
pub fn max_user_can_buy(
    over_max_payout: bool,
    max_payout: U256,
    bond_price_in_usd: U256,
    user_balance: U256,
) -> U256 {
    if !over_max_payout {
        return user_balance;
    }

    max_payout
        .saturating_sub(U256::from(1u64))
        .saturating_mul(bond_price_in_usd)
        / U256::from(1_000_000_000u64)
}

/// Highest bond price accepted for a deposit.
///
/// `slippage_percent` is a percentage (`0.5` means 0.5%); zero selects
/// [`DEFAULT_SLIPPAGE`]. The result is rounded half away from zero.
pub fn max_price_with_slippage(
    bond_price: U256,
    slippage_percent: Decimal,
) -> Result<U256, UnitError> {
    let accepted = if slippage_percent.is_zero() {
        DEFAULT_SLIPPAGE
    } else {
        slippage_percent / dec!(100)
    };

    let price = Decimal::from_str(&bond_price.to_string())?;
    let max_price = price
        .checked_mul(Decimal::ONE + accepted)
        .ok_or(UnitError::OutOfRange(price))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    max_price
        .to_u128()
        .map(U256::from)
        .ok_or(UnitError::OutOfRange(max_price))
}
