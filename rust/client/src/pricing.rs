//! Quote math mirrored from the pool contract.
//!
//! The contract recomputes these bounds and asserts them, so every formula here
//! must round exactly like the circuit: `u128` products, floor division, and a
//! final `- 1` on every amount the user receives.

use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::utils::Slippage;

/// 0.25% protocol fee on swaps.
pub const SWAP_TAX_DIVISOR: u64 = 400;
/// 0.1% protocol fee on minted liquidity.
pub const LIQUIDITY_TAX_DIVISOR: u64 = 1_000;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulDivMod {
    pub quotient: u64,
    pub remainder: u64,
}

/// `floor(a * b / denominator)` and its remainder, without intermediate overflow.
pub fn mul_div_mod(a: u64, b: u64, denominator: u64) -> Result<MulDivMod, PricingError> {
    if denominator == 0 {
        return Err(PricingError::DivisionByZero);
    }
    let product = u128::from(a) * u128::from(b);
    let denominator = u128::from(denominator);
    let quotient = u64::try_from(product / denominator).map_err(|_| PricingError::Overflow)?;
    let remainder = u64::try_from(product % denominator).map_err(|_| PricingError::Overflow)?;
    Ok(MulDivMod {
        quotient,
        remainder,
    })
}

pub fn mul_div(a: u64, b: u64, denominator: u64) -> Result<u64, PricingError> {
    Ok(mul_div_mod(a, b, denominator)?.quotient)
}

fn widen(value: u64, slippage: Slippage) -> Result<u64, PricingError> {
    let delta = mul_div(value, slippage.bps(), BPS_DENOMINATOR)?;
    value.checked_add(delta).ok_or(PricingError::Overflow)
}

fn narrow(value: u64, slippage: Slippage) -> Result<u64, PricingError> {
    let delta = mul_div(value, slippage.bps(), BPS_DENOMINATOR)?;
    Ok(value.saturating_sub(delta))
}

fn apply_tax(amount: u64, divisor: u64) -> u64 {
    amount - amount / divisor
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountOutInput {
    pub amount_in: u64,
    pub balance_in: u64,
    pub balance_out: u64,
    pub slippage: Slippage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub amount_in: u64,
    pub amount_out: u64,
    pub balance_in_max: u64,
    pub balance_out_min: u64,
}

/// Constant-product output for `amount_in`, with the reserve bounds the contract will check.
///
/// An empty side of the pool yields a quote with every computed field zero;
/// `amount_in` is only the input echoed back.
pub fn get_amount_out(input: AmountOutInput) -> Result<SwapQuote, PricingError> {
    let AmountOutInput {
        amount_in,
        balance_in,
        balance_out,
        slippage,
    } = input;
    if balance_in == 0 || balance_out == 0 {
        return Ok(SwapQuote {
            amount_in,
            ..SwapQuote::default()
        });
    }
    let balance_in_max = widen(balance_in, slippage)?;
    let balance_out_min = narrow(balance_out, slippage)?;
    let denominator = balance_in_max
        .checked_add(amount_in)
        .ok_or(PricingError::Overflow)?;
    let amount_out = mul_div(balance_out_min, amount_in, denominator)?;
    let amount_out = apply_tax(amount_out, SWAP_TAX_DIVISOR).saturating_sub(1);
    Ok(SwapQuote {
        amount_in,
        amount_out,
        balance_in_max,
        balance_out_min,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityOutInput {
    pub amount_a_in: u64,
    pub balance_a: u64,
    pub balance_b: u64,
    pub supply: u64,
    pub slippage: Slippage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityQuote {
    pub amount_a_in: u64,
    pub amount_b_in: u64,
    pub balance_a_max: u64,
    pub balance_b_max: u64,
    pub supply_min: u64,
    pub liquidity: u64,
}

/// Deposit into a pool that already has supply. The second token amount follows
/// the pool ratio; minted liquidity is the smaller of both sides.
///
/// Without reserves or supply every computed field is zero and `amount_a_in`
/// echoes the input.
pub fn get_amount_liquidity_out(input: LiquidityOutInput) -> Result<AddLiquidityQuote, PricingError> {
    let LiquidityOutInput {
        amount_a_in,
        balance_a,
        balance_b,
        supply,
        slippage,
    } = input;
    if balance_a == 0 || balance_b == 0 || supply == 0 {
        return Ok(AddLiquidityQuote {
            amount_a_in,
            ..AddLiquidityQuote::default()
        });
    }
    let balance_a_max = widen(balance_a, slippage)?;
    let balance_b_max = widen(balance_b, slippage)?;
    let supply_min = narrow(supply, slippage)?;
    let amount_b_in = mul_div(amount_a_in, balance_b_max, balance_a_max)?;
    let liquidity_a = mul_div(amount_a_in, supply_min, balance_a_max)?;
    let liquidity_b = mul_div(amount_b_in, supply_min, balance_b_max)?;
    let liquidity = liquidity_a.min(liquidity_b);
    let liquidity = apply_tax(liquidity, LIQUIDITY_TAX_DIVISOR).saturating_sub(1);
    Ok(AddLiquidityQuote {
        amount_a_in,
        amount_b_in,
        balance_a_max,
        balance_b_max,
        supply_min,
        liquidity,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstLiquidityInput {
    pub amount_a_in: u64,
    pub amount_b_in: u64,
}

/// First deposit into an empty pool: no reserve ratio constrains it, so the bounds stay zero.
pub fn get_first_amount_liquidity_out(
    input: FirstLiquidityInput,
) -> Result<AddLiquidityQuote, PricingError> {
    let FirstLiquidityInput {
        amount_a_in,
        amount_b_in,
    } = input;
    let total = amount_a_in
        .checked_add(amount_b_in)
        .ok_or(PricingError::Overflow)?;
    let liquidity = apply_tax(total, LIQUIDITY_TAX_DIVISOR).saturating_sub(1);
    Ok(AddLiquidityQuote {
        amount_a_in,
        amount_b_in,
        liquidity,
        ..AddLiquidityQuote::default()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountOutFromLiquidityInput {
    pub liquidity: u64,
    pub balance_a: u64,
    pub balance_b: u64,
    pub supply: u64,
    pub slippage: Slippage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityQuote {
    pub liquidity: u64,
    pub amount_a_out: u64,
    pub amount_b_out: u64,
    pub balance_a_min: u64,
    pub balance_b_min: u64,
    pub supply_max: u64,
}

/// Proportional payout for burning `liquidity`, against narrowed reserves and a widened supply.
///
/// Without reserves or supply every computed field is zero and `liquidity`
/// echoes the input.
pub fn get_amount_out_from_liquidity(
    input: AmountOutFromLiquidityInput,
) -> Result<RemoveLiquidityQuote, PricingError> {
    let AmountOutFromLiquidityInput {
        liquidity,
        balance_a,
        balance_b,
        supply,
        slippage,
    } = input;
    if balance_a == 0 || balance_b == 0 || supply == 0 {
        return Ok(RemoveLiquidityQuote {
            liquidity,
            ..RemoveLiquidityQuote::default()
        });
    }
    let balance_a_min = narrow(balance_a, slippage)?;
    let balance_b_min = narrow(balance_b, slippage)?;
    let supply_max = widen(supply, slippage)?;
    let amount_a_out = mul_div(liquidity, balance_a_min, supply_max)?.saturating_sub(1);
    let amount_b_out = mul_div(liquidity, balance_b_min, supply_max)?.saturating_sub(1);
    Ok(RemoveLiquidityQuote {
        liquidity,
        amount_a_out,
        amount_b_out,
        balance_a_min,
        balance_b_min,
        supply_max,
    })
}
