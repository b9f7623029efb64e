//! Work the machine spawns off its event loop: reserve fetch plus pricing, and
//! transaction build plus wallet broadcast.

use std::sync::Arc;

use lumina_worker::{
    AddLiquidityArgs, Address, ClaimArgs, DeployPoolArgs, DeployTokenArgs, MintTokenArgs,
    SwapArgs, WithdrawLiquidityArgs, WorkerHandle,
};

use crate::error::{calculate_error, execute_error, MachineError};
use crate::machine::operation::{OperationKind, Quote, Settings};
use crate::pricing::{
    get_amount_liquidity_out, get_amount_out, get_amount_out_from_liquidity,
    get_first_amount_liquidity_out, AmountOutFromLiquidityInput, AmountOutInput,
    FirstLiquidityInput, LiquidityOutInput,
};
use crate::utils::{parse_amount, Slippage};
use crate::wallet::{TxResult, Wallet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CalculationRequest {
    pool: Address,
    token: Address,
    amount: u64,
    amount_b: Option<u64>,
    slippage: Slippage,
    kind: OperationKind,
}

impl CalculationRequest {
    /// `Ok(None)` while the settings are still incomplete.
    pub(crate) fn from_settings(
        kind: OperationKind,
        settings: &Settings,
    ) -> Result<Option<Self>, MachineError> {
        if !kind.is_priced() {
            return Err(MachineError::InvalidSettings(format!("{kind} has no quote")));
        }
        let (Some(pool), Some(token), Some(amount)) = (
            settings.pool.as_ref(),
            settings.token_a.as_ref(),
            settings.amount.as_deref(),
        ) else {
            return Ok(None);
        };
        let amount_b = match (kind, settings.amount_b.as_deref()) {
            (OperationKind::AddLiquidity, Some(amount_b)) => Some(parse_amount(amount_b)?),
            _ => None,
        };
        Ok(Some(Self {
            pool: pool.clone(),
            token: token.clone(),
            amount: parse_amount(amount)?,
            amount_b,
            slippage: settings.slippage,
            kind,
        }))
    }
}

pub(crate) async fn run_calculation(
    worker: WorkerHandle,
    request: CalculationRequest,
) -> Result<Quote, MachineError> {
    let CalculationRequest {
        pool,
        token,
        amount,
        amount_b,
        slippage,
        kind,
    } = request;
    let reserves = worker.get_reserves(&pool).await.map_err(calculate_error)?;
    let (balance_a, balance_b) = reserves
        .oriented(&token)
        .ok_or_else(|| MachineError::Calculate(format!("token {token} is not in pool {pool}")))?;
    let supply = reserves.supply();

    let quote = match kind {
        OperationKind::Swap => Quote::Swap(get_amount_out(AmountOutInput {
            amount_in: amount,
            balance_in: balance_a,
            balance_out: balance_b,
            slippage,
        })?),
        OperationKind::AddLiquidity if supply == 0 => {
            let amount_b_in = amount_b.ok_or_else(|| {
                MachineError::InvalidSettings(
                    "first deposit into an empty pool needs both amounts".to_string(),
                )
            })?;
            Quote::AddLiquidity(get_first_amount_liquidity_out(FirstLiquidityInput {
                amount_a_in: amount,
                amount_b_in,
            })?)
        }
        OperationKind::AddLiquidity => Quote::AddLiquidity(get_amount_liquidity_out(
            LiquidityOutInput {
                amount_a_in: amount,
                balance_a,
                balance_b,
                supply,
                slippage,
            },
        )?),
        OperationKind::RemoveLiquidity => Quote::RemoveLiquidity(get_amount_out_from_liquidity(
            AmountOutFromLiquidityInput {
                liquidity: amount,
                balance_a,
                balance_b,
                supply,
                slippage,
            },
        )?),
        other => return Err(MachineError::InvalidSettings(format!("{other} has no quote"))),
    };
    reject_zero(quote)
}

fn reject_zero(quote: Quote) -> Result<Quote, MachineError> {
    let empty = match &quote {
        Quote::Swap(quote) => quote.amount_out == 0,
        Quote::AddLiquidity(quote) => quote.liquidity == 0,
        Quote::RemoveLiquidity(quote) => quote.amount_a_out == 0 && quote.amount_b_out == 0,
    };
    if empty {
        return Err(MachineError::Calculate("quote amount is zero".to_string()));
    }
    Ok(quote)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExecutionRequest {
    Swap(SwapArgs),
    AddLiquidity(AddLiquidityArgs),
    WithdrawLiquidity(WithdrawLiquidityArgs),
    MintToken(MintTokenArgs),
    DeployPool(DeployPoolArgs),
    DeployToken(DeployTokenArgs),
    Claim(ClaimArgs),
}

impl ExecutionRequest {
    pub(crate) fn build(
        kind: OperationKind,
        settings: &Settings,
        quote: Option<&Quote>,
        user: &Address,
    ) -> Result<Self, MachineError> {
        let user = user.clone();
        let request = match (kind, quote) {
            (OperationKind::Swap, Some(Quote::Swap(quote))) => Self::Swap(SwapArgs {
                pool: required(&settings.pool, "pool")?,
                user,
                token_in: required(&settings.token_a, "token")?,
                amount_in: quote.amount_in,
                amount_out: quote.amount_out,
                balance_in_max: quote.balance_in_max,
                balance_out_min: quote.balance_out_min,
            }),
            (OperationKind::AddLiquidity, Some(Quote::AddLiquidity(quote))) => {
                Self::AddLiquidity(AddLiquidityArgs {
                    pool: required(&settings.pool, "pool")?,
                    user,
                    token_a: required(&settings.token_a, "token")?,
                    token_b: settings.token_b.clone(),
                    amount_a_in: quote.amount_a_in,
                    amount_b_in: quote.amount_b_in,
                    balance_a_max: quote.balance_a_max,
                    balance_b_max: quote.balance_b_max,
                    supply_min: quote.supply_min,
                    liquidity: quote.liquidity,
                })
            }
            (OperationKind::RemoveLiquidity, Some(Quote::RemoveLiquidity(quote))) => {
                Self::WithdrawLiquidity(WithdrawLiquidityArgs {
                    pool: required(&settings.pool, "pool")?,
                    user,
                    token_a: required(&settings.token_a, "token")?,
                    token_b: settings.token_b.clone(),
                    liquidity: quote.liquidity,
                    amount_a_out: quote.amount_a_out,
                    amount_b_out: quote.amount_b_out,
                    balance_a_min: quote.balance_a_min,
                    balance_b_min: quote.balance_b_min,
                    supply_max: quote.supply_max,
                })
            }
            (OperationKind::Mint, _) => {
                let amount = parse_amount(&required(&settings.amount, "amount")?)?;
                Self::MintToken(MintTokenArgs {
                    token: required(&settings.token_a, "token")?,
                    to: settings.recipient.clone().unwrap_or_else(|| user.clone()),
                    user,
                    amount,
                })
            }
            (OperationKind::DeployPool, _) => Self::DeployPool(DeployPoolArgs {
                user,
                token_a: required(&settings.token_a, "token")?,
                token_b: settings.token_b.clone(),
            }),
            (OperationKind::DeployToken, _) => {
                let symbol = required(&settings.symbol, "symbol")?;
                if symbol.trim().is_empty() {
                    return Err(MachineError::InvalidSettings("symbol is empty".to_string()));
                }
                Self::DeployToken(DeployTokenArgs { user, symbol })
            }
            (OperationKind::Claim, _) => Self::Claim(ClaimArgs {
                user,
                token: settings.token_a.clone(),
            }),
            (kind, _) => {
                return Err(MachineError::InvalidSettings(format!(
                    "{kind} needs a matching quote"
                )))
            }
        };
        Ok(request)
    }
}

fn required<T: Clone>(value: &Option<T>, field: &str) -> Result<T, MachineError> {
    value
        .clone()
        .ok_or_else(|| MachineError::InvalidSettings(format!("{field} is not set")))
}

pub(crate) async fn run_execution(
    worker: WorkerHandle,
    wallet: Arc<dyn Wallet>,
    request: ExecutionRequest,
) -> Result<TxResult, MachineError> {
    let payload = match request {
        ExecutionRequest::Swap(args) => worker.swap(args).await,
        ExecutionRequest::AddLiquidity(args) => worker.add_liquidity(args).await,
        ExecutionRequest::WithdrawLiquidity(args) => worker.withdraw_liquidity(args).await,
        ExecutionRequest::MintToken(args) => worker.mint_token(args).await,
        ExecutionRequest::DeployPool(args) => worker.deploy_pool(args).await,
        ExecutionRequest::DeployToken(args) => worker.deploy_token(args).await,
        ExecutionRequest::Claim(args) => worker.claim(args).await,
    }
    .map_err(execute_error)?;
    wallet.send_transaction(payload).await.map_err(execute_error)
}

#[cfg(test)]
mod tests {
    use super::{reject_zero, CalculationRequest, ExecutionRequest};
    use crate::error::MachineError;
    use crate::machine::operation::{OperationKind, Quote, Settings};
    use crate::pricing::SwapQuote;
    use lumina_worker::MintTokenArgs;

    fn swap_settings() -> Settings {
        Settings {
            pool: Some("B62pool".to_string()),
            token_a: Some("B62tokenA".to_string()),
            amount: Some("1.5".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn incomplete_settings_do_not_build_a_request() {
        let settings = Settings {
            amount: None,
            ..swap_settings()
        };
        let request = CalculationRequest::from_settings(OperationKind::Swap, &settings)
            .expect("incomplete is not an error");
        assert_eq!(request, None);
    }

    #[test]
    fn unparseable_amount_is_invalid() {
        let settings = Settings {
            amount: Some("abc".to_string()),
            ..swap_settings()
        };
        let err = CalculationRequest::from_settings(OperationKind::Swap, &settings)
            .expect_err("bad amount");
        assert!(matches!(err, MachineError::InvalidSettings(_)));
    }

    #[test]
    fn zero_quotes_are_rejected() {
        let err = reject_zero(Quote::Swap(SwapQuote {
            amount_in: 1,
            ..SwapQuote::default()
        }))
        .expect_err("zero");
        assert_eq!(err, MachineError::Calculate("quote amount is zero".to_string()));
    }

    #[test]
    fn swap_execution_needs_matching_quote() {
        let user = "B62user".to_string();
        assert!(ExecutionRequest::build(OperationKind::Swap, &swap_settings(), None, &user).is_err());
        let quote = Quote::Swap(SwapQuote {
            amount_in: 1_500_000_000,
            amount_out: 10,
            balance_in_max: 20,
            balance_out_min: 30,
        });
        let request =
            ExecutionRequest::build(OperationKind::Swap, &swap_settings(), Some(&quote), &user)
                .expect("swap");
        match request {
            ExecutionRequest::Swap(args) => {
                assert_eq!(args.token_in, "B62tokenA");
                assert_eq!(args.amount_out, 10);
                assert_eq!(args.user, user);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn mint_defaults_recipient_to_user() {
        let settings = Settings {
            token_a: Some("B62token".to_string()),
            amount: Some("2".to_string()),
            ..Settings::default()
        };
        let user = "B62user".to_string();
        let request = ExecutionRequest::build(OperationKind::Mint, &settings, None, &user)
            .expect("mint");
        assert_eq!(
            request,
            ExecutionRequest::MintToken(MintTokenArgs {
                user: user.clone(),
                token: "B62token".to_string(),
                to: user,
                amount: 2_000_000_000,
            })
        );
    }

    #[test]
    fn deploy_token_needs_symbol() {
        let user = "B62user".to_string();
        let err = ExecutionRequest::build(OperationKind::DeployToken, &Settings::default(), None, &user)
            .expect_err("no symbol");
        assert_eq!(err, MachineError::InvalidSettings("symbol is not set".to_string()));
    }
}
