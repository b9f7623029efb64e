use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// Base58 account or token address as handed out by the chain.
pub type Address = String;

/// The circuits the worker compiles before any transaction can be proved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractName {
    FungibleToken,
    Pool,
    PoolTokenHolder,
    FungibleTokenAdmin,
    PoolFactory,
    Faucet,
}

impl ContractName {
    /// Compilation order. Later circuits reference the verification keys of earlier ones.
    pub const COMPILE_ORDER: [ContractName; 6] = [
        ContractName::FungibleToken,
        ContractName::Pool,
        ContractName::PoolTokenHolder,
        ContractName::FungibleTokenAdmin,
        ContractName::PoolFactory,
        ContractName::Faucet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractName::FungibleToken => "FungibleToken",
            ContractName::Pool => "Pool",
            ContractName::PoolTokenHolder => "PoolTokenHolder",
            ContractName::FungibleTokenAdmin => "FungibleTokenAdmin",
            ContractName::PoolFactory => "PoolFactory",
            ContractName::Faucet => "Faucet",
        }
    }

    /// The stage that follows `self` in [`ContractName::COMPILE_ORDER`].
    pub fn next(&self) -> Option<ContractName> {
        let index = Self::COMPILE_ORDER.iter().position(|name| name == self)?;
        Self::COMPILE_ORDER.get(index + 1).copied()
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractName {
    type Err = WorkerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::COMPILE_ORDER
            .iter()
            .copied()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| WorkerError::Protocol(format!("unknown contract {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveToken {
    pub address: Address,
    /// Absent while the pool has no liquidity account for this token.
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub token0: ReserveToken,
    pub token1: ReserveToken,
    pub liquidity: Option<u64>,
}

impl Reserves {
    /// Balances ordered as (`token`, other). `None` when `token` is not part of the pool.
    pub fn oriented(&self, token: &str) -> Option<(u64, u64)> {
        let amount0 = self.token0.amount.unwrap_or(0);
        let amount1 = self.token1.amount.unwrap_or(0);
        if self.token0.address == token {
            Some((amount0, amount1))
        } else if self.token1.address == token {
            Some((amount1, amount0))
        } else {
            None
        }
    }

    pub fn supply(&self) -> u64 {
        self.liquidity.unwrap_or(0)
    }
}

/// Serialized, proved but unsigned transaction ready for the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload(pub String);

impl TxPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapArgs {
    pub pool: Address,
    pub user: Address,
    pub token_in: Address,
    pub amount_in: u64,
    pub amount_out: u64,
    pub balance_in_max: u64,
    pub balance_out_min: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityArgs {
    pub pool: Address,
    pub user: Address,
    pub token_a: Address,
    pub token_b: Option<Address>,
    pub amount_a_in: u64,
    pub amount_b_in: u64,
    pub balance_a_max: u64,
    pub balance_b_max: u64,
    pub supply_min: u64,
    pub liquidity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawLiquidityArgs {
    pub pool: Address,
    pub user: Address,
    pub token_a: Address,
    pub token_b: Option<Address>,
    pub liquidity: u64,
    pub amount_a_out: u64,
    pub amount_b_out: u64,
    pub balance_a_min: u64,
    pub balance_b_min: u64,
    pub supply_max: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintTokenArgs {
    pub user: Address,
    pub token: Address,
    pub to: Address,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPoolArgs {
    pub user: Address,
    pub token_a: Address,
    /// `None` pairs the token with the native coin.
    pub token_b: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployTokenArgs {
    pub user: Address,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimArgs {
    pub user: Address,
    pub token: Option<Address>,
}

#[cfg(test)]
mod tests {
    use super::{ContractName, ReserveToken, Reserves};

    #[test]
    fn compile_order_is_linked() {
        let mut stage = Some(ContractName::FungibleToken);
        let mut seen = Vec::new();
        while let Some(name) = stage {
            seen.push(name);
            stage = name.next();
        }
        assert_eq!(seen, ContractName::COMPILE_ORDER.to_vec());
    }

    #[test]
    fn contract_name_parses_display_form() {
        for name in ContractName::COMPILE_ORDER {
            assert_eq!(name.to_string().parse::<ContractName>().expect("parse"), name);
        }
        assert!("Router".parse::<ContractName>().is_err());
    }

    #[test]
    fn reserves_orient_by_token() {
        let reserves = Reserves {
            token0: ReserveToken {
                address: "MINA".to_string(),
                amount: Some(10),
            },
            token1: ReserveToken {
                address: "B62token".to_string(),
                amount: None,
            },
            liquidity: Some(7),
        };
        assert_eq!(reserves.oriented("MINA"), Some((10, 0)));
        assert_eq!(reserves.oriented("B62token"), Some((0, 10)));
        assert_eq!(reserves.oriented("B62other"), None);
        assert_eq!(reserves.supply(), 7);
    }
}
