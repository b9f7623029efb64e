//! Lumina DEX client core.
//!
//! Pricing math for swaps and liquidity, the session state machine that drives
//! compilation and transactions through the worker, and the wallet and token
//! list boundaries around it.

mod config;
mod error;
pub mod machine;
mod pricing;
mod token_list;
mod utils;
mod wallet;

pub use config::{DexConfig, MachineConfig, Timeouts, CONFIG_ENV, DEFAULT_CONFIG_PATH};
pub use error::{ConfigError, MachineError, PricingError, TokenListError, WalletError};
pub use machine::{
    ContractsRegion, ContractsState, Event, MachineHandle, OperationContext, OperationKind,
    OperationState, Quote, ReadinessRegistry, Settings, SettingsField, SettingsPatch,
    Snapshot,
};
pub use pricing::{
    get_amount_liquidity_out, get_amount_out, get_amount_out_from_liquidity,
    get_first_amount_liquidity_out, mul_div, mul_div_mod, AddLiquidityQuote,
    AmountOutFromLiquidityInput, AmountOutInput, FirstLiquidityInput, LiquidityOutInput,
    MulDivMod, RemoveLiquidityQuote, SwapQuote, LIQUIDITY_TAX_DIVISOR, SWAP_TAX_DIVISOR,
};
pub use token_list::{RetryConfig, TokenDescriptor, TokenListClient};
pub use utils::{format_amount, parse_amount, Slippage, TOKEN_DECIMALS};
pub use wallet::{Network, TxResult, Wallet, WalletEvent, WalletListener, WalletState};
