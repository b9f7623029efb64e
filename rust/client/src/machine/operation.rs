use std::fmt;

use serde::{Deserialize, Serialize};

use lumina_worker::{Address, ContractName};

use crate::error::MachineError;
use crate::pricing::{AddLiquidityQuote, RemoveLiquidityQuote, SwapQuote};
use crate::utils::Slippage;
use crate::wallet::TxResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Swap,
    AddLiquidity,
    RemoveLiquidity,
    DeployPool,
    DeployToken,
    Mint,
    Claim,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Swap,
        OperationKind::AddLiquidity,
        OperationKind::RemoveLiquidity,
        OperationKind::DeployPool,
        OperationKind::DeployToken,
        OperationKind::Mint,
        OperationKind::Claim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Swap => "swap",
            OperationKind::AddLiquidity => "add-liquidity",
            OperationKind::RemoveLiquidity => "remove-liquidity",
            OperationKind::DeployPool => "deploy-pool",
            OperationKind::DeployToken => "deploy-token",
            OperationKind::Mint => "mint",
            OperationKind::Claim => "claim",
        }
    }

    /// Operations whose execution needs a quote from the pricing engine.
    pub fn is_priced(&self) -> bool {
        matches!(
            self,
            OperationKind::Swap | OperationKind::AddLiquidity | OperationKind::RemoveLiquidity
        )
    }

    /// Circuits that must be compiled before this operation can be proved.
    pub fn required_contracts(&self) -> &'static [ContractName] {
        match self {
            OperationKind::Swap | OperationKind::RemoveLiquidity => &[
                ContractName::FungibleToken,
                ContractName::Pool,
                ContractName::PoolTokenHolder,
            ],
            OperationKind::AddLiquidity => &[ContractName::FungibleToken, ContractName::Pool],
            OperationKind::DeployPool => &[
                ContractName::FungibleToken,
                ContractName::Pool,
                ContractName::PoolFactory,
            ],
            OperationKind::DeployToken | OperationKind::Mint => &[
                ContractName::FungibleToken,
                ContractName::FungibleTokenAdmin,
            ],
            OperationKind::Claim => &[ContractName::FungibleToken, ContractName::Faucet],
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-editable inputs of one operation. Amounts are human decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub pool: Option<Address>,
    /// Token paid in (swap), deposited first (liquidity), minted or paired (deploy).
    pub token_a: Option<Address>,
    pub token_b: Option<Address>,
    pub amount: Option<String>,
    /// Second deposit, only read for the first deposit into an empty pool.
    pub amount_b: Option<String>,
    pub slippage: Slippage,
    pub recipient: Option<Address>,
    pub symbol: Option<String>,
}

impl Settings {
    pub fn with_slippage(slippage: Slippage) -> Self {
        Self {
            slippage,
            ..Self::default()
        }
    }

    fn merge(&mut self, patch: SettingsPatch) {
        let SettingsPatch {
            pool,
            token_a,
            token_b,
            amount,
            amount_b,
            slippage,
            recipient,
            symbol,
            cleared,
        } = patch;
        if pool.is_some() {
            self.pool = pool;
        }
        if token_a.is_some() {
            self.token_a = token_a;
        }
        if token_b.is_some() {
            self.token_b = token_b;
        }
        if amount.is_some() {
            self.amount = amount;
        }
        if amount_b.is_some() {
            self.amount_b = amount_b;
        }
        if let Some(slippage) = slippage {
            self.slippage = slippage;
        }
        if recipient.is_some() {
            self.recipient = recipient;
        }
        if symbol.is_some() {
            self.symbol = symbol;
        }
        for field in cleared {
            match field {
                SettingsField::Pool => self.pool = None,
                SettingsField::TokenA => self.token_a = None,
                SettingsField::TokenB => self.token_b = None,
                SettingsField::Amount => self.amount = None,
                SettingsField::AmountB => self.amount_b = None,
                SettingsField::Recipient => self.recipient = None,
                SettingsField::Symbol => self.symbol = None,
            }
        }
    }
}

/// Optional settings that a patch can reset to unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingsField {
    Pool,
    TokenA,
    TokenB,
    Amount,
    AmountB,
    Recipient,
    Symbol,
}

impl SettingsField {
    pub fn is_pricing_relevant(&self) -> bool {
        !matches!(self, SettingsField::Recipient | SettingsField::Symbol)
    }
}

/// Fields to overwrite; `None` leaves the current value untouched. Fields listed in
/// `cleared` are unset after the overwrites are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub pool: Option<Address>,
    pub token_a: Option<Address>,
    pub token_b: Option<Address>,
    pub amount: Option<String>,
    pub amount_b: Option<String>,
    pub slippage: Option<Slippage>,
    pub recipient: Option<Address>,
    pub symbol: Option<String>,
    pub cleared: Vec<SettingsField>,
}

impl SettingsPatch {
    pub fn pool(mut self, pool: impl Into<Address>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn token_a(mut self, token: impl Into<Address>) -> Self {
        self.token_a = Some(token.into());
        self
    }

    pub fn token_b(mut self, token: impl Into<Address>) -> Self {
        self.token_b = Some(token.into());
        self
    }

    pub fn amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn amount_b(mut self, amount: impl Into<String>) -> Self {
        self.amount_b = Some(amount.into());
        self
    }

    pub fn slippage(mut self, slippage: Slippage) -> Self {
        self.slippage = Some(slippage);
        self
    }

    pub fn recipient(mut self, recipient: impl Into<Address>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn clear(mut self, field: SettingsField) -> Self {
        self.cleared.push(field);
        self
    }

    /// True when the patch touches an input of the pricing engine.
    pub fn is_pricing_relevant(&self) -> bool {
        self.cleared.iter().any(SettingsField::is_pricing_relevant)
            || self.pool.is_some()
            || self.token_a.is_some()
            || self.token_b.is_some()
            || self.amount.is_some()
            || self.amount_b.is_some()
            || self.slippage.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Quote {
    Swap(SwapQuote),
    AddLiquidity(AddLiquidityQuote),
    RemoveLiquidity(RemoveLiquidityQuote),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Ready,
    Calculating,
    Executing,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettingsChange {
    Ignored,
    Applied,
    Recalculate,
}

/// Region B context for a single operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    kind: OperationKind,
    state: OperationState,
    settings: Settings,
    quote: Option<Quote>,
    tx_result: Option<TxResult>,
    error: Option<MachineError>,
    generation: u64,
}

impl OperationContext {
    pub(crate) fn new(kind: OperationKind, slippage: Slippage) -> Self {
        Self {
            kind,
            state: OperationState::Ready,
            settings: Settings::with_slippage(slippage),
            quote: None,
            tx_result: None,
            error: None,
            generation: 0,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.quote.as_ref()
    }

    pub fn tx_result(&self) -> Option<&TxResult> {
        self.tx_result.as_ref()
    }

    pub fn error(&self) -> Option<&MachineError> {
        self.error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn quote_present(&self) -> bool {
        self.quote.is_some()
    }

    pub(crate) fn change_settings(&mut self, patch: SettingsPatch) -> SettingsChange {
        match self.state {
            OperationState::Executing => return SettingsChange::Ignored,
            OperationState::Error => self.reset(),
            OperationState::Ready | OperationState::Calculating => {}
        }
        let recalculate = self.kind.is_priced() && patch.is_pricing_relevant();
        self.settings.merge(patch);
        self.quote = None;
        self.tx_result = None;
        self.error = None;
        self.generation += 1;
        if recalculate {
            return SettingsChange::Recalculate;
        }
        // The in-flight result now carries a stale generation; stop waiting for it.
        self.state = OperationState::Ready;
        SettingsChange::Applied
    }

    /// Enters `Calculating` and returns the generation the result must carry.
    pub(crate) fn begin_calculation(&mut self) -> Option<u64> {
        if !self.kind.is_priced()
            || !matches!(self.state, OperationState::Ready | OperationState::Calculating)
        {
            return None;
        }
        self.generation += 1;
        self.state = OperationState::Calculating;
        self.quote = None;
        self.error = None;
        Some(self.generation)
    }

    pub(crate) fn fail_calculation(&mut self, err: MachineError) {
        self.state = OperationState::Ready;
        self.quote = None;
        self.error = Some(err);
    }

    /// Applies a calculation result; returns false when it is stale.
    pub(crate) fn finish_calculation(
        &mut self,
        generation: u64,
        result: Result<Quote, MachineError>,
    ) -> bool {
        if generation != self.generation || self.state != OperationState::Calculating {
            return false;
        }
        match result {
            Ok(quote) => {
                self.quote = Some(quote);
                self.error = None;
                self.state = OperationState::Ready;
            }
            Err(err) => self.fail_calculation(err),
        }
        true
    }

    pub(crate) fn begin_execution(&mut self) -> bool {
        if self.state != OperationState::Ready {
            return false;
        }
        self.state = OperationState::Executing;
        self.error = None;
        self.tx_result = None;
        true
    }

    pub(crate) fn finish_execution(&mut self, result: Result<TxResult, MachineError>) -> bool {
        if self.state != OperationState::Executing {
            return false;
        }
        match result {
            Ok(tx_result) => {
                self.tx_result = Some(tx_result);
                self.quote = None;
                self.state = OperationState::Ready;
            }
            Err(err) => {
                self.error = Some(err);
                self.state = OperationState::Error;
            }
        }
        true
    }

    /// Leaves `Error` with a clean context; settings are kept.
    pub(crate) fn dismiss(&mut self) -> bool {
        if self.state != OperationState::Error {
            return false;
        }
        self.reset();
        true
    }

    /// Drops the quote after an external change (e.g. network) made it meaningless.
    pub(crate) fn invalidate(&mut self) {
        if matches!(self.state, OperationState::Ready | OperationState::Calculating) {
            self.quote = None;
            self.generation += 1;
            self.state = OperationState::Ready;
        }
    }

    fn reset(&mut self) {
        self.state = OperationState::Ready;
        self.quote = None;
        self.tx_result = None;
        self.error = None;
    }
}
