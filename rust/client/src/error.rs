use lumina_worker::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("amount exceeds u64")]
    Overflow,
}

/// Error carried in machine snapshots. Every variant is recoverable by re-sending
/// the originating event (or a reload, for `Compile`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("compile error: {0}")]
    Compile(String),
    #[error("calculate error: {0}")]
    Calculate(String),
    #[error("execute error: {0}")]
    Execute(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("machine closed")]
    Closed,
}

impl From<PricingError> for MachineError {
    fn from(err: PricingError) -> Self {
        MachineError::Calculate(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("wallet provider error: {0}")]
    Provider(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TokenListError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("token list error: {0}")]
    Status(String),
}

pub(crate) fn compile_error(err: WorkerError) -> MachineError {
    MachineError::Compile(err.to_string())
}

pub(crate) fn calculate_error(err: WorkerError) -> MachineError {
    MachineError::Calculate(err.to_string())
}

pub(crate) fn execute_error(err: impl std::fmt::Display) -> MachineError {
    MachineError::Execute(err.to_string())
}
