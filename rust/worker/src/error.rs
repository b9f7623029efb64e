#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("load error: {0}")]
    Load(String),
    #[error("compile error: {0}")]
    Compile(String),
    #[error("reserves error: {0}")]
    Reserves(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("worker disconnected")]
    Disconnected,
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Transaction(err.to_string())
    }
}
