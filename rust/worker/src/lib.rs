//! Execution worker boundary for the Lumina DEX client.
//!
//! The worker owns compiled circuits and contract instances. Callers never touch
//! that state directly; they reach it through a [`WorkerHandle`], which sends
//! correlated requests to a [`WorkerHost`] running on its own task.
//!
//! Reserve reads do not queue behind compilation or proving: the handle serves
//! them through the worker's [`ReserveReader`], concurrently with the host.

mod error;
mod host;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::error::WorkerError;
pub use crate::host::{
    WorkerCall, WorkerHandle, WorkerHost, WorkerReply, WorkerRequest, WorkerResponse,
};
pub use crate::types::{
    AddLiquidityArgs, Address, ClaimArgs, ContractName, DeployPoolArgs, DeployTokenArgs,
    MintTokenArgs, ReserveToken, Reserves, SwapArgs, TxPayload, WithdrawLiquidityArgs,
};

/// Operations served by the isolated execution context.
///
/// Implementations are driven by a single [`WorkerHost`], so `&mut self` is never
/// shared. Compilation is CPU heavy; implementations should move it to
/// `tokio::task::spawn_blocking` or a dedicated thread.
#[async_trait]
pub trait ContractWorker: Send + 'static {
    async fn load_contracts(&mut self) -> Result<(), WorkerError>;

    async fn compile_contract(&mut self, contract: ContractName) -> Result<(), WorkerError>;

    /// Read-only access to pool state, shared with every [`WorkerHandle`].
    fn reserve_reader(&self) -> Arc<dyn ReserveReader>;

    async fn swap(&mut self, args: SwapArgs) -> Result<TxPayload, WorkerError>;

    async fn add_liquidity(&mut self, args: AddLiquidityArgs) -> Result<TxPayload, WorkerError>;

    async fn withdraw_liquidity(
        &mut self,
        args: WithdrawLiquidityArgs,
    ) -> Result<TxPayload, WorkerError>;

    async fn mint_token(&mut self, args: MintTokenArgs) -> Result<TxPayload, WorkerError>;

    async fn deploy_pool(&mut self, args: DeployPoolArgs) -> Result<TxPayload, WorkerError>;

    async fn deploy_token(&mut self, args: DeployTokenArgs) -> Result<TxPayload, WorkerError>;

    async fn claim(&mut self, args: ClaimArgs) -> Result<TxPayload, WorkerError>;
}

/// Pool state lookups. Called concurrently from any task.
#[async_trait]
pub trait ReserveReader: Send + Sync + 'static {
    async fn get_reserves(&self, pool: &str) -> Result<Reserves, WorkerError>;
}
