//! Request/response boundary between callers and the worker that owns compiled circuits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::types::{
    AddLiquidityArgs, ClaimArgs, ContractName, DeployPoolArgs, DeployTokenArgs, MintTokenArgs,
    Reserves, SwapArgs, TxPayload, WithdrawLiquidityArgs,
};
use crate::{ContractWorker, ReserveReader};

#[derive(Debug, Clone)]
pub enum WorkerCall {
    LoadContracts,
    CompileContract(ContractName),
    Swap(SwapArgs),
    AddLiquidity(AddLiquidityArgs),
    WithdrawLiquidity(WithdrawLiquidityArgs),
    MintToken(MintTokenArgs),
    DeployPool(DeployPoolArgs),
    DeployToken(DeployTokenArgs),
    Claim(ClaimArgs),
}

impl WorkerCall {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerCall::LoadContracts => "loadContracts",
            WorkerCall::CompileContract(_) => "compileContract",
            WorkerCall::Swap(_) => "swap",
            WorkerCall::AddLiquidity(_) => "addLiquidity",
            WorkerCall::WithdrawLiquidity(_) => "withdrawLiquidity",
            WorkerCall::MintToken(_) => "mintToken",
            WorkerCall::DeployPool(_) => "deployPoolInstance",
            WorkerCall::DeployToken(_) => "deployToken",
            WorkerCall::Claim(_) => "claim",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReply {
    Done,
    Payload(TxPayload),
}

#[derive(Debug)]
pub struct WorkerResponse {
    pub id: u64,
    pub result: Result<WorkerReply, WorkerError>,
}

#[derive(Debug)]
pub struct WorkerRequest {
    pub id: u64,
    pub call: WorkerCall,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Serves requests one at a time against the worker it owns.
pub struct WorkerHost<W: ContractWorker> {
    worker: W,
    requests: mpsc::Receiver<WorkerRequest>,
}

impl<W: ContractWorker> WorkerHost<W> {
    pub fn new(worker: W, requests: mpsc::Receiver<WorkerRequest>) -> Self {
        Self { worker, requests }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            let WorkerRequest { id, call, reply } = request;
            let name = call.name();
            debug!(id, call = name, "worker request");
            let result = self.dispatch(call).await;
            if let Err(err) = &result {
                warn!(id, call = name, "worker call failed: {err}");
            }
            if reply.send(WorkerResponse { id, result }).is_err() {
                debug!(id, call = name, "caller dropped before reply");
            }
        }
        info!("worker host stopped");
    }

    async fn dispatch(&mut self, call: WorkerCall) -> Result<WorkerReply, WorkerError> {
        let worker = &mut self.worker;
        match call {
            WorkerCall::LoadContracts => worker.load_contracts().await.map(|_| WorkerReply::Done),
            WorkerCall::CompileContract(contract) => worker
                .compile_contract(contract)
                .await
                .map(|_| WorkerReply::Done),
            WorkerCall::Swap(args) => worker.swap(args).await.map(WorkerReply::Payload),
            WorkerCall::AddLiquidity(args) => {
                worker.add_liquidity(args).await.map(WorkerReply::Payload)
            }
            WorkerCall::WithdrawLiquidity(args) => worker
                .withdraw_liquidity(args)
                .await
                .map(WorkerReply::Payload),
            WorkerCall::MintToken(args) => worker.mint_token(args).await.map(WorkerReply::Payload),
            WorkerCall::DeployPool(args) => {
                worker.deploy_pool(args).await.map(WorkerReply::Payload)
            }
            WorkerCall::DeployToken(args) => {
                worker.deploy_token(args).await.map(WorkerReply::Payload)
            }
            WorkerCall::Claim(args) => worker.claim(args).await.map(WorkerReply::Payload),
        }
    }
}

/// Cloneable caller side of the worker boundary.
#[derive(Clone)]
pub struct WorkerHandle {
    requests: mpsc::Sender<WorkerRequest>,
    reader: Arc<dyn ReserveReader>,
    next_id: Arc<AtomicU64>,
}

impl WorkerHandle {
    pub fn new(requests: mpsc::Sender<WorkerRequest>, reader: Arc<dyn ReserveReader>) -> Self {
        Self {
            requests,
            reader,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Moves `worker` onto its own task and returns the handle used to reach it.
    pub fn spawn<W: ContractWorker>(worker: W, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let reader = worker.reserve_reader();
        let task = tokio::spawn(WorkerHost::new(worker, rx).run());
        (Self::new(tx, reader), task)
    }

    pub async fn call(&self, call: WorkerCall) -> Result<WorkerReply, WorkerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();
        self.requests
            .send(WorkerRequest { id, call, reply })
            .await
            .map_err(|_| WorkerError::Disconnected)?;
        let response = response.await.map_err(|_| WorkerError::Disconnected)?;
        if response.id != id {
            return Err(WorkerError::Protocol(format!(
                "response id {} does not match request {id}",
                response.id
            )));
        }
        response.result
    }

    pub async fn load_contracts(&self) -> Result<(), WorkerError> {
        expect_done(self.call(WorkerCall::LoadContracts).await?)
    }

    pub async fn compile_contract(&self, contract: ContractName) -> Result<(), WorkerError> {
        expect_done(self.call(WorkerCall::CompileContract(contract)).await?)
    }

    /// Served by the reader directly, so it never waits behind a compile or proof.
    pub async fn get_reserves(&self, pool: &str) -> Result<Reserves, WorkerError> {
        debug!(pool, "reserve read");
        self.reader.get_reserves(pool).await
    }

    pub async fn swap(&self, args: SwapArgs) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::Swap(args)).await?)
    }

    pub async fn add_liquidity(&self, args: AddLiquidityArgs) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::AddLiquidity(args)).await?)
    }

    pub async fn withdraw_liquidity(
        &self,
        args: WithdrawLiquidityArgs,
    ) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::WithdrawLiquidity(args)).await?)
    }

    pub async fn mint_token(&self, args: MintTokenArgs) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::MintToken(args)).await?)
    }

    pub async fn deploy_pool(&self, args: DeployPoolArgs) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::DeployPool(args)).await?)
    }

    pub async fn deploy_token(&self, args: DeployTokenArgs) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::DeployToken(args)).await?)
    }

    pub async fn claim(&self, args: ClaimArgs) -> Result<TxPayload, WorkerError> {
        expect_payload(self.call(WorkerCall::Claim(args)).await?)
    }
}

fn expect_done(reply: WorkerReply) -> Result<(), WorkerError> {
    match reply {
        WorkerReply::Done => Ok(()),
        other => Err(unexpected("done", &other)),
    }
}

fn expect_payload(reply: WorkerReply) -> Result<TxPayload, WorkerError> {
    match reply {
        WorkerReply::Payload(payload) => Ok(payload),
        other => Err(unexpected("payload", &other)),
    }
}

fn unexpected(expected: &str, reply: &WorkerReply) -> WorkerError {
    WorkerError::Protocol(format!("expected {expected} reply, got {reply:?}"))
}
