use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lumina_worker::{
    AddLiquidityArgs, ClaimArgs, ContractName, ContractWorker, DeployPoolArgs, DeployTokenArgs,
    MintTokenArgs, ReserveReader, ReserveToken, Reserves, SwapArgs, TxPayload,
    WithdrawLiquidityArgs, WorkerError, WorkerHandle,
};
use tokio::sync::Semaphore;

#[derive(Default)]
struct PoolBook {
    pools: HashMap<String, u64>,
}

#[async_trait]
impl ReserveReader for PoolBook {
    async fn get_reserves(&self, pool: &str) -> Result<Reserves, WorkerError> {
        let amount = *self
            .pools
            .get(pool)
            .ok_or_else(|| WorkerError::Reserves(format!("unknown pool {pool}")))?;
        Ok(Reserves {
            token0: ReserveToken {
                address: "MINA".to_string(),
                amount: Some(amount),
            },
            token1: ReserveToken {
                address: format!("{pool}-token"),
                amount: Some(amount * 2),
            },
            liquidity: Some(amount),
        })
    }
}

#[derive(Default)]
struct EchoWorker {
    loaded: bool,
    compiled: Vec<ContractName>,
    book: Arc<PoolBook>,
    compile_gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl ContractWorker for EchoWorker {
    async fn load_contracts(&mut self) -> Result<(), WorkerError> {
        self.loaded = true;
        Ok(())
    }

    async fn compile_contract(&mut self, contract: ContractName) -> Result<(), WorkerError> {
        if !self.loaded {
            return Err(WorkerError::Compile("contracts not loaded".to_string()));
        }
        if let Some(gate) = &self.compile_gate {
            gate.acquire().await.expect("gate").forget();
        }
        self.compiled.push(contract);
        Ok(())
    }

    fn reserve_reader(&self) -> Arc<dyn ReserveReader> {
        self.book.clone()
    }

    async fn swap(&mut self, args: SwapArgs) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }

    async fn add_liquidity(&mut self, args: AddLiquidityArgs) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }

    async fn withdraw_liquidity(
        &mut self,
        args: WithdrawLiquidityArgs,
    ) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }

    async fn mint_token(&mut self, args: MintTokenArgs) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }

    async fn deploy_pool(&mut self, args: DeployPoolArgs) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }

    async fn deploy_token(&mut self, args: DeployTokenArgs) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }

    async fn claim(&mut self, args: ClaimArgs) -> Result<TxPayload, WorkerError> {
        Ok(TxPayload(serde_json::to_string(&args)?))
    }
}

fn worker_with_pools() -> EchoWorker {
    let mut book = PoolBook::default();
    book.pools.insert("pool-a".to_string(), 100);
    book.pools.insert("pool-b".to_string(), 200);
    EchoWorker {
        book: Arc::new(book),
        ..EchoWorker::default()
    }
}

#[tokio::test]
async fn worker_state_persists_across_calls() {
    let (handle, _task) = WorkerHandle::spawn(EchoWorker::default(), 4);
    let err = handle
        .compile_contract(ContractName::Pool)
        .await
        .expect_err("compile before load");
    assert!(matches!(err, WorkerError::Compile(_)));

    handle.load_contracts().await.expect("load");
    handle
        .compile_contract(ContractName::FungibleToken)
        .await
        .expect("compile");
}

#[tokio::test]
async fn concurrent_requests_get_their_own_replies() {
    let (handle, _task) = WorkerHandle::spawn(worker_with_pools(), 4);
    let a = handle.clone();
    let b = handle.clone();
    let (reserves_a, reserves_b) = tokio::join!(a.get_reserves("pool-a"), b.get_reserves("pool-b"));
    let reserves_a = reserves_a.expect("pool-a");
    let reserves_b = reserves_b.expect("pool-b");
    assert_eq!(reserves_a.token1.address, "pool-a-token");
    assert_eq!(reserves_a.token0.amount, Some(100));
    assert_eq!(reserves_b.token1.address, "pool-b-token");
    assert_eq!(reserves_b.token0.amount, Some(200));

    let err = handle.get_reserves("pool-c").await.expect_err("unknown pool");
    assert_eq!(err, WorkerError::Reserves("unknown pool pool-c".to_string()));
}

#[tokio::test]
async fn reserve_reads_do_not_wait_for_compilation() {
    let gate = Arc::new(Semaphore::new(0));
    let worker = EchoWorker {
        compile_gate: Some(Arc::clone(&gate)),
        ..worker_with_pools()
    };
    let (handle, _task) = WorkerHandle::spawn(worker, 4);
    handle.load_contracts().await.expect("load");

    let compiler = handle.clone();
    let compile = tokio::spawn(async move { compiler.compile_contract(ContractName::Pool).await });
    tokio::task::yield_now().await;

    let reserves = tokio::time::timeout(Duration::from_secs(1), handle.get_reserves("pool-a"))
        .await
        .expect("read while compiling")
        .expect("pool-a");
    assert_eq!(reserves.supply(), 100);
    assert!(!compile.is_finished());

    gate.add_permits(1);
    compile.await.expect("task").expect("compile");
}

#[tokio::test]
async fn transaction_calls_return_payloads() {
    let (handle, _task) = WorkerHandle::spawn(worker_with_pools(), 4);
    let payload = handle
        .swap(SwapArgs {
            pool: "pool-a".to_string(),
            user: "B62user".to_string(),
            token_in: "MINA".to_string(),
            amount_in: 10,
            amount_out: 8,
            balance_in_max: 101,
            balance_out_min: 198,
        })
        .await
        .expect("swap");
    let value: serde_json::Value = serde_json::from_str(payload.as_str()).expect("json");
    assert_eq!(value["amountOut"], 8);
    assert_eq!(value["balanceInMax"], 101);
}

#[tokio::test]
async fn stopped_host_reports_disconnected() {
    let (handle, task) = WorkerHandle::spawn(worker_with_pools(), 1);
    task.abort();
    let _ = task.await;
    let err = handle.load_contracts().await.expect_err("host gone");
    assert_eq!(err, WorkerError::Disconnected);
}
