use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use lumina_worker::{ContractName, WorkerHandle};

use crate::config::MachineConfig;
use crate::error::{compile_error, MachineError};
use crate::machine::contracts::ContractsRegion;
use crate::machine::jobs::{run_calculation, run_execution, CalculationRequest, ExecutionRequest};
use crate::machine::operation::{
    OperationContext, OperationKind, OperationState, Quote, SettingsChange, SettingsPatch,
};
use crate::machine::{Event, Snapshot};
use crate::wallet::{TxResult, Wallet, WalletEvent, WalletState};

#[derive(Debug)]
pub(crate) enum Command {
    Event(Event),
    Shutdown,
}

#[derive(Debug)]
enum Completion {
    ContractsLoaded {
        epoch: u64,
        result: Result<(), MachineError>,
    },
    ContractCompiled {
        epoch: u64,
        contract: ContractName,
        result: Result<(), MachineError>,
    },
    Calculated {
        operation: OperationKind,
        generation: u64,
        result: Result<Quote, MachineError>,
    },
    Executed {
        operation: OperationKind,
        result: Result<TxResult, MachineError>,
    },
}

/// Owns every region of the session. Only this task mutates them; spawned jobs
/// report back through `completions`.
pub(crate) struct Machine {
    config: MachineConfig,
    worker: WorkerHandle,
    wallet: Arc<dyn Wallet>,
    contracts: ContractsRegion,
    operations: BTreeMap<OperationKind, OperationContext>,
    wallet_state: WalletState,
    inbox: mpsc::Receiver<Command>,
    completions_tx: mpsc::Sender<Completion>,
    completions_rx: mpsc::Receiver<Completion>,
    snapshot: watch::Sender<Snapshot>,
}

impl Machine {
    pub(crate) fn new(
        config: MachineConfig,
        worker: WorkerHandle,
        wallet: Arc<dyn Wallet>,
        inbox: mpsc::Receiver<Command>,
    ) -> (Self, watch::Receiver<Snapshot>) {
        let contracts = ContractsRegion::new();
        let operations: BTreeMap<_, _> = OperationKind::ALL
            .iter()
            .map(|kind| (*kind, OperationContext::new(*kind, config.default_slippage)))
            .collect();
        let wallet_state = WalletState {
            account: None,
            network: config.network,
        };
        let (snapshot, snapshot_rx) = watch::channel(Snapshot {
            contracts: contracts.clone(),
            operations: operations.clone(),
            wallet: wallet_state.clone(),
        });
        let (completions_tx, completions_rx) = mpsc::channel(config.inbox_capacity.max(1));
        let machine = Self {
            config,
            worker,
            wallet,
            contracts,
            operations,
            wallet_state,
            inbox,
            completions_tx,
            completions_rx,
            snapshot,
        };
        (machine, snapshot_rx)
    }

    pub(crate) async fn run(mut self) {
        info!(network = %self.wallet_state.network, "machine started");
        self.start_loading();
        self.publish();
        loop {
            tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(Command::Event(event)) => self.handle_event(event),
                    Some(Command::Shutdown) | None => break,
                },
                Some(completion) = self.completions_rx.recv() => {
                    self.handle_completion(completion);
                }
            }
            self.publish();
        }
        info!("machine stopped");
    }

    fn handle_event(&mut self, event: Event) {
        debug!(?event, "machine event");
        match event {
            Event::ReloadContracts => {
                if self.contracts.reload() {
                    info!(epoch = self.contracts.epoch(), "reloading contracts");
                    self.start_loading();
                } else {
                    debug!(state = ?self.contracts.state(), "reload ignored while contracts are busy");
                }
            }
            Event::ChangeSettings { operation, patch } => self.change_settings(operation, patch),
            Event::Calculate { operation } => self.calculate(operation),
            Event::Execute { operation } => self.execute(operation),
            Event::Dismiss { operation } => {
                if let Some(context) = self.operations.get_mut(&operation) {
                    if !context.dismiss() {
                        debug!(%operation, "dismiss ignored outside error state");
                    }
                }
            }
            Event::WalletChanged(event) => self.wallet_changed(event),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::ContractsLoaded { epoch, result } => {
                if epoch != self.contracts.epoch() {
                    debug!(epoch, "discarding load result from earlier epoch");
                    return;
                }
                if let Err(err) = &result {
                    warn!("contract load failed: {err}");
                }
                if let Some(next) = self.contracts.on_loaded(result) {
                    self.start_compile(next);
                }
            }
            Completion::ContractCompiled {
                epoch,
                contract,
                result,
            } => {
                if epoch != self.contracts.epoch() {
                    debug!(epoch, %contract, "discarding compile result from earlier epoch");
                    return;
                }
                match &result {
                    Ok(()) => info!(%contract, "contract compiled"),
                    Err(err) => warn!(%contract, "contract compile failed: {err}"),
                }
                match self.contracts.on_compiled(contract, result) {
                    Some(next) => self.start_compile(next),
                    None if self.contracts.is_ready() => info!("all contracts ready"),
                    None => {}
                }
            }
            Completion::Calculated {
                operation,
                generation,
                result,
            } => {
                let Some(context) = self.operations.get_mut(&operation) else {
                    return;
                };
                if let Err(err) = &result {
                    debug!(%operation, generation, "calculation failed: {err}");
                }
                if !context.finish_calculation(generation, result) {
                    debug!(%operation, generation, "discarding stale calculation");
                }
            }
            Completion::Executed { operation, result } => {
                let Some(context) = self.operations.get_mut(&operation) else {
                    return;
                };
                match &result {
                    Ok(tx) => info!(%operation, hash = tx.hash().unwrap_or("-"), "transaction sent"),
                    Err(err) => warn!(%operation, "execution failed: {err}"),
                }
                context.finish_execution(result);
            }
        }
    }

    fn change_settings(&mut self, operation: OperationKind, patch: SettingsPatch) {
        let Some(context) = self.operations.get_mut(&operation) else {
            return;
        };
        match context.change_settings(patch) {
            SettingsChange::Ignored => {
                warn!(%operation, "settings change ignored while executing");
            }
            SettingsChange::Applied => {
                debug!(%operation, generation = context.generation(), "settings applied");
            }
            SettingsChange::Recalculate => self.calculate(operation),
        }
    }

    fn calculate(&mut self, operation: OperationKind) {
        let Some(context) = self.operations.get_mut(&operation) else {
            return;
        };
        if !operation.is_priced()
            || !matches!(
                context.state(),
                OperationState::Ready | OperationState::Calculating
            )
        {
            debug!(%operation, state = ?context.state(), "calculate ignored");
            return;
        }
        let request = match CalculationRequest::from_settings(operation, context.settings()) {
            Ok(Some(request)) => request,
            Ok(None) => {
                context.invalidate();
                debug!(%operation, "settings incomplete; no quote");
                return;
            }
            Err(err) => {
                context.invalidate();
                context.fail_calculation(err);
                return;
            }
        };
        let Some(generation) = context.begin_calculation() else {
            return;
        };
        debug!(%operation, generation, "calculating quote");
        let worker = self.worker.clone();
        let limit = self.config.timeouts.calculate;
        self.spawn_job(async move {
            let result = bounded(limit, "calculate", run_calculation(worker, request)).await;
            Completion::Calculated {
                operation,
                generation,
                result,
            }
        });
    }

    fn execute(&mut self, operation: OperationKind) {
        let Some(context) = self.operations.get(&operation) else {
            return;
        };
        if context.state() != OperationState::Ready {
            debug!(%operation, state = ?context.state(), "execute ignored");
            return;
        }
        if operation.is_priced() && !context.quote_present() {
            debug!(%operation, "execute ignored: no quote");
            return;
        }
        if !self
            .contracts
            .registry()
            .are_ready(operation.required_contracts())
        {
            debug!(%operation, "execute ignored: contracts not ready");
            return;
        }
        let Some(user) = self.wallet_state.account.clone() else {
            debug!(%operation, "execute ignored: no wallet account");
            return;
        };
        let request =
            match ExecutionRequest::build(operation, context.settings(), context.quote(), &user) {
                Ok(request) => request,
                Err(err) => {
                    debug!(%operation, "execute ignored: {err}");
                    return;
                }
            };
        let Some(context) = self.operations.get_mut(&operation) else {
            return;
        };
        if !context.begin_execution() {
            return;
        }
        info!(%operation, %user, "executing");
        let worker = self.worker.clone();
        let wallet = Arc::clone(&self.wallet);
        let limit = self.config.timeouts.execute;
        self.spawn_job(async move {
            let result = bounded(limit, "execute", run_execution(worker, wallet, request)).await;
            Completion::Executed { operation, result }
        });
    }

    fn wallet_changed(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::AccountChanged(account) => {
                info!(account = account.as_deref().unwrap_or("-"), "wallet account changed");
                self.wallet_state.account = account;
            }
            WalletEvent::NetworkChanged(network) => {
                if network == self.wallet_state.network {
                    return;
                }
                info!(%network, "wallet network changed; quotes invalidated");
                self.wallet_state.network = network;
                for context in self.operations.values_mut() {
                    context.invalidate();
                }
            }
        }
    }

    fn start_loading(&mut self) {
        let worker = self.worker.clone();
        let epoch = self.contracts.epoch();
        let limit = self.config.timeouts.compile;
        info!(epoch, "loading contracts");
        self.spawn_job(async move {
            let result = bounded(limit, "load contracts", async {
                worker.load_contracts().await.map_err(compile_error)
            })
            .await;
            Completion::ContractsLoaded { epoch, result }
        });
    }

    fn start_compile(&mut self, contract: ContractName) {
        let worker = self.worker.clone();
        let epoch = self.contracts.epoch();
        let limit = self.config.timeouts.compile;
        info!(%contract, "compiling contract");
        self.spawn_job(async move {
            let label = format!("compile {contract}");
            let result = bounded(limit, &label, async {
                worker.compile_contract(contract).await.map_err(compile_error)
            })
            .await;
            Completion::ContractCompiled {
                epoch,
                contract,
                result,
            }
        });
    }

    fn spawn_job<F>(&self, job: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let completion = job.await;
            if completions.send(completion).await.is_err() {
                debug!("machine stopped before job completed");
            }
        });
    }

    fn snapshot_value(&self) -> Snapshot {
        Snapshot {
            contracts: self.contracts.clone(),
            operations: self.operations.clone(),
            wallet: self.wallet_state.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.snapshot_value());
    }
}

async fn bounded<T, F>(limit: Duration, label: &str, work: F) -> Result<T, MachineError>
where
    F: Future<Output = Result<T, MachineError>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(MachineError::Timeout(format!("{label} after {limit:?}"))),
    }
}
