//! Session state machine.
//!
//! Region A compiles circuits in a fixed order; region B runs the
//! settings → quote → execute cycle for every operation kind. Both live on one
//! task fed by an inbox, so every transition sees a consistent context.
//! Observers read published [`Snapshot`]s.

mod contracts;
mod jobs;
mod operation;
mod runtime;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use lumina_worker::{ContractWorker, WorkerHandle};

use crate::config::{DexConfig, MachineConfig};
use crate::error::MachineError;
use crate::wallet::{Wallet, WalletEvent, WalletState};

use self::runtime::{Command, Machine};

pub use self::contracts::{ContractsRegion, ContractsState, ReadinessRegistry};
pub use self::operation::{
    OperationContext, OperationKind, OperationState, Quote, Settings, SettingsField,
    SettingsPatch,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ReloadContracts,
    ChangeSettings {
        operation: OperationKind,
        patch: SettingsPatch,
    },
    Calculate {
        operation: OperationKind,
    },
    Execute {
        operation: OperationKind,
    },
    Dismiss {
        operation: OperationKind,
    },
    WalletChanged(WalletEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub contracts: ContractsRegion,
    pub operations: BTreeMap<OperationKind, OperationContext>,
    pub wallet: WalletState,
}

impl Snapshot {
    pub fn operation(&self, kind: OperationKind) -> Option<&OperationContext> {
        self.operations.get(&kind)
    }

    pub fn all_contracts_ready(&self) -> bool {
        self.contracts.registry().all_ready()
    }

    pub fn contracts_ready(&self, kind: OperationKind) -> bool {
        self.contracts
            .registry()
            .are_ready(kind.required_contracts())
    }
}

/// Caller side of a running machine.
#[derive(Clone)]
pub struct MachineHandle {
    inbox: mpsc::Sender<Command>,
    snapshot: watch::Receiver<Snapshot>,
}

impl MachineHandle {
    /// Starts the machine on its own task. Contract loading begins immediately.
    pub fn spawn(
        config: MachineConfig,
        worker: WorkerHandle,
        wallet: Arc<dyn Wallet>,
    ) -> (Self, JoinHandle<()>) {
        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity.max(1));
        let (machine, snapshot) = Machine::new(config, worker, wallet, inbox_rx);
        let task = tokio::spawn(machine.run());
        (
            Self {
                inbox: inbox_tx,
                snapshot,
            },
            task,
        )
    }

    /// Spawns the worker host with the configured queue capacity, then the machine
    /// on top of it. The returned worker handle reaches the same host.
    pub fn start<W: ContractWorker>(
        config: &DexConfig,
        worker: W,
        wallet: Arc<dyn Wallet>,
    ) -> (Self, WorkerHandle) {
        let (worker, _) = WorkerHandle::spawn(worker, config.worker_capacity);
        let (machine, _) = Self::spawn(config.machine_config(), worker.clone(), wallet);
        (machine, worker)
    }

    pub async fn send(&self, event: Event) -> Result<(), MachineError> {
        self.inbox
            .send(Command::Event(event))
            .await
            .map_err(|_| MachineError::Closed)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Resolves with the first published snapshot that satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> Result<Snapshot, MachineError>
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut snapshot = self.snapshot.clone();
        let found = snapshot
            .wait_for(predicate)
            .await
            .map_err(|_| MachineError::Closed)?;
        Ok(found.clone())
    }

    pub async fn shutdown(&self) -> Result<(), MachineError> {
        self.inbox
            .send(Command::Shutdown)
            .await
            .map_err(|_| MachineError::Closed)
    }
}
