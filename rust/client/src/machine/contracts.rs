use std::collections::BTreeMap;

use lumina_worker::ContractName;

use crate::error::MachineError;

/// Which circuits have finished compiling. Entries only move from false to true
/// until an explicit reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessRegistry {
    entries: BTreeMap<ContractName, bool>,
}

impl ReadinessRegistry {
    pub fn new() -> Self {
        Self {
            entries: ContractName::COMPILE_ORDER
                .iter()
                .map(|name| (*name, false))
                .collect(),
        }
    }

    pub fn is_ready(&self, contract: ContractName) -> bool {
        self.entries.get(&contract).copied().unwrap_or(false)
    }

    pub fn are_ready(&self, contracts: &[ContractName]) -> bool {
        contracts.iter().all(|contract| self.is_ready(*contract))
    }

    pub fn all_ready(&self) -> bool {
        self.entries.values().all(|ready| *ready)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContractName, bool)> + '_ {
        self.entries.iter().map(|(name, ready)| (*name, *ready))
    }

    fn mark_ready(&mut self, contract: ContractName) {
        self.entries.insert(contract, true);
    }

    fn reset(&mut self) {
        for ready in self.entries.values_mut() {
            *ready = false;
        }
    }
}

impl Default for ReadinessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractsState {
    Loading,
    Compiling(ContractName),
    Ready,
    Failed,
}

/// Region A: load, then compile every circuit strictly in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractsRegion {
    state: ContractsState,
    registry: ReadinessRegistry,
    error: Option<MachineError>,
    epoch: u64,
}

impl ContractsRegion {
    pub(crate) fn new() -> Self {
        Self {
            state: ContractsState::Loading,
            registry: ReadinessRegistry::new(),
            error: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> ContractsState {
        self.state
    }

    pub fn registry(&self) -> &ReadinessRegistry {
        &self.registry
    }

    pub fn error(&self) -> Option<&MachineError> {
        self.error.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.state == ContractsState::Ready
    }

    /// Bumped on reload; completions from an earlier epoch are ignored.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Reload is only honoured once the pipeline has settled. Returns whether loading restarted.
    pub(crate) fn reload(&mut self) -> bool {
        if !matches!(self.state, ContractsState::Ready | ContractsState::Failed) {
            return false;
        }
        self.epoch += 1;
        self.state = ContractsState::Loading;
        self.registry.reset();
        self.error = None;
        true
    }

    /// Returns the first contract to compile, or `None` when loading failed.
    pub(crate) fn on_loaded(
        &mut self,
        result: Result<(), MachineError>,
    ) -> Option<ContractName> {
        if self.state != ContractsState::Loading {
            return None;
        }
        match result {
            Ok(()) => {
                let first = ContractName::COMPILE_ORDER[0];
                self.state = ContractsState::Compiling(first);
                Some(first)
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Returns the next contract to compile; `None` once ready or failed.
    pub(crate) fn on_compiled(
        &mut self,
        contract: ContractName,
        result: Result<(), MachineError>,
    ) -> Option<ContractName> {
        if self.state != ContractsState::Compiling(contract) {
            return None;
        }
        if let Err(err) = result {
            self.fail(err);
            return None;
        }
        self.registry.mark_ready(contract);
        match contract.next() {
            Some(next) => {
                self.state = ContractsState::Compiling(next);
                Some(next)
            }
            None => {
                self.state = ContractsState::Ready;
                None
            }
        }
    }

    fn fail(&mut self, err: MachineError) {
        self.state = ContractsState::Failed;
        self.error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::{ContractsRegion, ContractsState};
    use crate::error::MachineError;
    use lumina_worker::ContractName;

    #[test]
    fn compiles_in_order_until_ready() {
        let mut region = ContractsRegion::new();
        let mut next = region.on_loaded(Ok(()));
        let mut order = Vec::new();
        while let Some(contract) = next {
            assert_eq!(region.state(), ContractsState::Compiling(contract));
            order.push(contract);
            next = region.on_compiled(contract, Ok(()));
        }
        assert_eq!(order, ContractName::COMPILE_ORDER.to_vec());
        assert!(region.is_ready());
        assert!(region.registry().all_ready());
    }

    #[test]
    fn out_of_order_completion_is_ignored() {
        let mut region = ContractsRegion::new();
        region.on_loaded(Ok(()));
        assert_eq!(region.on_compiled(ContractName::Pool, Ok(())), None);
        assert!(!region.registry().is_ready(ContractName::Pool));
        assert_eq!(region.state(), ContractsState::Compiling(ContractName::FungibleToken));
    }

    #[test]
    fn failure_is_terminal_until_reload() {
        let mut region = ContractsRegion::new();
        region.on_loaded(Ok(()));
        region.on_compiled(ContractName::FungibleToken, Ok(()));
        region.on_compiled(ContractName::Pool, Ok(()));
        let failed = region.on_compiled(
            ContractName::PoolTokenHolder,
            Err(MachineError::Compile("boom".to_string())),
        );
        assert_eq!(failed, None);
        assert_eq!(region.state(), ContractsState::Failed);
        assert_eq!(region.error(), Some(&MachineError::Compile("boom".to_string())));
        for contract in [
            ContractName::PoolTokenHolder,
            ContractName::FungibleTokenAdmin,
            ContractName::PoolFactory,
            ContractName::Faucet,
        ] {
            assert!(!region.registry().is_ready(contract));
        }

        let epoch = region.epoch();
        assert!(region.reload());
        assert_eq!(region.epoch(), epoch + 1);
        assert_eq!(region.state(), ContractsState::Loading);
        assert!(region.error().is_none());
        assert!(!region.registry().is_ready(ContractName::FungibleToken));
    }

    #[test]
    fn reload_ignored_while_compiling() {
        let mut region = ContractsRegion::new();
        region.on_loaded(Ok(()));
        assert!(!region.reload());
        assert_eq!(region.state(), ContractsState::Compiling(ContractName::FungibleToken));
    }

    #[test]
    fn load_failure_sets_error() {
        let mut region = ContractsRegion::new();
        let next = region.on_loaded(Err(MachineError::Compile("missing circuits".to_string())));
        assert_eq!(next, None);
        assert_eq!(region.state(), ContractsState::Failed);
    }
}
