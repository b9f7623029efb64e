//! Wallet boundary and the listener that relays account/network changes into the machine.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lumina_worker::{Address, TxPayload};

use crate::error::{MachineError, WalletError};
use crate::machine::{Event, MachineHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Mainnet,
    #[default]
    Devnet,
    ZekoMainnet,
    ZekoTestnet,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Devnet,
        Network::ZekoMainnet,
        Network::ZekoTestnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mina:mainnet",
            Network::Devnet => "mina:devnet",
            Network::ZekoMainnet => "zeko:mainnet",
            Network::ZekoTestnet => "zeko:testnet",
        }
    }

    /// Path segment used by the token list CDN.
    pub fn slug(&self) -> &'static str {
        match self {
            Network::Mainnet => "mina-mainnet",
            Network::Devnet => "mina-devnet",
            Network::ZekoMainnet => "zeko-mainnet",
            Network::ZekoTestnet => "zeko-testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = MachineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|network| network.as_str() == value || network.slug() == value)
            .or(match value {
                "mainnet" => Some(Network::Mainnet),
                "devnet" => Some(Network::Devnet),
                _ => None,
            })
            .ok_or_else(|| MachineError::InvalidSettings(format!("unknown network {value}")))
    }
}

/// Opaque result returned by the wallet after broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult(pub serde_json::Value);

impl TxResult {
    pub fn hash(&self) -> Option<&str> {
        self.0.get("hash").and_then(serde_json::Value::as_str)
    }
}

/// Signs and broadcasts worker-built transactions. Provider error codes are not interpreted.
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn send_transaction(&self, payload: TxPayload) -> Result<TxResult, WalletError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletState {
    pub account: Option<Address>,
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountChanged(Option<Address>),
    NetworkChanged(Network),
}

/// Forwards wallet changes to the machine, dropping repeats of the last seen value.
pub struct WalletListener {
    events: mpsc::Receiver<WalletEvent>,
    machine: MachineHandle,
    last: WalletState,
}

impl WalletListener {
    pub fn new(events: mpsc::Receiver<WalletEvent>, machine: MachineHandle) -> Self {
        let last = machine.snapshot().wallet;
        Self {
            events,
            machine,
            last,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if !self.record(&event) {
                debug!(?event, "wallet event unchanged");
                continue;
            }
            info!(?event, "wallet changed");
            if self.machine.send(Event::WalletChanged(event)).await.is_err() {
                warn!("machine closed; wallet listener stopping");
                return;
            }
        }
        debug!("wallet event source closed");
    }

    fn record(&mut self, event: &WalletEvent) -> bool {
        match event {
            WalletEvent::AccountChanged(account) => {
                if self.last.account == *account {
                    return false;
                }
                self.last.account = account.clone();
            }
            WalletEvent::NetworkChanged(network) => {
                if self.last.network == *network {
                    return false;
                }
                self.last.network = *network;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Network, TxResult};

    #[test]
    fn network_parses_all_spellings() {
        assert_eq!("mina:mainnet".parse::<Network>().expect("id"), Network::Mainnet);
        assert_eq!("zeko-testnet".parse::<Network>().expect("slug"), Network::ZekoTestnet);
        assert_eq!("devnet".parse::<Network>().expect("short"), Network::Devnet);
        assert!("berkeley".parse::<Network>().is_err());
    }

    #[test]
    fn tx_result_exposes_hash() {
        let result = TxResult(serde_json::json!({ "hash": "5Jabc" }));
        assert_eq!(result.hash(), Some("5Jabc"));
        assert_eq!(TxResult(serde_json::json!(null)).hash(), None);
    }
}
