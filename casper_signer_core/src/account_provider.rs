// Active account and connection state, as seen by the signer

use crate::platform::MaybeSendSync;
use crate::public_key::{KeyPair, PublicKey};
use log::info;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct ActiveAccount {
    pub name: String,
    pub key_pair: KeyPair,
}

impl ActiveAccount {
    pub fn public_key(&self) -> &PublicKey {
        self.key_pair.public_key()
    }
}

/// Read access to the vault's selected account plus the site connection flag.
pub trait AccountProvider: MaybeSendSync {
    fn selected_account(&self) -> Option<ActiveAccount>;
    fn is_connected(&self) -> bool;
    fn disconnect(&self);
}

#[derive(Debug, Default)]
struct VaultState {
    accounts: Vec<ActiveAccount>,
    selected: Option<usize>,
    connected: bool,
}

/// Unlocked in-memory vault. Key storage proper lives elsewhere; this holds
/// whatever accounts the host process hands over.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    state: RwLock<VaultState>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account; the first one added becomes the selection.
    pub fn add_account(&self, name: impl Into<String>, key_pair: KeyPair) {
        let mut state = self.write();
        state.accounts.push(ActiveAccount {
            name: name.into(),
            key_pair,
        });
        if state.selected.is_none() {
            state.selected = Some(state.accounts.len() - 1);
        }
    }

    /// Select by name. Returns false if no such account exists.
    pub fn select(&self, name: &str) -> bool {
        let mut state = self.write();
        match state.accounts.iter().position(|a| a.name == name) {
            Some(index) => {
                state.selected = Some(index);
                info!("Active account switched to {}", name);
                true
            }
            None => false,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.write().connected = connected;
    }

    pub fn account_names(&self) -> Vec<String> {
        self.read().accounts.iter().map(|a| a.name.clone()).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VaultState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, VaultState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AccountProvider for InMemoryVault {
    fn selected_account(&self) -> Option<ActiveAccount> {
        let state = self.read();
        state.selected.and_then(|i| state.accounts.get(i).cloned())
    }

    fn is_connected(&self) -> bool {
        self.read().connected
    }

    fn disconnect(&self) {
        self.set_connected(false);
        info!("Site disconnected from signer");
    }
}
