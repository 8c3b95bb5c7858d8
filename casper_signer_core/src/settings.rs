use crate::error::CoreError;
use crate::manager::DEFAULT_MAX_SETTLED_REQUESTS;
use crate::public_key::KeyAlgorithm;
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[cfg(feature = "native")]
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine};

pub const CONFIG_PATH_ENV_VAR: &str = "CASPER_SIGNER_CONFIG_PATH";
pub const SECRET_KEY_ENV_VAR: &str = "CASPER_SIGNER_SECRET_KEY_B64";
pub const MIN_APPROVAL_TOKEN_LEN: usize = 16;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmName {
    Ed25519,
    Secp256k1,
}

impl From<AlgorithmName> for KeyAlgorithm {
    fn from(name: AlgorithmName) -> Self {
        match name {
            AlgorithmName::Ed25519 => KeyAlgorithm::Ed25519,
            AlgorithmName::Secp256k1 => KeyAlgorithm::Secp256k1,
        }
    }
}

/// One signing account. The secret comes from a key file, inline hex, or
/// (when neither is set) the `CASPER_SIGNER_SECRET_KEY_B64` env var.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: AlgorithmName,
    #[serde(default)]
    pub secret_key_path: Option<String>,
    #[serde(default)]
    pub secret_key_hex: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SignerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_max_settled_requests")]
    pub max_settled_requests: usize,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub selected_account: Option<String>,
    #[serde(default)]
    pub auto_connect: bool,
    /// Shared secret the approval routes require in `x-approval-token`.
    /// Generated at startup when unset.
    #[serde(default)]
    pub approval_token: Option<String>,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_settled_requests: default_max_settled_requests(),
            accounts: Vec::new(),
            selected_account: None,
            auto_connect: false,
            approval_token: None,
        }
    }
}

impl SignerSettings {
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Merge a partial update, only touching fields that differ
    pub fn merge(&mut self, other: &SignerSettings) {
        if other.bind_address != self.bind_address {
            self.bind_address = other.bind_address.clone();
        }
        if other.max_settled_requests != self.max_settled_requests {
            self.max_settled_requests = other.max_settled_requests;
        }
        if !other.accounts.is_empty() && other.accounts != self.accounts {
            self.accounts = other.accounts.clone();
        }
        if other.selected_account.is_some() && other.selected_account != self.selected_account {
            self.selected_account = other.selected_account.clone();
        }
        if other.auto_connect != self.auto_connect {
            self.auto_connect = other.auto_connect;
        }
        if other.approval_token.is_some() && other.approval_token != self.approval_token {
            self.approval_token = other.approval_token.clone();
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.bind_address.trim().is_empty() {
            return Err(CoreError::Validation("bind_address must not be empty".to_string()));
        }
        let mut names = std::collections::HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return Err(CoreError::Validation("account name must not be empty".to_string()));
            }
            if !names.insert(account.name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "duplicate account name: {}",
                    account.name
                )));
            }
            if account.secret_key_path.is_some() && account.secret_key_hex.is_some() {
                return Err(CoreError::Validation(format!(
                    "account {} sets both secret_key_path and secret_key_hex",
                    account.name
                )));
            }
        }
        if let Some(token) = &self.approval_token {
            if token.trim().len() < MIN_APPROVAL_TOKEN_LEN {
                return Err(CoreError::Validation(format!(
                    "approval_token must be at least {} characters",
                    MIN_APPROVAL_TOKEN_LEN
                )));
            }
        }
        if let Some(selected) = &self.selected_account {
            if !names.contains(selected.as_str()) {
                return Err(CoreError::Validation(format!(
                    "selected_account {} is not a configured account",
                    selected
                )));
            }
        }
        Ok(())
    }

    /// Path of the config file, from `CASPER_SIGNER_CONFIG_PATH` or `config.toml`.
    #[cfg(feature = "native")]
    pub fn config_path() -> String {
        std::env::var(CONFIG_PATH_ENV_VAR).unwrap_or_else(|_| "config.toml".to_string())
    }
}

/// Try to read a base64-encoded secret key from the given env var. Returns
/// the raw decoded bytes if present and valid, otherwise None.
#[cfg(feature = "native")]
pub fn load_secret_from_env_var(var: &str) -> Option<Vec<u8>> {
    let encoded = std::env::var(var).ok()?;
    match Base64Engine.decode(encoded.trim()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::error!("Failed to decode {}: {}", var, e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
pub fn load_secret_from_env_var(_var: &str) -> Option<Vec<u8>> {
    None
}

/// Fresh 32-byte approval token, hex encoded.
pub fn generate_approval_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn default_algorithm() -> AlgorithmName { AlgorithmName::Ed25519 }
fn default_bind_address() -> String { "127.0.0.1:8787".to_string() }
fn default_max_settled_requests() -> usize { DEFAULT_MAX_SETTLED_REQUESTS }
