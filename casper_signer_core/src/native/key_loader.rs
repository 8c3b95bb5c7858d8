// Builds the daemon's vault from configured accounts

use crate::account_provider::InMemoryVault;
use crate::error::CoreError;
use crate::public_key::KeyPair;
use crate::settings::{load_secret_from_env_var, AccountConfig, SignerSettings, SECRET_KEY_ENV_VAR};
use log::{info, warn};
use std::path::Path;

/// Resolve one account's secret key.
///
/// Key files hold the raw secret as hex. An account with neither a path nor
/// inline hex falls back to the base64 secret in `CASPER_SIGNER_SECRET_KEY_B64`.
pub fn load_key_pair(account: &AccountConfig) -> Result<KeyPair, CoreError> {
    let algorithm = account.algorithm.into();

    if let Some(path) = &account.secret_key_path {
        let contents = std::fs::read_to_string(Path::new(path))?;
        return KeyPair::from_secret_hex(algorithm, contents.trim());
    }
    if let Some(secret_hex) = &account.secret_key_hex {
        return KeyPair::from_secret_hex(algorithm, secret_hex.trim());
    }
    match load_secret_from_env_var(SECRET_KEY_ENV_VAR) {
        Some(secret) => KeyPair::from_secret_bytes(algorithm, &secret),
        None => Err(CoreError::Config(format!(
            "account {} has no secret_key_path, secret_key_hex or {}",
            account.name, SECRET_KEY_ENV_VAR
        ))),
    }
}

pub fn load_vault(settings: &SignerSettings) -> Result<InMemoryVault, CoreError> {
    settings.validate()?;
    let vault = InMemoryVault::new();
    for account in &settings.accounts {
        let key_pair = load_key_pair(account)?;
        info!("Loaded account {} ({})", account.name, key_pair.public_key());
        vault.add_account(account.name.clone(), key_pair);
    }

    if let Some(selected) = &settings.selected_account {
        vault.select(selected);
    }
    if settings.accounts.is_empty() {
        warn!("No accounts configured; signing requests cannot be approved");
    }
    vault.set_connected(settings.auto_connect);
    Ok(vault)
}
