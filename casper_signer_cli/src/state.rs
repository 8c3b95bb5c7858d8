use casper_signer_core::{
    error::CoreError, native::load_vault, HeadlessSurface, InMemoryVault, KeyPairSigner,
    NullMirror, PageBridge, SignerSettings, SigningManager,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub bridge: PageBridge,
    pub vault: Arc<InMemoryVault>,
    pub started_at: DateTime<Utc>,
    pub approval_token: Arc<str>,
}

impl ApiState {
    pub fn new(vault: Arc<InMemoryVault>, max_settled_requests: usize, approval_token: &str) -> Self {
        let manager = SigningManager::new(
            vault.clone(),
            Box::new(KeyPairSigner::new()),
            Arc::new(HeadlessSurface),
            Box::new(NullMirror),
        )
        .with_max_settled_requests(max_settled_requests);

        Self {
            bridge: PageBridge::new(Arc::new(manager)),
            vault,
            started_at: Utc::now(),
            approval_token: Arc::from(approval_token),
        }
    }

    pub fn from_settings(settings: &SignerSettings, approval_token: &str) -> Result<Self, CoreError> {
        let vault = Arc::new(load_vault(settings)?);
        Ok(Self::new(vault, settings.max_settled_requests, approval_token))
    }

    pub fn manager(&self) -> &Arc<SigningManager> {
        self.bridge.manager()
    }
}
