// Page-facing surface of the signer
//
// Everything a web page may ask for goes through here. The page never sees
// the queue or the approval operations; those stay on `SigningManager`.

use crate::approval_surface::PopupKind;
use crate::error::{SignerError, SignerResult};
use crate::manager::SigningManager;
use crate::public_key::PublicKey;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use std::sync::Arc;

#[derive(Clone)]
pub struct PageBridge {
    manager: Arc<SigningManager>,
}

impl PageBridge {
    pub fn new(manager: Arc<SigningManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SigningManager> {
        &self.manager
    }

    pub fn is_connected(&self) -> bool {
        self.manager.accounts().is_connected()
    }

    /// Ask the user to connect this site. Already connected sites get no popup.
    pub fn request_connection(&self) {
        if self.is_connected() {
            debug!("Site already connected, not opening connect popup");
            return;
        }
        info!("Requesting site connection");
        self.manager.surface().open(PopupKind::Connect);
    }

    pub fn disconnect_from_site(&self) {
        info!("Disconnecting site");
        self.manager.accounts().disconnect();
    }

    /// Submit a deploy for signing and wait for the user's decision.
    ///
    /// `signing_key_hint` is the key the page expects to sign with, as
    /// account hex or as the base64 raw key; without one the currently
    /// active key is used. Returns the
    /// signed deploy as a JSON string in the same `{"deploy": ..}` envelope.
    pub async fn sign(&self, deploy_json: &str, signing_key_hint: Option<&str>) -> SignerResult<String> {
        if !self.is_connected() {
            return Err(SignerError::NotConnected);
        }
        let signing_key = match signing_key_hint.map(str::trim) {
            Some(hint) if !hint.is_empty() => self.resolve_key_hint(hint)?,
            _ => self.manager.get_active_public_key()?,
        };

        let signed = self
            .manager
            .submit_str(deploy_json, &signing_key)?
            .wait()
            .await?;
        Ok(serde_json::to_string(&signed.to_json()?)?)
    }

    pub fn get_active_public_key(&self) -> SignerResult<String> {
        self.manager.get_active_public_key()
    }

    /// Turn a page's key hint into account hex.
    ///
    /// Accepts account hex or the base64 raw key bytes handed out by
    /// [`get_selected_public_key_base64`](Self::get_selected_public_key_base64).
    /// Base64 carries no algorithm tag, so the selected account's tag is
    /// assumed; a different key still fails the check at approval time.
    fn resolve_key_hint(&self, hint: &str) -> SignerResult<String> {
        if let Ok(key) = PublicKey::from_account_hex(hint) {
            return Ok(key.to_account_hex());
        }
        let raw = STANDARD.decode(hint).map_err(|_| {
            SignerError::InvalidKey(format!("signing key is neither account hex nor base64: {}", hint))
        })?;
        let account = self
            .manager
            .accounts()
            .selected_account()
            .ok_or(SignerError::NoAccount)?;
        debug!("Resolved base64 key hint against account {}", account.name);
        Ok(PublicKey::from_raw_parts(account.public_key().tag(), raw).to_account_hex())
    }

    /// Raw bytes of the selected key (without the algorithm tag), base64.
    pub fn get_selected_public_key_base64(&self) -> SignerResult<String> {
        let accounts = self.manager.accounts();
        if !accounts.is_connected() {
            return Err(SignerError::NotConnected);
        }
        let account = accounts.selected_account().ok_or(SignerError::NoAccount)?;
        Ok(STANDARD.encode(account.public_key().raw_bytes()))
    }
}
