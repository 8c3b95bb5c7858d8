use crate::{request_id_from_js, request_id_to_js};
use casper_signer_core::wasm::{JsApprovalSurface, JsQueueMirror};
use casper_signer_core::{
    InMemoryVault, KeyAlgorithm, KeyPair, KeyPairSigner, PageBridge, SignerError, SigningManager,
};
use js_sys::{Function, Promise};
use log::info;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

fn to_js(err: SignerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize: {}", e)))
}

/// Signer running in the extension's background context.
///
/// The popup is driven through `openPopup(kind)` / `closePopup()` and every
/// queue change is pushed to `onQueueUpdate(json)`. Queue updates are
/// delivered as microtasks, so the handler may call `approve` or `reject`
/// directly.
#[wasm_bindgen]
pub struct SignerExtension {
    bridge: PageBridge,
    vault: Arc<InMemoryVault>,
}

#[wasm_bindgen]
impl SignerExtension {
    #[wasm_bindgen(constructor)]
    pub fn new(open_popup: Function, close_popup: Function, on_queue_update: Function) -> Self {
        let vault = Arc::new(InMemoryVault::new());
        let manager = SigningManager::new(
            vault.clone(),
            Box::new(KeyPairSigner::new()),
            Arc::new(JsApprovalSurface::new(open_popup, close_popup)),
            Box::new(JsQueueMirror::new(on_queue_update)),
        );
        info!("Signer extension initialised");
        Self {
            bridge: PageBridge::new(Arc::new(manager)),
            vault,
        }
    }

    /// Hand an unlocked account to the signer. Returns its account-hex key.
    #[wasm_bindgen]
    pub fn add_account(&self, name: &str, algorithm: &str, secret_key_hex: &str) -> Result<String, JsValue> {
        let algorithm = match algorithm.to_ascii_lowercase().as_str() {
            "ed25519" => KeyAlgorithm::Ed25519,
            "secp256k1" => KeyAlgorithm::Secp256k1,
            other => return Err(JsValue::from_str(&format!("Unknown key algorithm: {}", other))),
        };
        let key_pair = KeyPair::from_secret_hex(algorithm, secret_key_hex).map_err(to_js)?;
        let account_hex = key_pair.public_key().to_account_hex();
        self.vault.add_account(name, key_pair);
        Ok(account_hex)
    }

    #[wasm_bindgen]
    pub fn select_account(&self, name: &str) -> Result<(), JsValue> {
        if self.vault.select(name) {
            Ok(())
        } else {
            Err(JsValue::from_str(&format!("Unknown account: {}", name)))
        }
    }

    /// Called by the connect popup once the user accepts.
    #[wasm_bindgen]
    pub fn approve_connection(&self) {
        self.vault.set_connected(true);
    }

    // Page-facing

    #[wasm_bindgen]
    pub fn is_connected(&self) -> bool {
        self.bridge.is_connected()
    }

    #[wasm_bindgen]
    pub fn request_connection(&self) {
        self.bridge.request_connection();
    }

    #[wasm_bindgen]
    pub fn disconnect_from_site(&self) {
        self.bridge.disconnect_from_site();
    }

    /// Resolves with the signed deploy JSON, rejects with the failure text.
    #[wasm_bindgen]
    pub fn sign(&self, deploy_json: String, signing_key: Option<String>) -> Promise {
        let bridge = self.bridge.clone();
        future_to_promise(async move {
            bridge
                .sign(&deploy_json, signing_key.as_deref())
                .await
                .map(|signed| JsValue::from_str(&signed))
                .map_err(to_js)
        })
    }

    #[wasm_bindgen]
    pub fn get_active_public_key(&self) -> Result<String, JsValue> {
        self.bridge.get_active_public_key().map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn get_selected_public_key_base64(&self) -> Result<String, JsValue> {
        self.bridge.get_selected_public_key_base64().map_err(to_js)
    }

    // Approval-facing

    /// Returns the settled request as JSON; check its `status`.
    #[wasm_bindgen]
    pub fn approve(&self, id: f64) -> Result<String, JsValue> {
        let id = request_id_from_js(id).map_err(|e| JsValue::from_str(&e))?;
        let settled = self.bridge.manager().approve(id).map_err(to_js)?;
        to_json(&settled)
    }

    #[wasm_bindgen]
    pub fn reject(&self, id: f64) -> Result<(), JsValue> {
        let id = request_id_from_js(id).map_err(|e| JsValue::from_str(&e))?;
        self.bridge.manager().reject(id).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn parse_deploy_data(&self, id: f64) -> Result<String, JsValue> {
        let id = request_id_from_js(id).map_err(|e| JsValue::from_str(&e))?;
        let summary = self.bridge.manager().parse_deploy_data(id).map_err(to_js)?;
        to_json(&summary)
    }

    /// Id of the oldest request still waiting for a decision.
    #[wasm_bindgen]
    pub fn next_pending_id(&self) -> Option<f64> {
        self.bridge
            .manager()
            .pending()
            .first()
            .map(|request| request_id_to_js(request.id()))
    }

    #[wasm_bindgen]
    pub fn get_requests(&self) -> Result<String, JsValue> {
        to_json(&self.bridge.manager().snapshot())
    }

    #[wasm_bindgen]
    pub fn clear_settled(&self) -> usize {
        self.bridge.manager().clear_settled()
    }
}
