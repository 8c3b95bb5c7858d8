// Collaborators backed by JavaScript callbacks supplied by the extension page

use crate::approval_surface::{ApprovalSurface, PopupKind};
use crate::models::SigningRequest;
use crate::queue::QueueMirror;
use js_sys::Function;
use log::{debug, error};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

/// Opens and closes the extension popup through `openPopup(kind)` and
/// `closePopup()`.
pub struct JsApprovalSurface {
    open_popup: Function,
    close_popup: Function,
}

impl JsApprovalSurface {
    pub fn new(open_popup: Function, close_popup: Function) -> Self {
        Self {
            open_popup,
            close_popup,
        }
    }
}

impl ApprovalSurface for JsApprovalSurface {
    fn open(&self, kind: PopupKind) {
        debug!("Opening {} popup", kind);
        if let Err(e) = self
            .open_popup
            .call1(&JsValue::NULL, &JsValue::from_str(&kind.to_string()))
        {
            error!("openPopup callback failed: {:?}", e);
        }
    }

    fn close(&self) {
        if let Err(e) = self.close_popup.call0(&JsValue::NULL) {
            error!("closePopup callback failed: {:?}", e);
        }
    }
}

/// Hands every queue snapshot to `onQueueUpdate(json)` as a JSON string.
///
/// The callback runs as a microtask, after the signer has released its
/// state, so it may call straight back into `approve` / `reject`.
/// Snapshots arrive in publication order.
pub struct JsQueueMirror {
    on_update: Function,
}

impl JsQueueMirror {
    pub fn new(on_update: Function) -> Self {
        Self { on_update }
    }
}

impl QueueMirror for JsQueueMirror {
    fn publish(&self, snapshot: &[SigningRequest]) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize queue snapshot: {}", e);
                return;
            }
        };
        let on_update = self.on_update.clone();
        spawn_local(async move {
            if let Err(e) = on_update.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                error!("onQueueUpdate callback failed: {:?}", e);
            }
        });
    }
}
