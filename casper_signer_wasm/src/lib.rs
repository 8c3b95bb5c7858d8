// Casper Signer WASM Bindings
// Background half of the browser extension

use casper_signer_core::id_generator::MAX_SAFE_INTEGER;
use casper_signer_core::RequestId;

#[cfg(target_arch = "wasm32")]
mod extension;

#[cfg(target_arch = "wasm32")]
pub use extension::SignerExtension;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// Initialize panic hook and logger for WASM
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Request ids cross into JS as plain numbers.
pub fn request_id_from_js(id: f64) -> Result<RequestId, String> {
    if !id.is_finite() || id < 0.0 || id.fract() != 0.0 || id > MAX_SAFE_INTEGER as f64 {
        return Err(format!("Invalid deploy id: {}", id));
    }
    Ok(RequestId(id as u64))
}

pub fn request_id_to_js(id: RequestId) -> f64 {
    id.0 as f64
}
