// WASM-specific implementations

pub mod callbacks;

pub use callbacks::{JsApprovalSurface, JsQueueMirror};
