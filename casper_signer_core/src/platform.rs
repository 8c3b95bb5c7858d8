// Thread-safety bound for collaborator traits
//
// Native collaborators are shared across tokio tasks and need Send + Sync.
// In the browser everything runs on one thread and JS handles are not Send,
// so the bound disappears on wasm32.

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}
