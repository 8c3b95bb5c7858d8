// Casper Signer Core Library
// Platform-agnostic deploy signing broker

pub mod error;
pub mod platform;
pub mod public_key;
pub mod deploy;
pub mod models;
pub mod id_generator;
pub mod queue;
pub mod completion;
pub mod projector;
pub mod transaction_signer;
pub mod approval_surface;
pub mod account_provider;
pub mod manager;
pub mod bridge;
pub mod settings;

#[cfg(feature = "native")]
pub mod native;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

// Re-exports
pub use error::{CoreError, SignerError, SignerResult};
pub use models::*;
pub use deploy::Deploy;
pub use public_key::{KeyAlgorithm, KeyPair, PublicKey};
pub use account_provider::{AccountProvider, ActiveAccount, InMemoryVault};
pub use approval_surface::{ApprovalSurface, HeadlessSurface, PopupKind};
pub use queue::{NullMirror, QueueMirror};
pub use transaction_signer::{DeploySigner, KeyPairSigner};
pub use manager::{PendingDeploy, SigningManager};
pub use bridge::PageBridge;
pub use settings::SignerSettings;
