// Native implementations

pub mod key_loader;

pub use key_loader::{load_key_pair, load_vault};
