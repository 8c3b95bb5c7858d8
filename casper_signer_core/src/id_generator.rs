// Request identifier generation

use crate::models::RequestId;
use rand::Rng;

/// Largest integer a page-side `Number` can hold exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Source of request identifiers. Swap in a different implementation to
/// change how ids are produced without touching the manager.
pub trait IdSource: Send {
    fn next_id(&mut self) -> RequestId;
}

/// Random seed, then increment with wraparound below [`MAX_SAFE_INTEGER`].
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen_range(0..MAX_SAFE_INTEGER))
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { next: seed }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIdGenerator {
    fn next_id(&mut self) -> RequestId {
        self.next %= MAX_SAFE_INTEGER;
        let id = self.next;
        self.next += 1;
        RequestId(id)
    }
}
