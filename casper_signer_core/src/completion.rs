// Per-request completion channel
//
// Each request gets at most one waiter. Emitting consumes the sender, so a
// second emission for the same id has nothing to deliver to.

use crate::error::{SignerError, SignerResult};
use crate::models::{RequestId, SigningRequest};
use futures::channel::oneshot;
use log::{debug, warn};
use std::collections::HashMap;

pub type CompletionReceiver = oneshot::Receiver<SigningRequest>;

#[derive(Debug, Default)]
pub struct CompletionBus {
    waiters: HashMap<RequestId, oneshot::Sender<SigningRequest>>,
}

impl CompletionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single waiter for `id`.
    pub fn register(&mut self, id: RequestId) -> SignerResult<CompletionReceiver> {
        if self.waiters.contains_key(&id) {
            return Err(SignerError::AlreadyRegistered(id));
        }
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);
        Ok(rx)
    }

    /// Deliver the terminal request to its waiter, if any.
    ///
    /// Returns whether a waiter was registered. Emitting for an id nobody
    /// waits on is not an error.
    pub fn emit(&mut self, id: RequestId, request: SigningRequest) -> bool {
        let Some(tx) = self.waiters.remove(&id) else {
            debug!("No completion listener for deploy {}", id);
            return false;
        };
        if tx.send(request).is_err() {
            warn!("Submitter of deploy {} stopped waiting before completion", id);
        }
        true
    }

    pub fn is_registered(&self, id: RequestId) -> bool {
        self.waiters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
