// Ordered store of signing requests, mirrored to the approval surface

use crate::error::{SignerError, SignerResult};
use crate::models::{RequestId, SigningRequest};
use crate::platform::MaybeSendSync;
use log::debug;

/// Receives the full ordered queue after every mutation.
///
/// `publish` runs while the manager's state is locked. Implementations that
/// hand the snapshot to code which may call back into the manager must
/// defer that hand-off until `publish` has returned.
pub trait QueueMirror: MaybeSendSync {
    fn publish(&self, snapshot: &[SigningRequest]);
}

/// Mirror that drops every snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMirror;

impl QueueMirror for NullMirror {
    fn publish(&self, _snapshot: &[SigningRequest]) {}
}

pub struct RequestQueue {
    requests: Vec<SigningRequest>,
    mirror: Box<dyn QueueMirror>,
}

impl RequestQueue {
    pub fn new(mirror: Box<dyn QueueMirror>) -> Self {
        Self {
            requests: Vec::new(),
            mirror,
        }
    }

    pub fn enqueue(&mut self, request: SigningRequest) -> RequestId {
        let id = request.id();
        self.requests.push(request);
        self.publish();
        id
    }

    pub fn find_by_id(&self, id: RequestId) -> SignerResult<&SigningRequest> {
        self.requests
            .iter()
            .find(|request| request.id() == id)
            .ok_or(SignerError::NotFound(id))
    }

    pub fn replace(&mut self, id: RequestId, updated: SigningRequest) -> SignerResult<()> {
        let slot = self
            .requests
            .iter_mut()
            .find(|request| request.id() == id)
            .ok_or(SignerError::NotFound(id))?;
        *slot = updated;
        self.publish();
        Ok(())
    }

    /// Remove a request. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: RequestId) -> Option<SigningRequest> {
        let index = self.requests.iter().position(|request| request.id() == id)?;
        let removed = self.requests.remove(index);
        self.publish();
        Some(removed)
    }

    pub fn snapshot(&self) -> Vec<SigningRequest> {
        self.requests.clone()
    }

    pub fn pending(&self) -> Vec<SigningRequest> {
        self.requests
            .iter()
            .filter(|request| !request.is_settled())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Drop the oldest settled requests until at most `limit` remain.
    /// Unsigned requests are never touched.
    pub fn evict_settled(&mut self, limit: usize) -> Vec<RequestId> {
        let settled = self.requests.iter().filter(|r| r.is_settled()).count();
        if settled <= limit {
            return Vec::new();
        }

        let mut to_evict = settled - limit;
        let mut evicted = Vec::with_capacity(to_evict);
        self.requests.retain(|request| {
            if to_evict > 0 && request.is_settled() {
                to_evict -= 1;
                evicted.push(request.id());
                false
            } else {
                true
            }
        });
        debug!("Evicted {} settled deploy(s): {:?}", evicted.len(), evicted);
        self.publish();
        evicted
    }

    pub fn clear_settled(&mut self) -> usize {
        let before = self.requests.len();
        self.requests.retain(|request| !request.is_settled());
        let removed = before - self.requests.len();
        if removed > 0 {
            self.publish();
        }
        removed
    }

    fn publish(&self) {
        debug!("Publishing queue snapshot ({} deploys)", self.requests.len());
        self.mirror.publish(&self.requests);
    }
}
