// Signing Manager
//
// Flow:
//   1. A page calls `submit` (or `sign_deploy`). The deploy is parsed, queued,
//      a completion waiter is registered for its id and only then is the
//      approval surface opened. The caller awaits the waiter.
//   2. The approval surface calls `approve` or `reject`. Both funnel every
//      terminal transition through `finalize`, which writes the queue and
//      fires the waiter exactly once.
//
// A deploy that fails to parse is queued as `Failed` and the caller gets the
// error straight away; nobody will ever approve or reject it.

use crate::account_provider::AccountProvider;
use crate::approval_surface::{ApprovalSurface, PopupKind};
use crate::completion::{CompletionBus, CompletionReceiver};
use crate::deploy::Deploy;
use crate::error::{SignerError, SignerResult};
use crate::id_generator::{IdSource, SequentialIdGenerator};
use crate::models::{DisplaySummary, RequestFailure, RequestId, RequestStatus, SigningRequest};
use crate::projector::project;
use crate::queue::{QueueMirror, RequestQueue};
use crate::transaction_signer::DeploySigner;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_MAX_SETTLED_REQUESTS: usize = 16;

struct ManagerState {
    ids: Box<dyn IdSource>,
    queue: RequestQueue,
    completions: CompletionBus,
}

pub struct SigningManager {
    state: Mutex<ManagerState>,
    accounts: Arc<dyn AccountProvider>,
    signer: Box<dyn DeploySigner>,
    surface: Arc<dyn ApprovalSurface>,
    max_settled_requests: usize,
}

/// A submitted deploy whose outcome has not been awaited yet.
#[must_use = "the deploy outcome is only observed by awaiting `wait`"]
pub struct PendingDeploy {
    id: RequestId,
    receiver: CompletionReceiver,
}

impl PendingDeploy {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Resolve once the request reaches a terminal state.
    pub async fn wait(self) -> SignerResult<Deploy> {
        let id = self.id;
        let request = self.receiver.await.map_err(|_| {
            SignerError::Internal(format!("completion channel for deploy {} closed", id))
        })?;

        match request.status() {
            RequestStatus::Signed => request.deploy().cloned().ok_or_else(|| {
                SignerError::Internal(format!("deploy {} was signed without a payload", id))
            }),
            RequestStatus::Failed => Err(request
                .error()
                .cloned()
                .map(SignerError::from)
                .unwrap_or(SignerError::Cancelled)),
            RequestStatus::Unsigned => Err(SignerError::Internal(format!(
                "Deploy data: {:?}",
                request
            ))),
        }
    }
}

impl SigningManager {
    pub fn new(
        accounts: Arc<dyn AccountProvider>,
        signer: Box<dyn DeploySigner>,
        surface: Arc<dyn ApprovalSurface>,
        mirror: Box<dyn QueueMirror>,
    ) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                ids: Box::new(SequentialIdGenerator::new()),
                queue: RequestQueue::new(mirror),
                completions: CompletionBus::new(),
            }),
            accounts,
            signer,
            surface,
            max_settled_requests: DEFAULT_MAX_SETTLED_REQUESTS,
        }
    }

    pub fn with_id_source(self, ids: Box<dyn IdSource>) -> Self {
        self.lock().ids = ids;
        self
    }

    pub fn with_max_settled_requests(mut self, limit: usize) -> Self {
        self.max_settled_requests = limit;
        self
    }

    pub fn accounts(&self) -> &Arc<dyn AccountProvider> {
        &self.accounts
    }

    pub fn surface(&self) -> &Arc<dyn ApprovalSurface> {
        &self.surface
    }

    /// Queue a deploy and wait for the user's decision.
    pub async fn sign_deploy(
        &self,
        deploy_json: &serde_json::Value,
        signing_key: &str,
    ) -> SignerResult<Deploy> {
        self.submit(deploy_json, signing_key)?.wait().await
    }

    /// Queue a deploy and open the approval surface.
    ///
    /// `signing_key` is the account-hex key the page intends to sign with;
    /// it is compared against the active account when the user approves.
    pub fn submit(
        &self,
        deploy_json: &serde_json::Value,
        signing_key: &str,
    ) -> SignerResult<PendingDeploy> {
        self.enqueue_parsed(Deploy::from_json(deploy_json), signing_key)
    }

    /// Same as [`submit`](Self::submit) for a deploy still in string form.
    /// Malformed JSON is recorded like any other parse failure.
    pub fn submit_str(&self, raw_deploy: &str, signing_key: &str) -> SignerResult<PendingDeploy> {
        let parsed = serde_json::from_str::<serde_json::Value>(raw_deploy)
            .map_err(|e| SignerError::ParseFailure(e.to_string()))
            .and_then(|value| Deploy::from_json(&value));
        self.enqueue_parsed(parsed, signing_key)
    }

    fn enqueue_parsed(
        &self,
        parsed: SignerResult<Deploy>,
        signing_key: &str,
    ) -> SignerResult<PendingDeploy> {
        let signing_key = signing_key.trim().to_ascii_lowercase();

        let pending = {
            let mut state = self.lock();
            let id = state.ids.next_id();

            match parsed {
                Ok(deploy) => {
                    let receiver = state.completions.register(id)?;
                    state
                        .queue
                        .enqueue(SigningRequest::unsigned(id, deploy, signing_key));
                    info!("Deploy {} queued for signing", id);
                    PendingDeploy { id, receiver }
                }
                Err(err) => {
                    warn!("Deploy {} could not be parsed: {}", id, err);
                    let failure = match &err {
                        SignerError::ParseFailure(msg) => RequestFailure::ParseFailure(msg.clone()),
                        other => RequestFailure::ParseFailure(other.to_string()),
                    };
                    state
                        .queue
                        .enqueue(SigningRequest::failed_at_birth(id, signing_key, failure));
                    state.queue.evict_settled(self.max_settled_requests);
                    return Err(err);
                }
            }
        };

        self.surface.open(PopupKind::SignDeploy);
        Ok(pending)
    }

    /// Sign the request with the active account.
    ///
    /// Returns the settled request. A request that could not be signed
    /// (key switched, no payload, signer error) still settles as `Failed`
    /// and is returned as `Ok`; only bad ids and missing preconditions are
    /// errors.
    pub fn approve(&self, id: RequestId) -> SignerResult<SigningRequest> {
        let (request, drained) = {
            let mut state = self.lock();
            let mut request = state.queue.find_by_id(id)?.clone();
            let account = self
                .accounts
                .selected_account()
                .ok_or(SignerError::NoActiveAccount)?;
            if request.is_settled() {
                return Err(SignerError::AlreadySettled(id));
            }

            match request.deploy().cloned() {
                None => {
                    warn!("Deploy {} has no payload, refusing to sign", id);
                    request.mark_failed(RequestFailure::NullPayload);
                }
                Some(_) if account.public_key().to_account_hex() != request.signing_key() => {
                    warn!(
                        "Active key changed during signing of deploy {}: requested {}, active {}",
                        id,
                        request.signing_key(),
                        account.public_key()
                    );
                    request.mark_failed(RequestFailure::KeyChangedDuringSigning);
                }
                Some(deploy) => match self.signer.sign_deploy(&deploy, &account.key_pair) {
                    Ok(signed) => {
                        info!("Deploy {} signed by {}", id, account.name);
                        request.mark_signed(signed);
                    }
                    Err(err) => {
                        warn!("Signer failed for deploy {}: {}", id, err);
                        request.mark_failed(RequestFailure::SigningFailed(err.to_string()));
                    }
                },
            }

            self.finalize(&mut state, request.clone())?;
            state.queue.evict_settled(self.max_settled_requests);
            let drained = state.queue.pending().is_empty();
            (request, drained)
        };

        if drained {
            self.surface.close();
        }
        Ok(request)
    }

    /// Decline the request and drop it from the queue.
    pub fn reject(&self, id: RequestId) -> SignerResult<()> {
        {
            let mut state = self.lock();
            let mut request = state.queue.find_by_id(id)?.clone();
            if request.is_settled() {
                return Err(SignerError::AlreadySettled(id));
            }
            request.mark_failed(RequestFailure::UserCancelled);
            self.finalize(&mut state, request)?;
            state.queue.remove(id);
            info!("Deploy {} rejected", id);
        }
        self.surface.close();
        Ok(())
    }

    /// Single choke point for status writes. Emits completion for terminal
    /// states only.
    fn finalize(&self, state: &mut ManagerState, request: SigningRequest) -> SignerResult<()> {
        let id = request.id();
        let terminal = request.is_settled();
        state.queue.replace(id, request.clone())?;
        if terminal {
            let delivered = state.completions.emit(id, request);
            debug!("Deploy {} finished (listener present: {})", id, delivered);
        }
        Ok(())
    }

    /// Account-hex key of the selected account.
    pub fn get_active_public_key(&self) -> SignerResult<String> {
        if !self.accounts.is_connected() {
            return Err(SignerError::NotConnected);
        }
        let account = self
            .accounts
            .selected_account()
            .ok_or(SignerError::NoAccount)?;
        let key = account.public_key();
        key.algorithm()?;
        Ok(key.to_account_hex())
    }

    pub fn parse_deploy_data(&self, id: RequestId) -> SignerResult<DisplaySummary> {
        let state = self.lock();
        project(state.queue.find_by_id(id)?)
    }

    pub fn find_by_id(&self, id: RequestId) -> SignerResult<SigningRequest> {
        self.lock().queue.find_by_id(id).cloned()
    }

    pub fn snapshot(&self) -> Vec<SigningRequest> {
        self.lock().queue.snapshot()
    }

    pub fn pending(&self) -> Vec<SigningRequest> {
        self.lock().queue.pending()
    }

    pub fn clear_settled(&self) -> usize {
        self.lock().queue.clear_settled()
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn enqueue_raw(&self, request: SigningRequest) -> CompletionReceiver {
        let mut state = self.lock();
        let id = state.queue.enqueue(request);
        state.completions.register(id).unwrap()
    }
}
