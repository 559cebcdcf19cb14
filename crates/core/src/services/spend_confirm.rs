//! Interactive confirmation before coins are spent.
//!
//! A [`ConfirmationGate`] holds at most one outstanding request. Installing a
//! new request first resolves the previous one as declined, so a waiter is
//! never left hanging. Answers name the request they are for, so an answer to
//! a superseded prompt never confirms its replacement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use amora_common::IdGenerator;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, oneshot};

/// What the user is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub id: String,
    pub amount: i64,
    pub reason: String,
    pub description: Option<String>,
}

impl ConfirmationRequest {
    /// Build a request with a fresh ID.
    #[must_use]
    pub fn new(amount: i64, reason: &str, description: Option<String>) -> Self {
        Self {
            id: IdGenerator::new().generate(),
            amount,
            reason: reason.to_string(),
            description,
        }
    }
}

struct Outstanding {
    request: ConfirmationRequest,
    responder: oneshot::Sender<bool>,
}

/// Handle for awaiting the answer to one request.
#[derive(Debug)]
pub struct PendingConfirmation {
    id: String,
    answer: oneshot::Receiver<bool>,
}

impl PendingConfirmation {
    /// ID of the request this handle waits on.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the answer. A superseded or abandoned request reads as declined.
    pub async fn wait(self) -> bool {
        self.answer.await.unwrap_or(false)
    }
}

/// Single-slot confirmation mailbox.
#[derive(Default)]
pub struct ConfirmationGate {
    slot: Mutex<Option<Outstanding>>,
}

impl ConfirmationGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `request`, declining whatever was outstanding.
    pub async fn request(&self, request: ConfirmationRequest) -> PendingConfirmation {
        let (tx, rx) = oneshot::channel();
        let id = request.id.clone();

        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            tracing::debug!(request_id = %previous.request.id, "Superseding outstanding confirmation");
            let _ = previous.responder.send(false);
        }
        *slot = Some(Outstanding {
            request,
            responder: tx,
        });

        PendingConfirmation { id, answer: rx }
    }

    /// Ask and wait for the answer.
    pub async fn confirm(&self, request: ConfirmationRequest) -> bool {
        self.request(request).await.wait().await
    }

    /// Ask and wait at most `timeout`. No answer in time counts as declined
    /// and withdraws the request.
    pub async fn confirm_within(&self, request: ConfirmationRequest, timeout: Duration) -> bool {
        let pending = self.request(request).await;
        let id = pending.id.clone();

        if let Ok(answer) = tokio::time::timeout(timeout, pending.wait()).await {
            answer
        } else {
            self.withdraw(&id).await;
            false
        }
    }

    /// Answer the outstanding request if it is still `id`. Returns whether
    /// the answer was delivered.
    pub async fn respond(&self, id: &str, accepted: bool) -> bool {
        let outstanding = self.slot.lock().await.take_if(|o| o.request.id == id);
        let Some(o) = outstanding else {
            tracing::debug!(request_id = %id, "Answer for a request that is no longer outstanding");
            return false;
        };

        // The waiter may already be gone; the answer is still consumed
        let _ = o.responder.send(accepted);
        true
    }

    /// The outstanding request, for display.
    pub async fn pending(&self) -> Option<ConfirmationRequest> {
        self.slot.lock().await.as_ref().map(|o| o.request.clone())
    }

    /// Drop the outstanding request if it is still `id`.
    pub async fn withdraw(&self, id: &str) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|o| o.request.id == id) {
            *slot = None;
        }
    }

    fn is_idle(&self) -> bool {
        self.slot.try_lock().is_ok_and(|slot| slot.is_none())
    }
}

/// One gate per user.
#[derive(Default, Clone)]
pub struct ConfirmationRegistry {
    gates: Arc<RwLock<HashMap<String, Arc<ConfirmationGate>>>>,
}

impl ConfirmationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's gate, created on first use.
    pub async fn gate_for(&self, user_id: &str) -> Arc<ConfirmationGate> {
        if let Some(gate) = self.gates.read().await.get(user_id) {
            return Arc::clone(gate);
        }

        let mut gates = self.gates.write().await;
        Arc::clone(
            gates
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(ConfirmationGate::new())),
        )
    }

    /// The user's gate if one exists.
    pub async fn existing(&self, user_id: &str) -> Option<Arc<ConfirmationGate>> {
        self.gates.read().await.get(user_id).cloned()
    }

    /// Forget the user's gate once nothing is waiting on it.
    ///
    /// A gate still held by a request handler stays; the last holder to
    /// release it removes it.
    pub async fn release(&self, user_id: &str) {
        let mut gates = self.gates.write().await;
        if gates.get(user_id).is_some_and(|g| unused(g)) {
            gates.remove(user_id);
        }
    }

    /// Drop every gate nobody is using. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut gates = self.gates.write().await;
        let before = gates.len();
        gates.retain(|_, g| !unused(g));
        before - gates.len()
    }

    /// Number of users with a gate.
    pub async fn len(&self) -> usize {
        self.gates.read().await.len()
    }

    /// Whether no user has a gate.
    pub async fn is_empty(&self) -> bool {
        self.gates.read().await.is_empty()
    }
}

// Only the registry holds it and no request is outstanding
fn unused(gate: &Arc<ConfirmationGate>) -> bool {
    Arc::strong_count(gate) == 1 && gate.is_idle()
}
