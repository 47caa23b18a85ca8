//! Decision authority collaborators.
//!
//! [`StaticAuthority`] answers every request the same way. The channel pair
//! from [`channel`] connects mediating threads to an asynchronous endpoint
//! (typically a user-space policy daemon): each request travels over an
//! mpsc queue with a oneshot reply, and the mediating thread blocks on the
//! reply until the endpoint answers or drops the request.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::decision::{AuthorityError, DecisionAuthority, DecisionRequest};
use crate::types::Answer;

/// Authority giving the same answer to every request.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthority(pub Answer);

impl DecisionAuthority for StaticAuthority {
    fn decide(&self, _request: DecisionRequest) -> Result<Answer, AuthorityError> {
        Ok(self.0)
    }
}

/// A request waiting at the endpoint for its answer.
pub struct PendingDecision {
    /// The request as sent by the mediating thread.
    pub request: DecisionRequest,
    reply: oneshot::Sender<Answer>,
}

impl std::fmt::Debug for PendingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDecision")
            .field("request", &self.request)
            .field("reply", &"<oneshot::Sender>")
            .finish()
    }
}

impl PendingDecision {
    /// Deliver `answer` to the waiting thread.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Disconnected`] if the waiting side is gone.
    pub fn respond(self, answer: Answer) -> Result<(), AuthorityError> {
        let request_id = self.request.request_id;
        debug!(%request_id, %answer, "responding to decision request");
        self.reply
            .send(answer)
            .map_err(|_| AuthorityError::Disconnected)
    }
}

/// Mediating side of the channel; implements [`DecisionAuthority`].
///
/// `decide` blocks the current thread, so it must not be called from
/// inside an async runtime worker; use `spawn_blocking` there.
#[derive(Clone)]
pub struct ChannelAuthority {
    requests: mpsc::UnboundedSender<PendingDecision>,
}

impl DecisionAuthority for ChannelAuthority {
    fn decide(&self, request: DecisionRequest) -> Result<Answer, AuthorityError> {
        let request_id = request.request_id;
        let (reply, answer) = oneshot::channel();
        self.requests
            .send(PendingDecision { request, reply })
            .map_err(|_| {
                warn!(%request_id, "decision endpoint closed");
                AuthorityError::Disconnected
            })?;
        answer.blocking_recv().map_err(|_| {
            warn!(%request_id, "decision request dropped without answer");
            AuthorityError::NoAnswer(request_id)
        })
    }
}

impl std::fmt::Debug for ChannelAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelAuthority")
            .field("closed", &self.requests.is_closed())
            .finish()
    }
}

/// Endpoint side of the channel, consumed by the answering task.
pub struct AuthorityEndpoint {
    requests: mpsc::UnboundedReceiver<PendingDecision>,
}

impl AuthorityEndpoint {
    /// Next pending request, or `None` once every [`ChannelAuthority`] is dropped.
    pub async fn recv(&mut self) -> Option<PendingDecision> {
        self.requests.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for non-async endpoints.
    pub fn blocking_recv(&mut self) -> Option<PendingDecision> {
        self.requests.blocking_recv()
    }

    /// Stop accepting requests; later `decide` calls fail with `Disconnected`.
    pub fn close(&mut self) {
        self.requests.close();
    }
}

impl std::fmt::Debug for AuthorityEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityEndpoint").finish_non_exhaustive()
    }
}

/// Create a connected authority/endpoint pair.
pub fn channel() -> (ChannelAuthority, AuthorityEndpoint) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelAuthority { requests: tx },
        AuthorityEndpoint { requests: rx },
    )
}
