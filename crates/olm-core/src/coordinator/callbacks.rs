// ── Engine callback handle ──

use olm_api::EngineEvent;
use tokio::sync::mpsc;
use tracing::debug;

use super::command::SessionEvent;

/// The handle the engine binding calls back into.
///
/// Cheap to clone and safe to call from any thread, including threads the
/// engine owns. Calls never block: each one just queues an event for the
/// session task, which applies them in arrival order.
#[derive(Clone)]
pub struct EngineCallbacks {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EngineCallbacks {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    pub fn registered(&self) {
        self.deliver(EngineEvent::Registered);
    }

    pub fn connected(&self) {
        self.deliver(EngineEvent::Connected);
    }

    pub fn terminated(&self) {
        self.deliver(EngineEvent::Terminated);
    }

    pub fn auth_error(&self, code: i32, message: impl Into<String>) {
        self.deliver(EngineEvent::AuthError {
            code,
            message: message.into(),
        });
    }

    /// Raw list-of-peer JSON as the engine sent it.
    pub fn peer_update(&self, peers_json: impl Into<String>) {
        self.deliver(EngineEvent::PeerUpdate(peers_json.into()));
    }

    pub fn deliver(&self, event: EngineEvent) {
        let name = event.name();
        if self.tx.send(SessionEvent::Engine(event)).is_err() {
            debug!(callback = name, "coordinator gone, dropping engine callback");
        }
    }
}

impl std::fmt::Debug for EngineCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCallbacks")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
