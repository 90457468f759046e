// ── Peer and status views ──
//
// Lock-free storage for the current peer list and status snapshot, with
// change broadcast over `watch` channels. Every write replaces a view
// wholesale; there is no field-level merge. Only the coordinator's session
// task writes, so push and pull updates never interleave.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use olm_api::{Peer, Status};
use tokio::sync::watch;

use crate::model::peer::{canonicalize, connected_count};
use crate::stream::ViewStream;

/// A decoded engine snapshot, from either a push or a pull.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Peers(Vec<Peer>),
    Status(Status),
    Both { status: Status, peers: Vec<Peer> },
}

/// Current peer list and status, as observers see them.
pub struct SessionStore {
    peers: watch::Sender<Arc<Vec<Peer>>>,
    status: watch::Sender<Option<Arc<Status>>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (peers, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(None);
        let (last_update, _) = watch::channel(None);
        Self {
            peers,
            status,
            last_update,
        }
    }

    // ── Writes (session task only) ───────────────────────────────────

    /// Replace the views covered by `snapshot`. Last delivered wins.
    pub(crate) fn apply(&self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Peers(peers) => self.replace_peers(peers),
            Snapshot::Status(status) => self.replace_status(status),
            Snapshot::Both { status, peers } => {
                self.replace_status(status);
                self.replace_peers(peers);
            }
        }
        self.last_update.send_replace(Some(Utc::now()));
    }

    /// Empty both views.
    pub(crate) fn clear(&self) {
        self.peers.send_replace(Arc::new(Vec::new()));
        self.status.send_replace(None);
        self.last_update.send_replace(None);
    }

    fn replace_peers(&self, peers: Vec<Peer>) {
        let peers = canonicalize(peers);
        tracing::debug!(count = peers.len(), "peer list replaced");
        self.peers.send_replace(Arc::new(peers));
    }

    fn replace_status(&self, mut status: Status) {
        status.peers = canonicalize(std::mem::take(&mut status.peers));
        self.status.send_replace(Some(Arc::new(status)));
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn peers_snapshot(&self) -> Arc<Vec<Peer>> {
        self.peers.borrow().clone()
    }

    pub fn status_snapshot(&self) -> Option<Arc<Status>> {
        self.status.borrow().clone()
    }

    pub fn peer_by_site_id(&self, site_id: i64) -> Option<Peer> {
        self.peers
            .borrow()
            .iter()
            .find(|p| p.site_id == site_id)
            .cloned()
    }

    pub fn connected_count(&self) -> usize {
        connected_count(self.peers.borrow().as_slice())
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_peers(&self) -> ViewStream<Arc<Vec<Peer>>> {
        ViewStream::new(self.peers.subscribe())
    }

    pub fn subscribe_status(&self) -> ViewStream<Option<Arc<Status>>> {
        ViewStream::new(self.status.subscribe())
    }
}
