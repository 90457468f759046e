// ── Peer ordering and presentation helpers ──

use std::cmp::Ordering;
use std::collections::HashSet;

use olm_api::{Peer, PeerStatus};

/// The three keys observers sort peers by.
///
/// Implemented for both the detailed [`Peer`] and the lightweight
/// [`PeerStatus`] so the two views never disagree on order.
pub trait PeerOrder {
    fn site_id(&self) -> i64;
    fn is_connected(&self) -> bool;
    fn rtt(&self) -> i64;
}

impl PeerOrder for Peer {
    fn site_id(&self) -> i64 {
        self.site_id
    }
    fn is_connected(&self) -> bool {
        self.connected
    }
    fn rtt(&self) -> i64 {
        self.rtt
    }
}

impl PeerOrder for PeerStatus {
    fn site_id(&self) -> i64 {
        self.site_id
    }
    fn is_connected(&self) -> bool {
        self.connected
    }
    fn rtt(&self) -> i64 {
        self.rtt
    }
}

fn compare<P: PeerOrder>(a: &P, b: &P) -> Ordering {
    // Connected first, then fastest, then lowest site id.
    b.is_connected()
        .cmp(&a.is_connected())
        .then_with(|| a.rtt().cmp(&b.rtt()))
        .then_with(|| a.site_id().cmp(&b.site_id()))
}

/// Sort peers into observer order. Stable.
pub fn sort_peers<P: PeerOrder>(peers: &mut [P]) {
    peers.sort_by(compare);
}

/// Drop duplicate site ids, keeping the last entry the engine sent for each.
pub(crate) fn dedupe_by_site_id<P: PeerOrder>(peers: Vec<P>) -> Vec<P> {
    let mut seen = HashSet::with_capacity(peers.len());
    let mut kept: Vec<P> = peers
        .into_iter()
        .rev()
        .filter(|p| seen.insert(p.site_id()))
        .collect();
    kept.reverse();
    kept
}

/// Normalize an engine peer list: unique site ids, observer order.
pub(crate) fn canonicalize<P: PeerOrder>(peers: Vec<P>) -> Vec<P> {
    let before = peers.len();
    let mut peers = dedupe_by_site_id(peers);
    if peers.len() != before {
        tracing::debug!(
            dropped = before - peers.len(),
            "duplicate site ids in peer snapshot"
        );
    }
    sort_peers(&mut peers);
    peers
}

pub fn connected_count<P: PeerOrder>(peers: &[P]) -> usize {
    peers.iter().filter(|p| p.is_connected()).count()
}

/// Format a round-trip time in milliseconds for display.
pub fn format_rtt(rtt_ms: i64) -> String {
    match rtt_ms {
        ..1 => "< 1 ms".to_owned(),
        1..1000 => format!("{rtt_ms} ms"),
        _ => format!("{}.{} s", rtt_ms / 1000, (rtt_ms % 1000) / 100),
    }
}
