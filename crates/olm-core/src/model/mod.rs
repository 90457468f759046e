// ── Domain model ──
//
// Connection state, persisted user settings, and the peer ordering every
// observer sees. Wire payloads (`Status`, `Peer`, ...) are defined once in
// `olm-api` and re-exported here so consumers only depend on `olm-core`.

pub mod peer;
pub mod settings;
pub mod state;

// ── Re-exports ──────────────────────────────────────────────────────

pub use peer::{PeerOrder, connected_count, format_rtt, sort_peers};
pub use settings::{LogLevel, Settings};
pub use state::ConnectionState;

pub use olm_api::{Alias, Peer, PeerStatus, Status};
