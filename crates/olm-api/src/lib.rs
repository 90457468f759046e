// olm-api: the boundary between the mobile control surface and the tunneling engine.
//
// The engine (packet processing, crypto, NAT traversal) lives on the far side
// of a cross-language boundary. This crate owns the contract only: the calls
// we make into it, the callbacks it makes into us, and the JSON payloads
// that cross in both directions.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{BoundaryCall, Engine, EngineEvent};
pub use error::Error;
pub use types::{
    Alias, ConnectionConfigPayload, Peer, PeerStatus, SettingsUpdate, Status, decode_peers,
    decode_status,
};
