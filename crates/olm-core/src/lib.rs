// olm-core: session coordination between the engine boundary and the UI.
//
// Owns the connection state machine, validates connection configs before
// they cross the boundary, merges pushed and pulled status into observable
// views, and runs the tunnel provisioning protocol the engine drives.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod exchange;
pub mod model;
pub mod provision;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConnectionConfig, CoordinatorConfig, DEFAULT_MTU, MAX_MTU, MIN_MTU};
pub use coordinator::{Coordinator, EngineCallbacks};
pub use error::{CoreError, ProvisionError};
pub use exchange::{FieldError, ValidatedConfig, ValidationError, validate};
pub use provision::{
    InterfaceHandle, InterfacePlan, IpPrefix, TunnelBuilder, TunnelInterfaceSpec, TunnelPlatform,
    TunnelProvisioner, parse_cidr, provision_and_detach,
};
pub use store::{SessionStore, Snapshot};
pub use stream::ViewStream;

pub use model::{
    Alias, ConnectionState, LogLevel, Peer, PeerOrder, PeerStatus, Settings, Status,
    connected_count, format_rtt, sort_peers,
};

pub use olm_api::{Engine, EngineEvent, SettingsUpdate};
