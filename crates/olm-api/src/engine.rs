//! The engine contract: calls into it and callbacks out of it.

use std::fmt;

use crate::error::Error;

/// Boundary calls the control surface makes into the tunneling engine.
///
/// Implementations wrap whatever foreign binding hosts the engine. Every
/// method is synchronous from the engine's point of view and may block;
/// `olm-core` never calls these on a UI-facing path, only from its own
/// boundary worker via `spawn_blocking`.
///
/// Lifecycle calls return nothing useful on success. Their effects show up
/// later as [`EngineEvent`]s.
pub trait Engine: Send + Sync + 'static {
    /// Start a session with a canonical `ConnectionConfig` JSON body.
    fn connect(&self, config_json: &str) -> Result<(), Error>;

    /// Tear the current session down. Must tolerate no active session.
    fn disconnect(&self) -> Result<(), Error>;

    /// Reassociate with another organization without a full reconnect.
    fn switch_org(&self, org_id: &str) -> Result<(), Error>;

    /// Apply a partial runtime settings update, e.g. `{"logLevel":"DEBUG"}`.
    fn update_settings(&self, settings_json: &str) -> Result<(), Error>;

    /// Synchronous `Status` snapshot as JSON.
    fn get_status(&self) -> Result<String, Error>;

    /// Synchronous list-of-`Peer` snapshot as JSON.
    fn get_peers(&self) -> Result<String, Error>;
}

/// Callbacks the engine makes into the control surface.
///
/// These arrive on whatever thread the engine happens to use. `olm-core`
/// funnels them into one queue so the state machine sees them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Registered,
    Connected,
    Terminated,
    AuthError { code: i32, message: String },
    /// Raw list-of-`Peer` JSON. Decoded by the consumer, not the sender.
    PeerUpdate(String),
}

impl EngineEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Connected => "connected",
            Self::Terminated => "terminated",
            Self::AuthError { .. } => "authError",
            Self::PeerUpdate(_) => "peerUpdate",
        }
    }
}

/// A fire-and-forget call queued for the engine.
#[derive(Clone, PartialEq, Eq)]
pub enum BoundaryCall {
    Connect { config_json: String },
    Disconnect,
    SwitchOrg { org_id: String },
    UpdateSettings { settings_json: String },
}

impl BoundaryCall {
    /// The name of the boundary function this call maps to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect => "disconnect",
            Self::SwitchOrg { .. } => "switchOrg",
            Self::UpdateSettings { .. } => "updateSettings",
        }
    }

    /// Deliver this call to an engine.
    pub fn deliver(&self, engine: &dyn Engine) -> Result<(), Error> {
        match self {
            Self::Connect { config_json } => engine.connect(config_json),
            Self::Disconnect => engine.disconnect(),
            Self::SwitchOrg { org_id } => engine.switch_org(org_id),
            Self::UpdateSettings { settings_json } => engine.update_settings(settings_json),
        }
    }
}

// The connect body carries credentials; keep it out of logs.
impl fmt::Debug for BoundaryCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { .. } => f.write_str("Connect { config_json: <redacted> }"),
            Self::Disconnect => f.write_str("Disconnect"),
            Self::SwitchOrg { org_id } => f.debug_struct("SwitchOrg").field("org_id", org_id).finish(),
            Self::UpdateSettings { settings_json } => f
                .debug_struct("UpdateSettings")
                .field("settings_json", settings_json)
                .finish(),
        }
    }
}
