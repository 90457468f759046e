// ── Core error types ──
//
// Errors surfaced by olm-core to its callers. Engine-side failures after a
// call has been queued are never returned here: they are logged and the
// state machine waits for the engine's callbacks instead.

use std::io;

use thiserror::Error;

use crate::exchange::ValidationError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A session is already {state}; disconnect first")]
    SessionActive { state: &'static str },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Coordinator has shut down")]
    ShutDown,

    // ── Wrapped ──────────────────────────────────────────────────────
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Engine error: {0}")]
    Engine(#[from] olm_api::Error),
}

/// Failures of the tunnel provisioning protocol.
///
/// Every variant leaves no interface behind: an `establish` that fails has
/// either not reached the OS or the OS refused it outright.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("No VPN service is attached")]
    NoService,

    #[error("Interface spec is not usable: {reason}")]
    UnusableSpec { reason: &'static str },

    #[error("An interface was already established for this connect attempt")]
    AlreadyEstablished,

    #[error("The connect attempt this builder belonged to has ended")]
    StaleAttempt,

    #[error("Operating system refused to create the tunnel interface")]
    Denied(#[source] io::Error),

    #[error("Interface handle was already detached")]
    AlreadyDetached,

    #[error("Invalid address: {input}")]
    InvalidAddress { input: String },

    #[error("Prefix length {prefix} is out of range for {input}")]
    InvalidPrefix { input: String, prefix: u8 },

    #[error("MTU {mtu} is out of range")]
    InvalidMtu { mtu: u32 },
}

impl CoreError {
    /// Whether the caller can fix this by changing its input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
