use thiserror::Error;

/// Top-level error type for the `olm-api` crate.
///
/// Covers the two ways the engine boundary can fail: a call that never
/// reaches the engine, and a payload that comes back unreadable.
/// `olm-core` decides which of these are fatal (none of them are).
#[derive(Debug, Error)]
pub enum Error {
    // ── Delivery ────────────────────────────────────────────────────
    /// The boundary call could not be handed to the engine.
    #[error("engine call `{call}` could not be delivered: {reason}")]
    Delivery { call: &'static str, reason: String },

    /// The engine has not been started or has already shut down.
    #[error("engine is not running")]
    Unavailable,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("failed to decode {what}: {message}")]
    Deserialization {
        what: &'static str,
        message: String,
        body: String,
    },

    /// JSON serialization of an outbound payload failed.
    #[error("failed to encode {what}: {message}")]
    Serialization { what: &'static str, message: String },
}

impl Error {
    /// Whether the error came from a payload rather than the transport.
    pub fn is_payload(&self) -> bool {
        matches!(
            self,
            Self::Deserialization { .. } | Self::Serialization { .. }
        )
    }
}
