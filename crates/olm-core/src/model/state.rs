// ── Connection state machine ──

use olm_api::EngineEvent;
use strum::IntoStaticStr;

/// Connection state observable by consumers.
///
/// Exactly one variant is current at a time. Only the coordinator's
/// session task writes it, and only in response to an engine callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoStaticStr)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Registered,
    Connected,
    Terminated,
    AuthError { code: i32, message: String },
}

impl ConnectionState {
    /// The state an engine lifecycle callback moves us to.
    ///
    /// Total over lifecycle callbacks: every one yields a next state, from
    /// every current state. `PeerUpdate` carries data, not a transition,
    /// and yields `None`.
    pub fn on_event(&self, event: &EngineEvent) -> Option<Self> {
        let next = match event {
            EngineEvent::Registered => Self::Registered,
            EngineEvent::Connected => Self::Connected,
            EngineEvent::Terminated => Self::Terminated,
            EngineEvent::AuthError { code, message } => Self::AuthError {
                code: *code,
                message: message.clone(),
            },
            EngineEvent::PeerUpdate(_) => return None,
        };
        Some(next)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Human-readable label for status lines.
    pub fn display_name(&self) -> String {
        match self {
            Self::AuthError { message, .. } => format!("Auth Error: {message}"),
            other => <&'static str>::from(other).to_owned(),
        }
    }

    /// Variant name without payload, for structured log fields.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> Vec<ConnectionState> {
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Registered,
            ConnectionState::Connected,
            ConnectionState::Terminated,
            ConnectionState::AuthError {
                code: 401,
                message: "bad secret".into(),
            },
        ]
    }

    fn lifecycle_events() -> Vec<EngineEvent> {
        vec![
            EngineEvent::Registered,
            EngineEvent::Connected,
            EngineEvent::Terminated,
            EngineEvent::AuthError {
                code: 403,
                message: "forbidden".into(),
            },
        ]
    }

    #[test]
    fn every_lifecycle_callback_has_a_transition_from_every_state() {
        for state in all_states() {
            for event in lifecycle_events() {
                assert!(
                    state.on_event(&event).is_some(),
                    "{state:?} has no transition for {event:?}"
                );
            }
        }
    }

    #[test]
    fn transitions_follow_the_table() {
        let from = ConnectionState::Disconnected;
        assert_eq!(
            from.on_event(&EngineEvent::Registered),
            Some(ConnectionState::Registered)
        );
        assert_eq!(
            ConnectionState::Registered.on_event(&EngineEvent::Connected),
            Some(ConnectionState::Connected)
        );
        assert_eq!(
            ConnectionState::Connected.on_event(&EngineEvent::Terminated),
            Some(ConnectionState::Terminated)
        );
        assert_eq!(
            ConnectionState::Connected.on_event(&EngineEvent::AuthError {
                code: 401,
                message: "expired".into()
            }),
            Some(ConnectionState::AuthError {
                code: 401,
                message: "expired".into()
            })
        );
    }

    #[test]
    fn peer_update_is_not_a_transition() {
        for state in all_states() {
            assert_eq!(state.on_event(&EngineEvent::PeerUpdate("[]".into())), None);
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(ConnectionState::Connected.display_name(), "Connected");
        assert_eq!(
            ConnectionState::AuthError {
                code: 401,
                message: "token expired".into()
            }
            .display_name(),
            "Auth Error: token expired"
        );
        assert_eq!(
            ConnectionState::AuthError {
                code: 1,
                message: String::new()
            }
            .kind(),
            "AuthError"
        );
    }
}
