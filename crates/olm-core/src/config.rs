// ── Runtime connection configuration ──
//
// These types describe *how* to start a session with the engine. They carry
// credentials and tuning but never touch disk; olm-config loads persisted
// `Settings` and the caller converts them with `Settings::to_connection_config`.

use std::time::Duration;

use secrecy::SecretString;

pub const MIN_MTU: u32 = 1280;
pub const MAX_MTU: u32 = 1500;
pub const DEFAULT_MTU: u32 = 1420;

/// How often the status pull runs while connected.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// A connection request, before validation.
///
/// Immutable once handed to the coordinator; a new request supersedes the
/// previous one rather than mutating it.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ConnectionConfig {
    /// Control server URL.
    pub endpoint: String,
    /// Client id.
    pub id: String,
    pub secret: SecretString,
    /// Alternative credential. When present, `id`, `secret` and `org_id`
    /// may be left empty.
    pub user_token: Option<SecretString>,
    pub org_id: String,
    pub mtu: u32,
    /// Primary DNS server handed to the tunnel.
    pub dns: String,
    pub upstream_dns: Vec<String>,
    pub holepunch: bool,
    pub tunnel_dns: bool,
    pub override_dns: bool,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            id: String::new(),
            secret: SecretString::from(String::new()),
            user_token: None,
            org_id: String::new(),
            mtu: DEFAULT_MTU,
            dns: "9.9.9.9".into(),
            upstream_dns: vec!["8.8.8.8:53".into()],
            holepunch: true,
            tunnel_dns: false,
            override_dns: false,
            ping_interval: Duration::from_secs(3),
            ping_timeout: Duration::from_secs(5),
        }
    }
}

/// Tuning for the coordinator itself.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Status pull period while `Connected`. Zero disables the timer;
    /// `refresh_now` still works.
    pub sync_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}
