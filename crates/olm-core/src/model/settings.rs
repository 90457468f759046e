// ── Persisted user settings ──
//
// The full record kept in the secure store. Every field has a default so a
// partially written or older record still decodes; unknown keys are ignored.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::{ConnectionConfig, DEFAULT_MTU, MAX_MTU, MIN_MTU};
use crate::exchange::{FieldError, ValidationError};

/// Engine log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse leniently: anything unrecognized is `INFO`.
    pub fn parse_lenient(raw: &str) -> Self {
        Self::from_str(raw.trim()).unwrap_or_default()
    }
}

/// User-editable settings, stored encrypted at rest.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Settings {
    pub endpoint: String,
    pub id: String,
    pub secret: String,
    pub user_token: String,
    pub org_id: String,
    pub mtu: u32,
    pub dns: String,
    #[serde(rename = "upstreamDNS")]
    pub upstream_dns: Vec<String>,
    pub holepunch: bool,
    #[serde(rename = "tunnelDNS")]
    pub tunnel_dns: bool,
    #[serde(rename = "overrideDNS")]
    pub override_dns: bool,
    pub ping_interval: String,
    pub ping_timeout: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            id: String::new(),
            secret: String::new(),
            user_token: String::new(),
            org_id: String::new(),
            mtu: DEFAULT_MTU,
            dns: "9.9.9.9".into(),
            upstream_dns: vec!["8.8.8.8:53".into()],
            holepunch: true,
            tunnel_dns: false,
            override_dns: false,
            ping_interval: "3s".into(),
            ping_timeout: "5s".into(),
            log_level: LogLevel::Info.to_string(),
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .field("secret", &redact(&self.secret))
            .field("user_token", &redact(&self.user_token))
            .field("org_id", &self.org_id)
            .field("mtu", &self.mtu)
            .field("dns", &self.dns)
            .field("upstream_dns", &self.upstream_dns)
            .field("holepunch", &self.holepunch)
            .field("tunnel_dns", &self.tunnel_dns)
            .field("override_dns", &self.override_dns)
            .field("ping_interval", &self.ping_interval)
            .field("ping_timeout", &self.ping_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "****" }
}

impl Settings {
    /// Set the MTU, keeping the previous value if the new one is out of range.
    pub fn set_mtu(&mut self, mtu: u32) -> Result<(), ValidationError> {
        if !(MIN_MTU..=MAX_MTU).contains(&mtu) {
            return Err(FieldError::mtu_out_of_range(mtu).into());
        }
        self.mtu = mtu;
        Ok(())
    }

    /// Replace the upstream DNS list, trimming entries and dropping blanks.
    pub fn set_upstream_dns<I, S>(&mut self, servers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.upstream_dns = clean_dns_list(servers);
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level.to_string();
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse_lenient(&self.log_level)
    }

    /// Build the connection request handed to the config exchange.
    ///
    /// Only the ping durations are checked here; everything else is the
    /// exchange's job so the caller gets one complete list of problems.
    pub fn to_connection_config(&self) -> Result<ConnectionConfig, ValidationError> {
        let mut errors = Vec::new();
        let ping_interval = parse_duration("pingInterval", &self.ping_interval, &mut errors);
        let ping_timeout = parse_duration("pingTimeout", &self.ping_timeout, &mut errors);
        if !errors.is_empty() {
            return Err(ValidationError::new(errors));
        }

        let user_token = (!self.user_token.trim().is_empty())
            .then(|| SecretString::from(self.user_token.clone()));

        Ok(ConnectionConfig {
            endpoint: self.endpoint.clone(),
            id: self.id.clone(),
            secret: SecretString::from(self.secret.clone()),
            user_token,
            org_id: self.org_id.clone(),
            mtu: self.mtu,
            dns: self.dns.clone(),
            upstream_dns: self.upstream_dns.clone(),
            holepunch: self.holepunch,
            tunnel_dns: self.tunnel_dns,
            override_dns: self.override_dns,
            ping_interval: ping_interval.unwrap_or_default(),
            ping_timeout: ping_timeout.unwrap_or_default(),
        })
    }
}

pub(crate) fn clean_dns_list<I, S>(servers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    servers
        .into_iter()
        .map(|s| s.as_ref().trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_duration(
    field: &'static str,
    raw: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Duration> {
    match humantime::parse_duration(raw.trim()) {
        Ok(d) => Some(d),
        Err(e) => {
            errors.push(FieldError::new(field, format!("'{raw}' is not a duration: {e}")));
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn populated() -> Settings {
        Settings {
            endpoint: "https://app.pangolin.net".into(),
            id: "olm_123".into(),
            secret: "s3cret".into(),
            user_token: "tok".into(),
            org_id: "org_9".into(),
            mtu: 1380,
            dns: "1.1.1.1".into(),
            upstream_dns: vec!["8.8.8.8:53".into(), "1.0.0.1:53".into()],
            holepunch: false,
            tunnel_dns: true,
            override_dns: true,
            ping_interval: "10s".into(),
            ping_timeout: "1s".into(),
            log_level: "DEBUG".into(),
        }
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let settings = populated();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"endpoint":"https://e","mtu":1400,"themeColor":"purple"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.endpoint, "https://e");
        assert_eq!(settings.mtu, 1400);
        assert_eq!(settings.dns, "9.9.9.9");
    }

    #[test]
    fn wire_names_match_schema() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "endpoint",
            "id",
            "secret",
            "userToken",
            "orgId",
            "mtu",
            "dns",
            "upstreamDNS",
            "holepunch",
            "tunnelDNS",
            "overrideDNS",
            "pingInterval",
            "pingTimeout",
            "logLevel",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 14);
    }

    #[test]
    fn mtu_bounds() {
        let mut settings = Settings::default();
        assert!(settings.set_mtu(1279).is_err());
        assert_eq!(settings.mtu, DEFAULT_MTU);
        settings.set_mtu(1280).unwrap();
        settings.set_mtu(1500).unwrap();
        assert_eq!(settings.mtu, 1500);
        let err = settings.set_mtu(1501).unwrap_err();
        assert!(err.mentions("mtu"));
        assert_eq!(settings.mtu, 1500);
    }

    #[test]
    fn upstream_dns_is_trimmed() {
        let mut settings = Settings::default();
        settings.set_upstream_dns([" 8.8.8.8:53 ", "", "   ", "1.1.1.1:53"]);
        assert_eq!(settings.upstream_dns, vec!["8.8.8.8:53", "1.1.1.1:53"]);
    }

    #[test]
    fn log_level_is_lenient() {
        assert_eq!(LogLevel::parse_lenient("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Info);
        let mut settings = Settings::default();
        settings.set_log_level(LogLevel::Warn);
        assert_eq!(settings.log_level, "WARN");
    }

    #[test]
    fn converts_to_connection_config() {
        let config = populated().to_connection_config().unwrap();
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.ping_timeout, Duration::from_secs(1));
        assert_eq!(
            config.user_token.as_ref().map(|t| t.expose_secret().to_owned()),
            Some("tok".to_owned())
        );
    }

    #[test]
    fn bad_durations_name_their_fields() {
        let settings = Settings {
            ping_interval: "soon".into(),
            ping_timeout: "later".into(),
            ..Settings::default()
        };
        let err = settings.to_connection_config().unwrap_err();
        assert!(err.mentions("pingInterval"));
        assert!(err.mentions("pingTimeout"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", populated());
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("\"tok\""));
        assert!(rendered.contains("olm_123"));
    }
}
