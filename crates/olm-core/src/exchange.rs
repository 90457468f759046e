// ── Config exchange ──
//
// Validates a `ConnectionConfig` locally and produces the canonical JSON
// body for the engine's `connect` call. Nothing crosses the boundary until
// validation passes, and a rejected config changes no state.

use std::fmt;
use std::time::Duration;

use olm_api::ConnectionConfigPayload;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{ConnectionConfig, MAX_MTU, MIN_MTU};
use crate::error::CoreError;
use crate::model::settings::clean_dns_list;

// ── Validation errors ────────────────────────────────────────────────

/// One offending field, named as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn mtu_out_of_range(mtu: u32) -> Self {
        Self::new(
            "mtu",
            format!("{mtu} is outside {MIN_MTU}..={MAX_MTU}"),
        )
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// A config was rejected before reaching the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid connection config: {}", join(.errors))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` (wire name) is among the offending fields.
    pub fn mentions(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl From<FieldError> for ValidationError {
    fn from(error: FieldError) -> Self {
        Self::new(vec![error])
    }
}

// ── Validated output ─────────────────────────────────────────────────

/// A config that passed validation, with its canonical engine body.
#[derive(Clone)]
pub struct ValidatedConfig {
    payload: ConnectionConfigPayload,
    json: String,
}

impl ValidatedConfig {
    pub fn payload(&self) -> &ConnectionConfigPayload {
        &self.payload
    }

    /// The exact body handed to the engine's `connect`.
    pub fn as_json(&self) -> &str {
        &self.json
    }

    pub fn org_id(&self) -> &str {
        &self.payload.org_id
    }

    pub(crate) fn into_json(self) -> String {
        self.json
    }
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("endpoint", &self.payload.endpoint)
            .field("id", &self.payload.id)
            .field("org_id", &self.payload.org_id)
            .field("mtu", &self.payload.mtu)
            .finish_non_exhaustive()
    }
}

// ── Validation ───────────────────────────────────────────────────────

impl ConnectionConfig {
    /// Validate and canonicalize. Every offending field is reported at once.
    pub fn validate(&self) -> Result<ValidatedConfig, CoreError> {
        validate(self)
    }
}

/// Validate a connection config and produce its canonical engine body.
pub fn validate(config: &ConnectionConfig) -> Result<ValidatedConfig, CoreError> {
    let mut errors = Vec::new();

    let endpoint = config.endpoint.trim();
    if endpoint.is_empty() {
        errors.push(FieldError::new("endpoint", "must not be empty"));
    }

    let user_token = config
        .user_token
        .as_ref()
        .map(|t| t.expose_secret().trim())
        .filter(|t| !t.is_empty());

    // A user token stands in for the client credentials.
    if user_token.is_none() {
        for (field, value) in [
            ("id", config.id.as_str()),
            ("secret", config.secret.expose_secret()),
            ("orgId", config.org_id.as_str()),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(
                    field,
                    "must not be empty without a user token",
                ));
            }
        }
    }

    let mtu = match u16::try_from(config.mtu) {
        Ok(mtu) if (MIN_MTU..=MAX_MTU).contains(&config.mtu) => mtu,
        _ => {
            errors.push(FieldError::mtu_out_of_range(config.mtu));
            0
        }
    };

    for (field, value) in [
        ("pingInterval", config.ping_interval),
        ("pingTimeout", config.ping_timeout),
    ] {
        if value.is_zero() {
            errors.push(FieldError::new(field, "must be greater than zero"));
        }
    }

    if !errors.is_empty() {
        tracing::debug!(fields = errors.len(), "connection config rejected");
        return Err(ValidationError::new(errors).into());
    }

    let payload = ConnectionConfigPayload {
        endpoint: endpoint.to_owned(),
        id: config.id.trim().to_owned(),
        secret: config.secret.expose_secret().to_owned(),
        user_token: user_token.map(str::to_owned),
        org_id: config.org_id.trim().to_owned(),
        mtu,
        dns: config.dns.trim().to_owned(),
        upstream_dns: clean_dns_list(&config.upstream_dns),
        holepunch: config.holepunch,
        tunnel_dns: config.tunnel_dns,
        override_dns: config.override_dns,
        ping_interval: go_duration(config.ping_interval),
        ping_timeout: go_duration(config.ping_timeout),
    };

    let json = serde_json::to_string(&payload).map_err(|e| olm_api::Error::Serialization {
        what: "connection config",
        message: e.to_string(),
    })?;

    Ok(ValidatedConfig { payload, json })
}

/// Render a duration the way the engine's duration parser expects,
/// e.g. `3s`, `1500ms`. Never loses precision.
fn go_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", d.as_millis())
    } else if nanos % 1_000 == 0 {
        format!("{}us", d.as_micros())
    } else {
        format!("{nanos}ns")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    use super::*;

    fn valid() -> ConnectionConfig {
        ConnectionConfig {
            endpoint: " https://app.pangolin.net ".into(),
            id: "olm_123".into(),
            secret: SecretString::from("s3cret".to_owned()),
            org_id: "org_9".into(),
            upstream_dns: vec![" 8.8.8.8:53".into(), String::new(), "1.1.1.1:53 ".into()],
            ..ConnectionConfig::default()
        }
    }

    fn validation(err: CoreError) -> ValidationError {
        match err {
            CoreError::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn canonical_body() {
        let validated = valid().validate().unwrap();
        let value: serde_json::Value = serde_json::from_str(validated.as_json()).unwrap();
        insta::assert_json_snapshot!(value, @r#"
        {
          "dns": "9.9.9.9",
          "endpoint": "https://app.pangolin.net",
          "holepunch": true,
          "id": "olm_123",
          "mtu": 1420,
          "orgId": "org_9",
          "overrideDNS": false,
          "pingInterval": "3s",
          "pingTimeout": "5s",
          "secret": "s3cret",
          "tunnelDNS": false,
          "upstreamDNS": [
            "8.8.8.8:53",
            "1.1.1.1:53"
          ]
        }
        "#);
    }

    #[test]
    fn mtu_bounds() {
        for (mtu, ok) in [(1279, false), (1280, true), (1500, true), (1501, false)] {
            let config = ConnectionConfig { mtu, ..valid() };
            let result = config.validate();
            assert_eq!(result.is_ok(), ok, "mtu {mtu}");
            if let Err(err) = result {
                assert!(validation(err).mentions("mtu"));
            }
        }
    }

    #[test]
    fn huge_mtu_does_not_wrap() {
        let config = ConnectionConfig {
            mtu: 66_816,
            ..valid()
        };
        assert!(validation(config.validate().unwrap_err()).mentions("mtu"));
    }

    #[test]
    fn reports_every_missing_credential() {
        let config = ConnectionConfig {
            endpoint: "  ".into(),
            id: String::new(),
            secret: SecretString::from(String::new()),
            org_id: String::new(),
            ..ConnectionConfig::default()
        };
        let err = validation(config.validate().unwrap_err());
        let fields: Vec<&str> = err.errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["endpoint", "id", "secret", "orgId"]);
        assert!(err.to_string().contains("orgId: must not be empty"));
    }

    #[test]
    fn user_token_replaces_client_credentials() {
        let config = ConnectionConfig {
            endpoint: "https://e".into(),
            user_token: Some(SecretString::from("tok".to_owned())),
            ..ConnectionConfig::default()
        };
        let validated = config.validate().unwrap();
        assert_eq!(validated.payload().user_token.as_deref(), Some("tok"));
        assert!(validated.as_json().contains(r#""userToken":"tok""#));
    }

    #[test]
    fn blank_user_token_counts_as_absent() {
        let config = ConnectionConfig {
            endpoint: "https://e".into(),
            user_token: Some(SecretString::from("   ".to_owned())),
            ..ConnectionConfig::default()
        };
        assert!(validation(config.validate().unwrap_err()).mentions("secret"));
    }

    #[test]
    fn zero_ping_durations_are_rejected() {
        let config = ConnectionConfig {
            ping_timeout: Duration::ZERO,
            ..valid()
        };
        assert!(validation(config.validate().unwrap_err()).mentions("pingTimeout"));
    }

    #[test]
    fn durations_render_for_the_engine() {
        assert_eq!(go_duration(Duration::from_secs(3)), "3s");
        assert_eq!(go_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(go_duration(Duration::from_micros(250)), "250us");
        assert_eq!(go_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(
            go_duration(Duration::from_secs(1) + Duration::from_nanos(500)),
            "1000000500ns"
        );
    }

    #[test]
    fn sub_microsecond_ping_is_not_rounded_to_zero() {
        let config = ConnectionConfig {
            ping_interval: Duration::from_nanos(500),
            ..valid()
        };
        let validated = config.validate().unwrap();
        assert_eq!(validated.payload().ping_interval, "500ns");
    }

    #[test]
    fn debug_output_omits_secret() {
        let validated = valid().validate().unwrap();
        assert!(!format!("{validated:?}").contains("s3cret"));
    }
}
