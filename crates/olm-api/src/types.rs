//! Wire schemas for payloads crossing the engine boundary.
//!
//! Field names are the contract. Everything uses camelCase via
//! `#[serde(rename_all = "camelCase")]`, with explicit renames where the
//! engine spells an acronym in capitals (`upstreamDNS`, `tunnelDNS`).
//! Unknown fields are ignored on decode so a newer engine can add fields
//! without breaking an older control surface.

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Connection request ───────────────────────────────────────────────

/// Body of the `connect(configJson)` boundary call.
///
/// Built only by `olm-core`'s config exchange after validation; the engine
/// receives exactly what this serializes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ConnectionConfigPayload {
    pub endpoint: String,
    pub id: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    pub org_id: String,
    pub mtu: u16,
    pub dns: String,
    #[serde(rename = "upstreamDNS", default)]
    pub upstream_dns: Vec<String>,
    pub holepunch: bool,
    #[serde(rename = "tunnelDNS")]
    pub tunnel_dns: bool,
    #[serde(rename = "overrideDNS")]
    pub override_dns: bool,
    /// Go-style duration string, e.g. `"3s"`.
    pub ping_interval: String,
    /// Go-style duration string, e.g. `"5s"`.
    pub ping_timeout: String,
}

/// Partial runtime settings for `updateSettings(json)`.
///
/// Only populated keys are serialized, so `{"logLevel":"DEBUG"}` touches
/// nothing else on the engine side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

// ── Status ───────────────────────────────────────────────────────────

/// Snapshot returned by `getStatus()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Status {
    pub connected: bool,
    pub registered: bool,
    pub terminated: bool,
    pub version: String,
    pub agent: String,
    pub org_id: String,
    pub peers: Vec<PeerStatus>,
}

/// Lightweight peer entry embedded in [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerStatus {
    pub site_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connected: bool,
    /// Round-trip time as reported by the engine.
    #[serde(default)]
    pub rtt: i64,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub is_relay: bool,
}

// ── Peers ────────────────────────────────────────────────────────────

/// Detailed peer, as pushed by `peerUpdate` and returned by `getPeers()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub site_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connected: bool,
    /// Round-trip time in milliseconds.
    #[serde(default)]
    pub rtt: i64,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default)]
    pub is_relay: bool,
    #[serde(default)]
    pub holepunch_connected: bool,
    #[serde(default)]
    pub remote_subnets: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<Alias>,
}

impl Peer {
    /// The peer's public key, treating the engine's empty string as absent.
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// DNS alias advertised by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub alias: String,
    pub ip: String,
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Decode a `getStatus()` response or equivalent payload.
pub fn decode_status(body: &str) -> Result<Status, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        what: "status",
        message: e.to_string(),
        body: body.to_owned(),
    })
}

/// Decode a `peerUpdate` / `getPeers()` payload.
pub fn decode_peers(body: &str) -> Result<Vec<Peer>, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        what: "peer list",
        message: e.to_string(),
        body: body.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn status_ignores_unknown_fields() {
        let body = r#"{
            "connected": true,
            "registered": true,
            "terminated": false,
            "version": "1.0.0-android",
            "agent": "olm-android",
            "orgId": "org_1",
            "futureField": {"nested": 1},
            "peers": [
                {"siteId": 7, "name": "hq", "connected": true, "rtt": 12,
                 "endpoint": "1.2.3.4:51820", "isRelay": false, "extra": "x"}
            ]
        }"#;

        let status = decode_status(body).unwrap();
        assert!(status.connected);
        assert_eq!(status.org_id, "org_1");
        assert_eq!(status.peers.len(), 1);
        assert_eq!(status.peers[0].site_id, 7);
    }

    #[test]
    fn status_defaults_missing_fields() {
        let status = decode_status("{}").unwrap();
        assert_eq!(status, Status::default());
    }

    #[test]
    fn peers_decode_engine_shape() {
        // The engine sends an empty public key rather than omitting it.
        let body = r#"[{
            "siteId": 3, "name": "edge", "connected": false, "rtt": 40,
            "endpoint": "", "publicKey": "", "isRelay": true,
            "holepunchConnected": false, "remoteSubnets": ["10.1.0.0/16"],
            "aliases": [{"alias": "db.internal", "ip": "10.1.0.5"}]
        }]"#;

        let peers = decode_peers(body).unwrap();
        assert_eq!(peers[0].public_key(), None);
        assert_eq!(peers[0].remote_subnets, vec!["10.1.0.0/16".to_owned()]);
        assert_eq!(peers[0].aliases[0].ip, "10.1.0.5");
    }

    #[test]
    fn malformed_peers_keep_body_for_debugging() {
        let err = decode_peers("[{\"siteId\": \"nope\"}]").unwrap_err();
        match err {
            Error::Deserialization { what, body, .. } => {
                assert_eq!(what, "peer list");
                assert!(body.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connection_payload_uses_engine_field_names() {
        let payload = ConnectionConfigPayload {
            endpoint: "https://pangolin.example.com".into(),
            id: "client".into(),
            secret: "s3cret".into(),
            user_token: None,
            org_id: "org".into(),
            mtu: 1420,
            dns: "9.9.9.9".into(),
            upstream_dns: vec!["8.8.8.8:53".into()],
            holepunch: true,
            tunnel_dns: false,
            override_dns: true,
            ping_interval: "3s".into(),
            ping_timeout: "5s".into(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "endpoint",
            "orgId",
            "upstreamDNS",
            "tunnelDNS",
            "overrideDNS",
            "pingInterval",
            "pingTimeout",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(!obj.contains_key("userToken"));
    }

    #[test]
    fn settings_update_only_carries_set_keys() {
        let update = SettingsUpdate {
            log_level: Some("DEBUG".into()),
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"logLevel":"DEBUG"}"#
        );
        assert_eq!(
            serde_json::to_string(&SettingsUpdate::default()).unwrap(),
            "{}"
        );
    }
}
