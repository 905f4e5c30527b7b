use crate::config::HostAndPort;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const HEARTBEAT_PROTOCOL_VERSION: u64 = 1;

/// Heartbeat probe sent to every non-self member during a quorum check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub set_name: String,
    pub protocol_version: u64,
    pub config_version: u64,
    pub check_empty: bool,
    pub sender_host: HostAndPort,
    pub sender_id: u64,
}

impl HeartbeatRequest {
    pub fn to_command(&self) -> Value {
        serde_json::json!({
            "set": self.set_name,
            "pv": self.protocol_version,
            "v": self.config_version,
            "checkEmpty": self.check_empty,
            "from": self.sender_host.to_string(),
            "fromId": self.sender_id,
        })
    }

    /// Strict decode of an inbound probe, for nodes validating what a quorum
    /// check sent them.
    pub fn from_command(command: &Value) -> Result<Self, HeartbeatFrameError> {
        let set_name = require_str(command, "set")?;
        let protocol_version = require_u64(command, "pv")?;
        if protocol_version != HEARTBEAT_PROTOCOL_VERSION {
            return Err(HeartbeatFrameError::UnsupportedProtocolVersion(
                protocol_version,
            ));
        }
        let config_version = require_u64(command, "v")?;
        let check_empty = command["checkEmpty"].as_bool().unwrap_or(false);
        let from = require_str(command, "from")?;
        let sender_host = parse_endpoint(&from)?;
        let sender_id = require_u64(command, "fromId")?;
        Ok(Self {
            set_name,
            protocol_version,
            config_version,
            check_empty,
            sender_host,
            sender_id,
        })
    }
}

/// Lenient view over a heartbeat reply document.
///
/// Replies come from remotes that may be older, newer, or confused, so every
/// field read tolerates absence: `ok` and `mismatch` are truthy checks,
/// `set_name` is empty when the remote has no installed configuration, and
/// `config_version` is 0 when absent (candidate versions start at 1, so an
/// absent version can never veto).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub ok: bool,
    pub mismatch: bool,
    pub set_name: String,
    pub config_version: i64,
}

impl HeartbeatResponse {
    pub fn from_reply(data: &Value) -> Self {
        Self {
            ok: truthy(&data["ok"]),
            mismatch: truthy(&data["mismatch"]),
            set_name: data["set"].as_str().unwrap_or_default().to_string(),
            config_version: data["v"].as_i64().unwrap_or(0),
        }
    }

    pub fn has_installed_config(&self) -> bool {
        !self.set_name.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeartbeatFrameError {
    #[error("heartbeat command is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("heartbeat command field `{field}` has the wrong type")]
    WrongFieldType { field: &'static str },

    #[error("unsupported heartbeat protocol version {0}")]
    UnsupportedProtocolVersion(u64),

    #[error("malformed sender endpoint `{0}`")]
    MalformedEndpoint(String),
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn require_str(command: &Value, field: &'static str) -> Result<String, HeartbeatFrameError> {
    match &command[field] {
        Value::Null => Err(HeartbeatFrameError::MissingField(field)),
        Value::String(s) => Ok(s.clone()),
        _ => Err(HeartbeatFrameError::WrongFieldType { field }),
    }
}

fn require_u64(command: &Value, field: &'static str) -> Result<u64, HeartbeatFrameError> {
    match &command[field] {
        Value::Null => Err(HeartbeatFrameError::MissingField(field)),
        value => value
            .as_u64()
            .ok_or(HeartbeatFrameError::WrongFieldType { field }),
    }
}

fn parse_endpoint(raw: &str) -> Result<HostAndPort, HeartbeatFrameError> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or_else(|| HeartbeatFrameError::MalformedEndpoint(raw.to_string()))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| HeartbeatFrameError::MalformedEndpoint(raw.to_string()))?;
    if host.is_empty() {
        return Err(HeartbeatFrameError::MalformedEndpoint(raw.to_string()));
    }
    Ok(HostAndPort::new(host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> HeartbeatRequest {
        HeartbeatRequest {
            set_name: "rs0".into(),
            protocol_version: HEARTBEAT_PROTOCOL_VERSION,
            config_version: 3,
            check_empty: false,
            sender_host: HostAndPort::new("h0", 27017),
            sender_id: 1,
        }
    }

    #[test]
    fn command_carries_all_probe_fields() {
        let command = request().to_command();
        assert_eq!(command["set"], "rs0");
        assert_eq!(command["pv"], 1);
        assert_eq!(command["v"], 3);
        assert_eq!(command["checkEmpty"], false);
        assert_eq!(command["from"], "h0:27017");
        assert_eq!(command["fromId"], 1);
    }

    #[test]
    fn command_decodes_back_to_request() {
        let probe = request();
        let decoded = HeartbeatRequest::from_command(&probe.to_command()).unwrap();
        assert_eq!(decoded, probe);
    }

    #[test]
    fn decode_rejects_missing_and_mistyped_fields() {
        let missing = json!({"pv": 1, "v": 3, "from": "h0:1", "fromId": 1});
        assert_eq!(
            HeartbeatRequest::from_command(&missing).unwrap_err(),
            HeartbeatFrameError::MissingField("set")
        );
        let mistyped = json!({"set": "rs0", "pv": "one", "v": 3, "from": "h0:1", "fromId": 1});
        assert_eq!(
            HeartbeatRequest::from_command(&mistyped).unwrap_err(),
            HeartbeatFrameError::WrongFieldType { field: "pv" }
        );
        let future = json!({"set": "rs0", "pv": 9, "v": 3, "from": "h0:1", "fromId": 1});
        assert_eq!(
            HeartbeatRequest::from_command(&future).unwrap_err(),
            HeartbeatFrameError::UnsupportedProtocolVersion(9)
        );
        let bad_endpoint = json!({"set": "rs0", "pv": 1, "v": 3, "from": "h0", "fromId": 1});
        assert!(matches!(
            HeartbeatRequest::from_command(&bad_endpoint).unwrap_err(),
            HeartbeatFrameError::MalformedEndpoint(_)
        ));
    }

    #[test]
    fn reply_parsing_is_lenient() {
        let numeric_ok = HeartbeatResponse::from_reply(&json!({"ok": 1}));
        assert!(numeric_ok.ok);
        assert!(!numeric_ok.mismatch);
        assert!(!numeric_ok.has_installed_config());
        assert_eq!(numeric_ok.config_version, 0);

        let bool_ok = HeartbeatResponse::from_reply(&json!({"ok": true, "set": "rs0", "v": 4}));
        assert!(bool_ok.ok);
        assert!(bool_ok.has_installed_config());
        assert_eq!(bool_ok.config_version, 4);

        let empty = HeartbeatResponse::from_reply(&json!({}));
        assert!(!empty.ok);
        assert!(!empty.mismatch);

        let zero_ok = HeartbeatResponse::from_reply(&json!({"ok": 0, "mismatch": true}));
        assert!(!zero_ok.ok);
        assert!(zero_ok.mismatch);
    }
}
