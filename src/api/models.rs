use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Handshake payload carried by the Engine.IO open packet
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(rename = "pingInterval")]
    pub ping_interval: u64,
    #[serde(rename = "pingTimeout")]
    pub ping_timeout: u64,
}

impl Handshake {
    /// Longest silence tolerated before the server is considered gone.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// Events the server pushes for a download request
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Progress(u8),
    Success(String),
    BadPackage(String),
    Error(String),
}

impl ServerEvent {
    pub const PROGRESS: &'static str = "download_progress";
    pub const SUCCESS: &'static str = "download_success";
    pub const BAD_PACKAGE: &'static str = "download_bad_package";
    pub const ERROR: &'static str = "download_error";

    /// Map a Socket.IO event onto a download event.
    pub fn from_event(name: &str, args: &[Value]) -> Result<Self, CodecError> {
        let first = args.first();
        match name {
            Self::PROGRESS => {
                let percent = first
                    .and_then(Value::as_f64)
                    .ok_or_else(|| CodecError::BadPayload(name.to_string()))?;
                Ok(Self::Progress(percent.round().clamp(0.0, 100.0) as u8))
            }
            Self::SUCCESS => Ok(Self::Success(text_payload(first))),
            Self::BAD_PACKAGE => Ok(Self::BadPackage(text_payload(first))),
            Self::ERROR => Ok(Self::Error(text_payload(first))),
            other => Err(CodecError::UnknownEvent(other.to_string())),
        }
    }
}

fn text_payload(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Requests the client sends to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    StartDownload(String),
}

impl ClientEvent {
    pub const START_DOWNLOAD: &'static str = "start_download";

    pub fn into_packet(self) -> Packet {
        match self {
            ClientEvent::StartDownload(package_name) => {
                Packet::Message(SocketPacket::Event {
                    name: Self::START_DOWNLOAD.to_string(),
                    args: vec![Value::String(package_name)],
                })
            }
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown packet type: {0:?}")]
    UnknownType(char),

    #[error("Malformed packet body: {0}")]
    Malformed(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Unexpected payload for event {0}")]
    BadPayload(String),
}

/// Socket.IO packet, carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(Value),
}

/// Engine.IO v4 text packet
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Noop,
}

impl Packet {
    pub fn encode(&self) -> String {
        match self {
            Packet::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Noop => "6".to_string(),
            Packet::Message(socket) => format!("4{}", socket.encode()),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let mut chars = raw.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let body = chars.as_str();
        match kind {
            '0' => serde_json::from_str(body)
                .map(Packet::Open)
                .map_err(|e| CodecError::Malformed(e.to_string())),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => SocketPacket::decode(body).map(Packet::Message),
            '6' => Ok(Packet::Noop),
            other => Err(CodecError::UnknownType(other)),
        }
    }
}

impl SocketPacket {
    fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", auth),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("2{}", Value::Array(items))
            }
            SocketPacket::ConnectError(data) => format!("4{}", data),
        }
    }

    fn decode(raw: &str) -> Result<Self, CodecError> {
        let mut chars = raw.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let body = skip_ack_id(skip_namespace(chars.as_str()));
        match kind {
            '0' if body.is_empty() => Ok(SocketPacket::Connect(None)),
            '0' => serde_json::from_str(body)
                .map(|v| SocketPacket::Connect(Some(v)))
                .map_err(|e| CodecError::Malformed(e.to_string())),
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let items: Vec<Value> = serde_json::from_str(body)
                    .map_err(|e| CodecError::Malformed(e.to_string()))?;
                let mut items = items.into_iter();
                match items.next() {
                    Some(Value::String(name)) => Ok(SocketPacket::Event {
                        name,
                        args: items.collect(),
                    }),
                    _ => Err(CodecError::Malformed("event without a name".to_string())),
                }
            }
            '4' => serde_json::from_str(body)
                .map(SocketPacket::ConnectError)
                .map_err(|e| CodecError::Malformed(e.to_string())),
            other => Err(CodecError::UnknownType(other)),
        }
    }
}

fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn skip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Configuration for the realtime channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub server_url: String,
    pub socket_path: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            socket_path: "/socket.io/".to_string(),
        }
    }
}

impl ChannelConfig {
    pub const FILE_NAME: &'static str = "client.toml";

    /// Defaults, then `client.toml` in the working directory, then the environment.
    pub fn load() -> Self {
        let file = std::fs::read_to_string(Self::FILE_NAME).ok();
        Self::layered(file.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn layered(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match file.map(toml::from_str::<ChannelConfig>) {
            Some(Ok(parsed)) => parsed,
            Some(Err(e)) => {
                tracing::warn!("ignoring malformed {}: {}", Self::FILE_NAME, e);
                Self::default()
            }
            None => Self::default(),
        };

        if let Some(v) = env("DOWNLOAD_SERVER_URL").filter(|v| !v.is_empty()) {
            config.server_url = v;
        }
        if let Some(v) = env("DOWNLOAD_SOCKET_PATH").filter(|v| !v.is_empty()) {
            config.socket_path = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open() {
        let raw = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":5000,"maxPayload":1000000}"#;
        let Packet::Open(handshake) = Packet::decode(raw).unwrap() else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(handshake.liveness_window(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_decode_control_packets() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::decode("3").unwrap(), Packet::Pong);
        assert_eq!(Packet::decode("1").unwrap(), Packet::Close);
        assert_eq!(Packet::decode("6").unwrap(), Packet::Noop);
        assert_eq!(Packet::decode(""), Err(CodecError::Empty));
        assert_eq!(Packet::decode("9"), Err(CodecError::UnknownType('9')));
    }

    #[test]
    fn test_decode_socket_packets() {
        assert_eq!(
            Packet::decode("40").unwrap(),
            Packet::Message(SocketPacket::Connect(None))
        );
        assert_eq!(
            Packet::decode(r#"40{"sid":"abc"}"#).unwrap(),
            Packet::Message(SocketPacket::Connect(Some(json!({"sid": "abc"}))))
        );
        assert_eq!(
            Packet::decode("41").unwrap(),
            Packet::Message(SocketPacket::Disconnect)
        );
        assert_eq!(
            Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::Message(SocketPacket::ConnectError(json!({"message": "Not authorized"})))
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack() {
        let packet = Packet::decode(r#"42/downloads,17["download_progress",55]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::Event {
                name: "download_progress".to_string(),
                args: vec![json!(55)],
            })
        );
    }

    #[test]
    fn test_decode_malformed_event() {
        assert!(matches!(
            Packet::decode(r#"42[55]"#),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            Packet::decode(r#"42["download_progress""#),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_encode_start_download() {
        let packet = ClientEvent::StartDownload("com.spotify.music".to_string()).into_packet();
        assert_eq!(packet.encode(), r#"42["start_download","com.spotify.music"]"#);
        assert_eq!(Packet::Pong.encode(), "3");
        assert_eq!(Packet::Message(SocketPacket::Connect(None)).encode(), "40");
    }

    #[test]
    fn test_server_event_mapping() {
        assert_eq!(
            ServerEvent::from_event("download_progress", &[json!(10)]).unwrap(),
            ServerEvent::Progress(10)
        );
        assert_eq!(
            ServerEvent::from_event("download_progress", &[json!(99.6)]).unwrap(),
            ServerEvent::Progress(100)
        );
        assert_eq!(
            ServerEvent::from_event("download_progress", &[json!(250)]).unwrap(),
            ServerEvent::Progress(100)
        );
        assert_eq!(
            ServerEvent::from_event("download_progress", &[json!("half")]),
            Err(CodecError::BadPayload("download_progress".to_string()))
        );
        assert_eq!(
            ServerEvent::from_event(
                "download_success",
                &[json!("The application was successfully downloaded.")]
            )
            .unwrap(),
            ServerEvent::Success("The application was successfully downloaded.".to_string())
        );
        assert_eq!(
            ServerEvent::from_event("download_bad_package", &[]).unwrap(),
            ServerEvent::BadPackage(String::new())
        );
        assert_eq!(
            ServerEvent::from_event("download_error", &[json!({"code": 1})]).unwrap(),
            ServerEvent::Error(r#"{"code":1}"#.to_string())
        );
        assert_eq!(
            ServerEvent::from_event("chat", &[]),
            Err(CodecError::UnknownEvent("chat".to_string()))
        );
    }

    #[test]
    fn test_config_layers() {
        let defaults = ChannelConfig::layered(None, |_| None);
        assert_eq!(defaults, ChannelConfig::default());

        let file = r#"server_url = "https://downloads.example.org""#;
        let from_file = ChannelConfig::layered(Some(file), |_| None);
        assert_eq!(from_file.server_url, "https://downloads.example.org");
        assert_eq!(from_file.socket_path, "/socket.io/");

        let from_env = ChannelConfig::layered(Some(file), |key| match key {
            "DOWNLOAD_SERVER_URL" => Some("http://10.0.0.2:5000".to_string()),
            "DOWNLOAD_SOCKET_PATH" => Some(String::new()),
            _ => None,
        });
        assert_eq!(from_env.server_url, "http://10.0.0.2:5000");
        assert_eq!(from_env.socket_path, "/socket.io/");

        let broken = ChannelConfig::layered(Some("server_url = ["), |_| None);
        assert_eq!(broken, ChannelConfig::default());
    }
}
