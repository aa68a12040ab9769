pub mod utils;

use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Proxy protocols a subscription line can describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Vmess,
    Shadowsocks,
    Trojan,
    Vless,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Self::Vmess, Self::Shadowsocks, Self::Trojan, Self::Vless];

    /// URI scheme prefix, including `://`.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Vmess => "vmess://",
            Self::Shadowsocks => "ss://",
            Self::Trojan => "trojan://",
            Self::Vless => "vless://",
        }
    }

    /// Value of the `type` key in a Clash proxy entry.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Vmess => "vmess",
            Self::Shadowsocks => "ss",
            Self::Trojan => "trojan",
            Self::Vless => "vless",
        }
    }

    /// Display name used when a line carries none.
    pub fn placeholder_name(&self) -> &'static str {
        match self {
            Self::Vmess => "VMess节点",
            Self::Shadowsocks => "SS节点",
            Self::Trojan => "Trojan节点",
            Self::Vless => "VLESS节点",
        }
    }

    pub fn from_uri(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| line.starts_with(p.scheme()))
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.tag() == tag)
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.tag())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Vmess {
        uuid: String,
        alter_id: u16,
        cipher: Option<String>,
    },
    Shadowsocks {
        cipher: String,
        password: String,
    },
    Trojan {
        password: String,
    },
    Vless {
        uuid: String,
        flow: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    WebSocket { path: String, host: Option<String> },
    Grpc { service_name: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsSetting {
    pub enabled: bool,
    pub server_name: Option<String>,
    pub skip_cert_verify: bool,
}

/**
 * One decoded subscription entry.
 * A `Node` always has a host and a port, lines without them never become one.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub credentials: Credentials,
    pub transport: Transport,
    pub tls: TlsSetting,
    pub udp: bool,
}

impl Node {
    pub fn protocol(&self) -> Protocol {
        match self.credentials {
            Credentials::Vmess { .. } => Protocol::Vmess,
            Credentials::Shadowsocks { .. } => Protocol::Shadowsocks,
            Credentials::Trojan { .. } => Protocol::Trojan,
            Credentials::Vless { .. } => Protocol::Vless,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid base64")]
    Base64,
    #[error("payload is not valid utf-8")]
    Utf8,
    #[error("payload is not a json object: {0}")]
    Json(String),
    #[error("malformed uri: {0}")]
    Uri(String),
    #[error("missing server host")]
    MissingHost,
    #[error("missing server port")]
    MissingPort,
    #[error("invalid port `{0}`")]
    InvalidPort(String),
    #[error("malformed credentials")]
    Credentials,
}
