use common::Protocol;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/**
 * A proxy entry of the target document.
 * Serialized keys are the protocol's allow-list, in this order.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proxy {
    pub name: String,
    #[serde(rename = "type", serialize_with = "protocol_tag")]
    pub protocol: Protocol,
    pub server: String,
    pub port: u16,
    pub udp: bool,
    #[serde(flatten)]
    pub settings: Settings,
}

fn protocol_tag<S: Serializer>(protocol: &Protocol, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(protocol.tag())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Settings {
    Vmess(VmessSettings),
    Shadowsocks(ShadowsocksSettings),
    Trojan(TrojanSettings),
    Vless(VlessSettings),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmessSettings {
    pub uuid: String,
    #[serde(rename = "alterId")]
    pub alter_id: u16,
    pub cipher: String,
    #[serde(flatten)]
    pub tls: Option<TlsBlock>,
    #[serde(flatten)]
    pub network: Option<NetworkBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowsocksSettings {
    pub cipher: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrojanSettings {
    pub password: String,
    pub skip_cert_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(flatten)]
    pub network: Option<NetworkBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VlessSettings {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    pub skip_cert_verify: bool,
    #[serde(flatten)]
    pub tls: Option<VlessTlsBlock>,
    #[serde(flatten)]
    pub network: Option<NetworkBlock>,
}

/// `tls`, `skip-cert-verify` and `servername` of a vmess entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TlsBlock {
    pub tls: bool,
    pub skip_cert_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
}

/// vless keeps `skip-cert-verify` outside of its tls block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlessTlsBlock {
    pub tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "network")]
pub enum NetworkBlock {
    #[serde(rename = "ws")]
    Ws {
        #[serde(rename = "ws-opts")]
        ws_opts: WsOpts,
    },
    #[serde(rename = "grpc")]
    Grpc {
        #[serde(rename = "grpc-opts")]
        grpc_opts: GrpcOpts,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsOpts {
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrpcOpts {
    #[serde(rename = "grpc-service-name")]
    pub grpc_service_name: String,
}
