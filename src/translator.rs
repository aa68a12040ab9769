use crate::{
    normalizer::NameNormalizer,
    proxy::{
        GrpcOpts, NetworkBlock, Proxy, Settings, ShadowsocksSettings, TlsBlock, TrojanSettings,
        VlessSettings, VlessTlsBlock, VmessSettings, WsOpts,
    },
};
use common::{Credentials, Node, TlsSetting, Transport};
use std::collections::BTreeMap;
use thiserror::Error;

const DEFAULT_VMESS_CIPHER: &str = "auto";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("node `{name}` has no server host")]
    MissingHost { name: String },
    #[error("node `{name}` has no server port")]
    MissingPort { name: String },
    #[error("node `{name}` is missing `{field}`")]
    MissingField { name: String, field: &'static str },
}

/// Maps decoded nodes onto the target proxy schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct Translator {
    normalizer: NameNormalizer,
}

impl Translator {
    pub fn translate(&self, node: &Node) -> Result<Proxy, TranslateError> {
        let missing = |field| TranslateError::MissingField {
            name: node.name.clone(),
            field,
        };

        if node.server.trim().is_empty() {
            return Err(TranslateError::MissingHost {
                name: node.name.clone(),
            });
        }
        if node.port == 0 {
            return Err(TranslateError::MissingPort {
                name: node.name.clone(),
            });
        }

        let settings = match &node.credentials {
            Credentials::Vmess {
                uuid,
                alter_id,
                cipher,
            } => {
                if uuid.is_empty() {
                    return Err(missing("uuid"));
                }
                Settings::Vmess(VmessSettings {
                    uuid: uuid.clone(),
                    alter_id: *alter_id,
                    cipher: cipher
                        .clone()
                        .unwrap_or_else(|| DEFAULT_VMESS_CIPHER.to_owned()),
                    tls: node.tls.enabled.then(|| TlsBlock {
                        tls: true,
                        skip_cert_verify: node.tls.skip_cert_verify,
                        servername: node.tls.server_name.clone(),
                    }),
                    network: network_block(&node.transport),
                })
            }
            Credentials::Shadowsocks { cipher, password } => {
                if cipher.is_empty() {
                    return Err(missing("cipher"));
                }
                if password.is_empty() {
                    return Err(missing("password"));
                }
                Settings::Shadowsocks(ShadowsocksSettings {
                    cipher: cipher.clone(),
                    password: password.clone(),
                })
            }
            Credentials::Trojan { password } => {
                if password.is_empty() {
                    return Err(missing("password"));
                }
                Settings::Trojan(TrojanSettings {
                    password: password.clone(),
                    skip_cert_verify: node.tls.skip_cert_verify,
                    sni: node.tls.server_name.clone(),
                    network: network_block(&node.transport),
                })
            }
            Credentials::Vless { uuid, flow } => {
                if uuid.is_empty() {
                    return Err(missing("uuid"));
                }
                let TlsSetting {
                    enabled,
                    server_name,
                    skip_cert_verify,
                } = &node.tls;
                Settings::Vless(VlessSettings {
                    uuid: uuid.clone(),
                    flow: flow.clone(),
                    skip_cert_verify: *skip_cert_verify,
                    tls: enabled.then(|| VlessTlsBlock {
                        tls: true,
                        servername: server_name.clone(),
                    }),
                    network: network_block(&node.transport),
                })
            }
        };

        let mut name = self.normalizer.normalize(&node.name);
        if name.is_empty() {
            name = node.protocol().placeholder_name().to_owned();
        }

        Ok(Proxy {
            name,
            protocol: node.protocol(),
            server: node.server.clone(),
            port: node.port,
            udp: node.udp,
            settings,
        })
    }
}

fn network_block(transport: &Transport) -> Option<NetworkBlock> {
    match transport {
        Transport::Tcp => None,
        Transport::WebSocket { path, host } => {
            let mut headers = BTreeMap::new();
            if let Some(host) = host {
                headers.insert("Host".to_owned(), host.clone());
            }
            Some(NetworkBlock::Ws {
                ws_opts: WsOpts {
                    path: path.clone(),
                    headers,
                },
            })
        }
        Transport::Grpc { service_name } => Some(NetworkBlock::Grpc {
            grpc_opts: GrpcOpts {
                grpc_service_name: service_name.clone(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml_ng::{Mapping, Value};

    fn node(credentials: Credentials) -> Node {
        Node {
            name: "香港 01".to_owned(),
            server: "hk.example.com".to_owned(),
            port: 443,
            credentials,
            transport: Transport::Tcp,
            tls: TlsSetting::default(),
            udp: true,
        }
    }

    fn keys(proxy: &Proxy) -> Vec<String> {
        let value = serde_yaml_ng::to_value(proxy).unwrap();
        let mapping: &Mapping = value.as_mapping().unwrap();
        mapping
            .keys()
            .map(|k| k.as_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn vmess_defaults_and_allow_list() {
        let mut vmess = node(Credentials::Vmess {
            uuid: "u-u-i-d".to_owned(),
            alter_id: 0,
            cipher: None,
        });
        vmess.tls = TlsSetting {
            enabled: true,
            server_name: Some("sni.example.com".to_owned()),
            skip_cert_verify: false,
        };
        vmess.transport = Transport::WebSocket {
            path: "/ray".to_owned(),
            host: Some("cdn.example.com".to_owned()),
        };

        let proxy = Translator::default().translate(&vmess).unwrap();
        assert_eq!(proxy.name, "🇭🇰 香港 香港 01");
        assert_eq!(
            keys(&proxy),
            [
                "name", "type", "server", "port", "udp", "uuid", "alterId", "cipher", "tls",
                "skip-cert-verify", "servername", "network", "ws-opts"
            ]
        );

        let value = serde_yaml_ng::to_value(&proxy).unwrap();
        assert_eq!(value["type"], Value::from("vmess"));
        assert_eq!(value["cipher"], Value::from("auto"));
        assert_eq!(value["alterId"], Value::from(0));
        assert_eq!(value["network"], Value::from("ws"));
        assert_eq!(value["ws-opts"]["path"], Value::from("/ray"));
        assert_eq!(value["ws-opts"]["headers"]["Host"], Value::from("cdn.example.com"));
    }

    #[test]
    fn shadowsocks_has_no_foreign_fields() {
        let mut ss = node(Credentials::Shadowsocks {
            cipher: "aes-256-gcm".to_owned(),
            password: "p4ssw0rd".to_owned(),
        });
        /* never copied for shadowsocks */
        ss.tls.enabled = true;
        ss.transport = Transport::Grpc {
            service_name: "x".to_owned(),
        };
        let proxy = Translator::default().translate(&ss).unwrap();
        assert_eq!(
            keys(&proxy),
            ["name", "type", "server", "port", "udp", "cipher", "password"]
        );
        assert_eq!(proxy.protocol.tag(), "ss");
    }

    #[test]
    fn trojan_and_vless_blocks() {
        let mut trojan = node(Credentials::Trojan {
            password: "pw".to_owned(),
        });
        trojan.tls = TlsSetting {
            enabled: true,
            server_name: Some("sni.example.com".to_owned()),
            skip_cert_verify: true,
        };
        let proxy = Translator::default().translate(&trojan).unwrap();
        assert_eq!(
            keys(&proxy),
            ["name", "type", "server", "port", "udp", "password", "skip-cert-verify", "sni"]
        );

        let mut vless = node(Credentials::Vless {
            uuid: "id".to_owned(),
            flow: None,
        });
        vless.transport = Transport::Grpc {
            service_name: "gun".to_owned(),
        };
        let proxy = Translator::default().translate(&vless).unwrap();
        assert_eq!(
            keys(&proxy),
            ["name", "type", "server", "port", "udp", "uuid", "skip-cert-verify", "network", "grpc-opts"]
        );
        let value = serde_yaml_ng::to_value(&proxy).unwrap();
        assert_eq!(value["grpc-opts"]["grpc-service-name"], Value::from("gun"));
    }

    #[test]
    fn translation_is_idempotent() {
        let vmess = node(Credentials::Vmess {
            uuid: "id".to_owned(),
            alter_id: 4,
            cipher: Some("aes-128-gcm".to_owned()),
        });
        let translator = Translator::default();
        assert_eq!(
            translator.translate(&vmess).unwrap(),
            translator.translate(&vmess).unwrap()
        );
    }

    #[test]
    fn drops_incomplete_nodes() {
        let translator = Translator::default();

        let mut no_host = node(Credentials::Trojan {
            password: "pw".to_owned(),
        });
        no_host.server.clear();
        assert!(matches!(
            translator.translate(&no_host),
            Err(TranslateError::MissingHost { .. })
        ));

        let no_uuid = node(Credentials::Vless {
            uuid: String::new(),
            flow: None,
        });
        assert_eq!(
            translator.translate(&no_uuid),
            Err(TranslateError::MissingField {
                name: "香港 01".to_owned(),
                field: "uuid"
            })
        );
    }

    #[test]
    fn empty_cleaned_name_falls_back_to_placeholder() {
        let mut ss = node(Credentials::Shadowsocks {
            cipher: "aes-256-gcm".to_owned(),
            password: "pw".to_owned(),
        });
        ss.name = "★★★".to_owned();
        let proxy = Translator::default().translate(&ss).unwrap();
        assert_eq!(proxy.name, "SS节点");
    }
}
