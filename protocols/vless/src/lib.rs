use common::{Credentials, DecodeError, Node, Protocol, TlsSetting, utils::ProxyUri};

const SECURITY_TLS: &str = "tls";

/**
 * Decode a `vless://uuid@host:port?security=tls&sni=..&type=grpc&serviceName=..#name`
 * share link.
 */
pub fn decode(line: &str) -> Result<Node, DecodeError> {
    if !line.trim().starts_with(Protocol::Vless.scheme()) {
        return Err(DecodeError::Uri("not a vless link".to_owned()));
    }
    let uri = ProxyUri::parse(line)?;

    let enabled = uri.query("security") == Some(SECURITY_TLS);
    let tls = TlsSetting {
        enabled,
        server_name: uri
            .query("sni")
            .filter(|_| enabled)
            .map(str::to_owned),
        skip_cert_verify: uri.query_flag("allowInsecure"),
    };

    Ok(Node {
        name: uri.name_or(Protocol::Vless.placeholder_name()),
        server: uri.host.clone(),
        port: uri.port,
        credentials: Credentials::Vless {
            uuid: uri.user.clone(),
            flow: uri
                .query("flow")
                .filter(|f| !f.is_empty())
                .map(str::to_owned),
        },
        transport: uri.transport(),
        tls,
        udp: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Transport;

    const UUID: &str = "b831381d-6324-4d53-ad4f-8cda48b30811";

    #[test]
    fn decode_grpc_tls_link() {
        let node = decode(&format!(
            "vless://{}@jp.example.com:2053?security=tls&sni=jp.example.com&type=grpc&serviceName=gun#JP%20VLESS",
            UUID
        ))
        .unwrap();
        assert_eq!(node.protocol(), Protocol::Vless);
        assert_eq!(node.server, "jp.example.com");
        assert_eq!(node.port, 2053);
        assert_eq!(node.name, "JP VLESS");
        assert!(node.tls.enabled);
        assert_eq!(node.tls.server_name.as_deref(), Some("jp.example.com"));
        assert_eq!(
            node.transport,
            Transport::Grpc {
                service_name: "gun".to_owned()
            }
        );
        assert_eq!(
            node.credentials,
            Credentials::Vless {
                uuid: UUID.to_owned(),
                flow: None
            }
        );
    }

    #[test]
    fn ws_without_tls() {
        let node = decode(&format!(
            "vless://{}@1.2.3.4:80?type=ws&host=h.example.com&sni=ignored",
            UUID
        ))
        .unwrap();
        assert!(!node.tls.enabled);
        assert_eq!(node.tls.server_name, None);
        assert_eq!(node.name, "VLESS节点");
        assert_eq!(
            node.transport,
            Transport::WebSocket {
                path: "/".to_owned(),
                host: Some("h.example.com".to_owned()),
            }
        );
    }

    #[test]
    fn grpc_service_name_defaults_to_empty() {
        let node = decode(&format!("vless://{}@example.com?type=grpc&flow=xtls-rprx-vision", UUID))
            .unwrap();
        assert_eq!(node.port, 443);
        assert_eq!(
            node.transport,
            Transport::Grpc {
                service_name: String::new()
            }
        );
        assert_eq!(
            node.credentials,
            Credentials::Vless {
                uuid: UUID.to_owned(),
                flow: Some("xtls-rprx-vision".to_owned())
            }
        );
    }

    #[test]
    fn corrupted_links() {
        assert!(decode("vless://").is_err());
        assert!(decode("vless://id@example.com:0").is_err());
        assert!(decode(&format!("vless://{}@example.com:port", UUID)).is_err());
    }
}
