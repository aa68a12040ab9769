use common::{
    Credentials, DecodeError, Node, Protocol, TlsSetting, Transport,
    utils::{DEFAULT_PORT, decode_base64_str, parse_port},
};
use serde_json::{Map, Value};

const NET_WS: &str = "ws";
const NET_GRPC: &str = "grpc";
const TLS_ENABLED: &str = "tls";

/**
 * Decode a `vmess://` share link.
 * The payload is base64 of a v2rayN style json object:
 * `ps` name, `add` host, `port`, `id` uuid, `aid` alterId, `scy` cipher,
 * `net` transport, `host`/`path` transport options, `tls` and `sni`.
 */
pub fn decode(line: &str) -> Result<Node, DecodeError> {
    let payload = line
        .trim()
        .strip_prefix(Protocol::Vmess.scheme())
        .ok_or_else(|| DecodeError::Uri("not a vmess link".to_owned()))?;

    let json = decode_base64_str(payload)?;
    let object = match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return Err(DecodeError::Json("expected an object".to_owned())),
        Err(err) => return Err(DecodeError::Json(err.to_string())),
    };

    let server = text(&object, "add").ok_or(DecodeError::MissingHost)?;
    let port = match text(&object, "port") {
        Some(port) => parse_port(&port)?,
        None => DEFAULT_PORT,
    };
    let alter_id = match text(&object, "aid") {
        Some(aid) => aid
            .parse::<u16>()
            .map_err(|_| DecodeError::Json(format!("invalid aid `{}`", aid)))?,
        None => 0,
    };

    let transport = match text(&object, "net").as_deref() {
        Some(NET_WS) => Transport::WebSocket {
            path: text(&object, "path").unwrap_or_else(|| "/".to_owned()),
            host: text(&object, "host"),
        },
        Some(NET_GRPC) => Transport::Grpc {
            service_name: text(&object, "path").unwrap_or_default(),
        },
        /* tcp and anything this encoder has no block for */
        _ => Transport::Tcp,
    };

    let enabled = text(&object, "tls").as_deref() == Some(TLS_ENABLED);
    let tls = TlsSetting {
        enabled,
        server_name: text(&object, "sni").filter(|_| enabled),
        skip_cert_verify: false,
    };

    Ok(Node {
        name: text(&object, "ps").unwrap_or_else(|| Protocol::Vmess.placeholder_name().to_owned()),
        server,
        port,
        credentials: Credentials::Vmess {
            uuid: text(&object, "id").unwrap_or_default(),
            alter_id,
            cipher: text(&object, "scy"),
        },
        transport,
        tls,
        udp: true,
    })
}

/// Non-empty string or number field as text; encoders disagree on `"443"` vs `443`.
fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::STANDARD};

    fn link(json: &str) -> String {
        format!("vmess://{}", STANDARD.encode(json))
    }

    #[test]
    fn decode_ws_tls() {
        let node = decode(&link(
            r#"{"v":"2","ps":"香港 01","add":"hk.example.com","port":"443","id":"12345678-1234-1234-1234-1234567890ab","aid":"0","net":"ws","type":"none","host":"cdn.example.com","path":"/ray","tls":"tls","sni":"sni.example.com"}"#,
        ))
        .unwrap();

        assert_eq!(node.protocol(), Protocol::Vmess);
        assert_eq!(node.name, "香港 01");
        assert_eq!(node.server, "hk.example.com");
        assert_eq!(node.port, 443);
        assert_eq!(
            node.credentials,
            Credentials::Vmess {
                uuid: "12345678-1234-1234-1234-1234567890ab".to_owned(),
                alter_id: 0,
                cipher: None,
            }
        );
        assert_eq!(
            node.transport,
            Transport::WebSocket {
                path: "/ray".to_owned(),
                host: Some("cdn.example.com".to_owned()),
            }
        );
        assert!(node.tls.enabled);
        assert_eq!(node.tls.server_name.as_deref(), Some("sni.example.com"));
    }

    #[test]
    fn numeric_fields_and_defaults() {
        let node = decode(&link(
            r#"{"add":"1.2.3.4","port":8080,"id":"abc","aid":2,"scy":"aes-128-gcm"}"#,
        ))
        .unwrap();
        assert_eq!(node.port, 8080);
        assert_eq!(node.name, "VMess节点");
        assert_eq!(
            node.credentials,
            Credentials::Vmess {
                uuid: "abc".to_owned(),
                alter_id: 2,
                cipher: Some("aes-128-gcm".to_owned()),
            }
        );
        assert_eq!(node.transport, Transport::Tcp);
        assert!(!node.tls.enabled);

        let node = decode(&link(r#"{"add":"1.2.3.4","id":"abc"}"#)).unwrap();
        assert_eq!(node.port, DEFAULT_PORT);
    }

    #[test]
    fn tls_only_for_literal_tls() {
        for value in [r#""none""#, r#""TLS""#, "true", r#""""#] {
            let json = format!(r#"{{"add":"a.com","port":443,"id":"x","tls":{},"sni":"s"}}"#, value);
            let node = decode(&link(&json)).unwrap();
            assert!(!node.tls.enabled, "tls = {}", value);
            assert_eq!(node.tls.server_name, None);
        }
    }

    #[test]
    fn grpc_service_name_from_path() {
        let node = decode(&link(
            r#"{"add":"a.com","port":443,"id":"x","net":"grpc","path":"svc"}"#,
        ))
        .unwrap();
        assert_eq!(
            node.transport,
            Transport::Grpc {
                service_name: "svc".to_owned()
            }
        );
    }

    #[test]
    fn ws_path_defaults_to_root() {
        let node = decode(&link(r#"{"add":"a.com","port":443,"id":"x","net":"ws"}"#)).unwrap();
        assert_eq!(
            node.transport,
            Transport::WebSocket {
                path: "/".to_owned(),
                host: None
            }
        );
    }

    #[test]
    fn malformed_payloads() {
        assert_eq!(decode("vmess://!!!not-base64"), Err(DecodeError::Base64));
        assert!(matches!(
            decode(&link("this is not json")),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(decode(&link("[1,2]")), Err(DecodeError::Json(_))));
        assert_eq!(
            decode(&link(r#"{"port":443,"id":"x"}"#)),
            Err(DecodeError::MissingHost)
        );
        assert!(matches!(
            decode(&link(r#"{"add":"a.com","port":"http","id":"x"}"#)),
            Err(DecodeError::InvalidPort(_))
        ));
    }

    #[test]
    fn truncated_link() {
        let full = link(r#"{"ps":"n","add":"a.com","port":443,"id":"x"}"#);
        assert!(decode(&full[..full.len() / 2]).is_err());
    }
}
