use common::{Credentials, DecodeError, Node, Protocol, TlsSetting, utils::ProxyUri};

/**
 * Decode a `trojan://password@host:port?sni=..&type=ws#name` share link.
 * Trojan always runs over TLS, `sni` (or `peer`) only overrides the server name.
 */
pub fn decode(line: &str) -> Result<Node, DecodeError> {
    if !line.trim().starts_with(Protocol::Trojan.scheme()) {
        return Err(DecodeError::Uri("not a trojan link".to_owned()));
    }
    let uri = ProxyUri::parse(line)?;

    let tls = TlsSetting {
        enabled: true,
        server_name: uri.query("sni").or(uri.query("peer")).map(str::to_owned),
        skip_cert_verify: uri.query_flag("allowInsecure"),
    };

    Ok(Node {
        name: uri.name_or(Protocol::Trojan.placeholder_name()),
        server: uri.host.clone(),
        port: uri.port,
        credentials: Credentials::Trojan {
            password: uri.user.clone(),
        },
        transport: uri.transport(),
        tls,
        udp: true,
    })
}
