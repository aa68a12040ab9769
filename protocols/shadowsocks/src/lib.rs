use common::{
    Credentials, DecodeError, Node, Protocol, TlsSetting, Transport,
    utils::{decode_base64_str, percent_decode, split_host_port},
};

/**
 * Decode a `ss://` share link.
 *
 * Accepted authority layouts, tried in order:
 * 1. `base64(method:password)@host:port` (SIP002)
 * 2. `base64(method:password@host:port)` (legacy)
 * 3. `method:password@host:port` with percent-encoded userinfo
 */
pub fn decode(line: &str) -> Result<Node, DecodeError> {
    let rest = line
        .trim()
        .strip_prefix(Protocol::Shadowsocks.scheme())
        .ok_or_else(|| DecodeError::Uri("not a shadowsocks link".to_owned()))?;

    let (rest, fragment) = match rest.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (rest, None),
    };
    /* plugin options are not carried */
    let authority = rest
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let (cipher, password, server, port) = encoded_userinfo(authority)
        .or_else(|_| encoded_authority(authority))
        .or_else(|_| plain_userinfo(authority))?;

    Ok(Node {
        name: fragment
            .filter(|f| !f.is_empty())
            .map(percent_decode)
            .unwrap_or_else(|| Protocol::Shadowsocks.placeholder_name().to_owned()),
        server,
        port,
        credentials: Credentials::Shadowsocks { cipher, password },
        transport: Transport::Tcp,
        tls: TlsSetting::default(),
        udp: true,
    })
}

type Parts = (String, String, String, u16);

fn encoded_userinfo(authority: &str) -> Result<Parts, DecodeError> {
    let (userinfo, server) = authority
        .rsplit_once('@')
        .ok_or(DecodeError::Credentials)?;
    let (cipher, password) = method_password(&decode_base64_str(&percent_decode(userinfo))?)?;
    let (host, port) = split_host_port(server)?;
    Ok((cipher, password, host, port))
}

fn encoded_authority(authority: &str) -> Result<Parts, DecodeError> {
    let decoded = decode_base64_str(&percent_decode(authority))?;
    let (userinfo, server) = decoded
        .rsplit_once('@')
        .ok_or(DecodeError::Credentials)?;
    let (cipher, password) = method_password(userinfo)?;
    let (host, port) = split_host_port(server.trim())?;
    Ok((cipher, password, host, port))
}

fn plain_userinfo(authority: &str) -> Result<Parts, DecodeError> {
    let (userinfo, server) = authority
        .rsplit_once('@')
        .ok_or(DecodeError::Credentials)?;
    let (cipher, password) = method_password(&percent_decode(userinfo))?;
    let (host, port) = split_host_port(server)?;
    Ok((cipher, password, host, port))
}

fn method_password(userinfo: &str) -> Result<(String, String), DecodeError> {
    match userinfo.split_once(':') {
        Some((method, password)) if !method.is_empty() => {
            Ok((method.to_owned(), password.to_owned()))
        }
        _ => Err(DecodeError::Credentials),
    }
}
