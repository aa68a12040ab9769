use common::{DecodeError, Node, Protocol};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Characters of the offending line kept in diagnostics.
const EXCERPT_LEN: usize = 50;

/// A subscription line that looked like a supported link but did not decode.
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    pub protocol: Protocol,
    pub excerpt: String,
    pub error: DecodeError,
}

impl Display for LineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} line `{}`: {}", self.protocol, self.excerpt, self.error)
    }
}

/**
 * Decode one subscription line.
 * Returns `None` for blank lines and schemes that are not supported.
 */
pub fn decode_line(line: &str) -> Option<Result<Node, LineError>> {
    let line = line.trim();
    let protocol = Protocol::from_uri(line)?;

    let decoded = match protocol {
        Protocol::Vmess => vmess::decode(line),
        Protocol::Shadowsocks => shadowsocks::decode(line),
        Protocol::Trojan => trojan::decode(line),
        Protocol::Vless => vless::decode(line),
    };

    Some(decoded.map_err(|error| LineError {
        protocol,
        excerpt: line.chars().take(EXCERPT_LEN).collect(),
        error,
    }))
}

/// Decode every line of a newline-delimited link list.
pub fn decode_lines(content: &str) -> (Vec<Node>, Vec<LineError>) {
    let mut nodes = Vec::new();
    let mut errors = Vec::new();

    for outcome in content.lines().filter_map(decode_line) {
        match outcome {
            Ok(node) => nodes.push(node),
            Err(err) => {
                log::warn!("skip {}", err);
                errors.push(err);
            }
        }
    }
    log::debug!("decoded {} nodes, skipped {} lines", nodes.len(), errors.len());

    (nodes, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::STANDARD};

    fn vmess_link(json: &str) -> String {
        format!("vmess://{}", STANDARD.encode(json))
    }

    #[test]
    fn dispatch_by_scheme() {
        let ss = format!("ss://{}@example.com:8388#MyNode", STANDARD.encode("aes-256-gcm:p4ssw0rd"));
        let lines = [
            (vmess_link(r#"{"add":"v.example.com","port":"10086","id":"u"}"#), Protocol::Vmess, "v.example.com", 10086),
            (ss, Protocol::Shadowsocks, "example.com", 8388),
            ("trojan://pw@t.example.com:443".to_owned(), Protocol::Trojan, "t.example.com", 443),
            ("vless://id@l.example.com:8443".to_owned(), Protocol::Vless, "l.example.com", 8443),
        ];
        for (line, protocol, host, port) in lines {
            let node = decode_line(&line).unwrap().unwrap();
            assert_eq!(node.protocol(), protocol);
            assert_eq!(node.server, host);
            assert_eq!(node.port, port);
        }
    }

    #[test]
    fn unsupported_and_blank_lines_are_skipped() {
        assert!(decode_line("").is_none());
        assert!(decode_line("   ").is_none());
        assert!(decode_line("hysteria2://pw@example.com:443").is_none());
        assert!(decode_line("https://example.com/sub").is_none());
        assert!(decode_line("VMESS://abc").is_none());
    }

    #[test]
    fn bad_vmess_line_is_dropped_with_a_diagnostic() {
        let content = [
            vmess_link(r#"{"ps":"a","add":"a.example.com","port":443,"id":"u1"}"#),
            vmess_link("definitely not json"),
            "trojan://pw@b.example.com:443#b".to_owned(),
        ]
        .join("\n");

        let (nodes, errors) = decode_lines(&content);
        assert_eq!(nodes.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].protocol, Protocol::Vmess);
        assert!(matches!(errors[0].error, DecodeError::Json(_)));
        assert!(errors[0].excerpt.chars().count() <= EXCERPT_LEN);
    }

    #[test]
    fn crlf_lines() {
        let content = "trojan://pw@a.example.com:443\r\n\r\nvless://id@b.example.com:443\r\n";
        let (nodes, errors) = decode_lines(content);
        assert_eq!(nodes.len(), 2);
        assert!(errors.is_empty());
    }
}
