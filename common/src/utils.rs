use crate::{DecodeError, Transport};
use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use percent_encoding::percent_decode_str;
use std::{collections::HashMap, str::FromStr};
use url::Url;

pub const DEFAULT_PORT: u16 = 443;

const PADDING_INDIFFERENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT);

/**
 * Decode base64 the way subscription providers emit it:
 * whitespace anywhere, padding optional, standard or url-safe alphabet.
 */
pub fn decode_base64(input: &str) -> Result<Vec<u8>, DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(DecodeError::Base64);
    }
    STANDARD
        .decode(&cleaned)
        .or_else(|_| URL_SAFE.decode(&cleaned))
        .map_err(|_| DecodeError::Base64)
}

pub fn decode_base64_str(input: &str) -> Result<String, DecodeError> {
    String::from_utf8(decode_base64(input)?).map_err(|_| DecodeError::Utf8)
}

/// Percent-decode, keeping the raw text when the result is not utf-8.
pub fn percent_decode(input: &str) -> String {
    match percent_decode_str(input).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => input.to_owned(),
    }
}

pub fn parse_port(port: &str) -> Result<u16, DecodeError> {
    match u16::from_str(port.trim()) {
        Ok(0) | Err(_) => Err(DecodeError::InvalidPort(port.to_owned())),
        Ok(port) => Ok(port),
    }
}

/// Split `host:port`, accepting bracketed IPv6 hosts.
pub fn split_host_port(addr: &str) -> Result<(String, u16), DecodeError> {
    let (host, port) = addr.rsplit_once(':').ok_or(DecodeError::MissingPort)?;
    let host = strip_brackets(host);
    if host.is_empty() {
        return Err(DecodeError::MissingHost);
    }
    Ok((host.to_owned(), parse_port(port)?))
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/**
 * The common shape of `trojan://` and `vless://` links:
 * `scheme://user@host:port?query#name`.
 */
#[derive(Debug)]
pub struct ProxyUri {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    query: HashMap<String, String>,
}

impl ProxyUri {
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let url = Url::parse(line.trim()).map_err(|err| DecodeError::Uri(err.to_string()))?;

        let host = url
            .host_str()
            .map(strip_brackets)
            .filter(|h| !h.is_empty())
            .ok_or(DecodeError::MissingHost)?
            .to_owned();

        /* first occurrence wins for repeated keys */
        let mut query = HashMap::new();
        for (key, value) in url.query_pairs() {
            query
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }

        let port = match url.port() {
            Some(0) => return Err(DecodeError::InvalidPort("0".to_owned())),
            Some(port) => port,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            user: percent_decode(url.username()),
            host,
            port,
            name: url
                .fragment()
                .filter(|f| !f.is_empty())
                .map(percent_decode),
            query,
        })
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn query_flag(&self, key: &str) -> bool {
        matches!(self.query(key), Some("1" | "true"))
    }

    /// Transport described by `type`, `path`, `host` and `serviceName`.
    pub fn transport(&self) -> Transport {
        match self.query("type") {
            Some("ws") => Transport::WebSocket {
                path: self.query("path").unwrap_or("/").to_owned(),
                host: self.query("host").map(str::to_owned),
            },
            Some("grpc") => Transport::Grpc {
                service_name: self.query("serviceName").unwrap_or_default().to_owned(),
            },
            _ => Transport::Tcp,
        }
    }

    pub fn name_or(&self, placeholder: &str) -> String {
        self.name.clone().unwrap_or_else(|| placeholder.to_owned())
    }
}
