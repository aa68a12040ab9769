use crate::config::KEY_PROXIES;
use common::utils::decode_base64_str;
use serde_yaml_ng::{Mapping, Value};

/// Shape of a fetched subscription body.
#[derive(Debug, Clone, PartialEq)]
pub enum Subscription {
    /// Already a routing document, its proxies are taken as they are.
    Clash(Vec<Value>),
    /// Newline-delimited protocol links.
    Links(String),
}

impl Subscription {
    /**
     * Detect the body format. The first match wins:
     * a YAML mapping with a `proxies` list, then a base64 encoded
     * link list, then a plaintext link list.
     */
    pub fn resolve(body: &str) -> Self {
        if let Some(proxies) = clash_proxies(body) {
            log::debug!("subscription is a clash document with {} proxies", proxies.len());
            return Self::Clash(proxies);
        }

        match decode_base64_str(body) {
            Ok(links) => {
                log::debug!("subscription is a base64 link list");
                Self::Links(links)
            }
            Err(_) => {
                log::debug!("subscription is a plaintext link list");
                Self::Links(body.to_owned())
            }
        }
    }
}

fn clash_proxies(body: &str) -> Option<Vec<Value>> {
    let mut mapping: Mapping = serde_yaml_ng::from_str(body).ok()?;
    match mapping.remove(KEY_PROXIES)? {
        Value::Sequence(proxies) => Some(proxies),
        _ => None,
    }
}
