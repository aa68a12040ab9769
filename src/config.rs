use serde_yaml_ng::{Mapping, Value};

pub const KEY_PROXIES: &str = "proxies";
pub const KEY_PROXY_GROUPS: &str = "proxy-groups";
pub const KEY_RULES: &str = "rules";

/// Built-in targets that need no proxy or group behind them.
pub const VIRTUAL_TARGETS: [&str; 2] = ["DIRECT", "REJECT"];

/**
 * A routing client configuration.
 * Keeps the template's keys and their order, only `proxies` and group
 * members are rewritten.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument(Mapping);

impl ConfigDocument {
    pub fn new(mapping: Mapping) -> Self {
        Self(mapping)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml_ng::Error> {
        Ok(Self(serde_yaml_ng::from_str(text)?))
    }

    /// Block style, unicode kept, insertion order.
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(&self.0)
    }

    #[cfg(test)]
    pub fn into_mapping(self) -> Mapping {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn sequence(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replaces `proxies` in place, or appends the key if the template lacks it.
    pub fn set_proxies(&mut self, proxies: Vec<Value>) {
        self.0
            .insert(Value::from(KEY_PROXIES), Value::Sequence(proxies));
    }

    pub fn proxy_names(&self) -> Vec<&str> {
        self.sequence(KEY_PROXIES)
            .iter()
            .filter_map(entry_name)
            .collect()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.sequence(KEY_PROXY_GROUPS)
            .iter()
            .filter_map(entry_name)
            .collect()
    }

    /// Mutable access to every group mapping of `proxy-groups`.
    pub fn groups_mut(&mut self) -> impl Iterator<Item = &mut Mapping> {
        self.0
            .get_mut(KEY_PROXY_GROUPS)
            .and_then(Value::as_sequence_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_mapping_mut)
    }
}

/// The `name` of a proxy or group entry.
pub fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}
