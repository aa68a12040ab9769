use crate::{
    config::{ConfigDocument, KEY_PROXIES, KEY_PROXY_GROUPS, KEY_RULES, VIRTUAL_TARGETS, entry_name},
    rule::Rule,
};
use common::Protocol;
use serde_yaml_ng::Value;
use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
};
use thiserror::Error;

/// Checks are run in this order and stop at the first failing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    TopLevel,
    Proxies,
    ProxyGroups,
    Rules,
    References,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::TopLevel => "top-level keys",
            Self::Proxies => "proxies",
            Self::ProxyGroups => "proxy groups",
            Self::Rules => "rules",
            Self::References => "references",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {category}: {}", reasons.join("; "))]
pub struct ValidationError {
    pub category: Category,
    pub reasons: Vec<String>,
}

#[derive(Clone, Copy)]
enum Kind {
    Int,
    Bool,
    Str,
    List,
}

impl Kind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_bool(),
            Self::Str => value.is_string(),
            Self::List => value.is_sequence(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::List => "list",
        }
    }
}

const REQUIRED_KEYS: [(&str, Kind); 8] = [
    ("port", Kind::Int),
    ("socks-port", Kind::Int),
    ("allow-lan", Kind::Bool),
    ("mode", Kind::Str),
    ("log-level", Kind::Str),
    (KEY_PROXIES, Kind::List),
    (KEY_PROXY_GROUPS, Kind::List),
    (KEY_RULES, Kind::List),
];

const GROUP_FIELDS: [&str; 3] = ["name", "type", "proxies"];

fn required_proxy_fields(protocol: Protocol) -> &'static [&'static str] {
    match protocol {
        Protocol::Vmess | Protocol::Vless => &["name", "type", "server", "port", "uuid"],
        Protocol::Shadowsocks => &["name", "type", "server", "port", "cipher", "password"],
        Protocol::Trojan => &["name", "type", "server", "port", "password"],
    }
}

/// Outcome of a passing validation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub warnings: Vec<String>,
}

/// Structural checks on an assembled document. Never touches its input.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn validate(&self, doc: &ConfigDocument) -> Result<Report, ValidationError> {
        let mut report = Report::default();

        check(Category::TopLevel, top_level(doc))?;
        check(Category::Proxies, proxies(doc.sequence(KEY_PROXIES)))?;
        check(Category::ProxyGroups, groups(doc.sequence(KEY_PROXY_GROUPS)))?;
        check(
            Category::Rules,
            rules(doc.sequence(KEY_RULES), &mut report.warnings),
        )?;
        check(Category::References, references(doc))?;

        Ok(report)
    }
}

fn check(category: Category, reasons: Vec<String>) -> Result<(), ValidationError> {
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { category, reasons })
    }
}

fn top_level(doc: &ConfigDocument) -> Vec<String> {
    REQUIRED_KEYS
        .iter()
        .filter_map(|(key, kind)| match doc.get(key) {
            None => Some(format!("missing required key `{}`", key)),
            Some(value) if !kind.matches(value) => {
                Some(format!("`{}` should be a {}", key, kind.name()))
            }
            Some(_) => None,
        })
        .collect()
}

fn proxies(entries: &[Value]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["no proxies".to_owned()];
    }

    let mut reasons = Vec::new();
    let mut names = HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        if !entry.is_mapping() {
            reasons.push(format!("proxy {} is not a mapping", i));
            continue;
        }
        let label = entry_name(entry)
            .map(str::to_owned)
            .unwrap_or_else(|| i.to_string());

        let tag = entry.get("type").and_then(Value::as_str);
        let Some(protocol) = tag.and_then(Protocol::from_tag) else {
            reasons.push(format!(
                "proxy {} has unsupported type `{}`",
                label,
                tag.unwrap_or("<none>")
            ));
            continue;
        };

        for field in required_proxy_fields(protocol) {
            if entry.get(field).is_none() {
                reasons.push(format!("proxy {} is missing `{}`", label, field));
            }
        }

        match entry.get("port").and_then(Value::as_u64) {
            Some(1..=65535) => {}
            _ => reasons.push(format!("proxy {} has an invalid port", label)),
        }

        if let Some(name) = entry_name(entry) {
            if !names.insert(name) {
                reasons.push(format!("duplicate proxy name `{}`", name));
            }
        }
    }
    reasons
}

fn groups(entries: &[Value]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["no proxy groups".to_owned()];
    }

    let mut reasons = Vec::new();
    for (i, group) in entries.iter().enumerate() {
        if !group.is_mapping() {
            reasons.push(format!("group {} is not a mapping", i));
            continue;
        }
        let label = entry_name(group)
            .map(str::to_owned)
            .unwrap_or_else(|| i.to_string());

        let missing: Vec<&str> = GROUP_FIELDS
            .into_iter()
            .filter(|field| group.get(field).is_none())
            .collect();
        if !missing.is_empty() {
            reasons.push(format!("group {} is missing `{}`", label, missing.join("`, `")));
            continue;
        }

        match group.get("proxies").and_then(Value::as_sequence) {
            Some(members) if !members.is_empty() => {}
            _ => reasons.push(format!("group {} has no members", label)),
        }
    }
    reasons
}

fn rules(entries: &[Value], warnings: &mut Vec<String>) -> Vec<String> {
    if entries.is_empty() {
        warnings.push("no rules, the client falls back to its defaults".to_owned());
        return Vec::new();
    }

    let mut reasons = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let Some(line) = entry.as_str() else {
            reasons.push(format!("rule {} is not a string", i));
            continue;
        };
        match Rule::parse(line) {
            None => reasons.push(format!("rule {} is malformed: `{}`", i, line)),
            Some(rule) if rule.kind.is_none() => {
                warnings.push(format!("unknown rule type `{}`", rule.kind_name));
            }
            Some(_) => {}
        }
    }
    reasons
}

fn references(doc: &ConfigDocument) -> Vec<String> {
    let known: HashSet<&str> = doc
        .proxy_names()
        .into_iter()
        .chain(doc.group_names())
        .chain(VIRTUAL_TARGETS)
        .collect();

    let mut reasons = Vec::new();
    for group in doc.sequence(KEY_PROXY_GROUPS) {
        let name = entry_name(group).unwrap_or_default();
        let members = group
            .get("proxies")
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for member in members {
            match member.as_str() {
                Some(member) if known.contains(member) => {}
                Some(member) => {
                    reasons.push(format!("group {} references unknown `{}`", name, member))
                }
                None => reasons.push(format!("group {} has a non-string member", name)),
            }
        }
    }

    for line in doc.sequence(KEY_RULES).iter().filter_map(Value::as_str) {
        if let Some(target) = Rule::parse(line).and_then(|rule| rule.target()) {
            if !known.contains(target) {
                reasons.push(format!("rule `{}` targets unknown `{}`", line, target));
            }
        }
    }
    reasons
}
