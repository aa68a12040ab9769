use crate::{
    config::{ConfigDocument, entry_name},
    decoder::{LineError, decode_lines},
    proxy::Proxy,
    subscription::Subscription,
    template::{TemplateError, TemplateStore},
    translator::{TranslateError, Translator},
    validator::{SchemaValidator, ValidationError},
};
use serde_yaml_ng::Value;
use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
};
use thiserror::Error;

pub const GROUP_SELECT: &str = "🚀 节点选择";
pub const GROUP_AUTO: &str = "♻️ 自动选择";
pub const GROUP_FALLBACK: &str = "🐟 漏网之鱼";
pub const GROUP_DIRECT: &str = "🎯 全球直连";

const KEY_GROUP_MEMBERS: &str = "proxies";

/// A subscription item that was skipped during a generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Decode(LineError),
    Translate(TranslateError),
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Decode(err) => write!(f, "decode: {}", err),
            Self::Translate(err) => write!(f, "translate: {}", err),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}

/// A validated document plus what was skipped on the way.
#[derive(Debug)]
pub struct Generation {
    pub document: ConfigDocument,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<String>,
}

impl Generation {
    pub fn to_yaml(&self) -> Result<String, GenerateError> {
        Ok(self.document.to_yaml()?)
    }
}

/**
 * Turns a subscription body into a routing document:
 * decode, translate, merge into a template, rewrite groups, validate.
 */
pub struct Generator<S> {
    templates: S,
    translator: Translator,
    validator: SchemaValidator,
}

impl<S: TemplateStore> Generator<S> {
    pub fn new(templates: S) -> Self {
        Self {
            templates,
            translator: Translator::default(),
            validator: SchemaValidator,
        }
    }

    pub fn templates(&self) -> &S {
        &self.templates
    }

    /// Decode and translate a link list. Failed items become diagnostics.
    pub fn translate(&self, links: &str) -> (Vec<Proxy>, Vec<Diagnostic>) {
        let (nodes, errors) = decode_lines(links);
        let mut diagnostics: Vec<Diagnostic> = errors.into_iter().map(Diagnostic::Decode).collect();

        let mut proxies = Vec::with_capacity(nodes.len());
        for node in &nodes {
            match self.translator.translate(node) {
                Ok(proxy) => proxies.push(proxy),
                Err(err) => {
                    log::warn!("drop {}", err);
                    diagnostics.push(Diagnostic::Translate(err));
                }
            }
        }
        dedupe_names(&mut proxies);

        (proxies, diagnostics)
    }

    pub fn generate(&self, body: &str, template: &str) -> Result<Generation, GenerateError> {
        let mut diagnostics = Vec::new();
        let proxies: Vec<Value> = match Subscription::resolve(body) {
            Subscription::Clash(proxies) => proxies,
            Subscription::Links(links) => {
                let (proxies, skipped) = self.translate(&links);
                diagnostics = skipped;
                proxies
                    .iter()
                    .map(serde_yaml_ng::to_value)
                    .collect::<Result<_, _>>()?
            }
        };
        let names: Vec<String> = proxies
            .iter()
            .filter_map(entry_name)
            .map(str::to_owned)
            .collect();
        log::info!(
            "{} proxies, {} skipped, template `{}`",
            names.len(),
            diagnostics.len(),
            template
        );

        let mut document = self.templates.load(template)?;
        document.set_proxies(proxies);
        rewrite_groups(&mut document, &names);

        let report = self.validator.validate(&document)?;
        for warning in &report.warnings {
            log::warn!("{}", warning);
        }

        Ok(Generation {
            document,
            diagnostics,
            warnings: report.warnings,
        })
    }
}

/// Suffix repeated names with ` 2`, ` 3`, ... in order of appearance.
fn dedupe_names(proxies: &mut [Proxy]) {
    let mut seen = HashSet::new();
    for proxy in proxies {
        if seen.insert(proxy.name.clone()) {
            continue;
        }
        let mut index = 2;
        let unique = loop {
            let candidate = format!("{} {}", proxy.name, index);
            if !seen.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };
        log::debug!("rename duplicate `{}` to `{}`", proxy.name, unique);
        seen.insert(unique.clone());
        proxy.name = unique;
    }
}

fn members(prefix: &[&str], names: &[String]) -> Value {
    Value::Sequence(
        prefix
            .iter()
            .map(|name| Value::from(*name))
            .chain(names.iter().map(|name| Value::from(name.as_str())))
            .collect(),
    )
}

/// Only the three well-known groups are rewritten, others keep their members.
fn rewrite_groups(document: &mut ConfigDocument, names: &[String]) {
    for group in document.groups_mut() {
        let proxies = match group.get("name").and_then(Value::as_str) {
            Some(GROUP_SELECT) => members(&[GROUP_AUTO, "DIRECT"], names),
            Some(GROUP_AUTO) => members(&[], names),
            Some(GROUP_FALLBACK) => members(&[GROUP_SELECT, GROUP_DIRECT, GROUP_AUTO], names),
            _ => continue,
        };
        group.insert(Value::from(KEY_GROUP_MEMBERS), proxies);
    }
}
