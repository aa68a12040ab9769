use crate::config::ConfigDocument;
use serde_yaml_ng::Value;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Used whenever the requested template does not exist.
pub const DEFAULT_TEMPLATE: &str = "enhanced";

const TEMPLATE_SUFFIX: &str = "_template.yaml";

static BUILTIN: [(&str, &str); 2] = [
    ("basic", include_str!("../templates/basic_template.yaml")),
    ("enhanced", include_str!("../templates/enhanced_template.yaml")),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` not found and no default template available")]
    NotFound(String),
    #[error("read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse template `{name}`: {source}")]
    Parse {
        name: String,
        source: serde_yaml_ng::Error,
    },
    #[error("template `{0}` is not a mapping")]
    NotAMapping(String),
    #[error("template name `{0}` is not a plain file name")]
    InvalidName(String),
}

/// A name usable as a single file name component inside a directory.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains(['/', '\\']) && !name.contains("..")
}

/// Source of template documents, selected by name.
pub trait TemplateStore {
    /**
     * Load the named template, falling back to [`DEFAULT_TEMPLATE`].
     * Every call returns a fresh document.
     */
    fn load(&self, name: &str) -> Result<ConfigDocument, TemplateError>;

    fn names(&self) -> Vec<String>;
}

fn parse(name: &str, text: &str) -> Result<ConfigDocument, TemplateError> {
    let value: Value = serde_yaml_ng::from_str(text).map_err(|source| TemplateError::Parse {
        name: name.to_owned(),
        source,
    })?;
    match value {
        Value::Mapping(mapping) => Ok(ConfigDocument::new(mapping)),
        _ => Err(TemplateError::NotAMapping(name.to_owned())),
    }
}

/// Templates compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTemplates;

impl TemplateStore for BuiltinTemplates {
    fn load(&self, name: &str) -> Result<ConfigDocument, TemplateError> {
        let find = |wanted: &str| BUILTIN.iter().find(|(n, _)| *n == wanted);
        let (found, text) = match find(name) {
            Some(entry) => entry,
            None => {
                log::warn!("template `{}` unknown, using `{}`", name, DEFAULT_TEMPLATE);
                find(DEFAULT_TEMPLATE).ok_or_else(|| TemplateError::NotFound(name.to_owned()))?
            }
        };
        parse(found, text)
    }

    fn names(&self) -> Vec<String> {
        BUILTIN.iter().map(|(name, _)| (*name).to_owned()).collect()
    }
}

/// `{dir}/{name}_template.yaml` files.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    dir: PathBuf,
}

impl DirTemplates {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, TEMPLATE_SUFFIX))
    }

    fn read(&self, name: &str) -> Result<Option<String>, TemplateError> {
        let path = self.path(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TemplateError::Io { path, source }),
        }
    }
}

impl TemplateStore for DirTemplates {
    fn load(&self, name: &str) -> Result<ConfigDocument, TemplateError> {
        if !is_plain_name(name) {
            return Err(TemplateError::InvalidName(name.to_owned()));
        }
        if let Some(text) = self.read(name)? {
            return parse(name, &text);
        }
        log::warn!(
            "{} missing, using `{}`",
            self.path(name).display(),
            DEFAULT_TEMPLATE
        );
        match self.read(DEFAULT_TEMPLATE)? {
            Some(text) => parse(DEFAULT_TEMPLATE, &text),
            None => Err(TemplateError::NotFound(name.to_owned())),
        }
    }

    fn names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|file| file.strip_suffix(TEMPLATE_SUFFIX))
                    .map(str::to_owned)
            })
            .collect();
        names.sort();
        names
    }
}

/// Either store, picked at startup.
#[derive(Debug, Clone)]
pub enum Templates {
    Builtin(BuiltinTemplates),
    Dir(DirTemplates),
}

impl Templates {
    pub fn from_dir(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::Dir(DirTemplates::new(dir)),
            None => Self::Builtin(BuiltinTemplates),
        }
    }
}

impl TemplateStore for Templates {
    fn load(&self, name: &str) -> Result<ConfigDocument, TemplateError> {
        match self {
            Self::Builtin(store) => store.load(name),
            Self::Dir(store) => store.load(name),
        }
    }

    fn names(&self) -> Vec<String> {
        match self {
            Self::Builtin(store) => store.names(),
            Self::Dir(store) => store.names(),
        }
    }
}
