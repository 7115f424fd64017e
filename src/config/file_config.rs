use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub logging_level: Option<String>,
    pub metrics_file: Option<String>,

    pub invalidation: Option<InvalidationConfig>,

    /// Options shared by every content type unless overridden
    pub content_type_defaults: Option<ContentTypeConfig>,
    pub content_types: HashMap<String, ContentTypeConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct InvalidationConfig {
    /// Group requests into one call per debounce window
    pub bulk: Option<bool>,
    pub bulk_timeout_ms: Option<u64>,
    /// Dry run when absent or empty
    pub distribution_id: Option<String>,
    pub endpoint: Option<String>,
    pub request_timeout_sec: Option<u64>,
}

/// Paths affected by a change to one content type.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ContentTypeConfig {
    /// Templates such as `/articles/:slug`, for every locale
    pub path: Option<PathTemplates>,
    /// Extra templates keyed by locale
    pub localized_path: HashMap<String, PathTemplates>,

    pub default_locale: Option<String>,
    pub prefix_default_locale: Option<bool>,
    pub prefix_localization: Option<bool>,
    pub no_trailing_slash: Option<bool>,
}

/// One template or a list of them.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathTemplates {
    One(String),
    Many(Vec<String>),
}

impl PathTemplates {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let templates: &[String] = match self {
            PathTemplates::One(template) => std::slice::from_ref(template),
            PathTemplates::Many(templates) => templates,
        };
        templates.iter().map(String::as_str)
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
