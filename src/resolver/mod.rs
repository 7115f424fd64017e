//! Content-type driven path resolution.
//!
//! Maps a changed record of a configured content type to the cache paths it
//! affects. Each content type lists path templates, optionally per locale, and
//! can prefix paths with the record's locale.

mod template;

pub use template::{PathTemplate, TemplateError};

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ContentTypeConfig, PathTemplates};
use crate::invalidation::{BatchScheduler, InvalidationError};

#[derive(Debug, Clone)]
struct ContentTypeRules {
    paths: Vec<PathTemplate>,
    localized_paths: HashMap<String, Vec<PathTemplate>>,
    default_locale: Option<String>,
    prefix_default_locale: bool,
    prefix_localization: bool,
    no_trailing_slash: bool,
}

impl ContentTypeRules {
    fn new(name: &str, defaults: &ContentTypeConfig, config: &ContentTypeConfig) -> Self {
        Self {
            paths: compile(name, config.path.as_ref()),
            localized_paths: config
                .localized_path
                .iter()
                .map(|(locale, templates)| (locale.clone(), compile(name, Some(templates))))
                .collect(),
            default_locale: config
                .default_locale
                .clone()
                .or_else(|| defaults.default_locale.clone()),
            prefix_default_locale: config
                .prefix_default_locale
                .or(defaults.prefix_default_locale)
                .unwrap_or(false),
            prefix_localization: config
                .prefix_localization
                .or(defaults.prefix_localization)
                .unwrap_or(false),
            no_trailing_slash: config
                .no_trailing_slash
                .or(defaults.no_trailing_slash)
                .unwrap_or(false),
        }
    }

    /// `/fr` for a French record when localization prefixes are on. The
    /// default locale only gets a prefix with `prefix_default_locale`.
    fn locale_prefix(&self, locale: Option<&str>) -> String {
        match locale {
            Some(locale)
                if self.prefix_localization
                    && (self.prefix_default_locale
                        || self.default_locale.as_deref() != Some(locale)) =>
            {
                format!("/{}", locale)
            }
            _ => String::new(),
        }
    }

    fn finish(&self, prefix: &str, path: String) -> String {
        let mut uri = format!("{}{}", prefix, path);
        // The root path keeps its slash
        if self.no_trailing_slash && uri.len() > 1 && uri.ends_with('/') {
            uri.pop();
        }
        uri
    }
}

fn compile(content_type: &str, templates: Option<&PathTemplates>) -> Vec<PathTemplate> {
    templates
        .into_iter()
        .flat_map(PathTemplates::iter)
        .filter_map(|source| match PathTemplate::parse(source) {
            Ok(template) => Some(template),
            Err(e) => {
                warn!("Invalid path config for content type {}: {}", content_type, e);
                None
            }
        })
        .collect()
}

/// Resolves changed records to the cache paths they affect.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    content_types: HashMap<String, ContentTypeRules>,
}

impl PathResolver {
    /// Build from per-content-type configs. Options a content type leaves
    /// unset fall back to `defaults`. Templates without a leading `/` are
    /// dropped with a warning.
    pub fn new(
        defaults: &ContentTypeConfig,
        content_types: &HashMap<String, ContentTypeConfig>,
    ) -> Self {
        Self {
            content_types: content_types
                .iter()
                .map(|(name, config)| (name.clone(), ContentTypeRules::new(name, defaults, config)))
                .collect(),
        }
    }

    /// Configured content type names, sorted.
    pub fn content_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.content_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Paths affected by a change to `entry`, in configuration order.
    ///
    /// Unknown content types resolve to nothing. A template whose placeholder
    /// has no usable field in `entry` is skipped with a warning.
    pub fn affected_paths(&self, content_type: &str, entry: &Value) -> Vec<String> {
        let Some(rules) = self.content_types.get(content_type) else {
            debug!("No invalidation paths configured for content type {}", content_type);
            return Vec::new();
        };

        let locale = entry.get("locale").and_then(Value::as_str);
        let prefix = rules.locale_prefix(locale);
        let localized = locale
            .and_then(|locale| rules.localized_paths.get(locale))
            .map(Vec::as_slice)
            .unwrap_or_default();

        rules
            .paths
            .iter()
            .chain(localized)
            .filter_map(|template| match template.render(entry) {
                Ok(path) => Some(rules.finish(&prefix, path)),
                Err(e) => {
                    warn!("Skipping path for content type {}: {}", content_type, e);
                    None
                }
            })
            .collect()
    }

    /// Resolve `entry` and hand its paths to `scheduler`.
    ///
    /// Returns the resolved paths.
    pub async fn invalidate_entry(
        &self,
        scheduler: &BatchScheduler,
        content_type: &str,
        entry: &Value,
    ) -> Result<Vec<String>, InvalidationError> {
        let paths = self.affected_paths(content_type, entry);
        if !paths.is_empty() {
            scheduler.invalidate(paths.clone()).await?;
        }
        Ok(paths)
    }
}
