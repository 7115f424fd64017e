mod file_config;

pub use file_config::{ContentTypeConfig, FileConfig, InvalidationConfig, PathTemplates};

use crate::invalidation::SchedulerSettings;
use crate::resolver::PathResolver;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_BULK_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_ENDPOINT: &str = "https://cloudfront.amazonaws.com/2020-05-31";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub logging_level: LevelFilter,
    pub bulk: bool,
    pub bulk_timeout_ms: u64,
    pub distribution_id: Option<String>,
    pub endpoint: String,
    pub request_timeout_sec: u64,
    pub metrics_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            logging_level: LevelFilter::INFO,
            bulk: true,
            bulk_timeout_ms: DEFAULT_BULK_TIMEOUT_MS,
            distribution_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            metrics_file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Default log level, `LOG_LEVEL` directives still take precedence
    pub logging_level: LevelFilter,
    pub metrics_file: Option<PathBuf>,
    pub invalidation: InvalidationSettings,
    pub paths: PathResolver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationSettings {
    pub bulk_enabled: bool,
    pub bulk_timeout_ms: u64,
    pub distribution_id: Option<String>,
    pub endpoint: String,
    pub request_timeout_sec: u64,
}

impl InvalidationSettings {
    /// No distribution means nothing to invalidate against.
    pub fn is_dry_run(&self) -> bool {
        self.distribution_id.is_none()
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            bulk_enabled: self.bulk_enabled,
            window: Duration::from_millis(self.bulk_timeout_ms),
            dry_run: self.is_dry_run(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let logging_level = file
            .logging_level
            .as_deref()
            .and_then(parse_logging_level)
            .unwrap_or(cli.logging_level);

        let metrics_file = file
            .metrics_file
            .map(PathBuf::from)
            .or_else(|| cli.metrics_file.clone());

        let inv_file = file.invalidation.unwrap_or_default();

        let bulk_enabled = inv_file.bulk.unwrap_or(cli.bulk);
        let bulk_timeout_ms = inv_file.bulk_timeout_ms.unwrap_or(cli.bulk_timeout_ms);
        if bulk_timeout_ms == 0 {
            bail!("bulk_timeout_ms must be greater than zero");
        }

        // An empty id is treated the same as a missing one
        let distribution_id = inv_file
            .distribution_id
            .or_else(|| cli.distribution_id.clone())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let endpoint = inv_file.endpoint.unwrap_or_else(|| cli.endpoint.clone());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            bail!("Invalidation endpoint must be an http(s) URL: {}", endpoint);
        }

        let request_timeout_sec = inv_file
            .request_timeout_sec
            .unwrap_or(cli.request_timeout_sec);

        let paths = PathResolver::new(
            &file.content_type_defaults.unwrap_or_default(),
            &file.content_types,
        );

        Ok(Self {
            logging_level,
            metrics_file,
            invalidation: InvalidationSettings {
                bulk_enabled,
                bulk_timeout_ms,
                distribution_id,
                endpoint,
                request_timeout_sec,
            },
            paths,
        })
    }
}

/// Parses a level name such as `debug` or `WARN`.
fn parse_logging_level(s: &str) -> Option<LevelFilter> {
    s.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig {
            logging_level: LevelFilter::WARN,
            bulk: false,
            bulk_timeout_ms: 250,
            distribution_id: Some("E123".to_string()),
            endpoint: "http://localhost:4566".to_string(),
            request_timeout_sec: 5,
            metrics_file: Some(PathBuf::from("/tmp/cdn.prom")),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.logging_level, LevelFilter::WARN);
        assert_eq!(config.metrics_file, Some(PathBuf::from("/tmp/cdn.prom")));
        assert!(!config.invalidation.bulk_enabled);
        assert_eq!(config.invalidation.bulk_timeout_ms, 250);
        assert_eq!(config.invalidation.distribution_id, Some("E123".to_string()));
        assert_eq!(config.invalidation.endpoint, "http://localhost:4566");
        assert_eq!(config.invalidation.request_timeout_sec, 5);
        assert!(!config.invalidation.is_dry_run());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();

        assert_eq!(config.logging_level, LevelFilter::INFO);
        assert!(config.invalidation.bulk_enabled);
        assert_eq!(config.invalidation.bulk_timeout_ms, 500);
        assert_eq!(config.invalidation.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.invalidation.request_timeout_sec, 30);
        assert!(config.invalidation.is_dry_run());
        assert!(config.metrics_file.is_none());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            bulk_timeout_ms: 250,
            distribution_id: Some("FROM_CLI".to_string()),
            ..Default::default()
        };

        let file_config = FileConfig {
            invalidation: Some(InvalidationConfig {
                bulk: Some(false),
                distribution_id: Some("FROM_TOML".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert!(!config.invalidation.bulk_enabled);
        assert_eq!(
            config.invalidation.distribution_id,
            Some("FROM_TOML".to_string())
        );
        // CLI value used when TOML doesn't specify
        assert_eq!(config.invalidation.bulk_timeout_ms, 250);
    }

    #[test]
    fn test_parse_logging_level() {
        assert_eq!(parse_logging_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_logging_level("WARN"), Some(LevelFilter::WARN));
        assert_eq!(parse_logging_level(" trace "), Some(LevelFilter::TRACE));
        assert_eq!(parse_logging_level("off"), Some(LevelFilter::OFF));
        assert!(parse_logging_level("loud").is_none());
    }

    #[test]
    fn test_resolve_logging_level_from_toml() {
        let file_config = FileConfig {
            logging_level: Some("debug".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap();
        assert_eq!(config.logging_level, LevelFilter::DEBUG);
    }

    #[test]
    fn test_resolve_invalid_logging_level_falls_back_to_cli() {
        let cli = CliConfig {
            logging_level: LevelFilter::ERROR,
            ..Default::default()
        };
        let file_config = FileConfig {
            logging_level: Some("chatty".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert_eq!(config.logging_level, LevelFilter::ERROR);
    }

    #[test]
    fn test_resolve_content_types() {
        let mut content_types = std::collections::HashMap::new();
        content_types.insert(
            "article".to_string(),
            ContentTypeConfig {
                path: Some(PathTemplates::One("/articles/:slug".to_string())),
                ..Default::default()
            },
        );
        let file_config = FileConfig {
            content_type_defaults: Some(ContentTypeConfig {
                prefix_localization: Some(true),
                default_locale: Some("en".to_string()),
                ..Default::default()
            }),
            content_types,
            ..Default::default()
        };

        let config = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap();

        assert_eq!(config.paths.content_types(), vec!["article"]);
        let entry = serde_json::json!({ "slug": "hello", "locale": "fr" });
        assert_eq!(
            config.paths.affected_paths("article", &entry),
            vec!["/fr/articles/hello"]
        );
    }

    #[test]
    fn test_resolve_empty_distribution_id_is_dry_run() {
        let cli = CliConfig {
            distribution_id: Some("   ".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.invalidation.is_dry_run());
        assert!(config.invalidation.scheduler_settings().dry_run);
    }

    #[test]
    fn test_resolve_zero_timeout_error() {
        let cli = CliConfig {
            bulk_timeout_ms: 0,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("bulk_timeout_ms must be greater than zero"));
    }

    #[test]
    fn test_resolve_non_http_endpoint_error() {
        let cli = CliConfig {
            endpoint: "ftp://cdn.example.com".to_string(),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("http(s) URL"));
    }

    #[test]
    fn test_scheduler_settings_derivation() {
        let settings = InvalidationSettings {
            bulk_enabled: true,
            bulk_timeout_ms: 750,
            distribution_id: Some("E123".to_string()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_sec: 30,
        };

        let scheduler_settings = settings.scheduler_settings();
        assert!(scheduler_settings.bulk_enabled);
        assert_eq!(scheduler_settings.window, Duration::from_millis(750));
        assert!(!scheduler_settings.dry_run);
    }
}
