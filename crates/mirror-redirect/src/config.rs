//! Configuration types and loading logic.

use axum::http::HeaderValue;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use redirect_tracing::TracingConfig;
use serde::Deserialize;

use crate::server::RESERVED_PATHS;

/// Placeholder substituted with the `DDMMYY` date stamp in `url_template`.
pub const DATE_PLACEHOLDER: &str = "{}";

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedirectConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub redirect: RedirectPaths,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Mirror discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Mirror URL with a single `{}` where the date stamp goes.
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Number of days probed, starting with today.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// How long a discovered mirror stays cached. `0` keeps it for the
    /// lifetime of the process.
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

/// Paths used by the redirector.
#[derive(Debug, Clone, Deserialize)]
pub struct RedirectPaths {
    #[serde(default = "default_check_path")]
    pub check_path: String,

    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    #[error("url_template must contain exactly one `{{}}` placeholder, got {0:?}")]
    UrlTemplate(String),

    #[error("window_days must be at least 1")]
    EmptyWindow,

    #[error("{field} must be an absolute path starting with '/', got {value:?}")]
    RelativePath { field: &'static str, value: String },

    #[error("url_template {value:?} does not produce a usable redirect URL: {reason}")]
    TemplateUrl { value: String, reason: String },

    #[error("{field} {value:?} is not a plain route path (allowed: letters, digits, '-', '.', '_', '~', '/')")]
    RoutePath { field: &'static str, value: String },

    #[error("{field} {value:?} collides with another route")]
    PathConflict { field: &'static str, value: String },
}

fn default_listen_address() -> String {
    "0.0.0.0:9999".to_string()
}

fn default_url_template() -> String {
    "http://kinovod{}.pro".to_string()
}

fn default_window_days() -> u32 {
    6
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_check_path() -> String {
    "/check".to_string()
}

fn default_fallback_path() -> String {
    "/error".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            window_days: default_window_days(),
            probe_timeout_secs: default_probe_timeout(),
            cache_ttl_secs: 0,
        }
    }
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            check_path: default_check_path(),
            fallback_path: default_fallback_path(),
        }
    }
}

impl RedirectConfig {
    /// Load configuration from a TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (MIRROR_ prefix, __ for nesting)
    /// 2. TOML config file (may be absent)
    /// 3. Defaults
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("MIRROR_").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: RedirectConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let template = &self.discovery.url_template;
        if template.matches(DATE_PLACEHOLDER).count() != 1 {
            return Err(ConfigError::UrlTemplate(template.clone()));
        }
        validate_template_url(template)?;
        if self.discovery.window_days == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        for (field, value) in [
            ("check_path", &self.redirect.check_path),
            ("fallback_path", &self.redirect.fallback_path),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::RelativePath {
                    field,
                    value: value.clone(),
                });
            }
            if !is_plain_route(value) {
                return Err(ConfigError::RoutePath {
                    field,
                    value: value.clone(),
                });
            }
            if RESERVED_PATHS.contains(&value.as_str()) {
                return Err(ConfigError::PathConflict {
                    field,
                    value: value.clone(),
                });
            }
        }
        if self.redirect.check_path == self.redirect.fallback_path {
            return Err(ConfigError::PathConflict {
                field: "fallback_path",
                value: self.redirect.fallback_path.clone(),
            });
        }
        Ok(())
    }
}

/// Static route without captures or wildcards, so the router accepts it as-is.
fn is_plain_route(path: &str) -> bool {
    path.len() > 1
        && !path.contains("//")
        && path
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-._~/".contains(&b))
}

/// A mirror URL built from the template must parse as an http(s) URL and fit
/// in a `Location` header.
fn validate_template_url(template: &str) -> Result<(), ConfigError> {
    let sample = template.replacen(DATE_PLACEHOLDER, "010100", 1);
    let invalid = |reason: String| ConfigError::TemplateUrl {
        value: template.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(&sample).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    HeaderValue::from_str(&sample).map_err(|e| invalid(e.to_string()))?;
    Ok(())
}
