//! # Runtime Configuration Module
//!
//! Environment variable overrides for plugin defaults.
//!
//! ## Environment Variables
//!
//! - `CLOUDHOOKS_SERVER_URL` - base URL events are sourced from
//! - `CLOUDHOOKS_NAMESPACE` - reverse-DNS event type prefix
//! - `CLOUDHOOKS_SOURCE_MODE` - one of `server-url`, `server-url-and-path`,
//!   `server-url-and-full-path`, `request-path`
//! - `CLOUDHOOKS_STRICT` - `true`/`false`, strict event validation
//!
//! Values that do not parse fall back to the built-in defaults with a
//! warning. Overrides layer on top of [`PluginOptions::default`]; options
//! set in code win over the environment only if the host applies them after
//! [`RuntimeConfig::apply`].
//!
//! ## Usage
//!
//! ```rust
//! use cloudhooks::{PluginOptions, RuntimeConfig};
//!
//! let options = RuntimeConfig::from_env().apply(PluginOptions::default());
//! ```

use std::env;

use tracing::warn;

use crate::builder::SourceMode;
use crate::plugin::PluginOptions;

/// Overrides loaded from the environment; `None` means "not set".
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub server_url: Option<String>,
    pub base_namespace: Option<String>,
    pub source_mode: Option<SourceMode>,
    pub strict: Option<bool>,
}

impl RuntimeConfig {
    /// Load overrides from `CLOUDHOOKS_*` environment variables.
    pub fn from_env() -> Self {
        let source_mode = match env::var("CLOUDHOOKS_SOURCE_MODE") {
            Ok(val) => match val.parse::<SourceMode>() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    warn!(value = %val, error = %e, "ignoring CLOUDHOOKS_SOURCE_MODE");
                    None
                }
            },
            Err(_) => None,
        };
        let strict = match env::var("CLOUDHOOKS_STRICT") {
            Ok(val) => match val.parse::<bool>() {
                Ok(flag) => Some(flag),
                Err(_) => {
                    warn!(value = %val, "ignoring CLOUDHOOKS_STRICT, expected true/false");
                    None
                }
            },
            Err(_) => None,
        };
        RuntimeConfig {
            server_url: env::var("CLOUDHOOKS_SERVER_URL").ok(),
            base_namespace: env::var("CLOUDHOOKS_NAMESPACE").ok(),
            source_mode,
            strict,
        }
    }

    /// Layer these overrides over `options`.
    pub fn apply(self, mut options: PluginOptions) -> PluginOptions {
        if let Some(server_url) = self.server_url {
            options.server_url = server_url;
        }
        if let Some(base_namespace) = self.base_namespace {
            options.base_namespace = base_namespace;
        }
        if let Some(source_mode) = self.source_mode {
            options.server_url_mode = source_mode;
        }
        if let Some(strict) = self.strict {
            options.event_options.strict = strict;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides_only_set_fields() {
        let config = RuntimeConfig {
            server_url: Some("http://api.example.com".to_string()),
            base_namespace: None,
            source_mode: Some(SourceMode::RequestPath),
            strict: Some(true),
        };
        let options = config.apply(PluginOptions::default());
        assert_eq!(options.server_url, "http://api.example.com");
        assert_eq!(options.base_namespace, crate::plugin::DEFAULT_BASE_NAMESPACE);
        assert_eq!(options.server_url_mode, SourceMode::RequestPath);
        assert!(options.event_options.strict);
    }

    #[test]
    fn test_default_is_all_unset() {
        let config = RuntimeConfig::default();
        let options = config.apply(PluginOptions::default());
        assert_eq!(options.server_url, crate::plugin::DEFAULT_SERVER_URL);
        assert!(!options.event_options.strict);
    }
}
