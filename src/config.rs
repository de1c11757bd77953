//! Guard configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! sign_in_path = "/auth/sign-in"
//! default_redirect = "/dashboard"
//! auth_prefix = "/auth"
//! base_url = "http://localhost"
//!
//! [rate_limit]
//! window_ms = 60000
//! max_attempts = 10
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::redirect::RedirectSanitizer;

/// Settings for the auth-check rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Length of one counting window, in milliseconds
    pub window_ms: u64,
    /// Attempts allowed per identifier per window
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_attempts: 10,
        }
    }
}

/// Settings for [`AuthGuard`](crate::AuthGuard).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// The sign-in route denied visitors are sent to
    pub sign_in_path: String,
    /// Where to return after sign-in when the requested page is unusable
    pub default_redirect: String,
    /// Root of the authentication section; never a valid redirect target
    pub auth_prefix: String,
    /// Neutral origin redirect targets are resolved against
    pub base_url: String,
    /// Rate limiting for `require_auth`
    pub rate_limit: RateLimitConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/auth/sign-in".to_string(),
            default_redirect: "/dashboard".to_string(),
            auth_prefix: RedirectSanitizer::DEFAULT_AUTH_PREFIX.to_string(),
            base_url: RedirectSanitizer::DEFAULT_BASE.to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Validation`] when [`Self::validate`] fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_guard::GuardConfig;
    ///
    /// let config = GuardConfig::from_toml_str(r#"
    ///     default_redirect = "/home"
    ///
    ///     [rate_limit]
    ///     max_attempts = 5
    /// "#).unwrap();
    ///
    /// assert_eq!(config.default_redirect, "/home");
    /// assert_eq!(config.rate_limit.max_attempts, 5);
    /// assert_eq!(config.rate_limit.window_ms, 60_000);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GuardConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builds the redirect sanitizer this config describes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `base_url` is not an absolute URL.
    pub fn sanitizer(&self) -> Result<RedirectSanitizer, ConfigError> {
        RedirectSanitizer::new(&self.base_url, self.auth_prefix.as_str()).map_err(|e| {
            ConfigError::Validation(vec![format!("base_url '{}' is invalid: {}", self.base_url, e)])
        })
    }

    /// Checks the config for values that would break the guards.
    ///
    /// All problems are reported together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.rate_limit.window_ms == 0 {
            problems.push("rate_limit.window_ms must be greater than 0".to_string());
        }
        if self.rate_limit.max_attempts == 0 {
            problems.push("rate_limit.max_attempts must be greater than 0".to_string());
        }

        let prefix = self.auth_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') {
            problems.push("auth_prefix must be a non-root path starting with '/'".to_string());
        }
        if !self.sign_in_path.starts_with('/') {
            problems.push("sign_in_path must start with '/'".to_string());
        }

        match RedirectSanitizer::new(&self.base_url, prefix) {
            Ok(sanitizer) => {
                // The sign-in page must live in the section the sanitizer
                // refuses, or a post-sign-in redirect could loop back to it.
                if prefix.starts_with('/') && sanitizer.is_safe(&self.sign_in_path) {
                    problems.push(format!(
                        "sign_in_path '{}' must be inside auth_prefix '{}'",
                        self.sign_in_path, self.auth_prefix
                    ));
                }
                if let Err(rejection) = sanitizer.check(&self.default_redirect) {
                    problems.push(format!(
                        "default_redirect '{}' is not a safe redirect target: {}",
                        self.default_redirect, rejection
                    ));
                }
            }
            Err(e) => problems.push(format!("base_url '{}' is invalid: {}", self.base_url, e)),
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}
