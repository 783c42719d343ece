//! Configuration for the student activity report.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use student_activity_sdk::HideableField;
use url::Url;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "STUDENT_ACTIVITY__";

/// Configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudentActivityConfig {
    /// Site root used to build per-row links.
    pub base_url: String,
    /// Rows per page when the request does not specify one.
    pub default_page_size: u32,
    /// Upper bound for the requested page size.
    pub max_page_size: u32,
    /// Roster pages kept per request.
    pub roster_cache_capacity: usize,
    /// Whether discussions carry a visibility window.
    pub timed_posts_enabled: bool,
    /// The evaluation instant is rounded to the nearest multiple of this many seconds.
    pub time_granularity_secs: u32,
    /// User fields hidden from viewers without the view-hidden-user-fields capability.
    pub hidden_user_fields: Vec<HideableField>,
}

impl Default for StudentActivityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/".to_owned(),
            default_page_size: 100,
            max_page_size: 5000,
            roster_cache_capacity: 16,
            timed_posts_enabled: true,
            time_granularity_secs: 100,
            hidden_user_fields: Vec::new(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl StudentActivityConfig {
    /// Load defaults, then the optional YAML file, then `STUDENT_ACTIVITY__*`
    /// environment variables, and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a source cannot be parsed and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;
        if self.max_page_size == 0 {
            return Err(invalid("max_page_size", "must be at least 1"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(invalid(
                "default_page_size",
                format!("must be between 1 and {}", self.max_page_size),
            ));
        }
        if self.roster_cache_capacity == 0 {
            return Err(invalid("roster_cache_capacity", "must be at least 1"));
        }
        if self.time_granularity_secs == 0 {
            return Err(invalid("time_granularity_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// The base URL with a trailing slash, so relative joins keep its path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `base_url` is not an absolute URL.
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| invalid("base_url", e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("base_url", "must be a hierarchical URL"));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
