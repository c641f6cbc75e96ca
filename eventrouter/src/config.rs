//! Router configuration loaded from a YAML or JSON file
//!
//! ```yaml
//! namespace: kube-system
//! labelSelector: app=web
//! sink:
//!   kind: fanout
//!   sinks:
//!     - kind: log
//!     - kind: http
//!       url: http://collector.logging:8080/events
//!       timeoutSeconds: 5
//! ```
//!
//! Every field is optional; an empty file routes all namespaces to the `log` sink.
use crate::{Error, Result};
use kube::runtime::watcher;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Where the config is read from when no path is given and the file exists
pub const DEFAULT_CONFIG_PATH: &str = "/etc/eventrouter/config.yaml";

/// Top level configuration of the router
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Restrict the watch to one namespace, all namespaces when unset
    #[serde(default)]
    pub namespace: Option<String>,
    /// Label selector applied to the watch
    #[serde(default)]
    pub label_selector: Option<String>,
    /// Field selector applied to the watch, e.g. `type=Warning`
    #[serde(default)]
    pub field_selector: Option<String>,
    /// The sink every routed event goes to
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Which sink to build, tagged by `kind`
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    /// One JSON line per event on stdout
    Stdout,
    /// Events as structured log lines
    #[default]
    Log,
    /// POST each event to a webhook
    Http(HttpSinkConfig),
    /// Deliver to every listed sink
    Fanout {
        /// Child sinks, delivered to concurrently
        sinks: Vec<SinkConfig>,
    },
}

/// Settings of the `http` sink
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpSinkConfig {
    /// Endpoint receiving the POSTs, `http` or `https`
    pub url: String,
    /// Per request timeout, none when unset
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl HttpSinkConfig {
    /// Per request timeout
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Parse and check the endpoint
    ///
    /// # Errors
    ///
    /// Fails unless `url` is an absolute `http` or `https` URI.
    pub fn uri(&self) -> Result<http::Uri> {
        let uri: http::Uri = self
            .url
            .parse()
            .map_err(|err| Error::InvalidSink(format!("http sink url {:?}: {err}", self.url)))?;
        match uri.scheme_str() {
            Some("http" | "https") if uri.authority().is_some() => Ok(uri),
            _ => Err(Error::InvalidSink(format!(
                "http sink url {:?} must be an absolute http(s) url",
                self.url
            ))),
        }
    }
}

impl SinkConfig {
    /// Check settings that deserialization cannot
    ///
    /// # Errors
    ///
    /// Fails for an unusable http url or an empty fanout, at any depth.
    pub fn validate(&self) -> Result<()> {
        match self {
            SinkConfig::Stdout | SinkConfig::Log => Ok(()),
            SinkConfig::Http(http) => http.uri().map(|_| ()),
            SinkConfig::Fanout { sinks } if sinks.is_empty() => {
                Err(Error::InvalidSink("fanout sink needs at least one child".into()))
            }
            SinkConfig::Fanout { sinks } => sinks.iter().try_for_each(SinkConfig::validate),
        }
    }
}

impl Config {
    /// Parse a config document
    ///
    /// JSON documents are accepted too, being valid YAML.
    ///
    /// # Errors
    ///
    /// Fails if the document does not parse or the sink settings are invalid.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self> {
        // an empty document is the all-defaults config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(contents).map_err(|source| Error::ParseConfig {
            path: path.to_path_buf(),
            source,
        })?;
        config.sink.validate()?;
        Ok(config)
    }

    /// Read and parse the config file at `path`
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or [`Config::from_yaml`] fails.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &contents)
    }

    /// Load `path`, or [`DEFAULT_CONFIG_PATH`] if it exists, or fall back to defaults
    ///
    /// # Errors
    ///
    /// Fails if a file was found but could not be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(&default)
                } else {
                    tracing::debug!("no config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Watch parameters derived from the selectors
    #[must_use]
    pub fn watcher_config(&self) -> watcher::Config {
        let mut config = watcher::Config::default();
        if let Some(labels) = &self.label_selector {
            config = config.labels(labels);
        }
        if let Some(fields) = &self.field_selector {
            config = config.fields(fields);
        }
        config
    }
}
