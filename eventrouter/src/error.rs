//! Error handling in [`eventrouter`][crate]
use std::path::PathBuf;
use thiserror::Error;

/// Failures while setting up the router from configuration
#[derive(Error, Debug)]
pub enum Error {
    /// The config file could not be read
    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML/JSON for [`Config`](crate::Config)
    #[error("failed to parse config file {path}: {source}")]
    ParseConfig {
        /// Path that was parsed
        path: PathBuf,
        /// Underlying parse failure
        #[source]
        source: serde_yaml::Error,
    },

    /// A sink is configured with unusable settings
    #[error("invalid sink configuration: {0}")]
    InvalidSink(String),

    /// The TLS stack for the http sink could not be initialized
    #[error("failed to set up TLS for the http sink: {0}")]
    Tls(#[source] rustls::Error),
}
