// src/error.rs

// Error type shared by every layer of the recorder. Startup and flush failures
// travel up to main through this enum and end the process.

use std::path::PathBuf;

/// Recorder error types
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// Invalid or missing configuration value
    #[error("configuration error: {0}")]
    Config(String),
    /// Filesystem failure while reading or writing `path`
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// YAML (de)serialization failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Desk session or event stream failure
    #[error("Desk error: {0}")]
    Desk(String),
    /// ROS 2 middleware failure
    #[error("ROS error: {0}")]
    Ros(String),
    /// The parameter service refused a setting
    #[error("parameter {name} rejected: {reason}")]
    ParameterRejected {
        /// Parameter name
        name: String,
        /// Reason reported by the service
        reason: String,
    },
}

impl RecorderError {
    /// Wraps an I/O error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecorderError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(feature = "ros")]
impl From<r2r::Error> for RecorderError {
    fn from(e: r2r::Error) -> Self {
        RecorderError::Ros(e.to_string())
    }
}

#[cfg(feature = "desk")]
impl From<reqwest::Error> for RecorderError {
    fn from(e: reqwest::Error) -> Self {
        RecorderError::Desk(e.to_string())
    }
}

#[cfg(feature = "desk")]
impl From<tungstenite::Error> for RecorderError {
    fn from(e: tungstenite::Error) -> Self {
        RecorderError::Desk(e.to_string())
    }
}
