//! Error types for the upgrade planner

use thiserror::Error;

/// Result type for planner operations
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Which side of a comparison a bundle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Upgrade planner errors
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Malformed bundle: {0}")]
    MalformedBundle(String),

    #[error("Anchor application '{0}' not found in bundle")]
    AnchorNotFound(String),

    #[error("Anchor application '{anchor}' missing from {side} bundle")]
    MissingAnchor { anchor: String, side: Side },

    #[error("Malformed channel '{channel}': {reason}")]
    MalformedChannel { channel: String, reason: String },

    #[error("Failed to fetch target bundle from {url}: {reason}")]
    RemoteFetch { url: String, reason: String },

    #[error("Revision resolver unavailable: {0}")]
    RevisionResolutionUnavailable(String),

    #[error("Revision lookup failed for {identity} on {channel}: {reason}")]
    RevisionLookup {
        identity: String,
        channel: String,
        reason: String,
    },

    #[error("Invalid output path {0}")]
    InvalidOutputPath(String),

    #[error("{0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PlannerError {
    pub(crate) fn malformed_channel(channel: &str, reason: impl Into<String>) -> Self {
        PlannerError::MalformedChannel {
            channel: channel.to_string(),
            reason: reason.into(),
        }
    }
}
