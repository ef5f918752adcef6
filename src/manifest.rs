//! Loading raw bundle manifests from disk or from the upstream repository

use std::fmt;
use std::fs;
use std::path::Path;

use serde_yaml::Value;
use tracing::info;

use crate::error::{PlannerError, Result};

/// A published Kubeflow release, e.g. `1.7/stable`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseChannel {
    pub release: String,
    pub channel: String,
}

impl ReleaseChannel {
    pub fn parse(s: &str) -> Result<Self> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [release, channel] if !release.is_empty() && !channel.is_empty() => Ok(Self {
                release: release.to_string(),
                channel: channel.to_string(),
            }),
            _ => Err(PlannerError::malformed_channel(
                s,
                "expected <release>/<channel>, e.g. 1.7/stable",
            )),
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.release, self.channel)
    }
}

/// URL of the published bundle for a release
pub fn bundle_url(repo_root: &str, target: &ReleaseChannel) -> String {
    format!(
        "{}/raw/main/releases/{}/{}/kubeflow/bundle.yaml",
        repo_root.trim_end_matches('/'),
        target.release,
        target.channel
    )
}

/// Read and parse a bundle file exported with `juju export-bundle`
pub fn load_local(path: &Path) -> Result<Value> {
    info!(path = %path.display(), "loading bundle");
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Source of published target bundles
pub trait ManifestFetcher {
    fn fetch(&self, target: &ReleaseChannel) -> Result<Value>;
}

/// Downloads bundles over HTTP from the upstream repository
pub struct HttpFetcher {
    repo_root: String,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(repo_root: impl Into<String>) -> Result<Self> {
        let repo_root = repo_root.into();
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("kup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlannerError::RemoteFetch {
                url: repo_root.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(repo_root, client))
    }

    /// Use an already configured client, e.g. one with custom proxy settings
    pub fn with_client(repo_root: impl Into<String>, client: reqwest::blocking::Client) -> Self {
        Self {
            repo_root: repo_root.into(),
            client,
        }
    }
}

impl ManifestFetcher for HttpFetcher {
    fn fetch(&self, target: &ReleaseChannel) -> Result<Value> {
        let url = bundle_url(&self.repo_root, target);
        let fetch_err = |reason: String| PlannerError::RemoteFetch {
            url: url.clone(),
            reason,
        };

        info!(%url, "downloading bundle");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!(
                "HTTP {}, target bundle for Kubeflow {} not found",
                response.status(),
                target
            )));
        }

        let body = response.text().map_err(|e| fetch_err(e.to_string()))?;
        serde_yaml::from_str(&body).map_err(|e| fetch_err(format!("invalid bundle: {}", e)))
    }
}
