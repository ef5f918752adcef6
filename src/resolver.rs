//! Revision lookup through an external charm registry
//!
//! Bundles published in the upstream repository carry channels but no
//! revisions. The resolver asks the registry which revision is currently
//! published on a channel, one charm at a time.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::version::Revision;

/// Looks up the revision published on a channel for a charm
pub trait RevisionResolver {
    /// Check that the lookup tool can be used on this host
    fn ensure_available(&self) -> Result<()>;

    /// Resolve the revision for `identity` on `channel`.
    ///
    /// `Ok(Revision::Error)` means the registry answered but does not know
    /// the channel; `Err` means the lookup itself failed.
    fn resolve(&self, identity: &str, channel: &str) -> Result<Revision>;
}

/// Resolver backed by the `juju info` command
#[derive(Debug, Clone)]
pub struct JujuResolver {
    juju: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CharmInfo {
    #[serde(rename = "channel-map", default)]
    channel_map: HashMap<String, ChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    revision: u64,
}

impl JujuResolver {
    pub fn new(juju: impl Into<PathBuf>) -> Self {
        Self { juju: juju.into() }
    }

    /// Where `juju` would be run from.
    ///
    /// A bare command name is searched on `PATH` the way the shell would;
    /// anything with a directory part is taken as given.
    pub fn juju_path(&self) -> Option<PathBuf> {
        if self.juju.components().count() > 1 {
            return self.juju.is_file().then(|| self.juju.clone());
        }
        let paths = env::var_os("PATH")?;
        env::split_paths(&paths)
            .map(|dir| dir.join(&self.juju))
            .find(|candidate| candidate.is_file())
    }
}

impl RevisionResolver for JujuResolver {
    fn ensure_available(&self) -> Result<()> {
        match self.juju_path() {
            Some(path) => {
                debug!(juju = %path.display(), "found juju");
                Ok(())
            }
            None => Err(PlannerError::RevisionResolutionUnavailable(format!(
                "can't find juju at {}, it is needed to query charmhub",
                self.juju.display()
            ))),
        }
    }

    fn resolve(&self, identity: &str, channel: &str) -> Result<Revision> {
        debug!(charm = identity, channel, "querying charmhub");
        let lookup_err = |reason: String| PlannerError::RevisionLookup {
            identity: identity.to_string(),
            channel: channel.to_string(),
            reason,
        };

        let output = Command::new(&self.juju)
            .args(["info", identity, "--format", "yaml"])
            .stderr(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(lookup_err(format!("juju exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        revision_from_info(&stdout, channel).map_err(|e| lookup_err(e.to_string()))
    }
}

/// Pick the revision for `channel` out of `juju info --format yaml` output
pub fn revision_from_info(info_yaml: &str, channel: &str) -> Result<Revision> {
    let info: CharmInfo = serde_yaml::from_str(info_yaml)?;
    Ok(info
        .channel_map
        .get(channel)
        .map(|c| Revision::Number(c.revision))
        .unwrap_or(Revision::Error))
}
