//! Bundles and the normalizer that builds them from raw manifests
//!
//! A juju bundle lists its charms under a top-level `applications` key:
//!
//! ```yaml
//! applications:
//!   kubeflow-dashboard:
//!     charm: kubeflow-dashboard
//!     channel: 1.7/stable
//!     revision: 307
//! ```
//!
//! Normalizing keeps only what upgrade planning needs: the channel, the
//! revision and, for bundles whose revisions are resolved remotely, the
//! charm name to look up.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::{PlannerError, Result};
use crate::resolver::RevisionResolver;
use crate::version::{Revision, VersionDescriptor};

/// Top-level key holding the applications of a bundle
pub const APPLICATIONS_KEY: &str = "applications";

/// Application name to version descriptor, in manifest order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bundle {
    entries: Vec<(String, VersionDescriptor)>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an application, replacing any existing entry with the same name
    pub fn insert(&mut self, name: impl Into<String>, descriptor: VersionDescriptor) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = descriptor,
            None => self.entries.push((name, descriptor)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&VersionDescriptor> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionDescriptor)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, VersionDescriptor)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (S, VersionDescriptor)>>(iter: I) -> Self {
        let mut bundle = Bundle::new();
        for (name, descriptor) in iter {
            bundle.insert(name, descriptor);
        }
        bundle
    }
}

impl Serialize for Bundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, descriptor) in &self.entries {
            map.serialize_entry(name, descriptor)?;
        }
        map.end()
    }
}

/// Where revisions come from while normalizing
#[derive(Clone, Copy)]
pub enum RevisionSource<'a> {
    /// Read the `revision` declared in the manifest
    Declared,
    /// Ignore declared revisions and ask the resolver for each charm
    Resolve(&'a dyn RevisionResolver),
}

/// Build a [`Bundle`] from a raw manifest.
///
/// Returns the bundle together with the channel of `anchor`, which callers use
/// to infer the Kubeflow version the bundle belongs to.
pub fn normalize(
    raw: &Value,
    anchor: &str,
    revisions: RevisionSource<'_>,
) -> Result<(Bundle, String)> {
    let applications = raw
        .get(APPLICATIONS_KEY)
        .ok_or_else(|| {
            PlannerError::MalformedBundle(format!("missing '{}' key", APPLICATIONS_KEY))
        })?
        .as_mapping()
        .ok_or_else(|| {
            PlannerError::MalformedBundle(format!("'{}' is not a mapping", APPLICATIONS_KEY))
        })?;

    let mut bundle = Bundle::new();
    for (key, entry) in applications {
        let name = key
            .as_str()
            .ok_or_else(|| PlannerError::MalformedBundle(format!("non-string application name {:?}", key)))?;
        if !entry.is_mapping() {
            return Err(PlannerError::MalformedBundle(format!(
                "application '{}' is not a mapping",
                name
            )));
        }
        let channel = entry
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PlannerError::MalformedBundle(format!("application '{}' has no channel", name))
            })?;

        let descriptor = match revisions {
            RevisionSource::Declared => {
                VersionDescriptor::new(channel, declared_revision(name, entry.get("revision"))?)
            }
            RevisionSource::Resolve(_) => {
                let identity = entry.get("charm").and_then(Value::as_str).unwrap_or(name);
                VersionDescriptor::pending(channel, identity)
            }
        };
        bundle.insert(name, descriptor);
    }

    if let RevisionSource::Resolve(resolver) = revisions {
        bundle = resolve_revisions(bundle, resolver);
    }

    let anchor_channel = bundle
        .get(anchor)
        .map(|d| d.channel.clone())
        .ok_or_else(|| PlannerError::AnchorNotFound(anchor.to_string()))?;

    Ok((bundle, anchor_channel))
}

fn declared_revision(name: &str, value: Option<&Value>) -> Result<Revision> {
    let malformed = || {
        PlannerError::MalformedBundle(format!(
            "application '{}' has a revision that is not a non-negative integer",
            name
        ))
    };

    match value {
        None | Some(Value::Null) => Ok(Revision::NotFound),
        Some(Value::Number(n)) => n.as_u64().map(Revision::Number).ok_or_else(malformed),
        Some(Value::String(s)) => s.trim().parse().map(Revision::Number).map_err(|_| malformed()),
        Some(_) => Err(malformed()),
    }
}

/// Fill in every pending revision, one charm at a time in bundle order.
///
/// A missing resolver marks the whole bundle `Unavailable`; a failed lookup
/// marks only that charm `Error`.
fn resolve_revisions(bundle: Bundle, resolver: &dyn RevisionResolver) -> Bundle {
    if let Err(e) = resolver.ensure_available() {
        warn!("{}", e);
        return bundle
            .iter()
            .map(|(name, d)| (name, VersionDescriptor { revision: Revision::Unavailable, ..d.clone() }))
            .collect();
    }

    let total = bundle.len();
    info!(charms = total, "getting revision numbers from charmhub");
    bundle
        .iter()
        .enumerate()
        .map(|(i, (name, d))| {
            let identity = d.component_identity.as_deref().unwrap_or(name);
            let revision = match resolver.resolve(identity, &d.channel) {
                Ok(revision) => revision,
                Err(e) => {
                    warn!(charm = name, "{}", e);
                    Revision::Error
                }
            };
            info!(charm = name, revision = %revision, "[{}/{}] resolved", i + 1, total);
            (name, VersionDescriptor { revision, ..d.clone() })
        })
        .collect()
}
