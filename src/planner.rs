//! Comparison orchestration
//!
//! Turns command line inputs into an immutable [`PlanRequest`], loads and
//! normalizes the bundles it names, then diffs them and checks for a
//! downgrade.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::bundle::{normalize, Bundle, RevisionSource};
use crate::diff::{classify, Classification};
use crate::downgrade::is_downgrade;
use crate::error::{PlannerError, Result};
use crate::manifest::{load_local, ManifestFetcher, ReleaseChannel};
use crate::resolver::RevisionResolver;

/// Keyword asking to compare a bundle against its own published release
pub const SELF_TARGET: &str = "self";

/// Target Kubeflow version given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetVersion {
    /// Use the release the source bundle is on
    Inferred,
    Release(ReleaseChannel),
}

impl TargetVersion {
    pub fn parse(s: &str) -> Result<Self> {
        if s == SELF_TARGET {
            Ok(TargetVersion::Inferred)
        } else {
            ReleaseChannel::parse(s).map(TargetVersion::Release)
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetVersion::Inferred => f.write_str(SELF_TARGET),
            TargetVersion::Release(rc) => write!(f, "{}", rc),
        }
    }
}

/// Where a bundle comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleRef {
    /// A file exported with `juju export-bundle`
    Local(PathBuf),
    /// A bundle published upstream
    Remote(TargetVersion),
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRequest {
    /// Show one bundle
    View(BundleRef),
    /// Compare a local bundle against a target
    Compare { source: PathBuf, target: BundleRef },
}

impl PlanRequest {
    /// Validate command line inputs.
    ///
    /// Accepts one local file, a target, one local file with a target, or two
    /// local files (the first is the source).
    pub fn from_inputs(files: &[PathBuf], target: Option<&str>) -> Result<Self> {
        let target = target.map(TargetVersion::parse).transpose()?;

        match (files, target) {
            ([_, _], Some(_)) => Err(PlannerError::Usage(
                "when checking for upgrade choose one of: two local bundles, or one local and one remote bundle"
                    .to_string(),
            )),
            ([], None) => Err(PlannerError::Usage(
                "nothing to do, give a bundle file and/or a target version".to_string(),
            )),
            ([], Some(TargetVersion::Inferred)) => Err(PlannerError::Usage(
                "target 'self' needs a local bundle to infer the version from".to_string(),
            )),
            ([], Some(target)) => Ok(PlanRequest::View(BundleRef::Remote(target))),
            ([file], None) => Ok(PlanRequest::View(BundleRef::Local(file.clone()))),
            ([file], Some(target)) => Ok(PlanRequest::Compare {
                source: file.clone(),
                target: BundleRef::Remote(target),
            }),
            ([source, second], None) => Ok(PlanRequest::Compare {
                source: source.clone(),
                target: BundleRef::Local(second.clone()),
            }),
            _ => Err(PlannerError::Usage("too many files".to_string())),
        }
    }
}

/// A single bundle, ready to display
#[derive(Debug, Clone)]
pub struct BundleView {
    pub bundle: Bundle,
    /// Channel of the anchor application
    pub version: String,
}

/// Everything a comparison produced
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub source_version: String,
    pub target_version: String,
    pub classification: Classification,
    pub downgrade: bool,
    pub upgrade_docs: String,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    View(BundleView),
    Comparison(ComparisonReport),
}

/// Runs plan requests against a manifest fetcher and revision resolver
pub struct Planner<'a> {
    anchor: String,
    upgrade_docs: String,
    fetcher: &'a dyn ManifestFetcher,
    resolver: &'a dyn RevisionResolver,
}

impl<'a> Planner<'a> {
    pub fn new(
        anchor: impl Into<String>,
        upgrade_docs: impl Into<String>,
        fetcher: &'a dyn ManifestFetcher,
        resolver: &'a dyn RevisionResolver,
    ) -> Self {
        Self {
            anchor: anchor.into(),
            upgrade_docs: upgrade_docs.into(),
            fetcher,
            resolver,
        }
    }

    pub fn execute(&self, request: &PlanRequest) -> Result<Outcome> {
        match request {
            PlanRequest::View(BundleRef::Local(path)) => {
                let (bundle, version) = self.local_bundle(path)?;
                Ok(Outcome::View(BundleView { bundle, version }))
            }
            PlanRequest::View(BundleRef::Remote(target)) => {
                let release = match target {
                    TargetVersion::Release(rc) => rc,
                    TargetVersion::Inferred => {
                        return Err(PlannerError::Usage(
                            "target 'self' needs a local bundle to infer the version from"
                                .to_string(),
                        ))
                    }
                };
                let (bundle, version) = self.remote_bundle(release)?;
                Ok(Outcome::View(BundleView { bundle, version }))
            }
            PlanRequest::Compare { source, target } => {
                let (source_bundle, source_version) = self.local_bundle(source)?;
                let (target_bundle, target_version) = match target {
                    BundleRef::Local(path) => self.local_bundle(path)?,
                    BundleRef::Remote(TargetVersion::Release(rc)) => self.remote_bundle(rc)?,
                    BundleRef::Remote(TargetVersion::Inferred) => {
                        let rc = ReleaseChannel::parse(&source_version)?;
                        info!(release = %rc, "inferring input bundle's version for target version");
                        self.remote_bundle(&rc)?
                    }
                };
                let report = self.compare(source_bundle, source_version, target_bundle, target_version)?;
                Ok(Outcome::Comparison(report))
            }
        }
    }

    /// Diff two normalized bundles and check the anchor for a downgrade
    pub fn compare(
        &self,
        source: Bundle,
        source_version: String,
        target: Bundle,
        target_version: String,
    ) -> Result<ComparisonReport> {
        let classification = classify(&source, &target);
        let downgrade = is_downgrade(&source, &target, &self.anchor)?;
        info!(
            changed = classification.changed_count,
            removed = classification.removed_components.len(),
            downgrade,
            "compared bundles"
        );

        Ok(ComparisonReport {
            source_version,
            target_version,
            classification,
            downgrade,
            upgrade_docs: self.upgrade_docs.clone(),
        })
    }

    fn local_bundle(&self, path: &Path) -> Result<(Bundle, String)> {
        let raw = load_local(path)?;
        normalize(&raw, &self.anchor, RevisionSource::Declared)
    }

    fn remote_bundle(&self, release: &ReleaseChannel) -> Result<(Bundle, String)> {
        let raw = self.fetcher.fetch(release)?;
        normalize(&raw, &self.anchor, RevisionSource::Resolve(self.resolver))
    }
}
