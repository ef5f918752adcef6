//! End-to-end planner tests
//!
//! Bundles are loaded from fixtures; published bundles and charmhub revisions
//! come from in-memory stand-ins for the HTTP fetcher and juju.

use std::collections::HashMap;
use std::path::PathBuf;

use kf_upgrade_planner::render::{render_classification, write_output};
use kf_upgrade_planner::{
    classify, BundleRef, ChangeMarker, ComparisonReport, ManifestFetcher, OutputFormat, Outcome,
    PlanRequest, Planner, PlannerError, ReleaseChannel, Result, Revision, RevisionResolver,
    TargetVersion, VersionDescriptor,
};

const ANCHOR: &str = "kubeflow-dashboard";
const DOCS: &str = "https://github.com/canonical/bundle-kubeflow/tree/main/docs";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Serves `published-<release>-<channel>.yaml` fixtures
struct FixtureFetcher;

impl ManifestFetcher for FixtureFetcher {
    fn fetch(&self, target: &ReleaseChannel) -> Result<serde_yaml::Value> {
        let path = fixture(&format!("published-{}-{}.yaml", target.release, target.channel));
        let content = std::fs::read_to_string(&path).map_err(|e| PlannerError::RemoteFetch {
            url: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Charmhub stand-in; unknown (charm, channel) pairs answer `Error`
struct TableResolver {
    available: bool,
    revisions: HashMap<(String, String), u64>,
}

impl TableResolver {
    fn new(entries: &[(&str, &str, u64)]) -> Self {
        Self {
            available: true,
            revisions: entries
                .iter()
                .map(|(charm, channel, rev)| ((charm.to_string(), channel.to_string()), *rev))
                .collect(),
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            revisions: HashMap::new(),
        }
    }
}

impl RevisionResolver for TableResolver {
    fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(PlannerError::RevisionResolutionUnavailable("juju not installed".into()))
        }
    }

    fn resolve(&self, identity: &str, channel: &str) -> Result<Revision> {
        Ok(self
            .revisions
            .get(&(identity.to_string(), channel.to_string()))
            .map(|r| Revision::Number(*r))
            .unwrap_or(Revision::Error))
    }
}

fn charmhub() -> TableResolver {
    TableResolver::new(&[
        ("kubeflow-dashboard", "1.8/stable", 454),
        ("istio-pilot", "1.17/stable", 827),
        ("jupyter-ui", "1.8/stable", 540),
        ("kubeflow-dashboard", "1.7/stable", 307),
        ("istio-pilot", "1.16/stable", 551),
        ("jupyter-ui", "1.7/stable", 600),
        ("seldon-core", "1.15/stable", 92),
    ])
}

fn run(request: PlanRequest, resolver: &TableResolver) -> Result<Outcome> {
    Planner::new(ANCHOR, DOCS, &FixtureFetcher, resolver).execute(&request)
}

fn compare(request: PlanRequest, resolver: &TableResolver) -> ComparisonReport {
    match run(request, resolver).unwrap() {
        Outcome::Comparison(report) => report,
        other => panic!("Expected a comparison, got {:?}", other),
    }
}

// =============================================================================
// Views
// =============================================================================

#[test]
fn test_view_local_bundle() {
    let request = PlanRequest::View(BundleRef::Local(fixture("local-1.7.yaml")));
    match run(request, &charmhub()).unwrap() {
        Outcome::View(view) => {
            assert_eq!(view.version, "1.7/stable");
            assert_eq!(view.bundle.len(), 4);
            assert_eq!(
                view.bundle.get("istio-pilot").unwrap().revision,
                Revision::Number(551)
            );
        }
        other => panic!("Expected a view, got {:?}", other),
    }
}

#[test]
fn test_view_remote_bundle_resolves_revisions() {
    let request = PlanRequest::from_inputs(&[], Some("1.8/stable")).unwrap();
    match run(request, &charmhub()).unwrap() {
        Outcome::View(view) => {
            assert_eq!(view.version, "1.8/stable");
            assert_eq!(
                view.bundle.get(ANCHOR).unwrap().revision,
                Revision::Number(454)
            );
            // mlmd is not known to the resolver
            assert_eq!(view.bundle.get("mlmd").unwrap().revision, Revision::Error);
        }
        other => panic!("Expected a view, got {:?}", other),
    }
}

// =============================================================================
// Comparisons
// =============================================================================

#[test]
fn test_compare_two_local_bundles() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.7.yaml"), fixture("local-1.8.yaml")], None)
            .unwrap();
    let report = compare(request, &charmhub());
    let c = &report.classification;

    let order: Vec<_> = c.records.iter().map(|r| r.component.as_str()).collect();
    assert_eq!(order, vec![ANCHOR, "istio-pilot", "jupyter-ui", "mlmd"]);

    let dashboard = c.get(ANCHOR).unwrap();
    assert_eq!(dashboard.channel_change, ChangeMarker::Upgrade);
    assert_eq!(dashboard.revision_change, ChangeMarker::Upgrade);

    let jupyter = c.get("jupyter-ui").unwrap();
    assert_eq!(jupyter.channel_change, ChangeMarker::Upgrade);
    assert_eq!(jupyter.revision_change, ChangeMarker::None);

    let mlmd = c.get("mlmd").unwrap();
    assert_eq!(mlmd.channel_change, ChangeMarker::Added);
    assert_eq!(mlmd.revision_change, ChangeMarker::Added);

    assert_eq!(c.changed_count, 4);
    assert_eq!(c.removed_components, vec!["seldon-controller-manager".to_string()]);
    assert!(!report.downgrade);
    assert_eq!(report.source_version, "1.7/stable");
    assert_eq!(report.target_version, "1.8/stable");
    assert_eq!(report.upgrade_docs, DOCS);
}

#[test]
fn test_compare_backwards_is_a_downgrade() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.8.yaml"), fixture("local-1.7.yaml")], None)
            .unwrap();
    let report = compare(request, &charmhub());
    assert!(report.downgrade);

    let dashboard = report.classification.get(ANCHOR).unwrap();
    // Channel differences are flagged whatever their direction
    assert_eq!(dashboard.channel_change, ChangeMarker::Upgrade);
    assert_eq!(dashboard.revision_change, ChangeMarker::None);
    assert_eq!(report.classification.removed_components, vec!["mlmd".to_string()]);
}

#[test]
fn test_compare_against_published_release() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.7.yaml")], Some("1.8/stable")).unwrap();
    let report = compare(request, &charmhub());
    let c = &report.classification;

    let dashboard = c.get(ANCHOR).unwrap();
    assert_eq!(dashboard.src_revision, Some(Revision::Number(307)));
    assert_eq!(dashboard.dst_revision, Some(Revision::Number(454)));
    assert_eq!(dashboard.revision_change, ChangeMarker::Upgrade);

    let jupyter = c.get("jupyter-ui").unwrap();
    assert_eq!(jupyter.revision_change, ChangeMarker::Upgrade);

    let mlmd = c.get("mlmd").unwrap();
    assert_eq!(mlmd.dst_revision, Some(Revision::Error));
    assert_eq!(mlmd.channel_change, ChangeMarker::Added);

    assert_eq!(c.changed_count, 4);
    assert!(!report.downgrade);
}

#[test]
fn test_compare_against_self() {
    let request = PlanRequest::from_inputs(&[fixture("local-1.7.yaml")], Some("self")).unwrap();
    assert_eq!(
        request,
        PlanRequest::Compare {
            source: fixture("local-1.7.yaml"),
            target: BundleRef::Remote(TargetVersion::Inferred),
        }
    );

    let report = compare(request, &charmhub());
    assert_eq!(report.target_version, "1.7/stable");

    let c = &report.classification;
    assert_eq!(c.changed_count, 1);
    assert_eq!(c.get("jupyter-ui").unwrap().revision_change, ChangeMarker::Upgrade);
    assert_eq!(c.get(ANCHOR).unwrap().revision_change, ChangeMarker::None);
    assert!(c.removed_components.is_empty());
    assert!(!report.downgrade);
}

#[test]
fn test_compare_without_juju() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.7.yaml")], Some("1.8/stable")).unwrap();
    let report = compare(request, &TableResolver::unavailable());
    let c = &report.classification;

    assert!(c
        .records
        .iter()
        .all(|r| r.dst_revision == Some(Revision::Unavailable)));
    let dashboard = c.get(ANCHOR).unwrap();
    assert_eq!(dashboard.channel_change, ChangeMarker::Upgrade);
    assert_eq!(dashboard.revision_change, ChangeMarker::None);
    // Release went up and the revision fallback has nothing to compare
    assert!(!report.downgrade);
}

#[test]
fn test_compare_with_other_anchor() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.8.yaml"), fixture("local-1.7.yaml")], None)
            .unwrap();
    let resolver = charmhub();
    let planner = Planner::new("istio-pilot", DOCS, &FixtureFetcher, &resolver);
    match planner.execute(&request).unwrap() {
        Outcome::Comparison(report) => {
            assert_eq!(report.source_version, "1.17/stable");
            assert!(report.downgrade);
        }
        other => panic!("Expected a comparison, got {:?}", other),
    }
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_unpublished_release() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.7.yaml")], Some("9.9/edge")).unwrap();
    assert!(matches!(
        run(request, &charmhub()),
        Err(PlannerError::RemoteFetch { .. })
    ));
}

#[test]
fn test_malformed_local_bundle() {
    let request = PlanRequest::View(BundleRef::Local(fixture("no-applications.yaml")));
    assert!(matches!(
        run(request, &charmhub()),
        Err(PlannerError::MalformedBundle(_))
    ));
}

#[test]
fn test_anchor_missing_from_bundle() {
    let request = PlanRequest::View(BundleRef::Local(fixture("local-1.7.yaml")));
    let resolver = charmhub();
    let planner = Planner::new("mlmd", DOCS, &FixtureFetcher, &resolver);
    assert!(matches!(
        planner.execute(&request),
        Err(PlannerError::AnchorNotFound(name)) if name == "mlmd"
    ));
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_added_component_example() {
    let source = [("a", VersionDescriptor::new("1.7/stable", Revision::Number(5)))]
        .into_iter()
        .collect();
    let target = [
        ("a", VersionDescriptor::new("1.7/stable", Revision::Number(5))),
        ("b", VersionDescriptor::new("1.7/edge", Revision::Number(1))),
    ]
    .into_iter()
    .collect();

    let c = classify(&source, &target);
    let a = c.get("a").unwrap();
    assert!(!a.is_changed());
    let b = c.get("b").unwrap();
    assert_eq!(b.channel_change, ChangeMarker::Added);
    assert_eq!(b.revision_change, ChangeMarker::Added);
    assert_eq!(c.changed_count, 1);
    assert!(c.removed_components.is_empty());
}

#[test]
fn test_comparison_written_as_csv() {
    let request =
        PlanRequest::from_inputs(&[fixture("local-1.7.yaml"), fixture("local-1.8.yaml")], None)
            .unwrap();
    let report = compare(request, &charmhub());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    let body = render_classification(&report.classification, OutputFormat::Csv).unwrap();
    write_output(&body, Some(&path)).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Charm,Src Channel,S,Dst Channel,Src Rev,S,Dst Rev"
    );
    assert_eq!(lines.count(), 4);
}
