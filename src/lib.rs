//! Kubeflow Upgrade Planner
//!
//! Compares juju bundles for a Kubeflow deployment and reports which charms
//! would change when moving to another bundle or to a published release.
//!
//! ## Features
//!
//! - **Bundle Views**: Channel and revision of every charm in a bundle
//! - **Upgrade Flags**: Per-charm channel and revision changes between bundles
//! - **Downgrade Detection**: Anchor-based check for moving backwards
//! - **Revision Lookup**: Revisions of published bundles resolved through charmhub
//! - **Multiple Formats**: Table, YAML, JSON and CSV output
//!
//! ## Flow
//!
//! ```text
//! bundle.yaml ─┐
//!              ├─ normalize ─ Bundle ─┐
//! release URL ─┘   (+ charmhub)       ├─ classify ─ is_downgrade ─ render
//!                                     │
//!              source Bundle ─────────┘
//! ```

pub mod bundle;
pub mod config;
pub mod diff;
pub mod downgrade;
pub mod error;
pub mod manifest;
pub mod planner;
pub mod render;
pub mod resolver;
pub mod version;

pub use bundle::{normalize, Bundle, RevisionSource};
pub use config::{OutputFormat, PlannerConfig};
pub use diff::{classify, ChangeMarker, Classification, ClassificationRecord};
pub use downgrade::is_downgrade;
pub use error::{PlannerError, Result, Side};
pub use manifest::{HttpFetcher, ManifestFetcher, ReleaseChannel};
pub use planner::{BundleRef, ComparisonReport, Outcome, PlanRequest, Planner, TargetVersion};
pub use resolver::{JujuResolver, RevisionResolver};
pub use version::{parse_mode, split_channel, ChannelMode, Revision, VersionDescriptor};
