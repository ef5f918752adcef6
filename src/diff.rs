//! Bundle diffing
//!
//! Aligns a source bundle with a target bundle and flags, per charm, whether
//! its channel or revision would change. The target decides which rows exist
//! and their order; charms only present in the source are listed separately.

use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use std::fmt;

use crate::bundle::Bundle;
use crate::version::Revision;

/// How one field of a charm changes between bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeMarker {
    #[default]
    None,
    /// The value moves to something newer (for channels: anything different)
    Upgrade,
    /// The charm only exists in the target
    Added,
}

impl ChangeMarker {
    pub fn is_change(&self) -> bool {
        !matches!(self, ChangeMarker::None)
    }

    /// Symbol shown in tables, `None` renders as an empty cell
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            ChangeMarker::None => None,
            ChangeMarker::Upgrade => Some("->"),
            ChangeMarker::Added => Some("+"),
        }
    }
}

impl fmt::Display for ChangeMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol().unwrap_or(""))
    }
}

impl Serialize for ChangeMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.symbol() {
            Some(symbol) => serializer.serialize_str(symbol),
            None => serializer.serialize_none(),
        }
    }
}

/// Comparison row for one charm
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRecord {
    pub component: String,
    pub src_channel: Option<String>,
    pub channel_change: ChangeMarker,
    pub dst_channel: Option<String>,
    pub src_revision: Option<Revision>,
    pub revision_change: ChangeMarker,
    pub dst_revision: Option<Revision>,
}

impl ClassificationRecord {
    /// Whether this charm needs any action
    pub fn is_changed(&self) -> bool {
        self.channel_change.is_change() || self.revision_change.is_change()
    }
}

// Field order matches the table columns; the charm name is the map key.
impl Serialize for ClassificationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ClassificationRecord", 6)?;
        s.serialize_field("src_channel", &self.src_channel)?;
        s.serialize_field("channel_upgrade", &self.channel_change)?;
        s.serialize_field("dst_channel", &self.dst_channel)?;
        s.serialize_field("src_revision", &self.src_revision)?;
        s.serialize_field("revision_upgrade", &self.revision_change)?;
        s.serialize_field("dst_revision", &self.dst_revision)?;
        s.end()
    }
}

/// Result of diffing two bundles
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    /// One record per charm in the target, in target order
    pub records: Vec<ClassificationRecord>,
    /// Number of records with a channel or revision change
    pub changed_count: usize,
    /// Charms in the source that the target no longer has
    pub removed_components: Vec<String>,
}

impl Classification {
    pub fn get(&self, component: &str) -> Option<&ClassificationRecord> {
        self.records.iter().find(|r| r.component == component)
    }
}

/// Serializes as a map of charm name to record
impl Serialize for Classification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.component, record)?;
        }
        map.end()
    }
}

/// Diff `source` against `target`
pub fn classify(source: &Bundle, target: &Bundle) -> Classification {
    let records: Vec<_> = target
        .iter()
        .map(|(name, dst)| {
            let Some(src) = source.get(name) else {
                return ClassificationRecord {
                    component: name.to_string(),
                    src_channel: None,
                    channel_change: ChangeMarker::Added,
                    dst_channel: Some(dst.channel.clone()),
                    src_revision: None,
                    revision_change: ChangeMarker::Added,
                    dst_revision: Some(dst.revision),
                };
            };

            let channel_change = if src.channel != dst.channel {
                ChangeMarker::Upgrade
            } else {
                ChangeMarker::None
            };

            // Sentinels on either side never compare against a number
            let revision_change = match (src.revision.number(), dst.revision.number()) {
                (Some(from), Some(to)) if to > from => ChangeMarker::Upgrade,
                _ => ChangeMarker::None,
            };

            ClassificationRecord {
                component: name.to_string(),
                src_channel: Some(src.channel.clone()),
                channel_change,
                dst_channel: Some(dst.channel.clone()),
                src_revision: Some(src.revision),
                revision_change,
                dst_revision: Some(dst.revision),
            }
        })
        .collect();

    let changed_count = records.iter().filter(|r| r.is_changed()).count();

    let removed_components = source
        .names()
        .filter(|name| !target.contains(name))
        .map(str::to_string)
        .collect();

    Classification {
        records,
        changed_count,
        removed_components,
    }
}
