//! Version descriptors: channels, modes and revisions

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{PlannerError, Result};

/// Revision of a single application.
///
/// Only [`Revision::Number`] takes part in numeric comparisons. The other
/// variants record why no number is available and never order against one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// A real revision number
    Number(u64),
    /// The bundle did not declare a revision
    NotFound,
    /// The resolver ran but could not produce a revision for this channel
    Error,
    /// The resolver tool is not installed on this host
    Unavailable,
    /// Waiting for the resolver
    Pending,
}

impl Revision {
    /// The revision number, if this is a real revision
    pub fn number(&self) -> Option<u64> {
        match self {
            Revision::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Number(n) => write!(f, "{}", n),
            Revision::NotFound => write!(f, "Not found"),
            Revision::Error => write!(f, "Error"),
            Revision::Unavailable => write!(f, "Unavailable"),
            Revision::Pending => write!(f, "Pending"),
        }
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Revision::Number(n) => serializer.serialize_u64(*n),
            other => serializer.collect_str(other),
        }
    }
}

/// Risk level half of a channel, e.g. the `stable` in `1.7/stable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Beta,
    Stable,
    Edge,
}

impl ChannelMode {
    /// Fixed ordering used for downgrade checks: beta < stable < edge
    pub fn rank(&self) -> u8 {
        match self {
            ChannelMode::Beta => 0,
            ChannelMode::Stable => 1,
            ChannelMode::Edge => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Beta => "beta",
            ChannelMode::Stable => "stable",
            ChannelMode::Edge => "edge",
        }
    }
}

impl FromStr for ChannelMode {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "beta" => Ok(ChannelMode::Beta),
            "stable" => Ok(ChannelMode::Stable),
            "edge" => Ok(ChannelMode::Edge),
            other => Err(PlannerError::malformed_channel(
                s,
                format!("unknown mode '{}', expected beta, stable or edge", other),
            )),
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `<release>/<mode>` and parse the release, leaving the mode as text.
///
/// Any risk level is accepted here; only [`parse_mode`] restricts it.
pub fn split_channel(channel: &str) -> Result<(f64, &str)> {
    let parts: Vec<&str> = channel.split('/').collect();
    if parts.len() != 2 {
        return Err(PlannerError::malformed_channel(
            channel,
            "expected exactly two '/'-separated parts",
        ));
    }

    let not_numeric =
        || PlannerError::malformed_channel(channel, format!("release '{}' is not numeric", parts[0]));
    let release: f64 = parts[0].trim().parse().map_err(|_| not_numeric())?;
    if !release.is_finite() {
        return Err(not_numeric());
    }

    Ok((release, parts[1]))
}

/// Parse the mode half of `channel` into a ranked [`ChannelMode`]
pub fn parse_mode(channel: &str, mode: &str) -> Result<ChannelMode> {
    mode.parse::<ChannelMode>().map_err(|_| {
        PlannerError::malformed_channel(
            channel,
            format!("unknown mode '{}', expected beta, stable or edge", mode),
        )
    })
}

/// What a bundle pins an application to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDescriptor {
    /// Channel string, e.g. `1.7/stable`
    pub channel: String,
    pub revision: Revision,
    /// Charm name used to look the revision up, set only for bundles built
    /// for remote resolution
    #[serde(skip)]
    pub component_identity: Option<String>,
}

impl VersionDescriptor {
    pub fn new(channel: impl Into<String>, revision: Revision) -> Self {
        Self {
            channel: channel.into(),
            revision,
            component_identity: None,
        }
    }

    /// A descriptor whose revision will come from the resolver
    pub fn pending(channel: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            revision: Revision::Pending,
            component_identity: Some(identity.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parsing() {
        let (release, mode) = split_channel("1.7/stable").unwrap();
        assert_eq!(release, 1.7);
        assert_eq!(parse_mode("1.7/stable", mode).unwrap(), ChannelMode::Stable);
    }

    #[test]
    fn test_channel_requires_two_parts() {
        assert!(matches!(
            split_channel("1.7"),
            Err(PlannerError::MalformedChannel { .. })
        ));
        assert!(matches!(
            split_channel("1.7/stable/extra"),
            Err(PlannerError::MalformedChannel { .. })
        ));
    }

    #[test]
    fn test_channel_release_must_be_numeric() {
        assert!(split_channel("latest/edge").is_err());
        assert!(split_channel("nan/edge").is_err());
    }

    #[test]
    fn test_split_channel_keeps_any_mode() {
        assert_eq!(split_channel("1.8/candidate").unwrap(), (1.8, "candidate"));
        assert!(matches!(
            parse_mode("1.8/candidate", "candidate"),
            Err(PlannerError::MalformedChannel { channel, .. }) if channel == "1.8/candidate"
        ));
    }

    #[test]
    fn test_mode_ranking() {
        assert!(ChannelMode::Beta.rank() < ChannelMode::Stable.rank());
        assert!(ChannelMode::Stable.rank() < ChannelMode::Edge.rank());
    }

    #[test]
    fn test_revision_display() {
        assert_eq!(Revision::Number(42).to_string(), "42");
        assert_eq!(Revision::NotFound.to_string(), "Not found");
        assert_eq!(Revision::Error.to_string(), "Error");
        assert_eq!(Revision::Unavailable.to_string(), "Unavailable");
    }

    #[test]
    fn test_revision_serialization() {
        assert_eq!(serde_json::to_string(&Revision::Number(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&Revision::Error).unwrap(), "\"Error\"");
        assert_eq!(
            serde_json::to_string(&Revision::NotFound).unwrap(),
            "\"Not found\""
        );
    }
}
