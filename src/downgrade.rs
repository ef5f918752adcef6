//! Downgrade detection
//!
//! One anchor charm stands for the whole deployment. Its channel decides
//! whether moving from the source bundle to the target goes backwards.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::bundle::Bundle;
use crate::error::{PlannerError, Result, Side};
use crate::version::{parse_mode, split_channel, VersionDescriptor};

/// Decide whether going from `source` to `target` is a downgrade.
///
/// Rules, first match wins:
/// 1. a lower target release is a downgrade;
/// 2. on the same release, a lower mode rank (beta < stable < edge) is a
///    downgrade;
/// 3. on a higher target release, a lower target revision is a downgrade.
///
/// Rule 3 only runs when the release went up, so a mode drop on a higher
/// release is not flagged, and a revision drop on the same release is not
/// either. Modes outside beta, stable and edge are only rejected when rule 2
/// needs to rank them.
pub fn is_downgrade(source: &Bundle, target: &Bundle, anchor: &str) -> Result<bool> {
    let src = anchor_of(source, anchor, Side::Source)?;
    let dst = anchor_of(target, anchor, Side::Target)?;

    let (src_release, src_mode) = split_channel(&src.channel)?;
    let (dst_release, dst_mode) = split_channel(&dst.channel)?;

    // Modes only matter on the same release
    let verdict = match dst_release.partial_cmp(&src_release) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => {
            parse_mode(&dst.channel, dst_mode)?.rank() < parse_mode(&src.channel, src_mode)?.rank()
        }
        _ => match (src.revision.number(), dst.revision.number()) {
            (Some(from), Some(to)) => to < from,
            _ => {
                warn!(
                    anchor,
                    src_revision = %src.revision,
                    dst_revision = %dst.revision,
                    "cannot compare anchor revisions"
                );
                false
            }
        },
    };

    debug!(
        anchor,
        src = %src.channel,
        dst = %dst.channel,
        downgrade = verdict,
        "downgrade check"
    );
    Ok(verdict)
}

fn anchor_of<'a>(bundle: &'a Bundle, anchor: &str, side: Side) -> Result<&'a VersionDescriptor> {
    bundle.get(anchor).ok_or_else(|| PlannerError::MissingAnchor {
        anchor: anchor.to_string(),
        side,
    })
}
