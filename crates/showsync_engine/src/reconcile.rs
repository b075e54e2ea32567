//! Reconciliation of the remote changed-set against the local registry.

use crate::registry::TrackedShow;
use showsync_protocol::{Provider, SeriesId};
use std::collections::HashSet;

/// Returns true if the show corresponds to a remotely reported change.
///
/// A show matches only when both its identifier is in the changed-set and
/// its provider is the feed's provider; identifiers from other providers
/// never match, even when they collide numerically.
#[must_use]
pub fn is_affected(show: &TrackedShow, changed: &HashSet<SeriesId>, provider: Provider) -> bool {
    show.provider == provider && changed.contains(&show.series_id)
}

/// Returns the shows that require an update, in registry order.
///
/// Pure: no side effects, and no ordering is imposed beyond the relative
/// order the shows were supplied in.
pub fn affected<'a, I>(
    changed: &HashSet<SeriesId>,
    shows: I,
    provider: Provider,
) -> Vec<TrackedShow>
where
    I: IntoIterator<Item = &'a TrackedShow>,
{
    shows
        .into_iter()
        .filter(|show| is_affected(show, changed, provider))
        .cloned()
        .collect()
}
