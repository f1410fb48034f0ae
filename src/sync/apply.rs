//! Commit a computed diff into the library.
//!
//! Step order matters: updates run first so favorite retargeting sees the
//! pre-removal state, removals run before additions to avoid transient
//! duplicate keys, and additions run last so group resolution can reuse
//! groups created within the same pass. There is no cross-collection
//! transaction; a rerun recomputes a fresh diff against whatever state was
//! reached, which converges on its own.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::library::channels::NewChannel;
use crate::library::{Library, CHANNELS, FAVORITES};
use crate::models::{Channel, Favorite, ImportConfig, Source};
use crate::sync::diff::{DiffCounts, SourceDiff, UpdatedEntry};
use crate::sync::groups::{resolve_group_id, GroupCache};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub success: bool,
    pub counts: DiffCounts,
}

/// Apply `diff` to the channels of `source`, cascading into favorites and
/// groups as required.
pub fn apply_diff(
    library: &Library,
    source: &Source,
    import_config: &ImportConfig,
    diff: &SourceDiff,
) -> AppResult<ApplyOutcome> {
    if !diff.updated.is_empty() {
        patch_channels(library, &diff.updated)?;
        retarget_favorites(library, &diff.updated)?;
    }

    if !diff.removed.is_empty() {
        let remove_ids: HashSet<Uuid> = diff.removed.iter().map(|r| r.id).collect();
        let (removed_urls, touched_groups) =
            library.update_list::<Channel, _, _>(CHANNELS, |channels| {
                let urls = channels
                    .iter()
                    .filter(|c| remove_ids.contains(&c.id) && !c.url.is_empty())
                    .map(|c| c.url.clone())
                    .collect::<HashSet<_>>();
                let groups = channels
                    .iter()
                    .filter(|c| remove_ids.contains(&c.id))
                    .filter_map(|c| c.group_id)
                    .collect::<HashSet<_>>();
                channels.retain(|c| !remove_ids.contains(&c.id));
                (urls, groups)
            })?;
        library.cleanup_favorites_by_urls(&removed_urls)?;
        library.prune_empty_groups(&touched_groups)?;
    }

    if !diff.added.is_empty() {
        let mut cache = GroupCache::new();
        let mut prepared = Vec::with_capacity(diff.added.len());
        for entry in &diff.added {
            let group_id = resolve_group_id(library, import_config, &entry.category, &mut cache)?;
            prepared.push(NewChannel {
                name: entry.name.clone(),
                url: entry.url.clone(),
                logo: entry.logo.clone(),
                tvg_id: entry.tvg_id.clone(),
                group_id,
            });
        }
        library.insert_channels(source.id, prepared)?;
    }

    library.touch_last_sync(source.id)?;

    info!(
        "Applied diff for source '{}': +{} ~{} -{}",
        source.name, diff.counts.added, diff.counts.updated, diff.counts.removed
    );
    Ok(ApplyOutcome {
        success: true,
        counts: diff.counts,
    })
}

fn patch_channels(library: &Library, updates: &[UpdatedEntry]) -> AppResult<()> {
    let by_id: HashMap<Uuid, &UpdatedEntry> = updates.iter().map(|u| (u.id, u)).collect();
    let now = Utc::now();
    library.update_list::<Channel, _, _>(CHANNELS, |channels| {
        for channel in channels.iter_mut() {
            if let Some(update) = by_id.get(&channel.id) {
                channel.name = update.name.clone();
                channel.logo = update.logo.clone();
                if !update.url.is_empty() {
                    channel.url = update.url.clone();
                }
                channel.updated_at = now;
            }
        }
    })?;
    Ok(())
}

/// Patch favorites that track an updated channel: matched by tvg-id when
/// the favorite has one, else by the channel's previous URL. Favorites are
/// field-patched in place, never re-keyed, so the row survives URL
/// rotation.
fn retarget_favorites(library: &Library, updates: &[UpdatedEntry]) -> AppResult<()> {
    let by_tvg: HashMap<&str, &UpdatedEntry> = updates
        .iter()
        .filter(|u| !u.tvg_id.is_empty())
        .map(|u| (u.tvg_id.as_str(), u))
        .collect();
    let by_prev_url: HashMap<&str, &UpdatedEntry> = updates
        .iter()
        .filter(|u| !u.prev_url.is_empty())
        .map(|u| (u.prev_url.as_str(), u))
        .collect();

    library.update_list::<Favorite, _, _>(FAVORITES, |favorites| {
        for favorite in favorites.iter_mut() {
            let matched = if favorite.tvg_id.is_empty() {
                None
            } else {
                by_tvg.get(favorite.tvg_id.as_str()).copied()
            }
            .or_else(|| by_prev_url.get(favorite.url.as_str()).copied());

            if let Some(update) = matched {
                if !update.url.is_empty() {
                    favorite.url = update.url.clone();
                }
                if !update.name.is_empty() {
                    favorite.name = update.name.clone();
                }
                favorite.logo = update.logo.clone();
            }
        }
    })?;
    Ok(())
}
