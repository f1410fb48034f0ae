//! Channel CRUD: listing with filters, batch insert, moves and bulk
//! deletion with favorite cleanup and empty-group pruning.

use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::{Library, CHANNELS};
use crate::errors::AppResult;
use crate::models::{Channel, ChannelFilter};

/// Channel payload for batch inserts; ids and timestamps are assigned at
/// insert time.
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub url: String,
    pub logo: String,
    pub tvg_id: String,
    pub group_id: Option<Uuid>,
}

impl Library {
    pub fn list_channels(&self, filter: &ChannelFilter) -> AppResult<Vec<Channel>> {
        let (_, channels) = self.read_list::<Channel>(CHANNELS)?;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        Ok(channels
            .into_iter()
            .filter(|c| filter.source_id.map_or(true, |id| c.source_id == id))
            .filter(|c| filter.group_id.map_or(true, |id| c.group_id == Some(id)))
            .filter(|c| {
                search
                    .as_ref()
                    .map_or(true, |s| c.name.to_lowercase().contains(s))
            })
            .collect())
    }

    pub fn channels_for_source(&self, source_id: Uuid) -> AppResult<Vec<Channel>> {
        self.list_channels(&ChannelFilter {
            source_id: Some(source_id),
            ..Default::default()
        })
    }

    /// Append a batch of channels for one source, assigning fresh ids and
    /// timestamps. Returns the number inserted.
    pub fn insert_channels(&self, source_id: Uuid, items: Vec<NewChannel>) -> AppResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let inserted = items.len();
        self.update_list::<Channel, _, _>(CHANNELS, |channels| {
            channels.extend(items.iter().map(|item| Channel {
                id: Uuid::new_v4(),
                name: if item.name.is_empty() {
                    "Channel".to_string()
                } else {
                    item.name.clone()
                },
                url: item.url.clone(),
                logo: item.logo.clone(),
                tvg_id: item.tvg_id.clone(),
                source_id,
                group_id: item.group_id,
                created_at: now,
                updated_at: now,
            }));
        })?;
        debug!("Inserted {} channel(s) for source {}", inserted, source_id);
        Ok(inserted)
    }

    /// Move channels into a group (or out of any group with `None`).
    pub fn move_channels(&self, channel_ids: &[Uuid], target: Option<Uuid>) -> AppResult<()> {
        let ids: HashSet<Uuid> = channel_ids.iter().copied().collect();
        let now = Utc::now();
        self.update_list::<Channel, _, _>(CHANNELS, |channels| {
            for channel in channels.iter_mut() {
                if ids.contains(&channel.id) {
                    channel.group_id = target;
                    channel.updated_at = now;
                }
            }
        })?;
        Ok(())
    }

    /// Delete channels by id. Favorites pointing at the deleted URLs are
    /// removed, and groups these deletions emptied are pruned.
    pub fn delete_channels(&self, channel_ids: &[Uuid]) -> AppResult<usize> {
        let ids: HashSet<Uuid> = channel_ids.iter().copied().collect();
        let (removed_urls, touched_groups, deleted) =
            self.update_list::<Channel, _, _>(CHANNELS, |channels| {
                let doomed: Vec<&Channel> =
                    channels.iter().filter(|c| ids.contains(&c.id)).collect();
                let urls = doomed
                    .iter()
                    .filter(|c| !c.url.is_empty())
                    .map(|c| c.url.clone())
                    .collect::<HashSet<_>>();
                let groups = doomed.iter().filter_map(|c| c.group_id).collect::<HashSet<_>>();
                let count = doomed.len();
                channels.retain(|c| !ids.contains(&c.id));
                (urls, groups, count)
            })?;

        self.cleanup_favorites_by_urls(&removed_urls)?;
        self.prune_empty_groups(&touched_groups)?;
        Ok(deleted)
    }
}
