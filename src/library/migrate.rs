//! One-shot upgrade from the legacy single-playlist layout.
//!
//! Early versions stored one parsed playlist under `current_playlist` plus
//! its file path under `playlist_path`. The upgrade synthesizes a single
//! file source, one group per legacy category, fresh channel rows, and
//! re-points favorites at the new channels by URL. It runs at most once,
//! guarded by the `multi_source_migrated` flag, and never touches a library
//! that already has sources, groups or channels.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Library, CHANNELS, FAVORITES, GROUPS, SOURCES};
use crate::errors::AppResult;
use crate::models::{Channel, Favorite, Group, ImportConfig, Source, SourceKind};

const LEGACY_PLAYLIST: &str = "current_playlist";
const LEGACY_PATH: &str = "playlist_path";
const MIGRATED_FLAG: &str = "multi_source_migrated";

#[derive(Debug, Clone, Default, serde::Serialize, Deserialize)]
pub struct MigrationReport {
    pub migrated: bool,
    pub source_id: Option<Uuid>,
    pub groups: usize,
    pub channels: usize,
}

#[derive(Debug, Deserialize)]
struct LegacyPlaylist {
    categories: HashMap<String, Vec<LegacyEntry>>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    #[serde(default)]
    name: String,
    url: String,
    #[serde(default)]
    logo: String,
    #[serde(default, alias = "tvgId")]
    tvg_id: String,
}

impl Library {
    /// Upgrade legacy single-playlist data if present. Safe to call on
    /// every startup.
    pub fn migrate_if_needed(&self) -> AppResult<MigrationReport> {
        let store = self.store();

        let already = store
            .get(MIGRATED_FLAG)?
            .map(|s| s.value == Value::Bool(true))
            .unwrap_or(false);
        if already {
            return Ok(MigrationReport::default());
        }

        let legacy = match store.get(LEGACY_PLAYLIST)? {
            Some(snapshot) => match serde_json::from_value::<LegacyPlaylist>(snapshot.value) {
                Ok(playlist) => playlist,
                Err(e) => {
                    warn!("Legacy playlist is unreadable, skipping migration: {}", e);
                    return Ok(MigrationReport::default());
                }
            },
            None => return Ok(MigrationReport::default()),
        };

        let (sources_rev, sources) = self.read_list::<Source>(SOURCES)?;
        let (groups_rev, groups) = self.read_list::<Group>(GROUPS)?;
        let (channels_rev, channels) = self.read_list::<Channel>(CHANNELS)?;
        if !sources.is_empty() || !groups.is_empty() || !channels.is_empty() {
            // Already on the multi-source layout; just mark and move on.
            store.put(MIGRATED_FLAG, Value::Bool(true), None)?;
            return Ok(MigrationReport::default());
        }

        let playlist_path = store
            .get(LEGACY_PATH)?
            .and_then(|s| s.value.as_str().map(str::to_string))
            .unwrap_or_default();

        let source_id = Uuid::new_v4();
        let source = Source {
            id: source_id,
            name: playlist_path
                .rsplit('/')
                .next()
                .filter(|n| !n.is_empty())
                .map(|n| format!("File: {}", n))
                .unwrap_or_else(|| "Legacy Playlist".to_string()),
            kind: SourceKind::File {
                path: playlist_path,
            },
            enabled: true,
            import_config: ImportConfig::CreateFromCategories,
            last_sync: Some(Utc::now()),
            auto_sync_on_launch: false,
        };

        let now = Utc::now();
        let mut new_groups = Vec::new();
        let mut new_channels = Vec::new();
        let mut by_url: HashMap<String, Channel> = HashMap::new();

        for (order, (category, entries)) in legacy.categories.into_iter().enumerate() {
            let group = Group {
                id: Uuid::new_v4(),
                name: category,
                order: order as i32,
            };
            for entry in entries {
                let channel = Channel {
                    id: Uuid::new_v4(),
                    name: if entry.name.is_empty() {
                        "Channel".to_string()
                    } else {
                        entry.name
                    },
                    url: entry.url,
                    logo: entry.logo,
                    tvg_id: entry.tvg_id,
                    source_id,
                    group_id: Some(group.id),
                    created_at: now,
                    updated_at: now,
                };
                if !channel.url.is_empty() {
                    by_url.insert(channel.url.clone(), channel.clone());
                }
                new_channels.push(channel);
            }
            new_groups.push(group);
        }

        // Re-point favorites at the migrated channels; favorites whose URL
        // did not survive are dropped.
        let (fav_rev, old_favorites) = self.read_list::<Favorite>(FAVORITES)?;
        if !old_favorites.is_empty() {
            let new_favorites: Vec<Favorite> = old_favorites
                .iter()
                .filter_map(|f| by_url.get(&f.url))
                .map(Favorite::from_channel)
                .collect();
            self.write_list(FAVORITES, fav_rev, &new_favorites)?;
        }

        let report = MigrationReport {
            migrated: true,
            source_id: Some(source_id),
            groups: new_groups.len(),
            channels: new_channels.len(),
        };

        self.write_list(SOURCES, sources_rev, &[source])?;
        self.write_list(GROUPS, groups_rev, &new_groups)?;
        self.write_list(CHANNELS, channels_rev, &new_channels)?;
        store.put(MIGRATED_FLAG, Value::Bool(true), None)?;
        store.delete(LEGACY_PLAYLIST)?;
        store.delete(LEGACY_PATH)?;

        info!(
            "Migrated legacy playlist: {} group(s), {} channel(s)",
            report.groups, report.channels
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_value() -> Value {
        json!({
            "categories": {
                "News": [
                    {"name": "BBC One", "url": "http://a.com/bbc1.m3u8", "logo": "", "tvgId": "BBC1"},
                    {"name": "CNN", "url": "http://a.com/cnn.m3u8"}
                ]
            }
        })
    }

    #[test]
    fn migrates_legacy_playlist_once() {
        let library = Library::in_memory();
        let store = library.store();
        store.put(LEGACY_PLAYLIST, legacy_value(), None).unwrap();
        store
            .put(LEGACY_PATH, json!("/home/u/lists/tv.m3u"), None)
            .unwrap();

        let report = library.migrate_if_needed().unwrap();
        assert!(report.migrated);
        assert_eq!(report.groups, 1);
        assert_eq!(report.channels, 2);

        let sources = library.list_sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "File: tv.m3u");
        assert_eq!(sources[0].import_config, ImportConfig::CreateFromCategories);

        let channels = library.channels_for_source(sources[0].id).unwrap();
        assert_eq!(channels.len(), 2);
        assert!(channels.iter().all(|c| c.group_id.is_some()));

        // Legacy keys are gone, flag is set, second run is a no-op.
        assert!(!store.has(LEGACY_PLAYLIST).unwrap());
        assert!(!store.has(LEGACY_PATH).unwrap());
        let second = library.migrate_if_needed().unwrap();
        assert!(!second.migrated);
    }

    #[test]
    fn favorites_survive_by_url() {
        let library = Library::in_memory();
        let store = library.store();
        store.put(LEGACY_PLAYLIST, legacy_value(), None).unwrap();
        store
            .put(
                FAVORITES,
                json!([
                    {"id": Uuid::new_v4(), "name": "old name", "url": "http://a.com/bbc1.m3u8",
                     "logo": "", "tvg_id": "", "source_id": Uuid::new_v4(), "group_id": null},
                    {"id": Uuid::new_v4(), "name": "stale", "url": "http://gone.com/x.m3u8",
                     "logo": "", "tvg_id": "", "source_id": Uuid::new_v4(), "group_id": null}
                ]),
                None,
            )
            .unwrap();

        library.migrate_if_needed().unwrap();

        let favorites = library.list_favorites().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].name, "BBC One");
        let channels = library
            .list_channels(&crate::models::ChannelFilter::default())
            .unwrap();
        let bbc = channels.iter().find(|c| c.tvg_id == "BBC1").unwrap();
        assert_eq!(favorites[0].id, bbc.id);
    }

    #[test]
    fn populated_library_only_sets_the_flag() {
        let library = Library::in_memory();
        let store = library.store();
        store.put(LEGACY_PLAYLIST, legacy_value(), None).unwrap();
        library.create_group("Existing").unwrap();

        let report = library.migrate_if_needed().unwrap();
        assert!(!report.migrated);
        assert_eq!(library.list_groups().unwrap().len(), 1);
        assert!(store.has(LEGACY_PLAYLIST).unwrap());
    }
}
