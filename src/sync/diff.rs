//! Diff computation between a freshly parsed playlist and the stored
//! channel set of one source. Pure: no fetching, no store mutation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::ingestor::m3u_parser::Playlist;
use crate::models::Channel;
use crate::sync::identity::{channel_key, stable_url};

const SAMPLE_LEN: usize = 5;

/// A fetched entry with no stored counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddedEntry {
    pub name: String,
    pub url: String,
    pub logo: String,
    pub tvg_id: String,
    pub category: String,
    pub key: String,
}

/// A fetched entry whose stored counterpart differs in name, logo or URL.
/// `prev_url` and `tvg_id` carry the *stored* channel's values so favorites
/// can be re-matched after the channel itself is patched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdatedEntry {
    pub id: Uuid,
    pub name: String,
    pub logo: String,
    pub url: String,
    pub key: String,
    pub prev_url: String,
    pub tvg_id: String,
}

/// A stored channel absent from the fetched playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovedEntry {
    pub id: Uuid,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DiffCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// First few names per class, for compact UI previews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffSample {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDiff {
    pub added: Vec<AddedEntry>,
    pub updated: Vec<UpdatedEntry>,
    pub removed: Vec<RemovedEntry>,
    pub counts: DiffCounts,
    pub sample: DiffSample,
}

impl SourceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Classify every fetched entry against the stored channels of one source.
///
/// Stored channels are indexed by identity key, first occurrence winning on
/// a duplicate. The fetched playlist is walked in
/// order; repeated keys within it are collapsed to their first occurrence.
/// Entries matching an indexed channel with identical name (trimmed), logo
/// and URL are unchanged and dropped. Indexed channels whose key never
/// appears in the playlist are removed.
pub fn compute_diff(existing: &[Channel], playlist: &Playlist) -> SourceDiff {
    let mut key_order: Vec<String> = Vec::with_capacity(existing.len());
    let mut by_key: HashMap<String, &Channel> = HashMap::with_capacity(existing.len());
    for channel in existing {
        let key = channel_key(&channel.tvg_id, &channel.url);
        if !by_key.contains_key(&key) {
            key_order.push(key.clone());
            by_key.insert(key, channel);
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut added = Vec::new();
    let mut updated = Vec::new();

    for category in &playlist.categories {
        for entry in &category.channels {
            let key = channel_key(&entry.tvg_id, &entry.url);
            if !seen.insert(key.clone()) {
                continue;
            }

            match by_key.get(&key) {
                None => added.push(AddedEntry {
                    name: entry.name.clone(),
                    url: entry.url.clone(),
                    logo: entry.logo.clone(),
                    tvg_id: entry.tvg_id.clone(),
                    category: category.name.clone(),
                    key,
                }),
                Some(channel) => {
                    let name_changed = channel.name.trim() != entry.name.trim();
                    let logo_changed = channel.logo != entry.logo;
                    // Query-only differences (rotating tokens, timestamps)
                    // do not count as a URL change.
                    let url_changed = stable_url(&channel.url) != stable_url(&entry.url);
                    if name_changed || logo_changed || url_changed {
                        updated.push(UpdatedEntry {
                            id: channel.id,
                            name: entry.name.clone(),
                            logo: entry.logo.clone(),
                            url: entry.url.clone(),
                            key,
                            prev_url: channel.url.clone(),
                            tvg_id: channel.tvg_id.clone(),
                        });
                    }
                }
            }
        }
    }

    let removed: Vec<RemovedEntry> = key_order
        .iter()
        .filter(|key| !seen.contains(*key))
        .map(|key| {
            let channel = by_key[key];
            RemovedEntry {
                id: channel.id,
                key: key.clone(),
                name: channel.name.clone(),
            }
        })
        .collect();

    let counts = DiffCounts {
        added: added.len(),
        updated: updated.len(),
        removed: removed.len(),
    };
    let sample = DiffSample {
        added: sample_names(added.iter().map(|a| a.name.as_str())),
        updated: sample_names(updated.iter().map(|u| u.name.as_str())),
        removed: sample_names(removed.iter().map(|r| r.name.as_str())),
    };

    SourceDiff {
        added,
        updated,
        removed,
        counts,
        sample,
    }
}

fn sample_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names.take(SAMPLE_LEN).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestor::m3u_parser::parse_m3u;
    use chrono::Utc;

    fn channel(tvg_id: &str, url: &str, name: &str) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: url.to_string(),
            logo: String::new(),
            tvg_id: tvg_id.to_string(),
            source_id: Uuid::new_v4(),
            group_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_key_within_playlist_collapses_to_first() {
        let playlist = parse_m3u(
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"BBC1\" group-title=\"News\",BBC One\n\
             http://example.com/bbc1.m3u8\n\
             #EXTINF:-1 tvg-id=\"BBC1\" group-title=\"News\",BBC One HD\n\
             http://example.com/bbc1-hd.m3u8\n",
        );

        let diff = compute_diff(&[], &playlist);
        assert_eq!(
            diff.counts,
            DiffCounts {
                added: 1,
                updated: 0,
                removed: 0
            }
        );
        assert_eq!(diff.added[0].key, "tvg:BBC1");
        assert_eq!(diff.added[0].name, "BBC One");
    }

    #[test]
    fn query_only_url_rotation_is_unchanged() {
        let existing = vec![channel("CNN", "http://a.com/cnn.m3u8?tok=123", "CNN")];
        let playlist = parse_m3u(
            "#EXTINF:-1 tvg-id=\"CNN\",CNN\n\
             http://a.com/cnn.m3u8?tok=999\n",
        );

        let diff = compute_diff(&existing, &playlist);
        // Key and name match and the URLs differ only past the `?`, so the
        // entry counts as unchanged even though the raw strings differ.
        assert!(diff.is_empty());
    }

    #[test]
    fn identical_entry_is_dropped_silently() {
        let existing = vec![channel("CNN", "http://a.com/cnn.m3u8", "CNN")];
        let playlist = parse_m3u(
            "#EXTINF:-1 tvg-id=\"CNN\",CNN\n\
             http://a.com/cnn.m3u8\n",
        );

        let diff = compute_diff(&existing, &playlist);
        assert!(diff.is_empty());
    }

    #[test]
    fn name_comparison_ignores_surrounding_whitespace() {
        let existing = vec![channel("CNN", "http://a.com/cnn.m3u8", "CNN ")];
        let playlist = parse_m3u(
            "#EXTINF:-1 tvg-id=\"CNN\",CNN\n\
             http://a.com/cnn.m3u8\n",
        );

        assert!(compute_diff(&existing, &playlist).is_empty());
    }

    #[test]
    fn missing_channel_is_removed() {
        let existing = vec![channel("", "http://a.com/x.m3u8", "X")];
        let diff = compute_diff(&existing, &parse_m3u(""));

        assert_eq!(diff.counts.removed, 1);
        assert_eq!(diff.removed[0].key, "url:http://a.com/x.m3u8");
        assert_eq!(diff.removed[0].name, "X");
    }

    #[test]
    fn updated_entry_carries_stored_tvg_id_and_prev_url() {
        let mut stored = channel("NEWS9", "http://a.com/n9.m3u8", "News 9");
        stored.logo = "http://l/old.png".to_string();
        let playlist = parse_m3u(
            "#EXTINF:-1 tvg-id=\"NEWS9\" tvg-logo=\"http://l/new.png\",News Nine\n\
             http://b.com/n9.m3u8\n",
        );

        let diff = compute_diff(&[stored.clone()], &playlist);
        assert_eq!(diff.counts.updated, 1);
        let update = &diff.updated[0];
        assert_eq!(update.id, stored.id);
        assert_eq!(update.tvg_id, "NEWS9");
        assert_eq!(update.prev_url, "http://a.com/n9.m3u8");
        assert_eq!(update.url, "http://b.com/n9.m3u8");
        assert_eq!(update.logo, "http://l/new.png");
    }

    #[test]
    fn duplicate_stored_keys_first_indexed_wins() {
        let first = channel("DUP", "http://a.com/1.m3u8", "First");
        let second = channel("DUP", "http://a.com/2.m3u8", "Second");
        let diff = compute_diff(&[first.clone(), second], &parse_m3u(""));

        // Only the first-indexed channel is visible to the diff.
        assert_eq!(diff.counts.removed, 1);
        assert_eq!(diff.removed[0].id, first.id);
    }

    #[test]
    fn sample_is_capped_at_five_names() {
        let m3u: String = (0..8)
            .map(|i| {
                format!(
                    "#EXTINF:-1 tvg-id=\"ch{i}\",Channel {i}\nhttp://a.com/{i}.m3u8\n"
                )
            })
            .collect();
        let diff = compute_diff(&[], &parse_m3u(&m3u));

        assert_eq!(diff.counts.added, 8);
        assert_eq!(diff.sample.added.len(), 5);
        assert_eq!(diff.sample.added[0], "Channel 0");
    }
}
