//! Best-effort extended M3U parser.
//!
//! Third-party playlists are routinely sloppy, so the parser never fails:
//! malformed lines are skipped and whatever valid entries remain are
//! returned.

use std::collections::HashMap;
use tracing::debug;

/// One parsed playlist entry. Empty `logo`/`tvg_id` mean the attribute was
/// absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    pub name: String,
    pub url: String,
    pub logo: String,
    pub tvg_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistCategory {
    pub name: String,
    pub channels: Vec<ChannelEntry>,
}

/// Parsed playlist, grouped by category in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    pub categories: Vec<PlaylistCategory>,
}

impl Playlist {
    pub fn total_channels(&self) -> usize {
        self.categories.iter().map(|c| c.channels.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    fn push(&mut self, category: String, entry: ChannelEntry) {
        match self.categories.iter_mut().find(|c| c.name == category) {
            Some(bucket) => bucket.channels.push(entry),
            None => self.categories.push(PlaylistCategory {
                name: category,
                channels: vec![entry],
            }),
        }
    }
}

const FALLBACK_CATEGORY: &str = "Uncategorized";
const FALLBACK_NAME: &str = "Unknown Channel";

struct PendingEntry {
    name: String,
    category: String,
    logo: String,
    tvg_id: String,
}

/// Parse M3U content into categories of channel entries.
///
/// Recognized directives: `#EXTGRP:` (pending group for the next entry) and
/// `#EXTINF:` with `group-title`/`tvg-logo`/`tvg-id` attributes. An entry is
/// finalized by the next `http(s)://` line; an `#EXTINF` never followed by a
/// URL is dropped.
pub fn parse_m3u(content: &str) -> Playlist {
    let mut playlist = Playlist::default();
    let mut pending_group: Option<String> = None;
    let mut current: Option<PendingEntry> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(group) = line.strip_prefix("#EXTGRP:") {
            pending_group = Some(group.trim().to_string());
        } else if let Some(info) = line.strip_prefix("#EXTINF:") {
            current = Some(parse_extinf(info, pending_group.take()));
        } else if line.starts_with("http://") || line.starts_with("https://") {
            if let Some(entry) = current.take() {
                playlist.push(
                    entry.category,
                    ChannelEntry {
                        name: entry.name,
                        url: line.to_string(),
                        logo: entry.logo,
                        tvg_id: entry.tvg_id,
                    },
                );
            }
        }
    }

    debug!(
        categories = playlist.categories.len(),
        channels = playlist.total_channels(),
        "parsed playlist"
    );
    playlist
}

fn parse_extinf(info: &str, pending_group: Option<String>) -> PendingEntry {
    // Display name is everything after the last comma; attributes sit
    // between the duration and that comma.
    let (attr_part, name) = match info.rfind(',') {
        Some(pos) => (&info[..pos], info[pos + 1..].trim().to_string()),
        None => (info, FALLBACK_NAME.to_string()),
    };

    let mut attributes = parse_attributes(attr_part);
    let category = attributes
        .remove("group-title")
        .filter(|v| !v.is_empty())
        .or_else(|| pending_group.filter(|g| !g.is_empty()))
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    PendingEntry {
        name,
        category,
        logo: attributes.remove("tvg-logo").unwrap_or_default(),
        tvg_id: attributes.remove("tvg-id").unwrap_or_default(),
    }
}

/// Scan `key="value"` (or unquoted `key=value`) pairs without regex. Keys
/// are lowercased so attribute matching is case-insensitive.
fn parse_attributes(attrs: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let mut chars = attrs.chars().peekable();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut in_quotes = false;

    while let Some(ch) = chars.next() {
        match ch {
            '=' if !in_value => {
                in_value = true;
                if chars.peek() == Some(&'"') {
                    chars.next();
                    in_quotes = true;
                }
            }
            '"' if in_quotes => {
                out.insert(key.trim().to_ascii_lowercase(), std::mem::take(&mut value));
                key.clear();
                in_value = false;
                in_quotes = false;
            }
            ' ' | '\t' if !in_quotes => {
                if in_value {
                    if !key.trim().is_empty() {
                        out.insert(key.trim().to_ascii_lowercase(), std::mem::take(&mut value));
                    }
                    value.clear();
                    in_value = false;
                }
                key.clear();
            }
            _ => {
                if in_value {
                    value.push(ch);
                } else {
                    key.push(ch);
                }
            }
        }
    }

    if in_value && !key.trim().is_empty() {
        out.insert(key.trim().to_ascii_lowercase(), value);
    }

    out
}
