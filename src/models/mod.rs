use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A configured origin of channels: a local file, a plain HTTP(S) playlist
/// URL, or an Xtream-Codes panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKind,
    pub enabled: bool,
    pub import_config: ImportConfig,
    pub last_sync: Option<DateTime<Utc>>,
    pub auto_sync_on_launch: bool,
}

/// Source origin, tagged by `type`. Each variant carries only the fields
/// that are meaningful for that origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    File {
        path: String,
    },
    Url {
        url: String,
    },
    Xtream {
        server: String,
        username: String,
        password: String,
    },
}

impl SourceKind {
    /// Short label used in log lines and CLI listings.
    pub fn type_name(&self) -> &'static str {
        match self {
            SourceKind::File { .. } => "file",
            SourceKind::Url { .. } => "url",
            SourceKind::Xtream { .. } => "xtream",
        }
    }
}

/// Group assignment strategy applied to channels added during an import,
/// tagged by `mode`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ImportConfig {
    /// Added channels stay ungrouped.
    #[default]
    NoGroups,
    /// Every added channel lands in one preconfigured group.
    SingleGroup { target_group_id: Uuid },
    /// A group is looked up or created per playlist category name.
    CreateFromCategories,
    /// Static category-name to group lookup; unmapped categories stay
    /// ungrouped.
    Mapping { category_map: HashMap<String, Uuid> },
}

/// A user-visible named bucket for channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub order: i32,
}

/// One playable stream entry owned by a source. Empty `logo`/`tvg_id`
/// strings mean the playlist did not carry the attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub logo: String,
    pub tvg_id: String,
    pub source_id: Uuid,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A denormalized bookmark of a channel. Favorites survive channel edits
/// independently: resync patches them in place (matched by tvg-id, then by
/// previous URL) and removes them when their channel disappears.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub logo: String,
    pub tvg_id: String,
    pub source_id: Uuid,
    pub group_id: Option<Uuid>,
}

impl Favorite {
    pub fn from_channel(channel: &Channel) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone(),
            url: channel.url.clone(),
            logo: channel.logo.clone(),
            tvg_id: channel.tvg_id.clone(),
            source_id: channel.source_id,
            group_id: channel.group_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCreateRequest {
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub auto_sync_on_launch: bool,
    #[serde(default)]
    pub import_config: ImportConfig,
}

fn default_true() -> bool {
    true
}

/// Partial source update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceUpdateRequest {
    pub name: Option<String>,
    pub kind: Option<SourceKind>,
    pub enabled: Option<bool>,
    pub auto_sync_on_launch: Option<bool>,
    pub import_config: Option<ImportConfig>,
}

/// What to do with a group's channels when the group itself is deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GroupDeleteStrategy {
    /// Channels stay in the library, ungrouped.
    #[default]
    ReassignUngrouped,
    /// Channels are deleted along with the group.
    DeleteChannels,
}

/// Optional filters for channel listings.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    pub source_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub search: Option<String>,
}

/// Result of a resync apply, shaped for direct UI consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncOutcome {
    pub success: bool,
    pub counts: Option<crate::sync::diff::DiffCounts>,
    pub error: Option<String>,
}

impl ResyncOutcome {
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            counts: None,
            error: Some(error.to_string()),
        }
    }
}

/// Result of a resync preview: counts and a bounded name sample, no
/// mutation performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewOutcome {
    pub success: bool,
    pub counts: Option<crate::sync::diff::DiffCounts>,
    pub sample: Option<crate::sync::diff::DiffSample>,
    pub error: Option<String>,
}

impl PreviewOutcome {
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            counts: None,
            sample: None,
            error: Some(error.to_string()),
        }
    }
}

/// Result of probing an unsaved source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub channels: Option<usize>,
    pub error: Option<String>,
}

/// Distinct category names found in a fetched playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPreview {
    pub categories: Vec<String>,
    pub total: usize,
}

/// Per-source outcome of a startup resync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupSyncEntry {
    pub source_id: Uuid,
    pub source_name: String,
    pub outcome: ResyncOutcome,
}
