//! Resync orchestration over the library and the playlist fetcher.
//!
//! The `diff_source`/`apply_diff` pair is the two-phase API: callers
//! preview a diff, inspect the counts, then apply. The `resync_*`
//! composites and the probe operations (`test_connection`,
//! `preview_categories`) are the UI-facing paths: they convert errors into
//! result DTOs instead of propagating, so a failed fetch never takes the
//! caller down with it.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::errors::{AppResult, SourceError};
use crate::ingestor::fetch::{PlaylistFetch, PlaylistFetcher};
use crate::ingestor::m3u_parser::parse_m3u;
use crate::library::Library;
use crate::models::{
    CategoryPreview, ConnectionTestResult, ImportConfig, PreviewOutcome, ResyncOutcome,
    SourceKind, StartupSyncEntry,
};
use crate::sync::apply::{apply_diff, ApplyOutcome};
use crate::sync::diff::{compute_diff, SourceDiff};

pub struct SyncService {
    library: Library,
    fetcher: Arc<dyn PlaylistFetch>,
}

impl SyncService {
    pub fn new(library: Library, fetcher: Arc<dyn PlaylistFetch>) -> Self {
        Self { library, fetcher }
    }

    pub fn with_config(library: Library, config: &SyncConfig) -> Self {
        Self::new(library, Arc::new(PlaylistFetcher::new(config)))
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Fetch, parse and compare one source against its stored channels.
    /// Read-only: nothing is mutated.
    pub async fn diff_source(&self, source_id: Uuid) -> AppResult<SourceDiff> {
        let source = self.library.get_source(source_id)?;
        let raw = self.fetcher.fetch_raw_playlist(&source.kind).await?;
        let playlist = parse_m3u(&raw);
        let existing = self.library.channels_for_source(source_id)?;
        let diff = compute_diff(&existing, &playlist);
        info!(
            "Diff for source '{}': +{} ~{} -{}",
            source.name, diff.counts.added, diff.counts.updated, diff.counts.removed
        );
        Ok(diff)
    }

    /// Commit a previously computed diff.
    pub fn apply_diff(
        &self,
        source_id: Uuid,
        import_config: &ImportConfig,
        diff: &SourceDiff,
    ) -> AppResult<ApplyOutcome> {
        let source = self.library.get_source(source_id)?;
        apply_diff(&self.library, &source, import_config, diff)
    }

    /// Diff and immediately apply, reporting failure instead of
    /// propagating it.
    pub async fn resync_source(&self, source_id: Uuid) -> ResyncOutcome {
        match self.resync_inner(source_id).await {
            Ok(outcome) => ResyncOutcome {
                success: true,
                counts: Some(outcome.counts),
                error: None,
            },
            Err(e) => {
                warn!("Resync of source {} failed: {}", source_id, e);
                ResyncOutcome::failure(e)
            }
        }
    }

    /// Interactive alias of [`resync_source`](Self::resync_source): the
    /// apply half of a preview/apply exchange recomputes the diff so it
    /// commits against current state.
    pub async fn resync_apply(&self, source_id: Uuid) -> ResyncOutcome {
        self.resync_source(source_id).await
    }

    async fn resync_inner(&self, source_id: Uuid) -> AppResult<ApplyOutcome> {
        let source = self.library.get_source(source_id)?;
        let diff = self.diff_source(source_id).await?;
        apply_diff(&self.library, &source, &source.import_config, &diff)
    }

    /// Diff only, packaged for inline display.
    pub async fn resync_preview(&self, source_id: Uuid) -> PreviewOutcome {
        match self.diff_source(source_id).await {
            Ok(diff) => PreviewOutcome {
                success: true,
                counts: Some(diff.counts),
                sample: Some(diff.sample),
                error: None,
            },
            Err(e) => PreviewOutcome::failure(e),
        }
    }

    /// Probe an unsaved source configuration: fetch with the short test
    /// deadline and verify the content parses to at least one channel.
    pub async fn test_connection(&self, kind: &SourceKind) -> ConnectionTestResult {
        match self.test_connection_inner(kind).await {
            Ok(channels) => ConnectionTestResult {
                success: true,
                channels: Some(channels),
                error: None,
            },
            Err(e) => ConnectionTestResult {
                success: false,
                channels: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn test_connection_inner(&self, kind: &SourceKind) -> AppResult<usize> {
        let content = self.fetcher.fetch_for_test(kind).await?;
        if content.trim().is_empty() {
            return Err(SourceError::EmptyResponse.into());
        }
        let playlist = parse_m3u(&content);
        if playlist.is_empty() {
            return Err(SourceError::EmptyPlaylist.into());
        }
        Ok(playlist.total_channels())
    }

    /// Distinct category names in a source payload, for import
    /// configuration UIs.
    pub async fn preview_categories(&self, kind: &SourceKind) -> AppResult<CategoryPreview> {
        let content = self.fetcher.fetch_raw_playlist(kind).await?;
        let playlist = parse_m3u(&content);
        let categories: Vec<String> = playlist
            .categories
            .iter()
            .map(|c| c.name.clone())
            .collect();
        Ok(CategoryPreview {
            total: categories.len(),
            categories,
        })
    }

    /// Resync every enabled source marked for sync-on-launch, one at a
    /// time. Failures are collected per source, never propagated.
    pub async fn resync_startup(&self) -> AppResult<Vec<StartupSyncEntry>> {
        let sources = self.library.list_sources()?;
        let mut entries = Vec::new();
        for source in sources
            .into_iter()
            .filter(|s| s.enabled && s.auto_sync_on_launch)
        {
            let outcome = self.resync_source(source.id).await;
            entries.push(StartupSyncEntry {
                source_id: source.id,
                source_name: source.name,
                outcome,
            });
        }
        Ok(entries)
    }
}
