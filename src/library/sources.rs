//! Source CRUD. Deleting a source cascades to its channels and cleans up
//! favorites pointing at the deleted streams.

use chrono::Utc;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use super::{Library, SOURCES};
use crate::errors::{AppError, AppResult};
use crate::models::{Source, SourceCreateRequest, SourceUpdateRequest};

impl Library {
    pub fn list_sources(&self) -> AppResult<Vec<Source>> {
        let (_, sources) = self.read_list(SOURCES)?;
        Ok(sources)
    }

    pub fn get_source(&self, source_id: Uuid) -> AppResult<Source> {
        self.list_sources()?
            .into_iter()
            .find(|s| s.id == source_id)
            .ok_or_else(|| AppError::not_found("source", source_id))
    }

    pub fn add_source(&self, request: SourceCreateRequest) -> AppResult<Source> {
        let source = Source {
            id: Uuid::new_v4(),
            name: request.name,
            kind: request.kind,
            enabled: request.enabled,
            import_config: request.import_config,
            last_sync: None,
            auto_sync_on_launch: request.auto_sync_on_launch,
        };

        let created = source.clone();
        self.update_list::<Source, _, _>(SOURCES, move |sources| {
            sources.push(source.clone());
        })?;
        info!("Added source '{}' ({})", created.name, created.id);
        Ok(created)
    }

    pub fn update_source(
        &self,
        source_id: Uuid,
        request: SourceUpdateRequest,
    ) -> AppResult<Source> {
        let updated = self.update_list::<Source, _, _>(SOURCES, |sources| {
            let source = sources.iter_mut().find(|s| s.id == source_id)?;
            if let Some(name) = request.name.clone() {
                source.name = name;
            }
            if let Some(kind) = request.kind.clone() {
                source.kind = kind;
            }
            if let Some(enabled) = request.enabled {
                source.enabled = enabled;
            }
            if let Some(auto) = request.auto_sync_on_launch {
                source.auto_sync_on_launch = auto;
            }
            if let Some(import_config) = request.import_config.clone() {
                source.import_config = import_config;
            }
            Some(source.clone())
        })?;

        updated.ok_or_else(|| AppError::not_found("source", source_id))
    }

    /// Delete a source together with all channels it owns. Favorites whose
    /// URL matches a deleted channel are removed as well.
    pub fn delete_source(&self, source_id: Uuid) -> AppResult<()> {
        let existed = self.update_list::<Source, _, _>(SOURCES, |sources| {
            let before = sources.len();
            sources.retain(|s| s.id != source_id);
            sources.len() != before
        })?;
        if !existed {
            return Err(AppError::not_found("source", source_id));
        }

        let removed_urls = self.delete_channels_of_source(source_id)?;
        self.cleanup_favorites_by_urls(&removed_urls)?;
        info!(
            "Deleted source {} and {} of its channels",
            source_id,
            removed_urls.len()
        );
        Ok(())
    }

    pub(crate) fn delete_channels_of_source(&self, source_id: Uuid) -> AppResult<HashSet<String>> {
        self.update_list::<crate::models::Channel, _, _>(super::CHANNELS, |channels| {
            let removed_urls = channels
                .iter()
                .filter(|c| c.source_id == source_id && !c.url.is_empty())
                .map(|c| c.url.clone())
                .collect::<HashSet<_>>();
            channels.retain(|c| c.source_id != source_id);
            removed_urls
        })
    }

    /// Record a completed sync on the source.
    pub fn touch_last_sync(&self, source_id: Uuid) -> AppResult<()> {
        let now = Utc::now();
        let found = self.update_list::<Source, _, _>(SOURCES, |sources| {
            match sources.iter_mut().find(|s| s.id == source_id) {
                Some(source) => {
                    source.last_sync = Some(now);
                    true
                }
                None => false,
            }
        })?;
        if !found {
            return Err(AppError::not_found("source", source_id));
        }
        Ok(())
    }
}
