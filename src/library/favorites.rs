//! Favorites: denormalized bookmarks kept in their own collection so they
//! survive channel edits. Cleanup is by URL match because the channel
//! record is already gone when a favorite becomes stale.

use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::{Library, FAVORITES};
use crate::errors::AppResult;
use crate::models::{Channel, Favorite};

impl Library {
    pub fn list_favorites(&self) -> AppResult<Vec<Favorite>> {
        let (_, favorites) = self.read_list(FAVORITES)?;
        Ok(favorites)
    }

    /// Bookmark a channel. Adding the same channel twice is a no-op.
    pub fn add_favorite(&self, channel: &Channel) -> AppResult<Favorite> {
        let favorite = Favorite::from_channel(channel);
        let stored = favorite.clone();
        self.update_list::<Favorite, _, _>(FAVORITES, move |favorites| {
            if !favorites.iter().any(|f| f.id == favorite.id) {
                favorites.push(favorite.clone());
            }
        })?;
        Ok(stored)
    }

    pub fn remove_favorite(&self, favorite_id: Uuid) -> AppResult<bool> {
        self.update_list::<Favorite, _, _>(FAVORITES, |favorites| {
            let before = favorites.len();
            favorites.retain(|f| f.id != favorite_id);
            favorites.len() != before
        })
    }

    /// Drop every favorite whose URL is in the given set. Used after
    /// channel deletions of any kind.
    pub fn cleanup_favorites_by_urls(&self, urls: &HashSet<String>) -> AppResult<()> {
        if urls.is_empty() {
            return Ok(());
        }
        let dropped = self.update_list::<Favorite, _, _>(FAVORITES, |favorites| {
            let before = favorites.len();
            favorites.retain(|f| f.url.is_empty() || !urls.contains(&f.url));
            before - favorites.len()
        })?;
        if dropped > 0 {
            debug!("Removed {} stale favorite(s)", dropped);
        }
        Ok(())
    }
}
