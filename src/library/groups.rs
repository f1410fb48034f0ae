//! Group CRUD and the empty-group cascade.

use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Library, CHANNELS, GROUPS};
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Group, GroupDeleteStrategy};

impl Library {
    /// All groups in display order.
    pub fn list_groups(&self) -> AppResult<Vec<Group>> {
        let (_, mut groups) = self.read_list::<Group>(GROUPS)?;
        groups.sort_by_key(|g| g.order);
        Ok(groups)
    }

    pub fn create_group(&self, name: &str) -> AppResult<Group> {
        self.update_list::<Group, _, _>(GROUPS, |groups| {
            let group = Group {
                id: Uuid::new_v4(),
                name: name.to_string(),
                order: groups.len() as i32,
            };
            groups.push(group.clone());
            group
        })
    }

    /// Look up a group by exact name, creating it at the end of the display
    /// order when absent. Used by category-based imports.
    pub fn find_or_create_group(&self, name: &str) -> AppResult<Group> {
        self.update_list::<Group, _, _>(GROUPS, |groups| {
            if let Some(existing) = groups.iter().find(|g| g.name == name) {
                return existing.clone();
            }
            let group = Group {
                id: Uuid::new_v4(),
                name: name.to_string(),
                order: groups.len() as i32,
            };
            groups.push(group.clone());
            group
        })
    }

    pub fn rename_group(&self, group_id: Uuid, name: &str) -> AppResult<Group> {
        let renamed = self.update_list::<Group, _, _>(GROUPS, |groups| {
            let group = groups.iter_mut().find(|g| g.id == group_id)?;
            group.name = name.to_string();
            Some(group.clone())
        })?;
        renamed.ok_or_else(|| AppError::not_found("group", group_id))
    }

    /// Reorder groups to the given id sequence. Groups not named in the
    /// sequence keep their relative order at the end.
    pub fn reorder_groups(&self, ordered_ids: &[Uuid]) -> AppResult<()> {
        self.update_list::<Group, _, _>(GROUPS, |groups| {
            let mut reordered: Vec<Group> = Vec::with_capacity(groups.len());
            for id in ordered_ids {
                if let Some(pos) = groups.iter().position(|g| g.id == *id) {
                    let mut group = groups.remove(pos);
                    group.order = reordered.len() as i32;
                    reordered.push(group);
                }
            }
            for mut group in groups.drain(..) {
                group.order = reordered.len() as i32;
                reordered.push(group);
            }
            *groups = reordered;
        })?;
        Ok(())
    }

    /// Delete a group. Its channels are either ungrouped or deleted along
    /// with it, depending on the strategy.
    pub fn delete_group(&self, group_id: Uuid, strategy: GroupDeleteStrategy) -> AppResult<()> {
        let existed = self.update_list::<Group, _, _>(GROUPS, |groups| {
            let before = groups.len();
            groups.retain(|g| g.id != group_id);
            groups.len() != before
        })?;
        if !existed {
            return Err(AppError::not_found("group", group_id));
        }

        match strategy {
            GroupDeleteStrategy::DeleteChannels => {
                let removed_urls = self.update_list::<Channel, _, _>(CHANNELS, |channels| {
                    let urls = channels
                        .iter()
                        .filter(|c| c.group_id == Some(group_id) && !c.url.is_empty())
                        .map(|c| c.url.clone())
                        .collect::<HashSet<_>>();
                    channels.retain(|c| c.group_id != Some(group_id));
                    urls
                })?;
                self.cleanup_favorites_by_urls(&removed_urls)?;
            }
            GroupDeleteStrategy::ReassignUngrouped => {
                let now = Utc::now();
                self.update_list::<Channel, _, _>(CHANNELS, |channels| {
                    for channel in channels.iter_mut() {
                        if channel.group_id == Some(group_id) {
                            channel.group_id = None;
                            channel.updated_at = now;
                        }
                    }
                })?;
            }
        }
        info!("Deleted group {} ({:?})", group_id, strategy);
        Ok(())
    }

    /// Delete the groups among `touched` that no longer hold any channel.
    /// Only the given ids are checked - callers pass the groups their own
    /// removals touched, so this never scans the whole library.
    pub fn prune_empty_groups(&self, touched: &HashSet<Uuid>) -> AppResult<usize> {
        if touched.is_empty() {
            return Ok(0);
        }

        let (_, channels) = self.read_list::<Channel>(CHANNELS)?;
        let still_used: HashSet<Uuid> = channels.iter().filter_map(|c| c.group_id).collect();
        let doomed: HashSet<Uuid> = touched.difference(&still_used).copied().collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let pruned = self.update_list::<Group, _, _>(GROUPS, |groups| {
            let before = groups.len();
            groups.retain(|g| !doomed.contains(&g.id));
            before - groups.len()
        })?;
        if pruned > 0 {
            debug!("Pruned {} empty group(s)", pruned);
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::channels::NewChannel;
    use crate::library::Library;

    fn seed_channel(library: &Library, group_id: Option<Uuid>, url: &str) -> Channel {
        let source_id = Uuid::new_v4();
        library
            .insert_channels(
                source_id,
                vec![NewChannel {
                    name: "Chan".to_string(),
                    url: url.to_string(),
                    logo: String::new(),
                    tvg_id: String::new(),
                    group_id,
                }],
            )
            .unwrap();
        library
            .channels_for_source(source_id)
            .unwrap()
            .pop()
            .unwrap()
    }

    #[test]
    fn create_assigns_sequential_order() {
        let library = Library::in_memory();
        let news = library.create_group("News").unwrap();
        let sports = library.create_group("Sports").unwrap();
        assert_eq!(news.order, 0);
        assert_eq!(sports.order, 1);
    }

    #[test]
    fn find_or_create_reuses_exact_name() {
        let library = Library::in_memory();
        let first = library.find_or_create_group("Movies").unwrap();
        let second = library.find_or_create_group("Movies").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(library.list_groups().unwrap().len(), 1);
    }

    #[test]
    fn reorder_appends_unlisted_groups() {
        let library = Library::in_memory();
        let a = library.create_group("A").unwrap();
        let b = library.create_group("B").unwrap();
        let c = library.create_group("C").unwrap();

        library.reorder_groups(&[c.id, a.id]).unwrap();
        let names: Vec<String> = library
            .list_groups()
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_eq!(library.list_groups().unwrap()[2].id, b.id);
    }

    #[test]
    fn delete_with_reassign_ungroups_channels() {
        let library = Library::in_memory();
        let group = library.create_group("Doomed").unwrap();
        let channel = seed_channel(&library, Some(group.id), "http://a.com/1.m3u8");

        library
            .delete_group(group.id, GroupDeleteStrategy::ReassignUngrouped)
            .unwrap();

        let survivors = library.channels_for_source(channel.source_id).unwrap();
        assert_eq!(survivors.len(), 1);
        assert!(survivors[0].group_id.is_none());
    }

    #[test]
    fn delete_with_delete_channels_removes_them_and_their_favorites() {
        let library = Library::in_memory();
        let group = library.create_group("Doomed").unwrap();
        let channel = seed_channel(&library, Some(group.id), "http://a.com/1.m3u8");
        library.add_favorite(&channel).unwrap();

        library
            .delete_group(group.id, GroupDeleteStrategy::DeleteChannels)
            .unwrap();

        assert!(library.channels_for_source(channel.source_id).unwrap().is_empty());
        assert!(library.list_favorites().unwrap().is_empty());
    }

    #[test]
    fn prune_only_touches_named_groups() {
        let library = Library::in_memory();
        let empty_touched = library.create_group("Empty touched").unwrap();
        let empty_untouched = library.create_group("Empty untouched").unwrap();
        let occupied = library.create_group("Occupied").unwrap();
        seed_channel(&library, Some(occupied.id), "http://a.com/1.m3u8");

        let touched: HashSet<Uuid> = [empty_touched.id, occupied.id].into_iter().collect();
        let pruned = library.prune_empty_groups(&touched).unwrap();

        assert_eq!(pruned, 1);
        let remaining: Vec<Uuid> = library.list_groups().unwrap().iter().map(|g| g.id).collect();
        assert!(remaining.contains(&empty_untouched.id));
        assert!(remaining.contains(&occupied.id));
        assert!(!remaining.contains(&empty_touched.id));
    }
}
