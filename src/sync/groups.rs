//! Group assignment policy for channels added during an import.

use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::library::Library;
use crate::models::ImportConfig;

/// Per-apply memo of category name to resolved group, so one apply never
/// creates the same group twice.
pub type GroupCache = HashMap<String, Option<Uuid>>;

/// Resolve the target group for an added channel. Never fails at apply
/// time: every mode has a null fallback.
pub fn resolve_group_id(
    library: &Library,
    import_config: &ImportConfig,
    category: &str,
    cache: &mut GroupCache,
) -> AppResult<Option<Uuid>> {
    match import_config {
        ImportConfig::NoGroups => Ok(None),
        ImportConfig::SingleGroup { target_group_id } => Ok(Some(*target_group_id)),
        ImportConfig::Mapping { category_map } => Ok(category_map.get(category).copied()),
        ImportConfig::CreateFromCategories => {
            let category = if category.is_empty() {
                "Uncategorized"
            } else {
                category
            };
            if let Some(resolved) = cache.get(category) {
                return Ok(*resolved);
            }
            let group = library.find_or_create_group(category)?;
            cache.insert(category.to_string(), Some(group.id));
            Ok(Some(group.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_groups_always_resolves_to_none() {
        let library = Library::in_memory();
        let mut cache = GroupCache::new();
        let resolved =
            resolve_group_id(&library, &ImportConfig::NoGroups, "News", &mut cache).unwrap();
        assert!(resolved.is_none());
        assert!(library.list_groups().unwrap().is_empty());
    }

    #[test]
    fn single_group_always_resolves_to_the_target() {
        let library = Library::in_memory();
        let target = Uuid::new_v4();
        let mut cache = GroupCache::new();
        let config = ImportConfig::SingleGroup {
            target_group_id: target,
        };

        assert_eq!(
            resolve_group_id(&library, &config, "News", &mut cache).unwrap(),
            Some(target)
        );
        assert_eq!(
            resolve_group_id(&library, &config, "Sports", &mut cache).unwrap(),
            Some(target)
        );
    }

    #[test]
    fn create_from_categories_reuses_groups_via_cache() {
        let library = Library::in_memory();
        let mut cache = GroupCache::new();
        let config = ImportConfig::CreateFromCategories;

        let first = resolve_group_id(&library, &config, "News", &mut cache).unwrap();
        let second = resolve_group_id(&library, &config, "News", &mut cache).unwrap();
        let other = resolve_group_id(&library, &config, "Sports", &mut cache).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(library.list_groups().unwrap().len(), 2);
    }

    #[test]
    fn create_from_categories_picks_up_existing_group() {
        let library = Library::in_memory();
        let existing = library.create_group("News").unwrap();
        let mut cache = GroupCache::new();

        let resolved =
            resolve_group_id(&library, &ImportConfig::CreateFromCategories, "News", &mut cache)
                .unwrap();
        assert_eq!(resolved, Some(existing.id));
        assert_eq!(library.list_groups().unwrap().len(), 1);
    }

    #[test]
    fn mapping_resolves_unmapped_to_ungrouped() {
        let library = Library::in_memory();
        let news_group = Uuid::new_v4();
        let config = ImportConfig::Mapping {
            category_map: [("News".to_string(), news_group)].into_iter().collect(),
        };
        let mut cache = GroupCache::new();

        assert_eq!(
            resolve_group_id(&library, &config, "News", &mut cache).unwrap(),
            Some(news_group)
        );
        assert_eq!(
            resolve_group_id(&library, &config, "Unmapped", &mut cache).unwrap(),
            None
        );
    }
}
