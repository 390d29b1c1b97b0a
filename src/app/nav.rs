use std::collections::HashSet;
use std::time::Instant;

use log::{debug, warn};

use crate::data::{ClusterHierarchy, Level};

/// Shared navigation state read by both the map and the outline. Views
/// dispatch intents through [`NavStore`] methods; they never mutate fields
/// directly.
#[derive(Clone, Debug)]
pub(in crate::app) struct NavigationState {
    pub selected_node_id: Option<String>,
    /// `None` means the (possibly synthetic) hierarchy root.
    pub current_root_id: Option<String>,
    /// Ancestor ids from just below the root to the current root, synthetic
    /// root excluded. Always the exact root chain of `current_root_id`.
    pub breadcrumb: Vec<String>,
    /// Leaves the outline should auto-open when sync is enabled.
    pub expanded_l0_ids: HashSet<String>,
    pub sync_enabled: bool,
    pub last_updated: Option<Instant>,
}

impl NavigationState {
    fn new() -> Self {
        Self {
            selected_node_id: None,
            current_root_id: None,
            breadcrumb: Vec::new(),
            expanded_l0_ids: HashSet::new(),
            sync_enabled: false,
            last_updated: None,
        }
    }
}

/// Observable store over [`NavigationState`]: every mutation bumps a
/// revision, and subscribers poll for states newer than what they last saw.
pub(in crate::app) struct NavStore {
    state: NavigationState,
    revision: u64,
}

pub(in crate::app) struct NavSubscription {
    seen: u64,
}

impl NavSubscription {
    pub fn poll<'a>(&mut self, store: &'a NavStore) -> Option<&'a NavigationState> {
        if store.revision == self.seen {
            return None;
        }
        self.seen = store.revision;
        Some(&store.state)
    }
}

impl NavStore {
    pub fn new() -> Self {
        Self {
            state: NavigationState::new(),
            revision: 0,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&self) -> NavSubscription {
        // Starts one revision behind so the first poll delivers.
        NavSubscription {
            seen: self.revision.wrapping_sub(1),
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        self.state.last_updated = Some(Instant::now());
    }

    /// Drills the view into `id`. Valid only for nodes with children; a
    /// leaf leaves the current root and breadcrumb untouched.
    pub fn select_and_drill(&mut self, hierarchy: &ClusterHierarchy, id: &str) {
        let Some(node) = hierarchy.find(id) else {
            warn!("drill target {id} not found in hierarchy");
            return;
        };
        if !node.has_children() {
            debug!("ignoring drill into childless node {id}");
            return;
        }

        self.drill_to(hierarchy, id);
        self.state.selected_node_id = Some(id.to_string());
        self.touch();
    }

    /// Truncates the trail to `index` inclusive; `None` resets to the full
    /// hierarchy and clears the selection.
    pub fn navigate_breadcrumb(&mut self, index: Option<usize>) {
        match index {
            None => {
                self.state.breadcrumb.clear();
                self.state.current_root_id = None;
                self.state.selected_node_id = None;
            }
            Some(index) => {
                if index >= self.state.breadcrumb.len() {
                    return;
                }
                self.state.breadcrumb.truncate(index + 1);
                self.state.current_root_id = self.state.breadcrumb.last().cloned();
            }
        }
        self.touch();
    }

    /// Mirrors a selection made in one view onto the other: drills into a
    /// branch node, or into a leaf's parent with the leaf highlighted.
    /// An unknown id is logged and ignored.
    pub fn navigate_to_node_by_id(&mut self, hierarchy: &ClusterHierarchy, id: &str) {
        let Some(node) = hierarchy.find(id) else {
            warn!("navigation target {id} not found in hierarchy");
            return;
        };

        if node.has_children() {
            self.drill_to(hierarchy, id);
        } else {
            let Some(path) = hierarchy.ancestor_path(id) else {
                warn!("navigation target {id} has no ancestor path");
                return;
            };
            let parent_chain = &path[..path.len().saturating_sub(1)];
            self.state.breadcrumb = parent_chain.iter().map(|node| node.id.clone()).collect();
            self.state.current_root_id = self.state.breadcrumb.last().cloned();
            if node.level == Level::L0 {
                self.state.expanded_l0_ids.insert(id.to_string());
            }
        }

        self.state.selected_node_id = Some(id.to_string());
        self.touch();
    }

    pub fn toggle_sync_mode(&mut self) {
        self.state.sync_enabled = !self.state.sync_enabled;
        self.touch();
    }

    pub fn select_node(&mut self, hierarchy: &ClusterHierarchy, id: Option<&str>) {
        let next = id.map(str::to_string);
        if self.state.selected_node_id == next {
            return;
        }

        if let Some(id) = id
            && hierarchy.find(id).is_some_and(|node| node.level == Level::L0)
        {
            self.state.expanded_l0_ids.insert(id.to_string());
        }

        self.state.selected_node_id = next;
        self.touch();
    }

    fn drill_to(&mut self, hierarchy: &ClusterHierarchy, id: &str) {
        let Some(path) = hierarchy.ancestor_path(id) else {
            return;
        };
        self.state.breadcrumb = path.iter().map(|node| node.id.clone()).collect();
        self.state.current_root_id = self.state.breadcrumb.last().cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::sample_hierarchy;

    #[test]
    fn drilling_into_a_category_sets_root_and_breadcrumb() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();

        store.select_and_drill(&hierarchy, "l2-1");
        let state = store.state();
        assert_eq!(state.current_root_id.as_deref(), Some("l2-1"));
        assert_eq!(state.breadcrumb, ["l2-1"]);
        assert_eq!(state.selected_node_id.as_deref(), Some("l2-1"));
    }

    #[test]
    fn breadcrumb_length_matches_root_depth() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();

        store.select_and_drill(&hierarchy, "l1-3");
        let state = store.state();
        assert_eq!(state.breadcrumb, ["l2-2", "l1-3"]);
        assert_eq!(
            state.breadcrumb.len(),
            hierarchy
                .ancestor_path("l1-3")
                .expect("node exists")
                .len()
        );
    }

    #[test]
    fn drilling_into_a_leaf_changes_nothing() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();
        store.select_and_drill(&hierarchy, "l2-1");
        let revision = store.revision();

        store.select_and_drill(&hierarchy, "l0-1");
        let state = store.state();
        assert_eq!(state.current_root_id.as_deref(), Some("l2-1"));
        assert_eq!(state.breadcrumb, ["l2-1"]);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn root_reset_clears_everything() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();
        store.select_and_drill(&hierarchy, "l1-3");

        store.navigate_breadcrumb(None);
        let state = store.state();
        assert!(state.breadcrumb.is_empty());
        assert!(state.current_root_id.is_none());
        assert!(state.selected_node_id.is_none());
    }

    #[test]
    fn breadcrumb_navigation_truncates_the_trail() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();
        store.select_and_drill(&hierarchy, "l1-3");

        store.navigate_breadcrumb(Some(0));
        let state = store.state();
        assert_eq!(state.breadcrumb, ["l2-2"]);
        assert_eq!(state.current_root_id.as_deref(), Some("l2-2"));
    }

    #[test]
    fn navigating_to_a_leaf_drills_its_parent_and_selects_it() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();

        store.navigate_to_node_by_id(&hierarchy, "l0-5");
        let state = store.state();
        assert_eq!(state.breadcrumb, ["l2-2", "l1-3"]);
        assert_eq!(state.current_root_id.as_deref(), Some("l1-3"));
        assert_eq!(state.selected_node_id.as_deref(), Some("l0-5"));
        assert!(state.expanded_l0_ids.contains("l0-5"));
    }

    #[test]
    fn navigating_to_a_branch_drills_into_it() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();

        store.navigate_to_node_by_id(&hierarchy, "l1-2");
        let state = store.state();
        assert_eq!(state.breadcrumb, ["l2-1", "l1-2"]);
        assert_eq!(state.current_root_id.as_deref(), Some("l1-2"));
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();
        store.select_and_drill(&hierarchy, "l2-1");
        let revision = store.revision();

        store.navigate_to_node_by_id(&hierarchy, "ghost");
        assert_eq!(store.revision(), revision);
        assert_eq!(store.state().current_root_id.as_deref(), Some("l2-1"));
    }

    #[test]
    fn subscriptions_fire_once_per_change() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();
        let mut subscription = store.subscribe();

        assert!(subscription.poll(&store).is_some());
        assert!(subscription.poll(&store).is_none());

        store.select_and_drill(&hierarchy, "l2-2");
        assert!(subscription.poll(&store).is_some());
        assert!(subscription.poll(&store).is_none());
    }

    #[test]
    fn selecting_a_leaf_marks_it_expanded() {
        let hierarchy = sample_hierarchy();
        let mut store = NavStore::new();

        store.select_node(&hierarchy, Some("l0-3"));
        assert!(store.state().expanded_l0_ids.contains("l0-3"));
        assert_eq!(store.state().selected_node_id.as_deref(), Some("l0-3"));

        let revision = store.revision();
        store.select_node(&hierarchy, Some("l0-3"));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn sync_mode_toggles() {
        let mut store = NavStore::new();
        assert!(!store.state().sync_enabled);
        store.toggle_sync_mode();
        assert!(store.state().sync_enabled);
        store.toggle_sync_mode();
        assert!(!store.state().sync_enabled);
    }
}
