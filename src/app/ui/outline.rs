use std::collections::HashSet;

use eframe::egui::{self, Align, Color32, Key, Layout, RichText, Ui};

use crate::data::{ClusterNode, Level};
use crate::util::format_count;

use super::super::ViewModel;
use super::super::topic_cache::TopicEntry;

const ROW_INDENT: f32 = 14.0;

/// Outline-local view state. `expanded_ids` belongs to the outline; sync
/// mode only ever adds to it, so manual expansions survive mirroring.
pub(in crate::app) struct OutlineState {
    pub expanded_ids: HashSet<String>,
    pub focused_id: Option<String>,
    pub scroll_to: Option<String>,
}

impl OutlineState {
    pub fn new() -> Self {
        Self {
            expanded_ids: HashSet::new(),
            focused_id: None,
            scroll_to: None,
        }
    }
}

pub(in crate::app) struct FlatRow<'a> {
    pub node: &'a ClusterNode,
    pub depth: usize,
}

/// Pre-order traversal that recurses only into expanded nodes. The result
/// is the linear order keyboard focus moves through.
pub(in crate::app) fn flatten<'a>(
    nodes: &'a [ClusterNode],
    expanded: &HashSet<String>,
) -> Vec<FlatRow<'a>> {
    fn visit<'a>(
        node: &'a ClusterNode,
        depth: usize,
        expanded: &HashSet<String>,
        out: &mut Vec<FlatRow<'a>>,
    ) {
        out.push(FlatRow { node, depth });
        if expanded.contains(&node.id) {
            for child in &node.children {
                visit(child, depth + 1, expanded, out);
            }
        }
    }

    let mut rows = Vec::new();
    for node in nodes {
        visit(node, 0, expanded, &mut rows);
    }
    rows
}

impl ViewModel {
    pub(in crate::app) fn draw_outline(&mut self, ui: &mut Ui) {
        ui.heading("Clusters");
        ui.add_space(4.0);

        ui.label("Search cluster names")
            .on_hover_text("Fuzzy-highlight matching clusters without changing the map.");
        ui.text_edit_singleline(&mut self.search);
        ui.add_space(4.0);
        ui.separator();

        self.consume_nav_sync();
        self.handle_outline_keys(ui);

        let search_matches = self.search_matches();
        let selected_id = self.nav.state().selected_node_id.clone();
        let scroll_target = self.outline.scroll_to.take();

        let rows = flatten(self.hierarchy.top_level(), &self.outline.expanded_ids);
        let mut pending_activation: Option<String> = None;
        let mut pending_requests: Vec<String> = Vec::new();
        let mut pending_retry: Option<String> = None;

        egui::ScrollArea::vertical()
            .id_salt("outline_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in &rows {
                    let id = row.node.id.as_str();
                    let is_expanded = self.outline.expanded_ids.contains(id);
                    let is_selected = selected_id.as_deref() == Some(id);
                    let is_focused = self.outline.focused_id.as_deref() == Some(id);
                    let is_match = search_matches
                        .as_ref()
                        .is_some_and(|matches| matches.contains(id));

                    ui.horizontal(|ui| {
                        ui.add_space(row.depth as f32 * ROW_INDENT);

                        let glyph = if is_expanded { "⏷" } else { "⏵" };
                        let mut text = RichText::new(format!("{glyph} {}", row.node.name));
                        if is_match {
                            text = text.color(Color32::from_rgb(103, 196, 255));
                        }

                        let response = ui.selectable_label(is_selected || is_focused, text);
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            ui.weak(format_count(row.node.weight));
                        });

                        if scroll_target.as_deref() == Some(id) {
                            response.scroll_to_me(Some(Align::Center));
                        }
                        if response.clicked() {
                            pending_activation = Some(id.to_string());
                        }
                    });

                    if is_expanded && row.node.level == Level::L0 {
                        let indent = (row.depth + 1) as f32 * ROW_INDENT;
                        match self.topics.entry(id) {
                            None => {
                                pending_requests.push(id.to_string());
                                topic_placeholder_row(ui, indent, true, "Loading topics...");
                            }
                            Some(TopicEntry::Loading) => {
                                topic_placeholder_row(ui, indent, true, "Loading topics...");
                            }
                            Some(TopicEntry::Ready(topics)) if topics.is_empty() => {
                                topic_placeholder_row(ui, indent, false, "No topics recorded.");
                            }
                            Some(TopicEntry::Ready(topics)) => {
                                for topic in topics {
                                    ui.horizontal(|ui| {
                                        ui.add_space(indent);
                                        ui.weak(format!("• {}", topic.text));
                                    });
                                }
                            }
                            Some(TopicEntry::Error(message)) => {
                                ui.horizontal(|ui| {
                                    ui.add_space(indent);
                                    ui.colored_label(
                                        Color32::from_rgb(235, 110, 100),
                                        message.as_str(),
                                    );
                                    if ui.link("Retry").clicked() {
                                        pending_retry = Some(id.to_string());
                                    }
                                });
                            }
                        }
                    }
                }
            });

        drop(rows);
        for id in pending_requests {
            self.topics.request(&id);
        }
        if let Some(id) = pending_retry {
            self.topics.retry(&id);
        }
        if let Some(id) = pending_activation {
            self.activate_outline_row(&id);
        }
    }

    /// Pointer-click/Enter semantics: toggle expansion, fetch topics for a
    /// newly opened leaf, and mirror onto the map when sync is enabled.
    fn activate_outline_row(&mut self, id: &str) {
        let level = self.hierarchy.find(id).map(|node| node.level);

        let expanded_now = if self.outline.expanded_ids.contains(id) {
            self.outline.expanded_ids.remove(id);
            false
        } else {
            self.outline.expanded_ids.insert(id.to_string());
            true
        };
        self.outline.focused_id = Some(id.to_string());

        if expanded_now && level == Some(Level::L0) {
            self.topics.request(id);
        }
        if self.nav.state().sync_enabled {
            self.nav.navigate_to_node_by_id(&self.hierarchy, id);
        }
    }

    /// Sync-mode consumer: whenever navigation state changed, additively
    /// expand the breadcrumb and the auto-opened leaves, fetch topics for
    /// leaves that lack a cache entry, and scroll the selection into view.
    fn consume_nav_sync(&mut self) {
        let Some(state) = self.outline_sync.poll(&self.nav) else {
            return;
        };
        if !state.sync_enabled {
            return;
        }

        self.outline
            .expanded_ids
            .extend(state.breadcrumb.iter().cloned());

        for id in &state.expanded_l0_ids {
            if !self.outline.expanded_ids.contains(id) {
                self.outline.expanded_ids.insert(id.clone());
            }
            if self.topics.entry(id).is_none() {
                self.topics.request(id);
            }
        }

        if let Some(selected) = &state.selected_node_id {
            if let Some(path) = self.hierarchy.ancestor_path(selected) {
                for ancestor in path.iter().take(path.len().saturating_sub(1)) {
                    self.outline.expanded_ids.insert(ancestor.id.clone());
                }
            }
            self.outline.focused_id = Some(selected.clone());
            self.outline.scroll_to = Some(selected.clone());
        }
    }

    fn handle_outline_keys(&mut self, ui: &Ui) {
        // Leave the keys alone while a text field (the search box) owns them.
        if ui.ctx().wants_keyboard_input() {
            return;
        }

        let (down, up, right, left, enter) = ui.input(|input| {
            (
                input.key_pressed(Key::ArrowDown),
                input.key_pressed(Key::ArrowUp),
                input.key_pressed(Key::ArrowRight),
                input.key_pressed(Key::ArrowLeft),
                input.key_pressed(Key::Enter),
            )
        });
        if !(down || up || right || left || enter) {
            return;
        }

        let rows = flatten(self.hierarchy.top_level(), &self.outline.expanded_ids);
        if rows.is_empty() {
            return;
        }
        let focused_index = self
            .outline
            .focused_id
            .as_deref()
            .and_then(|id| rows.iter().position(|row| row.node.id == id));

        if down || up {
            let next = match focused_index {
                None => 0,
                Some(index) if down => (index + 1).min(rows.len() - 1),
                Some(index) => index.saturating_sub(1),
            };
            let id = rows[next].node.id.clone();
            self.outline.focused_id = Some(id.clone());
            self.outline.scroll_to = Some(id);
            return;
        }

        let Some(index) = focused_index else {
            return;
        };
        let id = rows[index].node.id.clone();
        let level = rows[index].node.level;
        let expandable = rows[index].node.has_children() || level == Level::L0;
        drop(rows);

        if right && expandable && !self.outline.expanded_ids.contains(&id) {
            self.outline.expanded_ids.insert(id.clone());
            if level == Level::L0 {
                self.topics.request(&id);
            }
        } else if left && self.outline.expanded_ids.contains(&id) {
            self.outline.expanded_ids.remove(&id);
        } else if enter {
            self.activate_outline_row(&id);
        }
    }
}

fn topic_placeholder_row(ui: &mut Ui, indent: f32, spinner: bool, message: &str) {
    ui.horizontal(|ui| {
        ui.add_space(indent);
        if spinner {
            ui.add(egui::Spinner::new().size(12.0));
        }
        ui.weak(message);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::sample_hierarchy;

    fn ids<'a>(rows: &[FlatRow<'a>]) -> Vec<&'a str> {
        rows.iter().map(|row| row.node.id.as_str()).collect()
    }

    #[test]
    fn collapsed_tree_lists_only_top_level() {
        let hierarchy = sample_hierarchy();
        let rows = flatten(hierarchy.top_level(), &HashSet::new());
        assert_eq!(ids(&rows), ["l2-1", "l2-2"]);
        assert!(rows.iter().all(|row| row.depth == 0));
    }

    #[test]
    fn expansion_reveals_children_in_preorder() {
        let hierarchy = sample_hierarchy();
        let expanded = ["l2-1", "l1-2"]
            .iter()
            .map(|id| id.to_string())
            .collect::<HashSet<_>>();

        let rows = flatten(hierarchy.top_level(), &expanded);
        assert_eq!(
            ids(&rows),
            ["l2-1", "l1-1", "l1-2", "l0-3", "l0-4", "l2-2"]
        );
    }

    #[test]
    fn non_ancestor_expansions_do_not_reorder() {
        let hierarchy = sample_hierarchy();

        // Expanding a node under l2-2 must not disturb the relative order
        // of anything outside it.
        let baseline = ["l2-1"]
            .iter()
            .map(|id| id.to_string())
            .collect::<HashSet<_>>();
        let with_extra = ["l2-1", "l2-2", "l1-4"]
            .iter()
            .map(|id| id.to_string())
            .collect::<HashSet<_>>();

        let baseline_rows = ids(&flatten(hierarchy.top_level(), &baseline));
        let extra_rows = flatten(hierarchy.top_level(), &with_extra);
        let extra_ids = ids(&extra_rows);

        let mut cursor = 0;
        for id in &baseline_rows {
            let position = extra_ids[cursor..]
                .iter()
                .position(|other| other == id)
                .expect("baseline row survives");
            cursor += position + 1;
        }
    }

    #[test]
    fn depth_tracks_nesting() {
        let hierarchy = sample_hierarchy();
        let expanded = ["l2-2", "l1-3"]
            .iter()
            .map(|id| id.to_string())
            .collect::<HashSet<_>>();

        let rows = flatten(hierarchy.top_level(), &expanded);
        let depth_of = |target: &str| {
            rows.iter()
                .find(|row| row.node.id == target)
                .map(|row| row.depth)
        };
        assert_eq!(depth_of("l2-2"), Some(0));
        assert_eq!(depth_of("l1-3"), Some(1));
        assert_eq!(depth_of("l0-5"), Some(2));
    }
}
