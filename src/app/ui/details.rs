use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::Level;
use crate::util::format_count;

use super::super::ViewModel;
use super::super::topic_cache::TopicEntry;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.add_space(6.0);

        let Some(selected_id) = self.nav.state().selected_node_id.clone() else {
            ui.label("Select a bubble on the map or a row in the outline.");
            return;
        };

        let Some(node) = self.hierarchy.find(&selected_id) else {
            ui.label("The selected cluster is no longer part of the hierarchy.");
            return;
        };

        ui.label(RichText::new(&node.name).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Level: {}", node.level.label()));
        ui.label(format!("Conversations: {}", format_count(node.weight)));
        if node.has_children() {
            ui.label(format!("Subclusters: {}", node.children.len()));
        }

        if let Some(path) = self.hierarchy.ancestor_path(&selected_id)
            && path.len() > 1
        {
            let trail = path
                .iter()
                .map(|ancestor| ancestor.name.as_str())
                .collect::<Vec<_>>()
                .join(" › ");
            ui.add_space(4.0);
            ui.weak(trail);
        }

        if node.level != Level::L0 {
            return;
        }

        ui.separator();
        ui.label(RichText::new("Topics").strong());

        if self.topics.entry(&selected_id).is_none() {
            self.topics.request(&selected_id);
        }

        let mut retry = false;
        match self.topics.entry(&selected_id) {
            None | Some(TopicEntry::Loading) => {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new().size(12.0));
                    ui.weak("Loading topics...");
                });
            }
            Some(TopicEntry::Ready(topics)) if topics.is_empty() => {
                ui.weak("No topics recorded for this subcluster.");
            }
            Some(TopicEntry::Ready(topics)) => {
                egui::ScrollArea::vertical()
                    .id_salt("details_topics_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for topic in topics {
                            ui.label(format!("• {}", topic.text));
                            ui.add_space(2.0);
                        }
                    });
            }
            Some(TopicEntry::Error(message)) => {
                ui.colored_label(Color32::from_rgb(235, 110, 100), message.as_str());
                if ui.link("Retry").clicked() {
                    retry = true;
                }
            }
        }

        if retry {
            self.topics.retry(&selected_id);
        }
    }
}
