use eframe::egui::{self, Align, Context, Layout, Ui};

use crate::util::{format_count, truncate_label};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_panels(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("clioscope");
                    ui.separator();
                    self.draw_breadcrumb(ui);
                    ui.separator();

                    let mut sync = self.nav.state().sync_enabled;
                    if ui
                        .toggle_value(&mut sync, "Sync views")
                        .on_hover_text(
                            "Mirror selection and drill-down between the map and the outline.",
                        )
                        .changed()
                    {
                        self.nav.toggle_sync_mode();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.toggle_value(&mut self.show_fps, "fps");
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                        ui.label(format!(
                            "{} clusters / {} leaves",
                            format_count(self.hierarchy.node_count() as u64),
                            format_count(self.hierarchy.leaf_count() as u64)
                        ));
                    });
                });
            });

        egui::SidePanel::left("outline")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_outline(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_map(ui));
    }

    fn draw_breadcrumb(&mut self, ui: &mut Ui) {
        let trail = self
            .nav
            .state()
            .breadcrumb
            .iter()
            .map(|id| {
                let name = self
                    .hierarchy
                    .find(id)
                    .map(|node| node.name.clone())
                    .unwrap_or_else(|| id.clone());
                (id.clone(), name)
            })
            .collect::<Vec<_>>();

        let at_root = trail.is_empty();
        if at_root {
            ui.strong("All clusters");
        } else if ui.link("All clusters").clicked() {
            self.nav.navigate_breadcrumb(None);
        }

        for (index, (id, name)) in trail.iter().enumerate() {
            ui.label("›");
            let label = truncate_label(name, 28);
            if index + 1 == trail.len() {
                ui.strong(label);
            } else if ui.link(label).on_hover_text(id).clicked() {
                self.nav.navigate_breadcrumb(Some(index));
            }
        }
    }
}
