use std::f32::consts::TAU;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Rect, Sense, Stroke, Ui, pos2, vec2};

use crate::data::Level;
use crate::layout::{PackedNode, pack_hierarchy};
use crate::util::format_count;

use super::super::camera::{Camera, fit_zoom};
use super::super::color;
use super::super::render_utils::{
    circle_visible, dashed_circle, draw_background, fill_radial_gradient, glow_halo,
    wrap_two_lines,
};
use super::super::{LayoutKey, ViewModel};
use super::interaction::hit_test;

/// Selection pulse cycle, driven by wall-clock time modulo this period.
const PULSE_PERIOD: f64 = 2.0;
/// Current-level bubbles narrower than this on screen stay unlabeled.
const LABEL_MIN_SCREEN_RADIUS: f32 = 26.0;

impl ViewModel {
    pub(in crate::app) fn draw_map(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        if rect.width() < 1.0 || rect.height() < 1.0 {
            return;
        }

        let now = ui.input(|input| input.time);
        self.ensure_layout(rect, now);

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.rig.camera());

        if let Some(error) = self.layout_error.clone() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                error,
                FontId::proportional(14.0),
                Color32::from_gray(200),
            );
            return;
        }

        self.handle_map_zoom(ui, rect, &response);
        self.handle_map_pan(&response);
        self.rig.step(now, ui.ctx());

        let camera = self.rig.camera();
        let hovered = response
            .hover_pos()
            .and_then(|pointer| hit_test(&self.packed, camera, rect, pointer));

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            match hovered {
                Some(index) => {
                    let id = self.packed[index].id.clone();
                    if self.packed[index].has_children {
                        self.nav.select_and_drill(&self.hierarchy, &id);
                    } else {
                        self.nav.select_node(&self.hierarchy, Some(&id));
                    }
                }
                None => self.nav.select_node(&self.hierarchy, None),
            }
        }

        if response.double_clicked() && hovered.is_none() {
            match self.nav.state().breadcrumb.len() {
                0 => {}
                1 => self.nav.navigate_breadcrumb(None),
                len => self.nav.navigate_breadcrumb(Some(len - 2)),
            }
        }

        let selected_id = self.nav.state().selected_node_id.clone();
        let search_matches = self.search_matches();

        // Deepest first, so current-level bubbles paint over the glow
        // halos of their descendants.
        let mut order = (0..self.packed.len())
            .filter(|&index| self.packed[index].depth > 0)
            .collect::<Vec<_>>();
        order.sort_by(|&a, &b| self.packed[b].depth.cmp(&self.packed[a].depth));

        for index in order {
            let node = &self.packed[index];
            let center = camera.to_screen(rect, pos2(node.x, node.y));
            let radius = camera.screen_radius(node.r);
            if radius < 0.5 || !circle_visible(rect, center, radius) {
                continue;
            }

            let is_current_level = node.depth == 1;
            let is_selected = selected_id.as_deref() == Some(node.id.as_str());
            let is_hovered = hovered == Some(index);
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&node.id));

            let base = self.base_color_for(index);
            let display = if is_current_level {
                color::glowy_shade(base)
            } else {
                color::darker_shade(base)
            };

            if is_current_level {
                fill_radial_gradient(
                    &painter,
                    center,
                    radius,
                    color::gradient_inner(display),
                    display,
                );
            } else {
                glow_halo(
                    &painter,
                    center,
                    radius,
                    radius * 1.18 + 3.0,
                    color::with_alpha(display, 70),
                );
                fill_radial_gradient(
                    &painter,
                    center,
                    radius,
                    color::with_alpha(color::gradient_inner(display), 165),
                    color::with_alpha(display, 165),
                );
            }

            let border = color::border_color(display);
            if is_selected {
                let phase = ((now % PULSE_PERIOD) / PULSE_PERIOD) as f32;
                let wave = 0.5 - 0.5 * (phase * TAU).cos();
                let halo_radius = (radius * (1.05 + 0.30 * wave)).max(radius + 1.0);
                let halo_alpha = (40.0 + 150.0 * (1.0 - wave)) as u8;
                glow_halo(
                    &painter,
                    center,
                    radius,
                    halo_radius,
                    color::with_alpha(color::brighten(display, 0.2), halo_alpha),
                );
                painter.circle_stroke(
                    center,
                    radius,
                    Stroke::new(3.0, color::brighten(border, 0.35)),
                );
            } else if is_hovered {
                painter.circle_stroke(
                    center,
                    radius,
                    Stroke::new(2.4, color::brighten(border, 0.25)),
                );
            } else if is_search_match {
                painter.circle_stroke(
                    center,
                    radius,
                    Stroke::new(2.0, Color32::from_rgb(103, 196, 255)),
                );
            } else if is_current_level {
                painter.circle_stroke(center, radius, Stroke::new(1.6, border));
            } else {
                dashed_circle(
                    &painter,
                    center,
                    radius,
                    Stroke::new(1.0, color::with_alpha(border, 150)),
                );
            }

            if is_current_level && radius > LABEL_MIN_SCREEN_RADIUS {
                draw_node_label(&painter, node, center, radius, display);
            }
        }

        if let Some(index) = hovered {
            let node = &self.packed[index];
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!(
                    "{}  |  {}  |  {} conversations",
                    node.name,
                    node.level.label(),
                    format_count(node.weight)
                ),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        // The pulse runs as long as something is selected; one repaint per
        // frame keeps it ticking without a timer.
        if selected_id.is_some() {
            ui.ctx().request_repaint();
        }
    }

    /// Recomputes the layout when the view root or the canvas changed, and
    /// retargets the camera: eased when navigating, snapped on resize.
    fn ensure_layout(&mut self, rect: Rect, now: f64) {
        let key = LayoutKey {
            root_id: self.nav.state().current_root_id.clone(),
            width: rect.width().round() as i32,
            height: rect.height().round() as i32,
        };
        if self.layout_key.as_ref() == Some(&key) {
            return;
        }

        let root_changed = self
            .layout_key
            .as_ref()
            .is_none_or(|previous| previous.root_id != key.root_id);
        let had_layout = self.layout_key.is_some();

        let view_root = key
            .root_id
            .as_deref()
            .and_then(|id| self.hierarchy.find(id))
            .unwrap_or_else(|| self.hierarchy.root());

        match pack_hierarchy(view_root, rect.width(), rect.height()) {
            Ok(packed) => {
                let fit = fit_zoom(&packed, rect.width(), rect.height());
                if root_changed && had_layout {
                    // Start the eased transition from a camera that shows
                    // the shared circle where it was on screen, so drilling
                    // reads as zooming in and backing out as zooming out.
                    if let Some(start) =
                        continuity_camera(&self.packed, &packed, self.rig.camera(), rect)
                    {
                        self.rig.snap_to(start);
                    }
                    self.packed = packed;
                    self.layout_error = None;
                    self.rig.animate_to(fit, now);
                } else {
                    self.packed = packed;
                    self.layout_error = None;
                    self.rig.snap_to(fit);
                }
            }
            Err(error) => {
                log::error!("layout failed: {error}");
                self.packed.clear();
                self.layout_error = Some(error.to_string());
            }
        }

        self.layout_key = Some(key);
    }

    /// Base color from the node's L2 ancestor: first through the packed
    /// parent chain, falling back to the full hierarchy when the view root
    /// is itself nested below its category.
    fn base_color_for(&self, index: usize) -> Color32 {
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            let node = &self.packed[current];
            if node.level == Level::L2 {
                return self.category_color(&node.id);
            }
            cursor = node.parent;
        }

        let id = &self.packed[index].id;
        match self.hierarchy.nearest_l2_ancestor(id) {
            Some(category) => self.category_color(&category.id),
            None => self.category_color(id),
        }
    }

    fn category_color(&self, l2_id: &str) -> Color32 {
        let position = self
            .hierarchy
            .top_level_position(l2_id)
            .unwrap_or(usize::MAX);
        color::base_color(position, l2_id)
    }
}

/// Camera over the new layout that renders a circle present in both
/// layouts at the same screen position and size as the old camera did.
/// The pivot is the new view root when drilling down, or the old view
/// root when navigating back up; `None` when the layouts share neither.
fn continuity_camera(
    old_packed: &[PackedNode],
    new_packed: &[PackedNode],
    old_camera: Camera,
    rect: Rect,
) -> Option<Camera> {
    let (old_pivot, new_pivot) = [new_packed.first()?.id.as_str(), old_packed.first()?.id.as_str()]
        .into_iter()
        .find_map(|pivot_id| {
            let old = old_packed.iter().find(|node| node.id == pivot_id)?;
            let new = new_packed.iter().find(|node| node.id == pivot_id)?;
            Some((old, new))
        })?;

    let screen_center = old_camera.to_screen(rect, pos2(old_pivot.x, old_pivot.y));
    let screen_radius = old_camera.screen_radius(old_pivot.r);
    if new_pivot.r <= 0.0 || screen_radius <= 0.0 {
        return None;
    }

    let k = screen_radius / new_pivot.r;
    let center = vec2(rect.width() / 2.0, rect.height() / 2.0);
    let translation =
        (screen_center - rect.min - center) / k + center - vec2(new_pivot.x, new_pivot.y);

    Some(Camera {
        k,
        x: translation.x,
        y: translation.y,
    })
}

fn draw_node_label(
    painter: &Painter,
    node: &PackedNode,
    center: egui::Pos2,
    radius: f32,
    display: Color32,
) {
    let font_size = (radius * 0.24).clamp(10.0, 19.0);
    let max_chars = ((radius * 1.7) / (font_size * 0.55)).max(6.0) as usize;
    let (first, second) = wrap_two_lines(&node.name, max_chars);
    if first.is_empty() {
        return;
    }

    let font = FontId::proportional(font_size);
    let text = color::text_color(display);
    match second {
        None => {
            painter.text(center, Align2::CENTER_CENTER, first, font, text);
        }
        Some(second) => {
            let half_line = font_size * 0.58;
            painter.text(
                center - vec2(0.0, half_line),
                Align2::CENTER_CENTER,
                first,
                font.clone(),
                text,
            );
            painter.text(
                center + vec2(0.0, half_line),
                Align2::CENTER_CENTER,
                second,
                font,
                text,
            );
        }
    }
}
