use eframe::egui::{self, Pos2, Rect, Ui, vec2};

use crate::layout::PackedNode;

use super::super::ViewModel;
use super::super::camera::{Camera, MAX_ZOOM, MIN_ZOOM};

/// Pointer to node resolution: inverse camera transform into layout space,
/// then candidates checked smallest radius first so the innermost circle
/// wins wherever ancestors overlap. The view root itself is not hittable.
pub(in crate::app) fn hit_test(
    packed: &[PackedNode],
    camera: Camera,
    rect: Rect,
    pointer: Pos2,
) -> Option<usize> {
    let world = camera.to_world(rect, pointer);

    let mut candidates = (0..packed.len())
        .filter(|&index| packed[index].depth > 0)
        .collect::<Vec<_>>();
    candidates.sort_by(|&a, &b| packed[a].r.total_cmp(&packed[b].r));

    candidates
        .into_iter()
        .find(|&index| packed[index].contains(world.x, world.y))
}

impl ViewModel {
    pub(in crate::app) fn handle_map_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let camera = self.rig.camera();
        let world_before = camera.to_world(rect, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        let k = (camera.k * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Translation that keeps the point under the cursor fixed.
        let center = vec2(rect.width() / 2.0, rect.height() / 2.0);
        let translation =
            (pointer - rect.min - center) / k + center - world_before.to_vec2();

        self.rig.steer(Camera {
            k,
            x: translation.x,
            y: translation.y,
        });
    }

    pub(in crate::app) fn handle_map_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            let camera = self.rig.camera();
            let delta = response.drag_delta() / camera.k;
            self.rig.steer(Camera {
                k: camera.k,
                x: camera.x + delta.x,
                y: camera.y + delta.y,
            });
        }
    }
}
