use eframe::egui::Context;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps || self.fps_current <= f32::EPSILON {
            return None;
        }

        Some(format!(
            "FPS {:.0} | {:.1} ms",
            self.fps_current,
            1000.0 / self.fps_current
        ))
    }
}
