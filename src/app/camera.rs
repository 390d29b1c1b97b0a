use eframe::egui::{Context, Pos2, Rect, pos2, vec2};

use crate::layout::PackedNode;

/// Fraction of the viewport left free on each side by a fit.
const FIT_PADDING: f32 = 0.10;
/// Duration of an eased camera transition, in seconds.
const ZOOM_ANIMATION_SECS: f64 = 0.9;

pub(in crate::app) const MIN_ZOOM: f32 = 0.05;
pub(in crate::app) const MAX_ZOOM: f32 = 6.0;

/// Lets the animator ask the host for another frame without knowing which
/// event loop is driving it.
pub(in crate::app) trait FrameScheduler {
    fn request_frame(&self);
}

impl FrameScheduler for Context {
    fn request_frame(&self) {
        self.request_repaint();
    }
}

/// Scale and translation over the layout plane. The screen transform is:
/// translate to the canvas center, scale by `k`, translate by
/// `(-center + (x, y))`; hit-testing runs the inverse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Camera {
    pub k: f32,
    pub x: f32,
    pub y: f32,
}

impl Camera {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn to_screen(&self, rect: Rect, world: Pos2) -> Pos2 {
        let center = vec2(rect.width() / 2.0, rect.height() / 2.0);
        let offset = world.to_vec2() - center + vec2(self.x, self.y);
        rect.min + center + offset * self.k
    }

    pub fn to_world(&self, rect: Rect, screen: Pos2) -> Pos2 {
        let center = vec2(rect.width() / 2.0, rect.height() / 2.0);
        let offset = (screen - rect.min - center) / self.k;
        pos2(0.0, 0.0) + offset + center - vec2(self.x, self.y)
    }

    pub fn screen_radius(&self, r: f32) -> f32 {
        r * self.k
    }
}

/// Camera framing every packed node below the view root with 10% padding.
/// Never scales past native size: `0 < k <= 1`.
pub(in crate::app) fn fit_zoom(packed: &[PackedNode], width: f32, height: f32) -> Camera {
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for node in packed.iter().filter(|node| node.depth > 0) {
        min_x = min_x.min(node.x - node.r);
        max_x = max_x.max(node.x + node.r);
        min_y = min_y.min(node.y - node.r);
        max_y = max_y.max(node.y + node.r);
    }

    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return Camera::IDENTITY;
    }

    let box_width = (max_x - min_x).max(1e-3);
    let box_height = (max_y - min_y).max(1e-3);
    let scale_x = width * (1.0 - 2.0 * FIT_PADDING) / box_width;
    let scale_y = height * (1.0 - 2.0 * FIT_PADDING) / box_height;
    let k = scale_x.min(scale_y).min(1.0).max(MIN_ZOOM);

    // Centering the box is scale-independent under this transform.
    let x = width / 2.0 - (min_x + max_x) / 2.0;
    let y = height / 2.0 - (min_y + max_y) / 2.0;

    Camera { k, x, y }
}

struct ZoomAnimation {
    from: Camera,
    to: Camera,
    start: f64,
}

impl ZoomAnimation {
    /// Eased camera at `now`; the bool reports completion.
    fn sample(&self, now: f64) -> (Camera, bool) {
        let t = ((now - self.start) / ZOOM_ANIMATION_SECS).clamp(0.0, 1.0) as f32;
        if t >= 1.0 {
            // Exact snap: no residual drift from the easing curve.
            return (self.to, true);
        }

        let eased = ease_out_cubic(t);
        let camera = Camera {
            k: lerp(self.from.k, self.to.k, eased),
            x: lerp(self.from.x, self.to.x, eased),
            y: lerp(self.from.y, self.to.y, eased),
        };
        (camera, false)
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    let inverse = 1.0 - t;
    1.0 - inverse * inverse * inverse
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Owns the live camera and at most one in-flight transition. A new target
/// replaces (never composes with) the previous animation.
pub(in crate::app) struct CameraRig {
    camera: Camera,
    animation: Option<ZoomAnimation>,
}

impl CameraRig {
    pub fn new() -> Self {
        Self {
            camera: Camera::IDENTITY,
            animation: None,
        }
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animate_to(&mut self, target: Camera, now: f64) {
        self.animation = Some(ZoomAnimation {
            from: self.camera,
            to: target,
            start: now,
        });
    }

    /// Jump without easing, cancelling any in-flight animation.
    pub fn snap_to(&mut self, target: Camera) {
        self.camera = target;
        self.animation = None;
    }

    /// A manual gesture takes over the camera and cancels the animation.
    pub fn steer(&mut self, camera: Camera) {
        self.camera = camera;
        self.animation = None;
    }

    /// Advances the in-flight animation, asking for another frame while one
    /// is running. Self-terminates on reaching the target.
    pub fn step(&mut self, now: f64, scheduler: &dyn FrameScheduler) {
        let Some(animation) = &self.animation else {
            return;
        };

        let (camera, done) = animation.sample(now);
        self.camera = camera;
        if done {
            self.animation = None;
        } else {
            scheduler.request_frame();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::sample_hierarchy;
    use crate::layout::pack_hierarchy;
    use std::cell::Cell;

    struct CountingScheduler {
        frames: Cell<usize>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&self) {
            self.frames.set(self.frames.get() + 1);
        }
    }

    #[test]
    fn transform_roundtrips() {
        let camera = Camera {
            k: 0.4,
            x: 120.0,
            y: -35.0,
        };
        let rect = Rect::from_min_size(pos2(40.0, 80.0), vec2(800.0, 600.0));

        let world = pos2(512.0, 377.0);
        let screen = camera.to_screen(rect, world);
        let back = camera.to_world(rect, screen);
        assert!((back.x - world.x).abs() < 1e-3);
        assert!((back.y - world.y).abs() < 1e-3);
    }

    #[test]
    fn identity_camera_maps_layout_onto_the_rect() {
        let rect = Rect::from_min_size(pos2(100.0, 50.0), vec2(640.0, 480.0));
        let screen = Camera::IDENTITY.to_screen(rect, pos2(10.0, 20.0));
        assert!((screen.x - 110.0).abs() < 1e-4);
        assert!((screen.y - 70.0).abs() < 1e-4);
    }

    #[test]
    fn fit_zoom_never_magnifies() {
        let hierarchy = sample_hierarchy();
        let packed = pack_hierarchy(hierarchy.root(), 1280.0, 720.0).expect("packs");
        let camera = fit_zoom(&packed, 1280.0, 720.0);
        assert!(camera.k > 0.0);
        assert!(camera.k <= 1.0);
    }

    #[test]
    fn fit_zoom_frames_every_visible_node() {
        let hierarchy = sample_hierarchy();
        let (width, height) = (1280.0, 720.0);
        let packed = pack_hierarchy(hierarchy.root(), width, height).expect("packs");
        let camera = fit_zoom(&packed, width, height);
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(width, height));

        for node in packed.iter().filter(|node| node.depth > 0) {
            let center = camera.to_screen(rect, pos2(node.x, node.y));
            let radius = camera.screen_radius(node.r);
            assert!(center.x - radius >= -1.0 && center.x + radius <= width + 1.0);
            assert!(center.y - radius >= -1.0 && center.y + radius <= height + 1.0);
        }
    }

    #[test]
    fn fit_zoom_of_nothing_is_identity() {
        assert_eq!(fit_zoom(&[], 800.0, 600.0), Camera::IDENTITY);
    }

    #[test]
    fn animation_snaps_exactly_to_the_target() {
        let scheduler = CountingScheduler {
            frames: Cell::new(0),
        };
        let mut rig = CameraRig::new();
        let target = Camera {
            k: 0.5,
            x: 80.0,
            y: -40.0,
        };

        rig.animate_to(target, 0.0);
        rig.step(0.45, &scheduler);
        assert!(rig.is_animating());
        assert_ne!(rig.camera(), target);
        assert_eq!(scheduler.frames.get(), 1);

        rig.step(1.2, &scheduler);
        assert!(!rig.is_animating());
        assert_eq!(rig.camera(), target);
        assert_eq!(scheduler.frames.get(), 1);
    }

    #[test]
    fn a_new_target_replaces_the_previous_animation() {
        let scheduler = CountingScheduler {
            frames: Cell::new(0),
        };
        let mut rig = CameraRig::new();
        rig.animate_to(
            Camera {
                k: 0.2,
                x: 10.0,
                y: 10.0,
            },
            0.0,
        );
        rig.step(0.3, &scheduler);

        let second = Camera {
            k: 0.9,
            x: -5.0,
            y: 25.0,
        };
        rig.animate_to(second, 0.3);
        rig.step(5.0, &scheduler);
        assert_eq!(rig.camera(), second);
    }

    #[test]
    fn steering_cancels_the_animation() {
        let mut rig = CameraRig::new();
        rig.animate_to(
            Camera {
                k: 0.2,
                x: 0.0,
                y: 0.0,
            },
            0.0,
        );
        let manual = Camera {
            k: 2.0,
            x: 3.0,
            y: 4.0,
        };
        rig.steer(manual);
        assert!(!rig.is_animating());
        assert_eq!(rig.camera(), manual);
    }

    #[test]
    fn easing_is_monotonic() {
        let mut last = 0.0;
        for step in 0..=20 {
            let eased = ease_out_cubic(step as f32 / 20.0);
            assert!(eased >= last);
            last = eased;
        }
        assert!((ease_out_cubic(1.0) - 1.0).abs() < 1e-6);
    }
}
