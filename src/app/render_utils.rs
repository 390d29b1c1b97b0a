use std::f32::consts::TAU;

use eframe::egui::{Color32, Mesh, Painter, Pos2, Rect, Shape, Stroke, vec2};

use super::camera::Camera;

const GRADIENT_SEGMENTS: u32 = 48;

/// Two-stop radial gradient: `inner` at the center fading to `outer` at the
/// rim. egui has no gradient primitive, so this builds a triangle fan.
pub(in crate::app) fn fill_radial_gradient(
    painter: &Painter,
    center: Pos2,
    radius: f32,
    inner: Color32,
    outer: Color32,
) {
    if radius <= 0.0 {
        return;
    }

    let mut mesh = Mesh::default();
    mesh.colored_vertex(center, inner);
    for segment in 0..=GRADIENT_SEGMENTS {
        let angle = segment as f32 / GRADIENT_SEGMENTS as f32 * TAU;
        mesh.colored_vertex(center + vec2(angle.cos(), angle.sin()) * radius, outer);
    }
    for segment in 0..GRADIENT_SEGMENTS {
        mesh.add_triangle(0, segment + 1, segment + 2);
    }
    painter.add(mesh);
}

/// Soft ring from `inner_radius` out to `outer_radius`, fading to fully
/// transparent at the outer edge.
pub(in crate::app) fn glow_halo(
    painter: &Painter,
    center: Pos2,
    inner_radius: f32,
    outer_radius: f32,
    color: Color32,
) {
    if outer_radius <= inner_radius {
        return;
    }

    let transparent = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), 0);
    let mut mesh = Mesh::default();
    for segment in 0..=GRADIENT_SEGMENTS {
        let angle = segment as f32 / GRADIENT_SEGMENTS as f32 * TAU;
        let direction = vec2(angle.cos(), angle.sin());
        mesh.colored_vertex(center + direction * inner_radius, color);
        mesh.colored_vertex(center + direction * outer_radius, transparent);
    }
    for segment in 0..GRADIENT_SEGMENTS {
        let base = segment * 2;
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base + 1, base + 3, base + 2);
    }
    painter.add(mesh);
}

pub(in crate::app) fn dashed_circle(painter: &Painter, center: Pos2, radius: f32, stroke: Stroke) {
    let segments = ((radius * 0.8) as u32).clamp(24, 96);
    let points = (0..=segments)
        .map(|segment| {
            let angle = segment as f32 / segments as f32 * TAU;
            center + vec2(angle.cos(), angle.sin()) * radius
        })
        .collect::<Vec<_>>();
    painter.extend(Shape::dashed_line(&points, stroke, 5.0, 4.0));
}

pub(in crate::app) fn draw_background(painter: &Painter, rect: Rect, camera: Camera) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (64.0 * camera.k.clamp(0.6, 1.8)).max(22.0);
    let origin = rect.center() + vec2(camera.x, camera.y) * camera.k;
    let grid_stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 48));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            grid_stroke,
        );
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            grid_stroke,
        );
        y += step;
    }
}

pub(in crate::app) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Word-wraps a label onto at most two lines of roughly `max_chars` each.
/// Overflow past the second line is ellipsized.
pub(in crate::app) fn wrap_two_lines(text: &str, max_chars: usize) -> (String, Option<String>) {
    let max_chars = max_chars.max(4);
    let mut words = text.split_whitespace();
    let Some(first_word) = words.next() else {
        return (String::new(), None);
    };

    let mut first = crate::util::truncate_label(first_word, max_chars);
    let mut rest = Vec::new();
    for word in words {
        if rest.is_empty() && first.chars().count() + 1 + word.chars().count() <= max_chars {
            first.push(' ');
            first.push_str(word);
        } else {
            rest.push(word);
        }
    }

    if rest.is_empty() {
        (first, None)
    } else {
        (
            first,
            Some(crate::util::truncate_label(&rest.join(" "), max_chars)),
        )
    }
}
