use eframe::egui::Color32;

use crate::util::stable_unit;

/// Base colors for top-level categories, in assignment order.
const BASE_PALETTE: [Color32; 8] = [
    Color32::from_rgb(0x4e, 0x79, 0xa7),
    Color32::from_rgb(0xf2, 0x8e, 0x2b),
    Color32::from_rgb(0x59, 0xa1, 0x4f),
    Color32::from_rgb(0xe1, 0x57, 0x59),
    Color32::from_rgb(0xb0, 0x7a, 0xa1),
    Color32::from_rgb(0x76, 0xb7, 0xb2),
    Color32::from_rgb(0xed, 0xc9, 0x48),
    Color32::from_rgb(0x9c, 0x75, 0x5f),
];

/// Base color for the top-level category at `position`. Categories past the
/// palette get a hue hashed from their id, golden-angle spaced so nearby
/// hash values stay visually apart.
pub(in crate::app) fn base_color(position: usize, id: &str) -> Color32 {
    if let Some(color) = BASE_PALETTE.get(position) {
        return *color;
    }

    let hue = (stable_unit(id) + position as f32 * 0.381_966) % 1.0;
    hsl_to_rgb(hue, 0.52, 0.55)
}

/// Brightened shade for current-level bubbles.
pub(in crate::app) fn glowy_shade(base: Color32) -> Color32 {
    let (h, s, l) = rgb_to_hsl(base);
    hsl_to_rgb(h, (s * 1.15).min(1.0), (l * 1.12).clamp(0.0, 0.78))
}

/// Muted shade for deeper, decluttered bubbles.
pub(in crate::app) fn darker_shade(base: Color32) -> Color32 {
    let (h, s, l) = rgb_to_hsl(base);
    hsl_to_rgb(h, s * 0.55, (l * 0.6).max(0.12))
}

/// Border color with lightness clamped low enough to stay legible on the
/// display color it outlines.
pub(in crate::app) fn border_color(display: Color32) -> Color32 {
    let (h, s, l) = rgb_to_hsl(display);
    hsl_to_rgb(h, s, (l * 0.55).min(0.32))
}

/// Label color: a deeper clamp than the border for text contrast.
pub(in crate::app) fn text_color(display: Color32) -> Color32 {
    let (h, s, l) = rgb_to_hsl(display);
    hsl_to_rgb(h, (s * 0.85).min(1.0), (l * 0.4).min(0.22))
}

/// Inner stop of the two-stop radial gradient fill.
pub(in crate::app) fn gradient_inner(display: Color32) -> Color32 {
    let (h, s, l) = rgb_to_hsl(display);
    hsl_to_rgb(h, s, (l + 0.10).min(0.88))
}

pub(in crate::app) fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

pub(in crate::app) fn brighten(color: Color32, amount: f32) -> Color32 {
    let (h, s, l) = rgb_to_hsl(color);
    hsl_to_rgb(h, s, (l + amount).clamp(0.0, 1.0))
}

fn rgb_to_hsl(color: Color32) -> (f32, f32, f32) {
    let r = color.r() as f32 / 255.0;
    let g = color.g() as f32 / 255.0;
    let b = color.b() as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f32::EPSILON {
        return (0.0, 0.0, l);
    }

    let delta = max - min;
    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let h = if (max - r).abs() < f32::EPSILON {
        ((g - b) / delta + if g < b { 6.0 } else { 0.0 }) / 6.0
    } else if (max - g).abs() < f32::EPSILON {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    (h, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Color32 {
    if s <= f32::EPSILON {
        let gray = (l * 255.0).round() as u8;
        return Color32::from_rgb(gray, gray, gray);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let channel = |mut t: f32| -> u8 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let value = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 1.0 / 2.0 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (value * 255.0).round() as u8
    };

    Color32::from_rgb(
        channel(h + 1.0 / 3.0),
        channel(h),
        channel(h - 1.0 / 3.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lightness(color: Color32) -> f32 {
        rgb_to_hsl(color).2
    }

    #[test]
    fn palette_positions_are_fixed() {
        assert_eq!(base_color(0, "whatever"), BASE_PALETTE[0]);
        assert_eq!(base_color(7, "whatever"), BASE_PALETTE[7]);
    }

    #[test]
    fn overflow_positions_hash_deterministically() {
        let a = base_color(8, "category-nine");
        let b = base_color(8, "category-nine");
        assert_eq!(a, b);
        assert_ne!(base_color(8, "category-nine"), base_color(9, "category-ten"));
    }

    #[test]
    fn hsl_roundtrip_is_close() {
        for color in BASE_PALETTE {
            let (h, s, l) = rgb_to_hsl(color);
            let back = hsl_to_rgb(h, s, l);
            assert!((color.r() as i32 - back.r() as i32).abs() <= 2);
            assert!((color.g() as i32 - back.g() as i32).abs() <= 2);
            assert!((color.b() as i32 - back.b() as i32).abs() <= 2);
        }
    }

    #[test]
    fn glowy_is_lighter_and_darker_is_darker() {
        for color in BASE_PALETTE {
            assert!(lightness(glowy_shade(color)) >= lightness(color) - 1e-3);
            assert!(lightness(darker_shade(color)) < lightness(color));
        }
    }

    #[test]
    fn border_and_text_stay_dark_enough_to_read() {
        // Quantizing to u8 channels can nudge lightness by ~1/255.
        for color in BASE_PALETTE {
            let display = glowy_shade(color);
            assert!(lightness(border_color(display)) <= 0.32 + 0.01);
            assert!(lightness(text_color(display)) <= 0.22 + 0.01);
        }
    }
}
