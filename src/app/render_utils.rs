use std::f32::consts::FRAC_PI_2;

use eframe::egui::epaint::{Mesh, TextShape};
use eframe::egui::{Color32, FontId, Painter, Pos2, Rect, Vec2, vec2};

use crate::layout::geometry::Arc;

pub(super) const COLOR_BACKGROUND: Color32 = Color32::from_rgb(0xf7, 0xf7, 0xf7);
pub(super) const COLOR_REPO: Color32 = Color32::from_rgb(0x64, 0xd6, 0xd3);
pub(super) const COLOR_CENTRAL: Color32 = Color32::from_rgb(0xf2, 0xa9, 0x00);
pub(super) const COLOR_CONTRIBUTOR: Color32 = Color32::from_rgb(0xea, 0x9d, 0xf5);
pub(super) const COLOR_ORCA: Color32 = Color32::from_rgb(0x78, 0x3c, 0xe6);
pub(super) const COLOR_TEXT: Color32 = Color32::from_rgb(0x4d, 0x49, 0x50);
pub(super) const COLOR_LINK: Color32 = Color32::from_rgb(0xe8, 0xe8, 0xe8);
pub(super) const COLOR_INSERTIONS: Color32 = Color32::from_rgb(0x78, 0xde, 0xd0);
pub(super) const COLOR_DELETIONS: Color32 = Color32::from_rgb(0xf6, 0xa2, 0xf4);
pub(super) const COLOR_OVERLAP: Color32 = Color32::from_rgb(0x40, 0x70, 0xc4);

const ARC_SEGMENT_PX: f32 = 4.0;

pub(super) fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, (f32::from(a) * alpha.clamp(0.0, 1.0)) as u8)
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

/// Screen-space points along `arc` from `from` to `to` (fractions of the sweep).
pub(super) fn arc_points(arc: Arc, from: f32, to: f32, to_screen: impl Fn(Vec2) -> Pos2) -> Vec<Pos2> {
    let chord = to_screen(arc.point_at(from)) - to_screen(arc.point_at(to));
    let segments = ((chord.length() / ARC_SEGMENT_PX).ceil() as usize).clamp(8, 160);
    (0..=segments)
        .map(|step| to_screen(arc.point_at(from + (to - from) * step as f32 / segments as f32)))
        .collect()
}

/// Triangle strip along `points` whose colour fades from `start` to `end`.
pub(super) fn gradient_polyline(points: &[Pos2], width: f32, start: Color32, end: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    if points.len() < 2 {
        return mesh;
    }

    let half = width * 0.5;
    let last = points.len() - 1;
    for (index, point) in points.iter().enumerate() {
        let tangent = if index == last {
            points[index] - points[index - 1]
        } else {
            points[index + 1] - points[index]
        };
        let normal = vec2(-tangent.y, tangent.x).normalized() * half;
        let color = blend_color(start, end, index as f32 / last as f32);
        mesh.colored_vertex(*point + normal, color);
        mesh.colored_vertex(*point - normal, color);

        if index > 0 {
            let base = (index as u32 - 1) * 2;
            mesh.add_triangle(base, base + 1, base + 2);
            mesh.add_triangle(base + 1, base + 3, base + 2);
        }
    }
    mesh
}

/// Label radiating away from `origin` in direction `angle`, starting at
/// `distance` from it. Labels on the left half are flipped to stay upright.
pub(super) fn radial_text(
    painter: &Painter,
    origin: Pos2,
    angle: f32,
    distance: f32,
    text: String,
    font: FontId,
    color: Color32,
) {
    let galley = painter.layout_no_wrap(text, font, color);
    let size = galley.size();
    let direction = vec2(angle.cos(), angle.sin());
    let center = origin + direction * (distance + size.x * 0.5);
    let upright = if direction.x >= 0.0 {
        angle
    } else {
        angle + std::f32::consts::PI
    };
    let x_axis = vec2(upright.cos(), upright.sin());
    let y_axis = vec2(-upright.sin(), upright.cos());
    let top_left = center - x_axis * (size.x * 0.5) - y_axis * (size.y * 0.5);
    painter.add(TextShape::new(top_left, galley, color).with_angle(upright));
}

/// Writes `text` glyph by glyph along a circle, centred on `mid_angle`.
pub(super) fn text_along_arc(
    painter: &Painter,
    center: Pos2,
    radius: f32,
    mid_angle: f32,
    text: &str,
    font: FontId,
    color: Color32,
) {
    if radius <= 0.0 {
        return;
    }

    let glyphs = text
        .chars()
        .map(|glyph| painter.layout_no_wrap(glyph.to_string(), font.clone(), color))
        .collect::<Vec<_>>();
    let total = glyphs.iter().map(|galley| galley.size().x).sum::<f32>();
    let mut travelled = 0.0;
    for galley in glyphs {
        let width = galley.size().x;
        let height = galley.size().y;
        let angle = mid_angle + (travelled + width * 0.5 - total * 0.5) / radius;
        travelled += width;

        let position = center + vec2(angle.cos(), angle.sin()) * radius;
        let rotation = angle + FRAC_PI_2;
        let x_axis = vec2(rotation.cos(), rotation.sin());
        let y_axis = vec2(-rotation.sin(), rotation.cos());
        let top_left = position - x_axis * (width * 0.5) - y_axis * (height * 0.5);
        painter.add(TextShape::new(top_left, galley, color).with_angle(rotation));
    }
}
