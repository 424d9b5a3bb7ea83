use std::f32::consts::FRAC_PI_2;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Sense, Shape, Stroke, Ui, vec2};

use crate::data::{NodeKind, OrbitGraph, OrbitNode};
use crate::layout::RingGeometry;
use crate::layout::geometry::{Arc, ArcSide, arc_between};
use crate::util::split_repo_name;

use super::super::render_utils::{
    COLOR_BACKGROUND, COLOR_CENTRAL, COLOR_CONTRIBUTOR, COLOR_LINK, COLOR_ORCA, COLOR_REPO,
    COLOR_TEXT, arc_points, circle_visible, gradient_polyline, radial_text, text_along_arc,
    with_alpha,
};
use super::OrbitView;
use super::details::{TooltipLine, tooltip_lines};
use super::interaction::Camera;

const DIMMED_ALPHA: f32 = 0.3;
const TENURE_GAP: f32 = 4.0;
const LABEL_MIN_ZOOM: f32 = 0.25;

fn node_color(node: &OrbitNode) -> Color32 {
    match node.kind {
        NodeKind::Contributor => COLOR_CONTRIBUTOR,
        NodeKind::Repository => COLOR_REPO,
        NodeKind::CentralRepository => COLOR_CENTRAL,
    }
}

fn label_font(camera: Camera, size: f32) -> FontId {
    FontId::proportional(camera.scale(size).clamp(7.0, 28.0))
}

fn draw_rings(painter: &Painter, graph: &OrbitGraph, camera: Camera, rings: RingGeometry) {
    let center = camera.to_screen(egui::Vec2::ZERO);
    let band = camera.scale(rings.band_width());
    let has_outer = graph.contributors().any(|index| !graph.nodes[index].is_orca_supported());

    painter.circle_stroke(
        center,
        camera.scale(rings.radius),
        Stroke::new(band, with_alpha(COLOR_ORCA, 0.06)),
    );
    if has_outer {
        painter.circle_stroke(
            center,
            camera.scale(rings.outer_radius),
            Stroke::new(band, with_alpha(COLOR_CONTRIBUTOR, 0.1)),
        );
    }

    if camera.zoom < LABEL_MIN_ZOOM {
        return;
    }
    let font = label_font(camera, 14.0);
    text_along_arc(
        painter,
        center,
        camera.scale(rings.radius) - band * 0.5 + font.size,
        -FRAC_PI_2,
        "contributors supported through ORCA",
        font.clone(),
        COLOR_ORCA,
    );
    if has_outer {
        text_along_arc(
            painter,
            center,
            camera.scale(rings.outer_radius) + band * 0.5 - font.size,
            -FRAC_PI_2,
            "other top contributors",
            font,
            COLOR_TEXT,
        );
    }
}

fn link_arc(graph: &OrbitGraph, source: usize, target: usize) -> Option<Arc> {
    let from = graph.nodes[source].position;
    let to = graph.nodes[target].position;
    arc_between(from, to, (to - from).length(), ArcSide::CounterClockwise)
}

fn draw_link(painter: &Painter, graph: &OrbitGraph, link_index: usize, camera: Camera, alpha: f32) {
    let link = &graph.links[link_index];
    let Some(arc) = link_arc(graph, link.source, link.target) else {
        return;
    };
    let length = arc.length();
    if length <= f32::EPSILON {
        return;
    }

    let source = &graph.nodes[link.source];
    let target = &graph.nodes[link.target];
    let from = (source.radius / length).min(1.0);
    let to = 1.0 - (target.radius / length).min(1.0);
    if from >= to {
        return;
    }

    let points = arc_points(arc, from, to, |world| camera.to_screen(world));
    let width = camera.scale(link.width).max(0.5);
    let start = with_alpha(node_color(source), alpha);
    let end = with_alpha(link_end_color(target), alpha);
    painter.add(gradient_polyline(&points, width, start, end));
}

fn link_end_color(target: &OrbitNode) -> Color32 {
    match target.kind {
        NodeKind::CentralRepository => COLOR_LINK,
        NodeKind::Contributor | NodeKind::Repository => node_color(target),
    }
}

fn draw_node(painter: &Painter, node: &OrbitNode, camera: Camera, alpha: f32) {
    let position = camera.to_screen(node.position);
    let radius = camera.scale(node.radius);
    if !circle_visible(camera.rect, position, radius + 40.0) {
        return;
    }

    painter.circle_filled(position, radius, with_alpha(node_color(node), alpha));
    painter.circle_stroke(
        position,
        radius,
        Stroke::new(camera.scale(1.5).max(0.5), with_alpha(COLOR_BACKGROUND, alpha)),
    );

    let Some((start, end)) = node.contributor().and_then(|detail| detail.tenure) else {
        return;
    };
    let arc = Arc {
        center: node.position,
        radius: node.radius + TENURE_GAP,
        start_angle: start - FRAC_PI_2,
        sweep: (end - start).max(0.02),
    };
    let color = with_alpha(
        if node.is_orca_supported() {
            COLOR_ORCA
        } else {
            COLOR_TEXT
        },
        alpha,
    );
    let stroke = Stroke::new(camera.scale(1.5).max(0.6), color);
    painter.add(Shape::line(arc_points(arc, 0.0, 1.0, |world| camera.to_screen(world)), stroke));

    let direction = vec2(arc.start_angle.cos(), arc.start_angle.sin());
    painter.line_segment(
        [
            camera.to_screen(node.position + direction * (node.radius + 1.0)),
            camera.to_screen(node.position + direction * (node.radius + TENURE_GAP * 2.0)),
        ],
        stroke,
    );
}

fn draw_label(painter: &Painter, graph: &OrbitGraph, index: usize, camera: Camera, color: Color32) {
    let node = &graph.nodes[index];
    let position = camera.to_screen(node.position);
    match node.kind {
        NodeKind::Contributor => {
            let Some(angle) = node.ring_angle else {
                return;
            };
            let text = node
                .contributor()
                .map(|detail| detail.label_lines.join(" "))
                .unwrap_or_else(|| node.id.clone());
            radial_text(
                painter,
                position,
                angle,
                camera.scale(node.footprint_radius + 6.0),
                text,
                label_font(camera, 11.0),
                color,
            );
        }
        NodeKind::Repository => {
            let (owner, name) = split_repo_name(&node.id);
            let top = position - vec2(0.0, camera.scale(node.radius + 4.0));
            let font = label_font(camera, 10.0);
            painter.text(top, Align2::CENTER_BOTTOM, name, font.clone(), color);
            if !owner.is_empty() {
                painter.text(
                    top - vec2(0.0, font.size * 1.1),
                    Align2::CENTER_BOTTOM,
                    format!("{owner}/"),
                    font,
                    with_alpha(color, 0.7),
                );
            }
        }
        NodeKind::CentralRepository => {
            let (owner, name) = split_repo_name(&node.id);
            let font = label_font(camera, 13.0);
            painter.text(position, Align2::CENTER_TOP, name, font.clone(), COLOR_TEXT);
            if !owner.is_empty() {
                painter.text(position, Align2::CENTER_BOTTOM, format!("{owner}/"), font, COLOR_TEXT);
            }
        }
    }
}

fn labelled(graph: &OrbitGraph, index: usize) -> bool {
    let node = &graph.nodes[index];
    match node.kind {
        NodeKind::Contributor | NodeKind::CentralRepository => true,
        NodeKind::Repository => node.degree > 1,
    }
}

fn show_tooltip(ui: &mut Ui, lines: &[TooltipLine]) {
    for line in lines {
        match line {
            TooltipLine::Title(text) => {
                ui.label(egui::RichText::new(text).strong().color(COLOR_TEXT));
            }
            TooltipLine::Text(text) => {
                ui.label(text.as_str());
            }
            TooltipLine::Badge(text) => {
                ui.label(egui::RichText::new(text).small().color(COLOR_ORCA));
            }
        }
    }
}

impl OrbitView {
    pub(super) fn draw_orbit(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        if self.fit_pending {
            self.fit_to(rect);
        }
        self.handle_zoom(ui, rect, &response);
        self.handle_pan(&response);

        let camera = self.camera(rect);
        let painter = ui.painter_at(rect);
        let graph = &self.scene.graph;
        painter.rect_filled(rect, 0.0, COLOR_BACKGROUND);

        for filler in &graph.fillers {
            let position = camera.to_screen(filler.position);
            let radius = camera.scale(filler.radius);
            if circle_visible(rect, position, radius) {
                painter.circle_filled(position, radius, with_alpha(COLOR_CONTRIBUTOR, filler.opacity));
            }
        }

        draw_rings(&painter, graph, camera, self.scene.rings);

        for link_index in 0..graph.links.len() {
            draw_link(&painter, graph, link_index, camera, 0.8);
        }
        for node in &graph.nodes {
            draw_node(&painter, node, camera, 1.0);
        }
        if camera.zoom >= LABEL_MIN_ZOOM {
            for index in (0..graph.nodes.len()).filter(|&index| labelled(graph, index)) {
                draw_label(&painter, graph, index, camera, COLOR_TEXT);
            }
        }

        if let Some(cache) = &self.search_cache {
            for &index in &cache.matches {
                let node = &graph.nodes[index];
                painter.circle_stroke(
                    camera.to_screen(node.position),
                    camera.scale(node.radius) + 4.0,
                    Stroke::new(2.0, COLOR_ORCA),
                );
            }
        }

        if response.dragged() {
            ui.ctx().request_repaint();
        }

        let hovered = self.hovered_node(ui, camera);
        if let Some(hit) = hovered {
            painter.rect_filled(rect, 0.0, with_alpha(COLOR_BACKGROUND, 1.0 - DIMMED_ALPHA));

            let index = hit.index;
            let neighbours = graph.neighbors(index).collect::<Vec<_>>();
            for (link_index, link) in graph.links.iter().enumerate() {
                if link.source == index || link.target == index {
                    draw_link(&painter, graph, link_index, camera, 1.0);
                }
            }
            for &neighbour in &neighbours {
                draw_node(&painter, &graph.nodes[neighbour], camera, 1.0);
                draw_label(&painter, graph, neighbour, camera, COLOR_TEXT);
            }

            let node = &graph.nodes[index];
            draw_node(&painter, node, camera, 1.0);
            draw_label(&painter, graph, index, camera, COLOR_TEXT);
            painter.circle_stroke(
                camera.to_screen(node.position),
                camera.scale(node.radius) + 6.0,
                Stroke::new(2.0, COLOR_TEXT),
            );

            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
            let lines = tooltip_lines(graph, index);
            response.on_hover_ui_at_pointer(|ui| show_tooltip(ui, &lines));
        }
    }
}
