use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use crate::layout::Hit;

use super::super::render_utils::{screen_to_world, world_to_screen};
use super::OrbitView;

pub(super) const HOVER_SLACK: f32 = 50.0;
const FIT_MARGIN: f32 = 0.95;

/// World-to-screen mapping for one frame.
#[derive(Clone, Copy, Debug)]
pub(super) struct Camera {
    pub(super) rect: Rect,
    pub(super) pan: Vec2,
    pub(super) zoom: f32,
}

impl Camera {
    pub(super) fn to_screen(self, world: Vec2) -> Pos2 {
        world_to_screen(self.rect, self.pan, self.zoom, world)
    }

    pub(super) fn to_world(self, screen: Pos2) -> Vec2 {
        screen_to_world(self.rect, self.pan, self.zoom, screen)
    }

    pub(super) fn scale(self, length: f32) -> f32 {
        length * self.zoom
    }
}

impl OrbitView {
    pub(super) fn camera(&self, rect: Rect) -> Camera {
        Camera {
            rect,
            pan: self.pan,
            zoom: self.zoom,
        }
    }

    pub(super) fn fit_to(&mut self, rect: Rect) {
        let extent = self.scene.extent().max(1.0);
        self.zoom = (rect.width().min(rect.height()) * 0.5 * FIT_MARGIN / extent).clamp(0.02, 6.0);
        self.pan = Vec2::ZERO;
        self.fit_pending = false;
    }

    pub(super) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
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
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.02, 6.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(super) fn handle_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(super) fn hovered_node(&self, ui: &Ui, camera: Camera) -> Option<Hit> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !camera.rect.contains(pointer) {
            return None;
        }
        self.scene.index.hit(camera.to_world(pointer), HOVER_SLACK)
    }
}
