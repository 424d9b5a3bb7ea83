use eframe::egui::{self, Align, Context, Layout};

use super::FpsCounter;

/// Title, summary labels and a reload button, with frame timing on the right.
pub(in crate::app) fn top_bar(
    ctx: &Context,
    title: &str,
    summary: &[String],
    fps: &FpsCounter,
    reload_requested: &mut bool,
) {
    egui::TopBottomPanel::top("top_bar")
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(title);
                ui.separator();
                for label in summary {
                    ui.label(label.as_str());
                }
                if ui.button("Reload data").clicked() {
                    *reload_requested = true;
                }
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if let Some(fps_text) = fps.display_text() {
                        ui.label(fps_text);
                    }
                });
            });
        });
}
