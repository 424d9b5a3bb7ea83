use std::collections::VecDeque;

use eframe::egui::Context;

const FPS_SAMPLE_WINDOW: usize = 180;

#[derive(Debug, Default)]
pub(in crate::app) struct FpsCounter {
    current: f32,
    samples: VecDeque<f32>,
}

impl FpsCounter {
    pub(in crate::app) fn update(&mut self, ctx: &Context) {
        self.record(ctx.input(|input| input.stable_dt));
    }

    fn record(&mut self, dt: f32) {
        if dt <= f32::EPSILON {
            return;
        }

        self.current = (1.0 / dt).clamp(0.0, 1000.0);
        self.samples.push_back(self.current);
        while self.samples.len() > FPS_SAMPLE_WINDOW {
            self.samples.pop_front();
        }
    }

    pub(in crate::app) fn display_text(&self) -> Option<String> {
        if self.samples.is_empty() {
            return None;
        }

        let avg = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        Some(format!(
            "FPS {:.0} | avg {:.1} | {:.1} ms",
            self.current,
            avg,
            1000.0 / self.current.max(f32::EPSILON)
        ))
    }
}
