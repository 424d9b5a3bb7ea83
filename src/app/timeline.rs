use eframe::egui::{self, Align2, Color32, Context, FontId, Pos2, Sense, Shape, Stroke, Ui, vec2};

use crate::data::{Commit, MonthGroup};
use crate::layout::{CommitRef, RevealPhase, TimelineLayout};
use crate::util::{format_month_year, format_si};

use super::render_utils::{
    COLOR_BACKGROUND, COLOR_CENTRAL, COLOR_DELETIONS, COLOR_INSERTIONS, COLOR_OVERLAP, COLOR_REPO,
    COLOR_TEXT, with_alpha,
};
use super::ui::{FpsCounter, top_bar};

const MONTH_HALO: f32 = 7.0;
const TICK_LENGTH: f32 = 12.0;
const HOVER_RING_GAP: f32 = 10.0;

/// Text and font size of the label under month `index`.
fn month_label(months: &[MonthGroup], index: usize) -> Option<(String, f32)> {
    let month = months.get(index)?;
    let time = month.first_time()?;
    let edge = index == 0 || index + 1 == months.len();

    Some(if month.month == 1 {
        (month.year.to_string(), 30.0)
    } else if edge {
        (format_month_year(time), 23.0)
    } else {
        (time.format("%b").to_string(), 23.0)
    })
}

fn dominant_color(commit: &Commit) -> Color32 {
    if commit.files_changed == 0 {
        COLOR_CENTRAL
    } else if commit.radius_insertions >= commit.radius_deletions {
        COLOR_INSERTIONS
    } else {
        COLOR_DELETIONS
    }
}

fn visible_radius(commit: &Commit) -> f32 {
    if commit.files_changed == 0 {
        commit.draw_radius
    } else {
        commit.radius_insertions.max(commit.radius_deletions)
    }
}

fn draw_commit(painter: &egui::Painter, position: Pos2, commit: &Commit, opacity: f32) {
    if commit.files_changed == 0 {
        painter.circle_filled(position, commit.draw_radius, with_alpha(COLOR_CENTRAL, opacity));
    } else {
        let (larger, smaller) = if commit.radius_insertions >= commit.radius_deletions {
            (commit.radius_insertions, commit.radius_deletions)
        } else {
            (commit.radius_deletions, commit.radius_insertions)
        };
        painter.circle_filled(position, larger, with_alpha(dominant_color(commit), opacity));
        painter.circle_filled(position, smaller, with_alpha(COLOR_OVERLAP, opacity));
    }

    if commit.is_release() {
        let ring = (commit.radius - 6.0).max(visible_radius(commit) + 2.0);
        painter.circle_stroke(
            position,
            ring,
            Stroke::new(4.0, with_alpha(dominant_color(commit), opacity)),
        );
    }
}

fn draw_month(painter: &egui::Painter, origin: Pos2, months: &[MonthGroup], index: usize) {
    let month = &months[index];
    let opacity = month.opacity;
    if opacity <= 0.0 {
        return;
    }
    let center = origin + month.center;

    painter.circle_filled(center, month.radius, with_alpha(COLOR_BACKGROUND, opacity));
    painter.circle_stroke(
        center,
        month.radius + MONTH_HALO,
        Stroke::new(3.0, with_alpha(COLOR_REPO, 0.5 * opacity)),
    );
    painter.circle_stroke(center, month.radius, Stroke::new(1.5, with_alpha(COLOR_REPO, opacity)));

    let bottom = center + vec2(0.0, month.radius + MONTH_HALO);
    painter.line_segment(
        [bottom, bottom + vec2(0.0, TICK_LENGTH)],
        Stroke::new(1.5, with_alpha(COLOR_TEXT, opacity)),
    );
    if let Some((text, size)) = month_label(months, index) {
        painter.text(
            bottom + vec2(0.0, TICK_LENGTH + 4.0),
            Align2::CENTER_TOP,
            text,
            FontId::proportional(size),
            with_alpha(COLOR_TEXT, opacity),
        );
    }

    for commit in &month.commits {
        draw_commit(painter, center + commit.offset, commit, opacity);
    }
}

fn show_commit_tooltip(ui: &mut Ui, commit: &Commit) {
    ui.label(egui::RichText::new(&commit.author).strong().color(COLOR_TEXT));
    ui.label(commit.commit_time.format("%e %b %Y, %H:%M").to_string());
    if commit.author_time.date_naive() != commit.commit_time.date_naive() {
        ui.small(format!("authored {}", commit.author_time.format("%e %b %Y")));
    }
    ui.label(format!(
        "{} files | +{} -{}",
        commit.files_changed,
        format_si(f64::from(commit.line_insertions)),
        format_si(f64::from(commit.line_deletions))
    ));
    if let Some(release) = &commit.release {
        ui.label(egui::RichText::new(format!("Release {release}")).color(COLOR_CENTRAL));
    }
}

pub(super) struct TimelineView {
    layout: TimelineLayout,
    fps: FpsCounter,
}

impl TimelineView {
    pub(super) fn new(layout: TimelineLayout) -> Self {
        Self {
            layout,
            fps: FpsCounter::default(),
        }
    }

    fn phase_text(&self) -> String {
        match self.layout.phase() {
            RevealPhase::Refining { next_month } => {
                format!("refining month {}/{}", next_month + 1, self.layout.months().len())
            }
            RevealPhase::Settling => "settling".to_owned(),
            RevealPhase::Complete => "ready".to_owned(),
        }
    }

    pub(super) fn show(&mut self, ctx: &Context, reload_requested: &mut bool) {
        self.fps.update(ctx);
        if self.layout.advance() {
            ctx.request_repaint();
        }

        let timeline = self.layout.timeline();
        let releases = timeline
            .months
            .iter()
            .flat_map(|month| &month.commits)
            .filter(|commit| commit.is_release())
            .count();
        let summary = [
            format!("commits: {}", timeline.commit_count()),
            format!("months: {}", timeline.months.len()),
            format!("releases: {releases}"),
            self.phase_text(),
        ];
        top_bar(ctx, "repo-orbits timeline", &summary, &self.fps, reload_requested);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(COLOR_BACKGROUND))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| self.draw_timeline(ui));
            });
    }

    fn draw_timeline(&mut self, ui: &mut Ui) {
        let width = ui.available_width();
        self.layout.resize(width);

        let height = self.layout.grid().height;
        let (rect, response) = ui.allocate_exact_size(vec2(width, height), Sense::hover());
        let painter = ui.painter_at(rect);
        let origin = rect.min;

        let path = self
            .layout
            .timeline_path()
            .into_iter()
            .map(|point| origin + point)
            .collect::<Vec<_>>();
        painter.add(Shape::line(path.clone(), Stroke::new(20.0, with_alpha(COLOR_REPO, 0.2))));
        painter.add(Shape::line(path, Stroke::new(5.0, COLOR_REPO)));

        let months = self.layout.months();
        for index in 0..months.len() {
            draw_month(&painter, origin, months, index);
        }

        let hovered = response
            .hover_pos()
            .and_then(|pointer| self.layout.hovered(pointer - origin));
        let Some(CommitRef { month, commit }) = hovered else {
            return;
        };
        let month = &months[month];
        let commit = &month.commits[commit];
        let center = origin + month.center;
        let position = center + commit.offset;

        painter.circle_filled(center, month.radius, with_alpha(COLOR_BACKGROUND, 0.6));
        let stats = &month.stats;
        let top = center - vec2(0.0, month.radius + MONTH_HALO + 6.0);
        painter.text(
            top,
            Align2::CENTER_BOTTOM,
            format!(
                "{} authors | {} files | {} lines (+{} -{})",
                stats.authors,
                format_si(stats.files_changed as f64),
                format_si(stats.lines_changed as f64),
                format_si(stats.line_insertions as f64),
                format_si(stats.line_deletions as f64)
            ),
            FontId::proportional(12.0),
            COLOR_TEXT,
        );
        painter.text(
            top - vec2(0.0, 16.0),
            Align2::CENTER_BOTTOM,
            format!("{} commits", stats.commits),
            FontId::proportional(18.0),
            COLOR_TEXT,
        );
        draw_commit(&painter, position, commit, 1.0);
        painter.circle_stroke(
            position,
            visible_radius(commit) + HOVER_RING_GAP,
            Stroke::new(8.0, with_alpha(dominant_color(commit), 0.6)),
        );
        response.on_hover_ui_at_pointer(|ui| show_commit_tooltip(ui, commit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::prepare_commit_timeline;
    use crate::data::timeline::fixtures::{month_body, rows};

    fn months(keys: &[(i32, u32)]) -> Vec<MonthGroup> {
        let body = keys
            .iter()
            .map(|&(year, month)| month_body(year, month, 2))
            .collect::<String>();
        prepare_commit_timeline(&rows(&body)).unwrap().months
    }

    #[test]
    fn labels_mark_years_and_the_ends_of_the_range() {
        let months = months(&[(2020, 11), (2020, 12), (2021, 1), (2021, 2), (2021, 3)]);
        let labels = (0..months.len())
            .map(|index| month_label(&months, index).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(labels[0], ("Nov 2020".to_owned(), 23.0));
        assert_eq!(labels[1], ("Dec".to_owned(), 23.0));
        assert_eq!(labels[2], ("2021".to_owned(), 30.0));
        assert_eq!(labels[3], ("Feb".to_owned(), 23.0));
        assert_eq!(labels[4], ("Mar 2021".to_owned(), 23.0));
        assert!(month_label(&months, 5).is_none());
    }

    #[test]
    fn dominant_side_drives_colour() {
        let timeline = prepare_commit_timeline(&rows(
            "amy,2021-01-15 09:00:00 +0000,2021-01-15 09:00:00 +0000,0,0,0,\n\
             amy,2021-01-16 09:00:00 +0000,2021-01-16 09:00:00 +0000,2,200,3,\n\
             amy,2021-01-17 09:00:00 +0000,2021-01-17 09:00:00 +0000,2,1,90,\n",
        ))
        .unwrap();
        let commits = &timeline.months[0].commits;

        assert_eq!(dominant_color(&commits[0]), COLOR_CENTRAL);
        assert_eq!(visible_radius(&commits[0]), commits[0].draw_radius);
        assert_eq!(dominant_color(&commits[1]), COLOR_INSERTIONS);
        assert_eq!(dominant_color(&commits[2]), COLOR_DELETIONS);
        assert_eq!(visible_radius(&commits[2]), commits[2].radius_deletions);
    }
}
