use std::f32::consts::{FRAC_PI_2, PI};

use eframe::egui::{Vec2, vec2};
use log::{debug, info};

use crate::data::scale::Scale;
use crate::data::timeline::{CommitTimeline, MonthGroup};

use super::geometry::{Arc, Circle, enclose, pack_siblings};
use super::relax::{Body, Center, Collide, RampSchedule, Simulation, alpha_decay_for};
use super::spatial::NodeIndex;

const ARC_SAMPLES: usize = 12;
const FULLY_OPAQUE: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct TimelineLayoutConfig {
    pub pack_padding: f32,
    pub refine_limit: usize,
    pub refine_steps: usize,
    pub column_padding: f32,
    pub row_padding: f32,
    pub margin_ratio: f32,
    pub min_vertical_margin: f32,
    pub vertical_margin_ratio: f32,
    pub path_corner_ratio: f32,
    pub reveal_step: f32,
    pub hover_slack: f32,
}

impl Default for TimelineLayoutConfig {
    fn default() -> Self {
        Self {
            pack_padding: 1.5,
            refine_limit: 400,
            refine_steps: 200,
            column_padding: 50.0,
            row_padding: 80.0,
            margin_ratio: 0.08,
            min_vertical_margin: 150.0,
            vertical_margin_ratio: 0.05,
            path_corner_ratio: 0.7,
            reveal_step: 0.1,
            hover_slack: 40.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealPhase {
    Refining { next_month: usize },
    Settling,
    Complete,
}

/// Month and commit position of a hovered commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitRef {
    pub month: usize,
    pub commit: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridMetrics {
    pub width: f32,
    pub inner_width: f32,
    pub margin: Vec2,
    /// Baseline of each row, relative to the top margin.
    pub row_heights: Vec<f32>,
    pub height: f32,
}

impl GridMetrics {
    pub fn row_y(&self, row: usize) -> f32 {
        self.margin.y + self.row_heights.get(row).copied().unwrap_or_default()
    }
}

fn month_padding(enclosing_radius: f32) -> f32 {
    let grow = Scale::linear(&[0.0, 399.0, 400.0], &[2.0, 5.0, 12.0]).clamped();
    12.0 + grow.map(f64::from(enclosing_radius))
}

/// Packs a month's commits tightly around the origin and sizes the month
/// circle to enclose them.
fn pack_month(month: &mut MonthGroup, config: &TimelineLayoutConfig) {
    let mut circles = month
        .commits
        .iter()
        .map(|commit| Circle::new(0.0, 0.0, f64::from(commit.radius + config.pack_padding)))
        .collect::<Vec<_>>();
    pack_siblings(&mut circles);

    let actual = circles
        .iter()
        .zip(&month.commits)
        .map(|(circle, commit)| Circle::new(circle.x, circle.y, f64::from(commit.radius)))
        .collect::<Vec<_>>();
    let Some(enclosing) = enclose(&actual) else {
        month.radius = month_padding(0.0);
        return;
    };

    for (commit, circle) in month.commits.iter_mut().zip(&actual) {
        commit.offset = circle.center() - enclosing.center();
    }
    let radius = enclosing.r as f32;
    month.radius = radius + month_padding(radius);
}

/// Short relaxation inside one month. Returns whether it ran.
fn refine_month(month: &mut MonthGroup, config: &TimelineLayoutConfig) -> bool {
    let count = month.commits.len();
    if count < 2 || count >= config.refine_limit {
        return false;
    }

    let bodies = month
        .commits
        .iter()
        .map(|commit| Body::new(commit.offset, commit.radius))
        .collect::<Vec<_>>();
    let radii = bodies
        .iter()
        .map(|body| body.radius + config.pack_padding)
        .collect::<Vec<_>>();
    let strength = Scale::linear(&[0.0, 400.0], &[0.06, 0.01])
        .clamped()
        .map(count as f64);

    let mut simulation = Simulation::new(bodies)
        .with_alpha_decay(alpha_decay_for(config.refine_steps))
        .with_force(Collide::new(RampSchedule::constant(1.0)).with_radii(radii))
        .with_force(Center {
            target: Vec2::ZERO,
            strength,
        });
    simulation.run(config.refine_steps, |_| {});

    for (commit, body) in month.commits.iter_mut().zip(simulation.into_bodies()) {
        commit.offset = body.position;
    }
    true
}

struct RowCursor {
    along: f32,
    sign: f32,
    row: usize,
    column: usize,
}

impl RowCursor {
    fn new() -> Self {
        Self {
            along: 0.0,
            sign: 1.0,
            row: 0,
            column: 0,
        }
    }

    fn next_row(&mut self, inner_width: f32) {
        self.row += 1;
        self.sign = -self.sign;
        self.along = if self.sign > 0.0 { 0.0 } else { inner_width };
        self.column = 0;
    }
}

/// Lays months out left-to-right, then right-to-left on the next row, and so
/// on. Each row is centred within the inner width.
fn place_months(months: &mut [MonthGroup], width: f32, config: &TimelineLayoutConfig) -> GridMetrics {
    let margin = vec2(
        width * config.margin_ratio,
        (width * config.vertical_margin_ratio).max(config.min_vertical_margin),
    );
    let inner_width = (width - 2.0 * margin.x).max(1.0);
    let gap = config.column_padding;

    let mut cursor = RowCursor::new();
    let last = months.len().saturating_sub(1);

    for (index, month) in months.iter_mut().enumerate() {
        let r = month.radius;
        let overflows = if cursor.sign > 0.0 {
            cursor.along + 2.0 * r > inner_width
        } else {
            cursor.along - 2.0 * r < 0.0
        };
        if cursor.column != 0 && overflows {
            cursor.next_row(inner_width);
        }

        month.center.x = cursor.along + cursor.sign * r;
        month.row = cursor.row;
        cursor.column += 1;

        cursor.along += cursor.sign * (2.0 * r + gap);
        if index != last && !(0.0..=inner_width).contains(&cursor.along) {
            cursor.next_row(inner_width);
        }
    }

    let row_count = months.last().map_or(0, |month| month.row + 1);
    let mut row_widths = vec![-gap; row_count];
    let mut row_radii = vec![0.0_f32; row_count];
    for month in months.iter() {
        row_widths[month.row] += 2.0 * month.radius + gap;
        row_radii[month.row] = row_radii[month.row].max(month.radius);
    }

    let mut row_heights = Vec::with_capacity(row_count);
    for row in 0..row_count {
        let height = match row {
            0 => row_radii[0],
            _ => row_heights[row - 1] + row_radii[row - 1] + config.row_padding + row_radii[row],
        };
        row_heights.push(height);
    }

    for month in months.iter_mut() {
        let offset = (inner_width - row_widths[month.row]) / 2.0;
        month.center.x += if month.row % 2 == 0 { offset } else { -offset };
        month.center.x += margin.x;
        month.center.y = margin.y + row_heights[month.row];
    }

    let height = row_heights.last().copied().unwrap_or_default()
        + row_radii.last().copied().unwrap_or_default()
        + 2.0 * margin.y;
    debug!("timeline grid: {row_count} rows, {width:.0}x{height:.0}");

    GridMetrics {
        width,
        inner_width,
        margin,
        row_heights,
        height,
    }
}

fn sample_arc(arc: Arc, points: &mut Vec<Vec2>) {
    points.extend((1..=ARC_SAMPLES).map(|step| arc.point_at(step as f32 / ARC_SAMPLES as f32)));
}

/// Month grid of a commit timeline together with its incremental reveal.
pub struct TimelineLayout {
    timeline: CommitTimeline,
    config: TimelineLayoutConfig,
    grid: GridMetrics,
    phase: RevealPhase,
    hover: NodeIndex,
    hover_refs: Vec<CommitRef>,
}

impl TimelineLayout {
    pub fn new(timeline: CommitTimeline, width: f32, config: TimelineLayoutConfig) -> Self {
        let mut timeline = timeline;
        for month in &mut timeline.months {
            pack_month(month, &config);
            month.opacity = 0.0;
        }
        let grid = place_months(&mut timeline.months, width, &config);
        let phase = if timeline.months.is_empty() {
            RevealPhase::Complete
        } else {
            RevealPhase::Refining { next_month: 0 }
        };

        let mut layout = Self {
            timeline,
            config,
            grid,
            phase,
            hover: NodeIndex::default(),
            hover_refs: Vec::new(),
        };
        if layout.phase == RevealPhase::Complete {
            layout.rebuild_hover();
        }
        layout
    }

    pub fn months(&self) -> &[MonthGroup] {
        &self.timeline.months
    }

    pub fn timeline(&self) -> &CommitTimeline {
        &self.timeline
    }

    pub fn grid(&self) -> &GridMetrics {
        &self.grid
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RevealPhase::Complete
    }

    fn bump_opacity(&mut self, through: usize) {
        let step = self.config.reveal_step;
        for month in self.timeline.months.iter_mut().take(through + 1) {
            month.opacity = (month.opacity + step).min(FULLY_OPAQUE);
            if FULLY_OPAQUE - month.opacity < 1e-4 {
                month.opacity = FULLY_OPAQUE;
            }
        }
    }

    /// One reveal step. Returns `false` once nothing changes any more.
    pub fn advance(&mut self) -> bool {
        let count = self.timeline.months.len();
        match self.phase {
            RevealPhase::Refining { next_month } => {
                if let Some(month) = self.timeline.months.get_mut(next_month)
                    && !refine_month(month, &self.config)
                {
                    debug!(
                        "kept packed layout for {}-{:02} ({} commits)",
                        month.year,
                        month.month,
                        month.commits.len()
                    );
                }
                self.bump_opacity(next_month);
                self.phase = if next_month + 1 < count {
                    RevealPhase::Refining {
                        next_month: next_month + 1,
                    }
                } else {
                    RevealPhase::Settling
                };
                true
            }
            RevealPhase::Settling => {
                let settled = self
                    .timeline
                    .months
                    .iter()
                    .all(|month| month.opacity >= FULLY_OPAQUE);
                if settled {
                    self.phase = RevealPhase::Complete;
                    self.rebuild_hover();
                    info!("timeline reveal complete over {count} months");
                } else {
                    self.bump_opacity(count.saturating_sub(1));
                }
                true
            }
            RevealPhase::Complete => false,
        }
    }

    /// Recomputes the month grid for a new width, keeping packed commit offsets.
    pub fn resize(&mut self, width: f32) {
        if (width - self.grid.width).abs() < 0.5 {
            return;
        }
        self.grid = place_months(&mut self.timeline.months, width, &self.config);
        self.rebuild_hover();
    }

    fn rebuild_hover(&mut self) {
        self.hover_refs.clear();
        let mut circles = Vec::with_capacity(self.timeline.commit_count());
        for (month_index, month) in self.timeline.months.iter().enumerate() {
            for (commit_index, commit) in month.commits.iter().enumerate() {
                circles.push((month.center + commit.offset, commit.radius));
                self.hover_refs.push(CommitRef {
                    month: month_index,
                    commit: commit_index,
                });
            }
        }
        self.hover = NodeIndex::build(circles);
    }

    /// Commit under `point`, only once the reveal has finished.
    pub fn hovered(&self, point: Vec2) -> Option<CommitRef> {
        if !self.is_complete() || self.hover.is_empty() {
            return None;
        }
        let hit = self.hover.hit(point, self.config.hover_slack)?;
        self.hover_refs.get(hit.index).copied()
    }

    /// Polyline of the timeline running through every row, joined by
    /// rounded turns alternating between the right and left edge.
    pub fn timeline_path(&self) -> Vec<Vec2> {
        let grid = &self.grid;
        let left = grid.margin.x;
        let right = grid.margin.x + grid.inner_width;
        let corner = grid.margin.x * self.config.path_corner_ratio;

        let mut points = vec![vec2(left, grid.row_y(0))];
        for (row, &height) in grid.row_heights.iter().enumerate() {
            let y = grid.margin.y + height;
            let even = row % 2 == 0;
            let edge = if even { right } else { left };
            points.push(vec2(edge, y));

            let Some(next) = grid.row_heights.get(row + 1) else {
                continue;
            };
            let drop = next - height;
            let radius = corner.min(drop / 2.0);
            if radius <= 0.0 {
                continue;
            }
            let sweep = if even { FRAC_PI_2 } else { -FRAC_PI_2 };
            sample_arc(
                Arc {
                    center: vec2(edge, y + radius),
                    radius,
                    start_angle: -FRAC_PI_2,
                    sweep,
                },
                &mut points,
            );
            sample_arc(
                Arc {
                    center: vec2(edge, y + drop - radius),
                    radius,
                    start_angle: if even { 0.0 } else { PI },
                    sweep,
                },
                &mut points,
            );
        }
        points
    }
}
