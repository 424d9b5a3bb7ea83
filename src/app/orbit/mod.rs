use std::collections::HashSet;

use eframe::egui::{self, Context, RichText, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use log::debug;

use crate::data::OrbitGraph;
use crate::layout::{NodeIndex, RingGeometry};

use super::ui::{FpsCounter, top_bar};

mod details;
mod interaction;
mod view;

const SEARCH_RESULT_ROWS: usize = 40;

/// A laid-out orbit graph plus the hover index over its nodes.
pub(super) struct OrbitScene {
    graph: OrbitGraph,
    rings: RingGeometry,
    index: NodeIndex,
}

impl OrbitScene {
    pub(super) fn new(graph: OrbitGraph, rings: RingGeometry) -> Self {
        let index = NodeIndex::build(graph.nodes.iter().map(|node| (node.position, node.radius)));
        debug!("hover index over {} nodes", index.len());
        Self {
            graph,
            rings,
            index,
        }
    }

    /// Radius of the smallest origin-centred circle containing everything drawn.
    fn extent(&self) -> f32 {
        let nodes = self
            .graph
            .nodes
            .iter()
            .map(|node| node.position.length() + node.footprint_radius.max(node.radius));
        let fillers = self
            .graph
            .fillers
            .iter()
            .map(|filler| filler.position.length() + filler.radius);
        nodes
            .chain(fillers)
            .fold(self.rings.outer_radius, f32::max)
    }
}

struct SearchMatchCache {
    query: String,
    ranked: Vec<usize>,
    matches: HashSet<usize>,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Node indices whose id fuzzily matches `query`, best match first.
fn search_matches(graph: &OrbitGraph, query: &str) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = graph
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            fuzzy_match_score(&matcher, &node.id, query).map(|score| (index, score))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(index, _)| index).collect()
}

pub(super) struct OrbitView {
    scene: OrbitScene,
    pan: Vec2,
    zoom: f32,
    fit_pending: bool,
    search: String,
    search_cache: Option<SearchMatchCache>,
    focused: Option<usize>,
    fps: FpsCounter,
}

impl OrbitView {
    pub(super) fn new(scene: OrbitScene) -> Self {
        Self {
            scene,
            pan: Vec2::ZERO,
            zoom: 1.0,
            fit_pending: true,
            search: String::new(),
            search_cache: None,
            focused: None,
            fps: FpsCounter::default(),
        }
    }

    fn refresh_search(&mut self) {
        let query = self.search.trim();
        if query.is_empty() {
            self.search_cache = None;
            return;
        }

        if self
            .search_cache
            .as_ref()
            .is_none_or(|cached| cached.query != query)
        {
            let ranked = search_matches(&self.scene.graph, query);
            self.search_cache = Some(SearchMatchCache {
                query: query.to_owned(),
                matches: ranked.iter().copied().collect(),
                ranked,
            });
        }
    }

    fn focus(&mut self, index: usize) {
        self.focused = Some(index);
        self.pan = -self.scene.graph.nodes[index].position * self.zoom;
    }

    fn draw_search_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Search");
        ui.add_space(4.0);
        ui.text_edit_singleline(&mut self.search);
        if ui.button("Fit to window").clicked() {
            self.fit_pending = true;
            self.focused = None;
        }
        ui.separator();

        self.refresh_search();
        let Some(cache) = self.search_cache.as_ref() else {
            ui.label("Type a contributor or repository name.");
            return;
        };
        if cache.ranked.is_empty() {
            ui.label("No nodes match.");
            return;
        }

        let rows = cache
            .ranked
            .iter()
            .take(SEARCH_RESULT_ROWS)
            .map(|&index| (index, self.scene.graph.nodes[index].id.clone()))
            .collect::<Vec<_>>();
        let total = cache.ranked.len();

        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (index, id) in rows {
                let selected = self.focused == Some(index);
                if ui.selectable_label(selected, RichText::new(id)).clicked() {
                    clicked = Some(index);
                }
            }
            if total > SEARCH_RESULT_ROWS {
                ui.small(format!("and {} more", total - SEARCH_RESULT_ROWS));
            }
        });
        if let Some(index) = clicked {
            self.focus(index);
        }
    }

    pub(super) fn show(&mut self, ctx: &Context, reload_requested: &mut bool) {
        self.fps.update(ctx);

        let graph = &self.scene.graph;
        let summary = [
            format!("central: {}", graph.central_node().id),
            format!("contributors: {}", graph.contributor_count),
            format!("repositories: {}", graph.nodes.len() - graph.contributor_count),
            format!("links: {}", graph.links.len()),
        ];
        top_bar(ctx, "repo-orbits", &summary, &self.fps, reload_requested);

        egui::SidePanel::left("search")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| self.draw_search_panel(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_orbit(ui));
    }
}
