use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::{
    OrbitInput, OrbitSources, load_commit_rows, prepare_commit_timeline, prepare_orbit_graph,
};
use crate::layout::{OrbitLayoutConfig, TimelineLayout, TimelineLayoutConfig, layout_orbit_graph};

mod export;
mod orbit;
mod render_utils;
mod timeline;
mod ui;

use export::ScreenshotExporter;
use orbit::{OrbitScene, OrbitView};
use timeline::TimelineView;

/// Width the timeline grid is first laid out at; the view regrids to the
/// real panel width on its first frame.
const INITIAL_TIMELINE_WIDTH: f32 = 1440.0;

#[derive(Clone, Debug)]
pub enum LoadRequest {
    Orbit {
        sources: OrbitSources,
        central_repo: Option<String>,
        seed: Option<u64>,
    },
    Timeline {
        commits: PathBuf,
    },
}

impl LoadRequest {
    fn loading_title(&self) -> &'static str {
        match self {
            Self::Orbit { .. } => "Computing contributor orbits...",
            Self::Timeline { .. } => "Packing commit timeline...",
        }
    }

    fn error_title(&self) -> &'static str {
        match self {
            Self::Orbit { .. } => "Failed to build the contributor orbit graph",
            Self::Timeline { .. } => "Failed to build the commit timeline",
        }
    }
}

enum Loaded {
    Orbit(OrbitScene),
    Timeline(TimelineLayout),
}

fn load(request: &LoadRequest) -> Result<Loaded> {
    match request {
        LoadRequest::Orbit {
            sources,
            central_repo,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_os_rng(),
            };
            let input = OrbitInput::load(sources)?;
            let mut graph = prepare_orbit_graph(&input, central_repo.as_deref(), &mut rng)?;
            let rings = layout_orbit_graph(&mut graph, &OrbitLayoutConfig::default(), &mut rng)?;
            Ok(Loaded::Orbit(OrbitScene::new(graph, rings)))
        }
        LoadRequest::Timeline { commits } => {
            let rows = load_commit_rows(commits)?;
            let timeline = prepare_commit_timeline(&rows)?;
            Ok(Loaded::Timeline(TimelineLayout::new(
                timeline,
                INITIAL_TIMELINE_WIDTH,
                TimelineLayoutConfig::default(),
            )))
        }
    }
}

pub struct RepoOrbitsApp {
    request: LoadRequest,
    state: AppState,
    exporter: ScreenshotExporter,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Loaded, String>>,
    },
    Ready(Box<View>),
    Error(String),
}

enum View {
    Orbit(OrbitView),
    Timeline(TimelineView),
}

impl View {
    fn new(loaded: Loaded) -> Self {
        match loaded {
            Loaded::Orbit(scene) => Self::Orbit(OrbitView::new(scene)),
            Loaded::Timeline(layout) => Self::Timeline(TimelineView::new(layout)),
        }
    }
}

impl RepoOrbitsApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        request: LoadRequest,
        screenshot_dir: PathBuf,
    ) -> Self {
        let state = Self::start_load(request.clone());
        Self {
            request,
            state,
            exporter: ScreenshotExporter::new(screenshot_dir),
        }
    }

    fn spawn_load(request: LoadRequest) -> Receiver<Result<Loaded, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load(&request).map_err(|error| {
                error!("{error:#}");
                format!("{error:#}")
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(request: LoadRequest) -> AppState {
        info!("loading {request:?}");
        AppState::Loading {
            rx: Self::spawn_load(request),
        }
    }
}

impl eframe::App for RepoOrbitsApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => transition = Some(AppState::Ready(Box::new(View::new(loaded)))),
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                let title = self.request.loading_title();
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(title);
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                let title = self.request.error_title();
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading(title);
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.request.clone()));
                    }
                });
            }
            AppState::Ready(view) => {
                self.exporter.update(ctx);
                if let Some(status) = self.exporter.status() {
                    egui::TopBottomPanel::bottom("screenshot_status").show(ctx, |ui| {
                        ui.small(status);
                    });
                }

                let mut reload_requested = false;
                match view.as_mut() {
                    View::Orbit(orbit) => orbit.show(ctx, &mut reload_requested),
                    View::Timeline(timeline) => timeline.show(ctx, &mut reload_requested),
                }
                if reload_requested {
                    transition = Some(Self::start_load(self.request.clone()));
                }
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
